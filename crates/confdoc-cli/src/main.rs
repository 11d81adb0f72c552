//! `confdoc` - read and change schema-governed configuration documents

mod app;

use std::process::ExitCode;

use confdoc_core::ConfigError;
use confdoc_tools::ToolError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,confdoc=info,confdoc_core=info,confdoc_tools=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let matches = app::command().get_matches();
    let result = app::execute(&matches)
        .await
        .and_then(|value| app::render(&matches, &value));
    match result {
        Ok(rendered) => {
            println!("{rendered}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

/// 3 for forbidden writes, 2 for rejected input, 1 otherwise
fn exit_code(err: &anyhow::Error) -> u8 {
    let status = err
        .downcast_ref::<ConfigError>()
        .map(ConfigError::status_code)
        .or_else(|| err.downcast_ref::<ToolError>().map(ToolError::status_code));
    match status {
        Some(403) => 3,
        Some(400 | 404 | 409) => 2,
        _ => 1,
    }
}
