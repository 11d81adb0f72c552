//! Command definition and execution

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use confdoc_core::{format, ConfigDocument, DocumentRules, Format};
use confdoc_path::PathAddress;
use confdoc_schema::{Schema, SchemaAdapter};
use confdoc_tools::ConfigTools;
use serde_json::Value;

/// Build the `confdoc` command
pub(crate) fn command() -> Command {
    let path = |required: bool| {
        Arg::new("path")
            .required(required)
            .help("Dotted path such as `server.ports[0]`; empty for the root")
    };
    let value = || {
        Arg::new("value")
            .required(true)
            .help("JSON value; anything that is not JSON is taken as a string")
    };

    Command::new("confdoc")
        .version(confdoc_core::VERSION)
        .about("Read and change schema-governed configuration documents")
        .subcommand_required(true)
        .arg(
            Arg::new("schema")
                .long("schema")
                .short('s')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("JSON Schema file (.json, .yaml or .toml)"),
        )
        .arg(
            Arg::new("document")
                .long("document")
                .short('d')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Current document; schema defaults when omitted"),
        )
        .arg(
            Arg::new("rules")
                .long("rules")
                .short('r')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Restriction and overwrite rules"),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .global(true)
                .help("Document name used in logs and tool names"),
        )
        .arg(
            Arg::new("bypass")
                .long("bypass")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Skip restriction checks"),
        )
        .arg(
            Arg::new("write")
                .long("write")
                .short('w')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Store the changed document back to --document"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .global(true)
                .default_value("json")
                .value_parser(["json", "yaml", "toml"])
                .help("Output format"),
        )
        .subcommand(
            Command::new("get")
                .about("Print the document or the value at a path")
                .arg(path(false))
                .arg(
                    Arg::new("redact")
                        .long("redact")
                        .action(ArgAction::SetTrue)
                        .help("Leave out values marked secret in the schema"),
                ),
        )
        .subcommand(Command::new("defaults").about("Print a document made of schema defaults"))
        .subcommand(
            Command::new("has")
                .about("Print whether a path holds a value")
                .arg(path(true)),
        )
        .subcommand(
            Command::new("check").about("Validate the document and list every violation"),
        )
        .subcommand(
            Command::new("patch")
                .about("Deep-merge a value at a path")
                .arg(path(true))
                .arg(value()),
        )
        .subcommand(
            Command::new("set")
                .about("Deep-merge a value at the root")
                .arg(value()),
        )
        .subcommand(
            Command::new("overwrite")
                .about("Replace the value at a path")
                .arg(path(true))
                .arg(value()),
        )
        .subcommand(
            Command::new("remove")
                .about("Delete the value at a path")
                .arg(path(true)),
        )
        .subcommand(
            Command::new("tools")
                .about("List or call the tools derived for a configuration")
                .arg(
                    Arg::new("root")
                        .long("root")
                        .default_value("")
                        .help("Path of the configuration inside the document"),
                )
                .arg(Arg::new("tool").help("Tool to call; lists definitions when omitted"))
                .arg(
                    Arg::new("arguments")
                        .default_value("{}")
                        .help("JSON arguments object"),
                ),
        )
}

/// Parse a command-line value as JSON, or keep it as a string
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()))
}

fn text<'a>(args: &'a ArgMatches, id: &str) -> &'a str {
    args.get_one::<String>(id).map_or("", String::as_str)
}

fn load_schema(matches: &ArgMatches) -> anyhow::Result<Schema> {
    let Some(path) = matches.get_one::<PathBuf>("schema") else {
        bail!("--schema is required");
    };
    let document: Value = format::load(path)?;
    Schema::new(document).with_context(|| format!("invalid schema {}", path.display()))
}

fn load_initial(matches: &ArgMatches) -> anyhow::Result<Option<Value>> {
    matches
        .get_one::<PathBuf>("document")
        .map(|path| format::load(path).map_err(anyhow::Error::from))
        .transpose()
}

fn open_document(matches: &ArgMatches, schema: Schema) -> anyhow::Result<ConfigDocument> {
    let name = matches.get_one::<String>("name").cloned().unwrap_or_else(|| {
        matches
            .get_one::<PathBuf>("document")
            .and_then(|path| path.file_stem())
            .map_or_else(|| "document".to_owned(), |stem| stem.to_string_lossy().into_owned())
    });

    let mut builder = ConfigDocument::builder(schema).name(name);
    if let Some(path) = matches.get_one::<PathBuf>("rules") {
        builder = builder.rules(DocumentRules::load(path)?);
    }
    if let Some(initial) = load_initial(matches)? {
        builder = builder.initial(initial);
    }
    let document = builder.build()?;

    Ok(if matches.get_flag("bypass") {
        document.bypass()
    } else {
        document
    })
}

fn store(matches: &ArgMatches, document: &ConfigDocument) -> anyhow::Result<()> {
    if !matches.get_flag("write") {
        return Ok(());
    }
    let Some(path) = matches.get_one::<PathBuf>("document") else {
        bail!("--write needs --document");
    };
    write_document(path, document)
}

fn write_document(path: &Path, document: &ConfigDocument) -> anyhow::Result<()> {
    format::store(path, &document.get())?;
    tracing::info!(path = %path.display(), "document written");
    Ok(())
}

/// Run the selected subcommand, returning the value to print
pub(crate) async fn execute(matches: &ArgMatches) -> anyhow::Result<Value> {
    let schema = load_schema(matches)?;
    let Some((name, args)) = matches.subcommand() else {
        bail!("no subcommand given");
    };
    if name == "check" {
        // The stored document may be invalid, so it is not opened
        let initial = load_initial(matches)?.unwrap_or_else(|| schema.defaults());
        let validation = schema.validate(&schema.normalize(initial));
        return Ok(serde_json::to_value(validation.errors)?);
    }
    let document = open_document(matches, schema)?;

    let output = match name {
        "get" if args.get_flag("redact") => redacted_at(&document, text(args, "path"))?,
        "get" => document.get_at(text(args, "path"))?.unwrap_or(Value::Null),
        "defaults" => document.defaults(),
        "has" => Value::Bool(document.has(text(args, "path"))?),
        "patch" => {
            let value = parse_value(text(args, "value"));
            let patched = document.patch(text(args, "path"), value)?.await?;
            store(matches, &document)?;
            patched.next.into_value()
        }
        "set" => {
            let next = document.set(parse_value(text(args, "value")))?.await?;
            store(matches, &document)?;
            next.into_value()
        }
        "overwrite" => {
            let value = parse_value(text(args, "value"));
            let next = document.overwrite(text(args, "path"), value)?.await?;
            store(matches, &document)?;
            next.into_value()
        }
        "remove" => {
            let next = document.remove(text(args, "path"))?.await?;
            store(matches, &document)?;
            next.into_value()
        }
        "tools" => {
            let name = document.name().to_owned();
            let tools = ConfigTools::derive(name, document.clone(), text(args, "root"))?;
            match args.get_one::<String>("tool") {
                None => serde_json::to_value(tools.definitions()?)?,
                Some(tool) => {
                    let arguments: Value = serde_json::from_str(text(args, "arguments"))
                        .context("tool arguments must be JSON")?;
                    let result = tools.call(tool, arguments).await?;
                    store(matches, &document)?;
                    result
                }
            }
        }
        other => bail!("unknown command {other}"),
    };
    Ok(output)
}

/// Document with secrets removed, read at `path`
fn redacted_at(document: &ConfigDocument, path: &str) -> anyhow::Result<Value> {
    let address: PathAddress = path.parse()?;
    let redacted = document.schema().redact(&document.get());
    Ok(address.resolve(&redacted).cloned().unwrap_or(Value::Null))
}

/// Render `value` in the format chosen with `--output`
pub(crate) fn render(matches: &ArgMatches, value: &Value) -> anyhow::Result<String> {
    let format = match text(matches, "output") {
        "yaml" => Format::Yaml,
        "toml" => Format::Toml,
        _ => return Ok(serde_json::to_string_pretty(value)?),
    };
    Ok(format.render(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let schema = json!({
                "type": "object",
                "properties": {
                    "host": {"type": "string", "default": "localhost"},
                    "port": {"type": "integer", "minimum": 1, "default": 8080},
                    "token": {"type": "string", "default": "t0p", "secret": true}
                }
            });
            std::fs::write(dir.path().join("schema.json"), schema.to_string()).unwrap();
            std::fs::write(dir.path().join("rules.toml"), "restricted = [\"token\"]\n").unwrap();
            Self { dir }
        }

        fn path(&self, name: &str) -> String {
            self.dir.path().join(name).display().to_string()
        }

        async fn run(&self, args: &[&str]) -> anyhow::Result<Value> {
            let schema = self.path("schema.json");
            let rules = self.path("rules.toml");
            let mut argv = vec!["confdoc", "--schema", schema.as_str(), "--rules", rules.as_str()];
            argv.extend_from_slice(args);
            let matches = command().try_get_matches_from(argv)?;
            execute(&matches).await
        }
    }

    #[test]
    fn command_is_well_formed() {
        command().debug_assert();
    }

    #[test]
    fn values_fall_back_to_strings() {
        assert_eq!(parse_value("8081"), json!(8081));
        assert_eq!(parse_value("[1, 2]"), json!([1, 2]));
        assert_eq!(parse_value("example.org"), json!("example.org"));
    }

    #[tokio::test]
    async fn reads_defaults_without_a_document() {
        let ws = Workspace::new();
        assert_eq!(ws.run(&["get", "port"]).await.unwrap(), json!(8080));
        assert_eq!(ws.run(&["has", "host"]).await.unwrap(), json!(true));
        let redacted = ws.run(&["get", "--redact"]).await.unwrap();
        assert_eq!(redacted, json!({"host": "localhost", "port": 8080}));
    }

    #[tokio::test]
    async fn patch_writes_back_to_the_document() {
        let ws = Workspace::new();
        let doc = ws.path("server.yaml");
        std::fs::write(&doc, "host: example.org\n").unwrap();

        let next = ws.run(&["--document", doc.as_str(), "-w", "patch", "port", "9000"]).await.unwrap();
        assert_eq!(next["port"], json!(9000));

        let stored: Value = format::load(&doc).unwrap();
        assert_eq!(stored["host"], json!("example.org"));
        assert_eq!(stored["port"], json!(9000));
    }

    #[tokio::test]
    async fn restricted_paths_need_bypass() {
        let ws = Workspace::new();
        let err = ws.run(&["patch", "token", "x"]).await.unwrap_err();
        let err = err.downcast::<confdoc_core::ConfigError>().unwrap();
        assert_eq!(err.status_code(), 403);

        let next = ws.run(&["--bypass", "patch", "token", "x"]).await.unwrap();
        assert_eq!(next["token"], json!("x"));
    }

    #[tokio::test]
    async fn check_lists_violations_of_a_stored_document() {
        let ws = Workspace::new();
        let doc = ws.path("bad.json");
        std::fs::write(&doc, r#"{"port": 0}"#).unwrap();

        let issues = ws.run(&["--document", doc.as_str(), "check"]).await.unwrap();
        assert_eq!(issues.as_array().unwrap().len(), 1);
        assert_eq!(issues[0]["path"], json!("port"));
        assert!(ws.run(&["--document", doc.as_str(), "get"]).await.is_err());
    }

    #[tokio::test]
    async fn tools_are_listed_and_called() {
        let ws = Workspace::new();
        let listed = ws.run(&["--name", "server", "tools"]).await.unwrap();
        assert_eq!(listed[1]["name"], json!("server_update"));

        let next = ws
            .run(&["--name", "server", "tools", "server_update", r#"{"value": {"host": "a"}}"#])
            .await
            .unwrap();
        assert_eq!(next["host"], json!("a"));
    }

    #[test]
    fn renders_requested_format() {
        let matches = command()
            .try_get_matches_from(["confdoc", "-o", "yaml", "defaults"])
            .unwrap();
        let rendered = render(&matches, &json!({"a": 1})).unwrap();
        assert_eq!(rendered.trim(), "a: 1");
    }
}
