//! Tool invocation errors

use confdoc_core::ConfigError;
use confdoc_schema::SchemaError;

/// Errors raised while deriving or calling configuration tools
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// No derived tool has this name
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments do not fit the tool's input shape
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Record entry does not exist
    #[error("entry '{0}' not found")]
    NotFound(String),

    /// Record entry already exists
    #[error("entry '{0}' already exists")]
    AlreadyExists(String),

    /// Underlying document operation failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Clean schema view could not be built
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl ToolError {
    /// HTTP status code for the API boundary
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownTool(_) | Self::NotFound(_) => 404,
            Self::AlreadyExists(_) => 409,
            Self::InvalidArguments(_) => 400,
            Self::Config(err) => err.status_code(),
            Self::Schema(_) => 500,
        }
    }
}

/// Result type for tool operations
pub type ToolResult<T> = Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(ToolError::NotFound("a".into()).status_code(), 404);
        assert_eq!(ToolError::AlreadyExists("a".into()).status_code(), 409);
        let restricted = ToolError::from(ConfigError::restricted(confdoc_path::PathAddress::root()));
        assert_eq!(restricted.status_code(), 403);
        assert_eq!(restricted.to_string(), "path '' is restricted");
    }
}
