//! Error types for configuration documents
//!
//! Errors fall on two sides of the mutation call:
//! - synchronous: returned by the facade method itself
//!   ([`ConfigError::Restricted`], [`ConfigError::MalformedPath`],
//!   [`ConfigError::LeafType`])
//! - deferred: only observed by awaiting the returned
//!   [`Deferred`](crate::Deferred) ([`ConfigError::UnresolvedPath`],
//!   [`ConfigError::Validation`], [`ConfigError::Hook`],
//!   [`ConfigError::Interrupted`])

use std::fmt;

use confdoc_path::{PathAddress, PathError};
use confdoc_schema::{SchemaError, ValidationIssue};

use crate::pipeline::Stage;

/// Boxed error raised by a hook implementation
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure reported by a registered hook
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct HookError(#[from] BoxError);

impl HookError {
    /// Wrap any error
    pub fn new(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Box::new(error))
    }

    /// Error carrying only a message
    pub fn msg(message: impl fmt::Display) -> Self {
        Self(message.to_string().into())
    }

    /// Underlying error
    #[must_use]
    pub fn into_inner(self) -> BoxError {
        self.0
    }
}

/// Response class an API boundary should map an error to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Caller lacks the right to write here
    Forbidden,
    /// Caller sent something the document cannot accept
    BadRequest,
    /// Failure on the server side
    Internal,
}

impl ErrorClass {
    /// HTTP status code for this class
    #[must_use]
    pub fn status_code(self) -> u16 {
        match self {
            Self::Forbidden => 403,
            Self::BadRequest => 400,
            Self::Internal => 500,
        }
    }
}

/// Errors raised by [`ConfigDocument`](crate::ConfigDocument) operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Write touches a restricted subtree
    #[error("path '{path}' is restricted")]
    Restricted { path: PathAddress },

    /// Path expression could not be parsed
    #[error("malformed path: {0}")]
    MalformedPath(#[from] PathError),

    /// Scalar leaf assigned a value of an incompatible kind
    #[error("'{path}' expects {}, got {found}", .expected.join(" or "))]
    LeafType {
        path: PathAddress,
        expected: Vec<String>,
        found: &'static str,
    },

    /// Target does not exist and the schema does not allow it
    #[error("path '{path}' is not allowed by the schema")]
    UnresolvedPath { path: PathAddress },

    /// Normalized document failed schema validation
    #[error("document failed validation: {}", summarize(.issues))]
    Validation { issues: Vec<ValidationIssue> },

    /// A registered hook failed
    #[error("{stage} failed: {source}")]
    Hook {
        stage: Stage,
        #[source]
        source: HookError,
    },

    /// Mutation stopped before its pipeline finished
    #[error("mutation was interrupted before it finished")]
    Interrupted,

    /// Schema document is not usable
    #[error("invalid schema: {0}")]
    Schema(#[from] SchemaError),
}

impl ConfigError {
    /// Create restricted error for path
    pub fn restricted(path: impl Into<PathAddress>) -> Self {
        Self::Restricted { path: path.into() }
    }

    /// Create hook error for a pipeline stage
    pub fn hook(stage: Stage, source: HookError) -> Self {
        Self::Hook { stage, source }
    }

    /// Response class for the API boundary
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Restricted { .. } => ErrorClass::Forbidden,
            Self::MalformedPath(_)
            | Self::LeafType { .. }
            | Self::UnresolvedPath { .. }
            | Self::Validation { .. } => ErrorClass::BadRequest,
            Self::Hook { .. } | Self::Interrupted | Self::Schema(_) => ErrorClass::Internal,
        }
    }

    /// HTTP status code for the API boundary
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.class().status_code()
    }

    /// Whether the error is only observable by awaiting the mutation
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedPath { .. }
                | Self::Validation { .. }
                | Self::Hook { .. }
                | Self::Interrupted
        )
    }

    /// Pipeline stage that raised the error
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Restricted { .. } | Self::MalformedPath(_) | Self::LeafType { .. } => {
                Stage::Guard
            }
            Self::UnresolvedPath { .. } => Stage::Merge,
            Self::Validation { .. } | Self::Schema(_) => Stage::Validate,
            Self::Interrupted => Stage::Commit,
            Self::Hook { stage, .. } => *stage,
        }
    }

    /// Violated constraints, when the error carries any
    #[must_use]
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Self::Validation { issues } => issues,
            _ => &[],
        }
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    match issues {
        [] => "no details".to_owned(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

/// Result type alias for document operations
pub type ConfigResult<T> = Result<T, ConfigError>;
