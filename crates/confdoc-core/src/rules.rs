//! Restriction and overwrite rules of a document

use std::path::Path;

use confdoc_path::PathPattern;
use serde::{Deserialize, Serialize};

use crate::format::{self, Format, FormatError};
use crate::guard::RestrictionGuard;
use crate::overwrite::OverwriteMatcher;

/// Rules fixed for the lifetime of a document
///
/// Loadable from TOML, YAML or JSON:
///
/// ```toml
/// restricted = ["auth.secret", "server.tls"]
/// overwrite = ["entities.*.fields.*.config"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentRules {
    /// Prefixes whose writes require a bypass view
    pub restricted: Vec<PathPattern>,
    /// Positions replaced wholesale during merges
    pub overwrite: Vec<PathPattern>,
}

impl DocumentRules {
    /// Rules with nothing restricted and no overwrite positions
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a restricted prefix
    #[must_use]
    pub fn with_restricted(mut self, pattern: PathPattern) -> Self {
        self.restricted.push(pattern);
        self
    }

    /// Add an overwrite position
    #[must_use]
    pub fn with_overwrite(mut self, pattern: PathPattern) -> Self {
        self.overwrite.push(pattern);
        self
    }

    /// Parse rules in the given format
    ///
    /// # Errors
    /// Returns [`FormatError`] on syntax errors, unknown fields or malformed
    /// patterns
    pub fn parse(format: Format, content: &str) -> Result<Self, FormatError> {
        format.parse(content)
    }

    /// Load rules from a `.toml`, `.yaml`/`.yml` or `.json` file
    ///
    /// # Errors
    /// Returns [`FormatError`] if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FormatError> {
        let rules: Self = format::load(path.as_ref())?;
        tracing::debug!(
            path = %path.as_ref().display(),
            restricted = rules.restricted.len(),
            overwrite = rules.overwrite.len(),
            "loaded document rules"
        );
        Ok(rules)
    }

    /// Guard for one call, disabled for bypass views
    #[must_use]
    pub fn guard(&self, bypass: bool) -> RestrictionGuard<'_> {
        if bypass {
            RestrictionGuard::bypass()
        } else {
            RestrictionGuard::new(&self.restricted)
        }
    }

    /// Overwrite matcher over these rules
    #[must_use]
    pub fn overwrite_matcher(&self) -> OverwriteMatcher<'_> {
        OverwriteMatcher::new(&self.overwrite)
    }
}
