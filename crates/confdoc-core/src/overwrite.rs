//! Overwrite rules
//!
//! Sub-paths matched by an overwrite rule are replaced wholesale during a
//! merge instead of being merged key by key.

use confdoc_path::{PathAddress, PathPattern};

/// Decides which merge positions are replaced wholesale
#[derive(Debug, Clone, Copy)]
pub struct OverwriteMatcher<'r> {
    rules: &'r [PathPattern],
}

impl<'r> OverwriteMatcher<'r> {
    /// Matcher over the given rules
    #[inline]
    #[must_use]
    pub fn new(rules: &'r [PathPattern]) -> Self {
        Self { rules }
    }

    /// Matcher without rules
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self { rules: &[] }
    }

    /// Configured rules
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &'r [PathPattern] {
        self.rules
    }

    /// Whether the value at `address` must be replaced wholesale
    #[must_use]
    pub fn matches(&self, address: &PathAddress) -> bool {
        self.rules.iter().any(|rule| rule.matches(address))
    }
}
