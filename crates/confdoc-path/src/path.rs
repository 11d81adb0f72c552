//! Path addresses into configuration documents
//!
//! Provides [`PathAddress`] for hierarchical addressing of values within a
//! document tree, and [`Segment`] for its individual steps.

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// One step of a [`PathAddress`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// Property name inside a mapping
    Key(String),
    /// Element position inside a sequence
    Index(usize),
}

impl Segment {
    /// Property-name segment
    #[inline]
    #[must_use]
    pub fn key(name: impl Into<String>) -> Self {
        Self::Key(name.into())
    }

    /// Property name, if this is a key segment
    #[inline]
    #[must_use]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(name) => Some(name),
            Self::Index(_) => None,
        }
    }

    /// Array position addressed by this segment
    ///
    /// Key segments that are plain decimal numbers also address array
    /// elements, so `a.0` and `a[0]` reach the same element of an array.
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Key(name) if !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit()) => {
                name.parse().ok()
            }
            Self::Key(_) => None,
        }
    }

    /// Whether this is an index segment
    #[inline]
    #[must_use]
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    /// Name used when this segment addresses a mapping
    #[must_use]
    pub fn to_key(&self) -> Cow<'_, str> {
        match self {
            Self::Key(name) => Cow::Borrowed(name),
            Self::Index(index) => Cow::Owned(index.to_string()),
        }
    }

    /// Compare segments the way a document lookup would
    ///
    /// `Key("2")` and `Index(2)` address the same location.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Key(a), Self::Key(b)) => a == b,
            (Self::Index(a), Self::Index(b)) => a == b,
            (Self::Key(_), Self::Index(index)) | (Self::Index(index), Self::Key(_)) => {
                self.to_key() == other.to_key() && self.as_index() == Some(*index)
            }
        }
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(name) => f.write_str(name),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

impl From<&str> for Segment {
    fn from(name: &str) -> Self {
        Self::Key(name.to_owned())
    }
}

impl From<String> for Segment {
    fn from(name: String) -> Self {
        Self::Key(name)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Address of a value within a document tree
///
/// Rendered as dot-separated property names with bracketed array indices.
///
/// # Examples
/// - `["server", "port"]` → `server.port`
/// - `["methods", 0]` → `methods[0]`
/// - `[]` → `` (the document root)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PathAddress(Vec<Segment>);

impl PathAddress {
    /// The document root
    pub const ROOT: Self = Self(Vec::new());

    /// Create address from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    /// Empty address (root)
    #[inline]
    #[must_use]
    pub const fn root() -> Self {
        Self::ROOT
    }

    /// Parse a path expression
    ///
    /// # Errors
    /// Returns [`PathError`] if the expression is malformed
    #[inline]
    pub fn parse(expr: &str) -> Result<Self, PathError> {
        expr.parse()
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if address is empty (root)
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if address is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent address (if not root)
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.split_last().map(|(_, parent)| parent)
    }

    /// Split into last segment and parent address
    #[must_use]
    pub fn split_last(&self) -> Option<(&Segment, Self)> {
        let (last, rest) = self.0.split_last()?;
        Some((last, Self(rest.to_vec())))
    }

    /// Get last segment (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    /// Get first segment (if not root)
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<&Segment> {
        self.0.first()
    }

    /// Append a segment, returning new address
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<Segment>) -> Self {
        let mut new = self.clone();
        new.0.push(segment.into());
        new
    }

    /// Append every segment of `other`, returning new address
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut new = self.clone();
        new.0.extend(other.0.iter().cloned());
        new
    }

    /// Push a segment in place
    #[inline]
    pub fn push(&mut self, segment: impl Into<Segment>) {
        self.0.push(segment.into());
    }

    /// Remove the last segment in place
    #[inline]
    pub fn pop(&mut self) -> Option<Segment> {
        self.0.pop()
    }

    /// Check if this address equals or is nested under `prefix`
    ///
    /// # Examples
    /// - `s.b.c` starts with `s.b`
    /// - `s.b` starts with `s.b`
    /// - `s.bc` does NOT start with `s.b`
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        prefix.0.len() <= self.0.len()
            && prefix.0.iter().zip(&self.0).all(|(a, b)| a.same_as(b))
    }

    /// Check if this address is a strict ancestor of another
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && other.starts_with(self)
    }

    /// Get relative address from ancestor
    ///
    /// # Errors
    /// Returns error if `self` is not nested under `ancestor`
    pub fn relative_to(&self, ancestor: &Self) -> Result<Self, PathError> {
        if !self.starts_with(ancestor) {
            return Err(PathError::NotDescendant {
                path: self.to_string(),
                ancestor: ancestor.to_string(),
            });
        }
        Ok(Self(self.0[ancestor.0.len()..].to_vec()))
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.0.iter()
    }

    /// Look up the value at this address
    #[must_use]
    pub fn resolve<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        let mut current = root;
        for segment in &self.0 {
            current = match current {
                Value::Object(map) => map.get(&*segment.to_key())?,
                Value::Array(items) => items.get(segment.as_index()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Look up the value at this address for mutation
    #[must_use]
    pub fn resolve_mut<'v>(&self, root: &'v mut Value) -> Option<&'v mut Value> {
        let mut current = root;
        for segment in &self.0 {
            current = match current {
                Value::Object(map) => map.get_mut(&*segment.to_key())?,
                Value::Array(items) => items.get_mut(segment.as_index()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Render as an RFC 6901 JSON pointer
    #[must_use]
    pub fn to_pointer(&self) -> String {
        self.0
            .iter()
            .map(|segment| {
                format!("/{}", segment.to_key().replace('~', "~0").replace('/', "~1"))
            })
            .collect()
    }

    /// Build an address from an RFC 6901 JSON pointer
    ///
    /// Numeric tokens become index segments.
    ///
    /// # Errors
    /// Returns error if the pointer is neither empty nor starts with `/`
    pub fn from_pointer(pointer: &str) -> Result<Self, PathError> {
        if pointer.is_empty() {
            return Ok(Self::root());
        }
        let Some(body) = pointer.strip_prefix('/') else {
            return Err(PathError::InvalidPointer(pointer.to_owned()));
        };
        let segments = body
            .split('/')
            .map(|token| {
                let token = token.replace("~1", "/").replace("~0", "~");
                let segment = Segment::Key(token);
                match segment.as_index() {
                    Some(index) => Segment::Index(index),
                    None => segment,
                }
            })
            .collect();
        Ok(Self(segments))
    }
}

impl Display for PathAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.0.iter().enumerate() {
            if position > 0 && !segment.is_index() {
                f.write_str(".")?;
            }
            Display::fmt(segment, f)?;
        }
        Ok(())
    }
}

impl FromStr for PathAddress {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = tokenize(s)?
            .into_iter()
            .map(|token| match token {
                Token::Name(name) => Ok(Segment::key(name)),
                Token::Bracket(inner) => parse_index(s, inner).map(Segment::Index),
            })
            .collect::<Result<_, _>>()?;
        Ok(Self(segments))
    }
}

impl From<Vec<Segment>> for PathAddress {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl From<&[Segment]> for PathAddress {
    fn from(segments: &[Segment]) -> Self {
        Self(segments.to_vec())
    }
}

impl Serialize for PathAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PathAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let expr = String::deserialize(deserializer)?;
        expr.parse().map_err(de::Error::custom)
    }
}

/// Anything the document API accepts as an address
///
/// Implemented for string expressions (parsed on use) and for addresses.
pub trait IntoAddress {
    /// Convert into an address
    ///
    /// # Errors
    /// Returns error if a string expression is malformed
    fn into_address(self) -> Result<PathAddress, PathError>;
}

impl IntoAddress for PathAddress {
    #[inline]
    fn into_address(self) -> Result<PathAddress, PathError> {
        Ok(self)
    }
}

impl IntoAddress for &PathAddress {
    #[inline]
    fn into_address(self) -> Result<PathAddress, PathError> {
        Ok(self.clone())
    }
}

impl IntoAddress for &str {
    #[inline]
    fn into_address(self) -> Result<PathAddress, PathError> {
        self.parse()
    }
}

impl IntoAddress for String {
    #[inline]
    fn into_address(self) -> Result<PathAddress, PathError> {
        self.parse()
    }
}

impl IntoAddress for &String {
    #[inline]
    fn into_address(self) -> Result<PathAddress, PathError> {
        self.parse()
    }
}

/// Raw lexical piece of a path expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// Text between separators
    Name(&'a str),
    /// Text between `[` and `]`
    Bracket(&'a str),
}

/// Split an expression into names and bracket groups
pub(crate) fn tokenize(expr: &str) -> Result<Vec<Token<'_>>, PathError> {
    let mut tokens = Vec::new();
    if expr.is_empty() {
        return Ok(tokens);
    }

    let mut rest = expr;
    let mut after_dot = false;
    loop {
        if let Some(after) = rest.strip_prefix('[') {
            if after_dot {
                return Err(PathError::EmptySegment(expr.to_owned()));
            }
            let close = after
                .find(']')
                .ok_or_else(|| PathError::UnclosedBracket(expr.to_owned()))?;
            tokens.push(Token::Bracket(&after[..close]));
            rest = &after[close + 1..];
        } else {
            let end = rest
                .find(|c: char| matches!(c, '.' | '[' | ']'))
                .unwrap_or(rest.len());
            if end == 0 {
                return Err(match rest.chars().next() {
                    Some(found @ ']') => PathError::UnexpectedCharacter {
                        expr: expr.to_owned(),
                        found,
                    },
                    _ => PathError::EmptySegment(expr.to_owned()),
                });
            }
            tokens.push(Token::Name(&rest[..end]));
            rest = &rest[end..];
        }

        after_dot = false;
        match rest.chars().next() {
            None => return Ok(tokens),
            Some('.') => {
                rest = &rest[1..];
                after_dot = true;
            }
            Some('[') => {}
            Some(found) => {
                return Err(PathError::UnexpectedCharacter {
                    expr: expr.to_owned(),
                    found,
                })
            }
        }
    }
}

/// Parse the contents of a bracket group as an array index
pub(crate) fn parse_index(expr: &str, inner: &str) -> Result<usize, PathError> {
    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PathError::InvalidIndex {
            expr: expr.to_owned(),
            index: inner.to_owned(),
        });
    }
    inner.parse().map_err(|_| PathError::InvalidIndex {
        expr: expr.to_owned(),
        index: inner.to_owned(),
    })
}

/// Errors related to path expressions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path '{0}' contains an empty segment")]
    EmptySegment(String),

    /// `[` without matching `]`
    #[error("path '{0}' has an unclosed bracket")]
    UnclosedBracket(String),

    /// Character that cannot appear at this position
    #[error("path '{expr}' has unexpected character '{found}'")]
    UnexpectedCharacter { expr: String, found: char },

    /// Bracket content is not a non-negative integer
    #[error("path '{expr}' has invalid index '{index}'")]
    InvalidIndex { expr: String, index: String },

    /// JSON pointer without leading `/`
    #[error("invalid JSON pointer '{0}'")]
    InvalidPointer(String),

    /// Not a descendant path
    #[error("path '{path}' is not a descendant of '{ancestor}'")]
    NotDescendant { path: String, ancestor: String },
}
