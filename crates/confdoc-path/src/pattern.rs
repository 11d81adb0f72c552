//! Path patterns
//!
//! A [`PathPattern`] is a path expression in which some segments are
//! wildcards:
//!
//! - `*` matches exactly one segment (key or index)
//! - `[*]` matches exactly one index segment
//! - `**` matches zero or more segments
//!
//! `entities.*.fields.*.config` therefore describes the `config` property of
//! any field of any entity without naming either.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::path::{parse_index, tokenize, PathAddress, PathError, Segment, Token};

/// One step of a [`PathPattern`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternSegment {
    /// Matches an equal segment
    Exact(Segment),
    /// `*`
    AnySegment,
    /// `[*]`
    AnyIndex,
    /// `**`
    AnyDepth,
}

impl PatternSegment {
    fn accepts(&self, segment: &Segment) -> bool {
        match self {
            Self::Exact(expected) => expected.same_as(segment),
            Self::AnySegment | Self::AnyDepth => true,
            Self::AnyIndex => segment.as_index().is_some(),
        }
    }
}

/// Path-shaped matcher over [`PathAddress`] values
///
/// Matching runs a small NFA over the pattern positions, so `**` never
/// needs backtracking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathPattern {
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    /// Create pattern from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<PatternSegment>) -> Self {
        Self { segments }
    }

    /// Parse a pattern expression
    ///
    /// # Errors
    /// Returns [`PathError`] if the expression is malformed
    #[inline]
    pub fn parse(expr: &str) -> Result<Self, PathError> {
        expr.parse()
    }

    /// Pattern segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    /// Whether the pattern contains no wildcard
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, PatternSegment::Exact(_)))
    }

    /// Whether the whole address matches
    #[must_use]
    pub fn matches(&self, address: &PathAddress) -> bool {
        self.run(address.segments()).is_some_and(|states| states[self.segments.len()])
    }

    /// Whether the address, or one of its ancestors, matches
    ///
    /// This is the prefix test used for restricted subtrees: a pattern
    /// `s.b` covers `s.b`, `s.b.c` and everything below.
    #[must_use]
    pub fn matches_prefix_of(&self, address: &PathAddress) -> bool {
        let accept = self.segments.len();
        let mut states = self.initial();
        if states[accept] {
            return true;
        }
        for segment in address.iter() {
            states = self.step(&states, segment);
            if states[accept] {
                return true;
            }
            if !states.contains(&true) {
                return false;
            }
        }
        false
    }

    /// Whether some strict descendant of the address could match
    ///
    /// True when the address is consumed by a proper prefix of the pattern.
    #[must_use]
    pub fn may_match_below(&self, address: &PathAddress) -> bool {
        self.run(address.segments())
            .is_some_and(|states| states[..self.segments.len()].contains(&true))
    }

    fn run(&self, segments: &[Segment]) -> Option<Vec<bool>> {
        let mut states = self.initial();
        for segment in segments {
            states = self.step(&states, segment);
            if !states.contains(&true) {
                return None;
            }
        }
        Some(states)
    }

    fn initial(&self) -> Vec<bool> {
        let mut states = vec![false; self.segments.len() + 1];
        states[0] = true;
        self.close(&mut states);
        states
    }

    fn step(&self, states: &[bool], segment: &Segment) -> Vec<bool> {
        let mut next = vec![false; states.len()];
        for (position, pattern) in self.segments.iter().enumerate() {
            if !states[position] || !pattern.accepts(segment) {
                continue;
            }
            match pattern {
                PatternSegment::AnyDepth => next[position] = true,
                _ => next[position + 1] = true,
            }
        }
        self.close(&mut next);
        next
    }

    /// `**` may also match nothing
    fn close(&self, states: &mut [bool]) {
        for (position, pattern) in self.segments.iter().enumerate() {
            if states[position] && *pattern == PatternSegment::AnyDepth {
                states[position + 1] = true;
            }
        }
    }
}

impl Display for PathPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            let bracketed = matches!(
                segment,
                PatternSegment::AnyIndex | PatternSegment::Exact(Segment::Index(_))
            );
            if position > 0 && !bracketed {
                f.write_str(".")?;
            }
            match segment {
                PatternSegment::Exact(segment) => Display::fmt(segment, f)?,
                PatternSegment::AnySegment => f.write_str("*")?,
                PatternSegment::AnyIndex => f.write_str("[*]")?,
                PatternSegment::AnyDepth => f.write_str("**")?,
            }
        }
        Ok(())
    }
}

impl FromStr for PathPattern {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments = tokenize(s)?
            .into_iter()
            .map(|token| match token {
                Token::Name("*") => Ok(PatternSegment::AnySegment),
                Token::Name("**") => Ok(PatternSegment::AnyDepth),
                Token::Name(name) => Ok(PatternSegment::Exact(Segment::key(name))),
                Token::Bracket("*") => Ok(PatternSegment::AnyIndex),
                Token::Bracket(inner) => {
                    parse_index(s, inner).map(|index| PatternSegment::Exact(Segment::Index(index)))
                }
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { segments })
    }
}

impl From<PathAddress> for PathPattern {
    fn from(address: PathAddress) -> Self {
        Self {
            segments: address
                .segments()
                .iter()
                .cloned()
                .map(PatternSegment::Exact)
                .collect(),
        }
    }
}

impl Serialize for PathPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PathPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let expr = String::deserialize(deserializer)?;
        expr.parse().map_err(de::Error::custom)
    }
}
