//! Pattern specifications for expectation steps.
//!
//! A plain string always matches as a **literal** substring. Regular
//! expression semantics are opt-in through [`Pattern::regex`]; expected
//! output like `"0"` or `"$?"` is never silently reinterpreted as a regex.

use regex::bytes::Regex;

use crate::error::HarnessError;

/// One candidate pattern to recognize in the child's output stream.
///
/// Matching happens on raw bytes, so offsets reported by the matcher are
/// byte offsets into the session buffer regardless of encoding.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Exact substring containment.
    Literal(String),
    /// Greedy leftmost regex match (`regex::bytes` semantics).
    Regex(Regex),
}

impl Pattern {
    /// A pattern matching `text` as an exact substring.
    pub fn literal(text: impl Into<String>) -> Self {
        Pattern::Literal(text.into())
    }

    /// A pattern matching a regular expression against the output bytes.
    pub fn regex(pattern: &str) -> Result<Self, HarnessError> {
        Ok(Pattern::Regex(Regex::new(pattern)?))
    }

    /// Short description used in failure messages.
    pub fn describe(&self) -> String {
        match self {
            Pattern::Literal(text) => format!("literal {text:?}"),
            Pattern::Regex(re) => format!("regex /{}/", re.as_str()),
        }
    }
}

impl From<&str> for Pattern {
    fn from(text: &str) -> Self {
        Pattern::literal(text)
    }
}

impl From<String> for Pattern {
    fn from(text: String) -> Self {
        Pattern::Literal(text)
    }
}

/// An ordered set of candidate patterns.
///
/// Order defines priority: when two patterns match at the same offset, the
/// one with the lower index wins.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set of literal patterns, in the given priority order.
    pub fn literals<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        items
            .into_iter()
            .map(|s| Pattern::Literal(s.into()))
            .collect()
    }

    pub fn push(&mut self, pattern: Pattern) {
        self.patterns.push(pattern);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Pattern> {
        self.patterns.get(index)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Description of the whole set for failure messages.
    pub fn describe(&self) -> String {
        let parts: Vec<String> = self.patterns.iter().map(Pattern::describe).collect();
        parts.join(" | ")
    }
}

impl From<Pattern> for PatternSet {
    fn from(pattern: Pattern) -> Self {
        Self {
            patterns: vec![pattern],
        }
    }
}

impl FromIterator<Pattern> for PatternSet {
    fn from_iter<I: IntoIterator<Item = Pattern>>(iter: I) -> Self {
        Self {
            patterns: iter.into_iter().collect(),
        }
    }
}
