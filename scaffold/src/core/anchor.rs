//! Anchor matching over file content.
//!
//! Anchors are content-based, never line-number based, so a location stays
//! valid after earlier mutations shift the surrounding text.

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

/// Location used to place or match an edit inside a file.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawAnchor")]
pub enum Anchor {
    /// Exact substring; the first occurrence from the start of the file wins.
    Literal(String),
    /// Regular expression in multi-line mode (`^`/`$` match at line boundaries).
    Pattern(Regex),
}

/// Byte range of a located anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Anchor {
    pub fn literal(text: impl Into<String>) -> Self {
        Anchor::Literal(text.into())
    }

    /// Compile a pattern anchor, reporting the regex error text on failure.
    pub fn pattern(pattern: &str) -> Result<Self, String> {
        if pattern.is_empty() {
            return Err("pattern anchor must not be empty".to_string());
        }
        RegexBuilder::new(pattern)
            .multi_line(true)
            .build()
            .map(Anchor::Pattern)
            .map_err(|err| format!("invalid pattern {pattern:?}: {err}"))
    }

    /// Source text of the anchor, used in error messages.
    pub fn as_str(&self) -> &str {
        match self {
            Anchor::Literal(text) => text,
            Anchor::Pattern(regex) => regex.as_str(),
        }
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, Anchor::Pattern(_))
    }
}

impl PartialEq for Anchor {
    fn eq(&self, other: &Self) -> bool {
        self.is_pattern() == other.is_pattern() && self.as_str() == other.as_str()
    }
}

impl Eq for Anchor {}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::Literal(text) => write!(f, "{text:?}"),
            Anchor::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// Locate the first match of `anchor` in `content`.
///
/// Returns `None` when nothing matches; callers decide whether that is fatal.
pub fn locate(content: &str, anchor: &Anchor) -> Option<Span> {
    match anchor {
        Anchor::Literal(text) => {
            if text.is_empty() {
                return None;
            }
            content.find(text.as_str()).map(|start| Span {
                start,
                end: start + text.len(),
            })
        }
        Anchor::Pattern(regex) => regex.find(content).map(|m| Span {
            start: m.start(),
            end: m.end(),
        }),
    }
}

/// Every non-overlapping match of `anchor`, in order.
pub fn locate_all(content: &str, anchor: &Anchor) -> Vec<Span> {
    match anchor {
        Anchor::Literal(text) if text.is_empty() => Vec::new(),
        Anchor::Literal(text) => content
            .match_indices(text.as_str())
            .map(|(start, found)| Span {
                start,
                end: start + found.len(),
            })
            .collect(),
        Anchor::Pattern(regex) => regex
            .find_iter(content)
            .map(|m| Span {
                start: m.start(),
                end: m.end(),
            })
            .collect(),
    }
}

/// Accepted TOML/JSON shapes for an anchor.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAnchor {
    Text(String),
    Literal { literal: String },
    Pattern { pattern: String },
}

impl TryFrom<RawAnchor> for Anchor {
    type Error = String;

    fn try_from(raw: RawAnchor) -> Result<Self, Self::Error> {
        match raw {
            RawAnchor::Text(text) | RawAnchor::Literal { literal: text } => {
                if text.is_empty() {
                    return Err("literal anchor must not be empty".to_string());
                }
                Ok(Anchor::Literal(text))
            }
            RawAnchor::Pattern { pattern } => Anchor::pattern(&pattern),
        }
    }
}
