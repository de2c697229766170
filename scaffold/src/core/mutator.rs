//! Pure file mutations: content in, content out.
//!
//! The mutator never touches the filesystem. The pipeline runner resolves each
//! declared [`Mutation`](crate::core::types::Mutation) into an [`Edit`] (reading
//! templates, rendering variables) and stages whatever comes back.

use std::borrow::Cow;

use thiserror::Error;

use super::anchor::{Anchor, Span, locate};

/// A resolved edit against one file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit<'a> {
    InsertAfter {
        anchor: &'a Anchor,
        payload: Cow<'a, str>,
        idempotent_safe: bool,
    },
    InsertBefore {
        anchor: &'a Anchor,
        payload: Cow<'a, str>,
        idempotent_safe: bool,
    },
    Replace {
        pattern: &'a Anchor,
        replacement: Cow<'a, str>,
        first_only: bool,
    },
    /// Whole-file content for `copy_template` and `write_new`.
    Write { content: Vec<u8> },
}

/// Result of applying an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Changed(Vec<u8>),
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("anchor {anchor} not found")]
    AnchorNotFound { anchor: String },
    #[error("destination exists with different content")]
    WriteConflict,
    #[error("file does not exist")]
    FileMissing,
    #[error("file is not valid UTF-8")]
    NotUtf8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    After,
    Before,
}

/// Apply `edit` to the current content of a file (`None` when it does not exist).
pub fn apply(current: Option<&[u8]>, edit: &Edit<'_>) -> Result<Outcome, MutationError> {
    if let Edit::Write { content } = edit {
        return Ok(match current {
            None => Outcome::Changed(content.clone()),
            Some(existing) if existing == content.as_slice() => Outcome::Unchanged,
            Some(_) => return Err(MutationError::WriteConflict),
        });
    }

    let bytes = current.ok_or(MutationError::FileMissing)?;
    let text = std::str::from_utf8(bytes).map_err(|_| MutationError::NotUtf8)?;
    apply_text(text, edit)
}

/// Apply a text edit to UTF-8 content.
pub fn apply_text(content: &str, edit: &Edit<'_>) -> Result<Outcome, MutationError> {
    match edit {
        Edit::InsertAfter {
            anchor,
            payload,
            idempotent_safe,
        } => insert(content, anchor, payload, *idempotent_safe, Placement::After),
        Edit::InsertBefore {
            anchor,
            payload,
            idempotent_safe,
        } => insert(content, anchor, payload, *idempotent_safe, Placement::Before),
        Edit::Replace {
            pattern,
            replacement,
            first_only,
        } => Ok(replace(content, pattern, replacement, *first_only)),
        Edit::Write { .. } => apply(Some(content.as_bytes()), edit),
    }
}

fn insert(
    content: &str,
    anchor: &Anchor,
    payload: &str,
    idempotent_safe: bool,
    placement: Placement,
) -> Result<Outcome, MutationError> {
    let Some(span) = locate(content, anchor) else {
        if idempotent_safe && contains_payload(content, payload) {
            return Ok(Outcome::Unchanged);
        }
        return Err(MutationError::AnchorNotFound {
            anchor: anchor.to_string(),
        });
    };

    let line_payload = payload.ends_with('\n');
    let at = insertion_point(content, span, placement, line_payload);
    let present = match placement {
        Placement::After => {
            let region = &content[at..];
            region.starts_with(payload)
                || (line_payload && in_adjacent_block(region, payload, placement))
        }
        Placement::Before => {
            let region = &content[..at];
            region.ends_with(payload)
                || (line_payload && in_adjacent_block(region, payload, placement))
        }
    };
    if present {
        return Ok(Outcome::Unchanged);
    }

    // A line payload appended to a final line without a terminator needs one.
    let unterminated = !content.is_empty() && !content.ends_with('\n');
    let separator = if line_payload && at == content.len() && unterminated {
        "\n"
    } else {
        ""
    };
    let mut out = String::with_capacity(content.len() + separator.len() + payload.len());
    out.push_str(&content[..at]);
    out.push_str(separator);
    out.push_str(payload);
    out.push_str(&content[at..]);
    Ok(Outcome::Changed(out.into_bytes()))
}

/// Line payloads land on line boundaries even when the anchor matched mid-line.
fn insertion_point(content: &str, span: Span, placement: Placement, line_payload: bool) -> usize {
    if !line_payload {
        return match placement {
            Placement::After => span.end,
            Placement::Before => span.start,
        };
    }
    match placement {
        Placement::After => {
            if span.end == 0 || content[..span.end].ends_with('\n') {
                span.end
            } else {
                content[span.end..]
                    .find('\n')
                    .map(|idx| span.end + idx + 1)
                    .unwrap_or(content.len())
            }
        }
        Placement::Before => content[..span.start]
            .rfind('\n')
            .map(|idx| idx + 1)
            .unwrap_or(0),
    }
}

fn contains_payload(content: &str, payload: &str) -> bool {
    content.contains(payload) || (payload.ends_with('\n') && contains_lines(content, payload))
}

/// True if the payload's lines sit in the block of lines next to the insertion
/// point: the lines following it for `After`, the lines preceding it for `Before`.
///
/// The block ends at a blank line or at a line indented less than the payload,
/// such as the `end` closing the anchor's group. A payload containing blank
/// lines must match the adjacent lines exactly. Line endings and trailing
/// whitespace are normalized on both sides.
fn in_adjacent_block(region: &str, payload: &str, placement: Placement) -> bool {
    let mut needle: Vec<&str> = payload.lines().map(str::trim_end).collect();
    let mut lines: Vec<&str> = region.lines().map(str::trim_end).collect();
    if placement == Placement::Before {
        needle.reverse();
        lines.reverse();
    }
    if needle.is_empty() {
        return true;
    }
    if needle.iter().any(|line| line.is_empty()) {
        return lines.starts_with(&needle);
    }
    let indent = needle.iter().map(|line| indentation(line)).min().unwrap_or(0);
    let block: Vec<&str> = lines
        .into_iter()
        .take_while(|line| !line.is_empty() && indentation(line) >= indent)
        .collect();
    block
        .windows(needle.len())
        .any(|window| window == needle.as_slice())
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// True if the payload's lines appear as a consecutive run of whole lines.
///
/// Line endings and trailing whitespace are normalized on both sides.
fn contains_lines(haystack: &str, payload: &str) -> bool {
    let needle: Vec<&str> = payload.lines().map(str::trim_end).collect();
    if needle.is_empty() {
        return true;
    }
    let lines: Vec<&str> = haystack.lines().map(str::trim_end).collect();
    lines
        .windows(needle.len())
        .any(|window| window == needle.as_slice())
}

fn replace(content: &str, pattern: &Anchor, replacement: &str, first_only: bool) -> Outcome {
    let replaced = match pattern {
        Anchor::Literal(text) if first_only => content.replacen(text.as_str(), replacement, 1),
        Anchor::Literal(text) => content.replace(text.as_str(), replacement),
        Anchor::Pattern(regex) => {
            let limit = if first_only { 1 } else { 0 };
            regex.replacen(content, limit, replacement).into_owned()
        }
    };
    if replaced == content {
        Outcome::Unchanged
    } else {
        Outcome::Changed(replaced.into_bytes())
    }
}
