//! The recognizer seam.
//!
//! A recognizer tries to interpret raw text as one specific format. It is a
//! pure function of the text and the catalog snapshot it is handed; it keeps
//! no state between calls.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{ReferenceSnapshot, TypeId};

/// One interpreted line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Catalog identity when the name resolved.
    pub type_id: Option<TypeId>,
    pub name: String,
    pub quantity: u64,
    /// Format-specific trailing detail (location, group, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
}

impl LineItem {
    pub fn new(type_id: Option<TypeId>, name: impl Into<String>, quantity: u64) -> Self {
        Self {
            type_id,
            name: name.into(),
            quantity,
            extra: None,
        }
    }
}

/// Items produced by a recognizer together with the lines it skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedItems {
    pub items: Vec<LineItem>,
    /// `(line number, line)` pairs, zero-based.
    pub unparsed_lines: Vec<(usize, String)>,
}

impl ParsedItems {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Outcome of a single recognizer attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Recognized(ParsedItems),
    Declined,
}

/// A recognizer failed internally on its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("recognizer panicked: {0}")]
    Panicked(String),
}

/// A format recognizer.
pub trait Recognizer: Send + Sync {
    /// Stable identity used for ordering, diagnostics and result attribution.
    fn name(&self) -> &'static str;

    /// Try to interpret `text` against `snapshot`.
    fn attempt(&self, text: &str, snapshot: &ReferenceSnapshot) -> Result<Attempt, RecognitionError>;
}

/// The last-resort recognizer. It never declines, so every input yields some
/// interpretation.
pub trait FallbackRecognizer: Send + Sync {
    fn name(&self) -> &'static str;

    fn interpret(&self, text: &str, snapshot: &ReferenceSnapshot) -> ParsedItems;
}

/// Non-blank lines with their zero-based line numbers.
pub fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(n, line)| (n, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

/// Parse a quantity such as `1,250`, `1.250` or `3`.
///
/// Thousands separators are accepted only in groups of three digits.
pub fn parse_quantity(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.chars().all(|c| c.is_ascii_digit()) {
        return raw.parse().ok();
    }

    let sep = if raw.contains(',') { ',' } else { '.' };
    let mut groups = raw.split(sep);
    let head = groups.next()?;
    if head.is_empty() || head.len() > 3 || !head.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut digits = head.to_string();
    for group in groups {
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        digits.push_str(group);
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity("3"), Some(3));
        assert_eq!(parse_quantity("1,250"), Some(1250));
        assert_eq!(parse_quantity("12.500.000"), Some(12_500_000));
        assert_eq!(parse_quantity("1,25"), None);
        assert_eq!(parse_quantity("x3"), None);
        assert_eq!(parse_quantity(""), None);
    }

    #[test]
    fn skips_blank_lines() {
        let lines: Vec<_> = content_lines("a\n\n  \n b ").collect();
        assert_eq!(lines, vec![(0, "a"), (3, "b")]);
    }
}
