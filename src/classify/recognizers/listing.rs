//! Free-form item listing: one item per line with an optional quantity.

use crate::catalog::{ItemMeta, ReferenceSnapshot};
use crate::classify::recognizer::{
    content_lines, parse_quantity, Attempt, LineItem, ParsedItems, RecognitionError, Recognizer,
};

/// Recognizes lines such as `10 Tritanium`, `10x Tritanium`,
/// `Tritanium x10`, `Tritanium 10` or a bare `Tritanium`.
///
/// Every name must resolve in the catalog; lines that do not are reported
/// as unparsed.
#[derive(Debug, Default)]
pub struct ListingRecognizer;

impl ListingRecognizer {
    fn parse_line<'s>(line: &str, snapshot: &'s ReferenceSnapshot) -> Option<(&'s ItemMeta, u64)> {
        if let Some(meta) = snapshot.find_by_name(line) {
            return Some((meta, 1));
        }

        // Leading quantity: "10 Name", "10x Name", "10 x Name".
        if let Some((head, rest)) = line.split_once(char::is_whitespace) {
            let head = head.strip_suffix(&['x', 'X'][..]).unwrap_or(head);
            let rest = rest.trim_start();
            let rest = rest
                .strip_prefix("x ")
                .or_else(|| rest.strip_prefix("X "))
                .unwrap_or(rest);
            if let (Some(quantity), Some(meta)) = (parse_quantity(head), snapshot.find_by_name(rest)) {
                return Some((meta, quantity));
            }
        }

        // Trailing quantity: "Name 10", "Name x10", "Name x 10".
        if let Some((rest, tail)) = line.rsplit_once(char::is_whitespace) {
            let tail = tail.strip_prefix(&['x', 'X'][..]).unwrap_or(tail);
            let rest = rest.trim_end();
            let rest = rest
                .strip_suffix(" x")
                .or_else(|| rest.strip_suffix(" X"))
                .unwrap_or(rest);
            if let (Some(quantity), Some(meta)) = (parse_quantity(tail), snapshot.find_by_name(rest)) {
                return Some((meta, quantity));
            }
        }

        None
    }
}

impl Recognizer for ListingRecognizer {
    fn name(&self) -> &'static str {
        "listing"
    }

    fn attempt(&self, text: &str, snapshot: &ReferenceSnapshot) -> Result<Attempt, RecognitionError> {
        let mut parsed = ParsedItems::default();

        for (n, line) in content_lines(text) {
            match Self::parse_line(line, snapshot) {
                Some((meta, quantity)) => {
                    parsed
                        .items
                        .push(LineItem::new(Some(meta.type_id), meta.name.clone(), quantity));
                }
                None => parsed.unparsed_lines.push((n, line.to_string())),
            }
        }

        if parsed.is_empty() {
            Ok(Attempt::Declined)
        } else {
            Ok(Attempt::Recognized(parsed))
        }
    }
}
