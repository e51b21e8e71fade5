//! Tab-separated asset export: `name<TAB>quantity[<TAB>...]`.

use crate::catalog::ReferenceSnapshot;
use crate::classify::recognizer::{
    content_lines, parse_quantity, Attempt, LineItem, ParsedItems, RecognitionError, Recognizer,
};

/// Strict recognizer for tab-separated exports.
///
/// Every non-blank line must contain a tab. A blank quantity column means a
/// single unstacked item.
#[derive(Debug, Default)]
pub struct AssetsRecognizer;

impl Recognizer for AssetsRecognizer {
    fn name(&self) -> &'static str {
        "assets"
    }

    fn attempt(&self, text: &str, snapshot: &ReferenceSnapshot) -> Result<Attempt, RecognitionError> {
        let mut parsed = ParsedItems::default();

        for (n, line) in content_lines(text) {
            let mut columns = line.split('\t');
            let name = columns.next().unwrap_or_default().trim();
            let quantity_column = match columns.next() {
                Some(column) => column.trim(),
                None => return Ok(Attempt::Declined),
            };

            let quantity = if quantity_column.is_empty() {
                1
            } else {
                match parse_quantity(quantity_column) {
                    Some(quantity) => quantity,
                    None if quantity_column.starts_with(|c: char| c.is_ascii_digit()) => {
                        return Err(RecognitionError::Malformed {
                            line: n,
                            reason: format!("bad quantity '{}'", quantity_column),
                        });
                    }
                    None => return Ok(Attempt::Declined),
                }
            };

            match snapshot.find_by_name(name) {
                Some(meta) => {
                    let mut item = LineItem::new(Some(meta.type_id), meta.name.clone(), quantity);
                    let rest: Vec<&str> = columns.map(str::trim).filter(|c| !c.is_empty()).collect();
                    if !rest.is_empty() {
                        item.extra = Some(rest.join(" / "));
                    }
                    parsed.items.push(item);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemMeta;

    fn catalog() -> ReferenceSnapshot {
        ReferenceSnapshot::build(
            1,
            vec![ItemMeta::new(34, "Tritanium"), ItemMeta::new(587, "Rifter")],
        )
        .unwrap()
    }

    #[test]
    fn recognizes_tab_rows() {
        let text = "Tritanium\t1,000\tMineral\nRifter\t\tFrigate\nUnknown Thing\t3\n";
        let attempt = AssetsRecognizer.attempt(text, &catalog()).unwrap();

        let Attempt::Recognized(parsed) = attempt else {
            panic!("expected a match");
        };
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.items[0].quantity, 1000);
        assert_eq!(parsed.items[0].extra.as_deref(), Some("Mineral"));
        assert_eq!(parsed.items[1].quantity, 1);
        assert_eq!(parsed.unparsed_lines, vec![(2, "Unknown Thing\t3".to_string())]);
    }

    #[test]
    fn declines_untabbed_text() {
        let attempt = AssetsRecognizer.attempt("10 Tritanium", &catalog()).unwrap();
        assert_eq!(attempt, Attempt::Declined);
    }

    #[test]
    fn declines_when_nothing_resolves() {
        let attempt = AssetsRecognizer.attempt("Veldspar\t5", &catalog()).unwrap();
        assert_eq!(attempt, Attempt::Declined);
    }

    #[test]
    fn malformed_quantity_is_an_error() {
        let err = AssetsRecognizer.attempt("Tritanium\t1,00", &catalog()).unwrap_err();
        assert!(matches!(err, RecognitionError::Malformed { line: 0, .. }));
    }
}
