//! Last-resort scanner that looks for catalog names anywhere in a line.

use crate::catalog::ReferenceSnapshot;
use crate::classify::recognizer::{content_lines, parse_quantity, FallbackRecognizer, LineItem, ParsedItems};

/// For each line, takes the longest catalog name it contains and the first
/// other number on the line as the quantity (default 1).
#[derive(Debug, Default)]
pub struct HeuristicRecognizer;

fn quantity_outside(line: &str, name: &str) -> u64 {
    let lowered = line.to_lowercase();
    let remainder = match lowered.find(name) {
        Some(start) => format!("{} {}", &lowered[..start], &lowered[start + name.len()..]),
        None => lowered,
    };

    remainder
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != ',' && c != '.'))
        .map(|token| token.trim_start_matches('x').trim_end_matches('x'))
        .map(|token| token.trim_end_matches(&[',', '.'][..]))
        .find_map(parse_quantity)
        .filter(|quantity| *quantity > 0)
        .unwrap_or(1)
}

impl FallbackRecognizer for HeuristicRecognizer {
    fn name(&self) -> &'static str {
        super::FALLBACK_NAME
    }

    fn interpret(&self, text: &str, snapshot: &ReferenceSnapshot) -> ParsedItems {
        let mut parsed = ParsedItems::default();

        for (n, line) in content_lines(text) {
            match snapshot.longest_name_in(line) {
                Some(meta) => {
                    let quantity = quantity_outside(line, &meta.name.to_lowercase());
                    parsed
                        .items
                        .push(LineItem::new(Some(meta.type_id), meta.name.clone(), quantity));
                }
                None => parsed.unparsed_lines.push((n, line.to_string())),
            }
        }

        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemMeta;

    fn catalog() -> ReferenceSnapshot {
        ReferenceSnapshot::build(
            1,
            vec![
                ItemMeta::new(34, "Tritanium"),
                ItemMeta::new(2048, "Damage Control I"),
                ItemMeta::new(2046, "Damage Control II"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn finds_names_inside_noise() {
        let parsed = HeuristicRecognizer.interpret(
            "[12:01] You mined 4,500 units of Tritanium!\nDamage Control II (offline)\nnothing",
            &catalog(),
        );
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.items[0].type_id, Some(34));
        assert_eq!(parsed.items[0].quantity, 4500);
        assert_eq!(parsed.items[1].type_id, Some(2046));
        assert_eq!(parsed.items[1].quantity, 1);
        assert_eq!(parsed.unparsed_lines, vec![(2, "nothing".to_string())]);
    }

    #[test]
    fn quantity_after_name() {
        let parsed = HeuristicRecognizer.interpret("loot: Tritanium x250", &catalog());
        assert_eq!(parsed.items[0].quantity, 250);
    }

    #[test]
    fn empty_input_is_empty_interpretation() {
        let parsed = HeuristicRecognizer.interpret("   \n", &catalog());
        assert!(parsed.items.is_empty());
        assert!(parsed.unparsed_lines.is_empty());
    }
}
