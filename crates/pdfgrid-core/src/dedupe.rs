//! Duplicate character removal.
//!
//! Some generators fake bold text by painting every glyph twice at the same
//! position. Such copies are dropped before word assembly.

use std::collections::HashSet;

use crate::text::Char;

/// Identity of a glyph for duplicate detection: text plus exact box.
fn key(ch: &Char) -> (&str, [u64; 4]) {
    (
        ch.text.as_str(),
        [
            ch.bbox.x0.to_bits(),
            ch.bbox.top.to_bits(),
            ch.bbox.x1.to_bits(),
            ch.bbox.bottom.to_bits(),
        ],
    )
}

/// Remove characters whose text and bounding box exactly match an earlier one.
///
/// The first occurrence in the input order is kept; order is preserved.
pub fn dedupe_chars(chars: &[Char]) -> Vec<Char> {
    let mut seen = HashSet::with_capacity(chars.len());
    chars
        .iter()
        .filter(|ch| seen.insert(key(ch)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BBox;

    fn make_char(text: &str, x0: f64, top: f64, seq: usize) -> Char {
        Char {
            text: text.to_string(),
            bbox: BBox::new(x0, top, x0 + 6.0, top + 12.0),
            fontname: "Helvetica-Bold".to_string(),
            size: 12.0,
            baseline: top + 9.0,
            upright: true,
            seq,
        }
    }

    #[test]
    fn exact_duplicates_are_removed() {
        let chars = vec![
            make_char("A", 10.0, 20.0, 0),
            make_char("A", 10.0, 20.0, 1),
            make_char("B", 16.0, 20.0, 2),
        ];
        let out = dedupe_chars(&chars);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].seq, 0);
        assert_eq!(out[1].text, "B");
    }

    #[test]
    fn offset_copies_are_kept() {
        // Not an exact coordinate match, so both survive.
        let chars = vec![make_char("A", 10.0, 20.0, 0), make_char("A", 10.5, 20.0, 1)];
        assert_eq!(dedupe_chars(&chars).len(), 2);
    }

    #[test]
    fn same_position_different_text_kept() {
        let chars = vec![make_char("A", 10.0, 20.0, 0), make_char("B", 10.0, 20.0, 1)];
        assert_eq!(dedupe_chars(&chars).len(), 2);
    }

    #[test]
    fn empty_input() {
        assert!(dedupe_chars(&[]).is_empty());
    }
}
