//! Glyph metrics from PDF font dictionaries.
//!
//! Simple fonts carry `/Widths` indexed from `/FirstChar`; composite (Type0)
//! fonts carry `/DW` and `/W` on their descendant CIDFont. Ascent and descent
//! come from the `/FontDescriptor`. All values are in glyph space (1/1000 of
//! text space).

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object};

/// Ascent when the descriptor does not give one.
pub const DEFAULT_ASCENT: f64 = 750.0;
/// Descent when the descriptor does not give one.
pub const DEFAULT_DESCENT: f64 = -250.0;
/// Width of glyphs without a width entry in simple fonts.
pub const DEFAULT_WIDTH: f64 = 600.0;
/// `/DW` default for composite fonts.
const DEFAULT_CID_WIDTH: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FontMetrics {
    first_char: u32,
    widths: Vec<f64>,
    /// Per-code widths from a `/W` array.
    cid_widths: HashMap<u32, f64>,
    missing_width: f64,
    ascent: f64,
    descent: f64,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            missing_width: DEFAULT_WIDTH,
            ascent: DEFAULT_ASCENT,
            descent: DEFAULT_DESCENT,
        }
    }
}

impl FontMetrics {
    pub fn new(first_char: u32, widths: Vec<f64>, missing_width: f64, ascent: f64, descent: f64) -> Self {
        Self {
            first_char,
            widths,
            missing_width,
            ascent,
            descent,
            ..Self::default()
        }
    }

    /// Advance width of `code`.
    pub fn width(&self, code: u32) -> f64 {
        if let Some(w) = self.cid_widths.get(&code) {
            return *w;
        }
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .unwrap_or(self.missing_width)
    }

    pub fn ascent(&self) -> f64 {
        self.ascent
    }

    pub fn descent(&self) -> f64 {
        self.descent
    }
}

/// Follow indirect references.
pub(crate) fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> &'a Object {
    // Reference chains are short; the bound stops cycles.
    for _ in 0..16 {
        match obj {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(target) => obj = target,
                Err(_) => return obj,
            },
            _ => return obj,
        }
    }
    obj
}

pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

pub(crate) fn dict_number(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<f64> {
    dict.get(key).ok().map(|o| resolve(doc, o)).and_then(number)
}

pub(crate) fn dict_dict<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    dict.get(key)
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| match o {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        })
}

pub(crate) fn dict_array<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a [Object]> {
    dict.get(key)
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .map(Vec::as_slice)
}

/// `(ascent, descent, missing_width)` from `/FontDescriptor`.
fn descriptor_values(doc: &Document, font: &Dictionary) -> (f64, f64, Option<f64>) {
    let Some(desc) = dict_dict(doc, font, b"FontDescriptor") else {
        return (DEFAULT_ASCENT, DEFAULT_DESCENT, None);
    };
    let ascent = dict_number(doc, desc, b"Ascent")
        .filter(|a| *a != 0.0)
        .unwrap_or(DEFAULT_ASCENT);
    let descent = dict_number(doc, desc, b"Descent")
        .filter(|d| *d != 0.0)
        .unwrap_or(DEFAULT_DESCENT);
    (ascent, descent, dict_number(doc, desc, b"MissingWidth"))
}

/// Metrics of a simple (single-byte) font.
pub fn simple_font_metrics(doc: &Document, font: &Dictionary) -> FontMetrics {
    let first_char = dict_number(doc, font, b"FirstChar").map_or(0, |v| v.max(0.0) as u32);
    let widths = dict_array(doc, font, b"Widths")
        .map(|arr| {
            arr.iter()
                .map(|o| number(resolve(doc, o)).unwrap_or(0.0))
                .collect()
        })
        .unwrap_or_default();
    let (ascent, descent, missing) = descriptor_values(doc, font);
    FontMetrics::new(
        first_char,
        widths,
        missing.unwrap_or(DEFAULT_WIDTH),
        ascent,
        descent,
    )
}

/// Metrics of a Type0 font, read from its first descendant CIDFont.
pub fn composite_font_metrics(doc: &Document, font: &Dictionary) -> FontMetrics {
    let descendant = dict_array(doc, font, b"DescendantFonts")
        .and_then(|arr| arr.first())
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok());
    let Some(cid_font) = descendant else {
        return FontMetrics {
            missing_width: DEFAULT_CID_WIDTH,
            ..FontMetrics::default()
        };
    };

    let (ascent, descent, _) = descriptor_values(doc, cid_font);
    let cid_widths = dict_array(doc, cid_font, b"W")
        .map(|w| parse_cid_widths(doc, w))
        .unwrap_or_default();
    FontMetrics {
        cid_widths,
        missing_width: dict_number(doc, cid_font, b"DW").unwrap_or(DEFAULT_CID_WIDTH),
        ascent,
        descent,
        ..FontMetrics::default()
    }
}

/// Parse a `/W` array: `c [w1 w2 ...]` and `c_first c_last w` entries.
fn parse_cid_widths(doc: &Document, w: &[Object]) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < w.len() {
        let Some(start) = number(resolve(doc, &w[i])) else {
            break;
        };
        let start = start.max(0.0) as u32;
        match w.get(i + 1).map(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                for (offset, width) in list.iter().enumerate() {
                    if let Some(width) = number(resolve(doc, width)) {
                        widths.insert(start + offset as u32, width);
                    }
                }
                i += 2;
            }
            Some(end) => {
                let (Some(end), Some(width)) = (
                    number(end),
                    w.get(i + 2).map(|o| resolve(doc, o)).and_then(number),
                ) else {
                    break;
                };
                let end = (end.max(0.0) as u32).min(start.saturating_add(0xFFFF));
                for code in start..=end {
                    widths.insert(code, width);
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn width_lookup_within_and_outside_range() {
        let m = FontMetrics::new(32, vec![250.0, 333.0, 408.0], 500.0, 718.0, -207.0);
        assert_eq!(m.width(32), 250.0);
        assert_eq!(m.width(34), 408.0);
        assert_eq!(m.width(35), 500.0);
        assert_eq!(m.width(10), 500.0);
    }

    #[test]
    fn defaults_without_font_info() {
        let m = FontMetrics::default();
        assert_eq!(m.width(65), DEFAULT_WIDTH);
        assert_eq!(m.ascent(), DEFAULT_ASCENT);
        assert_eq!(m.descent(), DEFAULT_DESCENT);
    }

    #[test]
    fn simple_font_from_dictionary() {
        let mut doc = Document::with_version("1.5");
        let desc_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "Ascent" => 718_i64,
            "Descent" => -207_i64,
        });
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "FirstChar" => 65_i64,
            "Widths" => vec![Object::Integer(667), Object::Integer(611)],
            "FontDescriptor" => desc_id,
        };
        let m = simple_font_metrics(&doc, &font);
        assert_eq!(m.width(65), 667.0);
        assert_eq!(m.width(66), 611.0);
        assert_eq!(m.width(67), DEFAULT_WIDTH);
        assert_eq!(m.ascent(), 718.0);
        assert_eq!(m.descent(), -207.0);
    }

    #[test]
    fn composite_font_w_array() {
        let mut doc = Document::with_version("1.5");
        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "DW" => 900_i64,
            "W" => vec![
                Object::Integer(1),
                Object::Array(vec![Object::Integer(500), Object::Integer(550)]),
                Object::Integer(10),
                Object::Integer(12),
                Object::Integer(300),
            ],
        });
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "DescendantFonts" => vec![Object::Reference(cid_font)],
        };
        let m = composite_font_metrics(&doc, &font);
        assert_eq!(m.width(1), 500.0);
        assert_eq!(m.width(2), 550.0);
        assert_eq!(m.width(11), 300.0);
        assert_eq!(m.width(13), 900.0);
    }

    #[test]
    fn composite_font_without_descendant() {
        let doc = Document::with_version("1.5");
        let m = composite_font_metrics(&doc, &dictionary! { "Subtype" => "Type0" });
        assert_eq!(m.width(7), 1000.0);
    }
}
