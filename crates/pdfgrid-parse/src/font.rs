//! Fonts as the interpreter sees them: code splitting, Unicode text and
//! metrics.

use lopdf::{Dictionary, Document, Object};

use crate::cmap::CMap;
use crate::font_metrics::{FontMetrics, composite_font_metrics, resolve, simple_font_metrics};

/// Windows-1252 code points for bytes 0x80..=0x9F.
const WIN_ANSI_HIGH: [char; 32] = [
    '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}', '\u{017D}', '\u{FFFD}',
    '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
];

/// One decoded glyph code.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub code: u32,
    pub text: String,
    /// A single-byte code 32, which receives word spacing.
    pub is_space: bool,
}

/// A resolved font resource.
#[derive(Debug, Clone, PartialEq)]
pub struct FontInfo {
    /// `/BaseFont`, without a subset prefix.
    pub name: String,
    pub metrics: FontMetrics,
    pub to_unicode: Option<CMap>,
    /// Type0 font with two-byte codes.
    pub composite: bool,
}

impl Default for FontInfo {
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            metrics: FontMetrics::default(),
            to_unicode: None,
            composite: false,
        }
    }
}

fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((prefix, rest)) if prefix.len() == 6 && prefix.bytes().all(|b| b.is_ascii_uppercase()) => {
            rest
        }
        _ => name,
    }
}

fn fallback_text(code: u32, composite: bool) -> String {
    if composite {
        return '\u{FFFD}'.to_string();
    }
    let c = match code {
        0x80..=0x9F => WIN_ANSI_HIGH[(code - 0x80) as usize],
        _ => char::from_u32(code).unwrap_or('\u{FFFD}'),
    };
    c.to_string()
}

impl FontInfo {
    /// Resolve a `/Font` resource dictionary.
    pub fn from_dictionary(doc: &Document, dict: &Dictionary) -> Self {
        let name = dict
            .get(b"BaseFont")
            .ok()
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_name().ok())
            .map(|n| strip_subset_prefix(&String::from_utf8_lossy(n)).to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let composite = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .is_some_and(|s| s == b"Type0");
        let metrics = if composite {
            composite_font_metrics(doc, dict)
        } else {
            simple_font_metrics(doc, dict)
        };
        Self {
            name,
            metrics,
            to_unicode: to_unicode(doc, dict),
            composite,
        }
    }

    /// Split a shown string into glyph codes with their text.
    pub fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        let codes: Vec<(u32, bool)> = if self.composite {
            bytes
                .chunks(2)
                .map(|c| {
                    let code = c.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
                    (code, false)
                })
                .collect()
        } else {
            bytes.iter().map(|&b| (u32::from(b), b == b' ')).collect()
        };
        codes
            .into_iter()
            .map(|(code, is_space)| Glyph {
                code,
                text: self
                    .to_unicode
                    .as_ref()
                    .and_then(|cmap| cmap.lookup(code))
                    .map_or_else(|| fallback_text(code, self.composite), str::to_string),
                is_space,
            })
            .collect()
    }
}

/// Parsed `/ToUnicode` CMap, if the font has a readable one.
fn to_unicode(doc: &Document, dict: &Dictionary) -> Option<CMap> {
    let stream = match dict.get(b"ToUnicode").ok().map(|o| resolve(doc, o))? {
        Object::Stream(s) => s,
        _ => return None,
    };
    let data = if stream.dict.get(b"Filter").is_ok() {
        stream.decompressed_content().ok()?
    } else {
        stream.content.clone()
    };
    match CMap::parse(&data) {
        Ok(cmap) => Some(cmap),
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_e, "ignoring unreadable ToUnicode CMap");
            None
        }
    }
}
