use crate::geometry::BBox;

/// A single character extracted from a PDF page.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Char {
    /// The text content of this character.
    pub text: String,
    /// Bounding box in top-left origin coordinates.
    pub bbox: BBox,
    /// Font name.
    pub fontname: String,
    /// Font size in points (after text and graphics scaling).
    pub size: f64,
    /// Distance of the glyph baseline from the top of the page.
    pub baseline: f64,
    /// Whether the character is upright (not rotated).
    pub upright: bool,
    /// Emission order on the page. Follows content-stream byte order, so it
    /// is the final tie-breaker for otherwise identical positions.
    pub seq: usize,
}

impl Char {
    /// Whether this glyph is whitespace only.
    pub fn is_blank(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }
}

/// Returns `true` if the character is a CJK ideograph, syllable, or kana.
///
/// Full-width glyphs are commonly set without inter-character spacing, so the
/// word assembler widens its gap tolerance for them.
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{3040}'..='\u{309F}'
        | '\u{30A0}'..='\u{30FF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{1100}'..='\u{11FF}'
        | '\u{3100}'..='\u{312F}'
        | '\u{20000}'..='\u{2A6DF}'
    )
}

/// Returns `true` if the first character of the text is CJK.
pub fn is_cjk_text(text: &str) -> bool {
    text.chars().next().is_some_and(is_cjk)
}
