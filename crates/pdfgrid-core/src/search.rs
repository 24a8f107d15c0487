//! Word search with positions.

use regex::{Regex, RegexBuilder};

use crate::error::PdfError;
use crate::geometry::BBox;
use crate::words::Word;

/// How a search pattern is interpreted.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchOptions {
    /// Treat the pattern as a regex (default: `true`). Otherwise it is
    /// matched literally.
    pub regex: bool,
    pub case_sensitive: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            regex: true,
            case_sensitive: true,
        }
    }
}

impl SearchOptions {
    /// Compile `pattern` under these options.
    pub fn compile(&self, pattern: &str) -> Result<Regex, PdfError> {
        let source = if self.regex {
            pattern.to_string()
        } else {
            regex::escape(pattern)
        };
        RegexBuilder::new(&source)
            .case_insensitive(!self.case_sensitive)
            .build()
            .map_err(|e| PdfError::Configuration(format!("invalid search pattern: {e}")))
    }
}

/// Words of one page.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageWords {
    /// 0-based page index.
    pub page: usize,
    pub words: Vec<Word>,
}

/// One match inside a word.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WordMatch {
    pub page: usize,
    /// The matched text.
    pub text: String,
    /// Union of the characters covered by the match.
    pub bbox: BBox,
}

/// Find `pattern` inside the words of each page.
///
/// Matches never span words. Each match's box covers only the characters it
/// touches. Results are ordered by page, then top, then `x0`.
pub fn search_words(pages: &[PageWords], pattern: &Regex) -> Vec<WordMatch> {
    let mut results = Vec::new();
    for page in pages {
        for word in &page.words {
            search_word(page.page, word, pattern, &mut results);
        }
    }
    results.sort_by(|a, b| {
        a.page
            .cmp(&b.page)
            .then(a.bbox.top.total_cmp(&b.bbox.top))
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
    results
}

fn search_word(page: usize, word: &Word, pattern: &Regex, out: &mut Vec<WordMatch>) {
    // Byte offset of each char in the concatenated text.
    let mut text = String::new();
    let mut byte_to_char: Vec<usize> = Vec::new();
    for (i, ch) in word.chars.iter().enumerate() {
        text.push_str(&ch.text);
        byte_to_char.resize(text.len(), i);
    }

    for m in pattern.find_iter(&text) {
        if m.start() == m.end() {
            continue;
        }
        let first = byte_to_char[m.start()];
        let last = byte_to_char[m.end() - 1];
        let bbox = BBox::union_all(word.chars[first..=last].iter().map(|c| c.bbox))
            .unwrap_or(word.bbox);
        out.push(WordMatch {
            page,
            text: m.as_str().to_string(),
            bbox,
        });
    }
}
