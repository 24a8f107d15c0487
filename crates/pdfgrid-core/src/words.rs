//! Character to word to line assembly.

use std::cmp::Ordering;

use crate::dedupe::dedupe_chars;
use crate::geometry::BBox;
use crate::text::{Char, is_cjk_text};

/// Tolerances for grouping characters into words and lines.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct WordOptions {
    /// Absolute floor for the horizontal gap that still joins two glyphs.
    pub x_tolerance: f64,
    /// Gap that starts a new word, as a multiple of the line's average glyph width.
    pub x_tolerance_ratio: f64,
    /// Maximum distance from a line's running baseline for a glyph to join it.
    pub y_tolerance: f64,
    /// Gap between words that splits a band into separate text lines.
    pub column_gap: f64,
    /// If true, blank glyphs stay inside words instead of splitting them.
    pub keep_blank_chars: bool,
}

impl Default for WordOptions {
    fn default() -> Self {
        Self {
            x_tolerance: 3.0,
            x_tolerance_ratio: 0.5,
            y_tolerance: 3.0,
            column_gap: 10.0,
            keep_blank_chars: false,
        }
    }
}

/// A word: contiguous characters on one line.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Word {
    pub text: String,
    /// Union of the member character boxes.
    pub bbox: BBox,
    pub chars: Vec<Char>,
}

/// Words sharing a horizontal band, left to right.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextLine {
    pub words: Vec<Word>,
    /// Union of the member word boxes.
    pub bbox: BBox,
}

impl TextLine {
    fn from_words(words: Vec<Word>) -> Option<Self> {
        let bbox = BBox::union_all(words.iter().map(|w| w.bbox))?;
        Some(Self { words, bbox })
    }

    /// Word texts joined by single spaces.
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Every character of the line, in word order.
    pub fn chars(&self) -> impl Iterator<Item = &Char> {
        self.words.iter().flat_map(|w| w.chars.iter())
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}

/// Page reading order for glyphs: top, then left, then baseline, then stream order.
fn cmp_reading(a: &Char, b: &Char) -> Ordering {
    cmp_f64(a.bbox.top, b.bbox.top)
        .then(cmp_f64(a.bbox.x0, b.bbox.x0))
        .then(cmp_f64(a.baseline, b.baseline))
        .then(a.seq.cmp(&b.seq))
}

/// Left-to-right order inside one line.
fn cmp_in_line(a: &Char, b: &Char) -> Ordering {
    cmp_f64(a.bbox.x0, b.bbox.x0)
        .then(cmp_f64(a.baseline, b.baseline))
        .then(a.seq.cmp(&b.seq))
}

struct LineCandidate<'a> {
    baseline_sum: f64,
    chars: Vec<&'a Char>,
}

impl<'a> LineCandidate<'a> {
    fn baseline(&self) -> f64 {
        self.baseline_sum / self.chars.len() as f64
    }

    fn push(&mut self, ch: &'a Char) {
        self.baseline_sum += ch.baseline;
        self.chars.push(ch);
    }
}

/// Group characters into line candidates by running baseline.
fn line_candidates<'a>(chars: &'a [Char], options: &WordOptions) -> Vec<LineCandidate<'a>> {
    let mut sorted: Vec<&Char> = chars.iter().collect();
    sorted.sort_by(|a, b| cmp_reading(a, b));

    let mut candidates: Vec<LineCandidate<'a>> = Vec::new();
    for ch in sorted {
        match candidates
            .iter_mut()
            .find(|c| (c.baseline() - ch.baseline).abs() <= options.y_tolerance)
        {
            Some(candidate) => candidate.push(ch),
            None => candidates.push(LineCandidate {
                baseline_sum: ch.baseline,
                chars: vec![ch],
            }),
        }
    }
    candidates
}

fn make_word(chars: &[&Char]) -> Option<Word> {
    let bbox = BBox::union_all(chars.iter().map(|c| c.bbox))?;
    Some(Word {
        text: chars.iter().map(|c| c.text.as_str()).collect(),
        bbox,
        chars: chars.iter().map(|&c| c.clone()).collect(),
    })
}

/// Split one line candidate into words.
fn split_words(chars: &mut [&Char], options: &WordOptions) -> Vec<Word> {
    chars.sort_by(|a, b| cmp_in_line(a, b));

    let visible: Vec<f64> = chars
        .iter()
        .filter(|c| !c.is_blank())
        .map(|c| c.bbox.width())
        .collect();
    let avg_width = if visible.is_empty() {
        0.0
    } else {
        visible.iter().sum::<f64>() / visible.len() as f64
    };
    let threshold = options.x_tolerance.max(options.x_tolerance_ratio * avg_width);

    let mut words = Vec::new();
    let mut current: Vec<&Char> = Vec::new();
    for &ch in chars.iter() {
        if ch.is_blank() && !options.keep_blank_chars {
            words.extend(make_word(&current));
            current.clear();
            continue;
        }
        if let Some(last) = current.last() {
            let gap = ch.bbox.x0 - last.bbox.x1;
            let limit = if is_cjk_text(&last.text) || is_cjk_text(&ch.text) {
                threshold.max(last.bbox.width())
            } else {
                threshold
            };
            if gap > limit {
                words.extend(make_word(&current));
                current.clear();
            }
        }
        current.push(ch);
    }
    words.extend(make_word(&current));
    words
}

/// Split a band of words wherever the horizontal gap exceeds `column_gap`.
fn split_columns(words: Vec<Word>, column_gap: f64) -> Vec<TextLine> {
    let mut lines = Vec::new();
    let mut current: Vec<Word> = Vec::new();
    for word in words {
        if let Some(last) = current.last() {
            if word.bbox.x0 - last.bbox.x1 > column_gap {
                lines.extend(TextLine::from_words(std::mem::take(&mut current)));
            }
        }
        current.push(word);
    }
    lines.extend(TextLine::from_words(current));
    lines
}

/// Assemble characters into text lines.
///
/// Exact duplicate glyphs are dropped first. Glyphs are then ordered by
/// `(top, x0, baseline, seq)` and grouped into line candidates: a glyph joins
/// the first candidate whose mean baseline lies within `y_tolerance`.
/// Inside a candidate, blanks and gaps wider than the word threshold split
/// words, and gaps wider than `column_gap` split lines.
///
/// The result is sorted by `(top, x0)` and is identical for identical input.
pub fn assemble_lines(chars: &[Char], options: &WordOptions) -> Vec<TextLine> {
    let chars = dedupe_chars(chars);
    let mut lines: Vec<TextLine> = line_candidates(&chars, options)
        .into_iter()
        .flat_map(|mut candidate| {
            let words = split_words(&mut candidate.chars, options);
            split_columns(words, options.column_gap)
        })
        .collect();
    lines.sort_by(|a, b| {
        cmp_f64(a.bbox.top, b.bbox.top).then(cmp_f64(a.bbox.x0, b.bbox.x0))
    });
    lines
}

/// Words of a page in reading order `(top, x0)`.
pub fn extract_words(chars: &[Char], options: &WordOptions) -> Vec<Word> {
    let mut words: Vec<Word> = assemble_lines(chars, options)
        .into_iter()
        .flat_map(|line| line.words)
        .collect();
    words.sort_by(|a, b| cmp_f64(a.bbox.top, b.bbox.top).then(cmp_f64(a.bbox.x0, b.bbox.x0)));
    words
}
