//! ToUnicode CMaps.
//!
//! A CMap stream is PostScript with the same token syntax as a content
//! stream, so it is read with the content [`Lexer`]: the operands collected
//! before `endbfchar` / `endbfrange` are the mapping entries.

use std::collections::HashMap;

use crate::error::BackendError;
use crate::tokenizer::{Lexer, Operand};

/// Largest `bfrange` span honoured; wider ranges are clipped.
const MAX_RANGE: u32 = 0xFFFF;

/// Maps character codes to Unicode text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CMap {
    mappings: HashMap<u32, String>,
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

/// UTF-16BE code units; a lone byte is taken as one unit.
fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    if bytes.len() == 1 {
        return vec![u16::from(bytes[0])];
    }
    bytes
        .chunks(2)
        .map(|c| (u16::from(c[0]) << 8) | u16::from(c.get(1).copied().unwrap_or(0)))
        .collect()
}

fn utf16be(bytes: &[u8]) -> Option<String> {
    String::from_utf16(&utf16_units(bytes)).ok()
}

/// Destination string for the code `offset` steps into a range: the last
/// UTF-16 unit of `start` is incremented.
fn offset_destination(start: &[u8], offset: u32) -> Option<String> {
    let mut units = utf16_units(start);
    let last = units.last_mut()?;
    *last = u16::try_from(u32::from(*last) + offset).ok()?;
    String::from_utf16(&units).ok()
}

impl CMap {
    /// Parse a decoded ToUnicode stream.
    pub fn parse(data: &[u8]) -> Result<Self, BackendError> {
        let mut cmap = CMap::default();
        for op in Lexer::new(data) {
            let op = op?;
            match op.name.as_str() {
                "endbfchar" => cmap.add_chars(&op.operands),
                "endbfrange" => cmap.add_ranges(&op.operands),
                _ => {}
            }
        }
        Ok(cmap)
    }

    fn add_chars(&mut self, operands: &[Operand]) {
        for pair in operands.chunks_exact(2) {
            let (Some(src), Some(dst)) = (pair[0].as_bytes(), pair[1].as_bytes()) else {
                continue;
            };
            if let Some(text) = utf16be(dst) {
                self.mappings.insert(code_of(src), text);
            }
        }
    }

    fn add_ranges(&mut self, operands: &[Operand]) {
        for triple in operands.chunks_exact(3) {
            let (Some(lo), Some(hi)) = (triple[0].as_bytes(), triple[1].as_bytes()) else {
                continue;
            };
            let (lo, hi) = (code_of(lo), code_of(hi));
            if hi < lo {
                continue;
            }
            let span = (hi - lo).min(MAX_RANGE);
            match &triple[2] {
                Operand::Array(items) => {
                    for (offset, item) in (0..=span).zip(items) {
                        if let Some(text) = item.as_bytes().and_then(utf16be) {
                            self.mappings.insert(lo + offset, text);
                        }
                    }
                }
                dst => {
                    let Some(start) = dst.as_bytes() else {
                        continue;
                    };
                    for offset in 0..=span {
                        if let Some(text) = offset_destination(start, offset) {
                            self.mappings.insert(lo + offset, text);
                        }
                    }
                }
            }
        }
    }

    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.mappings.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
