//! Content stream tokenizer.
//!
//! [`Lexer`] walks raw content stream bytes and yields one [`Operator`] at a
//! time, each carrying the operands that preceded it. The same syntax covers
//! ToUnicode CMaps, which reuse the lexer.

use crate::error::BackendError;

/// A content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Integer(i64),
    Real(f64),
    /// Name without the leading `/`.
    Name(String),
    /// `(...)` string, escapes resolved.
    LiteralString(Vec<u8>),
    /// `<...>` string, decoded to bytes.
    HexString(Vec<u8>),
    Array(Vec<Operand>),
    Boolean(bool),
    Null,
    /// `<< /Key value ... >>`, as used by `BDC` and in CMaps.
    Dictionary(Vec<(String, Operand)>),
}

impl Operand {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Operand::Integer(i) => Some(*i as f64),
            Operand::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Bytes of a literal or hex string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Operand::LiteralString(b) | Operand::HexString(b) => Some(b),
            _ => None,
        }
    }
}

/// An operator with its operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub name: String,
    pub operands: Vec<Operand>,
}

/// Streaming tokenizer over content stream bytes.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    pending: Vec<Operand>,
    /// Arrays and dictionaries currently open.
    depth: usize,
}

/// Deepest array/dictionary nesting accepted before the stream is rejected.
pub const MAX_NESTING: usize = 64;

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0C | 0x00)
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn malformed(what: impl Into<String>) -> BackendError {
    BackendError::Interpreter(what.into())
}

/// A token that is not yet an operand or operator.
enum Token {
    Operand(Operand),
    Keyword(String),
    ArrayEnd,
    DictEnd,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            pending: Vec::new(),
            depth: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while self.peek().is_some_and(|b| b != b'\n' && b != b'\r') {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Next token, or `None` at end of input.
    fn next_token(&mut self) -> Result<Option<Token>, BackendError> {
        loop {
            self.skip_whitespace_and_comments();
            let Some(b) = self.peek() else {
                return Ok(None);
            };
            let token = match b {
                b'(' => Token::Operand(Operand::LiteralString(self.literal_string()?)),
                b'<' if self.peek_at(1) == Some(b'<') => {
                    self.pos += 2;
                    Token::Operand(Operand::Dictionary(self.nested(Self::dictionary)?))
                }
                b'<' => Token::Operand(Operand::HexString(self.hex_string()?)),
                b'>' if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    Token::DictEnd
                }
                b'[' => {
                    self.pos += 1;
                    Token::Operand(Operand::Array(self.nested(Self::array)?))
                }
                b']' => {
                    self.pos += 1;
                    Token::ArrayEnd
                }
                b'/' => Token::Operand(Operand::Name(self.name())),
                b'0'..=b'9' | b'+' | b'-' | b'.' => Token::Operand(self.number()?),
                b if is_regular(b) => {
                    let word = self.keyword();
                    match word.as_str() {
                        "true" => Token::Operand(Operand::Boolean(true)),
                        "false" => Token::Operand(Operand::Boolean(false)),
                        "null" => Token::Operand(Operand::Null),
                        _ => Token::Keyword(word),
                    }
                }
                // PostScript procedure braces (CMaps) and stray bytes.
                _ => {
                    self.pos += 1;
                    continue;
                }
            };
            return Ok(Some(token));
        }
    }

    fn literal_string(&mut self) -> Result<Vec<u8>, BackendError> {
        self.pos += 1;
        let mut out = Vec::new();
        let mut depth = 1u32;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push(b);
                }
                b'\\' => {
                    let Some(escaped) = self.peek() else {
                        break;
                    };
                    self.pos += 1;
                    match escaped {
                        b'n' => out.push(b'\n'),
                        b'r' => out.push(b'\r'),
                        b't' => out.push(b'\t'),
                        b'b' => out.push(0x08),
                        b'f' => out.push(0x0C),
                        b'\r' => {
                            if self.peek() == Some(b'\n') {
                                self.pos += 1;
                            }
                        }
                        b'\n' => {}
                        b'0'..=b'7' => {
                            let mut value = u32::from(escaped - b'0');
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'7') => {
                                        value = value * 8 + u32::from(d - b'0');
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            out.push((value & 0xFF) as u8);
                        }
                        other => out.push(other),
                    }
                }
                _ => out.push(b),
            }
        }
        Err(malformed("unterminated literal string"))
    }

    fn hex_string(&mut self) -> Result<Vec<u8>, BackendError> {
        self.pos += 1;
        let mut digits = Vec::new();
        loop {
            let Some(b) = self.peek() else {
                return Err(malformed("unterminated hex string"));
            };
            self.pos += 1;
            if b == b'>' {
                break;
            }
            if is_whitespace(b) {
                continue;
            }
            let v = hex_value(b)
                .ok_or_else(|| malformed(format!("invalid hex digit {:?}", b as char)))?;
            digits.push(v);
        }
        if digits.len() % 2 == 1 {
            digits.push(0);
        }
        Ok(digits.chunks(2).map(|p| (p[0] << 4) | p[1]).collect())
    }

    fn nested<T>(
        &mut self,
        parse: fn(&mut Self) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        if self.depth >= MAX_NESTING {
            return Err(malformed(format!(
                "arrays and dictionaries nested deeper than {MAX_NESTING}"
            )));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn array(&mut self) -> Result<Vec<Operand>, BackendError> {
        let mut items = Vec::new();
        loop {
            match self.next_token()? {
                None => return Err(malformed("unterminated array")),
                Some(Token::ArrayEnd) => return Ok(items),
                Some(Token::Operand(op)) => items.push(op),
                // Bare words inside arrays only occur in CMaps and broken
                // TJ arrays; keep them as names.
                Some(Token::Keyword(word)) => items.push(Operand::Name(word)),
                Some(Token::DictEnd) => return Err(malformed("unexpected '>>' in array")),
            }
        }
    }

    fn dictionary(&mut self) -> Result<Vec<(String, Operand)>, BackendError> {
        let mut entries = Vec::new();
        loop {
            let key = match self.next_token()? {
                None => return Err(malformed("unterminated dictionary")),
                Some(Token::DictEnd) => return Ok(entries),
                Some(Token::Operand(Operand::Name(key))) => key,
                Some(_) => return Err(malformed("expected name key in dictionary")),
            };
            let value = match self.next_token()? {
                Some(Token::Operand(op)) => op,
                Some(Token::Keyword(word)) => Operand::Name(word),
                _ => return Err(malformed("dictionary key without value")),
            };
            entries.push((key, value));
        }
    }

    fn name(&mut self) -> String {
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(is_regular) {
            self.pos += 1;
        }
        let raw = &self.input[start..self.pos];
        let mut name = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'#' && i + 2 < raw.len() {
                if let (Some(hi), Some(lo)) = (hex_value(raw[i + 1]), hex_value(raw[i + 2])) {
                    name.push((hi << 4) | lo);
                    i += 3;
                    continue;
                }
            }
            name.push(raw[i]);
            i += 1;
        }
        String::from_utf8_lossy(&name).into_owned()
    }

    fn number(&mut self) -> Result<Operand, BackendError> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut seen_dot = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' if !seen_dot => {
                    seen_dot = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let token = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
        let parsed = if seen_dot {
            // "5." and "-.5" are valid PDF reals.
            let normalized = if token.ends_with('.') {
                format!("{token}0")
            } else {
                token.clone()
            };
            normalized.parse::<f64>().ok().map(Operand::Real)
        } else {
            token.parse::<i64>().ok().map(Operand::Integer).or_else(|| {
                // Integers too large for i64 still make sense as reals.
                token.parse::<f64>().ok().map(Operand::Real)
            })
        };
        parsed.ok_or_else(|| malformed(format!("invalid number '{token}'")))
    }

    fn keyword(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_regular) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    /// Skip inline image data up to and including `EI`.
    fn skip_inline_image(&mut self) -> Result<(), BackendError> {
        // Dictionary entries up to `ID`.
        loop {
            match self.next_token()? {
                None => return Err(malformed("inline image without ID")),
                Some(Token::Keyword(word)) if word == "ID" => break,
                Some(_) => {}
            }
        }
        self.pos += 1;
        while self.pos < self.input.len() {
            let at_ei = self.input[self.pos..].starts_with(b"EI")
                && self.pos > 0
                && is_whitespace(self.input[self.pos - 1])
                && self.peek_at(2).is_none_or(|b| !is_regular(b));
            if at_ei {
                self.pos += 2;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(malformed("inline image without EI"))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Operator, BackendError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let token = match self.next_token() {
                Ok(Some(token)) => token,
                Ok(None) => return None,
                Err(e) => {
                    self.pos = self.input.len();
                    return Some(Err(e));
                }
            };
            match token {
                Token::Operand(op) => self.pending.push(op),
                Token::Keyword(name) if name == "BI" => {
                    self.pending.clear();
                    if let Err(e) = self.skip_inline_image() {
                        self.pos = self.input.len();
                        return Some(Err(e));
                    }
                    return Some(Ok(Operator {
                        name,
                        operands: Vec::new(),
                    }));
                }
                Token::Keyword(name) => {
                    return Some(Ok(Operator {
                        name,
                        operands: std::mem::take(&mut self.pending),
                    }));
                }
                Token::ArrayEnd => {
                    self.pos = self.input.len();
                    return Some(Err(malformed("unexpected ']' outside array")));
                }
                Token::DictEnd => {
                    self.pos = self.input.len();
                    return Some(Err(malformed("unexpected '>>' outside dictionary")));
                }
            }
        }
    }
}

/// Tokenize a whole content stream.
pub fn tokenize(input: &[u8]) -> Result<Vec<Operator>, BackendError> {
    Lexer::new(input).collect()
}
