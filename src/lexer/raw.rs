//! Raw lexer over a single comment-stripped buffer.
//!
//! The lexer is total: every call to [`RawLexer::next_token`] returns a
//! token, and malformed input produces `TokenKind::Error` tokens that the
//! consumer reports and skips. Once the buffer is exhausted it keeps
//! returning end-of-file.

use super::comments::strip_comments;
use super::numbers::{is_number_start, scan_number};
use super::token::{LiteralValue, Operator, Punct, Keyword, Token, TokenKind};
use crate::error::{LexError, LexErrorKind};
use crate::source::{FileId, Interner, SourceLocation, Symbol};

/// Operand of an `#include` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderName {
    /// `"name"`
    Quoted(String),
    /// `<name>`
    Angled(String),
}

pub struct RawLexer {
    filename: String,
    file: FileId,
    src: Vec<u8>,
    cursor: usize,
    line: u32,
    column: u32,
    at_line_start: bool,
}

impl RawLexer {
    /// Strip comments from `bytes` and position the lexer at its start.
    pub fn new(filename: impl Into<String>, file: FileId, bytes: &[u8]) -> Result<Self, LexError> {
        let src = strip_comments(bytes, file)?;
        Ok(Self {
            filename: filename.into(),
            file,
            src,
            cursor: 0,
            line: 1,
            column: 1,
            at_line_start: true,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Apply a `#line` directive: the line after the current one becomes
    /// `next_line`, optionally in a differently named file.
    pub fn renumber(&mut self, next_line: u32, file: Option<(FileId, String)>) {
        self.line = next_line.saturating_sub(1);
        if let Some((file, filename)) = file {
            self.file = file;
            self.filename = filename;
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor >= self.src.len()
    }

    pub fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.file, self.line, self.column)
    }

    /// Tokenize the whole buffer, ending with exactly one EOF token.
    pub fn tokenize(&mut self, interner: &mut Interner) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token(interner);
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    pub fn next_token(&mut self, interner: &mut Interner) -> Token {
        self.skip_whitespace();

        let location = self.current_location();
        let first_on_line = self.at_line_start;
        self.at_line_start = false;

        let Some(c) = self.peek() else {
            return Token::eof(location);
        };
        let start = self.cursor;

        if is_ident_start(c) {
            return self.identifier_or_keyword(start, location, interner);
        }
        if is_number_start(&self.src[start..]) {
            return self.number_literal(start, location, interner);
        }
        if c == b'"' || c == b'\'' {
            return self.quoted_literal(c, start, location, interner);
        }
        if let Some(punct) = Punct::from_byte(c) {
            self.advance();
            return self.finish(TokenKind::Punct(punct), start, location, interner);
        }
        if c == b'#' && first_on_line {
            self.advance();
            let mut token = self.finish(TokenKind::Hash, start, location, interner);
            token.bol_hash = true;
            return token;
        }
        if let Some((op, len)) = Operator::longest_match(&self.src[start..]) {
            for _ in 0..len {
                self.advance();
            }
            return self.finish(TokenKind::Operator(op), start, location, interner);
        }

        self.advance();
        self.finish(TokenKind::Error(LexErrorKind::InvalidChar), start, location, interner)
    }

    /// Next token on the current logical line, or `None` at the newline.
    /// Used for directive operands; `\`-newline splices continue the line.
    pub fn next_on_line(&mut self, interner: &mut Interner) -> Option<Token> {
        self.skip_horizontal_whitespace();
        match self.peek() {
            None | Some(b'\n') => None,
            Some(_) => {
                let token = self.next_token(interner);
                Some(token)
            }
        }
    }

    /// Read an `#include` operand. Leaves the cursor after the closing
    /// delimiter, or untouched if the operand is not a header name.
    pub fn header_name(&mut self) -> Option<HeaderName> {
        self.skip_horizontal_whitespace();
        let close = match self.peek()? {
            b'"' => b'"',
            b'<' => b'>',
            _ => return None,
        };
        let open = self.src[self.cursor];
        let body_start = self.cursor + 1;
        let len = self.src[body_start..]
            .iter()
            .take_while(|&&b| b != b'\n')
            .position(|&b| b == close)?;
        let name = String::from_utf8_lossy(&self.src[body_start..body_start + len]).into_owned();
        for _ in 0..len + 2 {
            self.advance();
        }
        Some(if open == b'<' {
            HeaderName::Angled(name)
        } else {
            HeaderName::Quoted(name)
        })
    }

    /// Discard the remainder of the current logical line.
    pub fn skip_line(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                return;
            }
            if self.splice_len() > 0 {
                self.skip_splice();
            } else {
                self.advance();
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.cursor).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<u8> {
        self.src.get(self.cursor + n).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.cursor += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    /// Length of a `\`-newline splice at the cursor, 0 if there is none.
    fn splice_len(&self) -> usize {
        match (self.peek(), self.peek_ahead(1), self.peek_ahead(2)) {
            (Some(b'\\'), Some(b'\n'), _) => 2,
            (Some(b'\\'), Some(b'\r'), Some(b'\n')) => 3,
            _ => 0,
        }
    }

    fn skip_splice(&mut self) {
        let at_line_start = self.at_line_start;
        for _ in 0..self.splice_len() {
            self.advance();
        }
        self.at_line_start = at_line_start;
    }

    fn skip_horizontal_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | 0x0b | 0x0c) => {
                    self.advance();
                }
                Some(b'\\') if self.splice_len() > 0 => self.skip_splice(),
                _ => return,
            }
        }
    }

    fn skip_whitespace(&mut self) {
        loop {
            self.skip_horizontal_whitespace();
            if self.peek() == Some(b'\n') {
                self.advance();
            } else {
                return;
            }
        }
    }

    fn finish(
        &self,
        kind: TokenKind,
        start: usize,
        location: SourceLocation,
        interner: &mut Interner,
    ) -> Token {
        let text = self.spelling(start, interner);
        Token::new(kind, text, location)
    }

    fn spelling(&self, start: usize, interner: &mut Interner) -> Symbol {
        interner.intern_bytes(&self.src[start..self.cursor])
    }

    fn identifier_or_keyword(
        &mut self,
        start: usize,
        location: SourceLocation,
        interner: &mut Interner,
    ) -> Token {
        while self.peek().is_some_and(is_ident_char) {
            self.advance();
        }
        let kind = match Keyword::lookup(&self.src[start..self.cursor]) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Identifier,
        };
        self.finish(kind, start, location, interner)
    }

    fn number_literal(&mut self, start: usize, location: SourceLocation, interner: &mut Interner) -> Token {
        let scan = scan_number(&self.src[start..]);
        for _ in 0..scan.len {
            self.advance();
        }
        if let Some(kind) = scan.error {
            return self.finish(TokenKind::Error(kind), start, location, interner);
        }
        let kind = if scan.is_float {
            TokenKind::Float
        } else {
            TokenKind::Integer
        };
        let mut token = self.finish(kind, start, location, interner);
        token.value = scan.value;
        token
    }

    /// String and character literals. A backslash always escapes the next
    /// byte, so an escaped quote never closes the literal.
    fn quoted_literal(
        &mut self,
        quote: u8,
        start: usize,
        location: SourceLocation,
        interner: &mut Interner,
    ) -> Token {
        self.advance();
        let terminated = loop {
            match self.peek() {
                None | Some(b'\n') => break false,
                Some(b'\\') => {
                    self.advance();
                    if self.peek().is_some_and(|b| b != b'\n') {
                        self.advance();
                    }
                }
                Some(b) => {
                    self.advance();
                    if b == quote {
                        break true;
                    }
                }
            }
        };

        if !terminated {
            let kind = if quote == b'"' {
                LexErrorKind::UnterminatedString
            } else {
                LexErrorKind::UnterminatedChar
            };
            return self.finish(TokenKind::Error(kind), start, location, interner);
        }

        if quote == b'"' {
            return self.finish(TokenKind::String, start, location, interner);
        }
        let body = &self.src[start + 1..self.cursor - 1];
        if body.is_empty() {
            return self.finish(TokenKind::Error(LexErrorKind::EmptyChar), start, location, interner);
        }
        let value = char_value(body);
        let mut token = self.finish(TokenKind::Char, start, location, interner);
        token.value = LiteralValue::Int(value);
        token
    }
}

pub fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

pub fn is_ident_char(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// Value of a character constant body. Multi-character constants pack
/// bytes big-endian, as C compilers conventionally do.
fn char_value(body: &[u8]) -> u64 {
    let mut value = 0u64;
    let mut i = 0;
    while i < body.len() {
        let (unit, used) = decode_escape(&body[i..]);
        value = (value << 8) | (unit & 0xff);
        i += used;
    }
    value
}

fn decode_escape(input: &[u8]) -> (u64, usize) {
    if input[0] != b'\\' || input.len() < 2 {
        return (input[0] as u64, 1);
    }
    let simple = match input[1] {
        b'n' => Some(b'\n'),
        b't' => Some(b'\t'),
        b'r' => Some(b'\r'),
        b'0'..=b'7' => None,
        b'x' => None,
        b'a' => Some(0x07),
        b'b' => Some(0x08),
        b'f' => Some(0x0c),
        b'v' => Some(0x0b),
        b'e' => Some(0x1b),
        other => Some(other),
    };
    if let Some(b) = simple {
        return (b as u64, 2);
    }
    if input[1] == b'x' {
        let digits = input[2..].iter().take_while(|b| b.is_ascii_hexdigit()).count();
        let value = input[2..2 + digits]
            .iter()
            .filter_map(|&b| (b as char).to_digit(16))
            .fold(0u64, |acc, d| acc.wrapping_mul(16).wrapping_add(d as u64));
        return (value, 2 + digits);
    }
    let digits = input[1..].iter().take(3).take_while(|b| (b'0'..=b'7').contains(b)).count();
    let value = input[1..1 + digits]
        .iter()
        .fold(0u64, |acc, &b| acc * 8 + (b - b'0') as u64);
    (value, 1 + digits)
}
