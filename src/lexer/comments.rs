//! Comment stripping pass
//!
//! Runs once over a buffer before it is tokenized. `//` comments are dropped
//! up to (not including) the newline; `/* */` comments become a single space
//! followed by every newline they contained, so line numbers survive.
//! String literals, character literals and numbers are copied untouched so
//! that comment markers inside them and digit separators (`1'000`) are not
//! misread. Stripping its own output is a no-op.

use crate::error::{LexError, LexErrorKind};
use crate::source::{FileId, SourceLocation};

/// Remove all comments from `src`.
///
/// Fails only on a block comment that runs to the end of the buffer; the
/// error points at the opening `/*`.
pub fn strip_comments(src: &[u8], file: FileId) -> Result<Vec<u8>, LexError> {
    let mut stripper = Stripper {
        src,
        pos: 0,
        line: 1,
        column: 1,
        out: Vec::with_capacity(src.len()),
    };
    stripper.run(file)?;
    Ok(stripper.out)
}

struct Stripper<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    out: Vec<u8>,
}

impl Stripper<'_> {
    fn run(&mut self, file: FileId) -> Result<(), LexError> {
        while let Some(c) = self.peek(0) {
            match c {
                b'/' if self.peek(1) == Some(b'/') => self.line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.block_comment(file)?,
                b'"' | b'\'' => self.quoted(c),
                c if is_ident_char(c) && !c.is_ascii_digit() => {
                    while self.peek(0).is_some_and(is_ident_char) {
                        self.copy();
                    }
                }
                c if c.is_ascii_digit() => self.pp_number(),
                b'.' if self.peek(1).is_some_and(|b| b.is_ascii_digit()) => self.pp_number(),
                _ => self.copy(),
            }
        }
        Ok(())
    }

    fn peek(&self, n: usize) -> Option<u8> {
        self.src.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = *self.src.get(self.pos)?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    fn copy(&mut self) {
        if let Some(b) = self.bump() {
            self.out.push(b);
        }
    }

    fn line_comment(&mut self) {
        while self.peek(0).is_some_and(|b| b != b'\n') {
            self.bump();
        }
    }

    fn block_comment(&mut self, file: FileId) -> Result<(), LexError> {
        let start = SourceLocation::new(file, self.line, self.column);
        self.bump();
        self.bump();
        self.out.push(b' ');
        loop {
            match self.peek(0) {
                None => return Err(LexError::new(LexErrorKind::UnterminatedComment, start)),
                Some(b'*') if self.peek(1) == Some(b'/') => {
                    self.bump();
                    self.bump();
                    return Ok(());
                }
                Some(b'\n') => {
                    self.bump();
                    self.out.push(b'\n');
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Copy a string or character literal. An unterminated literal stops at
    /// the end of its line; the lexer reports it.
    fn quoted(&mut self, quote: u8) {
        self.copy();
        while let Some(b) = self.peek(0) {
            match b {
                b'\n' => return,
                b'\\' => {
                    self.copy();
                    self.copy();
                }
                _ => {
                    self.copy();
                    if b == quote {
                        return;
                    }
                }
            }
        }
    }

    fn pp_number(&mut self) {
        self.copy();
        while let Some(b) = self.peek(0) {
            let prev = self.out.last().copied().unwrap_or(0);
            match b {
                b'\'' if self.peek(1).is_some_and(|n| n.is_ascii_alphanumeric()) => self.copy(),
                b'+' | b'-' if matches!(prev, b'e' | b'E' | b'p' | b'P') => self.copy(),
                b'.' => self.copy(),
                b if is_ident_char(b) => self.copy(),
                _ => return,
            }
        }
    }
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}
