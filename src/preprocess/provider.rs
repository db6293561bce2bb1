//! Token providers and the provider stack.
//!
//! A provider is either a raw lexer over a file buffer or a cursor over an
//! already-lexed token sequence (a macro expansion or a replayed token
//! list). The stack's top is the active source; end-of-file from anything
//! but the last provider is swallowed and the provider beneath resumes.

use crate::lexer::{RawLexer, Token};
use crate::source::{Interner, SourceLocation, Symbol};
use std::path::PathBuf;
use std::rc::Rc;

/// Lexer over a file plus what the preprocessor needs to know when it ends.
pub struct RawProvider {
    pub lexer: RawLexer,
    /// Path the buffer was read from, if any
    pub path: Option<PathBuf>,
    /// Conditional-stack depth when this file was entered
    pub cond_base: usize,
}

/// Cursor over a shared, immutable token sequence.
pub struct StreamProvider {
    tokens: Rc<[Token]>,
    cursor: usize,
    /// Macro whose expansion this stream is, used as the recursion guard
    macro_name: Option<Symbol>,
}

impl StreamProvider {
    pub fn remaining(&self) -> usize {
        self.tokens.len().saturating_sub(self.cursor)
    }
}

pub enum TokenProvider {
    Raw(RawProvider),
    Stream(StreamProvider),
}

impl TokenProvider {
    pub fn raw(lexer: RawLexer, path: Option<PathBuf>, cond_base: usize) -> Self {
        TokenProvider::Raw(RawProvider {
            lexer,
            path,
            cond_base,
        })
    }

    pub fn stream(tokens: impl Into<Rc<[Token]>>) -> Self {
        TokenProvider::Stream(StreamProvider {
            tokens: tokens.into(),
            cursor: 0,
            macro_name: None,
        })
    }

    pub fn expansion(name: Symbol, tokens: Vec<Token>) -> Self {
        TokenProvider::Stream(StreamProvider {
            tokens: tokens.into(),
            cursor: 0,
            macro_name: Some(name),
        })
    }

    /// Next token from this provider alone; EOF once exhausted.
    pub fn next_token(&mut self, interner: &mut Interner) -> Token {
        match self {
            TokenProvider::Raw(raw) => raw.lexer.next_token(interner),
            TokenProvider::Stream(stream) => match stream.tokens.get(stream.cursor) {
                Some(token) if !token.is_eof() => {
                    stream.cursor += 1;
                    *token
                }
                Some(token) => Token::eof(token.location),
                None => Token::eof(
                    stream
                        .tokens
                        .last()
                        .map(|t| t.location)
                        .unwrap_or_default(),
                ),
            },
        }
    }

    pub fn macro_name(&self) -> Option<Symbol> {
        match self {
            TokenProvider::Stream(stream) => stream.macro_name,
            TokenProvider::Raw(_) => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, TokenProvider::Raw(_))
    }

    /// Release the provider. A raw provider drops its buffer; a stream only
    /// drops its handle on the shared token sequence.
    pub fn dispose(self) {
        match self {
            TokenProvider::Raw(raw) => {
                tracing::trace!(file = raw.lexer.filename(), "raw provider exhausted");
            }
            TokenProvider::Stream(stream) => {
                tracing::trace!(remaining = stream.remaining(), "stream provider exhausted");
            }
        }
    }
}

#[derive(Default)]
pub struct ProviderStack {
    providers: Vec<TokenProvider>,
    last_location: SourceLocation,
}

impl ProviderStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, provider: TokenProvider) {
        self.providers.push(provider);
    }

    pub fn pop(&mut self) -> Option<TokenProvider> {
        self.providers.pop()
    }

    pub fn depth(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn active_mut(&mut self) -> Option<&mut TokenProvider> {
        self.providers.last_mut()
    }

    /// Innermost raw provider, i.e. the file currently being read.
    pub fn current_raw_mut(&mut self) -> Option<&mut RawProvider> {
        self.providers.iter_mut().rev().find_map(|p| match p {
            TokenProvider::Raw(raw) => Some(raw),
            TokenProvider::Stream(_) => None,
        })
    }

    /// The active provider if it is raw. Directive lines are only read from
    /// a raw provider on top of the stack.
    pub fn active_raw_mut(&mut self) -> Option<&mut RawProvider> {
        match self.providers.last_mut() {
            Some(TokenProvider::Raw(raw)) => Some(raw),
            _ => None,
        }
    }

    pub fn raw_depth(&self) -> usize {
        self.providers.iter().filter(|p| p.is_raw()).count()
    }

    pub fn expansion_depth(&self) -> usize {
        self.providers.iter().filter(|p| p.macro_name().is_some()).count()
    }

    /// Whether `name` is currently being expanded somewhere on the stack.
    pub fn is_expanding(&self, name: Symbol) -> bool {
        self.providers.iter().any(|p| p.macro_name() == Some(name))
    }

    /// Names of every macro whose expansion is still on the stack.
    pub fn expanding(&self) -> Vec<Symbol> {
        self.providers.iter().filter_map(TokenProvider::macro_name).collect()
    }

    pub fn last_location(&self) -> SourceLocation {
        self.last_location
    }

    /// Pull the next token, popping and disposing exhausted providers.
    /// EOF is returned only once the stack is empty.
    pub fn pull(&mut self, interner: &mut Interner) -> Token {
        self.pull_with(interner, TokenProvider::dispose)
    }

    /// Like [`ProviderStack::pull`], handing each exhausted provider to
    /// `on_exit` instead of disposing it directly.
    pub fn pull_with(
        &mut self,
        interner: &mut Interner,
        mut on_exit: impl FnMut(TokenProvider),
    ) -> Token {
        loop {
            let Some(top) = self.providers.last_mut() else {
                return Token::eof(self.last_location);
            };
            let token = top.next_token(interner);
            if !token.is_eof() {
                self.last_location = token.location;
                return token;
            }
            if let Some(exhausted) = self.providers.pop() {
                on_exit(exhausted);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;
    use crate::source::FileId;

    fn raw(src: &str) -> TokenProvider {
        let lexer = RawLexer::new("t.c", FileId(0), src.as_bytes()).expect("lexer");
        TokenProvider::raw(lexer, None, 0)
    }

    #[test]
    fn test_empty_stream_above_raw_falls_through() {
        let mut interner = Interner::new();
        let mut stack = ProviderStack::new();
        stack.push(raw("a b c"));
        stack.push(TokenProvider::stream(Vec::<Token>::new()));

        let mut texts = Vec::new();
        loop {
            let token = stack.pull(&mut interner);
            if token.is_eof() {
                break;
            }
            texts.push(interner.resolve(token.text).to_string());
        }
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert!(stack.is_empty());
        assert!(stack.pull(&mut interner).is_eof());
    }

    #[test]
    fn test_stream_is_drained_before_lower_provider() {
        let mut interner = Interner::new();
        let mut lower = raw("x y");
        let first = lower.next_token(&mut interner);

        let mut stack = ProviderStack::new();
        stack.push(lower);
        stack.push(TokenProvider::stream(vec![first]));

        let texts: Vec<_> = (0..3)
            .map(|_| {
                let t = stack.pull(&mut interner);
                interner.resolve(t.text).to_string()
            })
            .collect();
        assert_eq!(texts, vec!["x", "y", ""]);
    }

    #[test]
    fn test_expansion_guard() {
        let mut interner = Interner::new();
        let name = interner.intern("FOO");
        let mut stack = ProviderStack::new();
        stack.push(raw("1"));
        assert!(!stack.is_expanding(name));
        stack.push(TokenProvider::expansion(name, Vec::new()));
        assert!(stack.is_expanding(name));
        assert_eq!(stack.expansion_depth(), 1);

        let mut exited = 0;
        let token = stack.pull_with(&mut interner, |_| exited += 1);
        assert_eq!(token.kind, TokenKind::Integer);
        assert_eq!(exited, 1);
        assert!(!stack.is_expanding(name));
    }
}
