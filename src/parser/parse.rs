//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure:
//! token lookahead over the preprocessor, helper methods, error reporting
//! and recovery, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: declaration specifiers, variables, typedefs and functions
//! - `statements`: statements and blocks
//! - `expressions`: expressions with precedence climbing
//!
//! # Errors
//!
//! A syntax error never stops the parse. The failing statement (or
//! top-level declaration) is reported to the unit's diagnostics, tokens are
//! skipped up to the next `;` or `}`, and parsing resumes. The resulting
//! [`ParseOutcome`] always carries an AST.
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.

use crate::config::{FrontendConfig, LimitsConfig};
use crate::diagnostics::Diagnostics;
use crate::error::{LexError, ParseError, ParseErrorKind};
use crate::lexer::{Keyword, Operator, Punct, Token, TokenKind};
use crate::parser::ast::*;
use crate::preprocess::include::MemorySourceReader;
use crate::preprocess::Preprocessor;
use crate::source::{SourceLocation, Symbol};
use crate::unit::CompileUnit;
use std::collections::VecDeque;

/// Result of parsing one translation unit.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub ast: Ast,
    pub unit: CompileUnit,
}

impl ParseOutcome {
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.unit.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.unit.diagnostics.has_errors()
    }

    /// Spelling of an interned name.
    pub fn name(&self, sym: Symbol) -> &str {
        self.unit.interner.resolve(sym)
    }
}

/// Recursive descent parser for the C subset
pub struct Parser {
    pp: Preprocessor,
    lookahead: VecDeque<Token>,
    pub(crate) ast: Ast,
    /// Modifiers seen so far in the current declaration specifiers
    pub(crate) modifiers: Modifiers,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    pub fn new(pp: Preprocessor, limits: &LimitsConfig) -> Self {
        Self {
            pp,
            lookahead: VecDeque::new(),
            ast: Ast::new(),
            modifiers: Modifiers::NONE,
            depth: 0,
            max_depth: limits.max_nesting_depth,
        }
    }

    /// Parser over a single in-memory source with default configuration.
    /// Includes can only name files that do not exist, so they fail.
    pub fn from_source(name: &str, source: &str) -> Result<Self, LexError> {
        let config = FrontendConfig::default();
        let mut pp = Preprocessor::new(&config, Box::new(MemorySourceReader::new()));
        pp.push_source(name, source.as_bytes())?;
        Ok(Self::new(pp, &config.limits))
    }

    /// Parse the entire translation unit (top-level declarations)
    pub fn parse_translation_unit(mut self) -> ParseOutcome {
        let location = self.current_location();
        let mut decls = Vec::new();

        while !self.is_at_end() {
            match self.parse_external_declaration() {
                Ok(Some(decl)) => decls.push(decl),
                Ok(None) => {}
                Err(err) => {
                    self.report(err);
                    self.synchronize_top_level();
                }
            }
        }

        let root = self.ast.alloc(NodeKind::TranslationUnit { decls }, location);
        self.ast.set_root(root);

        let unit = self.pp.into_unit();
        tracing::info!(
            nodes = self.ast.len(),
            errors = unit.diagnostics.error_count(),
            warnings = unit.diagnostics.warning_count(),
            "parsed translation unit"
        );
        ParseOutcome {
            ast: self.ast,
            unit,
        }
    }

    // ===== Helper methods =====

    pub(crate) fn peek_nth(&mut self, n: usize) -> Token {
        while self.lookahead.len() <= n {
            let token = self.pp.next_token();
            self.lookahead.push_back(token);
        }
        self.lookahead[n]
    }

    pub(crate) fn peek(&mut self) -> Token {
        self.peek_nth(0)
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek();
        if !token.is_eof() {
            self.lookahead.pop_front();
        }
        token
    }

    pub(crate) fn is_at_end(&mut self) -> bool {
        self.peek().is_eof()
    }

    pub(crate) fn current_location(&mut self) -> SourceLocation {
        self.peek().location
    }

    pub(crate) fn check_punct(&mut self, punct: Punct) -> bool {
        self.peek().is_punct(punct)
    }

    pub(crate) fn check_op(&mut self, op: Operator) -> bool {
        self.peek().is_op(op)
    }

    pub(crate) fn check_keyword(&mut self, kw: Keyword) -> bool {
        self.peek().is_keyword(kw)
    }

    pub(crate) fn match_punct(&mut self, punct: Punct) -> bool {
        let matched = self.check_punct(punct);
        if matched {
            self.advance();
        }
        matched
    }

    pub(crate) fn match_op(&mut self, op: Operator) -> bool {
        let matched = self.check_op(op);
        if matched {
            self.advance();
        }
        matched
    }

    pub(crate) fn match_keyword(&mut self, kw: Keyword) -> bool {
        let matched = self.check_keyword(kw);
        if matched {
            self.advance();
        }
        matched
    }

    pub(crate) fn resolve(&self, sym: Symbol) -> &str {
        self.pp.interner().resolve(sym)
    }

    /// Error describing what was expected at the current token.
    pub(crate) fn expected(&mut self, expected: impl Into<String>) -> ParseError {
        let token = self.peek();
        let found = token.describe(self.pp.interner());
        ParseError::new(
            ParseErrorKind::Expected {
                expected: expected.into(),
                found,
            },
            token.location,
        )
    }

    pub(crate) fn expect_punct(&mut self, punct: Punct, ctx: &str) -> Result<Token, ParseError> {
        if self.check_punct(punct) {
            Ok(self.advance())
        } else {
            Err(self.expected(format!("'{}' {ctx}", punct.as_str())))
        }
    }

    pub(crate) fn expect_op(&mut self, op: Operator, ctx: &str) -> Result<Token, ParseError> {
        if self.check_op(op) {
            Ok(self.advance())
        } else {
            Err(self.expected(format!("'{}' {ctx}", op.as_str())))
        }
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<Token, ParseError> {
        self.expect_punct(Punct::Semicolon, ctx)
    }

    pub(crate) fn expect_identifier(&mut self, ctx: &str) -> Result<(Symbol, SourceLocation), ParseError> {
        let token = self.peek();
        if token.is_identifier() {
            self.advance();
            Ok((token.text, token.location))
        } else {
            Err(self.expected(format!("identifier {ctx}")))
        }
    }

    /// Send a parse error to the unit's diagnostics.
    pub(crate) fn report(&mut self, err: ParseError) {
        self.pp.unit_mut().error(err.location, err.kind.to_string());
    }

    pub(crate) fn warn(&mut self, location: SourceLocation, message: impl Into<String>) {
        self.pp.unit_mut().warning(location, message);
    }

    /// Run `f` one nesting level deeper, failing once the configured
    /// maximum is reached.
    pub(crate) fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= self.max_depth {
            let location = self.current_location();
            return Err(ParseError::new(
                ParseErrorKind::TooDeeplyNested(self.max_depth),
                location,
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Skip to the end of the broken statement: past the next `;` at this
    /// level, past a complete skipped `{ }` group, or up to (not past) the
    /// `}` closing the enclosing block.
    pub(crate) fn synchronize(&mut self) {
        self.modifiers = Modifiers::NONE;
        let mut depth = 0usize;
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Eof => return,
                TokenKind::Punct(Punct::Semicolon) if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::Punct(Punct::RBrace) if depth == 0 => return,
                TokenKind::Punct(Punct::LBrace) => depth += 1,
                TokenKind::Punct(Punct::RBrace) => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Recovery between top-level declarations; a stray `}` is consumed.
    pub(crate) fn synchronize_top_level(&mut self) {
        self.modifiers = Modifiers::NONE;
        let mut depth = 0usize;
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Eof => return,
                TokenKind::Punct(Punct::Semicolon) if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::Punct(Punct::LBrace) => depth += 1,
                TokenKind::Punct(Punct::RBrace) => {
                    if depth <= 1 {
                        self.advance();
                        return;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            self.advance();
        }
    }
}
