//! Preprocessor
//!
//! The preprocessor is the parser's only token source. Each pull goes
//! through the same steps:
//!
//! ```text
//! 1. a put-back token in the replay queue is returned first
//! 2. otherwise the provider stack yields the next token, exhausted
//!    providers being popped on the way down
//! 3. a `#` at the start of a line starts a directive, which is consumed
//!    entirely and never reaches the parser
//! 4. tokens inside a skipped conditional group are dropped
//! 5. an identifier naming a macro pushes its expansion as a new provider
//! 6. anything else is returned
//! ```
//!
//! - `provider`: raw and stream token providers and their stack
//! - `directive`: the directive name table
//! - `macros`: macro definitions and argument substitution
//! - `cond`: conditional groups and `#if` evaluation
//! - `include`: include search paths and source readers

pub mod cond;
pub mod directive;
pub mod include;
pub mod macros;
pub mod provider;

use crate::config::{FrontendConfig, LimitsConfig};
use crate::error::{FrontendError, LexError, LexErrorKind};
use crate::lexer::{HeaderName, LiteralValue, Punct, RawLexer, Token, TokenKind};
use crate::source::{Interner, SourceLocation};
use crate::unit::CompileUnit;
use cond::CondStack;
use directive::{Directive, DirectiveTable};
use include::{IncludeSearchPath, IncludeSyntax, SourceReader};
use macros::{ArgumentCollector, MacroTable};
use provider::{ProviderStack, TokenProvider};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

pub struct Preprocessor {
    unit: CompileUnit,
    providers: ProviderStack,
    replay: VecDeque<Token>,
    macros: MacroTable,
    cond: CondStack,
    directives: DirectiveTable,
    include_paths: IncludeSearchPath,
    reader: Box<dyn SourceReader>,
    /// Files that declared `#pragma once`
    once: FxHashSet<PathBuf>,
    limits: LimitsConfig,
}

impl Preprocessor {
    /// Create a preprocessor with an empty provider stack. Predefined
    /// macros from the configuration are installed immediately.
    pub fn new(config: &FrontendConfig, reader: Box<dyn SourceReader>) -> Self {
        let mut pp = Self {
            unit: CompileUnit::new(),
            providers: ProviderStack::new(),
            replay: VecDeque::new(),
            macros: MacroTable::new(),
            cond: CondStack::new(),
            directives: DirectiveTable::new(),
            include_paths: IncludeSearchPath::from_config(&config.include),
            reader,
            once: FxHashSet::default(),
            limits: config.limits,
        };
        for define in &config.preprocessor.defines {
            pp.define_from_spec(define);
        }
        pp
    }

    /// Read `path` through the source reader and make it the active file.
    pub fn push_file(&mut self, path: &Path) -> Result<(), FrontendError> {
        let bytes = self.reader.read(path).map_err(|source| FrontendError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.push_buffer(path.to_path_buf(), &bytes)?;
        Ok(())
    }

    /// Make an in-memory buffer the active file. `name` is used for
    /// diagnostics and as the base for quoted includes.
    pub fn push_source(&mut self, name: &str, bytes: &[u8]) -> Result<(), LexError> {
        self.push_buffer(PathBuf::from(name), bytes)
    }

    fn push_buffer(&mut self, path: PathBuf, bytes: &[u8]) -> Result<(), LexError> {
        let file = self.unit.sources.add(path.clone());
        let lexer = RawLexer::new(path.display().to_string(), file, bytes)?;
        tracing::debug!(
            file = %path.display(),
            depth = self.providers.raw_depth() + 1,
            "entering file"
        );
        self.providers
            .push(TokenProvider::raw(lexer, Some(path), self.cond.depth()));
        Ok(())
    }

    /// Push an arbitrary provider, e.g. a pre-lexed token stream.
    pub fn push_provider(&mut self, provider: TokenProvider) {
        self.providers.push(provider);
    }

    /// Install a `NAME` or `NAME=VALUE` definition, as given to `-D`.
    pub fn define_from_spec(&mut self, spec: &str) {
        let (name, value) = spec.split_once('=').unwrap_or((spec, "1"));
        let text = format!("{name} {value}");
        let file = self.unit.sources.add("<command line>");
        let mut lexer = match RawLexer::new("<command line>", file, text.as_bytes()) {
            Ok(lexer) => lexer,
            Err(err) => {
                self.unit.error(err.location, err.kind.to_string());
                return;
            }
        };
        let mut tokens = lexer.tokenize(&mut self.unit.interner);
        tokens.pop();
        match macros::parse_define(&tokens, &mut self.unit.interner) {
            Ok(def) => {
                self.macros.define(def);
            }
            Err(message) => self.unit.error(SourceLocation::new(file, 1, 1), message),
        }
    }

    pub fn unit(&self) -> &CompileUnit {
        &self.unit
    }

    pub fn unit_mut(&mut self) -> &mut CompileUnit {
        &mut self.unit
    }

    pub fn interner(&self) -> &Interner {
        &self.unit.interner
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    pub fn into_unit(self) -> CompileUnit {
        self.unit
    }

    /// Drain every remaining token, ending with a single EOF.
    pub fn tokens(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    /// Next fully preprocessed token.
    pub fn next_token(&mut self) -> Token {
        loop {
            let token = self.next_unexpanded();
            if token.is_name() && self.try_expand(token) {
                continue;
            }
            return token;
        }
    }

    fn next_unexpanded(&mut self) -> Token {
        loop {
            if let Some(token) = self.replay.pop_front() {
                return token;
            }
            let token = self.pull();
            if token.is_eof() {
                return token;
            }
            if token.bol_hash {
                self.handle_directive(token);
                continue;
            }
            if !self.cond.is_active() {
                continue;
            }
            if let TokenKind::Error(kind) = token.kind {
                let message = match kind {
                    LexErrorKind::InvalidChar => {
                        format!("stray '{}' in program", self.unit.interner.resolve(token.text))
                    }
                    other => other.to_string(),
                };
                self.unit.error(token.location, message);
                continue;
            }
            return token;
        }
    }

    fn pull(&mut self) -> Token {
        let mut exited = Vec::new();
        let token = self
            .providers
            .pull_with(&mut self.unit.interner, |provider| exited.push(provider));
        for provider in exited {
            self.on_provider_exit(provider);
        }
        token
    }

    fn on_provider_exit(&mut self, provider: TokenProvider) {
        if let TokenProvider::Raw(raw) = &provider {
            for frame in self.cond.truncate(raw.cond_base) {
                self.unit
                    .error(frame.location, "unterminated conditional directive");
            }
            tracing::debug!(file = raw.lexer.filename(), "leaving file");
        }
        provider.dispose();
    }

    fn try_expand(&mut self, token: Token) -> bool {
        let Some(def) = self.macros.get(token.text) else {
            return false;
        };
        if self.providers.is_expanding(token.text) {
            return false;
        }
        let def = def.clone();
        if self.providers.expansion_depth() >= self.limits.max_macro_expansion_depth {
            self.unit.error(
                token.location,
                format!(
                    "macro expansion of '{}' nested too deeply",
                    self.unit.interner.resolve(def.name)
                ),
            );
            return false;
        }

        let args = if def.is_function_like() {
            let next = self.next_unexpanded();
            if !next.is_punct(Punct::LParen) {
                self.replay.push_front(next);
                return false;
            }
            let mut collector = ArgumentCollector::new(&def);
            loop {
                let arg_token = self.next_unexpanded();
                if arg_token.is_eof() {
                    self.unit.error(
                        token.location,
                        format!(
                            "unterminated argument list invoking macro '{}'",
                            self.unit.interner.resolve(def.name)
                        ),
                    );
                    self.replay.push_front(arg_token);
                    return true;
                }
                if collector.feed(arg_token) {
                    break;
                }
            }
            match collector.finish() {
                Ok(args) => args,
                Err(message) => {
                    let name = self.unit.interner.resolve(def.name).to_string();
                    self.unit
                        .error(token.location, format!("macro '{name}' {message}"));
                    return true;
                }
            }
        } else {
            Vec::new()
        };

        let budget = self
            .limits
            .max_macro_expansion_depth
            .saturating_sub(self.providers.expansion_depth() + 1);
        let expanded = self.macros.expand_args(
            &args,
            &mut self.unit.interner,
            &self.providers.expanding(),
            budget,
        );
        let expansion = def.substitute(&args, &expanded, token.location, &mut self.unit.interner);
        tracing::trace!(
            name = self.unit.interner.resolve(def.name),
            tokens = expansion.len(),
            "expanding macro"
        );
        self.providers
            .push(TokenProvider::expansion(def.name, expansion));
        true
    }

    fn line_tokens(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        if let Some(raw) = self.providers.active_raw_mut() {
            while let Some(token) = raw.lexer.next_on_line(&mut self.unit.interner) {
                tokens.push(token);
            }
        }
        tokens
    }

    fn skip_line(&mut self) {
        if let Some(raw) = self.providers.active_raw_mut() {
            raw.lexer.skip_line();
        }
    }

    fn handle_directive(&mut self, hash: Token) {
        let active = self.cond.is_active();
        let Some(raw) = self.providers.active_raw_mut() else {
            return;
        };
        let Some(name_token) = raw.lexer.next_on_line(&mut self.unit.interner) else {
            return;
        };
        let name = self.unit.interner.resolve(name_token.text).to_string();
        let location = hash.location;

        let Some(directive) = self.directives.lookup(&name) else {
            if active {
                self.unit.warning(
                    location,
                    format!("unknown preprocessor directive '#{name}'"),
                );
            }
            self.skip_line();
            return;
        };
        if !active && !directive.is_conditional() {
            self.skip_line();
            return;
        }
        tracing::trace!(directive = directive.name(), line = location.line, "directive");

        match directive {
            Directive::Include => self.include(location),
            Directive::Define => self.define(location),
            Directive::Undef => self.undef(location),
            Directive::If => {
                let value = if active {
                    let tokens = self.line_tokens();
                    self.eval_condition(&tokens, location)
                } else {
                    self.skip_line();
                    false
                };
                self.cond.push_if(value, location);
            }
            Directive::Ifdef | Directive::Ifndef => {
                let value = if active {
                    let defined = self.macro_name_operand(directive, location);
                    defined.is_some_and(|d| d == (directive == Directive::Ifdef))
                } else {
                    self.skip_line();
                    false
                };
                self.cond.push_if(value, location);
            }
            Directive::Elif => {
                let value = if self.cond.elif_needs_eval() {
                    let tokens = self.line_tokens();
                    self.eval_condition(&tokens, location)
                } else {
                    self.skip_line();
                    false
                };
                if let Err(err) = self.cond.elif(value) {
                    self.unit.error(location, err.to_string());
                }
            }
            Directive::Else => {
                self.extra_tokens(directive, location);
                if let Err(err) = self.cond.else_branch() {
                    self.unit.error(location, err.to_string());
                }
            }
            Directive::Endif => {
                self.extra_tokens(directive, location);
                if let Err(err) = self.cond.endif() {
                    self.unit.error(location, err.to_string());
                }
            }
            Directive::Pragma => self.pragma(),
            Directive::Error | Directive::Warning => self.diagnostic_directive(directive, location),
            Directive::Line => self.line_directive(location),
        }
    }

    fn extra_tokens(&mut self, directive: Directive, location: SourceLocation) {
        let rest = self.line_tokens();
        if !rest.is_empty() && self.cond.is_active() {
            self.unit.warning(
                location,
                format!("extra tokens at end of #{} directive", directive.name()),
            );
        }
    }

    /// Read the single macro name operand of `#ifdef`/`#ifndef`/`#undef`
    /// and report whether it is defined.
    fn macro_name_operand(&mut self, directive: Directive, location: SourceLocation) -> Option<bool> {
        let tokens = self.line_tokens();
        let Some(first) = tokens.first() else {
            self.unit.error(
                location,
                format!("no macro name given in #{} directive", directive.name()),
            );
            return None;
        };
        if !matches!(first.kind, TokenKind::Identifier | TokenKind::Keyword(_)) {
            self.unit.error(first.location, "macro names must be identifiers");
            return None;
        }
        if tokens.len() > 1 {
            self.unit.warning(
                location,
                format!("extra tokens at end of #{} directive", directive.name()),
            );
        }
        if directive == Directive::Undef {
            self.macros.undef(first.text);
            return Some(false);
        }
        Some(self.macros.contains(first.text))
    }

    fn define(&mut self, location: SourceLocation) {
        let tokens = self.line_tokens();
        let def = match macros::parse_define(&tokens, &mut self.unit.interner) {
            Ok(def) => def,
            Err(message) => {
                self.unit.error(location, message);
                return;
            }
        };
        let name = self.unit.interner.resolve(def.name).to_string();
        if name == "defined" {
            self.unit
                .error(location, "\"defined\" cannot be used as a macro name");
            return;
        }
        if let Some(previous) = self.macros.get(def.name) {
            if !previous.same_definition(&def) {
                self.unit
                    .warning(def.location, format!("'{name}' macro redefined"));
            }
        }
        tracing::trace!(name = %name, function_like = def.is_function_like(), "define");
        self.macros.define(def);
    }

    fn undef(&mut self, location: SourceLocation) {
        self.macro_name_operand(Directive::Undef, location);
    }

    fn include(&mut self, location: SourceLocation) {
        let Some(raw) = self.providers.active_raw_mut() else {
            return;
        };
        let header = raw.lexer.header_name();
        let current_dir = raw
            .path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);
        let rest = self.line_tokens();

        let header = match header {
            Some(header) => {
                if !rest.is_empty() {
                    self.unit
                        .warning(location, "extra tokens at end of #include directive");
                }
                header
            }
            None => match self.computed_header(&rest) {
                Some(header) => header,
                None => {
                    self.unit
                        .error(location, "#include expects \"FILENAME\" or <FILENAME>");
                    return;
                }
            },
        };

        if self.providers.raw_depth() >= self.limits.max_include_depth {
            self.unit.error(
                location,
                format!(
                    "#include nested depth {} exceeds maximum of {}",
                    self.providers.raw_depth(),
                    self.limits.max_include_depth
                ),
            );
            return;
        }

        let (name, syntax) = match header {
            HeaderName::Quoted(name) => (name, IncludeSyntax::Quoted),
            HeaderName::Angled(name) => (name, IncludeSyntax::Angled),
        };
        let Some(path) = self.include_paths.resolve(
            &name,
            syntax,
            current_dir.as_deref(),
            self.reader.as_ref(),
        ) else {
            self.unit.error(location, format!("'{name}' file not found"));
            return;
        };
        if self.once.contains(&include::normalize(&path)) {
            tracing::debug!(file = %path.display(), "skipping #pragma once file");
            return;
        }
        match self.push_file(&path) {
            Ok(()) => {}
            Err(FrontendError::Lex(err)) => self.unit.error(err.location, err.kind.to_string()),
            Err(err) => self.unit.error(location, err.to_string()),
        }
    }

    /// `#include MACRO`: expand the operand and accept either a string
    /// literal or a `<`...`>` token sequence.
    fn computed_header(&mut self, tokens: &[Token]) -> Option<HeaderName> {
        let expanded = self.macros.expand_all(
            tokens,
            &mut self.unit.interner,
            self.limits.max_macro_expansion_depth,
        );
        let interner = &self.unit.interner;
        match expanded.as_slice() {
            [single] if single.kind == TokenKind::String => {
                let text = interner.resolve(single.text);
                Some(HeaderName::Quoted(text.trim_matches('"').to_string()))
            }
            [open, inner @ .., close]
                if interner.resolve(open.text) == "<" && interner.resolve(close.text) == ">" =>
            {
                let name: String = inner.iter().map(|t| interner.resolve(t.text)).collect();
                Some(HeaderName::Angled(name))
            }
            _ => None,
        }
    }

    /// `#error` and `#warning` report the rest of the line verbatim.
    fn diagnostic_directive(&mut self, directive: Directive, location: SourceLocation) {
        let tokens = self.line_tokens();
        let text = tokens
            .iter()
            .map(|t| self.unit.interner.resolve(t.text))
            .collect::<Vec<_>>()
            .join(" ");
        let message = format!("#{} {text}", directive.name());
        if directive == Directive::Error {
            self.unit.error(location, message.trim_end().to_string());
        } else {
            self.unit.warning(location, message.trim_end().to_string());
        }
    }

    /// `#line N ["file"]`, operands macro-expanded first.
    fn line_directive(&mut self, location: SourceLocation) {
        let tokens = self.line_tokens();
        let expanded = self.macros.expand_all(
            &tokens,
            &mut self.unit.interner,
            self.limits.max_macro_expansion_depth,
        );
        let line = match expanded.first() {
            Some(t) if t.kind == TokenKind::Integer => t.int_value(),
            _ => None,
        };
        let Some(line) = line.and_then(|n| u32::try_from(n).ok()).filter(|&n| n > 0) else {
            self.unit
                .error(location, "#line directive requires a positive integer argument");
            return;
        };
        let file = match &expanded[1..] {
            [] => None,
            [name] if name.kind == TokenKind::String => {
                let name = self.unit.interner.resolve(name.text).trim_matches('"').to_string();
                Some((self.unit.sources.add(name.as_str()), name))
            }
            _ => {
                self.unit.error(location, "invalid filename in #line directive");
                return;
            }
        };
        if let Some(raw) = self.providers.active_raw_mut() {
            raw.lexer.renumber(line, file);
        }
    }

    fn pragma(&mut self) {
        let tokens = self.line_tokens();
        let is_once = tokens
            .first()
            .is_some_and(|t| self.unit.interner.resolve(t.text) == "once");
        if !is_once {
            tracing::debug!("ignoring #pragma");
            return;
        }
        if let Some(path) = self.providers.current_raw_mut().and_then(|raw| raw.path.clone()) {
            self.once.insert(include::normalize(&path));
        }
    }

    /// Replace `defined X` / `defined(X)`, expand macros, and evaluate.
    fn eval_condition(&mut self, tokens: &[Token], location: SourceLocation) -> bool {
        let mut replaced = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i];
            i += 1;
            if !(token.is_identifier() && self.unit.interner.resolve(token.text) == "defined") {
                replaced.push(token);
                continue;
            }
            let parenthesized = tokens.get(i).is_some_and(|t| t.is_punct(Punct::LParen));
            let name_at = if parenthesized { i + 1 } else { i };
            let name = tokens
                .get(name_at)
                .filter(|t| matches!(t.kind, TokenKind::Identifier | TokenKind::Keyword(_)));
            let closed = !parenthesized || tokens.get(name_at + 1).is_some_and(|t| t.is_punct(Punct::RParen));
            let Some(name) = name.filter(|_| closed) else {
                self.unit
                    .error(location, "operator \"defined\" requires an identifier");
                return false;
            };
            let defined = self.macros.contains(name.text);
            let text = self.unit.interner.intern(if defined { "1" } else { "0" });
            let mut value = Token::new(TokenKind::Integer, text, token.location);
            value.value = LiteralValue::Int(u64::from(defined));
            replaced.push(value);
            i = name_at + if parenthesized { 2 } else { 1 };
        }

        let expanded = self.macros.expand_all(
            &replaced,
            &mut self.unit.interner,
            self.limits.max_macro_expansion_depth,
        );
        match cond::evaluate(&expanded, &self.unit.interner) {
            Ok(value) => value != 0,
            Err(message) => {
                self.unit.error(location, message);
                false
            }
        }
    }
}
