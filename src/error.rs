//! Error types shared across the front-end.

use crate::source::SourceLocation;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why the raw lexer produced an error token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum LexErrorKind {
    /// A byte that starts no token
    #[error("invalid character")]
    InvalidChar,

    #[error("missing terminating '\"' character")]
    UnterminatedString,

    #[error("missing terminating ' character")]
    UnterminatedChar,

    #[error("unterminated comment")]
    UnterminatedComment,

    #[error("empty character constant")]
    EmptyChar,

    #[error("exponent has no digits")]
    MissingExponent,
}

/// Lexing failure that prevents a buffer from being tokenized at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Lexer error at line {}, column {}: {kind}", location.line, location.column)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub location: SourceLocation,
}

impl LexError {
    pub fn new(kind: LexErrorKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }
}

/// What went wrong while parsing a construct.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("expected {expected}, found {found}")]
    Expected { expected: String, found: String },

    #[error("redeclaration of '{0}'")]
    Redeclaration(String),

    #[error("redefinition of function '{0}'")]
    FunctionRedefinition(String),

    /// Call to a name absent from the function table at the call site
    #[error("implicit declaration of function '{0}'")]
    UndeclaredFunction(String),

    #[error("unknown type name '{0}'")]
    UnknownTypeName(String),

    #[error("invalid suffix '{suffix}' on {literal} constant")]
    InvalidSuffix { suffix: String, literal: &'static str },

    #[error("cannot combine '{0}' with previous declaration specifiers")]
    InvalidSpecifiers(String),

    #[error("{0}")]
    Invalid(String),

    #[error("bracket nesting level exceeded maximum of {0}")]
    TooDeeplyNested(usize),
}

/// Parse error with location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub location: SourceLocation,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error at line {}, column {}: {}",
            self.location.line, self.location.column, self.kind
        )
    }
}

impl std::error::Error for ParseError {}

/// Failures that stop the front-end before or between passes.
#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("pass '{pass}' requires '{missing}' to run first")]
    MissingDependency {
        pass: &'static str,
        missing: &'static str,
    },

    #[error("{0} error(s) generated")]
    Failed(usize),
}
