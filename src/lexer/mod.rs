//! Lexical analysis
//!
//! - `comments`: comment stripping applied to every buffer before lexing
//! - `numbers`: numeric literal scanning (radix, fraction, exponent, suffix)
//! - `raw`: the byte-level [`RawLexer`]
//! - `token`: token kinds, operator/keyword tables and the [`Token`] record

pub mod comments;
pub mod numbers;
pub mod raw;
pub mod token;

pub use raw::{HeaderName, RawLexer};
pub use token::{Keyword, LiteralValue, Operator, Punct, Token, TokenKind};
