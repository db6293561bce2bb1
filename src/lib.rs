//! # Introduction
//!
//! cfront is the front-end of a compiler for a C-like language. It turns a
//! source buffer into an arena-allocated AST with resolved scopes, reporting
//! problems to a diagnostics sink instead of stopping at the first one.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Comment strip → Raw lexer → Provider stack → Preprocessor → Parser → AST
//! ```
//!
//! 1. [`lexer`] strips comments and scans bytes into [`lexer::Token`]s.
//! 2. [`preprocess`] pulls tokens from a stack of raw and stream providers,
//!    runs directives, expands macros and follows includes.
//! 3. [`parser`] builds the [`parser::ast::Ast`] by recursive descent with
//!    precedence climbing, maintaining the scope tree as it goes.
//! 4. [`pass`] wraps the stages in the pass lifecycle a compiler driver uses.
//!
//! Everything one translation unit owns (file table, interner, diagnostics)
//! lives in a [`unit::CompileUnit`]; configuration is passed in explicitly
//! as a [`config::FrontendConfig`].
//!
//! ```
//! use cfront::parser::Parser;
//!
//! let outcome = Parser::from_source("main.c", "int main() { return 0; }")
//!     .unwrap()
//!     .parse_translation_unit();
//! assert!(!outcome.has_errors());
//! assert_eq!(outcome.ast.top_level().len(), 1);
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod pass;
pub mod preprocess;
pub mod source;
pub mod unit;
