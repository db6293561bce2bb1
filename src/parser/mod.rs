//! C source code parser
//!
//! This module turns the preprocessed token stream into an Abstract Syntax
//! Tree (AST):
//! - [`parse`]: the [`Parser`] and its entry point
//! - [`ast`]: arena and node definitions
//! - [`scope`]: scope tree plus the function and typedef tables
//! - [`dump`]: indented AST rendering
//!
//! # Supported C Subset
//!
//! - Types: `void`, `_Bool`, `char`, `short`, `int`, `long`, `long long`,
//!   `float`, `double`, `long double`, typedef names, pointers, arrays
//! - Statements: declarations, `if/else`, `while`, `do/while`, `for`,
//!   `return`, `break`, `continue`, blocks
//! - Expressions: the full C operator set, casts, `sizeof`, calls
//! - No structs, unions, enums, `switch` or `goto`
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with precedence climbing for binary operators.
//! No external parser generator dependencies.

pub mod ast;
mod declarations;
pub mod dump;
mod expressions;
pub mod parse;
pub mod scope;
mod statements;

pub use parse::{ParseOutcome, Parser};
