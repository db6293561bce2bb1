//! Token kinds, the operator and keyword tables, and the [`Token`] record.

use crate::error::LexErrorKind;
use crate::source::{Interner, SourceLocation, Symbol};
use std::fmt;

/// Single-character punctuators that never combine with a following byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
}

impl Punct {
    pub fn from_byte(byte: u8) -> Option<Punct> {
        Some(match byte {
            b'(' => Punct::LParen,
            b')' => Punct::RParen,
            b'{' => Punct::LBrace,
            b'}' => Punct::RBrace,
            b'[' => Punct::LBracket,
            b']' => Punct::RBracket,
            b';' => Punct::Semicolon,
            b',' => Punct::Comma,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::LBracket => "[",
            Punct::RBracket => "]",
            Punct::Semicolon => ";",
            Punct::Comma => ",",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Inc,
    Dec,
    BitNot,
    LogNot,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    LogAnd,
    LogOr,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    Dot,
    Arrow,
    Ellipsis,
    Question,
    Colon,
    Hash,
    HashHash,
}

/// Operator spellings, longest first so the first prefix hit is the
/// longest match.
pub const OPERATORS: &[(&str, Operator)] = &[
    ("<<=", Operator::ShlAssign),
    (">>=", Operator::ShrAssign),
    ("...", Operator::Ellipsis),
    ("++", Operator::Inc),
    ("--", Operator::Dec),
    ("->", Operator::Arrow),
    ("<<", Operator::Shl),
    (">>", Operator::Shr),
    ("&&", Operator::LogAnd),
    ("||", Operator::LogOr),
    ("==", Operator::Eq),
    ("!=", Operator::Ne),
    ("<=", Operator::Le),
    (">=", Operator::Ge),
    ("+=", Operator::AddAssign),
    ("-=", Operator::SubAssign),
    ("*=", Operator::MulAssign),
    ("/=", Operator::DivAssign),
    ("%=", Operator::ModAssign),
    ("&=", Operator::AndAssign),
    ("|=", Operator::OrAssign),
    ("^=", Operator::XorAssign),
    ("##", Operator::HashHash),
    ("+", Operator::Add),
    ("-", Operator::Sub),
    ("*", Operator::Mul),
    ("/", Operator::Div),
    ("%", Operator::Mod),
    ("~", Operator::BitNot),
    ("!", Operator::LogNot),
    ("&", Operator::BitAnd),
    ("|", Operator::BitOr),
    ("^", Operator::BitXor),
    ("<", Operator::Lt),
    (">", Operator::Gt),
    ("=", Operator::Assign),
    (".", Operator::Dot),
    ("?", Operator::Question),
    (":", Operator::Colon),
    ("#", Operator::Hash),
];

impl Operator {
    /// Longest operator spelled at the start of `input`, with its length.
    pub fn longest_match(input: &[u8]) -> Option<(Operator, usize)> {
        OPERATORS
            .iter()
            .find(|(spelling, _)| input.starts_with(spelling.as_bytes()))
            .map(|&(spelling, op)| (op, spelling.len()))
    }

    pub fn as_str(self) -> &'static str {
        OPERATORS
            .iter()
            .find(|&&(_, op)| op == self)
            .map_or("?", |&(spelling, _)| spelling)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Auto,
    Bool,
    Break,
    Case,
    Char,
    Const,
    Continue,
    Default,
    Do,
    Double,
    Else,
    Enum,
    Extern,
    Float,
    For,
    Goto,
    If,
    Inline,
    Int,
    Long,
    Register,
    Restrict,
    Return,
    Short,
    Signed,
    Sizeof,
    Static,
    Struct,
    Switch,
    Typedef,
    Union,
    Unsigned,
    Void,
    Volatile,
    While,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("auto", Keyword::Auto),
    ("_Bool", Keyword::Bool),
    ("break", Keyword::Break),
    ("case", Keyword::Case),
    ("char", Keyword::Char),
    ("const", Keyword::Const),
    ("continue", Keyword::Continue),
    ("default", Keyword::Default),
    ("do", Keyword::Do),
    ("double", Keyword::Double),
    ("else", Keyword::Else),
    ("enum", Keyword::Enum),
    ("extern", Keyword::Extern),
    ("float", Keyword::Float),
    ("for", Keyword::For),
    ("goto", Keyword::Goto),
    ("if", Keyword::If),
    ("inline", Keyword::Inline),
    ("int", Keyword::Int),
    ("long", Keyword::Long),
    ("register", Keyword::Register),
    ("restrict", Keyword::Restrict),
    ("return", Keyword::Return),
    ("short", Keyword::Short),
    ("signed", Keyword::Signed),
    ("sizeof", Keyword::Sizeof),
    ("static", Keyword::Static),
    ("struct", Keyword::Struct),
    ("switch", Keyword::Switch),
    ("typedef", Keyword::Typedef),
    ("union", Keyword::Union),
    ("unsigned", Keyword::Unsigned),
    ("void", Keyword::Void),
    ("volatile", Keyword::Volatile),
    ("while", Keyword::While),
];

impl Keyword {
    pub fn lookup(word: &[u8]) -> Option<Keyword> {
        KEYWORDS
            .iter()
            .find(|(spelling, _)| spelling.as_bytes() == word)
            .map(|&(_, kw)| kw)
    }

    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|&&(_, kw)| kw == self)
            .map_or("?", |&(spelling, _)| spelling)
    }
}

/// Kind and sub-kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Error(LexErrorKind),
    Eof,
    /// `#` as the first token on a line
    Hash,
    Integer,
    Float,
    Identifier,
    String,
    Char,
    Keyword(Keyword),
    Operator(Operator),
    Punct(Punct),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Error(kind) => write!(f, "invalid token ({kind})"),
            TokenKind::Eof => write!(f, "end of file"),
            TokenKind::Hash => write!(f, "'#'"),
            TokenKind::Integer => write!(f, "integer constant"),
            TokenKind::Float => write!(f, "floating constant"),
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::String => write!(f, "string literal"),
            TokenKind::Char => write!(f, "character constant"),
            TokenKind::Keyword(kw) => write!(f, "'{}'", kw.as_str()),
            TokenKind::Operator(op) => write!(f, "'{}'", op.as_str()),
            TokenKind::Punct(p) => write!(f, "'{}'", p.as_str()),
        }
    }
}

/// Decoded literal payload.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LiteralValue {
    #[default]
    None,
    Int(u64),
    Float(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact spelling, interned
    pub text: Symbol,
    pub location: SourceLocation,
    pub value: LiteralValue,
    /// Set only on a `#` that is the first token of its line.
    pub bol_hash: bool,
}

impl Token {
    pub fn new(kind: TokenKind, text: Symbol, location: SourceLocation) -> Self {
        Self {
            kind,
            text,
            location,
            value: LiteralValue::None,
            bol_hash: false,
        }
    }

    pub fn eof(location: SourceLocation) -> Self {
        Self::new(TokenKind::Eof, Symbol::EMPTY, location)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    pub fn is_punct(&self, punct: Punct) -> bool {
        self.kind == TokenKind::Punct(punct)
    }

    pub fn is_op(&self, op: Operator) -> bool {
        self.kind == TokenKind::Operator(op)
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.kind == TokenKind::Keyword(kw)
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    /// Identifier or keyword, i.e. anything usable as a macro name.
    pub fn is_name(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::Keyword(_))
    }

    pub fn int_value(&self) -> Option<u64> {
        match self.value {
            LiteralValue::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Human readable rendering for diagnostics, e.g. `identifier 'x'`.
    pub fn describe(&self, interner: &Interner) -> String {
        match self.kind {
            TokenKind::Identifier
            | TokenKind::Integer
            | TokenKind::Float
            | TokenKind::Char
            | TokenKind::String => format!("{} '{}'", self.kind, interner.resolve(self.text)),
            _ => self.kind.to_string(),
        }
    }
}
