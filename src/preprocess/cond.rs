//! Conditional compilation: the `#if` group stack and the constant
//! expression evaluator for `#if`/`#elif` operands.

use crate::lexer::{Operator, Punct, Token, TokenKind};
use crate::source::{Interner, SourceLocation};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CondError {
    #[error("#{0} without #if")]
    Unmatched(&'static str),

    #[error("#elif after #else")]
    ElifAfterElse,

    #[error("#else after #else")]
    DuplicateElse,
}

/// One open `#if`/`#ifdef`/`#ifndef` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CondFrame {
    pub location: SourceLocation,
    /// Tokens in the current branch are emitted
    pub active: bool,
    /// Some branch of this group has already been taken
    pub taken: bool,
    pub seen_else: bool,
    /// The enclosing region is active
    pub parent_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CondStack {
    frames: Vec<CondFrame>,
}

impl CondStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.frames.last().map_or(true, |f| f.active)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push_if(&mut self, condition: bool, location: SourceLocation) {
        let parent_active = self.is_active();
        self.frames.push(CondFrame {
            location,
            active: parent_active && condition,
            taken: condition,
            seen_else: false,
            parent_active,
        });
    }

    /// Whether an `#elif` at this point needs its expression evaluated.
    pub fn elif_needs_eval(&self) -> bool {
        self.frames
            .last()
            .is_some_and(|f| f.parent_active && !f.taken && !f.seen_else)
    }

    pub fn elif(&mut self, condition: bool) -> Result<(), CondError> {
        let frame = self.frames.last_mut().ok_or(CondError::Unmatched("elif"))?;
        if frame.seen_else {
            return Err(CondError::ElifAfterElse);
        }
        if frame.taken || !frame.parent_active {
            frame.active = false;
        } else {
            frame.active = condition;
            frame.taken = condition;
        }
        Ok(())
    }

    pub fn else_branch(&mut self) -> Result<(), CondError> {
        let frame = self.frames.last_mut().ok_or(CondError::Unmatched("else"))?;
        if frame.seen_else {
            return Err(CondError::DuplicateElse);
        }
        frame.seen_else = true;
        frame.active = frame.parent_active && !frame.taken;
        frame.taken = true;
        Ok(())
    }

    pub fn endif(&mut self) -> Result<CondFrame, CondError> {
        self.frames.pop().ok_or(CondError::Unmatched("endif"))
    }

    /// Drop every frame above `depth`, returning them innermost last.
    pub fn truncate(&mut self, depth: usize) -> Vec<CondFrame> {
        if depth >= self.frames.len() {
            return Vec::new();
        }
        self.frames.split_off(depth)
    }
}

/// Evaluate a fully macro-expanded `#if` operand. `defined` must already
/// have been replaced; remaining identifiers evaluate to 0.
pub fn evaluate(tokens: &[Token], interner: &Interner) -> Result<i64, String> {
    let mut eval = Evaluator {
        tokens,
        pos: 0,
        interner,
    };
    let value = eval.conditional()?;
    match eval.peek() {
        None => Ok(value),
        Some(t) => Err(format!(
            "missing binary operator before {}",
            t.describe(interner)
        )),
    }
}

struct Evaluator<'a> {
    tokens: &'a [Token],
    pos: usize,
    interner: &'a Interner,
}

fn binary_precedence(op: Operator) -> Option<u8> {
    Some(match op {
        Operator::LogOr => 1,
        Operator::LogAnd => 2,
        Operator::BitOr => 3,
        Operator::BitXor => 4,
        Operator::BitAnd => 5,
        Operator::Eq | Operator::Ne => 6,
        Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge => 7,
        Operator::Shl | Operator::Shr => 8,
        Operator::Add | Operator::Sub => 9,
        Operator::Mul | Operator::Div | Operator::Mod => 10,
        _ => return None,
    })
}

impl Evaluator<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).copied();
        self.pos += 1;
        token
    }

    fn peek_op(&self) -> Option<Operator> {
        match self.peek()?.kind {
            TokenKind::Operator(op) => Some(op),
            _ => None,
        }
    }

    fn conditional(&mut self) -> Result<i64, String> {
        let cond = self.binary(1)?;
        if self.peek_op() != Some(Operator::Question) {
            return Ok(cond);
        }
        self.advance();
        let then_value = self.conditional()?;
        if self.peek_op() != Some(Operator::Colon) {
            return Err("expected ':' in preprocessor expression".to_string());
        }
        self.advance();
        let else_value = self.conditional()?;
        Ok(if cond != 0 { then_value } else { else_value })
    }

    fn binary(&mut self, min_prec: u8) -> Result<i64, String> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.peek_op() {
            let Some(prec) = binary_precedence(op) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.advance();
            let rhs = self.binary(prec + 1)?;
            lhs = apply(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<i64, String> {
        let Some(token) = self.advance() else {
            return Err("#if with no expression".to_string());
        };
        match token.kind {
            TokenKind::Operator(Operator::Sub) => Ok(self.unary()?.wrapping_neg()),
            TokenKind::Operator(Operator::Add) => self.unary(),
            TokenKind::Operator(Operator::LogNot) => Ok(i64::from(self.unary()? == 0)),
            TokenKind::Operator(Operator::BitNot) => Ok(!self.unary()?),
            TokenKind::Punct(Punct::LParen) => {
                let value = self.conditional()?;
                match self.advance() {
                    Some(t) if t.is_punct(Punct::RParen) => Ok(value),
                    _ => Err("missing ')' in expression".to_string()),
                }
            }
            TokenKind::Integer | TokenKind::Char => Ok(token.int_value().unwrap_or(0) as i64),
            TokenKind::Identifier | TokenKind::Keyword(_) => Ok(0),
            TokenKind::Float => Err("floating constant in preprocessor expression".to_string()),
            _ => Err(format!(
                "token {} is not valid in preprocessor expressions",
                token.describe(self.interner)
            )),
        }
    }
}

fn apply(op: Operator, lhs: i64, rhs: i64) -> Result<i64, String> {
    Ok(match op {
        Operator::LogOr => i64::from(lhs != 0 || rhs != 0),
        Operator::LogAnd => i64::from(lhs != 0 && rhs != 0),
        Operator::BitOr => lhs | rhs,
        Operator::BitXor => lhs ^ rhs,
        Operator::BitAnd => lhs & rhs,
        Operator::Eq => i64::from(lhs == rhs),
        Operator::Ne => i64::from(lhs != rhs),
        Operator::Lt => i64::from(lhs < rhs),
        Operator::Gt => i64::from(lhs > rhs),
        Operator::Le => i64::from(lhs <= rhs),
        Operator::Ge => i64::from(lhs >= rhs),
        Operator::Shl => lhs.wrapping_shl(rhs as u32),
        Operator::Shr => lhs.wrapping_shr(rhs as u32),
        Operator::Add => lhs.wrapping_add(rhs),
        Operator::Sub => lhs.wrapping_sub(rhs),
        Operator::Mul => lhs.wrapping_mul(rhs),
        Operator::Div | Operator::Mod if rhs == 0 => {
            return Err("division by zero in preprocessor expression".to_string())
        }
        Operator::Div => lhs.wrapping_div(rhs),
        Operator::Mod => lhs.wrapping_rem(rhs),
        _ => return Err(format!("unexpected operator '{}'", op.as_str())),
    })
}
