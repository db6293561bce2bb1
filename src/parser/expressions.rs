//! Expression parsing implementation
//!
//! Binary operators are parsed by precedence climbing over the table in
//! [`binary_info`]. Unary prefix operators, casts and `sizeof` bind tighter
//! than any binary operator; postfix operators are applied in a loop after
//! the primary expression.
//!
//! # Precedence (lowest to highest)
//!
//! ```text
//!  1  = += -= *= /= %= <<= >>= &= ^= |=   right
//!  2  ?:                                   right
//!  3  ||        4  &&       5  |       6  ^       7  &
//!  8  == !=     9  < <= > >=          10  << >>
//! 11  + -      12  * / %                          left
//! ```
//!
//! The comma operator sits below assignment and is only handled by
//! [`Parser::parse_expression`].

use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::numbers::scan_number;
use crate::lexer::{Keyword, LiteralValue, Operator, Punct, Token, TokenKind};
use crate::parser::ast::*;
use crate::parser::parse::Parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
enum Infix {
    Binary(BinOp),
    Assign(AssignOp),
    Conditional,
}

const ASSIGNMENT_PRECEDENCE: u8 = 1;

/// Precedence, associativity and meaning of an infix operator token.
fn binary_info(kind: TokenKind) -> Option<(u8, Assoc, Infix)> {
    let TokenKind::Operator(op) = kind else {
        return None;
    };
    let binary = |prec, op| Some((prec, Assoc::Left, Infix::Binary(op)));
    let assign = |op| Some((ASSIGNMENT_PRECEDENCE, Assoc::Right, Infix::Assign(op)));

    match op {
        Operator::Assign => assign(AssignOp::Assign),
        Operator::AddAssign => assign(AssignOp::Add),
        Operator::SubAssign => assign(AssignOp::Sub),
        Operator::MulAssign => assign(AssignOp::Mul),
        Operator::DivAssign => assign(AssignOp::Div),
        Operator::ModAssign => assign(AssignOp::Mod),
        Operator::ShlAssign => assign(AssignOp::Shl),
        Operator::ShrAssign => assign(AssignOp::Shr),
        Operator::AndAssign => assign(AssignOp::And),
        Operator::XorAssign => assign(AssignOp::Xor),
        Operator::OrAssign => assign(AssignOp::Or),
        Operator::Question => Some((2, Assoc::Right, Infix::Conditional)),
        Operator::LogOr => binary(3, BinOp::LogOr),
        Operator::LogAnd => binary(4, BinOp::LogAnd),
        Operator::BitOr => binary(5, BinOp::BitOr),
        Operator::BitXor => binary(6, BinOp::BitXor),
        Operator::BitAnd => binary(7, BinOp::BitAnd),
        Operator::Eq => binary(8, BinOp::Eq),
        Operator::Ne => binary(8, BinOp::Ne),
        Operator::Lt => binary(9, BinOp::Lt),
        Operator::Le => binary(9, BinOp::Le),
        Operator::Gt => binary(9, BinOp::Gt),
        Operator::Ge => binary(9, BinOp::Ge),
        Operator::Shl => binary(10, BinOp::Shl),
        Operator::Shr => binary(10, BinOp::Shr),
        Operator::Add => binary(11, BinOp::Add),
        Operator::Sub => binary(11, BinOp::Sub),
        Operator::Mul => binary(12, BinOp::Mul),
        Operator::Div => binary(12, BinOp::Div),
        Operator::Mod => binary(12, BinOp::Mod),
        _ => None,
    }
}

fn prefix_op(op: Operator) -> Option<UnOp> {
    Some(match op {
        Operator::Add => UnOp::Plus,
        Operator::Sub => UnOp::Neg,
        Operator::LogNot => UnOp::Not,
        Operator::BitNot => UnOp::BitNot,
        Operator::Inc => UnOp::PreInc,
        Operator::Dec => UnOp::PreDec,
        Operator::Mul => UnOp::Deref,
        Operator::BitAnd => UnOp::AddrOf,
        _ => return None,
    })
}

/// Decode an integer suffix: any order of one `u` and one `l`/`ll`.
fn int_suffix(suffix: &str) -> Option<IntSuffix> {
    let mut decoded = IntSuffix::default();
    let mut rest = suffix;
    while !rest.is_empty() {
        if !decoded.unsigned && rest.starts_with(['u', 'U']) {
            decoded.unsigned = true;
            rest = &rest[1..];
        } else if decoded.long_count == 0 && (rest.starts_with("ll") || rest.starts_with("LL")) {
            decoded.long_count = 2;
            rest = &rest[2..];
        } else if decoded.long_count == 0 && rest.starts_with(['l', 'L']) {
            decoded.long_count = 1;
            rest = &rest[1..];
        } else {
            return None;
        }
    }
    Some(decoded)
}

fn float_suffix(suffix: &str) -> Option<FloatSuffix> {
    match suffix {
        "" => Some(FloatSuffix::None),
        "f" | "F" => Some(FloatSuffix::F),
        "l" | "L" => Some(FloatSuffix::L),
        _ => None,
    }
}

impl Parser {
    /// Parse a full expression, comma operator included.
    pub(crate) fn parse_expression(&mut self) -> Result<NodeId, ParseError> {
        let mut expr = self.parse_assignment()?;
        while self.check_punct(Punct::Comma) {
            let location = self.advance().location;
            let rhs = self.parse_assignment()?;
            expr = self.ast.alloc(
                NodeKind::Binary {
                    op: BinOp::Comma,
                    lhs: expr,
                    rhs,
                },
                location,
            );
        }
        Ok(expr)
    }

    /// Parse an expression without a top-level comma (initializers, arguments).
    pub(crate) fn parse_assignment(&mut self) -> Result<NodeId, ParseError> {
        self.parse_binary(ASSIGNMENT_PRECEDENCE)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<NodeId, ParseError> {
        self.nested(|p| p.parse_binary_inner(min_precedence))
    }

    fn parse_binary_inner(&mut self, min_precedence: u8) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_unary()?;

        loop {
            let token = self.peek();
            let Some((precedence, assoc, infix)) = binary_info(token.kind) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            self.advance();

            let next = match assoc {
                Assoc::Left => precedence + 1,
                Assoc::Right => precedence,
            };
            let kind = match infix {
                Infix::Binary(op) => NodeKind::Binary {
                    op,
                    lhs,
                    rhs: self.parse_binary(next)?,
                },
                Infix::Assign(op) => NodeKind::Assign {
                    op,
                    target: lhs,
                    value: self.parse_binary(next)?,
                },
                Infix::Conditional => {
                    let then_expr = self.parse_expression()?;
                    self.expect_op(Operator::Colon, "in conditional expression")?;
                    NodeKind::Conditional {
                        condition: lhs,
                        then_expr,
                        else_expr: self.parse_binary(next)?,
                    }
                }
            };
            lhs = self.ast.alloc(kind, token.location);
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<NodeId, ParseError> {
        self.nested(|p| p.parse_unary_inner())
    }

    fn parse_unary_inner(&mut self) -> Result<NodeId, ParseError> {
        let token = self.peek();
        let location = token.location;

        let prefix = match token.kind {
            TokenKind::Operator(op) => prefix_op(op),
            _ => None,
        };
        if let Some(op) = prefix {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(self.ast.alloc(NodeKind::Unary { op, operand }, location));
        }

        match token.kind {
            TokenKind::Keyword(Keyword::Sizeof) => {
                self.advance();
                if self.check_punct(Punct::LParen) && self.is_type_start_at(1) {
                    self.advance();
                    let target = self.parse_type_name()?;
                    self.expect_punct(Punct::RParen, "after type name")?;
                    return Ok(self.ast.alloc(NodeKind::SizeofType { target }, location));
                }
                let operand = self.parse_unary()?;
                Ok(self.ast.alloc(
                    NodeKind::Unary {
                        op: UnOp::Sizeof,
                        operand,
                    },
                    location,
                ))
            }
            TokenKind::Punct(Punct::LParen) if self.is_type_start_at(1) => {
                self.advance();
                let target = self.parse_type_name()?;
                self.expect_punct(Punct::RParen, "after type name")?;
                let expr = self.parse_unary()?;
                Ok(self.ast.alloc(NodeKind::Cast { target, expr }, location))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_type_name(&mut self) -> Result<Type, ParseError> {
        let ty = self.parse_type()?;
        self.parse_array_dims(ty)
    }

    fn parse_postfix(&mut self) -> Result<NodeId, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            let token = self.peek();
            let kind = match token.kind {
                TokenKind::Punct(Punct::LBracket) => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect_punct(Punct::RBracket, "after array index")?;
                    NodeKind::Index { base: expr, index }
                }
                TokenKind::Operator(op @ (Operator::Dot | Operator::Arrow)) => {
                    self.advance();
                    let (member, _) = self.expect_identifier(&format!("after '{}'", op.as_str()))?;
                    NodeKind::Member {
                        base: expr,
                        member,
                        through_pointer: op == Operator::Arrow,
                    }
                }
                TokenKind::Operator(Operator::Inc) => {
                    self.advance();
                    NodeKind::Unary {
                        op: UnOp::PostInc,
                        operand: expr,
                    }
                }
                TokenKind::Operator(Operator::Dec) => {
                    self.advance();
                    NodeKind::Unary {
                        op: UnOp::PostDec,
                        operand: expr,
                    }
                }
                TokenKind::Punct(Punct::LParen) => {
                    return Err(ParseError::new(
                        ParseErrorKind::Invalid("called object is not a function name".to_string()),
                        token.location,
                    ));
                }
                _ => break,
            };
            expr = self.ast.alloc(kind, token.location);
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<NodeId, ParseError> {
        let token = self.peek();
        let location = token.location;

        match token.kind {
            TokenKind::Integer => {
                self.advance();
                let value = token.int_value().unwrap_or(0);
                let suffix = self.literal_suffix(token, "integer", int_suffix);
                Ok(self.ast.alloc(NodeKind::IntLiteral { value, suffix }, location))
            }
            TokenKind::Float => {
                self.advance();
                let value = match token.value {
                    LiteralValue::Float(v) => v,
                    _ => 0.0,
                };
                let suffix = self.literal_suffix(token, "floating", float_suffix);
                Ok(self.ast.alloc(NodeKind::FloatLiteral { value, suffix }, location))
            }
            TokenKind::Char => {
                self.advance();
                let value = token.int_value().unwrap_or(0);
                Ok(self.ast.alloc(NodeKind::CharLiteral { value }, location))
            }
            TokenKind::String => {
                let mut pieces = Vec::new();
                while self.peek().kind == TokenKind::String {
                    pieces.push(self.advance().text);
                }
                Ok(self.ast.alloc(NodeKind::StringLiteral { pieces }, location))
            }
            TokenKind::Identifier if self.peek_nth(1).is_punct(Punct::LParen) => self.parse_call(token),
            TokenKind::Identifier => {
                self.advance();
                let decl = self.ast.scopes().lookup(token.text);
                Ok(self.ast.alloc(
                    NodeKind::Variable {
                        name: token.text,
                        decl,
                    },
                    location,
                ))
            }
            TokenKind::Punct(Punct::LParen) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_punct(Punct::RParen, "after expression")?;
                Ok(expr)
            }
            _ => Err(self.expected("expression")),
        }
    }

    /// Decode the suffix of a numeric literal, reporting a bad one and
    /// falling back to no suffix.
    fn literal_suffix<S: Default>(
        &mut self,
        token: Token,
        literal: &'static str,
        decode: fn(&str) -> Option<S>,
    ) -> S {
        let text = self.resolve(token.text);
        let start = scan_number(text.as_bytes()).suffix_start.min(text.len());
        let suffix = text.get(start..).unwrap_or_default();
        match decode(suffix) {
            Some(decoded) => decoded,
            None => {
                let suffix = suffix.to_string();
                self.report(ParseError::new(
                    ParseErrorKind::InvalidSuffix { suffix, literal },
                    token.location,
                ));
                S::default()
            }
        }
    }

    /// Parse `name(args)`. The callee must already be in the function
    /// table; an undeclared callee is reported and the call still parsed.
    fn parse_call(&mut self, name_token: Token) -> Result<NodeId, ParseError> {
        self.advance();
        self.advance();

        let name = name_token.text;
        let function = self.ast.scopes().function(name);
        if function.is_none() {
            let spelled = self.resolve(name).to_string();
            self.report(ParseError::new(
                ParseErrorKind::UndeclaredFunction(spelled),
                name_token.location,
            ));
        }

        let mut args = Vec::new();
        if !self.match_punct(Punct::RParen) {
            loop {
                args.push(self.parse_assignment()?);
                if !self.match_punct(Punct::Comma) {
                    self.expect_punct(Punct::RParen, "after function arguments")?;
                    break;
                }
            }
        }

        Ok(self.ast.alloc(NodeKind::Call { name, function, args }, name_token.location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::ParseOutcome;
    use rstest::rstest;

    fn parse(source: &str) -> ParseOutcome {
        Parser::from_source("test.c", source)
            .expect("lexer")
            .parse_translation_unit()
    }

    fn messages(outcome: &ParseOutcome) -> Vec<String> {
        outcome.diagnostics().iter().map(|d| d.message.clone()).collect()
    }

    /// Parse `int probe = <expr>;` and return the initializer.
    fn parse_init(expr: &str) -> (ParseOutcome, NodeId) {
        let outcome = parse(&format!("int a; int b; int c; int probe = {expr};"));
        let decl = *outcome.ast.top_level().last().expect("declaration");
        let init = match outcome.ast.kind(decl) {
            NodeKind::VarDecl { init: Some(init), .. } => *init,
            other => panic!("Expected initialized variable, got {other:?}"),
        };
        (outcome, init)
    }

    /// Fully parenthesized rendering of an expression tree.
    fn render(outcome: &ParseOutcome, id: NodeId) -> String {
        match outcome.ast.kind(id) {
            NodeKind::IntLiteral { value, .. } => value.to_string(),
            NodeKind::Variable { name, .. } => outcome.name(*name).to_string(),
            NodeKind::Binary { op, lhs, rhs } => {
                format!("({} {:?} {})", render(outcome, *lhs), op, render(outcome, *rhs))
            }
            NodeKind::Assign { op, target, value } => {
                format!("({} {:?}= {})", render(outcome, *target), op, render(outcome, *value))
            }
            NodeKind::Unary { op, operand } => format!("({:?} {})", op, render(outcome, *operand)),
            NodeKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => format!(
                "({} ? {} : {})",
                render(outcome, *condition),
                render(outcome, *then_expr),
                render(outcome, *else_expr)
            ),
            other => format!("{other:?}"),
        }
    }

    #[rstest]
    #[case("1 + 2 * 3", "(1 Add (2 Mul 3))")]
    #[case("1 * 2 + 3", "((1 Mul 2) Add 3)")]
    #[case("1 - 2 - 3", "((1 Sub 2) Sub 3)")]
    #[case("a < b == b < c", "((a Lt b) Eq (b Lt c))")]
    #[case("a || b && c", "(a LogOr (b LogAnd c))")]
    #[case("a | b ^ c & 1", "(a BitOr (b BitXor (c BitAnd 1)))")]
    #[case("1 << 2 + 3", "(1 Shl (2 Add 3))")]
    #[case("a = b = c", "(a Assign= (b Assign= c))")]
    #[case("a += b -= 1", "(a Add= (b Sub= 1))")]
    #[case("a ? b : c ? 1 : 2", "(a ? b : (c ? 1 : 2))")]
    #[case("-a * b", "((Neg a) Mul b)")]
    #[case("!a++", "(Not (PostInc a))")]
    #[case("(1 + 2) * 3", "((1 Add 2) Mul 3)")]
    fn test_precedence_and_associativity(#[case] source: &str, #[case] expected: &str) {
        let (outcome, init) = parse_init(source);
        assert!(!outcome.has_errors(), "{:?}", messages(&outcome));
        assert_eq!(render(&outcome, init), expected);
    }

    #[rstest]
    #[case("42", 42, false, 0)]
    #[case("42u", 42, true, 0)]
    #[case("42UL", 42, true, 1)]
    #[case("0x10ll", 16, false, 2)]
    #[case("7LLU", 7, true, 2)]
    fn test_integer_suffixes(
        #[case] source: &str,
        #[case] value: u64,
        #[case] unsigned: bool,
        #[case] long_count: u8,
    ) {
        let (outcome, init) = parse_init(source);
        assert!(!outcome.has_errors(), "{:?}", messages(&outcome));
        assert_eq!(
            outcome.ast.kind(init),
            &NodeKind::IntLiteral {
                value,
                suffix: IntSuffix { unsigned, long_count },
            }
        );
    }

    #[test]
    fn test_invalid_suffix_is_reported() {
        let (outcome, init) = parse_init("12abc");
        assert_eq!(messages(&outcome), vec!["invalid suffix 'abc' on integer constant"]);
        assert!(matches!(outcome.ast.kind(init), NodeKind::IntLiteral { value: 12, .. }));
    }

    #[test]
    fn test_float_literal() {
        let (outcome, init) = parse_init("2.5f");
        assert!(!outcome.has_errors(), "{:?}", messages(&outcome));
        assert_eq!(
            outcome.ast.kind(init),
            &NodeKind::FloatLiteral {
                value: 2.5,
                suffix: FloatSuffix::F,
            }
        );
    }

    #[test]
    fn test_adjacent_strings_concatenate() {
        let outcome = parse("char *s = \"ab\" \"cd\";");
        let decl = outcome.ast.top_level()[0];
        let NodeKind::VarDecl { init: Some(init), .. } = outcome.ast.kind(decl) else {
            panic!("Expected initialized declaration");
        };
        match outcome.ast.kind(*init) {
            NodeKind::StringLiteral { pieces } => {
                let spelled: Vec<_> = pieces.iter().map(|&p| outcome.name(p)).collect();
                assert_eq!(spelled, vec!["\"ab\"", "\"cd\""]);
            }
            other => panic!("Expected string literal, got {other:?}"),
        }
    }

    #[test]
    fn test_cast_and_sizeof() {
        let (outcome, init) = parse_init("(long)sizeof(int) + sizeof a");
        assert!(!outcome.has_errors(), "{:?}", messages(&outcome));
        let NodeKind::Binary { lhs, rhs, .. } = outcome.ast.kind(init) else {
            panic!("Expected binary expression");
        };
        match outcome.ast.kind(*lhs) {
            NodeKind::Cast { target, expr } => {
                assert_eq!(target.base, BaseType::Long);
                assert!(matches!(outcome.ast.kind(*expr), NodeKind::SizeofType { .. }));
            }
            other => panic!("Expected cast, got {other:?}"),
        }
        assert!(matches!(
            outcome.ast.kind(*rhs),
            NodeKind::Unary { op: UnOp::Sizeof, .. }
        ));
    }

    #[test]
    fn test_postfix_chain() {
        let outcome = parse("int f(int *p) { return p[1]->x.y; }");
        assert!(!outcome.has_errors(), "{:?}", messages(&outcome));
    }

    #[test]
    fn test_call_requires_declaration() {
        let outcome = parse("int main() { return g(1); }");
        assert_eq!(messages(&outcome), vec!["implicit declaration of function 'g'"]);
    }

    #[test]
    fn test_call_resolves_prototype_and_recursion() {
        let outcome = parse("int g(int x); int fact(int n) { return n ? n * fact(n - 1) : g(1, 2); }");
        assert!(!outcome.has_errors(), "{:?}", messages(&outcome));
    }

    #[test]
    fn test_undeclared_variable_is_left_unresolved() {
        let (outcome, init) = parse_init("missing");
        assert!(!outcome.has_errors());
        assert!(matches!(outcome.ast.kind(init), NodeKind::Variable { decl: None, .. }));
    }

    #[test]
    fn test_missing_operand() {
        let outcome = parse("int x = 1 + ;");
        assert_eq!(messages(&outcome), vec!["expected expression, found ';'"]);
    }
}
