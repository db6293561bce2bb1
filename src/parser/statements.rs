//! Statement parsing implementation
//!
//! # Grammar
//!
//! ```text
//! statement ::= block | "if" "(" expr ")" statement ("else" statement)?
//!             | "while" "(" expr ")" statement
//!             | "do" statement "while" "(" expr ")" ";"
//!             | "for" "(" (declaration | expr? ";") expr? ";" expr? ")" statement
//!             | "return" expr? ";" | "break" ";" | "continue" ";"
//!             | ";" | declaration | expr ";"
//! block     ::= "{" statement* "}"
//! ```
//!
//! An `else` always binds to the nearest unmatched `if`. Every block opens a
//! scope; a `for` opens one around its whole header and body.

use crate::error::ParseError;
use crate::lexer::{Keyword, Punct, TokenKind};
use crate::parser::ast::*;
use crate::parser::declarations::DeclContext;
use crate::parser::parse::Parser;
use crate::parser::scope::ScopeId;
use crate::source::SourceLocation;

impl Parser {
    pub(crate) fn parse_statement(&mut self) -> Result<NodeId, ParseError> {
        self.nested(|p| p.parse_statement_inner())
    }

    fn parse_statement_inner(&mut self) -> Result<NodeId, ParseError> {
        let token = self.peek();
        let location = token.location;

        match token.kind {
            TokenKind::Punct(Punct::LBrace) => self.parse_block(),
            TokenKind::Punct(Punct::Semicolon) => {
                self.advance();
                Ok(self.ast.alloc(NodeKind::Empty, location))
            }
            TokenKind::Keyword(Keyword::If) => self.parse_if_statement(),
            TokenKind::Keyword(Keyword::While) => self.parse_while_statement(),
            TokenKind::Keyword(Keyword::Do) => self.parse_do_while_statement(),
            TokenKind::Keyword(Keyword::For) => self.parse_for_statement(),
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                let value = if self.check_punct(Punct::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect_semicolon("after return statement")?;
                Ok(self.ast.alloc(NodeKind::Return { value }, location))
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                self.expect_semicolon("after 'break'")?;
                Ok(self.ast.alloc(NodeKind::Break, location))
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                self.expect_semicolon("after 'continue'")?;
                Ok(self.ast.alloc(NodeKind::Continue, location))
            }
            _ if self.is_declaration_start() => self.parse_declaration(DeclContext::Local),
            _ => {
                let expr = self.parse_expression()?;
                self.expect_semicolon("after expression")?;
                Ok(self.ast.alloc(NodeKind::ExprStmt { expr }, location))
            }
        }
    }

    /// Parse `{ ... }` in a fresh scope.
    pub(crate) fn parse_block(&mut self) -> Result<NodeId, ParseError> {
        let location = self.expect_punct(Punct::LBrace, "to open block")?.location;
        let scope = self.ast.scopes_mut().enter();
        tracing::trace!(scope = scope.index(), "enter scope");
        let result = self.parse_block_items(scope, location);
        self.ast.scopes_mut().exit();
        result
    }

    /// Parse `{ ... }` in a scope that is already current.
    pub(crate) fn parse_block_in_scope(&mut self, scope: ScopeId) -> Result<NodeId, ParseError> {
        let location = self.expect_punct(Punct::LBrace, "to open block")?.location;
        self.parse_block_items(scope, location)
    }

    /// Statements up to the closing `}`. A failed statement is reported and
    /// skipped so the rest of the block still parses.
    fn parse_block_items(&mut self, scope: ScopeId, location: SourceLocation) -> Result<NodeId, ParseError> {
        let mut stmts = Vec::new();

        loop {
            if self.match_punct(Punct::RBrace) {
                break;
            }
            if self.is_at_end() {
                return Err(self.expected("'}' at end of block"));
            }
            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    self.report(err);
                    self.synchronize();
                }
            }
        }

        Ok(self.ast.alloc(NodeKind::Block { stmts, scope }, location))
    }

    fn parse_condition(&mut self, keyword: &str) -> Result<NodeId, ParseError> {
        self.expect_punct(Punct::LParen, &format!("after '{keyword}'"))?;
        let condition = self.parse_expression()?;
        self.expect_punct(Punct::RParen, "after condition")?;
        Ok(condition)
    }

    fn parse_if_statement(&mut self) -> Result<NodeId, ParseError> {
        let location = self.advance().location;
        let condition = self.parse_condition("if")?;
        let then_branch = self.parse_statement()?;

        let else_branch = if self.match_keyword(Keyword::Else) {
            if self.check_keyword(Keyword::If) {
                Some(self.nested(|p| p.parse_if_statement())?)
            } else {
                Some(self.parse_statement()?)
            }
        } else {
            None
        };

        Ok(self.ast.alloc(
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            },
            location,
        ))
    }

    fn parse_while_statement(&mut self) -> Result<NodeId, ParseError> {
        let location = self.advance().location;
        let condition = self.parse_condition("while")?;
        let body = self.parse_statement()?;
        Ok(self.ast.alloc(NodeKind::While { condition, body }, location))
    }

    fn parse_do_while_statement(&mut self) -> Result<NodeId, ParseError> {
        let location = self.advance().location;
        let body = self.parse_statement()?;
        if !self.match_keyword(Keyword::While) {
            return Err(self.expected("'while' in do/while loop"));
        }
        let condition = self.parse_condition("while")?;
        self.expect_semicolon("after do/while statement")?;
        Ok(self.ast.alloc(NodeKind::DoWhile { body, condition }, location))
    }

    fn parse_for_statement(&mut self) -> Result<NodeId, ParseError> {
        let location = self.advance().location;
        self.expect_punct(Punct::LParen, "after 'for'")?;
        let scope = self.ast.scopes_mut().enter();
        let result = self.parse_for_rest(location, scope);
        self.ast.scopes_mut().exit();
        result
    }

    fn parse_for_rest(&mut self, location: SourceLocation, scope: ScopeId) -> Result<NodeId, ParseError> {
        let init = if self.match_punct(Punct::Semicolon) {
            None
        } else if self.is_declaration_start() {
            Some(self.parse_declaration(DeclContext::Local)?)
        } else {
            let expr = self.parse_expression()?;
            self.expect_semicolon("after for loop initializer")?;
            Some(expr)
        };

        let condition = if self.check_punct(Punct::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_semicolon("after for loop condition")?;

        let increment = if self.check_punct(Punct::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(Punct::RParen, "after for clauses")?;

        let body = self.parse_statement()?;
        Ok(self.ast.alloc(
            NodeKind::For {
                init,
                condition,
                increment,
                body,
                scope,
            },
            location,
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::{ParseOutcome, Parser};

    fn parse(source: &str) -> ParseOutcome {
        Parser::from_source("test.c", source)
            .expect("lexer")
            .parse_translation_unit()
    }

    /// Statements of the body of the first function.
    fn body(outcome: &ParseOutcome) -> Vec<NodeId> {
        let func = outcome.ast.top_level()[0];
        match outcome.ast.kind(func) {
            NodeKind::Function { body: Some(body), .. } => match outcome.ast.kind(*body) {
                NodeKind::Block { stmts, .. } => stmts.clone(),
                other => panic!("Expected block, got {other:?}"),
            },
            other => panic!("Expected function definition, got {other:?}"),
        }
    }

    fn assert_clean(outcome: &ParseOutcome) {
        let msgs: Vec<_> = outcome.diagnostics().iter().map(|d| d.to_string()).collect();
        assert!(msgs.is_empty(), "{msgs:?}");
    }

    #[test]
    fn test_dangling_else_binds_inner_if() {
        let outcome = parse("void f(int a, int b) { if (a) if (b) a = 1; else a = 2; }");
        assert_clean(&outcome);

        let stmts = body(&outcome);
        match outcome.ast.kind(stmts[0]) {
            NodeKind::If {
                then_branch,
                else_branch: None,
                ..
            } => match outcome.ast.kind(*then_branch) {
                NodeKind::If {
                    else_branch: Some(_),
                    ..
                } => {}
                other => panic!("Expected inner if with else, got {other:?}"),
            },
            other => panic!("Expected outer if without else, got {other:?}"),
        }
    }

    #[test]
    fn test_else_if_chain() {
        let outcome = parse("int f(int a) { if (a == 1) return 1; else if (a == 2) return 2; else return 3; }");
        assert_clean(&outcome);

        let stmts = body(&outcome);
        let NodeKind::If {
            else_branch: Some(else_branch),
            ..
        } = outcome.ast.kind(stmts[0])
        else {
            panic!("Expected if with else");
        };
        assert!(matches!(
            outcome.ast.kind(*else_branch),
            NodeKind::If { else_branch: Some(_), .. }
        ));
    }

    #[test]
    fn test_loops() {
        let outcome = parse(
            "void f() { int i; while (i) i--; do { i++; } while (i < 10); for (;;) break; for (int j = 0; j < 3; j++) continue; }",
        );
        assert_clean(&outcome);

        let stmts = body(&outcome);
        assert_eq!(stmts.len(), 5);
        assert!(matches!(outcome.ast.kind(stmts[1]), NodeKind::While { .. }));
        assert!(matches!(outcome.ast.kind(stmts[2]), NodeKind::DoWhile { .. }));
        assert!(matches!(
            outcome.ast.kind(stmts[3]),
            NodeKind::For {
                init: None,
                condition: None,
                increment: None,
                ..
            }
        ));
        match outcome.ast.kind(stmts[4]) {
            NodeKind::For {
                init: Some(init),
                condition: Some(_),
                increment: Some(_),
                body,
                ..
            } => {
                assert!(matches!(outcome.ast.kind(*init), NodeKind::VarDecl { .. }));
                assert!(matches!(outcome.ast.kind(*body), NodeKind::Continue));
            }
            other => panic!("Expected for loop, got {other:?}"),
        }
    }

    #[test]
    fn test_for_declaration_is_scoped_to_loop() {
        let outcome = parse("void f() { for (int i = 0; i < 3; i++) ; int i; }");
        assert_clean(&outcome);
    }

    #[test]
    fn test_block_scopes_allow_shadowing() {
        let outcome = parse("void f() { int x; { int x; x = 1; } x = 2; }");
        assert_clean(&outcome);

        let stmts = body(&outcome);
        let outer_decl = stmts[0];
        let NodeKind::Block { stmts: inner, .. } = outcome.ast.kind(stmts[1]) else {
            panic!("Expected nested block");
        };
        let inner_decl = inner[0];

        let target_of = |stmt: NodeId| match outcome.ast.kind(stmt) {
            NodeKind::ExprStmt { expr } => match outcome.ast.kind(*expr) {
                NodeKind::Assign { target, .. } => match outcome.ast.kind(*target) {
                    NodeKind::Variable { decl, .. } => *decl,
                    other => panic!("Expected variable, got {other:?}"),
                },
                other => panic!("Expected assignment, got {other:?}"),
            },
            other => panic!("Expected expression statement, got {other:?}"),
        };
        assert_eq!(target_of(inner[1]), Some(inner_decl));
        assert_eq!(target_of(stmts[2]), Some(outer_decl));
    }

    #[test]
    fn test_redeclaration_in_block() {
        let outcome = parse("void f() { int x; int x; }");
        let msgs: Vec<_> = outcome.diagnostics().iter().map(|d| d.message.clone()).collect();
        assert_eq!(msgs, vec!["redeclaration of 'x'"]);
    }

    #[test]
    fn test_parameter_and_body_share_scope() {
        let outcome = parse("void f(int a) { int a; }");
        assert!(outcome.has_errors());
    }

    #[test]
    fn test_missing_semicolon_recovers_at_statement() {
        let outcome = parse("int f() { int x = 1 int y = 2; return y; }");
        let msgs: Vec<_> = outcome.diagnostics().iter().map(|d| d.message.clone()).collect();
        assert_eq!(msgs, vec!["expected ';' after declaration, found 'int'"]);

        let stmts = body(&outcome);
        assert!(matches!(outcome.ast.kind(stmts[0]), NodeKind::Return { value: Some(_) }));
    }

    #[test]
    fn test_unclosed_block_reports_end_of_file() {
        let outcome = parse("int f() { return 0;");
        let msgs: Vec<_> = outcome.diagnostics().iter().map(|d| d.message.clone()).collect();
        assert_eq!(msgs, vec!["expected '}' at end of block, found end of file"]);
    }
}
