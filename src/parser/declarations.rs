//! Declaration parsing implementation
//!
//! This module handles declarations, both at file scope and inside blocks:
//!
//! - Variables: `type name;` and `type name = expr;`
//! - Typedefs: `typedef type name;`
//! - Functions: prototypes `type name(params);` and definitions with a body
//! - Type parsing: specifiers, modifiers, pointers, array dimensions
//!
//! # Grammar
//!
//! ```text
//! declaration  ::= "typedef" type identifier array_dims ";"
//!                | type identifier array_dims ("=" assignment)? ";"
//!                | type identifier "(" params ")" (";" | block)
//! type         ::= specifier+ ("*" qualifier*)*
//! specifier    ::= modifier | base_type | typedef_name
//! params       ::= ε | "void" | param ("," param)* ("," "...")?
//! array_dims   ::= ("[" integer? "]")*
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{Keyword, Operator, Punct, Token, TokenKind};
use crate::parser::ast::*;
use crate::parser::parse::Parser;
use crate::parser::scope::ScopeId;
use crate::source::{SourceLocation, Symbol};

/// Where a declaration appears
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclContext {
    Global,
    Local,
}

fn modifier_for(kw: Keyword) -> Option<Modifiers> {
    Some(match kw {
        Keyword::Static => Modifiers::STATIC,
        Keyword::Inline => Modifiers::INLINE,
        Keyword::Const => Modifiers::CONST,
        Keyword::Volatile => Modifiers::VOLATILE,
        Keyword::Restrict => Modifiers::RESTRICT,
        Keyword::Signed => Modifiers::SIGNED,
        Keyword::Unsigned => Modifiers::UNSIGNED,
        Keyword::Extern => Modifiers::EXTERN,
        Keyword::Register => Modifiers::REGISTER,
        _ => return None,
    })
}

fn is_base_type_keyword(kw: Keyword) -> bool {
    matches!(
        kw,
        Keyword::Void
            | Keyword::Bool
            | Keyword::Char
            | Keyword::Short
            | Keyword::Int
            | Keyword::Long
            | Keyword::Float
            | Keyword::Double
    )
}

/// Base type keywords seen so far in one specifier list
#[derive(Debug, Default)]
struct Specifiers {
    base: Option<BaseType>,
    int: bool,
    short: bool,
    longs: u8,
}

impl Specifiers {
    fn is_empty(&self) -> bool {
        self.base.is_none() && !self.int && !self.short && self.longs == 0
    }

    /// Add one keyword; false if it cannot combine with what came before.
    fn add(&mut self, kw: Keyword) -> bool {
        match kw {
            Keyword::Int if !self.int => self.int = true,
            Keyword::Short if !self.short && self.longs == 0 => self.short = true,
            Keyword::Long if !self.short && self.longs < 2 => self.longs += 1,
            Keyword::Void | Keyword::Bool | Keyword::Char | Keyword::Float | Keyword::Double
                if self.base.is_none() =>
            {
                self.base = Some(match kw {
                    Keyword::Void => BaseType::Void,
                    Keyword::Bool => BaseType::Bool,
                    Keyword::Char => BaseType::Char,
                    Keyword::Float => BaseType::Float,
                    _ => BaseType::Double,
                });
            }
            _ => return false,
        }
        self.compatible()
    }

    fn compatible(&self) -> bool {
        match self.base {
            None => true,
            Some(BaseType::Double) => !self.int && !self.short && self.longs <= 1,
            Some(_) => !self.int && !self.short && self.longs == 0,
        }
    }

    fn resolve(&self) -> Option<BaseType> {
        match self.base {
            Some(BaseType::Double) if self.longs == 1 => Some(BaseType::LongDouble),
            Some(base) => Some(base),
            None if self.short => Some(BaseType::Short),
            None if self.longs == 2 => Some(BaseType::LongLong),
            None if self.longs == 1 => Some(BaseType::Long),
            None if self.int => Some(BaseType::Int),
            None => None,
        }
    }
}

impl Parser {
    /// Parse one file-scope declaration. A stray `;` yields no node.
    pub(crate) fn parse_external_declaration(&mut self) -> Result<Option<NodeId>, ParseError> {
        if self.match_punct(Punct::Semicolon) {
            return Ok(None);
        }
        self.parse_declaration(DeclContext::Global).map(Some)
    }

    /// True if the current token can begin a declaration.
    pub(crate) fn is_declaration_start(&mut self) -> bool {
        let token = self.peek();
        match token.kind {
            TokenKind::Keyword(kw) => {
                kw == Keyword::Typedef
                    || modifier_for(kw).is_some()
                    || is_base_type_keyword(kw)
                    || matches!(kw, Keyword::Struct | Keyword::Union | Keyword::Enum)
            }
            // `name name` can only be a declaration with an unknown type
            TokenKind::Identifier => self.is_type_name(token) || self.peek_nth(1).is_identifier(),
            _ => false,
        }
    }

    /// True if the token `n` ahead can begin a type name.
    pub(crate) fn is_type_start_at(&mut self, n: usize) -> bool {
        let token = self.peek_nth(n);
        match token.kind {
            TokenKind::Keyword(kw) => modifier_for(kw).is_some() || is_base_type_keyword(kw),
            TokenKind::Identifier => self.is_type_name(token),
            _ => false,
        }
    }

    fn is_type_name(&self, token: Token) -> bool {
        token.is_identifier() && self.ast.scopes().type_name(token.text).is_some()
    }

    pub(crate) fn parse_declaration(&mut self, context: DeclContext) -> Result<NodeId, ParseError> {
        if self.match_keyword(Keyword::Typedef) {
            return self.parse_typedef();
        }

        let base = self.parse_type()?;
        let (name, location) = self.expect_identifier("in declaration")?;

        if self.check_punct(Punct::LParen) {
            if context == DeclContext::Local {
                return Err(ParseError::new(
                    ParseErrorKind::Invalid(
                        "function declarations are only supported at file scope".to_string(),
                    ),
                    location,
                ));
            }
            return self.parse_function(base, name, location);
        }

        let var_type = self.parse_array_dims(base)?;
        let init = if self.match_op(Operator::Assign) {
            Some(self.parse_assignment()?)
        } else {
            None
        };
        if self.check_punct(Punct::Comma) {
            let location = self.current_location();
            return Err(ParseError::new(
                ParseErrorKind::Invalid("only one declarator per declaration is supported".to_string()),
                location,
            ));
        }
        self.expect_semicolon("after declaration")?;

        let node = self.ast.alloc(
            NodeKind::VarDecl {
                name,
                var_type,
                init,
            },
            location,
        );
        self.declare_variable(name, node, location);
        Ok(node)
    }

    fn parse_typedef(&mut self) -> Result<NodeId, ParseError> {
        let target = self.parse_type()?;
        let (name, location) = self.expect_identifier("in typedef")?;
        let target = self.parse_array_dims(target)?;
        self.expect_semicolon("after typedef")?;

        let node = self.ast.alloc(NodeKind::Typedef { name, target }, location);
        if self.ast.scopes().type_name(name).is_some() {
            let name = self.resolve(name).to_string();
            self.report(ParseError::new(ParseErrorKind::Redeclaration(name), location));
        } else {
            self.ast.scopes_mut().declare_type(name, node);
            tracing::debug!(name = self.resolve(name), "typedef");
        }
        Ok(node)
    }

    /// Bind `name` in the current scope, reporting a redeclaration.
    fn declare_variable(&mut self, name: Symbol, node: NodeId, location: SourceLocation) {
        if self.ast.scopes_mut().declare(name, node).is_err() {
            let name = self.resolve(name).to_string();
            self.report(ParseError::new(ParseErrorKind::Redeclaration(name), location));
        }
    }

    /// Parse declaration specifiers and pointer declarators.
    pub(crate) fn parse_type(&mut self) -> Result<Type, ParseError> {
        let mut spec = Specifiers::default();

        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Keyword(kw) => {
                    if let Some(modifier) = modifier_for(kw) {
                        self.advance();
                        self.add_modifier(modifier, token);
                        continue;
                    }
                    if matches!(kw, Keyword::Struct | Keyword::Union | Keyword::Enum) {
                        self.modifiers = Modifiers::NONE;
                        return Err(ParseError::new(
                            ParseErrorKind::Invalid(format!("'{}' types are not supported", kw.as_str())),
                            token.location,
                        ));
                    }
                    if !is_base_type_keyword(kw) {
                        break;
                    }
                    if !spec.add(kw) {
                        self.modifiers = Modifiers::NONE;
                        return Err(ParseError::new(
                            ParseErrorKind::InvalidSpecifiers(kw.as_str().to_string()),
                            token.location,
                        ));
                    }
                    self.advance();
                }
                TokenKind::Identifier if spec.is_empty() && self.is_type_name(token) => {
                    self.advance();
                    spec.base = Some(BaseType::Named(token.text));
                }
                _ => break,
            }
        }

        let modifiers = std::mem::take(&mut self.modifiers);
        let base = match spec.resolve() {
            Some(base) => base,
            None if modifiers.intersects(Modifiers::SIGNED | Modifiers::UNSIGNED) => BaseType::Int,
            None => {
                let token = self.peek();
                if token.is_identifier() {
                    let name = self.resolve(token.text).to_string();
                    return Err(ParseError::new(ParseErrorKind::UnknownTypeName(name), token.location));
                }
                return Err(self.expected("type specifier"));
            }
        };

        let mut ty = Type::new(base).with_modifiers(modifiers);
        while self.match_op(Operator::Mul) {
            ty = ty.with_pointer();
            // qualifiers after '*' qualify the pointer
            while let TokenKind::Keyword(kw @ (Keyword::Const | Keyword::Volatile | Keyword::Restrict)) =
                self.peek().kind
            {
                self.advance();
                if let Some(modifier) = modifier_for(kw) {
                    ty.modifiers.insert(modifier);
                }
            }
        }
        Ok(ty)
    }

    fn add_modifier(&mut self, modifier: Modifiers, token: Token) {
        if self.modifiers.contains(modifier) {
            let spelling = match token.kind {
                TokenKind::Keyword(kw) => kw.as_str(),
                _ => "?",
            };
            self.warn(token.location, format!("duplicate '{spelling}' declaration specifier"));
        }
        self.modifiers.insert(modifier);
    }

    pub(crate) fn parse_array_dims(&mut self, mut ty: Type) -> Result<Type, ParseError> {
        while self.match_punct(Punct::LBracket) {
            if self.match_punct(Punct::RBracket) {
                ty = ty.with_array(None);
                continue;
            }
            let token = self.peek();
            let Some(size) = token.int_value().filter(|_| token.kind == TokenKind::Integer) else {
                return Err(self.expected("array size"));
            };
            self.advance();
            self.expect_punct(Punct::RBracket, "after array size")?;
            ty = ty.with_array(Some(size));
        }
        Ok(ty)
    }

    /// Parse a function prototype or definition after its name. The
    /// parameters and the outermost block of the body share one scope.
    fn parse_function(
        &mut self,
        return_type: Type,
        name: Symbol,
        location: SourceLocation,
    ) -> Result<NodeId, ParseError> {
        self.expect_punct(Punct::LParen, "after function name")?;
        let scope = self.ast.scopes_mut().enter();
        let result = self.parse_function_rest(return_type, name, location, scope);
        self.ast.scopes_mut().exit();
        result
    }

    fn parse_function_rest(
        &mut self,
        return_type: Type,
        name: Symbol,
        location: SourceLocation,
        scope: ScopeId,
    ) -> Result<NodeId, ParseError> {
        let (params, variadic) = self.parse_parameter_list()?;
        let is_definition = self.check_punct(Punct::LBrace);
        if !is_definition {
            self.expect_semicolon("after function declaration")?;
        }

        let node = self.ast.alloc(
            NodeKind::Function {
                name,
                return_type,
                params,
                variadic,
                body: None,
                scope,
            },
            location,
        );

        // Registered before the body so recursive calls resolve
        let previous = self.ast.scopes().function(name);
        let previous_defined = previous.is_some_and(|prev| {
            matches!(self.ast.kind(prev), NodeKind::Function { body: Some(_), .. })
        });
        if is_definition && previous_defined {
            let name = self.resolve(name).to_string();
            self.report(ParseError::new(
                ParseErrorKind::FunctionRedefinition(name),
                location,
            ));
        } else if is_definition || previous.is_none() {
            self.ast.scopes_mut().declare_function(name, node);
        }

        if is_definition {
            let body = self.parse_block_in_scope(scope)?;
            if let NodeKind::Function { body: slot, .. } = &mut self.ast.node_mut(node).kind {
                *slot = Some(body);
            }
        }
        tracing::debug!(name = self.resolve(name), is_definition, "function");
        Ok(node)
    }

    /// Parse parameters up to and including the closing `)`.
    fn parse_parameter_list(&mut self) -> Result<(Vec<NodeId>, bool), ParseError> {
        let mut params = Vec::new();

        if self.match_punct(Punct::RParen) {
            return Ok((params, false));
        }
        if self.check_keyword(Keyword::Void) && self.peek_nth(1).is_punct(Punct::RParen) {
            self.advance();
            self.advance();
            return Ok((params, false));
        }

        loop {
            if self.match_op(Operator::Ellipsis) {
                self.expect_punct(Punct::RParen, "after '...'")?;
                return Ok((params, true));
            }

            let location = self.current_location();
            let param_type = self.parse_type()?;
            let token = self.peek();
            let name = if token.is_identifier() {
                self.advance();
                Some(token.text)
            } else {
                None
            };
            let param_type = self.parse_array_dims(param_type)?;

            let node = self.ast.alloc(NodeKind::Param { name, param_type }, location);
            if let Some(name) = name {
                self.declare_variable(name, node, token.location);
            }
            params.push(node);

            if !self.match_punct(Punct::Comma) {
                self.expect_punct(Punct::RParen, "after parameters")?;
                return Ok((params, false));
            }
        }
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

    fn messages(outcome: &ParseOutcome) -> Vec<String> {
        outcome.diagnostics().iter().map(|d| d.message.clone()).collect()
    }

    fn var_type(outcome: &ParseOutcome, index: usize) -> Type {
        match outcome.ast.kind(outcome.ast.top_level()[index]) {
            NodeKind::VarDecl { var_type, .. } => var_type.clone(),
            other => panic!("Expected variable declaration, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_specifier_combinations() {
        let outcome = parse(
            "unsigned long long a; long double b; short int c; unsigned d; const char *e; _Bool f;",
        );
        assert!(!outcome.has_errors(), "{:?}", messages(&outcome));

        let a = var_type(&outcome, 0);
        assert_eq!(a.base, BaseType::LongLong);
        assert!(a.modifiers.contains(Modifiers::UNSIGNED));
        assert_eq!(var_type(&outcome, 1).base, BaseType::LongDouble);
        assert_eq!(var_type(&outcome, 2).base, BaseType::Short);
        assert_eq!(var_type(&outcome, 3).base, BaseType::Int);

        let e = var_type(&outcome, 4);
        assert_eq!(e.base, BaseType::Char);
        assert_eq!(e.pointer_depth, 1);
        assert!(e.modifiers.contains(Modifiers::CONST));
        assert_eq!(var_type(&outcome, 5).base, BaseType::Bool);
    }

    #[test]
    fn test_invalid_specifier_combination() {
        let outcome = parse("int char x; int y;");
        assert_eq!(messages(&outcome), vec!["cannot combine 'char' with previous declaration specifiers"]);
        assert_eq!(outcome.ast.top_level().len(), 1);
    }

    #[test]
    fn test_duplicate_modifier_is_warning() {
        let outcome = parse("const const int x;");
        assert!(!outcome.has_errors());
        assert_eq!(outcome.diagnostics().warning_count(), 1);
        assert_eq!(messages(&outcome), vec!["duplicate 'const' declaration specifier"]);
    }

    #[test]
    fn test_modifiers_reset_between_declarations() {
        let outcome = parse("static int a; int b;");
        assert!(var_type(&outcome, 0).modifiers.contains(Modifiers::STATIC));
        assert!(var_type(&outcome, 1).modifiers.is_empty());
    }

    #[test]
    fn test_array_dimensions() {
        let outcome = parse("int grid[3][4]; char buf[];");
        assert_eq!(var_type(&outcome, 0).array_dims, vec![Some(3), Some(4)]);
        assert_eq!(var_type(&outcome, 1).array_dims, vec![None]);
    }

    #[test]
    fn test_typedef_names_become_types() {
        let outcome = parse("typedef unsigned long size_t; size_t n;");
        assert!(!outcome.has_errors(), "{:?}", messages(&outcome));
        match var_type(&outcome, 1).base {
            BaseType::Named(sym) => assert_eq!(outcome.name(sym), "size_t"),
            other => panic!("Expected typedef name, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_name() {
        let outcome = parse("int main() { foo x; return 0; }");
        assert_eq!(messages(&outcome), vec!["unknown type name 'foo'"]);
    }

    #[test]
    fn test_global_redeclaration() {
        let outcome = parse("int x; int x;");
        assert_eq!(messages(&outcome), vec!["redeclaration of 'x'"]);
        assert_eq!(outcome.ast.top_level().len(), 2);
    }

    #[test]
    fn test_prototype_then_definition() {
        let outcome = parse("int add(int a, int b); int add(int a, int b) { return a + b; }");
        assert!(!outcome.has_errors(), "{:?}", messages(&outcome));

        let decls = outcome.ast.top_level();
        assert!(matches!(outcome.ast.kind(decls[0]), NodeKind::Function { body: None, .. }));
        let name = match outcome.ast.kind(decls[1]) {
            NodeKind::Function { name, .. } => *name,
            other => panic!("Expected function, got {other:?}"),
        };
        assert_eq!(outcome.ast.scopes().function(name), Some(decls[1]));
    }

    #[test]
    fn test_function_redefinition() {
        let outcome = parse("int f() { return 1; } int f() { return 2; }");
        assert_eq!(messages(&outcome), vec!["redefinition of function 'f'"]);
    }

    #[test]
    fn test_parameters() {
        let outcome = parse("int printf(const char *fmt, ...); void g(void); int h(int, char *p);");
        assert!(!outcome.has_errors(), "{:?}", messages(&outcome));

        let decls = outcome.ast.top_level();
        match outcome.ast.kind(decls[0]) {
            NodeKind::Function { params, variadic, .. } => {
                assert_eq!(params.len(), 1);
                assert!(*variadic);
            }
            other => panic!("Expected function, got {other:?}"),
        }
        match outcome.ast.kind(decls[1]) {
            NodeKind::Function { params, variadic, .. } => {
                assert!(params.is_empty());
                assert!(!*variadic);
            }
            other => panic!("Expected function, got {other:?}"),
        }
        match outcome.ast.kind(decls[2]) {
            NodeKind::Function { params, .. } => {
                assert_eq!(params.len(), 2);
                assert!(matches!(outcome.ast.kind(params[0]), NodeKind::Param { name: None, .. }));
            }
            other => panic!("Expected function, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_parameter_name() {
        let outcome = parse("int f(int a, int a);");
        assert_eq!(messages(&outcome), vec!["redeclaration of 'a'"]);
    }

    #[test]
    fn test_multiple_declarators_rejected() {
        let outcome = parse("int a, b;");
        assert_eq!(messages(&outcome), vec!["only one declarator per declaration is supported"]);
    }

    #[test]
    fn test_struct_not_supported() {
        let outcome = parse("struct point p; int ok;");
        assert_eq!(messages(&outcome), vec!["'struct' types are not supported"]);
        assert_eq!(outcome.ast.top_level().len(), 1);
    }
}
