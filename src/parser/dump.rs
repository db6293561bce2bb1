//! Indented textual rendering of an [`Ast`], one node per line.
//!
//! ```text
//! TranslationUnit
//!   Function main -> int
//!     Block
//!       VarDecl x: int
//!         Binary Add
//!           IntLiteral 1
//!           IntLiteral 2
//!       Return
//!         Variable x
//! ```

use super::ast::*;
use crate::source::{Interner, Symbol};
use std::fmt::Write;

/// Render `type` the way it is spelled in a declaration.
pub fn type_to_string(ty: &Type, interner: &Interner) -> String {
    let mut out = String::new();
    for name in ty.modifiers.names() {
        out.push_str(name);
        out.push(' ');
    }
    match ty.base {
        BaseType::Named(sym) => out.push_str(interner.resolve(sym)),
        base => out.push_str(base.name()),
    }
    for _ in 0..ty.pointer_depth {
        out.push('*');
    }
    for dim in &ty.array_dims {
        match dim {
            Some(n) => {
                let _ = write!(out, "[{n}]");
            }
            None => out.push_str("[]"),
        }
    }
    out
}

pub fn dump(ast: &Ast, interner: &Interner) -> String {
    let mut dumper = Dumper {
        ast,
        interner,
        out: String::new(),
    };
    if let Some(root) = ast.root() {
        dumper.node(root, 0);
    }
    dumper.out
}

struct Dumper<'a> {
    ast: &'a Ast,
    interner: &'a Interner,
    out: String,
}

impl<'a> Dumper<'a> {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn name(&self, sym: Symbol) -> &'a str {
        self.interner.resolve(sym)
    }

    fn ty(&self, ty: &Type) -> String {
        type_to_string(ty, self.interner)
    }

    fn children(&mut self, ids: &[NodeId], depth: usize) {
        for &id in ids {
            self.node(id, depth);
        }
    }

    fn optional(&mut self, label: &str, id: Option<NodeId>, depth: usize) {
        if let Some(id) = id {
            self.line(depth, label);
            self.node(id, depth + 1);
        }
    }

    fn node(&mut self, id: NodeId, depth: usize) {
        let ast = self.ast;
        let next = depth + 1;
        match ast.kind(id) {
            NodeKind::TranslationUnit { decls } => {
                self.line(depth, "TranslationUnit");
                self.children(decls, next);
            }
            NodeKind::VarDecl { name, var_type, init } => {
                let text = format!("VarDecl {}: {}", self.name(*name), self.ty(var_type));
                self.line(depth, &text);
                if let Some(init) = init {
                    self.node(*init, next);
                }
            }
            NodeKind::Typedef { name, target } => {
                let text = format!("Typedef {} = {}", self.name(*name), self.ty(target));
                self.line(depth, &text);
            }
            NodeKind::Param { name, param_type } => {
                let text = match name {
                    Some(name) => format!("Param {}: {}", self.name(*name), self.ty(param_type)),
                    None => format!("Param {}", self.ty(param_type)),
                };
                self.line(depth, &text);
            }
            NodeKind::Function {
                name,
                return_type,
                params,
                variadic,
                body,
                ..
            } => {
                let mut text = format!("Function {} -> {}", self.name(*name), self.ty(return_type));
                if *variadic {
                    text.push_str(" (variadic)");
                }
                if body.is_none() {
                    text.push_str(" (prototype)");
                }
                self.line(depth, &text);
                self.children(params, next);
                if let Some(body) = body {
                    self.node(*body, next);
                }
            }
            NodeKind::Block { stmts, .. } => {
                self.line(depth, "Block");
                self.children(stmts, next);
            }
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.line(depth, "If");
                self.node(*condition, next);
                self.node(*then_branch, next);
                self.optional("Else", *else_branch, next);
            }
            NodeKind::While { condition, body } => {
                self.line(depth, "While");
                self.node(*condition, next);
                self.node(*body, next);
            }
            NodeKind::DoWhile { body, condition } => {
                self.line(depth, "DoWhile");
                self.node(*body, next);
                self.node(*condition, next);
            }
            NodeKind::For {
                init,
                condition,
                increment,
                body,
                ..
            } => {
                self.line(depth, "For");
                self.optional("Init", *init, next);
                self.optional("Condition", *condition, next);
                self.optional("Increment", *increment, next);
                self.node(*body, next);
            }
            NodeKind::Return { value } => {
                self.line(depth, "Return");
                if let Some(value) = value {
                    self.node(*value, next);
                }
            }
            NodeKind::Break => self.line(depth, "Break"),
            NodeKind::Continue => self.line(depth, "Continue"),
            NodeKind::Empty => self.line(depth, "Empty"),
            NodeKind::ExprStmt { expr } => self.node(*expr, depth),
            NodeKind::IntLiteral { value, .. } => self.line(depth, &format!("IntLiteral {value}")),
            NodeKind::FloatLiteral { value, .. } => self.line(depth, &format!("FloatLiteral {value}")),
            NodeKind::CharLiteral { value } => self.line(depth, &format!("CharLiteral {value}")),
            NodeKind::StringLiteral { pieces } => {
                let text: Vec<&str> = pieces.iter().map(|&p| self.name(p)).collect();
                let text = format!("StringLiteral {}", text.join(" "));
                self.line(depth, &text);
            }
            NodeKind::Variable { name, decl } => {
                let mut text = format!("Variable {}", self.name(*name));
                if decl.is_none() {
                    text.push_str(" (unresolved)");
                }
                self.line(depth, &text);
            }
            NodeKind::Unary { op, operand } => {
                self.line(depth, &format!("Unary {op:?}"));
                self.node(*operand, next);
            }
            NodeKind::Binary { op, lhs, rhs } => {
                self.line(depth, &format!("Binary {op:?}"));
                self.node(*lhs, next);
                self.node(*rhs, next);
            }
            NodeKind::Assign { op, target, value } => {
                self.line(depth, &format!("Assign {op:?}"));
                self.node(*target, next);
                self.node(*value, next);
            }
            NodeKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                self.line(depth, "Conditional");
                self.node(*condition, next);
                self.node(*then_expr, next);
                self.node(*else_expr, next);
            }
            NodeKind::Call { name, args, .. } => {
                let text = format!("Call {}", self.name(*name));
                self.line(depth, &text);
                self.children(args, next);
            }
            NodeKind::Index { base, index } => {
                self.line(depth, "Index");
                self.node(*base, next);
                self.node(*index, next);
            }
            NodeKind::Member {
                base,
                member,
                through_pointer,
            } => {
                let arrow = if *through_pointer { "->" } else { "." };
                let text = format!("Member {arrow}{}", self.name(*member));
                self.line(depth, &text);
                self.node(*base, next);
            }
            NodeKind::Cast { target, expr } => {
                let text = format!("Cast {}", self.ty(target));
                self.line(depth, &text);
                self.node(*expr, next);
            }
            NodeKind::SizeofType { target } => {
                let text = format!("SizeofType {}", self.ty(target));
                self.line(depth, &text);
            }
        }
    }
}
