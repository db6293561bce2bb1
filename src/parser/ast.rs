// AST definitions for the C front-end
//
// Nodes live in one arena owned by `Ast` and refer to each other by
// `NodeId`. Child lists are plain `Vec<NodeId>`s in source order. Dropping
// the `Ast` releases every node, scope and table at once.

use super::scope::{ScopeId, ScopeTree};
use crate::source::{SourceLocation, Symbol};

/// Index of a node in the [`Ast`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Declaration modifiers, accumulated as a bitmask while scanning
/// declaration specifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u16);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const STATIC: Modifiers = Modifiers(1 << 0);
    pub const INLINE: Modifiers = Modifiers(1 << 1);
    pub const CONST: Modifiers = Modifiers(1 << 2);
    pub const VOLATILE: Modifiers = Modifiers(1 << 3);
    pub const RESTRICT: Modifiers = Modifiers(1 << 4);
    pub const SIGNED: Modifiers = Modifiers(1 << 5);
    pub const UNSIGNED: Modifiers = Modifiers(1 << 6);
    pub const EXTERN: Modifiers = Modifiers(1 << 7);
    pub const REGISTER: Modifiers = Modifiers(1 << 8);

    const NAMES: [(Modifiers, &'static str); 9] = [
        (Modifiers::STATIC, "static"),
        (Modifiers::INLINE, "inline"),
        (Modifiers::CONST, "const"),
        (Modifiers::VOLATILE, "volatile"),
        (Modifiers::RESTRICT, "restrict"),
        (Modifiers::SIGNED, "signed"),
        (Modifiers::UNSIGNED, "unsigned"),
        (Modifiers::EXTERN, "extern"),
        (Modifiers::REGISTER, "register"),
    ];

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Modifiers) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Modifiers) {
        self.0 |= other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .into_iter()
            .filter(move |&(m, _)| self.contains(m))
            .map(|(_, name)| name)
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

/// Base types of the language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Void,
    Bool,
    Char,
    Short,
    Int,
    Long,
    LongLong,
    Float,
    Double,
    LongDouble,
    Named(Symbol), // typedef name
}

impl BaseType {
    pub fn name(self) -> &'static str {
        match self {
            BaseType::Void => "void",
            BaseType::Bool => "_Bool",
            BaseType::Char => "char",
            BaseType::Short => "short",
            BaseType::Int => "int",
            BaseType::Long => "long",
            BaseType::LongLong => "long long",
            BaseType::Float => "float",
            BaseType::Double => "double",
            BaseType::LongDouble => "long double",
            BaseType::Named(_) => "typedef",
        }
    }
}

/// Type representation with modifiers, pointers, and arrays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub base: BaseType,
    pub modifiers: Modifiers,
    pub pointer_depth: u32,         // 0 = not pointer, 1 = *, 2 = **, etc.
    pub array_dims: Vec<Option<u64>>, // None for an unsized dimension
}

impl Type {
    pub fn new(base: BaseType) -> Self {
        Type {
            base,
            modifiers: Modifiers::NONE,
            pointer_depth: 0,
            array_dims: Vec::new(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_pointer(mut self) -> Self {
        self.pointer_depth += 1;
        self
    }

    pub fn with_array(mut self, size: Option<u64>) -> Self {
        self.array_dims.push(size);
        self
    }

    pub fn is_void(&self) -> bool {
        self.base == BaseType::Void && self.pointer_depth == 0 && self.array_dims.is_empty()
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LogAnd,
    LogOr,
    Comma,
}

/// Assignment operators; `Assign` is plain `=`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    And,
    Xor,
    Or,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Plus,    // +x
    Neg,     // -x
    Not,     // !x
    BitNot,  // ~x
    PreInc,  // ++x
    PreDec,  // --x
    PostInc, // x++
    PostDec, // x--
    Deref,   // *x
    AddrOf,  // &x
    Sizeof,  // sizeof x
}

/// Integer literal suffix (`u`, `l`, `ll` and combinations)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntSuffix {
    pub unsigned: bool,
    pub long_count: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatSuffix {
    #[default]
    None,
    F,
    L,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    TranslationUnit {
        decls: Vec<NodeId>,
    },

    // Declarations
    VarDecl {
        name: Symbol,
        var_type: Type,
        init: Option<NodeId>,
    },
    Typedef {
        name: Symbol,
        target: Type,
    },
    Param {
        name: Option<Symbol>,
        param_type: Type,
    },
    Function {
        name: Symbol,
        return_type: Type,
        params: Vec<NodeId>,
        variadic: bool,
        body: Option<NodeId>,
        scope: ScopeId,
    },

    // Statements
    Block {
        stmts: Vec<NodeId>,
        scope: ScopeId,
    },
    If {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    While {
        condition: NodeId,
        body: NodeId,
    },
    DoWhile {
        body: NodeId,
        condition: NodeId,
    },
    For {
        init: Option<NodeId>,
        condition: Option<NodeId>,
        increment: Option<NodeId>,
        body: NodeId,
        scope: ScopeId,
    },
    Return {
        value: Option<NodeId>,
    },
    Break,
    Continue,
    Empty,
    ExprStmt {
        expr: NodeId,
    },

    // Expressions
    IntLiteral {
        value: u64,
        suffix: IntSuffix,
    },
    FloatLiteral {
        value: f64,
        suffix: FloatSuffix,
    },
    CharLiteral {
        value: u64,
    },
    StringLiteral {
        pieces: Vec<Symbol>, // adjacent literals, spelled with quotes
    },
    Variable {
        name: Symbol,
        decl: Option<NodeId>, // None when no declaration is in scope
    },
    Unary {
        op: UnOp,
        operand: NodeId,
    },
    Binary {
        op: BinOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Assign {
        op: AssignOp,
        target: NodeId,
        value: NodeId,
    },
    Conditional {
        condition: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
    },
    Call {
        name: Symbol,
        function: Option<NodeId>, // None when called before any declaration
        args: Vec<NodeId>,
    },
    Index {
        base: NodeId,
        index: NodeId,
    },
    Member {
        base: NodeId,
        member: Symbol,
        through_pointer: bool,
    },
    Cast {
        target: Type,
        expr: NodeId,
    },
    SizeofType {
        target: Type,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub location: SourceLocation,
}

/// Arena holding every node of one translation unit, plus the scope tree
/// and the function and type tables built while parsing
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    scopes: ScopeTree,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: NodeKind, location: SourceLocation) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, location });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    pub fn scopes_mut(&mut self) -> &mut ScopeTree {
        &mut self.scopes
    }

    /// Top-level declarations in source order.
    pub fn top_level(&self) -> &[NodeId] {
        match self.root.map(|root| self.kind(root)) {
            Some(NodeKind::TranslationUnit { decls }) => decls,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_mask() {
        let mut mods = Modifiers::NONE;
        mods.insert(Modifiers::STATIC);
        mods.insert(Modifiers::CONST);
        assert!(mods.contains(Modifiers::STATIC | Modifiers::CONST));
        assert!(!mods.contains(Modifiers::VOLATILE));
        assert_eq!(mods.names().collect::<Vec<_>>(), vec!["static", "const"]);
    }

    #[test]
    fn test_arena_ids_are_sequential() {
        let mut ast = Ast::new();
        let a = ast.alloc(NodeKind::Empty, SourceLocation::default());
        let b = ast.alloc(NodeKind::Break, SourceLocation::default());
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(ast.kind(b), &NodeKind::Break);
        assert!(ast.top_level().is_empty());
    }

    #[test]
    fn test_type_builder() {
        let ty = Type::new(BaseType::Char).with_pointer().with_array(Some(4));
        assert_eq!(ty.pointer_depth, 1);
        assert_eq!(ty.array_dims, vec![Some(4)]);
        assert!(!ty.is_void());
        assert!(Type::new(BaseType::Void).is_void());
    }
}
