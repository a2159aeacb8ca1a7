//! Abstract Syntax Tree definitions for Jane
//!
//! Every shape is a closed enum so the checkers match exhaustively. Types are
//! kept syntactic here (`TypeExpr`); the semantic layer resolves them.

use crate::utils::Span;

/// A complete program (one source file)
#[derive(Debug, Clone)]
pub struct Program {
    pub items: Vec<Item>,
}

/// Top-level items
#[derive(Debug, Clone)]
pub enum Item {
    Function(Function),
    Struct(StructDef),
    Enum(EnumDef),
    Trait(TraitDef),
    Impl(ImplBlock),
    TypeAlias(TypeAlias),
    Global(GlobalDef),
}

/// Function definition
#[derive(Debug, Clone)]
pub struct Function {
    pub name: Ident,
    pub is_unsafe: bool,
    pub generics: Vec<Ident>,
    pub receiver: Option<Receiver>,
    pub params: Vec<Param>,
    pub ret: RetType,
    pub body: Block,
    pub span: Span,
}

/// Method receiver (`self` or `&self`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receiver {
    pub by_ref: bool,
    pub span: Span,
}

/// Function parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeExpr,
    pub mutable: bool,
    pub variadic: bool,
    pub default: Option<Expr>,
    pub span: Span,
}

/// Declared return type. Named returns carry one name per tuple component.
#[derive(Debug, Clone, Default)]
pub struct RetType {
    pub ty: Option<TypeExpr>,
    pub names: Vec<Ident>,
}

/// Struct definition
#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: Ident,
    pub generics: Vec<Ident>,
    pub fields: Vec<Field>,
    pub span: Span,
}

/// Struct field
#[derive(Debug, Clone)]
pub struct Field {
    pub name: Ident,
    pub ty: TypeExpr,
    pub default: Option<Expr>,
    pub span: Span,
}

/// Enum definition
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: Ident,
    pub base: Option<TypeExpr>,
    pub items: Vec<EnumItem>,
    pub span: Span,
}

/// Enum item with optional explicit value
#[derive(Debug, Clone)]
pub struct EnumItem {
    pub name: Ident,
    pub value: Option<Expr>,
    pub span: Span,
}

/// Trait definition
#[derive(Debug, Clone)]
pub struct TraitDef {
    pub name: Ident,
    pub methods: Vec<FnSig>,
    pub span: Span,
}

/// Function signature without a body (trait methods)
#[derive(Debug, Clone)]
pub struct FnSig {
    pub name: Ident,
    pub receiver: Option<Receiver>,
    pub params: Vec<Param>,
    pub ret: RetType,
    pub span: Span,
}

/// `impl [Trait for] Struct { ... }`
#[derive(Debug, Clone)]
pub struct ImplBlock {
    pub target: Ident,
    pub trait_name: Option<Ident>,
    pub methods: Vec<Function>,
    pub span: Span,
}

/// `type Name = T`
#[derive(Debug, Clone)]
pub struct TypeAlias {
    pub name: Ident,
    pub ty: TypeExpr,
    pub span: Span,
}

/// Package-level `const` or `let`
#[derive(Debug, Clone)]
pub struct GlobalDef {
    pub name: Ident,
    pub constant: bool,
    pub mutable: bool,
    pub ty: Option<TypeExpr>,
    pub value: Expr,
    pub span: Span,
}

/// Code block
#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub is_unsafe: bool,
    pub span: Span,
}

/// Name bound by a multi-declaration
#[derive(Debug, Clone)]
pub struct LetName {
    pub name: Ident,
    pub mutable: bool,
}

/// One `if`/`else if` arm
#[derive(Debug, Clone)]
pub struct IfBranch {
    pub cond: Expr,
    pub body: Block,
}

/// Loop header
#[derive(Debug, Clone)]
pub enum LoopKind {
    /// loop { }
    Infinite,
    /// while cond { }
    While(Expr),
    /// for k[, v] in expr { }
    ForEach { vars: Vec<Ident>, iter: Expr },
}

/// Match case. `exprs` is empty for the default case.
#[derive(Debug, Clone)]
pub struct Case {
    pub exprs: Vec<Expr>,
    pub body: Block,
    pub span: Span,
}

/// Statement
#[derive(Debug, Clone)]
pub enum Stmt {
    /// let [mut] name [: type] [= expr] / const name [: type] = expr
    Let {
        name: Ident,
        mutable: bool,
        constant: bool,
        ty: Option<TypeExpr>,
        value: Option<Expr>,
        span: Span,
    },
    /// let (a, mut b) = exprs
    LetMulti {
        names: Vec<LetName>,
        values: Vec<Expr>,
        span: Span,
    },
    /// targets op values
    Assign {
        targets: Vec<Expr>,
        op: Option<BinOp>,
        values: Vec<Expr>,
        span: Span,
    },
    /// expr++ / expr--
    Postfix {
        expr: Expr,
        increment: bool,
        span: Span,
    },
    /// Expression statement
    Expr(Expr),
    /// return [exprs]
    Return {
        values: Vec<Expr>,
        span: Span,
    },
    /// if / else if / else
    If {
        branches: Vec<IfBranch>,
        else_block: Option<Block>,
        span: Span,
    },
    /// loop, while and foreach
    Loop {
        kind: LoopKind,
        body: Block,
        span: Span,
    },
    /// match [expr] { cases }
    Match {
        expr: Option<Expr>,
        cases: Vec<Case>,
        default: Option<Case>,
        span: Span,
    },
    Break {
        label: Option<Ident>,
        span: Span,
    },
    Continue {
        label: Option<Ident>,
        span: Span,
    },
    Goto {
        label: Ident,
        span: Span,
    },
    /// name:
    Label {
        name: Ident,
        span: Span,
    },
    Fallthrough {
        span: Span,
    },
    /// Nested (possibly unsafe) block
    Block(Block),
    /// Block-local type alias
    TypeAlias(TypeAlias),
}

/// Call or struct-literal argument, optionally targeted by name
#[derive(Debug, Clone)]
pub struct Arg {
    pub name: Option<Ident>,
    pub value: Expr,
    pub span: Span,
}

/// Expression
#[derive(Debug, Clone)]
pub enum Expr {
    /// Literal value
    Literal(Literal),
    /// Identifier
    Ident(Ident),
    /// Identifier with explicit generics (`name::[T]`)
    Generic {
        name: Ident,
        generics: Vec<TypeExpr>,
        span: Span,
    },
    /// Binary operation
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        span: Span,
    },
    /// Unary operation
    Unary {
        op: UnOp,
        expr: Box<Expr>,
        span: Span,
    },
    /// Function call
    Call {
        func: Box<Expr>,
        args: Vec<Arg>,
        span: Span,
    },
    /// Field access (expr.field)
    Field {
        expr: Box<Expr>,
        field: Ident,
        span: Span,
    },
    /// Index access (expr[index])
    Index {
        expr: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    /// Struct literal
    StructLit {
        name: Ident,
        generics: Vec<TypeExpr>,
        args: Vec<Arg>,
        span: Span,
    },
    /// Slice literal
    Array {
        elements: Vec<Expr>,
        span: Span,
    },
    /// Cast (expr as Type)
    Cast {
        expr: Box<Expr>,
        ty: TypeExpr,
        span: Span,
    },
    /// Spread into a variadic parameter (expr...)
    Variadic {
        expr: Box<Expr>,
        span: Span,
    },
}

/// Literal value
#[derive(Debug, Clone)]
pub enum Literal {
    Int(u64, Span),
    Float(f64, Span),
    Str(String, Span),
    Char(char, Span),
    Bool(bool, Span),
    Nil(Span),
}

impl Literal {
    pub fn span(&self) -> Span {
        match self {
            Literal::Int(_, s) => *s,
            Literal::Float(_, s) => *s,
            Literal::Str(_, s) => *s,
            Literal::Char(_, s) => *s,
            Literal::Bool(_, s) => *s,
            Literal::Nil(s) => *s,
        }
    }
}

/// Identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self { name: name.into(), span }
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Plus (+)
    Plus,
    /// Logical not (!)
    Not,
    /// Bitwise not (~)
    BitNot,
    /// Dereference (*)
    Deref,
    /// Address-of (&)
    Ref,
}

impl UnOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnOp::Neg => "-",
            UnOp::Plus => "+",
            UnOp::Not => "!",
            UnOp::BitNot => "~",
            UnOp::Deref => "*",
            UnOp::Ref => "&",
        }
    }
}

/// Syntactic type reference, resolved by the semantic layer
#[derive(Debug, Clone)]
pub enum TypeExpr {
    /// Primitive or named type with optional generic arguments
    Named {
        name: Ident,
        generics: Vec<TypeExpr>,
        span: Span,
    },
    /// *T
    Pointer(Box<TypeExpr>, Span),
    /// &T
    Ref(Box<TypeExpr>, Span),
    /// *unsafe
    UnsafePtr(Span),
    /// []T
    Slice(Box<TypeExpr>, Span),
    /// [N]T, or [...]T when `size` is None
    Array {
        size: Option<Box<Expr>>,
        elem: Box<TypeExpr>,
        span: Span,
    },
    /// [K:V]
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
        span: Span,
    },
    /// fn(A, ...B) -> R
    Fn {
        params: Vec<TypeExpr>,
        variadic: bool,
        ret: Option<Box<TypeExpr>>,
        span: Span,
    },
    /// (A, B)
    Tuple(Vec<TypeExpr>, Span),
}

impl TypeExpr {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Named { span, .. } => *span,
            TypeExpr::Pointer(_, s) => *s,
            TypeExpr::Ref(_, s) => *s,
            TypeExpr::UnsafePtr(s) => *s,
            TypeExpr::Slice(_, s) => *s,
            TypeExpr::Array { span, .. } => *span,
            TypeExpr::Map { span, .. } => *span,
            TypeExpr::Fn { span, .. } => *span,
            TypeExpr::Tuple(_, s) => *s,
        }
    }

    /// Shorthand for an unqualified named type
    pub fn named(name: &str, span: Span) -> Self {
        TypeExpr::Named {
            name: Ident::new(name, span),
            generics: Vec::new(),
            span,
        }
    }
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Let { span, .. } => *span,
            Stmt::LetMulti { span, .. } => *span,
            Stmt::Assign { span, .. } => *span,
            Stmt::Postfix { span, .. } => *span,
            Stmt::Expr(expr) => expr.span(),
            Stmt::Return { span, .. } => *span,
            Stmt::If { span, .. } => *span,
            Stmt::Loop { span, .. } => *span,
            Stmt::Match { span, .. } => *span,
            Stmt::Break { span, .. } => *span,
            Stmt::Continue { span, .. } => *span,
            Stmt::Goto { span, .. } => *span,
            Stmt::Label { span, .. } => *span,
            Stmt::Fallthrough { span } => *span,
            Stmt::Block(block) => block.span,
            Stmt::TypeAlias(alias) => alias.span,
        }
    }
}
