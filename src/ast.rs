//! The abstract syntax tree
//!
//! The tree is generic over a type context `C`: the parser produces
//! [UntypedProgram] (every node tagged with [NoContext]) and elaboration
//! turns it into [TypedProgram], where every expression carries its
//! statically computed [Type]. See [crate::elaborate].
//!
//! Surface type annotations are [TypeExpr]s; they are resolved against the
//! builtin spellings and the registered user types during elaboration.

use std::fmt;

use crate::lexing::{NumberLiteral, StrKind};
use crate::{Span, Type};

pub type Ident = String;

/// Marker for nodes that have not been elaborated yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoContext;

pub type UntypedProgram = Program<NoContext>;
pub type TypedProgram = Program<Type>;
pub type UntypedExpression = Expression<NoContext>;
pub type TypedExpression = Expression<Type>;

/// A whole module, in source order
#[derive(Debug, Clone, PartialEq)]
pub struct Program<C> {
    pub top_levels: Vec<TopLevel<C>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TopLevel<C> {
    Function(FunctionDef<C>),
    Declare(Declaration<C>),
    Global(Let<C>),
    Struct(StructDef),
    TypeAlias(TypeAliasDef),
}

/// A function definition: prototype plus body
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef<C> {
    pub prototype: Prototype<C>,
    pub body: Expression<C>,
}

/// A forward declaration of a function or a global variable
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration<C> {
    Function(Prototype<C>),
    Variable {
        name: Ident,
        annotation: TypeExpr,
        name_span: Span,
        typ: C,
    },
}

/// A function signature
///
/// For extension methods `receiver` is set; elaboration rewrites `name` to
/// the receiver-qualified key and appends a trailing `this` parameter, the
/// same end the method-call desugaring appends the receiver at.
#[derive(Debug, Clone, PartialEq)]
pub struct Prototype<C> {
    pub name: Ident,
    pub receiver: Option<TypeExpr>,
    pub params: Vec<Param<C>>,
    pub ret: Option<TypeExpr>,
    pub variadic: bool,
    pub name_span: Span,
    /// The full function type, once elaborated
    pub typ: C,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param<C> {
    pub name: Ident,
    pub annotation: TypeExpr,
    pub typ: C,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    pub name: Ident,
    pub fields: Vec<(Ident, TypeExpr)>,
    pub name_span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDef {
    pub name: Ident,
    pub target: TypeExpr,
    pub name_span: Span,
}

/// A `let`, usable both as an expression and as a global top-level
#[derive(Debug, Clone, PartialEq)]
pub struct Let<C> {
    pub name: Ident,
    pub annotation: Option<TypeExpr>,
    pub init: Option<Box<Expression<C>>>,
    pub constant: bool,
    pub name_span: Span,
    /// The declared (or inferred) type of the binding, once elaborated
    pub typ: C,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression<C> {
    pub kind: ExpressionKind<C>,
    pub span: Span,
    pub typ: C,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind<C> {
    Number(NumberLiteral),
    Bool(bool),
    Char(u8),
    String { value: Vec<u8>, kind: StrKind },
    /// The null literal; after elaboration its type may be any type (a
    /// missing else branch becomes a null of the then type)
    Null,

    Var(Ident),
    Let(Let<C>),

    Cast {
        target: TypeExpr,
        inner: Box<Expression<C>>,
    },

    Binary {
        op: BinOp,
        lhs: Box<Expression<C>>,
        rhs: Box<Expression<C>>,
    },

    Unary {
        op: UnaOp,
        inner: Box<Expression<C>>,
    },

    Call {
        callee: Box<Expression<C>>,
        args: Vec<Expression<C>>,
    },

    Index {
        value: Box<Expression<C>>,
        index: Box<Expression<C>>,
    },

    Field {
        value: Box<Expression<C>>,
        field: Ident,
    },

    /// Sugar for a call of the receiver-qualified free function; elaboration
    /// desugars this into [ExpressionKind::Call], so it never appears in a
    /// typed tree
    MethodCall {
        receiver: Box<Expression<C>>,
        method: Ident,
        args: Vec<Expression<C>>,
    },

    New {
        struct_name: Ident,
        fields: Vec<(Ident, Expression<C>)>,
    },

    Block(Vec<Expression<C>>),

    If {
        condition: Box<Expression<C>>,
        then_branch: Box<Expression<C>>,
        else_branch: Option<Box<Expression<C>>>,
    },

    While {
        condition: Box<Expression<C>>,
        body: Box<Expression<C>>,
        else_branch: Option<Box<Expression<C>>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    LogicalAnd,
    LogicalOr,
    Shl,
    Shr,
    Equals,
    NotEquals,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Assign,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Equals
                | BinOp::NotEquals
                | BinOp::Less
                | BinOp::LessEq
                | BinOp::Greater
                | BinOp::GreaterEq
        )
    }

    /// Operators that only make sense on integers
    pub fn is_integer_only(self) -> bool {
        matches!(
            self,
            BinOp::BitAnd
                | BinOp::BitOr
                | BinOp::LogicalAnd
                | BinOp::LogicalOr
                | BinOp::Shl
                | BinOp::Shr
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaOp {
    /// `*`
    Deref,
    /// `&`
    AddrOf,
    /// `!`
    Not,
    /// `-`
    Neg,
}

/// A surface type annotation, before name resolution
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Named(Ident),
    Pointer(Box<TypeExpr>),
    Array { elem: Box<TypeExpr>, count: u32 },
    Tuple(Vec<TypeExpr>),
    Function {
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
        variadic: bool,
    },
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::LogicalAnd => "&&",
            BinOp::LogicalOr => "||",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Equals => "==",
            BinOp::NotEquals => "!=",
            BinOp::Less => "<",
            BinOp::LessEq => "<=",
            BinOp::Greater => ">",
            BinOp::GreaterEq => ">=",
            BinOp::Assign => "=",
        };
        write!(f, "{op}")
    }
}

impl fmt::Display for UnaOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            UnaOp::Deref => "*",
            UnaOp::AddrOf => "&",
            UnaOp::Not => "!",
            UnaOp::Neg => "-",
        };
        write!(f, "{op}")
    }
}
