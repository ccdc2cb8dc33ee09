use shared_context::interner::Symbol;
use shared_context::symbols::SymbolId;
use shared_context::types::TypeId;
use shared_context::univ::{UInt, UReal};
use shared_context::{Ident, Span};

/// An expression node.
///
/// `ty` and `sym` are the semantic annotations: the resolved type of
/// the expression and, for names, the symbol it denotes. Both are
/// sentinels until analysis has run.
#[derive(Clone)]
pub struct Expression {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: TypeId,
    pub sym: Option<SymbolId>,
}

impl Expression {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            ty: TypeId::INVALID,
            sym: None,
        }
    }
}

#[derive(Clone)]
pub enum ExprKind {
    /// Integer literal, kept at universal precision.
    IntLiteral(UInt),
    /// Real literal, kept as an exact rational.
    RealLiteral(UReal),
    CharLiteral(char),
    /// String literal contents (quote doubling already undone),
    /// interned case-sensitively.
    StringLiteral(Symbol),
    NullLiteral,
    /// A simple name.
    Identifier(Ident),
    /// `prefix.selector`: an expanded name or a record component.
    Selected {
        prefix: Box<Expression>,
        selector: Ident,
    },
    /// `prefix(arg, ...)`: a call, an array index, or a type
    /// conversion. Parsing cannot tell these apart; the analyzer
    /// rewrites the node to `Call`, `Index` or `Conversion`.
    ApplyUnresolved {
        prefix: Box<Expression>,
        args: Vec<Argument>,
    },
    /// A subprogram call, after resolution. Also covers parameterless
    /// calls rewritten from plain names.
    Call {
        prefix: Box<Expression>,
        args: Vec<Argument>,
    },
    /// An array indexing, after resolution.
    Index {
        prefix: Box<Expression>,
        args: Vec<Argument>,
    },
    /// A type conversion `T(X)`, after resolution.
    Conversion {
        mark: Box<Expression>,
        operand: Box<Expression>,
    },
    /// An array slice `A(LOW .. HIGH)`.
    Slice {
        prefix: Box<Expression>,
        range: Box<RangeExpr>,
    },
    /// `prefix'attribute` or `prefix'attribute(arg)`.
    Attribute {
        prefix: Box<Expression>,
        attribute: Ident,
        arg: Option<Box<Expression>>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    /// `and then` / `or else`; the right operand only evaluates when
    /// the left one does not decide.
    ShortCircuit {
        op: ShortCircuitOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// `X in A .. B`, `X not in T`.
    Membership {
        negated: bool,
        operand: Box<Expression>,
        target: Box<MembershipTarget>,
    },
    /// Record or array aggregate.
    Aggregate { items: Vec<AggregateItem> },
    /// Qualified expression `T'(X)`.
    Qualified {
        mark: Box<Expression>,
        operand: Box<Expression>,
    },
    /// Allocator `new T` or `new T'(X)`.
    Allocator {
        subtype: Box<SubtypeIndication>,
        initial: Option<Box<Expression>>,
    },
}

/// One actual parameter; `name` is set for named association
/// (`FORMAL => value`).
#[derive(Clone)]
pub struct Argument {
    pub name: Option<Ident>,
    pub value: Expression,
    pub span: Span,
}

/// The target of a membership test.
#[derive(Clone)]
pub enum MembershipTarget {
    Range(RangeExpr),
    Mark(Expression),
}

/// A `low .. high` pair.
#[derive(Clone)]
pub struct RangeExpr {
    pub low: Expression,
    pub high: Expression,
    pub span: Span,
}

/// One element of an aggregate. `choices` is empty for positional
/// elements. `field` is the analyzer's placement annotation: the
/// flattened field index for record aggregates, the zero-based
/// element offset for static array aggregates.
#[derive(Clone)]
pub struct AggregateItem {
    pub choices: Vec<ChoiceNode>,
    pub value: Expression,
    pub field: Option<usize>,
    pub span: Span,
}

/// A choice in an aggregate, case arm, or variant part.
#[derive(Clone)]
pub struct ChoiceNode {
    pub kind: ChoiceKind,
    /// Static value range covered by this choice, filled in by the
    /// analyzer; `others` stays `None`.
    pub value: Option<(i64, i64)>,
    pub span: Span,
}

#[derive(Clone)]
pub enum ChoiceKind {
    Expr(Expression),
    Range(RangeExpr),
    Others,
}

/// A discrete range: a type mark, a plain range, or a constrained
/// mark (`T range 1 .. 5`).
#[derive(Clone)]
pub struct DiscreteRange {
    pub mark: Option<Expression>,
    pub range: Option<RangeExpr>,
    pub span: Span,
    /// Resolved index/base type.
    pub ty: TypeId,
}

/// A subtype indication: a type mark plus an optional constraint.
#[derive(Clone)]
pub struct SubtypeIndication {
    pub mark: Expression,
    pub constraint: Option<AstConstraint>,
    pub span: Span,
    /// The denoted (sub)type after analysis.
    pub ty: TypeId,
}

/// A constraint written in source, before evaluation.
#[derive(Clone)]
pub enum AstConstraint {
    Range(RangeExpr),
    /// Index constraint or discriminant constraint; both are written
    /// as a parenthesized association list and disambiguated against
    /// the base type.
    Composite(Vec<ConstraintElem>),
    /// `digits N [range ...]` / `delta N [range ...]` on a real
    /// subtype indication.
    Accuracy {
        is_digits: bool,
        amount: Box<Expression>,
        range: Option<RangeExpr>,
    },
}

/// One element of a composite constraint: a range for index
/// constraints, an optionally named value for discriminant
/// constraints.
#[derive(Clone)]
pub struct ConstraintElem {
    pub name: Option<Ident>,
    pub kind: ConstraintElemKind,
    pub span: Span,
}

#[derive(Clone)]
pub enum ConstraintElemKind {
    Range(RangeExpr),
    Expr(Expression),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Rem,
    Pow,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
    Concat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    Abs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShortCircuitOp {
    AndThen,
    OrElse,
}
