use super::expressions::*;
use super::statements::{ExceptionHandler, Statement};
use shared_context::suppress::SuppressMask;
use shared_context::symbols::{Mode, ScopeId, SymbolId};
use shared_context::types::TypeId;
use shared_context::{Ident, Span};

/// A declaration in a declarative part.
#[derive(Clone)]
pub enum Declaration {
    /// Placeholder left where analysis moved a declaration elsewhere
    /// (generic bodies are hoisted into their instances).
    Null,
    Object(ObjectDecl),
    /// Named number: `PI : constant := 3.14159;` has no subtype
    /// indication and stays universal.
    Number(NumberDecl),
    Type(TypeDecl),
    Subtype(SubtypeDecl),
    /// Subprogram declaration without a body (a spec, or an imported
    /// one completed elsewhere).
    SubprogramSpec(SubprogramSpec),
    Subprogram(Box<SubprogramBody>),
    Package(Box<PackageSpec>),
    PackageBody(Box<PackageBody>),
    Exception(ExceptionDecl),
    UseClause { names: Vec<Ident>, span: Span },
    Pragma(PragmaDecl),
    Task(TaskDecl),
    TaskBody(Box<TaskBody>),
    Generic(Box<GenericDecl>),
    GenericInstance(GenericInstance),
}

impl Declaration {
    pub fn span(&self) -> Span {
        match self {
            Declaration::Null => Span::default(),
            Declaration::Object(d) => d.span,
            Declaration::Number(d) => d.span,
            Declaration::Type(d) => d.span,
            Declaration::Subtype(d) => d.span,
            Declaration::SubprogramSpec(d) => d.span,
            Declaration::Subprogram(d) => d.span,
            Declaration::Package(d) => d.span,
            Declaration::PackageBody(d) => d.span,
            Declaration::Exception(d) => d.span,
            Declaration::UseClause { span, .. } => *span,
            Declaration::Pragma(d) => d.span,
            Declaration::Task(d) => d.span,
            Declaration::TaskBody(d) => d.span,
            Declaration::Generic(d) => d.span,
            Declaration::GenericInstance(d) => d.span,
        }
    }
}

/// `A, B : [constant] T [:= INIT];`
#[derive(Clone)]
pub struct ObjectDecl {
    pub names: Vec<Ident>,
    pub constant: bool,
    pub subtype: ObjectSubtype,
    pub init: Option<Expression>,
    pub span: Span,
    /// One symbol per declared name, in order.
    pub syms: Vec<SymbolId>,
}

/// The subtype of an object: a subtype indication, or an anonymous
/// array definition (`X : array (1 .. 10) of T;`).
#[derive(Clone)]
pub enum ObjectSubtype {
    Indication(SubtypeIndication),
    ArrayDef(Box<TypeDef>),
}

/// `N : constant := static_expression;`
#[derive(Clone)]
pub struct NumberDecl {
    pub names: Vec<Ident>,
    pub value: Expression,
    pub span: Span,
    pub syms: Vec<SymbolId>,
}

/// A full type declaration, with an optional discriminant part.
#[derive(Clone)]
pub struct TypeDecl {
    pub name: Ident,
    pub discriminants: Vec<DiscriminantSpec>,
    pub def: TypeDef,
    pub span: Span,
    pub ty: TypeId,
}

#[derive(Clone)]
pub struct DiscriminantSpec {
    pub names: Vec<Ident>,
    pub mark: Expression,
    pub default: Option<Expression>,
    pub span: Span,
}

/// The definition part of a type declaration.
#[derive(Clone)]
pub enum TypeDef {
    /// `range L .. H` (an integer type).
    Range(RangeExpr),
    /// `(RED, GREEN, 'x', ...)`
    Enumeration { literals: Vec<EnumLiteral> },
    /// `digits D [range L .. H]`
    Float {
        digits: Expression,
        range: Option<RangeExpr>,
    },
    /// `delta D [range L .. H]`
    Fixed {
        delta: Expression,
        range: Option<RangeExpr>,
    },
    /// `array (INDEX[, ...]) of COMPONENT`; unconstrained when the
    /// index positions are `T range <>`.
    Array {
        indexes: Vec<DiscreteRange>,
        unconstrained: bool,
        component: SubtypeIndication,
    },
    /// `record ... end record`, with an optional variant part.
    Record {
        components: Vec<ComponentDecl>,
        variant: Option<AstVariantPart>,
    },
    /// `access T`
    Access { designated: SubtypeIndication },
    /// `new T [constraint]`
    Derived { parent: SubtypeIndication },
    /// `[limited] private`
    Private { limited: bool },
}

#[derive(Clone)]
pub struct EnumLiteral {
    pub name: Ident,
    /// True for character literals used as enumeration literals.
    pub is_char: bool,
}

#[derive(Clone)]
pub struct ComponentDecl {
    pub names: Vec<Ident>,
    pub subtype: SubtypeIndication,
    pub init: Option<Expression>,
    pub span: Span,
}

#[derive(Clone)]
pub struct AstVariantPart {
    pub discriminant: Ident,
    pub arms: Vec<AstVariantArm>,
    pub span: Span,
}

#[derive(Clone)]
pub struct AstVariantArm {
    pub choices: Vec<ChoiceNode>,
    pub components: Vec<ComponentDecl>,
    pub span: Span,
}

/// `subtype S is T [constraint];`
#[derive(Clone)]
pub struct SubtypeDecl {
    pub name: Ident,
    pub subtype: SubtypeIndication,
    pub span: Span,
    pub ty: TypeId,
}

/// The specification of a procedure, function, or entry.
#[derive(Clone)]
pub struct SubprogramSpec {
    pub name: Ident,
    pub is_function: bool,
    pub params: Vec<ParamSpec>,
    /// Result type mark for functions.
    pub result: Option<Expression>,
    pub span: Span,
    pub sym: Option<SymbolId>,
}

#[derive(Clone)]
pub struct ParamSpec {
    pub names: Vec<Ident>,
    pub mode: Mode,
    pub mark: Expression,
    pub default: Option<Expression>,
    pub span: Span,
    /// One symbol per name, declared by the body (or accept) that
    /// binds these formals.
    pub syms: Vec<SymbolId>,
}

/// A subprogram body: spec, declarative part, statements, handlers.
#[derive(Clone)]
pub struct SubprogramBody {
    pub spec: SubprogramSpec,
    pub decls: Vec<Declaration>,
    pub statements: Vec<Statement>,
    pub handlers: Vec<ExceptionHandler>,
    pub span: Span,
    /// Scope opened for the body, recorded for the code generator's
    /// static link distances.
    pub scope: Option<ScopeId>,
    /// Active SUPPRESS set for the body, filled by analysis.
    pub suppress: SuppressMask,
}

/// A package specification: visible part and private part.
#[derive(Clone)]
pub struct PackageSpec {
    pub name: Ident,
    pub visible: Vec<Declaration>,
    pub private: Vec<Declaration>,
    pub span: Span,
    pub sym: Option<SymbolId>,
}

/// A package body: declarations plus the optional initialization
/// sequence and its handlers.
#[derive(Clone)]
pub struct PackageBody {
    pub name: Ident,
    pub decls: Vec<Declaration>,
    pub statements: Vec<Statement>,
    pub handlers: Vec<ExceptionHandler>,
    pub span: Span,
    pub sym: Option<SymbolId>,
    /// Active SUPPRESS set for the body, filled by analysis.
    pub suppress: SuppressMask,
}

#[derive(Clone)]
pub struct ExceptionDecl {
    pub names: Vec<Ident>,
    pub span: Span,
    pub syms: Vec<SymbolId>,
}

#[derive(Clone)]
pub struct PragmaDecl {
    pub name: Ident,
    pub args: Vec<Argument>,
    pub span: Span,
}

/// `task [type] T is ... end T;` or a single task without entries.
#[derive(Clone)]
pub struct TaskDecl {
    pub name: Ident,
    pub is_type: bool,
    pub entries: Vec<SubprogramSpec>,
    pub span: Span,
    pub ty: TypeId,
    /// The declared type name or single-task object symbol.
    pub sym: Option<SymbolId>,
}

#[derive(Clone)]
pub struct TaskBody {
    pub name: Ident,
    pub decls: Vec<Declaration>,
    pub statements: Vec<Statement>,
    pub handlers: Vec<ExceptionHandler>,
    pub span: Span,
}

/// A generic declaration: formal part plus the generic unit.
#[derive(Clone)]
pub struct GenericDecl {
    pub formals: Vec<GenericFormal>,
    pub unit: GenericUnit,
    pub span: Span,
}

#[derive(Clone)]
pub enum GenericUnit {
    Package(PackageSpec),
    Subprogram(SubprogramSpec),
}

#[derive(Clone)]
pub enum GenericFormal {
    /// `type T is ...;` formal types; the kind restricts the actuals.
    Type { name: Ident, kind: FormalTypeKind, span: Span },
    /// `X : [in [out]] T [:= default];`
    Object {
        names: Vec<Ident>,
        mode: Mode,
        mark: Expression,
        default: Option<Expression>,
        span: Span,
    },
    /// `with procedure P (...);` / `with function F (...) return T;`
    Subprogram { spec: SubprogramSpec, span: Span },
}

#[derive(Clone)]
pub enum FormalTypeKind {
    /// `(<>)` any discrete type
    Discrete,
    /// `range <>` any integer type
    Integer,
    /// `digits <>` any floating type
    Float,
    /// `private` / `limited private`
    Private { limited: bool },
    /// `array (...) of ...`
    Array {
        indexes: Vec<DiscreteRange>,
        unconstrained: bool,
        component: SubtypeIndication,
    },
    /// `access T`
    Access { designated: SubtypeIndication },
}

/// `package P is new G (actuals);` or the subprogram form.
#[derive(Clone)]
pub struct GenericInstance {
    pub name: Ident,
    pub is_package: bool,
    pub generic: Expression,
    pub actuals: Vec<Argument>,
    pub span: Span,
}
