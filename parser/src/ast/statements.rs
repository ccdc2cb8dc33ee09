use super::declarations::{Declaration, ParamSpec};
use super::expressions::*;
use shared_context::suppress::SuppressMask;
use shared_context::symbols::SymbolId;
use shared_context::{Ident, Span};

/// A statement node.
#[derive(Clone)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

impl Statement {
    pub fn new(kind: StatementKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Clone)]
pub enum StatementKind {
    Null,
    /// `target := value;`
    Assignment {
        target: Expression,
        value: Expression,
    },
    /// A procedure or entry call statement.
    Call(Expression),
    /// `if .. elsif .. else`: one arm per condition, in source order.
    If {
        arms: Vec<IfArm>,
        else_arm: Option<Vec<Statement>>,
    },
    Case {
        selector: Expression,
        arms: Vec<CaseArm>,
    },
    /// All three loop forms, optionally named.
    Loop {
        name: Option<Ident>,
        scheme: LoopScheme,
        body: Vec<Statement>,
    },
    /// `exit [LOOP_NAME] [when COND];`
    Exit {
        name: Option<Ident>,
        condition: Option<Expression>,
    },
    Return(Option<Expression>),
    /// `[declare ...] begin ... [exception ...] end;`
    Block {
        decls: Vec<Declaration>,
        statements: Vec<Statement>,
        handlers: Vec<ExceptionHandler>,
        /// Active SUPPRESS set inside the block, filled by analysis.
        suppress: SuppressMask,
    },
    /// `raise [EXCEPTION_NAME];` a bare raise re-raises inside a
    /// handler.
    Raise(Option<Expression>),
    Delay(Expression),
    /// `accept E [(params)] [do ... end E];`
    Accept {
        entry: Ident,
        params: Vec<ParamSpec>,
        body: Option<Vec<Statement>>,
        span: Span,
        /// The accepted entry's symbol, resolved by analysis.
        sym: Option<SymbolId>,
    },
    /// Selective wait with optional guards, delay and else arms.
    Select {
        arms: Vec<SelectArm>,
        else_arm: Option<Vec<Statement>>,
    },
    Abort(Vec<Expression>),
}

#[derive(Clone)]
pub struct IfArm {
    pub condition: Expression,
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Clone)]
pub struct CaseArm {
    pub choices: Vec<ChoiceNode>,
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Clone)]
pub enum LoopScheme {
    Infinite,
    While(Expression),
    For {
        variable: Ident,
        reverse: bool,
        range: DiscreteRange,
        /// The induction variable's symbol, declared by analysis.
        sym: Option<SymbolId>,
    },
}

/// `when CHOICE [| CHOICE] => statements` in an exception part.
#[derive(Clone)]
pub struct ExceptionHandler {
    pub choices: Vec<ExceptionChoice>,
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Clone)]
pub enum ExceptionChoice {
    Name(Expression),
    Others,
}

/// One alternative of a selective wait.
#[derive(Clone)]
pub struct SelectArm {
    pub guard: Option<Expression>,
    pub kind: SelectArmKind,
    pub span: Span,
}

#[derive(Clone)]
pub enum SelectArmKind {
    /// An accept alternative and the statements following it.
    Accept {
        accept: Box<Statement>,
        statements: Vec<Statement>,
    },
    /// A delay alternative.
    Delay {
        delay: Expression,
        statements: Vec<Statement>,
    },
    Terminate,
}
