use core::fmt;
use shared_context::diagnostics::Category;
use shared_context::interner::{Interner, Symbol};
use shared_context::source_map::SourceMap;
use shared_context::types::{TypeId, TypeTable};
use shared_context::Span;

/// Everything the analyzer can object to. Each variant carries the
/// source positions and names needed to format a useful message.
#[derive(Debug)]
pub enum ErrorType {
    UndeclaredIdentifier { name: Symbol, span: Span },
    AmbiguousOverload { name: Symbol, span: Span },
    NoOverloadMatch { name: Symbol, span: Span },
    TypeMismatch { expected: TypeId, found: TypeId, span: Span },
    NotAType { span: Span },
    NotAVariable { span: Span },
    IllegalMode { name: Symbol, span: Span },
    ConstraintViolation { message: String, span: Span },
    NotStatic { span: Span },
    DeclaredTwice { name: Symbol, first: Span, second: Span },
    MissingOthers { span: Span },
    DuplicateChoice { span: Span },
    ExitOutsideLoop { span: Span },
    UnknownLoopName { name: Symbol, span: Span },
    ReturnOutsideSubprogram { span: Span },
    MissingReturnValue { span: Span },
    UnexpectedReturnValue { span: Span },
    RaiseOutsideHandler { span: Span },
    NotAnException { span: Span },
    WrongArgumentCount { span: Span },
    UnknownField { name: Symbol, span: Span },
    UnitNotFound { name: Symbol, span: Span },
    ElaborationCycle { names: Vec<Symbol>, span: Span },
    Unsupported { message: String, span: Span },
}

impl ErrorType {
    /// Which part of the taxonomy a variant belongs to.
    pub fn category(&self) -> Category {
        match self {
            ErrorType::ElaborationCycle { .. } | ErrorType::UnitNotFound { .. } => {
                Category::Elaboration
            }
            _ => Category::Semantic,
        }
    }
}

/// A semantic error, pre-formatted against the source map so it stays
/// readable after the analysis pass is gone.
#[derive(Debug)]
pub struct SemanticErr {
    formated_error: String,
    category: Category,
}

impl SemanticErr {
    pub fn new(
        err: ErrorType,
        source_map: &SourceMap,
        interner: &Interner,
        types: &TypeTable,
    ) -> Self {
        let category = err.category();
        let name_of = |symbol: Symbol| interner.lookup(symbol).to_string();
        let type_name = |id: TypeId| {
            if !id.is_valid() {
                return "(invalid)".to_string();
            }
            let name = types.get(id).name;
            let text = interner.lookup(name);
            if text.is_empty() {
                "(anonymous)".to_string()
            } else {
                text.to_string()
            }
        };

        let formated_error = match err {
            ErrorType::UndeclaredIdentifier { name, span } => source_map.format_message(
                &format!("undeclared identifier '{}'", name_of(name)),
                span,
            ),
            ErrorType::AmbiguousOverload { name, span } => source_map.format_message(
                &format!("ambiguous call to overloaded '{}'", name_of(name)),
                span,
            ),
            ErrorType::NoOverloadMatch { name, span } => source_map.format_message(
                &format!("no visible '{}' matches these operands", name_of(name)),
                span,
            ),
            ErrorType::TypeMismatch {
                expected,
                found,
                span,
            } => source_map.format_message(
                &format!(
                    "type mismatch: expected {}, found {}",
                    type_name(expected),
                    type_name(found)
                ),
                span,
            ),
            ErrorType::NotAType { span } => {
                source_map.format_message("this name does not denote a type", span)
            }
            ErrorType::NotAVariable { span } => {
                source_map.format_message("this name is not a variable", span)
            }
            ErrorType::IllegalMode { name, span } => source_map.format_message(
                &format!("'{}' is an in parameter and cannot be assigned", name_of(name)),
                span,
            ),
            ErrorType::ConstraintViolation { message, span } => {
                source_map.format_message(&message, span)
            }
            ErrorType::NotStatic { span } => {
                source_map.format_message("a static expression is required here", span)
            }
            ErrorType::DeclaredTwice { name, first, second } => format!(
                "'{}' declared twice\nfirst declaration:\n{}\
                 second declaration:\n{}",
                name_of(name),
                source_map.format_message("", first),
                source_map.format_message("", second),
            ),
            ErrorType::MissingOthers { span } => source_map.format_message(
                "case choices do not cover the value range and there is no 'others'",
                span,
            ),
            ErrorType::DuplicateChoice { span } => {
                source_map.format_message("this choice is already covered", span)
            }
            ErrorType::ExitOutsideLoop { span } => {
                source_map.format_message("exit statement is not inside a loop", span)
            }
            ErrorType::UnknownLoopName { name, span } => source_map.format_message(
                &format!("'{}' does not name an enclosing loop", name_of(name)),
                span,
            ),
            ErrorType::ReturnOutsideSubprogram { span } => {
                source_map.format_message("return statement outside a subprogram", span)
            }
            ErrorType::MissingReturnValue { span } => {
                source_map.format_message("a function must return a value", span)
            }
            ErrorType::UnexpectedReturnValue { span } => {
                source_map.format_message("a procedure cannot return a value", span)
            }
            ErrorType::RaiseOutsideHandler { span } => source_map.format_message(
                "a raise without an exception name is only legal inside a handler",
                span,
            ),
            ErrorType::NotAnException { span } => {
                source_map.format_message("this name does not denote an exception", span)
            }
            ErrorType::WrongArgumentCount { span } => {
                source_map.format_message("wrong number of arguments", span)
            }
            ErrorType::UnknownField { name, span } => source_map.format_message(
                &format!("no component named '{}' in this type", name_of(name)),
                span,
            ),
            ErrorType::UnitNotFound { name, span } => source_map.format_message(
                &format!("library unit '{}' not found on the include path", name_of(name)),
                span,
            ),
            ErrorType::ElaborationCycle { names, span } => {
                let cycle = names
                    .iter()
                    .map(|n| name_of(*n).to_uppercase())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                source_map.format_message(
                    &format!("circular dependency between library units: {cycle}"),
                    span,
                )
            }
            ErrorType::Unsupported { message, span } => source_map.format_message(&message, span),
        };

        Self {
            formated_error,
            category,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn into_message(self) -> String {
        self.formated_error
    }
}

impl fmt::Display for SemanticErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formated_error)
    }
}

impl std::error::Error for SemanticErr {}
