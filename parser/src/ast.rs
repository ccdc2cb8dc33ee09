// The abstract syntax tree consumed by semantic analysis and code
// generation.
//
// Every node carries the source span it was parsed from. Expression
// nodes additionally carry a resolved type and, where it applies, a
// resolved symbol; both start out as sentinels and are filled in by
// the semantic analyzer, which walks the tree in place.

mod declarations;
mod expressions;
mod statements;

pub use declarations::*;
pub use expressions::*;
pub use statements::*;

use shared_context::{Ident, Span};

/// One parsed source file: the context clauses followed by exactly
/// one library item.
pub struct CompilationUnit {
    pub context: Vec<ContextClause>,
    pub item: LibraryItem,
}

/// A `with` or `use` clause ahead of a library item.
pub enum ContextClause {
    With { names: Vec<Ident>, span: Span },
    Use { names: Vec<Ident>, span: Span },
}

/// The library item of a compilation unit.
pub enum LibraryItem {
    PackageSpec(PackageSpec),
    PackageBody(PackageBody),
    Subprogram(SubprogramBody),
    Generic(Box<GenericDecl>),
    Instance(GenericInstance),
}

impl LibraryItem {
    /// The defining name of the unit.
    pub fn name(&self) -> Ident {
        match self {
            LibraryItem::PackageSpec(spec) => spec.name,
            LibraryItem::PackageBody(body) => body.name,
            LibraryItem::Subprogram(subprogram) => subprogram.spec.name,
            LibraryItem::Generic(generic) => match &generic.unit {
                GenericUnit::Package(spec) => spec.name,
                GenericUnit::Subprogram(spec) => spec.name,
            },
            LibraryItem::Instance(instance) => instance.name,
        }
    }
}
