// Semantic analysis: name resolution, overload resolution, type and
// constraint checking, library unit loading, and elaboration
// ordering. The analyzer annotates the AST in place; code generation
// reads the annotations and never resolves a name itself.

use parser::ast::{CompilationUnit, Expression, GenericDecl, PackageBody, SubprogramBody};
use shared_context::CompilerContext;
use shared_context::interner::Symbol;
use shared_context::suppress::SuppressMask;
use shared_context::symbols::{ScopeId, SymbolId};
use shared_context::types::TypeId;
use shared_context::units::{SourceLocator, UnitId};
use std::collections::HashMap;

mod analyzer;
pub mod library;
mod overload;
mod resolve;
pub mod semantic_error;
pub mod standard;
pub mod static_eval;
mod typecheck_expressions;
mod typecheck_statements;

pub use analyzer::Analyzer;
use analyzer::PendingAlias;
use static_eval::StaticValue;

/// Cross-unit analysis state that is not part of the compiler
/// context: the include-path resolver, generic templates awaiting
/// instantiation, parameter defaults for call normalization, folded
/// named numbers, and task entry scopes.
pub struct Session {
    pub locator: Box<dyn SourceLocator>,
    pub initial_suppress: SuppressMask,
    pub(crate) generics: HashMap<SymbolId, GenericEntry>,
    pub(crate) param_defaults: HashMap<SymbolId, Vec<(Symbol, Option<Expression>)>>,
    pub(crate) static_numbers: HashMap<SymbolId, StaticValue>,
    pub(crate) task_scopes: HashMap<TypeId, ScopeId>,
    pub(crate) pending_aliases: Vec<PendingAlias>,
}

impl Session {
    pub fn new(locator: Box<dyn SourceLocator>, initial_suppress: SuppressMask) -> Self {
        Self {
            locator,
            initial_suppress,
            generics: HashMap::new(),
            param_defaults: HashMap::new(),
            static_numbers: HashMap::new(),
            task_scopes: HashMap::new(),
            pending_aliases: Vec::new(),
        }
    }
}

/// A generic template: the declaration and, once seen, its body.
#[derive(Clone)]
pub(crate) struct GenericEntry {
    pub(crate) decl: GenericDecl,
    pub(crate) package_body: Option<PackageBody>,
    pub(crate) subprogram_body: Option<SubprogramBody>,
}

/// Analyze one parsed compilation unit against a context that already
/// has the predefined environment installed. Everything the unit
/// `with`s is loaded transitively through the session's locator.
pub fn analyze<'src>(
    ctx: &mut CompilerContext<'src>,
    session: &mut Session,
    file_name: &'src str,
    source: &'src str,
    unit: &mut CompilationUnit,
) -> UnitId {
    let mut analyzer = Analyzer::new(ctx, session, file_name, source);
    analyzer.analyze_compilation_unit(unit)
}
