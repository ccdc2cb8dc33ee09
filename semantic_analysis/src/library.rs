// Library unit loading.
//
// A `with` clause names a unit; if it is not in the registry yet the
// include-path resolver locates its source, which is lexed, parsed
// and analyzed recursively into the same context. The elaboration
// state machine doubles as the cycle detector: meeting a unit that is
// already `Elaborating` on the load path means the with-graph loops.

use crate::semantic_error::ErrorType;
use crate::{Analyzer, Session};
use shared_context::interner::Symbol;
use shared_context::units::{ElabState, SourceLocator, UnitId, UnitKind};
use shared_context::{CompilerContext, Span};
use std::fs;

/// A locator with an empty include path, for tests and single-file
/// compilations.
pub struct NoSource;

impl SourceLocator for NoSource {
    fn locate(&self, _unit_name: &str) -> Option<std::path::PathBuf> {
        None
    }
}

/// Make sure the unit named in a `with` clause is analyzed and its
/// exported scope linked, loading it from source when necessary.
pub fn ensure_loaded<'src>(
    ctx: &mut CompilerContext<'src>,
    session: &mut Session,
    name: Symbol,
    span: Span,
) -> Result<UnitId, ErrorType> {
    if let Some(id) = ctx.units.by_name(name) {
        let unit = ctx.units.get(id);
        match unit.state {
            ElabState::Elaborating => {
                return Err(ErrorType::ElaborationCycle {
                    names: vec![name],
                    span,
                });
            }
            ElabState::Elaborated => return Ok(id),
            ElabState::NotStarted if unit.intrinsic || unit.scope.is_some() => return Ok(id),
            ElabState::NotStarted => {}
        }
    }

    let id = ctx.units.intern(name, UnitKind::Package);
    let unit_name = ctx.interner.lookup(name).to_string();

    let Some(path) = session.locator.locate(&unit_name) else {
        return Err(ErrorType::UnitNotFound { name, span });
    };
    let Ok(text) = fs::read_to_string(&path) else {
        return Err(ErrorType::UnitNotFound { name, span });
    };

    // the loaded source must share the compilation's lifetime
    let arena = ctx.interner.arena();
    let source: &'src str = arena.alloc_str(&text);
    let file_name: &'src str = arena.alloc_str(&path.to_string_lossy());

    ctx.units.get_mut(id).state = ElabState::Elaborating;

    let lexer = lexer::Lexer::new(source);
    let Some(mut parsed) = parser::parse(lexer, file_name, ctx) else {
        ctx.units.get_mut(id).state = ElabState::NotStarted;
        return Err(ErrorType::UnitNotFound { name, span });
    };

    let mut nested = Analyzer::new(ctx, session, file_name, source);
    let analyzed = nested.analyze_compilation_unit(&mut parsed);

    // the dependency's tree is done once its symbols, types and unit
    // scope are in the context; only the root unit's tree lowers to IR
    debug_assert_eq!(analyzed, id, "unit name resolved to a different registry slot");
    Ok(id)
}
