// Overload resolution.
//
// The Ada 83 two-pass algorithm: enumerate the visible candidates for
// a name, filter by arity and named-association shape, then by
// parameter type compatibility, then by result type against the
// context. One survivor is the meaning; zero or several are the two
// distinct failure modes the analyzer reports.

use shared_context::CompilerContext;
use shared_context::interner::Symbol;
use shared_context::symbols::{Param, SymbolId, SymbolKind};
use shared_context::types::TypeId;

/// The outcome of a resolution attempt.
pub enum Resolution {
    Unique(SymbolId),
    Ambiguous,
    NoMatch,
}

/// The context a call resolves in: a procedure call statement, or an
/// expression with or without a known expected type.
#[derive(Clone, Copy)]
pub enum CallContext {
    Procedure,
    Function(Option<TypeId>),
}

/// One analyzed actual parameter: its bottom-up type and, for named
/// association, the formal it names.
pub struct Actual {
    pub name: Option<Symbol>,
    pub ty: TypeId,
}

/// Pick the unique candidate that accepts `actuals` and produces a
/// result fitting the call context.
pub fn resolve(
    ctx: &CompilerContext,
    candidates: &[SymbolId],
    actuals: &[Actual],
    expected: CallContext,
) -> Resolution {
    let mut matching: Vec<SymbolId> = Vec::new();

    for &candidate in candidates {
        if candidate_matches(ctx, candidate, actuals, expected) {
            matching.push(candidate);
        }
    }

    match matching.len() {
        0 => Resolution::NoMatch,
        1 => Resolution::Unique(matching[0]),
        // more than one survivor is ambiguous, full stop; the
        // language has no preference rule between legal candidates
        _ => Resolution::Ambiguous,
    }
}

/// Map actuals to the candidate's formals: positional first, then
/// named. Returns the formal type for each actual, or `None` when
/// the shape does not fit (wrong arity, unknown formal name, a
/// formal left without an actual or default).
pub fn match_formals(
    params: &[Param],
    actuals: &[Actual],
) -> Option<Vec<TypeId>> {
    if actuals.len() > params.len() {
        return None;
    }

    let mut taken = vec![false; params.len()];
    let mut formal_types = Vec::with_capacity(actuals.len());
    let mut seen_named = false;

    for (position, actual) in actuals.iter().enumerate() {
        match actual.name {
            None => {
                // positional follows named: illegal shape
                if seen_named {
                    return None;
                }
                taken[position] = true;
                formal_types.push(params[position].ty);
            }
            Some(name) => {
                seen_named = true;
                let index = params.iter().position(|p| p.name == name)?;
                if taken[index] {
                    return None;
                }
                taken[index] = true;
                formal_types.push(params[index].ty);
            }
        }
    }

    // every remaining formal needs a default
    for (index, param) in params.iter().enumerate() {
        if !taken[index] && !param.has_default {
            return None;
        }
    }

    Some(formal_types)
}

fn signature_of<'a>(ctx: &'a CompilerContext, candidate: SymbolId) -> Option<(&'a [Param], Option<TypeId>)> {
    match &ctx.symbols.get(candidate).kind {
        SymbolKind::Subprogram { signature } | SymbolKind::Entry { signature } => {
            Some((&signature.params, signature.result))
        }
        // an enumeration literal is a parameterless function of its
        // type
        SymbolKind::EnumLiteral { .. } => Some((&[], Some(ctx.symbols.get(candidate).ty))),
        _ => None,
    }
}

fn candidate_matches(
    ctx: &CompilerContext,
    candidate: SymbolId,
    actuals: &[Actual],
    expected: CallContext,
) -> bool {
    let Some((params, result)) = signature_of(ctx, candidate) else {
        return false;
    };

    let Some(formal_types) = match_formals(params, actuals) else {
        return false;
    };

    for (actual, formal_ty) in actuals.iter().zip(formal_types.iter()) {
        if !ctx.types.compatible(actual.ty, *formal_ty) {
            return false;
        }
    }

    match (expected, result) {
        (CallContext::Procedure, result) => result.is_none(),
        (CallContext::Function(_), None) => false,
        (CallContext::Function(None), Some(_)) => true,
        (CallContext::Function(Some(expected)), Some(result)) => {
            ctx.types.compatible(expected, result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standard;
    use shared_context::{Bump, CompilerContext};

    fn context(arena: &Bump) -> CompilerContext<'_> {
        let mut ctx = CompilerContext::new(arena);
        ctx.diagnostics = shared_context::diagnostics::Diagnostics::silent();
        standard::install(&mut ctx);
        ctx
    }

    fn text_io_puts(ctx: &mut CompilerContext) -> Vec<SymbolId> {
        let put = ctx.interner.intern_folded("put");
        let text_io = ctx.interner.intern_folded("text_io");
        let unit = ctx.units.by_name(text_io).unwrap();
        let scope = ctx.units.get(unit).scope.unwrap();
        ctx.symbols.lookup_selected(scope, put)
    }

    #[test]
    fn parameter_type_filter_picks_the_unique_put() {
        let arena = Bump::new();
        let mut ctx = context(&arena);
        let candidates = text_io_puts(&mut ctx);
        assert_eq!(candidates.len(), 2);

        let actuals = [Actual {
            name: None,
            ty: ctx.types.well_known.string,
        }];
        match resolve(&ctx, &candidates, &actuals, CallContext::Procedure) {
            Resolution::Unique(sym) => {
                assert_eq!(ctx.symbols.get(sym).mangled, "__ada_rt_put");
            }
            _ => panic!("expected a unique resolution"),
        }
    }

    #[test]
    fn universal_arguments_resolve_against_integer_formals() {
        let arena = Bump::new();
        let mut ctx = context(&arena);
        let candidates = text_io_puts(&mut ctx);

        let actuals = [Actual {
            name: None,
            ty: ctx.types.well_known.universal_integer,
        }];
        match resolve(&ctx, &candidates, &actuals, CallContext::Procedure) {
            Resolution::Unique(sym) => {
                assert_eq!(ctx.symbols.get(sym).mangled, "__ada_rt_put_int");
            }
            _ => panic!("expected a unique resolution"),
        }
    }

    #[test]
    fn arity_mismatch_is_no_match() {
        let arena = Bump::new();
        let mut ctx = context(&arena);
        let candidates = text_io_puts(&mut ctx);

        let actuals = [
            Actual {
                name: None,
                ty: ctx.types.well_known.string,
            },
            Actual {
                name: None,
                ty: ctx.types.well_known.string,
            },
        ];
        assert!(matches!(
            resolve(&ctx, &candidates, &actuals, CallContext::Procedure),
            Resolution::NoMatch
        ));
    }

    #[test]
    fn named_association_matches_the_formal() {
        let arena = Bump::new();
        let mut ctx = context(&arena);
        let candidates = text_io_puts(&mut ctx);
        let item = ctx.interner.intern_folded("item");

        let actuals = [Actual {
            name: Some(item),
            ty: ctx.types.well_known.string,
        }];
        assert!(matches!(
            resolve(&ctx, &candidates, &actuals, CallContext::Procedure),
            Resolution::Unique(_)
        ));

        let wrong = ctx.interner.intern_folded("no_such_formal");
        let actuals = [Actual {
            name: Some(wrong),
            ty: ctx.types.well_known.string,
        }];
        assert!(matches!(
            resolve(&ctx, &candidates, &actuals, CallContext::Procedure),
            Resolution::NoMatch
        ));
    }
}
