// The predefined environment: package STANDARD's types, literals and
// exceptions, and the TEXT_IO interface backed by the runtime.
//
// Everything here is seeded into the root scope before any user unit
// is analyzed, so ordinary name lookup finds INTEGER or
// CONSTRAINT_ERROR with no special cases.

use shared_context::CompilerContext;
use shared_context::Span;
use shared_context::symbols::{Mode, Param, Signature, SymbolEntry, SymbolKind, Visibility};
use shared_context::types::{Bound, Constraint, TypeDescriptor, TypeId, TypeKind};
use shared_context::units::UnitKind;

/// DURATION's small: 2.0 ** (-14), the customary value.
const DURATION_SMALL: f64 = 0.00006103515625;

/// Build the predefined environment into a fresh context. Must run
/// once, before the first unit is analyzed.
pub fn install(ctx: &mut CompilerContext) {
    let universal_integer = {
        let name = ctx.interner.intern_folded("universal_integer");
        ctx.types.add(TypeDescriptor {
            name,
            kind: TypeKind::UniversalInteger,
            base: None,
            constraint: None,
        })
    };
    let universal_real = {
        let name = ctx.interner.intern_folded("universal_real");
        ctx.types.add(TypeDescriptor {
            name,
            kind: TypeKind::UniversalReal,
            base: None,
            constraint: None,
        })
    };

    // the scalar types of package STANDARD
    let boolean = {
        let name = ctx.interner.intern_folded("boolean");
        let false_lit = ctx.interner.intern_folded("false");
        let true_lit = ctx.interner.intern_folded("true");
        ctx.types.add(TypeDescriptor {
            name,
            kind: TypeKind::Enumeration {
                literals: vec![false_lit, true_lit],
            },
            base: None,
            constraint: None,
        })
    };
    let integer = {
        let name = ctx.interner.intern_folded("integer");
        ctx.types.add(TypeDescriptor {
            name,
            kind: TypeKind::Integer {
                first: i64::MIN,
                last: i64::MAX,
            },
            base: None,
            constraint: None,
        })
    };
    // CHARACTER is carried as the discrete range of the 128 ASCII
    // positions; character literals convert through 'POS/'VAL
    let character = {
        let name = ctx.interner.intern_folded("character");
        ctx.types.add(TypeDescriptor {
            name,
            kind: TypeKind::Integer { first: 0, last: 127 },
            base: None,
            constraint: None,
        })
    };
    let float = {
        let name = ctx.interner.intern_folded("float");
        ctx.types.add(TypeDescriptor {
            name,
            kind: TypeKind::Float { digits: 15 },
            base: None,
            constraint: None,
        })
    };
    let natural = {
        let name = ctx.interner.intern_folded("natural");
        ctx.types.add(TypeDescriptor {
            name,
            kind: TypeKind::Integer {
                first: i64::MIN,
                last: i64::MAX,
            },
            base: Some(integer),
            constraint: Some(Constraint::Range {
                first: Bound::Int(0),
                last: Bound::Int(i64::MAX),
            }),
        })
    };
    let positive = {
        let name = ctx.interner.intern_folded("positive");
        ctx.types.add(TypeDescriptor {
            name,
            kind: TypeKind::Integer {
                first: i64::MIN,
                last: i64::MAX,
            },
            base: Some(integer),
            constraint: Some(Constraint::Range {
                first: Bound::Int(1),
                last: Bound::Int(i64::MAX),
            }),
        })
    };
    let string = {
        let name = ctx.interner.intern_folded("string");
        ctx.types.add(TypeDescriptor {
            name,
            kind: TypeKind::Array {
                indexes: vec![positive],
                component: character,
                constrained: false,
            },
            base: None,
            constraint: None,
        })
    };
    let duration = {
        let name = ctx.interner.intern_folded("duration");
        ctx.types.add(TypeDescriptor {
            name,
            kind: TypeKind::Fixed {
                delta: DURATION_SMALL,
                small: DURATION_SMALL,
            },
            base: None,
            constraint: None,
        })
    };

    ctx.types.well_known.universal_integer = universal_integer;
    ctx.types.well_known.universal_real = universal_real;
    ctx.types.well_known.boolean = boolean;
    ctx.types.well_known.integer = integer;
    ctx.types.well_known.character = character;
    ctx.types.well_known.float = float;
    ctx.types.well_known.natural = natural;
    ctx.types.well_known.positive = positive;
    ctx.types.well_known.string = string;
    ctx.types.well_known.duration = duration;

    // type names
    for (text, ty) in [
        ("boolean", boolean),
        ("integer", integer),
        ("character", character),
        ("float", float),
        ("natural", natural),
        ("positive", positive),
        ("string", string),
        ("duration", duration),
    ] {
        let name = ctx.interner.intern_folded(text);
        ctx.symbols.declare(SymbolEntry {
            name,
            kind: SymbolKind::Type,
            ty,
            decl_span: Span::default(),
            mangled: String::new(),
            external: true,
            visibility: Visibility::Visible,
            scope: ctx.symbols.root(),
        });
    }

    // boolean literals
    for (text, position) in [("false", 0i64), ("true", 1i64)] {
        let name = ctx.interner.intern_folded(text);
        ctx.symbols.declare(SymbolEntry {
            name,
            kind: SymbolKind::EnumLiteral { position },
            ty: boolean,
            decl_span: Span::default(),
            mangled: String::new(),
            external: true,
            visibility: Visibility::Visible,
            scope: ctx.symbols.root(),
        });
    }

    // predefined exceptions, identities agreed with the runtime
    for (text, identity) in [
        ("constraint_error", 1i64),
        ("numeric_error", 2),
        ("program_error", 3),
        ("storage_error", 4),
        ("tasking_error", 5),
    ] {
        let name = ctx.interner.intern_folded(text);
        ctx.symbols.declare(SymbolEntry {
            name,
            kind: SymbolKind::Exception { identity },
            ty: TypeId::INVALID,
            decl_span: Span::default(),
            mangled: String::new(),
            external: true,
            visibility: Visibility::Visible,
            scope: ctx.symbols.root(),
        });
    }

    install_text_io(ctx, integer, string);
}

/// The TEXT_IO subset the runtime implements. Its subprograms are
/// external: calls lower directly to the runtime ABI names and take
/// no static link.
fn install_text_io(ctx: &mut CompilerContext, integer: TypeId, string: TypeId) {
    use shared_context::symbols::ScopeKind;

    let package_scope = ctx.symbols.open_scope(ScopeKind::Package);

    let item = ctx.interner.intern_folded("item");
    let declare = |ctx: &mut CompilerContext,
                   text: &str,
                   params: Vec<Param>,
                   abi: &str| {
        let name = ctx.interner.intern_folded(text);
        ctx.symbols.declare(SymbolEntry {
            name,
            kind: SymbolKind::Subprogram {
                signature: Signature {
                    params,
                    result: None,
                },
            },
            ty: TypeId::INVALID,
            decl_span: Span::default(),
            mangled: abi.to_string(),
            external: true,
            visibility: Visibility::Visible,
            scope: package_scope,
        });
    };

    declare(
        ctx,
        "put",
        vec![Param {
            name: item,
            mode: Mode::In,
            ty: string,
            has_default: false,
        }],
        "__ada_rt_put",
    );
    declare(
        ctx,
        "put",
        vec![Param {
            name: item,
            mode: Mode::In,
            ty: integer,
            has_default: false,
        }],
        "__ada_rt_put_int",
    );
    declare(
        ctx,
        "put_line",
        vec![Param {
            name: item,
            mode: Mode::In,
            ty: string,
            has_default: false,
        }],
        "__ada_rt_put_line",
    );
    declare(ctx, "new_line", Vec::new(), "__ada_rt_new_line");
    declare(
        ctx,
        "get",
        vec![Param {
            name: item,
            mode: Mode::Out,
            ty: integer,
            has_default: false,
        }],
        "__ada_rt_get_int",
    );

    ctx.symbols.close_scope();

    // bind the package name and register the intrinsic library unit
    let text_io = ctx.interner.intern_folded("text_io");
    ctx.symbols.declare(SymbolEntry {
        name: text_io,
        kind: SymbolKind::Package {
            scope: package_scope,
        },
        ty: TypeId::INVALID,
        decl_span: Span::default(),
        mangled: String::new(),
        external: true,
        visibility: Visibility::Visible,
        scope: ctx.symbols.root(),
    });

    let unit = ctx.units.intern(text_io, UnitKind::Package);
    let entry = ctx.units.get_mut(unit);
    entry.scope = Some(package_scope);
    entry.intrinsic = true;
}
