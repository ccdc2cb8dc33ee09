// The declaration half of the analyzer: compilation units, object
// and type declarations, subprograms, packages, tasks, generics, and
// pragma handling. Expression and statement checking live in their
// own modules; everything shares the `Analyzer` value defined here.

use crate::library;
use crate::semantic_error::{ErrorType, SemanticErr};
use crate::static_eval;
use crate::{GenericEntry, Session};
use parser::ast::*;
use shared_context::interner::Symbol;
use shared_context::source_map::SourceMap;
use shared_context::suppress::{Check, SuppressStack};
use shared_context::symbols::{
    Param, ScopeId, ScopeKind, Signature, SymbolEntry, SymbolId, SymbolKind, Visibility,
};
use shared_context::types::{
    Component, Constraint, TypeDescriptor, TypeId, TypeKind, TypeTable, VariantArm, VariantPart,
};
use shared_context::units::{ElabState, UnitId, UnitKind};
use shared_context::{CompilerContext, Ident, Span};

/// Walks one compilation unit's tree in place, resolving names,
/// filling in type and symbol annotations, and reporting everything
/// a legal Ada program may not do.
pub struct Analyzer<'src, 'ctx, 'ses> {
    pub(crate) ctx: &'ctx mut CompilerContext<'src>,
    pub(crate) session: &'ses mut Session,
    pub(crate) source_map: SourceMap<'src>,
    pub(crate) suppress: SuppressStack,
    pub(crate) current_unit: Option<UnitId>,
    /// One entry per enclosing subprogram body: the function result
    /// type, or None for procedures.
    pub(crate) return_stack: Vec<Option<TypeId>>,
    /// Enclosing loop names (None for unnamed loops), innermost last.
    pub(crate) loop_stack: Vec<Option<Symbol>>,
    /// Enclosing exception handler count; a bare `raise` needs one.
    pub(crate) handler_depth: usize,
    /// Entry scopes of enclosing task bodies, for accept statements.
    pub(crate) task_scopes: Vec<ScopeId>,
    /// Dotted prefix for mangled external names.
    pub(crate) mangle_prefix: String,
}

impl<'src, 'ctx, 'ses> Analyzer<'src, 'ctx, 'ses> {
    pub fn new(
        ctx: &'ctx mut CompilerContext<'src>,
        session: &'ses mut Session,
        file_name: &'src str,
        source: &'src str,
    ) -> Self {
        let suppress = SuppressStack::new(session.initial_suppress);
        Self {
            ctx,
            session,
            source_map: SourceMap::new(file_name, source),
            suppress,
            current_unit: None,
            return_stack: Vec::new(),
            loop_stack: Vec::new(),
            handler_depth: 0,
            task_scopes: Vec::new(),
            mangle_prefix: String::new(),
        }
    }

    pub(crate) fn report(&mut self, err: ErrorType) {
        let formatted = SemanticErr::new(err, &self.source_map, &self.ctx.interner, &self.ctx.types);
        self.ctx
            .diagnostics
            .report(formatted.category(), formatted.into_message());
    }

    /// External name for an entity declared under the current prefix.
    pub(crate) fn mangled(&self, name: Symbol) -> String {
        let text = self.ctx.interner.lookup(name);
        if self.mangle_prefix.is_empty() {
            text.to_string()
        } else {
            format!("{}__{}", self.mangle_prefix, text)
        }
    }

    // ------------------------------------------------------------------
    // compilation units
    // ------------------------------------------------------------------

    /// Analyze one compilation unit. Returns the unit's registry id;
    /// the error count in the context decides whether it may lower.
    pub fn analyze_compilation_unit(&mut self, unit: &mut CompilationUnit) -> UnitId {
        let name = unit.item.name();
        let kind = match unit.item {
            LibraryItem::Subprogram(_) => UnitKind::Subprogram,
            _ => UnitKind::Package,
        };
        let unit_id = self.ctx.units.intern(name.symbol, kind);
        self.current_unit = Some(unit_id);

        // the unit's context scope holds its use-clause visibility
        self.ctx.symbols.open_scope(ScopeKind::Block);

        for clause in &unit.context {
            match clause {
                ContextClause::With { names, span } => {
                    for with_name in names {
                        match library::ensure_loaded(
                            self.ctx,
                            self.session,
                            with_name.symbol,
                            *span,
                        ) {
                            Ok(dep) => self.ctx.units.add_dep(unit_id, dep),
                            Err(err) => self.report(err),
                        }
                    }
                }
                ContextClause::Use { names, .. } => {
                    for use_name in names.clone() {
                        self.apply_use_clause(use_name);
                    }
                }
            }
        }

        let exported_scope = match &mut unit.item {
            LibraryItem::Subprogram(body) => {
                self.analyze_subprogram_body(body);
                self.export_unit_symbol(body.spec.sym);
                body.scope
            }
            LibraryItem::PackageSpec(spec) => {
                self.analyze_package_spec(spec);
                self.export_unit_symbol(spec.sym);
                self.package_scope_of(spec.sym)
            }
            LibraryItem::PackageBody(body) => {
                self.analyze_library_package_body(body, unit_id);
                self.package_scope_of(body.sym)
            }
            LibraryItem::Generic(generic) => {
                self.analyze_generic_decl(generic);
                let template_name = match &generic.unit {
                    GenericUnit::Package(spec) => spec.name.symbol,
                    GenericUnit::Subprogram(spec) => spec.name.symbol,
                };
                let sym = self.generic_symbol_named(template_name);
                self.export_unit_symbol(sym);
                None
            }
            LibraryItem::Instance(_) => {
                let taken = std::mem::replace(
                    &mut unit.item,
                    LibraryItem::PackageSpec(empty_package_spec(name)),
                );
                let LibraryItem::Instance(mut instance) = taken else {
                    unreachable!("instance arm entered with a non-instance item");
                };
                let scope = match self.instantiate_package(&mut instance) {
                    Some((spec, body)) => {
                        let scope = self.package_scope_of(spec.sym);
                        unit.item = LibraryItem::PackageSpec(spec);
                        // the instantiated body is spliced behind the
                        // spec for code generation
                        if let Some(body) = body {
                            if let LibraryItem::PackageSpec(spec) = &mut unit.item {
                                spec.private
                                    .push(Declaration::PackageBody(Box::new(body)));
                            }
                        }
                        scope
                    }
                    None => None,
                };
                scope
            }
        };

        self.ctx.symbols.close_scope();

        let entry = self.ctx.units.get_mut(unit_id);
        entry.scope = exported_scope;
        entry.state = ElabState::Elaborated;
        unit_id
    }

    fn package_scope_of(&self, sym: Option<SymbolId>) -> Option<ScopeId> {
        sym.and_then(|sym| match self.ctx.symbols.get(sym).kind {
            SymbolKind::Package { scope } => Some(scope),
            _ => None,
        })
    }

    /// Re-declare a library unit's defining symbol at the root scope,
    /// where other units' name lookups can reach it. The unit's own
    /// references keep using the context-scope entry.
    fn export_unit_symbol(&mut self, sym: Option<SymbolId>) {
        let Some(sym) = sym else { return };
        let root = self.ctx.symbols.root();
        // already exported (a reloaded or predefined unit)
        let entry = self.ctx.symbols.get(sym).clone();
        let existing = self.ctx.symbols.lookup_in(root, entry.name);
        if existing
            .iter()
            .any(|&found| self.ctx.symbols.get(found).mangled == entry.mangled)
        {
            return;
        }
        let exported = self.ctx.symbols.declare_in(root, entry);
        // generic templates stay reachable through the exported id
        if let Some(template) = self.session.generics.get(&sym).cloned() {
            self.session.generics.insert(exported, template);
        }
        if let Some(defaults) = self.session.param_defaults.get(&sym).cloned() {
            self.session.param_defaults.insert(exported, defaults);
        }
    }

    fn apply_use_clause(&mut self, name: Ident) {
        let found = self.ctx.symbols.lookup(name.symbol);
        let package_scope = found.iter().find_map(|&sym| {
            match self.ctx.symbols.get(sym).kind {
                SymbolKind::Package { scope } => Some(scope),
                _ => None,
            }
        });
        match package_scope {
            Some(scope) => self.ctx.symbols.add_use(scope),
            None => self.report(ErrorType::UndeclaredIdentifier {
                name: name.symbol,
                span: name.span,
            }),
        }
    }

    // ------------------------------------------------------------------
    // declarative parts
    // ------------------------------------------------------------------

    /// Analyze a declarative part in order; declaration order is the
    /// elaboration order inside a unit. Generic instantiations may
    /// splice a body declaration after themselves.
    pub(crate) fn analyze_declarations(&mut self, decls: &mut Vec<Declaration>) {
        let mut index = 0;
        while index < decls.len() {
            if let Some(extra) = self.analyze_declaration_spliced(&mut decls[index]) {
                decls.insert(index + 1, extra);
            }
            index += 1;
        }
    }

    fn analyze_declaration_spliced(&mut self, decl: &mut Declaration) -> Option<Declaration> {
        if let Declaration::GenericInstance(instance) = decl {
            let mut taken = instance.clone();
            if taken.is_package {
                match self.instantiate_package(&mut taken) {
                    Some((spec, body)) => {
                        *decl = Declaration::Package(Box::new(spec));
                        return body.map(|b| Declaration::PackageBody(Box::new(b)));
                    }
                    None => {
                        *decl = Declaration::Null;
                        return None;
                    }
                }
            }
            match self.instantiate_subprogram(&mut taken) {
                Some(body) => *decl = Declaration::Subprogram(Box::new(body)),
                None => *decl = Declaration::Null,
            }
            return None;
        }
        self.analyze_declaration(decl);
        None
    }

    pub(crate) fn analyze_declaration(&mut self, decl: &mut Declaration) {
        match decl {
            Declaration::Null => {}
            Declaration::Object(object) => self.analyze_object_decl(object),
            Declaration::Number(number) => self.analyze_number_decl(number),
            Declaration::Type(type_decl) => self.analyze_type_decl(type_decl),
            Declaration::Subtype(subtype) => self.analyze_subtype_decl(subtype),
            Declaration::SubprogramSpec(spec) => {
                self.analyze_subprogram_spec_decl(spec);
            }
            Declaration::Subprogram(body) => {
                if self.stash_generic_subprogram_body(body) {
                    *decl = Declaration::Null;
                    return;
                }
                self.analyze_subprogram_body(body);
            }
            Declaration::Package(spec) => self.analyze_package_spec(spec),
            Declaration::PackageBody(body) => {
                if self.stash_generic_package_body(body) {
                    *decl = Declaration::Null;
                    return;
                }
                self.analyze_nested_package_body(body);
            }
            Declaration::Exception(exception) => self.analyze_exception_decl(exception),
            Declaration::UseClause { names, .. } => {
                for name in names.clone() {
                    self.apply_use_clause(name);
                }
            }
            Declaration::Pragma(pragma) => self.analyze_pragma(pragma),
            Declaration::Task(task) => self.analyze_task_decl(task),
            Declaration::TaskBody(body) => self.analyze_task_body(body),
            Declaration::Generic(generic) => self.analyze_generic_decl(generic),
            Declaration::GenericInstance(_) => {
                // handled by analyze_declaration_spliced
            }
        }
    }

    // ------------------------------------------------------------------
    // objects, numbers, exceptions
    // ------------------------------------------------------------------

    fn analyze_object_decl(&mut self, object: &mut ObjectDecl) {
        let ty = match &mut object.subtype {
            ObjectSubtype::Indication(indication) => self.resolve_subtype_indication(indication),
            ObjectSubtype::ArrayDef(def) => {
                let anonymous = Ident::new(self.ctx.interner.intern_folded(""), object.span);
                self.build_array_type(anonymous, def)
            }
        };

        if let Some(init) = &mut object.init {
            let found = self.analyze_expr(init, Some(ty));
            if !self.ctx.types.compatible(ty, found) {
                self.report(ErrorType::TypeMismatch {
                    expected: ty,
                    found,
                    span: init.span,
                });
            } else {
                self.check_static_fit(init, ty);
            }
        }

        for name in object.names.clone() {
            self.check_homograph(name);
            let mangled = self.mangled(name.symbol);
            let sym = self.ctx.symbols.declare(SymbolEntry {
                name: name.symbol,
                kind: if object.constant {
                    SymbolKind::Constant
                } else {
                    SymbolKind::Object { mode: None }
                },
                ty,
                decl_span: name.span,
                mangled,
                external: false,
                visibility: Visibility::Visible,
                scope: self.ctx.symbols.current(),
            });
            object.syms.push(sym);
        }
    }

    /// A static initial value outside its subtype's static bounds is
    /// rejected at compile time.
    pub(crate) fn check_static_fit(&mut self, init: &Expression, ty: TypeId) {
        let Some(value) = static_eval::eval_int(init, self.ctx) else {
            return;
        };
        let Some((first, last)) = self.ctx.types.discrete_bounds(ty) else {
            return;
        };
        if value < first || value > last {
            self.report(ErrorType::ConstraintViolation {
                message: format!("value {value} is outside the range {first} .. {last}"),
                span: init.span,
            });
        }
    }

    fn analyze_number_decl(&mut self, number: &mut NumberDecl) {
        let found = self.analyze_expr(&mut number.value, None);
        let value = static_eval::eval(&number.value, self.ctx);
        if value.is_none() {
            self.report(ErrorType::NotStatic {
                span: number.value.span,
            });
        }

        let ty = if self.ctx.types.is_float(found) {
            self.ctx.types.well_known.universal_real
        } else {
            self.ctx.types.well_known.universal_integer
        };

        for name in number.names.clone() {
            self.check_homograph(name);
            let sym = self.ctx.symbols.declare(SymbolEntry {
                name: name.symbol,
                kind: SymbolKind::Constant,
                ty,
                decl_span: name.span,
                mangled: String::new(),
                external: false,
                visibility: Visibility::Visible,
                scope: self.ctx.symbols.current(),
            });
            number.syms.push(sym);
            if let Some(value) = &value {
                self.session.static_numbers.insert(sym, value.clone());
            }
        }
    }

    fn analyze_exception_decl(&mut self, exception: &mut ExceptionDecl) {
        for name in exception.names.clone() {
            self.check_homograph(name);
            let identity = self.ctx.next_exception_identity;
            self.ctx.next_exception_identity += 1;
            let mangled = self.mangled(name.symbol);
            let sym = self.ctx.symbols.declare(SymbolEntry {
                name: name.symbol,
                kind: SymbolKind::Exception { identity },
                ty: TypeId::INVALID,
                decl_span: name.span,
                mangled,
                external: false,
                visibility: Visibility::Visible,
                scope: self.ctx.symbols.current(),
            });
            exception.syms.push(sym);
        }
    }

    /// Report a plain redeclaration in the current scope; overloadable
    /// kinds are checked separately against their signatures.
    fn check_homograph(&mut self, name: Ident) {
        let current = self.ctx.symbols.current();
        let existing = self.ctx.symbols.lookup_in(current, name.symbol);
        if let Some(&first) = existing.first() {
            let entry = self.ctx.symbols.get(first);
            if !entry.kind.is_overloadable() {
                let first_span = entry.decl_span;
                self.report(ErrorType::DeclaredTwice {
                    name: name.symbol,
                    first: first_span,
                    second: name.span,
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // type and subtype declarations
    // ------------------------------------------------------------------

    fn analyze_type_decl(&mut self, type_decl: &mut TypeDecl) {
        let name = type_decl.name;

        // completion of an earlier incomplete declaration reuses its id
        let incomplete = self.incomplete_type_named(name.symbol);
        if incomplete.is_none() {
            self.check_homograph(name);
        }

        let ty = match &mut type_decl.def {
            TypeDef::Range(range) => self.build_integer_type(name, range),
            TypeDef::Enumeration { literals } => {
                let literals = literals.clone();
                self.build_enumeration_type(name, &literals)
            }
            TypeDef::Float { digits, range: _ } => {
                let digits = self.analyze_static_int(digits).unwrap_or(6).clamp(1, 15) as u32;
                self.ctx.types.add(TypeDescriptor {
                    name: name.symbol,
                    kind: TypeKind::Float { digits },
                    base: None,
                    constraint: None,
                })
            }
            TypeDef::Fixed { delta, range: _ } => {
                let _ = self.analyze_expr(delta, None);
                let span = delta.span;
                let delta_value = match static_eval::eval_real(delta, self.ctx) {
                    Some(value) if value > 0.0 => value,
                    _ => {
                        self.report(ErrorType::NotStatic { span });
                        1.0
                    }
                };
                let small = TypeTable::fixed_small(delta_value);
                self.ctx.types.add(TypeDescriptor {
                    name: name.symbol,
                    kind: TypeKind::Fixed {
                        delta: delta_value,
                        small,
                    },
                    base: None,
                    constraint: None,
                })
            }
            TypeDef::Array { .. } => self.build_array_type(name, &mut type_decl.def),
            TypeDef::Record { .. } => {
                let discriminants = type_decl.discriminants.clone();
                self.build_record_type(name, &discriminants, &mut type_decl.def)
            }
            TypeDef::Access { designated } => {
                let designated_ty = self.resolve_subtype_indication(designated);
                self.ctx.types.add(TypeDescriptor {
                    name: name.symbol,
                    kind: TypeKind::Access {
                        designated: designated_ty,
                    },
                    base: None,
                    constraint: None,
                })
            }
            TypeDef::Derived { parent } => {
                let parent_ty = self.resolve_subtype_indication(parent);
                self.ctx.types.add(TypeDescriptor {
                    name: name.symbol,
                    kind: TypeKind::Derived { parent: parent_ty },
                    base: None,
                    constraint: None,
                })
            }
            TypeDef::Private { .. } => self.ctx.types.add(TypeDescriptor {
                name: name.symbol,
                kind: TypeKind::Incomplete,
                base: None,
                constraint: None,
            }),
        };

        type_decl.ty = ty;

        match incomplete {
            Some((_, old_ty)) if !matches!(type_decl.def, TypeDef::Private { .. }) => {
                // complete the earlier descriptor in place so access
                // types designating it see the full view
                let completed = self.ctx.types.get(ty).clone();
                *self.ctx.types.get_mut(old_ty) = completed;
                type_decl.ty = old_ty;
            }
            Some(_) => {}
            None => {
                let mangled = self.mangled(name.symbol);
                self.ctx.symbols.declare(SymbolEntry {
                    name: name.symbol,
                    kind: SymbolKind::Type,
                    ty: type_decl.ty,
                    decl_span: name.span,
                    mangled,
                    external: false,
                    visibility: Visibility::Visible,
                    scope: self.ctx.symbols.current(),
                });
            }
        }
    }

    fn incomplete_type_named(&self, name: Symbol) -> Option<(SymbolId, TypeId)> {
        let current = self.ctx.symbols.current();
        for sym in self.ctx.symbols.lookup_in(current, name) {
            let entry = self.ctx.symbols.get(sym);
            if matches!(entry.kind, SymbolKind::Type)
                && entry.ty.is_valid()
                && matches!(self.ctx.types.get(entry.ty).kind, TypeKind::Incomplete)
            {
                return Some((sym, entry.ty));
            }
        }
        None
    }

    fn build_integer_type(&mut self, name: Ident, range: &mut RangeExpr) -> TypeId {
        let first = self.analyze_static_int(&mut range.low);
        let last = self.analyze_static_int(&mut range.high);
        let (first, last) = match (first, last) {
            (Some(first), Some(last)) => (first, last),
            _ => (0, 0),
        };
        self.ctx.types.add(TypeDescriptor {
            name: name.symbol,
            kind: TypeKind::Integer { first, last },
            base: None,
            constraint: None,
        })
    }

    fn build_enumeration_type(&mut self, name: Ident, literals: &[EnumLiteral]) -> TypeId {
        let symbols: Vec<_> = literals.iter().map(|lit| lit.name.symbol).collect();
        let ty = self.ctx.types.add(TypeDescriptor {
            name: name.symbol,
            kind: TypeKind::Enumeration { literals: symbols },
            base: None,
            constraint: None,
        });

        for (position, literal) in literals.iter().enumerate() {
            self.ctx.symbols.declare(SymbolEntry {
                name: literal.name.symbol,
                kind: SymbolKind::EnumLiteral {
                    position: position as i64,
                },
                ty,
                decl_span: literal.name.span,
                mangled: String::new(),
                external: false,
                visibility: Visibility::Visible,
                scope: self.ctx.symbols.current(),
            });
        }
        ty
    }

    /// Build an array type from its definition; also used for the
    /// anonymous array of an object declaration.
    pub(crate) fn build_array_type(&mut self, name: Ident, def: &mut TypeDef) -> TypeId {
        let TypeDef::Array {
            indexes,
            unconstrained,
            component,
        } = def
        else {
            return TypeId::INVALID;
        };
        let unconstrained = *unconstrained;

        let mut index_types = Vec::new();
        let mut static_ranges = Vec::new();
        let mut resolved_indexes = std::mem::take(indexes);
        for index in resolved_indexes.iter_mut() {
            let ty = self.resolve_discrete_range(index);
            index_types.push(ty);
            if let Some(range) = &index.range {
                if let (Some(low), Some(high)) = (
                    static_eval::eval_int(&range.low, self.ctx),
                    static_eval::eval_int(&range.high, self.ctx),
                ) {
                    static_ranges.push((low, high));
                }
            } else if let Some(bounds) = self.ctx.types.discrete_bounds(ty) {
                static_ranges.push(bounds);
            }
        }

        let mut component_taken = component.clone();
        let component_ty = self.resolve_subtype_indication(&mut component_taken);

        let constraint = if !unconstrained && static_ranges.len() == index_types.len() {
            Some(Constraint::Index {
                ranges: static_ranges,
            })
        } else {
            None
        };

        let ty = self.ctx.types.add(TypeDescriptor {
            name: name.symbol,
            kind: TypeKind::Array {
                indexes: index_types,
                component: component_ty,
                constrained: !unconstrained,
            },
            base: None,
            constraint,
        });

        if let TypeDef::Array {
            indexes, component, ..
        } = def
        {
            *indexes = resolved_indexes;
            *component = component_taken;
        }
        ty
    }

    fn build_record_type(
        &mut self,
        name: Ident,
        discriminant_specs: &[DiscriminantSpec],
        def: &mut TypeDef,
    ) -> TypeId {
        let TypeDef::Record {
            components,
            variant,
        } = def
        else {
            return TypeId::INVALID;
        };
        let mut components_taken = std::mem::take(components);
        let mut variant_taken = variant.take();

        let mut discriminants = Vec::new();
        for spec in discriminant_specs {
            let mut mark = spec.mark.clone();
            let ty = self.resolve_type_mark(&mut mark);
            let default = spec.default.clone().and_then(|mut expr| {
                let _ = self.analyze_expr(&mut expr, Some(ty));
                static_eval::eval_int(&expr, self.ctx)
            });
            for decl_name in &spec.names {
                discriminants.push(Component {
                    name: decl_name.symbol,
                    ty,
                    default,
                });
            }
        }

        let mut fixed = Vec::new();
        for component in components_taken.iter_mut() {
            let ty = self.resolve_subtype_indication(&mut component.subtype);
            let default = component.init.as_mut().and_then(|init| {
                let _ = self.analyze_expr(init, Some(ty));
                static_eval::eval_int(init, self.ctx)
            });
            for decl_name in &component.names {
                fixed.push(Component {
                    name: decl_name.symbol,
                    ty,
                    default,
                });
            }
        }

        let variant_part = variant_taken.as_mut().map(|part| {
            let discriminant = part.discriminant.symbol;
            let disc_ty = discriminants
                .iter()
                .find(|d| d.name == discriminant)
                .map(|d| d.ty)
                .unwrap_or(TypeId::INVALID);
            if !disc_ty.is_valid() {
                self.report(ErrorType::UnknownField {
                    name: discriminant,
                    span: part.discriminant.span,
                });
            }

            let mut arms = Vec::new();
            for arm in part.arms.iter_mut() {
                let mut choices = Vec::new();
                let mut is_others = false;
                for choice in arm.choices.iter_mut() {
                    match self.analyze_choice(choice, disc_ty) {
                        Some(range) => choices.push(range),
                        None => is_others |= matches!(choice.kind, ChoiceKind::Others),
                    }
                }

                let mut arm_components = Vec::new();
                for component in arm.components.iter_mut() {
                    let ty = self.resolve_subtype_indication(&mut component.subtype);
                    for decl_name in &component.names {
                        arm_components.push(Component {
                            name: decl_name.symbol,
                            ty,
                            default: None,
                        });
                    }
                }
                arms.push(VariantArm {
                    choices,
                    is_others,
                    components: arm_components,
                });
            }
            VariantPart {
                discriminant,
                arms,
            }
        });

        let ty = self.ctx.types.add(TypeDescriptor {
            name: name.symbol,
            kind: TypeKind::Record {
                discriminants,
                components: fixed,
                variant: variant_part,
            },
            base: None,
            constraint: None,
        });

        if let TypeDef::Record {
            components,
            variant,
        } = def
        {
            *components = components_taken;
            *variant = variant_taken;
        }
        ty
    }

    /// Analyze a case/variant/aggregate choice and return its static
    /// range; fills the node's value annotation. `None` for others.
    pub(crate) fn analyze_choice(
        &mut self,
        choice: &mut ChoiceNode,
        expected: TypeId,
    ) -> Option<(i64, i64)> {
        let range = match &mut choice.kind {
            ChoiceKind::Others => None,
            ChoiceKind::Expr(expr) => {
                let _ = self.analyze_expr(expr, Some(expected));
                let span = expr.span;
                match static_eval::eval_int(expr, self.ctx) {
                    Some(value) => Some((value, value)),
                    None => {
                        self.report(ErrorType::NotStatic { span });
                        None
                    }
                }
            }
            ChoiceKind::Range(range) => {
                let _ = self.analyze_expr(&mut range.low, Some(expected));
                let _ = self.analyze_expr(&mut range.high, Some(expected));
                let span = range.span;
                match (
                    static_eval::eval_int(&range.low, self.ctx),
                    static_eval::eval_int(&range.high, self.ctx),
                ) {
                    (Some(low), Some(high)) => Some((low, high)),
                    _ => {
                        self.report(ErrorType::NotStatic { span });
                        None
                    }
                }
            }
        };
        choice.value = range;
        range
    }

    fn analyze_subtype_decl(&mut self, subtype: &mut SubtypeDecl) {
        self.check_homograph(subtype.name);
        let ty = self.resolve_subtype_indication(&mut subtype.subtype);

        // name the anonymous constrained view after the subtype
        let empty = self.ctx.interner.intern_folded("");
        if ty.is_valid() && self.ctx.types.get(ty).name == empty {
            self.ctx.types.get_mut(ty).name = subtype.name.symbol;
        }

        subtype.ty = ty;
        self.ctx.symbols.declare(SymbolEntry {
            name: subtype.name.symbol,
            kind: SymbolKind::Subtype,
            ty,
            decl_span: subtype.name.span,
            mangled: String::new(),
            external: false,
            visibility: Visibility::Visible,
            scope: self.ctx.symbols.current(),
        });
    }

    pub(crate) fn analyze_static_int(&mut self, expr: &mut Expression) -> Option<i64> {
        let _ = self.analyze_expr(expr, None);
        let span = expr.span;
        match static_eval::eval_int(expr, self.ctx) {
            Some(value) => Some(value),
            None => {
                self.report(ErrorType::NotStatic { span });
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // subprograms
    // ------------------------------------------------------------------

    /// Build the signature of a spec: parameter types, modes, default
    /// flags, result type.
    fn build_signature(&mut self, spec: &mut SubprogramSpec) -> Signature {
        let mut params = Vec::new();
        for param in spec.params.iter_mut() {
            let ty = self.resolve_type_mark(&mut param.mark);
            if let Some(default) = &mut param.default {
                let found = self.analyze_expr(default, Some(ty));
                let span = default.span;
                if !self.ctx.types.compatible(ty, found) {
                    self.report(ErrorType::TypeMismatch {
                        expected: ty,
                        found,
                        span,
                    });
                }
            }
            for name in &param.names {
                params.push(Param {
                    name: name.symbol,
                    mode: param.mode,
                    ty,
                    has_default: param.default.is_some(),
                });
            }
        }

        let result = spec
            .result
            .as_mut()
            .map(|mark| self.resolve_type_mark(mark));

        Signature { params, result }
    }

    /// Record the flattened default expressions of a spec for call
    /// normalization.
    fn record_param_defaults(&mut self, sym: SymbolId, spec: &SubprogramSpec) {
        let mut defaults = Vec::new();
        for param in &spec.params {
            for name in &param.names {
                defaults.push((name.symbol, param.default.clone()));
            }
        }
        self.session.param_defaults.insert(sym, defaults);
    }

    pub(crate) fn analyze_subprogram_spec_decl(&mut self, spec: &mut SubprogramSpec) -> SymbolId {
        let signature = self.build_signature(spec);
        let mangled = self.mangled(spec.name.symbol);

        let sym = self.ctx.symbols.declare(SymbolEntry {
            name: spec.name.symbol,
            kind: SymbolKind::Subprogram { signature },
            ty: TypeId::INVALID,
            decl_span: spec.name.span,
            mangled,
            external: false,
            visibility: Visibility::Visible,
            scope: self.ctx.symbols.current(),
        });
        spec.sym = Some(sym);
        self.record_param_defaults(sym, spec);
        sym
    }

    /// Find the spec a body completes: same name, same arity and
    /// parameter base types, in the current scope or the enclosing
    /// package spec scope.
    fn find_completion_target(&self, name: Symbol, signature: &Signature) -> Option<SymbolId> {
        let current = self.ctx.symbols.current();
        let mut scopes = vec![current];
        if let Some(parent) = self.ctx.symbols.scope(current).parent {
            if self.ctx.symbols.scope(parent).kind == ScopeKind::Package {
                scopes.push(parent);
            }
        }

        for scope in scopes {
            for sym in self.ctx.symbols.lookup_in(scope, name) {
                let entry = self.ctx.symbols.get(sym);
                if entry.external {
                    continue;
                }
                if let SymbolKind::Subprogram { signature: existing } = &entry.kind {
                    let same_params = existing.params.len() == signature.params.len()
                        && existing.params.iter().zip(signature.params.iter()).all(
                            |(a, b)| {
                                self.ctx.types.base_of(a.ty) == self.ctx.types.base_of(b.ty)
                            },
                        );
                    let same_result = match (existing.result, signature.result) {
                        (None, None) => true,
                        (Some(a), Some(b)) => {
                            self.ctx.types.base_of(a) == self.ctx.types.base_of(b)
                        }
                        _ => false,
                    };
                    if same_params && same_result {
                        return Some(sym);
                    }
                }
            }
        }
        None
    }

    pub(crate) fn analyze_subprogram_body(&mut self, body: &mut SubprogramBody) {
        let signature = self.build_signature(&mut body.spec);

        let sym = match self.find_completion_target(body.spec.name.symbol, &signature) {
            Some(sym) => sym,
            None => {
                let mangled = self.mangled(body.spec.name.symbol);
                let sym = self.ctx.symbols.declare(SymbolEntry {
                    name: body.spec.name.symbol,
                    kind: SymbolKind::Subprogram {
                        signature: signature.clone(),
                    },
                    ty: TypeId::INVALID,
                    decl_span: body.spec.name.span,
                    mangled,
                    external: false,
                    visibility: Visibility::Visible,
                    scope: self.ctx.symbols.current(),
                });
                self.record_param_defaults(sym, &body.spec);
                sym
            }
        };
        body.spec.sym = Some(sym);

        let saved_prefix = std::mem::replace(
            &mut self.mangle_prefix,
            self.ctx.symbols.get(sym).mangled.clone(),
        );

        let scope = self.ctx.symbols.open_scope(ScopeKind::Subprogram);
        body.scope = Some(scope);
        self.suppress.enter_region();
        self.declare_pending_aliases();

        // formal parameters become objects of the body scope
        for param in body.spec.params.iter_mut() {
            let ty = param.mark.ty;
            param.syms.clear();
            for name in &param.names {
                let declared = self.ctx.symbols.declare(SymbolEntry {
                    name: name.symbol,
                    kind: SymbolKind::Object {
                        mode: Some(param.mode),
                    },
                    ty,
                    decl_span: name.span,
                    mangled: String::new(),
                    external: false,
                    visibility: Visibility::Visible,
                    scope,
                });
                param.syms.push(declared);
            }
        }

        self.return_stack.push(signature.result);
        self.analyze_declarations(&mut body.decls);
        self.analyze_statements(&mut body.statements);
        self.analyze_handlers(&mut body.handlers);
        self.return_stack.pop();

        body.suppress = self.suppress.active();
        self.suppress.leave_region();
        self.ctx.symbols.close_scope();
        self.mangle_prefix = saved_prefix;
    }

    // ------------------------------------------------------------------
    // packages
    // ------------------------------------------------------------------

    pub(crate) fn analyze_package_spec(&mut self, spec: &mut PackageSpec) {
        self.check_homograph(spec.name);

        let scope = self.ctx.symbols.open_scope(ScopeKind::Package);
        self.ctx.symbols.close_scope();
        let mangled = self.mangled(spec.name.symbol);
        let sym = self.ctx.symbols.declare(SymbolEntry {
            name: spec.name.symbol,
            kind: SymbolKind::Package { scope },
            ty: TypeId::INVALID,
            decl_span: spec.name.span,
            mangled,
            external: false,
            visibility: Visibility::Visible,
            scope: self.ctx.symbols.current(),
        });
        spec.sym = Some(sym);

        let saved_prefix = std::mem::replace(
            &mut self.mangle_prefix,
            self.ctx.symbols.get(sym).mangled.clone(),
        );
        self.ctx.symbols.reopen_scope(scope);
        self.suppress.enter_region();
        self.declare_pending_aliases();

        self.analyze_declarations(&mut spec.visible);
        self.analyze_declarations(&mut spec.private);

        self.suppress.leave_region();
        self.ctx.symbols.close_scope();
        self.mangle_prefix = saved_prefix;
    }

    pub(crate) fn analyze_nested_package_body(&mut self, body: &mut PackageBody) {
        let found = self.ctx.symbols.lookup(body.name.symbol);
        let package = found.iter().find_map(|&sym| {
            match self.ctx.symbols.get(sym).kind {
                SymbolKind::Package { scope } => Some((sym, scope)),
                _ => None,
            }
        });

        let Some((sym, spec_scope)) = package else {
            self.report(ErrorType::UndeclaredIdentifier {
                name: body.name.symbol,
                span: body.name.span,
            });
            return;
        };
        body.sym = Some(sym);

        let saved_prefix = std::mem::replace(
            &mut self.mangle_prefix,
            self.ctx.symbols.get(sym).mangled.clone(),
        );

        // body declarations live in a child of the spec scope, so
        // clients of the package never see them
        self.ctx.symbols.reopen_scope(spec_scope);
        self.ctx.symbols.open_scope(ScopeKind::Package);
        self.suppress.enter_region();

        self.analyze_declarations(&mut body.decls);
        self.analyze_statements(&mut body.statements);
        self.analyze_handlers(&mut body.handlers);

        body.suppress = self.suppress.active();
        self.suppress.leave_region();
        self.ctx.symbols.close_scope();
        self.ctx.symbols.close_scope();
        self.mangle_prefix = saved_prefix;
    }

    /// A library-level package body: its spec is a separate unit that
    /// must load first.
    fn analyze_library_package_body(&mut self, body: &mut PackageBody, unit_id: UnitId) {
        match library::ensure_loaded(self.ctx, self.session, body.name.symbol, body.span) {
            Ok(spec_unit) if spec_unit != unit_id => {
                self.ctx.units.add_dep(unit_id, spec_unit);
            }
            Ok(_) => {}
            Err(err) => self.report(err),
        }
        self.analyze_nested_package_body(body);
    }

    // ------------------------------------------------------------------
    // tasks
    // ------------------------------------------------------------------

    fn analyze_task_decl(&mut self, task: &mut TaskDecl) {
        self.check_homograph(task.name);

        let entry_scope = self.ctx.symbols.open_scope(ScopeKind::Task);

        let mut entry_names = Vec::new();
        for entry in task.entries.iter_mut() {
            let signature = self.build_signature(entry);
            let mangled = self.mangled(entry.name.symbol);
            let sym = self.ctx.symbols.declare(SymbolEntry {
                name: entry.name.symbol,
                kind: SymbolKind::Entry { signature },
                ty: TypeId::INVALID,
                decl_span: entry.name.span,
                mangled,
                external: false,
                visibility: Visibility::Visible,
                scope: entry_scope,
            });
            entry.sym = Some(sym);
            entry_names.push(entry.name.symbol);
        }
        self.ctx.symbols.close_scope();

        let ty = self.ctx.types.add(TypeDescriptor {
            name: task.name.symbol,
            kind: TypeKind::Task {
                entries: entry_names,
            },
            base: None,
            constraint: None,
        });
        task.ty = ty;
        self.session.task_scopes.insert(ty, entry_scope);

        let mangled = self.mangled(task.name.symbol);
        let declared = self.ctx.symbols.declare(SymbolEntry {
            name: task.name.symbol,
            kind: if task.is_type {
                SymbolKind::Type
            } else {
                // a single task is an object of an anonymous task type
                SymbolKind::Object { mode: None }
            },
            ty,
            decl_span: task.name.span,
            mangled,
            external: false,
            visibility: Visibility::Visible,
            scope: self.ctx.symbols.current(),
        });
        task.sym = Some(declared);
    }

    fn analyze_task_body(&mut self, body: &mut TaskBody) {
        // the body belongs to the task type or single task named here
        let found = self.ctx.symbols.lookup(body.name.symbol);
        let task_ty = found.iter().find_map(|&sym| {
            let entry = self.ctx.symbols.get(sym);
            if entry.ty.is_valid() && self.ctx.types.is_task(entry.ty) {
                Some(entry.ty)
            } else {
                None
            }
        });

        let Some(task_ty) = task_ty else {
            self.report(ErrorType::UndeclaredIdentifier {
                name: body.name.symbol,
                span: body.name.span,
            });
            return;
        };

        let entry_scope = self.session.task_scopes.get(&task_ty).copied();
        if let Some(scope) = entry_scope {
            self.task_scopes.push(scope);
        }

        let new_prefix = self.mangled(body.name.symbol);
        let saved_prefix = std::mem::replace(&mut self.mangle_prefix, new_prefix);
        self.ctx.symbols.open_scope(ScopeKind::Subprogram);
        self.suppress.enter_region();

        self.analyze_declarations(&mut body.decls);
        self.analyze_statements(&mut body.statements);
        self.analyze_handlers(&mut body.handlers);

        self.suppress.leave_region();
        self.ctx.symbols.close_scope();
        self.mangle_prefix = saved_prefix;

        if entry_scope.is_some() {
            self.task_scopes.pop();
        }
    }

    // ------------------------------------------------------------------
    // pragmas
    // ------------------------------------------------------------------

    fn analyze_pragma(&mut self, pragma: &mut PragmaDecl) {
        let name = self.ctx.interner.lookup(pragma.name.symbol);
        if name != "suppress" {
            // unrecognized pragmas are ignored, as the language requires
            return;
        }

        let Some(first) = pragma.args.first() else {
            self.report(ErrorType::Unsupported {
                message: "pragma SUPPRESS needs a check name".to_string(),
                span: pragma.span,
            });
            return;
        };

        let check_name = match &first.value.kind {
            ExprKind::Identifier(ident) => self.ctx.interner.lookup(ident.symbol).to_string(),
            _ => String::new(),
        };
        let span = first.span;

        match Check::from_name(&check_name) {
            Some(check) => self.suppress.suppress(check),
            None => self.report(ErrorType::Unsupported {
                message: format!("unknown check name '{check_name}' in pragma SUPPRESS"),
                span,
            }),
        }
    }

    // ------------------------------------------------------------------
    // generics
    // ------------------------------------------------------------------

    fn analyze_generic_decl(&mut self, generic: &mut GenericDecl) {
        let name = match &generic.unit {
            GenericUnit::Package(spec) => spec.name,
            GenericUnit::Subprogram(spec) => spec.name,
        };
        self.check_homograph(name);

        let mangled = self.mangled(name.symbol);
        let sym = self.ctx.symbols.declare(SymbolEntry {
            name: name.symbol,
            kind: SymbolKind::Generic,
            ty: TypeId::INVALID,
            decl_span: name.span,
            mangled,
            external: false,
            visibility: Visibility::Visible,
            scope: self.ctx.symbols.current(),
        });

        // the declaration itself only records the template; all
        // checking happens per instance against the actuals
        self.session.generics.insert(
            sym,
            GenericEntry {
                decl: generic.clone(),
                package_body: None,
                subprogram_body: None,
            },
        );
    }

    fn generic_symbol_named(&self, name: Symbol) -> Option<SymbolId> {
        let current = self.ctx.symbols.current();
        self.ctx
            .symbols
            .lookup_in(current, name)
            .into_iter()
            .find(|&sym| matches!(self.ctx.symbols.get(sym).kind, SymbolKind::Generic))
    }

    fn stash_generic_package_body(&mut self, body: &mut PackageBody) -> bool {
        let Some(sym) = self.generic_symbol_named(body.name.symbol) else {
            return false;
        };
        if let Some(entry) = self.session.generics.get_mut(&sym) {
            entry.package_body = Some(body.clone());
        }
        true
    }

    fn stash_generic_subprogram_body(&mut self, body: &mut SubprogramBody) -> bool {
        let Some(sym) = self.generic_symbol_named(body.spec.name.symbol) else {
            return false;
        };
        if let Some(entry) = self.session.generics.get_mut(&sym) {
            entry.subprogram_body = Some(body.clone());
        }
        true
    }

    /// Instantiate a generic package: declare the actuals under the
    /// formal names inside a fresh package scope, then re-analyze the
    /// template's declarations there. Returns the instance spec and
    /// its body, both ready for code generation.
    fn instantiate_package(
        &mut self,
        instance: &mut GenericInstance,
    ) -> Option<(PackageSpec, Option<PackageBody>)> {
        let entry = self.resolve_generic(&mut instance.generic)?;
        let GenericUnit::Package(template) = &entry.decl.unit else {
            self.report(ErrorType::Unsupported {
                message: "this generic does not declare a package".to_string(),
                span: instance.span,
            });
            return None;
        };

        let mut spec = template.clone();
        spec.name = instance.name;
        spec.sym = None;
        let mut body = entry.package_body.clone();
        if let Some(body) = body.as_mut() {
            body.name = instance.name;
            body.sym = None;
        }

        // prepend the formal bindings, then analyze as a plain package
        let bindings = self.bind_generic_formals(&entry.decl.formals, &instance.actuals)?;
        spec.visible.splice(0..0, bindings);

        self.analyze_package_spec(&mut spec);
        if let Some(body) = body.as_mut() {
            self.analyze_nested_package_body(body);
        }

        Some((spec, body))
    }

    /// Instantiate a generic subprogram into a plain body.
    fn instantiate_subprogram(&mut self, instance: &mut GenericInstance) -> Option<SubprogramBody> {
        let entry = self.resolve_generic(&mut instance.generic)?;
        let GenericUnit::Subprogram(_) = &entry.decl.unit else {
            self.report(ErrorType::Unsupported {
                message: "this generic does not declare a subprogram".to_string(),
                span: instance.span,
            });
            return None;
        };
        let Some(mut body) = entry.subprogram_body.clone() else {
            self.report(ErrorType::Unsupported {
                message: "generic subprogram has no body to instantiate".to_string(),
                span: instance.span,
            });
            return None;
        };
        body.spec.name = instance.name;
        body.spec.sym = None;
        body.scope = None;

        let bindings = self.bind_generic_formals(&entry.decl.formals, &instance.actuals)?;
        body.decls.splice(0..0, bindings);

        self.analyze_subprogram_body(&mut body);
        Some(body)
    }

    fn resolve_generic(&mut self, name: &mut Expression) -> Option<GenericEntry> {
        let span = name.span;
        let generic_sym = match &name.kind {
            ExprKind::Identifier(ident) => self
                .ctx
                .symbols
                .lookup(ident.symbol)
                .into_iter()
                .find(|&sym| matches!(self.ctx.symbols.get(sym).kind, SymbolKind::Generic)),
            _ => None,
        };
        let Some(sym) = generic_sym else {
            self.report(ErrorType::Unsupported {
                message: "this name does not denote a generic unit".to_string(),
                span,
            });
            return None;
        };
        name.sym = Some(sym);
        self.session.generics.get(&sym).cloned()
    }

    /// Turn the formal part plus the actuals into declarations that
    /// seed the instance scope: formal types become subtypes of the
    /// actual types, formal objects become initialized constants,
    /// formal subprograms become aliases of the resolved actuals.
    fn bind_generic_formals(
        &mut self,
        formals: &[GenericFormal],
        actuals: &[Argument],
    ) -> Option<Vec<Declaration>> {
        let mut bindings = Vec::new();
        let mut position = 0usize;

        for formal in formals {
            let formal_name = match formal {
                GenericFormal::Type { name, .. } => *name,
                GenericFormal::Object { names, .. } => names[0],
                GenericFormal::Subprogram { spec, .. } => spec.name,
            };

            // match an actual: by name, else next positional
            let actual = actuals
                .iter()
                .find(|arg| arg.name.map(|n| n.symbol) == Some(formal_name.symbol))
                .map(|arg| arg.value.clone())
                .or_else(|| {
                    let arg = actuals
                        .iter()
                        .filter(|arg| arg.name.is_none())
                        .nth(position)
                        .map(|arg| arg.value.clone());
                    if arg.is_some() {
                        position += 1;
                    }
                    arg
                });

            match formal {
                GenericFormal::Type { name, span, .. } => {
                    let Some(mark) = actual else {
                        self.report(ErrorType::WrongArgumentCount { span: *span });
                        return None;
                    };
                    bindings.push(Declaration::Subtype(SubtypeDecl {
                        name: *name,
                        subtype: SubtypeIndication {
                            span: mark.span,
                            mark: unresolved(mark),
                            constraint: None,
                            ty: TypeId::INVALID,
                        },
                        span: *span,
                        ty: TypeId::INVALID,
                    }));
                }
                GenericFormal::Object {
                    names,
                    mark,
                    default,
                    span,
                    ..
                } => {
                    let init = actual.or_else(|| default.clone());
                    let Some(init) = init else {
                        self.report(ErrorType::WrongArgumentCount { span: *span });
                        return None;
                    };
                    bindings.push(Declaration::Object(ObjectDecl {
                        names: names.clone(),
                        constant: true,
                        subtype: ObjectSubtype::Indication(SubtypeIndication {
                            span: mark.span,
                            mark: unresolved(mark.clone()),
                            constraint: None,
                            ty: TypeId::INVALID,
                        }),
                        init: Some(unresolved(init)),
                        span: *span,
                        syms: Vec::new(),
                    }));
                }
                GenericFormal::Subprogram { spec, span } => {
                    let Some(actual) = actual else {
                        self.report(ErrorType::WrongArgumentCount { span: *span });
                        return None;
                    };
                    self.bind_formal_subprogram(spec, actual, *span);
                }
            }
        }

        Some(bindings)
    }

    /// Resolve the actual behind a formal subprogram and queue an
    /// alias that the instance scope declares on open.
    fn bind_formal_subprogram(&mut self, spec: &SubprogramSpec, actual: Expression, span: Span) {
        let ExprKind::Identifier(actual_name) = actual.kind else {
            self.report(ErrorType::Unsupported {
                message: "a generic actual subprogram must be a simple name".to_string(),
                span,
            });
            return;
        };

        let candidates = self.ctx.symbols.lookup(actual_name.symbol);
        let target = candidates.into_iter().find(|&sym| {
            matches!(self.ctx.symbols.get(sym).kind, SymbolKind::Subprogram { .. })
        });
        let Some(target) = target else {
            self.report(ErrorType::UndeclaredIdentifier {
                name: actual_name.symbol,
                span: actual_name.span,
            });
            return;
        };

        let entry = self.ctx.symbols.get(target).clone();
        if let SymbolKind::Subprogram { signature } = entry.kind {
            self.session.pending_aliases.push(PendingAlias {
                name: spec.name.symbol,
                signature,
                mangled: entry.mangled,
                external: entry.external,
            });
        }
    }

    /// Declare queued formal-subprogram aliases into the scope that
    /// just opened.
    fn declare_pending_aliases(&mut self) {
        let pending = std::mem::take(&mut self.session.pending_aliases);
        for alias in pending {
            self.ctx.symbols.declare(SymbolEntry {
                name: alias.name,
                kind: SymbolKind::Subprogram {
                    signature: alias.signature,
                },
                ty: TypeId::INVALID,
                decl_span: Span::default(),
                mangled: alias.mangled,
                external: alias.external,
                visibility: Visibility::Visible,
                scope: self.ctx.symbols.current(),
            });
        }
    }
}

/// A formal-subprogram alias waiting for its instance scope to open.
pub(crate) struct PendingAlias {
    pub(crate) name: Symbol,
    pub(crate) signature: Signature,
    pub(crate) mangled: String,
    pub(crate) external: bool,
}

fn empty_package_spec(name: Ident) -> PackageSpec {
    PackageSpec {
        name,
        visible: Vec::new(),
        private: Vec::new(),
        span: Span::default(),
        sym: None,
    }
}

/// Strip annotations from a cloned template expression so it
/// re-resolves inside the instance scope.
fn unresolved(mut expr: Expression) -> Expression {
    expr.ty = TypeId::INVALID;
    expr.sym = None;
    expr
}
