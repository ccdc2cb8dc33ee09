// Expression analysis: name resolution, overload resolution at call
// sites, operator typing, implicit universal conversions, aggregates,
// and the resolution rewrites that turn parse-time `ApplyUnresolved`
// nodes into calls, indexings, or conversions.

use crate::analyzer::Analyzer;
use crate::overload::{self, Actual, CallContext, Resolution};
use crate::semantic_error::ErrorType;
use crate::static_eval::StaticValue;
use parser::ast::*;
use shared_context::Span;
use shared_context::interner::Symbol;
use shared_context::symbols::{Mode, ScopeId, SymbolId, SymbolKind};
use shared_context::types::{TypeId, TypeKind};

impl<'src, 'ctx, 'ses> Analyzer<'src, 'ctx, 'ses> {
    /// Analyze one expression, filling in its type and symbol
    /// annotations. `expected` drives universal literal conversion
    /// and overload resolution; it is a hint, not a check. The
    /// caller compares the returned type where a mismatch matters.
    pub(crate) fn analyze_expr(
        &mut self,
        expr: &mut Expression,
        expected: Option<TypeId>,
    ) -> TypeId {
        let span = expr.span;
        let ty = match &mut expr.kind {
            ExprKind::IntLiteral(value) => {
                let universal = self.ctx.types.well_known.universal_integer;
                match expected {
                    Some(target)
                        if target.is_valid()
                            && self.ctx.types.is_integer(target)
                            && !self.ctx.types.is_universal(target) =>
                    {
                        if value.to_i64().is_none() {
                            self.report(ErrorType::ConstraintViolation {
                                message: "integer literal is out of the implemented range"
                                    .to_string(),
                                span,
                            });
                        }
                        target
                    }
                    _ => universal,
                }
            }
            ExprKind::RealLiteral(_) => {
                let universal = self.ctx.types.well_known.universal_real;
                match expected {
                    Some(target)
                        if target.is_valid()
                            && self.ctx.types.is_real(target)
                            && !self.ctx.types.is_universal(target) =>
                    {
                        target
                    }
                    _ => universal,
                }
            }
            ExprKind::CharLiteral(_) => self.ctx.types.well_known.character,
            ExprKind::StringLiteral(_) => self.ctx.types.well_known.string,
            ExprKind::NullLiteral => match expected {
                Some(target) if self.ctx.types.is_access(target) => target,
                _ => {
                    self.report(ErrorType::Unsupported {
                        message: "cannot determine the access type of null here".to_string(),
                        span,
                    });
                    TypeId::INVALID
                }
            },

            ExprKind::Identifier(_) => return self.analyze_identifier(expr, expected),
            ExprKind::Selected { .. } => return self.analyze_selected(expr, expected),
            ExprKind::ApplyUnresolved { .. } => return self.analyze_apply(expr, expected),

            // already-resolved forms keep their annotations
            ExprKind::Call { .. } | ExprKind::Index { .. } | ExprKind::Conversion { .. } => {
                return expr.ty;
            }

            ExprKind::Slice { prefix, range } => {
                let prefix_ty = self.analyze_expr(prefix, None);
                let array_ty = self.deref_to_array(prefix, prefix_ty);
                let index_ty = self
                    .ctx
                    .types
                    .array_indexes(array_ty)
                    .and_then(|ix| ix.first().copied());
                let _ = self.analyze_expr(&mut range.low, index_ty);
                let _ = self.analyze_expr(&mut range.high, index_ty);
                if array_ty.is_valid() {
                    self.ctx.types.base_of(array_ty)
                } else {
                    TypeId::INVALID
                }
            }

            ExprKind::Attribute { .. } => return self.analyze_attribute(expr),

            ExprKind::Binary { .. } => return self.analyze_binary(expr, expected),
            ExprKind::Unary { op, operand } => {
                let op = *op;
                let operand_ty = self.analyze_expr(operand, expected);
                match op {
                    UnaryOp::Plus | UnaryOp::Minus | UnaryOp::Abs => {
                        if operand_ty.is_valid() && !self.ctx.types.is_scalar(operand_ty) {
                            self.report(ErrorType::TypeMismatch {
                                expected: self.ctx.types.well_known.integer,
                                found: operand_ty,
                                span,
                            });
                            TypeId::INVALID
                        } else {
                            operand_ty
                        }
                    }
                    UnaryOp::Not => {
                        self.require_boolean(operand_ty, operand.span);
                        self.ctx.types.well_known.boolean
                    }
                }
            }

            ExprKind::ShortCircuit { left, right, .. } => {
                let boolean = self.ctx.types.well_known.boolean;
                let left_ty = self.analyze_expr(left, Some(boolean));
                let right_ty = self.analyze_expr(right, Some(boolean));
                self.require_boolean(left_ty, left.span);
                self.require_boolean(right_ty, right.span);
                boolean
            }

            ExprKind::Membership {
                operand, target, ..
            } => {
                let operand_ty = self.analyze_expr(operand, None);
                match target.as_mut() {
                    MembershipTarget::Range(range) => {
                        let hint = if self.ctx.types.is_universal(operand_ty) {
                            None
                        } else {
                            Some(operand_ty)
                        };
                        let low_ty = self.analyze_expr(&mut range.low, hint);
                        let _ = self.analyze_expr(&mut range.high, hint.or(Some(low_ty)));
                        self.ensure_type(operand, low_ty);
                    }
                    MembershipTarget::Mark(mark) => {
                        let mark_ty = self.resolve_type_mark(mark);
                        self.ensure_type(operand, mark_ty);
                        if !self.ctx.types.compatible(operand_ty, mark_ty) {
                            self.report(ErrorType::TypeMismatch {
                                expected: mark_ty,
                                found: operand_ty,
                                span,
                            });
                        }
                    }
                }
                self.ctx.types.well_known.boolean
            }

            ExprKind::Aggregate { .. } => return self.analyze_aggregate(expr, expected),

            ExprKind::Qualified { mark, operand } => {
                let mark_ty = self.resolve_type_mark(mark);
                let found = self.analyze_expr(operand, Some(mark_ty));
                if !self.ctx.types.compatible(mark_ty, found) {
                    self.report(ErrorType::TypeMismatch {
                        expected: mark_ty,
                        found,
                        span,
                    });
                }
                mark_ty
            }

            ExprKind::Allocator { subtype, initial } => {
                let designated = self.resolve_subtype_indication(subtype);
                if let Some(initial) = initial {
                    let found = self.analyze_expr(initial, Some(designated));
                    if !self.ctx.types.compatible(designated, found) {
                        self.report(ErrorType::TypeMismatch {
                            expected: designated,
                            found,
                            span,
                        });
                    }
                }
                match expected {
                    Some(target) if self.ctx.types.is_access(target) => target,
                    _ => {
                        self.report(ErrorType::Unsupported {
                            message: "an allocator needs an access type from its context"
                                .to_string(),
                            span,
                        });
                        TypeId::INVALID
                    }
                }
            }
        };

        expr.ty = ty;
        ty
    }

    /// Re-analyze a subexpression whose type stayed universal once
    /// the context settles on a specific type.
    pub(crate) fn ensure_type(&mut self, expr: &mut Expression, target: TypeId) {
        if expr.ty.is_valid()
            && target.is_valid()
            && self.ctx.types.is_universal(expr.ty)
            && !self.ctx.types.is_universal(target)
        {
            let _ = self.analyze_expr(expr, Some(target));
        }
    }

    fn require_boolean(&mut self, ty: TypeId, span: Span) {
        if ty.is_valid() && self.ctx.types.base_of(ty) != self.ctx.types.well_known.boolean {
            self.report(ErrorType::TypeMismatch {
                expected: self.ctx.types.well_known.boolean,
                found: ty,
                span,
            });
        }
    }

    // ------------------------------------------------------------------
    // names
    // ------------------------------------------------------------------

    fn analyze_identifier(&mut self, expr: &mut Expression, expected: Option<TypeId>) -> TypeId {
        let ExprKind::Identifier(ident) = &expr.kind else {
            return TypeId::INVALID;
        };
        let ident = *ident;
        let span = expr.span;

        let candidates = self.ctx.symbols.lookup(ident.symbol);
        if candidates.is_empty() {
            self.report(ErrorType::UndeclaredIdentifier {
                name: ident.symbol,
                span,
            });
            expr.ty = TypeId::INVALID;
            return TypeId::INVALID;
        }

        let first = candidates[0];
        if !self.ctx.symbols.get(first).kind.is_overloadable() {
            return self.annotate_entity(expr, first, expected);
        }

        // an overloadable name without arguments: an enumeration
        // literal or a parameterless function call
        match overload::resolve(self.ctx, &candidates, &[], CallContext::Function(expected)) {
            Resolution::Unique(sym) => {
                let entry = self.ctx.symbols.get(sym);
                match &entry.kind {
                    SymbolKind::EnumLiteral { .. } => {
                        expr.sym = Some(sym);
                        expr.ty = entry.ty;
                        expr.ty
                    }
                    SymbolKind::Subprogram { signature } => {
                        let result = signature.result.unwrap_or(TypeId::INVALID);
                        let prefix = expr.clone();
                        expr.kind = ExprKind::Call {
                            prefix: Box::new(prefix),
                            args: Vec::new(),
                        };
                        expr.sym = Some(sym);
                        expr.ty = result;
                        result
                    }
                    _ => TypeId::INVALID,
                }
            }
            Resolution::Ambiguous => {
                self.report(ErrorType::AmbiguousOverload {
                    name: ident.symbol,
                    span,
                });
                TypeId::INVALID
            }
            Resolution::NoMatch => {
                self.report(ErrorType::NoOverloadMatch {
                    name: ident.symbol,
                    span,
                });
                TypeId::INVALID
            }
        }
    }

    /// Annotate a name that resolved to a single plain entity.
    fn annotate_entity(
        &mut self,
        expr: &mut Expression,
        sym: SymbolId,
        expected: Option<TypeId>,
    ) -> TypeId {
        let entry = self.ctx.symbols.get(sym);
        let span = expr.span;
        match &entry.kind {
            SymbolKind::Object { .. } => {
                expr.sym = Some(sym);
                expr.ty = entry.ty;
                expr.ty
            }
            SymbolKind::Constant => {
                let ty = entry.ty;
                expr.sym = Some(sym);
                // named numbers fold to their literal value at every
                // use, so code generation never sees them
                if let Some(value) = self.session.static_numbers.get(&sym).cloned() {
                    match value {
                        StaticValue::Int(v) => expr.kind = ExprKind::IntLiteral(v),
                        StaticValue::Real(v) => expr.kind = ExprKind::RealLiteral(v),
                    }
                    expr.ty = TypeId::INVALID;
                    return self.analyze_expr(expr, expected);
                }
                expr.ty = ty;
                ty
            }
            SymbolKind::Type | SymbolKind::Subtype => {
                self.report(ErrorType::Unsupported {
                    message: "a type name is not a value".to_string(),
                    span,
                });
                expr.sym = Some(sym);
                TypeId::INVALID
            }
            SymbolKind::Package { .. } => {
                self.report(ErrorType::Unsupported {
                    message: "a package name is not a value".to_string(),
                    span,
                });
                expr.sym = Some(sym);
                TypeId::INVALID
            }
            SymbolKind::Exception { .. } => {
                self.report(ErrorType::Unsupported {
                    message: "an exception name is not a value".to_string(),
                    span,
                });
                expr.sym = Some(sym);
                TypeId::INVALID
            }
            _ => {
                self.report(ErrorType::Unsupported {
                    message: "this name cannot be used as a value".to_string(),
                    span,
                });
                TypeId::INVALID
            }
        }
    }

    /// Resolve the scope of a package named by an expanded name,
    /// annotating the nodes on the way.
    pub(crate) fn package_scope_of_name(&mut self, expr: &mut Expression) -> Option<ScopeId> {
        match &mut expr.kind {
            ExprKind::Identifier(ident) => {
                let ident = *ident;
                let found = self.ctx.symbols.lookup(ident.symbol);
                found.iter().find_map(|&sym| {
                    match self.ctx.symbols.get(sym).kind {
                        SymbolKind::Package { scope } => {
                            expr.sym = Some(sym);
                            Some(scope)
                        }
                        _ => None,
                    }
                })
            }
            ExprKind::Selected { prefix, selector } => {
                let selector = *selector;
                let outer = self.package_scope_of_name(prefix)?;
                let found = self.ctx.symbols.lookup_selected(outer, selector.symbol);
                found.iter().find_map(|&sym| {
                    match self.ctx.symbols.get(sym).kind {
                        SymbolKind::Package { scope } => {
                            expr.sym = Some(sym);
                            Some(scope)
                        }
                        _ => None,
                    }
                })
            }
            _ => None,
        }
    }

    /// The candidate set a name denotes, when the name is a direct or
    /// selected reference to declared entities: `F`, `P.F`, or
    /// `TASK_OBJECT.ENTRY`. Returns None when the prefix is a value
    /// (record component selection, array element).
    pub(crate) fn name_candidates(&mut self, expr: &mut Expression) -> Option<(Symbol, Vec<SymbolId>)> {
        match &mut expr.kind {
            ExprKind::Identifier(ident) => {
                let ident = *ident;
                Some((ident.symbol, self.ctx.symbols.lookup(ident.symbol)))
            }
            ExprKind::Selected { prefix, selector } => {
                let selector = *selector;
                if let Some(scope) = self.package_scope_of_name(prefix) {
                    return Some((
                        selector.symbol,
                        self.ctx.symbols.lookup_selected(scope, selector.symbol),
                    ));
                }
                // a task object's entries resolve in the task's scope
                let prefix_ty = self.analyze_expr(prefix, None);
                if prefix_ty.is_valid() && self.ctx.types.is_task(prefix_ty) {
                    let entry_scope = self
                        .session
                        .task_scopes
                        .get(&self.ctx.types.structure_of(prefix_ty))
                        .copied()?;
                    return Some((
                        selector.symbol,
                        self.ctx.symbols.lookup_in(entry_scope, selector.symbol),
                    ));
                }
                None
            }
            _ => None,
        }
    }

    fn analyze_selected(&mut self, expr: &mut Expression, expected: Option<TypeId>) -> TypeId {
        let span = expr.span;

        // entity selection (package contents, task entries)
        if let Some((name, candidates)) = self.name_candidates_for_selected(expr) {
            if candidates.is_empty() {
                self.report(ErrorType::UndeclaredIdentifier { name, span });
                return TypeId::INVALID;
            }
            let first = candidates[0];
            if !self.ctx.symbols.get(first).kind.is_overloadable() {
                return self.annotate_entity(expr, first, expected);
            }
            match overload::resolve(self.ctx, &candidates, &[], CallContext::Function(expected)) {
                Resolution::Unique(sym) => {
                    let entry = self.ctx.symbols.get(sym);
                    match &entry.kind {
                        SymbolKind::EnumLiteral { .. } => {
                            expr.sym = Some(sym);
                            expr.ty = entry.ty;
                            return expr.ty;
                        }
                        SymbolKind::Subprogram { signature } => {
                            let result = signature.result.unwrap_or(TypeId::INVALID);
                            let prefix = expr.clone();
                            expr.kind = ExprKind::Call {
                                prefix: Box::new(prefix),
                                args: Vec::new(),
                            };
                            expr.sym = Some(sym);
                            expr.ty = result;
                            return result;
                        }
                        SymbolKind::Entry { .. } => {
                            // a parameterless entry call; only legal
                            // as a call statement
                            expr.sym = Some(sym);
                            expr.ty = TypeId::INVALID;
                            return TypeId::INVALID;
                        }
                        _ => return TypeId::INVALID,
                    }
                }
                Resolution::Ambiguous => {
                    self.report(ErrorType::AmbiguousOverload { name, span });
                    return TypeId::INVALID;
                }
                Resolution::NoMatch => {
                    self.report(ErrorType::NoOverloadMatch { name, span });
                    return TypeId::INVALID;
                }
            }
        }

        // value selection: dereference or record component
        let ExprKind::Selected { prefix, selector } = &mut expr.kind else {
            return TypeId::INVALID;
        };
        let selector = *selector;
        let prefix_ty = self.analyze_expr(prefix, None);
        let all = self.ctx.interner.intern_folded("all");

        if selector.symbol == all {
            // explicit dereference X.all
            return match self.ctx.types.structural_kind(prefix_ty) {
                TypeKind::Access { designated } => {
                    expr.ty = *designated;
                    expr.ty
                }
                _ => {
                    self.report(ErrorType::TypeMismatch {
                        expected: TypeId::INVALID,
                        found: prefix_ty,
                        span,
                    });
                    TypeId::INVALID
                }
            };
        }

        // implicit dereference of an access-to-record prefix
        let record_ty = self.deref_to_record(prefix, prefix_ty);
        if !record_ty.is_valid() {
            if prefix_ty.is_valid() {
                self.report(ErrorType::UnknownField {
                    name: selector.symbol,
                    span,
                });
            }
            return TypeId::INVALID;
        }

        match self.ctx.types.field_index(record_ty, selector.symbol) {
            Some((_, field_ty)) => {
                expr.ty = field_ty;
                field_ty
            }
            None => {
                self.report(ErrorType::UnknownField {
                    name: selector.symbol,
                    span,
                });
                TypeId::INVALID
            }
        }
    }

    /// `name_candidates` restricted to Selected nodes (the Identifier
    /// case is handled by analyze_identifier).
    fn name_candidates_for_selected(
        &mut self,
        expr: &mut Expression,
    ) -> Option<(Symbol, Vec<SymbolId>)> {
        match &expr.kind {
            ExprKind::Selected { .. } => self.name_candidates(expr),
            _ => None,
        }
    }

    /// Insert an explicit dereference when an access value stands
    /// where its designated record is meant.
    fn deref_to_record(&mut self, prefix: &mut Box<Expression>, prefix_ty: TypeId) -> TypeId {
        if !prefix_ty.is_valid() {
            return TypeId::INVALID;
        }
        if self.ctx.types.is_record(prefix_ty) {
            return prefix_ty;
        }
        if let TypeKind::Access { designated } = self.ctx.types.structural_kind(prefix_ty) {
            let designated = *designated;
            if self.ctx.types.is_record(designated) {
                self.wrap_deref(prefix, designated);
                return designated;
            }
        }
        TypeId::INVALID
    }

    /// Same for arrays (indexing and slicing through access values).
    fn deref_to_array(&mut self, prefix: &mut Box<Expression>, prefix_ty: TypeId) -> TypeId {
        if !prefix_ty.is_valid() {
            return TypeId::INVALID;
        }
        if self.ctx.types.is_array(prefix_ty) {
            return prefix_ty;
        }
        if let TypeKind::Access { designated } = self.ctx.types.structural_kind(prefix_ty) {
            let designated = *designated;
            if self.ctx.types.is_array(designated) {
                self.wrap_deref(prefix, designated);
                return designated;
            }
        }
        TypeId::INVALID
    }

    fn wrap_deref(&mut self, prefix: &mut Box<Expression>, designated: TypeId) {
        let all = self.ctx.interner.intern_folded("all");
        let span = prefix.span;
        let inner = std::mem::replace(
            prefix.as_mut(),
            Expression::new(ExprKind::NullLiteral, span),
        );
        let mut deref = Expression::new(
            ExprKind::Selected {
                prefix: Box::new(inner),
                selector: shared_context::Ident::new(all, span),
            },
            span,
        );
        deref.ty = designated;
        **prefix = deref;
    }

    // ------------------------------------------------------------------
    // application: calls, indexing, conversions
    // ------------------------------------------------------------------

    fn analyze_apply(&mut self, expr: &mut Expression, expected: Option<TypeId>) -> TypeId {
        let span = expr.span;
        let ExprKind::ApplyUnresolved { prefix, args } = &mut expr.kind else {
            return TypeId::INVALID;
        };

        // a type mark applied to one argument is a conversion
        if let Some(mark_ty) = self.type_mark_of(prefix) {
            let mut args = std::mem::take(args);
            let prefix = std::mem::replace(
                prefix.as_mut(),
                Expression::new(ExprKind::NullLiteral, span),
            );
            if args.len() != 1 || args[0].name.is_some() {
                self.report(ErrorType::WrongArgumentCount { span });
                expr.ty = TypeId::INVALID;
                return TypeId::INVALID;
            }
            let mut operand = args.pop().unwrap().value;
            let found = self.analyze_expr(&mut operand, None);
            self.check_conversion_legality(mark_ty, found, span);
            expr.kind = ExprKind::Conversion {
                mark: Box::new(prefix),
                operand: Box::new(operand),
            };
            expr.ty = mark_ty;
            return mark_ty;
        }

        // overloadable names resolve as calls
        if let Some((name, candidates)) = self.name_candidates(prefix) {
            if candidates.is_empty() {
                self.report(ErrorType::UndeclaredIdentifier { name, span });
                expr.ty = TypeId::INVALID;
                return TypeId::INVALID;
            }
            let overloadable: Vec<SymbolId> = candidates
                .iter()
                .copied()
                .filter(|&sym| self.ctx.symbols.get(sym).kind.is_overloadable())
                .collect();
            if !overloadable.is_empty() {
                return self.resolve_call(expr, name, overloadable, CallContext::Function(expected));
            }
        }

        // otherwise this is array indexing
        self.analyze_indexing(expr)
    }

    /// The type a name denotes, when it names a type or subtype.
    pub(crate) fn type_mark_of(&mut self, mark: &mut Expression) -> Option<TypeId> {
        let candidates = match &mut mark.kind {
            ExprKind::Identifier(ident) => self.ctx.symbols.lookup(ident.symbol),
            ExprKind::Selected { prefix, selector } => {
                let selector = *selector;
                let scope = self.package_scope_of_name(prefix)?;
                self.ctx.symbols.lookup_selected(scope, selector.symbol)
            }
            _ => return None,
        };
        candidates.into_iter().find_map(|sym| {
            let entry = self.ctx.symbols.get(sym);
            match entry.kind {
                SymbolKind::Type | SymbolKind::Subtype => {
                    mark.sym = Some(sym);
                    mark.ty = entry.ty;
                    Some(entry.ty)
                }
                _ => None,
            }
        })
    }

    /// Resolve a call with arguments; shared by value contexts and
    /// call statements. Rewrites the node to `Call` on success.
    pub(crate) fn resolve_call(
        &mut self,
        expr: &mut Expression,
        name: Symbol,
        candidates: Vec<SymbolId>,
        context: CallContext,
    ) -> TypeId {
        let span = expr.span;
        let ExprKind::ApplyUnresolved { args, .. } = &mut expr.kind else {
            return TypeId::INVALID;
        };

        // analyze the actuals bottom-up for the parameter-type filter
        let mut actuals = Vec::new();
        for arg in args.iter_mut() {
            let ty = self.analyze_expr(&mut arg.value, None);
            actuals.push(Actual {
                name: arg.name.map(|ident| ident.symbol),
                ty,
            });
        }

        match overload::resolve(self.ctx, &candidates, &actuals, context) {
            Resolution::Unique(sym) => {
                self.normalize_call(expr, sym);
                expr.sym = Some(sym);
                let entry = self.ctx.symbols.get(sym);
                expr.ty = match &entry.kind {
                    SymbolKind::Subprogram { signature } | SymbolKind::Entry { signature } => {
                        signature.result.unwrap_or(TypeId::INVALID)
                    }
                    _ => TypeId::INVALID,
                };
                expr.ty
            }
            Resolution::Ambiguous => {
                self.report(ErrorType::AmbiguousOverload { name, span });
                expr.ty = TypeId::INVALID;
                TypeId::INVALID
            }
            Resolution::NoMatch => {
                self.report(ErrorType::NoOverloadMatch { name, span });
                expr.ty = TypeId::INVALID;
                TypeId::INVALID
            }
        }
    }

    /// Rewrite a resolved application into a `Call` with the actuals
    /// in formal order, defaults filled in, modes checked, and every
    /// actual re-analyzed against its formal type.
    fn normalize_call(&mut self, expr: &mut Expression, sym: SymbolId) {
        let span = expr.span;
        let ExprKind::ApplyUnresolved { prefix, args } = &mut expr.kind else {
            return;
        };
        let prefix = std::mem::replace(
            prefix.as_mut(),
            Expression::new(ExprKind::NullLiteral, span),
        );
        let given = std::mem::take(args);

        let params = match &self.ctx.symbols.get(sym).kind {
            SymbolKind::Subprogram { signature } | SymbolKind::Entry { signature } => {
                signature.params.clone()
            }
            _ => Vec::new(),
        };
        let defaults = self
            .session
            .param_defaults
            .get(&sym)
            .cloned()
            .unwrap_or_default();

        let positional_count = given.iter().take_while(|arg| arg.name.is_none()).count();
        let mut ordered = Vec::with_capacity(params.len());

        for (index, param) in params.iter().enumerate() {
            let value = if index < positional_count {
                Some(given[index].value.clone())
            } else {
                given
                    .iter()
                    .skip(positional_count)
                    .find(|arg| arg.name.map(|n| n.symbol) == Some(param.name))
                    .map(|arg| arg.value.clone())
                    .or_else(|| {
                        defaults
                            .iter()
                            .find(|(name, _)| *name == param.name)
                            .and_then(|(_, default)| default.clone())
                    })
            };

            let Some(mut value) = value else {
                self.report(ErrorType::WrongArgumentCount { span });
                continue;
            };

            let _ = self.analyze_expr(&mut value, Some(param.ty));
            if matches!(param.mode, Mode::Out | Mode::InOut) {
                self.require_variable(&value);
            }

            let value_span = value.span;
            ordered.push(Argument {
                name: None,
                value,
                span: value_span,
            });
        }

        expr.kind = ExprKind::Call {
            prefix: Box::new(prefix),
            args: ordered,
        };
    }

    fn analyze_indexing(&mut self, expr: &mut Expression) -> TypeId {
        let span = expr.span;
        let ExprKind::ApplyUnresolved { prefix, args } = &mut expr.kind else {
            return TypeId::INVALID;
        };

        let prefix_ty = self.analyze_expr(prefix, None);
        let array_ty = self.deref_to_array(prefix, prefix_ty);
        if !array_ty.is_valid() {
            if prefix_ty.is_valid() {
                self.report(ErrorType::Unsupported {
                    message: "this name is neither callable nor an array".to_string(),
                    span,
                });
            }
            expr.ty = TypeId::INVALID;
            return TypeId::INVALID;
        }

        let index_types: Vec<TypeId> = self
            .ctx
            .types
            .array_indexes(array_ty)
            .map(|ix| ix.to_vec())
            .unwrap_or_default();
        if args.len() != index_types.len() {
            self.report(ErrorType::WrongArgumentCount { span });
        }
        for (arg, index_ty) in args.iter_mut().zip(index_types.iter()) {
            if arg.name.is_some() {
                self.report(ErrorType::Unsupported {
                    message: "array indexing does not use named association".to_string(),
                    span: arg.span,
                });
            }
            let found = self.analyze_expr(&mut arg.value, Some(*index_ty));
            if !self.ctx.types.compatible(*index_ty, found) {
                self.report(ErrorType::TypeMismatch {
                    expected: *index_ty,
                    found,
                    span: arg.span,
                });
            }
        }

        let component = self
            .ctx
            .types
            .array_component(array_ty)
            .unwrap_or(TypeId::INVALID);

        // rewrite in place to an Index node
        let prefix = std::mem::replace(
            prefix.as_mut(),
            Expression::new(ExprKind::NullLiteral, span),
        );
        let args = std::mem::take(args);
        expr.kind = ExprKind::Index {
            prefix: Box::new(prefix),
            args,
        };
        expr.ty = component;
        component
    }

    fn check_conversion_legality(&mut self, target: TypeId, source: TypeId, span: Span) {
        if !target.is_valid() || !source.is_valid() {
            return;
        }
        let both_numeric = self.ctx.types.is_scalar(target) && self.ctx.types.is_scalar(source);
        let same_base = self.ctx.types.base_of(target) == self.ctx.types.base_of(source);
        let related_derived = self.ctx.types.structure_of(target)
            == self.ctx.types.structure_of(source);
        if !(both_numeric || same_base || related_derived) {
            self.report(ErrorType::TypeMismatch {
                expected: target,
                found: source,
                span,
            });
        }
    }

    /// Assignment targets and out-mode actuals must be variables.
    pub(crate) fn require_variable(&mut self, expr: &Expression) {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Identifier(ident) => {
                let Some(sym) = expr.sym else { return };
                match &self.ctx.symbols.get(sym).kind {
                    SymbolKind::Object { mode: Some(Mode::In) } => {
                        self.report(ErrorType::IllegalMode {
                            name: ident.symbol,
                            span,
                        });
                    }
                    SymbolKind::Object { .. } => {}
                    SymbolKind::Constant => {
                        self.report(ErrorType::NotAVariable { span });
                    }
                    _ => self.report(ErrorType::NotAVariable { span }),
                }
            }
            ExprKind::Selected { prefix, selector } => {
                let all = self
                    .ctx
                    .interner
                    .lookup(selector.symbol)
                    .eq("all");
                if !all {
                    self.require_variable(prefix);
                }
                // a dereference target is always a variable
            }
            ExprKind::Index { prefix, .. } | ExprKind::Slice { prefix, .. } => {
                self.require_variable(prefix);
            }
            ExprKind::Conversion { operand, .. } => self.require_variable(operand),
            _ => self.report(ErrorType::NotAVariable { span }),
        }
    }

    // ------------------------------------------------------------------
    // operators
    // ------------------------------------------------------------------

    fn analyze_binary(&mut self, expr: &mut Expression, expected: Option<TypeId>) -> TypeId {
        let span = expr.span;
        let ExprKind::Binary { op, left, right } = &mut expr.kind else {
            return TypeId::INVALID;
        };
        let op = *op;

        let ty = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                let hint = expected.filter(|&t| t.is_valid() && self.ctx.types.is_scalar(t));
                let left_ty = self.analyze_expr(left, hint);
                let right_ty = self.analyze_expr(right, hint.or_else(|| {
                    (left_ty.is_valid() && !self.ctx.types.is_universal(left_ty))
                        .then_some(left_ty)
                }));
                let result = self.numeric_result(left_ty, right_ty, span);
                self.ensure_type(left, result);
                self.ensure_type(right, result);
                result
            }
            BinaryOp::Mod | BinaryOp::Rem => {
                let hint = expected.filter(|&t| t.is_valid() && self.ctx.types.is_integer(t));
                let left_ty = self.analyze_expr(left, hint);
                let right_ty = self.analyze_expr(right, hint.or_else(|| {
                    (left_ty.is_valid() && !self.ctx.types.is_universal(left_ty))
                        .then_some(left_ty)
                }));
                if left_ty.is_valid() && !self.ctx.types.is_integer(left_ty) {
                    self.report(ErrorType::TypeMismatch {
                        expected: self.ctx.types.well_known.integer,
                        found: left_ty,
                        span,
                    });
                }
                let result = self.numeric_result(left_ty, right_ty, span);
                self.ensure_type(left, result);
                self.ensure_type(right, result);
                result
            }
            BinaryOp::Pow => {
                let base_ty = self.analyze_expr(left, expected);
                let exp_ty = self.analyze_expr(right, Some(self.ctx.types.well_known.integer));
                if exp_ty.is_valid() && !self.ctx.types.is_integer(exp_ty) {
                    self.report(ErrorType::TypeMismatch {
                        expected: self.ctx.types.well_known.integer,
                        found: exp_ty,
                        span,
                    });
                }
                self.ensure_type(right, self.ctx.types.well_known.integer);
                base_ty
            }
            BinaryOp::Eq | BinaryOp::Neq | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt
            | BinaryOp::Ge => {
                let left_ty = self.analyze_expr(left, None);
                let right_hint = (left_ty.is_valid()
                    && !self.ctx.types.is_universal(left_ty))
                .then_some(left_ty);
                let right_ty = self.analyze_expr(right, right_hint);
                if left_ty.is_valid()
                    && self.ctx.types.is_universal(left_ty)
                    && right_ty.is_valid()
                    && !self.ctx.types.is_universal(right_ty)
                {
                    self.ensure_type(left, right_ty);
                }
                if !self.ctx.types.compatible(left_ty, right_ty) {
                    self.report(ErrorType::TypeMismatch {
                        expected: left_ty,
                        found: right_ty,
                        span,
                    });
                }
                let ordering = matches!(
                    op,
                    BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
                );
                if ordering
                    && left_ty.is_valid()
                    && !self.ctx.types.is_scalar(left_ty)
                    && !self.ctx.types.is_array(left_ty)
                {
                    self.report(ErrorType::Unsupported {
                        message: "ordering operators need scalar operands".to_string(),
                        span,
                    });
                }
                self.ctx.types.well_known.boolean
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
                let boolean = self.ctx.types.well_known.boolean;
                let left_ty = self.analyze_expr(left, Some(boolean));
                let right_ty = self.analyze_expr(right, Some(boolean));
                self.require_boolean(left_ty, left.span);
                self.require_boolean(right_ty, right.span);
                boolean
            }
            BinaryOp::Concat => {
                let left_ty = self.analyze_expr(left, expected);
                let right_ty = self.analyze_expr(right, expected);
                let ok = |t: TypeId, s: &Self| {
                    t.is_valid() && s.ctx.types.is_array(t)
                };
                if !(ok(left_ty, self) && ok(right_ty, self)) {
                    self.report(ErrorType::Unsupported {
                        message: "'&' concatenates one-dimensional arrays".to_string(),
                        span,
                    });
                    TypeId::INVALID
                } else if !self.ctx.types.compatible(left_ty, right_ty) {
                    self.report(ErrorType::TypeMismatch {
                        expected: left_ty,
                        found: right_ty,
                        span,
                    });
                    TypeId::INVALID
                } else {
                    self.ctx.types.base_of(left_ty)
                }
            }
        };

        expr.ty = ty;
        ty
    }

    /// Combine the operand types of an arithmetic operator.
    fn numeric_result(&mut self, left: TypeId, right: TypeId, span: Span) -> TypeId {
        if !left.is_valid() || !right.is_valid() {
            return TypeId::INVALID;
        }
        if !self.ctx.types.is_scalar(left) || !self.ctx.types.is_scalar(right) {
            self.report(ErrorType::Unsupported {
                message: "arithmetic needs numeric operands".to_string(),
                span,
            });
            return TypeId::INVALID;
        }

        let left_universal = self.ctx.types.is_universal(left);
        let right_universal = self.ctx.types.is_universal(right);
        match (left_universal, right_universal) {
            (true, true) => {
                if self.ctx.types.is_float(left) || self.ctx.types.is_float(right) {
                    self.ctx.types.well_known.universal_real
                } else {
                    self.ctx.types.well_known.universal_integer
                }
            }
            (true, false) => right,
            (false, true) => left,
            (false, false) => {
                if !self.ctx.types.compatible(left, right) {
                    self.report(ErrorType::TypeMismatch {
                        expected: left,
                        found: right,
                        span,
                    });
                    TypeId::INVALID
                } else {
                    left
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // attributes
    // ------------------------------------------------------------------

    fn analyze_attribute(&mut self, expr: &mut Expression) -> TypeId {
        let span = expr.span;
        let ExprKind::Attribute {
            prefix,
            attribute,
            arg,
        } = &mut expr.kind
        else {
            return TypeId::INVALID;
        };
        let attribute = *attribute;

        // the prefix is a type mark or an object
        let prefix_ty = match self.type_mark_of(prefix) {
            Some(ty) => ty,
            None => self.analyze_expr(prefix, None),
        };

        let name = self.ctx.interner.lookup(attribute.symbol).to_string();
        let ty = match name.as_str() {
            "first" | "last" => {
                if self.ctx.types.is_array(prefix_ty) {
                    self.ctx
                        .types
                        .array_indexes(prefix_ty)
                        .and_then(|ix| ix.first().copied())
                        .unwrap_or(TypeId::INVALID)
                } else {
                    prefix_ty
                }
            }
            "length" | "size" | "pos" => {
                if let Some(arg) = arg {
                    let _ = self.analyze_expr(arg, Some(prefix_ty));
                }
                self.ctx.types.well_known.universal_integer
            }
            "val" => {
                if let Some(arg) = arg {
                    let _ = self.analyze_expr(arg, Some(self.ctx.types.well_known.integer));
                }
                prefix_ty
            }
            "succ" | "pred" => {
                if let Some(arg) = arg {
                    let _ = self.analyze_expr(arg, Some(prefix_ty));
                }
                prefix_ty
            }
            "image" => {
                if let Some(arg) = arg {
                    let _ = self.analyze_expr(arg, Some(prefix_ty));
                }
                self.ctx.types.well_known.string
            }
            "value" => {
                if let Some(arg) = arg {
                    let _ = self.analyze_expr(arg, Some(self.ctx.types.well_known.string));
                }
                prefix_ty
            }
            "small" | "delta" => self.ctx.types.well_known.universal_real,
            "digits" => self.ctx.types.well_known.universal_integer,
            "range" => {
                // only meaningful as a discrete range; the loop and
                // slice paths handle it before reaching here
                self.report(ErrorType::Unsupported {
                    message: "'RANGE is not a value by itself".to_string(),
                    span,
                });
                TypeId::INVALID
            }
            _ => {
                self.report(ErrorType::Unsupported {
                    message: format!("attribute '{name}' is not supported"),
                    span,
                });
                TypeId::INVALID
            }
        };

        expr.ty = ty;
        ty
    }

    // ------------------------------------------------------------------
    // aggregates
    // ------------------------------------------------------------------

    fn analyze_aggregate(&mut self, expr: &mut Expression, expected: Option<TypeId>) -> TypeId {
        let span = expr.span;
        let Some(target) = expected.filter(|t| t.is_valid()) else {
            self.report(ErrorType::Unsupported {
                message: "an aggregate needs a record or array type from its context"
                    .to_string(),
                span,
            });
            expr.ty = TypeId::INVALID;
            return TypeId::INVALID;
        };

        if self.ctx.types.is_record(target) {
            self.analyze_record_aggregate(expr, target);
        } else if self.ctx.types.is_array(target) {
            self.analyze_array_aggregate(expr, target);
        } else {
            self.report(ErrorType::TypeMismatch {
                expected: target,
                found: TypeId::INVALID,
                span,
            });
        }
        expr.ty = target;
        target
    }

    fn analyze_record_aggregate(&mut self, expr: &mut Expression, target: TypeId) {
        let span = expr.span;
        let fields = self.ctx.types.record_fields(target);
        let ExprKind::Aggregate { items } = &mut expr.kind else {
            return;
        };

        let mut assigned = vec![false; fields.len()];
        let mut next_positional = 0usize;

        for item in items.iter_mut() {
            if item.choices.is_empty() {
                // positional
                if next_positional >= fields.len() {
                    self.report(ErrorType::WrongArgumentCount { span: item.span });
                    continue;
                }
                let index = next_positional;
                next_positional += 1;
                assigned[index] = true;
                item.field = Some(index);
                let field_ty = fields[index].ty;
                let _ = self.analyze_expr(&mut item.value, Some(field_ty));
            } else if item
                .choices
                .iter()
                .any(|choice| matches!(choice.kind, ChoiceKind::Others))
            {
                // others covers every remaining field
                item.field = None;
                let remaining: Vec<usize> = (0..fields.len())
                    .filter(|&index| !assigned[index])
                    .collect();
                if let Some(&first) = remaining.first() {
                    let field_ty = fields[first].ty;
                    let _ = self.analyze_expr(&mut item.value, Some(field_ty));
                }
                for index in remaining {
                    assigned[index] = true;
                }
            } else {
                // named: each choice is a component simple name
                let mut chosen = Vec::new();
                for choice in &item.choices {
                    let ChoiceKind::Expr(choice_expr) = &choice.kind else {
                        self.report(ErrorType::Unsupported {
                            message: "record aggregate choices are component names"
                                .to_string(),
                            span: choice.span,
                        });
                        continue;
                    };
                    let ExprKind::Identifier(ident) = &choice_expr.kind else {
                        self.report(ErrorType::Unsupported {
                            message: "record aggregate choices are component names"
                                .to_string(),
                            span: choice.span,
                        });
                        continue;
                    };
                    match fields.iter().position(|f| f.name == ident.symbol) {
                        Some(index) => chosen.push(index),
                        None => self.report(ErrorType::UnknownField {
                            name: ident.symbol,
                            span: choice.span,
                        }),
                    }
                }
                if let Some(&first) = chosen.first() {
                    item.field = Some(first);
                    let field_ty = fields[first].ty;
                    let _ = self.analyze_expr(&mut item.value, Some(field_ty));
                }
                for index in chosen {
                    if assigned[index] {
                        self.report(ErrorType::DuplicateChoice { span: item.span });
                    }
                    assigned[index] = true;
                }
            }
        }

        if assigned.iter().any(|done| !done) {
            self.report(ErrorType::ConstraintViolation {
                message: "aggregate does not give a value to every component".to_string(),
                span,
            });
        }
    }

    fn analyze_array_aggregate(&mut self, expr: &mut Expression, target: TypeId) {
        let component = self
            .ctx
            .types
            .array_component(target)
            .unwrap_or(TypeId::INVALID);
        let index_ty = self
            .ctx
            .types
            .array_indexes(target)
            .and_then(|ix| ix.first().copied())
            .unwrap_or(TypeId::INVALID);
        let bounds = self.ctx.types.array_static_bounds(target);
        let first = bounds.map(|(first, _)| first).unwrap_or(1);

        let ExprKind::Aggregate { items } = &mut expr.kind else {
            return;
        };

        let mut next_positional = 0i64;
        for item in items.iter_mut() {
            let _ = self.analyze_expr(&mut item.value, Some(component));

            if item.choices.is_empty() {
                item.field = Some(next_positional as usize);
                next_positional += 1;
                continue;
            }
            if item
                .choices
                .iter()
                .any(|choice| matches!(choice.kind, ChoiceKind::Others))
            {
                item.field = None;
                continue;
            }

            // named element choices must be static
            let mut item_choices = std::mem::take(&mut item.choices);
            let mut single = None;
            for choice in item_choices.iter_mut() {
                if let Some((low, high)) = self.analyze_choice(choice, index_ty) {
                    if low == high {
                        single = Some((low - first) as usize);
                    }
                }
            }
            item.choices = item_choices;
            // single static choices get a direct slot; ranges keep
            // their bounds in the choice annotations for the code
            // generator to expand
            item.field = single;
        }
    }
}
