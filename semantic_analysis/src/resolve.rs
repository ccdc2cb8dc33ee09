// Resolution of type marks, subtype indications with constraints,
// discrete ranges, and exception names. These run during declaration
// analysis and inside expressions (membership tests, allocators,
// loop ranges).

use crate::analyzer::Analyzer;
use crate::semantic_error::ErrorType;
use crate::static_eval;
use parser::ast::*;
use shared_context::symbols::{SymbolId, SymbolKind};
use shared_context::types::{Bound, Constraint, TypeDescriptor, TypeId, TypeKind};

impl<'src, 'ctx, 'ses> Analyzer<'src, 'ctx, 'ses> {
    /// A name that must denote a type or subtype.
    pub(crate) fn resolve_type_mark(&mut self, mark: &mut Expression) -> TypeId {
        let span = mark.span;
        if let Some(ty) = self.type_mark_of(mark) {
            mark.ty = ty;
            return ty;
        }
        // distinguish unknown names from known non-type names
        if let ExprKind::Identifier(ident) = &mark.kind {
            if self.ctx.symbols.lookup(ident.symbol).is_empty() {
                self.report(ErrorType::UndeclaredIdentifier {
                    name: ident.symbol,
                    span,
                });
                return TypeId::INVALID;
            }
        }
        self.report(ErrorType::NotAType { span });
        TypeId::INVALID
    }

    /// A subtype indication: the named type, refined by an optional
    /// constraint into a fresh descriptor chained to its base.
    pub(crate) fn resolve_subtype_indication(
        &mut self,
        indication: &mut SubtypeIndication,
    ) -> TypeId {
        let base = self.resolve_type_mark(&mut indication.mark);
        if !base.is_valid() {
            indication.ty = TypeId::INVALID;
            return TypeId::INVALID;
        }

        let ty = match &mut indication.constraint {
            None => base,
            Some(AstConstraint::Range(range)) => self.subtype_with_range(base, range),
            Some(AstConstraint::Composite(elems)) => {
                let mut elems_taken = std::mem::take(elems);
                let ty = self.subtype_with_composite(base, &mut elems_taken, indication.span);
                if let Some(AstConstraint::Composite(elems)) = &mut indication.constraint {
                    *elems = elems_taken;
                }
                ty
            }
            Some(AstConstraint::Accuracy { amount, range, .. }) => {
                let _ = self.analyze_expr(amount, None);
                match range {
                    Some(range) => self.subtype_with_range(base, range),
                    None => base,
                }
            }
        };

        indication.ty = ty;
        ty
    }

    /// Build `BASE range L .. H`, checking a static constraint
    /// against the parent's static bounds. Widening is a compile
    /// time constraint violation.
    fn subtype_with_range(&mut self, base: TypeId, range: &mut RangeExpr) -> TypeId {
        let _ = self.analyze_expr(&mut range.low, Some(base));
        let _ = self.analyze_expr(&mut range.high, Some(base));

        let (first, last) = if self.ctx.types.is_real(base) {
            let low = static_eval::eval_real(&range.low, self.ctx);
            let high = static_eval::eval_real(&range.high, self.ctx);
            (
                low.map(Bound::Real).unwrap_or(Bound::Dynamic),
                high.map(Bound::Real).unwrap_or(Bound::Dynamic),
            )
        } else {
            let low = static_eval::eval_int(&range.low, self.ctx);
            let high = static_eval::eval_int(&range.high, self.ctx);

            if let (Some(low), Some(high)) = (low, high) {
                if !self.ctx.types.is_refinement(low, high, base) {
                    let (parent_first, parent_last) =
                        self.ctx.types.discrete_bounds(base).unwrap_or((0, 0));
                    self.report(ErrorType::ConstraintViolation {
                        message: format!(
                            "range {low} .. {high} is outside the parent range \
                             {parent_first} .. {parent_last}"
                        ),
                        span: range.span,
                    });
                }
            }

            (
                low.map(Bound::Int).unwrap_or(Bound::Dynamic),
                high.map(Bound::Int).unwrap_or(Bound::Dynamic),
            )
        };

        let empty = self.ctx.interner.intern_folded("");
        let kind = self.ctx.types.get(base).kind.clone();
        self.ctx.types.add(TypeDescriptor {
            name: empty,
            kind,
            base: Some(base),
            constraint: Some(Constraint::Range { first, last }),
        })
    }

    /// An index constraint on an unconstrained array type, or a
    /// discriminant constraint on a record type.
    fn subtype_with_composite(
        &mut self,
        base: TypeId,
        elems: &mut [ConstraintElem],
        span: shared_context::Span,
    ) -> TypeId {
        let empty = self.ctx.interner.intern_folded("");

        if self.ctx.types.is_array(base) {
            let index_types: Vec<TypeId> = self
                .ctx
                .types
                .array_indexes(base)
                .map(|ix| ix.to_vec())
                .unwrap_or_default();
            if elems.len() != index_types.len() {
                self.report(ErrorType::WrongArgumentCount { span });
            }

            let mut static_ranges = Vec::new();
            for (elem, index_ty) in elems.iter_mut().zip(index_types.iter()) {
                match &mut elem.kind {
                    ConstraintElemKind::Range(range) => {
                        let _ = self.analyze_expr(&mut range.low, Some(*index_ty));
                        let _ = self.analyze_expr(&mut range.high, Some(*index_ty));
                        if let (Some(low), Some(high)) = (
                            static_eval::eval_int(&range.low, self.ctx),
                            static_eval::eval_int(&range.high, self.ctx),
                        ) {
                            static_ranges.push((low, high));
                        }
                    }
                    ConstraintElemKind::Expr(mark) => {
                        // a bare subtype mark supplies its own bounds
                        let mark_ty = self.resolve_type_mark(mark);
                        if let Some(bounds) = self.ctx.types.discrete_bounds(mark_ty) {
                            static_ranges.push(bounds);
                        }
                    }
                }
            }

            // dynamic bounds stay with the declaration; the table
            // only records fully static index constraints
            let constraint = (static_ranges.len() == index_types.len()).then_some(
                Constraint::Index {
                    ranges: static_ranges,
                },
            );
            let kind = self.ctx.types.get(base).kind.clone();
            return self.ctx.types.add(TypeDescriptor {
                name: empty,
                kind,
                base: Some(base),
                constraint,
            });
        }

        if self.ctx.types.is_record(base) {
            let discriminants = match self.ctx.types.structural_kind(base) {
                TypeKind::Record { discriminants, .. } => discriminants.clone(),
                _ => Vec::new(),
            };
            if elems.len() != discriminants.len() {
                self.report(ErrorType::WrongArgumentCount { span });
            }

            let mut values = vec![None; discriminants.len()];
            let mut position = 0usize;
            for elem in elems.iter_mut() {
                let slot = match elem.name {
                    Some(name) => discriminants.iter().position(|d| d.name == name.symbol),
                    None => {
                        let slot = position;
                        position += 1;
                        Some(slot)
                    }
                };
                let Some(slot) = slot.filter(|&s| s < discriminants.len()) else {
                    self.report(ErrorType::WrongArgumentCount { span: elem.span });
                    continue;
                };
                if let ConstraintElemKind::Expr(value) = &mut elem.kind {
                    let _ = self.analyze_expr(value, Some(discriminants[slot].ty));
                    values[slot] = static_eval::eval_int(value, self.ctx);
                }
            }

            let constraint = values
                .iter()
                .all(Option::is_some)
                .then(|| Constraint::Discriminant {
                    values: values.into_iter().flatten().collect(),
                });
            let kind = self.ctx.types.get(base).kind.clone();
            return self.ctx.types.add(TypeDescriptor {
                name: empty,
                kind,
                base: Some(base),
                constraint,
            });
        }

        self.report(ErrorType::Unsupported {
            message: "this type takes no index or discriminant constraint".to_string(),
            span,
        });
        TypeId::INVALID
    }

    /// A discrete range in a for loop, array definition, or slice:
    /// `L .. H`, a type mark, `T range L .. H`, or `A'RANGE`.
    pub(crate) fn resolve_discrete_range(&mut self, range: &mut DiscreteRange) -> TypeId {
        let ty = match (&mut range.mark, &mut range.range) {
            (None, Some(bounds)) => {
                let low_ty = self.analyze_expr(&mut bounds.low, None);
                let hint = (low_ty.is_valid() && !self.ctx.types.is_universal(low_ty))
                    .then_some(low_ty);
                let high_ty = self.analyze_expr(&mut bounds.high, hint);

                let common = if low_ty.is_valid() && !self.ctx.types.is_universal(low_ty) {
                    low_ty
                } else if high_ty.is_valid() && !self.ctx.types.is_universal(high_ty) {
                    high_ty
                } else {
                    self.ctx.types.well_known.integer
                };
                self.ensure_type(&mut bounds.low, common);
                self.ensure_type(&mut bounds.high, common);
                common
            }
            (Some(mark), Some(bounds)) => {
                let ty = self.resolve_type_mark(mark);
                let _ = self.analyze_expr(&mut bounds.low, Some(ty));
                let _ = self.analyze_expr(&mut bounds.high, Some(ty));
                ty
            }
            (Some(mark), None) => {
                // `A'RANGE` over an array object or type
                if let ExprKind::Attribute {
                    prefix, attribute, ..
                } = &mut mark.kind
                {
                    let attribute = *attribute;
                    if self.ctx.interner.lookup(attribute.symbol) == "range" {
                        let prefix_ty = match self.type_mark_of(prefix) {
                            Some(ty) => ty,
                            None => self.analyze_expr(prefix, None),
                        };
                        let index_ty = if self.ctx.types.is_array(prefix_ty) {
                            self.ctx
                                .types
                                .array_indexes(prefix_ty)
                                .and_then(|ix| ix.first().copied())
                                .unwrap_or(TypeId::INVALID)
                        } else {
                            prefix_ty
                        };
                        mark.ty = prefix_ty;
                        range.ty = index_ty;
                        return index_ty;
                    }
                }
                self.resolve_type_mark(mark)
            }
            (None, None) => TypeId::INVALID,
        };

        range.ty = ty;
        ty
    }

    /// A name that must denote an exception; returns its symbol and
    /// runtime identity.
    pub(crate) fn resolve_exception(
        &mut self,
        name: &mut Expression,
    ) -> Option<(SymbolId, i64)> {
        let span = name.span;
        let candidates = match &mut name.kind {
            ExprKind::Identifier(ident) => self.ctx.symbols.lookup(ident.symbol),
            ExprKind::Selected { prefix, selector } => {
                let selector = *selector;
                match self.package_scope_of_name(prefix) {
                    Some(scope) => self.ctx.symbols.lookup_selected(scope, selector.symbol),
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        };

        let found = candidates.into_iter().find_map(|sym| {
            match self.ctx.symbols.get(sym).kind {
                SymbolKind::Exception { identity } => Some((sym, identity)),
                _ => None,
            }
        });

        match found {
            Some((sym, identity)) => {
                name.sym = Some(sym);
                Some((sym, identity))
            }
            None => {
                self.report(ErrorType::NotAnException { span });
                None
            }
        }
    }
}
