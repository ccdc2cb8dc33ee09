// Statement analysis: assignment legality, call statements, control
// flow, case coverage, loops and exits, blocks, exception handlers,
// and the tasking statements.

use crate::analyzer::Analyzer;
use crate::overload::CallContext;
use crate::semantic_error::ErrorType;
use parser::ast::*;
use shared_context::symbols::{ScopeKind, SymbolEntry, SymbolKind, Visibility};
use shared_context::types::TypeId;
use shared_context::Span;

impl<'src, 'ctx, 'ses> Analyzer<'src, 'ctx, 'ses> {
    pub(crate) fn analyze_statements(&mut self, statements: &mut Vec<Statement>) {
        for statement in statements.iter_mut() {
            self.analyze_statement(statement);
        }
    }

    fn analyze_statement(&mut self, statement: &mut Statement) {
        let span = statement.span;
        match &mut statement.kind {
            StatementKind::Null => {}

            StatementKind::Assignment { target, value } => {
                let target_ty = self.analyze_expr(target, None);
                self.require_variable(target);
                let found = self.analyze_expr(value, Some(target_ty));
                if !self.ctx.types.compatible(target_ty, found) {
                    self.report(ErrorType::TypeMismatch {
                        expected: target_ty,
                        found,
                        span: value.span,
                    });
                } else {
                    self.check_static_fit(value, target_ty);
                }
            }

            StatementKind::Call(expr) => self.analyze_call_statement(expr),

            StatementKind::If { arms, else_arm } => {
                let boolean = self.ctx.types.well_known.boolean;
                for arm in arms.iter_mut() {
                    let cond_ty = self.analyze_expr(&mut arm.condition, Some(boolean));
                    if cond_ty.is_valid()
                        && self.ctx.types.base_of(cond_ty) != boolean
                    {
                        self.report(ErrorType::TypeMismatch {
                            expected: boolean,
                            found: cond_ty,
                            span: arm.condition.span,
                        });
                    }
                    self.analyze_statements(&mut arm.statements);
                }
                if let Some(else_statements) = else_arm {
                    self.analyze_statements(else_statements);
                }
            }

            StatementKind::Case { selector, arms } => {
                let selector_ty = self.analyze_expr(selector, None);
                let selector_ty = if self.ctx.types.is_universal(selector_ty) {
                    let integer = self.ctx.types.well_known.integer;
                    self.ensure_type(selector, integer);
                    integer
                } else {
                    selector_ty
                };
                if selector_ty.is_valid() && !self.ctx.types.is_discrete(selector_ty) {
                    self.report(ErrorType::TypeMismatch {
                        expected: self.ctx.types.well_known.integer,
                        found: selector_ty,
                        span: selector.span,
                    });
                }

                let mut covered: Vec<(i64, i64, Span)> = Vec::new();
                let mut has_others = false;
                for arm in arms.iter_mut() {
                    for choice in arm.choices.iter_mut() {
                        match self.analyze_choice(choice, selector_ty) {
                            Some((low, high)) => covered.push((low, high, choice.span)),
                            None => has_others |= matches!(choice.kind, ChoiceKind::Others),
                        }
                    }
                    self.analyze_statements(&mut arm.statements);
                }

                self.check_case_coverage(selector_ty, covered, has_others, span);
            }

            StatementKind::Loop { name, scheme, body } => {
                let loop_name = name.map(|ident| ident.symbol);
                let mut opened_scope = false;

                match scheme {
                    LoopScheme::Infinite => {}
                    LoopScheme::While(condition) => {
                        let boolean = self.ctx.types.well_known.boolean;
                        let cond_ty = self.analyze_expr(condition, Some(boolean));
                        if cond_ty.is_valid() && self.ctx.types.base_of(cond_ty) != boolean {
                            self.report(ErrorType::TypeMismatch {
                                expected: boolean,
                                found: cond_ty,
                                span: condition.span,
                            });
                        }
                    }
                    LoopScheme::For {
                        variable,
                        range,
                        sym,
                        ..
                    } => {
                        let index_ty = self.resolve_discrete_range(range);
                        let scope = self.ctx.symbols.open_scope(ScopeKind::Loop);
                        opened_scope = true;
                        // the induction variable reads as a constant
                        let declared = self.ctx.symbols.declare(SymbolEntry {
                            name: variable.symbol,
                            kind: SymbolKind::Constant,
                            ty: index_ty,
                            decl_span: variable.span,
                            mangled: String::new(),
                            external: false,
                            visibility: Visibility::Visible,
                            scope,
                        });
                        *sym = Some(declared);
                    }
                }

                self.loop_stack.push(loop_name);
                self.analyze_statements(body);
                self.loop_stack.pop();

                if opened_scope {
                    self.ctx.symbols.close_scope();
                }
            }

            StatementKind::Exit { name, condition } => {
                if self.loop_stack.is_empty() {
                    self.report(ErrorType::ExitOutsideLoop { span });
                } else if let Some(target) = name {
                    let wanted = Some(target.symbol);
                    if !self.loop_stack.iter().any(|entry| *entry == wanted) {
                        self.report(ErrorType::UnknownLoopName {
                            name: target.symbol,
                            span: target.span,
                        });
                    }
                }
                if let Some(condition) = condition {
                    let boolean = self.ctx.types.well_known.boolean;
                    let cond_ty = self.analyze_expr(condition, Some(boolean));
                    if cond_ty.is_valid() && self.ctx.types.base_of(cond_ty) != boolean {
                        self.report(ErrorType::TypeMismatch {
                            expected: boolean,
                            found: cond_ty,
                            span: condition.span,
                        });
                    }
                }
            }

            StatementKind::Return(value) => match self.return_stack.last().copied() {
                None => self.report(ErrorType::ReturnOutsideSubprogram { span }),
                Some(None) => {
                    if value.is_some() {
                        self.report(ErrorType::UnexpectedReturnValue { span });
                    }
                }
                Some(Some(result_ty)) => match value {
                    None => self.report(ErrorType::MissingReturnValue { span }),
                    Some(value) => {
                        let found = self.analyze_expr(value, Some(result_ty));
                        if !self.ctx.types.compatible(result_ty, found) {
                            self.report(ErrorType::TypeMismatch {
                                expected: result_ty,
                                found,
                                span: value.span,
                            });
                        }
                    }
                },
            },

            StatementKind::Block {
                decls,
                statements,
                handlers,
                suppress,
            } => {
                self.suppress.enter_region();
                self.ctx.symbols.open_scope(ScopeKind::Block);

                self.analyze_declarations(decls);
                self.analyze_statements(statements);
                self.analyze_handlers(handlers);

                *suppress = self.suppress.active();
                self.ctx.symbols.close_scope();
                self.suppress.leave_region();
            }

            StatementKind::Raise(name) => match name {
                Some(name) => {
                    let _ = self.resolve_exception(name);
                }
                None => {
                    if self.handler_depth == 0 {
                        self.report(ErrorType::RaiseOutsideHandler { span });
                    }
                }
            },

            StatementKind::Delay(amount) => {
                let duration = self.ctx.types.well_known.duration;
                let found = self.analyze_expr(amount, Some(duration));
                if found.is_valid() && !self.ctx.types.is_real(found) {
                    self.report(ErrorType::TypeMismatch {
                        expected: duration,
                        found,
                        span: amount.span,
                    });
                }
            }

            StatementKind::Accept {
                entry,
                params,
                body,
                sym,
                ..
            } => {
                let Some(&entry_scope) = self.task_scopes.last() else {
                    self.report(ErrorType::Unsupported {
                        message: "an accept statement only appears inside a task body"
                            .to_string(),
                        span,
                    });
                    return;
                };

                let found = self
                    .ctx
                    .symbols
                    .lookup_in(entry_scope, entry.symbol)
                    .into_iter()
                    .find(|&candidate| {
                        matches!(self.ctx.symbols.get(candidate).kind, SymbolKind::Entry { .. })
                    });
                let Some(entry_sym) = found else {
                    self.report(ErrorType::UndeclaredIdentifier {
                        name: entry.symbol,
                        span: entry.span,
                    });
                    return;
                };
                *sym = Some(entry_sym);

                if let Some(statements) = body {
                    let scope = self.ctx.symbols.open_scope(ScopeKind::Block);
                    for param in params.iter_mut() {
                        let ty = self.resolve_type_mark(&mut param.mark);
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
                    self.analyze_statements(statements);
                    self.ctx.symbols.close_scope();
                }
            }

            StatementKind::Select { arms, else_arm } => {
                let boolean = self.ctx.types.well_known.boolean;
                for arm in arms.iter_mut() {
                    if let Some(guard) = &mut arm.guard {
                        let guard_ty = self.analyze_expr(guard, Some(boolean));
                        if guard_ty.is_valid() && self.ctx.types.base_of(guard_ty) != boolean {
                            self.report(ErrorType::TypeMismatch {
                                expected: boolean,
                                found: guard_ty,
                                span: guard.span,
                            });
                        }
                    }
                    match &mut arm.kind {
                        SelectArmKind::Accept { accept, statements } => {
                            self.analyze_statement(accept);
                            self.analyze_statements(statements);
                        }
                        SelectArmKind::Delay { delay, statements } => {
                            let duration = self.ctx.types.well_known.duration;
                            let _ = self.analyze_expr(delay, Some(duration));
                            self.analyze_statements(statements);
                        }
                        SelectArmKind::Terminate => {}
                    }
                }
                if let Some(statements) = else_arm {
                    self.analyze_statements(statements);
                }
            }

            StatementKind::Abort(names) => {
                for name in names.iter_mut() {
                    let ty = self.analyze_expr(name, None);
                    if ty.is_valid() && !self.ctx.types.is_task(ty) {
                        self.report(ErrorType::TypeMismatch {
                            expected: TypeId::INVALID,
                            found: ty,
                            span: name.span,
                        });
                    }
                }
            }
        }
    }

    /// A procedure or entry call statement.
    fn analyze_call_statement(&mut self, expr: &mut Expression) {
        let span = expr.span;

        if matches!(expr.kind, ExprKind::ApplyUnresolved { .. }) {
            // calls with arguments share the expression machinery
            let (name, candidates) = {
                let ExprKind::ApplyUnresolved { prefix, .. } = &mut expr.kind else {
                    return;
                };
                match self.name_candidates(prefix) {
                    Some(found) => found,
                    None => {
                        self.report(ErrorType::Unsupported {
                            message: "this statement is not a call".to_string(),
                            span,
                        });
                        return;
                    }
                }
            };
            if candidates.is_empty() {
                self.report(ErrorType::UndeclaredIdentifier { name, span });
                return;
            }
            let callable: Vec<_> = candidates
                .into_iter()
                .filter(|&sym| {
                    matches!(
                        self.ctx.symbols.get(sym).kind,
                        SymbolKind::Subprogram { .. } | SymbolKind::Entry { .. }
                    )
                })
                .collect();
            if callable.is_empty() {
                self.report(ErrorType::NoOverloadMatch { name, span });
                return;
            }
            let _ = self.resolve_call(expr, name, callable, CallContext::Procedure);
            return;
        }

        // a parameterless call written as a bare name
        let (name, candidates) = match self.name_candidates(expr) {
            Some(found) => found,
            None => {
                self.report(ErrorType::Unsupported {
                    message: "this statement is not a call".to_string(),
                    span,
                });
                return;
            }
        };
        if candidates.is_empty() {
            self.report(ErrorType::UndeclaredIdentifier { name, span });
            return;
        }

        let callable: Vec<_> = candidates
            .into_iter()
            .filter(|&sym| {
                match &self.ctx.symbols.get(sym).kind {
                    SymbolKind::Subprogram { signature } | SymbolKind::Entry { signature } => {
                        signature.params.iter().all(|p| p.has_default)
                            && signature.result.is_none()
                    }
                    _ => false,
                }
            })
            .collect();

        match callable.len() {
            0 => self.report(ErrorType::NoOverloadMatch { name, span }),
            1 => {
                let sym = callable[0];
                let prefix = expr.clone();
                expr.kind = ExprKind::Call {
                    prefix: Box::new(prefix),
                    args: Vec::new(),
                };
                expr.sym = Some(sym);
                expr.ty = TypeId::INVALID;
            }
            _ => self.report(ErrorType::AmbiguousOverload { name, span }),
        }
    }

    /// Verify the static coverage of a case statement per the value
    /// range of the selector's subtype.
    fn check_case_coverage(
        &mut self,
        selector_ty: TypeId,
        mut covered: Vec<(i64, i64, Span)>,
        has_others: bool,
        span: Span,
    ) {
        covered.sort_by_key(|(low, _, _)| *low);

        // overlaps are illegal regardless of others
        for pair in covered.windows(2) {
            let (_, first_high, _) = pair[0];
            let (second_low, _, second_span) = pair[1];
            if second_low <= first_high {
                self.report(ErrorType::DuplicateChoice { span: second_span });
            }
        }

        if has_others {
            return;
        }

        let Some((first, last)) = self.ctx.types.discrete_bounds(selector_ty) else {
            // dynamic selector subtype: only others can close it
            self.report(ErrorType::MissingOthers { span });
            return;
        };

        let mut cursor = first;
        for (low, high, _) in covered {
            if low > cursor {
                self.report(ErrorType::MissingOthers { span });
                return;
            }
            match high.checked_add(1) {
                Some(next) => cursor = cursor.max(next),
                None => return, // covered through i64::MAX
            }
        }
        if cursor <= last {
            self.report(ErrorType::MissingOthers { span });
        }
    }

    pub(crate) fn analyze_handlers(&mut self, handlers: &mut Vec<ExceptionHandler>) {
        for handler in handlers.iter_mut() {
            for choice in handler.choices.iter_mut() {
                if let ExceptionChoice::Name(name) = choice {
                    let _ = self.resolve_exception(name);
                }
            }
            self.handler_depth += 1;
            self.analyze_statements(&mut handler.statements);
            self.handler_depth -= 1;
        }
    }
}
