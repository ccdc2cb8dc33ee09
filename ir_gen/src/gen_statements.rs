// Statement lowering.
//
// Each statement lowers to instructions without producing a value.
// Control flow becomes explicit labels and branches: if/elsif/else
// turns into a diamond of blocks, case into a jump table or a
// comparison chain, loops into head/body/exit labels driven by the
// loop-exit stack, and exception handlers into the runtime's jump
// buffer protocol.

use crate::IrGen;
use crate::runtime;
use crate::ssa::{BinOp, Cond, Instruction, Label, Operand, ValueKind};
use parser::ast::{self, ExprKind, StatementKind};
use shared_context::suppress::Check;
use shared_context::symbols::SymbolKind;
use shared_context::types::TypeId;

impl<'src, 'ctx> IrGen<'src, 'ctx> {
    pub(crate) fn gen_statements(&mut self, statements: &[ast::Statement]) {
        for statement in statements {
            self.gen_statement(statement);
        }
    }

    pub(crate) fn gen_statement(&mut self, statement: &ast::Statement) {
        match &statement.kind {
            StatementKind::Null => {}

            StatementKind::Assignment { target, value } => self.gen_assignment(target, value),

            StatementKind::Call(expr) => {
                let _ = self.gen_call(expr);
            }

            StatementKind::If { arms, else_arm } => self.gen_if(arms, else_arm),

            StatementKind::Case { selector, arms } => self.gen_case(selector, arms),

            StatementKind::Loop { name, scheme, body } => self.gen_loop(name, scheme, body),

            StatementKind::Exit { name, condition } => self.gen_exit(name, condition),

            StatementKind::Return(value) => self.gen_return(value),

            StatementKind::Block {
                decls,
                statements,
                handlers,
                suppress,
            } => {
                let saved = std::mem::replace(&mut self.suppress, *suppress);
                if handlers.is_empty() {
                    self.gen_declarative_part(decls);
                    self.gen_statements(statements);
                } else {
                    self.gen_protected_region(
                        |g| {
                            g.gen_declarative_part(decls);
                            g.gen_statements(statements);
                        },
                        handlers,
                    );
                }
                self.suppress = saved;
            }

            StatementKind::Raise(name) => match name {
                Some(name) => {
                    let identity = name
                        .sym
                        .and_then(|sym| match self.ctx.symbols.get(sym).kind {
                            SymbolKind::Exception { identity } => Some(identity),
                            _ => None,
                        })
                        .unwrap_or(runtime::PROGRAM_ERROR);
                    self.emit_raise(identity);
                }
                None => {
                    self.emit(Instruction::Call {
                        dst: None,
                        callee: "__ada_rt_reraise".to_string(),
                        args: Vec::new(),
                    });
                }
            },

            StatementKind::Delay(amount) => {
                let value = self.gen_expr(amount);
                let seconds =
                    self.convert_numeric(value, amount.ty, self.ctx.types.well_known.float);
                self.emit(Instruction::Call {
                    dst: None,
                    callee: "__ada_rt_delay".to_string(),
                    args: vec![seconds],
                });
            }

            StatementKind::Accept {
                params, body, sym, ..
            } => self.gen_accept(params, body, *sym),

            StatementKind::Select { arms, else_arm } => self.gen_select(arms, else_arm),

            StatementKind::Abort(names) => {
                for name in names {
                    let handle = self.gen_expr(name);
                    self.emit(Instruction::Call {
                        dst: None,
                        callee: "__ada_rt_abort".to_string(),
                        args: vec![handle],
                    });
                }
            }
        }
    }

    /// Scalar assignment is a store; array assignment goes through
    /// the runtime's bounded copy; record assignment copies cells.
    fn gen_assignment(&mut self, target: &ast::Expression, value: &ast::Expression) {
        if self.ctx.types.is_array(target.ty) {
            let destination = self.gen_addr(target);
            let source = self.gen_expr(value);
            self.emit(Instruction::Call {
                dst: None,
                callee: "__ada_rt_array_copy".to_string(),
                args: vec![
                    destination,
                    source,
                    Operand::ConstInt(self.checked(Check::Length) as i64),
                ],
            });
            return;
        }

        if self.ctx.types.is_record(target.ty) {
            let destination = self.gen_addr(target);
            let source = self.gen_expr(value);
            let cells = self.type_cells(target.ty);
            self.copy_cells(source, destination, cells);
            return;
        }

        let destination = self.gen_addr(target);
        let new_value = self.gen_expr(value);
        if self.ctx.types.is_discrete(target.ty) {
            self.range_check(&new_value, target.ty);
        }
        self.store(new_value, destination);
    }

    /// `if/elsif/else` lowers to a diamond of blocks.
    ///
    /// ```text
    ///   c1 = <cond1>
    ///   cbr c1, arm1, next1
    /// arm1: ... jump end
    /// next1:
    ///   c2 = <cond2>
    ///   ...
    /// else: ...
    /// end:
    /// ```
    fn gen_if(&mut self, arms: &[ast::IfArm], else_arm: &Option<Vec<ast::Statement>>) {
        let end_label = self.make_label();

        for arm in arms {
            let arm_label = self.make_label();
            let next_label = self.make_label();

            let condition = self.gen_expr(&arm.condition);
            self.emit(Instruction::Branch {
                cond: condition,
                then_label: arm_label,
                else_label: next_label,
            });

            self.emit_label(arm_label);
            self.gen_statements(&arm.statements);
            self.emit(Instruction::Jump(end_label));
            self.emit_label(next_label);
        }

        if let Some(statements) = else_arm {
            self.gen_statements(statements);
        }
        self.emit(Instruction::Jump(end_label));
        self.emit_label(end_label);
    }

    /// `case` dispatches through a jump table when the covered value
    /// space is dense (span < 4x the number of choice ranges), and a
    /// comparison chain otherwise.
    fn gen_case(&mut self, selector: &ast::Expression, arms: &[ast::CaseArm]) {
        let value = self.gen_expr(selector);
        let end_label = self.make_label();

        // collect the static choice ranges per arm
        let mut arm_labels = Vec::with_capacity(arms.len());
        let mut others_label = None;
        let mut ranges: Vec<(i64, i64, Label)> = Vec::new();
        for arm in arms {
            let label = self.make_label();
            arm_labels.push(label);
            for choice in &arm.choices {
                match choice.value {
                    Some((low, high)) => ranges.push((low, high, label)),
                    None => others_label = Some(label),
                }
            }
        }

        let default_label = others_label.unwrap_or_else(|| arm_labels.last().copied().unwrap_or(end_label));

        let span = ranges
            .iter()
            .map(|(low, _, _)| *low)
            .min()
            .zip(ranges.iter().map(|(_, high, _)| *high).max());
        let dense = match span {
            Some((min, max)) => {
                let width = (max - min).saturating_add(1);
                !ranges.is_empty() && width < 4 * ranges.len() as i64 && width <= 512
            }
            None => false,
        };

        if dense {
            let (min, max) = span.unwrap();
            let mut targets = vec![default_label; (max - min + 1) as usize];
            for (low, high, label) in &ranges {
                for value in *low..=*high {
                    targets[(value - min) as usize] = *label;
                }
            }
            self.emit(Instruction::JumpTable {
                value,
                base: min,
                targets,
                default: default_label,
            });
        } else {
            for (low, high, label) in &ranges {
                let next = self.make_label();
                let matched = if low == high {
                    self.compare(
                        Cond::Eq,
                        ValueKind::I64,
                        value.clone(),
                        Operand::ConstInt(*low),
                    )
                } else {
                    let ge = self.compare(
                        Cond::Ge,
                        ValueKind::I64,
                        value.clone(),
                        Operand::ConstInt(*low),
                    );
                    let le = self.compare(
                        Cond::Le,
                        ValueKind::I64,
                        value.clone(),
                        Operand::ConstInt(*high),
                    );
                    self.binary(BinOp::And, ValueKind::I64, ge, le)
                };
                self.emit(Instruction::Branch {
                    cond: matched,
                    then_label: *label,
                    else_label: next,
                });
                self.emit_label(next);
            }
            self.emit(Instruction::Jump(default_label));
        }

        for (arm, label) in arms.iter().zip(arm_labels) {
            self.emit_label(label);
            self.gen_statements(&arm.statements);
            self.emit(Instruction::Jump(end_label));
        }
        self.emit_label(end_label);
    }

    /// All three loop forms share the head/body/exit label shape; the
    /// exit label goes on the loop-exit stack for `exit` statements.
    fn gen_loop(
        &mut self,
        name: &Option<shared_context::Ident>,
        scheme: &ast::LoopScheme,
        body: &[ast::Statement],
    ) {
        let head_label = self.make_label();
        let body_label = self.make_label();
        let exit_label = self.make_label();
        self.loop_exits
            .push((name.map(|ident| ident.symbol), exit_label));

        match scheme {
            ast::LoopScheme::Infinite => {
                self.emit(Instruction::Jump(head_label));
                self.emit_label(head_label);
                self.gen_statements(body);
                self.emit(Instruction::Jump(head_label));
            }

            // the condition re-evaluates on every iteration
            ast::LoopScheme::While(condition) => {
                self.emit(Instruction::Jump(head_label));
                self.emit_label(head_label);
                let value = self.gen_expr(condition);
                self.emit(Instruction::Branch {
                    cond: value,
                    then_label: body_label,
                    else_label: exit_label,
                });
                self.emit_label(body_label);
                self.gen_statements(body);
                self.emit(Instruction::Jump(head_label));
            }

            // bounds materialize once at entry; the induction
            // variable counts through them
            ast::LoopScheme::For {
                reverse,
                range,
                sym,
                ..
            } => {
                let (low, high) = self.gen_range_bounds(range);
                let Some(var_sym) = *sym else { return };

                let slot = self.storage_addr(var_sym);
                let (start, limit, step, cond) = if *reverse {
                    (high.clone(), low.clone(), -1i64, Cond::Ge)
                } else {
                    (low.clone(), high.clone(), 1i64, Cond::Le)
                };
                self.store(start, slot);

                self.emit(Instruction::Jump(head_label));
                self.emit_label(head_label);
                let slot = self.storage_addr(var_sym);
                let current = self.load(slot, ValueKind::I64);
                let running = self.compare(cond, ValueKind::I64, current.clone(), limit);
                self.emit(Instruction::Branch {
                    cond: running,
                    then_label: body_label,
                    else_label: exit_label,
                });

                self.emit_label(body_label);
                self.gen_statements(body);
                let slot = self.storage_addr(var_sym);
                let current = self.load(slot.clone(), ValueKind::I64);
                let next = self.binary(
                    BinOp::Add,
                    ValueKind::I64,
                    current,
                    Operand::ConstInt(step),
                );
                self.store(next, slot);
                self.emit(Instruction::Jump(head_label));
            }
        }

        self.loop_exits.pop();
        self.emit_label(exit_label);
    }

    /// The two bounds of a for-loop range, evaluated once.
    fn gen_range_bounds(&mut self, range: &ast::DiscreteRange) -> (Operand, Operand) {
        if let Some(bounds) = &range.range {
            let low = self.gen_expr(&bounds.low);
            let high = self.gen_expr(&bounds.high);
            return (low, high);
        }

        if let Some(mark) = &range.mark {
            // `A'RANGE` reads the array descriptor
            if let ExprKind::Attribute { prefix, attribute, .. } = &mark.kind {
                if self.ctx.interner.lookup(attribute.symbol) == "range"
                    && self.ctx.types.is_array(prefix.ty)
                {
                    let descriptor = self.gen_expr(prefix);
                    let first = self.descriptor_bound(&descriptor, 0, true);
                    let last = self.descriptor_bound(&descriptor, 0, false);
                    return (first, last);
                }
            }
            if let Some((first, last)) = self.ctx.types.discrete_bounds(mark.ty) {
                return (Operand::ConstInt(first), Operand::ConstInt(last));
            }
        }

        (Operand::ConstInt(0), Operand::ConstInt(-1))
    }

    /// `exit [NAME] [when COND]` branches to the matching loop's exit
    /// label.
    fn gen_exit(
        &mut self,
        name: &Option<shared_context::Ident>,
        condition: &Option<ast::Expression>,
    ) {
        let target = match name {
            None => self.loop_exits.last().map(|(_, label)| *label),
            Some(ident) => self
                .loop_exits
                .iter()
                .rev()
                .find(|(loop_name, _)| *loop_name == Some(ident.symbol))
                .map(|(_, label)| *label),
        };
        let Some(exit_label) = target else { return };

        match condition {
            None => {
                let after = self.make_label();
                self.emit(Instruction::Jump(exit_label));
                self.emit_label(after);
            }
            Some(condition) => {
                let after = self.make_label();
                let value = self.gen_expr(condition);
                self.emit(Instruction::Branch {
                    cond: value,
                    then_label: exit_label,
                    else_label: after,
                });
                self.emit_label(after);
            }
        }
    }

    fn gen_return(&mut self, value: &Option<ast::Expression>) {
        match value {
            None => self.emit(Instruction::Ret(None)),
            Some(value) => {
                let lowered = self.gen_expr(value);
                if self.is_composite(value.ty) {
                    // composite results copy into the caller's slot
                    if let Some(ret_ptr) = self.ret_ptr {
                        if self.ctx.types.is_array(value.ty) {
                            self.emit(Instruction::Call {
                                dst: None,
                                callee: "__ada_rt_array_copy".to_string(),
                                args: vec![
                                    Operand::Temp(ret_ptr),
                                    lowered,
                                    Operand::ConstInt(
                                        self.checked(Check::Length) as i64,
                                    ),
                                ],
                            });
                        } else {
                            let cells = self.type_cells(value.ty);
                            self.copy_cells(lowered, Operand::Temp(ret_ptr), cells);
                        }
                    }
                    self.emit(Instruction::Ret(None));
                } else {
                    if self.ctx.types.is_discrete(value.ty) {
                        if let Some(result_ty) = self.current_result {
                            self.range_check(&lowered, result_ty);
                        }
                    }
                    self.emit(Instruction::Ret(Some(lowered)));
                }
            }
        }
    }

    /// Wrap a region in the runtime's handler protocol.
    ///
    /// ```text
    ///   r = call __ada_rt_handler_push()
    ///   cbr r == 0, body, dispatch
    /// body:
    ///   <region>
    ///   call __ada_rt_handler_pop()
    ///   jump end
    /// dispatch:
    ///   <compare r against each handler's identities>
    ///   <unmatched: call __ada_rt_reraise()>
    /// end:
    /// ```
    pub(crate) fn gen_protected_region<F>(&mut self, region: F, handlers: &[ast::ExceptionHandler])
    where
        F: FnOnce(&mut Self),
    {
        let body_label = self.make_label();
        let dispatch_label = self.make_label();
        let end_label = self.make_label();

        let state = self.make_temp(ValueKind::I64);
        self.emit(Instruction::Call {
            dst: Some(state),
            callee: "__ada_rt_handler_push".to_string(),
            args: Vec::new(),
        });
        let first_pass = self.compare(
            Cond::Eq,
            ValueKind::I64,
            Operand::Temp(state),
            Operand::ConstInt(0),
        );
        self.emit(Instruction::Branch {
            cond: first_pass,
            then_label: body_label,
            else_label: dispatch_label,
        });

        self.emit_label(body_label);
        region(self);
        self.emit(Instruction::Call {
            dst: None,
            callee: "__ada_rt_handler_pop".to_string(),
            args: Vec::new(),
        });
        self.emit(Instruction::Jump(end_label));

        // the raise path re-enters here with the exception identity
        self.emit_label(dispatch_label);
        self.handler_depth += 1;
        let mut catch_all = None;
        let mut handler_labels = Vec::with_capacity(handlers.len());
        for handler in handlers {
            let label = self.make_label();
            handler_labels.push(label);
            for choice in &handler.choices {
                match choice {
                    ast::ExceptionChoice::Others => catch_all = Some(label),
                    ast::ExceptionChoice::Name(name) => {
                        let identity = name
                            .sym
                            .and_then(|sym| match self.ctx.symbols.get(sym).kind {
                                SymbolKind::Exception { identity } => Some(identity),
                                _ => None,
                            })
                            .unwrap_or(0);
                        let next = self.make_label();
                        let matched = self.compare(
                            Cond::Eq,
                            ValueKind::I64,
                            Operand::Temp(state),
                            Operand::ConstInt(identity),
                        );
                        self.emit(Instruction::Branch {
                            cond: matched,
                            then_label: label,
                            else_label: next,
                        });
                        self.emit_label(next);
                    }
                }
            }
        }
        match catch_all {
            Some(label) => self.emit(Instruction::Jump(label)),
            None => {
                // no handler matched: propagate to the caller's
                self.emit(Instruction::Call {
                    dst: None,
                    callee: "__ada_rt_reraise".to_string(),
                    args: Vec::new(),
                });
                self.emit(Instruction::Jump(end_label));
            }
        }

        for (handler, label) in handlers.iter().zip(handler_labels) {
            self.emit_label(label);
            self.gen_statements(&handler.statements);
            self.emit(Instruction::Jump(end_label));
        }
        self.handler_depth -= 1;

        self.emit_label(end_label);
    }

    // ------------------------------------------------------------------
    // tasking statements
    // ------------------------------------------------------------------

    /// `accept E [(...)] [do ... end]`: rendezvous begin, parameter
    /// binding from the runtime's argument buffer, body, rendezvous
    /// end.
    fn gen_accept(
        &mut self,
        params: &[ast::ParamSpec],
        body: &Option<Vec<ast::Statement>>,
        sym: Option<shared_context::symbols::SymbolId>,
    ) {
        let index = sym
            .map(|entry_sym| self.own_entry_index(entry_sym))
            .unwrap_or(0);

        let buffer = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::Call {
            dst: Some(buffer),
            callee: "__ada_rt_accept_begin".to_string(),
            args: vec![Operand::ConstInt(index)],
        });

        if let Some(statements) = body {
            // bind the formals to the marshalled buffer cells
            let mut slot = 0u32;
            for param in params {
                for &param_sym in &param.syms {
                    let addr = self.make_temp(ValueKind::Ptr);
                    self.emit(Instruction::FieldAddr {
                        dst: addr,
                        base: Operand::Temp(buffer),
                        index: slot,
                    });
                    let by_value = matches!(param.mode, shared_context::symbols::Mode::In)
                        && !self.is_composite(param.mark.ty);
                    let target = self.storage_addr(param_sym);
                    if by_value {
                        let value = self.load(Operand::Temp(addr), ValueKind::I64);
                        self.store(value, target);
                    } else {
                        let pointer = self.load(Operand::Temp(addr), ValueKind::Ptr);
                        self.store(pointer, target);
                    }
                    slot += 1;
                }
            }
            self.gen_statements(statements);
        }

        self.emit(Instruction::Call {
            dst: None,
            callee: "__ada_rt_accept_end".to_string(),
            args: Vec::new(),
        });
    }

    /// Index of an entry within the task type the current task body
    /// belongs to.
    fn own_entry_index(&self, entry_sym: shared_context::symbols::SymbolId) -> i64 {
        let entry_name = self.ctx.symbols.get(entry_sym).name;
        let Some(task_ty) = self.current_task else {
            return 0;
        };
        match self.ctx.types.structural_kind(task_ty) {
            shared_context::types::TypeKind::Task { entries } => entries
                .iter()
                .position(|&name| name == entry_name)
                .unwrap_or(0) as i64,
            _ => 0,
        }
    }

    /// Selective wait: the open alternatives' entry indices go into a
    /// table, the runtime picks one (or the delay, or the else part),
    /// and the result dispatches to the chosen arm.
    fn gen_select(&mut self, arms: &[ast::SelectArm], else_arm: &Option<Vec<ast::Statement>>) {
        let table = self.make_temp(ValueKind::Ptr);
        let cells = (arms.len() as u32).max(1);
        self.emit(Instruction::Alloca { dst: table, cells });

        let mut delay_value: Option<Operand> = None;
        let mut delay_arm: Option<usize> = None;

        for (index, arm) in arms.iter().enumerate() {
            // a closed alternative (false guard) is disabled with -1
            let enabled = match &arm.guard {
                Some(guard) => self.gen_expr(guard),
                None => Operand::ConstInt(1),
            };

            let entry_index = match &arm.kind {
                ast::SelectArmKind::Accept { accept, .. } => match &accept.kind {
                    StatementKind::Accept { sym, .. } => sym
                        .map(|entry_sym| self.own_entry_index(entry_sym))
                        .unwrap_or(0),
                    _ => 0,
                },
                ast::SelectArmKind::Delay { delay, .. } => {
                    let value = self.gen_expr(delay);
                    let seconds =
                        self.convert_numeric(value, delay.ty, self.ctx.types.well_known.float);
                    delay_value = Some(seconds);
                    delay_arm = Some(index);
                    -1
                }
                ast::SelectArmKind::Terminate => -2,
            };

            // slot = guard ? entry_index : -1
            let slot_value = self.make_temp(ValueKind::Ptr);
            self.emit(Instruction::Alloca { dst: slot_value, cells: 1 });
            self.store(Operand::ConstInt(-1), Operand::Temp(slot_value));
            let open_label = self.make_label();
            let closed_label = self.make_label();
            self.emit(Instruction::Branch {
                cond: enabled,
                then_label: open_label,
                else_label: closed_label,
            });
            self.emit_label(open_label);
            self.store(Operand::ConstInt(entry_index), Operand::Temp(slot_value));
            self.emit(Instruction::Jump(closed_label));
            self.emit_label(closed_label);

            let stored = self.load(Operand::Temp(slot_value), ValueKind::I64);
            let addr = self.make_temp(ValueKind::Ptr);
            self.emit(Instruction::FieldAddr {
                dst: addr,
                base: Operand::Temp(table),
                index: index as u32,
            });
            self.store(stored, Operand::Temp(addr));
        }

        let chosen = self.make_temp(ValueKind::I64);
        self.emit(Instruction::Call {
            dst: Some(chosen),
            callee: "__ada_rt_select".to_string(),
            args: vec![
                Operand::ConstInt(arms.len() as i64),
                Operand::Temp(table),
                delay_value.unwrap_or(Operand::ConstFloat(-1.0)),
                Operand::ConstInt(else_arm.is_some() as i64),
            ],
        });

        let end_label = self.make_label();
        let mut arm_labels = Vec::with_capacity(arms.len());
        for _ in arms {
            arm_labels.push(self.make_label());
        }
        let else_label = self.make_label();

        // -1 selects the else part; -2 selects the expired delay
        for (index, label) in arm_labels.iter().enumerate() {
            let next = self.make_label();
            let matched = self.compare(
                Cond::Eq,
                ValueKind::I64,
                Operand::Temp(chosen),
                Operand::ConstInt(index as i64),
            );
            self.emit(Instruction::Branch {
                cond: matched,
                then_label: *label,
                else_label: next,
            });
            self.emit_label(next);
        }
        let timed_out = self.compare(
            Cond::Eq,
            ValueKind::I64,
            Operand::Temp(chosen),
            Operand::ConstInt(-2),
        );
        let delay_label = delay_arm
            .map(|index| arm_labels[index])
            .unwrap_or(else_label);
        self.emit(Instruction::Branch {
            cond: timed_out,
            then_label: delay_label,
            else_label: else_label,
        });

        for (arm, label) in arms.iter().zip(arm_labels.iter()) {
            self.emit_label(*label);
            match &arm.kind {
                ast::SelectArmKind::Accept { accept, statements } => {
                    self.gen_statement(accept);
                    self.gen_statements(statements);
                }
                ast::SelectArmKind::Delay { statements, .. } => {
                    self.gen_statements(statements);
                }
                ast::SelectArmKind::Terminate => {
                    self.emit(Instruction::Call {
                        dst: None,
                        callee: "__ada_rt_task_terminate".to_string(),
                        args: Vec::new(),
                    });
                }
            }
            self.emit(Instruction::Jump(end_label));
        }

        self.emit_label(else_label);
        if let Some(statements) = else_arm {
            self.gen_statements(statements);
        }
        self.emit(Instruction::Jump(end_label));
        self.emit_label(end_label);
    }

    // ------------------------------------------------------------------
    // declarative part elaboration
    // ------------------------------------------------------------------

    /// Elaborate the declarations of a subprogram or block, in
    /// declaration order: object initializations, task activations,
    /// and the function bodies of nested subprograms and task bodies
    /// (emitted as separate functions).
    pub(crate) fn gen_declarative_part(&mut self, decls: &[ast::Declaration]) {
        for decl in decls {
            match decl {
                ast::Declaration::Object(object) => self.gen_object_elaboration(object),
                ast::Declaration::Subprogram(body) => self.gen_subprogram(body),
                ast::Declaration::TaskBody(body) => self.gen_task_body(body),
                ast::Declaration::Task(task) => self.gen_task_objects(task),
                ast::Declaration::Package(spec) => {
                    // a package nested in a subprogram elaborates its
                    // spec objects straight into the enclosing frame
                    self.gen_declarative_part(&spec.visible);
                    self.gen_declarative_part(&spec.private);
                }
                ast::Declaration::PackageBody(body) => {
                    self.gen_declarative_part(&body.decls);
                    self.gen_statements(&body.statements);
                }
                _ => {}
            }
        }
    }

    /// Initialize one declared object: array descriptors and data,
    /// record defaults and discriminants, then the explicit initial
    /// value.
    pub(crate) fn gen_object_elaboration(&mut self, object: &ast::ObjectDecl) {
        for &sym in &object.syms {
            let ty = self.ctx.symbols.get(sym).ty;
            let addr = self.storage_addr(sym);

            if self.ctx.types.is_task(ty) {
                self.gen_task_activation(ty, &addr);
                continue;
            }

            if self.ctx.types.is_array(ty) {
                self.gen_array_storage_init(ty, &addr, &object.subtype);
            } else if self.ctx.types.is_record(ty) {
                self.gen_record_defaults(ty, &addr);
                self.gen_discriminant_constraint(ty, &addr);
            }

            if let Some(init) = &object.init {
                if self.ctx.types.is_array(ty) {
                    let value = self.gen_expr(init);
                    self.emit(Instruction::Call {
                        dst: None,
                        callee: "__ada_rt_array_copy".to_string(),
                        args: vec![
                            addr,
                            value,
                            Operand::ConstInt(self.checked(Check::Length) as i64),
                        ],
                    });
                } else if self.ctx.types.is_record(ty) {
                    let value = self.gen_expr(init);
                    let cells = self.type_cells(ty);
                    self.copy_cells(value, addr, cells);
                } else {
                    let value = self.gen_expr(init);
                    if self.ctx.types.is_discrete(ty) {
                        self.range_check(&value, ty);
                    }
                    self.store(value, addr);
                }
            }
        }
    }

    /// Set up an array object's descriptor; dynamic bounds evaluate
    /// their constraint expressions and take heap data.
    fn gen_array_storage_init(
        &mut self,
        ty: TypeId,
        addr: &Operand,
        subtype: &ast::ObjectSubtype,
    ) {
        let Operand::Temp(descriptor) = addr.clone() else {
            return;
        };

        if let Some(ranges) = self.static_index_ranges(ty) {
            let data = self.make_temp(ValueKind::Ptr);
            self.emit(Instruction::FieldAddr {
                dst: data,
                base: addr.clone(),
                index: Self::descriptor_cells(ranges.len()),
            });
            self.store_descriptor_slot(descriptor, 0, Operand::Temp(data));
            for (dim, (first, last)) in ranges.iter().enumerate() {
                self.store_descriptor_slot(
                    descriptor,
                    1 + 2 * dim as u32,
                    Operand::ConstInt(*first),
                );
                self.store_descriptor_slot(
                    descriptor,
                    2 + 2 * dim as u32,
                    Operand::ConstInt(*last),
                );
            }
            return;
        }

        // dynamic bounds: evaluate the constraint expressions at
        // elaboration and allocate the data from the heap
        let mut bounds = Vec::new();
        if let ast::ObjectSubtype::Indication(indication) = subtype {
            if let Some(ast::AstConstraint::Composite(elems)) = &indication.constraint {
                for elem in elems {
                    if let ast::ConstraintElemKind::Range(range) = &elem.kind {
                        let low = self.gen_expr(&range.low);
                        let high = self.gen_expr(&range.high);
                        bounds.push((low, high));
                    }
                }
            }
        }
        if bounds.is_empty() {
            return;
        }

        let component = self
            .ctx
            .types
            .array_component(ty)
            .unwrap_or(TypeId::INVALID);
        let component_cells = self.type_cells(component) as i64;

        // total element count across dimensions
        let mut total = Operand::ConstInt(1);
        for (low, high) in &bounds {
            let span = self.binary(BinOp::Sub, ValueKind::I64, high.clone(), low.clone());
            let length = self.binary(BinOp::Add, ValueKind::I64, span, Operand::ConstInt(1));
            total = self.binary(BinOp::Mul, ValueKind::I64, total, length);
        }
        let bytes = self.binary(
            BinOp::Mul,
            ValueKind::I64,
            total,
            Operand::ConstInt(component_cells * 8),
        );
        let data = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::Call {
            dst: Some(data),
            callee: "__ada_rt_alloc".to_string(),
            args: vec![bytes],
        });
        let data = Operand::Temp(data);
        self.storage_check(&data);

        self.store_descriptor_slot(descriptor, 0, data);
        for (dim, (low, high)) in bounds.into_iter().enumerate() {
            self.store_descriptor_slot(descriptor, 1 + 2 * dim as u32, low);
            self.store_descriptor_slot(descriptor, 2 + 2 * dim as u32, high);
        }
    }

    /// Store the values of a discriminant constraint into the
    /// discriminant fields.
    fn gen_discriminant_constraint(&mut self, ty: TypeId, base: &Operand) {
        if !ty.is_valid() {
            return;
        }
        let values = {
            let mut current = ty;
            loop {
                let descriptor = self.ctx.types.get(current);
                if let Some(shared_context::types::Constraint::Discriminant { values }) =
                    &descriptor.constraint
                {
                    break Some(values.clone());
                }
                match descriptor.base {
                    Some(parent) => current = parent,
                    None => break None,
                }
            }
        };
        let Some(values) = values else { return };

        for (index, value) in values.iter().enumerate() {
            let offset = self.field_offset(ty, index);
            let addr = self.make_temp(ValueKind::Ptr);
            self.emit(Instruction::FieldAddr {
                dst: addr,
                base: base.clone(),
                index: offset,
            });
            self.store(Operand::ConstInt(*value), Operand::Temp(addr));
        }
    }

    /// `task NAME` objects and `T : TASK_TYPE` declarations create
    /// and start their runtime task at elaboration.
    fn gen_task_objects(&mut self, task: &ast::TaskDecl) {
        if task.is_type {
            return; // objects of the type activate where declared
        }
        // a single task: the declaration is also the object
        let Some(sym) = task.sym else { return };
        let addr = self.storage_addr(sym);
        self.gen_task_activation(task.ty, &addr);
    }

    pub(crate) fn gen_task_activation(&mut self, ty: TypeId, addr: &Operand) {
        let body_name = self.task_body_name(ty);
        let handle = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::Call {
            dst: Some(handle),
            callee: "__ada_rt_task_create".to_string(),
            args: vec![Operand::Func(body_name)],
        });
        self.store(Operand::Temp(handle), addr.clone());
        self.emit(Instruction::Call {
            dst: None,
            callee: "__ada_rt_task_start".to_string(),
            args: vec![Operand::Temp(handle)],
        });
    }

    /// The function name a task type's body lowers to.
    pub(crate) fn task_body_name(&mut self, ty: TypeId) -> String {
        let base = self.ctx.types.structure_of(ty);
        let symbol = self.ctx.types.get(base).name;
        let text = self.ctx.interner.lookup(symbol);
        let name = format!("{text}__task_body");
        self.declare_external(&name, vec![], ValueKind::Void);
        name
    }
}
