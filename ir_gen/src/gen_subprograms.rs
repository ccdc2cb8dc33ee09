// Subprogram lowering.
//
// Every local, parameter and loop variable of a body lives in one
// frame of 8-byte cells allocated at entry; cell 0 holds the static
// link, so up-level references from nested subprograms are a chain of
// loads. Parameters arrive as SSA values (scalars of mode in) or as
// pointers (everything else) and are spilled into their frame cells
// in the prologue.

use crate::{IrGen, Storage};
use crate::runtime;
use crate::ssa::{Function, Instruction, Operand, Value, ValueKind};
use parser::ast::{self, StatementKind};
use shared_context::suppress::Check;
use shared_context::symbols::{Mode, SymbolKind};
use shared_context::types::{TypeId, TypeKind};

/// Running frame slot assignment for one function body.
struct FrameAlloc {
    next: u32,
}

impl FrameAlloc {
    fn new() -> Self {
        // cell 0 is the static link
        Self { next: 1 }
    }

    fn reserve(&mut self, cells: u32) -> u32 {
        let slot = self.next;
        self.next += cells.max(1);
        slot
    }
}

impl<'src, 'ctx> IrGen<'src, 'ctx> {
    /// Emit one subprogram body as a function, then restore the
    /// surrounding emission state (bodies nest in source order but
    /// functions are flat in the module).
    pub(crate) fn gen_subprogram(&mut self, body: &ast::SubprogramBody) {
        let Some(sym) = body.spec.sym else { return };
        let entry = self.ctx.symbols.get(sym).clone();
        let SymbolKind::Subprogram { signature } = &entry.kind else {
            return;
        };
        let signature = signature.clone();
        let level = self.subprogram_level(sym);

        let saved_frame = self.frame.take();
        let saved_depth = std::mem::replace(&mut self.depth, level);
        let saved_suppress = std::mem::replace(&mut self.suppress, body.suppress);
        let saved_ret = self.ret_ptr.take();
        let saved_result = self.current_result.take();
        let saved_handlers = std::mem::replace(&mut self.handler_depth, 0);
        let saved_loops = std::mem::take(&mut self.loop_exits);
        let saved_function = self.begin_function();

        // parameter list: result pointer, static link, formals
        let composite_result = signature
            .result
            .filter(|&ty| self.is_composite(ty));
        let mut params: Vec<(String, ValueKind)> = Vec::new();
        if composite_result.is_some() {
            params.push(("ret".to_string(), ValueKind::Ptr));
        }
        if level > 0 {
            params.push(("sl".to_string(), ValueKind::Ptr));
        }
        for param in &body.spec.params {
            let by_ref =
                !matches!(param.mode, Mode::In) || self.is_composite(param.mark.ty);
            let kind = if by_ref {
                ValueKind::Ptr
            } else {
                self.value_class(param.mark.ty)
            };
            for name in &param.names {
                let text = self.ctx.interner.lookup(name.symbol).to_string();
                params.push((text, kind));
            }
        }

        // parameters take the first temporaries
        self.temp_counter = params.len() as u32;

        // frame layout: parameters first, then every local of the
        // body including block locals and loop variables
        let mut alloc = FrameAlloc::new();
        let mut param_slots = Vec::new();
        for param in &body.spec.params {
            let by_ref =
                !matches!(param.mode, Mode::In) || self.is_composite(param.mark.ty);
            for &param_sym in &param.syms {
                let slot = alloc.reserve(1);
                self.storage.insert(
                    param_sym,
                    Storage::Frame {
                        depth: level,
                        slot,
                        by_ref,
                    },
                );
                param_slots.push(slot);
            }
        }
        self.assign_frame_slots(&body.decls, &mut alloc);
        self.assign_frame_slots_statements(&body.statements, &mut alloc);
        for handler in &body.handlers {
            self.assign_frame_slots_statements(&handler.statements, &mut alloc);
        }

        // prologue: the frame, the static link, parameter spills
        let frame = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::Alloca {
            dst: frame,
            cells: alloc.next,
        });
        self.frame = Some(frame);

        let mut next_param = 0u32;
        if composite_result.is_some() {
            self.ret_ptr = Some(Value {
                id: next_param,
                kind: ValueKind::Ptr,
            });
            next_param += 1;
        }
        if level > 0 {
            let link = Value {
                id: next_param,
                kind: ValueKind::Ptr,
            };
            next_param += 1;
            let addr = self.make_temp(ValueKind::Ptr);
            self.emit(Instruction::FieldAddr {
                dst: addr,
                base: Operand::Temp(frame),
                index: 0,
            });
            self.store(Operand::Temp(link), Operand::Temp(addr));
        }
        for ((_, kind), slot) in params
            .iter()
            .skip(next_param as usize)
            .zip(param_slots.iter())
        {
            let incoming = Value {
                id: next_param,
                kind: *kind,
            };
            next_param += 1;
            let addr = self.make_temp(ValueKind::Ptr);
            self.emit(Instruction::FieldAddr {
                dst: addr,
                base: Operand::Temp(frame),
                index: *slot,
            });
            self.store(Operand::Temp(incoming), Operand::Temp(addr));
        }

        // a package subprogram entered before its package elaborated
        // raises PROGRAM_ERROR through the runtime
        if let Some(flag) = self.elab_flag.clone() {
            if self.checked(Check::Elaboration) {
                let addr = self.make_temp(ValueKind::Ptr);
                self.emit(Instruction::GlobalAddr { dst: addr, name: flag });
                self.emit(Instruction::Call {
                    dst: None,
                    callee: "__ada_rt_elab_check".to_string(),
                    args: vec![Operand::Temp(addr)],
                });
            }
        }

        self.current_result = signature.result;

        let lower_body = |g: &mut Self| {
            g.gen_declarative_part(&body.decls);
            g.gen_statements(&body.statements);
        };
        if body.handlers.is_empty() {
            lower_body(self);
        } else {
            self.gen_protected_region(lower_body, &body.handlers);
        }

        // falling off the end: procedures return, functions are in
        // error (PROGRAM_ERROR per the language rules)
        if signature.result.is_some() {
            self.emit_raise(runtime::PROGRAM_ERROR);
            let zero = match composite_result {
                Some(_) => None,
                None => Some(match self.value_class(signature.result.unwrap()) {
                    ValueKind::F64 => Operand::ConstFloat(0.0),
                    _ => Operand::ConstInt(0),
                }),
            };
            self.emit(Instruction::Ret(zero));
        } else {
            self.emit(Instruction::Ret(None));
        }

        let instructions = self.end_function(saved_function);
        let ret = match signature.result {
            Some(ty) if !self.is_composite(ty) => self.value_class(ty),
            _ => ValueKind::Void,
        };
        self.module.functions.push(Function {
            name: entry.mangled.clone(),
            params,
            ret,
            instructions,
        });

        self.frame = saved_frame;
        self.depth = saved_depth;
        self.suppress = saved_suppress;
        self.ret_ptr = saved_ret;
        self.current_result = saved_result;
        self.handler_depth = saved_handlers;
        self.loop_exits = saved_loops;
    }

    /// Reserve frame cells for the objects of a declarative part.
    /// Nested subprogram bodies get their own frames and are skipped.
    fn assign_frame_slots(&mut self, decls: &[ast::Declaration], alloc: &mut FrameAlloc) {
        for decl in decls {
            match decl {
                ast::Declaration::Object(object) => {
                    for &sym in &object.syms {
                        let ty = self.ctx.symbols.get(sym).ty;
                        let cells = self.type_cells(ty);
                        let slot = alloc.reserve(cells);
                        self.storage.insert(
                            sym,
                            Storage::Frame {
                                depth: self.depth,
                                slot,
                                by_ref: false,
                            },
                        );
                    }
                }
                ast::Declaration::Task(task) if !task.is_type => {
                    // a single task object holds its runtime handle
                    if let Some(sym) = task.sym {
                        let slot = alloc.reserve(1);
                        self.storage.insert(
                            sym,
                            Storage::Frame {
                                depth: self.depth,
                                slot,
                                by_ref: false,
                            },
                        );
                    }
                }
                ast::Declaration::Package(spec) => {
                    self.assign_frame_slots(&spec.visible, alloc);
                    self.assign_frame_slots(&spec.private, alloc);
                }
                ast::Declaration::PackageBody(body) => {
                    self.assign_frame_slots(&body.decls, alloc);
                    self.assign_frame_slots_statements(&body.statements, alloc);
                }
                ast::Declaration::Type(type_decl) => {
                    if self.ctx.types.is_record(type_decl.ty) {
                        self.record_name(type_decl.ty);
                    }
                }
                _ => {}
            }
        }
    }

    /// Loop variables, block locals and accept formals also live in
    /// the enclosing subprogram's frame.
    fn assign_frame_slots_statements(
        &mut self,
        statements: &[ast::Statement],
        alloc: &mut FrameAlloc,
    ) {
        for statement in statements {
            match &statement.kind {
                StatementKind::Loop { scheme, body, .. } => {
                    if let ast::LoopScheme::For { sym: Some(sym), .. } = scheme {
                        let slot = alloc.reserve(1);
                        self.storage.insert(
                            *sym,
                            Storage::Frame {
                                depth: self.depth,
                                slot,
                                by_ref: false,
                            },
                        );
                    }
                    self.assign_frame_slots_statements(body, alloc);
                }
                StatementKind::Block {
                    decls,
                    statements,
                    handlers,
                    ..
                } => {
                    self.assign_frame_slots(decls, alloc);
                    self.assign_frame_slots_statements(statements, alloc);
                    for handler in handlers {
                        self.assign_frame_slots_statements(&handler.statements, alloc);
                    }
                }
                StatementKind::If { arms, else_arm } => {
                    for arm in arms {
                        self.assign_frame_slots_statements(&arm.statements, alloc);
                    }
                    if let Some(statements) = else_arm {
                        self.assign_frame_slots_statements(statements, alloc);
                    }
                }
                StatementKind::Case { arms, .. } => {
                    for arm in arms {
                        self.assign_frame_slots_statements(&arm.statements, alloc);
                    }
                }
                StatementKind::Accept { params, body, .. } => {
                    for param in params {
                        let by_ref = !matches!(param.mode, Mode::In)
                            || self.is_composite(param.mark.ty);
                        for &sym in &param.syms {
                            let slot = alloc.reserve(1);
                            self.storage.insert(
                                sym,
                                Storage::Frame {
                                    depth: self.depth,
                                    slot,
                                    by_ref,
                                },
                            );
                        }
                    }
                    if let Some(statements) = body {
                        self.assign_frame_slots_statements(statements, alloc);
                    }
                }
                StatementKind::Select { arms, else_arm } => {
                    for arm in arms {
                        match &arm.kind {
                            ast::SelectArmKind::Accept { accept, statements } => {
                                self.assign_frame_slots_statements(
                                    std::slice::from_ref(accept),
                                    alloc,
                                );
                                self.assign_frame_slots_statements(statements, alloc);
                            }
                            ast::SelectArmKind::Delay { statements, .. } => {
                                self.assign_frame_slots_statements(statements, alloc);
                            }
                            ast::SelectArmKind::Terminate => {}
                        }
                    }
                    if let Some(statements) = else_arm {
                        self.assign_frame_slots_statements(statements, alloc);
                    }
                }
                _ => {}
            }
        }
    }

    /// Give a synthesized function (a package elaboration body) a
    /// frame covering the loop variables, block locals and accept
    /// formals of its statements; package-level objects stay global.
    pub(crate) fn setup_statement_frame(
        &mut self,
        statements: &[ast::Statement],
        handlers: &[ast::ExceptionHandler],
    ) {
        let mut alloc = FrameAlloc::new();
        self.assign_frame_slots_statements(statements, &mut alloc);
        for handler in handlers {
            self.assign_frame_slots_statements(&handler.statements, &mut alloc);
        }
        let frame = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::Alloca {
            dst: frame,
            cells: alloc.next,
        });
        self.frame = Some(frame);
    }

    /// A task body lowers to a parameterless function the runtime
    /// starts on its own thread; an unhandled exception terminates
    /// the task.
    pub(crate) fn gen_task_body(&mut self, body: &ast::TaskBody) {
        // recover the task type by its name
        let task_ty = self.find_task_type(body.name.symbol);
        let Some(task_ty) = task_ty else { return };
        let name = self.task_body_name(task_ty);

        let saved_frame = self.frame.take();
        let saved_depth = std::mem::replace(&mut self.depth, 0);
        let saved_task = std::mem::replace(&mut self.current_task, Some(task_ty));
        let saved_handlers = std::mem::replace(&mut self.handler_depth, 0);
        let saved_loops = std::mem::take(&mut self.loop_exits);
        let saved_function = self.begin_function();

        let mut alloc = FrameAlloc::new();
        self.assign_frame_slots(&body.decls, &mut alloc);
        self.assign_frame_slots_statements(&body.statements, &mut alloc);
        for handler in &body.handlers {
            self.assign_frame_slots_statements(&handler.statements, &mut alloc);
        }

        let frame = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::Alloca {
            dst: frame,
            cells: alloc.next,
        });
        self.frame = Some(frame);

        let lower_body = |g: &mut Self| {
            g.gen_declarative_part(&body.decls);
            g.gen_statements(&body.statements);
        };
        if body.handlers.is_empty() {
            lower_body(self);
        } else {
            self.gen_protected_region(lower_body, &body.handlers);
        }

        self.emit(Instruction::Call {
            dst: None,
            callee: "__ada_rt_task_terminate".to_string(),
            args: Vec::new(),
        });
        self.emit(Instruction::Ret(None));

        let instructions = self.end_function(saved_function);
        self.module.functions.push(Function {
            name,
            params: Vec::new(),
            ret: ValueKind::Void,
            instructions,
        });

        self.frame = saved_frame;
        self.depth = saved_depth;
        self.current_task = saved_task;
        self.handler_depth = saved_handlers;
        self.loop_exits = saved_loops;
    }

    fn find_task_type(&self, name: shared_context::interner::Symbol) -> Option<TypeId> {
        self.ctx
            .types
            .iter()
            .find(|(_, descriptor)| {
                descriptor.name == name && matches!(descriptor.kind, TypeKind::Task { .. })
            })
            .map(|(id, _)| id)
    }
}
