// Package lowering and the program entry.
//
// A package produces three things: one global cell run per
// package-level variable, an elaboration function that initializes
// them in declaration order behind a once-flag, and its subprogram
// bodies. The spec compile emits `<name>__elab_spec`; the body
// compile (or the spec itself, when no body exists) emits
// `<name>__elab`, which is what clients call. The entry epilogue
// elaborates every package dependency in topological order, then
// calls the designated main procedure.

use crate::{IrGen, Storage};
use crate::ssa::{
    EntryPoint, Function, GlobalVar, Instruction, Operand, ValueKind,
};
use parser::ast::{self, LibraryItem};
use shared_context::units::UnitKind;

impl<'src, 'ctx> IrGen<'src, 'ctx> {
    /// Lower one compilation unit into the module.
    pub(crate) fn gen_unit(
        &mut self,
        unit: &ast::CompilationUnit,
        emit_entry: bool,
        package_has_body: bool,
    ) {
        match &unit.item {
            LibraryItem::Subprogram(body) => {
                self.suppress = body.suppress;
                self.gen_subprogram(body);
                if emit_entry {
                    if let Some(sym) = body.spec.sym {
                        let main = self.ctx.symbols.get(sym).mangled.clone();
                        self.gen_entry(unit.item.name().symbol, main);
                    }
                }
            }
            LibraryItem::PackageSpec(spec) => {
                self.gen_package_spec(spec, package_has_body);
            }
            LibraryItem::PackageBody(body) => self.gen_package_body(body),
            // generic templates emit nothing; their instances were
            // rewritten into plain packages during analysis
            LibraryItem::Generic(_) | LibraryItem::Instance(_) => {}
        }
    }

    /// The program entry: elaborate the with-closure in dependency
    /// order, run the main procedure, exit 0.
    fn gen_entry(&mut self, unit_name: shared_context::interner::Symbol, main: String) {
        let Some(unit_id) = self.ctx.units.by_name(unit_name) else {
            return;
        };
        let order = match self.ctx.units.elaboration_order(unit_id) {
            Ok(order) => order,
            Err(_) => return, // cycles were already rejected
        };

        let mut elab_calls = Vec::new();
        for dep in order {
            if dep == unit_id {
                continue;
            }
            let dep_unit = self.ctx.units.get(dep);
            if dep_unit.intrinsic || dep_unit.kind != UnitKind::Package {
                continue;
            }
            let name = format!("{}__elab", self.ctx.interner.lookup(dep_unit.name));
            self.declare_external(&name, Vec::new(), ValueKind::Void);
            elab_calls.push(name);
        }

        self.module.entry = Some(EntryPoint { elab_calls, main });
    }

    /// Lower a package spec compilation: globals, struct types, the
    /// spec elaboration function, and `__elab` itself when no body
    /// will provide it.
    fn gen_package_spec(&mut self, spec: &ast::PackageSpec, has_body: bool) {
        let Some(sym) = spec.sym else { return };
        let prefix = self.ctx.symbols.get(sym).mangled.clone();
        let flag = format!("{prefix}__elaborated");
        self.module.globals.push(GlobalVar {
            name: flag.clone(),
            cells: 1,
        });

        self.collect_package_globals(&spec.visible);
        self.collect_package_globals(&spec.private);

        // spec-level initializations
        let elab_spec = format!("{prefix}__elab_spec");
        self.gen_elab_function(&elab_spec, |g| {
            g.gen_package_level_inits(&spec.visible);
            g.gen_package_level_inits(&spec.private);
        });

        let saved_flag = std::mem::replace(&mut self.elab_flag, Some(flag.clone()));
        self.gen_package_subprograms(&spec.visible);
        self.gen_package_subprograms(&spec.private);
        self.elab_flag = saved_flag;

        if !has_body {
            let elab = format!("{prefix}__elab");
            let elab_spec = elab_spec.clone();
            let flag_name = flag.clone();
            self.gen_elab_function(&elab, move |g| {
                g.gen_once_guard(&flag_name);
                g.emit(Instruction::Call {
                    dst: None,
                    callee: elab_spec.clone(),
                    args: Vec::new(),
                });
            });
        }
    }

    /// Lower a package body compilation: body globals, subprogram
    /// bodies, and the package's `__elab`, which chains to the spec's
    /// initializations, elaborates the body declarations, then runs
    /// the initialization statements.
    fn gen_package_body(&mut self, body: &ast::PackageBody) {
        let Some(sym) = body.sym else { return };
        let prefix = self.ctx.symbols.get(sym).mangled.clone();
        let flag = format!("{prefix}__elaborated");

        self.suppress = body.suppress;
        self.collect_package_globals(&body.decls);

        let saved_flag = std::mem::replace(&mut self.elab_flag, Some(flag.clone()));
        self.gen_package_subprograms(&body.decls);
        self.elab_flag = saved_flag;

        let elab = format!("{prefix}__elab");
        let elab_spec = format!("{prefix}__elab_spec");
        self.declare_external(&elab_spec, Vec::new(), ValueKind::Void);

        let suppress = body.suppress;
        self.gen_elab_function(&elab, |g| {
            g.suppress = suppress;
            g.setup_statement_frame(&body.statements, &body.handlers);
            g.gen_once_guard(&flag);
            g.emit(Instruction::Call {
                dst: None,
                callee: elab_spec.clone(),
                args: Vec::new(),
            });
            g.gen_package_level_inits(&body.decls);
            if body.handlers.is_empty() {
                g.gen_statements(&body.statements);
            } else {
                g.gen_protected_region(
                    |g| g.gen_statements(&body.statements),
                    &body.handlers,
                );
            }
        });
    }

    /// Register global storage for every package-level object.
    fn collect_package_globals(&mut self, decls: &[ast::Declaration]) {
        for decl in decls {
            match decl {
                ast::Declaration::Object(object) => {
                    for &sym in &object.syms {
                        let entry = self.ctx.symbols.get(sym);
                        let name = entry.mangled.clone();
                        let cells = self.type_cells(entry.ty);
                        self.module.globals.push(GlobalVar {
                            name: name.clone(),
                            cells,
                        });
                        self.storage.insert(sym, Storage::Global(name));
                    }
                }
                ast::Declaration::Task(task) if !task.is_type => {
                    if let Some(sym) = task.sym {
                        let name = self.ctx.symbols.get(sym).mangled.clone();
                        self.module.globals.push(GlobalVar {
                            name: name.clone(),
                            cells: 1,
                        });
                        self.storage.insert(sym, Storage::Global(name));
                    }
                }
                ast::Declaration::Type(type_decl) => {
                    if self.ctx.types.is_record(type_decl.ty) {
                        self.record_name(type_decl.ty);
                    }
                }
                ast::Declaration::Package(nested) => {
                    self.collect_package_globals(&nested.visible);
                    self.collect_package_globals(&nested.private);
                }
                ast::Declaration::PackageBody(nested) => {
                    self.collect_package_globals(&nested.decls);
                }
                _ => {}
            }
        }
    }

    /// Object initializations of a package-level declarative part,
    /// in declaration order.
    fn gen_package_level_inits(&mut self, decls: &[ast::Declaration]) {
        for decl in decls {
            match decl {
                ast::Declaration::Object(object) => self.gen_object_elaboration(object),
                ast::Declaration::Task(task) if !task.is_type => {
                    if let Some(sym) = task.sym {
                        let addr = self.storage_addr(sym);
                        self.gen_task_activation(task.ty, &addr);
                    }
                }
                ast::Declaration::Package(nested) => {
                    self.gen_package_level_inits(&nested.visible);
                    self.gen_package_level_inits(&nested.private);
                }
                ast::Declaration::PackageBody(nested) => {
                    self.gen_package_level_inits(&nested.decls);
                    self.gen_statements(&nested.statements);
                }
                _ => {}
            }
        }
    }

    /// Emit the subprogram and task bodies of a package-level
    /// declarative part.
    fn gen_package_subprograms(&mut self, decls: &[ast::Declaration]) {
        for decl in decls {
            match decl {
                ast::Declaration::Subprogram(body) => self.gen_subprogram(body),
                ast::Declaration::TaskBody(body) => self.gen_task_body(body),
                ast::Declaration::Package(nested) => {
                    self.gen_package_subprograms(&nested.visible);
                    self.gen_package_subprograms(&nested.private);
                }
                ast::Declaration::PackageBody(nested) => {
                    self.gen_package_subprograms(&nested.decls);
                }
                _ => {}
            }
        }
    }

    /// Skip re-elaboration: `if flag /= 0 then return; flag := 1`.
    fn gen_once_guard(&mut self, flag: &str) {
        let addr = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::GlobalAddr {
            dst: addr,
            name: flag.to_string(),
        });
        let state = self.load(Operand::Temp(addr), ValueKind::I64);

        let run_label = self.make_label();
        let done_label = self.make_label();
        self.emit(Instruction::Branch {
            cond: state,
            then_label: done_label,
            else_label: run_label,
        });
        self.emit_label(done_label);
        self.emit(Instruction::Ret(None));
        self.emit_label(run_label);

        let addr = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::GlobalAddr {
            dst: addr,
            name: flag.to_string(),
        });
        self.store(Operand::ConstInt(1), Operand::Temp(addr));
    }

    /// Build one parameterless void function with the given body.
    fn gen_elab_function<F>(&mut self, name: &str, fill: F)
    where
        F: FnOnce(&mut Self),
    {
        let saved_frame = self.frame.take();
        let saved_depth = std::mem::replace(&mut self.depth, 0);
        let saved_function = self.begin_function();

        fill(self);
        self.emit(Instruction::Ret(None));

        let instructions = self.end_function(saved_function);
        self.module.functions.push(Function {
            name: name.to_string(),
            params: Vec::new(),
            ret: ValueKind::Void,
            instructions,
        });

        self.frame = saved_frame;
        self.depth = saved_depth;
    }
}
