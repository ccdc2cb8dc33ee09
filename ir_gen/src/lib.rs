// IR (Intermediate Representation) generator.
//
// This crate lowers the analyzed AST of one compilation unit into the
// textual SSA form's in-memory model. Expressions lower to single
// assignment temporaries; statements lower to explicit labels,
// branches and stores; subprograms become flat functions with frame
// cells for their locals and a static link for nested ones.

pub mod runtime;
pub mod ssa;

mod checks;
mod gen_expressions;
mod gen_packages;
mod gen_statements;
mod gen_subprograms;

use parser::ast;
use shared_context::CompilerContext;
use shared_context::interner::Symbol;
use shared_context::suppress::SuppressMask;
use shared_context::symbols::{ScopeId, ScopeKind, SymbolId};
use shared_context::types::{TypeId, TypeKind};
use ssa::{
    FunctionDecl, Instruction, Label, Module, Operand, Value, ValueKind,
};
use std::collections::HashMap;

/// Lower one analyzed compilation unit to an IR module.
///
/// `emit_entry` asks for the program entry epilogue (the driver sets
/// it for the designated main procedure's unit). `package_has_body`
/// tells a package spec whether a body exists elsewhere, which
/// decides who emits the package's elaboration function.
pub fn lower_unit(
    ctx: &mut CompilerContext,
    unit: &ast::CompilationUnit,
    emit_entry: bool,
    package_has_body: bool,
) -> Module {
    let mut ir_gen = IrGen::new(ctx);
    ir_gen.gen_unit(unit, emit_entry, package_has_body);
    ir_gen.module
}

/// Where a symbol's data lives at run time.
#[derive(Clone, Debug)]
pub(crate) enum Storage {
    /// A run of cells in some enclosing subprogram's frame. `by_ref`
    /// means the slot holds a pointer to the data instead of the
    /// data itself (reference-mode parameters).
    Frame {
        depth: u32,
        slot: u32,
        by_ref: bool,
    },
    /// A run of global cells, named after the mangled symbol.
    Global(String),
}

/// Generates the IR for one compilation unit.
///
/// Holds the codegen context the lowering needs: the output module
/// under construction, monotonically increasing counters for
/// temporaries and labels, the loop-exit label stack, the exception
/// handler nesting depth, and the string and forward-declaration
/// pools (both live in the module).
pub struct IrGen<'src, 'ctx> {
    pub(crate) ctx: &'ctx mut CompilerContext<'src>,
    pub(crate) module: Module,

    /// Counter used to generate unique temporaries within a function.
    temp_counter: u32,
    /// Counter used to generate unique labels within a function.
    label_counter: u32,

    /// Innermost loop last: the loop's optional name and its exit
    /// label. `exit` pops nothing; it just branches.
    pub(crate) loop_exits: Vec<(Option<Symbol>, Label)>,
    /// Exception handler nesting inside the current function.
    pub(crate) handler_depth: usize,

    /// Storage of every symbol lowered so far.
    pub(crate) storage: HashMap<SymbolId, Storage>,
    /// Instructions of the function currently being built.
    pub(crate) code: Vec<Instruction>,
    /// Frame base pointer of the current function.
    pub(crate) frame: Option<Value>,
    /// Static nesting level of the current function; library level
    /// subprograms are 0.
    pub(crate) depth: u32,
    /// Active check suppression, from the analyzed body annotations.
    pub(crate) suppress: SuppressMask,

    /// Result pointer parameter of the current function, for
    /// composite-returning functions.
    pub(crate) ret_ptr: Option<Value>,
    /// Declared result subtype of the current function.
    pub(crate) current_result: Option<TypeId>,
    /// Task type whose body is being lowered, for accept statements.
    pub(crate) current_task: Option<TypeId>,
    /// Once-flag global of the package being lowered; subprogram
    /// entries consult it for the ELABORATION check.
    pub(crate) elab_flag: Option<String>,

    /// Names already given to lowered record types.
    record_names: HashMap<TypeId, String>,
}

impl<'src, 'ctx> IrGen<'src, 'ctx> {
    pub fn new(ctx: &'ctx mut CompilerContext<'src>) -> Self {
        Self {
            ctx,
            module: Module::new(),
            temp_counter: 0,
            label_counter: 0,
            loop_exits: Vec::new(),
            handler_depth: 0,
            storage: HashMap::new(),
            code: Vec::new(),
            frame: None,
            depth: 0,
            suppress: SuppressMask::none(),
            ret_ptr: None,
            current_result: None,
            current_task: None,
            elab_flag: None,
            record_names: HashMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // temporaries, labels, emission
    // ------------------------------------------------------------------

    /// Creates a new temporary of the given kind. Temporaries are
    /// unique within a function; the counter resets per function.
    pub(crate) fn make_temp(&mut self, kind: ValueKind) -> Value {
        let id = self.temp_counter;
        self.temp_counter += 1;
        Value { id, kind }
    }

    /// Generates a unique label within the current function.
    pub(crate) fn make_label(&mut self) -> Label {
        let id = self.label_counter;
        self.label_counter += 1;
        Label(id)
    }

    pub(crate) fn emit(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    pub(crate) fn emit_label(&mut self, label: Label) {
        self.code.push(Instruction::LabelDef(label));
    }

    /// Reset the per-function state before building a new body.
    pub(crate) fn begin_function(&mut self) -> (Vec<Instruction>, u32, u32) {
        let saved_code = std::mem::take(&mut self.code);
        let saved_temps = std::mem::replace(&mut self.temp_counter, 0);
        let saved_labels = std::mem::replace(&mut self.label_counter, 0);
        (saved_code, saved_temps, saved_labels)
    }

    pub(crate) fn end_function(&mut self, saved: (Vec<Instruction>, u32, u32)) -> Vec<Instruction> {
        let body = std::mem::replace(&mut self.code, saved.0);
        self.temp_counter = saved.1;
        self.label_counter = saved.2;
        body
    }

    // ------------------------------------------------------------------
    // type layout
    // ------------------------------------------------------------------

    /// IR kind of a value of an Ada type: all discrete and fixed
    /// point types are i64, floats are f64, everything composite or
    /// access shaped is a pointer.
    pub(crate) fn value_class(&self, ty: TypeId) -> ValueKind {
        if !ty.is_valid() {
            return ValueKind::I64;
        }
        match self.ctx.types.structural_kind(ty) {
            TypeKind::Float { .. } | TypeKind::UniversalReal => ValueKind::F64,
            TypeKind::Access { .. }
            | TypeKind::Array { .. }
            | TypeKind::Record { .. }
            | TypeKind::Task { .. } => ValueKind::Ptr,
            _ => ValueKind::I64,
        }
    }

    pub(crate) fn is_composite(&self, ty: TypeId) -> bool {
        ty.is_valid() && (self.ctx.types.is_array(ty) || self.ctx.types.is_record(ty))
    }

    /// Storage size of a type in 8-byte cells. Arrays with static
    /// bounds carry their descriptor (data pointer, then one bounds
    /// pair per dimension) followed by the data itself; dynamic
    /// arrays hold only the descriptor and allocate their data at
    /// elaboration.
    pub(crate) fn type_cells(&self, ty: TypeId) -> u32 {
        if !ty.is_valid() {
            return 1;
        }
        match self.ctx.types.structural_kind(ty).clone() {
            TypeKind::Record { .. } => self
                .ctx
                .types
                .record_fields(ty)
                .iter()
                .map(|field| self.type_cells(field.ty))
                .sum::<u32>()
                .max(1),
            TypeKind::Array {
                component, indexes, ..
            } => {
                let desc = Self::descriptor_cells(indexes.len());
                match self.static_element_count(ty) {
                    Some(count) => desc + count as u32 * self.type_cells(component),
                    None => desc,
                }
            }
            _ => 1,
        }
    }

    /// Cells of an array descriptor: the data pointer plus one
    /// (first, last) pair per dimension.
    pub(crate) fn descriptor_cells(dims: usize) -> u32 {
        1 + 2 * dims as u32
    }

    /// Static element count of an array subtype, across all
    /// dimensions; None when any bound is dynamic.
    pub(crate) fn static_element_count(&self, ty: TypeId) -> Option<i64> {
        let ranges = self.static_index_ranges(ty)?;
        let mut count = 1i64;
        for (first, last) in ranges {
            count *= (last - first + 1).max(0);
        }
        Some(count)
    }

    /// Static per-dimension bounds of an array subtype.
    pub(crate) fn static_index_ranges(&self, ty: TypeId) -> Option<Vec<(i64, i64)>> {
        if !ty.is_valid() {
            return None;
        }
        // an explicit index constraint wins over the index subtypes
        let mut current = ty;
        loop {
            let descriptor = self.ctx.types.get(current);
            if let Some(shared_context::types::Constraint::Index { ranges }) =
                &descriptor.constraint
            {
                return Some(ranges.clone());
            }
            match descriptor.base {
                Some(parent) => current = parent,
                None => break,
            }
        }
        match self.ctx.types.structural_kind(ty) {
            TypeKind::Array {
                indexes,
                constrained: true,
                ..
            } => indexes
                .iter()
                .map(|&index| self.ctx.types.discrete_bounds(index))
                .collect(),
            _ => None,
        }
    }

    /// Cell offset of a record field within the record's storage.
    pub(crate) fn field_offset(&self, record: TypeId, field_index: usize) -> u32 {
        self.ctx
            .types
            .record_fields(record)
            .iter()
            .take(field_index)
            .map(|field| self.type_cells(field.ty))
            .sum()
    }

    /// Register and name the struct type for a record, once.
    pub(crate) fn record_name(&mut self, ty: TypeId) -> String {
        if let Some(name) = self.record_names.get(&ty) {
            return name.clone();
        }
        let base = self.ctx.types.structure_of(ty);
        let symbol = self.ctx.types.get(base).name;
        let text = self.ctx.interner.lookup(symbol);
        let name = if text.is_empty() {
            format!("rec{}", self.module.records.len())
        } else {
            text.to_string()
        };

        let fields = self
            .ctx
            .types
            .record_fields(ty)
            .iter()
            .map(|field| self.value_class(field.ty))
            .collect();
        self.module.records.push(ssa::RecordType {
            name: name.clone(),
            fields,
        });
        self.record_names.insert(ty, name.clone());
        self.record_names.insert(base, name.clone());
        name
    }

    // ------------------------------------------------------------------
    // storage access
    // ------------------------------------------------------------------

    /// Address of a symbol's storage as a pointer operand. Frame
    /// storage in an enclosing subprogram chases the static link the
    /// required number of levels (the link lives in frame cell 0).
    pub(crate) fn storage_addr(&mut self, sym: SymbolId) -> Operand {
        let storage = match self.storage.get(&sym) {
            Some(storage) => storage.clone(),
            None => {
                // a symbol from another unit: global by mangled name
                let name = self.ctx.symbols.get(sym).mangled.clone();
                Storage::Global(name)
            }
        };

        match storage {
            Storage::Global(name) => {
                let dst = self.make_temp(ValueKind::Ptr);
                self.emit(Instruction::GlobalAddr {
                    dst,
                    name,
                });
                Operand::Temp(dst)
            }
            Storage::Frame {
                depth,
                slot,
                by_ref,
            } => {
                let mut base = Operand::Temp(self.frame.expect("no frame in scope"));
                let mut hops = self.depth.saturating_sub(depth);
                while hops > 0 {
                    // frame cell 0 holds the enclosing frame's address
                    let link_addr = self.make_temp(ValueKind::Ptr);
                    self.emit(Instruction::FieldAddr {
                        dst: link_addr,
                        base,
                        index: 0,
                    });
                    let link = self.make_temp(ValueKind::Ptr);
                    self.emit(Instruction::Load {
                        dst: link,
                        addr: Operand::Temp(link_addr),
                    });
                    base = Operand::Temp(link);
                    hops -= 1;
                }

                let addr = self.make_temp(ValueKind::Ptr);
                self.emit(Instruction::FieldAddr {
                    dst: addr,
                    base,
                    index: slot,
                });
                if by_ref {
                    let data = self.make_temp(ValueKind::Ptr);
                    self.emit(Instruction::Load {
                        dst: data,
                        addr: Operand::Temp(addr),
                    });
                    Operand::Temp(data)
                } else {
                    Operand::Temp(addr)
                }
            }
        }
    }

    /// Load one cell from an address.
    pub(crate) fn load(&mut self, addr: Operand, kind: ValueKind) -> Operand {
        let dst = self.make_temp(kind);
        self.emit(Instruction::Load { dst, addr });
        Operand::Temp(dst)
    }

    pub(crate) fn store(&mut self, src: Operand, addr: Operand) {
        self.emit(Instruction::Store { src, addr });
    }

    /// Static nesting level of a subprogram symbol: how many
    /// subprogram scopes enclose its declaration.
    pub(crate) fn subprogram_level(&self, sym: SymbolId) -> u32 {
        let mut level = 0;
        let mut scope: Option<ScopeId> = Some(self.ctx.symbols.get(sym).scope);
        while let Some(current) = scope {
            let entry = self.ctx.symbols.scope(current);
            if matches!(entry.kind, ScopeKind::Subprogram) {
                level += 1;
            }
            scope = entry.parent;
        }
        level
    }

    /// Declare an externally defined subprogram so the prelude lists
    /// it; runtime intrinsics are already in the fixed prelude.
    pub(crate) fn declare_external(&mut self, name: &str, params: Vec<ValueKind>, ret: ValueKind) {
        if name.starts_with("__ada_rt_") {
            return;
        }
        if self.module.functions.iter().any(|f| f.name == name) {
            return;
        }
        self.module.declare(FunctionDecl {
            name: name.to_string(),
            params,
            ret,
        });
    }
}
