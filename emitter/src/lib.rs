// Serializes an IR module to its textual form.
//
// One file per compilation unit: a prelude of runtime declarations,
// named struct types for records, the string pool, forward
// declarations for every subprogram, function bodies with labeled
// basic blocks, and the epilogue holding the program entry when this
// unit carries the designated main procedure.

use ir_gen::runtime;
use ir_gen::ssa::{Function, Module, ValueKind};
use std::io;

mod write_instructions;

pub struct Emitter<'m> {
    module: &'m Module,
}

impl<'m> Emitter<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self { module }
    }

    /// Write the whole module: prelude, types, strings, forwards,
    /// bodies, epilogue.
    pub fn write_program(&self, out: &mut impl io::Write) -> io::Result<()> {
        self.write_prelude(out)?;
        self.write_types(out)?;
        self.write_string_pool(out)?;
        self.write_forward_declarations(out)?;
        for function in &self.module.functions {
            self.write_function(function, out)?;
        }
        self.write_epilogue(out)?;
        Ok(())
    }

    /// Convenience for tests: the module as one string.
    pub fn to_text(&self) -> String {
        let mut buffer = Vec::new();
        self.write_program(&mut buffer)
            .expect("writing to a vector cannot fail");
        String::from_utf8(buffer).expect("emitted IR is always valid text")
    }

    /// The fixed runtime ABI declarations every unit starts with.
    fn write_prelude(&self, out: &mut impl io::Write) -> io::Result<()> {
        writeln!(out, "; runtime")?;
        for decl in runtime::declarations() {
            self.write_declaration(&decl, out)?;
        }
        writeln!(out)
    }

    fn write_types(&self, out: &mut impl io::Write) -> io::Result<()> {
        if self.module.records.is_empty() {
            return Ok(());
        }
        writeln!(out, "; types")?;
        for record in &self.module.records {
            let fields: Vec<&str> = record
                .fields
                .iter()
                .map(|kind| Emitter::kind_name(*kind))
                .collect();
            writeln!(out, "struct %{} = {{ {} }}", record.name, fields.join(", "))?;
        }
        writeln!(out)
    }

    fn write_string_pool(&self, out: &mut impl io::Write) -> io::Result<()> {
        if self.module.strings.is_empty() && self.module.globals.is_empty() {
            return Ok(());
        }
        writeln!(out, "; data")?;
        for (index, text) in self.module.strings.iter().enumerate() {
            writeln!(out, "str @.str{index} = \"{}\"", Emitter::escape(text))?;
        }
        for global in &self.module.globals {
            writeln!(out, "global @{}, {}", global.name, global.cells)?;
        }
        writeln!(out)
    }

    /// Forward declarations: imported subprograms first, then every
    /// function this unit defines.
    fn write_forward_declarations(&self, out: &mut impl io::Write) -> io::Result<()> {
        writeln!(out, "; declarations")?;
        for decl in &self.module.declared {
            // an own definition supersedes its forward entry
            if self
                .module
                .functions
                .iter()
                .any(|function| function.name == decl.name)
            {
                continue;
            }
            self.write_declaration(decl, out)?;
        }
        for function in &self.module.functions {
            let params: Vec<&str> = function
                .params
                .iter()
                .map(|(_, kind)| Emitter::kind_name(*kind))
                .collect();
            writeln!(
                out,
                "declare {} @{}({})",
                Emitter::kind_name(function.ret),
                function.name,
                params.join(", ")
            )?;
        }
        writeln!(out)
    }

    fn write_declaration(
        &self,
        decl: &ir_gen::ssa::FunctionDecl,
        out: &mut impl io::Write,
    ) -> io::Result<()> {
        let params: Vec<&str> = decl
            .params
            .iter()
            .map(|kind| Emitter::kind_name(*kind))
            .collect();
        writeln!(
            out,
            "declare {} @{}({})",
            Emitter::kind_name(decl.ret),
            decl.name,
            params.join(", ")
        )
    }

    fn write_function(&self, function: &Function, out: &mut impl io::Write) -> io::Result<()> {
        // parameters occupy the first temporaries of the function
        let params: Vec<String> = function
            .params
            .iter()
            .enumerate()
            .map(|(index, (_, kind))| format!("{} %t{index}", Emitter::kind_name(*kind)))
            .collect();

        writeln!(
            out,
            "define {} @{}({}) {{",
            Emitter::kind_name(function.ret),
            function.name,
            params.join(", ")
        )?;
        writeln!(out, "entry:")?;
        for instruction in &function.instructions {
            self.write_instruction(instruction, out)?;
        }
        writeln!(out, "}}")?;
        writeln!(out)
    }

    /// The program entry: elaborate dependencies topologically, call
    /// the main procedure, exit cleanly.
    fn write_epilogue(&self, out: &mut impl io::Write) -> io::Result<()> {
        let Some(entry) = &self.module.entry else {
            return Ok(());
        };
        writeln!(out, "; entry")?;
        writeln!(out, "define i64 @main() {{")?;
        writeln!(out, "entry:")?;
        for elab in &entry.elab_calls {
            writeln!(out, "  call void @{elab}()")?;
        }
        writeln!(out, "  call void @{}()", entry.main)?;
        writeln!(out, "  call void @__ada_rt_exit(0)")?;
        writeln!(out, "  ret i64 0")?;
        writeln!(out, "}}")
    }

    pub(crate) fn kind_name(kind: ValueKind) -> &'static str {
        match kind {
            ValueKind::I64 => "i64",
            ValueKind::F64 => "f64",
            ValueKind::Ptr => "ptr",
            ValueKind::Void => "void",
        }
    }

    fn escape(text: &str) -> String {
        let mut escaped = String::with_capacity(text.len());
        for ch in text.chars() {
            match ch {
                '"' => escaped.push_str("\\22"),
                '\\' => escaped.push_str("\\5c"),
                '\n' => escaped.push_str("\\0a"),
                ch if ch.is_ascii_graphic() || ch == ' ' => escaped.push(ch),
                ch => escaped.push_str(&format!("\\{:02x}", ch as u32 & 0xff)),
            }
        }
        escaped
    }
}
