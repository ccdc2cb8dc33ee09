// End-to-end scenarios: Ada source through lex, parse, analyze, and
// lowering, asserted against the emitted IR text.

use emitter::Emitter;
use semantic_analysis::library::NoSource;
use semantic_analysis::{Session, standard};
use shared_context::diagnostics::Diagnostics;
use shared_context::suppress::SuppressMask;
use shared_context::units::SourceLocator;
use shared_context::{Bump, CompilerContext};
use std::path::PathBuf;

/// Lower one source text to IR with an empty include path.
fn compile(source: &str, suppress: SuppressMask) -> String {
    compile_with(source, suppress, Box::new(NoSource))
}

fn compile_with(
    source: &str,
    suppress: SuppressMask,
    locator: Box<dyn SourceLocator>,
) -> String {
    let arena = Bump::new();
    let mut ctx = CompilerContext::new(&arena);
    ctx.diagnostics = Diagnostics::silent();
    standard::install(&mut ctx);
    let mut session = Session::new(locator, suppress);

    let lexer = lexer::Lexer::new(source);
    let mut unit = parser::parse(lexer, "test.ada", &mut ctx).expect("program parses");
    semantic_analysis::analyze(&mut ctx, &mut session, "test.ada", source, &mut unit);
    assert_eq!(
        ctx.diagnostics.error_count(),
        0,
        "unexpected diagnostics:\n{}",
        ctx.diagnostics
            .reported()
            .iter()
            .map(|(_, m)| m.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    );

    let module = ir_gen::lower_unit(&mut ctx, &unit, true, false);
    Emitter::new(&module).to_text()
}

#[test]
fn hello_world_emits_the_expected_shapes() {
    let text = compile(
        "with TEXT_IO; use TEXT_IO;\n\
         procedure HI is\n\
         begin\n\
            PUT_LINE (\"HELLO\");\n\
         end HI;\n",
        SuppressMask::none(),
    );

    // prelude, pool, body, entry
    assert!(text.contains("declare void @__ada_rt_put_line(ptr)"), "{text}");
    assert!(text.contains("str @.str0 = \"HELLO\""), "{text}");
    assert!(text.contains("define void @hi()"), "{text}");
    assert!(text.contains("call void @__ada_rt_put_line("), "{text}");
    assert!(text.contains("define i64 @main()"), "{text}");
    assert!(text.contains("call void @hi()"), "{text}");
    assert!(text.contains("call void @__ada_rt_exit(0)"), "{text}");
}

#[test]
fn string_literals_are_pooled_once() {
    let text = compile(
        "with TEXT_IO; use TEXT_IO;\n\
         procedure TWICE is\n\
         begin\n\
            PUT_LINE (\"SAME\");\n\
            PUT_LINE (\"SAME\");\n\
         end TWICE;\n",
        SuppressMask::none(),
    );
    assert_eq!(text.matches("str @.str").count(), 1, "{text}");
    assert_eq!(text.matches("strref @.str0").count(), 2, "{text}");
}

#[test]
fn for_loops_materialize_bounds_and_count() {
    let text = compile(
        "with TEXT_IO; use TEXT_IO;\n\
         procedure G is\n\
            X : INTEGER := 7;\n\
         begin\n\
            for I in 1 .. 3 loop\n\
               X := X + I;\n\
            end loop;\n\
            PUT (X);\n\
         end G;\n",
        SuppressMask::all(),
    );
    assert!(text.contains("define void @g()"), "{text}");
    // head compare against the materialized upper bound
    assert!(text.contains("cmp.le.i64"), "{text}");
    assert!(text.contains("add.i64"), "{text}");
    assert!(text.contains("call void @__ada_rt_put_int("), "{text}");
}

#[test]
fn handled_raise_uses_the_jump_buffer_protocol() {
    let text = compile(
        "with TEXT_IO; use TEXT_IO;\n\
         procedure H is\n\
         begin\n\
            raise CONSTRAINT_ERROR;\n\
         exception\n\
            when CONSTRAINT_ERROR => PUT_LINE (\"c\");\n\
         end H;\n",
        SuppressMask::none(),
    );
    assert!(text.contains("call i64 @__ada_rt_handler_push()"), "{text}");
    assert!(text.contains("call void @__ada_rt_raise(1)"), "{text}");
    assert!(text.contains("call void @__ada_rt_handler_pop()"), "{text}");
    // the dispatch compares the identity of CONSTRAINT_ERROR
    assert!(text.contains("cmp.eq.i64"), "{text}");
}

#[test]
fn division_check_emits_a_guard_and_suppression_removes_it() {
    let source = "with TEXT_IO; use TEXT_IO;\n\
                  procedure D is\n\
                     X : INTEGER := 0;\n\
                  begin\n\
                     PUT (10 / X);\n\
                  exception\n\
                     when NUMERIC_ERROR => PUT_LINE (\"n\");\n\
                  end D;\n";

    let checked = compile(source, SuppressMask::none());
    assert!(checked.contains("call void @__ada_rt_raise(2)"), "{checked}");
    assert!(checked.contains("div.i64"), "{checked}");

    // property: with every check suppressed, no raise guards remain
    let suppressed = compile(source, SuppressMask::all());
    assert!(!suppressed.contains("call void @__ada_rt_raise("), "{suppressed}");
    assert!(suppressed.contains("div.i64"), "{suppressed}");
}

#[test]
fn short_circuit_operands_sit_behind_branches() {
    let source = "procedure S is\n\
                     A : BOOLEAN := FALSE;\n\
                     B : BOOLEAN := TRUE;\n\
                     C : BOOLEAN := FALSE;\n\
                  begin\n\
                     C := A and then B;\n\
                     C := A and B;\n\
                  end S;\n";
    let text = compile(source, SuppressMask::all());

    // `and then` produces control flow, plain `and` a bitwise op
    assert!(text.contains("cbr "), "{text}");
    assert!(text.contains("and.i64"), "{text}");

    // the short-circuit result flows through a slot, so there is a
    // store before the branch and one on the right-operand path
    let and_then_stores = text.matches("store i64").count();
    assert!(and_then_stores >= 3, "{text}");
}

#[test]
fn dense_case_uses_a_jump_table_and_sparse_does_not() {
    let dense = compile(
        "procedure C1 is\n\
            X : INTEGER := 2;\n\
            Y : INTEGER := 0;\n\
         begin\n\
            case X is\n\
               when 1 => Y := 1;\n\
               when 2 => Y := 2;\n\
               when 3 => Y := 3;\n\
               when others => Y := 0;\n\
            end case;\n\
         end C1;\n",
        SuppressMask::all(),
    );
    assert!(dense.contains("switch "), "{dense}");

    let sparse = compile(
        "procedure C2 is\n\
            X : INTEGER := 2;\n\
            Y : INTEGER := 0;\n\
         begin\n\
            case X is\n\
               when 1 => Y := 1;\n\
               when 1000 => Y := 2;\n\
               when others => Y := 0;\n\
            end case;\n\
         end C2;\n",
        SuppressMask::all(),
    );
    assert!(!sparse.contains("switch "), "{sparse}");
    assert!(sparse.contains("cmp.eq.i64"), "{sparse}");
}

#[test]
fn exponentiation_by_squaring_is_inlined_for_integers() {
    let text = compile(
        "procedure P1 is\n\
            X : INTEGER := 2;\n\
            Y : INTEGER := 0;\n\
         begin\n\
            Y := X ** 10;\n\
         end P1;\n",
        SuppressMask::all(),
    );
    // the squaring loop multiplies and halves the exponent
    assert!(text.contains("mul.i64"), "{text}");
    assert!(text.contains("div.i64"), "{text}");
    assert!(!text.contains("__ada_rt_pow_f64"), "{text}");

    let float_pow = compile(
        "procedure P2 is\n\
            X : FLOAT := 2.0;\n\
            Y : FLOAT := 0.0;\n\
         begin\n\
            Y := X ** 3;\n\
         end P2;\n",
        SuppressMask::all(),
    );
    assert!(float_pow.contains("call f64 @__ada_rt_pow_f64("), "{float_pow}");
}

#[test]
fn mod_follows_the_divisor_sign() {
    let text = compile(
        "procedure M is\n\
            A : INTEGER := -7;\n\
            B : INTEGER := 3;\n\
            C : INTEGER := 0;\n\
         begin\n\
            C := A mod B;\n\
            C := A rem B;\n\
         end M;\n",
        SuppressMask::all(),
    );
    // mod needs the adjustment diamond on top of rem
    assert_eq!(text.matches("rem.i64").count(), 2, "{text}");
    assert!(text.contains("xor.i64"), "{text}");
}

#[test]
fn range_checks_guard_assignments_into_subtypes() {
    let source = "procedure R is\n\
                     type SMALL is range 1 .. 10;\n\
                     X : SMALL := 1;\n\
                     Y : INTEGER := 5;\n\
                  begin\n\
                     X := SMALL (Y);\n\
                  end R;\n";

    let checked = compile(source, SuppressMask::none());
    assert!(checked.contains("call void @__ada_rt_raise(1)"), "{checked}");

    let suppressed = compile(source, SuppressMask::all());
    assert!(!suppressed.contains("call void @__ada_rt_raise("), "{suppressed}");
}

#[test]
fn nested_subprograms_take_a_static_link() {
    let text = compile(
        "procedure OUTER is\n\
            X : INTEGER := 1;\n\
            procedure INNER is\n\
            begin\n\
               X := X + 1;\n\
            end INNER;\n\
         begin\n\
            INNER;\n\
         end OUTER;\n",
        SuppressMask::all(),
    );
    // the nested body takes the link as its pointer parameter and
    // chases it to reach X
    assert!(text.contains("define void @outer__inner(ptr %t0)"), "{text}");
    assert!(text.contains("call void @outer__inner(%t"), "{text}");
}

#[test]
fn elaboration_of_a_withed_package_precedes_main() {
    // a two-unit program: the client withs P, whose spec lives on
    // the include path
    let dir = std::env::temp_dir().join(format!("adac_lowering_{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    std::fs::write(
        dir.join("p.ads"),
        "package P is\n\
            COUNT : INTEGER := 3;\n\
            procedure BUMP;\n\
         end P;\n",
    )
    .expect("write p.ads");

    struct DirLocator(PathBuf);
    impl SourceLocator for DirLocator {
        fn locate(&self, unit_name: &str) -> Option<PathBuf> {
            let candidate = self.0.join(format!("{unit_name}.ads"));
            candidate.is_file().then_some(candidate)
        }
    }

    let text = compile_with(
        "with P;\n\
         procedure CLIENT is\n\
         begin\n\
            P.BUMP;\n\
         end CLIENT;\n",
        SuppressMask::none(),
        Box::new(DirLocator(dir.clone())),
    );
    let _ = std::fs::remove_dir_all(&dir);

    // the entry elaborates P before calling the main procedure
    let elab = text.find("call void @p__elab()").expect("elab call");
    let main_call = text.find("call void @client()").expect("main call");
    assert!(elab < main_call, "{text}");
    // the cross-unit call resolves to P's mangled subprogram
    assert!(text.contains("call void @p__bump()"), "{text}");
    assert!(text.contains("declare void @p__bump()"), "{text}");
}

#[test]
fn package_units_emit_globals_and_elaboration() {
    let arena = Bump::new();
    let mut ctx = CompilerContext::new(&arena);
    ctx.diagnostics = Diagnostics::silent();
    standard::install(&mut ctx);
    let mut session = Session::new(Box::new(NoSource), SuppressMask::none());

    let source = "package STORE is\n\
                     TOTAL : INTEGER := 42;\n\
                  end STORE;\n";
    let lexer = lexer::Lexer::new(source);
    let mut unit = parser::parse(lexer, "store.ads", &mut ctx).expect("parses");
    semantic_analysis::analyze(&mut ctx, &mut session, "store.ads", source, &mut unit);
    assert_eq!(ctx.diagnostics.error_count(), 0);

    // a spec without a body emits the package's elaboration function
    let module = ir_gen::lower_unit(&mut ctx, &unit, false, false);
    let text = Emitter::new(&module).to_text();

    assert!(text.contains("global @store__total, 1"), "{text}");
    assert!(text.contains("global @store__elaborated, 1"), "{text}");
    assert!(text.contains("define void @store__elab_spec()"), "{text}");
    assert!(text.contains("define void @store__elab()"), "{text}");
    assert!(text.contains("store i64 42"), "{text}");
    // no entry epilogue for a package unit
    assert!(!text.contains("define i64 @main()"), "{text}");
}

#[test]
fn records_lower_to_named_structs_with_field_addressing() {
    let text = compile(
        "procedure REC is\n\
            type PAIR is record\n\
               A : INTEGER;\n\
               B : INTEGER;\n\
            end record;\n\
            P : PAIR;\n\
         begin\n\
            P.A := 1;\n\
            P.B := P.A + 1;\n\
         end REC;\n",
        SuppressMask::all(),
    );
    assert!(text.contains("struct %pair = { i64, i64 }"), "{text}");
    // field addressing off the frame cells
    assert!(text.contains("= field "), "{text}");
}
