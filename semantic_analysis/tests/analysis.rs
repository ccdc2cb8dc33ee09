// Analysis scenarios driven through the full lex/parse/analyze
// pipeline, asserting on the diagnostics each program must (or must
// not) produce.

use semantic_analysis::library::NoSource;
use semantic_analysis::{Session, standard};
use shared_context::diagnostics::Diagnostics;
use shared_context::suppress::SuppressMask;
use shared_context::{Bump, CompilerContext};

/// Analyze one source text with an empty include path; returns the
/// error count and every formatted message.
fn analyze_source(source: &str) -> (usize, String) {
    let arena = Bump::new();
    let mut ctx = CompilerContext::new(&arena);
    ctx.diagnostics = Diagnostics::silent();
    standard::install(&mut ctx);
    let mut session = Session::new(Box::new(NoSource), SuppressMask::none());

    let lexer = lexer::Lexer::new(source);
    let Some(mut unit) = parser::parse(lexer, "test.ada", &mut ctx) else {
        let messages = collect_messages(&ctx);
        return (ctx.diagnostics.error_count(), messages);
    };
    semantic_analysis::analyze(&mut ctx, &mut session, "test.ada", source, &mut unit);

    (ctx.diagnostics.error_count(), collect_messages(&ctx))
}

fn collect_messages(ctx: &CompilerContext) -> String {
    ctx.diagnostics
        .reported()
        .iter()
        .map(|(_, message)| message.as_str())
        .collect::<Vec<_>>()
        .join("\n---\n")
}

#[test]
fn hello_world_analyzes_cleanly() {
    let (errors, messages) = analyze_source(
        "with TEXT_IO; use TEXT_IO;\n\
         procedure HI is\n\
         begin\n\
            PUT_LINE (\"HELLO\");\n\
         end HI;\n",
    );
    assert_eq!(errors, 0, "unexpected diagnostics:\n{messages}");
}

#[test]
fn static_constraint_violation_is_rejected() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
            type R is range 1 .. 10;\n\
            X : R := 11;\n\
         begin\n\
            null;\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("outside the range"), "got:\n{messages}");
}

#[test]
fn subtype_constraints_refine_transitively() {
    // the subtype chain keeps narrowing; assigning through it is
    // checked against the innermost constraint
    let (errors, messages) = analyze_source(
        "procedure F is\n\
            type R is range 1 .. 100;\n\
            subtype S is R range 1 .. 10;\n\
            subtype T is S range 2 .. 5;\n\
            X : T := 4;\n\
         begin\n\
            X := 9;\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("outside the range 2 .. 5"), "got:\n{messages}");
}

#[test]
fn widening_subtype_is_rejected() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
            type R is range 1 .. 10;\n\
            subtype W is R range 0 .. 10;\n\
         begin\n\
            null;\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("parent range"), "got:\n{messages}");
}

#[test]
fn undeclared_identifier_is_reported() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
         begin\n\
            X := 1;\n\
         end F;\n",
    );
    assert!(errors >= 1);
    assert!(messages.contains("undeclared identifier 'x'"), "got:\n{messages}");
}

#[test]
fn assigning_to_an_in_parameter_is_illegal() {
    let (errors, messages) = analyze_source(
        "procedure F (A : in INTEGER) is\n\
         begin\n\
            A := 1;\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("cannot be assigned"), "got:\n{messages}");
}

#[test]
fn overload_resolution_picks_by_parameter_type() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
            B : BOOLEAN := FALSE;\n\
            procedure P (X : in INTEGER) is begin null; end P;\n\
            procedure P (X : in BOOLEAN) is begin null; end P;\n\
         begin\n\
            P (B);\n\
            P (3);\n\
         end F;\n",
    );
    assert_eq!(errors, 0, "got:\n{messages}");
}

#[test]
fn ambiguous_overload_is_its_own_diagnostic() {
    // NATURAL and INTEGER share a base type, so a universal literal
    // matches both profiles equally well
    let (errors, messages) = analyze_source(
        "procedure F is\n\
            procedure P (X : in INTEGER) is begin null; end P;\n\
            procedure P (X : in NATURAL) is begin null; end P;\n\
         begin\n\
            P (3);\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("ambiguous"), "got:\n{messages}");
}

#[test]
fn structurally_compatible_array_profiles_stay_ambiguous() {
    // two distinct array types with identical index and component
    // types are compatible with each other's values, so neither
    // profile wins; there is no preference rule to break the tie
    let (errors, messages) = analyze_source(
        "procedure F is\n\
            type VECTOR is array (1 .. 10) of INTEGER;\n\
            type ROW is array (1 .. 10) of INTEGER;\n\
            V : VECTOR;\n\
            procedure P (X : in VECTOR) is begin null; end P;\n\
            procedure P (X : in ROW) is begin null; end P;\n\
         begin\n\
            P (V);\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("ambiguous"), "got:\n{messages}");
}

#[test]
fn no_matching_overload_is_its_own_diagnostic() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
            procedure P (X : in INTEGER) is begin null; end P;\n\
         begin\n\
            P (\"TEXT\");\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("no visible 'p'"), "got:\n{messages}");
}

#[test]
fn case_must_cover_the_selector_range() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
            type SMALL is range 1 .. 4;\n\
            X : SMALL := 1;\n\
         begin\n\
            case X is\n\
               when 1 => null;\n\
               when 2 => null;\n\
            end case;\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("others"), "got:\n{messages}");
}

#[test]
fn case_with_others_or_full_coverage_is_clean() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
            type SMALL is range 1 .. 3;\n\
            X : SMALL := 1;\n\
         begin\n\
            case X is\n\
               when 1 | 2 => null;\n\
               when 3 => null;\n\
            end case;\n\
            case X is\n\
               when 2 => null;\n\
               when others => null;\n\
            end case;\n\
         end F;\n",
    );
    assert_eq!(errors, 0, "got:\n{messages}");
}

#[test]
fn overlapping_case_choices_are_rejected() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
            X : INTEGER := 0;\n\
         begin\n\
            case X is\n\
               when 1 .. 5 => null;\n\
               when 3 => null;\n\
               when others => null;\n\
            end case;\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("already covered"), "got:\n{messages}");
}

#[test]
fn exit_outside_a_loop_is_rejected() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
         begin\n\
            exit;\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("not inside a loop"), "got:\n{messages}");
}

#[test]
fn named_loops_scope_their_exits() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
         begin\n\
            OUTER : loop\n\
               loop\n\
                  exit OUTER;\n\
               end loop;\n\
            end loop OUTER;\n\
         end F;\n",
    );
    assert_eq!(errors, 0, "got:\n{messages}");

    let (errors, messages) = analyze_source(
        "procedure F is\n\
         begin\n\
            loop\n\
               exit ELSEWHERE;\n\
            end loop;\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("does not name an enclosing loop"), "got:\n{messages}");
}

#[test]
fn procedures_cannot_return_values() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
         begin\n\
            return 1;\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("cannot return a value"), "got:\n{messages}");
}

#[test]
fn functions_must_return_values() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
            function G return INTEGER is\n\
            begin\n\
               return;\n\
            end G;\n\
            X : INTEGER := G;\n\
         begin\n\
            null;\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("must return a value"), "got:\n{messages}");
}

#[test]
fn bare_raise_needs_a_handler() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
         begin\n\
            raise;\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("inside a handler"), "got:\n{messages}");

    let (errors, messages) = analyze_source(
        "procedure F is\n\
         begin\n\
            null;\n\
         exception\n\
            when others => raise;\n\
         end F;\n",
    );
    assert_eq!(errors, 0, "got:\n{messages}");
}

#[test]
fn missing_library_units_are_elaboration_errors() {
    let (errors, messages) = analyze_source(
        "with NOWHERE;\n\
         procedure F is\n\
         begin\n\
            null;\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("not found on the include path"), "got:\n{messages}");
}

#[test]
fn record_components_resolve_and_check() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
            type PAIR is record\n\
               A : INTEGER;\n\
               B : BOOLEAN;\n\
            end record;\n\
            P : PAIR;\n\
         begin\n\
            P.A := 3;\n\
            P.B := TRUE;\n\
            P.A := P.C;\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("no component named 'c'"), "got:\n{messages}");
}

#[test]
fn enumeration_literals_resolve_through_expected_types() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
            type COLOR is (RED, GREEN, BLUE);\n\
            type FRUIT is (APPLE, ORANGE);\n\
            C : COLOR := RED;\n\
         begin\n\
            C := BLUE;\n\
            if C = GREEN then\n\
               null;\n\
            end if;\n\
         end F;\n",
    );
    assert_eq!(errors, 0, "got:\n{messages}");
}

#[test]
fn named_numbers_fold_at_their_uses() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
            LIMIT : constant := 100;\n\
            type R is range 1 .. LIMIT;\n\
            X : R := LIMIT;\n\
         begin\n\
            X := LIMIT + 1;\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("outside the range 1 .. 100"), "got:\n{messages}");
}

#[test]
fn generic_packages_instantiate_with_type_actuals() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
            generic\n\
               type ITEM is (<>);\n\
            package HOLDER is\n\
               VALUE : ITEM;\n\
            end HOLDER;\n\
            package INT_HOLDER is new HOLDER (INTEGER);\n\
         begin\n\
            INT_HOLDER.VALUE := 3;\n\
         end F;\n",
    );
    assert_eq!(errors, 0, "got:\n{messages}");
}

#[test]
fn tasks_accept_only_their_own_entries() {
    let (errors, messages) = analyze_source(
        "procedure F is\n\
            task SERVER is\n\
               entry PING;\n\
            end SERVER;\n\
            task body SERVER is\n\
            begin\n\
               accept PING;\n\
               accept PONG;\n\
            end SERVER;\n\
         begin\n\
            SERVER.PING;\n\
         end F;\n",
    );
    assert_eq!(errors, 1, "got:\n{messages}");
    assert!(messages.contains("undeclared identifier 'pong'"), "got:\n{messages}");
}
