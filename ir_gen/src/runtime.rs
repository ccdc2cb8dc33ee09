// The runtime ABI.
//
// Emitted code calls these symbols for everything the IR cannot do
// alone: heap management, array copies, exception propagation,
// tasking, delays, and the TEXT_IO subset. Names and signatures are
// fixed; the runtime may implement exceptions with unwind tables or
// jump buffers as long as handler identity semantics hold.

use crate::ssa::{FunctionDecl, ValueKind};

/// Identities of the predefined exceptions, agreed with the runtime.
pub const CONSTRAINT_ERROR: i64 = 1;
pub const NUMERIC_ERROR: i64 = 2;
pub const PROGRAM_ERROR: i64 = 3;
pub const STORAGE_ERROR: i64 = 4;
pub const TASKING_ERROR: i64 = 5;

const I: ValueKind = ValueKind::I64;
const F: ValueKind = ValueKind::F64;
const P: ValueKind = ValueKind::Ptr;
const V: ValueKind = ValueKind::Void;

/// Every runtime symbol the prelude declares.
pub fn declarations() -> Vec<FunctionDecl> {
    let decl = |name: &str, params: &[ValueKind], ret: ValueKind| FunctionDecl {
        name: name.to_string(),
        params: params.to_vec(),
        ret,
    };

    vec![
        // heap
        decl("__ada_rt_alloc", &[I], P),
        decl("__ada_rt_free", &[P], V),
        // array support: bounded copy (dst desc, src desc, check flag)
        decl("__ada_rt_array_copy", &[P, P, I], V),
        decl("__ada_rt_concat", &[P, P], P),
        // exceptions
        decl("__ada_rt_raise", &[I], V),
        decl("__ada_rt_reraise", &[], V),
        decl("__ada_rt_handler_push", &[], I),
        decl("__ada_rt_handler_pop", &[], V),
        decl("__ada_rt_current_exception", &[], I),
        // elaboration
        decl("__ada_rt_elab_check", &[P], V),
        // tasking
        decl("__ada_rt_task_create", &[P], P),
        decl("__ada_rt_task_start", &[P], V),
        decl("__ada_rt_task_terminate", &[], V),
        decl("__ada_rt_entry_call", &[P, I, P], V),
        decl("__ada_rt_accept_begin", &[I], P),
        decl("__ada_rt_accept_end", &[], V),
        decl("__ada_rt_select", &[I, P, F, I], I),
        decl("__ada_rt_abort", &[P], V),
        decl("__ada_rt_delay", &[F], V),
        // numerics
        decl("__ada_rt_pow_f64", &[F, F], F),
        // predefined TEXT_IO subset
        decl("__ada_rt_put", &[P], V),
        decl("__ada_rt_put_line", &[P], V),
        decl("__ada_rt_put_int", &[I], V),
        decl("__ada_rt_get_int", &[P], V),
        decl("__ada_rt_new_line", &[], V),
        decl("__ada_rt_image_int", &[I], P),
        decl("__ada_rt_value_int", &[P], I),
        // process exit with a status code
        decl("__ada_rt_exit", &[I], V),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abi_names_are_stable_and_unique() {
        let decls = declarations();
        for window in decls.iter() {
            assert!(window.name.starts_with("__ada_rt_"));
        }
        let mut names: Vec<&str> = decls.iter().map(|d| d.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), decls.len());
    }
}
