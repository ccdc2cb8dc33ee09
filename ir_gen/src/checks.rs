// The check-insertion policy.
//
// Every site that can violate a language rule at run time consults
// the active SUPPRESS set; an enabled check lowers to a compare and a
// conditional branch into a raise block for the matching predefined
// exception. Suppressed checks emit nothing at all, which is what
// makes check-suppressed compilation observationally equivalent for
// programs without undefined behavior.

use crate::IrGen;
use crate::runtime;
use crate::ssa::{BinOp, Cond, Instruction, Operand, ValueKind};
use shared_context::suppress::Check;
use shared_context::types::TypeId;

impl<'src, 'ctx> IrGen<'src, 'ctx> {
    pub(crate) fn checked(&self, check: Check) -> bool {
        !self.suppress.is_suppressed(check)
    }

    /// Unconditionally raise the exception with this identity.
    pub(crate) fn emit_raise(&mut self, identity: i64) {
        self.emit(Instruction::Call {
            dst: None,
            callee: "__ada_rt_raise".to_string(),
            args: vec![Operand::ConstInt(identity)],
        });
    }

    /// Branch to a raise block when `ok` (0/1) is false.
    pub(crate) fn emit_guard(&mut self, ok: Operand, identity: i64) {
        let continue_label = self.make_label();
        let raise_label = self.make_label();

        self.emit(Instruction::Branch {
            cond: ok,
            then_label: continue_label,
            else_label: raise_label,
        });
        self.emit_label(raise_label);
        self.emit_raise(identity);
        self.emit(Instruction::Jump(continue_label));
        self.emit_label(continue_label);
    }

    /// Compare two operands, yielding a 0/1 temporary.
    pub(crate) fn compare(
        &mut self,
        cond: Cond,
        kind: ValueKind,
        left: Operand,
        right: Operand,
    ) -> Operand {
        let dst = self.make_temp(ValueKind::I64);
        self.emit(Instruction::Compare {
            cond,
            kind,
            dst,
            left,
            right,
        });
        Operand::Temp(dst)
    }

    pub(crate) fn binary(
        &mut self,
        op: BinOp,
        kind: ValueKind,
        left: Operand,
        right: Operand,
    ) -> Operand {
        let dst = self.make_temp(kind);
        self.emit(Instruction::Binary {
            op,
            kind,
            dst,
            left,
            right,
        });
        Operand::Temp(dst)
    }

    /// RANGE check: `value` must be inside the static bounds of the
    /// target subtype. Dynamic bounds are checked by their
    /// elaboration code instead.
    pub(crate) fn range_check(&mut self, value: &Operand, target: TypeId) {
        if !self.checked(Check::Range) {
            return;
        }
        let Some((first, last)) = self.ctx.types.discrete_bounds(target) else {
            return;
        };
        // the base range of INTEGER cannot be violated by an i64
        if first == i64::MIN && last == i64::MAX {
            return;
        }
        let low_ok = self.compare(
            Cond::Ge,
            ValueKind::I64,
            value.clone(),
            Operand::ConstInt(first),
        );
        let high_ok = self.compare(
            Cond::Le,
            ValueKind::I64,
            value.clone(),
            Operand::ConstInt(last),
        );
        let ok = self.binary(BinOp::And, ValueKind::I64, low_ok, high_ok);
        self.emit_guard(ok, runtime::CONSTRAINT_ERROR);
    }

    /// INDEX check against dynamic bounds already in temporaries.
    pub(crate) fn index_check(&mut self, index: &Operand, first: Operand, last: Operand) {
        if !self.checked(Check::Index) {
            return;
        }
        let low_ok = self.compare(Cond::Ge, ValueKind::I64, index.clone(), first);
        let high_ok = self.compare(Cond::Le, ValueKind::I64, index.clone(), last);
        let ok = self.binary(BinOp::And, ValueKind::I64, low_ok, high_ok);
        self.emit_guard(ok, runtime::CONSTRAINT_ERROR);
    }

    /// DIVISION check: a zero divisor raises NUMERIC_ERROR.
    pub(crate) fn division_check(&mut self, divisor: &Operand) {
        if !self.checked(Check::Division) {
            return;
        }
        let ok = self.compare(
            Cond::Ne,
            ValueKind::I64,
            divisor.clone(),
            Operand::ConstInt(0),
        );
        self.emit_guard(ok, runtime::NUMERIC_ERROR);
    }

    /// ACCESS check: dereferencing null raises CONSTRAINT_ERROR.
    pub(crate) fn null_check(&mut self, pointer: &Operand) {
        if !self.checked(Check::Access) {
            return;
        }
        let ok = self.compare(Cond::Ne, ValueKind::Ptr, pointer.clone(), Operand::Null);
        self.emit_guard(ok, runtime::CONSTRAINT_ERROR);
    }

    /// STORAGE check: a failed allocation raises STORAGE_ERROR.
    pub(crate) fn storage_check(&mut self, pointer: &Operand) {
        if !self.checked(Check::Storage) {
            return;
        }
        let ok = self.compare(Cond::Ne, ValueKind::Ptr, pointer.clone(), Operand::Null);
        self.emit_guard(ok, runtime::STORAGE_ERROR);
    }

    /// OVERFLOW check for addition and subtraction, before the
    /// operation: `a + b` overflows when b > 0 and a > MAX - b, or
    /// b < 0 and a < MIN - b (mirrored for subtraction).
    pub(crate) fn overflow_check_add_sub(
        &mut self,
        subtract: bool,
        left: &Operand,
        right: &Operand,
    ) {
        if !self.checked(Check::Overflow) {
            return;
        }

        let max = Operand::ConstInt(i64::MAX);
        let min = Operand::ConstInt(i64::MIN);

        // limit = MAX -/+ b, taken on the side where it cannot wrap
        let positive = self.compare(
            Cond::Gt,
            ValueKind::I64,
            right.clone(),
            Operand::ConstInt(0),
        );
        let (upper_op, lower_op) = if subtract {
            (BinOp::Add, BinOp::Add)
        } else {
            (BinOp::Sub, BinOp::Sub)
        };
        let upper = self.binary(upper_op, ValueKind::I64, max, right.clone());
        let lower = self.binary(lower_op, ValueKind::I64, min, right.clone());

        let fits_upper = self.compare(Cond::Le, ValueKind::I64, left.clone(), upper);
        let fits_lower = self.compare(Cond::Ge, ValueKind::I64, left.clone(), lower);

        // when b > 0 the upper limit binds, otherwise the lower one
        let not_positive = self.binary(
            BinOp::Xor,
            ValueKind::I64,
            positive.clone(),
            Operand::ConstInt(1),
        );
        let upper_side = self.binary(BinOp::Or, ValueKind::I64, not_positive, fits_upper);
        let lower_side = self.binary(BinOp::Or, ValueKind::I64, positive, fits_lower);
        let ok = self.binary(BinOp::And, ValueKind::I64, upper_side, lower_side);
        self.emit_guard(ok, runtime::NUMERIC_ERROR);
    }

    /// OVERFLOW check for multiplication, after the operation: the
    /// product must divide back to the left operand.
    pub(crate) fn overflow_check_mul(
        &mut self,
        product: &Operand,
        left: &Operand,
        right: &Operand,
    ) {
        if !self.checked(Check::Overflow) {
            return;
        }

        let left_zero = self.compare(
            Cond::Eq,
            ValueKind::I64,
            left.clone(),
            Operand::ConstInt(0),
        );
        // guard the divide with a nonzero left operand
        let skip_label = self.make_label();
        let check_label = self.make_label();
        let done_label = self.make_label();
        self.emit(Instruction::Branch {
            cond: left_zero,
            then_label: skip_label,
            else_label: check_label,
        });

        self.emit_label(check_label);
        let back = self.binary(BinOp::Div, ValueKind::I64, product.clone(), left.clone());
        let ok = self.compare(Cond::Eq, ValueKind::I64, back, right.clone());
        self.emit_guard(ok, runtime::NUMERIC_ERROR);
        self.emit(Instruction::Jump(done_label));

        self.emit_label(skip_label);
        self.emit(Instruction::Jump(done_label));
        self.emit_label(done_label);
    }

    /// DISCRIMINANT check: accessing a component of a variant arm is
    /// only legal while the discriminant selects that arm.
    pub(crate) fn discriminant_check(&mut self, discriminant: &Operand, choices: &[(i64, i64)]) {
        if !self.checked(Check::Discriminant) || choices.is_empty() {
            return;
        }

        let mut ok = Operand::ConstInt(0);
        for (low, high) in choices {
            let ge = self.compare(
                Cond::Ge,
                ValueKind::I64,
                discriminant.clone(),
                Operand::ConstInt(*low),
            );
            let le = self.compare(
                Cond::Le,
                ValueKind::I64,
                discriminant.clone(),
                Operand::ConstInt(*high),
            );
            let in_range = self.binary(BinOp::And, ValueKind::I64, ge, le);
            ok = self.binary(BinOp::Or, ValueKind::I64, ok, in_range);
        }
        self.emit_guard(ok, runtime::CONSTRAINT_ERROR);
    }
}
