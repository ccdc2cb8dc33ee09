// Static expression evaluation.
//
// Bounds of type declarations, case and variant choices, and named
// numbers must be known at analysis time. Evaluation runs over
// analyzed nodes at universal precision; anything it cannot fold is
// simply not static, and the caller decides whether that is an error
// (a type bound) or fine (a runtime-checked expression).

use parser::ast::*;
use shared_context::CompilerContext;
use shared_context::symbols::SymbolKind;
use shared_context::univ::{UInt, UReal};
use std::cmp::Ordering;

/// A folded value: universal integer or universal real.
#[derive(Clone, Debug)]
pub enum StaticValue {
    Int(UInt),
    Real(UReal),
}

impl StaticValue {
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            StaticValue::Int(value) => value.to_i64(),
            StaticValue::Real(_) => None,
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        match self {
            StaticValue::Int(value) => value.to_i64().map(|v| v as f64),
            StaticValue::Real(value) => Some(value.to_f64()),
        }
    }

    fn truth(flag: bool) -> StaticValue {
        StaticValue::Int(UInt::from_i64(flag as i64))
    }

    fn as_bool(&self) -> Option<bool> {
        match self.to_i64()? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }
    }
}

/// Fold an analyzed expression, or `None` when it is not static.
pub fn eval(expr: &Expression, ctx: &CompilerContext) -> Option<StaticValue> {
    match &expr.kind {
        ExprKind::IntLiteral(value) => Some(StaticValue::Int(value.clone())),
        ExprKind::RealLiteral(value) => Some(StaticValue::Real(value.clone())),
        ExprKind::CharLiteral(value) => {
            Some(StaticValue::Int(UInt::from_i64(*value as i64)))
        }

        // enumeration literals fold to their position number
        ExprKind::Identifier(_) | ExprKind::Selected { .. } => {
            let sym = expr.sym?;
            match &ctx.symbols.get(sym).kind {
                SymbolKind::EnumLiteral { position } => {
                    Some(StaticValue::Int(UInt::from_i64(*position)))
                }
                _ => None,
            }
        }

        ExprKind::Unary { op, operand } => {
            let value = eval(operand, ctx)?;
            match (op, value) {
                (UnaryOp::Plus, value) => Some(value),
                (UnaryOp::Minus, StaticValue::Int(v)) => Some(StaticValue::Int(v.neg())),
                (UnaryOp::Minus, StaticValue::Real(v)) => Some(StaticValue::Real(v.neg())),
                (UnaryOp::Abs, StaticValue::Int(v)) => Some(StaticValue::Int(v.abs())),
                (UnaryOp::Abs, StaticValue::Real(v)) => Some(StaticValue::Real(v.abs())),
                (UnaryOp::Not, value) => Some(StaticValue::truth(!value.as_bool()?)),
            }
        }

        ExprKind::Binary { op, left, right } => {
            let lhs = eval(left, ctx)?;
            let rhs = eval(right, ctx)?;
            eval_binary(*op, lhs, rhs)
        }

        ExprKind::ShortCircuit { op, left, right } => {
            let lhs = eval(left, ctx)?.as_bool()?;
            match (op, lhs) {
                (ShortCircuitOp::AndThen, false) => Some(StaticValue::truth(false)),
                (ShortCircuitOp::OrElse, true) => Some(StaticValue::truth(true)),
                _ => {
                    let rhs = eval(right, ctx)?.as_bool()?;
                    Some(StaticValue::truth(rhs))
                }
            }
        }

        ExprKind::Membership {
            negated,
            operand,
            target,
        } => {
            let value = eval(operand, ctx)?;
            let inside = match target.as_ref() {
                MembershipTarget::Range(range) => {
                    let low = eval(&range.low, ctx)?;
                    let high = eval(&range.high, ctx)?;
                    compare(&low, &value)? != Ordering::Greater
                        && compare(&value, &high)? != Ordering::Greater
                }
                MembershipTarget::Mark(mark) => {
                    let (first, last) = ctx.types.discrete_bounds(mark.ty)?;
                    let v = value.to_i64()?;
                    first <= v && v <= last
                }
            };
            Some(StaticValue::truth(inside != *negated))
        }

        ExprKind::Qualified { operand, .. } => eval(operand, ctx),
        ExprKind::Conversion { mark, operand } => {
            let value = eval(operand, ctx)?;
            // an integer value converted to a real type becomes real
            if ctx.types.is_float(mark.ty) {
                if let StaticValue::Int(v) = &value {
                    return Some(StaticValue::Real(v.to_real()));
                }
            }
            Some(value)
        }

        // 'FIRST and 'LAST of a statically bounded type, 'POS, 'VAL,
        // 'SUCC and 'PRED over static operands
        ExprKind::Attribute {
            prefix,
            attribute,
            arg,
        } => {
            let name = ctx.interner.lookup(attribute.symbol);
            match name {
                "first" | "last" => {
                    let (first, last) = ctx.types.discrete_bounds(prefix.ty)?;
                    let value = if name == "first" { first } else { last };
                    Some(StaticValue::Int(UInt::from_i64(value)))
                }
                "pos" => eval(arg.as_deref()?, ctx),
                "val" => eval(arg.as_deref()?, ctx),
                "succ" => {
                    let value = eval(arg.as_deref()?, ctx)?;
                    match value {
                        StaticValue::Int(v) => {
                            Some(StaticValue::Int(v.add(&UInt::from_i64(1))))
                        }
                        _ => None,
                    }
                }
                "pred" => {
                    let value = eval(arg.as_deref()?, ctx)?;
                    match value {
                        StaticValue::Int(v) => {
                            Some(StaticValue::Int(v.sub(&UInt::from_i64(1))))
                        }
                        _ => None,
                    }
                }
                _ => None,
            }
        }

        _ => None,
    }
}

/// Fold to an i64 when the expression is a static discrete value in
/// i64 range.
pub fn eval_int(expr: &Expression, ctx: &CompilerContext) -> Option<i64> {
    eval(expr, ctx)?.to_i64()
}

/// Fold to an f64 for real contexts (digits, delta, real bounds).
pub fn eval_real(expr: &Expression, ctx: &CompilerContext) -> Option<f64> {
    eval(expr, ctx)?.to_f64()
}

fn eval_binary(op: BinaryOp, lhs: StaticValue, rhs: StaticValue) -> Option<StaticValue> {
    use StaticValue::{Int, Real};

    // comparisons work across both classes
    match op {
        BinaryOp::Eq => return Some(StaticValue::truth(compare(&lhs, &rhs)? == Ordering::Equal)),
        BinaryOp::Neq => {
            return Some(StaticValue::truth(compare(&lhs, &rhs)? != Ordering::Equal));
        }
        BinaryOp::Lt => return Some(StaticValue::truth(compare(&lhs, &rhs)? == Ordering::Less)),
        BinaryOp::Le => {
            return Some(StaticValue::truth(compare(&lhs, &rhs)? != Ordering::Greater));
        }
        BinaryOp::Gt => {
            return Some(StaticValue::truth(compare(&lhs, &rhs)? == Ordering::Greater));
        }
        BinaryOp::Ge => return Some(StaticValue::truth(compare(&lhs, &rhs)? != Ordering::Less)),
        _ => {}
    }

    match (op, lhs, rhs) {
        (BinaryOp::Add, Int(a), Int(b)) => Some(Int(a.add(&b))),
        (BinaryOp::Sub, Int(a), Int(b)) => Some(Int(a.sub(&b))),
        (BinaryOp::Mul, Int(a), Int(b)) => Some(Int(a.mul(&b))),
        (BinaryOp::Div, Int(a), Int(b)) => a.div(&b).map(Int),
        (BinaryOp::Rem, Int(a), Int(b)) => a.rem(&b).map(Int),
        (BinaryOp::Mod, Int(a), Int(b)) => a.modulo(&b).map(Int),
        (BinaryOp::Pow, Int(a), Int(b)) => {
            let exponent = b.to_i64()?;
            if !(0..=u32::MAX as i64).contains(&exponent) {
                return None;
            }
            Some(Int(a.pow(exponent as u32)))
        }

        (BinaryOp::Add, Real(a), Real(b)) => Some(Real(a.add(&b))),
        (BinaryOp::Sub, Real(a), Real(b)) => Some(Real(a.sub(&b))),
        (BinaryOp::Mul, Real(a), Real(b)) => Some(Real(a.mul(&b))),
        (BinaryOp::Div, Real(a), Real(b)) => a.div(&b).map(Real),
        (BinaryOp::Pow, Real(a), Int(b)) => {
            let exponent = b.to_i64()?;
            if !(i32::MIN as i64..=i32::MAX as i64).contains(&exponent) {
                return None;
            }
            a.pow(exponent as i32).map(Real)
        }

        // mixed universal operands promote the integer side
        (op, Int(a), Real(b)) => eval_binary(op, Real(a.to_real()), Real(b)),
        (op, Real(a), Int(b)) => eval_binary(op, Real(a), Real(b.to_real())),

        (BinaryOp::And, a, b) => Some(StaticValue::truth(a.as_bool()? & b.as_bool()?)),
        (BinaryOp::Or, a, b) => Some(StaticValue::truth(a.as_bool()? | b.as_bool()?)),
        (BinaryOp::Xor, a, b) => Some(StaticValue::truth(a.as_bool()? ^ b.as_bool()?)),

        _ => None,
    }
}

fn compare(a: &StaticValue, b: &StaticValue) -> Option<Ordering> {
    use StaticValue::{Int, Real};
    match (a, b) {
        (Int(a), Int(b)) => Some(a.compare(b)),
        (Real(a), Real(b)) => Some(a.compare(b)),
        (Int(a), Real(b)) => Some(a.to_real().compare(b)),
        (Real(a), Int(b)) => Some(a.compare(&b.to_real())),
    }
}
