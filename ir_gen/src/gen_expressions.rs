// Expression lowering.
//
// Each expression lowers to instructions that produce one generated
// value. Scalars travel in temporaries; arrays and records travel as
// pointers (arrays point at their descriptor). Run-time checks are
// inserted per site through the check policy before the value
// escapes.

use crate::IrGen;
use crate::runtime;
use crate::ssa::{BinOp, Cond, Instruction, Operand, Value, ValueKind};
use parser::ast::{self, BinaryOp, ExprKind, ShortCircuitOp, UnaryOp};
use shared_context::suppress::Check;
use shared_context::symbols::{Mode, SymbolId, SymbolKind};
use shared_context::types::{TypeId, TypeKind};

impl<'src, 'ctx> IrGen<'src, 'ctx> {
    /// Lower an expression to its value.
    pub(crate) fn gen_expr(&mut self, expr: &ast::Expression) -> Operand {
        match &expr.kind {
            ExprKind::IntLiteral(value) => Operand::ConstInt(value.to_i64().unwrap_or(0)),
            ExprKind::RealLiteral(value) => {
                // fixed point values are i64 multiples of small
                if let TypeKind::Fixed { small, .. } = self.ctx.types.structural_kind(expr.ty) {
                    Operand::ConstInt(value.scaled_by(*small).unwrap_or(0))
                } else {
                    Operand::ConstFloat(value.to_f64())
                }
            }
            ExprKind::CharLiteral(value) => Operand::ConstInt(*value as i64),
            ExprKind::StringLiteral(symbol) => {
                let text = self.ctx.interner.lookup(*symbol).to_string();
                let index = self.module.intern_string(&text);
                let dst = self.make_temp(ValueKind::Ptr);
                self.emit(Instruction::StrRef { dst, index });
                Operand::Temp(dst)
            }
            ExprKind::NullLiteral => Operand::Null,

            ExprKind::Identifier(_) => self.gen_name_value(expr),

            ExprKind::Selected { prefix, selector } => {
                let all = self.ctx.interner.intern_folded("all");
                if selector.symbol == all {
                    // explicit dereference
                    let pointer = self.gen_expr(prefix);
                    self.null_check(&pointer);
                    if self.is_composite(expr.ty) {
                        pointer
                    } else {
                        self.load(pointer, self.value_class(expr.ty))
                    }
                } else {
                    let addr = self.gen_addr(expr);
                    if self.is_composite(expr.ty) {
                        addr
                    } else {
                        self.load(addr, self.value_class(expr.ty))
                    }
                }
            }

            ExprKind::Index { .. } => {
                let addr = self.gen_addr(expr);
                if self.is_composite(expr.ty) {
                    addr
                } else {
                    self.load(addr, self.value_class(expr.ty))
                }
            }

            ExprKind::Slice { prefix, range } => self.gen_slice(prefix, range),

            ExprKind::Call { .. } => self
                .gen_call(expr)
                .unwrap_or(Operand::ConstInt(0)),

            ExprKind::Conversion { mark: _, operand } => {
                let source = self.gen_expr(operand);
                let converted = self.convert_numeric(source, operand.ty, expr.ty);
                if self.ctx.types.is_discrete(expr.ty) {
                    self.range_check(&converted, expr.ty);
                }
                converted
            }

            ExprKind::Qualified { mark: _, operand } => {
                let value = self.gen_expr(operand);
                if self.ctx.types.is_discrete(expr.ty) {
                    self.range_check(&value, expr.ty);
                }
                value
            }

            ExprKind::Attribute { .. } => self.gen_attribute(expr),

            ExprKind::Binary { op, left, right } => self.gen_binary(expr.ty, *op, left, right),

            ExprKind::Unary { op, operand } => {
                let kind = self.value_class(expr.ty);
                match op {
                    UnaryOp::Plus => self.gen_expr(operand),
                    UnaryOp::Minus => {
                        let value = self.gen_expr(operand);
                        let zero = if kind == ValueKind::F64 {
                            Operand::ConstFloat(0.0)
                        } else {
                            Operand::ConstInt(0)
                        };
                        self.binary(BinOp::Sub, kind, zero, value)
                    }
                    UnaryOp::Not => {
                        let value = self.gen_expr(operand);
                        self.binary(BinOp::Xor, ValueKind::I64, value, Operand::ConstInt(1))
                    }
                    UnaryOp::Abs => {
                        let value = self.gen_expr(operand);
                        self.gen_abs(kind, value)
                    }
                }
            }

            ExprKind::ShortCircuit { op, left, right } => {
                self.gen_short_circuit(*op, left, right)
            }

            ExprKind::Membership {
                negated,
                operand,
                target,
            } => self.gen_membership(*negated, operand, target),

            ExprKind::Aggregate { .. } => self.gen_aggregate(expr),

            ExprKind::Allocator { subtype, initial } => self.gen_allocator(subtype, initial),

            // resolution rewrote every ApplyUnresolved in legal code
            ExprKind::ApplyUnresolved { .. } => Operand::ConstInt(0),
        }
    }

    /// Lower a name to its value, folding enumeration literals to
    /// their position numbers.
    fn gen_name_value(&mut self, expr: &ast::Expression) -> Operand {
        let Some(sym) = expr.sym else {
            return Operand::ConstInt(0);
        };
        match &self.ctx.symbols.get(sym).kind {
            SymbolKind::EnumLiteral { position } => Operand::ConstInt(*position),
            _ => {
                let addr = self.storage_addr(sym);
                if self.is_composite(expr.ty) {
                    addr
                } else {
                    self.load(addr, self.value_class(expr.ty))
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // addresses
    // ------------------------------------------------------------------

    /// Lower a name to the address of its storage; used for
    /// assignment targets, reference-mode arguments, and composite
    /// access paths.
    pub(crate) fn gen_addr(&mut self, expr: &ast::Expression) -> Operand {
        match &expr.kind {
            ExprKind::Identifier(_) => {
                let Some(sym) = expr.sym else {
                    return Operand::Null;
                };
                self.storage_addr(sym)
            }

            ExprKind::Selected { prefix, selector } => {
                let all = self.ctx.interner.intern_folded("all");
                if selector.symbol == all {
                    // the access value is the address of the
                    // designated object
                    let pointer = self.gen_expr(prefix);
                    self.null_check(&pointer);
                    return pointer;
                }

                let record_ty = prefix.ty;
                let base = self.gen_addr(prefix);
                let Some((field_index, _)) =
                    self.ctx.types.field_index(record_ty, selector.symbol)
                else {
                    return base;
                };

                // touching a variant component checks the
                // discriminant still selects its arm
                if self.ctx.types.field_in_variant(record_ty, selector.symbol) {
                    self.gen_variant_guard(record_ty, selector.symbol, &base);
                }

                let offset = self.field_offset(record_ty, field_index);
                let dst = self.make_temp(ValueKind::Ptr);
                self.emit(Instruction::FieldAddr {
                    dst,
                    base,
                    index: offset,
                });
                Operand::Temp(dst)
            }

            ExprKind::Index { prefix, args } => {
                let array_ty = prefix.ty;
                let descriptor = self.gen_expr(prefix);
                self.gen_element_addr(array_ty, descriptor, args)
            }

            ExprKind::Slice { prefix, range } => self.gen_slice(prefix, range),

            ExprKind::Conversion { operand, .. } => self.gen_addr(operand),

            // a computed value used as a base (function results,
            // aggregates): its value already is an address
            _ => self.gen_expr(expr),
        }
    }

    /// Check the discriminant of `record` still selects the variant
    /// arm that declares `field`.
    fn gen_variant_guard(&mut self, record_ty: TypeId, field: shared_context::interner::Symbol, base: &Operand) {
        let TypeKind::Record {
            variant: Some(variant),
            ..
        } = self.ctx.types.structural_kind(record_ty).clone()
        else {
            return;
        };
        let Some(arm) = variant
            .arms
            .iter()
            .find(|arm| arm.components.iter().any(|c| c.name == field))
        else {
            return;
        };
        if arm.is_others {
            return;
        }
        let Some((disc_index, _)) = self
            .ctx
            .types
            .field_index(record_ty, variant.discriminant)
        else {
            return;
        };

        let offset = self.field_offset(record_ty, disc_index);
        let addr = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::FieldAddr {
            dst: addr,
            base: base.clone(),
            index: offset,
        });
        let discriminant = self.load(Operand::Temp(addr), ValueKind::I64);
        self.discriminant_check(&discriminant, &arm.choices);
    }

    /// Address of `A(I, ...)`: row-major offset from the descriptor's
    /// per-dimension bounds, with an INDEX check per dimension.
    fn gen_element_addr(
        &mut self,
        array_ty: TypeId,
        descriptor: Operand,
        args: &[ast::Argument],
    ) -> Operand {
        let dims = self
            .ctx
            .types
            .array_indexes(array_ty)
            .map(|ix| ix.len())
            .unwrap_or(1);
        let component = self
            .ctx
            .types
            .array_component(array_ty)
            .unwrap_or(TypeId::INVALID);
        let component_cells = self.type_cells(component);

        // offset accumulates row-major across the dimensions
        let mut offset = Operand::ConstInt(0);
        for (dim, arg) in args.iter().enumerate().take(dims) {
            let index = self.gen_expr(&arg.value);

            let first_addr = self.make_temp(ValueKind::Ptr);
            self.emit(Instruction::FieldAddr {
                dst: first_addr,
                base: descriptor.clone(),
                index: 1 + 2 * dim as u32,
            });
            let first = self.load(Operand::Temp(first_addr), ValueKind::I64);
            let last_addr = self.make_temp(ValueKind::Ptr);
            self.emit(Instruction::FieldAddr {
                dst: last_addr,
                base: descriptor.clone(),
                index: 2 + 2 * dim as u32,
            });
            let last = self.load(Operand::Temp(last_addr), ValueKind::I64);

            self.index_check(&index, first.clone(), last.clone());

            let relative = self.binary(BinOp::Sub, ValueKind::I64, index, first);
            if dim > 0 {
                let length = self.binary(
                    BinOp::Sub,
                    ValueKind::I64,
                    last.clone(),
                    Operand::ConstInt(0),
                );
                // length of this dimension scales the accumulator
                let span_addr = self.make_temp(ValueKind::Ptr);
                self.emit(Instruction::FieldAddr {
                    dst: span_addr,
                    base: descriptor.clone(),
                    index: 1 + 2 * dim as u32,
                });
                let span_first = self.load(Operand::Temp(span_addr), ValueKind::I64);
                let span = self.binary(BinOp::Sub, ValueKind::I64, length, span_first);
                let span = self.binary(
                    BinOp::Add,
                    ValueKind::I64,
                    span,
                    Operand::ConstInt(1),
                );
                offset = self.binary(BinOp::Mul, ValueKind::I64, offset, span);
            }
            offset = self.binary(BinOp::Add, ValueKind::I64, offset, relative);
        }

        if component_cells > 1 {
            offset = self.binary(
                BinOp::Mul,
                ValueKind::I64,
                offset,
                Operand::ConstInt(component_cells as i64),
            );
        }

        let data_addr = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::FieldAddr {
            dst: data_addr,
            base: descriptor,
            index: 0,
        });
        let data = self.load(Operand::Temp(data_addr), ValueKind::Ptr);
        let dst = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::IndexAddr {
            dst,
            base: data,
            offset,
        });
        Operand::Temp(dst)
    }

    /// Lower `A(LOW .. HIGH)` into a fresh descriptor sharing A's
    /// data.
    fn gen_slice(&mut self, prefix: &ast::Expression, range: &ast::RangeExpr) -> Operand {
        let base = self.gen_expr(prefix);
        let low = self.gen_expr(&range.low);
        let high = self.gen_expr(&range.high);

        let first = self.descriptor_bound(&base, 0, true);
        let last = self.descriptor_bound(&base, 0, false);

        // a non-null slice must stay inside the prefix bounds
        if self.checked(Check::Index) {
            let non_null = self.compare(Cond::Le, ValueKind::I64, low.clone(), high.clone());
            let null_range = self.binary(
                BinOp::Xor,
                ValueKind::I64,
                non_null.clone(),
                Operand::ConstInt(1),
            );
            let low_ok = self.compare(Cond::Ge, ValueKind::I64, low.clone(), first.clone());
            let high_ok = self.compare(Cond::Le, ValueKind::I64, high.clone(), last);
            let in_bounds = self.binary(BinOp::And, ValueKind::I64, low_ok, high_ok);
            let ok = self.binary(BinOp::Or, ValueKind::I64, null_range, in_bounds);
            self.emit_guard(ok, runtime::CONSTRAINT_ERROR);
        }

        let data_addr = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::FieldAddr {
            dst: data_addr,
            base: base.clone(),
            index: 0,
        });
        let data = self.load(Operand::Temp(data_addr), ValueKind::Ptr);
        let relative = self.binary(BinOp::Sub, ValueKind::I64, low.clone(), first);
        let new_data = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::IndexAddr {
            dst: new_data,
            base: data,
            offset: relative,
        });

        let descriptor = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::Alloca {
            dst: descriptor,
            cells: 3,
        });
        self.store_descriptor_slot(descriptor, 0, Operand::Temp(new_data));
        self.store_descriptor_slot(descriptor, 1, low);
        self.store_descriptor_slot(descriptor, 2, high);
        Operand::Temp(descriptor)
    }

    /// Read bound `dim` of an array descriptor (true = first).
    pub(crate) fn descriptor_bound(&mut self, descriptor: &Operand, dim: u32, first: bool) -> Operand {
        let index = 1 + 2 * dim + if first { 0 } else { 1 };
        let addr = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::FieldAddr {
            dst: addr,
            base: descriptor.clone(),
            index,
        });
        self.load(Operand::Temp(addr), ValueKind::I64)
    }

    pub(crate) fn store_descriptor_slot(&mut self, descriptor: Value, slot: u32, value: Operand) {
        let addr = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::FieldAddr {
            dst: addr,
            base: Operand::Temp(descriptor),
            index: slot,
        });
        self.store(value, Operand::Temp(addr));
    }

    // ------------------------------------------------------------------
    // operators
    // ------------------------------------------------------------------

    fn gen_binary(
        &mut self,
        result_ty: TypeId,
        op: BinaryOp,
        left: &ast::Expression,
        right: &ast::Expression,
    ) -> Operand {
        // comparisons look at the operand class, not the result's
        if matches!(
            op,
            BinaryOp::Eq | BinaryOp::Neq | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        ) {
            let kind = self.value_class(left.ty);
            let lhs = self.gen_expr(left);
            let rhs = self.gen_expr(right);
            let cond = match op {
                BinaryOp::Eq => Cond::Eq,
                BinaryOp::Neq => Cond::Ne,
                BinaryOp::Lt => Cond::Lt,
                BinaryOp::Le => Cond::Le,
                BinaryOp::Gt => Cond::Gt,
                _ => Cond::Ge,
            };
            return self.compare(cond, kind, lhs, rhs);
        }

        if op == BinaryOp::Concat {
            let lhs = self.gen_expr(left);
            let rhs = self.gen_expr(right);
            let dst = self.make_temp(ValueKind::Ptr);
            self.emit(Instruction::Call {
                dst: Some(dst),
                callee: "__ada_rt_concat".to_string(),
                args: vec![lhs, rhs],
            });
            return Operand::Temp(dst);
        }

        if op == BinaryOp::Pow {
            return self.gen_power(result_ty, left, right);
        }

        let kind = self.value_class(result_ty);
        let lhs = self.gen_expr(left);
        let rhs = self.gen_expr(right);

        match op {
            BinaryOp::Add | BinaryOp::Sub => {
                if kind == ValueKind::I64 {
                    self.overflow_check_add_sub(op == BinaryOp::Sub, &lhs, &rhs);
                }
                let bin = if op == BinaryOp::Add { BinOp::Add } else { BinOp::Sub };
                self.binary(bin, kind, lhs, rhs)
            }
            BinaryOp::Mul => {
                let product = self.binary(BinOp::Mul, kind, lhs.clone(), rhs.clone());
                if kind == ValueKind::I64 {
                    self.overflow_check_mul(&product, &lhs, &rhs);
                }
                product
            }
            BinaryOp::Div => {
                if kind == ValueKind::I64 {
                    self.division_check(&rhs);
                }
                self.binary(BinOp::Div, kind, lhs, rhs)
            }
            BinaryOp::Rem => {
                self.division_check(&rhs);
                self.binary(BinOp::Rem, ValueKind::I64, lhs, rhs)
            }
            BinaryOp::Mod => {
                self.division_check(&rhs);
                self.gen_mod(lhs, rhs)
            }
            BinaryOp::And => self.binary(BinOp::And, ValueKind::I64, lhs, rhs),
            BinaryOp::Or => self.binary(BinOp::Or, ValueKind::I64, lhs, rhs),
            BinaryOp::Xor => self.binary(BinOp::Xor, ValueKind::I64, lhs, rhs),
            _ => unreachable!("operator handled above"),
        }
    }

    /// Ada `mod`: remainder adjusted to the divisor's sign.
    ///
    /// ```text
    ///   r = a rem b
    ///   if r /= 0 and then sign(r) /= sign(b):
    ///     r = r + b
    /// ```
    fn gen_mod(&mut self, lhs: Operand, rhs: Operand) -> Operand {
        let result = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::Alloca {
            dst: result,
            cells: 1,
        });

        let rem = self.binary(BinOp::Rem, ValueKind::I64, lhs, rhs.clone());
        self.store(rem.clone(), Operand::Temp(result));

        let nonzero = self.compare(Cond::Ne, ValueKind::I64, rem.clone(), Operand::ConstInt(0));
        let rem_negative = self.compare(Cond::Lt, ValueKind::I64, rem.clone(), Operand::ConstInt(0));
        let div_negative = self.compare(Cond::Lt, ValueKind::I64, rhs.clone(), Operand::ConstInt(0));
        let signs_differ = self.binary(BinOp::Xor, ValueKind::I64, rem_negative, div_negative);
        let adjust = self.binary(BinOp::And, ValueKind::I64, nonzero, signs_differ);

        let adjust_label = self.make_label();
        let done_label = self.make_label();
        self.emit(Instruction::Branch {
            cond: adjust,
            then_label: adjust_label,
            else_label: done_label,
        });
        self.emit_label(adjust_label);
        let adjusted = self.binary(BinOp::Add, ValueKind::I64, rem, rhs);
        self.store(adjusted, Operand::Temp(result));
        self.emit(Instruction::Jump(done_label));
        self.emit_label(done_label);

        self.load(Operand::Temp(result), ValueKind::I64)
    }

    /// `**`: exponentiation by squaring for integers, the runtime
    /// for floats. A negative integer exponent raises
    /// CONSTRAINT_ERROR.
    fn gen_power(
        &mut self,
        result_ty: TypeId,
        left: &ast::Expression,
        right: &ast::Expression,
    ) -> Operand {
        let base = self.gen_expr(left);
        let exponent = self.gen_expr(right);

        if self.value_class(result_ty) == ValueKind::F64 {
            let float_exp = match exponent.kind() {
                ValueKind::F64 => exponent,
                _ => {
                    let dst = self.make_temp(ValueKind::F64);
                    self.emit(Instruction::IntToFloat { dst, src: exponent });
                    Operand::Temp(dst)
                }
            };
            let dst = self.make_temp(ValueKind::F64);
            self.emit(Instruction::Call {
                dst: Some(dst),
                callee: "__ada_rt_pow_f64".to_string(),
                args: vec![base, float_exp],
            });
            return Operand::Temp(dst);
        }

        let non_negative =
            self.compare(Cond::Ge, ValueKind::I64, exponent.clone(), Operand::ConstInt(0));
        self.emit_guard(non_negative, runtime::CONSTRAINT_ERROR);

        // result = 1; while exp > 0 { if odd(exp) result *= base;
        // base *= base; exp /= 2 }
        let result = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::Alloca { dst: result, cells: 1 });
        let base_slot = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::Alloca { dst: base_slot, cells: 1 });
        let exp_slot = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::Alloca { dst: exp_slot, cells: 1 });

        self.store(Operand::ConstInt(1), Operand::Temp(result));
        self.store(base, Operand::Temp(base_slot));
        self.store(exponent, Operand::Temp(exp_slot));

        let head = self.make_label();
        let body = self.make_label();
        let odd_label = self.make_label();
        let even_label = self.make_label();
        let exit = self.make_label();

        self.emit(Instruction::Jump(head));
        self.emit_label(head);
        let exp = self.load(Operand::Temp(exp_slot), ValueKind::I64);
        let running = self.compare(Cond::Gt, ValueKind::I64, exp.clone(), Operand::ConstInt(0));
        self.emit(Instruction::Branch {
            cond: running,
            then_label: body,
            else_label: exit,
        });

        self.emit_label(body);
        let odd = self.binary(BinOp::And, ValueKind::I64, exp.clone(), Operand::ConstInt(1));
        self.emit(Instruction::Branch {
            cond: odd,
            then_label: odd_label,
            else_label: even_label,
        });

        self.emit_label(odd_label);
        let acc = self.load(Operand::Temp(result), ValueKind::I64);
        let squared_base = self.load(Operand::Temp(base_slot), ValueKind::I64);
        let new_acc = self.binary(BinOp::Mul, ValueKind::I64, acc, squared_base);
        self.store(new_acc, Operand::Temp(result));
        self.emit(Instruction::Jump(even_label));

        self.emit_label(even_label);
        let current_base = self.load(Operand::Temp(base_slot), ValueKind::I64);
        let next_base = self.binary(
            BinOp::Mul,
            ValueKind::I64,
            current_base.clone(),
            current_base,
        );
        self.store(next_base, Operand::Temp(base_slot));
        let next_exp = self.binary(BinOp::Div, ValueKind::I64, exp, Operand::ConstInt(2));
        self.store(next_exp, Operand::Temp(exp_slot));
        self.emit(Instruction::Jump(head));

        self.emit_label(exit);
        self.load(Operand::Temp(result), ValueKind::I64)
    }

    fn gen_abs(&mut self, kind: ValueKind, value: Operand) -> Operand {
        let result = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::Alloca { dst: result, cells: 1 });
        self.store(value.clone(), Operand::Temp(result));

        let zero = if kind == ValueKind::F64 {
            Operand::ConstFloat(0.0)
        } else {
            Operand::ConstInt(0)
        };
        let negative = self.compare(Cond::Lt, kind, value.clone(), zero.clone());
        let negate_label = self.make_label();
        let done_label = self.make_label();
        self.emit(Instruction::Branch {
            cond: negative,
            then_label: negate_label,
            else_label: done_label,
        });
        self.emit_label(negate_label);
        let negated = self.binary(BinOp::Sub, kind, zero, value);
        self.store(negated, Operand::Temp(result));
        self.emit(Instruction::Jump(done_label));
        self.emit_label(done_label);

        self.load(Operand::Temp(result), kind)
    }

    /// Short-circuit forms: the right operand's code sits behind a
    /// branch the left operand decides.
    ///
    /// ```text
    /// a and then b:            a or else b:
    ///   r = a                    r = a
    ///   cbr r, rhs, end          cbr r, end, rhs
    /// rhs:                     rhs:
    ///   r = b                    r = b
    /// end:                     end:
    /// ```
    fn gen_short_circuit(
        &mut self,
        op: ShortCircuitOp,
        left: &ast::Expression,
        right: &ast::Expression,
    ) -> Operand {
        let result = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::Alloca { dst: result, cells: 1 });

        let rhs_label = self.make_label();
        let end_label = self.make_label();

        let lhs = self.gen_expr(left);
        self.store(lhs.clone(), Operand::Temp(result));
        match op {
            ShortCircuitOp::AndThen => self.emit(Instruction::Branch {
                cond: lhs,
                then_label: rhs_label,
                else_label: end_label,
            }),
            ShortCircuitOp::OrElse => self.emit(Instruction::Branch {
                cond: lhs,
                then_label: end_label,
                else_label: rhs_label,
            }),
        }

        self.emit_label(rhs_label);
        let rhs = self.gen_expr(right);
        self.store(rhs, Operand::Temp(result));
        self.emit(Instruction::Jump(end_label));

        self.emit_label(end_label);
        self.load(Operand::Temp(result), ValueKind::I64)
    }

    /// `X in A .. B` lowers to two comparisons.
    fn gen_membership(
        &mut self,
        negated: bool,
        operand: &ast::Expression,
        target: &ast::MembershipTarget,
    ) -> Operand {
        let kind = self.value_class(operand.ty);
        let value = self.gen_expr(operand);

        let (low, high) = match target {
            ast::MembershipTarget::Range(range) => {
                (self.gen_expr(&range.low), self.gen_expr(&range.high))
            }
            ast::MembershipTarget::Mark(mark) => {
                match self.ctx.types.discrete_bounds(mark.ty) {
                    Some((first, last)) => {
                        (Operand::ConstInt(first), Operand::ConstInt(last))
                    }
                    None => {
                        // dynamic subtype bounds default to the base
                        return if negated {
                            Operand::ConstInt(0)
                        } else {
                            Operand::ConstInt(1)
                        };
                    }
                }
            }
        };

        let ge = self.compare(Cond::Ge, kind, value.clone(), low);
        let le = self.compare(Cond::Le, kind, value, high);
        let inside = self.binary(BinOp::And, ValueKind::I64, ge, le);
        if negated {
            self.binary(BinOp::Xor, ValueKind::I64, inside, Operand::ConstInt(1))
        } else {
            inside
        }
    }

    // ------------------------------------------------------------------
    // numeric conversion
    // ------------------------------------------------------------------

    /// Convert a numeric value between the IR representations of two
    /// Ada types. Fixed point values scale through double.
    pub(crate) fn convert_numeric(&mut self, value: Operand, from: TypeId, to: TypeId) -> Operand {
        let from_fixed = self.fixed_small(from);
        let to_fixed = self.fixed_small(to);
        let from_kind = self.value_class(from);
        let to_kind = self.value_class(to);

        // plain same-representation conversion
        if from_fixed.is_none() && to_fixed.is_none() && from_kind == to_kind {
            return value;
        }

        // widen the source to double
        let mut real = match (from_kind, from_fixed) {
            (ValueKind::F64, _) => value,
            (_, Some(small)) => {
                let dst = self.make_temp(ValueKind::F64);
                self.emit(Instruction::IntToFloat { dst, src: value });
                self.binary(
                    BinOp::Mul,
                    ValueKind::F64,
                    Operand::Temp(dst),
                    Operand::ConstFloat(small),
                )
            }
            _ => {
                let dst = self.make_temp(ValueKind::F64);
                self.emit(Instruction::IntToFloat { dst, src: value });
                Operand::Temp(dst)
            }
        };

        // narrow to the target representation
        match (to_kind, to_fixed) {
            (ValueKind::F64, None) => real,
            (_, Some(small)) => {
                real = self.binary(
                    BinOp::Div,
                    ValueKind::F64,
                    real,
                    Operand::ConstFloat(small),
                );
                let dst = self.make_temp(ValueKind::I64);
                self.emit(Instruction::FloatToInt { dst, src: real });
                Operand::Temp(dst)
            }
            _ => {
                let dst = self.make_temp(ValueKind::I64);
                self.emit(Instruction::FloatToInt { dst, src: real });
                Operand::Temp(dst)
            }
        }
    }

    fn fixed_small(&self, ty: TypeId) -> Option<f64> {
        match self.ctx.types.structural_kind(ty) {
            TypeKind::Fixed { small, .. } => Some(*small),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // attributes
    // ------------------------------------------------------------------

    fn gen_attribute(&mut self, expr: &ast::Expression) -> Operand {
        let ExprKind::Attribute {
            prefix,
            attribute,
            arg,
        } = &expr.kind
        else {
            return Operand::ConstInt(0);
        };
        let name = self.ctx.interner.lookup(attribute.symbol).to_string();

        // a prefix that denotes a type uses static information; an
        // array object reads its descriptor
        let prefix_is_type = prefix
            .sym
            .map(|sym| {
                matches!(
                    self.ctx.symbols.get(sym).kind,
                    SymbolKind::Type | SymbolKind::Subtype
                )
            })
            .unwrap_or(false);

        match name.as_str() {
            "first" | "last" => {
                if prefix_is_type {
                    let bounds = self.ctx.types.discrete_bounds(prefix.ty).or_else(|| {
                        self.static_index_ranges(prefix.ty)
                            .and_then(|ranges| ranges.first().copied())
                    });
                    let (first, last) = bounds.unwrap_or((0, 0));
                    Operand::ConstInt(if name == "first" { first } else { last })
                } else {
                    let descriptor = self.gen_expr(prefix);
                    self.descriptor_bound(&descriptor, 0, name == "first")
                }
            }
            "length" => {
                let (first, last) = if prefix_is_type {
                    match self
                        .static_index_ranges(prefix.ty)
                        .and_then(|ranges| ranges.first().copied())
                    {
                        Some((first, last)) => {
                            return Operand::ConstInt((last - first + 1).max(0));
                        }
                        None => (Operand::ConstInt(0), Operand::ConstInt(0)),
                    }
                } else {
                    let descriptor = self.gen_expr(prefix);
                    (
                        self.descriptor_bound(&descriptor, 0, true),
                        self.descriptor_bound(&descriptor, 0, false),
                    )
                };
                let span = self.binary(BinOp::Sub, ValueKind::I64, last, first);
                self.binary(BinOp::Add, ValueKind::I64, span, Operand::ConstInt(1))
            }
            "pos" => match arg {
                Some(arg) => self.gen_expr(arg),
                None => Operand::ConstInt(0),
            },
            "val" => {
                let value = match arg {
                    Some(arg) => self.gen_expr(arg),
                    None => Operand::ConstInt(0),
                };
                self.range_check(&value, prefix.ty);
                value
            }
            "succ" | "pred" => {
                let value = match arg {
                    Some(arg) => self.gen_expr(arg),
                    None => Operand::ConstInt(0),
                };
                let op = if name == "succ" { BinOp::Add } else { BinOp::Sub };
                let stepped = self.binary(op, ValueKind::I64, value, Operand::ConstInt(1));
                self.range_check(&stepped, prefix.ty);
                stepped
            }
            "image" => {
                let value = match arg {
                    Some(arg) => self.gen_expr(arg),
                    None => Operand::ConstInt(0),
                };
                let dst = self.make_temp(ValueKind::Ptr);
                self.emit(Instruction::Call {
                    dst: Some(dst),
                    callee: "__ada_rt_image_int".to_string(),
                    args: vec![value],
                });
                Operand::Temp(dst)
            }
            "value" => {
                let text = match arg {
                    Some(arg) => self.gen_expr(arg),
                    None => Operand::Null,
                };
                let dst = self.make_temp(ValueKind::I64);
                self.emit(Instruction::Call {
                    dst: Some(dst),
                    callee: "__ada_rt_value_int".to_string(),
                    args: vec![text],
                });
                let value = Operand::Temp(dst);
                self.range_check(&value, prefix.ty);
                value
            }
            "size" => Operand::ConstInt(self.type_cells(prefix.ty) as i64 * 64),
            "small" | "delta" => {
                let value = match self.ctx.types.structural_kind(prefix.ty) {
                    TypeKind::Fixed { delta, small } => {
                        if name == "small" { *small } else { *delta }
                    }
                    _ => 0.0,
                };
                Operand::ConstFloat(value)
            }
            "digits" => {
                let value = match self.ctx.types.structural_kind(prefix.ty) {
                    TypeKind::Float { digits } => *digits as i64,
                    _ => 0,
                };
                Operand::ConstInt(value)
            }
            _ => Operand::ConstInt(0),
        }
    }

    // ------------------------------------------------------------------
    // calls
    // ------------------------------------------------------------------

    /// Lower a resolved call. Returns the result value for
    /// functions, None for procedures and entries.
    pub(crate) fn gen_call(&mut self, expr: &ast::Expression) -> Option<Operand> {
        let ExprKind::Call { prefix, args } = &expr.kind else {
            return None;
        };
        let sym = expr.sym?;
        let entry = self.ctx.symbols.get(sym).clone();

        match &entry.kind {
            SymbolKind::Entry { .. } => {
                self.gen_entry_call(prefix, args, sym);
                None
            }
            SymbolKind::Subprogram { signature } => {
                let signature = signature.clone();
                let mut lowered: Vec<Operand> = Vec::new();

                // composite results return through a pointer the
                // caller provides first
                let result_ptr = signature.result.filter(|&ty| self.is_composite(ty)).map(
                    |result_ty| {
                        let cells = self.type_cells(result_ty);
                        let dst = self.make_temp(ValueKind::Ptr);
                        self.emit(Instruction::Alloca { dst, cells });
                        dst
                    },
                );
                if let Some(ptr) = result_ptr {
                    lowered.push(Operand::Temp(ptr));
                }

                // nested subprograms receive their static link next
                if !entry.external {
                    let level = self.subprogram_level(sym);
                    if level > 0 {
                        let link = self.static_link_for(level);
                        lowered.push(link);
                    }
                }

                for (param, arg) in signature.params.iter().zip(args.iter()) {
                    let by_ref = !matches!(param.mode, Mode::In)
                        || self.is_composite(param.ty);
                    if by_ref {
                        if matches!(param.mode, Mode::In) {
                            // composite in parameter: its value is
                            // already an address
                            lowered.push(self.gen_expr(&arg.value));
                        } else {
                            lowered.push(self.gen_addr(&arg.value));
                        }
                    } else {
                        let value = self.gen_expr(&arg.value);
                        self.range_check(&value, param.ty);
                        lowered.push(value);
                    }
                }

                // cross-unit callees surface in the prelude
                let ret_kind = match signature.result {
                    Some(ty) if !self.is_composite(ty) => self.value_class(ty),
                    _ => ValueKind::Void,
                };
                let param_kinds: Vec<ValueKind> =
                    lowered.iter().map(|operand| operand.kind()).collect();
                self.declare_external(&entry.mangled, param_kinds, ret_kind);

                let dst = match signature.result {
                    Some(ty) if !self.is_composite(ty) => {
                        Some(self.make_temp(self.value_class(ty)))
                    }
                    _ => None,
                };
                self.emit(Instruction::Call {
                    dst,
                    callee: entry.mangled.clone(),
                    args: lowered,
                });

                match (dst, result_ptr) {
                    (Some(value), _) => Some(Operand::Temp(value)),
                    (None, Some(ptr)) => Some(Operand::Temp(ptr)),
                    (None, None) => None,
                }
            }
            _ => None,
        }
    }

    /// The static link to pass to a callee at nesting level `level`:
    /// the frame of its lexical parent, found by chasing the current
    /// chain.
    fn static_link_for(&mut self, level: u32) -> Operand {
        let mut link = Operand::Temp(self.frame.expect("static link without a frame"));
        let mut hops = self.depth + 1 - level;
        while hops > 0 {
            let addr = self.make_temp(ValueKind::Ptr);
            self.emit(Instruction::FieldAddr {
                dst: addr,
                base: link,
                index: 0,
            });
            let loaded = self.make_temp(ValueKind::Ptr);
            self.emit(Instruction::Load {
                dst: loaded,
                addr: Operand::Temp(addr),
            });
            link = Operand::Temp(loaded);
            hops -= 1;
        }
        link
    }

    /// An entry call: marshal the actuals into a buffer and hand it
    /// to the rendezvous runtime with the task handle and entry
    /// index.
    fn gen_entry_call(&mut self, prefix: &ast::Expression, args: &[ast::Argument], sym: SymbolId) {
        let entry = self.ctx.symbols.get(sym).clone();
        let SymbolKind::Entry { signature } = &entry.kind else {
            return;
        };
        let signature = signature.clone();

        // the task object is the prefix of the selected entry name
        let task = match &prefix.kind {
            ExprKind::Selected { prefix: task, .. } => self.gen_expr(task),
            _ => Operand::Null,
        };
        let entry_index = self.entry_index(prefix, entry.name);

        let buffer = self.make_temp(ValueKind::Ptr);
        let cells = (signature.params.len() as u32).max(1);
        self.emit(Instruction::Alloca { dst: buffer, cells });
        for (slot, (param, arg)) in signature.params.iter().zip(args.iter()).enumerate() {
            let value = if matches!(param.mode, Mode::In) && !self.is_composite(param.ty) {
                self.gen_expr(&arg.value)
            } else {
                self.gen_addr(&arg.value)
            };
            let addr = self.make_temp(ValueKind::Ptr);
            self.emit(Instruction::FieldAddr {
                dst: addr,
                base: Operand::Temp(buffer),
                index: slot as u32,
            });
            self.store(value, Operand::Temp(addr));
        }

        self.emit(Instruction::Call {
            dst: None,
            callee: "__ada_rt_entry_call".to_string(),
            args: vec![task, Operand::ConstInt(entry_index), Operand::Temp(buffer)],
        });
    }

    /// Position of an entry within its task type's entry list.
    pub(crate) fn entry_index(
        &self,
        prefix: &ast::Expression,
        entry_name: shared_context::interner::Symbol,
    ) -> i64 {
        let task_ty = match &prefix.kind {
            ExprKind::Selected { prefix: task, .. } => task.ty,
            _ => TypeId::INVALID,
        };
        if !task_ty.is_valid() {
            return 0;
        }
        match self.ctx.types.structural_kind(task_ty) {
            TypeKind::Task { entries } => entries
                .iter()
                .position(|&name| name == entry_name)
                .unwrap_or(0) as i64,
            _ => 0,
        }
    }

    // ------------------------------------------------------------------
    // aggregates and allocators
    // ------------------------------------------------------------------

    fn gen_aggregate(&mut self, expr: &ast::Expression) -> Operand {
        let ty = expr.ty;
        let cells = self.type_cells(ty);
        let base = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::Alloca { dst: base, cells });

        if self.ctx.types.is_record(ty) {
            self.fill_record_aggregate(expr, ty, base);
        } else if self.ctx.types.is_array(ty) {
            self.fill_array_aggregate(expr, ty, base);
        }
        Operand::Temp(base)
    }

    fn fill_record_aggregate(&mut self, expr: &ast::Expression, ty: TypeId, base: Value) {
        let ExprKind::Aggregate { items } = &expr.kind else {
            return;
        };
        let fields = self.ctx.types.record_fields(ty);
        let mut assigned = vec![false; fields.len()];

        // explicit components first, others fills the rest
        for item in items {
            let Some(index) = item.field else { continue };
            assigned[index] = true;
            let value = self.gen_expr(&item.value);
            let offset = self.field_offset(ty, index);
            self.store_field(base, offset, value, fields[index].ty);
        }
        for item in items {
            if item.field.is_some() {
                continue;
            }
            let value = self.gen_expr(&item.value);
            for (index, field) in fields.iter().enumerate() {
                if assigned[index] {
                    continue;
                }
                let offset = self.field_offset(ty, index);
                self.store_field(base, offset, value.clone(), field.ty);
            }
        }
    }

    fn store_field(&mut self, base: Value, offset: u32, value: Operand, field_ty: TypeId) {
        let addr = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::FieldAddr {
            dst: addr,
            base: Operand::Temp(base),
            index: offset,
        });
        if self.is_composite(field_ty) {
            let cells = self.type_cells(field_ty);
            self.copy_cells(value, Operand::Temp(addr), cells);
        } else {
            self.store(value, Operand::Temp(addr));
        }
    }

    fn fill_array_aggregate(&mut self, expr: &ast::Expression, ty: TypeId, base: Value) {
        let ExprKind::Aggregate { items } = &expr.kind else {
            return;
        };
        let component = self
            .ctx
            .types
            .array_component(ty)
            .unwrap_or(TypeId::INVALID);
        let component_cells = self.type_cells(component);

        // bounds: the constrained subtype's, or 1 .. n positionally
        let (first, last) = self
            .static_index_ranges(ty)
            .and_then(|ranges| ranges.first().copied())
            .unwrap_or((1, items.len() as i64));

        // descriptor ahead of the inline data
        let data = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::FieldAddr {
            dst: data,
            base: Operand::Temp(base),
            index: 3,
        });
        self.store_descriptor_slot(base, 0, Operand::Temp(data));
        self.store_descriptor_slot(base, 1, Operand::ConstInt(first));
        self.store_descriptor_slot(base, 2, Operand::ConstInt(last));

        // an others part fills everything first
        for item in items {
            let has_others = item
                .choices
                .iter()
                .any(|choice| matches!(choice.kind, ast::ChoiceKind::Others));
            if has_others {
                let value = self.gen_expr(&item.value);
                let length = (last - first + 1).max(0);
                self.fill_elements(data, 0, length, component_cells, value);
            }
        }

        for item in items {
            if let Some(offset) = item.field {
                let value = self.gen_expr(&item.value);
                let addr = self.make_temp(ValueKind::Ptr);
                self.emit(Instruction::IndexAddr {
                    dst: addr,
                    base: Operand::Temp(data),
                    offset: Operand::ConstInt(offset as i64 * component_cells as i64),
                });
                if self.is_composite(component) {
                    self.copy_cells(value, Operand::Temp(addr), component_cells);
                } else {
                    self.store(value, Operand::Temp(addr));
                }
                continue;
            }
            // static range choices expand to element runs
            for choice in &item.choices {
                if let Some((low, high)) = choice.value {
                    let value = self.gen_expr(&item.value);
                    self.fill_elements(
                        data,
                        low - first,
                        high - low + 1,
                        component_cells,
                        value,
                    );
                }
            }
        }
    }

    /// Store `value` into `count` consecutive elements starting at
    /// element offset `start`.
    fn fill_elements(
        &mut self,
        data: Value,
        start: i64,
        count: i64,
        component_cells: u32,
        value: Operand,
    ) {
        if count <= 0 {
            return;
        }

        let counter = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::Alloca { dst: counter, cells: 1 });
        self.store(Operand::ConstInt(start), Operand::Temp(counter));
        let limit = start + count;

        let head = self.make_label();
        let body = self.make_label();
        let exit = self.make_label();

        self.emit(Instruction::Jump(head));
        self.emit_label(head);
        let current = self.load(Operand::Temp(counter), ValueKind::I64);
        let running = self.compare(
            Cond::Lt,
            ValueKind::I64,
            current.clone(),
            Operand::ConstInt(limit),
        );
        self.emit(Instruction::Branch {
            cond: running,
            then_label: body,
            else_label: exit,
        });

        self.emit_label(body);
        let scaled = self.binary(
            BinOp::Mul,
            ValueKind::I64,
            current.clone(),
            Operand::ConstInt(component_cells as i64),
        );
        let addr = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::IndexAddr {
            dst: addr,
            base: Operand::Temp(data),
            offset: scaled,
        });
        self.store(value.clone(), Operand::Temp(addr));
        let next = self.binary(BinOp::Add, ValueKind::I64, current, Operand::ConstInt(1));
        self.store(next, Operand::Temp(counter));
        self.emit(Instruction::Jump(head));

        self.emit_label(exit);
    }

    /// Copy `cells` cells from one base address to another.
    pub(crate) fn copy_cells(&mut self, src: Operand, dst: Operand, cells: u32) {
        for index in 0..cells {
            let from = self.make_temp(ValueKind::Ptr);
            self.emit(Instruction::FieldAddr {
                dst: from,
                base: src.clone(),
                index,
            });
            let value = self.load(Operand::Temp(from), ValueKind::I64);
            let to = self.make_temp(ValueKind::Ptr);
            self.emit(Instruction::FieldAddr {
                dst: to,
                base: dst.clone(),
                index,
            });
            self.store(value, Operand::Temp(to));
        }
    }

    /// `new T [ics]'(INIT)`: heap cells from the runtime, a STORAGE
    /// check, descriptor setup for arrays, then the initial value.
    fn gen_allocator(
        &mut self,
        subtype: &ast::SubtypeIndication,
        initial: &Option<Box<ast::Expression>>,
    ) -> Operand {
        let designated = subtype.ty;
        let cells = self.type_cells(designated);

        let pointer = self.make_temp(ValueKind::Ptr);
        self.emit(Instruction::Call {
            dst: Some(pointer),
            callee: "__ada_rt_alloc".to_string(),
            args: vec![Operand::ConstInt(cells as i64 * 8)],
        });
        let pointer = Operand::Temp(pointer);
        self.storage_check(&pointer);

        // arrays carry their descriptor at the front of the block
        if self.ctx.types.is_array(designated) {
            if let Some(ranges) = self.static_index_ranges(designated) {
                let data = self.make_temp(ValueKind::Ptr);
                self.emit(Instruction::FieldAddr {
                    dst: data,
                    base: pointer.clone(),
                    index: Self::descriptor_cells(ranges.len()),
                });
                if let Operand::Temp(descriptor) = pointer.clone() {
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
                }
            }
        }

        if let Some(initial) = initial {
            let value = self.gen_expr(initial);
            if self.is_composite(designated) {
                if self.ctx.types.is_array(designated) {
                    self.emit(Instruction::Call {
                        dst: None,
                        callee: "__ada_rt_array_copy".to_string(),
                        args: vec![
                            pointer.clone(),
                            value,
                            Operand::ConstInt(self.checked(Check::Length) as i64),
                        ],
                    });
                } else {
                    self.copy_cells(value, pointer.clone(), cells);
                }
            } else {
                self.store(value, pointer.clone());
            }
        } else if self.ctx.types.is_record(designated) {
            self.gen_record_defaults(designated, &pointer);
        }

        pointer
    }

    /// Store the static defaults of a record's fields (defaulted
    /// discriminants included).
    pub(crate) fn gen_record_defaults(&mut self, ty: TypeId, base: &Operand) {
        let fields = self.ctx.types.record_fields(ty);
        for (index, field) in fields.iter().enumerate() {
            let Some(default) = field.default else { continue };
            let offset = self.field_offset(ty, index);
            let addr = self.make_temp(ValueKind::Ptr);
            self.emit(Instruction::FieldAddr {
                dst: addr,
                base: base.clone(),
                index: offset,
            });
            self.store(Operand::ConstInt(default), Operand::Temp(addr));
        }
    }
}
