use crate::Emitter;
use ir_gen::ssa::{BinOp, Cond, Instruction, Operand};
use std::io;

impl<'m> Emitter<'m> {
    /// Writes a single instruction to the output.
    pub(crate) fn write_instruction(
        &self,
        instruction: &Instruction,
        out: &mut impl io::Write,
    ) -> io::Result<()> {
        match instruction {
            Instruction::Alloca { dst, cells } => {
                writeln!(out, "  %t{} = alloca {}", dst.id, cells)
            }
            Instruction::Load { dst, addr } => writeln!(
                out,
                "  %t{} = load {} {}",
                dst.id,
                Emitter::kind_name(dst.kind),
                Emitter::operand(addr)
            ),
            Instruction::Store { src, addr } => writeln!(
                out,
                "  store {} {}, {}",
                Emitter::kind_name(src.kind()),
                Emitter::operand(src),
                Emitter::operand(addr)
            ),
            Instruction::FieldAddr { dst, base, index } => writeln!(
                out,
                "  %t{} = field {}, {}",
                dst.id,
                Emitter::operand(base),
                index
            ),
            Instruction::IndexAddr { dst, base, offset } => writeln!(
                out,
                "  %t{} = index {}, {}",
                dst.id,
                Emitter::operand(base),
                Emitter::operand(offset)
            ),
            Instruction::Binary {
                op,
                kind,
                dst,
                left,
                right,
            } => writeln!(
                out,
                "  %t{} = {}.{} {}, {}",
                dst.id,
                Emitter::binop_name(*op),
                Emitter::kind_name(*kind),
                Emitter::operand(left),
                Emitter::operand(right)
            ),
            Instruction::Compare {
                cond,
                kind,
                dst,
                left,
                right,
            } => writeln!(
                out,
                "  %t{} = cmp.{}.{} {}, {}",
                dst.id,
                Emitter::cond_name(*cond),
                Emitter::kind_name(*kind),
                Emitter::operand(left),
                Emitter::operand(right)
            ),
            Instruction::IntToFloat { dst, src } => writeln!(
                out,
                "  %t{} = sitofp {}",
                dst.id,
                Emitter::operand(src)
            ),
            Instruction::FloatToInt { dst, src } => writeln!(
                out,
                "  %t{} = fptosi.round {}",
                dst.id,
                Emitter::operand(src)
            ),
            Instruction::LabelDef(label) => writeln!(out, "L{}:", label.0),
            Instruction::Jump(label) => writeln!(out, "  br L{}", label.0),
            Instruction::Branch {
                cond,
                then_label,
                else_label,
            } => writeln!(
                out,
                "  cbr {}, L{}, L{}",
                Emitter::operand(cond),
                then_label.0,
                else_label.0
            ),
            Instruction::JumpTable {
                value,
                base,
                targets,
                default,
            } => {
                let labels: Vec<String> =
                    targets.iter().map(|label| format!("L{}", label.0)).collect();
                writeln!(
                    out,
                    "  switch {}, base {}, [{}], default L{}",
                    Emitter::operand(value),
                    base,
                    labels.join(", "),
                    default.0
                )
            }
            Instruction::Call { dst, callee, args } => {
                let rendered: Vec<String> = args.iter().map(Emitter::operand).collect();
                match dst {
                    Some(dst) => writeln!(
                        out,
                        "  %t{} = call {} @{}({})",
                        dst.id,
                        Emitter::kind_name(dst.kind),
                        callee,
                        rendered.join(", ")
                    ),
                    None => writeln!(out, "  call void @{}({})", callee, rendered.join(", ")),
                }
            }
            Instruction::Ret(value) => match value {
                Some(value) => writeln!(
                    out,
                    "  ret {} {}",
                    Emitter::kind_name(value.kind()),
                    Emitter::operand(value)
                ),
                None => writeln!(out, "  ret void"),
            },
            Instruction::StrRef { dst, index } => {
                writeln!(out, "  %t{} = strref @.str{}", dst.id, index)
            }
            Instruction::GlobalAddr { dst, name } => {
                writeln!(out, "  %t{} = globaladdr @{}", dst.id, name)
            }
        }
    }

    fn operand(operand: &Operand) -> String {
        match operand {
            Operand::Temp(value) => format!("%t{}", value.id),
            Operand::ConstInt(value) => value.to_string(),
            Operand::ConstFloat(value) => {
                if value.fract() == 0.0 && value.is_finite() {
                    format!("{value:.1}")
                } else {
                    format!("{value}")
                }
            }
            Operand::Null => "null".to_string(),
            Operand::Func(name) => format!("@{name}"),
        }
    }

    fn binop_name(op: BinOp) -> &'static str {
        match op {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::Rem => "rem",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
        }
    }

    fn cond_name(cond: Cond) -> &'static str {
        match cond {
            Cond::Eq => "eq",
            Cond::Ne => "ne",
            Cond::Lt => "lt",
            Cond::Le => "le",
            Cond::Gt => "gt",
            Cond::Ge => "ge",
        }
    }
}
