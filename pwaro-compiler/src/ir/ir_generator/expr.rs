use super::context::Gen;
use crate::ir::ast::{BinOp, Expr, Width};
use crate::ir::error_utils::make_lowering_error;
use crate::ir::ir::{BinaryOp, Operand};
use crate::ir::types::Ty;
use crate::{CompileError, LoweringErrorKind};

/// A lowered expression together with the width it was computed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typed {
    pub value: Operand,
    pub width: Width,
}

pub fn map_arith(op: BinOp) -> (BinaryOp, &'static str) {
    match op {
        BinOp::Add => (BinaryOp::Add, "add"),
        BinOp::Sub => (BinaryOp::Sub, "sub"),
        BinOp::Mul => (BinaryOp::Mul, "mul"),
        BinOp::Div => (BinaryOp::SDiv, "div"),
    }
}

/// Parse an unsigned literal and check it fits in `width` bits.
pub fn literal_value(text: &str, width: Width) -> Option<u64> {
    let value: u64 = text.parse().ok()?;
    let bits = width.bits();
    if bits < 64 && value >> bits != 0 {
        return None;
    }
    Some(value)
}

impl Gen {
    pub fn eval_expr(&mut self, e: &Expr) -> Result<Typed, CompileError> {
        match e {
            Expr::Number { text, width, line } => {
                let value = literal_value(text, *width).ok_or_else(|| {
                    make_lowering_error(
                        LoweringErrorKind::LiteralOutOfRange,
                        *line,
                        format!("literal {text} does not fit in {width}"),
                    )
                })?;
                Ok(Typed {
                    value: Operand::const_int(Ty::from(*width), value as i64),
                    width: *width,
                })
            }
            Expr::Ident { name, line } => {
                let sym = self.symbols.lookup_variable(name).cloned().ok_or_else(|| {
                    make_lowering_error(
                        LoweringErrorKind::UndeclaredVariable,
                        *line,
                        format!("variable '{name}' is not declared"),
                    )
                })?;
                let loaded = self.builder.build_load(
                    &mut self.module,
                    Ty::from(sym.width),
                    sym.slot,
                    &format!("load_{name}"),
                )?;
                if sym.width < Width::WORKING {
                    let widened = self.builder.build_sext(
                        &mut self.module,
                        loaded,
                        Ty::from(Width::WORKING),
                        &format!("sext_{name}"),
                    )?;
                    return Ok(Typed {
                        value: widened,
                        width: Width::WORKING,
                    });
                }
                Ok(Typed {
                    value: loaded,
                    width: sym.width,
                })
            }
            Expr::Binary { .. } => self.eval_binary_chain(e),
            Expr::Call { name, line } => {
                let sym = self.symbols.lookup_function_mut(name).ok_or_else(|| {
                    make_lowering_error(
                        LoweringErrorKind::UndeclaredFunction,
                        *line,
                        format!("function '{name}' is not declared"),
                    )
                })?;
                if !sym.has_body && sym.first_call.is_none() {
                    sym.first_call = Some(*line);
                }
                let callee = sym.id;
                let value = self
                    .builder
                    .build_call(&mut self.module, callee, Vec::new(), "calltmp")?;
                Ok(Typed {
                    value,
                    width: Width::WORKING,
                })
            }
        }
    }

    /// Lower a left-nested operator chain. The spine is walked with a loop
    /// so chain length does not grow the call stack; operands still lower
    /// left to right.
    fn eval_binary_chain(&mut self, e: &Expr) -> Result<Typed, CompileError> {
        let mut spine = Vec::new();
        let mut leftmost = e;
        while let Expr::Binary {
            op,
            left,
            right,
            line,
        } = leftmost
        {
            spine.push((*op, right.as_ref(), *line));
            leftmost = left.as_ref();
        }

        let mut acc = self.eval_expr(leftmost)?;
        for (op, right, line) in spine.into_iter().rev() {
            let r = self.eval_expr(right)?;
            if acc.width != r.width {
                return Err(make_lowering_error(
                    LoweringErrorKind::OperandMismatch,
                    line,
                    format!("operands of '{op}' have widths {} and {}", acc.width, r.width),
                ));
            }
            let (ir_op, name) = map_arith(op);
            let value = self
                .builder
                .build_binary(&mut self.module, ir_op, acc.value, r.value, name)?;
            acc = Typed {
                value,
                width: acc.width,
            };
        }
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_range_depends_on_width() {
        assert_eq!(literal_value("255", Width::I8), Some(255));
        assert_eq!(literal_value("256", Width::I8), None);
        assert_eq!(literal_value("65535", Width::I16), Some(65535));
        assert_eq!(literal_value("4294967296", Width::I32), None);
        assert_eq!(
            literal_value("18446744073709551615", Width::I64),
            Some(u64::MAX)
        );
        assert_eq!(literal_value("18446744073709551616", Width::I64), None);
    }
}
