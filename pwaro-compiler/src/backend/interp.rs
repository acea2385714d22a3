use super::ExecutionHost;
use crate::ir::ir::{BinaryOp, FuncId, Function, Instr, Module, Operand, ValueId};
use crate::ir::types::Ty;
use crate::CompileError;
use tracing::{debug, trace};

pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Runs a module directly over its IR.
///
/// Integers are kept sign-normalized to their IR type, so `sext` is a no-op
/// and every arithmetic result is re-normalized after wrapping.
#[derive(Debug, Clone)]
pub struct Interpreter {
    pub max_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl ExecutionHost for Interpreter {
    fn execute(&self, module: &Module) -> Result<String, CompileError> {
        let (main, _) = module
            .function_by_name("main")
            .ok_or_else(|| fault("module has no 'main' function"))?;
        let mut machine = Machine {
            module,
            memory: Vec::new(),
            out: String::new(),
            depth: 0,
            max_depth: self.max_depth,
        };
        let status = machine.call(main, &[])?;
        debug!(status = ?status, bytes = machine.out.len(), "program finished");
        Ok(machine.out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Value {
    Int(i64),
    /// Index into `Machine::memory`
    Slot(usize),
    Global(usize),
}

struct Machine<'m> {
    module: &'m Module,
    memory: Vec<i64>,
    out: String,
    depth: usize,
    max_depth: usize,
}

fn fault(message: impl Into<String>) -> CompileError {
    CompileError::Execution(message.into())
}

impl<'m> Machine<'m> {
    fn call(&mut self, id: FuncId, args: &[Value]) -> Result<Value, CompileError> {
        let module = self.module;
        let func = module.function(id);
        if func.is_declaration() {
            return self.call_external(func, args);
        }
        if self.depth >= self.max_depth {
            return Err(fault(format!(
                "call depth limit of {} exceeded in '{}'",
                self.max_depth, func.name
            )));
        }

        trace!(function = %func.name, depth = self.depth, "enter");
        self.depth += 1;
        let base = self.memory.len();
        let result = self.run(func);
        self.memory.truncate(base);
        self.depth -= 1;
        result
    }

    fn run(&mut self, func: &'m Function) -> Result<Value, CompileError> {
        let mut locals: Vec<Option<Value>> = vec![None; func.values.len()];
        let Some(entry) = func.blocks.first() else {
            return Err(fault(format!("'{}' has no body", func.name)));
        };

        for instr in &entry.instrs {
            let result = match instr {
                Instr::Alloca { .. } => {
                    self.memory.push(0);
                    Value::Slot(self.memory.len() - 1)
                }
                Instr::Load { ty, ptr, .. } => {
                    let slot = self.slot(&locals, ptr)?;
                    Value::Int(ty.normalize(self.memory[slot]))
                }
                Instr::Store { value, ptr } => {
                    let v = self.int(&locals, value)?;
                    let slot = self.slot(&locals, ptr)?;
                    self.memory[slot] = value.ty().normalize(v);
                    continue;
                }
                Instr::Binary { op, lhs, rhs, .. } => {
                    let l = self.int(&locals, lhs)?;
                    let r = self.int(&locals, rhs)?;
                    Value::Int(arith(*op, lhs.ty(), l, r)?)
                }
                Instr::SExt { value, .. } => Value::Int(self.int(&locals, value)?),
                Instr::Call { callee, args, .. } => {
                    let args = args
                        .iter()
                        .map(|a| self.value(&locals, a))
                        .collect::<Result<Vec<_>, _>>()?;
                    self.call(*callee, &args)?
                }
                Instr::Ret { value } => return self.value(&locals, value),
            };
            if let Some(dst) = instr.dst() {
                locals[dst.0] = Some(result);
            }
        }
        Err(fault(format!("'{}' fell off the end of its entry block", func.name)))
    }

    fn value(&self, locals: &[Option<Value>], operand: &Operand) -> Result<Value, CompileError> {
        match operand {
            Operand::Const { value, .. } => Ok(Value::Int(*value)),
            Operand::Local { id, .. } => local(locals, *id),
            Operand::Global(name) => self
                .module
                .globals
                .iter()
                .position(|g| &g.name == name)
                .map(Value::Global)
                .ok_or_else(|| fault(format!("unknown global @{name}"))),
        }
    }

    fn int(&self, locals: &[Option<Value>], operand: &Operand) -> Result<i64, CompileError> {
        match self.value(locals, operand)? {
            Value::Int(v) => Ok(v),
            other => Err(fault(format!("expected an integer, found {other:?}"))),
        }
    }

    fn slot(&self, locals: &[Option<Value>], operand: &Operand) -> Result<usize, CompileError> {
        match self.value(locals, operand)? {
            Value::Slot(slot) if slot < self.memory.len() => Ok(slot),
            other => Err(fault(format!("expected a stack slot, found {other:?}"))),
        }
    }

    fn call_external(&mut self, func: &Function, args: &[Value]) -> Result<Value, CompileError> {
        match (func.name.as_str(), args) {
            ("printf", [Value::Global(format), rest @ ..]) => {
                let bytes = &self.module.globals[*format].bytes;
                let written = printf(&mut self.out, bytes, rest)?;
                Ok(Value::Int(written))
            }
            _ => Err(fault(format!(
                "call to external function '{}' which has no body",
                func.name
            ))),
        }
    }
}

fn local(locals: &[Option<Value>], id: ValueId) -> Result<Value, CompileError> {
    locals
        .get(id.0)
        .copied()
        .flatten()
        .ok_or_else(|| fault(format!("read of undefined value %{}", id.0)))
}

fn arith(op: BinaryOp, ty: Ty, l: i64, r: i64) -> Result<i64, CompileError> {
    let raw = match op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::SDiv => {
            if r == 0 {
                return Err(fault("division by zero"));
            }
            let min = ty.normalize(1i64.wrapping_shl(ty.bits().unwrap_or(64) - 1));
            if l == min && r == -1 {
                return Err(fault(format!("signed overflow in {ty} division")));
            }
            l / r
        }
    };
    Ok(ty.normalize(raw))
}

/// The subset of C `printf` the generated code relies on: `%d` and `%%`.
fn printf(out: &mut String, format: &[u8], args: &[Value]) -> Result<i64, CompileError> {
    let start = out.len();
    let mut args = args.iter();
    let mut bytes = format.iter().take_while(|&&b| b != 0);
    while let Some(&b) = bytes.next() {
        if b != b'%' {
            out.push(b as char);
            continue;
        }
        match bytes.next().copied() {
            Some(b'd') => match args.next() {
                Some(Value::Int(v)) => out.push_str(&(*v as i32).to_string()),
                _ => return Err(fault("printf: missing integer argument for %d")),
            },
            Some(b'%') => out.push('%'),
            other => {
                return Err(fault(format!(
                    "printf: unsupported conversion {:?}",
                    other.map(char::from)
                )))
            }
        }
    }
    Ok((out.len() - start) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn arithmetic_wraps_at_the_operand_width() {
        assert_eq!(arith(BinaryOp::Add, Ty::I8, 127, 1).unwrap(), -128);
        assert_eq!(arith(BinaryOp::Mul, Ty::I16, 300, 300).unwrap(), 24464);
        assert_eq!(
            arith(BinaryOp::Add, Ty::I32, i64::from(i32::MAX), 1).unwrap(),
            i64::from(i32::MIN)
        );
        assert_eq!(arith(BinaryOp::Sub, Ty::I64, i64::MIN, 1).unwrap(), i64::MAX);
    }

    #[test]
    fn division_truncates_toward_zero() {
        assert_eq!(arith(BinaryOp::SDiv, Ty::I32, -7, 2).unwrap(), -3);
        assert_eq!(arith(BinaryOp::SDiv, Ty::I32, 7, -2).unwrap(), -3);
    }

    #[test]
    fn division_faults() {
        let err = arith(BinaryOp::SDiv, Ty::I32, 1, 0).unwrap_err();
        assert!(matches!(err, CompileError::Execution(ref m) if m.contains("division by zero")));

        let err = arith(BinaryOp::SDiv, Ty::I32, i64::from(i32::MIN), -1).unwrap_err();
        assert!(matches!(err, CompileError::Execution(ref m) if m.contains("overflow")));

        let err = arith(BinaryOp::SDiv, Ty::I64, i64::MIN, -1).unwrap_err();
        assert!(matches!(err, CompileError::Execution(_)));
    }

    #[test]
    fn printf_formats_decimal_and_stops_at_nul() {
        let mut out = String::new();
        let n = printf(&mut out, b"%d\n\0ignored", &[Value::Int(-56)]).unwrap();
        assert_eq!(out, "-56\n");
        assert_eq!(n, 4);
    }

    #[test]
    fn printf_needs_an_argument() {
        let mut out = String::new();
        assert!(printf(&mut out, b"%d\n\0", &[]).is_err());
    }
}
