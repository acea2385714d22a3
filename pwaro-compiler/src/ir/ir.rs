// An LLVM-shaped, single-assignment IR. Renders as textual LLVM IR.

use crate::ir::types::Ty;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub usize);

/// A basic block inside a particular function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRef {
    pub func: FuncId,
    pub block: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Const { ty: Ty, value: i64 },
    Local { id: ValueId, ty: Ty },
    Global(String),
}

impl Operand {
    pub fn const_int(ty: Ty, value: i64) -> Self {
        Operand::Const {
            ty,
            value: ty.normalize(value),
        }
    }

    pub fn ty(&self) -> Ty {
        match self {
            Operand::Const { ty, .. } | Operand::Local { ty, .. } => *ty,
            Operand::Global(_) => Ty::Ptr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    /// `dst = alloca ty`
    Alloca { dst: ValueId, ty: Ty },

    /// `dst = load ty, ptr`
    Load { dst: ValueId, ty: Ty, ptr: Operand },

    /// `store value, ptr`
    Store { value: Operand, ptr: Operand },

    /// `dst = op lhs, rhs`
    Binary {
        dst: ValueId,
        op: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    },

    /// `dst = sext value to ty`
    SExt { dst: ValueId, value: Operand, to: Ty },

    /// `dst = call callee(args)`
    Call {
        dst: ValueId,
        callee: FuncId,
        args: Vec<Operand>,
    },

    /// `ret value`
    Ret { value: Operand },
}

impl Instr {
    pub fn is_terminator(&self) -> bool {
        matches!(self, Instr::Ret { .. })
    }

    pub fn dst(&self) -> Option<ValueId> {
        match self {
            Instr::Alloca { dst, .. }
            | Instr::Load { dst, .. }
            | Instr::Binary { dst, .. }
            | Instr::SExt { dst, .. }
            | Instr::Call { dst, .. } => Some(*dst),
            Instr::Store { .. } | Instr::Ret { .. } => None,
        }
    }

    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Instr::Alloca { .. } => vec![],
            Instr::Load { ptr, .. } => vec![ptr],
            Instr::Store { value, ptr } => vec![value, ptr],
            Instr::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Instr::SExt { value, .. } => vec![value],
            Instr::Call { args, .. } => args.iter().collect(),
            Instr::Ret { value } => vec![value],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub label: String,
    pub instrs: Vec<Instr>,
}

impl BasicBlock {
    pub fn is_terminated(&self) -> bool {
        self.instrs.last().is_some_and(Instr::is_terminator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueInfo {
    pub name: String,
    pub ty: Ty,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub ret: Ty,
    pub params: Vec<Ty>,
    pub variadic: bool,
    pub blocks: Vec<BasicBlock>,
    pub values: Vec<ValueInfo>,
    name_counts: HashMap<String, usize>,
}

impl Function {
    pub fn new(name: impl Into<String>, ret: Ty, params: Vec<Ty>, variadic: bool) -> Self {
        Self {
            name: name.into(),
            ret,
            params,
            variadic,
            blocks: Vec::new(),
            values: Vec::new(),
            name_counts: HashMap::new(),
        }
    }

    /// A function without blocks is only declared.
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Claim a local name. Values and block labels share one namespace, so
    /// both come from here; repeats get a `.N` suffix.
    pub fn fresh_name(&mut self, hint: &str) -> String {
        let hint = if hint.is_empty() { "tmp" } else { hint };
        let count = self.name_counts.entry(hint.to_string()).or_insert(0);
        let name = if *count == 0 {
            hint.to_string()
        } else {
            format!("{hint}.{count}")
        };
        *count += 1;
        name
    }

    /// Allocate a new SSA value.
    pub fn new_value(&mut self, hint: &str, ty: Ty) -> ValueId {
        let name = self.fresh_name(hint);
        let id = ValueId(self.values.len());
        self.values.push(ValueInfo { name, ty });
        id
    }

    pub fn value(&self, id: ValueId) -> Option<&ValueInfo> {
        self.values.get(id.0)
    }

    pub fn instr_count(&self) -> usize {
        self.blocks.iter().map(|b| b.instrs.len()).sum()
    }
}

/// Private constant byte string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            globals: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn add_function(&mut self, function: Function) -> FuncId {
        let id = FuncId(self.functions.len());
        self.functions.push(function);
        id
    }

    pub fn add_global_string(&mut self, name: impl Into<String>, bytes: &[u8]) -> Operand {
        let name = name.into();
        self.globals.push(Global {
            name: name.clone(),
            bytes: bytes.to_vec(),
        });
        Operand::Global(name)
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.0]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut Function {
        &mut self.functions[id.0]
    }

    pub fn function_by_name(&self, name: &str) -> Option<(FuncId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .find(|(_, f)| f.name == name)
            .map(|(i, f)| (FuncId(i), f))
    }

    pub fn to_lines(&self) -> Vec<String> {
        self.to_string().lines().map(str::to_string).collect()
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; ModuleID = '{}'", self.name)?;
        writeln!(f, "source_filename = \"{}\"", self.name)?;

        if !self.globals.is_empty() {
            writeln!(f)?;
        }
        for g in &self.globals {
            writeln!(
                f,
                "@{} = private unnamed_addr constant [{} x i8] c\"{}\", align 1",
                g.name,
                g.bytes.len(),
                Escaped(&g.bytes)
            )?;
        }

        for func in &self.functions {
            writeln!(f)?;
            if func.is_declaration() {
                writeln!(f, "declare {} @{}({})", func.ret, func.name, Params(func))?;
                continue;
            }
            writeln!(f, "define {} @{}({}) {{", func.ret, func.name, Params(func))?;
            for (i, block) in func.blocks.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "{}:", block.label)?;
                for instr in &block.instrs {
                    write!(f, "  ")?;
                    self.fmt_instr(f, func, instr)?;
                    writeln!(f)?;
                }
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}

impl Module {
    fn fmt_instr(&self, f: &mut fmt::Formatter<'_>, func: &Function, instr: &Instr) -> fmt::Result {
        let name = |id: ValueId| Local(func, id);
        match instr {
            Instr::Alloca { dst, ty } => {
                write!(f, "{} = alloca {}, align {}", name(*dst), ty, ty.align())
            }
            Instr::Load { dst, ty, ptr } => write!(
                f,
                "{} = load {}, ptr {}, align {}",
                name(*dst),
                ty,
                Op(func, ptr),
                ty.align()
            ),
            Instr::Store { value, ptr } => write!(
                f,
                "store {} {}, ptr {}, align {}",
                value.ty(),
                Op(func, value),
                Op(func, ptr),
                value.ty().align()
            ),
            Instr::Binary { dst, op, lhs, rhs } => write!(
                f,
                "{} = {} {} {}, {}",
                name(*dst),
                op,
                lhs.ty(),
                Op(func, lhs),
                Op(func, rhs)
            ),
            Instr::SExt { dst, value, to } => write!(
                f,
                "{} = sext {} {} to {}",
                name(*dst),
                value.ty(),
                Op(func, value),
                to
            ),
            Instr::Call { dst, callee, args } => {
                let target = self.function(*callee);
                write!(f, "{} = call {} ", name(*dst), target.ret)?;
                if target.variadic {
                    write!(f, "({}) ", Params(target))?;
                }
                write!(f, "@{}(", target.name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", arg.ty(), Op(func, arg))?;
                }
                write!(f, ")")
            }
            Instr::Ret { value } => write!(f, "ret {} {}", value.ty(), Op(func, value)),
        }
    }
}

struct Local<'a>(&'a Function, ValueId);
impl fmt::Display for Local<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.value(self.1) {
            Some(info) => write!(f, "%{}", info.name),
            None => write!(f, "%<invalid {}>", self.1 .0),
        }
    }
}

struct Op<'a>(&'a Function, &'a Operand);
impl fmt::Display for Op<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.1 {
            Operand::Const { value, .. } => write!(f, "{value}"),
            Operand::Local { id, .. } => write!(f, "{}", Local(self.0, *id)),
            Operand::Global(name) => write!(f, "@{name}"),
        }
    }
}

struct Params<'a>(&'a Function);
impl fmt::Display for Params<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ty) in self.0.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ty}")?;
        }
        if self.0.variadic {
            if !self.0.params.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "...")?;
        }
        Ok(())
    }
}

struct Escaped<'a>(&'a [u8]);
impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in self.0 {
            if b.is_ascii_graphic() && b != b'"' && b != b'\\' || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\{:02X}", b)?;
            }
        }
        Ok(())
    }
}
