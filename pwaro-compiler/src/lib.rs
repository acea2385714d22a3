pub mod backend;
pub mod frontend;
pub mod ir;

use backend::{ExecutionHost, Interpreter};
use frontend::parser::{parse_program, SyntaxError};
use ir::ast::Program;
use ir::builder::BuildError;
use ir::verify::VerifyError;
use ir::Module;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("LoweringError:{kind} (line {line}) - {message}")]
    Lowering {
        kind: LoweringErrorKind,
        line: usize,
        message: String,
    },

    #[error("Invalid module: {0}")]
    InvalidModule(String),

    #[error("Execution failed: {0}")]
    Execution(String),
}

impl CompileError {
    pub fn lowering_kind(&self) -> Option<LoweringErrorKind> {
        match self {
            CompileError::Lowering { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Source line the error points at, when there is one.
    pub fn line(&self) -> Option<usize> {
        match self {
            CompileError::Syntax(e) => Some(e.line),
            CompileError::Lowering { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl From<BuildError> for CompileError {
    fn from(e: BuildError) -> Self {
        CompileError::InvalidModule(e.to_string())
    }
}

impl From<VerifyError> for CompileError {
    fn from(e: VerifyError) -> Self {
        CompileError::InvalidModule(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoweringErrorKind {
    UndeclaredVariable,
    UndeclaredFunction,
    UnsupportedWidth,
    OperandMismatch,
    WidthMismatch,
    LiteralOutOfRange,
    FunctionRedefinition,
    MissingBody,
}

impl std::fmt::Display for LoweringErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoweringErrorKind::UndeclaredVariable => write!(f, "UndeclaredVariable"),
            LoweringErrorKind::UndeclaredFunction => write!(f, "UndeclaredFunction"),
            LoweringErrorKind::UnsupportedWidth => write!(f, "UnsupportedWidth"),
            LoweringErrorKind::OperandMismatch => write!(f, "OperandMismatch"),
            LoweringErrorKind::WidthMismatch => write!(f, "WidthMismatch"),
            LoweringErrorKind::LiteralOutOfRange => write!(f, "LiteralOutOfRange"),
            LoweringErrorKind::FunctionRedefinition => write!(f, "FunctionRedefinition"),
            LoweringErrorKind::MissingBody => write!(f, "MissingBody"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Written as the module ID and `source_filename` of the IR.
    pub module_name: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            module_name: "module".to_string(),
        }
    }
}

pub fn parse(source: &str) -> Result<Program, CompileError> {
    Ok(parse_program(source)?)
}

pub fn compile_to_ir(source: &str) -> Result<Module, CompileError> {
    compile_to_ir_with(source, &CompileOptions::default())
}

/// Parse, lower and verify.
pub fn compile_to_ir_with(source: &str, options: &CompileOptions) -> Result<Module, CompileError> {
    let program = parse(source)?;
    ir::ir_generator::lower(&program, options)
}

/// Compile and run on the given host, returning what the program printed.
pub fn run_with(source: &str, host: &dyn ExecutionHost) -> Result<String, CompileError> {
    let module = compile_to_ir(source)?;
    host.execute(&module)
}

/// Compile and run with the in-process interpreter.
pub fn compile_and_run(source: &str) -> Result<String, CompileError> {
    run_with(source, &Interpreter::default())
}
