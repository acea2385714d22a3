//! AST to IR lowering module.
//!
//! Top-level statements are lowered into a synthetic `main`; every `fn`
//! becomes an `i32 ()` function whose result is its last statement's value.

pub mod context;
pub mod expr;
pub mod stmt;

use crate::ir::ast::Program;
use crate::ir::ir::Module;
use crate::{CompileError, CompileOptions};
use tracing::instrument;

/// The main Gen struct that orchestrates the lowering process.
pub use context::Gen;
pub use expr::Typed;

/// Entry point for lowering a parsed program to a verified module.
#[instrument(skip_all, fields(module = %options.module_name))]
pub fn lower(program: &Program, options: &CompileOptions) -> Result<Module, CompileError> {
    let mut g = Gen::new(options);
    g.lower_program(program)?;
    g.finish()
}
