//! Execution hosts for verified modules.
//!
//! - `interp` runs the module in-process
//! - `lli`    renders it as textual LLVM IR and hands it to an external `lli`

pub mod interp;
pub mod lli;

pub use interp::Interpreter;
pub use lli::Lli;

use crate::ir::ir::Module;
use crate::CompileError;

/// Something that can run a module's `main` and report what it printed.
pub trait ExecutionHost {
    fn execute(&self, module: &Module) -> Result<String, CompileError>;
}
