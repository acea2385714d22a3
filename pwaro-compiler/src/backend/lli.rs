use super::ExecutionHost;
use crate::ir::ir::Module;
use crate::CompileError;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, warn};

/// Runs the module with LLVM's `lli` via a temporary `.ll` file.
#[derive(Debug, Clone)]
pub struct Lli {
    /// Path or name of the `lli` executable
    pub program: PathBuf,
    /// Where the textual IR is written before running
    pub ir_path: PathBuf,
    /// Keep `ir_path` after the run
    pub keep: bool,
}

impl Lli {
    pub fn new(program: impl Into<PathBuf>, ir_path: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ir_path: ir_path.into(),
            keep: false,
        }
    }

    pub fn keep_ir(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }
}

impl ExecutionHost for Lli {
    fn execute(&self, module: &Module) -> Result<String, CompileError> {
        fs::write(&self.ir_path, module.to_string()).map_err(|e| {
            CompileError::Execution(format!("cannot write {}: {e}", self.ir_path.display()))
        })?;
        debug!(program = %self.program.display(), ir = %self.ir_path.display(), "running lli");

        let output = Command::new(&self.program).arg(&self.ir_path).output();

        if !self.keep {
            if let Err(e) = fs::remove_file(&self.ir_path) {
                warn!(path = %self.ir_path.display(), error = %e, "could not remove IR file");
            }
        }

        let output = output.map_err(|e| {
            CompileError::Execution(format!(
                "failed to start {}: {e}",
                self.program.display()
            ))
        })?;
        if !output.status.success() {
            return Err(CompileError::Execution(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
