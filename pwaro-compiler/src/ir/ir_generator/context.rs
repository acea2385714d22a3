use crate::ir::builder::Builder;
use crate::ir::error_utils::make_lowering_error;
use crate::ir::ir::{FuncId, Function, Module, Operand};
use crate::ir::symbol_table::SymbolTable;
use crate::ir::types::Ty;
use crate::ir::verify::verify;
use crate::{CompileError, CompileOptions, LoweringErrorKind};
use tracing::debug;

pub const PRINTF: &str = "printf";
pub const FORMAT_STR: &str = "formatStr";

pub struct Gen {
    pub module: Module,
    pub builder: Builder,
    pub symbols: SymbolTable,
    /// External `i32 printf(ptr, ...)`
    pub printf: FuncId,
    /// `"%d\n"` format handed to every print
    pub format: Operand,
}

impl Gen {
    pub fn new(options: &CompileOptions) -> Self {
        let mut module = Module::new(options.module_name.clone());
        let printf = module.add_function(Function::new(PRINTF, Ty::I32, vec![Ty::Ptr], true));
        let format = module.add_global_string(FORMAT_STR, b"%d\n\0");
        Self {
            module,
            builder: Builder::new(),
            symbols: SymbolTable::new(),
            printf,
            format,
        }
    }

    /// Check that every called prototype received a body, then verify.
    pub fn finish(self) -> Result<Module, CompileError> {
        let missing = self
            .symbols
            .functions()
            .into_iter()
            .filter(|(_, sym)| !sym.has_body)
            .filter_map(|(name, sym)| sym.first_call.map(|line| (line, name)))
            .min();
        if let Some((line, name)) = missing {
            return Err(make_lowering_error(
                LoweringErrorKind::MissingBody,
                line,
                format!("function '{name}' is called but never defined"),
            ));
        }

        verify(&self.module)?;
        debug!(
            functions = self.module.functions.len(),
            "module verified"
        );
        Ok(self.module)
    }

    /// Run `f` with the cursor at the end of a fresh entry block of `func`
    /// and an empty variable table. Both are restored afterwards, whether or
    /// not `f` succeeds.
    pub fn with_function_scope<F, R>(&mut self, func: FuncId, f: F) -> Result<R, CompileError>
    where
        F: FnOnce(&mut Self) -> Result<R, CompileError>,
    {
        let prev_cursor = self.builder.insertion_block();
        let prev_vars = self.symbols.enter_function();

        let entry = Builder::append_block(&mut self.module, func, "entry");
        self.builder.position_at_end(entry);
        let result = f(self);

        self.symbols.exit_function(prev_vars);
        match prev_cursor {
            Some(block) => self.builder.position_at_end(block),
            None => self.builder.clear_insertion_point(),
        }
        result
    }
}
