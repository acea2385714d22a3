use crate::ir::ast::Width;
use crate::ir::ir::{FuncId, Operand};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarSymbol {
    /// Stack slot produced by the variable's `alloca`.
    pub slot: Operand,
    pub width: Width,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncSymbol {
    pub id: FuncId,
    pub has_body: bool,
    /// Line of the first call, used to report prototypes that never get a body.
    pub first_call: Option<usize>,
}

/// Variables of the function being lowered.
pub type VarScope = HashMap<String, VarSymbol>;

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    /// Lives for the whole lowering run
    functions: HashMap<String, FuncSymbol>,
    /// Replaced wholesale on function entry
    variables: VarScope,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter function scope, handing back the enclosing variables.
    pub fn enter_function(&mut self) -> VarScope {
        std::mem::take(&mut self.variables)
    }

    /// Exit function scope, restoring the enclosing variables.
    pub fn exit_function(&mut self, saved: VarScope) {
        self.variables = saved;
    }

    /// Declare a variable in the current scope. A second declaration of the
    /// same name shadows the first.
    pub fn declare_variable(&mut self, name: &str, symbol: VarSymbol) -> Option<VarSymbol> {
        self.variables.insert(name.to_string(), symbol)
    }

    pub fn lookup_variable(&self, name: &str) -> Option<&VarSymbol> {
        self.variables.get(name)
    }

    pub fn declare_function(&mut self, name: &str, symbol: FuncSymbol) {
        self.functions.insert(name.to_string(), symbol);
    }

    pub fn lookup_function(&self, name: &str) -> Option<&FuncSymbol> {
        self.functions.get(name)
    }

    pub fn lookup_function_mut(&mut self, name: &str) -> Option<&mut FuncSymbol> {
        self.functions.get_mut(name)
    }

    /// Functions sorted by name.
    pub fn functions(&self) -> Vec<(&str, &FuncSymbol)> {
        let mut all: Vec<_> = self
            .functions
            .iter()
            .map(|(name, sym)| (name.as_str(), sym))
            .collect();
        all.sort_by_key(|(name, _)| *name);
        all
    }
}
