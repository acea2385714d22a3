use super::context::Gen;
use super::expr::Typed;
use crate::ir::ast::{Block, Program, Stmt, Width};
use crate::ir::error_utils::make_lowering_error;
use crate::ir::ir::{FuncId, Function, Operand};
use crate::ir::symbol_table::{FuncSymbol, VarSymbol};
use crate::ir::types::Ty;
use crate::{CompileError, LoweringErrorKind};
use tracing::{debug, instrument};

impl Gen {
    #[instrument(skip_all)]
    pub fn lower_program(&mut self, p: &Program) -> Result<(), CompileError> {
        let main = self
            .module
            .add_function(Function::new("main", Ty::I32, vec![], false));
        self.with_function_scope(main, |this| {
            for s in &p.stmts {
                this.lower_stmt(s)?;
            }
            this.builder
                .build_ret(&mut this.module, Operand::const_int(Ty::I32, 0))?;
            Ok(())
        })
    }

    /// Lower one statement. Only expression statements produce a value.
    pub fn lower_stmt(&mut self, s: &Stmt) -> Result<Option<Typed>, CompileError> {
        match s {
            Stmt::VarDecl {
                name,
                width,
                init,
                line,
            } => {
                debug!(%name, %width, "declare variable");
                let slot = self
                    .builder
                    .build_alloca(&mut self.module, Ty::from(*width), name)?;
                let value = self.eval_expr(init)?;
                let value = self.coerce(value, *width, name, *line)?;
                self.builder
                    .build_store(&mut self.module, value, slot.clone())?;
                // Inserted after the initializer, so `var x i32 = x;` sees the
                // previous `x` if there is one.
                self.symbols.declare_variable(
                    name,
                    VarSymbol {
                        slot,
                        width: *width,
                    },
                );
                Ok(None)
            }
            Stmt::Print { expr, line } => {
                let v = self.eval_expr(expr)?;
                if v.width != Width::WORKING {
                    return Err(make_lowering_error(
                        LoweringErrorKind::UnsupportedWidth,
                        *line,
                        format!("cannot print a value of width {}", v.width),
                    ));
                }
                let args = vec![self.format.clone(), v.value];
                self.builder
                    .build_call(&mut self.module, self.printf, args, "printfCall")?;
                Ok(None)
            }
            Stmt::FuncDecl { name, body, line } => {
                self.lower_function(name, body, *line)?;
                Ok(None)
            }
            Stmt::Prototype { name, line } => {
                self.declare_prototype(name, *line)?;
                Ok(None)
            }
            Stmt::Expr(e) => self.eval_expr(e).map(Some),
        }
    }

    /// Sign-extend `value` up to `width`. Narrowing is rejected.
    fn coerce(
        &mut self,
        value: Typed,
        width: Width,
        name: &str,
        line: usize,
    ) -> Result<Operand, CompileError> {
        if value.width == width {
            return Ok(value.value);
        }
        if value.width > width {
            return Err(make_lowering_error(
                LoweringErrorKind::WidthMismatch,
                line,
                format!(
                    "cannot store a {} value in '{name}' of width {width}",
                    value.width
                ),
            ));
        }
        Ok(self.builder.build_sext(
            &mut self.module,
            value.value,
            Ty::from(width),
            &format!("sext_{name}"),
        )?)
    }

    fn reserved(&self, name: &str, line: usize) -> Result<(), CompileError> {
        let taken = self.module.function_by_name(name).is_some()
            || self.module.globals.iter().any(|g| g.name == name);
        if taken {
            return Err(make_lowering_error(
                LoweringErrorKind::FunctionRedefinition,
                line,
                format!("'{name}' is reserved"),
            ));
        }
        Ok(())
    }

    fn add_declaration(&mut self, name: &str, has_body: bool) -> FuncId {
        let id = self
            .module
            .add_function(Function::new(name, Ty::I32, vec![], false));
        self.symbols.declare_function(
            name,
            FuncSymbol {
                id,
                has_body,
                first_call: None,
            },
        );
        id
    }

    #[instrument(skip(self, body), fields(stmts = body.stmts.len()))]
    pub fn lower_function(
        &mut self,
        name: &str,
        body: &Block,
        line: usize,
    ) -> Result<(), CompileError> {
        let id = match self.symbols.lookup_function_mut(name) {
            Some(sym) if sym.has_body => {
                return Err(make_lowering_error(
                    LoweringErrorKind::FunctionRedefinition,
                    line,
                    format!("function '{name}' already has a body"),
                ))
            }
            Some(sym) => {
                sym.has_body = true;
                sym.id
            }
            None => {
                self.reserved(name, line)?;
                self.add_declaration(name, true)
            }
        };
        debug!(%name, "define function");

        self.with_function_scope(id, |this| {
            let mut last = None;
            for s in &body.stmts {
                last = this.lower_stmt(s)?;
            }
            let ret = match last {
                None => Operand::const_int(Ty::I32, 0),
                Some(v) if v.width == Width::WORKING => v.value,
                Some(v) => {
                    return Err(make_lowering_error(
                        LoweringErrorKind::UnsupportedWidth,
                        line,
                        format!("function '{name}' would return a value of width {}", v.width),
                    ))
                }
            };
            this.builder.build_ret(&mut this.module, ret)?;
            Ok(())
        })
    }

    pub fn declare_prototype(&mut self, name: &str, line: usize) -> Result<(), CompileError> {
        if self.symbols.lookup_function(name).is_some() {
            return Ok(());
        }
        self.reserved(name, line)?;
        debug!(%name, "declare prototype");
        self.add_declaration(name, false);
        Ok(())
    }
}
