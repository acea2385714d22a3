//! Structural checks run on a module before it is handed to an execution host.

use crate::ir::ir::{Function, Instr, Module, Operand, ValueId};
use crate::ir::types::Ty;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("@{function}: {reason}")]
pub struct VerifyError {
    pub function: String,
    pub reason: String,
}

pub fn verify(module: &Module) -> Result<(), VerifyError> {
    let mut names = HashSet::new();
    for func in &module.functions {
        if !names.insert(func.name.as_str()) {
            return Err(fail(func, "function defined more than once".into()));
        }
        if module.globals.iter().any(|g| g.name == func.name) {
            return Err(fail(func, "function name collides with a global".into()));
        }
        if !func.is_declaration() {
            verify_function(module, func)?;
        }
    }
    Ok(())
}

fn fail(func: &Function, reason: String) -> VerifyError {
    VerifyError {
        function: func.name.clone(),
        reason,
    }
}

fn verify_function(module: &Module, func: &Function) -> Result<(), VerifyError> {
    let mut defined: HashSet<ValueId> = HashSet::new();

    // Block labels and values share the function's local namespace.
    let mut locals = HashSet::new();
    let names = func
        .blocks
        .iter()
        .map(|b| &b.label)
        .chain(func.values.iter().map(|v| &v.name));
    for name in names {
        if !locals.insert(name.as_str()) {
            return Err(fail(func, format!("local name '%{name}' is defined more than once")));
        }
    }

    for block in &func.blocks {
        match block.instrs.iter().position(Instr::is_terminator) {
            None => {
                return Err(fail(
                    func,
                    format!("block '{}' has no terminator", block.label),
                ))
            }
            Some(i) if i + 1 != block.instrs.len() => {
                return Err(fail(
                    func,
                    format!("block '{}' has instructions after its terminator", block.label),
                ))
            }
            Some(_) => {}
        }

        for instr in &block.instrs {
            for operand in instr.operands() {
                check_operand(func, &defined, operand)?;
            }
            check_types(module, func, instr)?;
            if let Some(dst) = instr.dst() {
                if func.value(dst).is_none() {
                    return Err(fail(func, format!("result %{} has no value slot", dst.0)));
                }
                defined.insert(dst);
            }
        }
    }
    Ok(())
}

fn check_operand(
    func: &Function,
    defined: &HashSet<ValueId>,
    operand: &Operand,
) -> Result<(), VerifyError> {
    match operand {
        Operand::Local { id, ty } => {
            let info = func
                .value(*id)
                .filter(|_| defined.contains(id))
                .ok_or_else(|| fail(func, format!("use of undefined value %{}", id.0)))?;
            if info.ty != *ty {
                return Err(fail(
                    func,
                    format!("%{} used as {} but defined as {}", info.name, ty, info.ty),
                ));
            }
            Ok(())
        }
        Operand::Const { ty, .. } if !ty.is_int() => {
            Err(fail(func, "non-integer constant".into()))
        }
        _ => Ok(()),
    }
}

fn expect_ty(func: &Function, what: &str, found: Ty, expected: Ty) -> Result<(), VerifyError> {
    if found == expected {
        Ok(())
    } else {
        Err(fail(
            func,
            format!("{what}: expected {expected}, found {found}"),
        ))
    }
}

fn check_types(module: &Module, func: &Function, instr: &Instr) -> Result<(), VerifyError> {
    match instr {
        Instr::Alloca { ty, .. } => {
            if !ty.is_int() {
                return Err(fail(func, format!("alloca of non-integer type {ty}")));
            }
        }
        Instr::Load { ptr, .. } => expect_ty(func, "load address", ptr.ty(), Ty::Ptr)?,
        Instr::Store { value, ptr } => {
            expect_ty(func, "store address", ptr.ty(), Ty::Ptr)?;
            if !value.ty().is_int() {
                return Err(fail(func, "store of non-integer value".into()));
            }
        }
        Instr::Binary { op, lhs, rhs, .. } => {
            if !lhs.ty().is_int() {
                return Err(fail(func, format!("{op} on non-integer operand")));
            }
            expect_ty(func, &format!("{op} operand"), rhs.ty(), lhs.ty())?;
        }
        Instr::SExt { value, to, .. } => match (value.ty().bits(), to.bits()) {
            (Some(from), Some(into)) if from < into => {}
            _ => {
                return Err(fail(
                    func,
                    format!("invalid sext from {} to {}", value.ty(), to),
                ))
            }
        },
        Instr::Call { callee, args, .. } => {
            let target = module
                .functions
                .get(callee.0)
                .ok_or_else(|| fail(func, format!("call to unknown function #{}", callee.0)))?;
            let arity_ok = if target.variadic {
                args.len() >= target.params.len()
            } else {
                args.len() == target.params.len()
            };
            if !arity_ok {
                return Err(fail(
                    func,
                    format!(
                        "call to @{} with {} argument(s), expected {}",
                        target.name,
                        args.len(),
                        target.params.len()
                    ),
                ));
            }
            for (arg, param) in args.iter().zip(&target.params) {
                expect_ty(func, &format!("argument to @{}", target.name), arg.ty(), *param)?;
            }
        }
        Instr::Ret { value } => expect_ty(func, "return value", value.ty(), func.ret)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::Builder;
    use crate::ir::ir::{BasicBlock, BinaryOp, FuncId, Function};

    fn with_entry(name: &str) -> (Module, FuncId, Builder) {
        let mut module = Module::new("verify");
        let func = module.add_function(Function::new(name, Ty::I32, vec![], false));
        let mut builder = Builder::new();
        let entry = Builder::append_block(&mut module, func, "entry");
        builder.position_at_end(entry);
        (module, func, builder)
    }

    #[test]
    fn accepts_a_well_formed_function() {
        let (mut module, _, mut b) = with_entry("main");
        let sum = b
            .build_binary(
                &mut module,
                BinaryOp::Add,
                Operand::const_int(Ty::I32, 1),
                Operand::const_int(Ty::I32, 2),
                "add",
            )
            .unwrap();
        b.build_ret(&mut module, sum).unwrap();
        assert_eq!(verify(&module), Ok(()));
    }

    #[test]
    fn rejects_a_block_without_terminator() {
        let (module, _, _) = with_entry("main");
        let err = verify(&module).unwrap_err();
        assert!(err.reason.contains("no terminator"), "{err}");
    }

    #[test]
    fn rejects_instructions_after_ret() {
        let (mut module, func, _) = with_entry("main");
        let f = module.function_mut(func);
        f.blocks[0] = BasicBlock {
            label: "entry".into(),
            instrs: vec![
                Instr::Ret {
                    value: Operand::const_int(Ty::I32, 0),
                },
                Instr::Ret {
                    value: Operand::const_int(Ty::I32, 1),
                },
            ],
        };
        let err = verify(&module).unwrap_err();
        assert!(err.reason.contains("after its terminator"), "{err}");
    }

    #[test]
    fn rejects_mismatched_binary_operands() {
        let (mut module, _, mut b) = with_entry("main");
        let sum = b
            .build_binary(
                &mut module,
                BinaryOp::Add,
                Operand::const_int(Ty::I32, 1),
                Operand::const_int(Ty::I8, 2),
                "add",
            )
            .unwrap();
        b.build_ret(&mut module, sum).unwrap();
        let err = verify(&module).unwrap_err();
        assert_eq!(err.function, "main");
        assert!(err.reason.contains("add operand"), "{err}");
    }

    #[test]
    fn rejects_narrowing_sext() {
        let (mut module, _, mut b) = with_entry("main");
        let v = b
            .build_sext(&mut module, Operand::const_int(Ty::I64, 1), Ty::I32, "s")
            .unwrap();
        b.build_ret(&mut module, v).unwrap();
        let err = verify(&module).unwrap_err();
        assert!(err.reason.contains("invalid sext"), "{err}");
    }

    #[test]
    fn rejects_wrong_return_type() {
        let (mut module, _, mut b) = with_entry("main");
        b.build_ret(&mut module, Operand::const_int(Ty::I64, 0))
            .unwrap();
        let err = verify(&module).unwrap_err();
        assert!(err.reason.contains("return value"), "{err}");
    }

    #[test]
    fn rejects_use_before_definition() {
        let (mut module, func, mut b) = with_entry("main");
        let ghost = module.function_mut(func).new_value("ghost", Ty::I32);
        b.build_ret(&mut module, Operand::Local { id: ghost, ty: Ty::I32 })
            .unwrap();
        let err = verify(&module).unwrap_err();
        assert!(err.reason.contains("undefined value"), "{err}");
    }

    #[test]
    fn rejects_call_with_wrong_arity() {
        let (mut module, _, mut b) = with_entry("main");
        let callee = module.add_function(Function::new("f", Ty::I32, vec![], false));
        let v = b
            .build_call(
                &mut module,
                callee,
                vec![Operand::const_int(Ty::I32, 1)],
                "calltmp",
            )
            .unwrap();
        b.build_ret(&mut module, v).unwrap();
        let err = verify(&module).unwrap_err();
        assert!(err.reason.contains("expected 0"), "{err}");
    }

    #[test]
    fn rejects_value_named_like_a_block() {
        let (mut module, func, mut b) = with_entry("main");
        let slot = b.build_alloca(&mut module, Ty::I32, "x").unwrap();
        b.build_ret(&mut module, Operand::const_int(Ty::I32, 0))
            .unwrap();
        let Operand::Local { id, .. } = slot else {
            panic!("alloca should produce a local");
        };
        module.function_mut(func).values[id.0].name = "entry".into();
        let err = verify(&module).unwrap_err();
        assert!(err.reason.contains("'%entry'"), "{err}");
    }

    #[test]
    fn rejects_function_named_like_a_global() {
        let mut module = Module::new("clash");
        module.add_global_string("formatStr", b"%d\n\0");
        module.add_function(Function::new("formatStr", Ty::I32, vec![], false));
        let err = verify(&module).unwrap_err();
        assert_eq!(err.function, "formatStr");
        assert!(err.reason.contains("global"), "{err}");
    }

    #[test]
    fn declarations_need_no_blocks() {
        let mut module = Module::new("decls");
        module.add_function(Function::new("printf", Ty::I32, vec![Ty::Ptr], true));
        module.add_function(Function::new("f", Ty::I32, vec![], false));
        assert_eq!(verify(&module), Ok(()));
    }
}
