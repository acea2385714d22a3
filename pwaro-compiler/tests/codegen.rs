use pretty_assertions::assert_eq;
use pwaro_compiler::ir::builder::Builder;
use pwaro_compiler::ir::verify::verify;
use pwaro_compiler::ir::{Function, Module, Operand, Ty};
use pwaro_compiler::{compile_to_ir, compile_to_ir_with, CompileError, CompileOptions};

fn ir(source: &str) -> String {
    compile_to_ir(source)
        .unwrap_or_else(|e| panic!("{source:?} failed: {e}"))
        .to_string()
}

// ── Module text ──────────────────────────────────────────────────────────

#[test]
fn print_expression_module() {
    let expected = r#"; ModuleID = 'module'
source_filename = "module"

@formatStr = private unnamed_addr constant [4 x i8] c"%d\0A\00", align 1

declare i32 @printf(ptr, ...)

define i32 @main() {
entry:
  %mul = mul i32 3, 4
  %add = add i32 2, %mul
  %printfCall = call i32 (ptr, ...) @printf(ptr @formatStr, i32 %add)
  ret i32 0
}
"#;
    assert_eq!(ir("print 2 + 3 * 4;"), expected);
}

#[test]
fn narrow_variable_load_is_sign_extended() {
    let text = ir("var x i8 = 200;\nprint x;");
    let main: Vec<&str> = text
        .lines()
        .skip_while(|l| !l.starts_with("define i32 @main()"))
        .collect();
    assert_eq!(
        main,
        vec![
            "define i32 @main() {",
            "entry:",
            "  %x = alloca i8, align 1",
            "  store i8 -56, ptr %x, align 1",
            "  %load_x = load i8, ptr %x, align 1",
            "  %sext_x = sext i8 %load_x to i32",
            "  %printfCall = call i32 (ptr, ...) @printf(ptr @formatStr, i32 %sext_x)",
            "  ret i32 0",
            "}",
        ]
    );
}

#[test]
fn widening_store_into_i64() {
    let text = ir("var a i32 = 1;\nvar b i64 = a;");
    assert!(text.contains("%load_a = load i32, ptr %a, align 4"), "{text}");
    assert!(text.contains("%sext_b = sext i32 %load_a to i64"), "{text}");
    assert!(text.contains("store i64 %sext_b, ptr %b, align 8"), "{text}");
}

#[test]
fn shadowed_variables_get_distinct_slots() {
    let text = ir("var x i32 = 1;\nvar x i32 = 2;\nprint x;");
    assert!(text.contains("%x = alloca i32, align 4"));
    assert!(text.contains("%x.1 = alloca i32, align 4"));
    assert!(text.contains("%load_x = load i32, ptr %x.1, align 4"));
}

#[test]
fn variable_named_like_a_block_label() {
    let module = compile_to_ir("var entry i32 = 1;\nprint entry;").unwrap();
    assert_eq!(verify(&module), Ok(()));
    let text = module.to_string();
    assert!(text.contains("entry:\n  %entry.1 = alloca i32, align 4"), "{text}");
    assert!(text.contains("%load_entry = load i32, ptr %entry.1, align 4"), "{text}");
}

#[test]
fn function_definition_and_call() {
    let text = ir("fn seven ( 7; );\nprint seven();");
    assert!(text.contains("%calltmp = call i32 @seven()"), "{text}");
    assert!(
        text.contains("define i32 @seven() {\nentry:\n  ret i32 7\n}"),
        "{text}"
    );
}

#[test]
fn function_without_value_returns_zero() {
    let text = ir("fn f ( print 1; );");
    assert!(
        text.contains("define i32 @f() {\nentry:\n  %printfCall = call i32 (ptr, ...) @printf(ptr @formatStr, i32 1)\n  ret i32 0\n}"),
        "{text}"
    );
}

#[test]
fn prototype_is_replaced_by_its_definition() {
    let text = ir("prototype g;\nprint g();\nfn g ( 1; );");
    assert!(!text.contains("declare i32 @g()"), "{text}");
    assert!(text.contains("define i32 @g() {"), "{text}");
}

#[test]
fn module_name_comes_from_options() {
    let options = CompileOptions {
        module_name: "demo.pw".to_string(),
    };
    let text = compile_to_ir_with("print 1;", &options).unwrap().to_string();
    assert!(text.starts_with("; ModuleID = 'demo.pw'\nsource_filename = \"demo.pw\"\n"));
}

// ── Sample programs ──────────────────────────────────────────────────────

#[test]
fn compile_samples() {
    for name in ["arithmetic.pw", "widths.pw", "functions.pw"] {
        let path = format!("../samples/{name}");
        let source = std::fs::read_to_string(&path).expect("Failed to read sample");
        let module = compile_to_ir(&source).unwrap_or_else(|e| panic!("{name}: {e}"));
        assert!(verify(&module).is_ok(), "{name} should verify");
        assert!(module.function_by_name("main").is_some());
    }
}

#[test]
fn functions_sample_defines_every_function() {
    let source = std::fs::read_to_string("../samples/functions.pw")
        .expect("Failed to read samples/functions.pw");
    let module = compile_to_ir(&source).unwrap();
    for name in ["main", "seven", "f", "square"] {
        let (_, func) = module.function_by_name(name).unwrap();
        assert!(!func.is_declaration(), "{name} should have a body");
    }
}

// ── Invalid modules ──────────────────────────────────────────────────────

#[test]
fn verifier_failures_become_invalid_module() {
    let mut module = Module::new("broken");
    let main = module.add_function(Function::new("main", Ty::I32, vec![], false));
    let mut builder = Builder::new();
    let entry = Builder::append_block(&mut module, main, "entry");
    builder.position_at_end(entry);
    builder
        .build_alloca(&mut module, Ty::I32, "x")
        .unwrap();

    let err: CompileError = verify(&module).unwrap_err().into();
    match err {
        CompileError::InvalidModule(reason) => assert!(reason.contains("@main"), "{reason}"),
        other => panic!("expected InvalidModule, got {other}"),
    }
}

#[test]
fn builder_failures_become_invalid_module() {
    let mut module = Module::new("broken");
    let mut builder = Builder::new();
    let err: CompileError = builder
        .build_ret(&mut module, Operand::const_int(Ty::I32, 0))
        .unwrap_err()
        .into();
    assert!(matches!(err, CompileError::InvalidModule(_)));
}
