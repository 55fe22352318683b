mod common;

use common::{run_error, run_src};
use tarn_vm::{CancelToken, ErrorKind, ScriptError, Value, parse};

#[test]
fn runtime_errors_carry_a_stack_trace() {
    let err = run_error("var z = 0\n10 / z");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert!(!err.frames.is_empty());
    assert_eq!(err.frames[0].function, "main");
    assert_eq!(err.frames[0].line, 2);
    assert_eq!(err.line, 2);
}

#[test]
fn nested_calls_report_frames_top_down() {
    let source = "func boom() {\n  var z = 0\n  return 10 / z\n}\nfunc main() {\n  return boom()\n}";
    let mut vm = run_src(source);
    let function = vm.get_global("main").expect("main exists");
    let err = vm
        .invoke(&CancelToken::new(), &function, &[])
        .expect_err("invoke should fail");

    assert!(err.message.contains("division by zero"));
    assert_eq!(err.frames.len(), 2);
    assert_eq!(err.frames[0].function, "boom");
    assert_eq!(err.frames[0].line, 3);
    assert_eq!(err.frames[1].function, "main");
    assert_eq!(err.frames[1].line, 6);
    assert_eq!(err.function, "boom");
    assert_eq!(err.line, 3);
}

#[test]
fn anonymous_functions_are_labeled_in_traces() {
    let err = run_error("var f = func() { return 1 / 0 }\nf()");
    assert_eq!(err.frames[0].function, "anonymous");
}

#[test]
fn error_display_format() {
    let source = "func boom() {\n  return [1] == [1]\n}\nboom()";
    let err = run_error(source);
    let text = err.to_string();
    assert!(
        text.starts_with("Runtime error at script.tarn:2 in boom"),
        "got {text:?}"
    );
    assert!(text.contains("equality not supported for type: ARRAY"));
    assert!(text.contains("Stack trace:"));
    assert!(text.contains("boom (line 2)"));
}

#[test]
fn parse_errors_prevent_compilation() {
    let errors = tarn_vm::compile("var = 5").expect_err("compile should fail");
    assert!(!errors.is_empty());
    assert_eq!(errors[0].kind, ErrorKind::Parse);
    let text = errors[0].to_string();
    assert!(text.starts_with("Parse error at script.tarn:1"), "got {text:?}");
}

#[test]
fn compile_errors_carry_line_numbers() {
    let errors = tarn_vm::compile("var a = 1\nmissing").expect_err("compile should fail");
    assert_eq!(errors[0].kind, ErrorKind::Compile);
    assert_eq!(errors[0].line, 2);
}

#[test]
fn panic_and_critical_builtins_are_distinguished() {
    let program = parse("fail()").expect("parse");
    let mut compiler = tarn_vm::Compiler::new();
    let fail_sym = compiler.define_global("fail");
    compiler.compile_program(&program).expect("compile");
    let mut vm = tarn_vm::Vm::new(compiler.into_bytecode());
    vm.set_global(
        fail_sym.index as usize,
        Value::builtin("fail", |_ctx, _args| {
            tarn_vm::BuiltinResult::Critical("host invariant violated".to_string())
        }),
    )
    .expect("set_global");

    let err = vm
        .run(&CancelToken::new())
        .expect_err("run should fail");
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert!(err.critical);
    assert!(err.message.contains("host invariant violated"));

    let panic_err = run_error(r#"panic("user bug")"#);
    assert!(!panic_err.critical);
}

#[test]
fn destructure_errors() {
    let program = parse("var a, b, c = pair()").expect("parse");
    let mut compiler = tarn_vm::Compiler::new();
    let pair_sym = compiler.define_global("pair");
    compiler.compile_program(&program).expect("compile");
    let mut vm = tarn_vm::Vm::new(compiler.into_bytecode());
    vm.set_global(
        pair_sym.index as usize,
        Value::builtin("pair", |_ctx, _args| {
            tarn_vm::BuiltinResult::Value(Value::tuple(vec![Value::Int(1), Value::Int(2)]))
        }),
    )
    .expect("set_global");
    let err = vm.run(&CancelToken::new()).expect_err("run should fail");
    assert!(
        err.message
            .contains("not enough values to unpack: have 2, want 3"),
        "got {}",
        err.message
    );

    let err = run_error("var a, b = 1");
    assert!(err.message.contains("cannot destructure non-tuple"));
}

#[test]
fn cancellation_produces_a_frameless_error() {
    let token = CancelToken::new();
    token.cancel();
    let bytecode = tarn_vm::compile("for { }").expect("compile");
    let mut vm = tarn_vm::Vm::new(bytecode);
    let err = vm.run(&token).expect_err("run should be cancelled");
    assert_eq!(err.kind, ErrorKind::Cancelled);
    assert!(err.frames.is_empty());
    assert!(err.message.contains("context cancelled"));
}

#[test]
fn deadlines_cancel_with_their_own_message() {
    let token = CancelToken::with_timeout(std::time::Duration::from_millis(20));
    let bytecode = tarn_vm::compile("for { }").expect("compile");
    let mut vm = tarn_vm::Vm::new(bytecode);
    let err = vm.run(&token).expect_err("run should time out");
    assert_eq!(err.kind, ErrorKind::Cancelled);
    assert!(err.message.contains("deadline exceeded"));
}

#[test]
fn errors_implement_std_error() {
    fn takes_error(_err: &dyn std::error::Error) {}
    let err: ScriptError = run_error("1 / 0");
    takes_error(&err);
}
