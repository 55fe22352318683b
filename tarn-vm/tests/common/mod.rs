#![allow(dead_code)]

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use tarn_vm::{Bytecode, CancelToken, ScriptError, Value, Vm, compile};

pub fn compile_src(source: &str) -> Bytecode {
    match compile(source) {
        Ok(bytecode) => bytecode,
        Err(errors) => panic!("program should compile, got {errors:?}"),
    }
}

pub fn compile_errors(source: &str) -> Vec<ScriptError> {
    compile(source).err().expect("compilation should fail")
}

pub fn run_src(source: &str) -> Vm {
    let mut vm = Vm::new(compile_src(source));
    vm.run(&CancelToken::new()).expect("program should run");
    vm
}

pub fn run_value(source: &str) -> Value {
    run_src(source).last_popped()
}

pub fn run_error(source: &str) -> ScriptError {
    let mut vm = Vm::new(compile_src(source));
    vm.run(&CancelToken::new())
        .expect_err("program should fail at runtime")
}

pub fn invoke_global(vm: &mut Vm, name: &str, args: &[Value]) -> Result<Value, ScriptError> {
    let function = vm.get_global(name)?;
    vm.invoke(&CancelToken::new(), &function, args)
}

pub fn invoke_value(vm: &mut Vm, name: &str, args: &[Value]) -> Value {
    match invoke_global(vm, name, args) {
        Ok(value) => value,
        Err(err) => panic!("invoke {name} should succeed, got {err}"),
    }
}

pub fn invoke_error(vm: &mut Vm, name: &str, args: &[Value]) -> ScriptError {
    invoke_global(vm, name, args).expect_err("invoke should fail")
}

pub fn expect_int(value: &Value, want: i64) {
    match value {
        Value::Int(got) => assert_eq!(*got, want),
        other => panic!("expected integer {want}, got {other:?}"),
    }
}

pub fn expect_float(value: &Value, want: f64) {
    match value {
        Value::Float(got) => {
            assert!((got - want).abs() < 1e-9, "expected {want}, got {got}")
        }
        other => panic!("expected float {want}, got {other:?}"),
    }
}

pub fn expect_bool(value: &Value, want: bool) {
    match value {
        Value::Bool(got) => assert_eq!(*got, want),
        other => panic!("expected bool {want}, got {other:?}"),
    }
}

pub fn expect_str(value: &Value, want: &str) {
    match value {
        Value::Str(got) => assert_eq!(got.as_str(), want),
        other => panic!("expected string {want:?}, got {other:?}"),
    }
}

pub fn expect_null(value: &Value) {
    assert!(matches!(value, Value::Null), "expected null, got {value:?}");
}

/// Byte sink the test keeps a handle to after handing the writer to the VM.
#[derive(Clone, Default)]
pub struct SharedBuf {
    data: Rc<RefCell<Vec<u8>>>,
}

impl SharedBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.data.borrow()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.data.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
