use std::io::Write;
use std::time::SystemTime;

use rand::rngs::StdRng;

use crate::value::{ARRAY_TYPE, HASH_TYPE, Value};

/// What a builtin hands back to the VM. `Panic` requests a user-level runtime
/// abort; `Critical` a host-level one. The VM unwinds identically for both
/// and keeps the distinction in the error record.
#[derive(Debug)]
pub enum BuiltinResult {
    Value(Value),
    Panic(String),
    Critical(String),
}

impl BuiltinResult {
    pub fn null() -> BuiltinResult {
        BuiltinResult::Value(Value::Null)
    }
}

/// Everything the VM exposes to a host callable: randomness, wall-clock time,
/// the output writer, a keyed scratch store shared across the VM instance,
/// and the print prefix.
pub trait BuiltinContext {
    fn rng(&mut self) -> &mut StdRng;
    fn now(&self) -> SystemTime;
    fn writer(&mut self) -> &mut dyn Write;
    fn store_get(&self, key: &str) -> Option<Value>;
    fn store_set(&mut self, key: &str, value: Value);
    fn print_prefix(&self) -> &str;
}

pub struct BuiltinDef {
    pub name: &'static str,
    pub func: fn(&mut dyn BuiltinContext, &[Value]) -> BuiltinResult,
}

/// Core builtins, installed in the outermost symbol-table scope by position
/// before any user code compiles. Order is part of the bytecode contract.
pub const BUILTINS: &[BuiltinDef] = &[
    BuiltinDef {
        name: "len",
        func: builtin_len,
    },
    BuiltinDef {
        name: "print",
        func: builtin_print,
    },
    BuiltinDef {
        name: "panic",
        func: builtin_panic,
    },
    BuiltinDef {
        name: "push",
        func: builtin_push,
    },
    BuiltinDef {
        name: "keys",
        func: builtin_keys,
    },
];

/// Position of `len` in `BUILTINS`; the for-in lowering calls it directly.
pub const LEN_BUILTIN_INDEX: u8 = 0;

pub fn builtin_index(name: &str) -> Option<u8> {
    BUILTINS
        .iter()
        .position(|def| def.name == name)
        .map(|index| index as u8)
}

fn wrong_args(got: usize, want: usize) -> BuiltinResult {
    BuiltinResult::Panic(format!(
        "wrong number of arguments. got={got}, want={want}"
    ))
}

fn builtin_len(_ctx: &mut dyn BuiltinContext, args: &[Value]) -> BuiltinResult {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    match &args[0] {
        Value::Str(text) => BuiltinResult::Value(Value::Int(text.len() as i64)),
        Value::Array(elements) => BuiltinResult::Value(Value::Int(elements.borrow().len() as i64)),
        Value::Hash(pairs) => BuiltinResult::Value(Value::Int(pairs.borrow().len() as i64)),
        other => BuiltinResult::Panic(format!(
            "argument to `len` not supported, got {}",
            other.type_name()
        )),
    }
}

fn builtin_print(ctx: &mut dyn BuiltinContext, args: &[Value]) -> BuiltinResult {
    let line = args.iter().map(Value::inspect).collect::<Vec<_>>().join(" ");
    let prefix = ctx.print_prefix().to_string();
    if let Err(err) = writeln!(ctx.writer(), "{prefix}{line}") {
        return BuiltinResult::Critical(format!("print: write failed: {err}"));
    }
    BuiltinResult::null()
}

fn builtin_panic(_ctx: &mut dyn BuiltinContext, args: &[Value]) -> BuiltinResult {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    BuiltinResult::Panic(args[0].inspect())
}

fn builtin_push(_ctx: &mut dyn BuiltinContext, args: &[Value]) -> BuiltinResult {
    if args.len() != 2 {
        return wrong_args(args.len(), 2);
    }
    let Value::Array(elements) = &args[0] else {
        return BuiltinResult::Panic(format!(
            "argument to `push` must be {ARRAY_TYPE}, got {}",
            args[0].type_name()
        ));
    };
    // The array is shared; the caller observes the mutation through every
    // reference.
    elements
        .borrow_mut()
        .push(args[1].clone().unwrap_tuple());
    BuiltinResult::Value(args[0].clone())
}

fn builtin_keys(_ctx: &mut dyn BuiltinContext, args: &[Value]) -> BuiltinResult {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    let Value::Hash(pairs) = &args[0] else {
        return BuiltinResult::Panic(format!(
            "argument to `keys` must be {HASH_TYPE}, got {}",
            args[0].type_name()
        ));
    };
    let keys = pairs
        .borrow()
        .values()
        .map(|pair| pair.key.clone())
        .collect::<Vec<_>>();
    BuiltinResult::Value(Value::array(keys))
}
