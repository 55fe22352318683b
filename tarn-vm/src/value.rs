use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::builtins::{BuiltinContext, BuiltinResult};

pub const INTEGER_TYPE: &str = "INTEGER";
pub const FLOAT_TYPE: &str = "FLOAT";
pub const BOOLEAN_TYPE: &str = "BOOLEAN";
pub const NULL_TYPE: &str = "NULL";
pub const STRING_TYPE: &str = "STRING";
pub const ARRAY_TYPE: &str = "ARRAY";
pub const HASH_TYPE: &str = "HASH";
pub const TUPLE_TYPE: &str = "TUPLE";
pub const FUNCTION_TYPE: &str = "COMPILED_FUNCTION";
pub const CLOSURE_TYPE: &str = "CLOSURE";
pub const BUILTIN_TYPE: &str = "BUILTIN";
pub const HOST_TYPE: &str = "HOST";

/// Hash map key: the value's type tag plus a stable 64-bit hash. The original
/// key object is kept in the pair so `keys` can return it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub tag: &'static str,
    pub value: u64,
}

#[derive(Clone, Debug)]
pub struct HashPair {
    pub key: Value,
    pub value: Value,
}

#[derive(Clone, Debug)]
pub struct CompiledFunction {
    pub instructions: Vec<u8>,
    pub num_locals: usize,
    pub num_parameters: usize,
    /// Instruction offset -> 1-based source line.
    pub source_map: HashMap<usize, u32>,
    /// Empty for anonymous functions; stack traces show "anonymous".
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct Closure {
    pub function: Rc<CompiledFunction>,
    /// Free variables captured by value at closure construction.
    pub free: Vec<Value>,
}

pub type BuiltinFn = Rc<dyn Fn(&mut dyn BuiltinContext, &[Value]) -> BuiltinResult>;

#[derive(Clone)]
pub struct Builtin {
    pub name: String,
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin").field("name", &self.name).finish()
    }
}

/// Opaque host-owned value. Equality is opt-in via `equals`; host objects are
/// never hashable.
pub trait HostObject: fmt::Debug {
    fn inspect(&self) -> String;
    fn equals(&self, _other: &dyn HostObject) -> Option<bool> {
        None
    }
    fn as_any(&self) -> &dyn Any;
}

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(Rc<String>),
    Array(Rc<RefCell<Vec<Value>>>),
    Hash(Rc<RefCell<HashMap<HashKey, HashPair>>>),
    Tuple(Rc<Vec<Value>>),
    Function(Rc<CompiledFunction>),
    Closure(Rc<Closure>),
    Builtin(Rc<Builtin>),
    Host(Rc<dyn HostObject>),
}

impl Value {
    pub fn string(text: impl Into<String>) -> Value {
        Value::Str(Rc::new(text.into()))
    }

    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn tuple(elements: Vec<Value>) -> Value {
        Value::Tuple(Rc::new(elements))
    }

    pub fn builtin(
        name: impl Into<String>,
        func: impl Fn(&mut dyn BuiltinContext, &[Value]) -> BuiltinResult + 'static,
    ) -> Value {
        Value::Builtin(Rc::new(Builtin {
            name: name.into(),
            func: Rc::new(func),
        }))
    }

    pub fn host(object: impl HostObject + 'static) -> Value {
        Value::Host(Rc::new(object))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => NULL_TYPE,
            Value::Int(_) => INTEGER_TYPE,
            Value::Float(_) => FLOAT_TYPE,
            Value::Bool(_) => BOOLEAN_TYPE,
            Value::Str(_) => STRING_TYPE,
            Value::Array(_) => ARRAY_TYPE,
            Value::Hash(_) => HASH_TYPE,
            Value::Tuple(_) => TUPLE_TYPE,
            Value::Function(_) => FUNCTION_TYPE,
            Value::Closure(_) => CLOSURE_TYPE,
            Value::Builtin(_) => BUILTIN_TYPE,
            Value::Host(_) => HOST_TYPE,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Int(_) | Value::Float(_) | Value::Bool(_) | Value::Str(_)
        )
    }

    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Value::Int(value) => Some(HashKey {
                tag: INTEGER_TYPE,
                value: *value as u64,
            }),
            Value::Float(value) => Some(HashKey {
                tag: FLOAT_TYPE,
                value: value.to_bits(),
            }),
            Value::Bool(value) => Some(HashKey {
                tag: BOOLEAN_TYPE,
                value: *value as u64,
            }),
            Value::Str(value) => Some(HashKey {
                tag: STRING_TYPE,
                value: fnv1a_64(value.as_bytes()),
            }),
            _ => None,
        }
    }

    /// A tuple in scalar context behaves as its first element.
    pub fn unwrap_tuple(self) -> Value {
        match self {
            Value::Tuple(elements) => elements.first().cloned().unwrap_or(Value::Null),
            other => other,
        }
    }

    /// Best-effort numeric view of the value, for hosts unpacking results.
    /// Tuples delegate to their first element.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            Value::Float(value) => Some(*value as i64),
            Value::Bool(value) => Some(*value as i64),
            Value::Str(value) => value.parse().ok(),
            Value::Tuple(elements) => elements.first()?.as_int(),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            Value::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
            Value::Str(value) => value.parse().ok(),
            Value::Tuple(elements) => elements.first()?.as_float(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Int(value) => Some(*value != 0),
            Value::Float(value) => Some(*value != 0.0),
            Value::Bool(value) => Some(*value),
            Value::Str(value) => Some(value.as_str() == "true"),
            Value::Tuple(elements) => elements.first()?.as_bool(),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::Int(_) | Value::Float(_) | Value::Bool(_) | Value::Str(_) => {
                Some(self.inspect())
            }
            Value::Host(object) => Some(object.inspect()),
            Value::Tuple(elements) => elements.first()?.as_string(),
            _ => None,
        }
    }

    pub fn inspect(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Int(value) => value.to_string(),
            Value::Float(value) => format_float(*value),
            Value::Bool(value) => value.to_string(),
            Value::Str(value) => value.as_ref().clone(),
            Value::Array(elements) => {
                let elements = elements
                    .borrow()
                    .iter()
                    .map(Value::inspect)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{elements}]")
            }
            Value::Hash(pairs) => {
                let pairs = pairs
                    .borrow()
                    .values()
                    .map(|pair| format!("{}: {}", pair.key.inspect(), pair.value.inspect()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{{pairs}}}")
            }
            Value::Tuple(elements) => {
                let elements = elements
                    .iter()
                    .map(Value::inspect)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({elements})")
            }
            Value::Function(function) => {
                format!("func[{}]", function_label(&function.name))
            }
            Value::Closure(closure) => {
                format!("closure[{}]", function_label(&closure.function.name))
            }
            Value::Builtin(builtin) => format!("builtin[{}]", builtin.name),
            Value::Host(object) => object.inspect(),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::string(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(elements: Vec<Value>) -> Self {
        Value::array(elements)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Value::Null,
        }
    }
}

fn function_label(name: &str) -> &str {
    if name.is_empty() { "anonymous" } else { name }
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
