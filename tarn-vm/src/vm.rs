use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::SystemTime;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::builtins::{BUILTINS, BuiltinContext, BuiltinResult};
use crate::cancel::CancelToken;
use crate::compiler::Bytecode;
use crate::error::{ScriptError, TraceFrame};
use crate::opcode::{self, Op};
use crate::symbol::{SymbolScope, SymbolTable};
use crate::value::{Builtin, Closure, CompiledFunction, HashPair, Value};

pub const STACK_SIZE: usize = 2048;
pub const GLOBAL_SIZE: usize = 65536;
pub const MAX_FRAMES: usize = 1024;

// Instructions executed between cancellation checks.
const CANCEL_CHECK_INTERVAL: u32 = 1024;

// How far back line resolution searches for a source-map entry; instruction
// pointers may sit past operand bytes when an error is raised.
const SOURCE_MAP_WINDOW: usize = 10;

struct Frame {
    closure: Rc<Closure>,
    ip: usize,
    base_pointer: usize,
}

impl Frame {
    fn new(closure: Rc<Closure>, base_pointer: usize) -> Self {
        Self {
            closure,
            ip: 0,
            base_pointer,
        }
    }
}

enum Flow {
    Continue,
    Halt,
}

enum VmAbort {
    Fault(String),
    Critical(String),
}

impl From<String> for VmAbort {
    fn from(message: String) -> Self {
        VmAbort::Fault(message)
    }
}

impl From<&str> for VmAbort {
    fn from(message: &str) -> Self {
        VmAbort::Fault(message.to_string())
    }
}

pub struct Vm {
    constants: Vec<Value>,
    stack: Vec<Value>,
    sp: usize,
    globals: Vec<Value>,
    frames: Vec<Frame>,
    symbol_table: SymbolTable,
    core_builtins: Vec<Value>,
    last_popped: Value,
    rng: StdRng,
    output: Box<dyn Write>,
    store: HashMap<String, Value>,
    print_prefix: String,
}

impl Vm {
    pub fn new(bytecode: Bytecode) -> Self {
        let main_function = Rc::new(CompiledFunction {
            instructions: bytecode.instructions,
            num_locals: 0,
            num_parameters: 0,
            source_map: bytecode.source_map,
            name: "main".to_string(),
        });
        let main_closure = Rc::new(Closure {
            function: main_function,
            free: Vec::new(),
        });
        let core_builtins = BUILTINS
            .iter()
            .map(|def| {
                Value::Builtin(Rc::new(Builtin {
                    name: def.name.to_string(),
                    func: Rc::new(def.func),
                }))
            })
            .collect();
        Self {
            constants: bytecode.constants,
            stack: vec![Value::Null; STACK_SIZE],
            sp: 0,
            globals: vec![Value::Null; GLOBAL_SIZE],
            frames: vec![Frame::new(main_closure, 0)],
            symbol_table: bytecode.symbol_table,
            core_builtins,
            last_popped: Value::Null,
            rng: StdRng::from_os_rng(),
            output: Box::new(std::io::stdout()),
            store: HashMap::new(),
            print_prefix: String::new(),
        }
    }

    /// Reseeds the context RNG; useful for deterministic hosts and tests.
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    pub fn set_output(&mut self, output: Box<dyn Write>) {
        self.output = output;
    }

    pub fn set_print_prefix(&mut self, prefix: impl Into<String>) {
        self.print_prefix = prefix.into();
    }

    pub fn set_global(&mut self, index: usize, value: Value) -> Result<(), ScriptError> {
        if index >= self.globals.len() {
            return Err(ScriptError::runtime(format!(
                "global index {index} out of bounds"
            )));
        }
        self.globals[index] = value;
        Ok(())
    }

    pub fn get_global(&self, name: &str) -> Result<Value, ScriptError> {
        let Some(symbol) = self.symbol_table.resolve_global(name) else {
            return Err(ScriptError::runtime(format!("undefined global: {name}")));
        };
        if symbol.scope != SymbolScope::Global {
            return Err(ScriptError::runtime(format!(
                "{name} is not a global (scope: {})",
                symbol.scope.describe()
            )));
        }
        Ok(self.globals[symbol.index as usize].clone())
    }

    /// The value most recently discarded by `Pop`; after a run this is the
    /// result of the final expression statement.
    pub fn last_popped(&self) -> Value {
        self.stack.get(self.sp).cloned().unwrap_or(Value::Null)
    }

    pub fn run(&mut self, token: &CancelToken) -> Result<(), ScriptError> {
        self.execute(token)
    }

    /// Calls a script function outside the main run. The stack is reset, so
    /// state only persists through globals and the scratch store.
    pub fn invoke(
        &mut self,
        token: &CancelToken,
        function: &Value,
        args: &[Value],
    ) -> Result<Value, ScriptError> {
        let Value::Closure(closure) = function else {
            return Err(ScriptError::runtime(format!(
                "invoke expected a function, got {}",
                function.type_name()
            )));
        };
        if args.len() != closure.function.num_parameters {
            return Err(ScriptError::runtime(format!(
                "wrong number of arguments: want={}, got={}",
                closure.function.num_parameters,
                args.len()
            )));
        }

        self.sp = 0;
        self.push_host(Value::Closure(closure.clone()))?;
        for arg in args {
            self.push_host(arg.clone())?;
        }

        let base_pointer = self.sp - args.len();
        let new_sp = base_pointer + closure.function.num_locals;
        if new_sp > STACK_SIZE {
            return Err(ScriptError::runtime("stack overflow"));
        }
        self.frames.clear();
        self.frames.push(Frame::new(closure.clone(), base_pointer));
        for slot in self.sp..new_sp {
            self.stack[slot] = Value::Null;
        }
        self.sp = new_sp;
        self.last_popped = Value::Null;

        self.execute(token)?;
        Ok(self.last_popped.clone())
    }

    fn push_host(&mut self, value: Value) -> Result<(), ScriptError> {
        self.push(value).map_err(|message| ScriptError::runtime(message))
    }

    fn execute(&mut self, token: &CancelToken) -> Result<(), ScriptError> {
        let mut ops_count = 0u32;
        loop {
            let (op_ip, byte) = {
                let Some(frame) = self.frames.last_mut() else {
                    return Ok(());
                };
                let instructions = &frame.closure.function.instructions;
                if frame.ip >= instructions.len() {
                    return Ok(());
                }
                let ip = frame.ip;
                frame.ip += 1;
                (ip, instructions[ip])
            };

            ops_count += 1;
            if ops_count >= CANCEL_CHECK_INTERVAL {
                ops_count = 0;
                if let Some(reason) = token.reason() {
                    return Err(ScriptError::cancelled(reason.message()));
                }
            }

            let Some(op) = Op::from_byte(byte) else {
                return Err(self.fail(op_ip, format!("unknown opcode {byte:#04x}"), false));
            };

            match self.step(op) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Halt) => return Ok(()),
                Err(VmAbort::Fault(message)) => return Err(self.fail(op_ip, message, false)),
                Err(VmAbort::Critical(message)) => return Err(self.fail(op_ip, message, true)),
            }
        }
    }

    fn step(&mut self, op: Op) -> Result<Flow, VmAbort> {
        match op {
            Op::LoadConst => {
                let index = self.read_u16_operand()? as usize;
                let value = self
                    .constants
                    .get(index)
                    .cloned()
                    .ok_or_else(|| format!("constant {index} out of range"))?;
                self.push(value)?;
            }
            Op::Pop => {
                self.last_popped = self.pop()?;
            }
            Op::Dup => {
                let value = self.peek()?.clone();
                self.push(value)?;
            }
            Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Mod => {
                self.execute_binary_operation(op)?;
            }
            Op::Equal | Op::NotEqual | Op::GreaterThan => {
                self.execute_comparison(op)?;
            }
            Op::Not => {
                let operand = self.pop()?.unwrap_tuple();
                let result = match operand {
                    Value::Bool(value) => !value,
                    Value::Null => true,
                    _ => false,
                };
                self.push(Value::Bool(result))?;
            }
            Op::Negate => {
                let operand = self.pop()?;
                let negated = match operand {
                    Value::Int(value) => Value::Int(value.wrapping_neg()),
                    Value::Float(value) => Value::Float(-value),
                    other => {
                        return Err(format!(
                            "unsupported type for negation: {}",
                            other.type_name()
                        )
                        .into());
                    }
                };
                self.push(negated)?;
            }
            Op::PushTrue => self.push(Value::Bool(true))?,
            Op::PushFalse => self.push(Value::Bool(false))?,
            Op::PushNull => self.push(Value::Null)?,
            Op::Jump => {
                let target = self.read_u16_operand()? as usize;
                self.jump_to(target);
            }
            Op::JumpIfFalsy => {
                let target = self.read_u16_operand()? as usize;
                let condition = self.pop()?;
                if !is_truthy(&condition)? {
                    self.jump_to(target);
                }
            }
            Op::StoreGlobal => {
                let index = self.read_u16_operand()? as usize;
                let value = self.pop()?.unwrap_tuple();
                self.globals[index] = value;
            }
            Op::LoadGlobal => {
                let index = self.read_u16_operand()? as usize;
                let value = self.globals[index].clone();
                self.push(value)?;
            }
            Op::StoreLocal => {
                let index = self.read_u8_operand()? as usize;
                let value = self.pop()?.unwrap_tuple();
                let base = self.current_frame().base_pointer;
                self.stack[base + index] = value;
            }
            Op::LoadLocal => {
                let index = self.read_u8_operand()? as usize;
                let base = self.current_frame().base_pointer;
                let value = self.stack[base + index].clone();
                self.push(value)?;
            }
            Op::LoadFree => {
                let index = self.read_u8_operand()? as usize;
                let value = self
                    .current_frame()
                    .closure
                    .free
                    .get(index)
                    .cloned()
                    .ok_or_else(|| format!("free variable {index} out of range"))?;
                self.push(value)?;
            }
            Op::LoadBuiltin => {
                let index = self.read_u8_operand()? as usize;
                let value = self
                    .core_builtins
                    .get(index)
                    .cloned()
                    .ok_or_else(|| format!("builtin {index} out of range"))?;
                self.push(value)?;
            }
            Op::BuildArray => {
                let count = self.read_u16_operand()? as usize;
                if self.sp < count {
                    return Err("stack underflow building array".into());
                }
                let elements = self.stack[self.sp - count..self.sp]
                    .iter()
                    .map(|value| value.clone().unwrap_tuple())
                    .collect::<Vec<_>>();
                self.sp -= count;
                self.push(Value::array(elements))?;
            }
            Op::BuildHash => {
                let count = self.read_u16_operand()? as usize;
                if self.sp < count {
                    return Err("stack underflow building hash".into());
                }
                let mut pairs = HashMap::new();
                let mut slot = self.sp - count;
                while slot < self.sp {
                    let key = self.stack[slot].clone().unwrap_tuple();
                    let value = self.stack[slot + 1].clone().unwrap_tuple();
                    let hash_key = key
                        .hash_key()
                        .ok_or_else(|| format!("unusable as hash key: {}", key.type_name()))?;
                    pairs.insert(hash_key, HashPair { key, value });
                    slot += 2;
                }
                self.sp -= count;
                self.push(Value::Hash(Rc::new(std::cell::RefCell::new(pairs))))?;
            }
            Op::Index => {
                let index = self.pop()?;
                let left = self.pop()?;
                self.execute_index(left, index)?;
            }
            Op::SetIndex => {
                self.execute_set_index()?;
            }
            Op::Slice => {
                let end = self.pop()?;
                let start = self.pop()?;
                let left = self.pop()?;
                self.execute_slice(left, start, end)?;
            }
            Op::Call => {
                let argc = self.read_u8_operand()? as usize;
                if self.sp < argc + 1 {
                    return Err("stack underflow in call".into());
                }
                let callee = self.stack[self.sp - 1 - argc].clone();
                match callee {
                    Value::Closure(closure) => self.call_closure(closure, argc)?,
                    Value::Builtin(builtin) => self.call_builtin(builtin, argc)?,
                    _ => return Err("calling non-function".into()),
                }
            }
            Op::ReturnValue => {
                let value = self.pop()?;
                self.last_popped = value.clone();
                if self.frames.len() == 1 {
                    self.frames.pop();
                    return Ok(Flow::Halt);
                }
                let frame = self.frames.pop().expect("frame count checked above");
                self.sp = frame.base_pointer - 1;
                self.push(value)?;
            }
            Op::Return => {
                self.last_popped = Value::Null;
                if self.frames.len() == 1 {
                    self.frames.pop();
                    return Ok(Flow::Halt);
                }
                let frame = self.frames.pop().expect("frame count checked above");
                self.sp = frame.base_pointer - 1;
                self.push(Value::Null)?;
            }
            Op::MakeClosure => {
                let const_index = self.read_u16_operand()? as usize;
                let num_free = self.read_u8_operand()? as usize;
                self.push_closure(const_index, num_free)?;
            }
            Op::Destructure => {
                let count = self.read_u8_operand()? as usize;
                let value = self.pop()?;
                let Value::Tuple(elements) = value else {
                    return Err(format!(
                        "cannot destructure non-tuple into {count} values"
                    )
                    .into());
                };
                if elements.len() < count {
                    return Err(format!(
                        "not enough values to unpack: have {}, want {}",
                        elements.len(),
                        count
                    )
                    .into());
                }
                // Pushed in order so the reverse-order stores that follow
                // bind the first element to the first name.
                for element in elements.iter().take(count) {
                    self.push(element.clone())?;
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn jump_to(&mut self, target: usize) {
        self.frames
            .last_mut()
            .expect("jump executes inside a frame")
            .ip = target;
    }

    fn read_u16_operand(&mut self) -> Result<u16, String> {
        let frame = self
            .frames
            .last_mut()
            .expect("operands are read inside a frame");
        let instructions = &frame.closure.function.instructions;
        if frame.ip + 2 > instructions.len() {
            return Err("truncated instruction".to_string());
        }
        let value = opcode::read_u16(&instructions[frame.ip..]);
        frame.ip += 2;
        Ok(value)
    }

    fn read_u8_operand(&mut self) -> Result<u8, String> {
        let frame = self
            .frames
            .last_mut()
            .expect("operands are read inside a frame");
        let instructions = &frame.closure.function.instructions;
        if frame.ip >= instructions.len() {
            return Err("truncated instruction".to_string());
        }
        let value = instructions[frame.ip];
        frame.ip += 1;
        Ok(value)
    }

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("a frame is active")
    }

    fn push(&mut self, value: Value) -> Result<(), String> {
        if self.sp >= STACK_SIZE {
            return Err("stack overflow".to_string());
        }
        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, String> {
        if self.sp == 0 {
            return Err("stack underflow".to_string());
        }
        self.sp -= 1;
        // The slot keeps its value so `last_popped` can read it.
        Ok(self.stack[self.sp].clone())
    }

    fn peek(&self) -> Result<&Value, String> {
        if self.sp == 0 {
            return Err("stack underflow".to_string());
        }
        Ok(&self.stack[self.sp - 1])
    }

    fn call_closure(&mut self, closure: Rc<Closure>, argc: usize) -> Result<(), VmAbort> {
        if argc != closure.function.num_parameters {
            return Err(format!(
                "wrong number of arguments: want={}, got={}",
                closure.function.num_parameters, argc
            )
            .into());
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err("stack overflow".into());
        }
        let base_pointer = self.sp - argc;
        let new_sp = base_pointer + closure.function.num_locals;
        if new_sp > STACK_SIZE {
            return Err("stack overflow".into());
        }
        // Reserve and clear the non-parameter local slots.
        for slot in self.sp..new_sp {
            self.stack[slot] = Value::Null;
        }
        self.frames.push(Frame::new(closure, base_pointer));
        self.sp = new_sp;
        Ok(())
    }

    fn call_builtin(&mut self, builtin: Rc<Builtin>, argc: usize) -> Result<(), VmAbort> {
        let args = self.stack[self.sp - argc..self.sp].to_vec();
        self.sp -= argc + 1; // pop arguments and the callee
        let result = (builtin.func)(self, &args);
        match result {
            BuiltinResult::Value(value) => {
                self.push(value)?;
                Ok(())
            }
            BuiltinResult::Panic(message) => Err(VmAbort::Fault(message)),
            BuiltinResult::Critical(message) => Err(VmAbort::Critical(message)),
        }
    }

    fn push_closure(&mut self, const_index: usize, num_free: usize) -> Result<(), VmAbort> {
        let constant = self
            .constants
            .get(const_index)
            .cloned()
            .ok_or_else(|| format!("constant {const_index} out of range"))?;
        let function = match constant {
            Value::Function(function) => function,
            other => return Err(format!("not a function: {}", other.type_name()).into()),
        };
        if self.sp < num_free {
            return Err("stack underflow constructing closure".into());
        }
        let free = self.stack[self.sp - num_free..self.sp].to_vec();
        self.sp -= num_free;
        self.push(Value::Closure(Rc::new(Closure { function, free })))?;
        Ok(())
    }

    fn execute_binary_operation(&mut self, op: Op) -> Result<(), String> {
        let right = self.pop()?;
        let left = self.pop()?;

        // String concatenation; a non-string side is stringified.
        if op == Op::Add
            && (matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)))
        {
            let text = format!("{}{}", left.inspect(), right.inspect());
            return self.push(Value::string(text));
        }

        match (&left, &right) {
            (Value::Int(l), Value::Int(r)) => {
                let result = match op {
                    Op::Add => Value::Int(l.wrapping_add(*r)),
                    Op::Sub => Value::Int(l.wrapping_sub(*r)),
                    Op::Mul => Value::Int(l.wrapping_mul(*r)),
                    Op::Div => {
                        if *r == 0 {
                            return Err("division by zero".to_string());
                        }
                        // Division always yields a float.
                        Value::Float(*l as f64 / *r as f64)
                    }
                    Op::Mod => {
                        if *r == 0 {
                            return Err("division by zero".to_string());
                        }
                        Value::Int(l.wrapping_rem(*r))
                    }
                    _ => return Err(format!("unknown integer operator: {}", op.mnemonic())),
                };
                self.push(result)
            }
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let l = as_f64(&left);
                let r = as_f64(&right);
                let result = match op {
                    Op::Add => Value::Float(l + r),
                    Op::Sub => Value::Float(l - r),
                    Op::Mul => Value::Float(l * r),
                    Op::Div => {
                        if r == 0.0 {
                            return Err("division by zero".to_string());
                        }
                        Value::Float(l / r)
                    }
                    Op::Mod => {
                        return Err(format!(
                            "unsupported types for binary operation: {} {}",
                            left.type_name(),
                            right.type_name()
                        ));
                    }
                    _ => return Err(format!("unknown float operator: {}", op.mnemonic())),
                };
                self.push(result)
            }
            _ => Err(format!(
                "unsupported types for binary operation: {} {}",
                left.type_name(),
                right.type_name()
            )),
        }
    }

    fn execute_comparison(&mut self, op: Op) -> Result<(), String> {
        let right = self.pop()?;
        let left = self.pop()?;

        let result = match (&left, &right) {
            (Value::Int(l), Value::Int(r)) => match op {
                Op::Equal => l == r,
                Op::NotEqual => l != r,
                _ => l > r,
            },
            (Value::Float(l), Value::Float(r)) => match op {
                Op::Equal => l == r,
                Op::NotEqual => l != r,
                _ => l > r,
            },
            // Mixed numeric kinds: ordering promotes, equality stays strict
            // by kind.
            (Value::Int(l), Value::Float(r)) => match op {
                Op::Equal => false,
                Op::NotEqual => true,
                _ => (*l as f64) > *r,
            },
            (Value::Float(l), Value::Int(r)) => match op {
                Op::Equal => false,
                Op::NotEqual => true,
                _ => *l > (*r as f64),
            },
            (Value::Str(l), Value::Str(r)) => match op {
                Op::Equal => l == r,
                Op::NotEqual => l != r,
                _ => {
                    return Err(format!(
                        "comparison not supported: {} > {}",
                        left.type_name(),
                        right.type_name()
                    ));
                }
            },
            _ if left.is_primitive() && right.is_primitive() => match op {
                Op::Equal => primitive_eq(&left, &right),
                Op::NotEqual => !primitive_eq(&left, &right),
                _ => {
                    return Err(format!(
                        "comparison not supported: {} > {}",
                        left.type_name(),
                        right.type_name()
                    ));
                }
            },
            _ => {
                if left.type_name() != right.type_name() {
                    return Err(format!(
                        "type mismatch: {} {} {}",
                        left.type_name(),
                        op_symbol(op),
                        right.type_name()
                    ));
                }
                if op == Op::GreaterThan {
                    return Err(format!(
                        "comparison not supported: {} > {}",
                        left.type_name(),
                        right.type_name()
                    ));
                }
                // Same-type non-primitives need the equatable capability;
                // only host objects can opt in.
                let equal = match (&left, &right) {
                    (Value::Host(l), Value::Host(r)) => l.equals(r.as_ref()).ok_or_else(|| {
                        format!("equality not supported for type: {}", left.type_name())
                    })?,
                    _ => {
                        return Err(format!(
                            "equality not supported for type: {}",
                            left.type_name()
                        ));
                    }
                };
                match op {
                    Op::Equal => equal,
                    _ => !equal,
                }
            }
        };
        self.push(Value::Bool(result))
    }

    fn execute_index(&mut self, left: Value, index: Value) -> Result<(), String> {
        match (&left, &index) {
            (Value::Array(elements), Value::Int(i)) => {
                let elements = elements.borrow();
                let value = if *i < 0 || *i as usize >= elements.len() {
                    Value::Null
                } else {
                    elements[*i as usize].clone()
                };
                drop(elements);
                self.push(value)
            }
            (Value::Hash(pairs), _) => {
                let key = index
                    .hash_key()
                    .ok_or_else(|| format!("unusable as hash key: {}", index.type_name()))?;
                let value = pairs
                    .borrow()
                    .get(&key)
                    .map(|pair| pair.value.clone())
                    .unwrap_or(Value::Null);
                self.push(value)
            }
            _ => Err(format!(
                "index operator not supported: {}",
                left.type_name()
            )),
        }
    }

    fn execute_set_index(&mut self) -> Result<(), String> {
        let value = self.pop()?.unwrap_tuple();
        let key = self.pop()?.unwrap_tuple();
        let container = self.pop()?;
        match &container {
            Value::Array(elements) => {
                let index = match &key {
                    Value::Int(index) => *index,
                    other => {
                        return Err(format!(
                            "array index must be INTEGER, got {}",
                            other.type_name()
                        ));
                    }
                };
                let mut elements = elements.borrow_mut();
                if index < 0 || index as usize >= elements.len() {
                    return Err(format!("index out of range: {index}"));
                }
                elements[index as usize] = value.clone();
            }
            Value::Hash(pairs) => {
                let hash_key = key
                    .hash_key()
                    .ok_or_else(|| format!("unusable as hash key: {}", key.type_name()))?;
                pairs.borrow_mut().insert(
                    hash_key,
                    HashPair {
                        key,
                        value: value.clone(),
                    },
                );
            }
            other => {
                return Err(format!(
                    "index assignment not supported: {}",
                    other.type_name()
                ));
            }
        }
        // The assigned value is the expression result.
        self.push(value)
    }

    fn execute_slice(&mut self, left: Value, start: Value, end: Value) -> Result<(), String> {
        let Value::Array(elements) = &left else {
            return Err(format!(
                "slice operator not supported: {}",
                left.type_name()
            ));
        };
        let elements = elements.borrow();
        let length = elements.len() as i64;

        let mut start_index = match &start {
            Value::Null => 0,
            Value::Int(i) => *i,
            other => {
                return Err(format!(
                    "slice start index must be INTEGER, got {}",
                    other.type_name()
                ));
            }
        };
        let mut end_index = match &end {
            Value::Null => length,
            Value::Int(i) => *i,
            other => {
                return Err(format!(
                    "slice end index must be INTEGER, got {}",
                    other.type_name()
                ));
            }
        };

        start_index = start_index.clamp(0, length);
        end_index = end_index.clamp(0, length);
        if start_index > end_index {
            start_index = end_index;
        }

        let slice = elements[start_index as usize..end_index as usize].to_vec();
        drop(elements);
        self.push(Value::array(slice))
    }

    fn fail(&self, op_ip: usize, message: String, critical: bool) -> ScriptError {
        let mut error = ScriptError::runtime(message);
        error.critical = critical;
        if let Some(frame) = self.frames.last() {
            error.line = translate_ip(&frame.closure.function.source_map, op_ip);
            error.function = frame.closure.function.name.clone();
        }
        let top = self.frames.len().saturating_sub(1);
        for (depth, frame) in self.frames.iter().enumerate().rev() {
            let ip = if depth == top {
                op_ip
            } else {
                frame.ip.saturating_sub(1)
            };
            let function = &frame.closure.function;
            let name = if function.name.is_empty() {
                "anonymous".to_string()
            } else {
                function.name.clone()
            };
            error.frames.push(TraceFrame {
                function: name,
                line: translate_ip(&function.source_map, ip),
            });
        }
        error
    }
}

impl BuiltinContext for Vm {
    fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn writer(&mut self) -> &mut dyn Write {
        self.output.as_mut()
    }

    fn store_get(&self, key: &str) -> Option<Value> {
        self.store.get(key).cloned()
    }

    fn store_set(&mut self, key: &str, value: Value) {
        self.store.insert(key.to_string(), value);
    }

    fn print_prefix(&self) -> &str {
        &self.print_prefix
    }
}

fn is_truthy(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(value) => Ok(*value),
        Value::Null => Ok(false),
        Value::Int(value) => Ok(*value != 0),
        Value::Float(value) => Ok(*value != 0.0),
        Value::Str(value) => Ok(!value.is_empty()),
        other => Err(format!(
            "condition must be boolean, got {}",
            other.type_name()
        )),
    }
}

fn primitive_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Int(l), Value::Int(r)) => l == r,
        (Value::Float(l), Value::Float(r)) => l == r,
        (Value::Bool(l), Value::Bool(r)) => l == r,
        (Value::Str(l), Value::Str(r)) => l == r,
        _ => false,
    }
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Int(value) => *value as f64,
        Value::Float(value) => *value,
        _ => 0.0,
    }
}

fn op_symbol(op: Op) -> &'static str {
    match op {
        Op::Equal => "==",
        Op::NotEqual => "!=",
        Op::GreaterThan => ">",
        _ => op.mnemonic(),
    }
}

fn translate_ip(source_map: &HashMap<usize, u32>, ip: usize) -> u32 {
    for back in 0..SOURCE_MAP_WINDOW {
        if ip < back {
            break;
        }
        if let Some(line) = source_map.get(&(ip - back)) {
            return *line;
        }
    }
    0
}
