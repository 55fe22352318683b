use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Block, Expr, Ident, InfixOp, PrefixOp, Program, Stmt};
use crate::builtins::{self, BUILTINS};
use crate::error::ScriptError;
use crate::opcode::{self, Op};
use crate::parser::parse;
use crate::symbol::{Symbol, SymbolScope, SymbolTable};
use crate::value::{CompiledFunction, Value};

const PLACEHOLDER: usize = 0xFFFF;

/// Output of a successful compilation: flat instructions for the main scope,
/// the shared constant pool, the final symbol table (used by the VM to map
/// global names to slots), and the main scope's source map.
#[derive(Debug)]
pub struct Bytecode {
    pub instructions: Vec<u8>,
    pub constants: Vec<Value>,
    pub symbol_table: SymbolTable,
    pub source_map: HashMap<usize, u32>,
}

/// Compiles a source string in one shot. Parse errors are collected and
/// returned together; a compile error is returned alone.
pub fn compile(source: &str) -> Result<Bytecode, Vec<ScriptError>> {
    let program = parse(source)?;
    let mut compiler = Compiler::new();
    compiler.compile_program(&program).map_err(|err| vec![err])?;
    Ok(compiler.into_bytecode())
}

#[derive(Clone, Copy, Default)]
struct EmittedInstruction {
    op: Option<Op>,
    position: usize,
}

#[derive(Default)]
struct CompilationScope {
    instructions: Vec<u8>,
    last: EmittedInstruction,
    previous: EmittedInstruction,
    source_map: HashMap<usize, u32>,
}

#[derive(Default)]
struct LoopContext {
    break_patches: Vec<usize>,
    continue_patches: Vec<usize>,
}

pub struct Compiler {
    constants: Vec<Value>,
    symbols: SymbolTable,
    scopes: Vec<CompilationScope>,
    loops: Vec<LoopContext>,
    last_line: u32,
    hidden_counter: u32,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        for (index, def) in BUILTINS.iter().enumerate() {
            symbols.define_builtin(index as u16, def.name);
        }
        Self {
            constants: Vec::new(),
            symbols,
            scopes: vec![CompilationScope::default()],
            loops: Vec::new(),
            last_line: 0,
            hidden_counter: 0,
        }
    }

    /// Defines a global slot before compilation so a host can inject a value
    /// for it with `Vm::set_global`.
    pub fn define_global(&mut self, name: &str) -> Symbol {
        self.symbols.define(name)
    }

    pub fn compile_program(&mut self, program: &Program) -> Result<(), ScriptError> {
        // Pre-scan top-level declarations so forward references between
        // top-level functions resolve.
        let cached: Vec<Option<Vec<Symbol>>> = program
            .statements
            .iter()
            .map(|stmt| self.prescan(stmt))
            .collect();
        for (stmt, cache) in program.statements.iter().zip(&cached) {
            self.compile_statement_cached(stmt, cache.as_deref())?;
        }
        Ok(())
    }

    pub fn into_bytecode(mut self) -> Bytecode {
        let main = self.scopes.swap_remove(0);
        Bytecode {
            instructions: main.instructions,
            constants: self.constants,
            symbol_table: self.symbols,
            source_map: main.source_map,
        }
    }

    fn prescan(&mut self, stmt: &Stmt) -> Option<Vec<Symbol>> {
        match stmt {
            Stmt::Var {
                names, constant, ..
            } => Some(self.define_names(names, *constant)),
            Stmt::ShortDecl { names, .. } => Some(self.define_names(names, false)),
            _ => None,
        }
    }

    fn define_names(&mut self, names: &[Ident], constant: bool) -> Vec<Symbol> {
        names
            .iter()
            .map(|ident| {
                if constant {
                    self.symbols.define_const(&ident.name)
                } else {
                    self.symbols.define(&ident.name)
                }
            })
            .collect()
    }

    fn compile_statement(&mut self, stmt: &Stmt) -> Result<(), ScriptError> {
        self.compile_statement_cached(stmt, None)
    }

    fn compile_statement_cached(
        &mut self,
        stmt: &Stmt,
        cache: Option<&[Symbol]>,
    ) -> Result<(), ScriptError> {
        self.last_line = stmt.line();
        match stmt {
            Stmt::Var {
                names,
                value,
                constant,
                ..
            } => self.compile_declaration(names, value, *constant, cache),
            Stmt::ShortDecl { names, value, .. } => {
                self.compile_declaration(names, value, false, cache)
            }
            Stmt::Return { value, .. } => {
                match value {
                    Some(value) => self.compile_expression(value)?,
                    None => {
                        self.emit(Op::PushNull, &[]);
                    }
                }
                self.emit(Op::ReturnValue, &[]);
                Ok(())
            }
            Stmt::Break { .. } => {
                if self.loops.is_empty() {
                    return Err(self.error("break outside loop"));
                }
                let pos = self.emit(Op::Jump, &[PLACEHOLDER]);
                self.loops
                    .last_mut()
                    .expect("loop context checked above")
                    .break_patches
                    .push(pos);
                Ok(())
            }
            Stmt::Continue { .. } => {
                if self.loops.is_empty() {
                    return Err(self.error("continue outside loop"));
                }
                let pos = self.emit(Op::Jump, &[PLACEHOLDER]);
                self.loops
                    .last_mut()
                    .expect("loop context checked above")
                    .continue_patches
                    .push(pos);
                Ok(())
            }
            Stmt::For {
                init,
                cond,
                post,
                body,
                ..
            } => self.compile_for(init.as_deref(), cond.as_ref(), post.as_deref(), body),
            Stmt::ForIn {
                name,
                iterable,
                body,
                ..
            } => self.compile_for_in(name, iterable, body),
            Stmt::Expr { expr, .. } => {
                self.compile_expression(expr)?;
                self.emit(Op::Pop, &[]);
                Ok(())
            }
        }
    }

    fn compile_declaration(
        &mut self,
        names: &[Ident],
        value: &Expr,
        constant: bool,
        cache: Option<&[Symbol]>,
    ) -> Result<(), ScriptError> {
        if names.len() > u8::MAX as usize {
            return Err(self.error("too many targets in declaration"));
        }
        let symbols = match cache {
            Some(symbols) => symbols.to_vec(),
            None => self.define_names(names, constant),
        };
        self.compile_expression(value)?;
        if symbols.len() > 1 {
            self.emit(Op::Destructure, &[symbols.len()]);
        }
        // The stack is LIFO: assign in reverse so the first pushed element
        // lands in the first name.
        for symbol in symbols.iter().rev() {
            self.emit_store(symbol)?;
        }
        Ok(())
    }

    fn compile_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        post: Option<&Stmt>,
        body: &Block,
    ) -> Result<(), ScriptError> {
        self.symbols.enter_block();
        if let Some(init) = init {
            self.compile_statement(init)?;
        }
        let loop_start = self.current_len();
        let mut exit_jump = None;
        if let Some(cond) = cond {
            self.compile_expression(cond)?;
            exit_jump = Some(self.emit(Op::JumpIfFalsy, &[PLACEHOLDER]));
        }

        self.loops.push(LoopContext::default());
        let body_result = self.compile_block(body);
        let ctx = self.loops.pop().expect("loop context pushed above");
        body_result?;

        let post_pos = self.current_len();
        for patch in ctx.continue_patches {
            self.change_operand(patch, post_pos);
        }
        if let Some(post) = post {
            self.compile_statement(post)?;
        }
        self.emit(Op::Jump, &[loop_start]);

        let end = self.current_len();
        if let Some(jump) = exit_jump {
            self.change_operand(jump, end);
        }
        for patch in ctx.break_patches {
            self.change_operand(patch, end);
        }
        self.symbols.leave_block();
        Ok(())
    }

    // `for v in xs { .. }` lowers to an index-driven loop over hidden locals.
    // The hidden names contain `#`, which no identifier can spell.
    fn compile_for_in(
        &mut self,
        name: &Ident,
        iterable: &Expr,
        body: &Block,
    ) -> Result<(), ScriptError> {
        let id = self.hidden_counter;
        self.hidden_counter += 1;

        self.symbols.enter_block();
        let iter_sym = self.symbols.define(&format!("#iter{id}"));
        let idx_sym = self.symbols.define(&format!("#idx{id}"));
        let var_sym = self.symbols.define(&name.name);

        self.compile_expression(iterable)?;
        self.emit_store(&iter_sym)?;
        self.emit_load_constant(Value::Int(0))?;
        self.emit_store(&idx_sym)?;

        let loop_start = self.current_len();
        // len(iter) > idx
        self.emit(Op::LoadBuiltin, &[builtins::LEN_BUILTIN_INDEX as usize]);
        self.emit_load(&iter_sym);
        self.emit(Op::Call, &[1]);
        self.emit_load(&idx_sym);
        self.emit(Op::GreaterThan, &[]);
        let exit_jump = self.emit(Op::JumpIfFalsy, &[PLACEHOLDER]);

        self.loops.push(LoopContext::default());
        // v = iter[idx]
        self.emit_load(&iter_sym);
        self.emit_load(&idx_sym);
        self.emit(Op::Index, &[]);
        let bind_result = self.emit_store(&var_sym);
        let body_result = bind_result.and_then(|_| self.compile_block(body));
        let ctx = self.loops.pop().expect("loop context pushed above");
        body_result?;

        let post_pos = self.current_len();
        for patch in ctx.continue_patches {
            self.change_operand(patch, post_pos);
        }
        // idx = idx + 1
        self.emit_load(&idx_sym);
        self.emit_load_constant(Value::Int(1))?;
        self.emit(Op::Add, &[]);
        self.emit_store(&idx_sym)?;
        self.emit(Op::Jump, &[loop_start]);

        let end = self.current_len();
        self.change_operand(exit_jump, end);
        for patch in ctx.break_patches {
            self.change_operand(patch, end);
        }
        self.symbols.leave_block();
        Ok(())
    }

    fn compile_block(&mut self, block: &Block) -> Result<(), ScriptError> {
        self.symbols.enter_block();
        let result = block
            .statements
            .iter()
            .try_for_each(|stmt| self.compile_statement(stmt));
        self.symbols.leave_block();
        result
    }

    fn compile_expression(&mut self, expr: &Expr) -> Result<(), ScriptError> {
        self.last_line = expr.line();
        match expr {
            Expr::Ident(ident) => {
                let Some(symbol) = self.symbols.resolve(&ident.name) else {
                    return Err(self.error(format!("undefined variable {}", ident.name)));
                };
                self.emit_load(&symbol);
                Ok(())
            }
            Expr::Int { value, .. } => self.emit_load_constant(Value::Int(*value)),
            Expr::Float { value, .. } => self.emit_load_constant(Value::Float(*value)),
            Expr::Str { value, .. } => self.emit_load_constant(Value::string(value.clone())),
            Expr::Bool { value, .. } => {
                self.emit(if *value { Op::PushTrue } else { Op::PushFalse }, &[]);
                Ok(())
            }
            Expr::Null { .. } => {
                self.emit(Op::PushNull, &[]);
                Ok(())
            }
            Expr::Prefix { op, right, .. } => {
                self.compile_expression(right)?;
                match op {
                    PrefixOp::Not => {
                        self.emit(Op::Not, &[]);
                    }
                    PrefixOp::Neg => {
                        self.emit(Op::Negate, &[]);
                    }
                    // Unary plus is the identity on its operand.
                    PrefixOp::Plus => {}
                }
                Ok(())
            }
            Expr::Infix {
                op, left, right, ..
            } => self.compile_infix(*op, left, right),
            Expr::Assign { target, value, .. } => self.compile_assign(target, value),
            Expr::If {
                cond,
                consequence,
                alternative,
                ..
            } => self.compile_if(cond, consequence, alternative.as_ref()),
            Expr::Function {
                name, params, body, ..
            } => self.compile_function(name.as_deref(), params, body),
            Expr::Call { callee, args, .. } => {
                self.compile_expression(callee)?;
                if args.len() > u8::MAX as usize {
                    return Err(self.error("too many call arguments"));
                }
                for arg in args {
                    self.compile_expression(arg)?;
                }
                self.emit(Op::Call, &[args.len()]);
                Ok(())
            }
            Expr::Index { left, index, .. } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Op::Index, &[]);
                Ok(())
            }
            Expr::Slice {
                left, start, end, ..
            } => {
                self.compile_expression(left)?;
                match start {
                    Some(start) => self.compile_expression(start)?,
                    None => {
                        self.emit(Op::PushNull, &[]);
                    }
                }
                match end {
                    Some(end) => self.compile_expression(end)?,
                    None => {
                        self.emit(Op::PushNull, &[]);
                    }
                }
                self.emit(Op::Slice, &[]);
                Ok(())
            }
            Expr::Member { object, name, .. } => {
                // Member access is sugar for string-keyed indexing.
                self.compile_expression(object)?;
                self.emit_load_constant(Value::string(name.clone()))?;
                self.emit(Op::Index, &[]);
                Ok(())
            }
            Expr::Array { elements, .. } => {
                if elements.len() > u16::MAX as usize {
                    return Err(self.error("array literal too large"));
                }
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Op::BuildArray, &[elements.len()]);
                Ok(())
            }
            Expr::Map { pairs, .. } => {
                if pairs.len() * 2 > u16::MAX as usize {
                    return Err(self.error("map literal too large"));
                }
                for (key, value) in pairs {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(Op::BuildHash, &[pairs.len() * 2]);
                Ok(())
            }
        }
    }

    fn compile_infix(&mut self, op: InfixOp, left: &Expr, right: &Expr) -> Result<(), ScriptError> {
        match op {
            // The VM only knows `>`; rewrite the other orderings onto it.
            InfixOp::Lt => {
                self.compile_expression(right)?;
                self.compile_expression(left)?;
                self.emit(Op::GreaterThan, &[]);
                return Ok(());
            }
            InfixOp::LtEq => {
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                self.emit(Op::GreaterThan, &[]);
                self.emit(Op::Not, &[]);
                return Ok(());
            }
            InfixOp::GtEq => {
                self.compile_expression(right)?;
                self.compile_expression(left)?;
                self.emit(Op::GreaterThan, &[]);
                self.emit(Op::Not, &[]);
                return Ok(());
            }
            InfixOp::And => {
                self.compile_expression(left)?;
                self.emit(Op::Dup, &[]);
                let short_circuit = self.emit(Op::JumpIfFalsy, &[PLACEHOLDER]);
                self.emit(Op::Pop, &[]);
                self.compile_expression(right)?;
                let end = self.current_len();
                self.change_operand(short_circuit, end);
                return Ok(());
            }
            InfixOp::Or => {
                self.compile_expression(left)?;
                self.emit(Op::Dup, &[]);
                let eval_right = self.emit(Op::JumpIfFalsy, &[PLACEHOLDER]);
                let short_circuit = self.emit(Op::Jump, &[PLACEHOLDER]);
                let right_pos = self.current_len();
                self.change_operand(eval_right, right_pos);
                self.emit(Op::Pop, &[]);
                self.compile_expression(right)?;
                let end = self.current_len();
                self.change_operand(short_circuit, end);
                return Ok(());
            }
            _ => {}
        }

        self.compile_expression(left)?;
        self.compile_expression(right)?;
        match op {
            InfixOp::Add => self.emit(Op::Add, &[]),
            InfixOp::Sub => self.emit(Op::Sub, &[]),
            InfixOp::Mul => self.emit(Op::Mul, &[]),
            InfixOp::Div => self.emit(Op::Div, &[]),
            InfixOp::Mod => self.emit(Op::Mod, &[]),
            InfixOp::Gt => self.emit(Op::GreaterThan, &[]),
            InfixOp::Eq => self.emit(Op::Equal, &[]),
            InfixOp::NotEq => self.emit(Op::NotEqual, &[]),
            InfixOp::Lt | InfixOp::LtEq | InfixOp::GtEq | InfixOp::And | InfixOp::Or => {
                unreachable!("rewritten above")
            }
        };
        Ok(())
    }

    fn compile_assign(&mut self, target: &Expr, value: &Expr) -> Result<(), ScriptError> {
        match target {
            Expr::Ident(ident) => {
                let Some(symbol) = self.symbols.resolve(&ident.name) else {
                    return Err(self.error(format!("variable {} not defined", ident.name)));
                };
                if symbol.constant {
                    return Err(self.error(format!("cannot assign to constant {}", ident.name)));
                }
                self.compile_expression(value)?;
                match symbol.scope {
                    SymbolScope::Global => {
                        self.emit(Op::StoreGlobal, &[symbol.index as usize]);
                        self.emit(Op::LoadGlobal, &[symbol.index as usize]);
                    }
                    SymbolScope::Local => {
                        self.emit(Op::StoreLocal, &[symbol.index as usize]);
                        self.emit(Op::LoadLocal, &[symbol.index as usize]);
                    }
                    SymbolScope::Builtin => {
                        return Err(
                            self.error(format!("cannot assign to builtin {}", ident.name))
                        );
                    }
                    SymbolScope::Free => {
                        return Err(self.error(format!(
                            "cannot assign to captured variable {}",
                            ident.name
                        )));
                    }
                }
                Ok(())
            }
            Expr::Member { object, name, .. } => {
                self.compile_expression(object)?;
                self.emit_load_constant(Value::string(name.clone()))?;
                self.compile_expression(value)?;
                self.emit(Op::SetIndex, &[]);
                Ok(())
            }
            Expr::Index { left, index, .. } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.compile_expression(value)?;
                self.emit(Op::SetIndex, &[]);
                Ok(())
            }
            _ => Err(self.error("invalid assignment target")),
        }
    }

    fn compile_if(
        &mut self,
        cond: &Expr,
        consequence: &Block,
        alternative: Option<&Block>,
    ) -> Result<(), ScriptError> {
        self.compile_expression(cond)?;
        let jump_falsy = self.emit(Op::JumpIfFalsy, &[PLACEHOLDER]);

        self.compile_block_value(consequence)?;
        let jump_end = self.emit(Op::Jump, &[PLACEHOLDER]);

        let else_start = self.current_len();
        self.change_operand(jump_falsy, else_start);
        match alternative {
            Some(alternative) => self.compile_block_value(alternative)?,
            None => {
                self.emit(Op::PushNull, &[]);
            }
        }
        let end = self.current_len();
        self.change_operand(jump_end, end);
        Ok(())
    }

    // Compiles a block in value position: the block's trailing expression
    // statement becomes the value, and a block that produces nothing yields
    // null, so both arms of an `if` push exactly one value.
    fn compile_block_value(&mut self, block: &Block) -> Result<(), ScriptError> {
        let before = self.current_len();
        self.compile_block(block)?;
        if self.current_len() == before {
            self.emit(Op::PushNull, &[]);
        } else if self.last_instruction_is(Op::Pop) {
            self.remove_last_pop();
        } else if !self.last_instruction_is(Op::ReturnValue)
            && !self.last_instruction_is(Op::Return)
        {
            self.emit(Op::PushNull, &[]);
        }
        Ok(())
    }

    fn compile_function(
        &mut self,
        name: Option<&str>,
        params: &[Ident],
        body: &Block,
    ) -> Result<(), ScriptError> {
        if params.len() > u8::MAX as usize {
            return Err(self.error("too many parameters"));
        }
        self.enter_scope();
        let saved_loops = std::mem::take(&mut self.loops);

        for param in params {
            self.symbols.define(&param.name);
        }
        let body_result = body
            .statements
            .iter()
            .try_for_each(|stmt| self.compile_statement(stmt));
        if let Err(err) = body_result {
            // Unwind the scope so the compiler stays usable after an error.
            self.leave_scope();
            self.symbols.leave_function();
            self.loops = saved_loops;
            return Err(err);
        }

        if self.last_instruction_is(Op::Pop) {
            self.replace_last_pop_with_return();
        }
        if !self.last_instruction_is(Op::ReturnValue) {
            self.emit(Op::Return, &[]);
        }

        let (instructions, source_map) = self.leave_scope();
        let (free_symbols, num_locals) = self.symbols.leave_function();
        self.loops = saved_loops;

        if free_symbols.len() > u8::MAX as usize {
            return Err(self.error("too many free variables"));
        }
        // Load each captured value in the enclosing context so MakeClosure
        // can copy them into the closure.
        for symbol in &free_symbols {
            match symbol.scope {
                SymbolScope::Local => self.emit(Op::LoadLocal, &[symbol.index as usize]),
                SymbolScope::Free => self.emit(Op::LoadFree, &[symbol.index as usize]),
                _ => return Err(self.error("cannot capture non-local variable")),
            };
        }

        let function = CompiledFunction {
            instructions,
            num_locals: num_locals as usize,
            num_parameters: params.len(),
            source_map,
            name: name.unwrap_or_default().to_string(),
        };
        let const_index = self.add_constant(Value::Function(Rc::new(function)))?;
        self.emit(Op::MakeClosure, &[const_index, free_symbols.len()]);
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::compile(message, self.last_line)
    }

    fn add_constant(&mut self, value: Value) -> Result<usize, ScriptError> {
        if self.constants.len() > u16::MAX as usize {
            return Err(self.error("constant pool overflow"));
        }
        self.constants.push(value);
        Ok(self.constants.len() - 1)
    }

    fn emit_load_constant(&mut self, value: Value) -> Result<(), ScriptError> {
        let index = self.add_constant(value)?;
        self.emit(Op::LoadConst, &[index]);
        Ok(())
    }

    fn emit_load(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Op::LoadGlobal, &[symbol.index as usize]),
            SymbolScope::Local => self.emit(Op::LoadLocal, &[symbol.index as usize]),
            SymbolScope::Builtin => self.emit(Op::LoadBuiltin, &[symbol.index as usize]),
            SymbolScope::Free => self.emit(Op::LoadFree, &[symbol.index as usize]),
        };
    }

    fn emit_store(&mut self, symbol: &Symbol) -> Result<(), ScriptError> {
        match symbol.scope {
            SymbolScope::Global => {
                self.emit(Op::StoreGlobal, &[symbol.index as usize]);
                Ok(())
            }
            SymbolScope::Local => {
                if symbol.index > u8::MAX as u16 {
                    return Err(self.error("too many locals in function"));
                }
                self.emit(Op::StoreLocal, &[symbol.index as usize]);
                Ok(())
            }
            _ => Err(self.error(format!(
                "cannot assign to {} {}",
                symbol.scope.describe(),
                symbol.name
            ))),
        }
    }

    fn emit(&mut self, op: Op, operands: &[usize]) -> usize {
        let instruction = opcode::make(op, operands);
        let position = self.add_instruction(&instruction);
        self.set_last_instruction(op, position);
        if self.last_line > 0 {
            let line = self.last_line;
            self.current_scope_mut().source_map.insert(position, line);
        }
        position
    }

    fn add_instruction(&mut self, instruction: &[u8]) -> usize {
        let scope = self.current_scope_mut();
        let position = scope.instructions.len();
        scope.instructions.extend_from_slice(instruction);
        position
    }

    fn set_last_instruction(&mut self, op: Op, position: usize) {
        let scope = self.current_scope_mut();
        scope.previous = scope.last;
        scope.last = EmittedInstruction {
            op: Some(op),
            position,
        };
    }

    fn last_instruction_is(&self, op: Op) -> bool {
        let scope = self.current_scope();
        !scope.instructions.is_empty() && scope.last.op == Some(op)
    }

    fn remove_last_pop(&mut self) {
        let scope = self.current_scope_mut();
        let position = scope.last.position;
        scope.instructions.truncate(position);
        scope.last = scope.previous;
        scope.source_map.remove(&position);
    }

    fn replace_last_pop_with_return(&mut self) {
        let scope = self.current_scope_mut();
        let position = scope.last.position;
        scope.instructions[position] = Op::ReturnValue as u8;
        scope.last.op = Some(Op::ReturnValue);
    }

    fn change_operand(&mut self, position: usize, operand: usize) {
        let scope = self.current_scope_mut();
        let op = Op::from_byte(scope.instructions[position])
            .expect("patch target is an emitted instruction");
        let instruction = opcode::make(op, &[operand]);
        scope.instructions[position..position + instruction.len()]
            .copy_from_slice(&instruction);
    }

    fn current_len(&self) -> usize {
        self.current_scope().instructions.len()
    }

    fn current_scope(&self) -> &CompilationScope {
        self.scopes.last().expect("at least the main scope exists")
    }

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("at least the main scope exists")
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        self.symbols.enter_function();
    }

    fn leave_scope(&mut self) -> (Vec<u8>, HashMap<usize, u32>) {
        let scope = self.scopes.pop().expect("unbalanced compilation scope");
        (scope.instructions, scope.source_map)
    }
}
