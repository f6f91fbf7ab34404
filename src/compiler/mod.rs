mod error;

pub use error::CompileError;

use std::rc::Rc;

use crate::ast::{Block, Expression, Operator, PostfixOperator, PrefixOperator, Program, Statement};
use crate::builtins::BUILTINS;
use crate::code::{Instructions, Opcode};
use crate::object::{CompiledFunction, Object};
use crate::symbol_table::{Scope, SymbolTable};

/// The instructions and constants pool produced by a completed compilation,
/// ready to hand to the VM.
#[derive(Debug, Clone, PartialEq)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Object>,
}

/// Tracks the jump targets a `break`/`continue` inside the active loop needs
/// patched once they become known. `continue_target` is `Some` immediately
/// for `while` (the condition check); `for` only learns it after the body
/// compiles, so its continues are recorded as placeholders instead.
struct LoopContext {
    continue_target: Option<usize>,
    continue_jumps: Vec<usize>,
    break_jumps: Vec<usize>,
}

struct CompilationScope {
    instructions: Instructions,
    last_instruction: Option<(Opcode, usize)>,
    previous_instruction: Option<(Opcode, usize)>,
    loop_stack: Vec<LoopContext>,
    symbol_table: SymbolTable,
}

/// Single-pass AST-to-bytecode compiler. Maintains a stack of
/// [`CompilationScope`]s, one per active function body plus the top level.
pub struct Compiler {
    scopes: Vec<CompilationScope>,
    constants: Vec<Object>,
}

impl Compiler {
    pub fn new() -> Self {
        let mut global_table = SymbolTable::new();
        for (index, builtin) in BUILTINS.iter().enumerate() {
            global_table.define_builtin(index, builtin.name);
        }
        Self {
            scopes: vec![CompilationScope {
                instructions: Instructions::new(),
                last_instruction: None,
                previous_instruction: None,
                loop_stack: Vec::new(),
                symbol_table: global_table,
            }],
            constants: Vec::new(),
        }
    }

    pub fn compile_program(program: &Program) -> Result<Bytecode, CompileError> {
        let mut compiler = Compiler::new();
        compiler.compile(program)?;
        Ok(compiler.bytecode())
    }

    pub fn compile(&mut self, program: &Program) -> Result<(), CompileError> {
        self.compile_statements(&program.0)
    }

    pub fn bytecode(self) -> Bytecode {
        let Compiler { scopes, constants } = self;
        let main_scope = scopes.into_iter().next().expect("top-level scope present");
        Bytecode {
            instructions: main_scope.instructions,
            constants,
        }
    }

    // -- scope management ---------------------------------------------

    fn current_scope(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("at least one scope")
    }

    fn current_len(&self) -> usize {
        self.scopes.last().expect("at least one scope").instructions.len()
    }

    fn enter_scope(&mut self) {
        let outer_table = std::mem::take(&mut self.current_scope().symbol_table);
        let new_table = SymbolTable::new_enclosed(Rc::new(outer_table));
        self.scopes.push(CompilationScope {
            instructions: Instructions::new(),
            last_instruction: None,
            previous_instruction: None,
            loop_stack: Vec::new(),
            symbol_table: new_table,
        });
    }

    /// Pops the current scope, restoring its symbol table's outer as the
    /// new current scope's table, and returns the finished instructions
    /// along with how many locals that scope defined.
    fn leave_scope(&mut self) -> (Instructions, usize) {
        let scope = self.scopes.pop().expect("scope to leave");
        let num_locals = scope.symbol_table.num_definitions;
        let outer_rc = scope
            .symbol_table
            .outer
            .expect("enclosed scope always has an outer table");
        let restored = Rc::try_unwrap(outer_rc).unwrap_or_else(|rc| (*rc).clone());
        self.current_scope().symbol_table = restored;
        (scope.instructions, num_locals)
    }

    // -- emission helpers ------------------------------------------------

    fn emit(&mut self, opcode: Opcode, operands: &[usize]) -> usize {
        let scope = self.current_scope();
        let pos = scope.instructions.add(opcode, operands);
        scope.previous_instruction = scope.last_instruction.take();
        scope.last_instruction = Some((opcode, pos));
        pos
    }

    fn remove_last(&mut self) {
        let scope = self.current_scope();
        if let Some((_, pos)) = scope.last_instruction {
            scope.instructions.truncate(pos);
            scope.last_instruction = scope.previous_instruction.take();
        }
    }

    fn last_instruction_is(&self, opcode: Opcode) -> bool {
        matches!(
            self.scopes.last().expect("at least one scope").last_instruction,
            Some((op, _)) if op == opcode
        )
    }

    fn change_operand(&mut self, pos: usize, operand: usize) {
        self.current_scope().instructions.change_operand(pos, operand);
    }

    fn add_constant(&mut self, obj: Object) -> usize {
        self.constants.push(obj);
        self.constants.len() - 1
    }

    // -- statements -------------------------------------------------------

    fn compile_statements(&mut self, stmts: &[Statement]) -> Result<(), CompileError> {
        for stmt in stmts {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    fn compile_block(&mut self, block: &Block) -> Result<(), CompileError> {
        self.compile_statements(&block.0)
    }

    fn compile_statement(&mut self, stmt: &Statement) -> Result<(), CompileError> {
        match stmt {
            Statement::Expression(expr) => {
                self.compile_expression(expr)?;
                self.emit(Opcode::Pop, &[]);
            }
            Statement::Let { name, value } => {
                let symbol = self.current_scope().symbol_table.define(name);
                self.compile_let_value(value, name)?;
                match symbol.scope {
                    Scope::Global => {
                        self.emit(Opcode::SetGlobal, &[symbol.index]);
                    }
                    Scope::Local => {
                        self.emit(Opcode::SetLocal, &[symbol.index]);
                    }
                    Scope::Builtin => unreachable!("let never defines into builtin scope"),
                }
            }
            Statement::Return(expr) => {
                self.compile_expression(expr)?;
                self.emit(Opcode::ReturnValue, &[]);
            }
            Statement::Break => {
                if self.scopes.last().unwrap().loop_stack.is_empty() {
                    return Err(CompileError::BreakOutsideLoop);
                }
                let pos = self.emit(Opcode::Jump, &[9999]);
                self.scopes
                    .last_mut()
                    .unwrap()
                    .loop_stack
                    .last_mut()
                    .unwrap()
                    .break_jumps
                    .push(pos);
            }
            Statement::Continue => {
                let target = match self.scopes.last().unwrap().loop_stack.last() {
                    Some(ctx) => ctx.continue_target,
                    None => return Err(CompileError::ContinueOutsideLoop),
                };
                match target {
                    Some(target) => {
                        self.emit(Opcode::Jump, &[target]);
                    }
                    None => {
                        let pos = self.emit(Opcode::Jump, &[9999]);
                        self.scopes
                            .last_mut()
                            .unwrap()
                            .loop_stack
                            .last_mut()
                            .unwrap()
                            .continue_jumps
                            .push(pos);
                    }
                }
            }
        }
        Ok(())
    }

    /// A `let`-bound function literal is named after its binding before
    /// compilation, so the body can refer to itself recursively via the
    /// (already-reserved) global/local slot.
    fn compile_let_value(&mut self, value: &Expression, let_name: &str) -> Result<(), CompileError> {
        if let Expression::FunctionLiteral {
            parameters,
            body,
            name,
        } = value
        {
            let effective_name = name.clone().unwrap_or_else(|| let_name.to_string());
            self.compile_function_literal(parameters, body, Some(effective_name))
        } else {
            self.compile_expression(value)
        }
    }

    // -- expressions --------------------------------------------------------

    fn compile_expression(&mut self, expr: &Expression) -> Result<(), CompileError> {
        match expr {
            Expression::Null => {
                self.emit(Opcode::Null, &[]);
            }
            Expression::Integer(value) => {
                let idx = self.add_constant(Object::Integer(*value));
                self.emit(Opcode::Constant, &[idx]);
            }
            Expression::Boolean(value) => {
                self.emit(if *value { Opcode::True } else { Opcode::False }, &[]);
            }
            Expression::StringLiteral(value) => {
                let idx = self.add_constant(Object::string(value.clone()));
                self.emit(Opcode::Constant, &[idx]);
            }
            Expression::Identifier(name) => self.compile_identifier(name),
            Expression::ArrayLiteral(elements) => {
                for el in elements {
                    self.compile_expression(el)?;
                }
                self.emit(Opcode::Array, &[elements.len()]);
            }
            Expression::Prefix { operator, right } => {
                self.compile_expression(right)?;
                match operator {
                    PrefixOperator::Bang => self.emit(Opcode::Bang, &[]),
                    PrefixOperator::Minus => self.emit(Opcode::Minus, &[]),
                };
            }
            Expression::Infix {
                left,
                operator,
                right,
            } => match operator {
                Operator::And => self.compile_and(left, right)?,
                Operator::Or => self.compile_or(left, right)?,
                _ => {
                    self.compile_expression(left)?;
                    self.compile_expression(right)?;
                    let opcode = opcode_for_operator(*operator)
                        .ok_or(CompileError::UnknownOperator(*operator))?;
                    self.emit(opcode, &[]);
                }
            },
            Expression::Postfix { left, operator } => {
                let op = match operator {
                    PostfixOperator::Increment => Operator::Plus,
                    PostfixOperator::Decrement => Operator::Minus,
                };
                let delta = Expression::Infix {
                    left: left.clone(),
                    operator: op,
                    right: Box::new(Expression::Integer(1)),
                };
                self.compile_assign(left, &delta)?;
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => self.compile_if(condition, consequence, alternative.as_ref())?,
            Expression::While { condition, body } => self.compile_while(condition, body)?,
            Expression::For {
                init,
                condition,
                post,
                body,
            } => self.compile_for(init.as_deref(), condition.as_deref(), post.as_deref(), body)?,
            Expression::FunctionLiteral {
                parameters,
                body,
                name,
            } => self.compile_function_literal(parameters, body, name.clone())?,
            Expression::Call {
                function,
                arguments,
            } => {
                self.compile_expression(function)?;
                for arg in arguments {
                    self.compile_expression(arg)?;
                }
                self.emit(Opcode::Call, &[arguments.len()]);
            }
            Expression::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Opcode::Index, &[]);
            }
            Expression::Slice { left, start, end } => {
                self.compile_expression(left)?;
                match start {
                    Some(expr) => self.compile_expression(expr)?,
                    None => {
                        let idx = self.add_constant(Object::Integer(0));
                        self.emit(Opcode::Constant, &[idx]);
                    }
                }
                match end {
                    Some(expr) => self.compile_expression(expr)?,
                    None => {
                        // Negative sentinel: "through the end", read by the VM.
                        let idx = self.add_constant(Object::Integer(-1));
                        self.emit(Opcode::Constant, &[idx]);
                    }
                }
                self.emit(Opcode::Slice, &[]);
            }
            Expression::Assign { target, value } => self.compile_assign(target, value)?,
        }
        Ok(())
    }

    fn compile_identifier(&mut self, name: &str) {
        let symbol = self.scopes.last().unwrap().symbol_table.resolve(name);
        match symbol {
            // Deliberately silent: an unresolved identifier compiles to
            // `Null` rather than a compile error (the evaluator backend
            // treats this case as an error instead; see DESIGN.md).
            None => {
                self.emit(Opcode::Null, &[]);
            }
            Some(sym) => match sym.scope {
                Scope::Global => {
                    self.emit(Opcode::GetGlobal, &[sym.index]);
                }
                Scope::Local => {
                    self.emit(Opcode::GetLocal, &[sym.index]);
                }
                Scope::Builtin => {
                    self.emit(Opcode::GetBuiltin, &[sym.index]);
                }
            },
        };
    }

    /// Identifier and index assignment targets both leave the assigned
    /// value on the stack: `SetGlobal`/`SetLocal` consume it like `let`
    /// does, so the value is read back with the matching `Get*`; `SetIndex`
    /// pops all three operands and pushes the written value itself.
    fn compile_assign(&mut self, target: &Expression, value: &Expression) -> Result<(), CompileError> {
        match target {
            Expression::Identifier(name) => {
                self.compile_expression(value)?;
                let symbol = self
                    .scopes
                    .last()
                    .unwrap()
                    .symbol_table
                    .resolve(name)
                    .unwrap_or_else(|| self.scopes.last_mut().unwrap().symbol_table.define(name));
                match symbol.scope {
                    Scope::Global => {
                        self.emit(Opcode::SetGlobal, &[symbol.index]);
                        self.emit(Opcode::GetGlobal, &[symbol.index]);
                    }
                    Scope::Local => {
                        self.emit(Opcode::SetLocal, &[symbol.index]);
                        self.emit(Opcode::GetLocal, &[symbol.index]);
                    }
                    Scope::Builtin => {
                        return Err(CompileError::UnknownExpressionType(
                            "cannot assign to a builtin".to_string(),
                        ))
                    }
                }
            }
            Expression::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.compile_expression(value)?;
                self.emit(Opcode::SetIndex, &[]);
            }
            _ => {
                return Err(CompileError::UnknownExpressionType(
                    "invalid assignment target".to_string(),
                ))
            }
        }
        Ok(())
    }

    fn compile_and(&mut self, left: &Expression, right: &Expression) -> Result<(), CompileError> {
        self.compile_expression(left)?;
        let jump_not_true_pos = self.emit(Opcode::JumpNotTrue, &[9999]);
        self.compile_expression(right)?;
        self.emit(Opcode::Bang, &[]);
        self.emit(Opcode::Bang, &[]);
        let jump_end_pos = self.emit(Opcode::Jump, &[9999]);
        let false_branch = self.current_len();
        self.change_operand(jump_not_true_pos, false_branch);
        self.emit(Opcode::False, &[]);
        let end = self.current_len();
        self.change_operand(jump_end_pos, end);
        Ok(())
    }

    fn compile_or(&mut self, left: &Expression, right: &Expression) -> Result<(), CompileError> {
        self.compile_expression(left)?;
        let jump_not_true_pos = self.emit(Opcode::JumpNotTrue, &[9999]);
        let jump_true_pos = self.emit(Opcode::Jump, &[9999]);
        let check_right = self.current_len();
        self.change_operand(jump_not_true_pos, check_right);
        self.compile_expression(right)?;
        self.emit(Opcode::Bang, &[]);
        self.emit(Opcode::Bang, &[]);
        let jump_end_pos = self.emit(Opcode::Jump, &[9999]);
        let true_branch = self.current_len();
        self.change_operand(jump_true_pos, true_branch);
        self.emit(Opcode::True, &[]);
        let end = self.current_len();
        self.change_operand(jump_end_pos, end);
        Ok(())
    }

    fn compile_if(
        &mut self,
        condition: &Expression,
        consequence: &Block,
        alternative: Option<&Block>,
    ) -> Result<(), CompileError> {
        self.compile_expression(condition)?;
        let jump_not_true_pos = self.emit(Opcode::JumpNotTrue, &[9999]);
        self.compile_block(consequence)?;
        if self.last_instruction_is(Opcode::Pop) {
            self.remove_last();
        }
        let jump_pos = self.emit(Opcode::Jump, &[9999]);
        let after_consequence = self.current_len();
        self.change_operand(jump_not_true_pos, after_consequence);

        match alternative {
            Some(alt) => {
                self.compile_block(alt)?;
                if self.last_instruction_is(Opcode::Pop) {
                    self.remove_last();
                }
            }
            None => {
                self.emit(Opcode::Null, &[]);
            }
        }
        let after_alternative = self.current_len();
        self.change_operand(jump_pos, after_alternative);
        Ok(())
    }

    fn compile_while(&mut self, condition: &Expression, body: &Block) -> Result<(), CompileError> {
        let loop_start = self.current_len();
        self.compile_expression(condition)?;
        let jump_not_true_pos = self.emit(Opcode::JumpNotTrue, &[9999]);

        self.current_scope().loop_stack.push(LoopContext {
            continue_target: Some(loop_start),
            continue_jumps: Vec::new(),
            break_jumps: Vec::new(),
        });
        self.compile_block(body)?;
        self.emit(Opcode::Jump, &[loop_start]);
        let loop_end = self.current_len();
        self.change_operand(jump_not_true_pos, loop_end);

        let ctx = self.current_scope().loop_stack.pop().unwrap();
        for pos in ctx.break_jumps {
            self.change_operand(pos, loop_end);
        }
        self.emit(Opcode::Null, &[]);
        Ok(())
    }

    fn compile_for(
        &mut self,
        init: Option<&Statement>,
        condition: Option<&Expression>,
        post: Option<&Statement>,
        body: &Block,
    ) -> Result<(), CompileError> {
        if let Some(init) = init {
            self.compile_statement(init)?;
        }
        let cond_pos = self.current_len();
        match condition {
            Some(cond) => self.compile_expression(cond)?,
            None => {
                self.emit(Opcode::True, &[]);
            }
        }
        let jump_not_true_pos = self.emit(Opcode::JumpNotTrue, &[9999]);

        self.current_scope().loop_stack.push(LoopContext {
            continue_target: None,
            continue_jumps: Vec::new(),
            break_jumps: Vec::new(),
        });
        self.compile_block(body)?;

        let continue_target = self.current_len();
        let continue_jumps = self.current_scope().loop_stack.last().unwrap().continue_jumps.clone();
        for pos in continue_jumps {
            self.change_operand(pos, continue_target);
        }

        if let Some(post) = post {
            self.compile_statement(post)?;
        }
        self.emit(Opcode::Jump, &[cond_pos]);
        let loop_end = self.current_len();
        self.change_operand(jump_not_true_pos, loop_end);

        let ctx = self.current_scope().loop_stack.pop().unwrap();
        for pos in ctx.break_jumps {
            self.change_operand(pos, loop_end);
        }
        self.emit(Opcode::Null, &[]);
        Ok(())
    }

    fn compile_function_literal(
        &mut self,
        parameters: &[String],
        body: &Block,
        name: Option<String>,
    ) -> Result<(), CompileError> {
        self.enter_scope();
        for param in parameters {
            self.current_scope().symbol_table.define(param);
        }
        self.compile_block(body)?;
        if self.last_instruction_is(Opcode::Pop) {
            self.replace_last_pop_with_return();
        }
        if !self.last_instruction_is(Opcode::ReturnValue) {
            self.emit(Opcode::Return, &[]);
        }
        let (instructions, num_locals) = self.leave_scope();

        let compiled = CompiledFunction {
            instructions,
            num_locals,
            num_parameters: parameters.len(),
            name,
        };
        let idx = self.add_constant(Object::compiled_function(compiled));
        self.emit(Opcode::Constant, &[idx]);
        Ok(())
    }

    fn replace_last_pop_with_return(&mut self) {
        let scope = self.current_scope();
        let pos = scope.last_instruction.expect("a Pop to replace").1;
        let mut replacement = Instructions::new();
        replacement.add(Opcode::ReturnValue, &[]);
        scope.instructions.replace(pos, &replacement.0);
        scope.last_instruction = Some((Opcode::ReturnValue, pos));
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

fn opcode_for_operator(op: Operator) -> Option<Opcode> {
    use Operator::*;
    Some(match op {
        Plus => Opcode::Add,
        Minus => Opcode::Sub,
        Asterisk => Opcode::Mul,
        Slash => Opcode::Div,
        Percent => Opcode::Mod,
        Eq => Opcode::Equal,
        NotEq => Opcode::NotEqual,
        Lt => Opcode::LessThan,
        Lte => Opcode::LessEqual,
        Gt => Opcode::GreaterThan,
        Gte => Opcode::GreaterEqual,
        And | Or => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn compile(input: &str) -> Bytecode {
        let (program, errors) = Parser::parse(input);
        assert!(errors.is_empty(), "parse errors: {errors:?}");
        Compiler::compile_program(&program).expect("compiles")
    }

    #[test]
    fn integer_arithmetic_emits_constants_and_add() {
        let bytecode = compile("1 + 2;");
        assert_eq!(bytecode.constants, vec![Object::Integer(1), Object::Integer(2)]);
        let expected = "0000 Constant 0\n0003 Constant 1\n0006 Add\n0007 Pop\n";
        assert_eq!(bytecode.instructions.disassemble(), expected);
    }

    #[test]
    fn if_without_else_emits_null_alternative() {
        let bytecode = compile("if (true) { 10 }; 3333;");
        let dis = bytecode.instructions.disassemble();
        assert!(dis.contains("JumpNotTrue"));
        assert!(dis.contains("Null"));
    }

    #[test]
    fn break_outside_loop_is_a_compile_error() {
        let (program, errors) = Parser::parse("break;");
        assert!(errors.is_empty());
        assert_eq!(
            Compiler::compile_program(&program),
            Err(CompileError::BreakOutsideLoop)
        );
    }

    #[test]
    fn for_loop_break_patches_to_loop_end() {
        let bytecode = compile("for (let i = 0; i < 5; i = i + 1) { break; }");
        let dis = bytecode.instructions.disassemble();
        assert!(dis.contains("Jump"));
    }

    #[test]
    fn recursive_function_resolves_its_own_name() {
        let bytecode = compile("let fib = fn(x) { fib(x); };");
        assert_eq!(bytecode.constants.len(), 1);
        match &bytecode.constants[0] {
            Object::Heap(cell) => {
                if let crate::object::HeapData::CompiledFunction(f) = &*cell.data.borrow() {
                    assert!(f.instructions.disassemble().contains("GetGlobal"));
                } else {
                    panic!("expected compiled function constant");
                }
            }
            other => panic!("expected heap object, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_identifier_compiles_to_null() {
        let bytecode = compile("doesNotExist;");
        let expected = "0000 Null\n0001 Pop\n";
        assert_eq!(bytecode.instructions.disassemble(), expected);
    }
}
