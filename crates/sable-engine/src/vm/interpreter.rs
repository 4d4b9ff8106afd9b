// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The bytecode interpreter.

use crate::ast::{BinaryOperator, ComparisonOperator};
use crate::compiler::{Bytecode, Instruction, OpCode, Operand};
use crate::error::ScriptError;
use crate::location::Location;
use crate::runtime::value::{OperationError, Value};
use tracing::warn;

/// The virtual machine.
///
/// A `VM` holds no state between executions; each call to
/// [`VM::execute`] starts from fresh locals and a fresh budget counter.
#[derive(Debug, Default)]
pub struct VM {
    /// The value stack
    stack: Vec<Value>,
    /// Local variable slots
    locals: Vec<Value>,
    /// Instruction pointer
    ip: usize,
}

impl VM {
    /// Creates a new VM.
    pub fn new() -> Self {
        Self {
            stack: Vec::with_capacity(64),
            locals: Vec::new(),
            ip: 0,
        }
    }

    /// Executes bytecode with `args` bound to the first slots.
    pub fn execute(&mut self, bytecode: &Bytecode, args: &[Value]) -> Result<Value, ScriptError> {
        if args.len() > bytecode.slot_count {
            return Err(ScriptError::InvalidArguments(format!(
                "expected at most {} arguments, got {}",
                bytecode.slot_count,
                args.len()
            )));
        }

        self.ip = 0;
        self.stack.clear();
        self.locals.clear();
        self.locals.resize(bytecode.slot_count, Value::Null);
        self.locals[..args.len()].clone_from_slice(args);

        while let Some(instruction) = bytecode.instructions.get(self.ip) {
            let at = self.ip;
            self.ip += 1;

            match instruction.opcode {
                OpCode::LoadConst => {
                    let index = constant_index(instruction, at)?;
                    let value = bytecode
                        .constants
                        .get(index)
                        .cloned()
                        .ok_or(invalid(at, "constant index out of range"))?;
                    self.stack.push(value);
                }
                OpCode::LoadNull => self.stack.push(Value::Null),
                OpCode::LoadTrue => self.stack.push(Value::Boolean(true)),
                OpCode::LoadFalse => self.stack.push(Value::Boolean(false)),
                OpCode::Pop => {
                    self.pop()?;
                }
                OpCode::Dup => {
                    let top = self.stack.last().cloned().ok_or(ScriptError::StackUnderflow)?;
                    self.stack.push(top);
                }

                OpCode::Add => self.binary(BinaryOperator::Add, bytecode, at)?,
                OpCode::Sub => self.binary(BinaryOperator::Subtract, bytecode, at)?,
                OpCode::Mul => self.binary(BinaryOperator::Multiply, bytecode, at)?,
                OpCode::Div => self.binary(BinaryOperator::Divide, bytecode, at)?,
                OpCode::Mod => self.binary(BinaryOperator::Remainder, bytecode, at)?,
                OpCode::Neg => {
                    let value = match self.pop()? {
                        Value::Int(n) => Value::Int(n.wrapping_neg()),
                        Value::Double(n) => Value::Double(-n),
                        _ => return Err(operation_error(OperationError::InvalidOperands, bytecode, at)),
                    };
                    self.stack.push(value);
                }
                OpCode::IntToDouble => {
                    let value = match self.pop()? {
                        Value::Int(n) => Value::Double(n as f64),
                        value @ Value::Double(_) => value,
                        _ => return Err(operation_error(OperationError::InvalidOperands, bytecode, at)),
                    };
                    self.stack.push(value);
                }

                OpCode::Eq => self.compare(ComparisonOperator::Equal, bytecode, at)?,
                OpCode::Ne => self.compare(ComparisonOperator::NotEqual, bytecode, at)?,
                OpCode::Lt => self.compare(ComparisonOperator::Less, bytecode, at)?,
                OpCode::Le => self.compare(ComparisonOperator::LessEqual, bytecode, at)?,
                OpCode::Gt => self.compare(ComparisonOperator::Greater, bytecode, at)?,
                OpCode::Ge => self.compare(ComparisonOperator::GreaterEqual, bytecode, at)?,
                OpCode::Not => {
                    let value = self.pop_bool(bytecode, at)?;
                    self.stack.push(Value::Boolean(!value));
                }

                OpCode::LoadLocal => {
                    let slot = local_index(instruction, at)?;
                    let value = self
                        .locals
                        .get(slot)
                        .cloned()
                        .ok_or(invalid(at, "local slot out of range"))?;
                    self.stack.push(value);
                }
                OpCode::StoreLocal => {
                    let slot = local_index(instruction, at)?;
                    let value = self.pop()?;
                    match self.locals.get_mut(slot) {
                        Some(local) => *local = value,
                        None => return Err(invalid(at, "local slot out of range")),
                    }
                }

                OpCode::Jump => self.ip = jump_target(instruction, at)?,
                OpCode::JumpIfFalse => {
                    if !self.pop_bool(bytecode, at)? {
                        self.ip = jump_target(instruction, at)?;
                    }
                }
                OpCode::JumpIfTrue => {
                    if self.pop_bool(bytecode, at)? {
                        self.ip = jump_target(instruction, at)?;
                    }
                }

                OpCode::JumpIfLt => self.compare_jump(ComparisonOperator::Less, true, instruction, bytecode, at)?,
                OpCode::JumpIfLe => self.compare_jump(ComparisonOperator::LessEqual, true, instruction, bytecode, at)?,
                OpCode::JumpIfGt => self.compare_jump(ComparisonOperator::Greater, true, instruction, bytecode, at)?,
                OpCode::JumpIfGe => self.compare_jump(ComparisonOperator::GreaterEqual, true, instruction, bytecode, at)?,
                OpCode::JumpIfEq => self.compare_jump(ComparisonOperator::Equal, true, instruction, bytecode, at)?,
                OpCode::JumpIfNe => self.compare_jump(ComparisonOperator::NotEqual, true, instruction, bytecode, at)?,
                OpCode::JumpUnlessLt => self.compare_jump(ComparisonOperator::Less, false, instruction, bytecode, at)?,
                OpCode::JumpUnlessLe => self.compare_jump(ComparisonOperator::LessEqual, false, instruction, bytecode, at)?,
                OpCode::JumpUnlessGt => self.compare_jump(ComparisonOperator::Greater, false, instruction, bytecode, at)?,
                OpCode::JumpUnlessGe => self.compare_jump(ComparisonOperator::GreaterEqual, false, instruction, bytecode, at)?,
                OpCode::JumpUnlessEq => self.compare_jump(ComparisonOperator::Equal, false, instruction, bytecode, at)?,
                OpCode::JumpUnlessNe => self.compare_jump(ComparisonOperator::NotEqual, false, instruction, bytecode, at)?,

                OpCode::LoopBudget => {
                    let Some(Operand::Budget { slot, weight }) = instruction.operand else {
                        return Err(invalid(at, "expected a budget operand"));
                    };
                    let counter = self
                        .locals
                        .get_mut(slot as usize)
                        .ok_or(invalid(at, "budget slot out of range"))?;
                    let remaining = counter
                        .as_int()
                        .unwrap_or(0)
                        .saturating_sub(i32::try_from(weight).unwrap_or(i32::MAX));
                    *counter = Value::Int(remaining);

                    if remaining <= 0 {
                        let location = location_of(bytecode, at);
                        warn!(
                            limit = bytecode.max_loop_counter,
                            line = location.line,
                            "loop budget exceeded"
                        );
                        return Err(ScriptError::BudgetExceeded {
                            limit: bytecode.max_loop_counter,
                            location,
                        });
                    }
                }

                OpCode::Return => return self.pop(),
                OpCode::Throw => {
                    let value = self.pop()?;
                    return Err(ScriptError::Thrown {
                        value,
                        location: location_of(bytecode, at),
                    });
                }
            }
        }

        Ok(Value::Null)
    }

    fn pop(&mut self) -> Result<Value, ScriptError> {
        self.stack.pop().ok_or(ScriptError::StackUnderflow)
    }

    fn pop_bool(&mut self, bytecode: &Bytecode, at: usize) -> Result<bool, ScriptError> {
        self.pop()?
            .as_bool()
            .ok_or_else(|| operation_error(OperationError::InvalidOperands, bytecode, at))
    }

    fn pop_pair(&mut self) -> Result<(Value, Value), ScriptError> {
        let right = self.pop()?;
        let left = self.pop()?;
        Ok((left, right))
    }

    fn binary(&mut self, operator: BinaryOperator, bytecode: &Bytecode, at: usize) -> Result<(), ScriptError> {
        let (left, right) = self.pop_pair()?;
        let value = Value::binary(operator, &left, &right)
            .map_err(|err| operation_error(err, bytecode, at))?;
        self.stack.push(value);
        Ok(())
    }

    fn compare(&mut self, operator: ComparisonOperator, bytecode: &Bytecode, at: usize) -> Result<(), ScriptError> {
        let (left, right) = self.pop_pair()?;
        let result = Value::compare(operator, &left, &right)
            .map_err(|err| operation_error(err, bytecode, at))?;
        self.stack.push(Value::Boolean(result));
        Ok(())
    }

    fn compare_jump(
        &mut self,
        operator: ComparisonOperator,
        jump_when: bool,
        instruction: &Instruction,
        bytecode: &Bytecode,
        at: usize,
    ) -> Result<(), ScriptError> {
        let (left, right) = self.pop_pair()?;
        let result = Value::compare(operator, &left, &right)
            .map_err(|err| operation_error(err, bytecode, at))?;
        if result == jump_when {
            self.ip = jump_target(instruction, at)?;
        }
        Ok(())
    }
}

fn invalid(ip: usize, message: &'static str) -> ScriptError {
    ScriptError::InvalidBytecode { ip, message }
}

fn constant_index(instruction: &Instruction, at: usize) -> Result<usize, ScriptError> {
    match instruction.operand {
        Some(Operand::Constant(index)) => Ok(index as usize),
        _ => Err(invalid(at, "expected a constant operand")),
    }
}

fn local_index(instruction: &Instruction, at: usize) -> Result<usize, ScriptError> {
    match instruction.operand {
        Some(Operand::Local(slot)) => Ok(slot as usize),
        _ => Err(invalid(at, "expected a local operand")),
    }
}

fn jump_target(instruction: &Instruction, at: usize) -> Result<usize, ScriptError> {
    match instruction.operand {
        Some(Operand::Jump(target)) => Ok(target),
        _ => Err(invalid(at, "expected a jump operand")),
    }
}

fn location_of(bytecode: &Bytecode, at: usize) -> Location {
    bytecode.location_at(at).unwrap_or_default()
}

fn operation_error(err: OperationError, bytecode: &Bytecode, at: usize) -> ScriptError {
    ScriptError::Arithmetic {
        message: err.to_string(),
        location: location_of(bytecode, at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Engine, Error};

    fn eval(src: &str) -> Result<Value, Error> {
        Engine::default().eval(src)
    }

    fn eval_ok(src: &str) -> Value {
        eval(src).expect("Evaluation should succeed")
    }

    fn eval_script_err(src: &str) -> ScriptError {
        match eval(src) {
            Err(Error::Script(err)) => err,
            other => panic!("expected a script error, got {:?}", other),
        }
    }

    #[test]
    fn test_vm_new() {
        let vm = VM::new();
        assert!(vm.stack.is_empty());
        assert!(vm.locals.is_empty());
    }

    #[test]
    fn test_eval_arithmetic() {
        assert_eq!(eval_ok("int x = 6; x * 7"), Value::Int(42));
        assert_eq!(eval_ok("int x = 7; x / 2"), Value::Int(3));
        assert_eq!(eval_ok("int x = 7; x % 4"), Value::Int(3));
        assert_eq!(eval_ok("double d = 1.5; d * 2"), Value::Double(3.0));
        assert_eq!(eval_ok("int x = 5; -x"), Value::Int(-5));
    }

    #[test]
    fn test_eval_empty_script_is_null() {
        assert_eq!(eval_ok(""), Value::Null);
        assert_eq!(eval_ok("int x = 1;"), Value::Null);
    }

    #[test]
    fn test_eval_while_loop() {
        assert_eq!(eval_ok("int x = 0; while (x < 10) { x++; } return x;"), Value::Int(10));
    }

    #[test]
    fn test_eval_do_while_runs_once() {
        assert_eq!(eval_ok("int x = 10; do { x++; } while (x < 5); return x;"), Value::Int(11));
    }

    #[test]
    fn test_eval_for_with_continue() {
        let src = "int s = 0; for (int i = 0; i < 10; i++) { if (i % 2 == 0) { continue; } s += i; } return s;";
        assert_eq!(eval_ok(src), Value::Int(25));
    }

    #[test]
    fn test_eval_break() {
        let src = "int x = 0; while (true) { x += 3; if (x > 10) { break; } } return x;";
        assert_eq!(eval_ok(src), Value::Int(12));
    }

    #[test]
    fn test_eval_short_circuit() {
        // The right operand would assign if evaluated
        let src = "int x = 0; boolean b = x > 0 && (x = 5) > 0; return x;";
        assert_eq!(eval_ok(src), Value::Int(0));
        let src = "int x = 0; boolean b = x == 0 || (x = 5) > 0; return x;";
        assert_eq!(eval_ok(src), Value::Int(0));
    }

    #[test]
    fn test_eval_nan_conditions() {
        let src = "double n = 0.0 / 0.0; int hits = 0; if (n < 1) { hits++; } if (!(n >= 1)) { hits++; } return hits;";
        assert_eq!(eval_ok(src), Value::Int(1));
    }

    #[test]
    fn test_eval_string_concatenation() {
        assert_eq!(eval_ok("String s = 'n='; int n = 3; s + n"), Value::from("n=3"));
    }

    #[test]
    fn test_eval_updates() {
        assert_eq!(eval_ok("int x = 1; int y = x++; return y * 10 + x;"), Value::Int(12));
        assert_eq!(eval_ok("int x = 1; int y = ++x; return y * 10 + x;"), Value::Int(22));
        assert_eq!(eval_ok("double d = 0.5; d--; return d;"), Value::Double(-0.5));
    }

    #[test]
    fn test_division_by_zero() {
        let err = eval_script_err("int x = 0;\nint y = 1 / x;\nreturn y;");
        let ScriptError::Arithmetic { location, .. } = err else {
            panic!("expected an arithmetic error");
        };
        assert_eq!(location.line, 2);
    }

    #[test]
    fn test_throw() {
        let err = eval_script_err("int x = 1; if (x > 0) { throw 'boom'; } return x;");
        assert!(matches!(err, ScriptError::Thrown { value: Value::String(ref s), .. } if s == "boom"));
        assert!(!err.is_budget_exceeded());
    }

    #[test]
    fn test_budget_exceeded() {
        let err = eval_script_err("int x = 0;\nwhile (x >= 0) {\n  x = 1;\n}\nreturn x;");
        assert!(err.is_budget_exceeded());
        let ScriptError::BudgetExceeded { limit, location } = err else {
            unreachable!();
        };
        assert_eq!(limit, 1_000_000);
        assert_eq!(location.line, 2);
    }

    #[test]
    fn test_invalid_arguments() {
        let mut vm = VM::new();
        let bytecode = Bytecode::new();
        let err = vm.execute(&bytecode, &[Value::Int(1)]).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidArguments(_)));
    }

    #[test]
    fn test_malformed_bytecode_is_reported() {
        let mut vm = VM::new();
        let mut bytecode = Bytecode::new();
        bytecode.emit(Instruction::with_operand(OpCode::LoadConst, Operand::Constant(5)));
        bytecode.emit(Instruction::simple(OpCode::Return));
        let err = vm.execute(&bytecode, &[]).unwrap_err();
        assert_eq!(
            err,
            ScriptError::InvalidBytecode {
                ip: 0,
                message: "constant index out of range"
            }
        );

        let mut bytecode = Bytecode::new();
        bytecode.emit(Instruction::simple(OpCode::LoadTrue));
        bytecode.emit(Instruction::with_operand(OpCode::StoreLocal, Operand::Local(3)));
        let err = vm.execute(&bytecode, &[]).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidBytecode { ip: 1, .. }));

        let mut bytecode = Bytecode::new();
        bytecode.emit(Instruction::simple(OpCode::Jump));
        let err = vm.execute(&bytecode, &[]).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidBytecode { ip: 0, .. }));

        let mut bytecode = Bytecode::new();
        bytecode.emit(Instruction::simple(OpCode::Pop));
        assert_eq!(vm.execute(&bytecode, &[]).unwrap_err(), ScriptError::StackUnderflow);
    }
}
