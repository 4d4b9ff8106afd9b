// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression generation and the condition binder.
//!
//! Expressions are generated in one of three contexts:
//!
//! - value: leaves exactly one value on the stack;
//! - effect: leaves nothing (expression statements, `for` afterthoughts);
//! - branch: leaves nothing and jumps to a label depending on the truth of a
//!   boolean expression, without ever materializing the boolean.

use super::CodeGenerator;
use crate::analysis::tree::{ExpressionKind, TypedExpression};
use crate::ast::{BinaryOperator, ComparisonOperator, LogicalOperator, UpdateOperator};
use crate::compiler::bytecode::OpCode;
use crate::compiler::emitter::Label;
use crate::error::CompileError;
use crate::runtime::value::Value;
use crate::scope::Slot;
use crate::types::Type;

impl CodeGenerator {
    /// Generates `expr` in value context.
    pub(crate) fn generate_expression(&mut self, expr: &TypedExpression) -> Result<(), CompileError> {
        match &expr.kind {
            ExpressionKind::Constant(value) => self.emitter.load_constant(value.clone()),
            ExpressionKind::Load(slot) => self.emitter.local(OpCode::LoadLocal, *slot),
            ExpressionKind::Cast(operand) => {
                self.generate_expression(operand)?;
                self.emitter.emit_simple(OpCode::IntToDouble);
            }
            ExpressionKind::Negate(operand) => {
                self.generate_expression(operand)?;
                self.emitter.emit_simple(OpCode::Neg);
            }
            ExpressionKind::Not(operand) => {
                self.generate_expression(operand)?;
                self.emitter.emit_simple(OpCode::Not);
            }
            ExpressionKind::Arithmetic {
                operator,
                left,
                right,
            } => {
                self.generate_expression(left)?;
                self.generate_expression(right)?;
                self.emitter.emit_simple(arithmetic_opcode(*operator));
            }
            ExpressionKind::Compare {
                operator,
                left,
                right,
            } => {
                self.generate_expression(left)?;
                self.generate_expression(right)?;
                self.emitter.emit_simple(compare_opcode(*operator));
            }
            ExpressionKind::Logical { .. } => {
                // Materialize through the binder to keep short-circuiting
                let false_label = self.emitter.new_label();
                let end = self.emitter.new_label();
                self.branch(expr, false_label, false)?;
                self.emitter.emit_simple(OpCode::LoadTrue);
                self.emitter.jump(OpCode::Jump, end);
                self.emitter.mark(false_label);
                self.emitter.emit_simple(OpCode::LoadFalse);
                self.emitter.mark(end);
            }
            ExpressionKind::Assign { slot, value } => {
                self.generate_expression(value)?;
                self.emitter.emit_simple(OpCode::Dup);
                self.emitter.local(OpCode::StoreLocal, *slot);
            }
            ExpressionKind::Update {
                slot,
                operator,
                prefix,
            } => {
                self.emitter.local(OpCode::LoadLocal, *slot);
                if !prefix {
                    self.emitter.emit_simple(OpCode::Dup);
                }
                self.step(*operator, expr.ty);
                if *prefix {
                    self.emitter.emit_simple(OpCode::Dup);
                }
                self.emitter.local(OpCode::StoreLocal, *slot);
            }
        }

        Ok(())
    }

    /// Generates `expr` for its side effect only.
    pub(crate) fn generate_effect(&mut self, expr: &TypedExpression) -> Result<(), CompileError> {
        match &expr.kind {
            ExpressionKind::Assign { slot, value } => {
                self.generate_expression(value)?;
                self.emitter.local(OpCode::StoreLocal, *slot);
            }
            ExpressionKind::Update { slot, operator, .. } => {
                self.update_in_place(*slot, *operator, expr.ty);
            }
            _ => {
                self.generate_expression(expr)?;
                self.emitter.emit_simple(OpCode::Pop);
            }
        }
        Ok(())
    }

    /// Emits a jump to `target` taken when `expr` evaluates to `jump_when`;
    /// control falls through otherwise.
    pub(crate) fn branch(
        &mut self,
        expr: &TypedExpression,
        target: Label,
        jump_when: bool,
    ) -> Result<(), CompileError> {
        match &expr.kind {
            ExpressionKind::Constant(value) => {
                if value.as_bool() == Some(jump_when) {
                    self.emitter.jump(OpCode::Jump, target);
                }
            }
            ExpressionKind::Not(operand) => self.branch(operand, target, !jump_when)?,
            ExpressionKind::Compare {
                operator,
                left,
                right,
            } => {
                self.generate_expression(left)?;
                self.generate_expression(right)?;
                let opcode = if jump_when {
                    jump_if_opcode(*operator)
                } else {
                    jump_unless_opcode(*operator)
                };
                self.emitter.jump(opcode, target);
            }
            ExpressionKind::Logical {
                operator,
                left,
                right,
            } => match (operator, jump_when) {
                (LogicalOperator::And, false) | (LogicalOperator::Or, true) => {
                    self.branch(left, target, jump_when)?;
                    self.branch(right, target, jump_when)?;
                }
                (LogicalOperator::And, true) | (LogicalOperator::Or, false) => {
                    // The left operand alone decides against the jump
                    let skip = self.emitter.new_label();
                    self.branch(left, skip, !jump_when)?;
                    self.branch(right, target, jump_when)?;
                    self.emitter.mark(skip);
                }
            },
            _ => {
                self.generate_expression(expr)?;
                let opcode = if jump_when {
                    OpCode::JumpIfTrue
                } else {
                    OpCode::JumpIfFalse
                };
                self.emitter.jump(opcode, target);
            }
        }

        Ok(())
    }

    fn update_in_place(&mut self, slot: Slot, operator: UpdateOperator, ty: Type) {
        self.emitter.local(OpCode::LoadLocal, slot);
        self.step(operator, ty);
        self.emitter.local(OpCode::StoreLocal, slot);
    }

    /// Adds or subtracts one of type `ty` to the top of the stack.
    fn step(&mut self, operator: UpdateOperator, ty: Type) {
        let one = match ty {
            Type::Double => Value::Double(1.0),
            _ => Value::Int(1),
        };
        self.emitter.load_constant(one);
        self.emitter.emit_simple(match operator {
            UpdateOperator::Increment => OpCode::Add,
            UpdateOperator::Decrement => OpCode::Sub,
        });
    }
}

fn arithmetic_opcode(operator: BinaryOperator) -> OpCode {
    match operator {
        BinaryOperator::Add => OpCode::Add,
        BinaryOperator::Subtract => OpCode::Sub,
        BinaryOperator::Multiply => OpCode::Mul,
        BinaryOperator::Divide => OpCode::Div,
        BinaryOperator::Remainder => OpCode::Mod,
    }
}

fn compare_opcode(operator: ComparisonOperator) -> OpCode {
    match operator {
        ComparisonOperator::Less => OpCode::Lt,
        ComparisonOperator::LessEqual => OpCode::Le,
        ComparisonOperator::Greater => OpCode::Gt,
        ComparisonOperator::GreaterEqual => OpCode::Ge,
        ComparisonOperator::Equal => OpCode::Eq,
        ComparisonOperator::NotEqual => OpCode::Ne,
    }
}

fn jump_if_opcode(operator: ComparisonOperator) -> OpCode {
    match operator {
        ComparisonOperator::Less => OpCode::JumpIfLt,
        ComparisonOperator::LessEqual => OpCode::JumpIfLe,
        ComparisonOperator::Greater => OpCode::JumpIfGt,
        ComparisonOperator::GreaterEqual => OpCode::JumpIfGe,
        ComparisonOperator::Equal => OpCode::JumpIfEq,
        ComparisonOperator::NotEqual => OpCode::JumpIfNe,
    }
}

// Not the same as `jump_if_opcode(operator.negate())`: with a NaN operand
// `a < b` and `a >= b` are both false.
fn jump_unless_opcode(operator: ComparisonOperator) -> OpCode {
    match operator {
        ComparisonOperator::Less => OpCode::JumpUnlessLt,
        ComparisonOperator::LessEqual => OpCode::JumpUnlessLe,
        ComparisonOperator::Greater => OpCode::JumpUnlessGt,
        ComparisonOperator::GreaterEqual => OpCode::JumpUnlessGe,
        ComparisonOperator::Equal => OpCode::JumpUnlessEq,
        ComparisonOperator::NotEqual => OpCode::JumpUnlessNe,
    }
}
