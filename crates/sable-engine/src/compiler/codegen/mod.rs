// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Code generation from the analyzed tree to bytecode.
//!
//! This module contains the `CodeGenerator`, which lowers a
//! [`TypedProgram`] into executable [`Bytecode`]. All legality checks have
//! already been made by the analyzer; the only failure left here is an
//! internal one, such as a `break` that found no enclosing loop.
//!
//! ## Module Structure
//!
//! - `mod.rs` - The generator, the prologue and simple statements
//! - `expressions.rs` - Expressions and the condition binder
//! - `loops.rs` - `while`, `do ... while` and `for`
//! - `statements.rs` - Documentation of the emitted layouts

mod expressions;
mod loops;
mod statements;


use super::bytecode::{Bytecode, OpCode};
use super::emitter::{Emitter, Label};
use crate::analysis::tree::*;
use crate::error::CompileError;
use crate::runtime::value::Value;
use crate::types::Type;
use tracing::trace;

/// Where `continue` and `break` jump inside the innermost loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LoopTargets {
    /// Target of `continue`
    pub continue_to: Label,
    /// Target of `break`
    pub break_to: Label,
}

/// Lowers an analyzed script to bytecode.
#[derive(Debug, Default)]
pub struct CodeGenerator {
    emitter: Emitter,
}

impl CodeGenerator {
    /// Creates a new generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates the bytecode of a whole script.
    pub fn generate(mut self, program: &TypedProgram) -> Result<Bytecode, CompileError> {
        // Prologue: initialize the budget counter once per execution
        if let Some(slot) = program.budget_slot {
            let initial = program.max_loop_counter.min(i32::MAX as u32) as i32;
            self.emitter.load_constant(Value::Int(initial));
            self.emitter.local(OpCode::StoreLocal, slot);
        }

        for statement in &program.statements {
            self.generate_statement(statement, None)?;
        }

        // A script that can complete normally yields null
        if !program.facts.all_escape {
            self.emitter.emit_simple(OpCode::LoadNull);
            self.emitter.emit_simple(OpCode::Return);
        }

        let mut bytecode = self.emitter.finish()?;
        bytecode.slot_count = program.slot_count;
        bytecode.max_loop_counter = program.max_loop_counter;

        trace!(
            instructions = bytecode.instructions.len(),
            constants = bytecode.constants.len(),
            slots = bytecode.slot_count,
            "generated bytecode"
        );

        Ok(bytecode)
    }

    fn generate_statement(
        &mut self,
        statement: &TypedStatement,
        targets: Option<LoopTargets>,
    ) -> Result<(), CompileError> {
        self.emitter.statement_offset(statement.location);

        match &statement.kind {
            StatementKind::Declaration(declarators) => self.generate_declarators(declarators)?,
            StatementKind::Expression(expr) => self.generate_effect(expr)?,
            StatementKind::Block(block) => self.generate_block(block, targets)?,
            StatementKind::If {
                condition,
                then_block,
                else_block,
            } => self.generate_if(condition, then_block, else_block.as_ref(), targets)?,
            StatementKind::While(node) => self.generate_while(node, statement)?,
            StatementKind::DoWhile(node) => self.generate_do_while(node, statement)?,
            StatementKind::For(node) => self.generate_for(node, statement)?,
            StatementKind::Break => {
                let targets = require_targets(targets, "break")?;
                self.emitter.jump(OpCode::Jump, targets.break_to);
            }
            StatementKind::Continue => {
                let targets = require_targets(targets, "continue")?;
                self.emitter.jump(OpCode::Jump, targets.continue_to);
            }
            StatementKind::Return(value) => {
                match value {
                    Some(value) => self.generate_expression(value)?,
                    None => {
                        self.emitter.emit_simple(OpCode::LoadNull);
                    }
                }
                self.emitter.emit_simple(OpCode::Return);
            }
            StatementKind::Throw(value) => {
                self.generate_expression(value)?;
                self.emitter.emit_simple(OpCode::Throw);
            }
        }

        Ok(())
    }

    pub(crate) fn generate_block(
        &mut self,
        block: &TypedBlock,
        targets: Option<LoopTargets>,
    ) -> Result<(), CompileError> {
        for statement in &block.statements {
            self.generate_statement(statement, targets)?;
        }
        Ok(())
    }

    pub(crate) fn generate_declarators(
        &mut self,
        declarators: &[TypedDeclarator],
    ) -> Result<(), CompileError> {
        for declarator in declarators {
            match &declarator.init {
                Some(init) => self.generate_expression(init)?,
                None => self.emitter.load_constant(default_value(declarator.ty)),
            }
            self.emitter.local(OpCode::StoreLocal, declarator.slot);
        }
        Ok(())
    }

    fn generate_if(
        &mut self,
        condition: &TypedExpression,
        then_block: &TypedBlock,
        else_block: Option<&TypedBlock>,
        targets: Option<LoopTargets>,
    ) -> Result<(), CompileError> {
        let else_label = self.emitter.new_label();
        self.branch(condition, else_label, false)?;
        self.generate_block(then_block, targets)?;

        match else_block {
            None => self.emitter.mark(else_label),
            Some(else_block) => {
                let end = self.emitter.new_label();
                if !then_block.facts.all_escape {
                    self.emitter.jump(OpCode::Jump, end);
                }
                self.emitter.mark(else_label);
                self.generate_block(else_block, targets)?;
                self.emitter.mark(end);
            }
        }

        Ok(())
    }
}

fn require_targets(targets: Option<LoopTargets>, what: &str) -> Result<LoopTargets, CompileError> {
    targets.ok_or_else(|| CompileError::Internal(format!("{} outside of a loop", what)))
}

/// The value of a declared but uninitialized variable.
fn default_value(ty: Type) -> Value {
    match ty {
        Type::Int => Value::Int(0),
        Type::Double => Value::Double(0.0),
        Type::Boolean => Value::Boolean(false),
        Type::String | Type::Void => Value::Null,
    }
}
