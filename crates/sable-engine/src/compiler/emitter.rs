// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The instruction emitter and its jump labels.
//!
//! Jumps are emitted against [`Label`]s that may be marked before (backward
//! jumps) or after (forward jumps) the jump itself. Every jump is recorded
//! as a fixup and patched with the absolute target in [`Emitter::finish`].

use super::bytecode::{Bytecode, Instruction, OpCode, Operand};
use crate::error::CompileError;
use crate::location::Location;
use crate::runtime::value::Value;
use crate::scope::Slot;

/// An opaque jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(usize);

/// Accumulates the bytecode of one compilation.
#[derive(Debug, Default)]
pub struct Emitter {
    bytecode: Bytecode,
    /// Marked position of each label
    labels: Vec<Option<usize>>,
    /// Jump instructions waiting for their label's position
    fixups: Vec<(usize, Label)>,
}

impl Emitter {
    /// Creates an empty emitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next instruction.
    pub fn position(&self) -> usize {
        self.bytecode.instructions.len()
    }

    /// Appends an instruction.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        self.bytecode.emit(instruction)
    }

    /// Appends an instruction without operand.
    pub fn emit_simple(&mut self, opcode: OpCode) -> usize {
        self.emit(Instruction::simple(opcode))
    }

    /// Appends an instruction that pushes `value`.
    pub fn load_constant(&mut self, value: Value) {
        match value {
            Value::Null => {
                self.emit_simple(OpCode::LoadNull);
            }
            Value::Boolean(true) => {
                self.emit_simple(OpCode::LoadTrue);
            }
            Value::Boolean(false) => {
                self.emit_simple(OpCode::LoadFalse);
            }
            value => {
                let index = self.bytecode.add_constant(value);
                self.emit(Instruction::with_operand(
                    OpCode::LoadConst,
                    Operand::Constant(index),
                ));
            }
        }
    }

    /// Appends a slot access.
    pub fn local(&mut self, opcode: OpCode, slot: Slot) {
        self.emit(Instruction::with_operand(opcode, Operand::Local(slot)));
    }

    /// Creates a new, unmarked label.
    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Binds `label` to the next instruction.
    pub fn mark(&mut self, label: Label) {
        let position = self.position();
        if let Some(slot) = self.labels.get_mut(label.0) {
            *slot = Some(position);
        }
    }

    /// Appends a jump to `label`.
    pub fn jump(&mut self, opcode: OpCode, label: Label) {
        // Placeholder target, patched in `finish`
        let index = self.emit(Instruction::with_operand(opcode, Operand::Jump(usize::MAX)));
        self.fixups.push((index, label));
    }

    /// Appends a loop budget check.
    pub fn loop_budget(&mut self, slot: Slot, weight: u32) {
        self.emit(Instruction::with_operand(
            OpCode::LoopBudget,
            Operand::Budget { slot, weight },
        ));
    }

    /// Records that the next instruction belongs to the statement at
    /// `location`.
    pub fn statement_offset(&mut self, location: Location) {
        let position = self.position();
        let offsets = &mut self.bytecode.statement_offsets;
        match offsets.last_mut() {
            Some((offset, last)) if *offset == position => *last = location,
            _ => offsets.push((position, location)),
        }
    }

    /// Patches every jump and returns the finished bytecode.
    pub fn finish(mut self) -> Result<Bytecode, CompileError> {
        for (index, label) in &self.fixups {
            let target = self
                .labels
                .get(label.0)
                .copied()
                .flatten()
                .ok_or_else(|| {
                    CompileError::Internal(format!("label {} was never marked", label.0))
                })?;
            self.bytecode.instructions[*index].operand = Some(Operand::Jump(target));
        }
        Ok(self.bytecode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_jump_patched() {
        let mut emitter = Emitter::new();
        let end = emitter.new_label();
        emitter.jump(OpCode::Jump, end);
        emitter.emit_simple(OpCode::LoadNull);
        emitter.mark(end);
        emitter.emit_simple(OpCode::Return);
        let bytecode = emitter.finish().unwrap();
        assert_eq!(bytecode.instructions[0].operand, Some(Operand::Jump(2)));
    }

    #[test]
    fn test_backward_jump_patched() {
        let mut emitter = Emitter::new();
        let begin = emitter.new_label();
        emitter.emit_simple(OpCode::LoadNull);
        emitter.mark(begin);
        emitter.emit_simple(OpCode::Pop);
        emitter.jump(OpCode::Jump, begin);
        let bytecode = emitter.finish().unwrap();
        assert_eq!(bytecode.instructions[2].operand, Some(Operand::Jump(1)));
    }

    #[test]
    fn test_unmarked_label_is_internal_error() {
        let mut emitter = Emitter::new();
        let label = emitter.new_label();
        emitter.jump(OpCode::JumpIfFalse, label);
        assert!(matches!(emitter.finish(), Err(CompileError::Internal(_))));
    }

    #[test]
    fn test_booleans_do_not_use_constant_pool() {
        let mut emitter = Emitter::new();
        emitter.load_constant(Value::Boolean(true));
        emitter.load_constant(Value::Int(3));
        let bytecode = emitter.finish().unwrap();
        assert_eq!(bytecode.instructions[0].opcode, OpCode::LoadTrue);
        assert_eq!(bytecode.constants, vec![Value::Int(3)]);
    }

    #[test]
    fn test_statement_offsets_collapse_at_same_position() {
        let mut emitter = Emitter::new();
        emitter.statement_offset(Location::new(0, 1, 1));
        emitter.statement_offset(Location::new(5, 1, 6));
        emitter.emit_simple(OpCode::LoadNull);
        emitter.statement_offset(Location::new(9, 2, 1));
        let bytecode = emitter.finish().unwrap();
        assert_eq!(
            bytecode.statement_offsets,
            vec![(0, Location::new(5, 1, 6)), (1, Location::new(9, 2, 1))]
        );
    }
}
