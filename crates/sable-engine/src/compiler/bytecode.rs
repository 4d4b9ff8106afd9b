// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode definitions.

use crate::location::Location;
use crate::runtime::value::Value;
use crate::scope::Slot;
use std::fmt::{self, Write as _};

/// A compiled script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    /// The instructions
    pub instructions: Vec<Instruction>,
    /// The constant pool
    pub constants: Vec<Value>,
    /// Instruction offsets where statements start, in ascending order
    pub statement_offsets: Vec<(usize, Location)>,
    /// Number of local slots
    pub slot_count: usize,
    /// Initial value of the loop budget counter
    pub max_loop_counter: u32,
}

impl Bytecode {
    /// Creates a new empty bytecode chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instruction and returns its index.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        let index = self.instructions.len();
        self.instructions.push(instruction);
        index
    }

    /// Adds a constant and returns its index.
    pub fn add_constant(&mut self, value: Value) -> u32 {
        let index = self.constants.len();
        self.constants.push(value);
        index as u32
    }

    /// Returns the location of the statement that emitted the instruction
    /// at `ip`.
    pub fn location_at(&self, ip: usize) -> Option<Location> {
        let index = self.statement_offsets.partition_point(|(offset, _)| *offset <= ip);
        index
            .checked_sub(1)
            .map(|index| self.statement_offsets[index].1)
    }

    /// Returns true if any instruction has the given opcode.
    pub fn contains(&self, opcode: OpCode) -> bool {
        self.instructions.iter().any(|i| i.opcode == opcode)
    }

    /// Renders a human-readable listing.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let mut offsets = self.statement_offsets.iter().peekable();

        for (ip, instruction) in self.instructions.iter().enumerate() {
            while let Some((offset, location)) = offsets.peek() {
                if *offset > ip {
                    break;
                }
                let _ = writeln!(out, "      ; line {}", location.line);
                offsets.next();
            }
            let _ = write!(out, "{:04}  {}", ip, instruction);
            if let Some(Operand::Constant(index)) = instruction.operand {
                if let Some(value) = self.constants.get(index as usize) {
                    let _ = write!(out, "    ({:?})", value);
                }
            }
            out.push('\n');
        }

        out
    }
}

/// A single bytecode instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The operation code
    pub opcode: OpCode,
    /// Optional operand
    pub operand: Option<Operand>,
}

impl Instruction {
    /// Creates a new instruction with no operand.
    pub fn simple(opcode: OpCode) -> Self {
        Self {
            opcode,
            operand: None,
        }
    }

    /// Creates a new instruction with an operand.
    pub fn with_operand(opcode: OpCode, operand: Operand) -> Self {
        Self {
            opcode,
            operand: Some(operand),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            None => write!(f, "{:?}", self.opcode),
            Some(Operand::Constant(index)) => write!(f, "{:<14} #{}", format!("{:?}", self.opcode), index),
            Some(Operand::Local(slot)) => write!(f, "{:<14} ${}", format!("{:?}", self.opcode), slot),
            Some(Operand::Jump(target)) => write!(f, "{:<14} @{:04}", format!("{:?}", self.opcode), target),
            Some(Operand::Budget { slot, weight }) => {
                write!(f, "{:<14} ${} -{}", format!("{:?}", self.opcode), slot, weight)
            }
        }
    }
}

/// Instruction operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Constant pool index
    Constant(u32),
    /// Local variable slot
    Local(Slot),
    /// Absolute jump target
    Jump(usize),
    /// Budget counter slot and the weight charged per iteration
    Budget {
        /// The counter's slot
        slot: Slot,
        /// Amount subtracted per check
        weight: u32,
    },
}

/// Operation codes for the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // Stack operations
    /// Push a constant onto the stack
    LoadConst,
    /// Push null
    LoadNull,
    /// Push true
    LoadTrue,
    /// Push false
    LoadFalse,
    /// Pop the top value
    Pop,
    /// Duplicate the top value
    Dup,

    // Arithmetic operations
    /// Add top two values, or concatenate strings
    Add,
    /// Subtract
    Sub,
    /// Multiply
    Mul,
    /// Divide
    Div,
    /// Remainder
    Mod,
    /// Negate (unary minus)
    Neg,
    /// Widen an int to a double
    IntToDouble,

    // Comparison operations
    /// Equal (==)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,

    // Logical operations
    /// Logical NOT
    Not,

    // Variable operations
    /// Load a local variable
    LoadLocal,
    /// Store to a local variable
    StoreLocal,

    // Control flow
    /// Unconditional jump
    Jump,
    /// Jump if false
    JumpIfFalse,
    /// Jump if true
    JumpIfTrue,

    // Fused compare-and-branch: pop two operands, jump if the comparison
    // holds (`JumpIf*`) or does not hold (`JumpUnless*`). The two families
    // differ for NaN operands, where every comparison except `!=` is false.
    /// Jump if less than
    JumpIfLt,
    /// Jump if less than or equal
    JumpIfLe,
    /// Jump if greater than
    JumpIfGt,
    /// Jump if greater than or equal
    JumpIfGe,
    /// Jump if equal
    JumpIfEq,
    /// Jump if not equal
    JumpIfNe,
    /// Jump unless less than
    JumpUnlessLt,
    /// Jump unless less than or equal
    JumpUnlessLe,
    /// Jump unless greater than
    JumpUnlessGt,
    /// Jump unless greater than or equal
    JumpUnlessGe,
    /// Jump unless equal
    JumpUnlessEq,
    /// Jump unless not equal
    JumpUnlessNe,

    // Sandboxing
    /// Charge the loop budget; fails the script when it runs out
    LoopBudget,

    // Exit
    /// Return the top value from the script
    Return,
    /// Throw the top value
    Throw,
}

impl OpCode {
    /// Returns true for opcodes that take a jump target.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            OpCode::Jump
                | OpCode::JumpIfFalse
                | OpCode::JumpIfTrue
                | OpCode::JumpIfLt
                | OpCode::JumpIfLe
                | OpCode::JumpIfGt
                | OpCode::JumpIfGe
                | OpCode::JumpIfEq
                | OpCode::JumpIfNe
                | OpCode::JumpUnlessLt
                | OpCode::JumpUnlessLe
                | OpCode::JumpUnlessGt
                | OpCode::JumpUnlessGe
                | OpCode::JumpUnlessEq
                | OpCode::JumpUnlessNe
        )
    }
}
