// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode compiler for Sable scripts.
//!
//! Transforms the analyzed tree into bytecode that can be executed by the VM.
//!
//! # Module Structure
//!
//! - `bytecode`: Bytecode definitions and instructions
//! - `emitter`: Instruction buffer, jump labels and fixups
//! - `codegen`: Code generation from the analyzed tree

pub mod bytecode;
pub mod codegen;
pub mod emitter;

pub use bytecode::{Bytecode, Instruction, OpCode, Operand};
pub use codegen::CodeGenerator;
pub use emitter::{Emitter, Label};
