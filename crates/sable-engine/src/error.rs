// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for compilation and script execution.
//!
//! Compile-time failures ([`CompileError`]) and runtime failures raised by
//! generated code ([`ScriptError`]) are disjoint: the analyzer and code
//! generator never produce a `ScriptError`, and the VM never produces a
//! `CompileError`.

use crate::location::Location;
use crate::runtime::Value;
use std::fmt;
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The category of a semantic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticErrorKind {
    /// A loop whose condition is constant false
    DeadLoop,
    /// A constant-true loop with no body
    NoEscape,
    /// A loop body that always leaves the loop without continuing
    ExtraneousLoop,
    /// An expression of the wrong type
    TypeMismatch,
    /// A statement after one that always escapes
    UnreachableStatement,
    /// A `continue` as the last statement of a loop body
    ExtraneousContinue,
    /// An `if` with a constant condition or an empty branch
    ExtraneousIf,
    /// `break` outside of a loop
    BreakOutsideLoop,
    /// `continue` outside of a loop
    ContinueOutsideLoop,
    /// An expression statement without side effect
    NotAStatement,
    /// Reference to an undeclared variable
    UndefinedVariable,
    /// A second declaration of a visible name
    DuplicateVariable,
    /// Assignment to a read-only variable
    ReadOnlyVariable,
    /// An operator applied to operands it does not accept
    InvalidOperand,
}

impl SemanticErrorKind {
    /// A stable name for the category.
    pub fn as_str(self) -> &'static str {
        match self {
            SemanticErrorKind::DeadLoop => "dead loop",
            SemanticErrorKind::NoEscape => "no escape",
            SemanticErrorKind::ExtraneousLoop => "extraneous loop",
            SemanticErrorKind::TypeMismatch => "type mismatch",
            SemanticErrorKind::UnreachableStatement => "unreachable statement",
            SemanticErrorKind::ExtraneousContinue => "extraneous continue",
            SemanticErrorKind::ExtraneousIf => "extraneous if",
            SemanticErrorKind::BreakOutsideLoop => "break outside loop",
            SemanticErrorKind::ContinueOutsideLoop => "continue outside loop",
            SemanticErrorKind::NotAStatement => "not a statement",
            SemanticErrorKind::UndefinedVariable => "undefined variable",
            SemanticErrorKind::DuplicateVariable => "duplicate variable",
            SemanticErrorKind::ReadOnlyVariable => "read-only variable",
            SemanticErrorKind::InvalidOperand => "invalid operand",
        }
    }
}

impl fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A semantic error found during analysis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {location}")]
pub struct SemanticError {
    /// The category
    pub kind: SemanticErrorKind,
    /// Where the offending construct starts
    pub location: Location,
    /// A human-readable message
    pub message: String,
}

impl SemanticError {
    /// Creates a new semantic error.
    pub fn new(kind: SemanticErrorKind, location: Location, message: impl Into<String>) -> Self {
        Self {
            kind,
            location,
            message: message.into(),
        }
    }
}

/// Errors that abort compilation of a script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The source could not be parsed
    #[error("Syntax error at {location}: {message}")]
    Syntax {
        /// What was expected or found
        message: String,
        /// Where parsing failed
        location: Location,
    },

    /// The script is well-formed but invalid
    #[error("{0}")]
    Semantic(#[from] SemanticError),

    /// A bug in the compiler itself
    #[error("Internal compiler error: {0}")]
    Internal(String),
}

impl CompileError {
    /// Returns the semantic category, if this is a semantic error.
    pub fn semantic_kind(&self) -> Option<SemanticErrorKind> {
        match self {
            CompileError::Semantic(err) => Some(err.kind),
            _ => None,
        }
    }

    /// Returns the source location, if known.
    pub fn location(&self) -> Option<Location> {
        match self {
            CompileError::Syntax { location, .. } => Some(*location),
            CompileError::Semantic(err) => Some(err.location),
            CompileError::Internal(_) => None,
        }
    }
}

/// Errors raised by generated code while a script runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    /// The loop budget was exhausted
    #[error("Exceeded the loop budget of {limit} at {location}")]
    BudgetExceeded {
        /// The configured budget
        limit: u32,
        /// The loop that ran out
        location: Location,
    },

    /// A `throw` statement was executed
    #[error("Script threw '{value}' at {location}")]
    Thrown {
        /// The thrown value
        value: Value,
        /// The throw statement
        location: Location,
    },

    /// Integer division or remainder by zero
    #[error("Arithmetic error at {location}: {message}")]
    Arithmetic {
        /// What went wrong
        message: String,
        /// The statement being executed
        location: Location,
    },

    /// The host passed arguments that do not match the script's parameters
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Malformed bytecode popped an empty stack
    #[error("Stack underflow")]
    StackUnderflow,

    /// An instruction with a missing or out-of-range operand
    #[error("Invalid bytecode at {ip}: {message}")]
    InvalidBytecode {
        /// Index of the offending instruction
        ip: usize,
        /// What was wrong with it
        message: &'static str,
    },
}

impl ScriptError {
    /// Returns true if the script was stopped by the loop budget.
    ///
    /// Hosts typically treat budget exhaustion differently from faults
    /// raised by the script itself; script code can never observe it.
    pub fn is_budget_exceeded(&self) -> bool {
        matches!(self, ScriptError::BudgetExceeded { .. })
    }
}

/// Any error produced by the engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Compilation failed
    #[error("{0}")]
    Compile(#[from] CompileError),

    /// Execution failed
    #[error("{0}")]
    Script(#[from] ScriptError),

    /// Reading a script failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
