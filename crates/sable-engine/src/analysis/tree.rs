// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The annotated tree produced by analysis and consumed by code generation.
//!
//! Every node carries what the code generator needs: resolved slots,
//! static types, folded constants, implicit casts and control-flow facts.

use super::facts::Facts;
use crate::ast::{BinaryOperator, ComparisonOperator, LogicalOperator, UpdateOperator};
use crate::location::Location;
use crate::runtime::Value;
use crate::scope::Slot;
use crate::types::Type;

/// An analyzed script.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedProgram {
    /// The top-level statements
    pub statements: Vec<TypedStatement>,
    /// Facts of the script body
    pub facts: Facts,
    /// Types of the host parameters, bound to slots `0..params.len()`
    pub params: Vec<Type>,
    /// Number of local slots the script needs
    pub slot_count: usize,
    /// The loop budget counter, if any loop requested it
    pub budget_slot: Option<Slot>,
    /// Initial value of the budget counter
    pub max_loop_counter: u32,
}

/// An analyzed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedStatement {
    /// The statement itself
    pub kind: StatementKind,
    /// Its control-flow facts
    pub facts: Facts,
    /// Source location
    pub location: Location,
}

/// Analyzed statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// Variable declarations
    Declaration(Vec<TypedDeclarator>),
    /// Expression evaluated for its side effect
    Expression(TypedExpression),
    /// Nested block
    Block(TypedBlock),
    /// `if`, with optional `else`
    If {
        /// The condition
        condition: TypedExpression,
        /// Taken when the condition holds
        then_block: TypedBlock,
        /// Taken otherwise
        else_block: Option<TypedBlock>,
    },
    /// `while`
    While(WhileLoop),
    /// `do ... while`
    DoWhile(DoWhileLoop),
    /// `for`
    For(ForLoop),
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `return`, explicit or implicit
    Return(Option<TypedExpression>),
    /// `throw`
    Throw(TypedExpression),
}

/// A declared variable with its initializer.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedDeclarator {
    /// The variable's slot
    pub slot: Slot,
    /// The declared type
    pub ty: Type,
    /// The initializer, already cast to `ty`
    pub init: Option<TypedExpression>,
}

/// An analyzed block.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedBlock {
    /// The statements
    pub statements: Vec<TypedStatement>,
    /// Facts of the whole block
    pub facts: Facts,
}

/// An analyzed `while` loop.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop {
    /// Boolean condition
    pub condition: TypedExpression,
    /// The body, if not empty
    pub body: Option<TypedBlock>,
    /// Budget charged per iteration
    pub weight: u32,
    /// Slot of the budget counter, `None` if disabled
    pub budget_slot: Option<Slot>,
}

/// An analyzed `do ... while` loop.
#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileLoop {
    /// The body
    pub body: TypedBlock,
    /// Boolean condition
    pub condition: TypedExpression,
    /// Budget charged per iteration
    pub weight: u32,
    /// Slot of the budget counter, `None` if disabled
    pub budget_slot: Option<Slot>,
}

/// An analyzed `for` loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    /// The initializer
    pub initializer: Option<TypedForInitializer>,
    /// Boolean condition; `None` loops until an escape
    pub condition: Option<TypedExpression>,
    /// Runs after each iteration, and on `continue`
    pub afterthought: Option<TypedExpression>,
    /// The body, if not empty
    pub body: Option<TypedBlock>,
    /// Budget charged per iteration
    pub weight: u32,
    /// Slot of the budget counter, `None` if disabled
    pub budget_slot: Option<Slot>,
}

/// An analyzed `for` initializer.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedForInitializer {
    /// Loop-scoped declarations
    Declaration(Vec<TypedDeclarator>),
    /// An expression evaluated for its side effect
    Expression(TypedExpression),
}

/// An analyzed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedExpression {
    /// The expression
    pub kind: ExpressionKind,
    /// Its static type
    pub ty: Type,
    /// The folded value, when known at compile time
    pub constant: Option<Value>,
    /// Source location
    pub location: Location,
}

impl TypedExpression {
    /// Returns the folded boolean, if this is a boolean constant.
    pub fn constant_bool(&self) -> Option<bool> {
        self.constant.as_ref().and_then(Value::as_bool)
    }
}

/// Analyzed expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    /// A literal or folded value
    Constant(Value),
    /// Read of a local slot
    Load(Slot),
    /// Implicit cast; the only one is `int` to `double`
    Cast(Box<TypedExpression>),
    /// Arithmetic negation
    Negate(Box<TypedExpression>),
    /// Boolean negation
    Not(Box<TypedExpression>),
    /// Arithmetic or string concatenation; both operands share `ty` unless
    /// it is a concatenation
    Arithmetic {
        /// The operator
        operator: BinaryOperator,
        /// Left operand
        left: Box<TypedExpression>,
        /// Right operand
        right: Box<TypedExpression>,
    },
    /// Comparison of two operands of the same type
    Compare {
        /// The operator
        operator: ComparisonOperator,
        /// Left operand
        left: Box<TypedExpression>,
        /// Right operand
        right: Box<TypedExpression>,
    },
    /// Short-circuit logic
    Logical {
        /// The operator
        operator: LogicalOperator,
        /// Left operand
        left: Box<TypedExpression>,
        /// Right operand
        right: Box<TypedExpression>,
    },
    /// Store into a slot; compound operators are already expanded
    Assign {
        /// Target slot
        slot: Slot,
        /// Value to store, of the variable's type
        value: Box<TypedExpression>,
    },
    /// `++` / `--` on a numeric slot
    Update {
        /// Target slot
        slot: Slot,
        /// The operator
        operator: UpdateOperator,
        /// Whether the expression yields the updated value
        prefix: bool,
    },
}
