// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Parse tree definitions for Sable.
//!
//! The parse tree is produced by the [`Parser`](crate::parser::Parser) and
//! never modified afterwards; semantic analysis builds a separate annotated
//! tree in [`analysis::tree`](crate::analysis::tree).

use crate::location::Location;
use crate::types::Type;

/// A complete Sable script.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// The top-level statements
    pub statements: Vec<Statement>,
}

/// A Sable statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Typed variable declaration: `int x = 1, y;`
    Declaration(Declaration),
    /// Expression statement (assignment or update)
    Expression(ExpressionStatement),
    /// Nested block `{ ... }`
    Block(Block),
    /// If statement, with or without else
    If(IfStatement),
    /// While loop
    While(WhileStatement),
    /// Do-while loop
    DoWhile(DoWhileStatement),
    /// For loop
    For(ForStatement),
    /// `break;`
    Break(Location),
    /// `continue;`
    Continue(Location),
    /// `return expr?;`
    Return(ReturnStatement),
    /// `throw expr;`
    Throw(ThrowStatement),
}

impl Statement {
    /// Returns the location of the statement's first token.
    pub fn location(&self) -> Location {
        match self {
            Statement::Declaration(decl) => decl.location,
            Statement::Expression(stmt) => stmt.location,
            Statement::Block(block) => block.location,
            Statement::If(stmt) => stmt.location,
            Statement::While(stmt) => stmt.location,
            Statement::DoWhile(stmt) => stmt.location,
            Statement::For(stmt) => stmt.location,
            Statement::Break(location) | Statement::Continue(location) => *location,
            Statement::Return(stmt) => stmt.location,
            Statement::Throw(stmt) => stmt.location,
        }
    }
}

/// A typed variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// The declared type
    pub ty: Type,
    /// The declarators
    pub declarators: Vec<Declarator>,
    /// Source location
    pub location: Location,
}

/// A single declarator.
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    /// The variable name
    pub name: String,
    /// Optional initializer
    pub init: Option<Expression>,
    /// Source location
    pub location: Location,
}

/// An expression statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    /// The expression
    pub expression: Expression,
    /// Source location
    pub location: Location,
}

/// A non-empty sequence of statements.
///
/// `{}` and `;` used as the body of a loop or `if` are represented by an
/// absent block, never by an empty one.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// The statements, never empty
    pub statements: Vec<Statement>,
    /// Source location
    pub location: Location,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// The condition
    pub condition: Expression,
    /// The then branch (`None` if empty)
    pub then_block: Option<Block>,
    /// The else branch, if an `else` was written; `Some(None)` is an empty one
    pub else_block: Option<Option<Block>>,
    /// Source location
    pub location: Location,
}

/// A while loop.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    /// The loop condition
    pub condition: Expression,
    /// The body (`None` if empty)
    pub body: Option<Block>,
    /// Source location
    pub location: Location,
}

/// A do-while loop.
#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileStatement {
    /// The body (`None` if empty)
    pub body: Option<Block>,
    /// The loop condition
    pub condition: Expression,
    /// Source location
    pub location: Location,
}

/// A for loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    /// The initializer
    pub initializer: Option<ForInitializer>,
    /// The condition (`None` means always true)
    pub condition: Option<Expression>,
    /// The afterthought
    pub afterthought: Option<Expression>,
    /// The body (`None` if empty)
    pub body: Option<Block>,
    /// Source location
    pub location: Location,
}

/// The initializer of a for loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInitializer {
    /// `for (int i = 0; ...)`
    Declaration(Declaration),
    /// `for (i = 0; ...)`
    Expression(Expression),
}

/// A return statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    /// The returned value
    pub value: Option<Expression>,
    /// Source location
    pub location: Location,
}

/// A throw statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrowStatement {
    /// The thrown value
    pub value: Expression,
    /// Source location
    pub location: Location,
}

/// A Sable expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Variable reference
    Variable(Variable),
    /// Unary operation: `!x`, `-x`
    Unary(UnaryExpression),
    /// Arithmetic operation
    Binary(BinaryExpression),
    /// Comparison
    Comparison(ComparisonExpression),
    /// Short-circuit logical operation
    Logical(LogicalExpression),
    /// Assignment, plain or compound
    Assignment(AssignmentExpression),
    /// Prefix or postfix `++` / `--`
    Update(UpdateExpression),
}

impl Expression {
    /// Returns the location of the expression.
    pub fn location(&self) -> Location {
        match self {
            Expression::Literal(e) => e.location,
            Expression::Variable(e) => e.location,
            Expression::Unary(e) => e.location,
            Expression::Binary(e) => e.location,
            Expression::Comparison(e) => e.location,
            Expression::Logical(e) => e.location,
            Expression::Assignment(e) => e.location,
            Expression::Update(e) => e.location,
        }
    }

    /// Returns true for the expressions allowed as statements.
    pub fn is_statement_expression(&self) -> bool {
        matches!(self, Expression::Assignment(_) | Expression::Update(_))
    }
}

/// A literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    /// The value
    pub value: LiteralValue,
    /// Source location
    pub location: Location,
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Integer literal, range-checked during analysis
    Integer(i64),
    /// Decimal literal
    Decimal(f64),
    /// Boolean literal
    Boolean(bool),
    /// String literal
    String(String),
}

/// A variable reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// The variable name
    pub name: String,
    /// Source location
    pub location: Location,
}

/// A unary operation.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub operand: Box<Expression>,
    /// Source location
    pub location: Location,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// `!`
    Not,
    /// `-`
    Minus,
}

/// An arithmetic operation.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand
    pub right: Box<Expression>,
    /// Source location
    pub location: Location,
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// `+`, also string concatenation
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Remainder,
}

/// A comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonExpression {
    /// The operator
    pub operator: ComparisonOperator,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand
    pub right: Box<Expression>,
    /// Source location
    pub location: Location,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
}

impl ComparisonOperator {
    /// The operator that yields the opposite result for non-NaN operands.
    pub fn negate(self) -> Self {
        match self {
            ComparisonOperator::Less => ComparisonOperator::GreaterEqual,
            ComparisonOperator::LessEqual => ComparisonOperator::Greater,
            ComparisonOperator::Greater => ComparisonOperator::LessEqual,
            ComparisonOperator::GreaterEqual => ComparisonOperator::Less,
            ComparisonOperator::Equal => ComparisonOperator::NotEqual,
            ComparisonOperator::NotEqual => ComparisonOperator::Equal,
        }
    }
}

/// A short-circuit logical operation.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    /// The operator
    pub operator: LogicalOperator,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand
    pub right: Box<Expression>,
    /// Source location
    pub location: Location,
}

/// Logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    /// `&&`
    And,
    /// `||`
    Or,
}

/// An assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    /// The operator
    pub operator: AssignmentOperator,
    /// The assigned variable
    pub target: String,
    /// The assigned value
    pub value: Box<Expression>,
    /// Source location
    pub location: Location,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    /// `=`
    Assign,
    /// `+=`
    Add,
    /// `-=`
    Subtract,
    /// `*=`
    Multiply,
    /// `/=`
    Divide,
    /// `%=`
    Remainder,
}

impl AssignmentOperator {
    /// The arithmetic operator of a compound assignment.
    pub fn binary_operator(self) -> Option<BinaryOperator> {
        match self {
            AssignmentOperator::Assign => None,
            AssignmentOperator::Add => Some(BinaryOperator::Add),
            AssignmentOperator::Subtract => Some(BinaryOperator::Subtract),
            AssignmentOperator::Multiply => Some(BinaryOperator::Multiply),
            AssignmentOperator::Divide => Some(BinaryOperator::Divide),
            AssignmentOperator::Remainder => Some(BinaryOperator::Remainder),
        }
    }
}

/// A prefix or postfix update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpression {
    /// The operator
    pub operator: UpdateOperator,
    /// Whether the operator is prefix
    pub prefix: bool,
    /// The updated variable
    pub target: String,
    /// Source location
    pub location: Location,
}

/// Update operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    /// `++`
    Increment,
    /// `--`
    Decrement,
}
