// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The main parser implementation.

use crate::ast::*;
use crate::error::CompileError;
use crate::lexer::{Scanner, Token, TokenKind};
use crate::location::{LineIndex, Location};
use crate::types::Type;

/// How deeply statements and expressions may nest. Every later pass
/// recurses over the tree, so this also bounds their stack use.
pub const MAX_NESTING_DEPTH: usize = 128;

/// A recursive descent parser for Sable.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    lines: LineIndex,
    current: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self {
            scanner,
            lines: LineIndex::new(source),
            current,
            depth: 0,
        }
    }

    /// Parses the source code into a Program.
    pub fn parse_program(&mut self) -> Result<Program, CompileError> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        Ok(Program { statements })
    }

    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> Result<Statement, CompileError> {
        self.nested(Self::statement)
    }

    fn statement(&mut self) -> Result<Statement, CompileError> {
        match &self.current.kind {
            kind if kind.is_type_keyword() => {
                let declaration = self.parse_declaration()?;
                self.end_statement()?;
                Ok(Statement::Declaration(declaration))
            }
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Break => {
                let location = self.location();
                self.advance();
                self.end_statement()?;
                Ok(Statement::Break(location))
            }
            TokenKind::Continue => {
                let location = self.location();
                self.advance();
                self.end_statement()?;
                Ok(Statement::Continue(location))
            }
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Throw => self.parse_throw_statement(),
            TokenKind::LeftBrace => self.parse_block_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_declaration(&mut self) -> Result<Declaration, CompileError> {
        let location = self.location();
        let ty = match &self.current.kind {
            TokenKind::Int => Type::Int,
            TokenKind::Double => Type::Double,
            TokenKind::Boolean => Type::Boolean,
            TokenKind::StringType => Type::String,
            _ => return Err(self.error("Expected a type")),
        };
        self.advance();

        let mut declarators = Vec::new();

        loop {
            let location = self.location();
            let name = self.expect_identifier()?;
            let init = if self.check(&TokenKind::Equal) {
                self.advance();
                Some(self.parse_expression()?)
            } else {
                None
            };

            declarators.push(Declarator {
                name,
                init,
                location,
            });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(Declaration {
            ty,
            declarators,
            location,
        })
    }

    fn parse_if_statement(&mut self) -> Result<Statement, CompileError> {
        let location = self.location();
        self.advance(); // consume 'if'
        self.expect(&TokenKind::LeftParen)?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let then_block = self.parse_trailer()?;
        let else_block = if self.check(&TokenKind::Else) {
            self.advance();
            Some(self.parse_trailer()?)
        } else {
            None
        };

        Ok(Statement::If(IfStatement {
            condition,
            then_block,
            else_block,
            location,
        }))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, CompileError> {
        let location = self.location();
        self.advance(); // consume 'while'
        self.expect(&TokenKind::LeftParen)?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        let body = self.parse_trailer()?;

        Ok(Statement::While(WhileStatement {
            condition,
            body,
            location,
        }))
    }

    fn parse_do_while_statement(&mut self) -> Result<Statement, CompileError> {
        let location = self.location();
        self.advance(); // consume 'do'
        let body = if self.check(&TokenKind::LeftBrace) {
            self.parse_braced_block()?
        } else {
            return Err(self.error("Expected '{' after 'do'"));
        };
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LeftParen)?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RightParen)?;
        self.expect(&TokenKind::Semicolon)?;

        Ok(Statement::DoWhile(DoWhileStatement {
            body,
            condition,
            location,
        }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, CompileError> {
        let location = self.location();
        self.advance(); // consume 'for'
        self.expect(&TokenKind::LeftParen)?;

        let initializer = if self.check(&TokenKind::Semicolon) {
            None
        } else if self.current.kind.is_type_keyword() {
            Some(ForInitializer::Declaration(self.parse_declaration()?))
        } else {
            Some(ForInitializer::Expression(self.parse_expression()?))
        };
        self.expect(&TokenKind::Semicolon)?;

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;

        let afterthought = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RightParen)?;

        let body = self.parse_trailer()?;

        Ok(Statement::For(ForStatement {
            initializer,
            condition,
            afterthought,
            body,
            location,
        }))
    }

    fn parse_return_statement(&mut self) -> Result<Statement, CompileError> {
        let location = self.location();
        self.advance(); // consume 'return'
        let value = if self.check(&TokenKind::Semicolon) || self.is_at_end() {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.end_statement()?;

        Ok(Statement::Return(ReturnStatement { value, location }))
    }

    fn parse_throw_statement(&mut self) -> Result<Statement, CompileError> {
        let location = self.location();
        self.advance(); // consume 'throw'
        let value = self.parse_expression()?;
        self.end_statement()?;

        Ok(Statement::Throw(ThrowStatement { value, location }))
    }

    fn parse_block_statement(&mut self) -> Result<Statement, CompileError> {
        let location = self.location();
        match self.parse_braced_block()? {
            Some(block) => Ok(Statement::Block(block)),
            None => Err(CompileError::Syntax {
                message: "Empty block statement".into(),
                location,
            }),
        }
    }

    /// Parses the body of a loop or `if`: a block, a single statement, or
    /// `;`. Empty bodies are returned as `None`.
    fn parse_trailer(&mut self) -> Result<Option<Block>, CompileError> {
        match &self.current.kind {
            TokenKind::Semicolon => {
                self.advance();
                Ok(None)
            }
            TokenKind::LeftBrace => self.parse_braced_block(),
            _ => {
                let location = self.location();
                let statement = self.parse_statement()?;
                Ok(Some(Block {
                    statements: vec![statement],
                    location,
                }))
            }
        }
    }

    fn parse_braced_block(&mut self) -> Result<Option<Block>, CompileError> {
        let location = self.location();
        self.expect(&TokenKind::LeftBrace)?;
        let mut statements = Vec::new();

        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        self.expect(&TokenKind::RightBrace)?;

        if statements.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Block {
                statements,
                location,
            }))
        }
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, CompileError> {
        let location = self.location();
        let expression = self.parse_expression()?;
        self.end_statement()?;
        Ok(Statement::Expression(ExpressionStatement {
            expression,
            location,
        }))
    }

    /// Parses an expression.
    pub fn parse_expression(&mut self) -> Result<Expression, CompileError> {
        self.nested(Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> Result<Expression, CompileError> {
        let expr = self.parse_logical_or()?;

        let operator = match &self.current.kind {
            TokenKind::Equal => AssignmentOperator::Assign,
            TokenKind::PlusEqual => AssignmentOperator::Add,
            TokenKind::MinusEqual => AssignmentOperator::Subtract,
            TokenKind::StarEqual => AssignmentOperator::Multiply,
            TokenKind::SlashEqual => AssignmentOperator::Divide,
            TokenKind::PercentEqual => AssignmentOperator::Remainder,
            _ => return Ok(expr),
        };

        let Expression::Variable(target) = expr else {
            return Err(self.error("Invalid assignment target"));
        };
        self.advance();
        let value = self.nested(Self::parse_assignment)?;

        Ok(Expression::Assignment(AssignmentExpression {
            operator,
            target: target.name,
            value: Box::new(value),
            location: target.location,
        }))
    }

    fn parse_logical_or(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_logical_and()?;

        while self.check(&TokenKind::PipePipe) {
            self.advance();
            let right = self.parse_logical_and()?;
            let location = left.location();
            left = Expression::Logical(LogicalExpression {
                operator: LogicalOperator::Or,
                left: Box::new(left),
                right: Box::new(right),
                location,
            });
        }

        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_equality()?;

        while self.check(&TokenKind::AmpersandAmpersand) {
            self.advance();
            let right = self.parse_equality()?;
            let location = left.location();
            left = Expression::Logical(LogicalExpression {
                operator: LogicalOperator::And,
                left: Box::new(left),
                right: Box::new(right),
                location,
            });
        }

        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_comparison()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::EqualEqual => ComparisonOperator::Equal,
                TokenKind::NotEqual => ComparisonOperator::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = comparison(operator, left, right);
        }

        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_additive()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::LessThan => ComparisonOperator::Less,
                TokenKind::LessThanEqual => ComparisonOperator::LessEqual,
                TokenKind::GreaterThan => ComparisonOperator::Greater,
                TokenKind::GreaterThanEqual => ComparisonOperator::GreaterEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = comparison(operator, left, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(operator, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, CompileError> {
        let mut left = self.parse_unary()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Remainder,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(operator, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, CompileError> {
        let location = self.location();

        // Prefix increment/decrement
        let update = match &self.current.kind {
            TokenKind::PlusPlus => Some(UpdateOperator::Increment),
            TokenKind::MinusMinus => Some(UpdateOperator::Decrement),
            _ => None,
        };
        if let Some(operator) = update {
            self.advance();
            let target = self.expect_identifier()?;
            return Ok(Expression::Update(UpdateExpression {
                operator,
                prefix: true,
                target,
                location,
            }));
        }

        let operator = match &self.current.kind {
            TokenKind::Bang => Some(UnaryOperator::Not),
            TokenKind::Minus => Some(UnaryOperator::Minus),
            _ => None,
        };

        if let Some(operator) = operator {
            self.advance();
            let operand = self.nested(Self::parse_unary)?;
            return Ok(Expression::Unary(UnaryExpression {
                operator,
                operand: Box::new(operand),
                location,
            }));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression, CompileError> {
        let expr = self.parse_primary()?;

        let operator = match &self.current.kind {
            TokenKind::PlusPlus => UpdateOperator::Increment,
            TokenKind::MinusMinus => UpdateOperator::Decrement,
            _ => return Ok(expr),
        };

        let Expression::Variable(target) = expr else {
            return Err(self.error("Invalid update target"));
        };
        self.advance();

        Ok(Expression::Update(UpdateExpression {
            operator,
            prefix: false,
            target: target.name,
            location: target.location,
        }))
    }

    fn parse_primary(&mut self) -> Result<Expression, CompileError> {
        let location = self.location();
        let value = match &self.current.kind {
            TokenKind::Integer(n) => LiteralValue::Integer(*n),
            TokenKind::Decimal(n) => LiteralValue::Decimal(*n),
            TokenKind::String(s) => LiteralValue::String(s.clone()),
            TokenKind::True => LiteralValue::Boolean(true),
            TokenKind::False => LiteralValue::Boolean(false),
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                return Ok(Expression::Variable(Variable { name, location }));
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                return Ok(expr);
            }
            _ => {
                return Err(self.error(&format!(
                    "Expected an expression, found {}",
                    self.current.kind
                )));
            }
        };
        self.advance();

        Ok(Expression::Literal(Literal { value, location }))
    }

    // Helper methods

    fn advance(&mut self) {
        self.current = self.scanner.next_token();
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), CompileError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("Expected '{}', found '{}'", kind, self.current.kind)))
        }
    }

    /// Consumes the `;` ending a statement. The last statement of a script
    /// may omit it.
    fn end_statement(&mut self) -> Result<(), CompileError> {
        if self.is_at_end() {
            Ok(())
        } else {
            self.expect(&TokenKind::Semicolon)
        }
    }

    fn expect_identifier(&mut self) -> Result<String, CompileError> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(&format!(
                "Expected identifier, found '{}'",
                self.current.kind
            )))
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    fn location(&self) -> Location {
        self.lines.location(self.current.span.start)
    }

    /// Runs `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn error(&self, message: &str) -> CompileError {
        CompileError::Syntax {
            message: message.to_string(),
            location: self.location(),
        }
    }
}

fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    let location = left.location();
    Expression::Binary(BinaryExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
        location,
    })
}

fn comparison(operator: ComparisonOperator, left: Expression, right: Expression) -> Expression {
    let location = left.location();
    Expression::Comparison(ComparisonExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
        location,
    })
}
