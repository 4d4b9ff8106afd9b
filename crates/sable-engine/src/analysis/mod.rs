// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Semantic analysis.
//!
//! The [`Analyzer`] walks the parse tree once, bottom-up, and produces the
//! annotated tree in [`tree`]. Along the way it resolves variables through
//! [`Locals`], types and folds expressions, computes the control-flow
//! [`Facts`] of every statement, and rejects illegal control flow such as
//! dead loops, loops without an escape and unreachable statements.
//!
//! ## Structure
//!
//! - `facts.rs` - `Facts` and the rules for combining them
//! - `expr.rs` - Expression typing, implicit casts and constant folding
//! - `loops.rs` - `while`, `do ... while` and `for` legality
//! - `tree.rs` - The annotated tree handed to the code generator

mod expr;
mod facts;
mod loops;
pub mod tree;

pub use expr::Expected;
pub use facts::Facts;

use crate::Param;
use crate::ast::*;
use crate::error::{SemanticError, SemanticErrorKind};
use crate::location::Location;
use crate::scope::Locals;
use crate::settings::CompilerSettings;
use tree::{StatementKind, TypedBlock, TypedDeclarator, TypedProgram, TypedStatement};

/// Where a statement sits relative to the enclosing loop and script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatementContext {
    /// Inside the body of some loop
    pub in_loop: bool,
    /// This block is a loop body
    pub begin_loop: bool,
    /// Last statement of a loop body
    pub last_loop: bool,
    /// Last statement of the script
    pub last_source: bool,
}

impl StatementContext {
    /// The context of a loop body.
    pub fn loop_body() -> Self {
        Self {
            in_loop: true,
            begin_loop: true,
            last_loop: false,
            last_source: false,
        }
    }
}

/// Semantic analyzer. One instance is used per compilation.
#[derive(Debug, Default)]
pub struct Analyzer {
    loops: usize,
}

impl Analyzer {
    /// Creates a new analyzer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of loops analyzed so far.
    pub fn loop_count(&self) -> usize {
        self.loops
    }

    /// Analyzes a whole script. Host parameters occupy the first slots.
    pub fn analyze_program(
        &mut self,
        program: &Program,
        params: &[Param],
        settings: &CompilerSettings,
    ) -> Result<TypedProgram, SemanticError> {
        let mut locals = Locals::new(settings.max_loop_counter);
        for param in params {
            locals.declare_parameter(&param.name, param.ty, Location::default())?;
        }

        let context = StatementContext {
            last_source: true,
            ..StatementContext::default()
        };
        let (statements, facts) = self.analyze_statements(&program.statements, &mut locals, context)?;

        Ok(TypedProgram {
            statements,
            facts,
            params: params.iter().map(|p| p.ty).collect(),
            slot_count: locals.slot_count(),
            budget_slot: locals.budget_counter().map(|counter| counter.slot),
            max_loop_counter: locals.max_loop_counter(),
        })
    }

    /// Analyzes a block in its own frame.
    pub fn analyze_block(
        &mut self,
        block: &Block,
        locals: &mut Locals,
        context: StatementContext,
    ) -> Result<TypedBlock, SemanticError> {
        locals.push_scope();
        let (statements, facts) = self.analyze_statements(&block.statements, locals, context)?;
        locals.pop_scope();

        Ok(TypedBlock { statements, facts })
    }

    fn analyze_statements(
        &mut self,
        statements: &[Statement],
        locals: &mut Locals,
        context: StatementContext,
    ) -> Result<(Vec<TypedStatement>, Facts), SemanticError> {
        let mut facts = Facts::default();
        let mut typed = Vec::with_capacity(statements.len());
        let last = statements.len().saturating_sub(1);

        for (index, statement) in statements.iter().enumerate() {
            if facts.all_escape {
                return Err(SemanticError::new(
                    SemanticErrorKind::UnreachableStatement,
                    statement.location(),
                    "Unreachable statement.",
                ));
            }

            let is_last = index == last;
            let inner = StatementContext {
                in_loop: context.in_loop,
                begin_loop: false,
                last_loop: (context.begin_loop || context.last_loop) && is_last,
                last_source: context.last_source && is_last,
            };

            let statement = self.analyze_statement(statement, locals, inner)?;
            facts = facts.then(statement.facts);
            typed.push(statement);
        }

        Ok((typed, facts))
    }

    /// Analyzes a single statement.
    pub fn analyze_statement(
        &mut self,
        statement: &Statement,
        locals: &mut Locals,
        context: StatementContext,
    ) -> Result<TypedStatement, SemanticError> {
        let location = statement.location();
        let (kind, facts) = match statement {
            Statement::Declaration(decl) => (
                StatementKind::Declaration(self.analyze_declaration(decl, locals)?),
                Facts::single(),
            ),
            Statement::Expression(stmt) => {
                if !context.last_source && !stmt.expression.is_statement_expression() {
                    return Err(SemanticError::new(
                        SemanticErrorKind::NotAStatement,
                        location,
                        "Not a statement.",
                    ));
                }
                let expr = self.analyze_expression(&stmt.expression, Expected::Any, locals)?;
                // The last expression of a script is its result
                if context.last_source {
                    (StatementKind::Return(Some(expr)), Facts::returning())
                } else {
                    (StatementKind::Expression(expr), Facts::single())
                }
            }
            Statement::Block(block) => {
                let block = self.analyze_block(block, locals, context)?;
                let facts = block.facts;
                (StatementKind::Block(block), facts)
            }
            Statement::If(stmt) => self.analyze_if(stmt, locals, context)?,
            Statement::While(stmt) => return self.analyze_while(stmt, locals, context),
            Statement::DoWhile(stmt) => return self.analyze_do_while(stmt, locals, context),
            Statement::For(stmt) => return self.analyze_for(stmt, locals, context),
            Statement::Break(_) => {
                if !context.in_loop {
                    return Err(SemanticError::new(
                        SemanticErrorKind::BreakOutsideLoop,
                        location,
                        "Break statement outside of a loop.",
                    ));
                }
                (StatementKind::Break, Facts::breaking())
            }
            Statement::Continue(_) => {
                if !context.in_loop {
                    return Err(SemanticError::new(
                        SemanticErrorKind::ContinueOutsideLoop,
                        location,
                        "Continue statement outside of a loop.",
                    ));
                }
                if context.last_loop {
                    return Err(SemanticError::new(
                        SemanticErrorKind::ExtraneousContinue,
                        location,
                        "Extraneous continue statement.",
                    ));
                }
                (StatementKind::Continue, Facts::continuing())
            }
            Statement::Return(stmt) => {
                let value = match &stmt.value {
                    Some(value) => Some(self.analyze_expression(value, Expected::Any, locals)?),
                    None => None,
                };
                (StatementKind::Return(value), Facts::returning())
            }
            Statement::Throw(stmt) => {
                let value = self.analyze_expression(&stmt.value, Expected::Any, locals)?;
                (StatementKind::Throw(value), Facts::returning())
            }
        };

        Ok(TypedStatement {
            kind,
            facts,
            location,
        })
    }

    fn analyze_declaration(
        &mut self,
        decl: &Declaration,
        locals: &mut Locals,
    ) -> Result<Vec<TypedDeclarator>, SemanticError> {
        let mut declarators = Vec::with_capacity(decl.declarators.len());

        for declarator in &decl.declarators {
            // The initializer is analyzed before the name becomes visible
            let init = match &declarator.init {
                Some(init) => Some(self.analyze_expression(init, Expected::Type(decl.ty), locals)?),
                None => None,
            };
            let slot = locals.declare(&declarator.name, decl.ty, declarator.location)?;
            declarators.push(TypedDeclarator {
                slot,
                ty: decl.ty,
                init,
            });
        }

        Ok(declarators)
    }

    fn analyze_if(
        &mut self,
        stmt: &IfStatement,
        locals: &mut Locals,
        context: StatementContext,
    ) -> Result<(StatementKind, Facts), SemanticError> {
        let condition = self.analyze_condition(&stmt.condition, locals)?;

        let extraneous = |message: &str| {
            SemanticError::new(SemanticErrorKind::ExtraneousIf, stmt.location, message)
        };

        if condition.constant.is_some() {
            return Err(extraneous("Extraneous if statement."));
        }
        let Some(then_block) = &stmt.then_block else {
            return Err(extraneous("Extraneous if statement."));
        };

        let branch = StatementContext {
            begin_loop: false,
            ..context
        };
        let then_block = self.analyze_block(then_block, locals, branch)?;

        let (else_block, facts) = match &stmt.else_block {
            None => (None, Facts::conditional(then_block.facts)),
            Some(None) => return Err(extraneous("Extraneous else statement.")),
            Some(Some(block)) => {
                let else_block = self.analyze_block(block, locals, branch)?;
                let facts = Facts::either(then_block.facts, else_block.facts);
                (Some(else_block), facts)
            }
        };

        Ok((
            StatementKind::If {
                condition,
                then_block,
                else_block,
            },
            facts,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn analyze(src: &str) -> Result<TypedProgram, SemanticError> {
        let program = Parser::new(src).parse_program().unwrap();
        Analyzer::new().analyze_program(&program, &[], &CompilerSettings::default())
    }

    fn analyze_err(src: &str) -> SemanticErrorKind {
        analyze(src).unwrap_err().kind
    }

    #[test]
    fn test_unreachable_after_return() {
        assert_eq!(
            analyze_err("return 1; int x = 2;"),
            SemanticErrorKind::UnreachableStatement
        );
    }

    #[test]
    fn test_break_outside_loop() {
        assert_eq!(analyze_err("break;"), SemanticErrorKind::BreakOutsideLoop);
        assert_eq!(analyze_err("continue;"), SemanticErrorKind::ContinueOutsideLoop);
    }

    #[test]
    fn test_not_a_statement() {
        assert_eq!(
            analyze_err("int x = 1; x + 1; x = 2;"),
            SemanticErrorKind::NotAStatement
        );
    }

    #[test]
    fn test_last_expression_is_result() {
        let program = analyze("int x = 1; x + 1").unwrap();
        assert!(program.facts.method_escape);
        assert!(matches!(
            program.statements[1].kind,
            StatementKind::Return(Some(_))
        ));
    }

    #[test]
    fn test_extraneous_if() {
        assert_eq!(analyze_err("if (true) { return 1; }"), SemanticErrorKind::ExtraneousIf);
        assert_eq!(analyze_err("int x = 0; if (x < 1) {}"), SemanticErrorKind::ExtraneousIf);
        assert_eq!(
            analyze_err("int x = 0; if (x < 1) { x = 1; } else {}"),
            SemanticErrorKind::ExtraneousIf
        );
    }

    #[test]
    fn test_if_else_escape_needs_both_branches() {
        let program = analyze("int x = 0; if (x < 1) { return 1; } else { return 2; }").unwrap();
        assert!(program.facts.method_escape);
        assert!(program.facts.all_escape);

        let program = analyze("int x = 0; if (x < 1) { return 1; } x = 3;").unwrap();
        assert!(!program.statements[1].facts.all_escape);
    }

    #[test]
    fn test_duplicate_declaration() {
        assert_eq!(
            analyze_err("int x = 1; { int x = 2; }"),
            SemanticErrorKind::DuplicateVariable
        );
    }

    #[test]
    fn test_initializer_cannot_see_own_name() {
        assert_eq!(analyze_err("int x = x;"), SemanticErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_declaration_type_mismatch() {
        assert_eq!(analyze_err("int x = 1.5;"), SemanticErrorKind::TypeMismatch);
        assert!(analyze("double d = 1;").is_ok());
    }

    #[test]
    fn test_error_location() {
        let err = analyze("int x = 0;\nreturn x;\nx = 1;").unwrap_err();
        assert_eq!(err.location.line, 3);
        assert_eq!(err.location.column, 1);
    }

    #[test]
    fn test_params_occupy_first_slots() {
        let program = Parser::new("int y = n; return y;").parse_program().unwrap();
        let params = [Param::new("n", crate::types::Type::Int)];
        let typed = Analyzer::new()
            .analyze_program(&program, &params, &CompilerSettings::default())
            .unwrap();
        assert_eq!(typed.slot_count, 2);
        let StatementKind::Declaration(decls) = &typed.statements[0].kind else {
            panic!("expected declaration");
        };
        assert_eq!(decls[0].slot, 1);
    }
}
