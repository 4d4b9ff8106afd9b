// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loop legality and loop facts.
//!
//! All three loop forms share one algebra:
//!
//! - a constant-false condition is a dead loop;
//! - a constant-true condition without a body can never be left;
//! - a body that always leaves the loop without ever continuing makes the
//!   loop pointless;
//! - a constant-true loop without any `break` never completes normally, so
//!   it escapes the whole routine.
//!
//! Each loop is charged `max(1, body statements)` against the budget per
//! iteration; the loop itself counts as a single statement for the
//! enclosing loop.

use super::tree::{
    DoWhileLoop, ForLoop, StatementKind, TypedBlock, TypedForInitializer, TypedStatement,
    WhileLoop,
};
use super::{Analyzer, Expected, Facts, StatementContext};
use crate::ast::*;
use crate::error::{SemanticError, SemanticErrorKind};
use crate::scope::Locals;
use tracing::trace;

impl Analyzer {
    /// Analyzes a `while` loop.
    pub fn analyze_while(
        &mut self,
        stmt: &WhileStatement,
        locals: &mut Locals,
        _context: StatementContext,
    ) -> Result<TypedStatement, SemanticError> {
        let error = |kind, message: &str| SemanticError::new(kind, stmt.location, message);

        // Condition and body share one frame; nothing declared here leaks
        locals.push_scope();

        let condition = self.analyze_condition(&stmt.condition, locals)?;

        let continuous = match condition.constant_bool() {
            Some(false) => {
                return Err(error(SemanticErrorKind::DeadLoop, "Extraneous while loop."));
            }
            Some(true) if stmt.body.is_none() => {
                return Err(error(SemanticErrorKind::NoEscape, "While loop has no escape."));
            }
            Some(true) => true,
            None => false,
        };

        let body = match &stmt.body {
            Some(block) => {
                let body = self.analyze_loop_body(block, locals)?;
                if body.facts.loop_escape && !body.facts.any_continue {
                    return Err(error(SemanticErrorKind::ExtraneousLoop, "Extraneous while loop."));
                }
                Some(body)
            }
            None => None,
        };

        let facts = loop_facts(continuous, body.as_ref());
        let weight = loop_weight(body.as_ref());
        let budget_slot = locals.budget_counter_slot();

        locals.pop_scope();
        self.loops += 1;
        trace!(kind = "while", line = stmt.location.line, weight, ?facts, "analyzed loop");

        Ok(TypedStatement {
            kind: StatementKind::While(WhileLoop {
                condition,
                body,
                weight,
                budget_slot,
            }),
            facts,
            location: stmt.location,
        })
    }

    /// Analyzes a `do ... while` loop.
    pub fn analyze_do_while(
        &mut self,
        stmt: &DoWhileStatement,
        locals: &mut Locals,
        _context: StatementContext,
    ) -> Result<TypedStatement, SemanticError> {
        let error = |kind, message: &str| SemanticError::new(kind, stmt.location, message);

        locals.push_scope();

        let Some(block) = &stmt.body else {
            return Err(error(SemanticErrorKind::ExtraneousLoop, "Extraneous do while loop."));
        };

        let body = self.analyze_loop_body(block, locals)?;
        if body.facts.loop_escape && !body.facts.any_continue {
            return Err(error(SemanticErrorKind::ExtraneousLoop, "Extraneous do while loop."));
        }

        let condition = self.analyze_condition(&stmt.condition, locals)?;
        let continuous = match condition.constant_bool() {
            Some(false) => {
                return Err(error(SemanticErrorKind::DeadLoop, "Extraneous do while loop."));
            }
            Some(true) => true,
            None => false,
        };

        let facts = loop_facts(continuous, Some(&body));
        let weight = loop_weight(Some(&body));
        let budget_slot = locals.budget_counter_slot();

        locals.pop_scope();
        self.loops += 1;
        trace!(kind = "do-while", line = stmt.location.line, weight, ?facts, "analyzed loop");

        Ok(TypedStatement {
            kind: StatementKind::DoWhile(DoWhileLoop {
                body,
                condition,
                weight,
                budget_slot,
            }),
            facts,
            location: stmt.location,
        })
    }

    /// Analyzes a `for` loop.
    pub fn analyze_for(
        &mut self,
        stmt: &ForStatement,
        locals: &mut Locals,
        _context: StatementContext,
    ) -> Result<TypedStatement, SemanticError> {
        let error = |kind, message: &str| SemanticError::new(kind, stmt.location, message);

        // The initializer's declarations are visible to the whole loop
        locals.push_scope();

        let initializer = match &stmt.initializer {
            Some(ForInitializer::Declaration(decl)) => Some(TypedForInitializer::Declaration(
                self.analyze_declaration(decl, locals)?,
            )),
            Some(ForInitializer::Expression(expr)) => {
                require_statement(expr)?;
                Some(TypedForInitializer::Expression(self.analyze_expression(
                    expr,
                    Expected::Any,
                    locals,
                )?))
            }
            None => None,
        };

        let condition = match &stmt.condition {
            Some(condition) => Some(self.analyze_condition(condition, locals)?),
            None => None,
        };

        // An absent condition is always true
        let continuous = match condition.as_ref().map(|c| c.constant_bool()) {
            Some(Some(false)) => {
                return Err(error(SemanticErrorKind::DeadLoop, "Extraneous for loop."));
            }
            Some(Some(true)) | None => true,
            Some(None) => false,
        };
        if continuous && stmt.body.is_none() {
            return Err(error(SemanticErrorKind::NoEscape, "For loop has no escape."));
        }

        let afterthought = match &stmt.afterthought {
            Some(expr) => {
                require_statement(expr)?;
                Some(self.analyze_expression(expr, Expected::Any, locals)?)
            }
            None => None,
        };

        let body = match &stmt.body {
            Some(block) => {
                let body = self.analyze_loop_body(block, locals)?;
                if body.facts.loop_escape && !body.facts.any_continue {
                    return Err(error(SemanticErrorKind::ExtraneousLoop, "Extraneous for loop."));
                }
                Some(body)
            }
            None => None,
        };

        let facts = loop_facts(continuous, body.as_ref());
        // The afterthought runs every iteration too
        let weight = match &body {
            Some(_) if afterthought.is_some() => loop_weight(body.as_ref()).saturating_add(1),
            _ => loop_weight(body.as_ref()),
        };
        let budget_slot = locals.budget_counter_slot();

        locals.pop_scope();
        self.loops += 1;
        trace!(kind = "for", line = stmt.location.line, weight, ?facts, "analyzed loop");

        Ok(TypedStatement {
            kind: StatementKind::For(ForLoop {
                initializer,
                condition,
                afterthought,
                body,
                weight,
                budget_slot,
            }),
            facts,
            location: stmt.location,
        })
    }

    fn analyze_loop_body(
        &mut self,
        block: &Block,
        locals: &mut Locals,
    ) -> Result<TypedBlock, SemanticError> {
        self.analyze_block(block, locals, StatementContext::loop_body())
    }
}

/// Facts of a loop statement.
fn loop_facts(continuous: bool, body: Option<&TypedBlock>) -> Facts {
    let mut facts = Facts::single();
    if continuous && body.is_some_and(|body| !body.facts.any_break) {
        facts.method_escape = true;
        facts.all_escape = true;
    }
    facts
}

/// Budget charged per iteration.
fn loop_weight(body: Option<&TypedBlock>) -> u32 {
    body.map_or(1, |body| body.facts.statement_count.max(1))
}

fn require_statement(expr: &Expression) -> Result<(), SemanticError> {
    if expr.is_statement_expression() {
        Ok(())
    } else {
        Err(SemanticError::new(
            SemanticErrorKind::NotAStatement,
            expr.location(),
            "Not a statement.",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tree::{ExpressionKind, TypedProgram};
    use crate::location::Location;
    use crate::parser::Parser;
    use crate::settings::CompilerSettings;

    fn analyze_with(src: &str, settings: CompilerSettings) -> Result<TypedProgram, SemanticError> {
        let program = Parser::new(src).parse_program().unwrap();
        Analyzer::new().analyze_program(&program, &[], &settings)
    }

    fn analyze(src: &str) -> Result<TypedProgram, SemanticError> {
        analyze_with(src, CompilerSettings::default())
    }

    fn analyze_err(src: &str) -> SemanticError {
        analyze(src).unwrap_err()
    }

    fn first_loop(program: &TypedProgram) -> &TypedStatement {
        program
            .statements
            .iter()
            .find(|s| {
                matches!(
                    s.kind,
                    StatementKind::While(_) | StatementKind::DoWhile(_) | StatementKind::For(_)
                )
            })
            .unwrap()
    }

    fn while_loop(program: &TypedProgram) -> &WhileLoop {
        match &first_loop(program).kind {
            StatementKind::While(w) => w,
            _ => panic!("expected while"),
        }
    }

    #[test]
    fn test_dead_loop() {
        let err = analyze_err("while (false) { int x = 1; }");
        assert_eq!(err.kind, SemanticErrorKind::DeadLoop);
        assert_eq!(err.message, "Extraneous while loop.");
        assert_eq!(err.location, Location::new(0, 1, 1));
    }

    #[test]
    fn test_folded_false_condition_is_dead() {
        let err = analyze_err("while (1 > 2) { int x = 1; }");
        assert_eq!(err.kind, SemanticErrorKind::DeadLoop);
    }

    #[test]
    fn test_no_escape() {
        for src in ["while (true) {}", "while (true);"] {
            let err = analyze_err(src);
            assert_eq!(err.kind, SemanticErrorKind::NoEscape, "{src}");
            assert_eq!(err.message, "While loop has no escape.");
        }
    }

    #[test]
    fn test_extraneous_loop() {
        let err = analyze_err("int x = 0; while (x < 10) { break; }");
        assert_eq!(err.kind, SemanticErrorKind::ExtraneousLoop);
        assert_eq!(err.message, "Extraneous while loop.");

        let err = analyze_err("int x = 0; while (x < 10) { return 1; }");
        assert_eq!(err.kind, SemanticErrorKind::ExtraneousLoop);
    }

    #[test]
    fn test_escape_with_continue_is_legal() {
        let program =
            analyze("int x = 0; while (x < 10) { x++; if (x < 5) { continue; } break; }").unwrap();
        assert!(while_loop(&program).body.is_some());
    }

    #[test]
    fn test_type_mismatch_condition() {
        let err = analyze_err("int x = 1; while (x) { x = 0; }");
        assert_eq!(err.kind, SemanticErrorKind::TypeMismatch);
    }

    #[test]
    fn test_infinite_loop_escapes_method() {
        let program = analyze("int x = 0; while (true) { x++; }").unwrap();
        let facts = first_loop(&program).facts;
        assert!(facts.method_escape);
        assert!(facts.all_escape);
        assert!(!facts.loop_escape);
        assert_eq!(facts.statement_count, 1);
    }

    #[test]
    fn test_statement_after_infinite_loop_is_unreachable() {
        let err = analyze_err("int x = 0; while (true) { x++; } x = 1;");
        assert_eq!(err.kind, SemanticErrorKind::UnreachableStatement);
    }

    #[test]
    fn test_infinite_loop_with_break_completes() {
        let program = analyze(
            "int x = 0; while (true) { x++; if (x > 3) { break; } } return x;",
        )
        .unwrap();
        let facts = first_loop(&program).facts;
        assert!(!facts.method_escape);
        assert!(!facts.all_escape);
    }

    #[test]
    fn test_weight_counts_body_statements() {
        let program = analyze("int x = 0; int y = 0; while (x < 5) { x++; y += 2; x += 0; }").unwrap();
        assert_eq!(while_loop(&program).weight, 3);
    }

    #[test]
    fn test_weight_of_empty_body_is_one() {
        let program = analyze("int x = 0; while (x++ < 5);").unwrap();
        let w = while_loop(&program);
        assert!(w.body.is_none());
        assert_eq!(w.weight, 1);
    }

    #[test]
    fn test_nested_loop_counts_as_one_statement() {
        let program = analyze(
            "int i = 0; while (i < 3) { int j = 0; while (j < 3) { j++; j += 0; } i++; }",
        )
        .unwrap();
        let outer = while_loop(&program);
        // int j, inner loop, i++
        assert_eq!(outer.weight, 3);
    }

    #[test]
    fn test_budget_slot_shared_and_allocated_after_variables() {
        let program = analyze(
            "int i = 0; while (i < 3) { int j = 0; while (j < 3) { j++; } i++; }",
        )
        .unwrap();
        let outer = while_loop(&program);
        let StatementKind::While(inner) = &outer.body.as_ref().unwrap().statements[1].kind else {
            panic!("expected inner while");
        };
        assert!(outer.budget_slot.is_some());
        assert_eq!(outer.budget_slot, inner.budget_slot);
        assert_eq!(program.budget_slot, outer.budget_slot);
        // i = 0, j = 1, counter = 2
        assert_eq!(program.budget_slot, Some(2));
    }

    #[test]
    fn test_budget_disabled() {
        let program = analyze_with(
            "int i = 0; while (i < 3) { i++; }",
            CompilerSettings::default().with_max_loop_counter(0),
        )
        .unwrap();
        assert_eq!(while_loop(&program).budget_slot, None);
        assert_eq!(program.budget_slot, None);
    }

    #[test]
    fn test_condition_constant_true_emits_no_test() {
        let program = analyze("int x = 0; while (true) { x++; if (x > 3) { break; } }").unwrap();
        assert!(matches!(
            while_loop(&program).condition.kind,
            ExpressionKind::Constant(_)
        ));
    }

    #[test]
    fn test_body_declarations_do_not_leak() {
        let err = analyze_err("int x = 0; while (x < 1) { int y = 1; x = y; } x = y;");
        assert_eq!(err.kind, SemanticErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_extraneous_continue() {
        let err = analyze_err("int x = 0; while (x < 3) { x++; continue; }");
        assert_eq!(err.kind, SemanticErrorKind::ExtraneousContinue);
    }

    #[test]
    fn test_extraneous_continue_in_last_if() {
        let err = analyze_err("int x = 0; while (x < 3) { x++; if (x > 1) { continue; } }");
        assert_eq!(err.kind, SemanticErrorKind::ExtraneousContinue);
    }

    #[test]
    fn test_do_while_rules() {
        assert_eq!(
            analyze_err("int x = 0; do { x++; } while (false);").kind,
            SemanticErrorKind::DeadLoop
        );
        assert_eq!(
            analyze_err("int x = 0; do {} while (x < 3);").kind,
            SemanticErrorKind::ExtraneousLoop
        );
        assert_eq!(
            analyze_err("int x = 0; do { break; } while (x < 3);").message,
            "Extraneous do while loop."
        );
        let program = analyze("int x = 0; do { x++; x += 0; } while (x < 3);").unwrap();
        let StatementKind::DoWhile(d) = &first_loop(&program).kind else {
            panic!("expected do-while");
        };
        assert_eq!(d.weight, 2);
    }

    #[test]
    fn test_for_rules() {
        assert_eq!(
            analyze_err("for (int i = 0; false; i++) { i += 0; }").kind,
            SemanticErrorKind::DeadLoop
        );
        assert_eq!(analyze_err("for (;;) {}").kind, SemanticErrorKind::NoEscape);
        assert_eq!(
            analyze_err("int x = 0; for (; x < 3; x + 1) { x++; }").kind,
            SemanticErrorKind::NotAStatement
        );
        assert_eq!(
            analyze_err("for (int i = 0; i < 3; i++) { break; }").kind,
            SemanticErrorKind::ExtraneousLoop
        );
    }

    #[test]
    fn test_for_weight_includes_afterthought() {
        let program = analyze("int s = 0; for (int i = 0; i < 3; i++) { s += i; }").unwrap();
        let StatementKind::For(f) = &first_loop(&program).kind else {
            panic!("expected for");
        };
        assert_eq!(f.weight, 2);
    }

    #[test]
    fn test_for_without_condition_escapes_method() {
        let program = analyze("int x = 0; for (;;) { x++; }").unwrap();
        assert!(first_loop(&program).facts.method_escape);
    }

    #[test]
    fn test_for_initializer_scoped_to_loop() {
        let err = analyze_err("for (int i = 0; i < 3; i++) { i += 0; } i = 1;");
        assert_eq!(err.kind, SemanticErrorKind::UndefinedVariable);
    }
}
