// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loop legality, control-flow facts and loop code generation.

use proptest::prelude::*;
use sable_engine::analysis::Analyzer;
use sable_engine::analysis::tree::{StatementKind, TypedProgram, TypedStatement};
use sable_engine::compiler::{OpCode, Operand};
use sable_engine::freevars::{self, FreeVariables};
use sable_engine::parser::Parser;
use sable_engine::{CompilerSettings, Engine, Param, SemanticErrorKind, Type};

fn params() -> Vec<Param> {
    vec![Param::new("n", Type::Int), Param::new("flag", Type::Boolean)]
}

fn analyze(src: &str) -> Result<TypedProgram, sable_engine::SemanticError> {
    let program = Parser::new(src).parse_program().expect("source should parse");
    Analyzer::new().analyze_program(&program, &params(), &CompilerSettings::default())
}

fn error_kind(src: &str) -> SemanticErrorKind {
    match analyze(src) {
        Ok(_) => panic!("expected `{}` to be rejected", src),
        Err(err) => err.kind,
    }
}

fn first_loop(program: &TypedProgram) -> &TypedStatement {
    program
        .statements
        .iter()
        .find(|s| matches!(s.kind, StatementKind::While(_) | StatementKind::DoWhile(_) | StatementKind::For(_)))
        .expect("script should contain a loop")
}

#[test]
fn test_counting_loop_scenario() {
    let program = analyze("int x = 0; while (x < 10) { x = x + 1; }").unwrap();
    let StatementKind::While(node) = &first_loop(&program).kind else {
        panic!("expected a while loop");
    };
    let body = node.body.as_ref().unwrap();
    assert!(!body.facts.loop_escape);
    assert!(!body.facts.any_break);
    assert!(!body.facts.any_continue);

    let result = Engine::default()
        .eval("int x = 0; while (x < 10) { x = x + 1; } return x;")
        .unwrap();
    assert_eq!(result, sable_engine::Value::Int(10));
}

#[test]
fn test_infinite_loop_with_conditional_break() {
    let program = analyze("int x = 0; while (true) { x++; if (x > 3) { break; } } return x;").unwrap();
    let statement = first_loop(&program);
    let StatementKind::While(node) = &statement.kind else {
        panic!("expected a while loop");
    };
    assert!(node.body.as_ref().unwrap().facts.any_break);
    // The statement after the loop stays reachable
    assert!(!statement.facts.all_escape);
    assert!(!statement.facts.method_escape);
}

#[test]
fn test_unconditional_break_is_extraneous() {
    assert_eq!(error_kind("while (true) { break; }"), SemanticErrorKind::ExtraneousLoop);
}

#[test]
fn test_scenario_errors() {
    assert_eq!(error_kind("int x = 0; while (false) { x = 1; }"), SemanticErrorKind::DeadLoop);
    assert_eq!(error_kind("while (true) {}"), SemanticErrorKind::NoEscape);
    assert_eq!(error_kind("for (;;) {}"), SemanticErrorKind::NoEscape);
    assert_eq!(error_kind("int x = 0; do { x++; } while (false);"), SemanticErrorKind::DeadLoop);
    assert_eq!(error_kind("int x = 0; for (; false; ) { x++; }"), SemanticErrorKind::DeadLoop);
    assert_eq!(error_kind("while (flag) { continue; }"), SemanticErrorKind::ExtraneousContinue);
    assert_eq!(
        error_kind("int x = 0; while (true) { x++; } return x;"),
        SemanticErrorKind::UnreachableStatement
    );
}

#[test]
fn test_infinite_loop_without_break_escapes_method() {
    let program = analyze("int x = 0; while (true) { x++; if (x > n) { return x; } }").unwrap();
    let facts = first_loop(&program).facts;
    assert!(facts.all_escape);
    assert!(facts.method_escape);
    assert!(program.facts.all_escape);
}

#[test]
fn test_analysis_is_idempotent() {
    let src = "int s = 0; for (int i = 0; i < n; i++) { int j = 0; while (j < i) { j++; if (flag) { continue; } s += j; } } return s;";
    assert_eq!(analyze(src).unwrap(), analyze(src).unwrap());
}

#[test]
fn test_escaping_body_has_no_back_edge() {
    let engine = Engine::default();
    let script = engine
        .compile_with_params(
            "int x = 0; while (x < n) { x++; if (flag) { continue; } return x; } return -1;",
            &params(),
        )
        .unwrap();
    let bytecode = script.bytecode();
    let budget = bytecode
        .instructions
        .iter()
        .position(|i| i.opcode == OpCode::LoopBudget)
        .unwrap();
    // The loop top is the first instruction of the condition
    let loop_top = budget - 3;
    let jumps_to_top = bytecode
        .instructions
        .iter()
        .filter(|i| i.opcode == OpCode::Jump && i.operand == Some(Operand::Jump(loop_top)))
        .count();
    // Only the `continue` jumps back
    assert_eq!(jumps_to_top, 1);
}

#[test]
fn test_free_variables_of_loop() {
    let program = Parser::new("while (x < n) { int y = x; x = y + 1; }")
        .parse_program()
        .unwrap();
    let free = freevars::collect(&program);
    let mut names: Vec<_> = free.into_iter().collect();
    names.sort();
    assert_eq!(names, vec!["n".to_string(), "x".to_string()]);

    let sable_engine::ast::Statement::While(node) = &program.statements[0] else {
        panic!("expected a while loop");
    };
    assert_eq!(node.free_variables().len(), 2);
}

fn dead_condition() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("false"),
        Just("1 > 2"),
        Just("!true"),
        Just("3 == 4 && 1 < 2"),
        Just("2.5 < 1"),
    ]
}

fn body_statement() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("x++;"),
        Just("x = x + n;"),
        Just("if (flag) { x--; }"),
        Just("x = x * 2;"),
    ]
}

proptest! {
    #[test]
    fn prop_constant_false_loops_are_dead(
        condition in dead_condition(),
        body in prop::collection::vec(body_statement(), 0..4),
        form in 0..3usize,
    ) {
        let body = body.concat();
        let src = match form {
            0 => format!("int x = 0; while ({}) {{ {} }}", condition, body),
            1 => format!("int x = 0; for (; {}; ) {{ {} }}", condition, body),
            _ => format!("int x = 0; do {{ x++; {} }} while ({});", body, condition),
        };
        prop_assert_eq!(error_kind(&src), SemanticErrorKind::DeadLoop);
    }

    #[test]
    fn prop_escaping_bodies_are_extraneous(
        prefix in prop::collection::vec(body_statement(), 0..3),
        exit in prop_oneof![Just("break;"), Just("return x;"), Just("throw 'stop';")],
    ) {
        let src = format!("int x = 0; while (x < n) {{ {} {} }} return x;", prefix.concat(), exit);
        prop_assert_eq!(error_kind(&src), SemanticErrorKind::ExtraneousLoop);
    }

    #[test]
    fn prop_loop_weight_counts_body_statements(
        body in prop::collection::vec(body_statement(), 1..8),
    ) {
        let src = format!("int x = 0; while (x < n) {{ {} x++; }} return x;", body.concat());
        let program = analyze(&src).unwrap();
        let StatementKind::While(node) = &first_loop(&program).kind else {
            panic!("expected a while loop");
        };
        prop_assert_eq!(node.weight as usize, body.len() + 1);
        prop_assert_eq!(first_loop(&program).facts.statement_count, 1);
    }
}
