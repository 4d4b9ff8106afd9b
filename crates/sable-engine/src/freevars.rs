// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Free-variable collection over the parse tree.
//!
//! A variable is free in a subtree when it is referenced there without a
//! preceding declaration in the same subtree. Collection is purely
//! syntactic: it never consults [`Locals`](crate::scope::Locals) and never
//! fails.

use crate::ast::*;
use rustc_hash::FxHashSet;

/// Collects the free variables of a whole script.
pub fn collect(program: &Program) -> FxHashSet<String> {
    let mut collector = Collector::default();
    collector.push();
    for statement in &program.statements {
        statement.collect_into(&mut collector);
    }
    collector.free
}

/// Tree nodes that can report the variables they reference from outside.
pub trait FreeVariables {
    /// Adds this node's references to `collector`.
    fn collect_into(&self, collector: &mut Collector);

    /// Returns the free variables of this node.
    fn free_variables(&self) -> FxHashSet<String> {
        let mut collector = Collector::default();
        collector.push();
        self.collect_into(&mut collector);
        collector.free
    }
}

/// Accumulates references while tracking names declared so far.
#[derive(Debug, Default)]
pub struct Collector {
    declared: Vec<FxHashSet<String>>,
    free: FxHashSet<String>,
}

impl Collector {
    fn push(&mut self) {
        self.declared.push(FxHashSet::default());
    }

    fn pop(&mut self) {
        self.declared.pop();
    }

    fn declare(&mut self, name: &str) {
        if let Some(frame) = self.declared.last_mut() {
            frame.insert(name.to_string());
        }
    }

    fn reference(&mut self, name: &str) {
        if !self.declared.iter().any(|frame| frame.contains(name)) {
            self.free.insert(name.to_string());
        }
    }
}

impl FreeVariables for Statement {
    fn collect_into(&self, collector: &mut Collector) {
        match self {
            Statement::Declaration(decl) => decl.collect_into(collector),
            Statement::Expression(stmt) => stmt.expression.collect_into(collector),
            Statement::Block(block) => block.collect_into(collector),
            Statement::If(stmt) => {
                stmt.condition.collect_into(collector);
                if let Some(block) = &stmt.then_block {
                    block.collect_into(collector);
                }
                if let Some(Some(block)) = &stmt.else_block {
                    block.collect_into(collector);
                }
            }
            Statement::While(stmt) => stmt.collect_into(collector),
            Statement::DoWhile(stmt) => {
                collector.push();
                if let Some(body) = &stmt.body {
                    body.collect_into(collector);
                }
                stmt.condition.collect_into(collector);
                collector.pop();
            }
            Statement::For(stmt) => {
                collector.push();
                match &stmt.initializer {
                    Some(ForInitializer::Declaration(decl)) => decl.collect_into(collector),
                    Some(ForInitializer::Expression(expr)) => expr.collect_into(collector),
                    None => {}
                }
                if let Some(condition) = &stmt.condition {
                    condition.collect_into(collector);
                }
                if let Some(afterthought) = &stmt.afterthought {
                    afterthought.collect_into(collector);
                }
                if let Some(body) = &stmt.body {
                    body.collect_into(collector);
                }
                collector.pop();
            }
            Statement::Break(_) | Statement::Continue(_) => {}
            Statement::Return(stmt) => {
                if let Some(value) = &stmt.value {
                    value.collect_into(collector);
                }
            }
            Statement::Throw(stmt) => stmt.value.collect_into(collector),
        }
    }
}

impl FreeVariables for Declaration {
    fn collect_into(&self, collector: &mut Collector) {
        for declarator in &self.declarators {
            // The initializer cannot see the name it initializes
            if let Some(init) = &declarator.init {
                init.collect_into(collector);
            }
            collector.declare(&declarator.name);
        }
    }
}

impl FreeVariables for Block {
    fn collect_into(&self, collector: &mut Collector) {
        collector.push();
        for statement in &self.statements {
            statement.collect_into(collector);
        }
        collector.pop();
    }
}

impl FreeVariables for WhileStatement {
    fn collect_into(&self, collector: &mut Collector) {
        collector.push();
        self.condition.collect_into(collector);
        if let Some(body) = &self.body {
            body.collect_into(collector);
        }
        collector.pop();
    }
}

impl FreeVariables for Expression {
    fn collect_into(&self, collector: &mut Collector) {
        match self {
            Expression::Literal(_) => {}
            Expression::Variable(var) => collector.reference(&var.name),
            Expression::Unary(e) => e.operand.collect_into(collector),
            Expression::Binary(e) => {
                e.left.collect_into(collector);
                e.right.collect_into(collector);
            }
            Expression::Comparison(e) => {
                e.left.collect_into(collector);
                e.right.collect_into(collector);
            }
            Expression::Logical(e) => {
                e.left.collect_into(collector);
                e.right.collect_into(collector);
            }
            Expression::Assignment(e) => {
                e.value.collect_into(collector);
                collector.reference(&e.target);
            }
            Expression::Update(e) => collector.reference(&e.target),
        }
    }
}
