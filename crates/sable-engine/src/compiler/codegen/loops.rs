// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loop generation.
//!
//! Every loop charges its weight against the budget counter once per
//! iteration, after the condition has been tested and before the body runs.

use super::{CodeGenerator, LoopTargets};
use crate::analysis::tree::{DoWhileLoop, ForLoop, TypedForInitializer, TypedStatement, WhileLoop};
use crate::compiler::bytecode::OpCode;
use crate::error::CompileError;
use crate::location::Location;
use crate::scope::Slot;

impl CodeGenerator {
    pub(crate) fn generate_while(
        &mut self,
        node: &WhileLoop,
        statement: &TypedStatement,
    ) -> Result<(), CompileError> {
        let begin = self.emitter.new_label();
        let end = self.emitter.new_label();

        self.emitter.mark(begin);
        self.branch(&node.condition, end, false)?;
        self.charge_budget(node.budget_slot, node.weight, statement.location);

        let targets = LoopTargets {
            continue_to: begin,
            break_to: end,
        };
        let all_escape = match &node.body {
            Some(body) => {
                self.generate_block(body, Some(targets))?;
                body.facts.all_escape
            }
            None => false,
        };

        if !all_escape {
            self.emitter.jump(OpCode::Jump, begin);
        }
        self.emitter.mark(end);

        Ok(())
    }

    pub(crate) fn generate_do_while(
        &mut self,
        node: &DoWhileLoop,
        statement: &TypedStatement,
    ) -> Result<(), CompileError> {
        let start = self.emitter.new_label();
        let begin = self.emitter.new_label();
        let end = self.emitter.new_label();

        self.emitter.mark(start);
        self.generate_block(
            &node.body,
            Some(LoopTargets {
                continue_to: begin,
                break_to: end,
            }),
        )?;

        self.emitter.mark(begin);
        self.emitter.statement_offset(statement.location);
        self.branch(&node.condition, end, false)?;
        self.charge_budget(node.budget_slot, node.weight, statement.location);
        self.emitter.jump(OpCode::Jump, start);
        self.emitter.mark(end);

        Ok(())
    }

    pub(crate) fn generate_for(
        &mut self,
        node: &ForLoop,
        statement: &TypedStatement,
    ) -> Result<(), CompileError> {
        match &node.initializer {
            Some(TypedForInitializer::Declaration(declarators)) => {
                self.generate_declarators(declarators)?
            }
            Some(TypedForInitializer::Expression(expr)) => self.generate_effect(expr)?,
            None => {}
        }

        let start = self.emitter.new_label();
        let end = self.emitter.new_label();
        // `continue` runs the afterthought when there is one
        let begin = match node.afterthought {
            Some(_) => self.emitter.new_label(),
            None => start,
        };

        self.emitter.mark(start);
        if let Some(condition) = &node.condition {
            self.branch(condition, end, false)?;
        }
        self.charge_budget(node.budget_slot, node.weight, statement.location);

        let all_escape = match &node.body {
            Some(body) => {
                self.generate_block(
                    body,
                    Some(LoopTargets {
                        continue_to: begin,
                        break_to: end,
                    }),
                )?;
                body.facts.all_escape
            }
            None => false,
        };

        if let Some(afterthought) = &node.afterthought {
            self.emitter.mark(begin);
            self.emitter.statement_offset(statement.location);
            self.generate_effect(afterthought)?;
        }

        if node.afterthought.is_some() || !all_escape {
            self.emitter.jump(OpCode::Jump, start);
        }
        self.emitter.mark(end);

        Ok(())
    }

    fn charge_budget(&mut self, slot: Option<Slot>, weight: u32, location: Location) {
        if let Some(slot) = slot {
            self.emitter.statement_offset(location);
            self.emitter.loop_budget(slot, weight);
        }
    }
}
