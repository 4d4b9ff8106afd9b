// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Statement generation documentation.
//!
//! This module documents the layouts emitted by `mod.rs` and `loops.rs`.
//!
//! ## Statement Overview
//!
//! | Statement | Key Operations | Notes |
//! |-----------|----------------|-------|
//! | `int x = e` | `StoreLocal` | Uninitialized variables get their type's default |
//! | `if/else` | binder, `Jump` | No `Jump` over the else branch if the then branch escapes |
//! | `while` | binder, `LoopBudget`, `Jump` (back) | Back edge omitted if the body escapes |
//! | `do-while` | binder, `LoopBudget`, `Jump` (back) | Condition tested after the body |
//! | `for` | binder, `LoopBudget`, `Jump` (back) | `continue` targets the afterthought |
//! | `break/continue` | `Jump` | Targets come from the innermost loop |
//! | `return` | `Return` | The last expression of a script is an implicit return |
//! | `throw` | `Throw` | |
//!
//! ## Prologue
//!
//! When any loop uses the budget, the counter slot is initialized once per
//! execution, before the first statement:
//!
//! ```text
//!   LoadConst max_loop_counter
//!   StoreLocal $counter
//! ```
//!
//! ## Condition Binder
//!
//! Conditions never materialize a boolean. `branch(e, L, when)` jumps to `L`
//! if `e` evaluates to `when` and falls through otherwise:
//!
//! ```text
//! constant c      Jump L if c == when, nothing otherwise
//! !e              branch(e, L, !when)
//! a < b           [a] [b] JumpIfLt L   (when = true)
//!                 [a] [b] JumpUnlessLt L   (when = false)
//! a && b, true    branch(a, skip, false); branch(b, L, true); skip:
//! a && b, false   branch(a, L, false); branch(b, L, false)
//! a || b, true    branch(a, L, true); branch(b, L, true)
//! a || b, false   branch(a, skip, true); branch(b, L, false); skip:
//! other           [e] JumpIfTrue L / JumpIfFalse L
//! ```
//!
//! ## Control Flow
//!
//! ### If Statement
//!
//! ```text
//! if (condition) { then } else { else }
//!
//! Bytecode:
//!   branch(condition, else_label, false)
//!   [then bytecode]
//!   Jump -> end_label          ; omitted if then always escapes
//! else_label:
//!   [else bytecode]
//! end_label:
//! ```
//!
//! ### While Loop
//!
//! ```text
//! while (condition) { body }
//!
//! Bytecode:
//! begin:
//!   branch(condition, end, false)  ; nothing for a constant-true condition
//!   LoopBudget $counter -weight
//!   [body bytecode]                ; continue -> begin, break -> end
//!   Jump -> begin                  ; omitted if the body always escapes
//! end:
//! ```
//!
//! ### Do-While Loop
//!
//! ```text
//! do { body } while (condition)
//!
//! Bytecode:
//! start:
//!   [body bytecode]                ; continue -> begin, break -> end
//! begin:
//!   branch(condition, end, false)
//!   LoopBudget $counter -weight
//!   Jump -> start
//! end:
//! ```
//!
//! ### For Loop
//!
//! ```text
//! for (init; condition; afterthought) { body }
//!
//! Bytecode:
//!   [init bytecode]
//! start:
//!   branch(condition, end, false)  ; nothing without a condition
//!   LoopBudget $counter -weight
//!   [body bytecode]                ; continue -> begin, break -> end
//! begin:                           ; same as start without an afterthought
//!   [afterthought bytecode]
//!   Jump -> start                  ; omitted without an afterthought if
//!                                  ; the body always escapes
//! end:
//! ```
//!
//! ## Budget Weights
//!
//! A loop's weight is the number of statements in its body (at least 1).
//! A `for` loop with both a body and an afterthought adds one for the
//! afterthought. A nested loop counts as a single statement of the outer
//! loop, and charges its own weight on each of its own iterations.
//!
//! When the budget is disabled (`max_loop_counter == 0`) no counter slot is
//! allocated and no `LoopBudget` instruction is emitted.
