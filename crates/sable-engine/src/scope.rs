// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Scope management for variable resolution during analysis.
//!
//! [`Locals`] is a stack of lexical frames over a single routine-wide slot
//! space. Slots are handed out in declaration order and never reused, so
//! the loop budget counter, which is allocated lazily by the first loop
//! analyzed, can never alias a script variable.

use crate::error::{SemanticError, SemanticErrorKind};
use crate::location::Location;
use crate::types::Type;
use rustc_hash::FxHashMap;

/// Index of a local variable in the VM's locals array.
pub type Slot = u32;

/// Name of the reserved variable holding the loop budget counter.
pub const LOOP_COUNTER: &str = "#loop";

/// A variable visible to the script.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// The variable name
    pub name: String,
    /// The declared type
    pub ty: Type,
    /// Its slot in the routine
    pub slot: Slot,
    /// Host parameters cannot be assigned
    pub read_only: bool,
}

/// The variables of one routine, organized in lexical frames.
#[derive(Debug)]
pub struct Locals {
    frames: Vec<FxHashMap<String, Variable>>,
    next_slot: Slot,
    max_loop_counter: u32,
    budget_counter: Option<Variable>,
}

impl Locals {
    /// Creates the scope of a new routine with its root frame.
    pub fn new(max_loop_counter: u32) -> Self {
        Self {
            frames: vec![FxHashMap::default()],
            next_slot: 0,
            max_loop_counter,
            budget_counter: None,
        }
    }

    /// Opens a child frame.
    pub fn push_scope(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    /// Closes the innermost frame. Its slots are not released.
    pub fn pop_scope(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Current frame depth; the root frame is depth 0.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Declares a variable in the innermost frame.
    ///
    /// Shadowing is not allowed: a name visible from any enclosing frame is
    /// a duplicate.
    pub fn declare(
        &mut self,
        name: &str,
        ty: Type,
        location: Location,
    ) -> Result<Slot, SemanticError> {
        self.insert(name, ty, false, location)
    }

    /// Declares a read-only host parameter in the innermost frame.
    pub fn declare_parameter(
        &mut self,
        name: &str,
        ty: Type,
        location: Location,
    ) -> Result<Slot, SemanticError> {
        self.insert(name, ty, true, location)
    }

    fn insert(
        &mut self,
        name: &str,
        ty: Type,
        read_only: bool,
        location: Location,
    ) -> Result<Slot, SemanticError> {
        if self.lookup(name).is_some() {
            return Err(SemanticError::new(
                SemanticErrorKind::DuplicateVariable,
                location,
                format!("Variable [{}] is already defined.", name),
            ));
        }

        let slot = self.allocate_slot();
        let variable = Variable {
            name: name.to_string(),
            ty,
            slot,
            read_only,
        };
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), variable);
        }
        Ok(slot)
    }

    /// Resolves a name, innermost frame first.
    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Returns the slot of the loop budget counter, allocating it on first
    /// use. Returns `None` when the budget is disabled.
    pub fn budget_counter_slot(&mut self) -> Option<Slot> {
        if self.max_loop_counter == 0 {
            return None;
        }
        if let Some(counter) = &self.budget_counter {
            return Some(counter.slot);
        }

        let slot = self.allocate_slot();
        self.budget_counter = Some(Variable {
            name: LOOP_COUNTER.to_string(),
            ty: Type::Int,
            slot,
            read_only: true,
        });
        Some(slot)
    }

    /// The budget counter, if a loop has requested it.
    pub fn budget_counter(&self) -> Option<&Variable> {
        self.budget_counter.as_ref()
    }

    /// The configured loop budget.
    pub fn max_loop_counter(&self) -> u32 {
        self.max_loop_counter
    }

    /// Number of slots the routine needs.
    pub fn slot_count(&self) -> usize {
        self.next_slot as usize
    }

    fn allocate_slot(&mut self) -> Slot {
        let slot = self.next_slot;
        self.next_slot += 1;
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> Location {
        Location::default()
    }

    #[test]
    fn test_scope_new() {
        let locals = Locals::new(10);
        assert_eq!(locals.depth(), 0);
        assert_eq!(locals.slot_count(), 0);
    }

    #[test]
    fn test_scope_push_pop() {
        let mut locals = Locals::new(10);
        locals.push_scope();
        assert_eq!(locals.depth(), 1);
        locals.pop_scope();
        assert_eq!(locals.depth(), 0);
        // The root frame is never popped
        locals.pop_scope();
        assert_eq!(locals.depth(), 0);
    }

    #[test]
    fn test_scope_declare_and_lookup() {
        let mut locals = Locals::new(10);
        let slot = locals.declare("x", Type::Int, at()).unwrap();
        assert_eq!(slot, 0);
        let var = locals.lookup("x").unwrap();
        assert_eq!(var.ty, Type::Int);
        assert!(!var.read_only);
        assert!(locals.lookup("y").is_none());
    }

    #[test]
    fn test_scope_inner_names_do_not_leak() {
        let mut locals = Locals::new(10);
        locals.push_scope();
        locals.declare("y", Type::Int, at()).unwrap();
        locals.pop_scope();
        assert!(locals.lookup("y").is_none());
        // Redeclaring after the frame closed is fine and takes a fresh slot
        assert_eq!(locals.declare("y", Type::Int, at()).unwrap(), 1);
    }

    #[test]
    fn test_scope_duplicate_error() {
        let mut locals = Locals::new(10);
        locals.declare("x", Type::Int, at()).unwrap();
        locals.push_scope();
        let err = locals.declare("x", Type::Double, at()).unwrap_err();
        assert_eq!(err.kind, SemanticErrorKind::DuplicateVariable);
    }

    #[test]
    fn test_parameters_are_read_only() {
        let mut locals = Locals::new(10);
        locals.declare_parameter("n", Type::Int, at()).unwrap();
        assert!(locals.lookup("n").unwrap().read_only);
    }

    #[test]
    fn test_budget_slot_is_shared() {
        let mut locals = Locals::new(10);
        locals.declare("x", Type::Int, at()).unwrap();
        let first = locals.budget_counter_slot();
        let second = locals.budget_counter_slot();
        assert_eq!(first, Some(1));
        assert_eq!(first, second);
        assert_eq!(locals.budget_counter().unwrap().name, LOOP_COUNTER);
    }

    #[test]
    fn test_budget_slot_never_aliases_variables() {
        let mut locals = Locals::new(10);
        locals.push_scope();
        locals.declare("a", Type::Int, at()).unwrap();
        let counter = locals.budget_counter_slot().unwrap();
        locals.pop_scope();
        let b = locals.declare("b", Type::Int, at()).unwrap();
        assert_ne!(counter, b);
        assert_eq!(locals.slot_count(), 3);
    }

    #[test]
    fn test_budget_disabled() {
        let mut locals = Locals::new(0);
        assert_eq!(locals.budget_counter_slot(), None);
        assert_eq!(locals.slot_count(), 0);
    }
}
