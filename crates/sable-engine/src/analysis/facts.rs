// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Control-flow facts computed bottom-up for every statement.

/// What a statement (or block) guarantees about control leaving it.
///
/// Facts are computed once during analysis and never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Facts {
    /// Every path leaves the whole routine (return, throw, endless loop)
    pub method_escape: bool,
    /// Every path leaves the enclosing loop
    pub loop_escape: bool,
    /// Every path leaves the statement by a jump of some kind
    pub all_escape: bool,
    /// Some path executes a `break`
    pub any_break: bool,
    /// Some path executes a `continue`
    pub any_continue: bool,
    /// Statements contributing to the enclosing loop's weight
    pub statement_count: u32,
}

impl Facts {
    /// A statement that falls through: declarations, expressions, loops.
    pub fn single() -> Self {
        Self {
            statement_count: 1,
            ..Self::default()
        }
    }

    /// `break`
    pub fn breaking() -> Self {
        Self {
            loop_escape: true,
            all_escape: true,
            any_break: true,
            statement_count: 1,
            ..Self::default()
        }
    }

    /// `continue`
    pub fn continuing() -> Self {
        Self {
            all_escape: true,
            any_continue: true,
            statement_count: 1,
            ..Self::default()
        }
    }

    /// `return`, `throw` and implicit returns.
    pub fn returning() -> Self {
        Self {
            method_escape: true,
            loop_escape: true,
            all_escape: true,
            statement_count: 1,
            ..Self::default()
        }
    }

    /// Folds the facts of the next statement of a block into the block's.
    /// Escapes come from the last statement; the `any_*` flags accumulate.
    pub fn then(self, next: Facts) -> Self {
        Self {
            method_escape: next.method_escape,
            loop_escape: next.loop_escape,
            all_escape: next.all_escape,
            any_break: self.any_break || next.any_break,
            any_continue: self.any_continue || next.any_continue,
            statement_count: self.statement_count.saturating_add(next.statement_count),
        }
    }

    /// Facts of an `if` without `else`: it may fall through, so only the
    /// `any_*` flags and the count of the branch survive.
    pub fn conditional(branch: Facts) -> Self {
        Self {
            any_break: branch.any_break,
            any_continue: branch.any_continue,
            statement_count: branch.statement_count,
            ..Self::default()
        }
    }

    /// Facts of an `if-else`: escapes must hold on both branches.
    pub fn either(then: Facts, otherwise: Facts) -> Self {
        Self {
            method_escape: then.method_escape && otherwise.method_escape,
            loop_escape: then.loop_escape && otherwise.loop_escape,
            all_escape: then.all_escape && otherwise.all_escape,
            any_break: then.any_break || otherwise.any_break,
            any_continue: then.any_continue || otherwise.any_continue,
            statement_count: then.statement_count.max(otherwise.statement_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_takes_escapes_from_last() {
        let facts = Facts::default().then(Facts::breaking()).then(Facts::single());
        assert!(!facts.loop_escape);
        assert!(!facts.all_escape);
        assert!(facts.any_break);
        assert_eq!(facts.statement_count, 2);
    }

    #[test]
    fn test_either_requires_both_branches() {
        let facts = Facts::either(Facts::returning(), Facts::breaking());
        assert!(!facts.method_escape);
        assert!(facts.loop_escape);
        assert!(facts.all_escape);
        assert!(facts.any_break);

        let facts = Facts::either(Facts::continuing(), Facts::single());
        assert!(!facts.all_escape);
        assert!(facts.any_continue);
    }

    #[test]
    fn test_conditional_never_escapes() {
        let facts = Facts::conditional(Facts::default().then(Facts::single()).then(Facts::breaking()));
        assert!(!facts.all_escape);
        assert!(facts.any_break);
        assert_eq!(facts.statement_count, 2);
    }
}
