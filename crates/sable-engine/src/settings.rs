// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compiler settings.

use serde::{Deserialize, Serialize};

/// The default loop budget per script execution.
pub const DEFAULT_MAX_LOOP_COUNTER: u32 = 1_000_000;

/// Settings that control how scripts are compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Total loop weight a single execution may consume. `0` disables the
    /// budget counter entirely.
    pub max_loop_counter: u32,
}

impl CompilerSettings {
    /// Returns settings with the given loop budget.
    pub fn with_max_loop_counter(mut self, max_loop_counter: u32) -> Self {
        self.max_loop_counter = max_loop_counter;
        self
    }

    /// Returns true if loops are instrumented with the budget counter.
    pub fn budget_enabled(&self) -> bool {
        self.max_loop_counter > 0
    }
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            max_loop_counter: DEFAULT_MAX_LOOP_COUNTER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget() {
        let settings = CompilerSettings::default();
        assert_eq!(settings.max_loop_counter, 1_000_000);
        assert!(settings.budget_enabled());
    }

    #[test]
    fn test_zero_disables() {
        assert!(!CompilerSettings::default().with_max_loop_counter(0).budget_enabled());
    }
}
