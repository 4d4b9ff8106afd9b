// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Parser for Sable source code.
//!
//! Transforms a stream of tokens into a parse tree.
//!
//! ## Usage
//!
//! ```rust
//! use sable_engine::parser::Parser;
//!
//! let mut parser = Parser::new("int x = 1 + 2;");
//! let program = parser.parse_program().expect("Should parse");
//! ```

mod parser;

pub use parser::{MAX_NESTING_DEPTH, Parser};
