// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # sable-engine
//!
//! A sandboxed, statically typed scripting engine, implemented in Rust.
//!
//! ## Overview
//!
//! Scripts go through a short pipeline:
//! - Lexer and parser producing an untyped syntax tree
//! - Semantic analysis: typing, constant folding, control-flow facts and
//!   loop legality
//! - Code generation with jump labels and loop budget instrumentation
//! - A stack VM that enforces the loop budget per execution
//!
//! ## Quick Start
//!
//! ```rust
//! use sable_engine::{CompilerSettings, Engine, Value};
//!
//! let engine = Engine::new(CompilerSettings::default());
//! let result = engine.eval("int x = 0; while (x < 10) { x++; } return x;").unwrap();
//! assert_eq!(result, Value::Int(10));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod ast;
pub mod compiler;
pub mod error;
pub mod freevars;
pub mod lexer;
pub mod location;
pub mod parser;
pub mod runtime;
pub mod scope;
pub mod settings;
pub mod types;
pub mod vm;

#[cfg(feature = "async")]
pub mod async_engine;

// Re-exports for convenience
pub use error::{CompileError, Error, Result, ScriptError, SemanticError, SemanticErrorKind};
pub use location::Location;
pub use runtime::value::Value;
pub use settings::CompilerSettings;
pub use types::Type;

#[cfg(feature = "async")]
pub use async_engine::AsyncEngine;
#[cfg(all(feature = "async", feature = "parallel"))]
pub use async_engine::ParallelExecutor;

use analysis::Analyzer;
use compiler::{Bytecode, CodeGenerator};
use parser::Parser;
use std::sync::Arc;
use tracing::debug;
use vm::VM;

/// A value supplied by the host, bound to a read-only variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Name visible to the script
    pub name: String,
    /// Declared type
    pub ty: Type,
}

impl Param {
    /// Creates a new parameter.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// The script compiler.
///
/// An `Engine` holds only its settings; every compilation gets a fresh
/// analyzer and code generator, so one engine can be shared freely.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    settings: CompilerSettings,
}

impl Engine {
    /// Creates an engine with the given settings.
    pub fn new(settings: CompilerSettings) -> Self {
        Self { settings }
    }

    /// The settings scripts are compiled with.
    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    /// Compiles a script without parameters.
    pub fn compile(&self, source: &str) -> std::result::Result<Script, CompileError> {
        self.compile_with_params(source, &[])
    }

    /// Compiles a script whose first variables are host parameters.
    pub fn compile_with_params(
        &self,
        source: &str,
        params: &[Param],
    ) -> std::result::Result<Script, CompileError> {
        let program = Parser::new(source).parse_program()?;

        let mut analyzer = Analyzer::new();
        let typed = analyzer.analyze_program(&program, params, &self.settings)?;
        let bytecode = CodeGenerator::new().generate(&typed)?;

        debug!(
            statements = program.statements.len(),
            loops = analyzer.loop_count(),
            instructions = bytecode.instructions.len(),
            budget = typed.budget_slot.is_some(),
            "compiled script"
        );

        Ok(Script {
            bytecode: Arc::new(bytecode),
            params: params.to_vec(),
        })
    }

    /// Compiles and runs a script without parameters.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sable_engine::{Engine, Value};
    ///
    /// let engine = Engine::default();
    /// assert_eq!(engine.eval("2 + 2").unwrap(), Value::Int(4));
    /// ```
    pub fn eval(&self, source: &str) -> Result<Value> {
        let script = self.compile(source)?;
        Ok(script.execute(&[])?)
    }
}

/// A compiled script.
///
/// Scripts are immutable and cheap to clone; they can be executed any
/// number of times, from any thread. Each execution gets its own locals
/// and its own loop budget.
#[derive(Debug, Clone)]
pub struct Script {
    bytecode: Arc<Bytecode>,
    params: Vec<Param>,
}

impl Script {
    /// Runs the script with one argument per parameter, in order.
    ///
    /// `int` arguments are accepted for `double` parameters and `null` for
    /// `String` parameters.
    pub fn execute(&self, args: &[Value]) -> std::result::Result<Value, ScriptError> {
        if args.len() != self.params.len() {
            return Err(ScriptError::InvalidArguments(format!(
                "expected {} arguments, got {}",
                self.params.len(),
                args.len()
            )));
        }

        let args = self
            .params
            .iter()
            .zip(args)
            .map(|(param, arg)| bind(param, arg))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        VM::new().execute(&self.bytecode, &args)
    }

    /// The compiled bytecode.
    pub fn bytecode(&self) -> &Bytecode {
        &self.bytecode
    }

    /// The parameters the script was compiled with.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Renders the bytecode for debugging.
    pub fn disassemble(&self) -> String {
        self.bytecode.disassemble()
    }
}

fn bind(param: &Param, arg: &Value) -> std::result::Result<Value, ScriptError> {
    match (param.ty, arg) {
        (Type::Double, Value::Int(n)) => Ok(Value::Double(f64::from(*n))),
        (Type::String, Value::Null) => Ok(Value::Null),
        (ty, arg) if arg.ty() == Some(ty) => Ok(arg.clone()),
        (ty, arg) => Err(ScriptError::InvalidArguments(format!(
            "parameter [{}] expects {}, got {}",
            param.name, ty, arg
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_eval() {
        let engine = Engine::default();
        assert_eq!(engine.eval("1 + 2").unwrap(), Value::Int(3));
    }

    #[test]
    fn test_compile_error_surfaces() {
        let engine = Engine::default();
        let err = engine.eval("while (false) { }").unwrap_err();
        assert!(matches!(
            err,
            Error::Compile(CompileError::Semantic(SemanticError {
                kind: SemanticErrorKind::DeadLoop,
                ..
            }))
        ));
    }

    #[test]
    fn test_script_params() {
        let engine = Engine::default();
        let script = engine
            .compile_with_params(
                "double t = 0; int i = 0; while (i < n) { t += x; i++; } return t;",
                &[Param::new("n", Type::Int), Param::new("x", Type::Double)],
            )
            .unwrap();
        assert_eq!(script.execute(&[Value::Int(4), Value::Int(2)]).unwrap(), Value::Double(8.0));
        assert_eq!(
            script.execute(&[Value::Int(2), Value::Double(0.25)]).unwrap(),
            Value::Double(0.5)
        );
    }

    #[test]
    fn test_script_rejects_bad_arguments() {
        let engine = Engine::default();
        let script = engine
            .compile_with_params("return n;", &[Param::new("n", Type::Int)])
            .unwrap();
        assert!(matches!(script.execute(&[]), Err(ScriptError::InvalidArguments(_))));
        assert!(matches!(
            script.execute(&[Value::Double(1.0)]),
            Err(ScriptError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_params_are_read_only() {
        let engine = Engine::default();
        let err = engine
            .compile_with_params("n = 2; return n;", &[Param::new("n", Type::Int)])
            .unwrap_err();
        assert_eq!(err.semantic_kind(), Some(SemanticErrorKind::ReadOnlyVariable));
    }

    #[test]
    fn test_budget_is_per_execution() {
        let engine = Engine::new(CompilerSettings::default().with_max_loop_counter(100));
        let script = engine
            .compile_with_params(
                "int i = 0; while (i < n) { i++; } return i;",
                &[Param::new("n", Type::Int)],
            )
            .unwrap();
        // 60 iterations fit; running twice must not accumulate
        assert_eq!(script.execute(&[Value::Int(60)]).unwrap(), Value::Int(60));
        assert_eq!(script.execute(&[Value::Int(60)]).unwrap(), Value::Int(60));
        assert!(script.execute(&[Value::Int(200)]).unwrap_err().is_budget_exceeded());
    }

    #[test]
    fn test_deeply_nested_script_is_a_syntax_error() {
        let engine = Engine::default();
        let src = format!("int x = 0; return {}1{};", "(".repeat(5000), ")".repeat(5000));
        let err = engine.eval(&src).unwrap_err();
        assert!(matches!(err, Error::Compile(CompileError::Syntax { .. })));

        let src = format!("int x = 2; return {}x{};", "(".repeat(100), ")".repeat(100));
        assert_eq!(engine.eval(&src).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_script_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Script>();
        assert_send_sync::<Engine>();
    }
}
