// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Asynchronous and parallel engine front-ends.
//!
//! Compilation and execution are CPU-bound and never suspend, so the async
//! front-end only reads files asynchronously and moves the actual work onto
//! tokio's blocking pool.
//!
//! # Features
//!
//! - `async`: [`AsyncEngine`], file evaluation with tokio
//! - `parallel`: [`ParallelExecutor`], batch compilation with rayon
//!
//! # Example
//!
//! ```no_run
//! use sable_engine::{AsyncEngine, CompilerSettings};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = AsyncEngine::new(CompilerSettings::default());
//!     let result = engine.eval_file("script.sable").await.unwrap();
//!     println!("{}", result);
//! }
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::task::JoinSet;

use crate::runtime::value::Value;
use crate::settings::CompilerSettings;
use crate::{Engine, Error, Result};

/// An asynchronous script engine.
///
/// Cloning is cheap; clones share the same settings.
#[derive(Debug, Clone, Default)]
pub struct AsyncEngine {
    engine: Arc<Engine>,
}

impl AsyncEngine {
    /// Creates a new async engine.
    pub fn new(settings: CompilerSettings) -> Self {
        Self {
            engine: Arc::new(Engine::new(settings)),
        }
    }

    /// Compiles and runs `source` on the blocking pool.
    pub async fn eval(&self, source: impl Into<String>) -> Result<Value> {
        let engine = Arc::clone(&self.engine);
        let source = source.into();
        tokio::task::spawn_blocking(move || engine.eval(&source))
            .await
            .map_err(|err| Error::Io(io::Error::other(err)))?
    }

    /// Evaluates a script file.
    ///
    /// Uses tokio's async file I/O for non-blocking reads.
    pub async fn eval_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let source = fs::read_to_string(path.as_ref()).await?;
        self.eval(source).await
    }

    /// Evaluates several script files concurrently.
    ///
    /// Results are returned in the order of `paths`.
    pub async fn eval_files(&self, paths: &[impl AsRef<Path>]) -> Vec<Result<Value>> {
        let mut tasks = JoinSet::new();
        for (index, path) in paths.iter().enumerate() {
            let engine = self.clone();
            let path: PathBuf = path.as_ref().to_path_buf();
            tasks.spawn(async move { (index, engine.eval_file(path).await) });
        }

        let mut results: Vec<Option<Result<Value>>> = (0..paths.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(err) => tracing::warn!(error = %err, "script task failed"),
            }
        }

        results
            .into_iter()
            .map(|result| {
                result.unwrap_or_else(|| Err(Error::Io(io::Error::other("script task failed"))))
            })
            .collect()
    }
}

/// Compiles independent scripts on a rayon thread pool.
#[cfg(feature = "parallel")]
#[derive(Debug)]
pub struct ParallelExecutor {
    /// Thread pool for CPU-bound work
    pool: rayon::ThreadPool,
    engine: Engine,
}

#[cfg(feature = "parallel")]
impl ParallelExecutor {
    /// Creates a parallel executor with the default number of threads.
    pub fn new(settings: CompilerSettings) -> std::result::Result<Self, rayon::ThreadPoolBuildError> {
        Ok(Self {
            pool: rayon::ThreadPoolBuilder::new().build()?,
            engine: Engine::new(settings),
        })
    }

    /// Creates a parallel executor with a specific number of threads.
    pub fn with_threads(
        num_threads: usize,
        settings: CompilerSettings,
    ) -> std::result::Result<Self, rayon::ThreadPoolBuildError> {
        Ok(Self {
            pool: rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build()?,
            engine: Engine::new(settings),
        })
    }

    /// Compiles multiple sources in parallel.
    ///
    /// Each source gets its own analyzer and generator; results are in the
    /// order of `sources`.
    pub fn compile_parallel(
        &self,
        sources: &[&str],
    ) -> Vec<std::result::Result<crate::Script, crate::CompileError>> {
        use rayon::prelude::*;

        self.pool.install(|| {
            sources
                .par_iter()
                .map(|source| self.engine.compile(source))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_async_eval() {
        let engine = AsyncEngine::default();
        let result = engine.eval("int x = 0; while (x < 5) { x++; } return x;").await.unwrap();
        assert_eq!(result, Value::Int(5));
    }

    #[tokio::test]
    async fn test_async_eval_error() {
        let engine = AsyncEngine::default();
        let err = engine.eval("while (true) {}").await.unwrap_err();
        assert!(matches!(err, Error::Compile(_)));
    }

    #[tokio::test]
    async fn test_async_missing_file() {
        let engine = AsyncEngine::default();
        let err = engine.eval_file("/nonexistent/script.sable").await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_compile_parallel_keeps_order() {
        let executor = ParallelExecutor::with_threads(2, CompilerSettings::default()).unwrap();
        let results = executor.compile_parallel(&["1 + 1", "while (false) {}", "return 3;"]);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().execute(&[]).unwrap(), Value::Int(2));
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().execute(&[]).unwrap(), Value::Int(3));
    }
}
