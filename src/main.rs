// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Sable - a sandboxed, statically typed scripting language
//!
//! This is the main entry point for the sable CLI/REPL.
//!
//! ## Features
//!
//! - Interactive REPL with syntax highlighting and history
//! - Script files and inline code with typed host parameters
//! - Loop budget configurable from `sable.toml` or the command line

mod config;
mod repl;

use anyhow::{Context, Result, bail};
use clap::Parser;
use owo_colors::OwoColorize;
use sable_engine::parser::Parser as ScriptParser;
use sable_engine::{AsyncEngine, CompilerSettings, Engine, Param, Type, Value, freevars};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Run Sable scripts, or start a REPL when no script is given.
#[derive(Debug, Parser)]
#[command(name = "sable", version, about)]
struct Cli {
    /// Script file to execute
    file: Option<PathBuf>,

    /// Evaluate CODE instead of a file
    #[arg(short, long, value_name = "CODE", conflicts_with = "file")]
    eval: Option<String>,

    /// Bind a host parameter; the type is inferred from VALUE
    #[arg(short, long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// Loop budget per execution, 0 to disable
    #[arg(long, env = "SABLE_MAX_LOOP_COUNTER")]
    max_loop_counter: Option<u32>,

    /// Configuration file [default: ./sable.toml]
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the compiled bytecode before running
    #[arg(long)]
    disassemble: bool,

    /// Log compiler activity
    #[arg(short, long)]
    verbose: bool,
}

/// Main entry point - uses tokio runtime for async operations.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    if cli.file.is_none() && cli.eval.is_none() {
        return run_repl(settings);
    }

    match run(&cli, settings).await {
        Ok(value) => {
            if !value.is_null() {
                println!("{}", value);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// `SABLE_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env("SABLE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "sable=debug,sable_engine=debug"
        } else {
            "warn"
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Config file first, then command line overrides.
fn settings(cli: &Cli) -> Result<CompilerSettings> {
    let mut settings = config::Config::load(cli.config.as_deref())?.compiler;
    if let Some(max) = cli.max_loop_counter {
        settings = settings.with_max_loop_counter(max);
    }
    Ok(settings)
}

/// Start the interactive REPL
fn run_repl(settings: CompilerSettings) -> ExitCode {
    match repl::Repl::new(settings) {
        Ok(mut repl) => {
            if let Err(e) = repl.run() {
                eprintln!("{}: {:?}", "REPL Error".red().bold(), e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!(
                "{}: Failed to initialize REPL: {:?}",
                "Error".red().bold(),
                e
            );
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, settings: CompilerSettings) -> Result<Value> {
    // Plain scripts go through the async front-end
    if cli.params.is_empty() && !cli.disassemble {
        let engine = AsyncEngine::new(settings);
        return match (&cli.eval, &cli.file) {
            (Some(code), _) => Ok(engine.eval(code.as_str()).await?),
            (None, Some(path)) => Ok(engine
                .eval_file(path)
                .await
                .with_context(|| format!("failed to run '{}'", path.display()))?),
            (None, None) => bail!("no script given"),
        };
    }

    let source = match (&cli.eval, &cli.file) {
        (Some(code), _) => code.clone(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read '{}'", path.display()))?,
        (None, None) => bail!("no script given"),
    };

    let (params, args) = bind_params(&cli.params)?;
    warn_unused_params(&source, &params);

    let engine = Engine::new(settings);
    let script = engine.compile_with_params(&source, &params)?;
    if cli.disassemble {
        println!("{}", script.disassemble().dimmed());
    }

    let value = tokio::task::spawn_blocking(move || script.execute(&args)).await??;
    Ok(value)
}

/// Splits `NAME=VALUE` pairs into parameters and their arguments.
fn bind_params(pairs: &[String]) -> Result<(Vec<Param>, Vec<Value>)> {
    let mut params = Vec::with_capacity(pairs.len());
    let mut args = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let Some((name, text)) = pair.split_once('=') else {
            bail!("parameter '{}' is not of the form NAME=VALUE", pair);
        };
        let name = name.trim();
        if name.is_empty() {
            bail!("parameter '{}' has no name", pair);
        }
        if params.iter().any(|p: &Param| p.name == name) {
            bail!("parameter '{}' is bound twice", name);
        }
        let value = infer_value(text);
        let ty = value.ty().unwrap_or(Type::String);
        params.push(Param::new(name, ty));
        args.push(value);
    }
    Ok((params, args))
}

/// `int`, then `double`, then `boolean`; anything else is a `String`.
fn infer_value(text: &str) -> Value {
    [Type::Int, Type::Double, Type::Boolean]
        .into_iter()
        .find_map(|ty| Value::parse_as(text, ty))
        .unwrap_or_else(|| Value::String(text.to_string()))
}

fn warn_unused_params(source: &str, params: &[Param]) {
    // Parse errors surface from the real compilation
    let Ok(program) = ScriptParser::new(source).parse_program() else {
        return;
    };
    let free = freevars::collect(&program);
    for param in params.iter().filter(|p| !free.contains(&p.name)) {
        tracing::warn!(name = %param.name, "parameter is never read by the script");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_value() {
        assert_eq!(infer_value("42"), Value::Int(42));
        assert_eq!(infer_value("2.5"), Value::Double(2.5));
        assert_eq!(infer_value("true"), Value::Boolean(true));
        assert_eq!(infer_value("hello"), Value::String("hello".to_string()));
        // Out of `int` range falls through to `double`
        assert_eq!(infer_value("3000000000"), Value::Double(3e9));
    }

    #[test]
    fn test_bind_params() {
        let (params, args) =
            bind_params(&["n=10".to_string(), "name=sable".to_string()]).unwrap();
        assert_eq!(params, vec![Param::new("n", Type::Int), Param::new("name", Type::String)]);
        assert_eq!(args, vec![Value::Int(10), Value::String("sable".to_string())]);
    }

    #[test]
    fn test_bind_params_rejects_malformed() {
        assert!(bind_params(&["n".to_string()]).is_err());
        assert!(bind_params(&["=1".to_string()]).is_err());
        assert!(bind_params(&["n=1".to_string(), "n=2".to_string()]).is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "sable",
            "-e",
            "return n;",
            "-p",
            "n=3",
            "--max-loop-counter",
            "10",
        ])
        .unwrap();
        assert_eq!(cli.eval.as_deref(), Some("return n;"));
        assert_eq!(cli.params, vec!["n=3".to_string()]);
        assert_eq!(cli.max_loop_counter, Some(10));
    }

    #[test]
    fn test_cli_file_conflicts_with_eval() {
        assert!(Cli::try_parse_from(["sable", "script.sable", "-e", "1"]).is_err());
    }
}
