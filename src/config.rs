// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `sable.toml` handling.
//!
//! ```toml
//! [compiler]
//! max_loop_counter = 10000
//! ```

use anyhow::{Context, Result};
use sable_engine::CompilerSettings;
use serde::Deserialize;
use std::path::Path;

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "sable.toml";

/// Contents of a configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Compiler settings applied to every script
    pub compiler: CompilerSettings,
}

impl Config {
    /// Loads `path`, or `./sable.toml` if it exists, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::read(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("invalid config file '{}'", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[compiler]\nmax_loop_counter = 42").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.compiler.max_loop_counter, 42);
    }

    #[test]
    fn test_missing_table_uses_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.compiler, CompilerSettings::default());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/sable.toml"))).is_err());
    }

    #[test]
    fn test_unknown_tables_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[runtime]\nthreads = 1").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }
}
