//! Configuration for the co-design search engine.
//!
//! Settings that are naturally per-invocation (space bounds, sampler choice,
//! trial budgets) live on the CLI (`src/bin/accelco.rs`). This module covers
//! the handful of settings that are awkward as flags on every invocation —
//! the native evaluator library path, the log directory, and default space
//! templates — and that are more naturally supplied once via environment
//! variables or a `.env`/TOML file.

use crate::error::{AccelError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level search engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Native cost-model library settings.
    pub evaluator: EvaluatorConfig,
    /// Output/logging settings.
    pub output: OutputConfig,
}

/// Settings for locating and calling the native cost-model library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Path to the native shared library (`libspotlight.so` / `.dylib`).
    pub library_path: PathBuf,
    /// Whether to call the dump-all entry point (JSON return) instead of the
    /// fixed five-double ABI.
    pub dump_all: bool,
}

/// Settings for where results and per-layer logs are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory under which per-layer evaluator logs (`logs/<layer>.log`)
    /// are written.
    pub log_dir: PathBuf,
    /// Directory for trial output files.
    pub output_dir: PathBuf,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        let (default_name, _) = native_library_name();
        EvaluatorConfig {
            library_path: PathBuf::from("build").join(default_name),
            dump_all: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            log_dir: PathBuf::from("logs"),
            output_dir: PathBuf::from("."),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            evaluator: EvaluatorConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Platform-appropriate native library filename, mirroring the reference
/// preprocessor's `libspotlight.so` (Linux) / `libspotlight.dylib` (macOS)
/// selection.
fn native_library_name() -> (&'static str, &'static str) {
    if cfg!(target_os = "macos") {
        ("libspotlight.dylib", "macos")
    } else {
        ("libspotlight.so", "linux")
    }
}

impl Config {
    /// Load configuration from environment variables (via `.env`, if
    /// present) and, optionally, a TOML config file pointed to by
    /// `ACCELCO_CONFIG`.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut cfg = if let Ok(path) = std::env::var("ACCELCO_CONFIG") {
            let text = std::fs::read_to_string(&path)?;
            toml::from_str(&text)
                .map_err(|e| AccelError::config(format!("parsing {path}: {e}")))?
        } else {
            Config::default()
        };

        if let Ok(path) = std::env::var("ACCELCO_LIBRARY_PATH") {
            cfg.evaluator.library_path = PathBuf::from(path);
        }
        if let Ok(flag) = std::env::var("ACCELCO_DUMP_ALL") {
            cfg.evaluator.dump_all = flag.parse().unwrap_or(false);
        }
        if let Ok(path) = std::env::var("ACCELCO_LOG_DIR") {
            cfg.output.log_dir = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("ACCELCO_OUTPUT_DIR") {
            cfg.output.output_dir = PathBuf::from(path);
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_picks_platform_library_name() {
        let cfg = Config::default();
        let name = cfg.evaluator.library_path.file_name().unwrap();
        assert!(name == "libspotlight.so" || name == "libspotlight.dylib");
    }
}
