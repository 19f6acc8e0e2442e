//! Error types for the co-design search engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AccelError>;

/// Fatal, process-terminating errors (spec.md §7 category 5 — configuration
/// errors). Recoverable per-sample failures (infeasible point, evaluator
/// failure, budget exhaustion) never produce this type; see
/// [`crate::evaluator::FailureStats`].
#[derive(Error, Debug)]
pub enum AccelError {
    /// I/O errors (reading a shape file, opening a log/output file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors, e.g. parsing `--hw-point`/`--sw-point`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration load/parse errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// The native cost-model shared library could not be loaded or the
    /// expected symbol was not found in it.
    #[error("failed to load native evaluator `{path}`: {message}")]
    NativeLibrary {
        /// Path to the shared library that failed to load.
        path: PathBuf,
        /// Underlying `libloading` error message.
        message: String,
    },

    /// The layer shape file was missing, empty, or malformed.
    #[error("invalid shape file {file}: {message}")]
    ShapeFile {
        /// Path to the offending shape file.
        file: PathBuf,
        /// Description of what was wrong with it.
        message: String,
    },

    /// An unrecognized sampler/model family, target metric, or kernel name.
    #[error("unknown {kind}: `{value}`")]
    UnknownVariant {
        /// What was being parsed (e.g. "model family", "target metric").
        kind: &'static str,
        /// The unrecognized value.
        value: String,
    },

    /// A required CLI argument was missing for the requested mode.
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    /// Generic error with added context.
    #[error("{context}: {source}")]
    WithContext {
        /// Human-readable context describing the failing operation.
        context: String,
        /// The underlying error.
        source: Box<AccelError>,
    },
}

impl AccelError {
    /// Wrap `self` with additional context, matching the `.context(...)`
    /// idiom used for `anyhow::Error` elsewhere in the crate's binaries.
    pub fn context(self, context: impl Into<String>) -> Self {
        AccelError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build a [`AccelError::Config`] from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        AccelError::Config(msg.into())
    }
}

/// Extension trait mirroring [`AccelError::context`] on a `Result`.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }
}
