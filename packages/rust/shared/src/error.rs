//! Error types for bindery.
//!
//! Library crates use [`BinderyError`] via `thiserror`.
//! App crates (cli) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all bindery operations.
#[derive(Debug, thiserror::Error)]
pub enum BinderyError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Chapter content could not be parsed (frontmatter, markup).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The requested decoration layout does not exist.
    #[error("template not found: {name}")]
    TemplateNotFound { name: String },

    /// Template rendering failed.
    #[error("render error: {0}")]
    Render(String),

    /// The external conversion engine could not be located or started.
    #[error("conversion engine unavailable: {0}")]
    ConversionUnavailable(String),

    /// The conversion engine ran but produced no usable output.
    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (missing phase output, bad book layout, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BinderyError>;

impl BinderyError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error should be reported as a configuration problem
    /// (exit code 2 in the CLI) rather than a build failure.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}
