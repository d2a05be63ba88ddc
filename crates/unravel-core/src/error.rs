use std::path::PathBuf;
use thiserror::Error;

use crate::syntax::SyntaxError;

/// Core error type for unravel operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse failed: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Failed to emit code: {0}")]
    Emit(String),
}

impl Error {
    /// Stable SCREAMING_SNAKE_CASE code for machine-readable output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "READ_FAILED",
            Self::Write { .. } => "WRITE_FAILED",
            Self::Syntax(_) => "PARSE_ERROR",
            Self::Emit(_) => "EMIT_ERROR",
        }
    }
}
