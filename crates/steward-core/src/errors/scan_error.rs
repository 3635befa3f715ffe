//! Corpus scanning errors.

use std::path::PathBuf;

use super::error_code::{self, StewardErrorCode};

/// Errors that can occur while walking or reading the corpus.
///
/// Per-file errors are non-fatal: the scanner counts the file as skipped and
/// keeps going. Only `RootNotFound` and `Cancelled` end a cycle.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Corpus root not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("I/O error reading {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("{path} is not valid UTF-8")]
    Encoding { path: PathBuf },

    #[error("Reading {path} exceeded {timeout_ms}ms")]
    Timeout { path: PathBuf, timeout_ms: u64 },

    #[error("Walk error: {message}")]
    Walk { message: String },

    #[error("Scan cancelled")]
    Cancelled,
}

impl StewardErrorCode for ScanError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => error_code::SCAN_TIMEOUT,
            Self::Encoding { .. } => error_code::ENCODING_ERROR,
            Self::Cancelled => error_code::CANCELLED,
            _ => error_code::SCAN_ERROR,
        }
    }
}
