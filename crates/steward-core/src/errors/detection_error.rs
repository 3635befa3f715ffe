//! Pattern detection errors.

use super::error_code::{self, StewardErrorCode};

/// Errors that can occur while running trend and pattern detectors.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("Detector {detector} needs {needed} samples, got {got}")]
    InsufficientData {
        detector: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("Invalid detector input: {0}")]
    InvalidInput(String),

    #[error("Detector {id} panicked: {message}")]
    DetectorPanic { id: String, message: String },
}

impl StewardErrorCode for DetectionError {
    fn error_code(&self) -> &'static str {
        error_code::DETECTION_ERROR
    }
}
