//! Error types for attune-core
//!
//! Noisy or missing sensor data is never an error here: detectors score it
//! (reliability) or skip the frame. Errors are reserved for the crate
//! boundary where JSON enters or leaves.

use thiserror::Error;

/// Errors that can occur at the crate boundary
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Failed to parse frame payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
