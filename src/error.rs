//! Error types for the exposure risk engine

use thiserror::Error;

/// Errors that can occur while loading configuration or scoring windows
#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid risk configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
