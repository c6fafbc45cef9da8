//! Error types for the ChainEase payments session

use crate::models::Step;
use thiserror::Error;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {

    // =============================
    // Session Errors
    // =============================

    #[error("Action '{action}' is not available on the {from} screen")]
    InvalidTransition { from: Step, action: &'static str },

    #[error("Safety analysis is still running")]
    AnalysisPending,

    #[error("{0}")]
    Validation(#[from] ValidationError),

    // =============================
    // Analysis Client Errors
    // =============================

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Image payload error: {0}")]
    ImageDecodeError(#[from] base64::DecodeError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Transfer form failures, shown inline on the input screen
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Recipient name required")]
    MissingRecipient,

    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Exceeds available balance")]
    ExceedsBalance,
}
