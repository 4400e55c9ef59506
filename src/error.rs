//! Error types for the mood engine

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur while building or consulting a daily model
#[derive(Debug, Error)]
pub enum MoodError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Insufficient data: {slots} slots available but window length is {window_length}")]
    InsufficientData { slots: usize, window_length: usize },

    #[error("No model found for user {user_id} on {date}")]
    ModelNotFound { user_id: String, date: NaiveDate },

    #[error("State {state} has no assigned windows")]
    DegenerateState { state: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MoodError {
    /// Stable machine-readable code for error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            MoodError::Input(_) => "INVALID_INPUT",
            MoodError::InsufficientData { .. } => "INSUFFICIENT_DATA",
            MoodError::ModelNotFound { .. } => "MODEL_NOT_FOUND",
            MoodError::DegenerateState { .. } => "DEGENERATE_STATE",
            MoodError::Storage(_) => "STORAGE_ERROR",
            MoodError::Json(_) => "INVALID_JSON",
            MoodError::Upstream(_) => "UPSTREAM_ERROR",
            MoodError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller can recover (fix the request or trigger a build).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MoodError::Input(_) | MoodError::ModelNotFound { .. } | MoodError::DegenerateState { .. }
        )
    }
}
