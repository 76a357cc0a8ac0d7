//! Error types for the vishdrill call core

use thiserror::Error;

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while placing or driving a scripted call
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("scenario '{0}' not found")]
    ScenarioNotFound(String),

    #[error("scenario '{id}' is malformed: {reason}")]
    MalformedScenario { id: String, reason: String },

    #[error("invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    #[error("call transport error: {0}")]
    Transport(String),
}
