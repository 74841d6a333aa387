//! Cloud provider error types

use fleetstack_core::FleetError;
use thiserror::Error;

/// Provider, driver and resolver errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request throttled: {0}")]
    Throttled(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Stack not found: {0}")]
    StackNotFound(String),

    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Stack submission failed for {stack}: {message}")]
    SubmissionFailed { stack: String, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error(transparent)]
    Core(#[from] FleetError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Whether the failed call may succeed if simply repeated later
    pub fn is_transient(&self) -> bool {
        matches!(self, CloudError::Throttled(_) | CloudError::Unavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
