use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccrualApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Too many requests. Retry after {}s", retry_after.as_secs())]
    TooManyRequests { retry_after: Duration },
    #[error("Too many requests, but the Retry-After header was missing or invalid: {0}")]
    InvalidRetryAfter(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
}

impl AccrualApiError {
    /// Returns the cooldown requested by the accrual service, if this error is a throttling response.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::TooManyRequests { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
