use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("The accrual agent shut down after a fatal error")]
    AgentFailed,
    #[error("The accrual agent did not stop within {}s", .0.as_secs())]
    ShutdownTimeout(Duration),
}
