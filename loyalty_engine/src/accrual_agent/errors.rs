use thiserror::Error;

use crate::accrual_agent::AgentState;

#[derive(Debug, Clone, Error)]
pub enum AgentError {
    #[error("The accrual agent cannot be started, because it is {0}")]
    AlreadyRunning(AgentState),
    #[error("The rate limiter lock is poisoned")]
    RateLimiterPoisoned,
}
