use std::{future::Future, time::Duration};

use accrual_tools::{AccrualApi, AccrualApiError, AccrualResponse, AccrualStatus};
use lp_common::Points;

/// The classified result of one round trip to the accrual service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccrualOutcome {
    /// The accrual service has an opinion about the order. An order it has never heard of is reported as `INVALID`.
    Verdict { status: AccrualStatus, accrual: Option<Points> },
    /// The accrual service asked us to back off for the given duration.
    RateLimited(Duration),
    /// Anything else. The order will be picked up again on a later dispatch cycle.
    TransientError(String),
}

impl From<AccrualResponse> for AccrualOutcome {
    fn from(response: AccrualResponse) -> Self {
        Self::Verdict { status: response.status, accrual: response.accrual }
    }
}

impl From<Result<AccrualResponse, AccrualApiError>> for AccrualOutcome {
    fn from(result: Result<AccrualResponse, AccrualApiError>) -> Self {
        match result {
            Ok(response) => response.into(),
            Err(e) => match e.retry_after() {
                Some(retry_after) => Self::RateLimited(retry_after),
                None => Self::TransientError(e.to_string()),
            },
        }
    }
}

/// Source of verdicts for the accrual agent.
///
/// Implementations perform exactly one request per call; retries and cooldowns are the agent's business.
pub trait AccrualProvider: Send + Sync + 'static {
    fn fetch(&self, order_number: &str) -> impl Future<Output = AccrualOutcome> + Send;
}

impl AccrualProvider for AccrualApi {
    async fn fetch(&self, order_number: &str) -> AccrualOutcome {
        self.fetch_order_status(order_number).await.into()
    }
}
