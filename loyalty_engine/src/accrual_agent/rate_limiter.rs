use std::{sync::RwLock, time::Duration};

use log::*;
use tokio::{sync::watch, time::Instant};

use crate::accrual_agent::{cancelled, AgentError};

/// Shared cooldown for all requests to the accrual service.
///
/// Holds the instant before which no request may be sent. Any worker that is throttled pushes the deadline out; every
/// worker consults it before sending a request. The deadline only ever moves later.
#[derive(Debug, Default)]
pub struct RateLimiter {
    not_before: RwLock<Option<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the accrual service asked for a break of `retry_after`, counting from now. Returns the deadline
    /// that is in force afterwards, which is later than `now + retry_after` if another worker was told to wait longer.
    pub fn throttle(&self, retry_after: Duration) -> Result<Instant, AgentError> {
        let requested = Instant::now() + retry_after;
        let mut not_before = self.not_before.write().map_err(|_| AgentError::RateLimiterPoisoned)?;
        match *not_before {
            Some(current) if current >= requested => Ok(current),
            _ => {
                trace!("⏱️ Cooldown extended by {}s", retry_after.as_secs());
                *not_before = Some(requested);
                Ok(requested)
            },
        }
    }

    /// The instant before which no request may be sent, if a cooldown has ever been requested.
    pub fn deadline(&self) -> Result<Option<Instant>, AgentError> {
        let not_before = self.not_before.read().map_err(|_| AgentError::RateLimiterPoisoned)?;
        Ok(*not_before)
    }

    /// How much of the cooldown is left. Zero if requests may be sent right away.
    pub fn remaining(&self) -> Result<Duration, AgentError> {
        let remaining = self.deadline()?.map(|d| d.saturating_duration_since(Instant::now())).unwrap_or_default();
        Ok(remaining)
    }

    /// Waits until the cooldown is over or the agent is told to stop, whichever comes first.
    ///
    /// Returns `true` if requests may be sent, and `false` if the wait was cut short by cancellation.
    pub(crate) async fn wait_for_clearance(&self, cancel: &mut watch::Receiver<bool>) -> Result<bool, AgentError> {
        loop {
            if *cancel.borrow() {
                return Ok(false);
            }
            // The deadline may have moved while we slept, so it is read afresh on every pass.
            let deadline = match self.deadline()? {
                Some(deadline) if deadline > Instant::now() => deadline,
                _ => return Ok(true),
            };
            debug!("⏱️ Cooling down for another {}ms", deadline.saturating_duration_since(Instant::now()).as_millis());
            tokio::select! {
                biased;
                _ = cancelled(cancel) => return Ok(false),
                _ = tokio::time::sleep_until(deadline) => {},
            }
        }
    }

    /// Leaves the lock poisoned, as if a thread had panicked while holding it.
    #[cfg(test)]
    pub(crate) fn poison(self: &std::sync::Arc<Self>) {
        let limiter = std::sync::Arc::clone(self);
        let _ = std::thread::spawn(move || {
            let _guard = limiter.not_before.write();
            panic!("poisoning the rate limiter");
        })
        .join();
    }
}
