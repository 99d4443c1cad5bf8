//! # Accrual agent
//!
//! The reconciliation agent keeps the ledger in step with the external accrual service. It is made up of
//!
//! * a dispatch loop ([`dispatcher`]) that periodically asks the ledger for orders awaiting a verdict and pushes them
//!   onto a bounded work channel,
//! * a fixed pool of workers ([`worker`]) that drain the channel. For each order a worker waits out any active
//!   cooldown, asks the accrual service for a verdict and applies it to the ledger,
//! * a [`RateLimiter`] shared by all the workers, holding the instant before which no request may be sent,
//! * the [`AccrualAgent`] controller that owns the start/stop life cycle of all of the above.
//!
//! All the tasks share a single cancellation signal, a `tokio::sync::watch` flag that flips to `true` exactly once.
mod agent;
mod dispatcher;
mod errors;
mod provider;
mod rate_limiter;
mod worker;

pub use agent::{AccrualAgent, AgentConfig, AgentState, DEFAULT_DISPATCH_INTERVAL, DEFAULT_WORKERS};
pub use errors::AgentError;
pub use provider::{AccrualOutcome, AccrualProvider};
pub use rate_limiter::RateLimiter;
use tokio::sync::watch;

/// Resolves once the agent has been told to stop. A dropped sender counts as a stop request.
pub(crate) async fn cancelled(signal: &mut watch::Receiver<bool>) {
    let _ = signal.wait_for(|stop| *stop).await;
}
