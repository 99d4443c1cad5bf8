use std::sync::Arc;

use log::*;
use lp_common::Points;
use tokio::sync::{mpsc, watch, Mutex};

use crate::{
    accrual_agent::{cancelled, AccrualOutcome, AccrualProvider, AgentError, RateLimiter},
    db::traits::AccrualLedger,
    db_types::{Order, OrderStatusType},
};

/// The receiving end of the work channel, shared by every worker in the pool. Only the worker that is currently
/// waiting for an order holds the lock.
pub(crate) type SharedOrderQueue = Arc<Mutex<mpsc::Receiver<Order>>>;

pub(crate) struct Worker<L, P> {
    id: usize,
    ledger: Arc<L>,
    provider: Arc<P>,
    limiter: Arc<RateLimiter>,
    orders: SharedOrderQueue,
    cancel: watch::Receiver<bool>,
}

impl<L, P> Worker<L, P>
where
    L: AccrualLedger,
    P: AccrualProvider,
{
    pub fn new(
        id: usize,
        ledger: Arc<L>,
        provider: Arc<P>,
        limiter: Arc<RateLimiter>,
        orders: SharedOrderQueue,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        Self { id, ledger, provider, limiter, orders, cancel }
    }

    /// Takes orders off the work channel until the channel is closed and empty, or the agent is stopped.
    ///
    /// Single orders never bring the worker down. The only error returned is a poisoned rate limiter.
    pub async fn run(mut self) -> Result<(), AgentError> {
        debug!("👷️ Worker {} started", self.id);
        loop {
            let order = tokio::select! {
                biased;
                _ = cancelled(&mut self.cancel) => break,
                order = next_order(&self.orders) => match order {
                    Some(order) => order,
                    None => break,
                },
            };
            self.reconcile(order).await?;
        }
        debug!("👷️ Worker {} stopped", self.id);
        Ok(())
    }

    async fn reconcile(&mut self, order: Order) -> Result<(), AgentError> {
        let id = self.id;
        loop {
            if !self.limiter.wait_for_clearance(&mut self.cancel).await? {
                debug!("👷️ Worker {id} abandoned order {} during cooldown", order.number);
                return Ok(());
            }
            trace!("👷️ Worker {id} is asking for a verdict on order {}", order.number);
            let outcome = tokio::select! {
                biased;
                _ = cancelled(&mut self.cancel) => {
                    debug!("👷️ Worker {id} abandoned in-flight request for order {}", order.number);
                    return Ok(());
                },
                outcome = self.provider.fetch(order.number.as_str()) => outcome,
            };
            match outcome {
                AccrualOutcome::RateLimited(retry_after) => {
                    let deadline = self.limiter.throttle(retry_after)?;
                    let wait = deadline.saturating_duration_since(tokio::time::Instant::now());
                    warn!(
                        "👷️ Worker {id} was throttled on order {}. All requests are paused for {}s",
                        order.number,
                        wait.as_secs()
                    );
                },
                AccrualOutcome::TransientError(e) => {
                    warn!("👷️ Worker {id} could not fetch a verdict for order {}. {e}", order.number);
                    return Ok(());
                },
                AccrualOutcome::Verdict { status, accrual } => {
                    if !status.is_final() {
                        trace!("👷️ Accrual service has not settled order {} yet ({status})", order.number);
                    }
                    let status = OrderStatusType::from(status);
                    self.apply(&order, status, accrual.unwrap_or_default()).await;
                    return Ok(());
                },
            }
        }
    }

    async fn apply(&self, order: &Order, status: OrderStatusType, accrual: Points) {
        match self.ledger.apply_verdict(order.id, status, accrual).await {
            Ok(()) if status == OrderStatusType::Processed => {
                info!("👷️ Order {} processed. User #{} earned {accrual}", order.number, order.user_id)
            },
            Ok(()) => debug!("👷️ Order {} is now {status}", order.number),
            Err(e) => error!("👷️ Could not apply verdict {status} to order {}. {e}", order.number),
        }
    }
}

async fn next_order(orders: &Mutex<mpsc::Receiver<Order>>) -> Option<Order> {
    orders.lock().await.recv().await
}
