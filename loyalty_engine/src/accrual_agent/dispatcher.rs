use std::{sync::Arc, time::Duration};

use log::*;
use tokio::{
    sync::{mpsc, watch},
    time::MissedTickBehavior,
};

use crate::{accrual_agent::cancelled, db::traits::AccrualLedger, db_types::Order};

/// Periodically feeds the orders that are still awaiting a verdict into the work channel.
pub(crate) struct Dispatcher<L> {
    ledger: Arc<L>,
    orders: mpsc::Sender<Order>,
    interval: Duration,
    cancel: watch::Receiver<bool>,
}

impl<L: AccrualLedger> Dispatcher<L> {
    pub fn new(ledger: Arc<L>, orders: mpsc::Sender<Order>, interval: Duration, cancel: watch::Receiver<bool>) -> Self {
        Self { ledger, orders, interval, cancel }
    }

    /// Runs dispatch cycles until the agent is stopped. The first cycle runs immediately.
    pub async fn run(mut self) {
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🚚️ Dispatch loop started. Looking for orders every {}s", self.interval.as_secs_f32());
        loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut self.cancel) => break,
                _ = timer.tick() => {},
            }
            if !self.dispatch().await {
                break;
            }
        }
        info!("🚚️ Dispatch loop stopped");
    }

    /// Pushes every order awaiting a verdict into the work channel, waiting for room when it is full.
    /// Returns `false` if the batch was abandoned because the agent is stopping.
    async fn dispatch(&mut self) -> bool {
        let result = tokio::select! {
            biased;
            _ = cancelled(&mut self.cancel) => return false,
            result = self.ledger.orders_awaiting_verdict() => result,
        };
        let orders = match result {
            Ok(orders) => orders,
            Err(e) => {
                error!("🚚️ Could not fetch orders awaiting a verdict. Will try again next cycle. {e}");
                return true;
            },
        };
        if orders.is_empty() {
            trace!("🚚️ No orders awaiting a verdict");
            return true;
        }
        debug!("🚚️ Dispatching {} orders", orders.len());
        for order in orders {
            tokio::select! {
                biased;
                _ = cancelled(&mut self.cancel) => {
                    debug!("🚚️ Dispatch cycle abandoned");
                    return false;
                },
                sent = self.orders.send(order) => if sent.is_err() {
                    debug!("🚚️ Work channel is closed");
                    return false;
                },
            }
        }
        true
    }
}
