use std::future::Future;

use lp_common::Points;

use crate::db_types::{Order, OrderStatusType};

/// The part of the ledger that the reconciliation agent depends on.
///
/// The agent drives this trait from several tokio tasks, so unlike the other backend traits, the returned futures
/// must be `Send`.
pub trait AccrualLedger: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns every order whose status is `NEW` or `PROCESSING`, oldest first.
    fn orders_awaiting_verdict(&self) -> impl Future<Output = Result<Vec<Order>, Self::Error>> + Send;

    /// Applies a verdict from the accrual service to an order in one transaction: the order's status, accrual and
    /// update timestamp are written and, for a `PROCESSED` verdict with a positive accrual, the owner's balance is
    /// credited with exactly that accrual. Readers never see one of these writes without the other.
    ///
    /// Orders that already have a final status are left untouched and an error is returned, so that a repeated
    /// verdict can never credit the same order twice.
    fn apply_verdict(
        &self,
        order_id: i64,
        status: OrderStatusType,
        accrual: Points,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
