use lp_common::Points;

use crate::db_types::{Balance, OrderNumber, Withdrawal};

/// The `BalanceManagement` trait defines the behaviour for reading balances and spending points.
#[allow(async_fn_in_trait)]
pub trait BalanceManagement {
    type Error: std::error::Error;

    async fn balance(&self, user_id: i64) -> Result<Balance, Self::Error>;

    /// Spends `amount` points against the order with the given number.
    ///
    /// In a single transaction, the balance is checked while holding the write lock, the withdrawal is recorded and
    /// `amount` is moved from the current balance to the withdrawn total. If the current balance is too small, or the
    /// order number has been used for a withdrawal before, nothing changes and an error is returned.
    async fn withdraw(&self, user_id: i64, amount: Points, number: &OrderNumber) -> Result<(), Self::Error>;

    /// Fetches all withdrawals made by the given user, oldest first.
    async fn withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, Self::Error>;
}
