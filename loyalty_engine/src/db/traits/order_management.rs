use crate::db_types::{Order, OrderNumber};

/// The `OrderManagement` trait defines the behaviour for submitting orders and querying information about them.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    type Error: std::error::Error;

    /// Submits a new order with status `NEW` for the given user and returns its id.
    ///
    /// Order numbers are unique across all users. Resubmitting a number the user already owns fails with an error that
    /// carries the existing order's id, and no new row is created. A number owned by another user is rejected.
    async fn create_order(&self, user_id: i64, number: &OrderNumber) -> Result<i64, Self::Error>;

    /// Fetches all orders submitted by the given user, oldest first.
    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, Self::Error>;

    /// Fetches the order with the given number. If it does not exist, `None` is returned.
    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, Self::Error>;
}
