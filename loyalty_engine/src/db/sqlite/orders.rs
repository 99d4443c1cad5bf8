use log::{debug, trace};
use lp_common::Points;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db::errors::LedgerError,
    db_types::{Order, OrderNumber, OrderStatusType},
};

/// Inserts a new order with status `NEW` using the given connection and returns its id. Uniqueness of the order number
/// is enforced by the database; the raw driver error is returned so that the caller can work out who owns the number.
///
/// The statement is run to completion before the id is returned, so the order is visible to other connections as soon
/// as the surrounding transaction commits.
pub async fn insert_order(user_id: i64, number: &OrderNumber, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let id = sqlx::query("INSERT INTO orders (user_id, number) VALUES ($1, $2);")
        .bind(user_id)
        .bind(number)
        .execute(conn)
        .await?
        .last_insert_rowid();
    debug!("📦️ Order {number} has been saved in the DB with id {id}");
    Ok(id)
}

/// Returns the order with the given number, if it exists.
pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, LedgerError> {
    let query = OrderQueryFilter::default().with_number(number.clone());
    let order = fetch_orders(query, conn).await?.into_iter().next();
    Ok(order)
}

/// Returns the current status of the order with the given id, if it exists.
pub async fn fetch_order_status(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderStatusType>, LedgerError> {
    let status = sqlx::query_as::<_, (OrderStatusType,)>("SELECT status FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(conn)
        .await?
        .map(|(s,)| s);
    Ok(status)
}

#[derive(Debug, Clone, Default)]
pub struct OrderQueryFilter {
    number: Option<OrderNumber>,
    user_id: Option<i64>,
    statuses: Vec<OrderStatusType>,
}

impl OrderQueryFilter {
    pub fn with_number(mut self, number: OrderNumber) -> Self {
        self.number = Some(number);
        self
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.number.is_none() && self.user_id.is_none() && self.statuses.is_empty()
    }
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn fetch_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, LedgerError> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT id, user_id, number, status, accrual, created_at, updated_at FROM orders
    "#,
    );
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(number) = query.number {
        where_clause.push("number = ");
        where_clause.push_bind_unseparated(number);
    }
    if let Some(id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(id);
    }
    if !query.statuses.is_empty() {
        let statuses = query.statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    builder.push(" ORDER BY created_at ASC, id ASC");

    trace!("📦️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<Order>();
    let orders = query.fetch_all(conn).await?;
    trace!("📦️ Result of fetch_orders: {:?}", orders.len());
    Ok(orders)
}

/// Writes a verdict to an order that does not have a final status yet, and returns the id of the order's owner.
///
/// Returns `None` if no order with the given id is open, i.e. it either does not exist or has already been
/// finalised. Because the first statement is an `UPDATE`, the database write lock is taken as soon as the order has
/// been found, and the owner lookup that follows runs under that lock.
pub(crate) async fn update_open_order_status(
    order_id: i64,
    status: OrderStatusType,
    accrual: Option<Points>,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, LedgerError> {
    let updated = sqlx::query(
        r#"
            UPDATE orders
            SET status = $1, accrual = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status IN ('NEW', 'PROCESSING')
        "#,
    )
    .bind(status)
    .bind(accrual)
    .bind(order_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    if updated == 0 {
        return Ok(None);
    }
    let (user_id,) =
        sqlx::query_as::<_, (i64,)>("SELECT user_id FROM orders WHERE id = $1").bind(order_id).fetch_one(conn).await?;
    Ok(Some(user_id))
}
