use log::{debug, trace};
use lp_common::Points;
use sqlx::SqliteConnection;

use crate::{
    db::errors::{is_unique_violation, LedgerError},
    db_types::{OrderNumber, Withdrawal},
};

pub async fn insert_withdrawal(
    user_id: i64,
    number: &OrderNumber,
    amount: Points,
    conn: &mut SqliteConnection,
) -> Result<i64, LedgerError> {
    let result = sqlx::query("INSERT INTO withdrawals (user_id, number, amount) VALUES ($1, $2, $3);")
        .bind(user_id)
        .bind(number)
        .bind(amount)
        .execute(conn)
        .await;
    match result.map(|r| r.last_insert_rowid()) {
        Ok(id) => {
            debug!("🧑️ Withdrawal #{id} of {amount} against order {number} recorded for user #{user_id}");
            Ok(id)
        },
        Err(e) if is_unique_violation(&e) => Err(LedgerError::OrderNumberReused(number.as_str().to_string())),
        Err(e) => Err(e.into()),
    }
}

/// Fetches all withdrawals for the given user, ordered by `created_at` in ascending order.
pub async fn fetch_withdrawals_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Withdrawal>, LedgerError> {
    let withdrawals = sqlx::query_as::<_, Withdrawal>(
        r#"
            SELECT id, user_id, number, amount, created_at
            FROM withdrawals
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    trace!("🧑️ {} withdrawals found for user #{user_id}", withdrawals.len());
    Ok(withdrawals)
}
