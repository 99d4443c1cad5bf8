use log::trace;
use lp_common::Points;
use sqlx::SqliteConnection;

use crate::{db::errors::LedgerError, db_types::Balance};

pub async fn insert_zero_balance(user_id: i64, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    sqlx::query("INSERT INTO balances (user_id) VALUES ($1);").bind(user_id).execute(conn).await?;
    Ok(())
}

pub async fn fetch_balance(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<Balance>, LedgerError> {
    let balance = sqlx::query_as::<_, Balance>("SELECT current, withdrawn FROM balances WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(balance)
}

/// Adds `amount` to the user's current balance.
pub async fn credit(user_id: i64, amount: Points, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let result = sqlx::query(
        "UPDATE balances SET current = current + $1, updated_at = CURRENT_TIMESTAMP WHERE user_id = $2",
    )
    .bind(amount)
    .bind(user_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::UserNotFound(user_id));
    }
    trace!("🧑️ User #{user_id} credited with {amount}");
    Ok(())
}

/// Moves `amount` from the current balance to the withdrawn total, but only if the current balance covers it.
///
/// The check and the write are one statement, so the database write lock is held from the moment the balance is
/// read. Returns `false` if the balance was too small (or the user does not exist), in which case nothing changed.
pub async fn debit(user_id: i64, amount: Points, conn: &mut SqliteConnection) -> Result<bool, LedgerError> {
    let result = sqlx::query(
        r#"
            UPDATE balances
            SET current = current - $1, withdrawn = withdrawn + $1, updated_at = CURRENT_TIMESTAMP
            WHERE user_id = $2 AND current >= $1
        "#,
    )
    .bind(amount)
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
