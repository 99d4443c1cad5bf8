mod db;

mod balances;
mod orders;
mod users;
mod withdrawals;

use std::{str::FromStr, time::Duration};

pub use db::SqliteDatabase;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};

use crate::db::errors::LedgerError;

/// How long a connection waits for another writer to release the database lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, LedgerError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
