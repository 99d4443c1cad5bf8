use lp_common::Points;
use sqlx::migrate::MigrateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration error: {0}")]
    MigrationError(#[from] MigrateError),
    #[error("The login '{0}' is already taken")]
    DuplicateLogin(String),
    #[error("User not found: {0}")]
    UserNotFound(i64),
    #[error("The order has already been submitted by this user. Order.id = {0}")]
    OrderAlreadyOwnedBySelf(i64),
    #[error("Order {0} has already been submitted by another user")]
    OrderOwnedByOther(String),
    #[error("Order not found: {0}")]
    OrderNotFound(i64),
    #[error("Order {0} already has a final status and cannot be updated")]
    OrderAlreadyFinalised(i64),
    #[error("Invalid verdict: {0}")]
    InvalidVerdict(String),
    #[error("Insufficient funds in the account")]
    InsufficientFunds,
    #[error("A withdrawal has already been made against order {0}")]
    OrderNumberReused(String),
    #[error("Invalid withdrawal amount: {0}")]
    InvalidAmount(Points),
}

/// `true` if the driver error was caused by a `UNIQUE` constraint violation.
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
