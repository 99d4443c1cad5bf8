//! Loyalty Engine
//!
//! The loyalty engine keeps a ledger of bonus points. Users submit the numbers of their purchase orders, an external
//! accrual service decides how many points each order earns, and the engine credits those points to the user's
//! balance. Users spend points by withdrawing them against new orders.
//!
//! The library is divided into two main sections:
//! 1. The ledger ([`mod@db`]). The backend-agnostic contracts live in the [`UserManagement`], [`OrderManagement`],
//!    [`BalanceManagement`] and [`AccrualLedger`] traits, and [`SqliteDatabase`] implements all of them. Every
//!    operation that writes more than one record does so in a single transaction. The data types stored in the ledger
//!    are defined in the [`mod@db_types`] module and are public.
//! 2. The reconciliation agent ([`mod@accrual_agent`]). This is a background service that polls the accrual service
//!    for every order that is still awaiting a verdict, and applies the verdicts to the ledger. It respects the
//!    accrual service's throttling requests across all of its workers, and shuts down cleanly on request.
mod db;

pub mod accrual_agent;
pub mod db_types;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use accrual_agent::{AccrualAgent, AccrualOutcome, AccrualProvider, AgentConfig, AgentError, AgentState, RateLimiter};
#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::{
    errors::LedgerError,
    traits::{AccrualLedger, BalanceManagement, OrderManagement, UserManagement},
};
