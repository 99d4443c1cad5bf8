//! # Ledger backend contracts
//!
//! The traits in this module define what a storage backend must provide to act as the loyalty ledger. Every
//! multi-step mutation is expected to be atomic: either all of its writes land, or none do.
//!
//! * [`UserManagement`] creates users (together with their zero balance) and looks them up.
//! * [`OrderManagement`] accepts order submissions and answers queries about them.
//! * [`BalanceManagement`] reads balances and performs withdrawals.
//! * [`AccrualLedger`] is the narrow interface used by the reconciliation agent: find the orders that still need a
//!   verdict, and apply a verdict (status change plus balance credit) to one of them.
mod accrual_ledger;
mod balance_management;
mod order_management;
mod user_management;

pub use accrual_ledger::AccrualLedger;
pub use balance_management::BalanceManagement;
pub use order_management::OrderManagement;
pub use user_management::UserManagement;
