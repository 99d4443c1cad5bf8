//! # Loyalty server
//! This crate hosts the process that runs the loyalty ledger's background work. It is responsible for:
//! * Loading and validating the configuration.
//! * Opening (and migrating) the ledger database.
//! * Running the order reconciliation agent, which polls the accrual service and credits points to users.
//! * Shutting the agent down cleanly when the process is asked to stop.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
pub mod accrual_worker;
pub mod cli;
pub mod config;
pub mod errors;
pub mod server;
