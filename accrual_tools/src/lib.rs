//! # Accrual tools
//!
//! A thin client for the external accrual service. The service is a black box that, given an order number, reports
//! whether the order has been registered, is being processed, is invalid, or has been processed together with the
//! number of bonus points accrued for it.
//!
//! The client performs exactly one round trip per call and classifies the response. Policy (retrying, rate limiting,
//! applying verdicts to the ledger) lives with the caller.
mod api;
mod config;
mod error;

mod data_objects;

pub use api::AccrualApi;
pub use config::{AccrualConfig, DEFAULT_ACCRUAL_TIMEOUT};
pub use data_objects::{AccrualResponse, AccrualStatus};
pub use error::AccrualApiError;
