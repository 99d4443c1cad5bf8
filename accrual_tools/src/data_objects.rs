use std::fmt::Display;

use lp_common::Points;
use serde::{Deserialize, Serialize};

/// The order processing states reported by the accrual service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    /// The order is known to the accrual service, but processing has not started.
    Registered,
    /// The accrual for the order is being calculated.
    Processing,
    /// The order will never earn an accrual.
    Invalid,
    /// The accrual has been calculated and is final.
    Processed,
}

impl Display for AccrualStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccrualStatus::Registered => write!(f, "REGISTERED"),
            AccrualStatus::Processing => write!(f, "PROCESSING"),
            AccrualStatus::Invalid => write!(f, "INVALID"),
            AccrualStatus::Processed => write!(f, "PROCESSED"),
        }
    }
}

impl AccrualStatus {
    /// `true` when the accrual service will not change its mind about this order.
    pub fn is_final(&self) -> bool {
        matches!(self, AccrualStatus::Invalid | AccrualStatus::Processed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: AccrualStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
}

impl AccrualResponse {
    /// The response the client synthesises when the accrual service does not know about an order.
    pub fn unregistered(order: &str) -> Self {
        Self { order: order.to_string(), status: AccrualStatus::Invalid, accrual: None }
    }
}
