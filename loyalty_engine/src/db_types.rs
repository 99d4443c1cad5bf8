use std::{fmt::Display, str::FromStr};

use accrual_tools::AccrualStatus;
use chrono::{DateTime, Utc};
use lp_common::Points;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------         User         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    /// Logins are case-insensitive and always stored in lower case.
    pub login: String,
    /// The opaque password hash supplied when the user was created.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       Balance        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct Balance {
    /// The points that are currently available for withdrawal.
    pub current: Points,
    /// The total of all withdrawals ever made.
    pub withdrawn: Points,
}

impl Balance {
    pub fn new(current: Points, withdrawn: Points) -> Self {
        Self { current, withdrawn }
    }
}

impl Display for Balance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "current: {}, withdrawn: {}", self.current, self.withdrawn)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// The order has been submitted, but the accrual service has not been asked about it yet.
    New,
    /// The accrual service knows about the order, but has not reached a final verdict.
    Processing,
    /// The order will never earn an accrual. Final.
    Invalid,
    /// The accrual for the order has been credited. Final.
    Processed,
}

impl OrderStatusType {
    /// Orders in a final state are never dispatched to the accrual service again.
    pub fn is_final(&self) -> bool {
        matches!(self, OrderStatusType::Invalid | OrderStatusType::Processed)
    }

    /// Only the reconciliation flow moves orders between states, and only forwards:
    /// `New -> Processing`, `New|Processing -> Invalid`, `New|Processing -> Processed`.
    /// Re-asserting `Processing` is allowed, since the accrual service may report it several times.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        !self.is_final() && next != OrderStatusType::New
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "NEW"),
            OrderStatusType::Processing => write!(f, "PROCESSING"),
            OrderStatusType::Invalid => write!(f, "INVALID"),
            OrderStatusType::Processed => write!(f, "PROCESSED"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "INVALID" => Ok(Self::Invalid),
            "PROCESSED" => Ok(Self::Processed),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

/// Maps the accrual service's vocabulary onto the ledger's. Orders that the accrual service has merely registered are
/// already being worked on as far as the ledger is concerned.
impl From<AccrualStatus> for OrderStatusType {
    fn from(status: AccrualStatus) -> Self {
        match status {
            AccrualStatus::Registered | AccrualStatus::Processing => OrderStatusType::Processing,
            AccrualStatus::Invalid => OrderStatusType::Invalid,
            AccrualStatus::Processed => OrderStatusType::Processed,
        }
    }
}

//--------------------------------------     OrderNumber      ---------------------------------------------------------
/// The externally supplied order number. Order numbers are unique across all users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        Order         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub number: OrderNumber,
    pub status: OrderStatusType,
    /// Only set once the order has been processed.
    pub accrual: Option<Points>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      Withdrawal      ---------------------------------------------------------
#[derive(Debug, Clone, FromRow)]
pub struct Withdrawal {
    pub id: i64,
    pub user_id: i64,
    /// The order the points were spent on. Each order number can only be paid for once.
    pub number: OrderNumber,
    pub amount: Points,
    pub created_at: DateTime<Utc>,
}
