//! Payment request types for the PeerMatch matching engine.
//!
//! A [`PaymentRequest`] is owned by the external queue manager. The matching
//! engine only reads requests and proposes pairings; it never changes
//! [`RequestStatus`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CustomerId, PeermatchError, RequestId, Result};

/// Which side of the exchange a request is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    /// Customer wants to pay money in over a P2P rail.
    Deposit,
    /// Customer wants to receive money out over a P2P rail.
    Withdrawal,
}

impl RequestType {
    /// The side a counterparty must be on.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Deposit => Self::Withdrawal,
            Self::Withdrawal => Self::Deposit,
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deposit => write!(f, "deposit"),
            Self::Withdrawal => write!(f, "withdrawal"),
        }
    }
}

/// The P2P payment rail a request settles over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Venmo,
    CashApp,
    PayPal,
    Zelle,
}

impl PaymentMethod {
    /// All supported rails, in display order.
    pub const ALL: [Self; 4] = [Self::Venmo, Self::CashApp, Self::PayPal, Self::Zelle];

    /// How much slower this rail settles relative to the baseline.
    #[must_use]
    pub fn settlement_multiplier(self) -> f64 {
        match self {
            Self::Venmo | Self::CashApp => 1.0,
            Self::PayPal => 1.2,
            Self::Zelle => 1.5,
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Venmo => write!(f, "venmo"),
            Self::CashApp => write!(f, "cashapp"),
            Self::PayPal => write!(f, "paypal"),
            Self::Zelle => write!(f, "zelle"),
        }
    }
}

/// Lifecycle status of a request. Transitions are owned by the queue manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Matched,
    InProgress,
    Completed,
    Cancelled,
    Expired,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Matched => write!(f, "matched"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// Queue priority of a request.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// Rail-specific contact details the counterparties exchange off-platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum PaymentDetails {
    Venmo { username: String },
    CashApp { cashtag: String },
    PayPal { email: String },
    /// Zelle accepts either a registered email or phone number.
    Zelle { contact: String },
}

impl PaymentDetails {
    /// The rail these details belong to.
    #[must_use]
    pub fn method(&self) -> PaymentMethod {
        match self {
            Self::Venmo { .. } => PaymentMethod::Venmo,
            Self::CashApp { .. } => PaymentMethod::CashApp,
            Self::PayPal { .. } => PaymentMethod::PayPal,
            Self::Zelle { .. } => PaymentMethod::Zelle,
        }
    }
}

/// Latitude/longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Where a customer says they are. Used only by geo comparators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Coarse region code (e.g. `US-CA`).
    pub region: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// A pending deposit or withdrawal waiting for a counterparty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub id: RequestId,
    pub customer_id: CustomerId,
    #[serde(rename = "type")]
    pub request_type: RequestType,
    pub payment_method: PaymentMethod,
    pub amount: Decimal,
    pub status: RequestStatus,
    #[serde(default)]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub payment_details: PaymentDetails,
    #[serde(default)]
    pub matched_with: Option<RequestId>,
    #[serde(default)]
    pub location: Option<Location>,
}

impl PaymentRequest {
    /// Structural checks the caller is responsible for before searching.
    ///
    /// # Errors
    /// `InvalidRequest` when the amount is not positive, the details belong to
    /// another rail, or the request expires before it was created.
    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(self.invalid("amount must be positive"));
        }
        if self.payment_details.method() != self.payment_method {
            return Err(self.invalid(&format!(
                "payment details are for {}, request is for {}",
                self.payment_details.method(),
                self.payment_method,
            )));
        }
        if self.expires_at < self.created_at {
            return Err(self.invalid("expires before it was created"));
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> PeermatchError {
        PeermatchError::InvalidRequest {
            id: self.id,
            reason: reason.to_string(),
        }
    }

    /// Milliseconds since creation, clamped at zero for clock skew.
    #[must_use]
    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_milliseconds().max(0)
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    #[must_use]
    pub fn is_high_priority(&self) -> bool {
        self.priority == Priority::High
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl PaymentDetails {
    pub fn dummy(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Venmo => Self::Venmo {
                username: "@test-user".to_string(),
            },
            PaymentMethod::CashApp => Self::CashApp {
                cashtag: "$testuser".to_string(),
            },
            PaymentMethod::PayPal => Self::PayPal {
                email: "test@example.com".to_string(),
            },
            PaymentMethod::Zelle => Self::Zelle {
                contact: "+15550100".to_string(),
            },
        }
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl PaymentRequest {
    /// A pending, normal-priority request from a fresh customer, created now
    /// and expiring in 24 hours.
    pub fn dummy(request_type: RequestType, method: PaymentMethod, amount: Decimal) -> Self {
        let customer = CustomerId::new(uuid::Uuid::now_v7().to_string());
        Self::dummy_for_customer(customer, request_type, method, amount)
    }

    pub fn dummy_for_customer(
        customer_id: CustomerId,
        request_type: RequestType,
        method: PaymentMethod,
        amount: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RequestId::new(),
            customer_id,
            request_type,
            payment_method: method,
            amount,
            status: RequestStatus::Pending,
            priority: Priority::Normal,
            created_at: now,
            expires_at: now + chrono::Duration::hours(24),
            payment_details: PaymentDetails::dummy(method),
            matched_with: None,
            location: None,
        }
    }
}
