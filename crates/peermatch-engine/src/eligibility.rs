//! Eligibility filter: the hard constraints a counterparty must pass before
//! it is scored.
//!
//! A counterparty `p` for query request `r` is eligible iff:
//! - `p` is on the opposite side and is not `r` itself
//! - same payment method and identical amount
//! - `p` is `pending` and not expired at `now`
//! - different customer (no self-matching)
//! - the fraud screen does not flag `p`
//!
//! Same-customer and expired pairings are rejected here so that they can
//! never reach the scorer.

use chrono::{DateTime, Utc};
use peermatch_types::PaymentRequest;

use crate::providers::FraudScreen;

/// Why a counterparty was filtered out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    SameRequest,
    SameSide,
    DifferentMethod,
    DifferentAmount,
    NotPending,
    Expired,
    SameCustomer,
    Suspicious,
    /// The fraud screen failed; the counterparty is excluded rather than trusted.
    ScreenUnavailable,
}

impl std::fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SameRequest => write!(f, "same request"),
            Self::SameSide => write!(f, "same side"),
            Self::DifferentMethod => write!(f, "different payment method"),
            Self::DifferentAmount => write!(f, "different amount"),
            Self::NotPending => write!(f, "not pending"),
            Self::Expired => write!(f, "expired"),
            Self::SameCustomer => write!(f, "same customer"),
            Self::Suspicious => write!(f, "flagged as suspicious"),
            Self::ScreenUnavailable => write!(f, "fraud screen unavailable"),
        }
    }
}

/// Check one counterparty against the query request.
///
/// The cheap structural checks run first; the fraud screen is only
/// consulted for otherwise-eligible counterparties.
///
/// # Errors
/// The first [`Ineligibility`] found.
pub fn check_eligibility(
    request: &PaymentRequest,
    counterparty: &PaymentRequest,
    now: DateTime<Utc>,
    fraud: &dyn FraudScreen,
) -> Result<(), Ineligibility> {
    if counterparty.id == request.id {
        return Err(Ineligibility::SameRequest);
    }
    if counterparty.request_type != request.request_type.opposite() {
        return Err(Ineligibility::SameSide);
    }
    if counterparty.payment_method != request.payment_method {
        return Err(Ineligibility::DifferentMethod);
    }
    if counterparty.amount != request.amount {
        return Err(Ineligibility::DifferentAmount);
    }
    if !counterparty.is_pending() {
        return Err(Ineligibility::NotPending);
    }
    if counterparty.is_expired(now) {
        return Err(Ineligibility::Expired);
    }
    if counterparty.customer_id == request.customer_id {
        return Err(Ineligibility::SameCustomer);
    }
    match fraud.is_suspicious(counterparty) {
        Ok(false) => Ok(()),
        Ok(true) => Err(Ineligibility::Suspicious),
        Err(err) => {
            tracing::warn!(
                counterparty = %counterparty.id,
                error = %err,
                "Fraud screen failed; excluding counterparty"
            );
            Err(Ineligibility::ScreenUnavailable)
        }
    }
}

/// Narrow `pool` to the counterparties eligible for `request`, preserving
/// pool order.
pub fn eligible_counterparties<'a>(
    request: &PaymentRequest,
    pool: &'a [PaymentRequest],
    now: DateTime<Utc>,
    fraud: &dyn FraudScreen,
) -> Vec<&'a PaymentRequest> {
    pool.iter()
        .filter(|candidate| match check_eligibility(request, candidate, now, fraud) {
            Ok(()) => true,
            Err(reason) => {
                tracing::debug!(
                    request = %request.id,
                    counterparty = %candidate.id,
                    %reason,
                    "Counterparty ineligible"
                );
                false
            }
        })
        .collect()
}
