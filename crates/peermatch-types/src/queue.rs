//! Queue snapshot and queue-health analysis types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{PaymentRequest, RequestType};

/// Read-only snapshot of the two pending queues.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Queue {
    /// Pending deposits in queue order.
    pub deposits: Vec<PaymentRequest>,
    /// Pending withdrawals in queue order.
    pub withdrawals: Vec<PaymentRequest>,
}

impl Queue {
    #[must_use]
    pub fn new(deposits: Vec<PaymentRequest>, withdrawals: Vec<PaymentRequest>) -> Self {
        Self {
            deposits,
            withdrawals,
        }
    }

    /// Partition a mixed pool by request type, keeping only pending requests.
    pub fn from_pool<'a>(pool: impl IntoIterator<Item = &'a PaymentRequest>) -> Self {
        let (deposits, withdrawals): (Vec<_>, Vec<_>) = pool
            .into_iter()
            .filter(|r| r.is_pending())
            .cloned()
            .partition(|r| r.request_type == RequestType::Deposit);
        Self {
            deposits,
            withdrawals,
        }
    }

    #[must_use]
    pub fn side(&self, side: RequestType) -> &[PaymentRequest] {
        match side {
            RequestType::Deposit => &self.deposits,
            RequestType::Withdrawal => &self.withdrawals,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deposits.is_empty() && self.withdrawals.is_empty()
    }
}

/// Expected wait before a request on one side finds a counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WaitTime {
    Minutes(f64),
    /// The other side of the queue is empty.
    Unbounded,
}

impl WaitTime {
    /// Minutes, with `f64::INFINITY` for an unbounded wait.
    #[must_use]
    pub fn as_minutes(self) -> f64 {
        match self {
            Self::Minutes(m) => m,
            Self::Unbounded => f64::INFINITY,
        }
    }

    #[must_use]
    pub fn is_unbounded(self) -> bool {
        matches!(self, Self::Unbounded)
    }
}

impl std::fmt::Display for WaitTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minutes(m) => write!(f, "{m:.1} min"),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Expected wait per side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedWaitTimes {
    pub deposit: WaitTime,
    pub withdrawal: WaitTime,
}

/// An amount where one side structurally outnumbers the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    pub amount: Decimal,
    pub deposit_count: usize,
    pub withdrawal_count: usize,
    /// The side that piles up at this amount.
    pub heavy_side: RequestType,
    /// Heavy count over light count; `None` when the light side is empty.
    pub ratio: Option<f64>,
}

/// Operational nudge emitted when queue health crosses a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueRecommendation {
    /// Too few withdrawals for the deposits waiting.
    IncreaseWithdrawalIncentives,
    /// Too few deposits for the withdrawals waiting.
    PrioritizeHighValueDeposits,
    /// The two sides rarely ask for the same amounts.
    EncourageRoundNumberTransactions,
}

impl std::fmt::Display for QueueRecommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IncreaseWithdrawalIncentives => write!(f, "increase withdrawal incentives"),
            Self::PrioritizeHighValueDeposits => write!(f, "prioritize high-value deposits"),
            Self::EncourageRoundNumberTransactions => {
                write!(f, "encourage round-number transactions")
            }
        }
    }
}

/// Aggregate health of the queue, independent of any single match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueAnalysis {
    pub deposit_count: usize,
    pub withdrawal_count: usize,
    /// Withdrawals over deposits; `0` when there are no deposits.
    pub demand_supply_ratio: f64,
    pub distinct_deposit_amounts: usize,
    pub distinct_withdrawal_amounts: usize,
    /// Shared distinct amounts over the larger distinct-amount count.
    pub amount_overlap: f64,
    pub recommendations: Vec<QueueRecommendation>,
    pub expected_wait_time: ExpectedWaitTimes,
    /// Sorted by amount ascending.
    pub bottlenecks: Vec<Bottleneck>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PaymentMethod, RequestStatus};

    #[test]
    fn from_pool_partitions_pending_only() {
        let d = PaymentRequest::dummy(RequestType::Deposit, PaymentMethod::Venmo, Decimal::ONE);
        let w = PaymentRequest::dummy(RequestType::Withdrawal, PaymentMethod::Venmo, Decimal::ONE);
        let mut done =
            PaymentRequest::dummy(RequestType::Withdrawal, PaymentMethod::Venmo, Decimal::ONE);
        done.status = RequestStatus::Completed;

        let queue = Queue::from_pool(&[d, w, done]);
        assert_eq!(queue.deposits.len(), 1);
        assert_eq!(queue.side(RequestType::Withdrawal).len(), 1);
        assert!(!queue.is_empty());
    }

    #[test]
    fn unbounded_wait_is_infinite() {
        assert!(WaitTime::Unbounded.as_minutes().is_infinite());
        assert!((WaitTime::Minutes(45.0).as_minutes() - 45.0).abs() < f64::EPSILON);
        assert_eq!(WaitTime::Unbounded.to_string(), "unbounded");
    }

    #[test]
    fn unbounded_wait_survives_json() {
        let waits = ExpectedWaitTimes {
            deposit: WaitTime::Unbounded,
            withdrawal: WaitTime::Minutes(30.0),
        };
        let json = serde_json::to_string(&waits).unwrap();
        let back: ExpectedWaitTimes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, waits);
    }

    #[test]
    fn recommendation_text() {
        assert_eq!(
            QueueRecommendation::IncreaseWithdrawalIncentives.to_string(),
            "increase withdrawal incentives"
        );
    }
}
