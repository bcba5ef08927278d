//! Queue health: demand/supply, amount overlap, wait times, bottlenecks.
//!
//! Works on the whole [`Queue`] snapshot, independent of any single search.
//!
//! ```text
//! ratio     = |withdrawals| / |deposits|              (0 with no deposits)
//! overlap   = |D ∩ W| / max(|D|, |W|)                 (distinct amounts)
//! wait(s)   = avg_match_time / (min(|s|, |c|) / max(|s|, |c|))
//! ```
//!
//! A zero match rate, from either side being empty, means an unbounded wait
//! ([`WaitTime::Unbounded`]).

use std::collections::{BTreeMap, BTreeSet};

use peermatch_types::{
    Bottleneck, ExpectedWaitTimes, PaymentRequest, Queue, QueueAnalysis, QueueConfig,
    QueueRecommendation, RequestType, Result, WaitTime,
};
use rust_decimal::Decimal;

/// Computes [`QueueAnalysis`] under a fixed [`QueueConfig`].
#[derive(Debug, Clone, Default)]
pub struct QueueOptimizer {
    config: QueueConfig,
}

impl QueueOptimizer {
    /// # Errors
    /// `Configuration` if a threshold is out of range.
    pub fn new(config: QueueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Analyze a queue snapshot.
    #[must_use]
    pub fn analyze(&self, queue: &Queue) -> QueueAnalysis {
        let deposit_count = queue.deposits.len();
        let withdrawal_count = queue.withdrawals.len();

        let demand_supply_ratio = demand_supply_ratio(deposit_count, withdrawal_count);

        let deposit_amounts = distinct_amounts(&queue.deposits);
        let withdrawal_amounts = distinct_amounts(&queue.withdrawals);
        let amount_overlap = amount_overlap(&deposit_amounts, &withdrawal_amounts);

        let mut recommendations = Vec::new();
        if demand_supply_ratio < self.config.low_ratio {
            recommendations.push(QueueRecommendation::IncreaseWithdrawalIncentives);
        }
        if demand_supply_ratio > self.config.high_ratio {
            recommendations.push(QueueRecommendation::PrioritizeHighValueDeposits);
        }
        if amount_overlap < self.config.min_overlap {
            recommendations.push(QueueRecommendation::EncourageRoundNumberTransactions);
        }

        let expected_wait_time = ExpectedWaitTimes {
            deposit: self.wait_time(deposit_count, withdrawal_count),
            withdrawal: self.wait_time(withdrawal_count, deposit_count),
        };

        let bottlenecks = self.bottlenecks(queue);

        tracing::debug!(
            deposits = deposit_count,
            withdrawals = withdrawal_count,
            ratio = demand_supply_ratio,
            overlap = amount_overlap,
            bottlenecks = bottlenecks.len(),
            "Queue analyzed"
        );

        QueueAnalysis {
            deposit_count,
            withdrawal_count,
            demand_supply_ratio,
            distinct_deposit_amounts: deposit_amounts.len(),
            distinct_withdrawal_amounts: withdrawal_amounts.len(),
            amount_overlap,
            recommendations,
            expected_wait_time,
            bottlenecks,
        }
    }

    /// Expected wait for a request joining the side with `side_len` requests.
    #[must_use]
    pub fn wait_time(&self, side_len: usize, counter_len: usize) -> WaitTime {
        if side_len == 0 || counter_len == 0 {
            return WaitTime::Unbounded;
        }
        let match_rate = side_len.min(counter_len) as f64 / side_len.max(counter_len) as f64;
        WaitTime::Minutes(self.config.avg_match_time_minutes / match_rate)
    }

    /// Amounts where one side outnumbers the other by more than
    /// `bottleneck_ratio`, or where the other side is absent. Sorted by
    /// amount; an amount appears at most once.
    #[must_use]
    pub fn bottlenecks(&self, queue: &Queue) -> Vec<Bottleneck> {
        let mut counts: BTreeMap<Decimal, (usize, usize)> = BTreeMap::new();
        for r in &queue.deposits {
            counts.entry(r.amount.normalize()).or_default().0 += 1;
        }
        for r in &queue.withdrawals {
            counts.entry(r.amount.normalize()).or_default().1 += 1;
        }

        counts
            .into_iter()
            .filter_map(|(amount, (deposit_count, withdrawal_count))| {
                let (heavy_side, heavy, light) = if deposit_count >= withdrawal_count {
                    (RequestType::Deposit, deposit_count, withdrawal_count)
                } else {
                    (RequestType::Withdrawal, withdrawal_count, deposit_count)
                };
                let ratio = (light > 0).then(|| heavy as f64 / light as f64);
                let is_bottleneck = match ratio {
                    None => heavy > 0,
                    Some(r) => r > self.config.bottleneck_ratio,
                };
                is_bottleneck.then_some(Bottleneck {
                    amount,
                    deposit_count,
                    withdrawal_count,
                    heavy_side,
                    ratio,
                })
            })
            .collect()
    }
}

/// Analyze a queue with the default thresholds.
#[must_use]
pub fn optimize_queue(queue: &Queue) -> QueueAnalysis {
    QueueOptimizer::default().analyze(queue)
}

/// Withdrawals per deposit; `0` when there are no deposits.
#[must_use]
pub fn demand_supply_ratio(deposit_count: usize, withdrawal_count: usize) -> f64 {
    if deposit_count == 0 {
        0.0
    } else {
        withdrawal_count as f64 / deposit_count as f64
    }
}

/// Share of distinct amounts present on both sides, relative to the side
/// with more distinct amounts. `0` when either side is empty.
#[must_use]
pub fn amount_overlap(deposits: &BTreeSet<Decimal>, withdrawals: &BTreeSet<Decimal>) -> f64 {
    let larger = deposits.len().max(withdrawals.len());
    if larger == 0 {
        return 0.0;
    }
    deposits.intersection(withdrawals).count() as f64 / larger as f64
}

/// Distinct amounts, normalized so `100` and `100.00` collapse.
fn distinct_amounts(requests: &[PaymentRequest]) -> BTreeSet<Decimal> {
    requests.iter().map(|r| r.amount.normalize()).collect()
}
