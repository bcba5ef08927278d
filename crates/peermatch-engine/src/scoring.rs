//! Candidate scoring.
//!
//! ```text
//! total = rules + time + exact_bonus + priority_bonus - penalty
//! time  = max(0, 100 - (age(d) + age(w)) / (2 * 1h))
//! penalty = risk if risk > 30 else 0
//! ```
//!
//! The total is clamped at zero. Scores are plain `f64`: they rank pairings
//! and are never used as money.

use chrono::{DateTime, Utc};
use peermatch_types::{
    EngineConfig, MatchingCandidate, PaymentMethod, PaymentRequest, RiskAssessment, RuleSet,
    ScoreBreakdown, constants,
};
use rust_decimal::Decimal;

use crate::evaluator::{EvaluationContext, evaluate_rules};

/// Linear decay over the mean age of the two requests, in hours.
#[must_use]
pub fn time_score(
    deposit: &PaymentRequest,
    withdrawal: &PaymentRequest,
    now: DateTime<Utc>,
) -> f64 {
    let combined_ms = (deposit.age_ms(now) + withdrawal.age_ms(now)) as f64;
    (constants::MAX_TIME_SCORE - combined_ms / (2.0 * constants::MS_PER_HOUR as f64)).max(0.0)
}

/// Minutes the counterparties are expected to need for the off-platform
/// transfer, using the default high-value threshold of 500.
#[must_use]
pub fn estimate_settlement_time(method: PaymentMethod, amount: Decimal) -> u32 {
    estimate_settlement_time_with(
        method,
        amount,
        Decimal::from(constants::DEFAULT_HIGH_VALUE_THRESHOLD),
    )
}

/// As [`estimate_settlement_time`], with an explicit high-value threshold.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn estimate_settlement_time_with(
    method: PaymentMethod,
    amount: Decimal,
    high_value_threshold: Decimal,
) -> u32 {
    let size = if amount > high_value_threshold {
        constants::HIGH_VALUE_SETTLEMENT_MULTIPLIER
    } else {
        1.0
    };
    let minutes = constants::BASE_SETTLEMENT_MINUTES * method.settlement_multiplier() * size;
    minutes.round().max(0.0) as u32
}

/// Score one oriented pairing. `risk` is the pairing's assessment, computed
/// by the caller so it can be reused for reporting.
#[must_use]
pub fn score_candidate(
    config: &EngineConfig,
    rules: &RuleSet,
    deposit: &PaymentRequest,
    withdrawal: &PaymentRequest,
    risk: RiskAssessment,
    ctx: &EvaluationContext<'_>,
) -> MatchingCandidate {
    let outcome = evaluate_rules(rules, deposit, withdrawal, ctx);
    let mut reasons = outcome.reasons;
    let mut breakdown = ScoreBreakdown {
        rule_score: outcome.score,
        time_score: time_score(deposit, withdrawal, ctx.now),
        ..ScoreBreakdown::default()
    };

    if deposit.amount == withdrawal.amount {
        breakdown.exact_amount_bonus = config.exact_amount_bonus;
        reasons.push("Exact amount match".to_string());
    }

    if deposit.is_high_priority() || withdrawal.is_high_priority() {
        breakdown.priority_bonus = config.priority_bonus;
        reasons.push("High priority request".to_string());
    }

    let mut risk_factors = Vec::new();
    if risk.risk_score > config.risk_penalty_threshold {
        breakdown.risk_penalty = risk.risk_score;
        risk_factors.clone_from(&risk.risk_factors);
    }

    let raw = breakdown.rule_score
        + breakdown.time_score
        + breakdown.exact_amount_bonus
        + breakdown.priority_bonus
        - breakdown.risk_penalty;
    breakdown.total = raw.max(0.0);

    let amount = deposit.amount;
    let estimated_settlement_minutes =
        estimate_settlement_time_with(deposit.payment_method, amount, config.high_value_threshold);

    tracing::trace!(
        deposit = %deposit.id,
        withdrawal = %withdrawal.id,
        score = breakdown.total,
        risk = risk.risk_score,
        %amount,
        "Scored candidate"
    );

    MatchingCandidate {
        deposit: deposit.clone(),
        withdrawal: withdrawal.clone(),
        score: breakdown.total,
        breakdown,
        match_reasons: reasons,
        risk_factors,
        risk,
        estimated_settlement_minutes,
    }
}
