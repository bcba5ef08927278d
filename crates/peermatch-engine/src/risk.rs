//! Per-pairing risk composition.
//!
//! Signals are additive:
//!
//! | signal                        | risk              |
//! |-------------------------------|-------------------|
//! | geographic mismatch           | +15               |
//! | creation gap > 24h            | +10               |
//! | either amount > 1000          | +20               |
//! | customer reputation           | + mean of both    |
//!
//! `recommended` holds while the total stays below the recommendation ceiling
//! (50 by default).

use peermatch_types::{CustomerId, EngineConfig, PaymentRequest, RiskAssessment, constants};

use crate::providers::{GeoComparator, RiskProvider};

/// Composes the risk signals for a pairing.
pub struct RiskAssessor<'a> {
    config: &'a EngineConfig,
    risk: &'a dyn RiskProvider,
    geo: &'a dyn GeoComparator,
}

impl<'a> RiskAssessor<'a> {
    #[must_use]
    pub fn new(
        config: &'a EngineConfig,
        risk: &'a dyn RiskProvider,
        geo: &'a dyn GeoComparator,
    ) -> Self {
        Self { config, risk, geo }
    }

    /// Assess the pairing of `deposit` and `withdrawal`.
    ///
    /// Collaborator failures never abort the assessment: a failed geo check
    /// counts as a mismatch and a failed reputation lookup counts as the
    /// configured fallback risk.
    #[must_use]
    pub fn assess(&self, deposit: &PaymentRequest, withdrawal: &PaymentRequest) -> RiskAssessment {
        let mut risk_score = 0.0;
        let mut risk_factors = Vec::new();
        let mut mitigation_strategies = Vec::new();

        if self.geo_mismatch(deposit, withdrawal) {
            risk_score += constants::GEO_MISMATCH_RISK;
            risk_factors.push("Geographic mismatch between counterparties".to_string());
            mitigation_strategies
                .push("Require additional verification for cross-region matches".to_string());
        }

        let gap = (deposit.created_at - withdrawal.created_at).abs();
        if gap.num_milliseconds() > self.config.timing_gap_hours * constants::MS_PER_HOUR {
            risk_score += constants::TIMING_GAP_RISK;
            risk_factors.push(format!("Requests created {}h apart", gap.num_hours()));
            mitigation_strategies.push("Confirm both parties are still active".to_string());
        }

        let threshold = self.config.unusual_amount_threshold;
        if deposit.amount > threshold || withdrawal.amount > threshold {
            risk_score += constants::UNUSUAL_AMOUNT_RISK;
            risk_factors.push("Unusual amount".to_string());
            mitigation_strategies.push("Hold for manual review before release".to_string());
        }

        let reputation = (f64::from(self.customer_risk(&deposit.customer_id))
            + f64::from(self.customer_risk(&withdrawal.customer_id)))
            / 2.0;
        risk_score += reputation;
        if reputation >= constants::REPUTATION_FACTOR_THRESHOLD {
            risk_factors.push(format!("Elevated customer reputation risk ({reputation:.1})"));
            mitigation_strategies.push("Limit exposure until history improves".to_string());
        }

        RiskAssessment {
            risk_score,
            risk_factors,
            mitigation_strategies,
            recommended: risk_score < self.config.risk_recommendation_ceiling,
        }
    }

    fn geo_mismatch(&self, deposit: &PaymentRequest, withdrawal: &PaymentRequest) -> bool {
        self.geo.mismatch(deposit, withdrawal).unwrap_or_else(|err| {
            tracing::warn!(
                deposit = %deposit.id,
                withdrawal = %withdrawal.id,
                error = %err,
                "Geo comparison failed; assuming mismatch"
            );
            true
        })
    }

    fn customer_risk(&self, customer: &CustomerId) -> u8 {
        match self.risk.customer_risk(customer) {
            Ok(risk) => risk.min(constants::MAX_CUSTOMER_RISK),
            Err(err) => {
                tracing::warn!(
                    %customer,
                    error = %err,
                    fallback = self.config.fallback_customer_risk,
                    "Reputation lookup failed; using fallback risk"
                );
                self.config.fallback_customer_risk
            }
        }
    }
}
