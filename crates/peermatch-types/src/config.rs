//! Configuration for the matching engine and the queue optimizer.
//!
//! Both structs deserialize with `#[serde(default)]`, so a JSON override
//! only needs the fields it changes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{PeermatchError, Result, constants};

/// Tunables of the per-request matching pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ranked candidates kept per search.
    pub max_candidates: usize,
    /// Risk strictly above this is subtracted from the match score.
    pub risk_penalty_threshold: f64,
    /// Pairings are recommended only below this risk.
    pub risk_recommendation_ceiling: f64,
    /// Per-customer risk assumed when the reputation lookup fails.
    pub fallback_customer_risk: u8,
    pub exact_amount_bonus: f64,
    pub priority_bonus: f64,
    /// Amounts above this settle on the slower high-value path.
    pub high_value_threshold: Decimal,
    /// Amounts above this raise the unusual-amount risk signal.
    pub unusual_amount_threshold: Decimal,
    /// Creation gap beyond which the timing risk signal fires.
    pub timing_gap_hours: i64,
    pub algorithm_version: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_candidates: constants::DEFAULT_MAX_CANDIDATES,
            risk_penalty_threshold: constants::DEFAULT_RISK_PENALTY_THRESHOLD,
            risk_recommendation_ceiling: constants::DEFAULT_RISK_RECOMMENDATION_CEILING,
            fallback_customer_risk: constants::DEFAULT_FALLBACK_CUSTOMER_RISK,
            exact_amount_bonus: constants::DEFAULT_EXACT_AMOUNT_BONUS,
            priority_bonus: constants::DEFAULT_PRIORITY_BONUS,
            high_value_threshold: Decimal::from(constants::DEFAULT_HIGH_VALUE_THRESHOLD),
            unusual_amount_threshold: Decimal::from(constants::DEFAULT_UNUSUAL_AMOUNT_THRESHOLD),
            timing_gap_hours: constants::DEFAULT_TIMING_GAP_HOURS,
            algorithm_version: constants::ALGORITHM_VERSION.to_string(),
        }
    }
}

impl EngineConfig {
    /// # Errors
    /// `Serialization` for malformed JSON, `Configuration` for out-of-range values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// `Configuration` naming the first out-of-range value.
    pub fn validate(&self) -> Result<()> {
        if self.max_candidates == 0 {
            return Err(PeermatchError::Configuration(
                "max_candidates must be at least 1".to_string(),
            ));
        }
        if self.fallback_customer_risk > constants::MAX_CUSTOMER_RISK {
            return Err(PeermatchError::Configuration(format!(
                "fallback_customer_risk {} exceeds {}",
                self.fallback_customer_risk,
                constants::MAX_CUSTOMER_RISK
            )));
        }
        let finite = [
            ("risk_penalty_threshold", self.risk_penalty_threshold),
            ("risk_recommendation_ceiling", self.risk_recommendation_ceiling),
            ("exact_amount_bonus", self.exact_amount_bonus),
            ("priority_bonus", self.priority_bonus),
        ];
        for (name, value) in finite {
            if !value.is_finite() || value < 0.0 {
                return Err(PeermatchError::Configuration(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.timing_gap_hours < 0 {
            return Err(PeermatchError::Configuration(
                "timing_gap_hours must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Thresholds of the queue optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Average minutes to match once a counterparty exists.
    pub avg_match_time_minutes: f64,
    /// Demand/supply ratio below which withdrawals are too scarce.
    pub low_ratio: f64,
    /// Demand/supply ratio above which deposits are too scarce.
    pub high_ratio: f64,
    /// Amount overlap below which round numbers are encouraged.
    pub min_overlap: f64,
    /// One side outnumbering the other at an amount by more than this is a bottleneck.
    pub bottleneck_ratio: f64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            avg_match_time_minutes: constants::DEFAULT_AVG_MATCH_TIME_MINUTES,
            low_ratio: constants::DEFAULT_LOW_RATIO,
            high_ratio: constants::DEFAULT_HIGH_RATIO,
            min_overlap: constants::DEFAULT_MIN_OVERLAP,
            bottleneck_ratio: constants::DEFAULT_BOTTLENECK_RATIO,
        }
    }
}

impl QueueConfig {
    /// # Errors
    /// `Serialization` for malformed JSON, `Configuration` for out-of-range values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// `Configuration` naming the first out-of-range value.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("avg_match_time_minutes", self.avg_match_time_minutes),
            ("high_ratio", self.high_ratio),
            ("bottleneck_ratio", self.bottleneck_ratio),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(PeermatchError::Configuration(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        if !self.low_ratio.is_finite() || self.low_ratio < 0.0 || self.low_ratio > self.high_ratio {
            return Err(PeermatchError::Configuration(format!(
                "low_ratio {} must lie in [0, high_ratio]",
                self.low_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.min_overlap) {
            return Err(PeermatchError::Configuration(format!(
                "min_overlap {} must lie in [0, 1]",
                self.min_overlap
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_candidates, 10);
        assert_eq!(cfg.fallback_customer_risk, 50);
        assert_eq!(cfg.high_value_threshold, Decimal::new(500, 0));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_override() {
        let cfg =
            EngineConfig::from_json(r#"{"max_candidates": 3, "priority_bonus": 5.0}"#).unwrap();
        assert_eq!(cfg.max_candidates, 3);
        assert!((cfg.priority_bonus - 5.0).abs() < f64::EPSILON);
        assert!((cfg.exact_amount_bonus - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_candidates_rejected() {
        let err = EngineConfig::from_json(r#"{"max_candidates": 0}"#).unwrap_err();
        assert!(matches!(err, PeermatchError::Configuration(_)));
    }

    #[test]
    fn fallback_risk_bounded() {
        let cfg = EngineConfig {
            fallback_customer_risk: 120,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn queue_defaults() {
        let cfg = QueueConfig::default();
        assert!((cfg.avg_match_time_minutes - 30.0).abs() < f64::EPSILON);
        assert!((cfg.bottleneck_ratio - 3.0).abs() < f64::EPSILON);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn queue_ratio_ordering_enforced() {
        let err = QueueConfig::from_json(r#"{"low_ratio": 3.0, "high_ratio": 2.0}"#).unwrap_err();
        assert!(format!("{err}").contains("low_ratio"));
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back = EngineConfig::from_json(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
