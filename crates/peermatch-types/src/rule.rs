//! Matching rule configuration.
//!
//! A [`RuleSet`] is immutable configuration handed to the engine on every
//! call. Each [`MatchingRule`] bundles typed [`Condition`]s with a scoring
//! block; the evaluator sums the weights of the conditions that hold and, if
//! any did, credits the rule's `base_score` plus that sum.
//!
//! Unknown condition types and unknown operators deserialize to inert
//! `Unknown` variants so a rule set written for a newer engine still loads.
//! Those conditions never hold.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{PaymentMethod, PeermatchError, Result, RuleId, constants};

/// Comparison applied by a condition. Which operators make sense depends on
/// the [`ConditionKind`]; see [`Condition::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Between,
    In,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Equals => write!(f, "equals"),
            Self::NotEquals => write!(f, "not_equals"),
            Self::GreaterThan => write!(f, "greater_than"),
            Self::LessThan => write!(f, "less_than"),
            Self::Between => write!(f, "between"),
            Self::In => write!(f, "in"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// What a condition inspects, with its strongly typed payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionKind {
    /// Deposit and withdrawal amounts compared for equality.
    AmountExact,
    /// Both amounts lie in `[min, max]`.
    AmountRange { min: Decimal, max: Decimal },
    /// Age of both requests compared against `max_age_ms`.
    TimeSinceRequest { max_age_ms: i64 },
    /// Both customers' ratings compared against `threshold`.
    UserRating { threshold: f64 },
    /// Distance between the counterparties compared against `max_km`.
    GeographicDistance { max_km: f64 },
    /// The shared rail is one of `methods`.
    PaymentMethodPreference { methods: Vec<PaymentMethod> },
    #[serde(other)]
    Unknown,
}

impl ConditionKind {
    /// Short wire name, used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AmountExact => "amount_exact",
            Self::AmountRange { .. } => "amount_range",
            Self::TimeSinceRequest { .. } => "time_since_request",
            Self::UserRating { .. } => "user_rating",
            Self::GeographicDistance { .. } => "geographic_distance",
            Self::PaymentMethodPreference { .. } => "payment_method_preference",
            Self::Unknown => "unknown",
        }
    }
}

/// One weighted predicate over a (deposit, withdrawal) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub operator: Operator,
    pub weight: f64,
}

impl Condition {
    #[must_use]
    pub fn amount_exact(weight: f64) -> Self {
        Self {
            kind: ConditionKind::AmountExact,
            operator: Operator::Equals,
            weight,
        }
    }

    #[must_use]
    pub fn amount_range(min: Decimal, max: Decimal, weight: f64) -> Self {
        Self {
            kind: ConditionKind::AmountRange { min, max },
            operator: Operator::Between,
            weight,
        }
    }

    #[must_use]
    pub fn max_age(max_age_ms: i64, weight: f64) -> Self {
        Self {
            kind: ConditionKind::TimeSinceRequest { max_age_ms },
            operator: Operator::LessThan,
            weight,
        }
    }

    #[must_use]
    pub fn min_rating(threshold: f64, weight: f64) -> Self {
        Self {
            kind: ConditionKind::UserRating { threshold },
            operator: Operator::GreaterThan,
            weight,
        }
    }

    #[must_use]
    pub fn within_km(max_km: f64, weight: f64) -> Self {
        Self {
            kind: ConditionKind::GeographicDistance { max_km },
            operator: Operator::LessThan,
            weight,
        }
    }

    #[must_use]
    pub fn preferred_methods(methods: Vec<PaymentMethod>, weight: f64) -> Self {
        Self {
            kind: ConditionKind::PaymentMethodPreference { methods },
            operator: Operator::In,
            weight,
        }
    }

    /// Report why this condition can never hold, if it can't.
    ///
    /// Supported combinations:
    ///
    /// | kind                        | operator       | holds when              |
    /// |-----------------------------|----------------|-------------------------|
    /// | `amount_exact`              | `equals`       | `d == w`                |
    /// | `amount_exact`              | `not_equals`   | `d != w`                |
    /// | `amount_range`              | `between`      | `min <= x <= max`       |
    /// | `time_since_request`        | `less_than`    | `age <= max_age_ms`     |
    /// | `time_since_request`        | `greater_than` | `age > max_age_ms`      |
    /// | `user_rating`               | `greater_than` | `rating >= threshold`   |
    /// | `user_rating`               | `less_than`    | `rating < threshold`    |
    /// | `geographic_distance`       | `less_than`    | `km <= max_km`          |
    /// | `payment_method_preference` | `in`           | rail in `methods`       |
    ///
    /// Thresholds are inclusive on the side a rule names (`max_age`,
    /// `min_rating`, `within_km`); each opposite operator is the exact
    /// complement.
    ///
    /// # Errors
    /// A human-readable reason for the first problem found.
    pub fn check(&self) -> std::result::Result<(), String> {
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(format!("weight {} must be finite and non-negative", self.weight));
        }
        let operator_ok = match (&self.kind, self.operator) {
            (ConditionKind::Unknown, _) => return Err("unknown condition type".to_string()),
            (_, Operator::Unknown) => return Err("unknown operator".to_string()),
            (ConditionKind::AmountExact, Operator::Equals | Operator::NotEquals)
            | (ConditionKind::AmountRange { .. }, Operator::Between)
            | (
                ConditionKind::TimeSinceRequest { .. } | ConditionKind::UserRating { .. },
                Operator::LessThan | Operator::GreaterThan,
            )
            | (ConditionKind::GeographicDistance { .. }, Operator::LessThan)
            | (ConditionKind::PaymentMethodPreference { .. }, Operator::In) => true,
            _ => false,
        };
        if !operator_ok {
            return Err(format!(
                "operator {} is not supported for {}",
                self.operator,
                self.kind.name()
            ));
        }
        match &self.kind {
            ConditionKind::AmountRange { min, max } if min > max => {
                Err(format!("range min {min} exceeds max {max}"))
            }
            ConditionKind::TimeSinceRequest { max_age_ms } if *max_age_ms < 0 => {
                Err("max_age_ms must be non-negative".to_string())
            }
            ConditionKind::UserRating { threshold } if !threshold.is_finite() => {
                Err("rating threshold must be finite".to_string())
            }
            ConditionKind::GeographicDistance { max_km }
                if !max_km.is_finite() || *max_km < 0.0 =>
            {
                Err("max_km must be finite and non-negative".to_string())
            }
            ConditionKind::PaymentMethodPreference { methods } if methods.is_empty() => {
                Err("method preference lists no methods".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Relative importance of each scoring factor.
///
/// Carried as configuration only: the scorer credits condition weights and
/// base scores, not these factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub amount: f64,
    pub time: f64,
    pub rating: f64,
    pub distance: f64,
    pub method: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            amount: 0.4,
            time: 0.3,
            rating: 0.15,
            distance: 0.1,
            method: 0.05,
        }
    }
}

/// Per-rule decay rates. Inert: the scorer applies its own linear time
/// decay and a flat priority bonus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayConfig {
    pub time_decay: f64,
    pub priority_decay: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            time_decay: 0.1,
            priority_decay: 0.05,
        }
    }
}

/// Scoring block of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingScoring {
    pub base_score: f64,
    #[serde(default)]
    pub weights: FactorWeights,
    #[serde(default)]
    pub decay: DecayConfig,
}

impl MatchingScoring {
    #[must_use]
    pub fn with_base(base_score: f64) -> Self {
        Self {
            base_score,
            weights: FactorWeights::default(),
            decay: DecayConfig::default(),
        }
    }
}

/// A named, prioritized bundle of conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingRule {
    pub id: RuleId,
    /// Human-readable name; recorded as a match reason when the rule fires.
    pub name: String,
    /// Evaluation order hint: lower runs first.
    pub priority: u32,
    pub conditions: Vec<Condition>,
    pub scoring: MatchingScoring,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl MatchingRule {
    /// Structural validation. Invalid conditions would evaluate false anyway;
    /// this surfaces them at configuration time.
    ///
    /// # Errors
    /// `InvalidRule` naming the first problem.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| PeermatchError::InvalidRule {
            rule: self.id.clone(),
            reason,
        };
        if self.id.as_str().trim().is_empty() {
            return Err(invalid("rule id is empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("rule name is empty".to_string()));
        }
        if !self.scoring.base_score.is_finite() || self.scoring.base_score < 0.0 {
            return Err(invalid(format!(
                "base score {} must be finite and non-negative",
                self.scoring.base_score
            )));
        }
        for (idx, condition) in self.conditions.iter().enumerate() {
            condition
                .check()
                .map_err(|reason| invalid(format!("condition #{idx}: {reason}")))?;
        }
        Ok(())
    }
}

/// The ordered rule configuration passed into every scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<MatchingRule>,
}

impl RuleSet {
    #[must_use]
    pub fn new(rules: Vec<MatchingRule>) -> Self {
        Self { rules }
    }

    /// An empty rule set: only time decay and fixed bonuses contribute.
    #[must_use]
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Parse a rule set from JSON. Parsing does not validate; call
    /// [`RuleSet::validate`] to reject structurally broken rules up front.
    ///
    /// # Errors
    /// `Serialization` if the JSON does not describe a rule set.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    /// `InvalidRuleSet` on duplicate ids, or the first `InvalidRule`.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(PeermatchError::InvalidRuleSet {
                    reason: format!("duplicate rule id {}", rule.id),
                });
            }
            rule.validate()?;
        }
        Ok(())
    }

    /// Enabled rules in evaluation order: priority ascending, then id.
    #[must_use]
    pub fn enabled_rules(&self) -> Vec<&MatchingRule> {
        let mut rules: Vec<&MatchingRule> = self.rules.iter().filter(|r| r.enabled).collect();
        rules.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        rules
    }
}

impl Default for RuleSet {
    /// Exact amount, quick match, and trusted customers.
    fn default() -> Self {
        Self::new(vec![
            MatchingRule {
                id: RuleId::new("exact_amount_match"),
                name: "Exact Amount Match".to_string(),
                priority: 1,
                conditions: vec![Condition::amount_exact(1.0)],
                scoring: MatchingScoring::with_base(100.0),
                enabled: true,
            },
            MatchingRule {
                id: RuleId::new("quick_match"),
                name: "Quick Match".to_string(),
                priority: 2,
                conditions: vec![Condition::max_age(constants::MS_PER_HOUR, 0.8)],
                scoring: MatchingScoring::with_base(80.0),
                enabled: true,
            },
            MatchingRule {
                id: RuleId::new("trusted_customers"),
                name: "Trusted Customers".to_string(),
                priority: 3,
                conditions: vec![Condition::min_rating(4.5, 0.6)],
                scoring: MatchingScoring::with_base(60.0),
                enabled: true,
            },
        ])
    }
}
