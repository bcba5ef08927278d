//! Candidate pairings and search results produced by the matching engine.
//!
//! Candidates are ephemeral: the engine proposes them, the queue manager
//! decides whether to commit one. Nothing here is ever persisted by the
//! engine itself.

use serde::{Deserialize, Serialize};

use crate::{PaymentRequest, RequestId};

/// Outcome of composing the risk signals for one pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Additive composite risk; higher is riskier.
    pub risk_score: f64,
    /// Human-readable reason per triggered signal.
    pub risk_factors: Vec<String>,
    /// Suggested mitigation per triggered signal, same order as `risk_factors`.
    pub mitigation_strategies: Vec<String>,
    /// Whether the pairing is safe to propose without manual review.
    pub recommended: bool,
}

impl RiskAssessment {
    /// No signals fired.
    #[must_use]
    pub fn clear() -> Self {
        Self {
            risk_score: 0.0,
            risk_factors: Vec::new(),
            mitigation_strategies: Vec::new(),
            recommended: true,
        }
    }
}

/// Audit trail of how a candidate's score was assembled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub rule_score: f64,
    pub time_score: f64,
    pub exact_amount_bonus: f64,
    pub priority_bonus: f64,
    /// Subtracted from the total (zero unless risk exceeded the penalty threshold).
    pub risk_penalty: f64,
    /// Final clamped score; equals the candidate's `score`.
    pub total: f64,
}

/// A proposed deposit ↔ withdrawal pairing with its computed score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingCandidate {
    pub deposit: PaymentRequest,
    pub withdrawal: PaymentRequest,
    /// Always `>= 0`.
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    /// Rule names and bonus reasons, in evaluation order.
    pub match_reasons: Vec<String>,
    /// Risk factors that were penalized (empty when risk stayed below the threshold).
    pub risk_factors: Vec<String>,
    /// The full risk assessment, whether or not it was penalized.
    pub risk: RiskAssessment,
    pub estimated_settlement_minutes: u32,
}

impl MatchingCandidate {
    /// The request on the other side from the one that was searched for.
    #[must_use]
    pub fn counterparty_of(&self, query: RequestId) -> &PaymentRequest {
        if self.deposit.id == query {
            &self.withdrawal
        } else {
            &self.deposit
        }
    }

    /// `(deposit id, withdrawal id)`, identifying the pairing.
    #[must_use]
    pub fn pairing(&self) -> (RequestId, RequestId) {
        (self.deposit.id, self.withdrawal.id)
    }
}

/// Why a search produced no candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoMatchReason {
    /// The pool handed to the engine contained no requests.
    EmptyPool,
    /// Requests were present but none passed the eligibility filter.
    NoEligibleCounterparties,
    /// Every eligible counterparty was on the caller's exclusion list.
    AllCandidatesExcluded,
    /// The query request itself was unusable.
    InvalidQuery { reason: String },
}

impl std::fmt::Display for NoMatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPool => write!(f, "No pending requests to match against"),
            Self::NoEligibleCounterparties => {
                write!(f, "No eligible counterparties for this amount and payment method")
            }
            Self::AllCandidatesExcluded => {
                write!(f, "All eligible counterparties are already claimed")
            }
            Self::InvalidQuery { reason } => write!(f, "Invalid request: {reason}"),
        }
    }
}

/// Bookkeeping about one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    /// Number of scored candidates before truncation.
    pub total_candidates: usize,
    pub search_time_ms: f64,
    pub algorithm_version: String,
}

/// Ranked result of one search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingResult {
    /// The request the search was run for.
    pub request_id: RequestId,
    /// Ranked best-first, truncated to the configured maximum.
    pub candidates: Vec<MatchingCandidate>,
    /// First element of `candidates`, if any.
    pub best_match: Option<MatchingCandidate>,
    /// Set exactly when `candidates` is empty.
    pub no_match_reason: Option<NoMatchReason>,
    pub search_metadata: SearchMetadata,
}

impl MatchingResult {
    /// A result with no candidates.
    #[must_use]
    pub fn no_match(
        request_id: RequestId,
        reason: NoMatchReason,
        search_metadata: SearchMetadata,
    ) -> Self {
        Self {
            request_id,
            candidates: Vec::new(),
            best_match: None,
            no_match_reason: Some(reason),
            search_metadata,
        }
    }

    #[must_use]
    pub fn has_match(&self) -> bool {
        self.best_match.is_some()
    }
}
