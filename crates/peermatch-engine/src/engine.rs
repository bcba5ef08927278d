//! The per-request matching pipeline.
//!
//! # Pipeline
//!
//! 1. Reject an unusable query (invalid, not pending, expired)
//! 2. Narrow the pool to eligible counterparties
//! 3. Drop counterparties the caller has excluded
//! 4. Assess risk and score every remaining pairing
//! 5. Rank, truncate, and package a [`MatchingResult`]
//!
//! The engine holds only immutable configuration and shared collaborators.
//! It never mutates a request and never locks one: when the caller fails to
//! claim the best counterparty, it re-runs the search with that counterparty
//! in [`MatchOptions::exclude`].

use std::time::Instant;

use chrono::{DateTime, Utc};
use peermatch_types::{
    EngineConfig, MatchingCandidate, MatchingResult, NoMatchReason, PaymentRequest,
    PeermatchError, RequestId, RequestType, Result, RiskAssessment, RuleSet, SearchMetadata,
};

use crate::{
    eligibility::eligible_counterparties,
    evaluator::EvaluationContext,
    providers::Collaborators,
    ranking::rank_candidates,
    risk::RiskAssessor,
    scoring::score_candidate,
};

/// Per-search knobs.
#[derive(Debug, Clone, Default)]
pub struct MatchOptions {
    /// Evaluation instant; the wall clock when `None`.
    pub now: Option<DateTime<Utc>>,
    /// Counterparties that must not be proposed (e.g. already claimed).
    pub exclude: Vec<RequestId>,
    /// Overrides [`EngineConfig::max_candidates`] for this search. At least
    /// one candidate is always kept.
    pub max_candidates: Option<usize>,
}

impl MatchOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    #[must_use]
    pub fn excluding(mut self, ids: impl IntoIterator<Item = RequestId>) -> Self {
        self.exclude.extend(ids);
        self
    }

    #[must_use]
    pub fn limit(mut self, max_candidates: usize) -> Self {
        self.max_candidates = Some(max_candidates);
        self
    }
}

/// Matching engine: configuration, default rule set and collaborators.
#[derive(Debug, Clone)]
pub struct MatchingEngine {
    config: EngineConfig,
    rules: RuleSet,
    collaborators: Collaborators,
}

impl MatchingEngine {
    /// Build an engine, validating its configuration and default rule set.
    ///
    /// # Errors
    /// `Configuration` for an out-of-range config value, `InvalidRule` or
    /// `InvalidRuleSet` for a broken rule set.
    pub fn new(config: EngineConfig, rules: RuleSet, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        rules.validate()?;
        tracing::debug!(
            rules = rules.rules.len(),
            max_candidates = config.max_candidates,
            version = %config.algorithm_version,
            "Matching engine configured"
        );
        Ok(Self {
            config,
            rules,
            collaborators,
        })
    }

    /// Default config, default rules, neutral collaborators.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            config: EngineConfig::default(),
            rules: RuleSet::default(),
            collaborators: Collaborators::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    #[must_use]
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    // -----------------------------------------------------------------------
    // Searches
    // -----------------------------------------------------------------------

    /// Best withdrawals for a deposit.
    #[must_use]
    pub fn find_matches_for_deposit(
        &self,
        deposit: &PaymentRequest,
        pool: &[PaymentRequest],
    ) -> MatchingResult {
        self.find_matches_for_side(RequestType::Deposit, deposit, pool)
    }

    /// Best deposits for a withdrawal.
    #[must_use]
    pub fn find_matches_for_withdrawal(
        &self,
        withdrawal: &PaymentRequest,
        pool: &[PaymentRequest],
    ) -> MatchingResult {
        self.find_matches_for_side(RequestType::Withdrawal, withdrawal, pool)
    }

    fn find_matches_for_side(
        &self,
        expected: RequestType,
        request: &PaymentRequest,
        pool: &[PaymentRequest],
    ) -> MatchingResult {
        if request.request_type != expected {
            let err = PeermatchError::WrongRequestType {
                id: request.id,
                expected,
                actual: request.request_type,
            };
            return self.no_match(
                request.id,
                NoMatchReason::InvalidQuery {
                    reason: err.to_string(),
                },
                Instant::now(),
            );
        }
        self.find_matches(request, pool, &MatchOptions::default())
    }

    /// Search using the engine's own rule set.
    #[must_use]
    pub fn find_matches(
        &self,
        request: &PaymentRequest,
        pool: &[PaymentRequest],
        options: &MatchOptions,
    ) -> MatchingResult {
        self.find_matches_with_rules(request, pool, &self.rules, options)
    }

    /// Search with a caller-supplied rule set.
    ///
    /// Never fails: every problem is reported through
    /// [`MatchingResult::no_match_reason`].
    #[must_use]
    pub fn find_matches_with_rules(
        &self,
        request: &PaymentRequest,
        pool: &[PaymentRequest],
        rules: &RuleSet,
        options: &MatchOptions,
    ) -> MatchingResult {
        let started = Instant::now();
        let now = options.now.unwrap_or_else(Utc::now);

        if let Err(reason) = Self::check_query(request, now) {
            tracing::warn!(request = %request.id, %reason, "Rejected match query");
            return self.no_match(request.id, NoMatchReason::InvalidQuery { reason }, started);
        }

        if pool.iter().all(|p| p.id == request.id) {
            return self.no_match(request.id, NoMatchReason::EmptyPool, started);
        }

        let eligible =
            eligible_counterparties(request, pool, now, self.collaborators.fraud.as_ref());
        if eligible.is_empty() {
            return self.no_match(request.id, NoMatchReason::NoEligibleCounterparties, started);
        }

        let remaining: Vec<&PaymentRequest> = eligible
            .into_iter()
            .filter(|p| !options.exclude.contains(&p.id))
            .collect();
        if remaining.is_empty() {
            return self.no_match(request.id, NoMatchReason::AllCandidatesExcluded, started);
        }

        let ctx = EvaluationContext {
            now,
            ratings: self.collaborators.ratings.as_ref(),
            geo: self.collaborators.geo.as_ref(),
        };
        let scored: Vec<MatchingCandidate> = remaining
            .into_iter()
            .map(|counterparty| {
                let (deposit, withdrawal) = orient(request, counterparty);
                let risk = self.assess_risk(deposit, withdrawal);
                score_candidate(&self.config, rules, deposit, withdrawal, risk, &ctx)
            })
            .collect();

        let total_candidates = scored.len();
        let limit = options
            .max_candidates
            .unwrap_or(self.config.max_candidates)
            .max(1);
        let candidates = rank_candidates(scored, limit);
        let best_match = candidates.first().cloned();

        tracing::info!(
            request = %request.id,
            side = %request.request_type,
            method = %request.payment_method,
            amount = %request.amount,
            total_candidates,
            returned = candidates.len(),
            best_score = best_match.as_ref().map_or(0.0, |c| c.score),
            "Match search complete"
        );

        MatchingResult {
            request_id: request.id,
            candidates,
            best_match,
            no_match_reason: None,
            search_metadata: self.metadata(started, total_candidates),
        }
    }

    // -----------------------------------------------------------------------
    // Single-pair operations
    // -----------------------------------------------------------------------

    /// Risk of pairing `deposit` with `withdrawal`.
    #[must_use]
    pub fn assess_risk(
        &self,
        deposit: &PaymentRequest,
        withdrawal: &PaymentRequest,
    ) -> RiskAssessment {
        RiskAssessor::new(
            &self.config,
            self.collaborators.risk.as_ref(),
            self.collaborators.geo.as_ref(),
        )
        .assess(deposit, withdrawal)
    }

    /// Score one pairing with the engine's rules, bypassing eligibility.
    ///
    /// # Errors
    /// `WrongRequestType` unless `deposit` is a deposit and `withdrawal` a
    /// withdrawal.
    pub fn score_pair(
        &self,
        deposit: &PaymentRequest,
        withdrawal: &PaymentRequest,
        now: DateTime<Utc>,
    ) -> Result<MatchingCandidate> {
        for (request, expected) in [
            (deposit, RequestType::Deposit),
            (withdrawal, RequestType::Withdrawal),
        ] {
            if request.request_type != expected {
                return Err(PeermatchError::WrongRequestType {
                    id: request.id,
                    expected,
                    actual: request.request_type,
                });
            }
        }
        let ctx = EvaluationContext {
            now,
            ratings: self.collaborators.ratings.as_ref(),
            geo: self.collaborators.geo.as_ref(),
        };
        let risk = self.assess_risk(deposit, withdrawal);
        Ok(score_candidate(&self.config, &self.rules, deposit, withdrawal, risk, &ctx))
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn check_query(
        request: &PaymentRequest,
        now: DateTime<Utc>,
    ) -> std::result::Result<(), String> {
        request.validate().map_err(|e| e.to_string())?;
        if !request.is_pending() {
            return Err(format!("request is {}, not pending", request.status));
        }
        if request.is_expired(now) {
            return Err(format!("request expired at {}", request.expires_at));
        }
        Ok(())
    }

    fn metadata(&self, started: Instant, total_candidates: usize) -> SearchMetadata {
        SearchMetadata {
            total_candidates,
            search_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            algorithm_version: self.config.algorithm_version.clone(),
        }
    }

    fn no_match(
        &self,
        request_id: RequestId,
        reason: NoMatchReason,
        started: Instant,
    ) -> MatchingResult {
        tracing::debug!(request = %request_id, %reason, "No match");
        MatchingResult::no_match(request_id, reason, self.metadata(started, 0))
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// `(deposit, withdrawal)` for a query and one of its counterparties.
fn orient<'a>(
    request: &'a PaymentRequest,
    counterparty: &'a PaymentRequest,
) -> (&'a PaymentRequest, &'a PaymentRequest) {
    match request.request_type {
        RequestType::Deposit => (request, counterparty),
        RequestType::Withdrawal => (counterparty, request),
    }
}
