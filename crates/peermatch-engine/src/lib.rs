//! # peermatch-engine
//!
//! **Pure per-request matching pipeline for PeerMatch.**
//!
//! Given one pending request and a snapshot of the pool, the engine finds,
//! scores and ranks deposit/withdrawal pairings. It has:
//!
//! - **No side effects**: it reads requests and proposes pairings, nothing more
//! - **No self-matching**: same-customer and expired counterparties never reach the scorer
//! - **Graceful degradation**: collaborator failures fall back to conservative defaults
//! - **Deterministic ranking**: same snapshot, rules and clock give the same order

pub mod eligibility;
pub mod engine;
pub mod evaluator;
pub mod providers;
pub mod ranking;
pub mod risk;
pub mod scoring;

pub use eligibility::{Ineligibility, check_eligibility, eligible_counterparties};
pub use engine::{MatchOptions, MatchingEngine};
pub use evaluator::{
    EvaluationContext, RuleOutcome, evaluate_condition, evaluate_rule, evaluate_rules,
};
pub use providers::{
    AllowAll, Collaborators, FraudScreen, GeoComparator, NeutralRisk, NoGeoSignal, NoRatings,
    RatingProvider, RegionGeoComparator, RiskProvider, StaticRatings, StaticRiskTable,
    haversine_km,
};
pub use ranking::{
    compare_candidates, rank_candidates, ranking_digest, ranking_digest_hex, verify_ranking_digest,
};
pub use risk::RiskAssessor;
pub use scoring::{
    estimate_settlement_time, estimate_settlement_time_with, score_candidate, time_score,
};
