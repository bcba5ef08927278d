//! # peermatch-types
//!
//! Shared types, errors, and configuration for the **PeerMatch** payment
//! request matching engine.
//!
//! This crate is the leaf dependency of the workspace: every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`RequestId`], [`CustomerId`], [`RuleId`]
//! - **Request model**: [`PaymentRequest`], [`RequestType`], [`PaymentMethod`], [`RequestStatus`], [`Priority`], [`PaymentDetails`]
//! - **Rule model**: [`RuleSet`], [`MatchingRule`], [`Condition`], [`ConditionKind`], [`Operator`], [`MatchingScoring`]
//! - **Candidate model**: [`MatchingCandidate`], [`MatchingResult`], [`RiskAssessment`], [`NoMatchReason`]
//! - **Queue model**: [`Queue`], [`QueueAnalysis`], [`Bottleneck`], [`WaitTime`]
//! - **Forecast model**: [`MarketForecast`], [`TimingWindow`]
//! - **Configuration**: [`EngineConfig`], [`QueueConfig`]
//! - **Errors**: [`PeermatchError`] with `PM_ERR_` prefix codes
//! - **Constants**: scoring and queue defaults

pub mod candidate;
pub mod config;
pub mod constants;
pub mod error;
pub mod forecast;
pub mod ids;
pub mod queue;
pub mod request;
pub mod rule;

// Re-export all primary types at crate root for ergonomic imports:
//   use peermatch_types::{PaymentRequest, MatchingRule, MatchingResult, ...};

pub use candidate::*;
pub use config::*;
pub use error::*;
pub use forecast::*;
pub use ids::*;
pub use queue::*;
pub use request::*;
pub use rule::*;

// Constants are accessed via `peermatch_types::constants::FOO`
// (not re-exported to avoid name collisions).
