//! # peermatch-analytics
//!
//! **Queue-level analytics for PeerMatch.**
//!
//! Unlike the engine, which answers one request at a time, analytics look
//! at the whole queue:
//!
//! - [`QueueOptimizer`]: demand/supply ratio, amount overlap, expected wait
//!   per side, bottleneck amounts, operational recommendations
//! - [`PredictiveAnalyzer`]: forecasts of future matches behind a pluggable
//!   [`PatternAnalyzer`]

pub mod forecast;
pub mod optimizer;

pub use forecast::{
    FixedForecaster, HistoricalPatternAnalyzer, MatchRecord, PatternAnalyzer, PredictiveAnalyzer,
};
pub use optimizer::{QueueOptimizer, amount_overlap, demand_supply_ratio, optimize_queue};
