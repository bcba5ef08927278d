//! Forecast types for the predictive analyzer.
//!
//! The shape is the contract: any forecaster, from a fixed fake to a model
//! trained on historical matches, answers a [`ForecastQuery`] with a
//! [`MarketForecast`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::PaymentMethod;

/// What the caller wants forecast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastQuery {
    pub payment_method: PaymentMethod,
    pub amount: Decimal,
    pub timeframe_hours: u32,
}

/// An hour-of-day window (UTC, `start_hour` inclusive, `end_hour` exclusive)
/// in which matches are most likely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingWindow {
    pub start_hour: u32,
    pub end_hour: u32,
    /// Expected matches inside this window per day.
    pub expected_matches: f64,
}

/// Forecast of future matching opportunities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketForecast {
    pub predicted_matches: f64,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub recommended_timing_windows: Vec<TimingWindow>,
    pub market_conditions_summary: String,
}

impl MarketForecast {
    /// A zero-confidence forecast carrying only an explanation.
    #[must_use]
    pub fn unknown(summary: impl Into<String>) -> Self {
        Self {
            predicted_matches: 0.0,
            confidence: 0.0,
            recommended_timing_windows: Vec::new(),
            market_conditions_summary: summary.into(),
        }
    }
}
