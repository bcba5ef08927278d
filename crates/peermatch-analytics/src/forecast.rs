//! Predictive analyzer: forecasts future matching opportunities.
//!
//! Forecasting sits behind the [`PatternAnalyzer`] trait so the matching
//! pipeline never depends on a particular model. [`FixedForecaster`] is a
//! deterministic stand-in; [`HistoricalPatternAnalyzer`] derives a forecast
//! from past matches. [`PredictiveAnalyzer`] is what callers hold: it
//! validates the query and turns analyzer failures into a zero-confidence
//! forecast.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Timelike, Utc};
use peermatch_types::{ForecastQuery, MarketForecast, PaymentMethod, Result, TimingWindow, constants};
use rust_decimal::Decimal;

/// Source of market forecasts.
pub trait PatternAnalyzer: Send + Sync {
    /// # Errors
    /// Any failure of the underlying model or its data source.
    fn forecast(&self, query: &ForecastQuery) -> Result<MarketForecast>;
}

// ---------------------------------------------------------------------------
// FixedForecaster
// ---------------------------------------------------------------------------

/// Always answers with the same forecast, scaled to the timeframe.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedForecaster {
    /// Matches expected per hour.
    pub matches_per_hour: f64,
    pub confidence: f64,
    pub windows: Vec<TimingWindow>,
}

impl FixedForecaster {
    #[must_use]
    pub fn new(matches_per_hour: f64, confidence: f64) -> Self {
        Self {
            matches_per_hour,
            confidence,
            windows: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_window(mut self, window: TimingWindow) -> Self {
        self.windows.push(window);
        self
    }
}

impl PatternAnalyzer for FixedForecaster {
    fn forecast(&self, query: &ForecastQuery) -> Result<MarketForecast> {
        Ok(MarketForecast {
            predicted_matches: self.matches_per_hour * f64::from(query.timeframe_hours),
            confidence: self.confidence,
            recommended_timing_windows: self.windows.clone(),
            market_conditions_summary: format!(
                "Fixed forecast for {} at {}",
                query.payment_method, query.amount
            ),
        })
    }
}

// ---------------------------------------------------------------------------
// HistoricalPatternAnalyzer
// ---------------------------------------------------------------------------

/// One completed match, as recorded by the queue manager.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub payment_method: PaymentMethod,
    pub amount: Decimal,
    pub matched_at: DateTime<Utc>,
}

/// Forecasts from the rate of similar past matches.
///
/// A past match is similar when it used the same rail and its amount lies
/// within ±20% of the queried amount. The rate is taken over the span of
/// the whole history (at least one hour) and extrapolated over the
/// timeframe. Confidence is `n / (n + 10)` for `n` similar matches, capped
/// at 0.95.
#[derive(Debug, Clone, Default)]
pub struct HistoricalPatternAnalyzer {
    records: Vec<MatchRecord>,
}

impl HistoricalPatternAnalyzer {
    #[must_use]
    pub fn new(records: Vec<MatchRecord>) -> Self {
        Self { records }
    }

    pub fn record(&mut self, record: MatchRecord) {
        self.records.push(record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hours covered by the history, never less than one.
    fn observed_hours(&self) -> f64 {
        let first = self.records.iter().map(|r| r.matched_at).min();
        let last = self.records.iter().map(|r| r.matched_at).max();
        match (first, last) {
            (Some(first), Some(last)) => {
                let hours = (last - first).num_seconds() as f64 / 3600.0;
                hours.max(1.0)
            }
            _ => 1.0,
        }
    }

    fn similar<'a>(&'a self, query: &'a ForecastQuery) -> impl Iterator<Item = &'a MatchRecord> {
        let band = query.amount * Decimal::new(constants::SIMILAR_AMOUNT_BAND_PERCENT, 2);
        let (low, high) = (query.amount - band, query.amount + band);
        self.records.iter().filter(move |r| {
            r.payment_method == query.payment_method && r.amount >= low && r.amount <= high
        })
    }
}

impl PatternAnalyzer for HistoricalPatternAnalyzer {
    fn forecast(&self, query: &ForecastQuery) -> Result<MarketForecast> {
        let mut by_hour: BTreeMap<u32, usize> = BTreeMap::new();
        let mut samples = 0usize;
        for record in self.similar(query) {
            *by_hour.entry(record.matched_at.hour()).or_default() += 1;
            samples += 1;
        }

        if samples == 0 {
            return Ok(MarketForecast::unknown(format!(
                "No comparable {} matches near {} in {} recorded matches",
                query.payment_method,
                query.amount,
                self.records.len()
            )));
        }

        let hours = self.observed_hours();
        let days = (hours / 24.0).max(1.0);
        let n = samples as f64;
        let per_hour = n / hours;

        let mut busiest: Vec<(u32, usize)> = by_hour.into_iter().collect();
        busiest.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let recommended_timing_windows = busiest
            .into_iter()
            .take(constants::FORECAST_TIMING_WINDOWS)
            .map(|(hour, count)| TimingWindow {
                start_hour: hour,
                end_hour: (hour + 1) % 24,
                expected_matches: count as f64 / days,
            })
            .collect();

        let activity = if per_hour >= 1.0 {
            "Active"
        } else if per_hour >= 0.1 {
            "Moderate"
        } else {
            "Thin"
        };

        Ok(MarketForecast {
            predicted_matches: per_hour * f64::from(query.timeframe_hours),
            confidence: (n / (n + constants::FORECAST_HALF_CONFIDENCE_SAMPLES))
                .min(constants::MAX_FORECAST_CONFIDENCE),
            recommended_timing_windows,
            market_conditions_summary: format!(
                "{activity} {} market near {}: {samples} comparable matches, {per_hour:.2} per hour",
                query.payment_method, query.amount
            ),
        })
    }
}

// ---------------------------------------------------------------------------
// PredictiveAnalyzer
// ---------------------------------------------------------------------------

/// Caller-facing forecaster over any [`PatternAnalyzer`].
#[derive(Clone)]
pub struct PredictiveAnalyzer {
    analyzer: Arc<dyn PatternAnalyzer>,
}

impl PredictiveAnalyzer {
    #[must_use]
    pub fn new(analyzer: impl PatternAnalyzer + 'static) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
        }
    }

    /// Forecast matches for `amount` on `method` over the next
    /// `timeframe_hours`.
    ///
    /// Never fails. Invalid input or an analyzer error yields a
    /// zero-confidence forecast explaining why. Confidence is clamped to
    /// `[0, 1]` and predicted matches to `>= 0`.
    #[must_use]
    pub fn forecast(
        &self,
        method: PaymentMethod,
        amount: Decimal,
        timeframe_hours: u32,
    ) -> MarketForecast {
        if amount <= Decimal::ZERO {
            return MarketForecast::unknown(format!("Cannot forecast non-positive amount {amount}"));
        }
        if timeframe_hours == 0 {
            return MarketForecast::unknown("Cannot forecast an empty timeframe");
        }

        let query = ForecastQuery {
            payment_method: method,
            amount,
            timeframe_hours,
        };
        match self.analyzer.forecast(&query) {
            Ok(mut forecast) => {
                forecast.confidence = if forecast.confidence.is_finite() {
                    forecast.confidence.clamp(0.0, 1.0)
                } else {
                    0.0
                };
                if !forecast.predicted_matches.is_finite() || forecast.predicted_matches < 0.0 {
                    forecast.predicted_matches = 0.0;
                }
                forecast
            }
            Err(err) => {
                tracing::warn!(
                    %method,
                    %amount,
                    timeframe_hours,
                    error = %err,
                    "Pattern analyzer failed; returning empty forecast"
                );
                MarketForecast::unknown(format!("Forecast unavailable: {err}"))
            }
        }
    }
}

impl Default for PredictiveAnalyzer {
    fn default() -> Self {
        Self::new(HistoricalPatternAnalyzer::default())
    }
}

impl std::fmt::Debug for PredictiveAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictiveAnalyzer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use peermatch_types::PeermatchError;

    use super::*;

    struct Offline;

    impl PatternAnalyzer for Offline {
        fn forecast(&self, _query: &ForecastQuery) -> Result<MarketForecast> {
            Err(PeermatchError::ProviderUnavailable {
                service: "pattern-analyzer".into(),
                reason: "model not loaded".into(),
            })
        }
    }

    fn record(method: PaymentMethod, amount: i64, at: DateTime<Utc>) -> MatchRecord {
        MatchRecord {
            payment_method: method,
            amount: Decimal::new(amount, 0),
            matched_at: at,
        }
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn fixed_forecaster_scales_with_timeframe() {
        let analyzer = PredictiveAnalyzer::new(FixedForecaster::new(2.0, 0.5));
        let f = analyzer.forecast(PaymentMethod::Venmo, Decimal::new(100, 0), 6);
        assert!((f.predicted_matches - 12.0).abs() < f64::EPSILON);
        assert!((f.confidence - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn invalid_input_degrades() {
        let analyzer = PredictiveAnalyzer::new(FixedForecaster::new(2.0, 0.5));
        let zero_amount = analyzer.forecast(PaymentMethod::Venmo, Decimal::ZERO, 6);
        let zero_hours = analyzer.forecast(PaymentMethod::Venmo, Decimal::ONE, 0);
        assert!(zero_amount.confidence.abs() < f64::EPSILON);
        assert!(zero_hours.predicted_matches.abs() < f64::EPSILON);
    }

    #[test]
    fn analyzer_failure_degrades() {
        let f = PredictiveAnalyzer::new(Offline).forecast(PaymentMethod::Zelle, Decimal::TEN, 2);
        assert!(f.confidence.abs() < f64::EPSILON);
        assert!(f.market_conditions_summary.contains("PM_ERR_301"));
    }

    #[test]
    fn out_of_range_forecast_is_clamped() {
        let analyzer = PredictiveAnalyzer::new(FixedForecaster::new(-1.0, 7.0));
        let f = analyzer.forecast(PaymentMethod::PayPal, Decimal::TEN, 3);
        assert!((f.confidence - 1.0).abs() < f64::EPSILON);
        assert!(f.predicted_matches.abs() < f64::EPSILON);
    }

    #[test]
    fn history_filters_by_method_and_band() {
        let t = base();
        let history = HistoricalPatternAnalyzer::new(vec![
            record(PaymentMethod::Venmo, 100, t),
            record(PaymentMethod::Venmo, 120, t + Duration::hours(1)),
            record(PaymentMethod::Venmo, 121, t + Duration::hours(2)),
            record(PaymentMethod::Zelle, 100, t + Duration::hours(3)),
            record(PaymentMethod::Venmo, 80, t + Duration::hours(10)),
        ]);
        let query = ForecastQuery {
            payment_method: PaymentMethod::Venmo,
            amount: Decimal::new(100, 0),
            timeframe_hours: 5,
        };
        // 100, 120 and 80 are within the band; span is 10 hours.
        let f = history.forecast(&query).unwrap();
        assert!((f.predicted_matches - 1.5).abs() < 1e-9);
        assert!((f.confidence - 3.0 / 13.0).abs() < 1e-9);
        assert!(f.market_conditions_summary.starts_with("Moderate venmo market"));
    }

    #[test]
    fn confidence_is_capped() {
        let t = base();
        let records = (0..1000)
            .map(|i| record(PaymentMethod::CashApp, 50, t + Duration::minutes(i)))
            .collect();
        let f = HistoricalPatternAnalyzer::new(records)
            .forecast(&ForecastQuery {
                payment_method: PaymentMethod::CashApp,
                amount: Decimal::new(50, 0),
                timeframe_hours: 1,
            })
            .unwrap();
        assert!((f.confidence - 0.95).abs() < f64::EPSILON);
        assert!(f.market_conditions_summary.starts_with("Active"));
    }

    #[test]
    fn busiest_hours_become_windows() {
        let t = base();
        let mut history = HistoricalPatternAnalyzer::default();
        for (hour, count) in [(9, 5), (18, 7), (23, 2), (3, 1)] {
            for i in 0..count {
                history.record(record(
                    PaymentMethod::Venmo,
                    40,
                    t + Duration::hours(hour) + Duration::minutes(i),
                ));
            }
        }
        let f = history
            .forecast(&ForecastQuery {
                payment_method: PaymentMethod::Venmo,
                amount: Decimal::new(40, 0),
                timeframe_hours: 24,
            })
            .unwrap();
        let hours: Vec<u32> = f.recommended_timing_windows.iter().map(|w| w.start_hour).collect();
        assert_eq!(hours, vec![18, 9, 23]);
        assert_eq!(f.recommended_timing_windows[2].end_hour, 0);
    }

    #[test]
    fn no_history_is_unknown() {
        let f =
            PredictiveAnalyzer::default().forecast(PaymentMethod::Venmo, Decimal::ONE_HUNDRED, 4);
        assert!(f.confidence.abs() < f64::EPSILON);
        assert!(f.recommended_timing_windows.is_empty());
        assert!(f.market_conditions_summary.contains("No comparable"));
    }
}
