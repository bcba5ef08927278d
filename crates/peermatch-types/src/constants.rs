//! System-wide constants for the PeerMatch matching engine.

/// Milliseconds in one hour.
pub const MS_PER_HOUR: i64 = 3_600_000;

/// Ceiling of the linear time-decay score (both requests brand new).
pub const MAX_TIME_SCORE: f64 = 100.0;

/// Bonus applied when deposit and withdrawal amounts are identical.
pub const DEFAULT_EXACT_AMOUNT_BONUS: f64 = 50.0;

/// Bonus applied when either side carries `Priority::High`.
pub const DEFAULT_PRIORITY_BONUS: f64 = 20.0;

/// Risk scores strictly above this value are subtracted from the match score.
pub const DEFAULT_RISK_PENALTY_THRESHOLD: f64 = 30.0;

/// A pairing is recommended only when its risk score is strictly below this.
pub const DEFAULT_RISK_RECOMMENDATION_CEILING: f64 = 50.0;

/// Per-customer risk substituted when the reputation lookup fails or times out.
pub const DEFAULT_FALLBACK_CUSTOMER_RISK: u8 = 50;

/// Upper bound of a per-customer reputation lookup.
pub const MAX_CUSTOMER_RISK: u8 = 100;

/// Risk added for a geographic mismatch between counterparties.
pub const GEO_MISMATCH_RISK: f64 = 15.0;

/// Risk added when the two requests were created far apart in time.
pub const TIMING_GAP_RISK: f64 = 10.0;

/// Risk added when either amount is unusually large.
pub const UNUSUAL_AMOUNT_RISK: f64 = 20.0;

/// Average reputation risk at or above which a reputation factor is reported.
pub const REPUTATION_FACTOR_THRESHOLD: f64 = 20.0;

/// Creation-time gap (hours) beyond which the timing risk fires.
pub const DEFAULT_TIMING_GAP_HOURS: i64 = 24;

/// Amounts strictly above this settle 1.5x slower.
pub const DEFAULT_HIGH_VALUE_THRESHOLD: i64 = 500;

/// Amounts strictly above this are flagged as unusual by the risk assessor.
pub const DEFAULT_UNUSUAL_AMOUNT_THRESHOLD: i64 = 1000;

/// Baseline settlement estimate in minutes before rail/size multipliers.
pub const BASE_SETTLEMENT_MINUTES: f64 = 30.0;

/// Settlement multiplier for high-value transfers.
pub const HIGH_VALUE_SETTLEMENT_MULTIPLIER: f64 = 1.5;

/// Default number of ranked candidates returned per search.
pub const DEFAULT_MAX_CANDIDATES: usize = 10;

/// Average minutes for a queued request to be matched once a counterparty exists.
pub const DEFAULT_AVG_MATCH_TIME_MINUTES: f64 = 30.0;

/// Demand/supply ratio below which withdrawals are too scarce.
pub const DEFAULT_LOW_RATIO: f64 = 0.5;

/// Demand/supply ratio above which deposits are too scarce.
pub const DEFAULT_HIGH_RATIO: f64 = 2.0;

/// Amount overlap below which the two sides rarely line up.
pub const DEFAULT_MIN_OVERLAP: f64 = 0.3;

/// One side outnumbering the other at an amount by more than this is a bottleneck.
pub const DEFAULT_BOTTLENECK_RATIO: f64 = 3.0;

/// Relative band (±20%) within which a historical match counts as a similar amount.
pub const SIMILAR_AMOUNT_BAND_PERCENT: i64 = 20;

/// Upper bound of a forecast's confidence.
pub const MAX_FORECAST_CONFIDENCE: f64 = 0.95;

/// Sample size at which a historical forecast reaches half confidence.
pub const FORECAST_HALF_CONFIDENCE_SAMPLES: f64 = 10.0;

/// Hour-of-day windows recommended per forecast.
pub const FORECAST_TIMING_WINDOWS: usize = 3;

/// Version string of the scoring algorithm reported in search metadata.
pub const ALGORITHM_VERSION: &str = "2.1.0";
