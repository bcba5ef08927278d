//! External collaborators the pipeline consults.
//!
//! The engine performs no I/O of its own. Reputation lookups, geography,
//! fraud screening and customer ratings are injected as trait objects at
//! construction. Implementations own their I/O and must bound every call
//! with a timeout, reporting it as [`PeermatchError::ProviderTimeout`]; the
//! engine turns any error into a conservative default and carries on.
//!
//! | collaborator      | on error                                   |
//! |-------------------|--------------------------------------------|
//! | [`RiskProvider`]  | fallback customer risk (default 50)        |
//! | [`GeoComparator`] | mismatch assumed; distance unknown         |
//! | [`FraudScreen`]   | counterparty excluded                      |
//! | [`RatingProvider`]| rating condition does not hold             |

use std::{collections::HashMap, sync::Arc};

use peermatch_types::{Coordinates, CustomerId, PaymentRequest, Result, constants};

/// Per-customer reputation risk, `0..=100`.
pub trait RiskProvider: Send + Sync {
    fn customer_risk(&self, customer: &CustomerId) -> Result<u8>;
}

/// Geography of two counterparties.
pub trait GeoComparator: Send + Sync {
    /// Whether the two requests come from incompatible regions.
    fn mismatch(&self, a: &PaymentRequest, b: &PaymentRequest) -> Result<bool>;

    /// Distance between the two requests, when known.
    fn distance_km(&self, _a: &PaymentRequest, _b: &PaymentRequest) -> Result<Option<f64>> {
        Ok(None)
    }
}

/// Suspicious-pattern check run on every counterparty before scoring.
pub trait FraudScreen: Send + Sync {
    fn is_suspicious(&self, request: &PaymentRequest) -> Result<bool>;
}

/// Customer rating lookup (e.g. 0.0–5.0 stars). `None` means unrated.
pub trait RatingProvider: Send + Sync {
    fn rating(&self, customer: &CustomerId) -> Result<Option<f64>>;
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Every customer has zero reputation risk.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralRisk;

impl RiskProvider for NeutralRisk {
    fn customer_risk(&self, _customer: &CustomerId) -> Result<u8> {
        Ok(0)
    }
}

/// No geographic signal: never a mismatch, distance unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeoSignal;

impl GeoComparator for NoGeoSignal {
    fn mismatch(&self, _a: &PaymentRequest, _b: &PaymentRequest) -> Result<bool> {
        Ok(false)
    }
}

/// Nothing is suspicious.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl FraudScreen for AllowAll {
    fn is_suspicious(&self, _request: &PaymentRequest) -> Result<bool> {
        Ok(false)
    }
}

/// Nobody is rated.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRatings;

impl RatingProvider for NoRatings {
    fn rating(&self, _customer: &CustomerId) -> Result<Option<f64>> {
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Map-backed implementations
// ---------------------------------------------------------------------------

/// Reputation risk from an in-memory table, e.g. a periodically refreshed
/// snapshot of the reputation service.
#[derive(Debug, Clone, Default)]
pub struct StaticRiskTable {
    scores: HashMap<CustomerId, u8>,
    default_risk: u8,
}

impl StaticRiskTable {
    #[must_use]
    pub fn new(default_risk: u8) -> Self {
        Self {
            scores: HashMap::new(),
            default_risk: default_risk.min(constants::MAX_CUSTOMER_RISK),
        }
    }

    /// Every customer gets the same score.
    #[must_use]
    pub fn uniform(risk: u8) -> Self {
        Self::new(risk)
    }

    #[must_use]
    pub fn with(mut self, customer: CustomerId, risk: u8) -> Self {
        self.scores
            .insert(customer, risk.min(constants::MAX_CUSTOMER_RISK));
        self
    }
}

impl RiskProvider for StaticRiskTable {
    fn customer_risk(&self, customer: &CustomerId) -> Result<u8> {
        Ok(self
            .scores
            .get(customer)
            .copied()
            .unwrap_or(self.default_risk))
    }
}

/// Ratings from an in-memory table.
#[derive(Debug, Clone, Default)]
pub struct StaticRatings {
    ratings: HashMap<CustomerId, f64>,
}

impl StaticRatings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, customer: CustomerId, rating: f64) -> Self {
        self.ratings.insert(customer, rating);
        self
    }
}

impl RatingProvider for StaticRatings {
    fn rating(&self, customer: &CustomerId) -> Result<Option<f64>> {
        Ok(self.ratings.get(customer).copied())
    }
}

/// Compares the self-reported [`Location`](peermatch_types::Location) of
/// each request.
///
/// A mismatch needs both regions present and different; a distance needs
/// coordinates on both sides.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionGeoComparator;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres.
#[must_use]
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

impl GeoComparator for RegionGeoComparator {
    fn mismatch(&self, a: &PaymentRequest, b: &PaymentRequest) -> Result<bool> {
        Ok(match (&a.location, &b.location) {
            (Some(la), Some(lb)) => !la.region.eq_ignore_ascii_case(&lb.region),
            _ => false,
        })
    }

    fn distance_km(&self, a: &PaymentRequest, b: &PaymentRequest) -> Result<Option<f64>> {
        let coords = |r: &PaymentRequest| r.location.as_ref().and_then(|l| l.coordinates);
        Ok(match (coords(a), coords(b)) {
            (Some(ca), Some(cb)) => Some(haversine_km(ca, cb)),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// All collaborators, shareable across threads and engine instances.
#[derive(Clone)]
pub struct Collaborators {
    pub risk: Arc<dyn RiskProvider>,
    pub geo: Arc<dyn GeoComparator>,
    pub fraud: Arc<dyn FraudScreen>,
    pub ratings: Arc<dyn RatingProvider>,
}

impl Collaborators {
    #[must_use]
    pub fn with_risk(mut self, risk: impl RiskProvider + 'static) -> Self {
        self.risk = Arc::new(risk);
        self
    }

    #[must_use]
    pub fn with_geo(mut self, geo: impl GeoComparator + 'static) -> Self {
        self.geo = Arc::new(geo);
        self
    }

    #[must_use]
    pub fn with_fraud(mut self, fraud: impl FraudScreen + 'static) -> Self {
        self.fraud = Arc::new(fraud);
        self
    }

    #[must_use]
    pub fn with_ratings(mut self, ratings: impl RatingProvider + 'static) -> Self {
        self.ratings = Arc::new(ratings);
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            risk: Arc::new(NeutralRisk),
            geo: Arc::new(NoGeoSignal),
            fraud: Arc::new(AllowAll),
            ratings: Arc::new(NoRatings),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use peermatch_types::*;
    use rust_decimal::Decimal;

    use super::*;

    fn located(region: &str, lat: f64, lon: f64) -> PaymentRequest {
        let mut r = PaymentRequest::dummy(RequestType::Deposit, PaymentMethod::Venmo, Decimal::ONE);
        r.location = Some(Location {
            region: region.to_string(),
            coordinates: Some(Coordinates {
                latitude: lat,
                longitude: lon,
            }),
        });
        r
    }

    #[test]
    fn defaults_are_neutral() {
        let c = Collaborators::default();
        let r = PaymentRequest::dummy(RequestType::Deposit, PaymentMethod::Venmo, Decimal::ONE);
        assert_eq!(c.risk.customer_risk(&r.customer_id).unwrap(), 0);
        assert!(!c.geo.mismatch(&r, &r).unwrap());
        assert!(c.geo.distance_km(&r, &r).unwrap().is_none());
        assert!(!c.fraud.is_suspicious(&r).unwrap());
        assert!(c.ratings.rating(&r.customer_id).unwrap().is_none());
    }

    #[test]
    fn risk_table_lookup_and_clamp() {
        let alice = CustomerId::new("alice");
        let table = StaticRiskTable::new(5).with(alice.clone(), 250);
        assert_eq!(table.customer_risk(&alice).unwrap(), 100);
        assert_eq!(table.customer_risk(&CustomerId::new("bob")).unwrap(), 5);
    }

    #[test]
    fn region_mismatch_is_case_insensitive() {
        let geo = RegionGeoComparator;
        let a = located("US-CA", 37.77, -122.42);
        let b = located("us-ca", 34.05, -118.24);
        let c = located("US-NY", 40.71, -74.01);
        assert!(!geo.mismatch(&a, &b).unwrap());
        assert!(geo.mismatch(&a, &c).unwrap());
    }

    #[test]
    fn missing_location_is_not_a_mismatch() {
        let geo = RegionGeoComparator;
        let a = located("US-CA", 37.77, -122.42);
        let b = PaymentRequest::dummy(RequestType::Withdrawal, PaymentMethod::Venmo, Decimal::ONE);
        assert!(!geo.mismatch(&a, &b).unwrap());
        assert!(geo.distance_km(&a, &b).unwrap().is_none());
    }

    #[test]
    fn haversine_sf_to_la() {
        let sf = located("US-CA", 37.7749, -122.4194);
        let la = located("US-CA", 34.0522, -118.2437);
        let d = RegionGeoComparator.distance_km(&sf, &la).unwrap().unwrap();
        assert!((d - 559.0).abs() < 5.0, "got {d}");
    }
}
