//! Integration test: end-to-end match searches
//!
//! A search must never propose a self-match or an expired counterparty,
//! must rank deterministically, and must keep going when a collaborator
//! is down.

use chrono::{DateTime, Duration, Utc};
use peermatch_engine::*;
use peermatch_types::*;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rust_decimal::Decimal;

fn dec(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

fn request_at(
    customer: &str,
    request_type: RequestType,
    method: PaymentMethod,
    amount: Decimal,
    created_at: DateTime<Utc>,
) -> PaymentRequest {
    let mut r =
        PaymentRequest::dummy_for_customer(CustomerId::new(customer), request_type, method, amount);
    r.created_at = created_at;
    r.expires_at = created_at + Duration::hours(24);
    r
}

/// Build a mixed pool of `n` requests from a fixed seed.
fn seeded_pool(seed: u64, n: usize, now: DateTime<Utc>) -> Vec<PaymentRequest> {
    let mut rng = StdRng::seed_from_u64(seed);
    let amounts = [dec(25), dec(50), dec(100)];
    (0..n)
        .map(|i| {
            let side = if rng.gen_bool(0.5) {
                RequestType::Deposit
            } else {
                RequestType::Withdrawal
            };
            let amount = amounts[rng.gen_range(0..amounts.len())];
            let age = Duration::minutes(rng.gen_range(0..600));
            let mut r = request_at(
                &format!("customer-{}", rng.gen_range(0..8)),
                side,
                PaymentMethod::Venmo,
                amount,
                now - age,
            );
            if rng.gen_bool(0.1) {
                r.priority = Priority::High;
            }
            if i % 11 == 0 {
                r.expires_at = now - Duration::minutes(1);
            }
            r
        })
        .collect()
}

struct DownRiskService;

impl RiskProvider for DownRiskService {
    fn customer_risk(&self, _customer: &CustomerId) -> peermatch_types::Result<u8> {
        Err(PeermatchError::ProviderTimeout {
            service: "reputation".into(),
            timeout_ms: 500,
        })
    }
}

/// Flags one customer as suspicious.
struct FlagCustomer(CustomerId);

impl FraudScreen for FlagCustomer {
    fn is_suspicious(&self, request: &PaymentRequest) -> peermatch_types::Result<bool> {
        Ok(request.customer_id == self.0)
    }
}

fn in_region(mut r: PaymentRequest, region: &str) -> PaymentRequest {
    r.location = Some(Location {
        region: region.to_string(),
        coordinates: None,
    });
    r
}

#[test]
fn venmo_hundred_dollar_match() {
    let now = Utc::now();
    let engine = MatchingEngine::default();
    let a = request_at("A", RequestType::Deposit, PaymentMethod::Venmo, dec(100), now);
    let b = request_at("B", RequestType::Withdrawal, PaymentMethod::Venmo, dec(100), now);

    let result = engine.find_matches(&a, &[b.clone()], &MatchOptions::new().at(now));

    assert_eq!(result.candidates.len(), 1);
    let best = result.best_match.expect("one candidate");
    assert_eq!(best.withdrawal.id, b.id);
    assert!(best.score > 150.0, "score {}", best.score);
    assert!(best.match_reasons.contains(&"Exact Amount Match".to_string()));
    assert!(best.match_reasons.contains(&"Exact amount match".to_string()));
    assert_eq!(best.estimated_settlement_minutes, 30);
}

#[test]
fn self_match_is_never_proposed() {
    let now = Utc::now();
    let engine = MatchingEngine::default();
    let a = request_at("A", RequestType::Deposit, PaymentMethod::Venmo, dec(100), now);
    let self_withdrawal =
        request_at("A", RequestType::Withdrawal, PaymentMethod::Venmo, dec(100), now);

    let result = engine.find_matches(&a, &[self_withdrawal], &MatchOptions::new().at(now));
    assert_eq!(
        result.no_match_reason,
        Some(NoMatchReason::NoEligibleCounterparties)
    );
}

#[test]
fn suspicious_counterparty_is_never_proposed() {
    let now = Utc::now();
    let engine = MatchingEngine::new(
        EngineConfig::default(),
        RuleSet::default(),
        Collaborators::default().with_fraud(FlagCustomer(CustomerId::new("mule"))),
    )
    .unwrap();
    let d = request_at("A", RequestType::Deposit, PaymentMethod::Venmo, dec(100), now);
    let flagged = request_at("mule", RequestType::Withdrawal, PaymentMethod::Venmo, dec(100), now);
    let clean = request_at("B", RequestType::Withdrawal, PaymentMethod::Venmo, dec(100), now);

    let result = engine.find_matches(
        &d,
        &[flagged.clone(), clean.clone()],
        &MatchOptions::new().at(now),
    );
    assert_eq!(result.candidates.len(), 1);
    assert_eq!(result.best_match.unwrap().withdrawal.id, clean.id);

    let only_flagged = engine.find_matches(&d, &[flagged], &MatchOptions::new().at(now));
    assert_eq!(
        only_flagged.no_match_reason,
        Some(NoMatchReason::NoEligibleCounterparties)
    );
}

#[test]
fn cross_region_pairing_carries_geo_risk() {
    let now = Utc::now();
    let engine = MatchingEngine::new(
        EngineConfig::default(),
        RuleSet::default(),
        Collaborators::default().with_geo(RegionGeoComparator),
    )
    .unwrap();
    let d = in_region(
        request_at("A", RequestType::Deposit, PaymentMethod::CashApp, dec(80), now),
        "US-CA",
    );
    let far = in_region(
        request_at("B", RequestType::Withdrawal, PaymentMethod::CashApp, dec(80), now),
        "US-NY",
    );

    let best = engine
        .find_matches(&d, &[far], &MatchOptions::new().at(now))
        .best_match
        .unwrap();
    assert!((best.risk.risk_score - 15.0).abs() < f64::EPSILON);
    assert!(
        best.risk
            .risk_factors
            .contains(&"Geographic mismatch between counterparties".to_string())
    );
    assert!(best.risk.recommended);
    // Below the penalty threshold: reported on the assessment only.
    assert!(best.breakdown.risk_penalty.abs() < f64::EPSILON);
    assert!(best.risk_factors.is_empty());
}

#[test]
fn large_amount_risk_blocks_recommendation() {
    let now = Utc::now();
    let collaborators = Collaborators::default().with_risk(StaticRiskTable::uniform(30));
    let engine =
        MatchingEngine::new(EngineConfig::default(), RuleSet::default(), collaborators).unwrap();
    let d = request_at("A", RequestType::Deposit, PaymentMethod::Zelle, dec(1500), now);
    let w = request_at("B", RequestType::Withdrawal, PaymentMethod::Zelle, dec(1500), now);

    let risk = engine.assess_risk(&d, &w);
    assert!(risk.risk_factors.contains(&"Unusual amount".to_string()));
    assert!((risk.risk_score - 50.0).abs() < f64::EPSILON);
    assert!(!risk.recommended);

    let best = engine
        .find_matches(&d, &[w], &MatchOptions::new().at(now))
        .best_match
        .unwrap();
    assert!((best.breakdown.risk_penalty - 50.0).abs() < f64::EPSILON);
    assert!(!best.risk_factors.is_empty());
    assert_eq!(best.estimated_settlement_minutes, 68);
}

#[test]
fn reputation_outage_uses_fallback() {
    let now = Utc::now();
    let engine = MatchingEngine::new(
        EngineConfig::default(),
        RuleSet::default(),
        Collaborators::default().with_risk(DownRiskService),
    )
    .unwrap();
    let d = request_at("A", RequestType::Deposit, PaymentMethod::Venmo, dec(60), now);
    let w = request_at("B", RequestType::Withdrawal, PaymentMethod::Venmo, dec(60), now);

    let result = engine.find_matches(&d, &[w], &MatchOptions::new().at(now));
    let best = result.best_match.expect("outage must not drop the candidate");
    assert!((best.risk.risk_score - 50.0).abs() < f64::EPSILON);
    assert!((best.breakdown.risk_penalty - 50.0).abs() < f64::EPSILON);
}

#[test]
fn seeded_pools_respect_invariants() {
    let now = Utc::now();
    let engine = MatchingEngine::default();

    for seed in 0..20 {
        let pool = seeded_pool(seed, 60, now);
        for query in pool.iter().filter(|r| !r.is_expired(now)) {
            let result = engine.find_matches(query, &pool, &MatchOptions::new().at(now));
            assert!(result.candidates.len() <= 10);
            assert_eq!(result.no_match_reason.is_some(), result.candidates.is_empty());

            for c in &result.candidates {
                assert!(c.score >= 0.0);
                assert_ne!(c.deposit.customer_id, c.withdrawal.customer_id);
                assert!(c.deposit.expires_at >= now && c.withdrawal.expires_at >= now);
                assert_eq!(c.deposit.amount, c.withdrawal.amount);
                assert_eq!(c.deposit.request_type, RequestType::Deposit);
                assert_eq!(c.withdrawal.request_type, RequestType::Withdrawal);
            }
            for pair in result.candidates.windows(2) {
                assert!(compare_candidates(&pair[0], &pair[1]).is_le());
            }
            if let Some(best) = &result.best_match {
                assert_eq!(best.pairing(), result.candidates[0].pairing());
            }
        }
    }
}

#[test]
fn ranking_independent_of_pool_order() {
    let now = Utc::now();
    let engine = MatchingEngine::default();
    let query = request_at("Q", RequestType::Deposit, PaymentMethod::Venmo, dec(50), now);
    // Identical timestamps everywhere: only the id tie-break separates them.
    let pool: Vec<PaymentRequest> = (0..12)
        .map(|i| {
            request_at(
                &format!("W{i}"),
                RequestType::Withdrawal,
                PaymentMethod::Venmo,
                dec(50),
                now,
            )
        })
        .collect();
    let mut reversed = pool.clone();
    reversed.reverse();

    let opts = MatchOptions::new().at(now);
    let forward = engine.find_matches(&query, &pool, &opts);
    let backward = engine.find_matches(&query, &reversed, &opts);

    assert_eq!(
        ranking_digest(&forward.candidates),
        ranking_digest(&backward.candidates)
    );
    assert!(verify_ranking_digest(
        &backward.candidates,
        &ranking_digest(&forward.candidates)
    ));
}

#[test]
fn claim_conflict_retry_walks_the_ranking() {
    let now = Utc::now();
    let engine = MatchingEngine::default();
    let query = request_at("Q", RequestType::Withdrawal, PaymentMethod::CashApp, dec(25), now);
    let pool: Vec<PaymentRequest> = (0..4)
        .map(|i| {
            request_at(
                &format!("D{i}"),
                RequestType::Deposit,
                PaymentMethod::CashApp,
                dec(25),
                now - Duration::minutes(i * 10),
            )
        })
        .collect();

    let ranked = engine
        .find_matches(&query, &pool, &MatchOptions::new().at(now))
        .candidates;
    let mut claimed = Vec::new();
    for expected in &ranked {
        let retry = engine.find_matches(
            &query,
            &pool,
            &MatchOptions::new().at(now).excluding(claimed.iter().copied()),
        );
        let best = retry.best_match.unwrap();
        assert_eq!(best.deposit.id, expected.deposit.id);
        claimed.push(best.deposit.id);
    }
    let exhausted = engine.find_matches(
        &query,
        &pool,
        &MatchOptions::new().at(now).excluding(claimed),
    );
    assert_eq!(
        exhausted.no_match_reason,
        Some(NoMatchReason::AllCandidatesExcluded)
    );
}

#[test]
fn rules_from_json_with_unknown_condition() {
    let now = Utc::now();
    let engine = MatchingEngine::default();
    let rules = RuleSet::from_json(
        r#"{"rules": [
            {"id": "mystery", "name": "Mystery", "priority": 1,
             "conditions": [{"kind": {"type": "moon_phase"}, "operator": "equals", "weight": 9.0}],
             "scoring": {"base_score": 1000.0}},
            {"id": "small", "name": "Small Amounts", "priority": 2,
             "conditions": [{"kind": {"type": "amount_range", "min": "1", "max": "50"}, "operator": "between", "weight": 2.0}],
             "scoring": {"base_score": 10.0}}
        ]}"#,
    )
    .unwrap();
    let d = request_at("A", RequestType::Deposit, PaymentMethod::PayPal, dec(40), now);
    let w = request_at("B", RequestType::Withdrawal, PaymentMethod::PayPal, dec(40), now);

    let best = engine
        .find_matches_with_rules(&d, &[w], &rules, &MatchOptions::new().at(now))
        .best_match
        .unwrap();
    assert_eq!(best.match_reasons, vec!["Small Amounts", "Exact amount match"]);
    assert!((best.breakdown.rule_score - 12.0).abs() < f64::EPSILON);
    assert_eq!(best.estimated_settlement_minutes, 36);
}

#[test]
fn result_serializes_for_the_queue_manager() {
    let now = Utc::now();
    let engine = MatchingEngine::default();
    let d = request_at("A", RequestType::Deposit, PaymentMethod::Venmo, dec(100), now);
    let result = engine.find_matches(&d, &[], &MatchOptions::new().at(now));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["no_match_reason"]["kind"], "empty_pool");
    assert_eq!(json["search_metadata"]["algorithm_version"], "2.1.0");
}
