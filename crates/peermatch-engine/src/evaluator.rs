//! Rule evaluation over a (deposit, withdrawal) pair.
//!
//! Each condition is dispatched by an exhaustive match on its kind and
//! operator. Anything the evaluator cannot make sense of (unknown kind,
//! unsupported operator, inverted range, failed collaborator lookup) evaluates
//! to `false`: one broken condition never aborts the scoring pass.

use chrono::{DateTime, Utc};
use peermatch_types::{
    Condition, ConditionKind, CustomerId, MatchingRule, Operator, PaymentRequest, RuleSet,
};

use crate::providers::{GeoComparator, RatingProvider};

/// Everything condition evaluation may consult besides the pair itself.
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub now: DateTime<Utc>,
    pub ratings: &'a dyn RatingProvider,
    pub geo: &'a dyn GeoComparator,
}

/// Sum of the rules that fired and their names, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleOutcome {
    pub score: f64,
    pub reasons: Vec<String>,
}

/// Evaluate every enabled rule, in priority order.
pub fn evaluate_rules(
    rules: &RuleSet,
    deposit: &PaymentRequest,
    withdrawal: &PaymentRequest,
    ctx: &EvaluationContext<'_>,
) -> RuleOutcome {
    let mut outcome = RuleOutcome::default();
    for rule in rules.enabled_rules() {
        if let Some(contribution) = evaluate_rule(rule, deposit, withdrawal, ctx) {
            outcome.score += contribution;
            outcome.reasons.push(rule.name.clone());
        }
    }
    outcome
}

/// A rule contributes `base_score + Σ weight(true conditions)` when that sum
/// of weights is positive, and nothing otherwise.
pub fn evaluate_rule(
    rule: &MatchingRule,
    deposit: &PaymentRequest,
    withdrawal: &PaymentRequest,
    ctx: &EvaluationContext<'_>,
) -> Option<f64> {
    let weight: f64 = rule
        .conditions
        .iter()
        .filter(|c| c.weight.is_finite() && c.weight > 0.0)
        .filter(|c| evaluate_condition(c, deposit, withdrawal, ctx))
        .map(|c| c.weight)
        .sum();

    (weight > 0.0).then(|| rule.scoring.base_score.max(0.0) + weight)
}

/// Whether a single condition holds for the pair.
pub fn evaluate_condition(
    condition: &Condition,
    deposit: &PaymentRequest,
    withdrawal: &PaymentRequest,
    ctx: &EvaluationContext<'_>,
) -> bool {
    match (&condition.kind, condition.operator) {
        (ConditionKind::AmountExact, Operator::Equals) => deposit.amount == withdrawal.amount,
        (ConditionKind::AmountExact, Operator::NotEquals) => deposit.amount != withdrawal.amount,

        (ConditionKind::AmountRange { min, max }, Operator::Between) => {
            min <= max
                && [deposit, withdrawal]
                    .iter()
                    .all(|r| *min <= r.amount && r.amount <= *max)
        }

        (ConditionKind::TimeSinceRequest { max_age_ms }, Operator::LessThan) => {
            *max_age_ms >= 0
                && deposit.age_ms(ctx.now) <= *max_age_ms
                && withdrawal.age_ms(ctx.now) <= *max_age_ms
        }
        (ConditionKind::TimeSinceRequest { max_age_ms }, Operator::GreaterThan) => {
            *max_age_ms >= 0
                && deposit.age_ms(ctx.now) > *max_age_ms
                && withdrawal.age_ms(ctx.now) > *max_age_ms
        }

        (ConditionKind::UserRating { threshold }, Operator::GreaterThan) => {
            both_rated(ctx, deposit, withdrawal, |rating| rating >= *threshold)
        }
        (ConditionKind::UserRating { threshold }, Operator::LessThan) => {
            both_rated(ctx, deposit, withdrawal, |rating| rating < *threshold)
        }

        (ConditionKind::GeographicDistance { max_km }, Operator::LessThan) => {
            match ctx.geo.distance_km(deposit, withdrawal) {
                Ok(Some(km)) => km <= *max_km,
                Ok(None) => false,
                Err(err) => {
                    tracing::warn!(
                        deposit = %deposit.id,
                        withdrawal = %withdrawal.id,
                        error = %err,
                        "Distance lookup failed; condition does not hold"
                    );
                    false
                }
            }
        }

        (ConditionKind::PaymentMethodPreference { methods }, Operator::In) => {
            methods.contains(&deposit.payment_method)
                && methods.contains(&withdrawal.payment_method)
        }

        (kind, operator) => {
            tracing::debug!(
                kind = kind.name(),
                %operator,
                "Unsupported condition evaluates false"
            );
            false
        }
    }
}

fn both_rated(
    ctx: &EvaluationContext<'_>,
    deposit: &PaymentRequest,
    withdrawal: &PaymentRequest,
    accept: impl Fn(f64) -> bool,
) -> bool {
    let lookup = |customer: &CustomerId| match ctx.ratings.rating(customer) {
        Ok(rating) => rating,
        Err(err) => {
            tracing::warn!(%customer, error = %err, "Rating lookup failed");
            None
        }
    };
    match (lookup(&deposit.customer_id), lookup(&withdrawal.customer_id)) {
        (Some(a), Some(b)) => accept(a) && accept(b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use peermatch_types::*;
    use rust_decimal::Decimal;

    use super::*;
    use crate::providers::{NoGeoSignal, NoRatings, RegionGeoComparator, StaticRatings};

    fn pair(amount: i64) -> (PaymentRequest, PaymentRequest) {
        let amount = Decimal::new(amount, 0);
        (
            PaymentRequest::dummy(RequestType::Deposit, PaymentMethod::Venmo, amount),
            PaymentRequest::dummy(RequestType::Withdrawal, PaymentMethod::Venmo, amount),
        )
    }

    fn ctx<'a>(
        ratings: &'a dyn RatingProvider,
        geo: &'a dyn GeoComparator,
    ) -> EvaluationContext<'a> {
        EvaluationContext {
            now: Utc::now(),
            ratings,
            geo,
        }
    }

    #[test]
    fn exact_amount() {
        let (d, w) = pair(100);
        let c = ctx(&NoRatings, &NoGeoSignal);
        assert!(evaluate_condition(&Condition::amount_exact(1.0), &d, &w, &c));
        let mut ne = Condition::amount_exact(1.0);
        ne.operator = Operator::NotEquals;
        assert!(!evaluate_condition(&ne, &d, &w, &c));
    }

    #[test]
    fn amount_range_is_inclusive() {
        let (d, w) = pair(100);
        let c = ctx(&NoRatings, &NoGeoSignal);
        let inside = Condition::amount_range(Decimal::new(100, 0), Decimal::new(200, 0), 1.0);
        let outside = Condition::amount_range(Decimal::new(101, 0), Decimal::new(200, 0), 1.0);
        let inverted = Condition::amount_range(Decimal::new(200, 0), Decimal::new(50, 0), 1.0);
        assert!(evaluate_condition(&inside, &d, &w, &c));
        assert!(!evaluate_condition(&outside, &d, &w, &c));
        assert!(!evaluate_condition(&inverted, &d, &w, &c));
    }

    #[test]
    fn age_conditions() {
        let (mut d, w) = pair(100);
        let c = ctx(&NoRatings, &NoGeoSignal);
        assert!(evaluate_condition(&Condition::max_age(60_000, 1.0), &d, &w, &c));

        d.created_at = c.now - Duration::hours(2);
        assert!(!evaluate_condition(&Condition::max_age(60_000, 1.0), &d, &w, &c));

        let mut older = Condition::max_age(60_000, 1.0);
        older.operator = Operator::GreaterThan;
        assert!(!evaluate_condition(&older, &d, &w, &c), "withdrawal is fresh");
    }

    #[test]
    fn thresholds_are_inclusive_on_the_named_side() {
        let (mut d, mut w) = pair(100);
        let c = ctx(&NoRatings, &NoGeoSignal);
        d.created_at = c.now - Duration::milliseconds(60_000);
        w.created_at = d.created_at;

        let young = Condition::max_age(60_000, 1.0);
        let mut old = young.clone();
        old.operator = Operator::GreaterThan;
        assert!(evaluate_condition(&young, &d, &w, &c));
        assert!(!evaluate_condition(&old, &d, &w, &c));

        let exact = StaticRatings::new()
            .with(d.customer_id.clone(), 4.5)
            .with(w.customer_id.clone(), 4.5);
        let high = Condition::min_rating(4.5, 1.0);
        let mut low = high.clone();
        low.operator = Operator::LessThan;
        assert!(evaluate_condition(&high, &d, &w, &ctx(&exact, &NoGeoSignal)));
        assert!(!evaluate_condition(&low, &d, &w, &ctx(&exact, &NoGeoSignal)));
    }

    #[test]
    fn ratings_require_both_sides() {
        let (d, w) = pair(100);
        let both = StaticRatings::new()
            .with(d.customer_id.clone(), 4.8)
            .with(w.customer_id.clone(), 4.6);
        let one = StaticRatings::new().with(d.customer_id.clone(), 5.0);
        let cond = Condition::min_rating(4.5, 1.0);

        assert!(evaluate_condition(&cond, &d, &w, &ctx(&both, &NoGeoSignal)));
        assert!(!evaluate_condition(&cond, &d, &w, &ctx(&one, &NoGeoSignal)));
        assert!(!evaluate_condition(&cond, &d, &w, &ctx(&NoRatings, &NoGeoSignal)));
    }

    #[test]
    fn distance_needs_coordinates() {
        let (mut d, mut w) = pair(100);
        let cond = Condition::within_km(50.0, 1.0);
        let geo = RegionGeoComparator;
        assert!(!evaluate_condition(&cond, &d, &w, &ctx(&NoRatings, &geo)));

        let at = |lat, lon| {
            Some(Location {
                region: "US-NY".to_string(),
                coordinates: Some(Coordinates {
                    latitude: lat,
                    longitude: lon,
                }),
            })
        };
        d.location = at(40.7128, -74.0060);
        w.location = at(40.7306, -73.9352);
        assert!(evaluate_condition(&cond, &d, &w, &ctx(&NoRatings, &geo)));
    }

    #[test]
    fn method_preference() {
        let (d, w) = pair(100);
        let c = ctx(&NoRatings, &NoGeoSignal);
        let venmo = Condition::preferred_methods(vec![PaymentMethod::Venmo], 1.0);
        let zelle = Condition::preferred_methods(vec![PaymentMethod::Zelle], 1.0);
        assert!(evaluate_condition(&venmo, &d, &w, &c));
        assert!(!evaluate_condition(&zelle, &d, &w, &c));
    }

    #[test]
    fn malformed_conditions_fail_closed() {
        let (d, w) = pair(100);
        let c = ctx(&NoRatings, &NoGeoSignal);
        let unknown = Condition {
            kind: ConditionKind::Unknown,
            operator: Operator::Equals,
            weight: 10.0,
        };
        let wrong_op = Condition {
            kind: ConditionKind::AmountExact,
            operator: Operator::In,
            weight: 10.0,
        };
        assert!(!evaluate_condition(&unknown, &d, &w, &c));
        assert!(!evaluate_condition(&wrong_op, &d, &w, &c));
    }

    #[test]
    fn rule_contributes_base_plus_weights() {
        let (d, w) = pair(100);
        let c = ctx(&NoRatings, &NoGeoSignal);
        let rule = MatchingRule {
            id: RuleId::new("combo"),
            name: "Combo".to_string(),
            priority: 1,
            conditions: vec![
                Condition::amount_exact(1.0),
                Condition::preferred_methods(vec![PaymentMethod::Venmo], 0.5),
                Condition::preferred_methods(vec![PaymentMethod::Zelle], 2.0),
            ],
            scoring: MatchingScoring::with_base(40.0),
            enabled: true,
        };
        let got = evaluate_rule(&rule, &d, &w, &c).unwrap();
        assert!((got - 41.5).abs() < 1e-9);
    }

    #[test]
    fn rule_without_true_conditions_contributes_nothing() {
        let (d, w) = pair(100);
        let c = ctx(&NoRatings, &NoGeoSignal);
        let rule = MatchingRule {
            id: RuleId::new("zelle_only"),
            name: "Zelle Only".to_string(),
            priority: 1,
            conditions: vec![Condition::preferred_methods(vec![PaymentMethod::Zelle], 1.0)],
            scoring: MatchingScoring::with_base(500.0),
            enabled: true,
        };
        assert!(evaluate_rule(&rule, &d, &w, &c).is_none());
    }

    #[test]
    fn default_rules_for_fresh_unrated_pair() {
        let (d, w) = pair(100);
        let c = ctx(&NoRatings, &NoGeoSignal);
        let outcome = evaluate_rules(&RuleSet::default(), &d, &w, &c);
        assert_eq!(outcome.reasons, vec!["Exact Amount Match", "Quick Match"]);
        assert!((outcome.score - (101.0 + 80.8)).abs() < 1e-9);
    }

    #[test]
    fn disabled_rules_are_skipped() {
        let (d, w) = pair(100);
        let c = ctx(&NoRatings, &NoGeoSignal);
        let mut rules = RuleSet::default();
        for rule in &mut rules.rules {
            rule.enabled = false;
        }
        assert_eq!(evaluate_rules(&rules, &d, &w, &c), RuleOutcome::default());
    }
}
