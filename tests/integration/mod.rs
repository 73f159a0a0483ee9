//! End-to-end tests for the Under/Over projection library.
//!
//! Everything here goes through the public API with default tables.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use under_over::analysis::{DivergenceAnalyzer, DivergenceTier, RiskLevel};
use under_over::curve::FinalPriceEstimator;
use under_over::market::{LiveObservation, PriceConverter, PRICE_FLOOR};
use under_over::projection::ProjectionEngine;
use under_over::report::MatchAnalyzer;
use under_over::Config;

/// Opening prices from heavy Over favourites to near-certain Unders.
fn opening_prices() -> Vec<Decimal> {
    let mut prices = vec![dec!(0.5), dec!(1.01), dec!(1.02), dec!(1.1), dec!(1.5)];
    prices.extend((2..=60).map(Decimal::from));
    prices.extend([dec!(75), dec!(120), dec!(500)]);
    prices
}

#[test]
fn projection_is_non_increasing_and_ends_at_estimate() {
    let engine = ProjectionEngine::default();

    for initial in opening_prices() {
        let traj = engine.project(initial);

        assert_eq!(traj.len(), 90, "initial {initial}");
        assert!(traj.is_non_increasing(), "initial {initial}");
        assert_eq!(
            traj.last().unwrap().side_a,
            engine.expected_final(initial),
            "initial {initial}"
        );
    }
}

#[test]
fn every_price_respects_the_floor() {
    let engine = ProjectionEngine::default();

    for initial in opening_prices() {
        let full = engine.project(initial);
        assert!(full
            .iter()
            .all(|p| p.side_a >= PRICE_FLOOR && p.side_b >= PRICE_FLOOR));

        let live = engine
            .project_from_live(initial, initial / dec!(3), 45)
            .unwrap();
        assert!(live
            .iter()
            .all(|p| p.side_a >= PRICE_FLOOR && p.side_b >= PRICE_FLOOR));
    }
}

#[test]
fn complement_round_trip_sums_to_one() {
    let converter = PriceConverter::default();
    let tolerance = dec!(0.000001);

    let mut side_a = dec!(1.05);
    while side_a <= dec!(60) {
        let side_b = converter.side_b_from_side_a(side_a);
        let implied = Decimal::ONE / side_a + Decimal::ONE / side_b;
        assert!(
            (implied - Decimal::ONE).abs() < tolerance,
            "side A {side_a} gave implied sum {implied}"
        );
        side_a += dec!(0.35);
    }
}

#[test]
fn final_estimate_is_monotone_in_opening_price() {
    let estimator = FinalPriceEstimator::default();

    let mut previous = estimator.expected_final(PRICE_FLOOR);
    let mut initial = PRICE_FLOOR;
    while initial <= dec!(150) {
        let value = estimator.expected_final(initial);
        assert!(value >= previous, "estimate dropped at {initial}");
        previous = value;
        initial += dec!(0.1);
    }
}

#[test]
fn reference_match_projection() {
    let engine = ProjectionEngine::default();
    let traj = engine.project(dec!(42));

    assert_eq!(traj.first().unwrap().side_a, dec!(42));
    assert_eq!(traj.last().unwrap().side_a, dec!(1.54));
    assert!(traj.is_non_increasing());
}

#[test]
fn live_continuation_from_half_hour() {
    let engine = ProjectionEngine::default();
    let traj = engine.project_from_live(dec!(42), dec!(14), 30).unwrap();

    let minutes: Vec<u32> = traj.iter().map(|p| p.minute).collect();
    assert_eq!(minutes, (31..=90).collect::<Vec<_>>());
    assert_eq!(traj.last().unwrap().side_a, engine.expected_final(dec!(42)));
    assert!(traj.is_non_increasing());
}

#[test]
fn divergence_reference_scenario() {
    let result = DivergenceAnalyzer::default().analyze(dec!(20), dec!(14), 30);

    assert_eq!(result.percent_gap.round_dp(1), dec!(42.9));
    assert_eq!(result.tier, DivergenceTier::HighOpportunity);
    assert_eq!(result.risk_level, RiskLevel::Low);
}

#[test]
fn degenerate_conversion_saturates() {
    let converter = PriceConverter::default();
    assert_eq!(converter.side_b_from_side_a(dec!(1.001)), dec!(25));
    assert_eq!(converter.side_b_from_side_a(Decimal::ZERO), dec!(25));
}

#[test]
fn configured_analyzer_matches_defaults() {
    let analyzer = MatchAnalyzer::from_config(&Config::default()).unwrap();
    let default = MatchAnalyzer::default();

    assert_eq!(
        analyzer.pre_match(dec!(42)),
        default.pre_match(dec!(42))
    );
}

#[test]
fn live_report_end_to_end() {
    let analyzer = MatchAnalyzer::default();
    let observation = LiveObservation {
        initial_side_a: dec!(42),
        initial_side_b: Some(dec!(1.024)),
        current_side_a: dec!(14),
        current_side_b: Some(dec!(1.08)),
        minute: 30,
    };

    let report = analyzer.live(&observation).unwrap();

    assert_eq!(report.divergence.tier, DivergenceTier::Balanced);
    assert_eq!(report.current_side_b, dec!(1.08));
    assert_eq!(report.continuation.len(), 60);
    assert_eq!(report.expected_final.side_a, dec!(1.54));
}
