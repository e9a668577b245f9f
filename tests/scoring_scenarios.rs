/// End-to-end scoring scenarios and properties
///
/// These tests drive `score_reading` the way the monitor does, with default
/// thresholds and scoring parameters, and check:
/// 1. Quiet conditions stay Low
/// 2. A single danger breach forces High regardless of statistics
/// 3. A large deviation on one channel forces High even when limits are normal
/// 4. Warm-up suppresses everything, even far beyond danger
/// 5. Score bounds, threshold boundaries and combiner properties
///
/// Run with: cargo test --test scoring_scenarios

use proptest::prelude::*;
use slope_sentry::model::{
    Reading, RiskLevel, RiskState, ThresholdBand, ThresholdSpec, Thresholds,
};
use slope_sentry::scoring::combine::{combine, Assessment};
use slope_sentry::scoring::{score_reading, threshold, ScoringConfig, ScoringError};

fn quiet_window(n: usize) -> Vec<Reading> {
    vec![Reading::new(10.0, 20.0, 5.0); n]
}

fn score(current: Reading, window: &[Reading]) -> slope_sentry::model::ScoreResult {
    score_reading(&current, window, &Thresholds::default(), &ScoringConfig::default()).unwrap()
}

#[test]
fn test_quiet_slope_is_low() {
    let result = score(Reading::new(10.0, 20.0, 5.0), &quiet_window(20));

    assert_eq!(result.risk_state, RiskState::Low);
    assert_eq!(result.risk_score, 0.0);
    assert_eq!(result.z_scores.rain, 0.0);
    assert_eq!(result.z_scores.soil, 0.0);
    assert_eq!(result.z_scores.tilt, 0.0);
    for (_, status) in result.threshold_status.iter() {
        assert_eq!(status.status, ThresholdBand::Normal);
    }
    assert_eq!(result.rolling_mean.tilt, 5.0);
}

#[test]
fn test_tilt_danger_forces_high() {
    let window: Vec<Reading> = (0..8)
        .map(|i| Reading::new(10.0, 20.0, 5.0 + (i % 2) as f64 * 0.1))
        .collect();
    let result = score(Reading::new(10.0, 20.0, 30.0), &window);

    assert_eq!(result.threshold_status.tilt.status, ThresholdBand::Danger);
    assert_eq!(result.threshold_status.tilt.message, "Exceeds danger threshold (25.0°)");
    assert_eq!(result.risk_score, 100.0);
    assert_eq!(result.risk_state, RiskState::High);
}

#[test]
fn test_tilt_deviation_forces_high() {
    // Tilt alternates 4, 6: mean 5, population std dev 1.
    let window: Vec<Reading> = (0..20)
        .map(|i| Reading::new(10.0, 20.0, if i % 2 == 0 { 4.0 } else { 6.0 }))
        .collect();
    let result = score(Reading::new(10.0, 20.0, 8.5), &window);

    assert_eq!(result.z_scores.tilt, 3.5);
    assert_eq!(result.z_scores.rain, 0.0);
    assert_eq!(result.z_scores.soil, 0.0);
    for (_, status) in result.threshold_status.iter() {
        assert_eq!(status.status, ThresholdBand::Normal);
    }
    assert_eq!(result.risk_score, 100.0);
    assert_eq!(result.risk_state, RiskState::High);
}

#[test]
fn test_moderate_deviation_without_override() {
    // Tilt z = 2.5, others 0: 2.5 / 3 / 3 * 100 = 27.78, below Moderate.
    let window: Vec<Reading> = (0..20)
        .map(|i| Reading::new(10.0, 20.0, if i % 2 == 0 { 4.0 } else { 6.0 }))
        .collect();
    let result = score(Reading::new(10.0, 20.0, 7.5), &window);

    assert_eq!(result.z_scores.tilt, 2.5);
    assert_eq!(result.risk_score, 27.78);
    assert_eq!(result.risk_state, RiskState::Low);
}

#[test]
fn test_warmup_suppresses_danger() {
    let result = score(Reading::new(100.0, 100.0, 100.0), &quiet_window(4));

    assert_eq!(result.risk_state, RiskState::Initializing);
    assert_eq!(result.risk_score, 0.0);
    assert_eq!(result.threshold_status.tilt.status, ThresholdBand::Danger);
}

#[test]
fn test_warmup_threshold_alarms_when_enabled() {
    let config = ScoringConfig {
        threshold_alarms_during_warmup: true,
        ..ScoringConfig::default()
    };
    let result = score_reading(
        &Reading::new(100.0, 100.0, 100.0),
        &quiet_window(4),
        &Thresholds::default(),
        &config,
    )
    .unwrap();

    assert_eq!(result.risk_state, RiskState::High);
    assert_eq!(result.risk_score, 100.0);

    // Nothing breached: still initializing.
    let quiet = score_reading(&Reading::new(10.0, 20.0, 5.0), &quiet_window(4), &Thresholds::default(), &config)
        .unwrap();
    assert_eq!(quiet.risk_state, RiskState::Initializing);
}

#[test]
fn test_two_warnings_are_high() {
    let result = score(Reading::new(50.0, 70.0, 5.0), &quiet_window(5));
    assert_eq!(result.threshold_status.rain.status, ThresholdBand::Warning);
    assert_eq!(result.threshold_status.soil.status, ThresholdBand::Warning);
    assert_eq!(result.risk_state, RiskState::High);
    assert!(result.risk_score >= 80.0);
}

#[test]
fn test_window_truncated_to_most_recent() {
    // Only the first 20 (most recent) entries count; older spikes are ignored.
    let mut window = quiet_window(20);
    window.extend(std::iter::repeat(Reading::new(500.0, 500.0, 500.0)).take(10));
    let result = score(Reading::new(10.0, 20.0, 5.0), &window);

    assert_eq!(result.risk_state, RiskState::Low);
    assert_eq!(result.rolling_mean.rain, 10.0);
}

fn level_strategy() -> impl Strategy<Value = RiskLevel> {
    prop_oneof![Just(RiskLevel::Low), Just(RiskLevel::Moderate), Just(RiskLevel::High)]
}

fn reading_strategy() -> impl Strategy<Value = Reading> {
    (-1e4f64..1e4, -1e4f64..1e4, -1e4f64..1e4).prop_map(|(r, s, t)| Reading::new(r, s, t))
}

fn extreme_reading_strategy() -> impl Strategy<Value = Reading> {
    let value = || prop::num::f64::NORMAL | prop::num::f64::ZERO;
    (value(), value(), value()).prop_map(|(r, s, t)| Reading::new(r, s, t))
}

proptest! {
    #[test]
    fn prop_full_range_results_are_finite_or_rejected(
        current in extreme_reading_strategy(),
        window in prop::collection::vec(extreme_reading_strategy(), 0..12),
    ) {
        match score_reading(&current, &window, &Thresholds::default(), &ScoringConfig::default()) {
            Ok(result) => {
                prop_assert!((0.0..=100.0).contains(&result.risk_score));
                for (_, z) in result.z_scores.iter() {
                    prop_assert!(z.is_finite());
                }
                for (_, mean) in result.rolling_mean.iter() {
                    prop_assert!(mean.is_finite());
                }
            }
            Err(e) => prop_assert!(matches!(e, ScoringError::NonFiniteResult { .. }), "unexpected error {}", e),
        }
    }

    #[test]
    fn prop_short_window_initializes(
        current in reading_strategy(),
        window in prop::collection::vec(reading_strategy(), 0..5),
    ) {
        let result = score(current, &window);
        prop_assert_eq!(result.risk_state, RiskState::Initializing);
        prop_assert_eq!(result.risk_score, 0.0);
    }

    #[test]
    fn prop_score_is_bounded(
        current in reading_strategy(),
        window in prop::collection::vec(reading_strategy(), 5..30),
    ) {
        let result = score(current, &window);
        prop_assert!((0.0..=100.0).contains(&result.risk_score));
        prop_assert_ne!(result.risk_state, RiskState::Initializing);
    }

    #[test]
    fn prop_constant_window_has_zero_z(
        value in reading_strategy(),
        current in reading_strategy(),
        n in 5usize..25,
    ) {
        let result = score(current, &vec![value; n]);
        prop_assert_eq!(result.z_scores.rain, 0.0);
        prop_assert_eq!(result.z_scores.soil, 0.0);
        prop_assert_eq!(result.z_scores.tilt, 0.0);
    }

    #[test]
    fn prop_threshold_band_is_monotonic(a in -100f64..200.0, b in -100f64..200.0) {
        let spec = ThresholdSpec::new(15.0, 25.0, "°");
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(threshold::classify(lo, &spec).status <= threshold::classify(hi, &spec).status);
    }

    #[test]
    fn prop_combine_takes_worst(
        s1 in 0f64..=100.0,
        s2 in 0f64..=100.0,
        l1 in level_strategy(),
        l2 in level_strategy(),
    ) {
        let merged = combine(Assessment::new(s1, l1), Assessment::new(s2, l2));
        prop_assert_eq!(merged.score, s1.max(s2));
        prop_assert_eq!(merged.level, l1.max(l2));
    }
}

#[test]
fn test_threshold_boundaries_inclusive() {
    let spec = ThresholdSpec::new(15.0, 25.0, "°");
    assert_eq!(threshold::classify(14.999, &spec).status, ThresholdBand::Normal);
    assert_eq!(threshold::classify(15.0, &spec).status, ThresholdBand::Warning);
    assert_eq!(threshold::classify(24.999, &spec).status, ThresholdBand::Warning);
    assert_eq!(threshold::classify(25.0, &spec).status, ThresholdBand::Danger);
}
