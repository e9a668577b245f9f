//! Hybrid anomaly scoring for slope sensor readings.
//!
//! Submodules:
//! - `statistical` - Z-scores against the trailing window
//! - `threshold`   - fixed warning/danger cut points per sensor
//! - `combine`     - worst-of-both merge
//!
//! `score_reading` is the single entry point: it validates its inputs, applies
//! the warm-up rule, runs both scorers, merges them and rounds the result for
//! presentation. It is a pure function of its arguments.

pub mod combine;
pub mod statistical;
pub mod threshold;

use serde::Deserialize;

use crate::model::{
    Channel, History, PerChannel, Reading, RiskLevel, RiskState, ScoreRequest, ScoreResult,
    Thresholds,
};
use combine::Assessment;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Window size used when nothing else is configured.
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// Fewer readings than this in the window yields an `Initializing` result.
pub const DEFAULT_MIN_HISTORY: usize = 5;

/// Scoring parameters (`[scoring]` in the service configuration).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Number of most recent readings used as the reference population.
    pub window_size: usize,

    /// Minimum window length before statistics are trusted.
    pub min_history: usize,

    /// When set, a threshold breach during warm-up is reported instead of
    /// `Initializing`. Off by default: the warm-up suppresses all alarms.
    pub threshold_alarms_during_warmup: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            min_history: DEFAULT_MIN_HISTORY,
            threshold_alarms_during_warmup: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Input rejected before scoring. Nothing derived from it may be persisted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("{channel} reading is not a finite number: {value}")]
    NonFiniteReading { channel: Channel, value: f64 },

    #[error("{channel} history contains a non-finite value at position {index}")]
    NonFiniteHistory { channel: Channel, index: usize },

    #[error("history channels have mismatched lengths (rain={rain}, soil={soil}, tilt={tilt})")]
    MismatchedHistory { rain: usize, soil: usize, tilt: usize },

    #[error("invalid {channel} threshold: warning {warning} must be finite and below danger {danger}")]
    InvalidThreshold { channel: Channel, warning: f64, danger: f64 },

    #[error("{channel} {quantity} overflowed; reading or history values are out of range")]
    NonFiniteResult { channel: Channel, quantity: &'static str },
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate_reading(reading: &Reading) -> Result<(), ScoringError> {
    for channel in Channel::ALL {
        let value = reading.value(channel);
        if !value.is_finite() {
            return Err(ScoringError::NonFiniteReading { channel, value });
        }
    }
    Ok(())
}

pub fn validate_window(window: &[Reading]) -> Result<(), ScoringError> {
    for (index, reading) in window.iter().enumerate() {
        for channel in Channel::ALL {
            if !reading.value(channel).is_finite() {
                return Err(ScoringError::NonFiniteHistory { channel, index });
            }
        }
    }
    Ok(())
}

pub fn validate_thresholds(thresholds: &Thresholds) -> Result<(), ScoringError> {
    for (channel, spec) in thresholds.iter() {
        let ordered = spec.warning.is_finite() && spec.danger.is_finite() && spec.warning < spec.danger;
        if !ordered {
            return Err(ScoringError::InvalidThreshold {
                channel,
                warning: spec.warning,
                danger: spec.danger,
            });
        }
    }
    Ok(())
}

/// Rejects a derived per-channel quantity that overflowed to infinity or NaN.
fn ensure_finite(quantity: &'static str, values: &PerChannel<f64>) -> Result<(), ScoringError> {
    match values.iter().find(|(_, v)| !v.is_finite()) {
        Some((channel, _)) => Err(ScoringError::NonFiniteResult { channel, quantity }),
        None => Ok(()),
    }
}

/// Converts columnar history into readings, most recent first.
pub fn history_to_window(history: &History) -> Result<Vec<Reading>, ScoringError> {
    let (rain, soil, tilt) = (history.rain.len(), history.soil.len(), history.tilt.len());
    if rain != soil || soil != tilt {
        return Err(ScoringError::MismatchedHistory { rain, soil, tilt });
    }

    let window: Vec<Reading> = history
        .rain
        .iter()
        .zip(&history.soil)
        .zip(&history.tilt)
        .map(|((&r, &s), &t)| Reading::new(r, s, t))
        .collect();

    validate_window(&window)?;
    Ok(window)
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Scores `current` against `window` (most recent first).
///
/// Only the first `config.window_size` entries of `window` are used. A
/// window shorter than `config.min_history` yields the `Initializing`
/// result with score 0 and zero Z-scores.
pub fn score_reading(
    current: &Reading,
    window: &[Reading],
    thresholds: &Thresholds,
    config: &ScoringConfig,
) -> Result<ScoreResult, ScoringError> {
    validate_reading(current)?;
    validate_window(window)?;
    validate_thresholds(thresholds)?;

    let window = &window[..window.len().min(config.window_size)];
    let threshold = threshold::score(current, thresholds);

    if window.len() < config.min_history {
        let (risk_score, risk_state) =
            if config.threshold_alarms_during_warmup && threshold.level > RiskLevel::Low {
                (threshold.risk_score, RiskState::from(threshold.level))
            } else {
                (0.0, RiskState::Initializing)
            };

        let rolling_mean = statistical::rolling_mean(window);
        ensure_finite("rolling mean", &rolling_mean)?;

        return Ok(ScoreResult {
            risk_score,
            risk_state,
            z_scores: PerChannel::splat(0.0),
            threshold_status: threshold.status,
            thresholds: thresholds.clone(),
            rolling_mean: rolling_mean.map(|&m| round_to(m, 2)),
        });
    }

    let statistical = statistical::score(current, window);
    ensure_finite("rolling mean", &statistical.rolling_mean)?;
    ensure_finite("z-score", &statistical.z_scores)?;
    let merged = combine::combine(
        Assessment::new(statistical.risk_score, statistical.level),
        Assessment::new(threshold.risk_score, threshold.level),
    );

    Ok(ScoreResult {
        risk_score: round_to(merged.score, 2),
        risk_state: merged.level.into(),
        z_scores: statistical.z_scores.map(|&z| round_to(z, 4)),
        threshold_status: threshold.status,
        thresholds: thresholds.clone(),
        rolling_mean: statistical.rolling_mean.map(|&m| round_to(m, 2)),
    })
}

/// Scores a stateless request, applying any threshold overrides on top of
/// `base_thresholds`.
pub fn score_request(
    request: &ScoreRequest,
    base_thresholds: &Thresholds,
    config: &ScoringConfig,
) -> Result<ScoreResult, ScoringError> {
    let window = history_to_window(&request.history)?;
    let thresholds = match &request.thresholds {
        Some(overrides) => overrides.apply_to(base_thresholds),
        None => base_thresholds.clone(),
    };
    score_reading(&request.reading(), &window, &thresholds, config)
}

/// Rounds half away from zero to `places` decimals.
///
/// Values too large to scale are already integral at this precision and are
/// returned unchanged.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value + 0.0;
    }
    // `+ 0.0` turns a rounded -0.0 into 0.0
    scaled.round() / factor + 0.0
}
