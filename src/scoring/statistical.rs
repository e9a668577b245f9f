/// Statistical scorer: Z-scores of the current reading against the trailing
/// window, mapped to a 0–100 risk score.
///
/// A mean absolute deviation of 3σ across the three channels maps to 100%.
/// Tilt and soil are safety-critical, so either one alone beyond 3σ forces
/// the score to 100 even when rain is calm.

use crate::model::{Channel, PerChannel, Reading, RiskLevel};

/// Average |Z| that maps to a score of 100.
pub const Z_SATURATION: f64 = 3.0;

/// |Z| on tilt or soil above which the score is forced to 100.
pub const CRITICAL_Z: f64 = 3.0;

/// Scores strictly above this are High.
pub const HIGH_ABOVE: f64 = 60.0;

/// Scores strictly above this (and not High) are Moderate.
pub const MODERATE_ABOVE: f64 = 30.0;

/// Mean and population standard deviation of one channel over the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStats {
    pub mean: f64,
    pub std_dev: f64,
}

/// Unrounded output of the statistical scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticalScore {
    pub risk_score: f64,
    pub level: RiskLevel,
    pub z_scores: PerChannel<f64>,
    pub rolling_mean: PerChannel<f64>,
}

/// Mean and population standard deviation (divides by N, not N-1).
///
/// An empty slice yields zero mean and zero spread.
pub fn channel_stats(values: &[f64]) -> ChannelStats {
    let Some(&first) = values.first() else {
        return ChannelStats { mean: 0.0, std_dev: 0.0 };
    };

    // Constant history has exactly zero spread; summation error would
    // otherwise leave a tiny non-zero σ and an arbitrary Z.
    if values.iter().all(|&v| v == first) {
        return ChannelStats { mean: first, std_dev: 0.0 };
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    ChannelStats {
        mean,
        std_dev: variance.sqrt(),
    }
}

/// Z-score of `current` against `stats`; 0 when the window has no spread.
pub fn z_score(current: f64, stats: &ChannelStats) -> f64 {
    if stats.std_dev == 0.0 || !stats.std_dev.is_finite() {
        return 0.0;
    }
    (current - stats.mean) / stats.std_dev
}

/// Maps per-channel Z-scores to a 0–100 risk score.
pub fn risk_from_z(z: &PerChannel<f64>) -> f64 {
    if z.tilt.abs() > CRITICAL_Z || z.soil.abs() > CRITICAL_Z {
        return 100.0;
    }

    let avg_z = (z.rain.abs() + z.soil.abs() + z.tilt.abs()) / 3.0;
    (avg_z / Z_SATURATION * 100.0).clamp(0.0, 100.0)
}

/// Strict greater-than: exactly 60 is Moderate, exactly 30 is Low.
pub fn classify(risk_score: f64) -> RiskLevel {
    if risk_score > HIGH_ABOVE {
        RiskLevel::High
    } else if risk_score > MODERATE_ABOVE {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

/// Window mean per channel (used for display even during warm-up).
pub fn rolling_mean(window: &[Reading]) -> PerChannel<f64> {
    PerChannel::from_fn(|channel| channel_stats(&column(window, channel)).mean)
}

/// Scores `current` against `window`.
///
/// The caller is responsible for the minimum-history check; this function
/// will happily score against a window of one.
pub fn score(current: &Reading, window: &[Reading]) -> StatisticalScore {
    let stats = PerChannel::from_fn(|channel| channel_stats(&column(window, channel)));
    let z_scores = PerChannel::from_fn(|channel| z_score(current.value(channel), stats.get(channel)));
    let risk_score = risk_from_z(&z_scores);

    StatisticalScore {
        risk_score,
        level: classify(risk_score),
        z_scores,
        rolling_mean: stats.map(|s| s.mean),
    }
}

fn column(window: &[Reading], channel: Channel) -> Vec<f64> {
    window.iter().map(|r| r.value(channel)).collect()
}
