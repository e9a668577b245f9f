/// Fixed-threshold scorer.
///
/// Each channel is compared with its warning and danger cut points
/// independently. Band lower bounds are inclusive, so a value exactly on a
/// threshold counts as the more severe band.

use crate::model::{PerChannel, Reading, RiskLevel, SensorStatus, ThresholdBand, ThresholdSpec, Thresholds};

/// Unrounded output of the threshold scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdScore {
    pub risk_score: f64,
    pub level: RiskLevel,
    pub status: PerChannel<SensorStatus>,
}

/// Classifies one raw value against its thresholds.
pub fn classify(value: f64, spec: &ThresholdSpec) -> SensorStatus {
    if value >= spec.danger {
        SensorStatus {
            status: ThresholdBand::Danger,
            level: RiskLevel::High,
            message: format!("Exceeds danger threshold ({}{})", display_value(spec.danger), spec.unit),
        }
    } else if value >= spec.warning {
        SensorStatus {
            status: ThresholdBand::Warning,
            level: RiskLevel::Moderate,
            message: format!("Exceeds warning threshold ({}{})", display_value(spec.warning), spec.unit),
        }
    } else {
        SensorStatus {
            status: ThresholdBand::Normal,
            level: RiskLevel::Low,
            message: "Within normal range".to_string(),
        }
    }
}

/// Per-channel status for a reading.
pub fn channel_status(current: &Reading, thresholds: &Thresholds) -> PerChannel<SensorStatus> {
    PerChannel::from_fn(|channel| classify(current.value(channel), thresholds.get(channel)))
}

/// Aggregates per-channel bands into a score and level.
///
///   any danger     → High, 100
///   two+ warnings  → High, 80
///   one warning    → Moderate, 50
///   otherwise      → Low, 0
pub fn aggregate(status: &PerChannel<SensorStatus>) -> (f64, RiskLevel) {
    let danger_count = status.iter().filter(|(_, s)| s.status == ThresholdBand::Danger).count();
    let warning_count = status.iter().filter(|(_, s)| s.status == ThresholdBand::Warning).count();

    if danger_count >= 1 {
        (100.0, RiskLevel::High)
    } else if warning_count >= 2 {
        (80.0, RiskLevel::High)
    } else if warning_count == 1 {
        (50.0, RiskLevel::Moderate)
    } else {
        (0.0, RiskLevel::Low)
    }
}

pub fn score(current: &Reading, thresholds: &Thresholds) -> ThresholdScore {
    let status = channel_status(current, thresholds);
    let (risk_score, level) = aggregate(&status);

    ThresholdScore {
        risk_score,
        level,
        status,
    }
}

/// Keeps a trailing `.0` on whole numbers so messages read `25.0°`.
fn display_value(value: f64) -> String {
    format!("{:?}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tilt_spec() -> ThresholdSpec {
        ThresholdSpec::new(15.0, 25.0, "°")
    }

    #[test]
    fn test_danger_band_and_message() {
        let status = classify(30.0, &tilt_spec());
        assert_eq!(status.status, ThresholdBand::Danger);
        assert_eq!(status.level, RiskLevel::High);
        assert_eq!(status.message, "Exceeds danger threshold (25.0°)");
    }

    #[test]
    fn test_warning_band_and_message() {
        let status = classify(72.5, &ThresholdSpec::new(70.0, 85.0, "%"));
        assert_eq!(status.status, ThresholdBand::Warning);
        assert_eq!(status.level, RiskLevel::Moderate);
        assert_eq!(status.message, "Exceeds warning threshold (70.0%)");
    }

    #[test]
    fn test_normal_band() {
        let status = classify(3.0, &tilt_spec());
        assert_eq!(status.status, ThresholdBand::Normal);
        assert_eq!(status.level, RiskLevel::Low);
        assert_eq!(status.message, "Within normal range");
    }

    #[test]
    fn test_boundaries_count_as_higher_band() {
        assert_eq!(classify(25.0, &tilt_spec()).status, ThresholdBand::Danger);
        assert_eq!(classify(15.0, &tilt_spec()).status, ThresholdBand::Warning);
        assert_eq!(classify(14.999, &tilt_spec()).status, ThresholdBand::Normal);
    }

    #[test]
    fn test_empty_unit_message() {
        let status = classify(80.0, &ThresholdSpec::new(50.0, 75.0, ""));
        assert_eq!(status.message, "Exceeds danger threshold (75.0)");
    }

    #[test]
    fn test_fractional_threshold_message() {
        let status = classify(12.6, &ThresholdSpec::new(12.5, 20.0, "°"));
        assert_eq!(status.message, "Exceeds warning threshold (12.5°)");
    }

    #[test]
    fn test_single_danger_is_high_100() {
        let result = score(&Reading::new(10.0, 20.0, 30.0), &Thresholds::default());
        assert_eq!(result.risk_score, 100.0);
        assert_eq!(result.level, RiskLevel::High);
        assert_eq!(result.status.tilt.status, ThresholdBand::Danger);
    }

    #[test]
    fn test_two_warnings_is_high_80() {
        let result = score(&Reading::new(55.0, 72.0, 5.0), &Thresholds::default());
        assert_eq!(result.risk_score, 80.0);
        assert_eq!(result.level, RiskLevel::High);
    }

    #[test]
    fn test_one_warning_is_moderate_50() {
        let result = score(&Reading::new(10.0, 20.0, 16.0), &Thresholds::default());
        assert_eq!(result.risk_score, 50.0);
        assert_eq!(result.level, RiskLevel::Moderate);
    }

    #[test]
    fn test_all_normal_is_low_0() {
        let result = score(&Reading::new(10.0, 20.0, 5.0), &Thresholds::default());
        assert_eq!(result.risk_score, 0.0);
        assert_eq!(result.level, RiskLevel::Low);
    }

    #[test]
    fn test_danger_beats_warnings() {
        let result = score(&Reading::new(55.0, 72.0, 26.0), &Thresholds::default());
        assert_eq!(result.risk_score, 100.0);
    }
}
