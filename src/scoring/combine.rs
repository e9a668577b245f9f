/// Worst-of-both merge of the statistical and threshold assessments.
///
/// A calm statistical signal must never mask a clear threshold breach, and
/// vice versa: the final score is the larger of the two and the final level
/// the more severe.

use crate::model::RiskLevel;

/// Score and level from one scoring method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub score: f64,
    pub level: RiskLevel,
}

impl Assessment {
    pub fn new(score: f64, level: RiskLevel) -> Self {
        Assessment { score, level }
    }
}

pub fn combine(statistical: Assessment, threshold: Assessment) -> Assessment {
    Assessment {
        score: statistical.score.max(threshold.score),
        level: statistical.level.max(threshold.level),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_danger_wins_over_calm_statistics() {
        let merged = combine(
            Assessment::new(4.2, RiskLevel::Low),
            Assessment::new(100.0, RiskLevel::High),
        );
        assert_eq!(merged, Assessment::new(100.0, RiskLevel::High));
    }

    #[test]
    fn test_statistical_spike_wins_over_normal_thresholds() {
        let merged = combine(
            Assessment::new(45.0, RiskLevel::Moderate),
            Assessment::new(0.0, RiskLevel::Low),
        );
        assert_eq!(merged, Assessment::new(45.0, RiskLevel::Moderate));
    }

    #[test]
    fn test_score_and_level_taken_independently() {
        // 55 Moderate statistically vs 50 Moderate by threshold
        let merged = combine(
            Assessment::new(55.0, RiskLevel::Moderate),
            Assessment::new(50.0, RiskLevel::Moderate),
        );
        assert_eq!(merged.score, 55.0);
        assert_eq!(merged.level, RiskLevel::Moderate);

        // 80 High by two warnings vs 65 High statistically
        let merged = combine(
            Assessment::new(65.0, RiskLevel::High),
            Assessment::new(80.0, RiskLevel::High),
        );
        assert_eq!(merged, Assessment::new(80.0, RiskLevel::High));
    }
}
