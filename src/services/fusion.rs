// Score Fusion
// Combines the internal analyzer score with the external judge's reading.
// - Live external result: external weight 0.8, internal 0.2
// - Stale external result (failed this round, succeeded earlier): 0.6 / 0.4
// - No external result ever: internal score unchanged

use crate::models::{ExternalJudgeResult, RiskLevel};

const LIVE_INTERNAL_WEIGHT: f64 = 0.2;
const LIVE_EXTERNAL_WEIGHT: f64 = 0.8;
const STALE_INTERNAL_WEIGHT: f64 = 0.4;
const STALE_EXTERNAL_WEIGHT: f64 = 0.6;

/// Fused scores at or above this are low risk.
pub const LOW_RISK_MIN_SCORE: f64 = 80.0;
/// Fused scores at or above this (and below the low-risk bound) are medium risk.
pub const MEDIUM_RISK_MIN_SCORE: f64 = 60.0;

/// Fuse into a 0-100 humanness score (higher = more human).
pub fn fuse(
    internal_score: f64,
    external: Option<&ExternalJudgeResult>,
    previous_external: Option<&ExternalJudgeResult>,
) -> f64 {
    let internal = internal_score.clamp(0.0, 100.0);
    match (external, previous_external) {
        (Some(live), _) => {
            (internal * LIVE_INTERNAL_WEIGHT + live.human_score() * LIVE_EXTERNAL_WEIGHT).round()
        }
        (None, Some(stale)) => {
            (internal * STALE_INTERNAL_WEIGHT + stale.human_score() * STALE_EXTERNAL_WEIGHT).round()
        }
        (None, None) => internal,
    }
}

pub fn risk_level(score: f64) -> RiskLevel {
    if score >= LOW_RISK_MIN_SCORE {
        RiskLevel::Low
    } else if score >= MEDIUM_RISK_MIN_SCORE {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judge(fake: f64) -> ExternalJudgeResult {
        ExternalJudgeResult {
            fake_percentage: fake,
            ai_words: None,
            feedback: None,
        }
    }

    #[test]
    fn test_live_external_dominates() {
        assert_eq!(fuse(70.0, Some(&judge(10.0)), None), 86.0);
        // A live reading wins over a stale one.
        assert_eq!(fuse(70.0, Some(&judge(10.0)), Some(&judge(90.0))), 86.0);
    }

    #[test]
    fn test_stale_external_is_discounted() {
        // 0.4 * 70 + 0.6 * 80 = 76
        assert_eq!(fuse(70.0, None, Some(&judge(20.0))), 76.0);
    }

    #[test]
    fn test_internal_only() {
        assert_eq!(fuse(70.0, None, None), 70.0);
        assert_eq!(fuse(63.4, None, None), 63.4);
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        assert_eq!(fuse(150.0, None, None), 100.0);
        assert_eq!(fuse(50.0, Some(&judge(-20.0)), None), 90.0);
    }

    #[test]
    fn test_risk_level() {
        assert_eq!(risk_level(92.0), RiskLevel::Low);
        assert_eq!(risk_level(80.0), RiskLevel::Low);
        assert_eq!(risk_level(65.0), RiskLevel::Medium);
        assert_eq!(risk_level(10.0), RiskLevel::High);
    }
}
