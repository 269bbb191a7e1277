use super::metrics::ExerciseMetrics;

/// スコアの出自。`Fallback` は代替値や汎用プロファイルによる
/// 信頼度低下を呼び出し側へ明示する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    Computed,
    Fallback,
}

/// 0〜100 にクランプ済みのフォームスコア
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormScore {
    pub value: f32,
    pub source: ScoreSource,
}

impl FormScore {
    pub fn is_fallback(&self) -> bool {
        self.source == ScoreSource::Fallback
    }
}

/// 汎用フォールバックの中立スコア
pub const NEUTRAL_SCORE: f32 = 75.0;

fn clamp_score(raw: f32) -> f32 {
    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, 100.0)
}

fn avg2(a: f32, b: f32) -> f32 {
    (a + b) / 2.0
}

/// 種目別の重み付き減点式。入力がどれだけ範囲外でも
/// 最終値は必ず [0, 100] に収まる。
pub fn score(metrics: &ExerciseMetrics, degraded: bool, profile_fallback: bool) -> FormScore {
    let raw = match metrics {
        ExerciseMetrics::Pushup {
            left_arm_angle,
            right_arm_angle,
            body_alignment_dev,
            ..
        } => avg2(
            100.0 - 2.0 * (left_arm_angle - right_arm_angle).abs(),
            100.0 - 3.0 * body_alignment_dev,
        ),
        ExerciseMetrics::Squat {
            left_knee_angle,
            right_knee_angle,
            back_angle,
            knee_alignment_dev,
            ..
        } => {
            let knee = 100.0 - 2.0 * (left_knee_angle - right_knee_angle).abs();
            let back = 100.0 - 2.0 * (back_angle - 90.0).abs();
            let alignment = 100.0 - 3.0 * knee_alignment_dev;
            (knee + back + alignment) / 3.0
        }
        ExerciseMetrics::Situp {
            torso_incline,
            leg_stability_dev,
            neck_dev,
        } => 100.0 - 0.5 * torso_incline - 2.0 * leg_stability_dev - 2.0 * neck_dev,
        ExerciseMetrics::Plank {
            body_line_dev,
            hip_offset,
            shoulder_dev,
        } => 100.0 - 3.0 * body_line_dev - 5.0 * hip_offset.abs() - 3.0 * shoulder_dev,
        ExerciseMetrics::JumpingJacks {
            left_arm_elevation,
            right_arm_elevation,
            leg_spread_dev,
            ..
        } => avg2(
            100.0 - 2.0 * (left_arm_elevation - right_arm_elevation).abs(),
            100.0 - 2.0 * leg_spread_dev,
        ),
        ExerciseMetrics::Lunges {
            front_knee_angle,
            torso_lean_dev,
            ..
        } => avg2(
            100.0 - 2.0 * (front_knee_angle - 90.0).abs(),
            100.0 - 3.0 * torso_lean_dev,
        ),
        ExerciseMetrics::Burpees {
            body_line_dev,
            left_arm_angle,
            right_arm_angle,
            ..
        } => avg2(
            100.0 - 3.0 * body_line_dev,
            100.0 - 2.0 * (left_arm_angle - right_arm_angle).abs(),
        ),
        ExerciseMetrics::PullUps {
            left_arm_angle,
            right_arm_angle,
            body_line_dev,
            ..
        } => avg2(
            100.0 - 2.0 * (left_arm_angle - right_arm_angle).abs(),
            100.0 - 3.0 * body_line_dev,
        ),
        ExerciseMetrics::Generic { .. } => NEUTRAL_SCORE,
    };
    let source = if degraded || profile_fallback || matches!(metrics, ExerciseMetrics::Generic { .. })
    {
        ScoreSource::Fallback
    } else {
        ScoreSource::Computed
    };
    FormScore {
        value: clamp_score(raw),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pushup_metrics(left: f32, right: f32, alignment: f32) -> ExerciseMetrics {
        ExerciseMetrics::Pushup {
            left_arm_angle: left,
            right_arm_angle: right,
            avg_arm_angle: (left + right) / 2.0,
            body_alignment_dev: alignment,
        }
    }

    #[test]
    fn test_pushup_perfect_form_scores_100() {
        let result = score(&pushup_metrics(90.0, 90.0, 0.0), false, false);
        assert_eq!(result.value, 100.0);
        assert_eq!(result.source, ScoreSource::Computed);
    }

    #[test]
    fn test_pushup_penalties() {
        // 左右差 10° と直線度偏差 10°: avg(80, 70) = 75
        let result = score(&pushup_metrics(100.0, 90.0, 10.0), false, false);
        assert!((result.value - 75.0).abs() < 1e-4);
    }

    #[test]
    fn test_squat_back_angle_penalty() {
        let metrics = ExerciseMetrics::Squat {
            left_knee_angle: 90.0,
            right_knee_angle: 90.0,
            avg_knee_angle: 90.0,
            back_angle: 80.0,
            knee_alignment_dev: 0.0,
        };
        // (100 + 80 + 100) / 3
        let result = score(&metrics, false, false);
        assert!((result.value - 93.333_336).abs() < 1e-3);
    }

    #[test]
    fn test_situp_formula() {
        let metrics = ExerciseMetrics::Situp {
            torso_incline: 20.0,
            leg_stability_dev: 5.0,
            neck_dev: 5.0,
        };
        // 100 - 10 - 10 - 10
        let result = score(&metrics, false, false);
        assert!((result.value - 70.0).abs() < 1e-4);
    }

    #[test]
    fn test_plank_formula_uses_hip_magnitude() {
        let sag = ExerciseMetrics::Plank {
            body_line_dev: 5.0,
            hip_offset: 4.0,
            shoulder_dev: 5.0,
        };
        let pike = ExerciseMetrics::Plank {
            body_line_dev: 5.0,
            hip_offset: -4.0,
            shoulder_dev: 5.0,
        };
        // 100 - 15 - 20 - 15 = 50
        assert!((score(&sag, false, false).value - 50.0).abs() < 1e-4);
        assert_eq!(score(&sag, false, false).value, score(&pike, false, false).value);
    }

    #[test]
    fn test_score_clamped_for_extreme_inputs() {
        let terrible = ExerciseMetrics::Plank {
            body_line_dev: 1e6,
            hip_offset: -1e6,
            shoulder_dev: 1e6,
        };
        assert_eq!(score(&terrible, false, false).value, 0.0);

        let absurd = pushup_metrics(f32::MAX, f32::MAX, -1e9);
        let result = score(&absurd, false, false);
        assert!(result.value >= 0.0 && result.value <= 100.0);
    }

    #[test]
    fn test_degraded_input_flags_fallback_but_scores() {
        let result = score(&pushup_metrics(90.0, 90.0, 0.0), true, false);
        assert_eq!(result.source, ScoreSource::Fallback);
        assert_eq!(result.value, 100.0);
    }

    #[test]
    fn test_generic_metrics_neutral_fallback() {
        let result = score(
            &ExerciseMetrics::Generic {
                dominant_angle: 120.0,
            },
            false,
            true,
        );
        assert_eq!(result.value, NEUTRAL_SCORE);
        assert!(result.is_fallback());
    }
}
