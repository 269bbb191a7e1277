use serde::{Deserialize, Serialize};

use crate::config::ExerciseProfile;

use super::metrics::ExerciseMetrics;
use super::phase::Phase;

/// エラーの深刻度
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// フォームエラーの種別
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InsufficientDepth,
    BodyMisalignment,
    AsymmetricArms,
    AsymmetricLegs,
    ForwardLean,
    KneeMisalignment,
    LegInstability,
    NeckStrain,
    HipSag,
    HipPike,
    ShoulderInstability,
    IncompleteExtension,
    IncompleteStand,
    PartialRange,
    BodySwing,
}

impl ErrorKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::InsufficientDepth => "insufficient_depth",
            Self::BodyMisalignment => "body_misalignment",
            Self::AsymmetricArms => "asymmetric_arms",
            Self::AsymmetricLegs => "asymmetric_legs",
            Self::ForwardLean => "forward_lean",
            Self::KneeMisalignment => "knee_misalignment",
            Self::LegInstability => "leg_instability",
            Self::NeckStrain => "neck_strain",
            Self::HipSag => "hip_sag",
            Self::HipPike => "hip_pike",
            Self::ShoulderInstability => "shoulder_instability",
            Self::IncompleteExtension => "incomplete_extension",
            Self::IncompleteStand => "incomplete_stand",
            Self::PartialRange => "partial_range",
            Self::BodySwing => "body_swing",
        }
    }
}

/// 検出されたフォームエラー。同一性を持たず、値として比較する。
#[derive(Debug, Clone, PartialEq)]
pub struct FormError {
    pub kind: ErrorKind,
    pub message: &'static str,
    pub severity: Severity,
    pub suggestion: Option<&'static str>,
}

impl FormError {
    fn new(
        kind: ErrorKind,
        message: &'static str,
        severity: Severity,
        suggestion: &'static str,
    ) -> Self {
        Self {
            kind,
            message,
            severity,
            suggestion: Some(suggestion),
        }
    }
}

/// 種目別のルールを評価する。各ルールは独立で、短絡しない。
/// 同時に成立したエラーはすべて報告される。
pub fn detect(metrics: &ExerciseMetrics, phase: Phase, profile: &ExerciseProfile) -> Vec<FormError> {
    let mut errors = Vec::new();
    match metrics {
        ExerciseMetrics::Pushup {
            left_arm_angle,
            right_arm_angle,
            avg_arm_angle,
            body_alignment_dev,
        } => {
            if phase == Phase::Down && *avg_arm_angle > profile.rom_angle {
                errors.push(FormError::new(
                    ErrorKind::InsufficientDepth,
                    "下降が浅く、肘の曲げが足りない",
                    Severity::Medium,
                    "胸が床に近づくまで下ろす",
                ));
            }
            if *body_alignment_dev > profile.alignment_limit {
                errors.push(FormError::new(
                    ErrorKind::BodyMisalignment,
                    "体が一直線になっていない",
                    Severity::High,
                    "体幹を締めて頭から踵まで一直線を保つ",
                ));
            }
            if (left_arm_angle - right_arm_angle).abs() > profile.asymmetry_limit {
                errors.push(FormError::new(
                    ErrorKind::AsymmetricArms,
                    "左右の腕の動きが非対称",
                    Severity::Medium,
                    "両腕を同時に均等に曲げ伸ばしする",
                ));
            }
        }
        ExerciseMetrics::Squat {
            avg_knee_angle,
            back_angle,
            knee_alignment_dev,
            ..
        } => {
            if phase == Phase::Down && *avg_knee_angle > profile.rom_angle {
                errors.push(FormError::new(
                    ErrorKind::InsufficientDepth,
                    "しゃがみが浅い",
                    Severity::Medium,
                    "太ももが床と平行になるまで下げる",
                ));
            }
            if *back_angle < profile.lean_limit {
                errors.push(FormError::new(
                    ErrorKind::ForwardLean,
                    "上体が前に倒れすぎている",
                    Severity::High,
                    "胸を張って背中をまっすぐ保つ",
                ));
            }
            if *knee_alignment_dev > profile.alignment_limit {
                errors.push(FormError::new(
                    ErrorKind::KneeMisalignment,
                    "膝が内外にぶれている",
                    Severity::High,
                    "膝をつま先と同じ向きに保つ",
                ));
            }
        }
        ExerciseMetrics::Situp {
            leg_stability_dev,
            neck_dev,
            ..
        } => {
            if *leg_stability_dev > profile.stability_limit {
                errors.push(FormError::new(
                    ErrorKind::LegInstability,
                    "脚が動いて安定していない",
                    Severity::Medium,
                    "膝の角度を保ち、足裏を床に着けたままにする",
                ));
            }
            if *neck_dev > profile.alignment_limit {
                errors.push(FormError::new(
                    ErrorKind::NeckStrain,
                    "首に負担がかかる姿勢になっている",
                    Severity::Medium,
                    "顎を引きすぎず、視線を斜め上に保つ",
                ));
            }
        }
        ExerciseMetrics::Plank {
            body_line_dev,
            hip_offset,
            shoulder_dev,
        } => {
            if *body_line_dev > profile.alignment_limit {
                errors.push(FormError::new(
                    ErrorKind::BodyMisalignment,
                    "体のラインが崩れている",
                    Severity::High,
                    "頭から踵まで一直線を意識する",
                ));
            }
            if *hip_offset > profile.stability_limit {
                errors.push(FormError::new(
                    ErrorKind::HipSag,
                    "腰が落ちている",
                    Severity::High,
                    "お尻を締めて腰を持ち上げる",
                ));
            }
            if *hip_offset < -profile.stability_limit {
                errors.push(FormError::new(
                    ErrorKind::HipPike,
                    "腰が上がりすぎている",
                    Severity::Medium,
                    "腰を下げて体を一直線に戻す",
                ));
            }
            if *shoulder_dev > profile.stability_limit {
                errors.push(FormError::new(
                    ErrorKind::ShoulderInstability,
                    "肩が肘の真上にない",
                    Severity::Medium,
                    "肩を肘の真上に置いて支える",
                ));
            }
        }
        ExerciseMetrics::JumpingJacks {
            left_arm_elevation,
            right_arm_elevation,
            avg_arm_elevation,
            leg_spread_dev,
        } => {
            if phase == Phase::Up && *avg_arm_elevation < profile.rom_angle {
                errors.push(FormError::new(
                    ErrorKind::IncompleteExtension,
                    "腕が上がりきっていない",
                    Severity::Medium,
                    "手が頭上で合わさるまで振り上げる",
                ));
            }
            if (left_arm_elevation - right_arm_elevation).abs() > profile.asymmetry_limit {
                errors.push(FormError::new(
                    ErrorKind::AsymmetricArms,
                    "左右の腕の振りが非対称",
                    Severity::Medium,
                    "両腕を同じ高さまで振り上げる",
                ));
            }
            if *leg_spread_dev > profile.stability_limit {
                errors.push(FormError::new(
                    ErrorKind::AsymmetricLegs,
                    "脚の開きが左右非対称",
                    Severity::Low,
                    "両足を同じ幅で開閉する",
                ));
            }
        }
        ExerciseMetrics::Lunges {
            front_knee_angle,
            torso_lean_dev,
            ..
        } => {
            if phase == Phase::Down && *front_knee_angle > profile.rom_angle {
                errors.push(FormError::new(
                    ErrorKind::InsufficientDepth,
                    "踏み込みが浅い",
                    Severity::Medium,
                    "前膝が約90度になるまで沈む",
                ));
            }
            if *torso_lean_dev > profile.alignment_limit {
                errors.push(FormError::new(
                    ErrorKind::ForwardLean,
                    "上体が前傾しすぎている",
                    Severity::High,
                    "上体を立てたまま真下に沈む",
                ));
            }
        }
        ExerciseMetrics::Burpees {
            torso_incline,
            body_line_dev,
            ..
        } => {
            if phase == Phase::Down && *body_line_dev > profile.alignment_limit {
                errors.push(FormError::new(
                    ErrorKind::BodyMisalignment,
                    "プランク姿勢が崩れている",
                    Severity::High,
                    "着地したら体を一直線に保つ",
                ));
            }
            if phase == Phase::Up && *torso_incline < profile.rom_angle {
                errors.push(FormError::new(
                    ErrorKind::IncompleteStand,
                    "立ち上がりが不完全",
                    Severity::Low,
                    "最後まで直立してから次の動作に移る",
                ));
            }
        }
        ExerciseMetrics::PullUps {
            left_arm_angle,
            right_arm_angle,
            avg_arm_angle,
            body_line_dev,
        } => {
            if phase == Phase::Down && *avg_arm_angle > profile.rom_angle {
                errors.push(FormError::new(
                    ErrorKind::PartialRange,
                    "引き上げが浅い",
                    Severity::Medium,
                    "顎がバーを越えるまで引き上げる",
                ));
            }
            if (left_arm_angle - right_arm_angle).abs() > profile.asymmetry_limit {
                errors.push(FormError::new(
                    ErrorKind::AsymmetricArms,
                    "左右の腕の引きが非対称",
                    Severity::Medium,
                    "両腕で均等に引き上げる",
                ));
            }
            if *body_line_dev > profile.alignment_limit {
                errors.push(FormError::new(
                    ErrorKind::BodySwing,
                    "体が前後に振れている",
                    Severity::Medium,
                    "反動を使わず体幹を固定する",
                ));
            }
        }
        ExerciseMetrics::Generic { .. } => {}
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileRegistry;

    fn profile(key: &str) -> ExerciseProfile {
        ProfileRegistry::builtin().lookup(key).profile
    }

    fn pushup_metrics(left: f32, right: f32, alignment: f32) -> ExerciseMetrics {
        ExerciseMetrics::Pushup {
            left_arm_angle: left,
            right_arm_angle: right,
            avg_arm_angle: (left + right) / 2.0,
            body_alignment_dev: alignment,
        }
    }

    fn kinds(errors: &[FormError]) -> Vec<ErrorKind> {
        errors.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_pushup_insufficient_depth_in_down_phase() {
        let profile = profile("pushup");
        // down フェーズで rom_angle (90) を超えていれば必ず検出
        let shallow = detect(&pushup_metrics(100.0, 100.0, 0.0), Phase::Down, &profile);
        assert!(kinds(&shallow).contains(&ErrorKind::InsufficientDepth));
        // 可動域内なら検出しない
        let deep = detect(&pushup_metrics(85.0, 85.0, 0.0), Phase::Down, &profile);
        assert!(!kinds(&deep).contains(&ErrorKind::InsufficientDepth));
        // down 以外のフェーズでは深さを問わない
        let up = detect(&pushup_metrics(160.0, 160.0, 0.0), Phase::Up, &profile);
        assert!(!kinds(&up).contains(&ErrorKind::InsufficientDepth));
    }

    #[test]
    fn test_pushup_simultaneous_errors_all_reported() {
        let profile = profile("pushup");
        // 浅い + 非対称 (>15°) + 直線度崩れ (>25°) を同時に
        let errors = detect(&pushup_metrics(120.0, 80.0, 30.0), Phase::Down, &profile);
        let found = kinds(&errors);
        assert!(found.contains(&ErrorKind::InsufficientDepth));
        assert!(found.contains(&ErrorKind::AsymmetricArms));
        assert!(found.contains(&ErrorKind::BodyMisalignment));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_pushup_asymmetry_tolerance_boundary() {
        let profile = profile("pushup");
        // ちょうど 15° は許容内
        let at_limit = detect(&pushup_metrics(100.0, 85.0, 0.0), Phase::Up, &profile);
        assert!(!kinds(&at_limit).contains(&ErrorKind::AsymmetricArms));
        let over = detect(&pushup_metrics(101.0, 85.0, 0.0), Phase::Up, &profile);
        assert!(kinds(&over).contains(&ErrorKind::AsymmetricArms));
    }

    #[test]
    fn test_squat_forward_lean_and_knee_misalignment() {
        let profile = profile("squat");
        let metrics = ExerciseMetrics::Squat {
            left_knee_angle: 100.0,
            right_knee_angle: 100.0,
            avg_knee_angle: 100.0,
            back_angle: 60.0,
            knee_alignment_dev: 35.0,
        };
        let found = kinds(&detect(&metrics, Phase::Down, &profile));
        assert!(found.contains(&ErrorKind::ForwardLean));
        assert!(found.contains(&ErrorKind::KneeMisalignment));
        assert!(found.contains(&ErrorKind::InsufficientDepth));
    }

    #[test]
    fn test_plank_hip_sag_vs_pike() {
        let profile = profile("plank");
        let sag = ExerciseMetrics::Plank {
            body_line_dev: 5.0,
            hip_offset: 15.0,
            shoulder_dev: 0.0,
        };
        let pike = ExerciseMetrics::Plank {
            body_line_dev: 5.0,
            hip_offset: -15.0,
            shoulder_dev: 0.0,
        };
        assert!(kinds(&detect(&sag, Phase::Hold, &profile)).contains(&ErrorKind::HipSag));
        assert!(kinds(&detect(&pike, Phase::Hold, &profile)).contains(&ErrorKind::HipPike));
        let good = ExerciseMetrics::Plank {
            body_line_dev: 5.0,
            hip_offset: 3.0,
            shoulder_dev: 0.0,
        };
        assert!(detect(&good, Phase::Hold, &profile).is_empty());
    }

    #[test]
    fn test_jumping_jacks_incomplete_extension_only_in_up() {
        let profile = profile("jumping_jacks");
        let metrics = ExerciseMetrics::JumpingJacks {
            left_arm_elevation: 130.0,
            right_arm_elevation: 130.0,
            avg_arm_elevation: 130.0,
            leg_spread_dev: 0.0,
        };
        // up 中に 150 未満は伸展不足
        assert!(kinds(&detect(&metrics, Phase::Up, &profile))
            .contains(&ErrorKind::IncompleteExtension));
        assert!(detect(&metrics, Phase::Transition, &profile).is_empty());
    }

    #[test]
    fn test_pull_ups_partial_range_and_swing() {
        let profile = profile("pull_ups");
        let metrics = ExerciseMetrics::PullUps {
            left_arm_angle: 96.0,
            right_arm_angle: 96.0,
            avg_arm_angle: 96.0,
            body_line_dev: 30.0,
        };
        let found = kinds(&detect(&metrics, Phase::Down, &profile));
        assert!(found.contains(&ErrorKind::PartialRange));
        assert!(found.contains(&ErrorKind::BodySwing));
    }

    #[test]
    fn test_generic_metrics_have_no_rules() {
        let profile = ExerciseProfile::default();
        let metrics = ExerciseMetrics::Generic {
            dominant_angle: 45.0,
        };
        assert!(detect(&metrics, Phase::Down, &profile).is_empty());
    }

    #[test]
    fn test_errors_compare_by_value() {
        let profile = profile("pushup");
        let a = detect(&pushup_metrics(120.0, 120.0, 0.0), Phase::Down, &profile);
        let b = detect(&pushup_metrics(119.0, 121.0, 0.0), Phase::Down, &profile);
        assert_eq!(a, b);
    }
}
