use crate::config::{AnalysisConfig, ExerciseKind, ExerciseProfile, ProfileRegistry};
use crate::pose::LandmarkFrame;

use super::error::{self, FormError};
use super::metrics::{self, ExerciseMetrics};
use super::phase::{self, Phase};
use super::score::{self, FormScore};

/// 1フレーム分の解析結果
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub metrics: ExerciseMetrics,
    pub phase: Phase,
    pub score: FormScore,
    pub errors: Vec<FormError>,
    /// 汎用プロファイルへのフォールバックで解析された
    pub profile_fallback: bool,
}

/// フレーム処理の出力
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// 有効なポーズが検出できなかった。カウンタは進めない。
    NoPose,
    Analyzed(AnalysisResult),
}

impl FrameOutcome {
    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Self::Analyzed(result) => Some(result),
            Self::NoPose => None,
        }
    }
}

/// セッション開始時に一度だけ解決される種目別アナライザ。
/// 以後のフレーム解析は純粋で、状態を持たない。
#[derive(Debug, Clone)]
pub struct ExerciseAnalyzer {
    kind: Option<ExerciseKind>,
    profile: ExerciseProfile,
    profile_fallback: bool,
    min_visibility: f32,
    min_visible_landmarks: usize,
}

impl ExerciseAnalyzer {
    /// 種目キーからアナライザを解決する。未知キーは汎用フォールバック。
    pub fn resolve(key: &str, registry: &ProfileRegistry, analysis: &AnalysisConfig) -> Self {
        let kind = ExerciseKind::from_key(key);
        let resolved = registry.lookup(key);
        Self {
            kind,
            profile_fallback: resolved.fallback || kind.is_none(),
            profile: resolved.profile,
            min_visibility: analysis.min_visibility,
            min_visible_landmarks: analysis.min_visible_landmarks,
        }
    }

    pub fn kind(&self) -> Option<ExerciseKind> {
        self.kind
    }

    pub fn profile(&self) -> &ExerciseProfile {
        &self.profile
    }

    pub fn is_fallback(&self) -> bool {
        self.profile_fallback
    }

    /// 1フレームを解析する
    pub fn analyze(&self, frame: &LandmarkFrame) -> FrameOutcome {
        if frame.visible_count(self.min_visibility) < self.min_visible_landmarks {
            return FrameOutcome::NoPose;
        }
        let extracted = metrics::extract(self.kind, frame, self.min_visibility);
        let phase = phase::classify(self.kind, &extracted.metrics, &self.profile);
        let score = score::score(&extracted.metrics, extracted.degraded, self.profile_fallback);
        let errors = error::detect(&extracted.metrics, phase, &self.profile);
        FrameOutcome::Analyzed(AnalysisResult {
            metrics: extracted.metrics,
            phase,
            score,
            errors,
            profile_fallback: self.profile_fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::score::ScoreSource;
    use crate::pose::{Landmark, LandmarkId};

    fn analyzer(key: &str) -> ExerciseAnalyzer {
        ExerciseAnalyzer::resolve(key, &ProfileRegistry::builtin(), &AnalysisConfig::default())
    }

    fn standing_frame() -> LandmarkFrame {
        let lm = |x, y| Landmark::new(x, y, 0.0, 1.0);
        LandmarkFrame::empty()
            .with(LandmarkId::Nose, lm(0.50, 0.10))
            .with(LandmarkId::LeftShoulder, lm(0.45, 0.25))
            .with(LandmarkId::RightShoulder, lm(0.55, 0.25))
            .with(LandmarkId::LeftElbow, lm(0.43, 0.38))
            .with(LandmarkId::RightElbow, lm(0.57, 0.38))
            .with(LandmarkId::LeftWrist, lm(0.42, 0.50))
            .with(LandmarkId::RightWrist, lm(0.58, 0.50))
            .with(LandmarkId::LeftHip, lm(0.46, 0.52))
            .with(LandmarkId::RightHip, lm(0.54, 0.52))
            .with(LandmarkId::LeftKnee, lm(0.46, 0.72))
            .with(LandmarkId::RightKnee, lm(0.54, 0.72))
            .with(LandmarkId::LeftAnkle, lm(0.46, 0.92))
            .with(LandmarkId::RightAnkle, lm(0.54, 0.92))
    }

    #[test]
    fn test_empty_frame_is_no_pose() {
        let analyzer = analyzer("squat");
        assert_eq!(analyzer.analyze(&LandmarkFrame::empty()), FrameOutcome::NoPose);
    }

    #[test]
    fn test_standing_squat_frame_analyzed() {
        let analyzer = analyzer("squat");
        let outcome = analyzer.analyze(&standing_frame());
        let result = outcome.result().expect("pose should be analyzable");
        assert_eq!(result.phase, Phase::Ready);
        assert!(result.score.value >= 0.0 && result.score.value <= 100.0);
        assert!(!result.profile_fallback);
    }

    #[test]
    fn test_unknown_exercise_still_yields_result() {
        let analyzer = analyzer("handstand");
        assert!(analyzer.is_fallback());
        let outcome = analyzer.analyze(&standing_frame());
        let result = outcome.result().expect("fallback must still analyze");
        assert!(result.profile_fallback);
        assert_eq!(result.score.source, ScoreSource::Fallback);
        assert_eq!(result.score.value, 75.0);
    }

    #[test]
    fn test_resolve_captures_profile_once() {
        let analyzer = analyzer("plank");
        assert_eq!(analyzer.kind(), Some(ExerciseKind::Plank));
        assert_eq!(analyzer.profile().calorie_rate, 0.1);
    }
}
