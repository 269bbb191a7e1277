use crate::config::{ExerciseKind, ExerciseProfile};

use super::metrics::ExerciseMetrics;

/// 運動フェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// 運動姿勢に入っていない（支配角が妥当帯域の外）
    Ready,
    Down,
    Up,
    /// down/up 帯域の間の中間姿勢
    Transition,
    /// 保持系種目（プランク）
    Hold,
}

/// 支配角とプロファイル閾値からフェーズを判定する。状態を持たない。
///
/// down/up の帯域は共有境界を持たないよう設定される前提で、
/// 帯域間の曖昧な姿勢は transition に吸収される。
pub fn classify(
    kind: Option<ExerciseKind>,
    metrics: &ExerciseMetrics,
    profile: &ExerciseProfile,
) -> Phase {
    if kind.map_or(false, |k| k.is_hold()) {
        return Phase::Hold;
    }
    let dominant = metrics.dominant_angle();
    if dominant < profile.min_angle || dominant > profile.max_angle {
        return Phase::Ready;
    }
    if dominant <= profile.down_angle {
        Phase::Down
    } else if dominant >= profile.up_angle {
        Phase::Up
    } else {
        Phase::Transition
    }
}
