use crate::config::ExerciseKind;
use crate::geometry;
use crate::pose::{LandmarkFrame, LandmarkId};

/// 種目別のフレーム計測値。フィールドはすべて度または
/// スケール済み偏差（正規化座標 × 100）。
#[derive(Debug, Clone, PartialEq)]
pub enum ExerciseMetrics {
    Pushup {
        left_arm_angle: f32,
        right_arm_angle: f32,
        avg_arm_angle: f32,
        body_alignment_dev: f32,
    },
    Squat {
        left_knee_angle: f32,
        right_knee_angle: f32,
        avg_knee_angle: f32,
        back_angle: f32,
        knee_alignment_dev: f32,
    },
    Situp {
        torso_incline: f32,
        leg_stability_dev: f32,
        neck_dev: f32,
    },
    Plank {
        body_line_dev: f32,
        /// 肩-踵ラインからの腰の符号付きオフセット（正 = 腰が落ちている）
        hip_offset: f32,
        shoulder_dev: f32,
    },
    JumpingJacks {
        left_arm_elevation: f32,
        right_arm_elevation: f32,
        avg_arm_elevation: f32,
        leg_spread_dev: f32,
    },
    Lunges {
        front_knee_angle: f32,
        rear_knee_angle: f32,
        torso_lean_dev: f32,
    },
    Burpees {
        torso_incline: f32,
        body_line_dev: f32,
        left_arm_angle: f32,
        right_arm_angle: f32,
    },
    PullUps {
        left_arm_angle: f32,
        right_arm_angle: f32,
        avg_arm_angle: f32,
        body_line_dev: f32,
    },
    /// 未知種目のフォールバック
    Generic { dominant_angle: f32 },
}

impl ExerciseMetrics {
    /// フェーズ判定に使う支配角
    pub fn dominant_angle(&self) -> f32 {
        match self {
            Self::Pushup { avg_arm_angle, .. } => *avg_arm_angle,
            Self::Squat { avg_knee_angle, .. } => *avg_knee_angle,
            Self::Situp { torso_incline, .. } => *torso_incline,
            Self::Plank { body_line_dev, .. } => 180.0 - body_line_dev,
            Self::JumpingJacks {
                avg_arm_elevation, ..
            } => *avg_arm_elevation,
            Self::Lunges {
                front_knee_angle, ..
            } => *front_knee_angle,
            Self::Burpees { torso_incline, .. } => *torso_incline,
            Self::PullUps { avg_arm_angle, .. } => *avg_arm_angle,
            Self::Generic { dominant_angle } => *dominant_angle,
        }
    }
}

/// 計測値と、必要ランドマークの可視性不足フラグ
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMetrics {
    pub metrics: ExerciseMetrics,
    /// 必要ランドマークが欠けており一部を代替値で埋めた
    pub degraded: bool,
}

/// 指定ランドマークがすべて閾値以上の可視性を持つか
fn side_visible(frame: &LandmarkFrame, ids: &[LandmarkId], min_visibility: f32) -> bool {
    ids.iter().all(|&id| frame.get(id).is_visible(min_visibility))
}

/// 左右対の関節角。片側が遮蔽されていれば見えている側で代用する。
/// 戻り値: (左, 右, 代用したか)
fn paired_angles(
    frame: &LandmarkFrame,
    left: [LandmarkId; 3],
    right: [LandmarkId; 3],
    min_visibility: f32,
) -> (f32, f32, bool) {
    let left_ok = side_visible(frame, &left, min_visibility);
    let right_ok = side_visible(frame, &right, min_visibility);
    let left_angle = geometry::angle(frame.get(left[0]), frame.get(left[1]), frame.get(left[2]));
    let right_angle =
        geometry::angle(frame.get(right[0]), frame.get(right[1]), frame.get(right[2]));
    match (left_ok, right_ok) {
        (true, true) => (left_angle, right_angle, false),
        (true, false) => (left_angle, left_angle, true),
        (false, true) => (right_angle, right_angle, true),
        // 両側とも不可視: 幾何フォールバックに任せる
        (false, false) => (left_angle, right_angle, true),
    }
}

const LEFT_ARM: [LandmarkId; 3] = [
    LandmarkId::LeftShoulder,
    LandmarkId::LeftElbow,
    LandmarkId::LeftWrist,
];
const RIGHT_ARM: [LandmarkId; 3] = [
    LandmarkId::RightShoulder,
    LandmarkId::RightElbow,
    LandmarkId::RightWrist,
];
const LEFT_LEG: [LandmarkId; 3] = [
    LandmarkId::LeftHip,
    LandmarkId::LeftKnee,
    LandmarkId::LeftAnkle,
];
const RIGHT_LEG: [LandmarkId; 3] = [
    LandmarkId::RightHip,
    LandmarkId::RightKnee,
    LandmarkId::RightAnkle,
];

/// フレームから種目別計測値を抽出する。純粋で副作用なし。
pub fn extract(
    kind: Option<ExerciseKind>,
    frame: &LandmarkFrame,
    min_visibility: f32,
) -> FrameMetrics {
    match kind {
        Some(ExerciseKind::Pushup) => pushup(frame, min_visibility),
        Some(ExerciseKind::Squat) => squat(frame, min_visibility),
        Some(ExerciseKind::Situp) => situp(frame, min_visibility),
        Some(ExerciseKind::Plank) => plank(frame, min_visibility),
        Some(ExerciseKind::JumpingJacks) => jumping_jacks(frame, min_visibility),
        Some(ExerciseKind::Lunges) => lunges(frame, min_visibility),
        Some(ExerciseKind::Burpees) => burpees(frame, min_visibility),
        Some(ExerciseKind::PullUps) => pull_ups(frame, min_visibility),
        None => generic(frame, min_visibility),
    }
}

fn pushup(frame: &LandmarkFrame, min_visibility: f32) -> FrameMetrics {
    let (left, right, substituted) = paired_angles(frame, LEFT_ARM, RIGHT_ARM, min_visibility);
    let line_ids = [
        LandmarkId::LeftShoulder,
        LandmarkId::LeftHip,
        LandmarkId::LeftAnkle,
    ];
    let body_alignment_dev = geometry::straightness_deviation(
        frame.get(LandmarkId::LeftShoulder),
        frame.get(LandmarkId::LeftHip),
        frame.get(LandmarkId::LeftAnkle),
    );
    FrameMetrics {
        metrics: ExerciseMetrics::Pushup {
            left_arm_angle: left,
            right_arm_angle: right,
            avg_arm_angle: (left + right) / 2.0,
            body_alignment_dev,
        },
        degraded: substituted || !side_visible(frame, &line_ids, min_visibility),
    }
}

fn squat(frame: &LandmarkFrame, min_visibility: f32) -> FrameMetrics {
    let (left, right, substituted) = paired_angles(frame, LEFT_LEG, RIGHT_LEG, min_visibility);
    let back_ids = [
        LandmarkId::LeftShoulder,
        LandmarkId::LeftHip,
        LandmarkId::LeftKnee,
    ];
    let back_angle = if side_visible(frame, &back_ids, min_visibility) {
        geometry::angle(
            frame.get(LandmarkId::LeftShoulder),
            frame.get(LandmarkId::LeftHip),
            frame.get(LandmarkId::LeftKnee),
        )
    } else {
        geometry::angle(
            frame.get(LandmarkId::RightShoulder),
            frame.get(LandmarkId::RightHip),
            frame.get(LandmarkId::RightKnee),
        )
    };
    // 膝→足首セグメントの鉛直からのずれ（左右平均）
    let knee_alignment_dev = (geometry::vertical_deviation(
        frame.get(LandmarkId::LeftKnee),
        frame.get(LandmarkId::LeftAnkle),
    ) + geometry::vertical_deviation(
        frame.get(LandmarkId::RightKnee),
        frame.get(LandmarkId::RightAnkle),
    )) / 2.0;
    FrameMetrics {
        metrics: ExerciseMetrics::Squat {
            left_knee_angle: left,
            right_knee_angle: right,
            avg_knee_angle: (left + right) / 2.0,
            back_angle,
            knee_alignment_dev,
        },
        degraded: substituted || !side_visible(frame, &back_ids, min_visibility),
    }
}

fn situp(frame: &LandmarkFrame, min_visibility: f32) -> FrameMetrics {
    let hip_mid = geometry::midpoint(
        frame.get(LandmarkId::LeftHip),
        frame.get(LandmarkId::RightHip),
    );
    let shoulder_mid = geometry::midpoint(
        frame.get(LandmarkId::LeftShoulder),
        frame.get(LandmarkId::RightShoulder),
    );
    let torso_incline = geometry::torso_inclination(&hip_mid, &shoulder_mid);
    // 脚は膝約90度で固定されているのが理想
    let (left_knee, right_knee, substituted) =
        paired_angles(frame, LEFT_LEG, RIGHT_LEG, min_visibility);
    let leg_stability_dev = ((left_knee + right_knee) / 2.0 - 90.0).abs();
    let neck_dev = geometry::straightness_deviation(
        frame.get(LandmarkId::Nose),
        &shoulder_mid,
        &hip_mid,
    );
    let torso_ids = [
        LandmarkId::LeftShoulder,
        LandmarkId::RightShoulder,
        LandmarkId::LeftHip,
        LandmarkId::RightHip,
        LandmarkId::Nose,
    ];
    FrameMetrics {
        metrics: ExerciseMetrics::Situp {
            torso_incline,
            leg_stability_dev,
            neck_dev,
        },
        degraded: substituted || !side_visible(frame, &torso_ids, min_visibility),
    }
}

fn plank(frame: &LandmarkFrame, min_visibility: f32) -> FrameMetrics {
    let shoulder_mid = geometry::midpoint(
        frame.get(LandmarkId::LeftShoulder),
        frame.get(LandmarkId::RightShoulder),
    );
    let hip_mid = geometry::midpoint(
        frame.get(LandmarkId::LeftHip),
        frame.get(LandmarkId::RightHip),
    );
    let ankle_mid = geometry::midpoint(
        frame.get(LandmarkId::LeftAnkle),
        frame.get(LandmarkId::RightAnkle),
    );
    let elbow_mid = geometry::midpoint(
        frame.get(LandmarkId::LeftElbow),
        frame.get(LandmarkId::RightElbow),
    );
    let body_line_dev = geometry::straightness_deviation(&shoulder_mid, &hip_mid, &ankle_mid);
    // 肩→踵の直線に対する腰のオフセット。直線より下側が正 = 腰落ち。
    let hip_offset = geometry::line_offset(&hip_mid, &shoulder_mid, &ankle_mid) * 100.0;
    // 肩は肘の真上にあるのが理想
    let shoulder_dev = geometry::vertical_deviation(&shoulder_mid, &elbow_mid);
    let required = [
        LandmarkId::LeftShoulder,
        LandmarkId::RightShoulder,
        LandmarkId::LeftHip,
        LandmarkId::RightHip,
        LandmarkId::LeftAnkle,
        LandmarkId::RightAnkle,
    ];
    FrameMetrics {
        metrics: ExerciseMetrics::Plank {
            body_line_dev,
            hip_offset,
            shoulder_dev,
        },
        degraded: !side_visible(frame, &required, min_visibility),
    }
}

fn jumping_jacks(frame: &LandmarkFrame, min_visibility: f32) -> FrameMetrics {
    // 腕の挙上角: 股関節→肩→手首。腕を下ろすと小さく、頭上で大きい。
    let (left, right, substituted) = paired_angles(
        frame,
        [
            LandmarkId::LeftHip,
            LandmarkId::LeftShoulder,
            LandmarkId::LeftWrist,
        ],
        [
            LandmarkId::RightHip,
            LandmarkId::RightShoulder,
            LandmarkId::RightWrist,
        ],
        min_visibility,
    );
    let hip_mid = geometry::midpoint(
        frame.get(LandmarkId::LeftHip),
        frame.get(LandmarkId::RightHip),
    );
    // 両足首が腰の中心に対して対称に開いているか
    let left_spread = frame.get(LandmarkId::LeftAnkle).x - hip_mid.x;
    let right_spread = frame.get(LandmarkId::RightAnkle).x - hip_mid.x;
    let leg_spread_dev = (left_spread + right_spread).abs() * 100.0;
    FrameMetrics {
        metrics: ExerciseMetrics::JumpingJacks {
            left_arm_elevation: left,
            right_arm_elevation: right,
            avg_arm_elevation: (left + right) / 2.0,
            leg_spread_dev,
        },
        degraded: substituted,
    }
}

fn lunges(frame: &LandmarkFrame, min_visibility: f32) -> FrameMetrics {
    let (left, right, substituted) = paired_angles(frame, LEFT_LEG, RIGHT_LEG, min_visibility);
    // より曲がっている脚を前脚とみなす
    let front_knee_angle = left.min(right);
    let rear_knee_angle = left.max(right);
    let hip_mid = geometry::midpoint(
        frame.get(LandmarkId::LeftHip),
        frame.get(LandmarkId::RightHip),
    );
    let shoulder_mid = geometry::midpoint(
        frame.get(LandmarkId::LeftShoulder),
        frame.get(LandmarkId::RightShoulder),
    );
    let torso_lean_dev = geometry::vertical_deviation(&hip_mid, &shoulder_mid);
    FrameMetrics {
        metrics: ExerciseMetrics::Lunges {
            front_knee_angle,
            rear_knee_angle,
            torso_lean_dev,
        },
        degraded: substituted,
    }
}

fn burpees(frame: &LandmarkFrame, min_visibility: f32) -> FrameMetrics {
    let hip_mid = geometry::midpoint(
        frame.get(LandmarkId::LeftHip),
        frame.get(LandmarkId::RightHip),
    );
    let shoulder_mid = geometry::midpoint(
        frame.get(LandmarkId::LeftShoulder),
        frame.get(LandmarkId::RightShoulder),
    );
    let ankle_mid = geometry::midpoint(
        frame.get(LandmarkId::LeftAnkle),
        frame.get(LandmarkId::RightAnkle),
    );
    let torso_incline = geometry::torso_inclination(&hip_mid, &shoulder_mid);
    let body_line_dev = geometry::straightness_deviation(&shoulder_mid, &hip_mid, &ankle_mid);
    let (left_arm, right_arm, substituted) =
        paired_angles(frame, LEFT_ARM, RIGHT_ARM, min_visibility);
    FrameMetrics {
        metrics: ExerciseMetrics::Burpees {
            torso_incline,
            body_line_dev,
            left_arm_angle: left_arm,
            right_arm_angle: right_arm,
        },
        degraded: substituted,
    }
}

fn pull_ups(frame: &LandmarkFrame, min_visibility: f32) -> FrameMetrics {
    let (left, right, substituted) = paired_angles(frame, LEFT_ARM, RIGHT_ARM, min_visibility);
    let shoulder_mid = geometry::midpoint(
        frame.get(LandmarkId::LeftShoulder),
        frame.get(LandmarkId::RightShoulder),
    );
    let hip_mid = geometry::midpoint(
        frame.get(LandmarkId::LeftHip),
        frame.get(LandmarkId::RightHip),
    );
    let ankle_mid = geometry::midpoint(
        frame.get(LandmarkId::LeftAnkle),
        frame.get(LandmarkId::RightAnkle),
    );
    let body_line_dev = geometry::straightness_deviation(&shoulder_mid, &hip_mid, &ankle_mid);
    FrameMetrics {
        metrics: ExerciseMetrics::PullUps {
            left_arm_angle: left,
            right_arm_angle: right,
            avg_arm_angle: (left + right) / 2.0,
            body_line_dev,
        },
        degraded: substituted,
    }
}

fn generic(frame: &LandmarkFrame, min_visibility: f32) -> FrameMetrics {
    let (left, right, substituted) = paired_angles(frame, LEFT_ARM, RIGHT_ARM, min_visibility);
    FrameMetrics {
        metrics: ExerciseMetrics::Generic {
            dominant_angle: (left + right) / 2.0,
        },
        degraded: substituted,
    }
}
