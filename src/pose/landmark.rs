use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 姿勢推定コラボレータが供給する 13 ランドマークのインデックス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum LandmarkId {
    Nose = 0,
    LeftShoulder = 1,
    RightShoulder = 2,
    LeftElbow = 3,
    RightElbow = 4,
    LeftWrist = 5,
    RightWrist = 6,
    LeftHip = 7,
    RightHip = 8,
    LeftKnee = 9,
    RightKnee = 10,
    LeftAnkle = 11,
    RightAnkle = 12,
}

impl LandmarkId {
    pub const COUNT: usize = 13;

    pub const ALL: [LandmarkId; Self::COUNT] = [
        Self::Nose,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// 単一ランドマーク
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f32,
    /// 正規化されたY座標 (0.0〜1.0)
    pub y: f32,
    /// 奥行き（カメラからの相対値）
    #[serde(default)]
    pub z: f32,
    /// 可視性スコア (0.0〜1.0)
    #[serde(default)]
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// 可視性が閾値以上か
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility >= threshold
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
        }
    }
}

/// 1フレーム分の全ランドマーク。構築後は不変として扱う。
///
/// ワイヤ表現はランドマーク名をキーにしたマップ
/// （姿勢推定側の出力そのまま）。欠けている点は可視性 0 で埋める。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<LandmarkId, Landmark>",
    into = "BTreeMap<LandmarkId, Landmark>"
)]
pub struct LandmarkFrame {
    landmarks: [Landmark; LandmarkId::COUNT],
}

impl LandmarkFrame {
    pub fn new(landmarks: [Landmark; LandmarkId::COUNT]) -> Self {
        Self { landmarks }
    }

    /// 全点が可視性 0 の空フレーム
    pub fn empty() -> Self {
        Self {
            landmarks: [Landmark::default(); LandmarkId::COUNT],
        }
    }

    pub fn get(&self, id: LandmarkId) -> &Landmark {
        &self.landmarks[id as usize]
    }

    pub fn with(mut self, id: LandmarkId, landmark: Landmark) -> Self {
        self.landmarks[id as usize] = landmark;
        self
    }

    /// 全点の平均可視性
    pub fn average_visibility(&self) -> f32 {
        let sum: f32 = self.landmarks.iter().map(|l| l.visibility).sum();
        sum / LandmarkId::COUNT as f32
    }

    /// 閾値以上の可視性を持つ点の数
    pub fn visible_count(&self, threshold: f32) -> usize {
        self.landmarks
            .iter()
            .filter(|l| l.is_visible(threshold))
            .count()
    }
}

impl From<BTreeMap<LandmarkId, Landmark>> for LandmarkFrame {
    fn from(map: BTreeMap<LandmarkId, Landmark>) -> Self {
        let mut frame = Self::empty();
        for (id, landmark) in map {
            frame.landmarks[id as usize] = landmark;
        }
        frame
    }
}

impl From<LandmarkFrame> for BTreeMap<LandmarkId, Landmark> {
    fn from(frame: LandmarkFrame) -> Self {
        LandmarkId::ALL
            .iter()
            .map(|&id| (id, frame.landmarks[id as usize]))
            .collect()
    }
}
