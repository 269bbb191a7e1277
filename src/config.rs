use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// 対応する運動種目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    Pushup,
    Squat,
    Situp,
    Plank,
    JumpingJacks,
    Lunges,
    Burpees,
    PullUps,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 8] = [
        Self::Pushup,
        Self::Squat,
        Self::Situp,
        Self::Plank,
        Self::JumpingJacks,
        Self::Lunges,
        Self::Burpees,
        Self::PullUps,
    ];

    /// 設定テーブルと外部インターフェースで使う種目キー
    pub fn key(&self) -> &'static str {
        match self {
            Self::Pushup => "pushup",
            Self::Squat => "squat",
            Self::Situp => "situp",
            Self::Plank => "plank",
            Self::JumpingJacks => "jumping_jacks",
            Self::Lunges => "lunges",
            Self::Burpees => "burpees",
            Self::PullUps => "pull_ups",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.key() == key)
    }

    /// 保持系種目（up/down サイクルを持たない）
    pub fn is_hold(&self) -> bool {
        matches!(self, Self::Plank)
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// 検出感度。フェーズ確定に要するフレーム数を広げる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    Medium,
    High,
}

impl Sensitivity {
    /// デバウンスフレーム数への加算分
    pub fn debounce_padding(&self) -> usize {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

/// カロリー計上方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metering {
    /// レップ数 × レート
    PerRep,
    /// 経過秒 × レート（プランク等の保持系）
    PerSecond,
}

/// 種目ごとの定数プロファイル。起動時に一度読み込み、以後は読み取り専用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExerciseProfile {
    /// フェーズ判定: 支配角がこの値以下なら down
    pub down_angle: f32,
    /// フェーズ判定: 支配角がこの値以上なら up。down_angle との間は transition。
    pub up_angle: f32,
    /// 最小可動域の目標角。下降系は down 中にこの角度以下まで曲げる。
    /// 伸展系（開合跳・バーピー）は up 中にこの角度以上まで伸ばす。
    pub rom_angle: f32,
    /// 妥当姿勢とみなす支配角の下限。帯域外は ready 扱い。
    pub min_angle: f32,
    /// 妥当姿勢とみなす支配角の上限
    pub max_angle: f32,
    /// 体のライン・対軸偏差の許容（度）
    pub alignment_limit: f32,
    /// 左右差の許容（度）
    pub asymmetry_limit: f32,
    /// 背部角の下限（度）。下回ると前傾エラー。
    pub lean_limit: f32,
    /// 安定性偏差の許容
    pub stability_limit: f32,
    pub sensitivity: Sensitivity,
    pub metering: Metering,
    /// カロリーレート（per_rep: kcal/回、per_second: kcal/秒）
    pub calorie_rate: f32,
}

/// 汎用フォールバックプロファイル。広い閾値で、未知の種目でも
/// フレームループが常に値を返せるようにする。
impl Default for ExerciseProfile {
    fn default() -> Self {
        Self {
            down_angle: 70.0,
            up_angle: 150.0,
            rom_angle: 90.0,
            min_angle: 0.0,
            max_angle: 180.0,
            alignment_limit: 30.0,
            asymmetry_limit: 20.0,
            lean_limit: 60.0,
            stability_limit: 20.0,
            sensitivity: Sensitivity::Medium,
            metering: Metering::PerRep,
            calorie_rate: 0.3,
        }
    }
}

/// 組み込みの 8 種目プロファイル
fn builtin_profiles() -> BTreeMap<String, ExerciseProfile> {
    let mut profiles = BTreeMap::new();
    profiles.insert(
        ExerciseKind::Pushup.key().to_string(),
        ExerciseProfile {
            down_angle: 120.0,
            up_angle: 150.0,
            rom_angle: 90.0,
            min_angle: 20.0,
            max_angle: 175.0,
            alignment_limit: 25.0,
            asymmetry_limit: 15.0,
            lean_limit: 60.0,
            stability_limit: 20.0,
            sensitivity: Sensitivity::High,
            metering: Metering::PerRep,
            calorie_rate: 0.5,
        },
    );
    profiles.insert(
        ExerciseKind::Squat.key().to_string(),
        ExerciseProfile {
            down_angle: 120.0,
            up_angle: 150.0,
            rom_angle: 90.0,
            min_angle: 20.0,
            max_angle: 175.0,
            alignment_limit: 30.0,
            asymmetry_limit: 15.0,
            lean_limit: 70.0,
            stability_limit: 20.0,
            sensitivity: Sensitivity::High,
            metering: Metering::PerRep,
            calorie_rate: 0.4,
        },
    );
    profiles.insert(
        ExerciseKind::Situp.key().to_string(),
        ExerciseProfile {
            down_angle: 40.0,
            up_angle: 60.0,
            rom_angle: 25.0,
            min_angle: 0.0,
            max_angle: 150.0,
            alignment_limit: 25.0,
            asymmetry_limit: 15.0,
            lean_limit: 60.0,
            stability_limit: 20.0,
            sensitivity: Sensitivity::High,
            metering: Metering::PerRep,
            calorie_rate: 0.3,
        },
    );
    profiles.insert(
        ExerciseKind::Plank.key().to_string(),
        ExerciseProfile {
            down_angle: 20.0,
            up_angle: 160.0,
            rom_angle: 150.0,
            min_angle: 0.0,
            max_angle: 180.0,
            alignment_limit: 20.0,
            asymmetry_limit: 15.0,
            lean_limit: 60.0,
            stability_limit: 10.0,
            sensitivity: Sensitivity::Medium,
            metering: Metering::PerSecond,
            calorie_rate: 0.1,
        },
    );
    profiles.insert(
        ExerciseKind::JumpingJacks.key().to_string(),
        ExerciseProfile {
            down_angle: 30.0,
            up_angle: 120.0,
            rom_angle: 150.0,
            min_angle: 0.0,
            max_angle: 180.0,
            alignment_limit: 20.0,
            asymmetry_limit: 15.0,
            lean_limit: 60.0,
            stability_limit: 10.0,
            sensitivity: Sensitivity::High,
            metering: Metering::PerRep,
            calorie_rate: 0.6,
        },
    );
    profiles.insert(
        ExerciseKind::Lunges.key().to_string(),
        ExerciseProfile {
            down_angle: 120.0,
            up_angle: 150.0,
            rom_angle: 90.0,
            min_angle: 20.0,
            max_angle: 160.0,
            alignment_limit: 20.0,
            asymmetry_limit: 15.0,
            lean_limit: 60.0,
            stability_limit: 20.0,
            sensitivity: Sensitivity::High,
            metering: Metering::PerRep,
            calorie_rate: 0.4,
        },
    );
    profiles.insert(
        ExerciseKind::Burpees.key().to_string(),
        ExerciseProfile {
            down_angle: 30.0,
            up_angle: 70.0,
            rom_angle: 80.0,
            min_angle: 0.0,
            max_angle: 120.0,
            alignment_limit: 20.0,
            asymmetry_limit: 15.0,
            lean_limit: 60.0,
            stability_limit: 20.0,
            sensitivity: Sensitivity::Medium,
            metering: Metering::PerRep,
            calorie_rate: 1.0,
        },
    );
    profiles.insert(
        ExerciseKind::PullUps.key().to_string(),
        ExerciseProfile {
            down_angle: 100.0,
            up_angle: 150.0,
            rom_angle: 90.0,
            min_angle: 20.0,
            max_angle: 180.0,
            alignment_limit: 20.0,
            asymmetry_limit: 15.0,
            lean_limit: 60.0,
            stability_limit: 20.0,
            sensitivity: Sensitivity::High,
            metering: Metering::PerRep,
            calorie_rate: 0.8,
        },
    );
    profiles
}

/// 解析パイプラインの共通設定
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// フェーズ確定に要する連続フレーム数
    #[serde(default = "default_debounce_frames")]
    pub debounce_frames: usize,
    /// ランドマーク可視性の下限
    #[serde(default = "default_min_visibility")]
    pub min_visibility: f32,
    /// ポーズ検出ありと判定する最小可視ランドマーク数
    #[serde(default = "default_min_visible_landmarks")]
    pub min_visible_landmarks: usize,
}

fn default_debounce_frames() -> usize {
    2
}
fn default_min_visibility() -> f32 {
    0.5
}
fn default_min_visible_landmarks() -> usize {
    8
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            debounce_frames: default_debounce_frames(),
            min_visibility: default_min_visibility(),
            min_visible_landmarks: default_min_visible_landmarks(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// 種目プロファイルの上書き。省略時は組み込みテーブルを使う。
    /// 空のテーブルは起動エラー。
    #[serde(default)]
    pub exercises: Option<BTreeMap<String, ExerciseProfile>>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config {}", path.as_ref().display()))?;
        let config: Config = toml::from_str(&content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// ファイルが無ければ既定値。壊れた設定はエラーとして伝播する。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(profiles) = &self.exercises {
            if profiles.is_empty() {
                bail!("exercise profile table is empty");
            }
        }
        Ok(())
    }
}

/// 解決済みプロファイル。`fallback` はフォールバック適用の明示フラグ。
#[derive(Debug, Clone)]
pub struct ResolvedProfile {
    pub profile: ExerciseProfile,
    pub fallback: bool,
}

/// 種目プロファイルのレジストリ。構築後は読み取り専用で、
/// 参照はセッション間で安全に共有できる。
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, ExerciseProfile>,
    fallback: ExerciseProfile,
}

impl ProfileRegistry {
    /// 組み込みテーブルに設定の上書きを重ねて構築する
    pub fn from_config(config: &Config) -> Self {
        let mut profiles = builtin_profiles();
        if let Some(overrides) = &config.exercises {
            for (key, profile) in overrides {
                profiles.insert(key.clone(), profile.clone());
            }
        }
        Self {
            profiles,
            fallback: ExerciseProfile::default(),
        }
    }

    pub fn builtin() -> Self {
        Self {
            profiles: builtin_profiles(),
            fallback: ExerciseProfile::default(),
        }
    }

    /// 未知のキーは汎用プロファイルへフォールバックし、フラグで通知する
    pub fn lookup(&self, key: &str) -> ResolvedProfile {
        match self.profiles.get(key) {
            Some(profile) => ResolvedProfile {
                profile: profile.clone(),
                fallback: false,
            },
            None => {
                log::warn!("unknown exercise '{}', using fallback profile", key);
                ResolvedProfile {
                    profile: self.fallback.clone(),
                    fallback: true,
                }
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exercise_kind_key_roundtrip() {
        for kind in ExerciseKind::ALL {
            assert_eq!(ExerciseKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(ExerciseKind::from_key("yoga"), None);
    }

    #[test]
    fn test_builtin_covers_all_kinds() {
        let registry = ProfileRegistry::builtin();
        for kind in ExerciseKind::ALL {
            let resolved = registry.lookup(kind.key());
            assert!(!resolved.fallback, "missing builtin profile: {}", kind);
            // down/up の帯域は重ならない（間が transition になる）
            assert!(
                resolved.profile.down_angle < resolved.profile.up_angle,
                "bands touch for {}",
                kind
            );
        }
    }

    #[test]
    fn test_lookup_unknown_is_flagged_fallback() {
        let registry = ProfileRegistry::builtin();
        let resolved = registry.lookup("handstand");
        assert!(resolved.fallback);
        assert_eq!(resolved.profile, ExerciseProfile::default());
    }

    #[test]
    fn test_config_override_merges_over_builtin() {
        let toml_src = r#"
            [analysis]
            debounce_frames = 3

            [exercises.pushup]
            down_angle = 110.0
            calorie_rate = 0.7
        "#;
        let config: Config = toml::from_str(toml_src).unwrap();
        config.validate().unwrap();
        assert_eq!(config.analysis.debounce_frames, 3);

        let registry = ProfileRegistry::from_config(&config);
        let pushup = registry.lookup("pushup");
        assert!(!pushup.fallback);
        assert_eq!(pushup.profile.down_angle, 110.0);
        assert_eq!(pushup.profile.calorie_rate, 0.7);
        // 上書きされていない種目は組み込みのまま
        let squat = registry.lookup("squat");
        assert_eq!(squat.profile.lean_limit, 70.0);
    }

    #[test]
    fn test_empty_profile_table_is_fatal() {
        let config: Config = toml::from_str("[exercises]\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_analysis_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.analysis.debounce_frames, 2);
        assert!((config.analysis.min_visibility - 0.5).abs() < 1e-6);
        assert_eq!(config.analysis.min_visible_landmarks, 8);
    }

    #[test]
    fn test_plank_is_duration_metered() {
        let registry = ProfileRegistry::builtin();
        let plank = registry.lookup("plank").profile;
        assert_eq!(plank.metering, Metering::PerSecond);
        assert!(ExerciseKind::Plank.is_hold());
        assert!(!ExerciseKind::Squat.is_hold());
    }
}
