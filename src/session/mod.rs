use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::analysis::{
    AnalysisResult, ExerciseAnalyzer, FormError, FrameOutcome, RepCounter, RepEvent, RepState,
    Severity,
};
use crate::config::{AnalysisConfig, Config, Metering, ProfileRegistry};
use crate::pose::LandmarkFrame;

/// レップ履歴・エラー履歴の保持上限。超過分は古い順に破棄するが、
/// 平均・合計は別持ちの累計で正確なまま維持される。
const HISTORY_CAP: usize = 4096;

/// セッションを生成するエントリポイント。
/// レジストリは読み取り専用で、複数セッション間で安全に共有できる。
#[derive(Debug, Clone)]
pub struct Coach {
    registry: ProfileRegistry,
    analysis: AnalysisConfig,
}

impl Coach {
    pub fn new(registry: ProfileRegistry, analysis: AnalysisConfig) -> Self {
        Self { registry, analysis }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ProfileRegistry::from_config(config), config.analysis.clone())
    }

    /// 種目キーからセッションを開始する。未知キーは汎用フォールバック。
    pub fn start_session(&self, exercise: &str) -> ExerciseSession {
        ExerciseSession::start(exercise, &self.registry, &self.analysis)
    }
}

/// レップ番号付きのエラー記録
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedError {
    /// 記録時点の完了レップ番号
    pub rep: u32,
    /// セッション開始からの経過秒
    pub at_secs: f32,
    pub error: FormError,
}

/// 1ワークアウト分の可変セッション。開始した呼び出しコンテキストが
/// 専有し、`end` の move で不変サマリへ確定する。
#[derive(Debug)]
pub struct ExerciseSession {
    exercise: String,
    analyzer: ExerciseAnalyzer,
    counter: RepCounter,
    started: Instant,
    score_sum: f64,
    score_count: u64,
    recent_scores: VecDeque<f32>,
    recent_errors: VecDeque<RecordedError>,
    total_errors: u64,
    error_kinds: BTreeMap<String, u64>,
    severity_counts: BTreeMap<Severity, u64>,
    calories: f32,
    last_result: Option<AnalysisResult>,
}

impl ExerciseSession {
    fn start(exercise: &str, registry: &ProfileRegistry, analysis: &AnalysisConfig) -> Self {
        let analyzer = ExerciseAnalyzer::resolve(exercise, registry, analysis);
        let debounce =
            analysis.debounce_frames + analyzer.profile().sensitivity.debounce_padding();
        log::info!("session start: exercise={} debounce={}", exercise, debounce);
        Self {
            exercise: exercise.to_string(),
            counter: RepCounter::new(debounce),
            analyzer,
            started: Instant::now(),
            score_sum: 0.0,
            score_count: 0,
            recent_scores: VecDeque::new(),
            recent_errors: VecDeque::new(),
            total_errors: 0,
            error_kinds: BTreeMap::new(),
            severity_counts: BTreeMap::new(),
            calories: 0.0,
            last_result: None,
        }
    }

    pub fn exercise(&self) -> &str {
        &self.exercise
    }

    pub fn reps(&self) -> u32 {
        self.counter.count()
    }

    pub fn counter_state(&self) -> RepState {
        self.counter.state()
    }

    pub fn calories(&self) -> f32 {
        self.calories
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    /// 直近フレームの解析結果
    pub fn last_result(&self) -> Option<&AnalysisResult> {
        self.last_result.as_ref()
    }

    /// 直近のエラー記録（古い順）
    pub fn recent_errors(&self) -> impl Iterator<Item = &RecordedError> {
        self.recent_errors.iter()
    }

    /// 1フレームを処理する。ポーズ未検出はカウンタにも集計にも影響しない。
    pub fn process_frame(&mut self, frame: &LandmarkFrame) -> FrameOutcome {
        let outcome = self.analyzer.analyze(frame);
        if let FrameOutcome::Analyzed(result) = &outcome {
            if self.counter.observe(result.phase) == RepEvent::RepCompleted {
                self.record_rep(result);
            }
            self.refresh_calories();
            self.last_result = Some(result.clone());
        }
        outcome
    }

    /// レップ完了時の記録。スコアを履歴に積み、フレームのエラーを
    /// 現在のレップ番号付きで集計する。
    pub fn record_rep(&mut self, result: &AnalysisResult) {
        self.score_sum += f64::from(result.score.value);
        self.score_count += 1;
        if self.recent_scores.len() == HISTORY_CAP {
            self.recent_scores.pop_front();
        }
        self.recent_scores.push_back(result.score.value);
        for error in &result.errors {
            self.push_error(error.clone());
        }
        self.refresh_calories();
    }

    /// レップ経路の外で検出されたエラーを記録する
    pub fn record_error(&mut self, error: FormError) {
        self.push_error(error);
    }

    fn push_error(&mut self, error: FormError) {
        *self
            .error_kinds
            .entry(error.kind.key().to_string())
            .or_insert(0) += 1;
        *self.severity_counts.entry(error.severity).or_insert(0) += 1;
        self.total_errors += 1;
        if self.recent_errors.len() == HISTORY_CAP {
            self.recent_errors.pop_front();
        }
        self.recent_errors.push_back(RecordedError {
            rep: self.counter.count(),
            at_secs: self.elapsed_secs(),
            error,
        });
    }

    fn refresh_calories(&mut self) {
        let profile = self.analyzer.profile();
        self.calories = calories_burned(
            profile.metering,
            profile.calorie_rate,
            self.counter.count(),
            self.elapsed_secs(),
        );
    }

    /// セッションを終了し、不変のサマリを返す。
    /// self を move で消費するため、以後の記録はできない。
    pub fn end(mut self) -> SessionSummary {
        self.refresh_calories();
        let reps = self.counter.count();
        let avg_form_score = if self.score_count > 0 {
            (self.score_sum / self.score_count as f64) as f32
        } else {
            0.0
        };
        let error_rate = self.total_errors as f32 / reps.max(1) as f32;
        let grade = Grade::evaluate(avg_form_score, error_rate);
        log::info!(
            "session end: exercise={} reps={} avg={:.1} errors={} grade={}",
            self.exercise,
            reps,
            avg_form_score,
            self.total_errors,
            grade
        );
        SessionSummary {
            exercise: self.exercise,
            duration_secs: self.started.elapsed().as_secs_f32(),
            reps,
            avg_form_score,
            total_errors: self.total_errors,
            error_rate,
            error_kinds: self.error_kinds,
            severity_counts: self.severity_counts,
            calories_burned: self.calories,
            grade,
            profile_fallback: self.analyzer.is_fallback(),
        }
    }
}

/// 消費カロリー。レップ課金は reps × rate、時間課金は経過秒 × rate。
pub fn calories_burned(metering: Metering, rate: f32, reps: u32, elapsed_secs: f32) -> f32 {
    match metering {
        Metering::PerRep => reps as f32 * rate,
        Metering::PerSecond => elapsed_secs * rate,
    }
}

/// 評価グレード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "D")]
    D,
}

impl Grade {
    /// 平均スコア帯 × エラー率帯の固定テーブル
    pub fn evaluate(avg_score: f32, error_rate: f32) -> Self {
        if avg_score >= 90.0 && error_rate < 0.1 {
            Self::APlus
        } else if avg_score >= 85.0 && error_rate < 0.2 {
            Self::A
        } else if avg_score >= 80.0 && error_rate < 0.3 {
            Self::BPlus
        } else if avg_score >= 75.0 && error_rate < 0.4 {
            Self::B
        } else if avg_score >= 70.0 && error_rate < 0.5 {
            Self::CPlus
        } else if avg_score >= 65.0 {
            Self::C
        } else {
            Self::D
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 終了済みセッションの不変サマリ。ストレージコラボレータへ渡す。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub exercise: String,
    pub duration_secs: f32,
    pub reps: u32,
    pub avg_form_score: f32,
    pub total_errors: u64,
    /// total_errors / max(1, reps)
    pub error_rate: f32,
    /// エラー種別ごとの件数
    pub error_kinds: BTreeMap<String, u64>,
    /// 深刻度ごとの件数
    pub severity_counts: BTreeMap<Severity, u64>,
    pub calories_burned: f32,
    pub grade: Grade,
    /// 汎用プロファイルで解析された（厳密な検証が必要な呼び出し側向け）
    pub profile_fallback: bool,
}
