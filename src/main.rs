use anyhow::{Context, Result};
use std::env;
use std::f32::consts::PI;

use kata_coach::analysis::FrameOutcome;
use kata_coach::config::Config;
use kata_coach::pose::{Landmark, LandmarkFrame, LandmarkId};
use kata_coach::session::Coach;
use kata_coach::storage::{JsonSummaryStore, SummaryStore};

const CONFIG_PATH: &str = "config.toml";
const SUMMARY_DIR: &str = "sessions";

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let exercise = args.get(1).map(String::as_str).unwrap_or("pushup");
    let frames_path = args.get(2);

    let config = Config::load_or_default(CONFIG_PATH)?;
    let coach = Coach::from_config(&config);

    println!("=== Kata Coach ===");
    println!("種目: {}", exercise);
    println!("デバウンス: {}フレーム", config.analysis.debounce_frames);
    match frames_path {
        Some(path) => println!("入力: {}", path),
        None => println!("入力: 合成フレーム（腕立てサイクル × 3）"),
    }
    println!();

    let frames = match frames_path {
        Some(path) => load_frames(path)?,
        None => synthetic_pushup_frames(3),
    };

    let mut session = coach.start_session(exercise);

    for (i, frame) in frames.iter().enumerate() {
        match session.process_frame(frame) {
            FrameOutcome::NoPose => println!("[{:4}] ポーズ未検出", i),
            FrameOutcome::Analyzed(result) => {
                println!(
                    "[{:4}] phase={:?} score={:.1} reps={}",
                    i,
                    result.phase,
                    result.score.value,
                    session.reps()
                );
                for error in &result.errors {
                    println!("       ⚠ {}", error.message);
                }
            }
        }
    }

    let summary = session.end();
    println!();
    println!("=== サマリ ===");
    println!("回数: {}", summary.reps);
    println!("平均スコア: {:.1}", summary.avg_form_score);
    println!(
        "エラー: {}件 (rate {:.2})",
        summary.total_errors, summary.error_rate
    );
    println!("消費カロリー: {:.1} kcal", summary.calories_burned);
    println!("グレード: {}", summary.grade);

    let store = JsonSummaryStore::new(SUMMARY_DIR);
    let path = store.persist(&summary)?;
    println!("保存しました: {}", path.display());

    Ok(())
}

/// JSONL ファイル（1行 = 1フレームのランドマークマップ）を読む
fn load_frames(path: &str) -> Result<Vec<LandmarkFrame>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read frames {}", path))?;
    let mut frames = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let frame = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse frame at line {}", line_no + 1))?;
        frames.push(frame);
    }
    Ok(frames)
}

/// 肘角度を 170° → 85° → 170° で往復させた合成腕立てフレーム列
fn synthetic_pushup_frames(cycles: usize) -> Vec<LandmarkFrame> {
    let sweep = [
        170.0, 170.0, 170.0, 140.0, 140.0, 110.0, 110.0, 85.0, 85.0, 85.0, 110.0, 110.0, 140.0,
        140.0, 170.0, 170.0, 170.0,
    ];
    (0..cycles)
        .flat_map(|_| sweep.iter().map(|&bend| pushup_frame(bend)))
        .collect()
}

/// 肘角度 `bend_deg` の腕立て姿勢を合成する
fn pushup_frame(bend_deg: f32) -> LandmarkFrame {
    let lm = |x, y| Landmark::new(x, y, 0.0, 1.0);
    let bend = bend_deg.to_radians();
    let reach = 0.12;
    let mut frame = LandmarkFrame::empty()
        .with(LandmarkId::Nose, lm(0.25, 0.38))
        .with(LandmarkId::LeftHip, lm(0.62, 0.43))
        .with(LandmarkId::RightHip, lm(0.62, 0.45))
        .with(LandmarkId::LeftKnee, lm(0.77, 0.455))
        .with(LandmarkId::RightKnee, lm(0.77, 0.475))
        .with(LandmarkId::LeftAnkle, lm(0.91, 0.48))
        .with(LandmarkId::RightAnkle, lm(0.91, 0.50));
    for &(shoulder, elbow, wrist, y) in &[
        (
            LandmarkId::LeftShoulder,
            LandmarkId::LeftElbow,
            LandmarkId::LeftWrist,
            0.40,
        ),
        (
            LandmarkId::RightShoulder,
            LandmarkId::RightElbow,
            LandmarkId::RightWrist,
            0.42,
        ),
    ] {
        let elbow_pos = lm(0.45, y + 0.1);
        let shoulder_pos = lm(elbow_pos.x - reach, y);
        let base = (elbow_pos.y - shoulder_pos.y).atan2(elbow_pos.x - shoulder_pos.x);
        let wrist_pos = lm(
            elbow_pos.x + reach * (base + PI - bend).cos(),
            elbow_pos.y + reach * (base + PI - bend).sin(),
        );
        frame = frame
            .with(shoulder, shoulder_pos)
            .with(elbow, elbow_pos)
            .with(wrist, wrist_pos);
    }
    frame
}
