use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};

use crate::session::SessionSummary;

/// セッションサマリを永続化するコラボレータ。
/// 解析パスの外（`end` が返った後）でのみ呼ばれる。
pub trait SummaryStore {
    /// サマリを保存し、保存先パスを返す
    fn persist(&self, summary: &SessionSummary) -> Result<PathBuf>;
}

/// 1 セッション = 1 JSON ファイルで保存するストア
#[derive(Debug, Clone)]
pub struct JsonSummaryStore {
    dir: PathBuf,
}

impl JsonSummaryStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    fn file_name(summary: &SessionSummary) -> String {
        let epoch_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        format!("{}_{}.json", summary.exercise, epoch_secs)
    }
}

impl SummaryStore for JsonSummaryStore {
    fn persist(&self, summary: &SessionSummary) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create summary dir {}", self.dir.display()))?;
        let json = serde_json::to_string_pretty(summary)?;
        let path = self.dir.join(Self::file_name(summary));
        fs::write(&path, json)
            .with_context(|| format!("Failed to write summary {}", path.display()))?;
        log::info!("summary persisted: {}", path.display());
        Ok(path)
    }
}

/// 保存済みサマリを読み戻す
pub fn read_summary<P: AsRef<Path>>(path: P) -> Result<SessionSummary> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read summary {}", path.as_ref().display()))?;
    let summary = serde_json::from_str(&content).context("Failed to parse summary")?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Grade;
    use std::collections::BTreeMap;

    fn sample_summary() -> SessionSummary {
        SessionSummary {
            exercise: "pushup".to_string(),
            duration_secs: 62.5,
            reps: 20,
            avg_form_score: 84.25,
            total_errors: 3,
            error_rate: 0.15,
            error_kinds: BTreeMap::from([("insufficient_depth".to_string(), 3)]),
            severity_counts: BTreeMap::new(),
            calories_burned: 10.0,
            grade: Grade::A,
            profile_fallback: false,
        }
    }

    #[test]
    fn test_persist_and_read_roundtrip() {
        let dir = std::env::temp_dir().join(format!("kata_coach_store_{}", std::process::id()));
        let store = JsonSummaryStore::new(&dir);
        let summary = sample_summary();

        let path = store.persist(&summary).unwrap();
        let loaded = read_summary(&path).unwrap();
        assert_eq!(loaded, summary);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_read_missing_file_is_error() {
        assert!(read_summary("/nonexistent/summary.json").is_err());
    }

    #[test]
    fn test_grade_serialized_as_label() {
        let json = serde_json::to_string(&sample_summary()).unwrap();
        assert!(json.contains("\"grade\": \"A\"") || json.contains("\"grade\":\"A\""));
    }
}
