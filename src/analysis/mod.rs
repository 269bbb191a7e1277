pub mod analyzer;
pub mod error;
pub mod metrics;
pub mod phase;
pub mod rep;
pub mod score;

pub use analyzer::{AnalysisResult, ExerciseAnalyzer, FrameOutcome};
pub use error::{ErrorKind, FormError, Severity};
pub use metrics::{ExerciseMetrics, FrameMetrics};
pub use phase::Phase;
pub use rep::{RepCounter, RepEvent, RepState};
pub use score::{FormScore, NEUTRAL_SCORE, ScoreSource};
