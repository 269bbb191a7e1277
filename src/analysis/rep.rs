use super::phase::Phase;

/// カウンタの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepState {
    Ready,
    Down,
    Up,
}

/// observe の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepEvent {
    None,
    RepCompleted,
}

/// デバウンス付きレップカウンタ
///
/// 遷移表:
/// - ready --down--> down
/// - down  --up-->   up   （レップ完了、カウント加算）
/// - up    --down--> down
/// 同一フェーズ・transition・hold・ready では遷移しない。
///
/// 候補フェーズは連続 `debounce_frames` フレーム観測されるまで
/// 確定しない。1フレームだけの誤分類は状態を変えずに破棄される。
#[derive(Debug)]
pub struct RepCounter {
    state: RepState,
    count: u32,
    debounce_frames: usize,
    candidate: Option<Phase>,
    streak: usize,
}

impl RepCounter {
    pub fn new(debounce_frames: usize) -> Self {
        Self {
            state: RepState::Ready,
            count: 0,
            debounce_frames: debounce_frames.max(1),
            candidate: None,
            streak: 0,
        }
    }

    pub fn state(&self) -> RepState {
        self.state
    }

    /// 完了レップ数。セッション終了まで単調非減少。
    pub fn count(&self) -> u32 {
        self.count
    }

    /// 1フレーム分のフェーズを観測する
    pub fn observe(&mut self, phase: Phase) -> RepEvent {
        match phase {
            Phase::Down | Phase::Up => {}
            // 連続観測が途切れたので候補を破棄する
            Phase::Transition | Phase::Hold | Phase::Ready => {
                self.candidate = None;
                self.streak = 0;
                return RepEvent::None;
            }
        }
        if self.candidate == Some(phase) {
            self.streak += 1;
        } else {
            self.candidate = Some(phase);
            self.streak = 1;
        }
        if self.streak < self.debounce_frames {
            return RepEvent::None;
        }
        self.commit(phase)
    }

    fn commit(&mut self, phase: Phase) -> RepEvent {
        match (self.state, phase) {
            (RepState::Ready, Phase::Down) => {
                self.state = RepState::Down;
                RepEvent::None
            }
            (RepState::Down, Phase::Up) => {
                self.state = RepState::Up;
                self.count += 1;
                RepEvent::RepCompleted
            }
            (RepState::Up, Phase::Down) => {
                self.state = RepState::Down;
                RepEvent::None
            }
            // ready からの up、同一状態の再観測: 遷移なし
            _ => RepEvent::None,
        }
    }

    pub fn reset(&mut self) {
        self.state = RepState::Ready;
        self.count = 0;
        self.candidate = None;
        self.streak = 0;
    }
}
