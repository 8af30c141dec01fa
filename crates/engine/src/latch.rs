use crate::config::CompletionMode;

//
// ─── COMPLETION LATCH ──────────────────────────────────────────────────────────
//

/// One-shot gate combining "media ended" and "all required questions
/// handled" into a single completion decision.
///
/// [`CompletionLatch::evaluate`] returns `true` exactly once, the first
/// time its inputs are simultaneously satisfied, no matter which input
/// arrived last or whether both flipped within the same processing step.
/// Every later call is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionLatch {
    mode: CompletionMode,
    fired: bool,
}

impl CompletionLatch {
    #[must_use]
    pub fn new(mode: CompletionMode) -> Self {
        Self { mode, fired: false }
    }

    /// Feeds the latch its two inputs; `true` means completion fires now.
    pub fn evaluate(&mut self, video_ended: bool, all_required_handled: bool) -> bool {
        if self.fired {
            return false;
        }

        let satisfied = match self.mode {
            CompletionMode::VideoAndQuestions => video_ended && all_required_handled,
            CompletionMode::QuestionsOnly => all_required_handled,
        };

        if satisfied {
            self.fired = true;
        }
        satisfied
    }

    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.fired
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
