use cue_core::model::{Question, QuestionSet};

use crate::session::SessionState;

//
// ─── SEEK GUARD ────────────────────────────────────────────────────────────────
//

/// Verdict on one seek request.
#[derive(Debug, Clone, PartialEq)]
pub enum SeekCheck {
    /// Honor the requested target.
    Allow,
    /// Land on this question's timestamp and force-trigger it instead.
    Redirect { question: Question },
}

/// Intercepts seek requests when Sequential Enforcement is active.
///
/// The guard is what keeps a viewer from jumping past content they have not
/// answered: a seek beyond the earliest still-locked question is redirected
/// to that question's timestamp, and the question opens immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekGuard {
    sequential_enforcement: bool,
}

impl SeekGuard {
    #[must_use]
    pub fn new(sequential_enforcement: bool) -> Self {
        Self {
            sequential_enforcement,
        }
    }

    /// Reviews a clamped seek target.
    ///
    /// With enforcement off every seek is allowed verbatim. With it on, the
    /// earliest question with `trigger_at` strictly before the target that
    /// is still locked (never triggered, answered or skipped) redirects the
    /// seek. Backward seeks are always allowed: every question behind the
    /// current position is either still locked and ahead of the target, or
    /// already shown.
    #[must_use]
    pub fn review(&self, set: &QuestionSet, state: &SessionState, target: f64) -> SeekCheck {
        if !self.sequential_enforcement {
            return SeekCheck::Allow;
        }

        let blocking = set
            .iter()
            .find(|q| q.trigger_at() < target && !state.was_triggered(q.id()));

        match blocking {
            Some(question) => SeekCheck::Redirect {
                question: question.clone(),
            },
            None => SeekCheck::Allow,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
