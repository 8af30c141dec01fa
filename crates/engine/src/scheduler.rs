use cue_core::model::{QuestionId, QuestionSet};

use crate::session::SessionState;

//
// ─── TRIGGER SCHEDULER ─────────────────────────────────────────────────────────
//

/// Decides, from a stream of position reports, which question becomes due.
///
/// Holds a scan cursor over the time-sorted question set: the index of the
/// next question not yet considered. The cursor is internal scan state and
/// is never exposed outside the engine; observable state lives in
/// [`SessionState`].
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerScheduler {
    cursor: usize,
    tolerance_secs: f64,
}

impl TriggerScheduler {
    #[must_use]
    pub fn new(tolerance_secs: f64) -> Self {
        Self {
            cursor: 0,
            tolerance_secs,
        }
    }

    /// Scans forward from the cursor and returns the first due, untriggered
    /// question, or `None`.
    ///
    /// A question is due when `trigger_at <= position + tolerance`; the
    /// tolerance absorbs coarse polling. Exactly one question fires per
    /// call: when a large polling gap jumps over several due questions, the
    /// rest stay eligible and fire on subsequent calls, in order. While a
    /// question is open nothing fires. Questions the cursor has moved past
    /// via [`TriggerScheduler::realign`] are not retroactively due; holding
    /// the viewer to them is the Seek Guard's job, not the scheduler's.
    pub fn next_due(
        &mut self,
        set: &QuestionSet,
        state: &SessionState,
        position: f64,
    ) -> Option<QuestionId> {
        if state.is_question_open() {
            return None;
        }

        while let Some(question) = set.at(self.cursor) {
            if question.trigger_at() > position + self.tolerance_secs {
                return None;
            }
            // Due: either consume it, or step over one that already fired.
            self.cursor += 1;
            if !state.was_triggered(question.id()) {
                return Some(question.id());
            }
        }

        None
    }

    /// Re-points the cursor after a playback discontinuity: the first
    /// question with `trigger_at >= position`. Already-triggered questions
    /// at or after that point are stepped over by the next scan, so a
    /// backward seek never re-opens them.
    pub fn realign(&mut self, set: &QuestionSet, position: f64) {
        self.cursor = set.first_at_or_after(position);
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
