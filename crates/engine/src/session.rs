use std::collections::HashMap;

use chrono::{DateTime, Utc};
use cue_core::evaluator::evaluate;
use cue_core::model::{
    LessonId, Question, QuestionId, QuestionSet, SessionAggregate, SessionId, Submission,
};
use cue_core::Verdict;

use crate::error::EngineError;

//
// ─── QUESTION STATUS ───────────────────────────────────────────────────────────
//

/// Lifecycle of one question within a session.
///
/// `Locked → Open → Answered` with an optional `Skipped` terminal. Both
/// terminals are write-once; a question never re-opens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QuestionStatus {
    /// Not shown yet.
    Locked,
    /// Triggered and awaiting a submission; playback is interrupted.
    Open,
    /// Graded, with the standing verdict.
    Answered(Verdict),
    /// Deliberately passed over; excluded from scoring but handled.
    Skipped,
}

impl QuestionStatus {
    /// Shown at least once, i.e. a member of the Triggered Set.
    #[must_use]
    pub fn was_triggered(&self) -> bool {
        !matches!(self, QuestionStatus::Locked)
    }

    /// Reached a terminal state that satisfies the Completion Latch.
    #[must_use]
    pub fn is_handled(&self) -> bool {
        matches!(self, QuestionStatus::Answered(_) | QuestionStatus::Skipped)
    }
}

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub triggered: usize,
    pub answered: usize,
    pub skipped: usize,
    pub is_complete: bool,
}

//
// ─── SESSION STATE ─────────────────────────────────────────────────────────────
//

/// Owns the per-question lifecycle and the per-session aggregate.
///
/// All transitions are synchronous and guarded here; the Triggered and
/// Answered sets grow monotonically and at most one question is `Open` at
/// any time. Grading goes through the evaluator on the `Open → Answered`
/// transition, never again afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    statuses: HashMap<QuestionId, QuestionStatus>,
    open: Option<QuestionId>,
    answered: Vec<QuestionId>,
    skipped: Vec<QuestionId>,
    aggregate: SessionAggregate,
}

impl SessionState {
    /// Creates the state for a freshly started session: every question
    /// locked, score zero, `max_score` fixed from the accepted set.
    #[must_use]
    pub fn new(
        session_id: SessionId,
        lesson_id: LessonId,
        set: &QuestionSet,
        started_at: DateTime<Utc>,
    ) -> Self {
        let statuses = set
            .iter()
            .map(|q| (q.id(), QuestionStatus::Locked))
            .collect();

        Self {
            statuses,
            open: None,
            answered: Vec::new(),
            skipped: Vec::new(),
            aggregate: SessionAggregate::new(session_id, lesson_id, set.max_score(), started_at),
        }
    }

    #[must_use]
    pub fn status(&self, id: QuestionId) -> Option<QuestionStatus> {
        self.statuses.get(&id).copied()
    }

    /// The question currently interrupting playback, if any.
    #[must_use]
    pub fn open_question(&self) -> Option<QuestionId> {
        self.open
    }

    #[must_use]
    pub fn is_question_open(&self) -> bool {
        self.open.is_some()
    }

    #[must_use]
    pub fn was_triggered(&self, id: QuestionId) -> bool {
        self.status(id).is_some_and(|s| s.was_triggered())
    }

    #[must_use]
    pub fn is_handled(&self, id: QuestionId) -> bool {
        self.status(id).is_some_and(|s| s.is_handled())
    }

    /// Ids answered this session, in submission order.
    #[must_use]
    pub fn answered_ids(&self) -> &[QuestionId] {
        &self.answered
    }

    /// Ids skipped this session, in skip order.
    #[must_use]
    pub fn skipped_ids(&self) -> &[QuestionId] {
        &self.skipped
    }

    #[must_use]
    pub fn triggered_count(&self) -> usize {
        self.statuses
            .values()
            .filter(|s| s.was_triggered())
            .count()
    }

    #[must_use]
    pub fn aggregate(&self) -> &SessionAggregate {
        &self.aggregate
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.statuses.len(),
            triggered: self.triggered_count(),
            answered: self.answered.len(),
            skipped: self.skipped.len(),
            is_complete: self.aggregate.completed(),
        }
    }

    /// Fires the `Locked → Open` transition.
    ///
    /// Returns `true` when the question newly opened. Re-firing on a shown
    /// id is a no-op, as is firing while another question is already open;
    /// both return `false` and change nothing.
    pub fn mark_triggered(&mut self, id: QuestionId) -> bool {
        match self.statuses.get(&id) {
            Some(QuestionStatus::Locked) if self.open.is_none() => {
                self.statuses.insert(id, QuestionStatus::Open);
                self.open = Some(id);
                true
            }
            _ => false,
        }
    }

    /// Grades a submission and fires the `Open → Answered` transition,
    /// adding the earned points to the aggregate.
    ///
    /// # Errors
    ///
    /// Returns `NotTriggered` for a question that was never shown,
    /// `AlreadyAnswered` (carrying the standing verdict) on resubmission,
    /// `AlreadySkipped` for a skipped question, `UnknownQuestion` for an id
    /// outside the set, and propagates evaluator kind mismatches. No state
    /// changes on any rejection.
    pub fn submit(
        &mut self,
        question: &Question,
        submission: &Submission,
    ) -> Result<Verdict, EngineError> {
        let id = question.id();
        match self.statuses.get(&id) {
            None => Err(EngineError::UnknownQuestion { id }),
            Some(QuestionStatus::Locked) => Err(EngineError::NotTriggered { id }),
            Some(QuestionStatus::Answered(prior)) => Err(EngineError::AlreadyAnswered {
                id,
                prior: *prior,
            }),
            Some(QuestionStatus::Skipped) => Err(EngineError::AlreadySkipped { id }),
            Some(QuestionStatus::Open) => {
                let verdict = evaluate(question, submission)?;
                self.statuses.insert(id, QuestionStatus::Answered(verdict));
                self.answered.push(id);
                if self.open == Some(id) {
                    self.open = None;
                }
                self.aggregate.add_points(verdict.points_earned);
                Ok(verdict)
            }
        }
    }

    /// Fires the `Open → Skipped` transition. Skipped questions earn no
    /// points but count as handled for completion.
    ///
    /// # Errors
    ///
    /// Same rejection taxonomy as [`SessionState::submit`]; whether skipping
    /// is allowed at all is the coordinator's policy check.
    pub fn skip(&mut self, id: QuestionId) -> Result<(), EngineError> {
        match self.statuses.get(&id) {
            None => Err(EngineError::UnknownQuestion { id }),
            Some(QuestionStatus::Locked) => Err(EngineError::NotTriggered { id }),
            Some(QuestionStatus::Answered(prior)) => Err(EngineError::AlreadyAnswered {
                id,
                prior: *prior,
            }),
            Some(QuestionStatus::Skipped) => Err(EngineError::AlreadySkipped { id }),
            Some(QuestionStatus::Open) => {
                self.statuses.insert(id, QuestionStatus::Skipped);
                self.skipped.push(id);
                if self.open == Some(id) {
                    self.open = None;
                }
                Ok(())
            }
        }
    }

    /// Whether every required question is handled.
    ///
    /// With `require_all` the requirement is the whole question set; without
    /// it, only the questions that were actually triggered this run.
    #[must_use]
    pub fn all_required_handled(&self, set: &QuestionSet, require_all: bool) -> bool {
        if require_all {
            set.iter().all(|q| self.is_handled(q.id()))
        } else {
            self.open.is_none()
        }
    }

    /// Required questions not yet handled, in trigger order. Backs the
    /// pending-questions notice when the media ends early.
    #[must_use]
    pub fn pending_required(&self, set: &QuestionSet, require_all: bool) -> Vec<QuestionId> {
        set.iter()
            .filter(|q| {
                let required = require_all || self.was_triggered(q.id());
                required && !self.is_handled(q.id())
            })
            .map(Question::id)
            .collect()
    }

    pub fn mark_video_ended(&mut self) {
        self.aggregate.mark_video_ended();
    }

    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.aggregate.mark_completed(at);
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use cue_core::model::{QuestionDraft, QuestionKind};
    use cue_core::time::fixed_now;

    fn tf_draft(id: u64, trigger_at: f64, points: u32) -> QuestionDraft {
        QuestionDraft {
            id: QuestionId::new(id),
            prompt: format!("question {id}"),
            trigger_at,
            kind: QuestionKind::TrueFalse { answer: true },
            points,
            order: 0,
        }
    }

    fn build_state(ids: &[u64]) -> (QuestionSet, SessionState) {
        let drafts = ids
            .iter()
            .enumerate()
            .map(|(i, &id)| tf_draft(id, (i as f64 + 1.0) * 10.0, 10))
            .collect();
        let (set, rejected) = QuestionSet::from_drafts(drafts);
        assert!(rejected.is_empty());

        let state = SessionState::new(SessionId::new(), LessonId::new(1), &set, fixed_now());
        (set, state)
    }

    fn yes() -> Submission {
        Submission::TrueFalse { answer: true }
    }

    fn no() -> Submission {
        Submission::TrueFalse { answer: false }
    }

    #[test]
    fn questions_start_locked() {
        let (_, state) = build_state(&[1, 2]);

        assert_eq!(state.status(QuestionId::new(1)), Some(QuestionStatus::Locked));
        assert!(!state.is_question_open());
        assert_eq!(state.aggregate().max_score(), 20);
        assert_eq!(state.aggregate().score(), 0);
    }

    #[test]
    fn trigger_opens_exactly_one_question() {
        let (_, mut state) = build_state(&[1, 2]);

        assert!(state.mark_triggered(QuestionId::new(1)));
        assert_eq!(state.open_question(), Some(QuestionId::new(1)));

        // A second trigger while one is open is a no-op.
        assert!(!state.mark_triggered(QuestionId::new(2)));
        assert_eq!(state.status(QuestionId::new(2)), Some(QuestionStatus::Locked));

        // Re-firing on the open question is a no-op too.
        assert!(!state.mark_triggered(QuestionId::new(1)));
        assert_eq!(state.open_question(), Some(QuestionId::new(1)));
    }

    #[test]
    fn correct_answer_adds_points_and_closes_the_question() {
        let (set, mut state) = build_state(&[1]);
        let question = set.get(QuestionId::new(1)).unwrap();

        state.mark_triggered(QuestionId::new(1));
        let verdict = state.submit(question, &yes()).unwrap();

        assert!(verdict.is_correct);
        assert_eq!(verdict.points_earned, 10);
        assert_eq!(state.aggregate().score(), 10);
        assert!(!state.is_question_open());
        assert_eq!(state.answered_ids(), &[QuestionId::new(1)]);
    }

    #[test]
    fn incorrect_answer_records_without_score_change() {
        let (set, mut state) = build_state(&[1]);
        let question = set.get(QuestionId::new(1)).unwrap();

        state.mark_triggered(QuestionId::new(1));
        let verdict = state.submit(question, &no()).unwrap();

        assert!(!verdict.is_correct);
        assert_eq!(state.aggregate().score(), 0);
        assert!(state.is_handled(QuestionId::new(1)));
    }

    #[test]
    fn submitting_a_locked_question_is_rejected() {
        let (set, mut state) = build_state(&[1]);
        let question = set.get(QuestionId::new(1)).unwrap();

        let err = state.submit(question, &yes()).unwrap_err();
        assert!(matches!(err, EngineError::NotTriggered { .. }));
        assert_eq!(state.aggregate().score(), 0);
    }

    #[test]
    fn resubmission_is_rejected_and_prior_grade_stands() {
        let (set, mut state) = build_state(&[1]);
        let question = set.get(QuestionId::new(1)).unwrap();

        state.mark_triggered(QuestionId::new(1));
        state.submit(question, &no()).unwrap();

        let err = state.submit(question, &yes()).unwrap_err();
        match err {
            EngineError::AlreadyAnswered { prior, .. } => assert!(!prior.is_correct),
            other => panic!("unexpected error: {other:?}"),
        }

        // The wrong first answer still stands.
        assert_eq!(state.aggregate().score(), 0);
        assert_eq!(state.answered_ids().len(), 1);
    }

    #[test]
    fn kind_mismatch_leaves_the_question_open() {
        let (set, mut state) = build_state(&[1]);
        let question = set.get(QuestionId::new(1)).unwrap();

        state.mark_triggered(QuestionId::new(1));
        let err = state
            .submit(question, &Submission::Descriptive { text: "hm".into() })
            .unwrap_err();

        assert!(matches!(err, EngineError::Evaluate(_)));
        assert_eq!(state.status(QuestionId::new(1)), Some(QuestionStatus::Open));
    }

    #[test]
    fn skip_counts_as_handled_but_not_answered() {
        let (set, mut state) = build_state(&[1]);

        state.mark_triggered(QuestionId::new(1));
        state.skip(QuestionId::new(1)).unwrap();

        assert!(state.is_handled(QuestionId::new(1)));
        assert_eq!(state.aggregate().score(), 0);
        assert_eq!(state.skipped_ids(), &[QuestionId::new(1)]);

        let question = set.get(QuestionId::new(1)).unwrap();
        let err = state.submit(question, &yes()).unwrap_err();
        assert!(matches!(err, EngineError::AlreadySkipped { .. }));
    }

    #[test]
    fn required_handling_depends_on_policy() {
        let (set, mut state) = build_state(&[1, 2]);
        let question = set.get(QuestionId::new(1)).unwrap();

        // Nothing triggered: the triggered-only policy is trivially done,
        // the full-set policy is not.
        assert!(state.all_required_handled(&set, false));
        assert!(!state.all_required_handled(&set, true));

        state.mark_triggered(QuestionId::new(1));
        assert!(!state.all_required_handled(&set, false));

        state.submit(question, &yes()).unwrap();
        assert!(state.all_required_handled(&set, false));
        assert!(!state.all_required_handled(&set, true));

        assert_eq!(state.pending_required(&set, true), vec![QuestionId::new(2)]);
        assert!(state.pending_required(&set, false).is_empty());
    }

    #[test]
    fn progress_reports_counts() {
        let (set, mut state) = build_state(&[1, 2, 3]);
        let question = set.get(QuestionId::new(1)).unwrap();

        state.mark_triggered(QuestionId::new(1));
        state.submit(question, &yes()).unwrap();
        state.mark_triggered(QuestionId::new(2));

        let progress = state.progress();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.triggered, 2);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.skipped, 0);
        assert!(!progress.is_complete);
    }
}
