use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cue_core::model::{
    LessonId, Question, QuestionDraft, QuestionId, QuestionSet, RejectedDraft, SessionAggregate,
    SessionId, Submission,
};
use cue_core::Verdict;
use progress::CompletionId;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::latch::CompletionLatch;
use crate::media::MediaController;
use crate::scheduler::TriggerScheduler;
use crate::seek_guard::{SeekCheck, SeekGuard};
use crate::session::{SessionProgress, SessionState};

//
// ─── SEEK OUTCOME ──────────────────────────────────────────────────────────────
//

/// What happened to one seek request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekOutcome {
    /// The seek was honored at the (clamped) target.
    Applied { position: f64 },
    /// The seek was redirected to an unanswered question, which is now open.
    Redirected {
        question: QuestionId,
        position: f64,
    },
    /// Refused without any state change: a question is open, a trigger is
    /// mid-flight, or the session is closed.
    Blocked,
}

//
// ─── PLAYBACK COORDINATOR ──────────────────────────────────────────────────────
//

/// Orchestrates one playback session: pause-on-trigger, resume-on-answer,
/// guarded seeks and the completion latch.
///
/// This is the only component that issues play/pause/seek commands to the
/// external media source. All inputs arrive as plain method calls on one
/// execution context; state transitions are synchronous and guarded, and
/// observable changes are pushed out as [`EngineEvent`]s drained via
/// [`PlaybackCoordinator::take_events`].
///
/// Timestamps are threaded in by the caller (see `PlayerLoopService`, which
/// supplies them from its clock) to keep sessions deterministic in tests.
pub struct PlaybackCoordinator {
    session_id: SessionId,
    lesson_id: LessonId,
    set: QuestionSet,
    state: SessionState,
    scheduler: TriggerScheduler,
    guard: SeekGuard,
    latch: CompletionLatch,
    media: Arc<dyn MediaController>,
    config: EngineConfig,
    duration: Option<f64>,
    last_position: f64,
    processing: bool,
    closed: bool,
    completion_id: Option<CompletionId>,
    events: Vec<EngineEvent>,
}

impl PlaybackCoordinator {
    /// Starts a session over the given catalog drafts.
    ///
    /// Malformed drafts are excluded from the set, logged, and returned;
    /// the session proceeds without them and `max_score` covers only the
    /// accepted questions.
    ///
    /// `started_at` should come from the embedding's clock to keep time
    /// deterministic.
    #[must_use]
    pub fn new(
        lesson_id: LessonId,
        drafts: Vec<QuestionDraft>,
        media: Arc<dyn MediaController>,
        config: EngineConfig,
        started_at: DateTime<Utc>,
    ) -> (Self, Vec<RejectedDraft>) {
        let (set, rejected) = QuestionSet::from_drafts(drafts);
        for draft in &rejected {
            tracing::warn!(question = %draft.id, error = %draft.error, "excluding malformed question");
        }

        let session_id = SessionId::new();
        let state = SessionState::new(session_id, lesson_id, &set, started_at);
        tracing::debug!(
            session = %session_id,
            lesson = %lesson_id,
            questions = set.len(),
            max_score = set.max_score(),
            "session started"
        );

        let coordinator = Self {
            session_id,
            lesson_id,
            scheduler: TriggerScheduler::new(config.tolerance_secs()),
            guard: SeekGuard::new(config.sequential_enforcement()),
            latch: CompletionLatch::new(config.completion_mode()),
            set,
            state,
            media,
            config,
            duration: None,
            last_position: 0.0,
            processing: false,
            closed: false,
            completion_id: None,
            events: Vec::new(),
        };
        (coordinator, rejected)
    }

    /// Records the media duration once known; seek targets are clamped to
    /// it. Non-finite or non-positive values are ignored.
    #[must_use]
    pub fn with_duration(mut self, seconds: f64) -> Self {
        if seconds.is_finite() && seconds > 0.0 {
            self.duration = Some(seconds);
        }
        self
    }

    // ─── Inputs ────────────────────────────────────────────────────────────

    /// Feeds one playback position report (seconds).
    ///
    /// Reports are treated as monotonically increasing within a playback
    /// run; a report smaller than the last-seen one is an implicit seek and
    /// goes through the Seek Guard instead of the trigger path. Reports
    /// arriving while a question is open, while a trigger is mid-flight, or
    /// after `close()` are no-ops, as are non-finite or negative values.
    pub fn on_position(&mut self, position: f64) {
        if self.closed || self.processing || self.state.is_question_open() {
            return;
        }
        if !position.is_finite() || position < 0.0 {
            return;
        }

        if position < self.last_position {
            self.apply_implicit_seek(position);
            return;
        }

        self.last_position = position;
        if let Some(id) = self.scheduler.next_due(&self.set, &self.state, position) {
            self.fire_trigger(id);
        }
    }

    /// Handles an explicit seek request from the viewer.
    ///
    /// The target is clamped to `[0, duration]` first (non-finite targets
    /// clamp to 0). Requests made while a question is open are refused with
    /// [`SeekOutcome::Blocked`] and change nothing.
    pub fn request_seek(&mut self, target: f64) -> SeekOutcome {
        if self.closed || self.processing || self.state.is_question_open() {
            return SeekOutcome::Blocked;
        }

        let target = self.clamp_position(target);
        match self.guard.review(&self.set, &self.state, target) {
            SeekCheck::Allow => {
                self.scheduler.realign(&self.set, target);
                self.last_position = target;
                self.media.seek_to(target);
                SeekOutcome::Applied { position: target }
            }
            SeekCheck::Redirect { question } => {
                let (question, position) = self.force_redirect(question);
                SeekOutcome::Redirected { question, position }
            }
        }
    }

    /// Grades and records a submission for an open question, then resumes
    /// playback unless the media has already ended.
    ///
    /// # Errors
    ///
    /// Returns `SessionClosed` after `close()`, `UnknownQuestion` for ids
    /// outside the set, `NotTriggered` for questions never shown,
    /// `AlreadyAnswered` (with the standing verdict) on resubmission,
    /// `AlreadySkipped` for skipped questions, and propagates evaluator
    /// kind mismatches. Rejections mutate nothing.
    pub fn submit_answer(
        &mut self,
        id: QuestionId,
        submission: &Submission,
        answered_at: DateTime<Utc>,
    ) -> Result<Verdict, EngineError> {
        if self.closed {
            return Err(EngineError::SessionClosed);
        }
        let Some(question) = self.set.get(id) else {
            return Err(EngineError::UnknownQuestion { id });
        };

        let verdict = self.state.submit(question, submission)?;
        tracing::debug!(
            question = %id,
            is_correct = verdict.is_correct,
            points = verdict.points_earned,
            "answer recorded"
        );
        self.events.push(EngineEvent::QuestionAnswered {
            id,
            is_correct: verdict.is_correct,
            points_earned: verdict.points_earned,
        });

        self.maybe_complete(answered_at);
        self.resume_if_playing();
        Ok(verdict)
    }

    /// Skips the open question instead of answering it, when the session
    /// allows skipping. Skipped questions earn nothing but count as handled
    /// for completion.
    ///
    /// # Errors
    ///
    /// Returns `SkipDisabled` when skipping is not configured; otherwise
    /// the same taxonomy as [`PlaybackCoordinator::submit_answer`].
    pub fn skip_question(
        &mut self,
        id: QuestionId,
        skipped_at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if self.closed {
            return Err(EngineError::SessionClosed);
        }
        if !self.config.allow_skip() {
            return Err(EngineError::SkipDisabled);
        }

        self.state.skip(id)?;
        tracing::debug!(question = %id, "question skipped");
        self.events.push(EngineEvent::QuestionSkipped { id });

        self.maybe_complete(skipped_at);
        self.resume_if_playing();
        Ok(())
    }

    /// Handles the media source's one-shot `ended` signal.
    ///
    /// Sets `video_ended` (monotonic), evaluates the Completion Latch, and
    /// when required questions are still unanswered emits
    /// [`EngineEvent::CompletionPending`] instead of completing. Inert
    /// after `close()`.
    pub fn on_ended(&mut self, at: DateTime<Utc>) {
        if self.closed {
            return;
        }

        self.state.mark_video_ended();
        tracing::debug!(session = %self.session_id, "media ended");

        self.maybe_complete(at);
        if !self.latch.has_fired() {
            let unanswered = self
                .state
                .pending_required(&self.set, self.config.require_all_questions());
            if !unanswered.is_empty() {
                self.events.push(EngineEvent::CompletionPending { unanswered });
            }
        }
    }

    /// Tears the session down. Subsequent position, seek and ended signals
    /// are inert no-ops and subsequent submissions fail with
    /// `SessionClosed`; no late callback can mutate the session afterwards.
    /// Idempotent.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            tracing::debug!(session = %self.session_id, "session closed");
        }
    }

    // ─── Observable state ──────────────────────────────────────────────────

    /// Drains the buffered state-transition events, oldest first.
    ///
    /// The embedding calls this after each input and forwards the events to
    /// its rendering layer.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn aggregate(&self) -> &SessionAggregate {
        self.state.aggregate()
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        self.state.progress()
    }

    /// The question currently interrupting playback, if any.
    #[must_use]
    pub fn open_question(&self) -> Option<&Question> {
        self.set.get(self.state.open_question()?)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Id of the persisted completion checkpoint, once stored.
    #[must_use]
    pub fn completion_id(&self) -> Option<CompletionId> {
        self.completion_id
    }

    pub(crate) fn set_completion_id(&mut self, id: CompletionId) {
        self.completion_id = Some(id);
    }

    // ─── Internals ─────────────────────────────────────────────────────────

    /// Opens a due question: processing lock on, transition, pause command,
    /// event, lock off. Back-to-back inputs delivered while the lock is
    /// held are no-ops.
    fn fire_trigger(&mut self, id: QuestionId) {
        let Some(question) = self.set.get(id).cloned() else {
            return;
        };

        self.processing = true;
        if self.state.mark_triggered(id) {
            self.media.pause();
            tracing::debug!(question = %id, position = self.last_position, "question triggered");
            self.events.push(EngineEvent::QuestionTriggered { question });
        }
        self.processing = false;
    }

    /// A backward position report: the media moved itself, so realign the
    /// scan cursor without issuing a seek command. The guard still reviews
    /// the landing point.
    fn apply_implicit_seek(&mut self, target: f64) {
        match self.guard.review(&self.set, &self.state, target) {
            SeekCheck::Allow => {
                self.scheduler.realign(&self.set, target);
                self.last_position = target;
            }
            SeekCheck::Redirect { question } => {
                self.force_redirect(question);
            }
        }
    }

    /// Lands on the blocking question's timestamp and opens it in the same
    /// logical step, instead of honoring the original target.
    fn force_redirect(&mut self, question: Question) -> (QuestionId, f64) {
        self.processing = true;
        let id = question.id();
        let landing = question.trigger_at();

        self.scheduler.realign(&self.set, landing);
        self.last_position = landing;
        self.media.seek_to(landing);
        self.media.pause();
        tracing::debug!(question = %id, position = landing, "seek redirected to unanswered question");

        self.events.push(EngineEvent::SeekRedirected {
            question: question.clone(),
        });
        if self.state.mark_triggered(id) {
            self.events.push(EngineEvent::QuestionTriggered { question });
        }

        self.processing = false;
        (id, landing)
    }

    /// Feeds the Completion Latch; on its one-shot fire, stamps the
    /// aggregate and emits `Completed`.
    fn maybe_complete(&mut self, at: DateTime<Utc>) {
        let handled = self
            .state
            .all_required_handled(&self.set, self.config.require_all_questions());
        let ended = self.state.aggregate().video_ended();

        if self.latch.evaluate(ended, handled) {
            self.state.mark_completed(at);
            tracing::debug!(
                session = %self.session_id,
                score = self.state.aggregate().score(),
                "session completed"
            );
            self.events.push(EngineEvent::Completed {
                aggregate: self.state.aggregate().clone(),
            });
        }
    }

    /// Resume after a handled question, unless the media already ended;
    /// ended media is never pointlessly resumed.
    fn resume_if_playing(&mut self) {
        if !self.state.aggregate().video_ended() {
            self.media.play();
        }
    }

    fn clamp_position(&self, target: f64) -> f64 {
        if !target.is_finite() {
            return 0.0;
        }
        let upper = self.duration.unwrap_or(f64::INFINITY);
        target.clamp(0.0, upper)
    }
}

impl fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackCoordinator")
            .field("session_id", &self.session_id)
            .field("lesson_id", &self.lesson_id)
            .field("questions", &self.set.len())
            .field("open", &self.state.open_question())
            .field("last_position", &self.last_position)
            .field("closed", &self.closed)
            .field("completion_id", &self.completion_id)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaCommand, RecordingMedia};
    use cue_core::model::QuestionKind;
    use cue_core::time::fixed_now;

    fn tf_draft(id: u64, trigger_at: f64) -> QuestionDraft {
        QuestionDraft {
            id: QuestionId::new(id),
            prompt: format!("question {id}"),
            trigger_at,
            kind: QuestionKind::TrueFalse { answer: true },
            points: 10,
            order: 0,
        }
    }

    fn start(
        drafts: Vec<QuestionDraft>,
        config: EngineConfig,
    ) -> (PlaybackCoordinator, RecordingMedia) {
        let media = RecordingMedia::new();
        let (coordinator, rejected) = PlaybackCoordinator::new(
            LessonId::new(1),
            drafts,
            Arc::new(media.clone()),
            config,
            fixed_now(),
        );
        assert!(rejected.is_empty());
        (coordinator, media)
    }

    fn yes() -> Submission {
        Submission::TrueFalse { answer: true }
    }

    #[test]
    fn position_report_triggers_pause_and_event() {
        let (mut c, media) = start(vec![tf_draft(1, 10.0)], EngineConfig::default());

        c.on_position(5.0);
        assert!(c.take_events().is_empty());

        c.on_position(10.1);
        assert_eq!(media.commands(), vec![MediaCommand::Pause]);
        assert_eq!(c.open_question().map(Question::id), Some(QuestionId::new(1)));

        let events = c.take_events();
        assert!(matches!(
            events.as_slice(),
            [EngineEvent::QuestionTriggered { question }] if question.id() == QuestionId::new(1)
        ));

        // Further reports while the question is open are no-ops.
        c.on_position(10.2);
        c.on_position(10.3);
        assert_eq!(media.commands(), vec![MediaCommand::Pause]);
        assert!(c.take_events().is_empty());
    }

    #[test]
    fn answering_resumes_playback() {
        let (mut c, media) = start(vec![tf_draft(1, 10.0)], EngineConfig::default());

        c.on_position(10.0);
        let verdict = c
            .submit_answer(QuestionId::new(1), &yes(), fixed_now())
            .unwrap();

        assert!(verdict.is_correct);
        assert_eq!(c.aggregate().score(), 10);
        assert_eq!(
            media.commands(),
            vec![MediaCommand::Pause, MediaCommand::Play]
        );
    }

    #[test]
    fn no_resume_after_media_ended() {
        let (mut c, media) = start(vec![tf_draft(1, 10.0)], EngineConfig::default());

        c.on_position(10.0);
        c.on_ended(fixed_now());
        media.clear();

        c.submit_answer(QuestionId::new(1), &yes(), fixed_now())
            .unwrap();
        assert!(!media.commands().contains(&MediaCommand::Play));
        assert!(c.aggregate().completed());
    }

    #[test]
    fn backward_report_is_an_implicit_seek_not_a_retrigger() {
        let (mut c, media) = start(vec![tf_draft(1, 10.0)], EngineConfig::default());

        c.on_position(10.0);
        c.submit_answer(QuestionId::new(1), &yes(), fixed_now())
            .unwrap();
        media.clear();
        c.take_events();

        // The media jumped back on its own; replay through the answered
        // question without re-opening it.
        c.on_position(2.0);
        c.on_position(10.0);
        c.on_position(12.0);

        assert!(c.take_events().is_empty());
        assert!(media.commands().is_empty());
    }

    #[test]
    fn seek_targets_are_clamped() {
        let media = RecordingMedia::new();
        let (c, _) = PlaybackCoordinator::new(
            LessonId::new(1),
            vec![],
            Arc::new(media.clone()),
            EngineConfig::default(),
            fixed_now(),
        );
        let mut c = c.with_duration(120.0);

        assert_eq!(c.request_seek(-5.0), SeekOutcome::Applied { position: 0.0 });
        assert_eq!(
            c.request_seek(500.0),
            SeekOutcome::Applied { position: 120.0 }
        );
        assert_eq!(c.request_seek(f64::NAN), SeekOutcome::Applied { position: 0.0 });

        assert_eq!(
            media.commands(),
            vec![
                MediaCommand::SeekTo(0.0),
                MediaCommand::SeekTo(120.0),
                MediaCommand::SeekTo(0.0),
            ]
        );
    }

    #[test]
    fn seek_while_question_open_is_blocked() {
        let (mut c, media) = start(vec![tf_draft(1, 10.0)], EngineConfig::default());

        c.on_position(10.0);
        media.clear();

        assert_eq!(c.request_seek(50.0), SeekOutcome::Blocked);
        assert!(media.commands().is_empty());
        assert_eq!(c.open_question().map(Question::id), Some(QuestionId::new(1)));
    }

    #[test]
    fn guarded_seek_redirects_and_force_triggers() {
        let (mut c, media) = start(
            vec![tf_draft(1, 20.0), tf_draft(2, 40.0)],
            EngineConfig::strict(),
        );

        let outcome = c.request_seek(50.0);
        assert_eq!(
            outcome,
            SeekOutcome::Redirected {
                question: QuestionId::new(1),
                position: 20.0,
            }
        );
        assert_eq!(
            media.commands(),
            vec![MediaCommand::SeekTo(20.0), MediaCommand::Pause]
        );

        let events = c.take_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], EngineEvent::SeekRedirected { question } if question.id() == QuestionId::new(1)));
        assert!(matches!(&events[1], EngineEvent::QuestionTriggered { question } if question.id() == QuestionId::new(1)));
        assert_eq!(c.open_question().map(Question::id), Some(QuestionId::new(1)));
    }

    #[test]
    fn unguarded_seek_realigns_and_applies() {
        let (mut c, media) = start(
            vec![tf_draft(1, 20.0), tf_draft(2, 40.0)],
            EngineConfig::default(),
        );

        assert_eq!(c.request_seek(50.0), SeekOutcome::Applied { position: 50.0 });
        assert_eq!(media.commands(), vec![MediaCommand::SeekTo(50.0)]);

        // Jumped-over questions are not retroactively triggered.
        c.on_position(51.0);
        c.on_position(55.0);
        assert!(c.take_events().is_empty());
    }

    #[test]
    fn ended_with_pending_questions_emits_notice_instead_of_completing() {
        let (mut c, _media) = start(
            vec![tf_draft(1, 10.0), tf_draft(2, 30.0)],
            EngineConfig::default(),
        );

        c.on_position(10.0);
        c.submit_answer(QuestionId::new(1), &yes(), fixed_now())
            .unwrap();
        c.take_events();

        c.on_ended(fixed_now());
        assert!(!c.aggregate().completed());

        let events = c.take_events();
        assert!(matches!(
            events.as_slice(),
            [EngineEvent::CompletionPending { unanswered }] if unanswered == &vec![QuestionId::new(2)]
        ));
    }

    #[test]
    fn empty_question_set_completes_on_end_alone() {
        let (mut c, _media) = start(vec![], EngineConfig::default());

        c.on_position(30.0);
        c.on_ended(fixed_now());

        assert!(c.aggregate().completed());
        assert_eq!(c.aggregate().percentage(), 0.0);

        let events = c.take_events();
        assert!(matches!(events.as_slice(), [EngineEvent::Completed { .. }]));

        // A repeated ended signal cannot complete twice.
        c.on_ended(fixed_now());
        assert!(c.take_events().is_empty());
    }

    #[test]
    fn skip_requires_configuration() {
        let (mut c, _media) = start(vec![tf_draft(1, 10.0)], EngineConfig::default());

        c.on_position(10.0);
        let err = c.skip_question(QuestionId::new(1), fixed_now()).unwrap_err();
        assert!(matches!(err, EngineError::SkipDisabled));

        let (mut c, media) = start(
            vec![tf_draft(1, 10.0)],
            EngineConfig::default().with_allow_skip(true),
        );
        c.on_position(10.0);
        media.clear();
        c.take_events();

        c.skip_question(QuestionId::new(1), fixed_now()).unwrap();
        assert_eq!(c.aggregate().score(), 0);
        assert_eq!(media.commands(), vec![MediaCommand::Play]);

        let events = c.take_events();
        assert!(matches!(
            events.first(),
            Some(EngineEvent::QuestionSkipped { id }) if *id == QuestionId::new(1)
        ));
    }

    #[test]
    fn closed_session_ignores_signals_and_rejects_submissions() {
        let (mut c, media) = start(vec![tf_draft(1, 10.0)], EngineConfig::default());

        c.close();
        c.close();

        c.on_position(10.0);
        c.on_ended(fixed_now());
        assert_eq!(c.request_seek(5.0), SeekOutcome::Blocked);
        assert!(media.commands().is_empty());
        assert!(c.take_events().is_empty());
        assert!(!c.aggregate().video_ended());

        let err = c
            .submit_answer(QuestionId::new(1), &yes(), fixed_now())
            .unwrap_err();
        assert!(matches!(err, EngineError::SessionClosed));
    }

    #[test]
    fn unknown_question_is_rejected_without_state_change() {
        let (mut c, _media) = start(vec![tf_draft(1, 10.0)], EngineConfig::default());

        let err = c
            .submit_answer(QuestionId::new(99), &yes(), fixed_now())
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownQuestion { .. }));
        assert_eq!(c.aggregate().score(), 0);
        assert!(c.take_events().is_empty());
    }
}
