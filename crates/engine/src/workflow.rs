use std::sync::Arc;

use cue_core::model::{
    LessonId, QuestionDraft, QuestionId, RejectedDraft, SessionId, Submission,
};
use cue_core::time::Clock;
use cue_core::Verdict;
use progress::{AnswerRecord, CompletionId, CompletionRecord, ProgressStore};

use crate::config::EngineConfig;
use crate::coordinator::PlaybackCoordinator;
use crate::error::EngineError;
use crate::media::MediaController;

//
// ─── PLAYER LOOP SERVICE ───────────────────────────────────────────────────────
//

/// Drives playback sessions against a progress store.
///
/// The [`PlaybackCoordinator`] is deliberately storage-free; this service
/// wraps the calls that leave a durable trace (answers, the completion
/// checkpoint) and stamps them from its clock. Position reports and seeks
/// have nothing to persist, so embeddings feed those to the coordinator
/// directly.
///
/// Persistence of answers and the completion checkpoint is best-effort:
/// a store failure is logged and the in-memory session stays authoritative.
/// Only [`PlayerLoopService::finalize`] surfaces store errors, so callers
/// can retry it until the checkpoint lands.
#[derive(Clone)]
pub struct PlayerLoopService {
    clock: Clock,
    store: Arc<dyn ProgressStore>,
}

impl PlayerLoopService {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn ProgressStore>) -> Self {
        Self { clock, store }
    }

    /// Starts a session over the lesson's catalog drafts.
    ///
    /// Malformed drafts are excluded and returned alongside the running
    /// coordinator.
    #[must_use]
    pub fn start_session(
        &self,
        lesson_id: LessonId,
        drafts: Vec<QuestionDraft>,
        media: Arc<dyn MediaController>,
        config: EngineConfig,
    ) -> (PlaybackCoordinator, Vec<RejectedDraft>) {
        PlaybackCoordinator::new(lesson_id, drafts, media, config, self.clock.now())
    }

    /// Grades a submission through the coordinator and persists the
    /// resulting answer record.
    ///
    /// # Errors
    ///
    /// Propagates the coordinator's rejection taxonomy. A store failure is
    /// logged, not returned; the graded verdict still stands.
    pub async fn submit_answer(
        &self,
        coordinator: &mut PlaybackCoordinator,
        id: QuestionId,
        submission: Submission,
    ) -> Result<Verdict, EngineError> {
        let answered_at = self.clock.now();
        let verdict = coordinator.submit_answer(id, &submission, answered_at)?;

        let record = AnswerRecord {
            session_id: coordinator.session_id(),
            lesson_id: coordinator.lesson_id(),
            question_id: id,
            submission,
            verdict,
            answered_at,
        };
        if let Err(error) = self.store.record_answer(&record).await {
            tracing::warn!(question = %id, %error, "failed to persist answer");
        }

        self.checkpoint_completion(coordinator).await;
        Ok(verdict)
    }

    /// Skips the open question. Skips leave no per-question record; they
    /// show up in the completion checkpoint.
    ///
    /// # Errors
    ///
    /// Propagates the coordinator's rejection taxonomy, including
    /// `SkipDisabled`.
    pub async fn skip_question(
        &self,
        coordinator: &mut PlaybackCoordinator,
        id: QuestionId,
    ) -> Result<(), EngineError> {
        coordinator.skip_question(id, self.clock.now())?;
        self.checkpoint_completion(coordinator).await;
        Ok(())
    }

    /// Forwards the media's `ended` signal and checkpoints completion if
    /// the latch fired.
    pub async fn handle_ended(&self, coordinator: &mut PlaybackCoordinator) {
        coordinator.on_ended(self.clock.now());
        self.checkpoint_completion(coordinator).await;
    }

    /// Ensures the completed session has a durable checkpoint and returns
    /// its id. Safe to call repeatedly: once a checkpoint stands, the same
    /// id comes back without touching the store again.
    ///
    /// # Errors
    ///
    /// Returns `NotCompleted` while the session has not completed, and
    /// surfaces store errors so the caller can retry.
    pub async fn finalize(
        &self,
        coordinator: &mut PlaybackCoordinator,
    ) -> Result<CompletionId, EngineError> {
        if let Some(id) = coordinator.completion_id() {
            return Ok(id);
        }
        if !coordinator.aggregate().completed() {
            return Err(EngineError::NotCompleted);
        }

        let record = self.completion_record(coordinator);
        let id = self.store.record_completion(&record).await?;
        coordinator.set_completion_id(id);
        Ok(id)
    }

    /// Fetches the session's persisted answers, oldest first.
    ///
    /// # Errors
    ///
    /// Surfaces store errors.
    pub async fn answer_history(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AnswerRecord>, EngineError> {
        Ok(self.store.answers_for(session_id).await?)
    }

    /// Fetches the session's completion checkpoint.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` (wrapped) when no checkpoint exists.
    pub async fn completion(
        &self,
        session_id: SessionId,
    ) -> Result<CompletionRecord, EngineError> {
        Ok(self.store.completion_for(session_id).await?)
    }

    /// Best-effort checkpoint after any input that can fire the latch.
    async fn checkpoint_completion(&self, coordinator: &mut PlaybackCoordinator) {
        if !coordinator.aggregate().completed() || coordinator.completion_id().is_some() {
            return;
        }

        let record = self.completion_record(coordinator);
        match self.store.record_completion(&record).await {
            Ok(id) => coordinator.set_completion_id(id),
            Err(error) => {
                tracing::warn!(
                    session = %coordinator.session_id(),
                    %error,
                    "failed to checkpoint completion"
                );
            }
        }
    }

    fn completion_record(&self, coordinator: &PlaybackCoordinator) -> CompletionRecord {
        CompletionRecord {
            aggregate: coordinator.aggregate().clone(),
            answered: coordinator.state().answered_ids().to_vec(),
            skipped: coordinator.state().skipped_ids().to_vec(),
            recorded_at: self.clock.now(),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::RecordingMedia;
    use async_trait::async_trait;
    use cue_core::model::QuestionKind;
    use cue_core::time::fixed_clock;
    use progress::{InMemoryProgressStore, StoreError};

    fn tf_draft(id: u64, trigger_at: f64) -> QuestionDraft {
        QuestionDraft {
            id: QuestionId::new(id),
            prompt: format!("question {id}"),
            trigger_at,
            kind: QuestionKind::TrueFalse { answer: true },
            points: 5,
            order: 0,
        }
    }

    fn service() -> (PlayerLoopService, Arc<InMemoryProgressStore>) {
        let store = Arc::new(InMemoryProgressStore::new());
        let service = PlayerLoopService::new(fixed_clock(), store.clone());
        (service, store)
    }

    #[tokio::test]
    async fn submitted_answers_are_persisted() {
        let (service, _store) = service();
        let (mut c, _) = service.start_session(
            LessonId::new(7),
            vec![tf_draft(1, 10.0)],
            Arc::new(RecordingMedia::new()),
            EngineConfig::default(),
        );

        c.on_position(10.0);
        let verdict = service
            .submit_answer(&mut c, QuestionId::new(1), Submission::TrueFalse { answer: true })
            .await
            .unwrap();
        assert!(verdict.is_correct);

        let history = service.answer_history(c.session_id()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question_id, QuestionId::new(1));
        assert!(history[0].verdict.is_correct);
    }

    #[tokio::test]
    async fn completion_is_checkpointed_once() {
        let (service, _store) = service();
        let (mut c, _) = service.start_session(
            LessonId::new(7),
            vec![tf_draft(1, 10.0)],
            Arc::new(RecordingMedia::new()),
            EngineConfig::default(),
        );

        c.on_position(10.0);
        service
            .submit_answer(&mut c, QuestionId::new(1), Submission::TrueFalse { answer: true })
            .await
            .unwrap();
        service.handle_ended(&mut c).await;

        let id = c.completion_id().unwrap();
        assert_eq!(service.finalize(&mut c).await.unwrap(), id);

        let checkpoint = service.completion(c.session_id()).await.unwrap();
        assert_eq!(checkpoint.aggregate.score(), 5);
        assert_eq!(checkpoint.answered, vec![QuestionId::new(1)]);
        assert!(checkpoint.skipped.is_empty());
    }

    #[tokio::test]
    async fn finalize_requires_a_completed_session() {
        let (service, _store) = service();
        let (mut c, _) = service.start_session(
            LessonId::new(7),
            vec![tf_draft(1, 10.0)],
            Arc::new(RecordingMedia::new()),
            EngineConfig::default(),
        );

        let err = service.finalize(&mut c).await.unwrap_err();
        assert!(matches!(err, EngineError::NotCompleted));
    }

    /// Store that refuses writes; reads behave as if empty.
    struct RejectingStore;

    #[async_trait]
    impl ProgressStore for RejectingStore {
        async fn record_answer(&self, _record: &AnswerRecord) -> Result<(), StoreError> {
            Err(StoreError::Connection("write refused".into()))
        }

        async fn record_completion(
            &self,
            _record: &CompletionRecord,
        ) -> Result<CompletionId, StoreError> {
            Err(StoreError::Connection("write refused".into()))
        }

        async fn answers_for(
            &self,
            _session_id: SessionId,
        ) -> Result<Vec<AnswerRecord>, StoreError> {
            Ok(Vec::new())
        }

        async fn completion_for(
            &self,
            _session_id: SessionId,
        ) -> Result<CompletionRecord, StoreError> {
            Err(StoreError::NotFound)
        }
    }

    #[tokio::test]
    async fn store_failures_do_not_lose_the_graded_verdict() {
        let service = PlayerLoopService::new(fixed_clock(), Arc::new(RejectingStore));
        let (mut c, _) = service.start_session(
            LessonId::new(7),
            vec![tf_draft(1, 10.0)],
            Arc::new(RecordingMedia::new()),
            EngineConfig::default(),
        );

        c.on_position(10.0);
        let verdict = service
            .submit_answer(&mut c, QuestionId::new(1), Submission::TrueFalse { answer: true })
            .await
            .unwrap();

        assert!(verdict.is_correct);
        assert_eq!(c.aggregate().score(), 5);

        // The checkpoint write also failed, so finalize surfaces the error
        // and can be retried.
        service.handle_ended(&mut c).await;
        assert!(c.aggregate().completed());
        assert!(c.completion_id().is_none());
        let err = service.finalize(&mut c).await.unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));
    }
}
