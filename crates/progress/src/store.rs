use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cue_core::model::{LessonId, QuestionId, SessionAggregate, SessionId, Submission};
use cue_core::Verdict;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by progress store adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Storage-assigned identifier of a persisted completion checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompletionId(u64);

impl CompletionId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Persisted shape of one graded answer.
///
/// This mirrors what the engine knows at the answer checkpoint so adapters
/// can serialize it without reaching back into engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub session_id: SessionId,
    pub lesson_id: LessonId,
    pub question_id: QuestionId,
    pub submission: Submission,
    pub verdict: Verdict,
    pub answered_at: DateTime<Utc>,
}

/// Persisted shape of the completion checkpoint: the final aggregate plus
/// the ids the session handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub aggregate: SessionAggregate,
    pub answered: Vec<QuestionId>,
    pub skipped: Vec<QuestionId>,
    pub recorded_at: DateTime<Utc>,
}

/// Durable storage contract for session progress.
///
/// The engine calls this only at well-defined checkpoints (each answer, and
/// at completion); in-memory session state never depends on the store's
/// latency or success.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Persist one graded answer.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` when the (session, question) pair is
    /// already recorded, or other storage errors.
    async fn record_answer(&self, record: &AnswerRecord) -> Result<(), StoreError>;

    /// Persist the completion checkpoint and return its id.
    ///
    /// Write-once per session: recording again returns the id of the
    /// standing record, so a retried checkpoint cannot duplicate it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the record cannot be stored.
    async fn record_completion(&self, record: &CompletionRecord)
        -> Result<CompletionId, StoreError>;

    /// Fetch all answers recorded for a session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage failure; an unknown session yields
    /// an empty list, not an error.
    async fn answers_for(&self, session_id: SessionId) -> Result<Vec<AnswerRecord>, StoreError>;

    /// Fetch the completion checkpoint for a session.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the session has not completed.
    async fn completion_for(&self, session_id: SessionId)
        -> Result<CompletionRecord, StoreError>;
}

/// Simple in-memory store implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryProgressStore {
    answers: Arc<Mutex<HashMap<(SessionId, QuestionId), AnswerRecord>>>,
    completions: Arc<Mutex<HashMap<SessionId, (CompletionId, CompletionRecord)>>>,
    next_completion: Arc<Mutex<u64>>,
}

impl InMemoryProgressStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn record_answer(&self, record: &AnswerRecord) -> Result<(), StoreError> {
        let mut guard = self
            .answers
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let key = (record.session_id, record.question_id);
        if guard.contains_key(&key) {
            return Err(StoreError::Conflict);
        }
        guard.insert(key, record.clone());
        Ok(())
    }

    async fn record_completion(
        &self,
        record: &CompletionRecord,
    ) -> Result<CompletionId, StoreError> {
        let mut guard = self
            .completions
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let session_id = record.aggregate.session_id();
        if let Some((existing, _)) = guard.get(&session_id) {
            return Ok(*existing);
        }

        let mut counter = self
            .next_completion
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        *counter += 1;
        let id = CompletionId::new(*counter);
        guard.insert(session_id, (id, record.clone()));
        Ok(id)
    }

    async fn answers_for(&self, session_id: SessionId) -> Result<Vec<AnswerRecord>, StoreError> {
        let guard = self
            .answers
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let mut found: Vec<AnswerRecord> = guard
            .values()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.answered_at);
        Ok(found)
    }

    async fn completion_for(
        &self,
        session_id: SessionId,
    ) -> Result<CompletionRecord, StoreError> {
        let guard = self
            .completions
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        guard
            .get(&session_id)
            .map(|(_, record)| record.clone())
            .ok_or(StoreError::NotFound)
    }
}
