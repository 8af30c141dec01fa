//! Shared error types for the engine crate.

use thiserror::Error;

use cue_core::model::QuestionId;
use cue_core::{EvaluateError, Verdict};
use progress::StoreError;

use crate::config::ConfigError;

/// Errors emitted by the playback coordinator and the player loop service.
///
/// Everything here is a local, synchronous rejection: the offending call
/// mutates no state and the session keeps running.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("question {id} is not part of this session")]
    UnknownQuestion { id: QuestionId },

    #[error("question {id} has not been shown yet")]
    NotTriggered { id: QuestionId },

    /// The prior grade stands; it is carried here so callers can surface it.
    #[error("question {id} is already answered")]
    AlreadyAnswered { id: QuestionId, prior: Verdict },

    #[error("question {id} was skipped")]
    AlreadySkipped { id: QuestionId },

    #[error("skipping is disabled for this session")]
    SkipDisabled,

    #[error("session is closed")]
    SessionClosed,

    #[error("session is not complete")]
    NotCompleted,

    #[error(transparent)]
    Evaluate(#[from] EvaluateError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
