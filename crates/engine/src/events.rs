use cue_core::model::{Question, QuestionId, SessionAggregate};
use serde::Serialize;

/// Tagged state-transition events pushed out to the presentation layer.
///
/// Events are buffered inside the coordinator and drained with
/// [`crate::PlaybackCoordinator::take_events`] after each input; the engine
/// itself never calls back into the embedder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    /// A question became due and playback was paused for it.
    QuestionTriggered { question: Question },
    /// A submission was graded and recorded.
    #[serde(rename_all = "camelCase")]
    QuestionAnswered {
        id: QuestionId,
        is_correct: bool,
        points_earned: u32,
    },
    /// An open question was skipped instead of answered.
    QuestionSkipped { id: QuestionId },
    /// A guarded seek was redirected to an earlier unanswered question.
    SeekRedirected { question: Question },
    /// The media ended while required questions are still unanswered. A
    /// notice for the rendering layer, not an error.
    CompletionPending { unanswered: Vec<QuestionId> },
    /// The one-shot completion event with the final aggregate.
    Completed { aggregate: SessionAggregate },
}
