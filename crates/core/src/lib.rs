#![forbid(unsafe_code)]

//! Domain model for the video-question synchronization engine: validated
//! questions and their time-ordered set, submissions, pure answer grading,
//! and the per-session score aggregate. No I/O lives here.

pub mod error;
pub mod evaluator;
pub mod model;
pub mod time;

pub use error::Error;
pub use evaluator::{EvaluateError, Verdict, evaluate};
pub use model::{
    ChoiceId, ChoiceOption, LessonId, Question, QuestionDraft, QuestionError, QuestionId,
    QuestionKind, QuestionSet, RejectedDraft, SessionAggregate, SessionId, Submission,
};
pub use time::Clock;
