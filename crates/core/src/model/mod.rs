mod ids;
mod question;
mod question_set;
mod session;
mod submission;

pub use ids::{ChoiceId, LessonId, ParseIdError, QuestionId, SessionId};
pub use question::{ChoiceOption, Question, QuestionDraft, QuestionError, QuestionKind};
pub use question_set::{QuestionSet, RejectedDraft};
pub use session::SessionAggregate;
pub use submission::Submission;
