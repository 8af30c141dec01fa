//! Pure, stateless grading of one submission against one question.
//!
//! One rule per question kind, all-or-nothing scoring, no partial credit.
//! The dispatch is exhaustive over the kind/submission pairing, so adding a
//! question kind is a compile-time-checked extension.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ChoiceId, Question, QuestionKind, Submission};

//
// ─── VERDICT ───────────────────────────────────────────────────────────────────
//

/// The graded outcome of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub is_correct: bool,
    pub points_earned: u32,
}

impl Verdict {
    #[must_use]
    pub fn correct(points: u32) -> Self {
        Self {
            is_correct: true,
            points_earned: points,
        }
    }

    #[must_use]
    pub fn incorrect() -> Self {
        Self {
            is_correct: false,
            points_earned: 0,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EvaluateError {
    #[error("submission kind {got} does not match {expected} question")]
    KindMismatch {
        expected: &'static str,
        got: &'static str,
    },
}

//
// ─── EVALUATION ────────────────────────────────────────────────────────────────
//

/// Grades `submission` against `question`.
///
/// Correct answers earn the question's full points, incorrect ones earn
/// zero. Descriptive questions are not graded for correctness; they are
/// accepted (and earn their points) when the word count lies within the
/// question's bounds.
///
/// # Errors
///
/// Returns [`EvaluateError::KindMismatch`] when the submission variant does
/// not match the question kind. Nothing is graded in that case.
pub fn evaluate(question: &Question, submission: &Submission) -> Result<Verdict, EvaluateError> {
    let points = question.points();

    let is_correct = match (question.kind(), submission) {
        (QuestionKind::SingleSelect { options }, Submission::SingleSelect { choice }) => options
            .iter()
            .find(|o| o.correct)
            .is_some_and(|o| o.id == *choice),

        (QuestionKind::MultiSelect { options }, Submission::MultiSelect { choices }) => {
            // Exact set equality: same members, no extras, no omissions.
            let expected: HashSet<ChoiceId> =
                options.iter().filter(|o| o.correct).map(|o| o.id).collect();
            let submitted: HashSet<ChoiceId> = choices.iter().copied().collect();
            expected == submitted
        }

        (QuestionKind::TrueFalse { answer }, Submission::TrueFalse { answer: submitted }) => {
            answer == submitted
        }

        (
            QuestionKind::FillInBlank {
                answers,
                case_sensitive,
            },
            Submission::FillInBlank { entries },
        ) => {
            answers.len() == entries.len()
                && answers
                    .iter()
                    .zip(entries)
                    .all(|(expected, entry)| blank_matches(expected, entry, *case_sensitive))
        }

        (
            QuestionKind::Descriptive {
                min_words,
                max_words,
            },
            Submission::Descriptive { text },
        ) => {
            let words = word_count(text);
            words >= *min_words && words <= *max_words
        }

        (kind, submission) => {
            return Err(EvaluateError::KindMismatch {
                expected: kind.name(),
                got: submission.name(),
            });
        }
    };

    if is_correct {
        Ok(Verdict::correct(points))
    } else {
        Ok(Verdict::incorrect())
    }
}

fn blank_matches(expected: &str, entry: &str, case_sensitive: bool) -> bool {
    let expected = expected.trim();
    let entry = entry.trim();
    if case_sensitive {
        expected == entry
    } else {
        expected.to_lowercase() == entry.to_lowercase()
    }
}

fn word_count(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
