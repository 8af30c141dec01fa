use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ChoiceId, QuestionId};

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// One selectable answer option of a single- or multi-select question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: ChoiceId,
    pub text: String,
    pub correct: bool,
}

impl ChoiceOption {
    #[must_use]
    pub fn new(id: ChoiceId, text: impl Into<String>, correct: bool) -> Self {
        Self {
            id,
            text: text.into(),
            correct,
        }
    }
}

/// Type-specific payload of a question, tagged the way the catalog
/// serializes it (`"type": "singleSelect"` and so on).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QuestionKind {
    SingleSelect {
        options: Vec<ChoiceOption>,
    },
    MultiSelect {
        options: Vec<ChoiceOption>,
    },
    TrueFalse {
        answer: bool,
    },
    #[serde(rename_all = "camelCase")]
    FillInBlank {
        answers: Vec<String>,
        #[serde(default)]
        case_sensitive: bool,
    },
    #[serde(rename_all = "camelCase")]
    Descriptive {
        min_words: u32,
        max_words: u32,
    },
}

impl QuestionKind {
    /// Human-readable kind name used in logs and error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            QuestionKind::SingleSelect { .. } => "single-select",
            QuestionKind::MultiSelect { .. } => "multi-select",
            QuestionKind::TrueFalse { .. } => "true/false",
            QuestionKind::FillInBlank { .. } => "fill-in-blank",
            QuestionKind::Descriptive { .. } => "descriptive",
        }
    }
}

/// A question as it arrives from the catalog, before validation.
///
/// Field presence is only loosely guaranteed by the upstream data, so a
/// draft must pass through [`QuestionDraft::validate`] before the engine
/// will schedule it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    pub id: QuestionId,
    pub prompt: String,
    pub trigger_at: f64,
    #[serde(flatten)]
    pub kind: QuestionKind,
    pub points: u32,
    #[serde(default)]
    pub order: u32,
}

impl QuestionDraft {
    /// Checks the draft's payload for internal consistency and promotes it
    /// to an immutable [`Question`].
    ///
    /// # Errors
    ///
    /// Returns a [`QuestionError`] describing the first malformation found:
    /// a blank prompt, a non-finite or negative trigger timestamp, an empty
    /// or duplicate option list, a missing (or, for single-select, ambiguous)
    /// correct flag, an empty or blank answer key, or inverted word bounds.
    pub fn validate(self) -> Result<Question, QuestionError> {
        if self.prompt.trim().is_empty() {
            return Err(QuestionError::BlankPrompt);
        }

        if !self.trigger_at.is_finite() || self.trigger_at < 0.0 {
            return Err(QuestionError::InvalidTriggerTimestamp(self.trigger_at));
        }

        match &self.kind {
            QuestionKind::SingleSelect { options } => {
                check_options(options)?;
                let correct = options.iter().filter(|o| o.correct).count();
                if correct == 0 {
                    return Err(QuestionError::NoCorrectOption);
                }
                if correct > 1 {
                    return Err(QuestionError::MultipleCorrectOptions(correct));
                }
            }
            QuestionKind::MultiSelect { options } => {
                check_options(options)?;
                if !options.iter().any(|o| o.correct) {
                    return Err(QuestionError::NoCorrectOption);
                }
            }
            QuestionKind::TrueFalse { .. } => {}
            QuestionKind::FillInBlank { answers, .. } => {
                if answers.is_empty() {
                    return Err(QuestionError::EmptyAnswerKey);
                }
                if let Some(pos) = answers.iter().position(|a| a.trim().is_empty()) {
                    return Err(QuestionError::BlankAnswerKeyEntry(pos));
                }
            }
            QuestionKind::Descriptive {
                min_words,
                max_words,
            } => {
                if *min_words == 0 || max_words < min_words {
                    return Err(QuestionError::InvalidWordBounds {
                        min: *min_words,
                        max: *max_words,
                    });
                }
            }
        }

        Ok(Question {
            id: self.id,
            prompt: self.prompt,
            trigger_at: self.trigger_at,
            kind: self.kind,
            points: self.points,
            order: self.order,
        })
    }
}

fn check_options(options: &[ChoiceOption]) -> Result<(), QuestionError> {
    if options.is_empty() {
        return Err(QuestionError::NoOptions);
    }
    for (i, option) in options.iter().enumerate() {
        if options[..i].iter().any(|o| o.id == option.id) {
            return Err(QuestionError::DuplicateChoice(option.id));
        }
    }
    Ok(())
}

/// A validated, immutable question. Created only via
/// [`QuestionDraft::validate`]; the payload never changes for the lifetime
/// of the session that loaded it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    id: QuestionId,
    prompt: String,
    trigger_at: f64,
    #[serde(flatten)]
    kind: QuestionKind,
    points: u32,
    order: u32,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Playback position (seconds) at which this question interrupts the video.
    #[must_use]
    pub fn trigger_at(&self) -> f64 {
        self.trigger_at
    }

    #[must_use]
    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    /// Catalog position, the tie-break when two questions share a timestamp.
    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }
}

//
// ─── QUESTION VALIDATION ERRORS ────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuestionError {
    #[error("question prompt is blank")]
    BlankPrompt,

    #[error("trigger timestamp {0} is not a finite non-negative number")]
    InvalidTriggerTimestamp(f64),

    #[error("question has no answer options")]
    NoOptions,

    #[error("no option is flagged correct")]
    NoCorrectOption,

    #[error("single-select question flags {0} options correct")]
    MultipleCorrectOptions(usize),

    #[error("duplicate option id {0}")]
    DuplicateChoice(ChoiceId),

    #[error("fill-in-blank answer key is empty")]
    EmptyAnswerKey,

    #[error("answer key entry {0} is blank")]
    BlankAnswerKeyEntry(usize),

    #[error("word bounds {min}..={max} are invalid")]
    InvalidWordBounds { min: u32, max: u32 },

    #[error("duplicate question id {0}")]
    DuplicateId(QuestionId),
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
