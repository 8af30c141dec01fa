use serde::{Deserialize, Serialize};

use crate::model::ids::ChoiceId;

//
// ─── SUBMISSIONS ───────────────────────────────────────────────────────────────
//

/// A learner's answer to one question, tagged by question kind.
///
/// The variant must match the kind of the question it is submitted against;
/// the evaluator rejects mismatches without mutating any state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Submission {
    SingleSelect { choice: ChoiceId },
    MultiSelect { choices: Vec<ChoiceId> },
    TrueFalse { answer: bool },
    FillInBlank { entries: Vec<String> },
    Descriptive { text: String },
}

impl Submission {
    /// Human-readable variant name used in logs and error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Submission::SingleSelect { .. } => "single-select",
            Submission::MultiSelect { .. } => "multi-select",
            Submission::TrueFalse { .. } => "true/false",
            Submission::FillInBlank { .. } => "fill-in-blank",
            Submission::Descriptive { .. } => "descriptive",
        }
    }
}
