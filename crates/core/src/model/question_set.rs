use std::collections::HashMap;

use crate::model::ids::QuestionId;
use crate::model::question::{Question, QuestionDraft, QuestionError};

//
// ─── QUESTION SET ──────────────────────────────────────────────────────────────
//

/// A draft the set builder refused, paired with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedDraft {
    pub id: QuestionId,
    pub error: QuestionError,
}

/// The immutable, time-ordered sequence of questions for one session.
///
/// Ordering is by `(trigger_at, order)` with the catalog's arrival order as
/// the final tie-break, so two questions sharing a timestamp still fire one
/// at a time, in list order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuestionSet {
    questions: Vec<Question>,
    by_id: HashMap<QuestionId, usize>,
    max_score: u32,
}

impl QuestionSet {
    /// Builds the set from raw catalog drafts.
    ///
    /// Malformed drafts and duplicate ids are excluded rather than failing
    /// the whole build; each exclusion is reported in the returned list and
    /// the session proceeds with the accepted questions. `max_score` is the
    /// sum of points over the accepted questions only. An empty result is
    /// legal: a video without questions completes on media end alone.
    #[must_use]
    pub fn from_drafts(drafts: Vec<QuestionDraft>) -> (Self, Vec<RejectedDraft>) {
        let mut accepted: Vec<Question> = Vec::with_capacity(drafts.len());
        let mut rejected = Vec::new();

        for draft in drafts {
            let id = draft.id;
            match draft.validate() {
                Ok(question) => {
                    if accepted.iter().any(|q| q.id() == id) {
                        rejected.push(RejectedDraft {
                            id,
                            error: QuestionError::DuplicateId(id),
                        });
                    } else {
                        accepted.push(question);
                    }
                }
                Err(error) => rejected.push(RejectedDraft { id, error }),
            }
        }

        // Stable sort: equal (trigger_at, order) keys keep arrival order.
        accepted.sort_by(|a, b| {
            a.trigger_at()
                .total_cmp(&b.trigger_at())
                .then(a.order().cmp(&b.order()))
        });

        let by_id = accepted
            .iter()
            .enumerate()
            .map(|(i, q)| (q.id(), i))
            .collect();
        let max_score = accepted.iter().map(Question::points).sum();

        (
            Self {
                questions: accepted,
                by_id,
                max_score,
            },
            rejected,
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Sum of points over all accepted questions, fixed at build time.
    #[must_use]
    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    /// Question at a scan-cursor index, in trigger order.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.by_id.get(&id).map(|&i| &self.questions[i])
    }

    #[must_use]
    pub fn contains(&self, id: QuestionId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Index of the first question with `trigger_at >= position`; equals
    /// `len()` when every question lies before the position. This is the
    /// cursor realignment point after a seek.
    #[must_use]
    pub fn first_at_or_after(&self, position: f64) -> usize {
        self.questions.partition_point(|q| q.trigger_at() < position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
