use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{LessonId, SessionId};

//
// ─── SESSION AGGREGATE ─────────────────────────────────────────────────────────
//

/// The observable score/state totals of one playback session.
///
/// Everything here is monotonic: `score` only grows, `video_ended` and
/// `completed` only flip false→true. `max_score` is fixed when the question
/// set is built and never changes afterwards, even though malformed drafts
/// may have been excluded from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAggregate {
    session_id: SessionId,
    lesson_id: LessonId,
    score: u32,
    max_score: u32,
    video_ended: bool,
    completed: bool,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl SessionAggregate {
    /// Creates the aggregate for a freshly started session.
    #[must_use]
    pub fn new(
        session_id: SessionId,
        lesson_id: LessonId,
        max_score: u32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            lesson_id,
            score: 0,
            max_score,
            video_ended: false,
            completed: false,
            started_at,
            completed_at: None,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    /// Score as a percentage of `max_score`, defined as 0 when the session
    /// has no scorable questions (`max_score == 0`).
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.max_score == 0 {
            0.0
        } else {
            f64::from(self.score) / f64::from(self.max_score) * 100.0
        }
    }

    #[must_use]
    pub fn video_ended(&self) -> bool {
        self.video_ended
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Adds the points earned by one graded answer.
    pub fn add_points(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    /// Records the end-of-media signal. Idempotent.
    pub fn mark_video_ended(&mut self) {
        self.video_ended = true;
    }

    /// Records completion. Idempotent; `completed_at` keeps the first value.
    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        if !self.completed {
            self.completed = true;
            self.completed_at = Some(at);
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
