use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("tolerance {0} must be finite, greater than 0 and at most {MAX_TOLERANCE_SECS}")]
    InvalidTolerance(f64),
}

//
// ─── COMPLETION MODE ───────────────────────────────────────────────────────────
//

/// Which inputs the Completion Latch combines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Complete only when the media has ended AND every required question
    /// is handled. The documented default.
    #[default]
    VideoAndQuestions,
    /// Complete as soon as every required question is handled, even if the
    /// media is still playing.
    QuestionsOnly,
}

//
// ─── ENGINE CONFIG ─────────────────────────────────────────────────────────────
//

/// Default match window between a position report and a trigger timestamp.
pub const DEFAULT_TOLERANCE_SECS: f64 = 0.4;

/// Upper bound for the tolerance window.
pub const MAX_TOLERANCE_SECS: f64 = 5.0;

/// Per-session policy knobs for the synchronization engine.
///
/// The defaults are the permissive profile: free seeking, no skipping,
/// completion requires the media end plus every question in the set.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    tolerance_secs: f64,
    sequential_enforcement: bool,
    allow_skip: bool,
    require_all_questions: bool,
    completion_mode: CompletionMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            sequential_enforcement: false,
            allow_skip: false,
            require_all_questions: true,
            completion_mode: CompletionMode::default(),
        }
    }
}

impl EngineConfig {
    /// The locked-down profile: sequential enforcement on, skipping off,
    /// completion requires the media end plus every question in the set.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            sequential_enforcement: true,
            ..Self::default()
        }
    }

    /// Replaces the tolerance window used to match position reports to
    /// trigger timestamps.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidTolerance` unless
    /// `0 < secs <= MAX_TOLERANCE_SECS`.
    pub fn with_tolerance_secs(mut self, secs: f64) -> Result<Self, ConfigError> {
        if !secs.is_finite() || secs <= 0.0 || secs > MAX_TOLERANCE_SECS {
            return Err(ConfigError::InvalidTolerance(secs));
        }
        self.tolerance_secs = secs;
        Ok(self)
    }

    #[must_use]
    pub fn with_sequential_enforcement(mut self, enabled: bool) -> Self {
        self.sequential_enforcement = enabled;
        self
    }

    #[must_use]
    pub fn with_allow_skip(mut self, enabled: bool) -> Self {
        self.allow_skip = enabled;
        self
    }

    /// Whether completion counts every question in the set as required, or
    /// only the questions that were actually triggered this run.
    #[must_use]
    pub fn with_require_all_questions(mut self, enabled: bool) -> Self {
        self.require_all_questions = enabled;
        self
    }

    #[must_use]
    pub fn with_completion_mode(mut self, mode: CompletionMode) -> Self {
        self.completion_mode = mode;
        self
    }

    #[must_use]
    pub fn tolerance_secs(&self) -> f64 {
        self.tolerance_secs
    }

    #[must_use]
    pub fn sequential_enforcement(&self) -> bool {
        self.sequential_enforcement
    }

    #[must_use]
    pub fn allow_skip(&self) -> bool {
        self.allow_skip
    }

    #[must_use]
    pub fn require_all_questions(&self) -> bool {
        self.require_all_questions
    }

    #[must_use]
    pub fn completion_mode(&self) -> CompletionMode {
        self.completion_mode
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_permissive() {
        let config = EngineConfig::default();

        assert_eq!(config.tolerance_secs(), DEFAULT_TOLERANCE_SECS);
        assert!(!config.sequential_enforcement());
        assert!(!config.allow_skip());
        assert!(config.require_all_questions());
        assert_eq!(config.completion_mode(), CompletionMode::VideoAndQuestions);
    }

    #[test]
    fn strict_profile_enables_sequential_enforcement() {
        let config = EngineConfig::strict();

        assert!(config.sequential_enforcement());
        assert!(!config.allow_skip());
    }

    #[test]
    fn tolerance_is_validated() {
        assert!(EngineConfig::default().with_tolerance_secs(1.5).is_ok());

        for bad in [0.0, -1.0, MAX_TOLERANCE_SECS + 0.1, f64::NAN] {
            let err = EngineConfig::default()
                .with_tolerance_secs(bad)
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidTolerance(_)));
        }
    }
}
