#![forbid(unsafe_code)]

//! Playback-synchronization engine for timestamped in-video questions.
//!
//! A [`PlaybackCoordinator`] consumes position reports, seek requests and
//! the `ended` signal from a media source, interrupts playback when a
//! question's timestamp is reached, grades submissions, and latches
//! completion exactly once. [`PlayerLoopService`] layers a progress store
//! on top for answer history and the durable completion checkpoint.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod latch;
pub mod media;
pub mod scheduler;
pub mod seek_guard;
pub mod session;
pub mod workflow;

pub use cue_core::Clock;

pub use config::{CompletionMode, ConfigError, EngineConfig};
pub use coordinator::{PlaybackCoordinator, SeekOutcome};
pub use error::EngineError;
pub use events::EngineEvent;
pub use latch::CompletionLatch;
pub use media::{MediaCommand, MediaController, RecordingMedia};
pub use scheduler::TriggerScheduler;
pub use seek_guard::{SeekCheck, SeekGuard};
pub use session::{QuestionStatus, SessionProgress, SessionState};
pub use workflow::PlayerLoopService;
