use std::sync::{Arc, Mutex, PoisonError};

/// Commands the engine issues to the external media source.
///
/// These are fire-and-forget: buffering stalls, load errors and other media
/// failures stay the media layer's concern and never surface as engine
/// errors. The engine simply stops receiving position reports until the
/// source recovers.
pub trait MediaController: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn seek_to(&self, seconds: f64);
}

/// One recorded media command, for assertions in tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaCommand {
    Play,
    Pause,
    SeekTo(f64),
}

/// A `MediaController` that records the commands it receives.
///
/// Ships for embedders' tests and prototyping, next to
/// `progress::InMemoryProgressStore`.
#[derive(Clone, Default)]
pub struct RecordingMedia {
    commands: Arc<Mutex<Vec<MediaCommand>>>,
}

impl RecordingMedia {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the commands issued so far, in order.
    #[must_use]
    pub fn commands(&self) -> Vec<MediaCommand> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, command: MediaCommand) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }
}

impl MediaController for RecordingMedia {
    fn play(&self) {
        self.record(MediaCommand::Play);
    }

    fn pause(&self) {
        self.record(MediaCommand::Pause);
    }

    fn seek_to(&self, seconds: f64) {
        self.record(MediaCommand::SeekTo(seconds));
    }
}
