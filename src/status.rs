//! Playback status and the transitions driven by engine signals.

/// Load state of the media item, as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Unknown,
    ReadyToPlay,
    Failed,
}

/// Whether the engine is advancing the playhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeControlStatus {
    Playing,
    Paused,
    /// Play was requested but the engine is buffering.
    WaitingToPlay,
    /// A state the engine reports but this crate does not model.
    Unknown,
    /// The engine has no item to control.
    Unavailable,
}

/// Status published by [`PlaybackBridge`](crate::PlaybackBridge).
///
/// `Failed` is sticky: once entered, no later signal leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    None,
    ReadyToPlay,
    Failed,
    Playing,
    Paused,
}

impl PlaybackStatus {
    pub fn on_load_status(self, load: LoadStatus) -> Self {
        if self == PlaybackStatus::Failed {
            return self;
        }
        match load {
            LoadStatus::ReadyToPlay => PlaybackStatus::ReadyToPlay,
            LoadStatus::Failed => PlaybackStatus::Failed,
            LoadStatus::Unknown => PlaybackStatus::None,
        }
    }

    pub fn on_time_control(self, control: TimeControlStatus) -> Self {
        if self == PlaybackStatus::Failed {
            return self;
        }
        match control {
            TimeControlStatus::Playing => PlaybackStatus::Playing,
            TimeControlStatus::Paused
            | TimeControlStatus::WaitingToPlay
            | TimeControlStatus::Unknown => PlaybackStatus::Paused,
            TimeControlStatus::Unavailable => PlaybackStatus::None,
        }
    }

    /// Live video is showing and the transport controls accept input.
    pub fn is_live(self) -> bool {
        matches!(self, PlaybackStatus::Playing | PlaybackStatus::Paused)
    }
}
