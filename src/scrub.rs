//! Seek-bar drag state.
//!
//! A drag previews a time without seeking. Only the release commits an exact
//! seek, so the engine sees one request per drag.

use crate::engine::SeekRequest;

/// Seek-bar state. While dragging, the bar value is local and the engine is
/// only told about the final position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrubState {
    pub progress: f64,
    pub dragging: bool,
}

impl ScrubState {
    /// Follows playback when the user is not holding the bar.
    pub fn sync(&mut self, progress: f64) {
        if !self.dragging {
            self.progress = progress;
        }
    }

    /// Drag moved. Returns the previewed time if the duration is known.
    pub fn drag(&mut self, value: f64, duration: f64) -> Option<f64> {
        self.dragging = true;
        self.progress = value.clamp(0.0, 1.0);
        duration
            .is_finite()
            .then(|| self.progress * duration)
    }

    /// Drag released. Returns the exact seek to commit, if the duration is
    /// known.
    pub fn release(&mut self, value: f64, duration: f64) -> Option<SeekRequest> {
        self.dragging = false;
        self.progress = value.clamp(0.0, 1.0);
        duration
            .is_finite()
            .then(|| SeekRequest::exact(self.progress * duration))
    }
}
