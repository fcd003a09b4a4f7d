//! Speaker button and volume slider.
//!
//! The engine mute flag decides audibility. The engine volume keeps the
//! last level, so un-muting can restore it.

use crate::bridge::PlaybackBridge;

/// Level used when un-muting and no audible level is known.
pub const FALLBACK_VOLUME: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeControl {
    /// Value shown by the slider, in `[0, 1]`.
    pub value: f32,
    last_audible: Option<f32>,
}

impl Default for VolumeControl {
    fn default() -> Self {
        Self {
            value: 1.0,
            last_audible: None,
        }
    }
}

impl VolumeControl {
    /// Starts at `value` with no remembered audible level.
    pub fn new(value: f32) -> Self {
        Self {
            value: value.clamp(0.0, 1.0),
            last_audible: None,
        }
    }

    /// Speaker tapped. A hidden slider is revealed (un-muting if needed); a
    /// visible slider toggles mute. Returns whether the slider should now be
    /// visible.
    pub fn tap_speaker(&mut self, bridge: &mut PlaybackBridge, slider_visible: bool) -> bool {
        if slider_visible {
            let muted = !bridge.snapshot().muted;
            bridge.set_muted(muted);
            if bridge.snapshot().muted {
                self.value = 0.0;
            } else {
                self.value = self.restore(bridge);
            }
        } else if bridge.snapshot().muted {
            bridge.set_muted(false);
            self.value = self.restore(bridge);
        }
        true
    }

    /// Slider dragged. Mutes exactly at zero.
    pub fn drag(&mut self, bridge: &mut PlaybackBridge, value: f32) {
        let value = value.clamp(0.0, 1.0);
        self.value = value;
        bridge.set_muted(value <= 0.0);
        if let Some(engine) = bridge.engine() {
            engine.set_volume(value);
        }
        if value > 0.0 {
            self.last_audible = Some(value);
        }
    }

    pub fn release(&mut self, value: f32) {
        self.value = value.clamp(0.0, 1.0);
    }

    fn restore(&mut self, bridge: &PlaybackBridge) -> f32 {
        let Some(engine) = bridge.engine() else {
            return FALLBACK_VOLUME;
        };
        let current = engine.volume();
        if current > 0.0 {
            return current;
        }
        let level = self.last_audible.unwrap_or(FALLBACK_VOLUME);
        engine.set_volume(level);
        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_and_forgets_the_audible_level() {
        let volume = VolumeControl::new(1.4);
        assert_eq!(volume.value, 1.0);
        assert_eq!(volume.last_audible, None);
        assert_eq!(VolumeControl::new(0.4).value, 0.4);
    }

    #[test]
    fn drag_to_zero_keeps_the_last_audible_level() {
        let mut bridge = PlaybackBridge::unavailable(crate::Error::Uri("::".into()));
        let mut volume = VolumeControl::new(1.0);
        volume.drag(&mut bridge, 0.6);
        volume.drag(&mut bridge, 0.0);
        assert_eq!(volume.value, 0.0);
        assert_eq!(volume.last_audible, Some(0.6));
    }
}
