//! Visibility of the control overlay and its auto-dismiss deadline.
//!
//! There is at most one deadline. Every interaction replaces it, so a burst of
//! interactions produces a single dismissal one full delay after the last.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct ControlsVisibility {
    pub show_controls: bool,
    pub show_volume_slider: bool,
    delay: Duration,
    deadline: Option<Instant>,
}

impl ControlsVisibility {
    pub fn new(delay: Duration) -> Self {
        Self {
            show_controls: true,
            show_volume_slider: false,
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Replaces any pending dismissal with one `delay` from `now`.
    pub fn restart(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Tap outside the controls.
    pub fn toggle(&mut self, now: Instant) {
        self.show_controls = !self.show_controls;
        self.show_volume_slider = false;
        if self.show_controls {
            self.restart(now);
        } else {
            self.cancel();
        }
    }

    /// Hides the overlay if the deadline has passed. Returns whether it did.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.show_controls = false;
                self.show_volume_slider = false;
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for ControlsVisibility {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_of_interactions_dismisses_once() {
        let start = Instant::now();
        let mut controls = ControlsVisibility::default();
        let mut dismissals = 0;

        let mut last = start;
        for i in 0..6 {
            last = start + Duration::from_millis(4_900 * i);
            if controls.expire(last) {
                dismissals += 1;
            }
            controls.restart(last);
        }

        assert!(!controls.expire(last + Duration::from_millis(4_999)));
        assert!(controls.show_controls);
        if controls.expire(last + Duration::from_secs(5)) {
            dismissals += 1;
        }
        assert!(!controls.expire(last + Duration::from_secs(60)));

        assert_eq!(dismissals, 1);
        assert!(!controls.show_controls);
    }

    #[test]
    fn toggle_hides_slider_and_arms_timer_only_when_shown() {
        let now = Instant::now();
        let mut controls = ControlsVisibility::default();
        controls.show_volume_slider = true;

        controls.toggle(now);
        assert!(!controls.show_controls);
        assert!(!controls.show_volume_slider);
        assert_eq!(controls.deadline(), None);

        controls.toggle(now);
        assert!(controls.show_controls);
        assert_eq!(controls.deadline(), Some(now + Duration::from_secs(5)));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let now = Instant::now();
        let mut controls = ControlsVisibility::default();
        controls.restart(now);
        controls.cancel();
        assert!(!controls.expire(now + Duration::from_secs(10)));
        assert!(controls.show_controls);
    }
}
