//! Skip and play/pause decisions.

use crate::bridge::PlaybackSnapshot;
use crate::engine::SeekRequest;
use crate::status::PlaybackStatus;

pub const SKIP_STEP: f64 = 10.0;
pub const SKIP_TOLERANCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipDirection {
    Back,
    Forward,
}

/// Seek for a ±10s skip. The target is clamped to `[0, duration]` and the
/// tolerance window never reaches past either end.
pub fn skip_request(snapshot: &PlaybackSnapshot, direction: SkipDirection) -> SeekRequest {
    let current = if snapshot.current_time.is_finite() {
        snapshot.current_time
    } else {
        0.0
    };
    let step = match direction {
        SkipDirection::Back => -SKIP_STEP,
        SkipDirection::Forward => SKIP_STEP,
    };
    let target = (current + step).min(snapshot.duration).max(0.0);

    SeekRequest {
        target,
        tolerance_before: SKIP_TOLERANCE.min(target),
        tolerance_after: SKIP_TOLERANCE.min(snapshot.duration - target).max(0.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayAction {
    Pause,
    Play,
    /// At the end: seek to zero, then play once the seek lands.
    Restart,
}

pub fn play_action(snapshot: &PlaybackSnapshot) -> PlayAction {
    if snapshot.status == PlaybackStatus::Playing {
        PlayAction::Pause
    } else if snapshot.is_at_end() {
        PlayAction::Restart
    } else {
        PlayAction::Play
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(current_time: f64, duration: f64) -> PlaybackSnapshot {
        PlaybackSnapshot {
            status: PlaybackStatus::Paused,
            current_time,
            duration,
            muted: false,
        }
    }

    #[test]
    fn skip_targets_stay_within_bounds() {
        let durations = [0.0, 4.0, 10.0, 120.0, 3661.5];
        for duration in durations {
            let mut t = 0.0;
            while t <= duration + 20.0 {
                for direction in [SkipDirection::Back, SkipDirection::Forward] {
                    let request = skip_request(&at(t, duration), direction);
                    assert!(
                        (0.0..=duration).contains(&request.target),
                        "target {} outside [0, {}] from {}",
                        request.target,
                        duration,
                        t
                    );
                    assert!(request.target - request.tolerance_before >= 0.0);
                    assert!(request.target + request.tolerance_after <= duration + 1e-9);
                }
                t += 0.75;
            }
        }
    }

    #[test]
    fn skip_tolerance_is_half_a_second_mid_stream() {
        let request = skip_request(&at(50.0, 120.0), SkipDirection::Forward);
        assert_eq!(request.target, 60.0);
        assert_eq!(request.tolerance_before, 0.5);
        assert_eq!(request.tolerance_after, 0.5);

        let request = skip_request(&at(3.0, 120.0), SkipDirection::Back);
        assert_eq!(request.target, 0.0);
        assert_eq!(request.tolerance_before, 0.0);
    }

    #[test]
    fn unresolved_duration_does_not_clamp_forward() {
        let request = skip_request(&at(5.0, f64::INFINITY), SkipDirection::Forward);
        assert_eq!(request.target, 15.0);
    }

    #[test]
    fn play_action_by_state() {
        let mut snapshot = at(30.0, 120.0);
        assert_eq!(play_action(&snapshot), PlayAction::Play);
        snapshot.status = PlaybackStatus::Playing;
        assert_eq!(play_action(&snapshot), PlayAction::Pause);
        assert_eq!(play_action(&at(125.0, 120.0)), PlayAction::Restart);
        assert_eq!(play_action(&at(120.0, 120.0)), PlayAction::Restart);
    }
}
