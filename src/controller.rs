//! Gesture handling for the player chrome, independent of any UI toolkit.
//!
//! Commands go straight to the engine. Observed state comes from the
//! [`PlaybackBridge`]. Methods that take `now` may move the controls dismiss
//! deadline; the caller schedules a wake-up for
//! [`ControlsVisibility::deadline`].

use crate::bridge::{PlaybackBridge, PlaybackSnapshot};
use crate::config::ChromeOptions;
use crate::controls::ControlsVisibility;
use crate::engine::{seek_async, EngineSignal, SeekRequest, SeekTicket};
use crate::format::{duration_text, elapsed_text};
use crate::scrub::ScrubState;
use crate::status::PlaybackStatus;
use crate::transport::{play_action, skip_request, PlayAction, SkipDirection};
use crate::volume::VolumeControl;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterSeek {
    Play,
    Nothing,
}

/// A seek in flight. Await `ticket`, then report back through
/// [`PlayerController::seek_finished`].
pub struct PendingSeek {
    pub ticket: SeekTicket,
    pub target: f64,
    pub then: AfterSeek,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryContent {
    Disabled,
    Loading,
    Cover(String),
    Placeholder,
    Failed,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayIcon {
    Play,
    Pause,
    Replay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerIcon {
    On,
    Muted,
}

/// Everything the view needs to draw one frame of chrome.
#[derive(Debug, Clone, PartialEq)]
pub struct Chrome {
    pub primary: PrimaryContent,
    pub overlay_visible: bool,
    pub controls_interactive: bool,
    pub play_icon: PlayIcon,
    pub skip_visible: bool,
    pub elapsed: String,
    pub duration: String,
    pub progress: f32,
    pub speaker: SpeakerIcon,
    pub volume_slider_visible: bool,
    pub volume: f32,
    pub show_back_button: bool,
}

pub struct PlayerController {
    bridge: PlaybackBridge,
    options: ChromeOptions,
    controls: ControlsVisibility,
    scrub: ScrubState,
    volume: VolumeControl,
    disabled: bool,
    autoplayed: bool,
    last_seek_failure: Option<f64>,
}

impl PlayerController {
    pub fn new(bridge: PlaybackBridge, options: ChromeOptions) -> Self {
        let volume = VolumeControl::new(bridge.engine().map_or(1.0, |engine| engine.volume()));
        Self {
            controls: ControlsVisibility::new(options.dismiss_delay),
            bridge,
            options,
            scrub: ScrubState::default(),
            volume,
            disabled: false,
            autoplayed: false,
            last_seek_failure: None,
        }
    }

    pub fn bridge(&self) -> &PlaybackBridge {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut PlaybackBridge {
        &mut self.bridge
    }

    pub fn snapshot(&self) -> &PlaybackSnapshot {
        self.bridge.snapshot()
    }

    pub fn controls(&self) -> &ControlsVisibility {
        &self.controls
    }

    pub fn scrub(&self) -> &ScrubState {
        &self.scrub
    }

    pub fn volume(&self) -> &VolumeControl {
        &self.volume
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Target of the most recent seek that failed, cleared by a later
    /// successful one.
    pub fn last_seek_failure(&self) -> Option<f64> {
        self.last_seek_failure
    }

    pub fn controls_interactive(&self) -> bool {
        !self.disabled && self.bridge.status().is_live()
    }

    pub fn handle_signal(&mut self, signal: EngineSignal) -> bool {
        let changed = self.bridge.apply(signal);
        self.after_signals();
        changed
    }

    /// Applies every signal queued on the bridge.
    pub fn pump(&mut self) -> bool {
        let changed = self.bridge.pump();
        self.after_signals();
        changed
    }

    fn after_signals(&mut self) {
        self.scrub.sync(self.bridge.snapshot().progress());

        if self.options.autoplay
            && !self.autoplayed
            && !self.disabled
            && self.bridge.status() == PlaybackStatus::ReadyToPlay
        {
            self.autoplayed = true;
            if let Some(engine) = self.bridge.engine() {
                log::debug!("Autoplay");
                engine.play();
            }
        }
    }

    /// Tap outside the buttons.
    pub fn tap(&mut self, now: Instant) {
        if !self.disabled
            && !self.options.autoplay
            && self.bridge.status() == PlaybackStatus::ReadyToPlay
        {
            if let Some(engine) = self.bridge.engine() {
                engine.play();
            }
        }
        self.controls.toggle(now);
    }

    pub fn skip(&mut self, direction: SkipDirection, now: Instant) -> Option<PendingSeek> {
        if !self.controls_interactive() {
            return None;
        }
        self.controls.restart(now);
        let request = skip_request(self.bridge.snapshot(), direction);
        self.start_seek(request, AfterSeek::Nothing)
    }

    pub fn toggle_playback(&mut self, now: Instant) -> Option<PendingSeek> {
        if !self.controls_interactive() {
            return None;
        }
        self.controls.restart(now);
        let engine = self.bridge.engine()?;
        match play_action(self.bridge.snapshot()) {
            PlayAction::Pause => {
                engine.pause();
                None
            }
            PlayAction::Play => {
                engine.play();
                None
            }
            PlayAction::Restart => self.start_seek(SeekRequest::exact(0.0), AfterSeek::Play),
        }
    }

    /// Seek bar dragged. Pauses and previews the time without seeking.
    pub fn scrub_moved(&mut self, value: f64) {
        if !self.controls_interactive() {
            return;
        }
        if let Some(engine) = self.bridge.engine() {
            engine.pause();
        }
        self.controls.cancel();
        self.bridge.hold_playhead(true);
        if let Some(time) = self.scrub.drag(value, self.bridge.snapshot().duration) {
            self.bridge.preview_time(time);
        }
    }

    /// Seek bar released. Commits one exact seek and resumes if it lands.
    pub fn scrub_ended(&mut self, value: f64, now: Instant) -> Option<PendingSeek> {
        let request = self.scrub.release(value, self.bridge.snapshot().duration);
        self.bridge.hold_playhead(false);
        if !self.controls_interactive() {
            return None;
        }
        self.controls.restart(now);
        self.start_seek(request?, AfterSeek::Play)
    }

    pub fn speaker_tapped(&mut self, now: Instant) {
        if !self.controls_interactive() {
            return;
        }
        self.controls.cancel();
        self.controls.show_volume_slider = self
            .volume
            .tap_speaker(&mut self.bridge, self.controls.show_volume_slider);
        self.controls.restart(now);
    }

    pub fn volume_dragged(&mut self, value: f32) {
        if !self.controls_interactive() {
            return;
        }
        self.controls.cancel();
        self.volume.drag(&mut self.bridge, value);
    }

    pub fn volume_drag_ended(&mut self, value: f32, now: Instant) {
        self.volume.release(value);
        if self.controls_interactive() {
            self.controls.restart(now);
        }
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        if disabled == self.disabled {
            return;
        }
        self.disabled = disabled;
        if disabled {
            log::info!("Player disabled, pausing");
            if let Some(engine) = self.bridge.engine() {
                engine.pause();
            }
        }
    }

    /// Hides the controls if their dismiss deadline has passed.
    pub fn expire_controls(&mut self, now: Instant) -> bool {
        self.controls.expire(now)
    }

    pub fn seek_finished(&mut self, target: f64, then: AfterSeek, success: bool) {
        if !success {
            log::warn!("Seek to {:.2}s failed", target);
            self.last_seek_failure = Some(target);
            return;
        }
        self.last_seek_failure = None;
        if then == AfterSeek::Play && !self.disabled {
            if let Some(engine) = self.bridge.engine() {
                engine.play();
            }
        }
    }

    /// Pauses playback and drops the dismiss deadline.
    pub fn teardown(&mut self) {
        if let Some(engine) = self.bridge.engine() {
            engine.pause();
        }
        self.bridge.hold_playhead(false);
        self.controls.cancel();
    }

    pub fn chrome(&self) -> Chrome {
        let snapshot = self.bridge.snapshot();
        let interactive = self.controls_interactive();

        let primary = if self.disabled {
            PrimaryContent::Disabled
        } else {
            match snapshot.status {
                PlaybackStatus::None => PrimaryContent::Loading,
                PlaybackStatus::Failed => PrimaryContent::Failed,
                PlaybackStatus::ReadyToPlay => self
                    .options
                    .cover_thumbnail_url
                    .as_ref()
                    .or(self.options.cover_url.as_ref())
                    .map_or(PrimaryContent::Placeholder, |url| {
                        PrimaryContent::Cover(url.clone())
                    }),
                PlaybackStatus::Playing | PlaybackStatus::Paused => PrimaryContent::Video,
            }
        };

        let play_icon = match play_action(snapshot) {
            PlayAction::Pause => PlayIcon::Pause,
            PlayAction::Play => PlayIcon::Play,
            PlayAction::Restart => PlayIcon::Replay,
        };

        Chrome {
            primary,
            overlay_visible: self.controls.show_controls,
            controls_interactive: interactive,
            play_icon,
            skip_visible: interactive && !snapshot.is_at_end(),
            elapsed: elapsed_text(snapshot.current_time),
            duration: duration_text(snapshot.duration),
            progress: self.scrub.progress as f32,
            speaker: if snapshot.muted {
                SpeakerIcon::Muted
            } else {
                SpeakerIcon::On
            },
            volume_slider_visible: self.controls.show_volume_slider,
            volume: self.volume.value,
            show_back_button: self.options.show_back_button,
        }
    }

    fn start_seek(&self, request: SeekRequest, then: AfterSeek) -> Option<PendingSeek> {
        let engine = self.bridge.engine()?;
        log::debug!(
            "Seeking to {:.2}s (-{:.2}/+{:.2})",
            request.target,
            request.tolerance_before,
            request.tolerance_after
        );
        Some(PendingSeek {
            ticket: seek_async(engine.as_ref(), request),
            target: request.target,
            then,
        })
    }
}
