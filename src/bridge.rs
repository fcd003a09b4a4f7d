//! Bridges engine signals into an observable playback snapshot.
//!
//! The engine may emit from any thread. Signals are queued on a channel and
//! only applied by whoever owns the bridge, which in the view is the UI
//! context, so a render never sees a half-applied update.

use crate::engine::{
    EngineSignal, MediaEngine, SignalKind, SignalSink, SignalStream, SubscriptionId, TICK_INTERVAL,
};
use crate::status::{LoadStatus, PlaybackStatus};
use crate::Error;
use futures::channel::mpsc;
use std::path::Path;
use std::sync::Arc;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    /// Seconds.
    pub current_time: f64,
    /// Seconds, `f64::INFINITY` until resolved.
    pub duration: f64,
    pub muted: bool,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            status: PlaybackStatus::None,
            current_time: 0.0,
            duration: f64::INFINITY,
            muted: false,
        }
    }
}

impl PlaybackSnapshot {
    pub fn has_duration(&self) -> bool {
        self.duration.is_finite()
    }

    pub fn is_at_end(&self) -> bool {
        self.current_time >= self.duration
    }

    /// Playhead as a fraction of the duration, zero while unresolved.
    pub fn progress(&self) -> f64 {
        if self.has_duration() && self.duration > 0.0 && self.current_time.is_finite() {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

pub struct PlaybackBridge {
    engine: Option<Arc<dyn MediaEngine>>,
    source_error: Option<Error>,
    snapshot: PlaybackSnapshot,
    history: Vec<PlaybackStatus>,
    sink: SignalSink,
    signals: Option<SignalStream>,
    subscriptions: Vec<SubscriptionId>,
    duration_subscription: Option<SubscriptionId>,
    playhead_held: bool,
}

impl PlaybackBridge {
    /// Opens `url` with the FFmpeg engine. A URL that cannot be parsed or an
    /// engine that cannot start leaves the bridge without an engine; its
    /// status then stays `None` and the cause is kept in
    /// [`source_error`](Self::source_error).
    #[cfg(feature = "ffmpeg")]
    pub fn open(url: &str, options: &crate::config::EngineOptions) -> Self {
        use crate::engine::ffmpeg::FfmpegEngine;

        let opened = parse_media_url(url)
            .and_then(|parsed| FfmpegEngine::open(&parsed, options.clone()));
        match opened {
            Ok(engine) => Self::with_engine(Some(engine as Arc<dyn MediaEngine>)),
            Err(e) => {
                log::warn!("No engine for {}: {}", url, e);
                Self::unavailable(e)
            }
        }
    }

    pub fn with_engine(engine: Option<Arc<dyn MediaEngine>>) -> Self {
        let (sink, signals) = mpsc::unbounded();
        let mut bridge = Self {
            engine,
            source_error: None,
            snapshot: PlaybackSnapshot::default(),
            history: vec![PlaybackStatus::None],
            sink,
            signals: Some(signals),
            subscriptions: Vec::new(),
            duration_subscription: None,
            playhead_held: false,
        };

        if let Some(engine) = bridge.engine.clone() {
            for kind in [
                SignalKind::LoadStatus,
                SignalKind::TimeControl,
                SignalKind::PeriodicTime {
                    interval: TICK_INTERVAL,
                },
            ] {
                let id = engine.subscribe(kind, bridge.sink.clone());
                bridge.subscriptions.push(id);
            }
            bridge.snapshot.muted = engine.is_muted();
        }

        bridge
    }

    /// A bridge with no engine, remembering why.
    pub fn unavailable(error: Error) -> Self {
        let mut bridge = Self::with_engine(None);
        bridge.source_error = Some(error);
        bridge
    }

    pub fn snapshot(&self) -> &PlaybackSnapshot {
        &self.snapshot
    }

    pub fn status(&self) -> PlaybackStatus {
        self.snapshot.status
    }

    /// Every distinct status published so far, starting with `None`.
    pub fn status_history(&self) -> &[PlaybackStatus] {
        &self.history
    }

    pub fn engine(&self) -> Option<&Arc<dyn MediaEngine>> {
        self.engine.as_ref()
    }

    pub fn source_error(&self) -> Option<&Error> {
        self.source_error.as_ref()
    }

    /// Hands the signal stream to an async UI loop that feeds
    /// [`apply`](Self::apply). After this [`pump`](Self::pump) is a no-op.
    pub fn take_signals(&mut self) -> Option<SignalStream> {
        self.signals.take()
    }

    /// Applies every queued signal. Returns whether the snapshot changed.
    pub fn pump(&mut self) -> bool {
        let mut pending = Vec::new();
        if let Some(signals) = self.signals.as_mut() {
            while let Ok(signal) = signals.try_recv() {
                pending.push(signal);
            }
        }
        pending
            .into_iter()
            .fold(false, |changed, signal| self.apply(signal) || changed)
    }

    /// Applies one engine signal. Must run on the UI context.
    pub fn apply(&mut self, signal: EngineSignal) -> bool {
        match signal {
            EngineSignal::LoadStatus(load) => {
                let next = self.snapshot.status.on_load_status(load);
                if load == LoadStatus::ReadyToPlay && next == PlaybackStatus::ReadyToPlay {
                    self.observe_duration();
                }
                self.publish_status(next)
            }
            EngineSignal::TimeControl(control) => {
                let next = self.snapshot.status.on_time_control(control);
                self.publish_status(next)
            }
            EngineSignal::DurationChanged(seconds) => {
                if self.duration_subscription.is_none() {
                    return false;
                }
                let duration = if seconds.is_finite() && seconds >= 0.0 {
                    seconds
                } else {
                    f64::INFINITY
                };
                if duration == self.snapshot.duration {
                    return false;
                }
                log::debug!("Duration resolved to {:.2}s", duration);
                self.snapshot.duration = duration;
                true
            }
            EngineSignal::PeriodicTime(seconds) => {
                if self.playhead_held || seconds == self.snapshot.current_time {
                    return false;
                }
                self.snapshot.current_time = seconds;
                true
            }
        }
    }

    /// Sets the engine mute flag and publishes what the engine reports back,
    /// which may differ from the request.
    pub fn set_muted(&mut self, muted: bool) {
        match &self.engine {
            Some(engine) => {
                engine.set_muted(muted);
                self.snapshot.muted = engine.is_muted();
            }
            None => self.snapshot.muted = false,
        }
    }

    /// Moves the published playhead without seeking, for scrub previews.
    pub fn preview_time(&mut self, seconds: f64) {
        self.snapshot.current_time = seconds;
    }

    /// While held, periodic time signals are dropped and the playhead only
    /// moves through [`preview_time`](Self::preview_time).
    pub fn hold_playhead(&mut self, held: bool) {
        self.playhead_held = held;
    }

    pub fn is_playhead_held(&self) -> bool {
        self.playhead_held
    }

    fn observe_duration(&mut self) {
        if self.duration_subscription.is_some() {
            return;
        }
        if let Some(engine) = &self.engine {
            let id = engine.subscribe(SignalKind::ItemDuration, self.sink.clone());
            self.duration_subscription = Some(id);
            self.subscriptions.push(id);
        }
    }

    fn publish_status(&mut self, next: PlaybackStatus) -> bool {
        if next == self.snapshot.status {
            return false;
        }
        log::info!("Playback status {:?} -> {:?}", self.snapshot.status, next);
        self.snapshot.status = next;
        self.history.push(next);
        true
    }
}

impl Drop for PlaybackBridge {
    fn drop(&mut self) {
        if let Some(engine) = &self.engine {
            for id in self.subscriptions.drain(..) {
                engine.unsubscribe(id);
            }
        }
    }
}

/// Parses a media location. Absolute filesystem paths become `file://` URLs.
pub fn parse_media_url(source: &str) -> Result<Url, Error> {
    match Url::parse(source) {
        Ok(url) => Ok(url),
        Err(_) if Path::new(source).is_absolute() => {
            Url::from_file_path(source).map_err(|_| Error::Uri(source.to_string()))
        }
        Err(_) => Err(Error::Uri(source.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_starts_unresolved() {
        let snapshot = PlaybackSnapshot::default();
        assert_eq!(snapshot.status, PlaybackStatus::None);
        assert!(!snapshot.has_duration());
        assert!(!snapshot.is_at_end());
        assert_eq!(snapshot.progress(), 0.0);
    }

    #[test]
    fn progress_is_clamped() {
        let snapshot = PlaybackSnapshot {
            current_time: 125.0,
            duration: 120.0,
            ..Default::default()
        };
        assert!(snapshot.is_at_end());
        assert_eq!(snapshot.progress(), 1.0);
    }

    #[test]
    fn media_urls() {
        assert!(parse_media_url("https://example.com/a.mp4").is_ok());
        assert!(matches!(parse_media_url("not a url"), Err(Error::Uri(_))));
        #[cfg(unix)]
        assert_eq!(
            parse_media_url("/tmp/clip.mp4").map(|u| u.scheme().to_string()).ok(),
            Some("file".to_string())
        );
    }

    #[test]
    fn engineless_bridge_never_leaves_none() {
        let mut bridge = PlaybackBridge::unavailable(Error::Uri("::".into()));
        assert!(!bridge.pump());
        bridge.set_muted(true);
        assert!(!bridge.snapshot().muted);
        assert_eq!(bridge.status(), PlaybackStatus::None);
        assert!(bridge.source_error().is_some());
    }
}
