//! FFmpeg-backed [`MediaEngine`].
//!
//! Decoding, demuxing and audio output all live on one decoder thread that
//! opens the media after construction, so a slow or broken source never
//! blocks the caller. A second thread delivers periodic position signals.

mod audio;
mod decoder;

use super::{
    EngineSignal, Frame, MediaEngine, SeekCompletion, SeekRequest, SignalKind, SignalSink,
    SubscriptionId,
};
use crate::config::EngineOptions;
use crate::status::TimeControlStatus;
use crate::Error;
use audio::AudioRingBuffer;
use crossbeam_channel::{bounded, SendError, Sender};
use decoder::DecoderCommand;
use ffmpeg_next as ffmpeg;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const TICKER_GRANULARITY: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy)]
pub(crate) struct StreamInfo {
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// `None` for sources without a container duration.
    pub(crate) duration: Option<Duration>,
}

impl StreamInfo {
    /// Duration in seconds, `f64::INFINITY` when the source has none.
    pub(crate) fn duration_seconds(&self) -> f64 {
        self.duration
            .map_or(f64::INFINITY, |duration| duration.as_secs_f64())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct TimedFrame {
    pub(crate) frame: Frame,
    pub(crate) timestamp: Duration,
}

/// Wall clock for streams without audio. Stops while paused.
#[derive(Debug)]
pub(crate) struct PlaybackClock {
    base: Duration,
    started: Option<Instant>,
}

impl PlaybackClock {
    fn new() -> Self {
        Self {
            base: Duration::ZERO,
            started: None,
        }
    }

    pub(crate) fn now(&self) -> Duration {
        self.base + self.started.map_or(Duration::ZERO, |at| at.elapsed())
    }

    pub(crate) fn pause(&mut self) {
        self.base = self.now();
        self.started = None;
    }

    pub(crate) fn resume(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    pub(crate) fn reset(&mut self, at: Duration) {
        self.base = at;
        if self.started.is_some() {
            self.started = Some(Instant::now());
        }
    }

    /// Keeps the current reading and sets whether it advances from here.
    pub(crate) fn restart(&mut self, running: bool) {
        self.base = self.now();
        self.started = running.then(Instant::now);
    }
}

struct Subscriber {
    id: SubscriptionId,
    kind: SignalKind,
    sink: SignalSink,
    next_tick: Instant,
}

/// State shared by the engine handle, the decoder thread, the ticker thread
/// and the audio callback.
pub(crate) struct Shared {
    pub(crate) frame: Mutex<Option<Frame>>,
    pub(crate) frame_buffer: Mutex<VecDeque<TimedFrame>>,
    pub(crate) frame_buffer_capacity: usize,

    pub(crate) audio_ring: Mutex<AudioRingBuffer>,
    pub(crate) audio_base: Mutex<Duration>,
    pub(crate) samples_played: AtomicU64,
    pub(crate) sample_rate: AtomicU32,
    pub(crate) has_audio: AtomicBool,

    pub(crate) clock: Mutex<PlaybackClock>,
    pub(crate) is_paused: AtomicBool,
    pub(crate) buffering: AtomicBool,
    pub(crate) is_eos: AtomicBool,
    pub(crate) finished: AtomicBool,
    pub(crate) alive: AtomicBool,

    pub(crate) volume: Mutex<f32>,
    pub(crate) muted: AtomicBool,

    pub(crate) info: Mutex<Option<StreamInfo>>,
    time_control: Mutex<TimeControlStatus>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl Shared {
    fn new(options: &EngineOptions) -> Self {
        Self {
            frame: Mutex::new(None),
            frame_buffer: Mutex::new(VecDeque::with_capacity(options.frame_buffer_capacity())),
            frame_buffer_capacity: options.frame_buffer_capacity(),
            audio_ring: Mutex::new(AudioRingBuffer::new(48_000 * 2 * 2)),
            audio_base: Mutex::new(Duration::ZERO),
            samples_played: AtomicU64::new(0),
            sample_rate: AtomicU32::new(48_000),
            has_audio: AtomicBool::new(false),
            clock: Mutex::new(PlaybackClock::new()),
            is_paused: AtomicBool::new(true),
            buffering: AtomicBool::new(true),
            is_eos: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            volume: Mutex::new(1.0),
            muted: AtomicBool::new(false),
            info: Mutex::new(None),
            time_control: Mutex::new(TimeControlStatus::Paused),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn duration(&self) -> Option<Duration> {
        self.info.lock().and_then(|info| info.duration)
    }

    /// The master clock: audio samples played when there is audio, the wall
    /// clock otherwise. Pinned to the duration once playback finished.
    pub(crate) fn position(&self) -> Duration {
        if self.finished.load(Ordering::Acquire) {
            if let Some(duration) = self.duration() {
                return duration;
            }
        }
        if self.has_audio.load(Ordering::Acquire) {
            let played = self.samples_played.load(Ordering::Acquire);
            let rate = self.sample_rate.load(Ordering::Acquire).max(1);
            *self.audio_base.lock()
                + Duration::from_secs_f64(played as f64 / (rate as f64 * audio::CHANNELS as f64))
        } else {
            self.clock.lock().now()
        }
    }

    /// Moves every clock to `at` and drops everything buffered.
    pub(crate) fn reset_to(&self, at: Duration) {
        self.is_eos.store(false, Ordering::Release);
        self.finished.store(false, Ordering::Release);
        self.frame_buffer.lock().clear();
        self.audio_ring.lock().clear();
        self.samples_played.store(0, Ordering::Release);
        *self.audio_base.lock() = at;
        self.clock.lock().reset(at);
    }

    pub(crate) fn set_time_control(&self, status: TimeControlStatus) {
        {
            let mut current = self.time_control.lock();
            if *current == status {
                return;
            }
            *current = status;
        }
        self.emit(EngineSignal::TimeControl(status));
    }

    pub(crate) fn emit(&self, signal: EngineSignal) {
        self.subscribers.lock().retain(|subscriber| {
            if !signal.kind_matches(subscriber.kind) {
                return true;
            }
            subscriber.sink.unbounded_send(signal).is_ok()
        });
    }

    pub(crate) fn emit_position(&self) {
        let seconds = self.position().as_secs_f64();
        self.emit(EngineSignal::PeriodicTime(seconds));
    }

    /// Sends the position to periodic subscribers that are due. A paused
    /// engine sends nothing; pause and seek edges emit the position once.
    fn tick(&self, now: Instant) {
        if self.is_paused.load(Ordering::Acquire) {
            return;
        }
        let mut position = None;
        self.subscribers.lock().retain_mut(|subscriber| {
            let SignalKind::PeriodicTime { interval } = subscriber.kind else {
                return true;
            };
            if now < subscriber.next_tick {
                return true;
            }
            subscriber.next_tick = now + interval;
            let seconds = *position.get_or_insert_with(|| self.position().as_secs_f64());
            subscriber
                .sink
                .unbounded_send(EngineSignal::PeriodicTime(seconds))
                .is_ok()
        });
    }
}

pub struct FfmpegEngine {
    shared: Arc<Shared>,
    command_tx: Sender<DecoderCommand>,
    decoder_thread: Mutex<Option<JoinHandle<()>>>,
    ticker_thread: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for FfmpegEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegEngine")
            .field("info", &*self.shared.info.lock())
            .field("paused", &self.shared.is_paused.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl FfmpegEngine {
    /// Starts loading `uri`. Load success or failure is reported through
    /// [`SignalKind::LoadStatus`].
    pub fn open(uri: &url::Url, options: EngineOptions) -> Result<Arc<Self>, Error> {
        ffmpeg::init().map_err(|_| Error::Init)?;

        let path = if uri.scheme() == "file" {
            uri.to_file_path()
                .map_err(|_| Error::Uri(uri.to_string()))?
                .to_string_lossy()
                .into_owned()
        } else {
            uri.as_str().to_string()
        };

        let shared = Arc::new(Shared::new(&options));
        let (command_tx, command_rx) = bounded(100);

        let decoder_shared = Arc::clone(&shared);
        let decoder_thread = std::thread::Builder::new()
            .name("ffmpeg-decoder".into())
            .spawn(move || decoder::run(path, decoder_shared, command_rx, options))?;

        let ticker_shared = Arc::clone(&shared);
        let ticker_thread = std::thread::Builder::new()
            .name("ffmpeg-ticker".into())
            .spawn(move || {
                while ticker_shared.alive.load(Ordering::Acquire) {
                    ticker_shared.tick(Instant::now());
                    std::thread::sleep(TICKER_GRANULARITY);
                }
            })?;

        Ok(Arc::new(Self {
            shared,
            command_tx,
            decoder_thread: Mutex::new(Some(decoder_thread)),
            ticker_thread: Mutex::new(Some(ticker_thread)),
        }))
    }

    pub fn duration(&self) -> Option<Duration> {
        self.shared.duration()
    }

    pub fn position(&self) -> Duration {
        self.shared.position()
    }

    pub fn buffered_len(&self) -> usize {
        self.shared.frame_buffer.lock().len()
    }
}

impl MediaEngine for FfmpegEngine {
    fn play(&self) {
        if self.shared.finished.load(Ordering::Acquire) {
            log::debug!("Play ignored at end of stream");
            return;
        }
        let was_paused = self.shared.is_paused.swap(false, Ordering::AcqRel);
        let buffering = self.shared.buffering.load(Ordering::Acquire);
        if was_paused {
            log::info!("Resuming playback");
            if !buffering {
                self.shared.clock.lock().resume();
            }
        }
        let loaded = self.shared.info.lock().is_some();
        if loaded && !buffering {
            self.shared.set_time_control(TimeControlStatus::Playing);
        } else {
            self.shared.set_time_control(TimeControlStatus::WaitingToPlay);
        }
    }

    fn pause(&self) {
        if !self.shared.is_paused.swap(true, Ordering::AcqRel) {
            log::info!("Pausing playback");
            self.shared.clock.lock().pause();
            self.shared.emit_position();
        }
        self.shared.set_time_control(TimeControlStatus::Paused);
    }

    fn seek(&self, request: SeekRequest, completion: SeekCompletion) {
        if let Err(SendError(command)) = self.command_tx.send(DecoderCommand::Seek {
            request,
            completion,
        }) {
            log::warn!("Decoder gone, seek to {:.2}s dropped", request.target);
            command.fail();
        }
    }

    fn is_muted(&self) -> bool {
        self.shared.muted.load(Ordering::Acquire)
    }

    fn set_muted(&self, muted: bool) {
        self.shared.muted.store(muted, Ordering::Release);
    }

    fn volume(&self) -> f32 {
        *self.shared.volume.lock()
    }

    fn set_volume(&self, volume: f32) {
        *self.shared.volume.lock() = volume.clamp(0.0, 1.0);
    }

    fn subscribe(&self, kind: SignalKind, sink: SignalSink) -> SubscriptionId {
        let id = SubscriptionId::next();
        if kind == SignalKind::ItemDuration {
            if let Some(info) = *self.shared.info.lock() {
                let _ = sink.unbounded_send(EngineSignal::DurationChanged(info.duration_seconds()));
            }
        }
        self.shared.subscribers.lock().push(Subscriber {
            id,
            kind,
            sink,
            next_tick: Instant::now(),
        });
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.shared
            .subscribers
            .lock()
            .retain(|subscriber| subscriber.id != id);
    }

    fn current_frame(&self) -> Option<Frame> {
        self.shared.frame.lock().clone()
    }

    fn natural_size(&self) -> (u32, u32) {
        self.shared
            .info
            .lock()
            .map_or((0, 0), |info| (info.width, info.height))
    }
}

impl Drop for FfmpegEngine {
    fn drop(&mut self) {
        self.shared.alive.store(false, Ordering::Release);
        let _ = self.command_tx.send(DecoderCommand::Stop);

        let workers = [
            self.decoder_thread.lock().take(),
            self.ticker_thread.lock().take(),
        ];
        for worker in workers.into_iter().flatten() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_stops_while_paused() {
        let mut clock = PlaybackClock::new();
        assert_eq!(clock.now(), Duration::ZERO);

        clock.reset(Duration::from_secs(30));
        assert_eq!(clock.now(), Duration::from_secs(30));

        clock.resume();
        std::thread::sleep(Duration::from_millis(20));
        clock.pause();
        let paused_at = clock.now();
        assert!(paused_at >= Duration::from_millis(30_020));

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(clock.now(), paused_at);
    }

    #[test]
    fn emit_routes_by_kind_and_drops_closed_sinks() {
        let shared = Shared::new(&EngineOptions::default());
        let (status_tx, mut status_rx) = futures::channel::mpsc::unbounded();
        let (closed_tx, closed_rx) = futures::channel::mpsc::unbounded();
        drop(closed_rx);

        for (kind, sink) in [
            (SignalKind::TimeControl, status_tx),
            (SignalKind::TimeControl, closed_tx),
        ] {
            shared.subscribers.lock().push(Subscriber {
                id: SubscriptionId::next(),
                kind,
                sink,
                next_tick: Instant::now(),
            });
        }

        shared.set_time_control(TimeControlStatus::Playing);
        shared.set_time_control(TimeControlStatus::Playing);
        shared.emit(EngineSignal::DurationChanged(1.0));

        assert_eq!(
            status_rx.try_recv().ok(),
            Some(EngineSignal::TimeControl(TimeControlStatus::Playing))
        );
        assert!(status_rx.try_recv().is_err());
        assert_eq!(shared.subscribers.lock().len(), 1);
    }

    #[test]
    fn finished_position_is_pinned_to_duration() {
        let shared = Shared::new(&EngineOptions::default());
        *shared.info.lock() = Some(StreamInfo {
            width: 16,
            height: 16,
            duration: Some(Duration::from_secs(120)),
        });
        shared.finished.store(true, Ordering::Release);
        assert_eq!(shared.position(), Duration::from_secs(120));

        shared.reset_to(Duration::from_secs(3));
        assert_eq!(shared.position(), Duration::from_secs(3));
    }

    #[test]
    fn unknown_duration_is_indefinite() {
        let shared = Shared::new(&EngineOptions::default());
        let info = StreamInfo {
            width: 16,
            height: 16,
            duration: None,
        };
        *shared.info.lock() = Some(info);
        assert!(info.duration_seconds().is_infinite());
        assert_eq!(shared.duration(), None);

        shared.reset_to(Duration::from_secs(7));
        shared.finished.store(true, Ordering::Release);
        assert_eq!(shared.position(), Duration::from_secs(7));
    }

    #[test]
    fn ticks_only_while_playing() {
        let shared = Shared::new(&EngineOptions::default());
        let (tx, mut rx) = futures::channel::mpsc::unbounded();
        shared.subscribers.lock().push(Subscriber {
            id: SubscriptionId::next(),
            kind: SignalKind::PeriodicTime {
                interval: Duration::from_millis(500),
            },
            sink: tx,
            next_tick: Instant::now(),
        });

        shared.tick(Instant::now());
        assert!(rx.try_recv().is_err());

        shared.is_paused.store(false, Ordering::Release);
        shared.tick(Instant::now());
        assert_eq!(rx.try_recv().ok(), Some(EngineSignal::PeriodicTime(0.0)));
    }
}
