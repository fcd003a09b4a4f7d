//! The media engine seam.
//!
//! An engine decodes and plays media. It reports what it is doing through
//! typed signal subscriptions rather than callbacks on a shared object, and
//! it may deliver those signals from any thread.

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

use crate::status::{LoadStatus, TimeControlStatus};
use futures::channel::{mpsc, oneshot};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

/// Interval of the periodic position signal the bridge subscribes to.
pub const TICK_INTERVAL: Duration = Duration::from_millis(500);

/// A decoded picture in NV12 layout: a full-size Y plane followed by an
/// interleaved half-height UV plane, both `width` bytes per row.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
}

/// Which signal stream a subscription delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    LoadStatus,
    TimeControl,
    ItemDuration,
    PeriodicTime { interval: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineSignal {
    LoadStatus(LoadStatus),
    TimeControl(TimeControlStatus),
    /// Resolved item duration in seconds.
    DurationChanged(f64),
    /// Playhead position in seconds.
    PeriodicTime(f64),
}

impl EngineSignal {
    pub fn kind_matches(&self, kind: SignalKind) -> bool {
        matches!(
            (self, kind),
            (EngineSignal::LoadStatus(_), SignalKind::LoadStatus)
                | (EngineSignal::TimeControl(_), SignalKind::TimeControl)
                | (EngineSignal::DurationChanged(_), SignalKind::ItemDuration)
                | (EngineSignal::PeriodicTime(_), SignalKind::PeriodicTime { .. })
        )
    }
}

pub type SignalSink = mpsc::UnboundedSender<EngineSignal>;
pub type SignalStream = mpsc::UnboundedReceiver<EngineSignal>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        SubscriptionId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A seek target with the window the engine may land in, all in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekRequest {
    pub target: f64,
    pub tolerance_before: f64,
    pub tolerance_after: f64,
}

impl SeekRequest {
    /// Frame-accurate seek.
    pub fn exact(target: f64) -> Self {
        Self {
            target,
            tolerance_before: 0.0,
            tolerance_after: 0.0,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.tolerance_before <= 0.0 && self.tolerance_after <= 0.0
    }
}

/// Called once with whether the seek landed. May run on any thread.
pub type SeekCompletion = Box<dyn FnOnce(bool) + Send>;

pub trait MediaEngine: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn seek(&self, request: SeekRequest, completion: SeekCompletion);

    fn is_muted(&self) -> bool;
    fn set_muted(&self, muted: bool);
    fn volume(&self) -> f32;
    fn set_volume(&self, volume: f32);

    fn subscribe(&self, kind: SignalKind, sink: SignalSink) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId);

    /// The picture to present now, if one has been decoded.
    fn current_frame(&self) -> Option<Frame>;
    /// Natural picture size in pixels, `(0, 0)` until known.
    fn natural_size(&self) -> (u32, u32);
}

/// Resolves to whether a seek succeeded. A dropped completion counts as a
/// failure.
#[must_use = "a seek ticket does nothing unless awaited"]
pub struct SeekTicket {
    receiver: oneshot::Receiver<bool>,
}

impl SeekTicket {
    /// Non-blocking check, `None` while the engine is still seeking.
    pub fn try_outcome(&mut self) -> Option<bool> {
        match self.receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(_) => Some(false),
        }
    }
}

impl Future for SeekTicket {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or(false))
    }
}

/// Issues a seek and returns a future for its completion.
pub fn seek_async(engine: &dyn MediaEngine, request: SeekRequest) -> SeekTicket {
    let (tx, rx) = oneshot::channel();
    engine.seek(
        request,
        Box::new(move |success| {
            let _ = tx.send(success);
        }),
    );
    SeekTicket { receiver: rx }
}
