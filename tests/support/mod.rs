#![allow(dead_code)]

use gpui_player_view::engine::{
    Frame, MediaEngine, SeekCompletion, SeekRequest, SignalKind, SignalSink, SubscriptionId,
};
use gpui_player_view::{EngineSignal, PlaybackBridge};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Seek(SeekRequest),
    SetMuted(bool),
    SetVolume(f32),
}

struct State {
    commands: Vec<Command>,
    subscribers: Vec<(SubscriptionId, SignalKind, SignalSink)>,
    seeks: VecDeque<SeekCompletion>,
    muted: bool,
    volume: f32,
}

/// Records commands and lets tests push signals by hand.
pub struct FakeEngine {
    state: Mutex<State>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                commands: Vec::new(),
                subscribers: Vec::new(),
                seeks: VecDeque::new(),
                muted: false,
                volume: 1.0,
            }),
        })
    }

    pub fn bridge(self: &Arc<Self>) -> PlaybackBridge {
        PlaybackBridge::with_engine(Some(self.clone() as Arc<dyn MediaEngine>))
    }

    /// Delivers `signal` to every matching subscription.
    pub fn emit(&self, signal: EngineSignal) {
        let state = self.state.lock();
        for (_, kind, sink) in &state.subscribers {
            if signal.kind_matches(*kind) {
                let _ = sink.unbounded_send(signal);
            }
        }
    }

    /// Resolves the oldest outstanding seek.
    pub fn complete_seek(&self, success: bool) {
        let completion = self.state.lock().seeks.pop_front();
        if let Some(completion) = completion {
            completion(success);
        }
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state.lock().commands.clone()
    }

    pub fn last_command(&self) -> Option<Command> {
        self.state.lock().commands.last().cloned()
    }

    pub fn clear_commands(&self) {
        self.state.lock().commands.clear();
    }

    pub fn subscribed_kinds(&self) -> Vec<SignalKind> {
        self.state
            .lock()
            .subscribers
            .iter()
            .map(|(_, kind, _)| *kind)
            .collect()
    }

    fn record(&self, command: Command) {
        self.state.lock().commands.push(command);
    }
}

impl MediaEngine for FakeEngine {
    fn play(&self) {
        self.record(Command::Play);
    }

    fn pause(&self) {
        self.record(Command::Pause);
    }

    fn seek(&self, request: SeekRequest, completion: SeekCompletion) {
        let mut state = self.state.lock();
        state.commands.push(Command::Seek(request));
        state.seeks.push_back(completion);
    }

    fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    fn set_muted(&self, muted: bool) {
        let mut state = self.state.lock();
        state.muted = muted;
        state.commands.push(Command::SetMuted(muted));
    }

    fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    fn set_volume(&self, volume: f32) {
        let mut state = self.state.lock();
        state.volume = volume;
        state.commands.push(Command::SetVolume(volume));
    }

    fn subscribe(&self, kind: SignalKind, sink: SignalSink) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.state.lock().subscribers.push((id, kind, sink));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.state
            .lock()
            .subscribers
            .retain(|(existing, _, _)| *existing != id);
    }

    fn current_frame(&self) -> Option<Frame> {
        None
    }

    fn natural_size(&self) -> (u32, u32) {
        (0, 0)
    }
}
