mod support;

use futures::StreamExt;
use gpui_player_view::engine::{SignalKind, TICK_INTERVAL};
use gpui_player_view::format::duration_text;
use gpui_player_view::status::{LoadStatus, TimeControlStatus};
use gpui_player_view::{EngineSignal, Error, MediaEngine, PlaybackBridge, PlaybackStatus};
use support::FakeEngine;

#[test]
fn load_then_play_publishes_each_status_once() {
    let engine = FakeEngine::new();
    let mut bridge = engine.bridge();

    engine.emit(EngineSignal::LoadStatus(LoadStatus::ReadyToPlay));
    bridge.pump();
    engine.emit(EngineSignal::DurationChanged(120.0));
    engine.emit(EngineSignal::TimeControl(TimeControlStatus::Playing));
    engine.emit(EngineSignal::TimeControl(TimeControlStatus::Playing));
    bridge.pump();

    assert_eq!(
        bridge.status_history(),
        &[
            PlaybackStatus::None,
            PlaybackStatus::ReadyToPlay,
            PlaybackStatus::Playing
        ]
    );
    assert_eq!(bridge.snapshot().duration, 120.0);
    assert_eq!(duration_text(bridge.snapshot().duration), "02:00");
}

#[test]
fn duration_is_observed_only_after_ready() {
    let engine = FakeEngine::new();
    let mut bridge = engine.bridge();

    assert_eq!(
        engine.subscribed_kinds(),
        vec![
            SignalKind::LoadStatus,
            SignalKind::TimeControl,
            SignalKind::PeriodicTime {
                interval: TICK_INTERVAL
            },
        ]
    );

    assert!(!bridge.apply(EngineSignal::DurationChanged(42.0)));
    assert!(bridge.snapshot().duration.is_infinite());

    engine.emit(EngineSignal::LoadStatus(LoadStatus::ReadyToPlay));
    bridge.pump();
    assert!(engine
        .subscribed_kinds()
        .contains(&SignalKind::ItemDuration));

    // A second ready signal does not subscribe again.
    bridge.apply(EngineSignal::LoadStatus(LoadStatus::ReadyToPlay));
    let duration_subscriptions = engine
        .subscribed_kinds()
        .into_iter()
        .filter(|kind| *kind == SignalKind::ItemDuration)
        .count();
    assert_eq!(duration_subscriptions, 1);
}

#[test]
fn failed_is_sticky() {
    let engine = FakeEngine::new();
    let mut bridge = engine.bridge();

    engine.emit(EngineSignal::LoadStatus(LoadStatus::Failed));
    engine.emit(EngineSignal::TimeControl(TimeControlStatus::Playing));
    engine.emit(EngineSignal::LoadStatus(LoadStatus::ReadyToPlay));
    bridge.pump();

    assert_eq!(bridge.status(), PlaybackStatus::Failed);
    assert_eq!(
        bridge.status_history(),
        &[PlaybackStatus::None, PlaybackStatus::Failed]
    );
}

#[test]
fn waiting_reads_as_paused_and_unavailable_as_none() {
    let engine = FakeEngine::new();
    let mut bridge = engine.bridge();

    bridge.apply(EngineSignal::TimeControl(TimeControlStatus::WaitingToPlay));
    assert_eq!(bridge.status(), PlaybackStatus::Paused);
    bridge.apply(EngineSignal::TimeControl(TimeControlStatus::Unavailable));
    assert_eq!(bridge.status(), PlaybackStatus::None);
}

#[test]
fn indefinite_duration_stays_unknown() {
    let engine = FakeEngine::new();
    let mut bridge = engine.bridge();
    bridge.apply(EngineSignal::LoadStatus(LoadStatus::ReadyToPlay));

    bridge.apply(EngineSignal::DurationChanged(f64::NAN));
    assert!(!bridge.snapshot().has_duration());
    assert_eq!(duration_text(bridge.snapshot().duration), "--:--");
}

#[test]
fn periodic_time_moves_the_playhead() {
    let engine = FakeEngine::new();
    let mut bridge = engine.bridge();

    engine.emit(EngineSignal::PeriodicTime(12.5));
    assert!(bridge.pump());
    assert_eq!(bridge.snapshot().current_time, 12.5);

    engine.emit(EngineSignal::PeriodicTime(12.5));
    assert!(!bridge.pump());
}

#[test]
fn held_playhead_ignores_periodic_time() {
    let engine = FakeEngine::new();
    let mut bridge = engine.bridge();
    bridge.hold_playhead(true);
    bridge.preview_time(42.0);

    engine.emit(EngineSignal::PeriodicTime(7.0));
    assert!(!bridge.pump());
    assert_eq!(bridge.snapshot().current_time, 42.0);

    bridge.hold_playhead(false);
    assert!(bridge.apply(EngineSignal::PeriodicTime(7.5)));
    assert_eq!(bridge.snapshot().current_time, 7.5);
}

#[test]
fn mute_reflects_the_engine() {
    let engine = FakeEngine::new();
    let mut bridge = engine.bridge();
    assert!(!bridge.snapshot().muted);

    bridge.set_muted(true);
    assert!(bridge.snapshot().muted);
    assert!(engine.is_muted());
}

#[test]
fn dropping_the_bridge_unsubscribes_everything() {
    let engine = FakeEngine::new();
    let mut bridge = engine.bridge();
    bridge.apply(EngineSignal::LoadStatus(LoadStatus::ReadyToPlay));
    assert_eq!(engine.subscribed_kinds().len(), 4);

    drop(bridge);
    assert!(engine.subscribed_kinds().is_empty());
}

#[test]
fn taken_stream_receives_signals() {
    let engine = FakeEngine::new();
    let mut bridge = engine.bridge();
    let mut signals = bridge.take_signals().expect("stream available once");
    assert!(bridge.take_signals().is_none());

    engine.emit(EngineSignal::PeriodicTime(3.0));
    assert!(!bridge.pump());

    let signal = futures::executor::block_on(signals.next());
    assert_eq!(signal, Some(EngineSignal::PeriodicTime(3.0)));
    assert!(bridge.apply(signal.unwrap()));
    assert_eq!(bridge.snapshot().current_time, 3.0);
}

#[test]
fn unavailable_bridge_keeps_the_cause() {
    let mut bridge = PlaybackBridge::unavailable(Error::Uri("nope".to_string()));
    assert!(bridge.engine().is_none());
    assert!(matches!(bridge.source_error(), Some(Error::Uri(_))));

    bridge.set_muted(true);
    assert!(!bridge.snapshot().muted);
    assert_eq!(bridge.status(), PlaybackStatus::None);
}
