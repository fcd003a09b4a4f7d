//! The gpui player component.

use crate::bridge::PlaybackBridge;
use crate::config::{
    PlaceholderBuilder, PlayerOptions, DEFAULT_DISABLED_TEXT, DEFAULT_FAILED_TEXT,
    DEFAULT_LOADING_TEXT, DEFAULT_PLACEHOLDER_TEXT,
};
use crate::controller::{Chrome, PendingSeek, PlayIcon, PlayerController, PrimaryContent, SpeakerIcon};
use crate::element::VideoSurface;
use crate::engine::MediaEngine;
use crate::transport::SkipDirection;
use futures::StreamExt;
use gpui::{
    div, img, prelude::*, px, AnyElement, App, ClickEvent, Context, CursorStyle, Div, Entity,
    MouseButton, MouseDownEvent, MouseUpEvent, ObjectFit, Pixels, SharedString, StyledImage,
    Subscription, Task, Window,
};
use gpui_component::button::Button;
use gpui_component::slider::{Slider, SliderEvent, SliderState};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragTarget {
    Seek,
    Volume,
}

pub struct VideoPlayerView {
    controller: PlayerController,
    engine: Option<Arc<dyn MediaEngine>>,
    options: PlayerOptions,
    drag: Option<DragTarget>,
    seek_slider: Entity<SliderState>,
    volume_slider: Entity<SliderState>,
    dismiss: Option<(Instant, Task<()>)>,
    _signals: Task<()>,
    _subscriptions: Vec<Subscription>,
}

impl VideoPlayerView {
    /// Opens `options.url` with the FFmpeg engine.
    #[cfg(feature = "ffmpeg")]
    pub fn new(options: PlayerOptions, cx: &mut Context<Self>) -> Self {
        let bridge = PlaybackBridge::open(&options.url, &options.engine);
        Self::with_bridge(bridge, options, cx)
    }

    pub fn with_bridge(
        mut bridge: PlaybackBridge,
        options: PlayerOptions,
        cx: &mut Context<Self>,
    ) -> Self {
        let signals = bridge.take_signals();
        let signal_loop = cx.spawn(async move |this, cx| {
            let Some(mut signals) = signals else {
                return;
            };
            while let Some(signal) = signals.next().await {
                let applied = this.update(cx, |view, cx| {
                    if view.controller.handle_signal(signal) {
                        cx.notify();
                    }
                });
                if applied.is_err() {
                    break;
                }
            }
        });

        let engine = bridge.engine().cloned();
        let mut controller = PlayerController::new(bridge, options.chrome.clone());

        let seek_slider = cx.new(|_| unit_slider(0.0));
        let volume_slider = cx.new(|_| unit_slider(controller.volume().value));

        let mut subscriptions = vec![
            cx.subscribe(&seek_slider, |view, _, event: &SliderEvent, cx| {
                if let SliderEvent::Change(value) = event {
                    view.drag = Some(DragTarget::Seek);
                    view.controller.scrub_moved(value.start() as f64);
                    view.interacted(cx);
                }
            }),
            cx.subscribe(&volume_slider, |view, _, event: &SliderEvent, cx| {
                if let SliderEvent::Change(value) = event {
                    view.drag = Some(DragTarget::Volume);
                    view.controller.volume_dragged(value.start());
                    view.interacted(cx);
                }
            }),
        ];
        if let Some(flag) = options.disabled.clone() {
            controller.set_disabled(*flag.read(cx));
            subscriptions.push(cx.observe(&flag, |view, flag, cx| {
                let disabled = *flag.read(cx);
                view.controller.set_disabled(disabled);
                cx.notify();
            }));
        }

        cx.on_release(|view, _| view.controller.teardown()).detach();

        Self {
            controller,
            engine,
            options,
            drag: None,
            seek_slider,
            volume_slider,
            dismiss: None,
            _signals: signal_loop,
            _subscriptions: subscriptions,
        }
    }

    pub fn controller(&self) -> &PlayerController {
        &self.controller
    }

    /// Keeps exactly one wake-up scheduled for the current dismiss deadline.
    /// Replacing the task cancels the previous one.
    fn sync_dismiss_timer(&mut self, cx: &mut Context<Self>) {
        let Some(deadline) = self.controller.controls().deadline() else {
            self.dismiss = None;
            return;
        };
        if matches!(&self.dismiss, Some((scheduled, _)) if *scheduled == deadline) {
            return;
        }

        let wait = deadline.saturating_duration_since(Instant::now());
        let task = cx.spawn(async move |this, cx| {
            cx.background_executor().timer(wait).await;
            this.update(cx, |view, cx| {
                if view.controller.expire_controls(Instant::now()) {
                    log::trace!("Controls dismissed");
                    cx.notify();
                }
            })
            .ok();
        });
        self.dismiss = Some((deadline, task));
    }

    fn interacted(&mut self, cx: &mut Context<Self>) {
        self.sync_dismiss_timer(cx);
        cx.notify();
    }

    fn track_seek(&mut self, pending: Option<PendingSeek>, cx: &mut Context<Self>) {
        let Some(PendingSeek {
            ticket,
            target,
            then,
        }) = pending
        else {
            return;
        };
        cx.spawn(async move |this, cx| {
            let success = ticket.await;
            this.update(cx, |view, cx| {
                view.controller.seek_finished(target, then, success);
                cx.notify();
            })
            .ok();
        })
        .detach();
    }

    /// Mouse released anywhere in the player. A drag that started on one of
    /// the sliders is committed with the slider's last value.
    fn end_drag(&mut self, cx: &mut Context<Self>) {
        let Some(target) = self.drag.take() else {
            return;
        };
        let now = Instant::now();
        match target {
            DragTarget::Seek => {
                let value = self.seek_slider.read(cx).value().start();
                let pending = self.controller.scrub_ended(value as f64, now);
                self.track_seek(pending, cx);
            }
            DragTarget::Volume => {
                let value = self.volume_slider.read(cx).value().start();
                self.controller.volume_drag_ended(value, now);
            }
        }
        self.interacted(cx);
    }

    /// Moves each slider to the played value unless the user is holding it.
    fn sync_sliders(&self, chrome: &Chrome, window: &mut Window, cx: &mut App) {
        if self.drag != Some(DragTarget::Seek) {
            set_slider(&self.seek_slider, chrome.progress, window, cx);
        }
        if self.drag != Some(DragTarget::Volume) {
            set_slider(&self.volume_slider, chrome.volume, window, cx);
        }
    }

    fn primary_layer(
        &self,
        primary: &PrimaryContent,
        window: &mut Window,
        cx: &mut Context<Self>,
    ) -> Option<AnyElement> {
        let (builder, text) = placeholder_source(&self.options, primary)?;
        let placeholder = build_placeholder(builder, text, window, cx);
        let PrimaryContent::Cover(url) = primary else {
            return Some(placeholder);
        };

        // The loading view stays underneath until the cover has decoded, and
        // shows through if it never does.
        Some(
            div()
                .relative()
                .size_full()
                .child(placeholder)
                .child(
                    div().absolute().top_0().left_0().size_full().child(
                        img(SharedString::from(url.clone()))
                            .size_full()
                            .object_fit(ObjectFit::Cover),
                    ),
                )
                .into_any_element(),
        )
    }

    fn render_overlay(&self, chrome: &Chrome, cx: &mut Context<Self>) -> impl IntoElement {
        let back_action = self.options.back_button_action.clone();
        let back_button = control_button("back", "‹").on_click(move |_: &ClickEvent, window, cx| {
            cx.stop_propagation();
            if let Some(action) = back_action.as_ref() {
                action(window, cx);
            }
        });

        let top_bar = div()
            .flex()
            .items_center()
            .justify_between()
            .p_4()
            .child(div().when(chrome.show_back_button, |this| this.child(back_button)))
            .when(chrome.controls_interactive, |this| {
                this.child(self.render_volume(chrome, cx))
            });

        let transport = div()
            .flex()
            .items_center()
            .justify_center()
            .gap_8()
            .when(chrome.controls_interactive, |this| {
                this.when(chrome.skip_visible, |this| {
                    this.child(control_button("skip-back", "« 10").on_click(cx.listener(
                        |view, _: &ClickEvent, _, cx| {
                            cx.stop_propagation();
                            let pending = view.controller.skip(SkipDirection::Back, Instant::now());
                            view.track_seek(pending, cx);
                            view.interacted(cx);
                        },
                    )))
                })
                .child(
                    control_button("play-pause", play_glyph(chrome.play_icon)).on_click(
                        cx.listener(|view, _: &ClickEvent, _, cx| {
                            cx.stop_propagation();
                            let pending = view.controller.toggle_playback(Instant::now());
                            view.track_seek(pending, cx);
                            view.interacted(cx);
                        }),
                    ),
                )
                .when(chrome.skip_visible, |this| {
                    this.child(control_button("skip-forward", "10 »").on_click(cx.listener(
                        |view, _: &ClickEvent, _, cx| {
                            cx.stop_propagation();
                            let pending =
                                view.controller.skip(SkipDirection::Forward, Instant::now());
                            view.track_seek(pending, cx);
                            view.interacted(cx);
                        },
                    )))
                })
            });

        let bottom_bar = div()
            .flex()
            .items_center()
            .gap_3()
            .p_4()
            .text_sm()
            .when(chrome.controls_interactive, |this| {
                this.child(div().min_w(px(48.)).child(chrome.elapsed.clone()))
                    .child(
                        slider_track(px(15.), self.drag == Some(DragTarget::Seek))
                            .flex_1()
                            .child(Slider::new(&self.seek_slider)),
                    )
                    .child(
                        div()
                            .min_w(px(48.))
                            .flex()
                            .justify_end()
                            .child(chrome.duration.clone()),
                    )
            });

        div()
            .absolute()
            .top_0()
            .left_0()
            .size_full()
            .flex()
            .flex_col()
            .justify_between()
            .bg(gpui::hsla(0., 0., 0., 0.35))
            .child(top_bar)
            .child(transport)
            .child(bottom_bar)
    }

    fn render_volume(&self, chrome: &Chrome, cx: &mut Context<Self>) -> impl IntoElement {
        let glyph = match chrome.speaker {
            SpeakerIcon::On => "🔊",
            SpeakerIcon::Muted => "🔇",
        };

        div()
            .flex()
            .items_center()
            .gap_2()
            .when(chrome.volume_slider_visible, |this| {
                this.child(
                    slider_track(px(6.), self.drag == Some(DragTarget::Volume))
                        .w(px(100.))
                        .rounded(px(2.))
                        .child(Slider::new(&self.volume_slider)),
                )
            })
            .child(control_button("speaker", glyph).on_click(cx.listener(
                |view, _: &ClickEvent, _, cx| {
                    cx.stop_propagation();
                    view.controller.speaker_tapped(Instant::now());
                    view.interacted(cx);
                },
            )))
    }
}

impl Render for VideoPlayerView {
    fn render(&mut self, window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let chrome = self.controller.chrome();
        self.sync_sliders(&chrome, window, cx);
        let primary = self.primary_layer(&chrome.primary, window, cx);

        div()
            .id("video-player")
            .relative()
            .size_full()
            .overflow_hidden()
            .bg(gpui::black())
            .text_color(gpui::white())
            .on_click(cx.listener(|view, _: &ClickEvent, _, cx| {
                view.controller.tap(Instant::now());
                view.interacted(cx);
            }))
            .on_mouse_up(
                MouseButton::Left,
                cx.listener(|view, _: &MouseUpEvent, _, cx| view.end_drag(cx)),
            )
            .on_mouse_up_out(
                MouseButton::Left,
                cx.listener(|view, _: &MouseUpEvent, _, cx| view.end_drag(cx)),
            )
            .when_some(self.engine.clone(), |this, engine| {
                this.child(
                    div()
                        .absolute()
                        .top_0()
                        .left_0()
                        .size_full()
                        .child(VideoSurface::new(engine)),
                )
            })
            .when_some(primary, |this, layer| {
                this.child(div().absolute().top_0().left_0().size_full().child(layer))
            })
            .when(chrome.overlay_visible, |this| {
                this.child(self.render_overlay(&chrome, cx))
            })
    }
}

fn play_glyph(icon: PlayIcon) -> &'static str {
    match icon {
        PlayIcon::Play => "▶",
        PlayIcon::Pause => "⏸",
        PlayIcon::Replay => "↻",
    }
}

fn control_button(id: &'static str, label: &'static str) -> Button {
    Button::new(id).label(label).cursor(CursorStyle::PointingHand)
}

/// Height multiplier of a slider track while it is held.
const DRAG_SCALE: f32 = 1.5;

/// Hosts a slider. Presses stop here so they never count as a tap on the
/// player.
fn slider_track(height: Pixels, active: bool) -> Div {
    div()
        .flex()
        .items_center()
        .h(if active { height * DRAG_SCALE } else { height })
        .on_mouse_down(MouseButton::Left, |_: &MouseDownEvent, _, cx| {
            cx.stop_propagation();
        })
}

fn unit_slider(value: f32) -> SliderState {
    SliderState::new()
        .min(0.)
        .max(1.)
        .step(0.001)
        .default_value(value.clamp(0.0, 1.0))
}

fn set_slider(slider: &Entity<SliderState>, value: f32, window: &mut Window, cx: &mut App) {
    if (slider.read(cx).value().start() - value).abs() > f32::EPSILON {
        slider.update(cx, |state, cx| state.set_value(value, window, cx));
    }
}

/// Which configured builder, and which default text, draws `primary`.
/// Video needs no placeholder. A cover is drawn over the loading view.
fn placeholder_source(
    options: &PlayerOptions,
    primary: &PrimaryContent,
) -> Option<(Option<PlaceholderBuilder>, &'static str)> {
    let (builder, text) = match primary {
        PrimaryContent::Video => return None,
        PrimaryContent::Loading | PrimaryContent::Cover(_) => {
            (&options.loading_view, DEFAULT_LOADING_TEXT)
        }
        PrimaryContent::Placeholder => (&options.placeholder_view, DEFAULT_PLACEHOLDER_TEXT),
        PrimaryContent::Failed => (&options.failed_view, DEFAULT_FAILED_TEXT),
        PrimaryContent::Disabled => (&options.disabled_view, DEFAULT_DISABLED_TEXT),
    };
    Some((builder.clone(), text))
}

fn text_placeholder(text: &'static str) -> AnyElement {
    div()
        .size_full()
        .flex()
        .items_center()
        .justify_center()
        .bg(gpui::black())
        .text_color(gpui::white())
        .child(text)
        .into_any_element()
}

fn build_placeholder(
    builder: Option<PlaceholderBuilder>,
    text: &'static str,
    window: &mut Window,
    cx: &mut App,
) -> AnyElement {
    match builder {
        Some(build) => build(window, cx),
        None => text_placeholder(text),
    }
}
