//! A video player component for [gpui](https://github.com/zed-industries/zed/tree/main/crates/gpui)
//! applications.
//!
//! [`VideoPlayerView`] draws the picture and a tap-to-toggle control overlay:
//! play/pause/replay, ±10 s skip, a seek bar, volume and mute, and an optional
//! back button. The controls hide themselves five seconds after the last
//! interaction. Playback starts on the first tap unless
//! [`PlayerOptions::autoplay`] is set; until then the cover image is shown.
//!
//! The buttons and sliders come from `gpui-component`, so call
//! `gpui_component::init` once before opening a window with a player.
//!
//! Playback state flows one way. A [`MediaEngine`] pushes typed
//! [`EngineSignal`]s, the [`PlaybackBridge`] folds them into a
//! [`PlaybackSnapshot`] on the UI thread, and the [`PlayerController`] turns
//! gestures into engine commands. The controller has no gpui dependency and can
//! be driven directly in tests with any engine.
//!
//! With the default `ffmpeg` feature, [`engine::ffmpeg::FfmpegEngine`] decodes
//! local files and network streams through FFmpeg and plays audio through
//! cpal. FFmpeg 4.0+ libraries must be installed:
//! - **macOS**: `brew install ffmpeg`
//! - **Ubuntu/Debian**: `apt-get install libavcodec-dev libavformat-dev libavutil-dev libswscale-dev libswresample-dev`
//! - **Windows**: Download FFmpeg shared libraries from [ffmpeg.org](https://ffmpeg.org/download.html)
//!
//! # Example
//!
//! ```no_run
//! use gpui::{App, Application, WindowOptions, prelude::*};
//! use gpui_player_view::{PlayerOptions, VideoPlayerView};
//!
//! fn main() {
//!     Application::new().run(|cx: &mut App| {
//!         let options = PlayerOptions::new("https://example.com/clip.mp4")
//!             .cover_url("https://example.com/cover.jpg")
//!             .show_back_button(false);
//!
//!         cx.open_window(WindowOptions::default(), |_, cx| {
//!             gpui_component::init(cx);
//!             cx.new(|cx| VideoPlayerView::new(options, cx))
//!         })
//!         .unwrap();
//!     });
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod controller;
pub mod controls;
mod element;
pub mod engine;
mod error;
pub mod format;
pub mod scrub;
pub mod status;
pub mod transport;
mod view;
pub mod volume;

pub use bridge::{PlaybackBridge, PlaybackSnapshot};
pub use config::{ChromeOptions, EngineOptions, PlayerOptions};
pub use controller::{Chrome, PlayerController};
pub use element::{fit_bounds, video_surface, VideoSurface};
pub use engine::{EngineSignal, MediaEngine, SeekRequest};
pub use error::Error;
pub use status::PlaybackStatus;
pub use view::VideoPlayerView;

pub use url::Url;
