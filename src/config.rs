use gpui::{AnyElement, App, Entity, Window};
use std::rc::Rc;
use std::time::Duration;

pub const DEFAULT_LOADING_TEXT: &str = "Loading";
pub const DEFAULT_PLACEHOLDER_TEXT: &str = "Video";
pub const DEFAULT_FAILED_TEXT: &str = "Failed to load video";
pub const DEFAULT_DISABLED_TEXT: &str = "Disabled";

/// Builds a custom element for one of the placeholder slots.
pub type PlaceholderBuilder = Rc<dyn Fn(&mut Window, &mut App) -> AnyElement>;
pub type BackAction = Rc<dyn Fn(&mut Window, &mut App)>;

/// Tuning for [`FfmpegEngine`](crate::engine::ffmpeg::FfmpegEngine).
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub frame_buffer_capacity: Option<usize>,
    pub prebuffer_frames: Option<usize>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            frame_buffer_capacity: Some(120),
            prebuffer_frames: Some(5),
        }
    }
}

impl EngineOptions {
    pub fn frame_buffer_capacity(&self) -> usize {
        self.frame_buffer_capacity.unwrap_or(120)
    }

    pub fn prebuffer_frames(&self) -> usize {
        self.prebuffer_frames.unwrap_or(5)
    }
}

/// The framework-independent part of the player configuration.
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub cover_url: Option<String>,
    pub cover_thumbnail_url: Option<String>,
    pub show_back_button: bool,
    pub autoplay: bool,
    pub dismiss_delay: Duration,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            cover_url: None,
            cover_thumbnail_url: None,
            show_back_button: true,
            autoplay: false,
            dismiss_delay: Duration::from_secs(5),
        }
    }
}

/// Construction parameters for [`VideoPlayerView`](crate::VideoPlayerView).
#[derive(Clone)]
pub struct PlayerOptions {
    pub url: String,
    pub chrome: ChromeOptions,
    pub engine: EngineOptions,
    pub back_button_action: Option<BackAction>,
    /// Externally owned flag. While `true` playback is paused and the
    /// disabled placeholder is shown.
    pub disabled: Option<Entity<bool>>,
    pub loading_view: Option<PlaceholderBuilder>,
    pub placeholder_view: Option<PlaceholderBuilder>,
    pub failed_view: Option<PlaceholderBuilder>,
    pub disabled_view: Option<PlaceholderBuilder>,
}

impl PlayerOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            chrome: ChromeOptions::default(),
            engine: EngineOptions::default(),
            back_button_action: None,
            disabled: None,
            loading_view: None,
            placeholder_view: None,
            failed_view: None,
            disabled_view: None,
        }
    }

    pub fn cover_url(mut self, url: impl Into<String>) -> Self {
        self.chrome.cover_url = Some(url.into());
        self
    }

    pub fn cover_thumbnail_url(mut self, url: impl Into<String>) -> Self {
        self.chrome.cover_thumbnail_url = Some(url.into());
        self
    }

    pub fn show_back_button(mut self, show: bool) -> Self {
        self.chrome.show_back_button = show;
        self
    }

    /// Starts playback as soon as the media is ready. Off by default: the
    /// ready state shows the cover and the first tap starts playback.
    pub fn autoplay(mut self, autoplay: bool) -> Self {
        self.chrome.autoplay = autoplay;
        self
    }

    pub fn on_back(mut self, action: impl Fn(&mut Window, &mut App) + 'static) -> Self {
        self.back_button_action = Some(Rc::new(action));
        self
    }

    pub fn disabled(mut self, flag: Entity<bool>) -> Self {
        self.disabled = Some(flag);
        self
    }

    pub fn engine_options(mut self, options: EngineOptions) -> Self {
        self.engine = options;
        self
    }

    pub fn loading_view(
        mut self,
        builder: impl Fn(&mut Window, &mut App) -> AnyElement + 'static,
    ) -> Self {
        self.loading_view = Some(Rc::new(builder));
        self
    }

    pub fn placeholder_view(
        mut self,
        builder: impl Fn(&mut Window, &mut App) -> AnyElement + 'static,
    ) -> Self {
        self.placeholder_view = Some(Rc::new(builder));
        self
    }

    pub fn failed_view(
        mut self,
        builder: impl Fn(&mut Window, &mut App) -> AnyElement + 'static,
    ) -> Self {
        self.failed_view = Some(Rc::new(builder));
        self
    }

    pub fn disabled_view(
        mut self,
        builder: impl Fn(&mut Window, &mut App) -> AnyElement + 'static,
    ) -> Self {
        self.disabled_view = Some(Rc::new(builder));
        self
    }
}
