use gpui::{
    div, prelude::*, px, rgb, size, App, Application, Bounds, Context, CursorStyle, Entity, Render,
    Window, WindowBounds, WindowOptions,
};
use gpui_component::button::Button;
use gpui_player_view::{PlayerOptions, VideoPlayerView};

struct PlayerDemo {
    player: Entity<VideoPlayerView>,
    disabled: Entity<bool>,
}

impl Render for PlayerDemo {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let disabled = *self.disabled.read(cx);
        let label = if disabled { "Enable player" } else { "Disable player" };

        div()
            .size_full()
            .flex()
            .flex_col()
            .bg(rgb(0x151515))
            .text_color(rgb(0xeeeeee))
            .child(
                div().p_2().child(
                    Button::new("toggle-disabled")
                        .label(label)
                        .cursor(CursorStyle::PointingHand)
                        .on_click(cx.listener(|this, _, _, cx| {
                            this.disabled.update(cx, |flag, cx| {
                                *flag = !*flag;
                                cx.notify();
                            });
                            cx.notify();
                        })),
                ),
            )
            .child(div().flex_1().child(self.player.clone()))
    }
}

fn main() {
    env_logger::init();

    let source = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("{}/assets/sample.mp4", env!("CARGO_MANIFEST_DIR")));

    Application::new().run(move |cx: &mut App| {
        let bounds = Bounds::centered(None, size(px(960.), px(600.)), cx);
        cx.open_window(
            WindowOptions {
                window_bounds: Some(WindowBounds::Windowed(bounds)),
                focus: true,
                ..Default::default()
            },
            |_, cx| {
                gpui_component::init(cx);

                let disabled = cx.new(|_| false);
                let options = PlayerOptions::new(source)
                    .disabled(disabled.clone())
                    .on_back(|window, _| window.remove_window());
                let player = cx.new(|cx| VideoPlayerView::new(options, cx));
                cx.new(|_| PlayerDemo { player, disabled })
            },
        )
        .expect("failed to open window");
        cx.activate(true);
    });
}
