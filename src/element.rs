use crate::engine::{Frame, MediaEngine};
#[cfg(target_os = "macos")]
use core_foundation::{
    base::TCFType,
    boolean::CFBoolean,
    dictionary::{CFDictionary, CFMutableDictionary},
    string::CFString,
};
#[cfg(target_os = "macos")]
use core_video::pixel_buffer::{kCVPixelFormatType_420YpCbCr8BiPlanarFullRange, CVPixelBuffer};
#[cfg(target_os = "macos")]
use core_video::r#return::kCVReturnSuccess;
use gpui::{
    Bounds, Element, ElementId, GlobalElementId, InspectorElementId, IntoElement, LayoutId, Pixels,
    Window,
};
use std::sync::Arc;
use yuv::{yuv_nv12_to_bgra, YuvBiPlanarImage, YuvConversionMode, YuvRange, YuvStandardMatrix};

/// Paints the engine's current picture, letterboxed into the element's
/// bounds. Fills its parent.
pub struct VideoSurface {
    engine: Arc<dyn MediaEngine>,
    element_id: ElementId,
}

impl VideoSurface {
    pub fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            engine,
            element_id: ElementId::Name("video-surface".into()),
        }
    }

    pub fn id(mut self, id: impl Into<ElementId>) -> Self {
        self.element_id = id.into();
        self
    }

    fn paint_render_image(
        &mut self,
        window: &mut Window,
        cx: &mut gpui::App,
        dest: Bounds<Pixels>,
        frame: &Frame,
    ) {
        use image::{ImageBuffer, Rgba};
        use smallvec::SmallVec;

        let bgra = nv12_to_bgra(frame);
        let Some(image_buffer) = ImageBuffer::<Rgba<u8>, _>::from_raw(frame.width, frame.height, bgra)
        else {
            return;
        };

        let last_image: gpui::Entity<Option<Arc<gpui::RenderImage>>> =
            window.use_state(cx, |_, _| None);

        let frames: SmallVec<[image::Frame; 1]> =
            SmallVec::from_elem(image::Frame::new(image_buffer), 1);
        let render_image = Arc::new(gpui::RenderImage::new(frames));

        let previous = last_image.update(cx, |slot, _| slot.replace(render_image.clone()));

        window
            .paint_image(dest, gpui::Corners::default(), render_image, 0, false)
            .ok();

        if let Some(previous) = previous {
            cx.drop_image(previous, Some(window));
        }
    }
}

/// Largest rectangle with the frame's aspect ratio centred in `bounds`.
pub fn fit_bounds(bounds: Bounds<Pixels>, frame_width: u32, frame_height: u32) -> Bounds<Pixels> {
    let container_w: f32 = bounds.size.width.into();
    let container_h: f32 = bounds.size.height.into();
    let (frame_w, frame_h) = (frame_width as f32, frame_height as f32);

    let scale = if frame_w > 0.0 && frame_h > 0.0 {
        (container_w / frame_w).min(container_h / frame_h)
    } else {
        1.0
    };

    let dest_w = (frame_w * scale).max(0.0);
    let dest_h = (frame_h * scale).max(0.0);

    Bounds::new(
        gpui::point(
            bounds.origin.x + gpui::px((container_w - dest_w) * 0.5),
            bounds.origin.y + gpui::px((container_h - dest_h) * 0.5),
        ),
        gpui::size(gpui::px(dest_w), gpui::px(dest_h)),
    )
}

fn nv12_to_bgra(frame: &Frame) -> Vec<u8> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let y_size = width * height;
    let uv_size = y_size / 2;
    let mut bgra = vec![0u8; y_size * 4];

    if frame.data.len() < y_size + uv_size {
        return bgra;
    }

    let image = YuvBiPlanarImage {
        y_plane: &frame.data[..y_size],
        y_stride: frame.width,
        uv_plane: &frame.data[y_size..y_size + uv_size],
        uv_stride: frame.width,
        width: frame.width,
        height: frame.height,
    };

    let attempts = [
        (YuvRange::Full, YuvStandardMatrix::Bt709),
        (YuvRange::Limited, YuvStandardMatrix::Bt709),
        (YuvRange::Limited, YuvStandardMatrix::Bt601),
    ];
    for (range, matrix) in attempts {
        if yuv_nv12_to_bgra(
            &image,
            &mut bgra,
            frame.width * 4,
            range,
            matrix,
            YuvConversionMode::Balanced,
        )
        .is_ok()
        {
            return bgra;
        }
    }

    bgra.fill(0);
    bgra
}

/// Copies an NV12 frame into a Metal-compatible pixel buffer.
#[cfg(target_os = "macos")]
fn nv12_pixel_buffer(frame: &Frame) -> Option<CVPixelBuffer> {
    let width = frame.width as usize;
    let height = frame.height as usize;
    let y_size = width * height;
    if width == 0 || height == 0 || frame.data.len() < y_size + y_size / 2 {
        return None;
    }

    let mut attrs: CFMutableDictionary<CFString, core_foundation::base::CFType> =
        CFMutableDictionary::new();
    attrs.add(
        &core_video::pixel_buffer::CVPixelBufferKeys::MetalCompatibility.into(),
        &CFBoolean::true_value().as_CFType(),
    );
    let iosurface: CFDictionary<CFString, core_foundation::base::CFType> =
        CFDictionary::from_CFType_pairs(&[]);
    attrs.add(
        &core_video::pixel_buffer::CVPixelBufferKeys::IOSurfaceProperties.into(),
        &iosurface.as_CFType(),
    );

    let buffer = CVPixelBuffer::new(
        kCVPixelFormatType_420YpCbCr8BiPlanarFullRange,
        width,
        height,
        Some(&attrs.to_immutable()),
    )
    .ok()?;

    let layout_matches = buffer.get_pixel_format() == kCVPixelFormatType_420YpCbCr8BiPlanarFullRange
        && buffer.is_planar()
        && buffer.get_plane_count() == 2
        && buffer.get_width_of_plane(0) == width
        && buffer.get_height_of_plane(0) == height
        && buffer.get_width_of_plane(1) == width / 2
        && buffer.get_height_of_plane(1) == height / 2;
    if !layout_matches {
        return None;
    }

    let planes = [
        (0, 0, height, buffer.get_bytes_per_row_of_plane(0)),
        (1, y_size, height / 2, buffer.get_bytes_per_row_of_plane(1)),
    ];
    if planes.iter().any(|&(_, _, _, stride)| stride < width) {
        return None;
    }

    if buffer.lock_base_address(0) != kCVReturnSuccess {
        return None;
    }
    for (plane, offset, rows, stride) in planes {
        let dst = buffer.get_base_address_of_plane(plane) as *mut u8;
        for row in 0..rows {
            let src = &frame.data[offset + row * width..offset + (row + 1) * width];
            // SAFETY: the buffer is locked and each plane holds `rows` rows of
            // `stride >= width` bytes.
            unsafe {
                std::ptr::copy_nonoverlapping(src.as_ptr(), dst.add(row * stride), width);
            }
        }
    }
    let _ = buffer.unlock_base_address(0);

    Some(buffer)
}

impl Element for VideoSurface {
    type RequestLayoutState = ();
    type PrepaintState = ();

    fn id(&self) -> Option<ElementId> {
        Some(self.element_id.clone())
    }

    fn source_location(&self) -> Option<&'static core::panic::Location<'static>> {
        None
    }

    fn request_layout(
        &mut self,
        _global_id: Option<&GlobalElementId>,
        _inspector_id: Option<&InspectorElementId>,
        window: &mut Window,
        cx: &mut gpui::App,
    ) -> (LayoutId, Self::RequestLayoutState) {
        let style = gpui::Style {
            size: gpui::Size {
                width: gpui::Length::Definite(gpui::relative(1.0)),
                height: gpui::Length::Definite(gpui::relative(1.0)),
            },
            ..Default::default()
        };
        (window.request_layout(style, [], cx), ())
    }

    fn prepaint(
        &mut self,
        _global_id: Option<&GlobalElementId>,
        _inspector_id: Option<&InspectorElementId>,
        _bounds: Bounds<Pixels>,
        _request_layout_state: &mut Self::RequestLayoutState,
        window: &mut Window,
        _cx: &mut gpui::App,
    ) -> Self::PrepaintState {
        // New frames arrive from the decoder thread without a notify.
        window.request_animation_frame();
    }

    fn paint(
        &mut self,
        _global_id: Option<&GlobalElementId>,
        _inspector_id: Option<&InspectorElementId>,
        bounds: Bounds<Pixels>,
        _request_layout_state: &mut Self::RequestLayoutState,
        _prepaint_state: &mut Self::PrepaintState,
        window: &mut Window,
        cx: &mut gpui::App,
    ) {
        let Some(frame) = self.engine.current_frame() else {
            return;
        };
        let dest = fit_bounds(bounds, frame.width, frame.height);

        #[cfg(target_os = "macos")]
        if let Some(buffer) = nv12_pixel_buffer(&frame) {
            window.paint_surface(dest, buffer);
            return;
        }

        self.paint_render_image(window, cx, dest, &frame);
    }
}

impl IntoElement for VideoSurface {
    type Element = Self;

    fn into_element(self) -> Self::Element {
        self
    }
}

pub fn video_surface(engine: Arc<dyn MediaEngine>) -> VideoSurface {
    VideoSurface::new(engine)
}
