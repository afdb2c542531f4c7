use egui::{Pos2, Vec2, pos2, vec2};
use image::{Rgba, RgbaImage, imageops};
use rayon::prelude::*;

use crate::settings::{ExportSize, ZOOM_MAX, ZOOM_MIN};

/// Canvas background behind the image (light grey 239).
pub const CANVAS_BACKGROUND: Rgba<u8> = Rgba([239, 239, 239, 255]);

/// Below this many destination rows a blit stays on the calling thread.
const PARALLEL_BLIT_ROWS: usize = 64;

/// Round half up, matching how pointer positions snap to whole lines
/// (`-2.5 → -2`, `2.5 → 3`).
#[inline]
pub fn round_half_up(v: f32) -> i64 {
    (v + 0.5).floor() as i64
}

// ============================================================================
// VIEW STATE - placement offset + zoom, independent of pixel data
// ============================================================================

/// Where the image sits on the canvas and how the canvas is scaled on screen.
///
/// `offset` is in canvas (unzoomed) pixels and may be fractional. `zoom` is a
/// pure presentation scale: it never changes stored pixels or the offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewState {
    pub offset: Vec2,
    zoom: f32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl ViewState {
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(ZOOM_MIN, ZOOM_MAX);
        }
    }

    /// View-space pointer → image-local coordinates.
    pub fn view_to_local(&self, view: Pos2) -> Pos2 {
        pos2(
            view.x / self.zoom - self.offset.x,
            view.y / self.zoom - self.offset.y,
        )
    }

    /// Inverse of [`ViewState::view_to_local`].
    pub fn local_to_view(&self, local: Pos2) -> Pos2 {
        pos2(
            (local.x + self.offset.x) * self.zoom,
            (local.y + self.offset.y) * self.zoom,
        )
    }

    /// Centering policy: image middle on canvas middle.
    pub fn center(&mut self, export: ExportSize, image_w: u32, image_h: u32) {
        self.offset = vec2(
            (export.width as f32 - image_w as f32) / 2.0,
            (export.height as f32 - image_h as f32) / 2.0,
        );
    }

    /// Whole-pixel placement used when blitting.
    pub fn placement(&self) -> (i64, i64) {
        (self.offset.x.floor() as i64, self.offset.y.floor() as i64)
    }

    /// Snapshot of the pointer and offset at the start of a pan drag.
    pub fn begin_pan(&self, pointer: Pos2) -> PanAnchor {
        PanAnchor {
            pointer,
            offset: self.offset,
        }
    }

    /// Move the image by the pointer delta since `anchor`, scaled out of zoom.
    pub fn pan_to(&mut self, anchor: &PanAnchor, pointer: Pos2) {
        let delta = pointer - anchor.pointer;
        self.offset = anchor.offset + delta / self.zoom;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanAnchor {
    pub pointer: Pos2,
    pub offset: Vec2,
}

/// True when a view-space point (before dividing out zoom) lies on the canvas.
///
/// At zoom > 1 part of the visible canvas falls outside this test; events
/// there are rejected.
pub fn in_export_bounds(view: Pos2, export: ExportSize) -> bool {
    view.x >= 0.0
        && view.y >= 0.0
        && view.x <= export.width as f32
        && view.y <= export.height as f32
}

/// True when an image-local point hits a pixel of a `width × height` image.
pub fn in_image_bounds(local: Pos2, width: u32, height: u32) -> bool {
    local.x >= 0.0 && local.y >= 0.0 && local.x < width as f32 && local.y < height as f32
}

// ============================================================================
// RENDER TARGETS
// ============================================================================

/// A drawing surface that can take rectangular pixel buffers.
pub trait RenderTarget {
    fn dimensions(&self) -> (u32, u32);

    fn clear(&mut self, color: Rgba<u8>);

    /// Copy `src` with its top-left at `(x, y)`, clipped to the surface.
    /// Destination pixels are replaced, not blended.
    fn blit(&mut self, src: &RgbaImage, x: i64, y: i64);

    /// Like [`RenderTarget::blit`] but scaled (nearest neighbour) to `width × height`.
    fn blit_stretched(&mut self, src: &RgbaImage, x: i64, y: i64, width: u32, height: u32) {
        if width == 0 || height == 0 || src.width() == 0 || src.height() == 0 {
            return;
        }
        if src.dimensions() == (width, height) {
            self.blit(src, x, y);
        } else {
            let scaled = imageops::resize(src, width, height, imageops::FilterType::Nearest);
            self.blit(&scaled, x, y);
        }
    }
}

/// CPU-backed RGBA surface: the visible frame and the commit compositor.
#[derive(Clone, Debug)]
pub struct PixelSurface {
    pixels: RgbaImage,
}

impl PixelSurface {
    /// Fully transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn for_export(size: ExportSize) -> Self {
        Self::new(size.width, size.height)
    }

    /// Reallocate to a new size (contents are discarded).
    pub fn resize(&mut self, size: ExportSize) {
        if self.pixels.dimensions() != (size.width, size.height) {
            self.pixels = RgbaImage::new(size.width, size.height);
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }
}

impl RenderTarget for PixelSurface {
    fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    fn clear(&mut self, color: Rgba<u8>) {
        let px = color.0;
        self.pixels
            .par_chunks_exact_mut(4)
            .for_each(|dst| dst.copy_from_slice(&px));
    }

    fn blit(&mut self, src: &RgbaImage, x: i64, y: i64) {
        let (dw, dh) = self.pixels.dimensions();
        let (sw, sh) = src.dimensions();

        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + sw as i64).min(dw as i64);
        let y1 = (y + sh as i64).min(dh as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let dst_stride = dw as usize * 4;
        let src_stride = sw as usize * 4;
        let run = (x1 - x0) as usize * 4;
        let dst_col = x0 as usize * 4;
        let src_col = (x0 - x) as usize * 4;
        let src_row0 = (y0 - y) as usize;
        let src_raw = src.as_raw();

        let copy_row = |i: usize, row: &mut [u8]| {
            let s = (src_row0 + i) * src_stride + src_col;
            row[dst_col..dst_col + run].copy_from_slice(&src_raw[s..s + run]);
        };

        let buf: &mut [u8] = &mut self.pixels;
        let region = &mut buf[y0 as usize * dst_stride..y1 as usize * dst_stride];
        if (y1 - y0) as usize >= PARALLEL_BLIT_ROWS {
            region
                .par_chunks_exact_mut(dst_stride)
                .enumerate()
                .for_each(|(i, row)| copy_row(i, row));
        } else {
            region
                .chunks_exact_mut(dst_stride)
                .enumerate()
                .for_each(|(i, row)| copy_row(i, row));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn export() -> ExportSize {
        ExportSize::new(1080, 1080)
    }

    #[test]
    fn view_local_round_trip() {
        let mut view = ViewState::default();
        view.offset = vec2(339.5, -12.25);
        for zoom in [0.1, 0.37, 1.0, 2.5, 3.0] {
            view.set_zoom(zoom);
            for p in [pos2(0.0, 0.0), pos2(17.3, 900.9), pos2(1080.0, 1.0)] {
                let back = view.local_to_view(view.view_to_local(p));
                assert!((back.x - p.x).abs() < EPS && (back.y - p.y).abs() < EPS, "{p:?} at {zoom}");
            }
        }
    }

    #[test]
    fn zoom_is_divided_out() {
        let mut view = ViewState::default();
        view.offset = vec2(100.0, 50.0);
        view.set_zoom(2.0);
        assert_eq!(view.view_to_local(pos2(400.0, 200.0)), pos2(100.0, 50.0));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut view = ViewState::default();
        view.set_zoom(10.0);
        assert_eq!(view.zoom(), ZOOM_MAX);
        view.set_zoom(0.0);
        assert_eq!(view.zoom(), ZOOM_MIN);
        view.set_zoom(f32::NAN);
        assert_eq!(view.zoom(), ZOOM_MIN);
    }

    #[test]
    fn centering_policy() {
        let mut view = ViewState::default();
        view.center(ExportSize::new(1920, 1080), 400, 400);
        assert_eq!(view.offset, vec2(760.0, 340.0));
        view.center(export(), 401, 400);
        assert_eq!(view.offset.x, 339.5);
        assert_eq!(view.placement(), (339, 340));
    }

    #[test]
    fn pan_divides_delta_by_zoom() {
        let mut view = ViewState::default();
        view.offset = vec2(10.0, 20.0);
        view.set_zoom(2.0);
        let anchor = view.begin_pan(pos2(100.0, 100.0));
        view.pan_to(&anchor, pos2(140.0, 80.0));
        assert_eq!(view.offset, vec2(30.0, 10.0));
        // Relative to the anchor, not cumulative.
        view.pan_to(&anchor, pos2(100.0, 100.0));
        assert_eq!(view.offset, vec2(10.0, 20.0));
    }

    #[test]
    fn bounds_checks() {
        assert!(in_export_bounds(pos2(0.0, 0.0), export()));
        assert!(in_export_bounds(pos2(1080.0, 1080.0), export()));
        assert!(!in_export_bounds(pos2(-0.1, 5.0), export()));
        assert!(!in_export_bounds(pos2(5.0, 1080.5), export()));

        assert!(in_image_bounds(pos2(0.0, 9.9), 10, 10));
        assert!(!in_image_bounds(pos2(10.0, 0.0), 10, 10));
        assert!(!in_image_bounds(pos2(-0.01, 0.0), 10, 10));
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.49), 2);
        assert_eq!(round_half_up(-2.5), -2);
        assert_eq!(round_half_up(-2.51), -3);
    }

    #[test]
    fn blit_clips_on_every_edge() {
        let mut surface = PixelSurface::new(4, 4);
        let src = RgbaImage::from_pixel(3, 3, Rgba([9, 8, 7, 255]));
        surface.blit(&src, -1, -1);
        surface.blit(&src, 3, 3);
        let img = surface.image();
        assert_eq!(img.get_pixel(0, 0).0, [9, 8, 7, 255]);
        assert_eq!(img.get_pixel(1, 1).0, [9, 8, 7, 255]);
        assert_eq!(img.get_pixel(2, 2).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(3, 3).0, [9, 8, 7, 255]);
        surface.blit(&src, 100, -100);
    }

    #[test]
    fn blit_replaces_translucent_pixels() {
        let mut surface = PixelSurface::new(2, 1);
        surface.clear(CANVAS_BACKGROUND);
        surface.blit(&RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 10])), 1, 0);
        assert_eq!(surface.image().get_pixel(1, 0).0, [255, 0, 0, 10]);
        assert_eq!(surface.image().get_pixel(0, 0).0, CANVAS_BACKGROUND.0);
    }

    #[test]
    fn large_blits_match_small_ones() {
        let src = RgbaImage::from_fn(50, 200, |x, y| Rgba([x as u8, y as u8, 3, 255]));
        let mut surface = PixelSurface::new(60, 180);
        surface.blit(&src, 5, -10);
        for y in 0..180 {
            for x in 5..55 {
                assert_eq!(surface.image().get_pixel(x, y), src.get_pixel(x - 5, y + 10));
            }
        }
    }

    #[test]
    fn stretched_blit_scales_nearest() {
        let mut surface = PixelSurface::new(4, 2);
        let strip = RgbaImage::from_fn(2, 1, |x, _| Rgba([x as u8 * 100, 0, 0, 255]));
        surface.blit_stretched(&strip, 0, 0, 4, 2);
        assert_eq!(surface.image().get_pixel(1, 1).0, [0, 0, 0, 255]);
        assert_eq!(surface.image().get_pixel(3, 0).0, [100, 0, 0, 255]);
        surface.blit_stretched(&strip, 0, 0, 0, 2);
    }
}
