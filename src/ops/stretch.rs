// ============================================================================
// PIXEL STRETCH - replicate one row/column across a band of lines
// ============================================================================

use std::ops::RangeInclusive;

use egui::Pos2;
use image::{RgbaImage, imageops};

use crate::canvas::{PixelSurface, RenderTarget, round_half_up};
use crate::error::EditorError;
use crate::settings::ExportSize;

/// Direction of the selected line.
///
/// `Horizontal` picks a row and stretches it up/down; `Vertical` picks a
/// column and stretches it left/right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Axis {
    #[default]
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn all() -> &'static [Axis] {
        &[Axis::Horizontal, Axis::Vertical]
    }

    pub fn id(self) -> &'static str {
        match self {
            Axis::Horizontal => "horizontal",
            Axis::Vertical => "vertical",
        }
    }

    /// Short radio-button label.
    pub fn label(self) -> &'static str {
        match self {
            Axis::Horizontal => "Hor",
            Axis::Vertical => "Ver",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "horizontal" | "hor" | "h" => Some(Axis::Horizontal),
            "vertical" | "ver" | "v" => Some(Axis::Vertical),
            _ => None,
        }
    }

    /// How many lines an image of `width × height` has along this axis.
    pub fn line_count(self, width: u32, height: u32) -> u32 {
        match self {
            Axis::Horizontal => height,
            Axis::Vertical => width,
        }
    }

    /// The coordinate of `local` that selects a line on this axis.
    pub fn pick(self, local: Pos2) -> f32 {
        match self {
            Axis::Horizontal => local.y,
            Axis::Vertical => local.x,
        }
    }
}

/// The line grabbed at pointer-down. Only lives for one drag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionLine {
    pub axis: Axis,
    pub position: i64,
}

impl SelectionLine {
    /// Line under an image-local point, clamped into a `width × height` image.
    pub fn at(axis: Axis, local: Pos2, width: u32, height: u32) -> Self {
        let last = axis.line_count(width, height).saturating_sub(1) as i64;
        Self {
            axis,
            position: round_half_up(axis.pick(local)).clamp(0, last),
        }
    }

    /// Live drag target for `local`. Not clamped: the band may run past the image.
    pub fn target_at(&self, local: Pos2) -> i64 {
        round_half_up(self.axis.pick(local))
    }
}

/// Copy the full row (`width × 1`) or column (`1 × height`) at `source`,
/// clamped into the image. `None` when there is nothing to sample.
pub fn sample_strip(image: &RgbaImage, axis: Axis, source: i64) -> Option<RgbaImage> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let last = axis.line_count(w, h) as i64 - 1;
    let line = source.clamp(0, last) as u32;
    let strip = match axis {
        Axis::Horizontal => imageops::crop_imm(image, 0, line, w, 1).to_image(),
        Axis::Vertical => imageops::crop_imm(image, line, 0, 1, h).to_image(),
    };
    if strip.width() == 0 || strip.height() == 0 {
        None
    } else {
        Some(strip)
    }
}

/// A sampled strip plus the inclusive band of lines it is replicated over.
#[derive(Clone, Debug)]
pub struct StretchBand {
    axis: Axis,
    lo: i64,
    hi: i64,
    strip: RgbaImage,
}

impl StretchBand {
    /// Drag direction does not matter, only the two endpoints.
    pub fn new(image: &RgbaImage, line: SelectionLine, target: i64) -> Result<Self, EditorError> {
        let strip = sample_strip(image, line.axis, line.position).ok_or(EditorError::EmptySample)?;
        Ok(Self {
            axis: line.axis,
            lo: line.position.min(target),
            hi: line.position.max(target),
            strip,
        })
    }

    pub fn lines(&self) -> RangeInclusive<i64> {
        self.lo..=self.hi
    }

    /// Blit the strip at every band line, offset by the image `placement`.
    /// Lines that land outside the target are skipped. Returns lines drawn.
    pub fn draw<T: RenderTarget + ?Sized>(&self, target: &mut T, placement: (i64, i64)) -> usize {
        let (tw, th) = target.dimensions();
        let (px, py) = placement;
        let (base, extent) = match self.axis {
            Axis::Horizontal => (py, th as i64),
            Axis::Vertical => (px, tw as i64),
        };

        let first = self.lo.max(-base);
        let last = self.hi.min(extent - 1 - base);
        if first > last {
            return 0;
        }

        let (sw, sh) = self.strip.dimensions();
        for line in first..=last {
            match self.axis {
                Axis::Horizontal => target.blit_stretched(&self.strip, px, py + line, sw, 1),
                Axis::Vertical => target.blit_stretched(&self.strip, px + line, py, 1, sh),
            }
        }
        (last - first + 1) as usize
    }
}

/// Overlay a live stretch on `frame`. The caller redraws the base image first
/// so the previous preview frame does not linger.
pub fn preview<T: RenderTarget + ?Sized>(
    frame: &mut T,
    image: &RgbaImage,
    placement: (i64, i64),
    line: SelectionLine,
    target: i64,
) -> Result<usize, EditorError> {
    let band = StretchBand::new(image, line, target)?;
    Ok(band.draw(frame, placement))
}

/// Composite the stretch into a fresh export-sized raster: the current image
/// at its placement, then the band on top. The result sits at (0, 0).
pub fn commit(
    image: &RgbaImage,
    placement: (i64, i64),
    export: ExportSize,
    line: SelectionLine,
    target: i64,
) -> Result<RgbaImage, EditorError> {
    let band = StretchBand::new(image, line, target)?;
    let mut surface = PixelSurface::for_export(export);
    surface.blit(image, placement.0, placement.1);
    band.draw(&mut surface, placement);
    Ok(surface.into_image())
}
