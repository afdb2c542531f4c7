use egui::Pos2;

use crate::canvas::{PanAnchor, RenderTarget, in_export_bounds, in_image_bounds};
use crate::ops::stretch::{self, Axis, SelectionLine};
use crate::project::Project;

// ============================================================================
// POINTER INPUT
// ============================================================================

/// Pointer input in view space: canvas pixels as shown on screen, zoom
/// still applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down { pos: Pos2, pan_modifier: bool },
    Move(Pos2),
    Up(Pos2),
    /// Pointer left the canvas; ends any drag like a release at the last position.
    Leave,
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum ToolState {
    #[default]
    Idle,
    Panning(PanAnchor),
    Stretching {
        line: SelectionLine,
        /// Last previewed target; used when the drag ends without a position.
        target: i64,
    },
}

/// What an event did, so the UI knows whether to refresh its texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolOutcome {
    Ignored,
    PanStarted,
    Panned,
    PanEnded,
    StretchStarted,
    /// Preview drawn over the frame; value is the number of band lines drawn.
    Previewed(usize),
    Committed,
    /// Drag ended without producing a new image.
    Discarded,
}

// ============================================================================
// STRETCH TOOL - idle / panning / stretching
// ============================================================================

/// Routes pointer events to panning or stretching.
///
/// Holding the pan modifier on press pans the image anywhere on the canvas;
/// a plain press inside the image grabs the line under the pointer. The axis
/// is read at press time and kept for the whole drag.
#[derive(Default)]
pub struct StretchTool {
    pub axis: Axis,
    state: ToolState,
}

impl StretchTool {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            state: ToolState::Idle,
        }
    }

    pub fn state(&self) -> ToolState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != ToolState::Idle
    }

    /// Drop any drag in progress without touching the project.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
    }

    pub fn handle<T: RenderTarget + ?Sized>(
        &mut self,
        project: &mut Project,
        event: PointerEvent,
        frame: &mut T,
    ) -> ToolOutcome {
        match event {
            PointerEvent::Down { pos, pan_modifier } => self.pointer_down(project, pos, pan_modifier),
            PointerEvent::Move(pos) => self.pointer_move(project, pos, frame),
            PointerEvent::Up(pos) => self.pointer_up(project, Some(pos)),
            PointerEvent::Leave => self.pointer_up(project, None),
        }
    }

    pub fn pointer_down(&mut self, project: &mut Project, pos: Pos2, pan_modifier: bool) -> ToolOutcome {
        if self.is_active() || !in_export_bounds(pos, project.export_size()) {
            return ToolOutcome::Ignored;
        }
        let Some(img) = project.image() else {
            return ToolOutcome::Ignored;
        };

        if pan_modifier {
            self.state = ToolState::Panning(project.view.begin_pan(pos));
            return ToolOutcome::PanStarted;
        }

        let local = project.view.view_to_local(pos);
        if !in_image_bounds(local, img.width(), img.height()) {
            return ToolOutcome::Ignored;
        }
        let line = SelectionLine::at(self.axis, local, img.width(), img.height());
        self.state = ToolState::Stretching {
            line,
            target: line.position,
        };
        ToolOutcome::StretchStarted
    }

    /// Pan, or redraw the base image into `frame` and overlay the live stretch.
    pub fn pointer_move<T: RenderTarget + ?Sized>(
        &mut self,
        project: &mut Project,
        pos: Pos2,
        frame: &mut T,
    ) -> ToolOutcome {
        match self.state {
            ToolState::Idle => ToolOutcome::Ignored,
            ToolState::Panning(anchor) => {
                project.view.pan_to(&anchor, pos);
                project.redraw(frame);
                ToolOutcome::Panned
            }
            ToolState::Stretching { line, .. } => {
                let target = line.target_at(project.view.view_to_local(pos));
                self.state = ToolState::Stretching { line, target };

                project.redraw(frame);
                let Some(img) = project.image() else {
                    return ToolOutcome::Ignored;
                };
                match stretch::preview(frame, img, project.view.placement(), line, target) {
                    Ok(lines) => ToolOutcome::Previewed(lines),
                    Err(_) => ToolOutcome::Ignored,
                }
            }
        }
    }

    /// End the drag. A stretch commits with the target under `pos`, or the
    /// last previewed target when the position is unknown.
    pub fn pointer_up(&mut self, project: &mut Project, pos: Option<Pos2>) -> ToolOutcome {
        match std::mem::take(&mut self.state) {
            ToolState::Idle => ToolOutcome::Ignored,
            ToolState::Panning(_) => ToolOutcome::PanEnded,
            ToolState::Stretching { line, target } => {
                let target = pos
                    .map(|p| line.target_at(project.view.view_to_local(p)))
                    .unwrap_or(target);
                match project.commit_stretch(line, target) {
                    Ok(()) => ToolOutcome::Committed,
                    Err(e) if e.is_silent() => ToolOutcome::Discarded,
                    Err(e) => {
                        log_err!("Stretch commit failed: {}", e);
                        ToolOutcome::Discarded
                    }
                }
            }
        }
    }
}
