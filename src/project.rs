use image::RgbaImage;
use std::path::Path;
use uuid::Uuid;

use crate::canvas::{CANVAS_BACKGROUND, PixelSurface, RenderTarget, ViewState};
use crate::components::history::HistoryManager;
use crate::error::EditorError;
use crate::io;
use crate::ops::stretch::{self, SelectionLine};
use crate::settings::{ExportPreset, ExportSize, MAX_HISTORY_SIZE};

/// One editing session: the current image, where it sits, its history and
/// the export target.
///
/// The current image is owned here; history only ever holds copies.
pub struct Project {
    pub id: Uuid,
    image: Option<RgbaImage>,
    pub view: ViewState,
    export_preset: ExportPreset,
    pub history: HistoryManager,
    /// File name the image was loaded from (`None` until the first load).
    source_name: Option<String>,
}

impl Default for Project {
    fn default() -> Self {
        Self::new(ExportPreset::default(), MAX_HISTORY_SIZE)
    }
}

impl Project {
    pub fn new(export_preset: ExportPreset, max_history_size: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            image: None,
            view: ViewState::default(),
            export_preset,
            history: HistoryManager::new(max_history_size),
            source_name: None,
        }
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    pub fn export_preset(&self) -> ExportPreset {
        self.export_preset
    }

    pub fn export_size(&self) -> ExportSize {
        self.export_preset.size()
    }

    /// Label for the file field: truncated source name, or "No file".
    pub fn display_name(&self) -> String {
        match &self.source_name {
            Some(name) => io::truncate_name(name),
            None => "No file".to_string(),
        }
    }

    // ---- loading -----------------------------------------------------------

    /// Replace the session with a decoded image: fit it to the export size,
    /// restart history from it and center it.
    pub fn load_image(&mut self, name: Option<String>, decoded: RgbaImage) {
        let (orig_w, orig_h) = decoded.dimensions();
        let img = io::fit_within(decoded, self.export_size());
        self.history.reset_to(&img);
        log_info!(
            "Project {}: loaded {} ({}x{} -> {}x{})",
            self.id,
            name.as_deref().unwrap_or("<memory>"),
            orig_w,
            orig_h,
            img.width(),
            img.height()
        );
        self.image = Some(img);
        self.source_name = name;
        self.center();
    }

    /// Decode `bytes` for a file called `name` and load it. Leaves the
    /// session untouched on failure.
    pub fn load_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<(), EditorError> {
        match io::decode_image(name, bytes) {
            Ok(img) => {
                self.load_image(Some(name.to_string()), img);
                Ok(())
            }
            Err(e) => {
                log_warn!("Rejected {}: {}", name, e);
                Err(e)
            }
        }
    }

    pub fn load_path(&mut self, path: &Path) -> Result<(), EditorError> {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match io::load_image_sync(path) {
            Ok(img) => {
                self.load_image(Some(name), img);
                Ok(())
            }
            Err(e) => {
                log_warn!("Rejected {}: {}", path.display(), e);
                Err(e)
            }
        }
    }

    // ---- view --------------------------------------------------------------

    /// Apply the centering policy to the current image (no-op without one).
    pub fn center(&mut self) {
        if let Some(img) = &self.image {
            self.view.center(self.export_size(), img.width(), img.height());
        }
    }

    /// Change the export size. Pixels are not resampled; the image is re-centered.
    pub fn set_export_preset(&mut self, preset: ExportPreset) {
        if preset == self.export_preset {
            return;
        }
        self.export_preset = preset;
        self.center();
        log_info!("Project {}: export size {}", self.id, preset.id());
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.view.set_zoom(zoom);
    }

    // ---- edits & history ---------------------------------------------------

    /// Make `new_image` current and record it. The image is export-sized, so
    /// its placement is normalized to the canvas origin.
    pub fn commit(&mut self, new_image: RgbaImage) {
        self.history.push(&new_image);
        self.image = Some(new_image);
        self.view.offset = egui::Vec2::ZERO;
    }

    /// Stretch `line` out to `target` and commit the result.
    pub fn commit_stretch(&mut self, line: SelectionLine, target: i64) -> Result<(), EditorError> {
        let img = self.image.as_ref().ok_or(EditorError::NoImageLoaded)?;
        let result = stretch::commit(img, self.view.placement(), self.export_size(), line, target)?;
        self.commit(result);
        log_info!(
            "Project {}: stretched {} line {} to {} ({} snapshots)",
            self.id,
            line.axis.id(),
            line.position,
            target,
            self.history.undo_count()
        );
        Ok(())
    }

    /// Returns whether anything changed.
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        if self.image.is_none() {
            return Err(EditorError::NoImageLoaded);
        }
        let Some(previous) = self.history.undo() else { return Ok(false) };
        self.image = Some(previous);
        self.center();
        log_info!("Project {}: undo ({} left)", self.id, self.history.undo_count());
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        if self.image.is_none() {
            return Err(EditorError::NoImageLoaded);
        }
        let Some(next) = self.history.redo() else { return Ok(false) };
        self.image = Some(next);
        self.center();
        log_info!("Project {}: redo ({} left)", self.id, self.history.redo_count());
        Ok(true)
    }

    /// Back to the first loaded image; history collapses to that one entry.
    pub fn reset(&mut self) -> Result<bool, EditorError> {
        if self.image.is_none() {
            return Err(EditorError::NoImageLoaded);
        }
        let Some(baseline) = self.history.reset() else { return Ok(false) };
        self.image = Some(baseline);
        self.center();
        log_info!("Project {}: reset to original", self.id);
        Ok(true)
    }

    // ---- rendering & export ------------------------------------------------

    /// Full redraw of the visible frame: background, then the image at its placement.
    pub fn redraw<T: RenderTarget + ?Sized>(&self, frame: &mut T) {
        frame.clear(CANVAS_BACKGROUND);
        if let Some(img) = &self.image {
            let (x, y) = self.view.placement();
            frame.blit(img, x, y);
        }
    }

    /// The current image at its placement on a transparent export-sized surface.
    pub fn render_export(&self) -> Result<RgbaImage, EditorError> {
        let img = self.image.as_ref().ok_or(EditorError::NoImageLoaded)?;
        let mut surface = PixelSurface::for_export(self.export_size());
        let (x, y) = self.view.placement();
        surface.blit(img, x, y);
        Ok(surface.into_image())
    }

    pub fn export_file_name(&self) -> String {
        io::export_file_name(self.source_name.as_deref(), self.export_size())
    }

    pub fn encode_export(&self) -> Result<Vec<u8>, EditorError> {
        io::encode_png(&self.render_export()?)
    }

    /// Encode and write the export to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), EditorError> {
        let bytes = self.encode_export()?;
        if let Err(e) = io::write_bytes(&bytes, path) {
            log_err!("Project {}: saving {} failed: {}", self.id, path.display(), e);
            return Err(e);
        }
        log_info!("Project {}: exported {}", self.id, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::stretch::Axis;
    use egui::vec2;
    use image::Rgba;

    fn rows(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| Rgba([y as u8, x as u8, 50, 255]))
    }

    fn loaded(w: u32, h: u32) -> Project {
        let mut project = Project::default();
        project.load_image(Some("rows.png".into()), rows(w, h));
        project
    }

    fn stretch(project: &mut Project, position: i64, target: i64) {
        let line = SelectionLine { axis: Axis::Horizontal, position };
        project.commit_stretch(line, target).unwrap();
    }

    #[test]
    fn load_centers_and_seeds_history() {
        let project = loaded(400, 400);
        assert_eq!(project.view.offset, vec2(340.0, 340.0));
        assert_eq!(project.history.undo_count(), 1);
        assert_eq!(project.history.current(), project.image());
    }

    #[test]
    fn preset_change_recenters_without_resampling() {
        let mut project = loaded(400, 400);
        project.set_export_preset(ExportPreset::Landscape);
        assert_eq!(project.view.offset, vec2(760.0, 340.0));
        assert_eq!(project.image().map(|i| i.dimensions()), Some((400, 400)));
    }

    #[test]
    fn commit_normalizes_placement_and_tracks_history() {
        let mut project = loaded(400, 400);
        stretch(&mut project, 10, 20);
        assert_eq!(project.view.offset, egui::Vec2::ZERO);
        assert_eq!(project.image().map(|i| i.dimensions()), Some((1080, 1080)));
        assert_eq!(project.history.undo_count(), 2);
        assert_eq!(project.history.current(), project.image());
    }

    #[test]
    fn actions_without_image_are_rejected() {
        let mut project = Project::default();
        let line = SelectionLine { axis: Axis::Vertical, position: 0 };
        assert!(matches!(project.commit_stretch(line, 4), Err(EditorError::NoImageLoaded)));
        assert!(matches!(project.undo(), Err(EditorError::NoImageLoaded)));
        assert!(matches!(project.redo(), Err(EditorError::NoImageLoaded)));
        assert!(matches!(project.reset(), Err(EditorError::NoImageLoaded)));
        assert!(matches!(project.render_export(), Err(EditorError::NoImageLoaded)));
    }

    #[test]
    fn empty_sample_leaves_session_untouched() {
        // 5000×1 fits to 1080×0: there is no row to sample.
        let mut project = loaded(5000, 1);
        let before = project.image().cloned();
        assert_eq!(before.as_ref().map(|i| i.dimensions()), Some((1080, 0)));
        let offset = project.view.offset;

        let line = SelectionLine { axis: Axis::Horizontal, position: 0 };
        assert!(matches!(project.commit_stretch(line, 12), Err(EditorError::EmptySample)));
        assert_eq!(project.image().cloned(), before);
        assert_eq!(project.view.offset, offset);
        assert_eq!(project.history.undo_count(), 1);
        assert!(!project.history.can_redo());
    }

    #[test]
    fn undo_redo_is_an_inverse_pair() {
        let mut project = loaded(30, 30);
        stretch(&mut project, 3, 9);
        // Image now sits at the origin; original rows live at 525..555.
        stretch(&mut project, 530, 540);
        let before = project.image().cloned();
        assert!(project.undo().unwrap());
        assert_ne!(project.image().cloned(), before);
        assert!(project.redo().unwrap());
        assert_eq!(project.image().cloned(), before);
        assert!(!project.redo().unwrap());
    }

    #[test]
    fn reset_restores_the_first_load() {
        let mut project = loaded(1600, 800);
        let first = project.image().cloned();
        assert_eq!(first.as_ref().map(|i| i.dimensions()), Some((1080, 540)));
        stretch(&mut project, 5, 50);
        stretch(&mut project, 500, 700);
        project.undo().unwrap();
        assert!(project.reset().unwrap());
        assert_eq!(project.image().cloned(), first);
        assert_eq!(project.history.undo_count(), 1);
        assert!(!project.history.can_redo());
        assert_eq!(project.view.offset, vec2(0.0, 270.0));
    }

    #[test]
    fn failed_decode_leaves_session_untouched() {
        let mut project = loaded(8, 8);
        let before = project.image().cloned();
        assert!(project.load_bytes("broken.png", b"nope").is_err());
        assert!(project.load_bytes("notes.txt", b"nope").is_err());
        assert_eq!(project.image().cloned(), before);
        assert_eq!(project.source_name(), Some("rows.png"));
    }

    #[test]
    fn export_renders_at_placement() {
        let mut project = loaded(4, 2);
        project.set_export_preset(ExportPreset::LinkPreview);
        let out = project.render_export().unwrap();
        assert_eq!(out.dimensions(), (1200, 628));
        assert_eq!(out.get_pixel(598, 313), &Rgba([0, 0, 50, 255]));
        assert_eq!(out.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(project.export_file_name(), "rows_1200x628.png");
    }

    #[test]
    fn redraw_paints_background_then_image() {
        let project = loaded(2, 2);
        let mut frame = PixelSurface::for_export(project.export_size());
        project.redraw(&mut frame);
        assert_eq!(*frame.image().get_pixel(0, 0), CANVAS_BACKGROUND);
        assert_eq!(frame.image().get_pixel(539, 539), &Rgba([0, 0, 50, 255]));
    }
}
