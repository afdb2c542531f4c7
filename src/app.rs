use crate::canvas::{PixelSurface, RenderTarget};
use crate::components::tools::{PointerEvent, StretchTool, ToolOutcome};
use crate::error::EditorError;
use crate::io::FileHandler;
use crate::ops::stretch::Axis;
use crate::project::Project;
use crate::settings::{AppSettings, ExportPreset, ZOOM_MAX, ZOOM_MIN, ZOOM_STEP, zoom_label};
use eframe::egui;
use egui::{Color32, Key, Modifiers, Pos2, Rect, pos2};

/// Texture name for the visible canvas frame.
const CANVAS_TEXTURE: &str = "pixelstretch_canvas";

// ============================================================================
// APP STATE
// ============================================================================

pub struct PixelStretchApp {
    project: Project,
    tool: StretchTool,
    settings: AppSettings,
    file_handler: FileHandler,

    /// CPU-side copy of what the canvas shows: base image, plus a live
    /// stretch preview while dragging.
    frame: PixelSurface,
    texture: Option<egui::TextureHandle>,
    /// Frame must be rebuilt from the project before the next paint.
    frame_dirty: bool,
    /// Frame changed since the last texture upload.
    texture_stale: bool,

    /// Current file name, or the reason the last file was rejected.
    file_label: String,
    /// Last save / IO message for the status bar.
    status_message: Option<String>,
    window_title: String,
}

impl PixelStretchApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        // Initialize settings from disk (or defaults if no saved file)
        let settings = AppSettings::load();

        if let Err(e) = ExportPreset::validate_table() {
            log_err!("{}", e);
        }

        let mut project = Project::new(settings.export_preset, settings.max_history_steps);
        project.set_zoom(settings.zoom);
        let frame = PixelSurface::for_export(project.export_size());

        log_info!(
            "Editor ready: export {}, axis {}, zoom {}",
            settings.export_preset.id(),
            settings.axis.id(),
            zoom_label(settings.zoom)
        );

        Self {
            file_label: project.display_name(),
            project,
            tool: StretchTool::new(settings.axis),
            settings,
            file_handler: FileHandler::new(),
            frame,
            texture: None,
            frame_dirty: true,
            texture_stale: true,
            status_message: None,
            window_title: String::new(),
        }
    }

    // ---- actions -----------------------------------------------------------

    fn open_dialog(&mut self) {
        if let Some(path) = self.file_handler.pick_image_path() {
            self.open_path(&path);
        }
    }

    fn open_path(&mut self, path: &std::path::Path) {
        self.tool.cancel();
        match self.project.load_path(path) {
            Ok(()) => {
                self.file_label = self.project.display_name();
                self.status_message = None;
                self.frame_dirty = true;
            }
            Err(e) => self.file_label = e.to_string(),
        }
    }

    fn open_dropped(&mut self, file: egui::DroppedFile) {
        if let Some(path) = file.path {
            self.open_path(&path);
        } else if let Some(bytes) = file.bytes {
            self.tool.cancel();
            match self.project.load_bytes(&file.name, &bytes) {
                Ok(()) => {
                    self.file_label = self.project.display_name();
                    self.frame_dirty = true;
                }
                Err(e) => self.file_label = e.to_string(),
            }
        }
    }

    fn save_dialog(&mut self) {
        if !self.project.has_image() {
            return;
        }
        let default_name = self.project.export_file_name();
        let Some(path) = self.file_handler.pick_export_path(&default_name) else {
            return;
        };
        self.status_message = Some(match self.project.save_to(&path) {
            Ok(()) => format!("Saved {}", path.display()),
            Err(e) => format!("Save failed: {}", e),
        });
    }

    /// Run a history action; `NoImageLoaded` stays silent.
    fn apply(&mut self, action: fn(&mut Project) -> Result<bool, EditorError>) {
        if self.tool.is_active() {
            return;
        }
        match action(&mut self.project) {
            Ok(true) => self.frame_dirty = true,
            Ok(false) => {}
            Err(e) if e.is_silent() => {}
            Err(e) => self.status_message = Some(e.to_string()),
        }
    }

    fn center(&mut self) {
        if self.tool.is_active() {
            return;
        }
        self.project.center();
        self.frame_dirty = true;
    }

    fn set_export_preset(&mut self, preset: ExportPreset) {
        self.tool.cancel();
        self.project.set_export_preset(preset);
        self.frame.resize(preset.size());
        self.settings.export_preset = preset;
        self.frame_dirty = true;
    }

    fn persist_settings(&mut self) {
        self.settings.export_preset = self.project.export_preset();
        self.settings.axis = self.tool.axis;
        self.settings.zoom = self.project.view.zoom();
        self.settings.save();
    }

    // ---- input -------------------------------------------------------------

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let (undo, redo, save) = ctx.input_mut(|i| {
            let redo = i.consume_key(Modifiers::COMMAND | Modifiers::SHIFT, Key::Z)
                || i.consume_key(Modifiers::COMMAND, Key::Y);
            let undo = i.consume_key(Modifiers::COMMAND, Key::Z);
            let save = i.consume_key(Modifiers::COMMAND, Key::S);
            (undo, redo, save)
        });
        if redo {
            self.apply(Project::redo);
        } else if undo {
            self.apply(Project::undo);
        }
        if save {
            self.save_dialog();
        }
    }

    /// Translate this frame's pointer state into tool events. Positions are
    /// made relative to the displayed canvas rect, so zoom is still applied.
    fn dispatch_pointer(&mut self, ctx: &egui::Context, rect: Rect, response: &egui::Response) {
        let (pressed, released, moved, pointer, hover, shift) = ctx.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.delta() != egui::Vec2::ZERO,
                i.pointer.interact_pos(),
                i.pointer.hover_pos(),
                i.modifiers.shift,
            )
        });
        let to_view = |p: Pos2| (p - rect.min).to_pos2();

        if pressed
            && response.hovered()
            && let Some(p) = pointer
        {
            self.tool.pointer_down(&mut self.project, to_view(p), shift);
            // A fast click can press and release within one frame.
            if !released {
                return;
            }
        }

        let outcome = if !self.tool.is_active() {
            ToolOutcome::Ignored
        } else if released {
            self.tool.pointer_up(&mut self.project, pointer.map(to_view))
        } else if !hover.is_some_and(|p| rect.contains(p)) {
            self.tool.handle(&mut self.project, PointerEvent::Leave, &mut self.frame)
        } else if moved && let Some(p) = pointer {
            self.tool.pointer_move(&mut self.project, to_view(p), &mut self.frame)
        } else {
            ToolOutcome::Ignored
        };

        match outcome {
            ToolOutcome::Panned | ToolOutcome::Previewed(_) => self.texture_stale = true,
            ToolOutcome::PanEnded | ToolOutcome::Committed | ToolOutcome::Discarded => {
                self.frame_dirty = true
            }
            ToolOutcome::Ignored | ToolOutcome::PanStarted | ToolOutcome::StretchStarted => {}
        }
    }

    // ---- rendering ---------------------------------------------------------

    fn sync_texture(&mut self, ctx: &egui::Context) {
        if self.frame_dirty && !self.tool.is_active() {
            self.project.redraw(&mut self.frame);
            self.frame_dirty = false;
            self.texture_stale = true;
        }
        if !self.texture_stale {
            return;
        }
        let (w, h) = self.frame.dimensions();
        let color = egui::ColorImage::from_rgba_unmultiplied(
            [w as usize, h as usize],
            self.frame.image().as_raw(),
        );
        match &mut self.texture {
            Some(texture) => texture.set(color, egui::TextureOptions::NEAREST),
            None => {
                self.texture =
                    Some(ctx.load_texture(CANVAS_TEXTURE, color, egui::TextureOptions::NEAREST))
            }
        }
        self.texture_stale = false;
    }

    fn show_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            if ui.button("Open…").clicked() {
                self.open_dialog();
            }
            ui.label(self.file_label.as_str());
            ui.separator();

            ui.label("Size:");
            let mut preset = self.project.export_preset();
            egui::ComboBox::from_id_source("export_size")
                .selected_text(preset.label())
                .show_ui(ui, |ui| {
                    for p in ExportPreset::all() {
                        ui.selectable_value(&mut preset, *p, p.label());
                    }
                });
            if preset != self.project.export_preset() {
                self.set_export_preset(preset);
            }
            ui.separator();

            ui.label("Axis:");
            for axis in Axis::all() {
                ui.radio_value(&mut self.tool.axis, *axis, axis.label());
            }
            ui.separator();

            ui.label("Zoom:");
            let mut zoom = self.project.view.zoom();
            let slider = egui::Slider::new(&mut zoom, ZOOM_MIN..=ZOOM_MAX)
                .step_by(ZOOM_STEP as f64)
                .show_value(false);
            if ui.add(slider).changed() {
                self.project.set_zoom(zoom);
            }
            ui.label(zoom_label(self.project.view.zoom()));
            ui.separator();

            if ui.button("Center").clicked() {
                self.center();
            }
            if ui.button("Reset").clicked() {
                self.apply(Project::reset);
            }
            if ui
                .add_enabled(self.project.history.can_undo(), egui::Button::new("Undo"))
                .clicked()
            {
                self.apply(Project::undo);
            }
            if ui
                .add_enabled(self.project.history.can_redo(), egui::Button::new("Redo"))
                .clicked()
            {
                self.apply(Project::redo);
            }
            if ui
                .add_enabled(self.project.has_image(), egui::Button::new("Save"))
                .clicked()
            {
                self.save_dialog();
            }
        });
    }

    fn show_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            match self.project.image() {
                Some(img) => ui.label(format!("{}×{}", img.width(), img.height())),
                None => ui.label("No image"),
            };
            ui.separator();
            ui.label(format!("Canvas {}", self.project.export_preset().label()));
            ui.separator();
            ui.label(zoom_label(self.project.view.zoom()));
            ui.separator();
            let history = &self.project.history;
            ui.label(format!(
                "Undo {} / Redo {}",
                history.undo_count().saturating_sub(1),
                history.redo_count()
            ));
            ui.label(format!(
                "({:.1} MB)",
                history.memory_usage() as f64 / (1024.0 * 1024.0)
            ));
            if let Some(msg) = &self.status_message {
                ui.separator();
                ui.label(msg.as_str());
            }
        });
    }

    fn show_canvas(&mut self, ui: &mut egui::Ui) {
        let export = self.project.export_size();
        let zoom = self.project.view.zoom();
        let size = egui::vec2(export.width as f32 * zoom, export.height as f32 * zoom);
        let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());

        self.dispatch_pointer(ui.ctx(), rect, &response);
        self.sync_texture(ui.ctx());

        if let Some(texture) = &self.texture {
            let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
            ui.painter().image(texture.id(), rect, uv, Color32::WHITE);
        }
        if self.project.has_image() {
            response.on_hover_cursor(if self.tool.is_active() {
                egui::CursorIcon::Grabbing
            } else {
                egui::CursorIcon::Crosshair
            });
        }
    }
}

impl eframe::App for PixelStretchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Window title: "PixelStretch - <file>" ---
        let title = match self.project.source_name() {
            Some(name) => format!("PixelStretch - {}", name),
            None => "PixelStretch".to_string(),
        };
        if title != self.window_title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.window_title = title;
        }

        // --- Persist settings when the window closes ---
        if ctx.input(|i| i.viewport().close_requested()) {
            self.persist_settings();
        }

        // --- Drag-and-Drop: open the first dropped file ---
        let dropped: Vec<egui::DroppedFile> = ctx.input(|i| i.raw.dropped_files.clone());
        if let Some(file) = dropped.into_iter().next() {
            self.open_dropped(file);
        }

        if !self.tool.is_active() {
            self.handle_shortcuts(ctx);
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.show_toolbar(ui));
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| self.show_status_bar(ui));
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both()
                .auto_shrink([false, false])
                .drag_to_scroll(false)
                .show(ui, |ui| self.show_canvas(ui));
        });
    }
}
