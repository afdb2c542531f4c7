use std::path::PathBuf;

use crate::error::EditorError;
use crate::ops::stretch::Axis;

pub const ZOOM_MIN: f32 = 0.1;
pub const ZOOM_MAX: f32 = 3.0;
pub const ZOOM_STEP: f32 = 0.01;

/// Default bound on the number of history snapshots.
pub const MAX_HISTORY_SIZE: usize = 30;

/// Canvas / export target size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExportSize {
    pub width: u32,
    pub height: u32,
}

impl ExportSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

// ============================================================================
// EXPORT PRESETS
// ============================================================================

/// The fixed set of export sizes offered in the size selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ExportPreset {
    #[default]
    Square,
    Landscape,
    Portrait,
    LinkPreview,
    Pin,
}

impl ExportPreset {
    pub fn all() -> &'static [ExportPreset] {
        &[
            ExportPreset::Square,
            ExportPreset::Landscape,
            ExportPreset::Portrait,
            ExportPreset::LinkPreview,
            ExportPreset::Pin,
        ]
    }

    pub fn size(self) -> ExportSize {
        match self {
            ExportPreset::Square => ExportSize::new(1080, 1080),
            ExportPreset::Landscape => ExportSize::new(1920, 1080),
            ExportPreset::Portrait => ExportSize::new(1080, 1920),
            ExportPreset::LinkPreview => ExportSize::new(1200, 628),
            ExportPreset::Pin => ExportSize::new(1000, 1500),
        }
    }

    /// Stable ASCII identifier, also used in the settings file and CLI.
    pub fn id(self) -> String {
        let s = self.size();
        format!("{}x{}", s.width, s.height)
    }

    /// Display text for the size selector.
    pub fn label(self) -> String {
        let s = self.size();
        format!("{}×{}", s.width, s.height)
    }

    /// Accepts `1920x1080`, `1920X1080` or `1920×1080`.
    pub fn parse(text: &str) -> Result<Self, EditorError> {
        let normalized = text.trim().to_lowercase().replace('×', "x");
        Self::all()
            .iter()
            .copied()
            .find(|p| p.id() == normalized)
            .ok_or_else(|| EditorError::UnknownPreset(text.to_string()))
    }

    /// Check the preset table once at startup: every size non-zero, no duplicates.
    pub fn validate_table() -> Result<(), EditorError> {
        let all = Self::all();
        for (i, preset) in all.iter().enumerate() {
            let size = preset.size();
            if size.width == 0 || size.height == 0 {
                return Err(EditorError::InvalidPresetTable(format!(
                    "{:?} has a zero dimension",
                    preset
                )));
            }
            if all[..i].iter().any(|other| other.size() == size) {
                return Err(EditorError::InvalidPresetTable(format!(
                    "{:?} duplicates {}",
                    preset,
                    preset.id()
                )));
            }
        }
        Ok(())
    }
}

/// Percentage label shown next to the zoom slider.
pub fn zoom_label(zoom: f32) -> String {
    format!("{}%", (zoom * 100.0).round() as i32)
}

// ============================================================================
// PERSISTED SETTINGS
// ============================================================================

/// Application settings that persist across sessions
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Export size selected on last exit
    pub export_preset: ExportPreset,
    /// Stretch axis selected on last exit
    pub axis: Axis,
    /// View zoom, clamped to [ZOOM_MIN, ZOOM_MAX]
    pub zoom: f32,
    /// Maximum number of history snapshots (at least 1)
    pub max_history_steps: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            export_preset: ExportPreset::default(),
            axis: Axis::default(),
            zoom: 1.0,
            max_history_steps: MAX_HISTORY_SIZE,
        }
    }
}

impl AppSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/pixelstretch/pixelstretch_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\PixelStretch\pixelstretch_settings.cfg
    /// On macOS:   ~/Library/Application Support/PixelStretch/pixelstretch_settings.cfg
    pub(crate) fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            return Some(PathBuf::from(appdata).join("PixelStretch").join("pixelstretch_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("PixelStretch")
                    .join("pixelstretch_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("pixelstretch").join("pixelstretch_settings.cfg"))
        }
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "export_preset={}\n\
             axis={}\n\
             zoom={}\n\
             max_history_steps={}\n",
            self.export_preset.id(),
            self.axis.id(),
            self.zoom,
            self.max_history_steps,
        )
    }

    /// Parse `key=value` lines; unknown keys and bad values keep the default.
    pub fn from_config_str(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "export_preset" => {
                    if let Ok(preset) = ExportPreset::parse(val) {
                        s.export_preset = preset;
                    }
                }
                "axis" => {
                    if let Some(axis) = Axis::parse(val) {
                        s.axis = axis;
                    }
                }
                "zoom" => {
                    if let Ok(z) = val.parse::<f32>() {
                        if z.is_finite() {
                            s.zoom = z.clamp(ZOOM_MIN, ZOOM_MAX);
                        }
                    }
                }
                "max_history_steps" => {
                    if let Ok(n) = val.parse::<usize>() {
                        s.max_history_steps = n.max(1);
                    }
                }
                _ => {}
            }
        }
        s
    }

    /// Save settings to disk
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&path, self.to_config_string()) {
            log_warn!("Could not write settings {}: {}", path.display(), e);
        }
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        let Ok(content) = std::fs::read_to_string(&path) else { return Self::default() };
        Self::from_config_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_table_is_valid() {
        ExportPreset::validate_table().unwrap();
        assert_eq!(ExportPreset::all().len(), 5);
    }

    #[test]
    fn presets_parse_from_display_and_id() {
        assert_eq!(ExportPreset::parse("1920×1080").unwrap(), ExportPreset::Landscape);
        assert_eq!(ExportPreset::parse("1200x628").unwrap(), ExportPreset::LinkPreview);
        assert_eq!(ExportPreset::parse(" 1000X1500 ").unwrap(), ExportPreset::Pin);
        assert!(matches!(
            ExportPreset::parse("640x480"),
            Err(EditorError::UnknownPreset(_))
        ));
    }

    #[test]
    fn zoom_label_rounds_to_percent() {
        assert_eq!(zoom_label(1.0), "100%");
        assert_eq!(zoom_label(0.125), "13%");
        assert_eq!(zoom_label(2.994), "299%");
    }

    #[test]
    fn settings_survive_a_round_trip() {
        let settings = AppSettings {
            export_preset: ExportPreset::Portrait,
            axis: Axis::Vertical,
            zoom: 0.5,
            max_history_steps: 12,
        };
        let parsed = AppSettings::from_config_str(&settings.to_config_string());
        assert_eq!(parsed, settings);
    }

    #[test]
    fn corrupt_settings_fall_back_to_defaults() {
        let parsed = AppSettings::from_config_str(
            "export_preset=99x99\naxis=diagonal\nzoom=42\nmax_history_steps=0\ngarbage\n",
        );
        assert_eq!(parsed.export_preset, ExportPreset::Square);
        assert_eq!(parsed.axis, Axis::Horizontal);
        assert_eq!(parsed.zoom, ZOOM_MAX);
        assert_eq!(parsed.max_history_steps, 1);
    }
}
