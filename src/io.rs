use image::codecs::png::PngEncoder;
use image::{ImageFormat, RgbaImage, imageops};
use rfd::FileDialog;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::EditorError;
use crate::settings::ExportSize;

/// Basename used for exports when no file was ever loaded.
pub const FALLBACK_BASENAME: &str = "pixelstretch_image";

/// Names longer than this are shortened for the file label.
const MAX_LABEL_CHARS: usize = 25;

/// Extensions offered by the open dialog.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "webp", "bmp", "tga", "gif", "ico", "tiff", "tif",
];

// ============================================================================
// DECODE
// ============================================================================

/// Media type check: the file name must map to a known image format.
pub fn image_format_for(name: &str) -> Result<ImageFormat, EditorError> {
    ImageFormat::from_path(name).map_err(|_| EditorError::InvalidFileType {
        name: name.to_string(),
    })
}

/// Decode raw bytes of a file called `name` into RGBA.
///
/// A name that is not an image is rejected before the bytes are touched;
/// bytes that fail to decode are reported separately.
pub fn decode_image(name: &str, bytes: &[u8]) -> Result<RgbaImage, EditorError> {
    let format = image_format_for(name)?;
    image::load_from_memory_with_format(bytes, format)
        .or_else(|_| image::load_from_memory(bytes))
        .map(|img| img.to_rgba8())
        .map_err(|e| EditorError::DecodeFailure(e.to_string()))
}

/// Read and decode an image file from disk.
pub fn load_image_sync(path: &Path) -> Result<RgbaImage, EditorError> {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    image_format_for(&name)?;
    let bytes = std::fs::read(path)?;
    decode_image(&name, &bytes)
}

/// Uniformly shrink `img` so it fits inside `bounds`. Never upscales.
pub fn fit_within(img: RgbaImage, bounds: ExportSize) -> RgbaImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img;
    }
    let scale = (bounds.width as f64 / w as f64)
        .min(bounds.height as f64 / h as f64)
        .min(1.0);
    if scale >= 1.0 {
        return img;
    }
    let new_w = (w as f64 * scale).floor() as u32;
    let new_h = (h as f64 * scale).floor() as u32;
    if new_w == 0 || new_h == 0 {
        return RgbaImage::new(new_w, new_h);
    }
    imageops::resize(&img, new_w, new_h, imageops::FilterType::Triangle)
}

// ============================================================================
// ENCODE / EXPORT
// ============================================================================

/// PNG-encode an RGBA image in memory.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, EditorError> {
    let mut bytes = Vec::new();
    let encoder = PngEncoder::new(&mut bytes);
    #[allow(deprecated)]
    encoder.encode(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ColorType::Rgba8,
    )?;
    Ok(bytes)
}

/// Write already-encoded bytes to `path`.
pub fn write_bytes(bytes: &[u8], path: &Path) -> Result<(), EditorError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}

/// Strip the last `.ext` suffix, if any.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => &name[..dot],
        _ => name,
    }
}

/// `<basename>_<W>x<H>.png`
pub fn export_file_name(source_name: Option<&str>, size: ExportSize) -> String {
    let base = match source_name {
        Some(name) if !name.is_empty() => strip_extension(name),
        _ => FALLBACK_BASENAME,
    };
    format!("{}_{}x{}.png", base, size.width, size.height)
}

/// Shorten long names to `first10…last6.ext` for the file label.
pub fn truncate_name(name: &str) -> String {
    if name.chars().count() <= MAX_LABEL_CHARS {
        return name.to_string();
    }
    let base = strip_extension(name);
    let ext = &name[base.len()..];
    let chars: Vec<char> = base.chars().collect();
    let head: String = chars.iter().take(10).collect();
    let tail: String = chars[chars.len().saturating_sub(6)..].iter().collect();
    format!("{}…{}{}", head, tail, ext)
}

// ============================================================================
// FILE HANDLER
// ============================================================================

#[derive(Default)]
pub struct FileHandler {
    /// Directory of the last opened file; dialogs start there.
    pub last_dir: Option<PathBuf>,
}

impl FileHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show native file dialog to pick an image (without loading it)
    pub fn pick_image_path(&mut self) -> Option<PathBuf> {
        let mut dialog = FileDialog::new()
            .add_filter("Images", IMAGE_EXTENSIONS)
            .add_filter("All Files", &["*"]);
        if let Some(dir) = &self.last_dir {
            dialog = dialog.set_directory(dir);
        }
        let path = dialog.pick_file()?;
        self.last_dir = path.parent().map(Path::to_path_buf);
        Some(path)
    }

    /// Ask where to save an export, prefilled with `default_name`.
    pub fn pick_export_path(&mut self, default_name: &str) -> Option<PathBuf> {
        let mut dialog = FileDialog::new()
            .add_filter("PNG", &["png"])
            .set_file_name(default_name);
        if let Some(dir) = &self.last_dir {
            dialog = dialog.set_directory(dir);
        }
        dialog.save_file()
    }
}
