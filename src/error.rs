use thiserror::Error;

/// Everything that can go wrong while editing a single image session.
///
/// Every variant is terminal for the user action that produced it: the
/// session is left exactly as it was before the action started.
#[derive(Error, Debug)]
pub enum EditorError {
    /// The selected file is not an image (unknown media type).
    #[error("Invalid file type: {name}")]
    InvalidFileType { name: String },

    /// The bytes looked like an image but could not be decoded.
    #[error("Error loading image: {0}")]
    DecodeFailure(String),

    /// An edit, save, or history action was attempted before any load.
    #[error("No image loaded")]
    NoImageLoaded,

    /// Zero-sized image or degenerate sampled strip; nothing to stretch.
    #[error("Nothing to sample")]
    EmptySample,

    #[error("Unknown export size: {0}")]
    UnknownPreset(String),

    #[error("Invalid export preset table: {0}")]
    InvalidPresetTable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encode error: {0}")]
    Encode(#[from] image::ImageError),
}

impl EditorError {
    /// Errors that are swallowed without telling the user.
    pub fn is_silent(&self) -> bool {
        matches!(self, EditorError::NoImageLoaded | EditorError::EmptySample)
    }
}
