//! Error types for slice packaging.

use thiserror::Error;

/// Errors from encoding or archiving frames.
#[derive(Error, Debug)]
pub enum PackError {
    /// Image encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Zip container error.
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Manifest serialization failed.
    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Frames of one archive disagree on image size.
    #[error("layer {layer} is {got:?} px, expected {expected:?} px")]
    SizeMismatch {
        /// Offending layer.
        layer: usize,
        /// Size of the first frame.
        expected: [u32; 2],
        /// Size of this frame.
        got: [u32; 2],
    },

    /// Unknown display profile name.
    #[error("unknown display profile: {0}")]
    UnknownProfile(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for packaging operations.
pub type Result<T> = std::result::Result<T, PackError>;
