//! Error types for the slicer.

use thiserror::Error;

/// Fatal errors, reported before any layer is sliced.
///
/// Per-contour problems are not errors in this sense; they are collected as
/// [`ContourDefect`](crate::report::ContourDefect)s in the slice report.
#[derive(Error, Debug)]
pub enum SlicerError {
    /// Invalid slice settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Model geometry handed over by the oracle cannot be sliced.
    #[error("invalid model geometry: {0}")]
    InvalidGeometry(String),
}

/// Result type for slicer operations.
pub type Result<T> = std::result::Result<T, SlicerError>;
