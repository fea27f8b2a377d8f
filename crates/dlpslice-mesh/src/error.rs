//! Error types for mesh loading and preparation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or preparing a mesh.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The model file does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary STL shorter than its header claims.
    #[error("truncated STL: expected {expected} bytes, got {got}")]
    Truncated {
        /// Bytes required by the declared facet count.
        expected: usize,
        /// Bytes available.
        got: usize,
    },

    /// ASCII STL syntax error.
    #[error("STL parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// A facet has a NaN or infinite coordinate.
    #[error("facet {facet} has a non-finite vertex")]
    NonFiniteVertex {
        /// 0-based facet number.
        facet: usize,
    },

    /// A triangle references a vertex that does not exist.
    #[error("triangle {triangle} references vertex {index} of {count}")]
    IndexOutOfRange {
        /// Triangle number.
        triangle: usize,
        /// Offending vertex index.
        index: u32,
        /// Number of vertices.
        count: usize,
    },

    /// No usable triangles.
    #[error("mesh has no triangles")]
    EmptyMesh,
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, MeshError>;
