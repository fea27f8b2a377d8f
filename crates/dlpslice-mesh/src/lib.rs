#![warn(missing_docs)]

//! Triangle meshes for the dlpslice slicer.
//!
//! Loads STL models, puts them into build orientation, splits them into
//! connected regions and answers plane-section queries through
//! [`MeshSectionOracle`], the mesh-backed [`dlpslice::SectionOracle`].
//!
//! # Example
//!
//! ```ignore
//! use dlpslice_mesh::{load_stl, prepare, NormalizeOptions};
//!
//! let mesh = load_stl("part.stl")?;
//! let oracle = prepare(&mesh, &NormalizeOptions::default())?;
//! let stack = dlpslice::slice(&oracle, &dlpslice::SliceSettings::default())?;
//! ```

pub mod cutter;
pub mod error;
pub mod mesh;
pub mod normalize;
pub mod regions;
pub mod stl;

pub use cutter::{strip_segments, MeshSectionOracle};
pub use error::{MeshError, Result};
pub use mesh::TriangleMesh;
pub use normalize::{normalize, NormalizeOptions};
pub use regions::{label_regions, RegionMap};
pub use stl::{load_stl, parse_stl};

/// Normalize `mesh` and wrap it in a section oracle.
pub fn prepare(mesh: &TriangleMesh, options: &NormalizeOptions) -> Result<MeshSectionOracle> {
    MeshSectionOracle::new(normalize(mesh, options)?)
}
