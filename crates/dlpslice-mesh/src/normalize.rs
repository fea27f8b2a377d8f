//! Putting a model into build orientation.
//!
//! The display draws image rows top to bottom, so Y is always mirrored.
//! After the optional X mirror and Y-up rotation the model is moved so its
//! bounding box starts at the origin.

use std::f64::consts::FRAC_PI_2;

use dlpslice_math::Transform;
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use crate::mesh::TriangleMesh;

/// Orientation switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Mirror along X as well.
    pub mirror_x: bool,
    /// The model was authored Y-up; rotate it to Z-up.
    pub y_up: bool,
}

impl NormalizeOptions {
    /// Mirror and rotation part of the transform, without the final
    /// translation.
    pub fn orientation(&self) -> Transform {
        let mut mirror = Transform::scale(1.0, -1.0, 1.0);
        if self.mirror_x {
            mirror = Transform::scale(-1.0, 1.0, 1.0).then(&mirror);
        }
        if self.y_up {
            Transform::rotation_x(-FRAC_PI_2).then(&mirror)
        } else {
            mirror
        }
    }
}

/// Orient `mesh` and move it to the origin.
pub fn normalize(mesh: &TriangleMesh, options: &NormalizeOptions) -> Result<TriangleMesh> {
    let oriented = mesh.transformed(&options.orientation());
    let bounds = oriented.bounds().ok_or(MeshError::EmptyMesh)?;
    let shift = Transform::translation(-bounds.min.x, -bounds.min.y, -bounds.min.z);
    let placed = oriented.transformed(&shift);
    if let Some(b) = placed.bounds() {
        let size = b.size();
        log::info!(
            "model size {:.3} x {:.3} x {:.3} mm",
            size.x,
            size.y,
            size.z
        );
    }
    Ok(placed)
}
