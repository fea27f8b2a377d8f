//! Display profile definitions.

use serde::{Deserialize, Serialize};

use crate::error::{PackError, Result};

/// Masking display of a resin printer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayProfile {
    /// Lookup key, as given on the command line.
    pub key: String,
    /// Profile name.
    pub name: String,
    /// Panel resolution along X and Y (pixels).
    pub resolution: [u32; 2],
    /// Pixel density along X and Y (pixels per mm).
    pub pixels_per_mm: [f64; 2],
    /// Build height (mm).
    pub build_height: f64,
}

impl Default for DisplayProfile {
    fn default() -> Self {
        Self::generic()
    }
}

impl DisplayProfile {
    /// Generic 47.25 µm panel.
    pub fn generic() -> Self {
        Self {
            key: "generic".into(),
            name: "Generic 2K".into(),
            resolution: [2560, 1440],
            pixels_per_mm: [21.16402, 21.16402],
            build_height: 150.0,
        }
    }

    /// Anycubic Photon profile.
    pub fn photon() -> Self {
        Self {
            key: "photon".into(),
            name: "Anycubic Photon".into(),
            resolution: [2560, 1440],
            pixels_per_mm: [21.16402, 21.16402],
            build_height: 155.0,
        }
    }

    /// Elegoo Mars profile.
    pub fn mars() -> Self {
        Self {
            key: "mars".into(),
            name: "Elegoo Mars".into(),
            resolution: [2560, 1440],
            pixels_per_mm: [21.16402, 21.16402],
            build_height: 150.0,
        }
    }

    /// Anycubic Photon Mono X profile (50 µm pixels).
    pub fn photon_mono_x() -> Self {
        Self {
            key: "photon-mono-x".into(),
            name: "Anycubic Photon Mono X".into(),
            resolution: [3840, 2400],
            pixels_per_mm: [20.0, 20.0],
            build_height: 245.0,
        }
    }

    /// Elegoo Mars 3 profile (35 µm pixels).
    pub fn mars3() -> Self {
        Self {
            key: "mars3".into(),
            name: "Elegoo Mars 3".into(),
            resolution: [4098, 2560],
            pixels_per_mm: [1000.0 / 35.0, 1000.0 / 35.0],
            build_height: 175.0,
        }
    }

    /// Get all built-in profiles.
    pub fn all_profiles() -> Vec<Self> {
        vec![
            Self::generic(),
            Self::photon(),
            Self::mars(),
            Self::photon_mono_x(),
            Self::mars3(),
        ]
    }

    /// Look a built-in profile up by key, ignoring case.
    pub fn by_key(key: &str) -> Result<Self> {
        Self::all_profiles()
            .into_iter()
            .find(|p| p.key.eq_ignore_ascii_case(key))
            .ok_or_else(|| PackError::UnknownProfile(key.to_string()))
    }

    /// Printable area along X and Y (mm).
    pub fn area_mm(&self) -> [f64; 2] {
        [
            f64::from(self.resolution[0]) / self.pixels_per_mm[0],
            f64::from(self.resolution[1]) / self.pixels_per_mm[1],
        ]
    }

    /// Check if an image of `width` x `height` pixels fits the panel.
    pub fn fits_image(&self, width: u32, height: u32) -> bool {
        width <= self.resolution[0] && height <= self.resolution[1]
    }

    /// Check if a model of the given size (mm) fits the build volume.
    pub fn fits_model(&self, x: f64, y: f64, z: f64) -> bool {
        let [ax, ay] = self.area_mm();
        x >= 0.0 && x <= ax && y >= 0.0 && y <= ay && z >= 0.0 && z <= self.build_height
    }
}
