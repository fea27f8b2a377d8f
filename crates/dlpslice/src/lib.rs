#![warn(missing_docs)]

//! Cross-section reconstruction and mask rasterization for DLP printing.
//!
//! This crate turns the raw output of a plane/mesh intersection oracle into
//! closed polygons and renders them as 8-bit anti-aliased masks, one per
//! layer. The mesh side lives behind the [`SectionOracle`] trait; packaging
//! lives behind [`FrameSink`].
//!
//! # Example
//!
//! ```ignore
//! use dlpslice::{slice, render_frames, SliceSettings, Frame};
//!
//! let oracle = /* any SectionOracle */;
//! let settings = SliceSettings::default();
//! let stack = slice(&oracle, &settings)?;
//!
//! let mut frames: Vec<Frame> = Vec::new();
//! render_frames(&stack, &mut frames)?;
//! println!("Layers: {}, clean: {}", frames.len(), stack.report.is_clean());
//! ```

pub mod classify;
pub mod error;
pub mod frame;
pub mod path;
pub mod raster;
pub mod repair;
pub mod report;
pub mod slice;

pub use classify::{classify_runs, Classified, MalformedReason, MalformedRun};
pub use error::{Result, SlicerError};
pub use frame::{render_frames, Frame, FrameSink};
pub use path::{ContourOrigin, PointBuffer, PointIndex, Polygon, Polyline};
pub use raster::{Canvas, Mask, Rasterizer};
pub use repair::{repair_fragments, Closure, RepairOptions, RepairOutcome};
pub use report::{ContourDefect, DefectKind, DefectSummary, SliceReport};
pub use slice::{
    layer_count, slice_layer, slice_layers, Layer, ModelGeometry, RegionContours, RegionId,
    Section, SectionOracle, SlicePlan, SliceStack,
};

use serde::{Deserialize, Serialize};

/// Millimetres per inch.
const MM_PER_INCH: f64 = 25.4;

/// Highest supported sub-pixel resolution (256 samples per axis).
pub const MAX_SUB_PIXEL_BITS: u32 = 8;

/// Slicing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceSettings {
    /// Layer thickness (mm).
    pub layer_height: f64,
    /// Close every open contour regardless of its gap.
    pub ignore_bad_polygons: bool,
    /// Open contours with an endpoint gap below this are closed anyway (mm).
    pub closing_threshold: f64,
    /// Display resolution along X and Y (pixels per mm).
    pub pixels_per_mm: [f64; 2],
    /// Background border around every mask (mm, rounded up to pixels).
    pub padding_mm: u32,
    /// Anti-aliasing resolution: `2^bits` samples per pixel axis.
    pub sub_pixel_bits: u32,
}

impl Default for SliceSettings {
    fn default() -> Self {
        Self {
            layer_height: 0.1,
            ignore_bad_polygons: false,
            closing_threshold: 0.5,
            pixels_per_mm: [21.16402, 21.16402],
            padding_mm: 1,
            sub_pixel_bits: 3,
        }
    }
}

impl SliceSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.layer_height.is_finite() && self.layer_height > 0.0) {
            return Err(SlicerError::InvalidSettings(format!(
                "layer_height must be positive, got {}",
                self.layer_height
            )));
        }
        if self
            .pixels_per_mm
            .iter()
            .any(|r| !(r.is_finite() && *r > 0.0))
        {
            return Err(SlicerError::InvalidSettings(format!(
                "pixels_per_mm must be positive, got {:?}",
                self.pixels_per_mm
            )));
        }
        if !(self.closing_threshold.is_finite() && self.closing_threshold >= 0.0) {
            return Err(SlicerError::InvalidSettings(format!(
                "closing_threshold must be non-negative, got {}",
                self.closing_threshold
            )));
        }
        if self.sub_pixel_bits > MAX_SUB_PIXEL_BITS {
            return Err(SlicerError::InvalidSettings(format!(
                "sub_pixel_bits must be at most {MAX_SUB_PIXEL_BITS}, got {}",
                self.sub_pixel_bits
            )));
        }
        Ok(())
    }

    /// Contour repair knobs.
    pub fn repair_options(&self) -> RepairOptions {
        RepairOptions {
            ignore_bad_polygons: self.ignore_bad_polygons,
            closing_threshold: self.closing_threshold,
        }
    }

    /// Display resolution in dots per inch.
    pub fn dpi(&self) -> [f64; 2] {
        self.pixels_per_mm.map(|r| r * MM_PER_INCH)
    }

    /// Mask padding in pixels, taken along X.
    pub fn padding_px(&self) -> u32 {
        (f64::from(self.padding_mm) * self.pixels_per_mm[0]).ceil() as u32
    }
}

/// Slice every region of the model behind `oracle`.
///
/// This is the main entry point. It validates `settings`, plans the layer
/// stack from the oracle's geometry and reconstructs closed polygons for
/// every (layer, region) pair. Render the result with [`render_frames`].
pub fn slice<O>(oracle: &O, settings: &SliceSettings) -> Result<SliceStack>
where
    O: SectionOracle + ?Sized,
{
    slice_layers(oracle, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlpslice_math::{Bounds3, Point2, Point3};

    /// A 2 x 2 x 1 mm block with one square cross-section.
    struct Block;

    impl SectionOracle for Block {
        fn geometry(&self) -> ModelGeometry {
            ModelGeometry {
                bounds: Bounds3::new(Point3::origin(), Point3::new(2.0, 2.0, 1.0)),
                region_count: 1,
            }
        }

        fn intersect(&self, _region: RegionId, _z: f64) -> Section {
            Section {
                points: PointBuffer::new(vec![
                    Point2::new(0.0, 0.0),
                    Point2::new(2.0, 0.0),
                    Point2::new(2.0, 2.0),
                    Point2::new(0.0, 2.0),
                ]),
                runs: vec![5, 0, 1, 2, 3, 0],
            }
        }
    }

    #[test]
    fn test_default_settings_are_valid() {
        let settings = SliceSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.padding_px(), 22);
        approx::assert_relative_eq!(settings.dpi()[0], 537.566108, epsilon = 1e-6);
    }

    #[test]
    fn test_invalid_settings() {
        for bad in [
            SliceSettings {
                layer_height: -0.1,
                ..Default::default()
            },
            SliceSettings {
                layer_height: f64::NAN,
                ..Default::default()
            },
            SliceSettings {
                pixels_per_mm: [0.0, 10.0],
                ..Default::default()
            },
            SliceSettings {
                closing_threshold: -1.0,
                ..Default::default()
            },
            SliceSettings {
                sub_pixel_bits: 9,
                ..Default::default()
            },
        ] {
            assert!(bad.validate().is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_slice_and_render_block() {
        let settings = SliceSettings {
            layer_height: 0.25,
            pixels_per_mm: [5.0, 5.0],
            ..Default::default()
        };
        let stack = slice(&Block, &settings).unwrap();
        assert_eq!(stack.layers.len(), 4);
        assert!(stack.report.is_clean());

        let mut frames: Vec<Frame> = Vec::new();
        render_frames(&stack, &mut frames).unwrap();
        assert_eq!(frames.len(), 4);
        for frame in &frames {
            assert_eq!(frame.mask.width(), 10);
            assert_eq!(frame.mask.covered_pixels(), 100);
            assert_eq!(frame.padding, 5);
        }
    }
}
