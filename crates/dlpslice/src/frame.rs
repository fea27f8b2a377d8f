//! Handing rendered layers to an output sink.

use std::convert::Infallible;

use rayon::prelude::*;

use crate::raster::{Mask, Rasterizer};
use crate::slice::SliceStack;

/// One rendered layer plus what packaging needs to know about it.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Layer index (0 = bottom).
    pub index: usize,
    /// Height above the model base (mm).
    pub z: f64,
    /// The unpadded mask.
    pub mask: Mask,
    /// Background border to add on every side (pixels).
    pub padding: u32,
    /// Target resolution along X and Y (dots per inch).
    pub dpi: [f64; 2],
}

/// Receiver of rendered frames, called in ascending Z.
pub trait FrameSink {
    /// Error returned when a frame cannot be stored.
    type Error;

    /// Store one frame.
    fn accept(&mut self, frame: Frame) -> Result<(), Self::Error>;
}

impl FrameSink for Vec<Frame> {
    type Error = Infallible;

    fn accept(&mut self, frame: Frame) -> Result<(), Self::Error> {
        self.push(frame);
        Ok(())
    }
}

/// Rasterize every layer of `stack` and feed the masks to `sink` in order.
///
/// Canvas, anti-aliasing, padding and DPI all come from the stack's plan.
/// Layers are rendered in parallel batches of one layer per worker thread,
/// so at most one batch of masks is held in memory. Returns the number of
/// frames delivered.
pub fn render_frames<S>(stack: &SliceStack, sink: &mut S) -> Result<usize, S::Error>
where
    S: FrameSink,
{
    let plan = &stack.plan;
    let rasterizer = Rasterizer::new(plan.canvas, plan.sub_pixel_bits);
    let batch = rayon::current_num_threads().max(1);

    let mut delivered = 0;
    for chunk in stack.layers.chunks(batch) {
        let masks: Vec<Mask> = chunk
            .par_iter()
            .map(|layer| rasterizer.rasterize(layer))
            .collect();
        for (layer, mask) in chunk.iter().zip(masks) {
            log::info!("rendered layer {}/{}", layer.index + 1, stack.layers.len());
            log::debug!("layer {}: {} px covered", layer.index, mask.covered_pixels());
            sink.accept(Frame {
                index: layer.index,
                z: layer.z,
                mask,
                padding: plan.padding,
                dpi: plan.dpi,
            })?;
            delivered += 1;
        }
    }
    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{ContourOrigin, Polygon};
    use crate::raster::Canvas;
    use crate::report::SliceReport;
    use crate::slice::{Layer, ModelGeometry, RegionContours, SlicePlan};
    use crate::SliceSettings;
    use dlpslice_math::{Bounds3, Point2, Point3};

    fn stack_with(layers: usize, settings: &SliceSettings) -> SliceStack {
        let geometry = ModelGeometry {
            bounds: Bounds3::new(Point3::origin(), Point3::new(8.0, 8.0, 0.1 * layers as f64)),
            region_count: 1,
        };
        let plan = SlicePlan::new(&geometry, settings).unwrap();
        assert_eq!(plan.canvas, Canvas { width: 8, height: 8 });
        let layers = (0..layers)
            .map(|index| {
                // A square that grows by one pixel per layer.
                let s = 1.0 + index as f64;
                Layer {
                    index,
                    z: plan.layer_z(index),
                    regions: vec![RegionContours {
                        region: 0,
                        polygons: vec![Polygon::new(
                            vec![
                                Point2::new(0.0, 0.0),
                                Point2::new(s, 0.0),
                                Point2::new(s, s),
                                Point2::new(0.0, s),
                                Point2::new(0.0, 0.0),
                            ],
                            ContourOrigin::Intact,
                        )],
                    }],
                }
            })
            .collect();
        SliceStack {
            plan,
            layers,
            report: SliceReport::default(),
        }
    }

    fn unit_settings() -> SliceSettings {
        SliceSettings {
            pixels_per_mm: [1.0, 1.0],
            padding_mm: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_frames_arrive_in_order() {
        let stack = stack_with(6, &unit_settings());
        let mut frames: Vec<Frame> = Vec::new();
        let delivered = render_frames(&stack, &mut frames).unwrap();
        assert_eq!(delivered, 6);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index, i);
            assert_eq!(frame.mask.covered_pixels(), (i + 1) * (i + 1));
            assert_eq!(frame.padding, 2);
            approx::assert_relative_eq!(frame.dpi[0], 25.4);
        }
    }

    #[test]
    fn test_sink_error_stops_rendering() {
        struct FailAfter(usize);
        impl FrameSink for FailAfter {
            type Error = String;
            fn accept(&mut self, frame: Frame) -> Result<(), String> {
                if frame.index >= self.0 {
                    return Err(format!("disk full at layer {}", frame.index));
                }
                Ok(())
            }
        }

        let stack = stack_with(4, &unit_settings());
        let err = render_frames(&stack, &mut FailAfter(2)).unwrap_err();
        assert_eq!(err, "disk full at layer 2");
    }

    #[test]
    fn test_frames_follow_the_slicing_settings() {
        let settings = SliceSettings {
            pixels_per_mm: [1.0, 1.0],
            padding_mm: 3,
            sub_pixel_bits: 0,
            ..Default::default()
        };
        let mut stack = stack_with(1, &settings);
        // Fractional edges, but no anti-aliasing at 0 bits.
        stack.layers[0].regions[0].polygons = vec![Polygon::new(
            vec![
                Point2::new(1.3, 1.3),
                Point2::new(6.6, 1.3),
                Point2::new(6.6, 4.2),
                Point2::new(1.3, 4.2),
                Point2::new(1.3, 1.3),
            ],
            ContourOrigin::Intact,
        )];

        let mut frames: Vec<Frame> = Vec::new();
        render_frames(&stack, &mut frames).unwrap();
        let frame = &frames[0];
        assert_eq!(frame.padding, 3);
        approx::assert_relative_eq!(frame.dpi[1], 25.4);
        assert!(frame
            .mask
            .pixels()
            .iter()
            .all(|&v| v == crate::raster::FOREGROUND || v == crate::raster::BACKGROUND));
        assert!(frame.mask.covered_pixels() > 0);
    }
}
