//! Layer/region slicing: drive the intersection oracle over every
//! (layer, region) pair and turn its raw runs into closed polygons.

use dlpslice_math::{Bounds3, Point2};
use rayon::prelude::*;

use crate::classify::classify_runs;
use crate::error::{Result, SlicerError};
use crate::path::{ContourOrigin, PointBuffer, PointIndex, Polygon};
use crate::raster::Canvas;
use crate::repair::{repair_fragments, Closure};
use crate::report::{ContourDefect, SliceReport};
use crate::SliceSettings;

/// Identifier of one connected mesh component.
pub type RegionId = usize;

/// Raw output of one plane intersection.
#[derive(Debug, Clone, Default)]
pub struct Section {
    /// Cut points in model coordinates (mm).
    pub points: PointBuffer,
    /// Run-length encoded index stream: `[n, i0, .., i(n-1), n, ..]`.
    pub runs: Vec<PointIndex>,
}

/// What the slicer needs to know about the model up front.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelGeometry {
    /// Axis-aligned bounds in model coordinates (mm).
    pub bounds: Bounds3,
    /// Number of connected regions, numbered `0..region_count`.
    pub region_count: usize,
}

/// Source of plane sections.
///
/// Implementations must give the same answer for the same `(region, z)` no
/// matter how often or in which order they are asked, and must be callable
/// from several threads at once.
pub trait SectionOracle: Sync {
    /// Model bounds and region count.
    fn geometry(&self) -> ModelGeometry;

    /// Intersect `region` with the horizontal plane at absolute height `z`.
    fn intersect(&self, region: RegionId, z: f64) -> Section;
}

/// Iteration plan, fixed before any section is taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlicePlan {
    /// Number of layers.
    pub layer_count: usize,
    /// Regions per layer.
    pub region_count: usize,
    /// Layer thickness (mm).
    pub layer_height: f64,
    /// Model bounds the plan was made for.
    pub bounds: Bounds3,
    /// Mask size in pixels.
    pub canvas: Canvas,
    /// Pixels per millimeter along X and Y.
    pub pixels_per_mm: [f64; 2],
    /// Anti-aliasing resolution used when rendering.
    pub sub_pixel_bits: u32,
    /// Background border around every mask (pixels).
    pub padding: u32,
    /// Target resolution along X and Y (dots per inch).
    pub dpi: [f64; 2],
}

impl SlicePlan {
    /// Plan the slicing of `geometry` with `settings`.
    pub fn new(geometry: &ModelGeometry, settings: &SliceSettings) -> Result<Self> {
        settings.validate()?;
        let bounds = geometry.bounds;
        let size = bounds.size();
        if !(size.x.is_finite() && size.y.is_finite() && size.z.is_finite()) {
            return Err(SlicerError::InvalidGeometry(
                "model bounds are not finite".into(),
            ));
        }
        if size.x < 0.0 || size.y < 0.0 || size.z < 0.0 {
            return Err(SlicerError::InvalidGeometry(
                "model bounds are inverted".into(),
            ));
        }

        Ok(Self {
            layer_count: layer_count(size.z, settings.layer_height),
            region_count: geometry.region_count,
            layer_height: settings.layer_height,
            bounds,
            canvas: Canvas::for_footprint(size.x, size.y, settings.pixels_per_mm),
            pixels_per_mm: settings.pixels_per_mm,
            sub_pixel_bits: settings.sub_pixel_bits,
            padding: settings.padding_px(),
            dpi: settings.dpi(),
        })
    }

    /// Height of layer `index` above the model base (mm).
    pub fn layer_z(&self, index: usize) -> f64 {
        self.layer_height * (index + 1) as f64
    }

    /// Absolute cutting height of layer `index`, clamped to the model top.
    pub fn cut_height(&self, index: usize) -> f64 {
        (self.bounds.min.z + self.layer_z(index)).min(self.bounds.max.z)
    }

    /// Map a model-space cut point to device pixels.
    pub fn to_pixels(&self, p: &Point2) -> Point2 {
        Point2::new(
            (p.x - self.bounds.min.x) * self.pixels_per_mm[0],
            (p.y - self.bounds.min.y) * self.pixels_per_mm[1],
        )
    }
}

/// `floor(height / layer_height)`, forgiving representation error just
/// below an integer quotient (0.3 / 0.1 = 2.9999999999999996).
pub fn layer_count(height: f64, layer_height: f64) -> usize {
    let ratio = height / layer_height;
    (ratio + ratio.abs() * 1e-9).floor().max(0.0) as usize
}

/// Closed polygons of one region in one layer.
#[derive(Debug, Clone)]
pub struct RegionContours {
    /// Region the polygons belong to.
    pub region: RegionId,
    /// Polygons in device pixel coordinates.
    pub polygons: Vec<Polygon>,
}

/// One horizontal cross-section of the model.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Layer index (0 = bottom).
    pub index: usize,
    /// Height above the model base (mm).
    pub z: f64,
    /// Per-region polygons, indexed by region id.
    pub regions: Vec<RegionContours>,
}

impl Layer {
    /// Total polygon count over all regions.
    pub fn polygon_count(&self) -> usize {
        self.regions.iter().map(|r| r.polygons.len()).sum()
    }

    /// True when no region produced a polygon.
    pub fn is_empty(&self) -> bool {
        self.polygon_count() == 0
    }

    /// All polygons of the layer, region by region.
    pub fn polygons(&self) -> impl Iterator<Item = &Polygon> {
        self.regions.iter().flat_map(|r| r.polygons.iter())
    }
}

/// Output of a complete slicing pass.
#[derive(Debug, Clone)]
pub struct SliceStack {
    /// The plan that was executed.
    pub plan: SlicePlan,
    /// Layers in ascending Z.
    pub layers: Vec<Layer>,
    /// Defects found on the way.
    pub report: SliceReport,
}

/// Slice every region of the model at every layer height.
///
/// Fails only on invalid settings or geometry, before any section is taken.
/// Contour problems are logged, collected in the returned report and never
/// abort the run. Layers are sliced in parallel and returned in order.
pub fn slice_layers<O>(oracle: &O, settings: &SliceSettings) -> Result<SliceStack>
where
    O: SectionOracle + ?Sized,
{
    let plan = SlicePlan::new(&oracle.geometry(), settings)?;
    log::info!(
        "slicing {} layer(s) x {} region(s) at {} mm, canvas {}x{} px",
        plan.layer_count,
        plan.region_count,
        plan.layer_height,
        plan.canvas.width,
        plan.canvas.height
    );
    if plan.layer_count == 0 {
        log::warn!(
            "model is thinner than one layer ({:.4} mm)",
            plan.bounds.size().z
        );
    }

    let sliced: Vec<(Layer, Vec<ContourDefect>)> = (0..plan.layer_count)
        .into_par_iter()
        .map(|index| slice_layer(oracle, &plan, settings, index))
        .collect();

    let mut layers = Vec::with_capacity(sliced.len());
    let mut report = SliceReport::default();
    for (layer, defects) in sliced {
        layers.push(layer);
        report.defects.extend(defects);
    }

    Ok(SliceStack {
        plan,
        layers,
        report,
    })
}

/// Slice all regions at layer `index`.
pub fn slice_layer<O>(
    oracle: &O,
    plan: &SlicePlan,
    settings: &SliceSettings,
    index: usize,
) -> (Layer, Vec<ContourDefect>)
where
    O: SectionOracle + ?Sized,
{
    let z = plan.layer_z(index);
    log::info!("slicing layer {}/{} at Z = {:.4}", index + 1, plan.layer_count, z);

    let mut defects = Vec::new();
    let regions: Vec<RegionContours> = (0..plan.region_count)
        .map(|region| {
            let section = oracle.intersect(region, plan.cut_height(index));
            slice_region(section, plan, settings, index, region, &mut defects)
        })
        .collect();

    let layer = Layer { index, z, regions };
    if layer.is_empty() {
        let defect = ContourDefect::EmptyLayer { layer: index, z };
        defect.log();
        defects.push(defect);
    }
    (layer, defects)
}

/// Classify and repair one section, materializing polygons in pixels.
fn slice_region(
    section: Section,
    plan: &SlicePlan,
    settings: &SliceSettings,
    layer: usize,
    region: RegionId,
    defects: &mut Vec<ContourDefect>,
) -> RegionContours {
    let z = plan.layer_z(layer);
    let mut report = |defect: ContourDefect| {
        defect.log();
        defects.push(defect);
    };

    let classified = classify_runs(&section.runs, section.points.len());
    for malformed in &classified.malformed {
        report(ContourDefect::MalformedContour {
            layer,
            z,
            region,
            run: malformed.run,
            reason: malformed.reason,
        });
    }
    if !classified.open.is_empty() {
        log::debug!(
            "layer {layer} region {region}: {} open fragment(s)",
            classified.open.len()
        );
    }

    let repaired = repair_fragments(
        classified.open,
        &section.points,
        &settings.repair_options(),
    );
    for unresolved in &repaired.unresolved {
        report(ContourDefect::UnresolvedGap {
            layer,
            z,
            region,
            gap: unresolved.gap,
            fragments: unresolved.fragments,
        });
    }

    let intact = classified
        .closed
        .into_iter()
        .map(|polyline| (polyline, ContourOrigin::Intact));
    let mended = repaired.contours.into_iter().map(|contour| {
        let origin = match contour.closure {
            Closure::Intact => ContourOrigin::Intact,
            Closure::Joined => ContourOrigin::Joined,
            Closure::Forced { gap } => {
                report(ContourDefect::ForcedClosure {
                    layer,
                    z,
                    region,
                    gap,
                    fragments: contour.fragments,
                });
                ContourOrigin::Forced
            }
        };
        (contour.polyline, origin)
    });

    let polygons = intact
        .chain(mended)
        .filter_map(|(polyline, origin)| {
            polyline
                .materialize(&section.points, |p| plan.to_pixels(p))
                .map(|points| Polygon::new(points, origin))
        })
        .collect();

    RegionContours { region, polygons }
}
