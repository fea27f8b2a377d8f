//! Layer rasterization: polygons in device pixels to an 8-bit mask.
//!
//! Coordinates are pre-scaled by `2^sub_pixel_bits` and rounded, so scan
//! conversion runs on integers. Each pixel row is sampled by
//! `2^sub_pixel_bits` sub-scanlines taken at sub-pixel centers; crossings
//! on a sub-scanline are paired with even-odd parity over every polygon of a
//! region, so nested contours punch holes. Covered span length is summed per
//! pixel in sub-pixel units, giving `2^(2·bits)` coverage levels that smooth
//! the edges.
//!
//! Regions are filled one after the other. Each fill blends toward the
//! opaque foreground, so overlapping regions saturate rather than add.

use serde::{Deserialize, Serialize};

use crate::path::Polygon;
use crate::slice::Layer;

/// Mask value for uncovered pixels.
pub const BACKGROUND: u8 = 0;

/// Mask value for fully covered pixels.
pub const FOREGROUND: u8 = 255;

/// Canvas dimensions in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    /// Columns (model X).
    pub width: u32,
    /// Rows (model Y).
    pub height: u32,
}

impl Canvas {
    /// Canvas for a footprint of `size_x × size_y` mm at the given density.
    pub fn for_footprint(size_x: f64, size_y: f64, pixels_per_mm: [f64; 2]) -> Self {
        Self {
            width: (size_x * pixels_per_mm[0]).ceil().max(0.0) as u32,
            height: (size_y * pixels_per_mm[1]).ceil().max(0.0) as u32,
        }
    }
}

/// Single-channel 8-bit image, row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Mask {
    /// All-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![BACKGROUND; width as usize * height as usize],
        }
    }

    /// Wrap raw row-major pixels. `None` if the length does not match.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel at `(x, y)`, if inside.
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x < self.width && y < self.height {
            Some(self.pixels[y as usize * self.width as usize + x as usize])
        } else {
            None
        }
    }

    /// Number of pixels with any coverage.
    pub fn covered_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&p| p != BACKGROUND).count()
    }

    fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let w = self.width as usize;
        let start = y as usize * w;
        &mut self.pixels[start..start + w]
    }
}

/// A polygon edge in sub-pixel units with `y0 < y1`.
#[derive(Debug, Clone, Copy)]
struct Edge {
    x0: i64,
    y0: i64,
    x1: i64,
    y1: i64,
}

impl Edge {
    /// X crossing at doubled sub-pixel ordinate `y2` (`2·y + 1` samples a
    /// sub-pixel center), rounded down.
    fn x_at(&self, y2: i64) -> i64 {
        let num = (y2 - 2 * self.y0) * (self.x1 - self.x0);
        let den = 2 * (self.y1 - self.y0);
        self.x0 + num.div_euclid(den)
    }
}

/// Fixed-resolution, anti-aliasing polygon filler.
#[derive(Debug, Clone, Copy)]
pub struct Rasterizer {
    canvas: Canvas,
    sub_pixel_bits: u32,
}

impl Rasterizer {
    /// Rasterizer for `canvas` with `2^sub_pixel_bits` samples per axis.
    pub fn new(canvas: Canvas, sub_pixel_bits: u32) -> Self {
        Self {
            canvas,
            sub_pixel_bits,
        }
    }

    /// Target canvas.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Render every region of `layer` into a fresh mask.
    pub fn rasterize(&self, layer: &Layer) -> Mask {
        let mut mask = Mask::new(self.canvas.width, self.canvas.height);
        for region in &layer.regions {
            self.fill(&mut mask, &region.polygons);
        }
        mask
    }

    /// Fill one polygon set (even-odd) into `mask`.
    pub fn fill(&self, mask: &mut Mask, polygons: &[Polygon]) {
        let bits = self.sub_pixel_bits;
        let sub = 1i64 << bits;
        let full = (sub * sub) as u32;
        let width = mask.width() as i64;
        let height = mask.height() as i64;
        if width == 0 || height == 0 {
            return;
        }

        let mut edges = collect_edges(polygons, sub as f64);
        if edges.is_empty() {
            return;
        }
        edges.sort_by_key(|e| e.y0);

        let first_row = (edges[0].y0 >> bits).max(0);
        let last_row = (edges.iter().map(|e| e.y1).max().unwrap_or(0) >> bits).min(height - 1);

        let mut cover = vec![0u32; width as usize];
        let mut crossings: Vec<i64> = Vec::new();
        let mut active: Vec<Edge> = Vec::new();
        let mut next = 0;
        let x_limit = width << bits;

        for row in first_row..=last_row {
            let row_top = row << bits;
            let row_bottom = row_top + sub;

            while next < edges.len() && edges[next].y0 < row_bottom {
                active.push(edges[next]);
                next += 1;
            }
            active.retain(|e| e.y1 > row_top);
            if active.is_empty() {
                continue;
            }

            cover.fill(0);
            for s in row_top..row_bottom {
                let y2 = 2 * s + 1;
                crossings.clear();
                crossings.extend(
                    active
                        .iter()
                        .filter(|e| 2 * e.y0 <= y2 && y2 < 2 * e.y1)
                        .map(|e| e.x_at(y2)),
                );
                crossings.sort_unstable();

                for span in crossings.chunks_exact(2) {
                    let xa = span[0].clamp(0, x_limit);
                    let xb = span[1].clamp(0, x_limit);
                    accumulate_span(&mut cover, xa, xb, bits);
                }
            }

            let out = mask.row_mut(row as u32);
            for (pixel, &c) in out.iter_mut().zip(&cover) {
                if c > 0 {
                    *pixel = blend(*pixel, c.min(full), full);
                }
            }
        }
    }
}

fn collect_edges(polygons: &[Polygon], scale: f64) -> Vec<Edge> {
    let mut edges = Vec::new();
    for polygon in polygons {
        let fixed: Vec<(i64, i64)> = polygon
            .points
            .iter()
            .map(|p| ((p.x * scale).round() as i64, (p.y * scale).round() as i64))
            .collect();
        let n = fixed.len();
        if n < 2 {
            continue;
        }
        for i in 0..n {
            let (ax, ay) = fixed[i];
            let (bx, by) = fixed[(i + 1) % n];
            if ay == by {
                continue;
            }
            let edge = if ay < by {
                Edge { x0: ax, y0: ay, x1: bx, y1: by }
            } else {
                Edge { x0: bx, y0: by, x1: ax, y1: ay }
            };
            edges.push(edge);
        }
    }
    edges
}

/// Add the sub-pixel span `[xa, xb)` to per-pixel coverage.
fn accumulate_span(cover: &mut [u32], xa: i64, xb: i64, bits: u32) {
    let mut x = xa;
    while x < xb {
        let px = x >> bits;
        let end = ((px + 1) << bits).min(xb);
        cover[px as usize] += (end - x) as u32;
        x = end;
    }
}

/// Move `pixel` toward [`FOREGROUND`] by `cover / full`.
fn blend(pixel: u8, cover: u32, full: u32) -> u8 {
    let room = (FOREGROUND - pixel) as u32;
    let add = (room * cover + full / 2) / full;
    pixel + add as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::ContourOrigin;
    use crate::slice::RegionContours;
    use dlpslice_math::Point2;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::new(
            vec![
                Point2::new(x0, y0),
                Point2::new(x1, y0),
                Point2::new(x1, y1),
                Point2::new(x0, y1),
                Point2::new(x0, y0),
            ],
            ContourOrigin::Intact,
        )
    }

    fn layer_of(regions: Vec<Vec<Polygon>>) -> Layer {
        Layer {
            index: 0,
            z: 0.1,
            regions: regions
                .into_iter()
                .enumerate()
                .map(|(region, polygons)| RegionContours { region, polygons })
                .collect(),
        }
    }

    #[test]
    fn test_canvas_rounds_up() {
        let canvas = Canvas::for_footprint(10.05, 4.0, [10.0, 2.5]);
        assert_eq!(canvas, Canvas { width: 101, height: 10 });
    }

    #[test]
    fn test_square_fills_exact_block() {
        let raster = Rasterizer::new(Canvas { width: 30, height: 30 }, 3);
        let mask = raster.rasterize(&layer_of(vec![vec![rect(10.0, 10.0, 20.0, 20.0)]]));
        for y in 0..30 {
            for x in 0..30 {
                let inside = (10..20).contains(&x) && (10..20).contains(&y);
                let expected = if inside { FOREGROUND } else { BACKGROUND };
                assert_eq!(mask.get(x, y), Some(expected), "pixel ({x}, {y})");
            }
        }
        assert_eq!(mask.covered_pixels(), 100);
    }

    #[test]
    fn test_hole_is_left_empty() {
        let raster = Rasterizer::new(Canvas { width: 20, height: 20 }, 2);
        let outer = rect(2.0, 2.0, 18.0, 18.0);
        let mut hole = rect(6.0, 6.0, 14.0, 14.0);
        hole.points.reverse();
        let mask = raster.rasterize(&layer_of(vec![vec![outer, hole]]));
        assert_eq!(mask.get(3, 3), Some(FOREGROUND));
        assert_eq!(mask.get(10, 10), Some(BACKGROUND));
        assert_eq!(mask.get(16, 10), Some(FOREGROUND));
        assert_eq!(mask.covered_pixels(), 16 * 16 - 8 * 8);
    }

    #[test]
    fn test_half_pixel_edge_is_antialiased() {
        let raster = Rasterizer::new(Canvas { width: 10, height: 10 }, 3);
        let mask = raster.rasterize(&layer_of(vec![vec![rect(2.5, 2.0, 6.0, 6.0)]]));
        let edge = mask.get(2, 3).unwrap();
        assert!(edge > 100 && edge < 155, "edge value {edge}");
        assert_eq!(mask.get(3, 3), Some(FOREGROUND));
        assert_eq!(mask.get(1, 3), Some(BACKGROUND));
    }

    #[test]
    fn test_no_subpixel_bits_gives_binary_mask() {
        let raster = Rasterizer::new(Canvas { width: 10, height: 10 }, 0);
        let mask = raster.rasterize(&layer_of(vec![vec![rect(1.3, 1.3, 7.6, 4.2)]]));
        assert!(mask
            .pixels()
            .iter()
            .all(|&p| p == FOREGROUND || p == BACKGROUND));
        assert!(mask.covered_pixels() > 0);
    }

    #[test]
    fn test_overlapping_regions_saturate() {
        let raster = Rasterizer::new(Canvas { width: 12, height: 12 }, 3);
        let mask = raster.rasterize(&layer_of(vec![
            vec![rect(1.0, 1.0, 8.0, 8.0)],
            vec![rect(4.0, 4.0, 11.0, 11.0)],
        ]));
        assert_eq!(mask.get(5, 5), Some(FOREGROUND));
        assert_eq!(mask.covered_pixels(), 49 + 49 - 16);
    }

    #[test]
    fn test_empty_layer_is_background() {
        let raster = Rasterizer::new(Canvas { width: 8, height: 4 }, 3);
        let mask = raster.rasterize(&layer_of(vec![vec![], vec![]]));
        assert_eq!(mask.covered_pixels(), 0);
        assert_eq!(mask.pixels().len(), 32);
    }

    #[test]
    fn test_polygon_outside_canvas_is_clipped() {
        let raster = Rasterizer::new(Canvas { width: 10, height: 10 }, 3);
        let mask = raster.rasterize(&layer_of(vec![vec![rect(-5.0, -5.0, 3.0, 30.0)]]));
        assert_eq!(mask.covered_pixels(), 30);
        assert_eq!(mask.get(2, 9), Some(FOREGROUND));
        assert_eq!(mask.get(3, 0), Some(BACKGROUND));
    }

    #[test]
    fn test_mask_from_raw_checks_length() {
        assert!(Mask::from_raw(2, 2, vec![0; 4]).is_some());
        assert!(Mask::from_raw(2, 2, vec![0; 5]).is_none());
    }
}
