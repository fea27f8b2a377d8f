//! Plane sections of a labeled triangle mesh.
//!
//! A vertex is "above" the plane when `z_v - z >= 0`. Ties go up, so every
//! triangle is crossed in exactly zero or two edges and a plane through a
//! vertex never produces a dangling end. Cut points are keyed by the edge
//! they lie on (or by the vertex when the cut lands exactly on it), which
//! gives neighbouring triangles the same point index. Segments are then
//! chained into maximal polylines.

use std::collections::{HashMap, VecDeque};

use dlpslice::{ModelGeometry, PointBuffer, PointIndex, RegionId, Section, SectionOracle};
use dlpslice_math::Point2;

use crate::error::{MeshError, Result};
use crate::mesh::TriangleMesh;
use crate::regions::label_regions;

/// Identity of a cut point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CutKey {
    /// The plane passes through this vertex.
    Vertex(u32),
    /// Interior point of the edge between two vertices (lower index first).
    Edge(u32, u32),
}

/// Triangle with its Z extent.
#[derive(Debug, Clone, Copy)]
struct Span {
    z_min: f64,
    z_max: f64,
    triangle: u32,
}

/// [`SectionOracle`] over a triangle mesh, one region per connected shell.
#[derive(Debug, Clone)]
pub struct MeshSectionOracle {
    mesh: TriangleMesh,
    geometry: ModelGeometry,
    /// Per region, triangles sorted by `z_min`.
    spans: Vec<Vec<Span>>,
}

impl MeshSectionOracle {
    /// Label the regions of `mesh` and index its triangles by height.
    pub fn new(mesh: TriangleMesh) -> Result<Self> {
        mesh.check_indices()?;
        let bounds = mesh.bounds().ok_or(MeshError::EmptyMesh)?;
        let regions = label_regions(&mesh);

        let mut spans: Vec<Vec<Span>> = regions
            .sizes()
            .into_iter()
            .map(Vec::with_capacity)
            .collect();
        for (t, &region) in regions.triangle_region.iter().enumerate() {
            let [a, b, c] = mesh.triangle(t);
            spans[region].push(Span {
                z_min: a.z.min(b.z).min(c.z),
                z_max: a.z.max(b.z).max(c.z),
                triangle: t as u32,
            });
        }
        for list in &mut spans {
            list.sort_by(|a, b| a.z_min.total_cmp(&b.z_min));
        }

        log::info!(
            "{} triangle(s) in {} region(s)",
            mesh.num_triangles(),
            regions.region_count
        );
        Ok(Self {
            geometry: ModelGeometry {
                bounds,
                region_count: regions.region_count,
            },
            mesh,
            spans,
        })
    }

    /// Cut segments of `region` at `z`, as pairs of point indices.
    fn segments(&self, region: RegionId, z: f64) -> (Vec<Point2>, Vec<[PointIndex; 2]>) {
        let mut points = Vec::new();
        let mut keys: HashMap<CutKey, PointIndex> = HashMap::new();
        let mut segments = Vec::new();

        let Some(spans) = self.spans.get(region) else {
            return (points, segments);
        };
        let end = spans.partition_point(|s| s.z_min <= z);
        for span in spans[..end].iter().filter(|s| s.z_max >= z) {
            let tri = self.mesh.triangles[span.triangle as usize];
            let above = tri.map(|v| self.mesh.vertices[v as usize].z - z >= 0.0);
            if above[0] == above[1] && above[1] == above[2] {
                continue;
            }

            let mut ends = [0; 2];
            let mut found = 0;
            for (i, j) in [(0, 1), (1, 2), (2, 0)] {
                if above[i] != above[j] && found < 2 {
                    let (up, down) = if above[i] {
                        (tri[i], tri[j])
                    } else {
                        (tri[j], tri[i])
                    };
                    ends[found] = self.cut_point(up, down, z, &mut keys, &mut points);
                    found += 1;
                }
            }
            if ends[0] != ends[1] {
                segments.push(ends);
            }
        }
        (points, segments)
    }

    /// Index of the point where the plane crosses edge `up`-`down`.
    fn cut_point(
        &self,
        up: u32,
        down: u32,
        z: f64,
        keys: &mut HashMap<CutKey, PointIndex>,
        points: &mut Vec<Point2>,
    ) -> PointIndex {
        let pu = self.mesh.vertices[up as usize];
        let key = if pu.z == z {
            CutKey::Vertex(up)
        } else {
            CutKey::Edge(up.min(down), up.max(down))
        };
        *keys.entry(key).or_insert_with(|| {
            let p = match key {
                CutKey::Vertex(_) => Point2::new(pu.x, pu.y),
                CutKey::Edge(lo, hi) => {
                    let a = self.mesh.vertices[lo as usize];
                    let b = self.mesh.vertices[hi as usize];
                    let t = (z - a.z) / (b.z - a.z);
                    Point2::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y))
                }
            };
            points.push(p);
            (points.len() - 1) as PointIndex
        })
    }
}

/// Chain segments into maximal polylines and run-length encode them.
///
/// Chains that come back to their first point are emitted closed (first
/// index repeated); others are emitted open.
pub fn strip_segments(segments: &[[PointIndex; 2]], point_count: usize) -> Vec<PointIndex> {
    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); point_count];
    for (s, &[a, b]) in segments.iter().enumerate() {
        incident[a as usize].push(s);
        incident[b as usize].push(s);
    }

    let mut used = vec![false; segments.len()];
    let next_from = |used: &mut [bool], at: PointIndex| -> Option<PointIndex> {
        let s = *incident[at as usize].iter().find(|&&s| !used[s])?;
        used[s] = true;
        let [a, b] = segments[s];
        Some(if a == at { b } else { a })
    };

    let mut runs = Vec::new();
    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let [a, b] = segments[start];
        let mut chain: VecDeque<PointIndex> = VecDeque::from([a, b]);

        let mut closed = false;
        while let Some(tail) = chain.back().copied() {
            match next_from(&mut used, tail) {
                Some(p) => {
                    chain.push_back(p);
                    if p == a {
                        closed = true;
                        break;
                    }
                }
                None => break,
            }
        }
        if !closed {
            while let Some(head) = chain.front().copied() {
                match next_from(&mut used, head) {
                    Some(p) => chain.push_front(p),
                    None => break,
                }
            }
        }

        runs.push(chain.len() as PointIndex);
        runs.extend(chain);
    }
    runs
}

impl SectionOracle for MeshSectionOracle {
    fn geometry(&self) -> ModelGeometry {
        self.geometry
    }

    fn intersect(&self, region: RegionId, z: f64) -> Section {
        let (points, segments) = self.segments(region, z);
        let runs = strip_segments(&segments, points.len());
        Section {
            points: PointBuffer::new(points),
            runs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlpslice::classify_runs;
    use dlpslice_math::Point3;

    fn unit_cube() -> TriangleMesh {
        TriangleMesh::cuboid(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_mid_height_section_is_one_closed_loop() {
        let oracle = MeshSectionOracle::new(unit_cube()).unwrap();
        let section = oracle.intersect(0, 0.5);
        // Four vertical edges plus one diagonal per side face.
        assert_eq!(section.points.len(), 8);
        assert_eq!(section.runs.len(), 10);
        assert_eq!(section.runs[0], 9);
        assert_eq!(section.runs[1], section.runs[9]);

        let classified = classify_runs(&section.runs, section.points.len());
        assert_eq!(classified.closed.len(), 1);
        assert!(classified.open.is_empty());
        assert!(classified.malformed.is_empty());
    }

    #[test]
    fn test_plane_through_vertices_counts_them_above() {
        let oracle = MeshSectionOracle::new(unit_cube()).unwrap();

        // Top face: corners sit on the plane and the loop runs through them.
        let top = oracle.intersect(0, 1.0);
        assert_eq!(top.points.len(), 4);
        assert_eq!(top.runs.len(), 6);
        assert_eq!(top.runs[0], 5);
        for p in top.points.points() {
            assert!(p.x == 0.0 || p.x == 1.0);
            assert!(p.y == 0.0 || p.y == 1.0);
        }

        // Bottom face: everything is above, nothing is cut.
        let bottom = oracle.intersect(0, 0.0);
        assert!(bottom.points.is_empty());
        assert!(bottom.runs.is_empty());
    }

    #[test]
    fn test_regions_are_sectioned_separately() {
        let mut mesh = unit_cube();
        mesh.merge(&TriangleMesh::cuboid(
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(4.0, 1.0, 2.0),
        ));
        let oracle = MeshSectionOracle::new(mesh).unwrap();
        let geometry = oracle.geometry();
        assert_eq!(geometry.region_count, 2);
        assert_eq!(geometry.bounds.max, Point3::new(4.0, 1.0, 2.0));

        let first = oracle.intersect(0, 0.5);
        assert!(first.points.points().iter().all(|p| p.x <= 1.0));
        let second = oracle.intersect(1, 0.5);
        assert!(second.points.points().iter().all(|p| p.x >= 3.0));

        // Above the first cube only the second region is cut.
        assert!(oracle.intersect(0, 1.5).runs.is_empty());
        assert_eq!(oracle.intersect(1, 1.5).runs[0], 9);
        assert!(oracle.intersect(7, 0.5).runs.is_empty());
    }

    #[test]
    fn test_open_surface_gives_open_run() {
        // A single wall: two triangles forming a vertical quad.
        let mesh = TriangleMesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 1.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            triangles: vec![[0, 1, 2], [0, 2, 3]],
        };
        let oracle = MeshSectionOracle::new(mesh).unwrap();
        let section = oracle.intersect(0, 0.25);
        assert_eq!(section.points.len(), 3);
        assert_eq!(section.runs[0], 3);
        let classified = classify_runs(&section.runs, section.points.len());
        assert_eq!(classified.open.len(), 1);
    }

    #[test]
    fn test_strip_joins_out_of_order_segments() {
        // Square 0-1-2-3 given shuffled and with mixed directions.
        let runs = strip_segments(&[[2, 3], [1, 0], [3, 0], [1, 2]], 4);
        assert_eq!(runs[0], 5);
        assert_eq!(runs.len(), 6);
        assert_eq!(runs[1], runs[5]);

        // Two open pieces stay apart.
        let runs = strip_segments(&[[0, 1], [2, 3], [1, 4]], 5);
        assert_eq!(runs, vec![3, 0, 1, 4, 2, 2, 3]);
    }

    #[test]
    fn test_bad_mesh_rejected() {
        assert!(matches!(
            MeshSectionOracle::new(TriangleMesh::new()),
            Err(MeshError::EmptyMesh)
        ));
        let broken = TriangleMesh {
            vertices: vec![Point3::origin()],
            triangles: vec![[0, 1, 2]],
        };
        assert!(matches!(
            MeshSectionOracle::new(broken),
            Err(MeshError::IndexOutOfRange { .. })
        ));
    }
}
