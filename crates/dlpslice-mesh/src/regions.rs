//! Connected-component labeling.
//!
//! Triangles sharing a vertex belong to the same region. Every region is
//! sliced on its own so overlapping shells each keep their own contours.

use crate::mesh::TriangleMesh;

/// Region of every triangle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMap {
    /// Region index per triangle.
    pub triangle_region: Vec<usize>,
    /// Number of regions, numbered `0..region_count` in order of first
    /// triangle.
    pub region_count: usize,
}

impl RegionMap {
    /// Triangle count per region.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.region_count];
        for &r in &self.triangle_region {
            sizes[r] += 1;
        }
        sizes
    }
}

/// Disjoint-set forest over vertex indices.
struct UnionFind {
    parent: Vec<u32>,
    size: Vec<u32>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
            size: vec![1; n],
        }
    }

    fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let grand = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = grand;
            x = grand;
        }
        x
    }

    fn union(&mut self, a: u32, b: u32) {
        let (mut a, mut b) = (self.find(a), self.find(b));
        if a == b {
            return;
        }
        if self.size[a as usize] < self.size[b as usize] {
            std::mem::swap(&mut a, &mut b);
        }
        self.parent[b as usize] = a;
        self.size[a as usize] += self.size[b as usize];
    }
}

/// Label the connected components of `mesh`.
///
/// Indices must be in range; see [`TriangleMesh::check_indices`].
pub fn label_regions(mesh: &TriangleMesh) -> RegionMap {
    let mut sets = UnionFind::new(mesh.num_vertices());
    for &[a, b, c] in &mesh.triangles {
        sets.union(a, b);
        sets.union(a, c);
    }

    let mut label = vec![usize::MAX; mesh.num_vertices()];
    let mut region_count = 0;
    let triangle_region = mesh
        .triangles
        .iter()
        .map(|tri| {
            let root = sets.find(tri[0]) as usize;
            if label[root] == usize::MAX {
                label[root] = region_count;
                region_count += 1;
            }
            label[root]
        })
        .collect();

    log::debug!("{region_count} region(s)");
    RegionMap {
        triangle_region,
        region_count,
    }
}
