//! Contour types: point buffers, index polylines and materialized polygons.

use dlpslice_math::Point2;

/// Position of a point inside a [`PointBuffer`].
pub type PointIndex = u32;

/// Cut points produced by one oracle call for one (region, Z) pair.
///
/// Read-only once built; every polyline of the section indexes into it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointBuffer {
    points: Vec<Point2>,
}

impl PointBuffer {
    /// Wrap a list of points.
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Point at `index`, if in range.
    pub fn get(&self, index: PointIndex) -> Option<&Point2> {
        self.points.get(index as usize)
    }

    /// All points in index order.
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Euclidean distance between two indexed points, `None` if either
    /// index is out of range.
    pub fn distance(&self, a: PointIndex, b: PointIndex) -> Option<f64> {
        Some((self.get(a)? - self.get(b)?).norm())
    }
}

impl From<Vec<Point2>> for PointBuffer {
    fn from(points: Vec<Point2>) -> Self {
        Self::new(points)
    }
}

impl FromIterator<Point2> for PointBuffer {
    fn from_iter<I: IntoIterator<Item = Point2>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// An ordered sequence of point indices with at least two entries.
///
/// Closed when the first and last index are equal, open otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polyline {
    indices: Vec<PointIndex>,
}

impl Polyline {
    /// Create a polyline. Returns `None` for fewer than two indices.
    pub fn new(indices: Vec<PointIndex>) -> Option<Self> {
        (indices.len() >= 2).then_some(Self { indices })
    }

    /// Wrap indices already known to hold at least two entries.
    pub(crate) fn from_indices(indices: Vec<PointIndex>) -> Self {
        debug_assert!(indices.len() >= 2);
        Self { indices }
    }

    /// Number of indices (a closed polyline counts its start twice).
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// First index.
    pub fn first(&self) -> PointIndex {
        self.indices[0]
    }

    /// Last index.
    pub fn last(&self) -> PointIndex {
        self.indices[self.indices.len() - 1]
    }

    /// Is the polyline closed by index identity?
    pub fn is_closed(&self) -> bool {
        self.first() == self.last()
    }

    /// The index sequence.
    pub fn indices(&self) -> &[PointIndex] {
        &self.indices
    }

    /// Consume into the index sequence.
    pub fn into_indices(self) -> Vec<PointIndex> {
        self.indices
    }

    /// Close an open polyline by repeating its first index.
    pub fn close(&mut self) {
        if !self.is_closed() {
            self.indices.push(self.indices[0]);
        }
    }

    /// Resolve indices to points, mapping each through `map`.
    ///
    /// Returns `None` if any index falls outside `buffer`.
    pub fn materialize<F>(&self, buffer: &PointBuffer, map: F) -> Option<Vec<Point2>>
    where
        F: Fn(&Point2) -> Point2,
    {
        self.indices
            .iter()
            .map(|&i| buffer.get(i).map(&map))
            .collect()
    }
}

/// How a polygon came to be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ContourOrigin {
    /// Closed as delivered by the intersection oracle.
    Intact,
    /// Closed by joining fragments at shared endpoints.
    Joined,
    /// Still open after joining; closed with a straight edge across the gap.
    Forced,
}

/// A closed contour in device pixel coordinates, ready for rasterization.
///
/// The first point is repeated at the end.
#[derive(Debug, Clone)]
pub struct Polygon {
    /// Vertices in order, closing point included.
    pub points: Vec<Point2>,
    /// How the contour was closed.
    pub origin: ContourOrigin,
}

impl Polygon {
    /// Create a polygon from points.
    pub fn new(points: Vec<Point2>, origin: ContourOrigin) -> Self {
        Self { points, origin }
    }

    /// Check if the polygon is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of vertices, closing point included.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Signed area of the polygon.
    /// Positive for counter-clockwise, negative for clockwise.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polyline_rejects_short_runs() {
        assert!(Polyline::new(vec![]).is_none());
        assert!(Polyline::new(vec![3]).is_none());
        assert!(Polyline::new(vec![3, 4]).is_some());
    }

    #[test]
    fn test_polyline_closed_by_index() {
        let closed = Polyline::new(vec![0, 1, 2, 0]).unwrap();
        assert!(closed.is_closed());
        let mut open = Polyline::new(vec![0, 1, 2]).unwrap();
        assert!(!open.is_closed());
        open.close();
        assert_eq!(open.indices(), &[0, 1, 2, 0]);
        open.close();
        assert_eq!(open.len(), 4);
    }

    #[test]
    fn test_materialize_out_of_range() {
        let buffer = PointBuffer::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]);
        let good = Polyline::new(vec![0, 1]).unwrap();
        let bad = Polyline::new(vec![0, 2]).unwrap();
        let scaled = good
            .materialize(&buffer, |p| Point2::new(p.x * 2.0, p.y))
            .unwrap();
        assert_eq!(scaled[1], Point2::new(2.0, 0.0));
        assert!(bad.materialize(&buffer, |p| *p).is_none());
    }

    #[test]
    fn test_polygon_area() {
        let square = Polygon::new(
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(0.0, 1.0),
                Point2::new(0.0, 0.0),
            ],
            ContourOrigin::Intact,
        );
        assert!((square.signed_area() - 1.0).abs() < 1e-10);
    }
}
