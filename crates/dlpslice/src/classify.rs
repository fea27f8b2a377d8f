//! Segment classification: split a raw run stream into closed and open
//! polylines.
//!
//! The oracle hands over one flat stream in which every run is a count `n`
//! followed by `n` point indices. Runs that cannot form a polyline are
//! dropped and reported; the rest are sorted by whether their first and last
//! index coincide.

use std::fmt;

use crate::path::{PointIndex, Polyline};

/// Why a run was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// Fewer than two indices.
    TooShort {
        /// Declared length of the run.
        len: usize,
    },
    /// An index points past the end of the point buffer.
    IndexOutOfRange {
        /// The offending index.
        index: PointIndex,
    },
    /// The declared count runs past the end of the stream.
    Truncated {
        /// Declared length of the run.
        declared: usize,
        /// Indices actually left in the stream.
        available: usize,
    },
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len } => write!(f, "run of {len} point(s)"),
            Self::IndexOutOfRange { index } => write!(f, "point index {index} out of range"),
            Self::Truncated {
                declared,
                available,
            } => write!(f, "run declares {declared} points, stream has {available}"),
        }
    }
}

/// A rejected run, identified by its position in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedRun {
    /// Zero-based run number.
    pub run: usize,
    /// Why it was rejected.
    pub reason: MalformedReason,
}

/// Result of classifying one section's run stream.
#[derive(Debug, Clone, Default)]
pub struct Classified {
    /// Runs whose first and last index match.
    pub closed: Vec<Polyline>,
    /// Fragments, in discovery order.
    pub open: Vec<Polyline>,
    /// Rejected runs.
    pub malformed: Vec<MalformedRun>,
}

/// Classify a run-length encoded index stream.
///
/// `point_count` is the length of the point buffer the indices refer to.
pub fn classify_runs(stream: &[PointIndex], point_count: usize) -> Classified {
    let mut out = Classified::default();
    let mut cursor = 0;
    let mut run = 0;

    while cursor < stream.len() {
        let declared = stream[cursor] as usize;
        cursor += 1;
        let available = stream.len() - cursor;

        if declared > available {
            out.malformed.push(MalformedRun {
                run,
                reason: MalformedReason::Truncated {
                    declared,
                    available,
                },
            });
            break;
        }

        let indices = &stream[cursor..cursor + declared];
        cursor += declared;

        if let Some(reason) = check_run(indices, point_count) {
            out.malformed.push(MalformedRun { run, reason });
        } else if let Some(polyline) = Polyline::new(indices.to_vec()) {
            if polyline.is_closed() {
                out.closed.push(polyline);
            } else {
                out.open.push(polyline);
            }
        }
        run += 1;
    }

    out
}

fn check_run(indices: &[PointIndex], point_count: usize) -> Option<MalformedReason> {
    if indices.len() < 2 {
        return Some(MalformedReason::TooShort { len: indices.len() });
    }
    indices
        .iter()
        .find(|&&i| i as usize >= point_count)
        .map(|&index| MalformedReason::IndexOutOfRange { index })
}
