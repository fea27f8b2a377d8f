//! Contour repair: join open fragments at shared endpoints.
//!
//! Fragments are kept in an arena (a dense `Vec`) with a parallel consumed
//! flag per entry. Each unconsumed fragment, in discovery order, starts a
//! chain. The chain repeatedly scans the arena from the top for the first
//! unconsumed fragment sharing an endpoint index with it, splices that
//! fragment on and rescans, until the chain closes or nothing matches.
//!
//! Endpoints match by index identity only. Coordinates are consulted once,
//! to measure the gap of a chain that could not be closed.
//!
//! The pairing priority (head-head, tail-head, head-tail, tail-tail) and the
//! lowest-index-wins scan are fixed. On degenerate input where one endpoint
//! is shared by more than two fragments the result depends on this order.

use crate::path::{PointBuffer, PointIndex, Polyline};

/// Knobs for closing chains that stay open after joining.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepairOptions {
    /// Close every leftover chain regardless of its gap.
    pub ignore_bad_polygons: bool,
    /// Leftover chains whose endpoint gap is below this (model units) are
    /// closed anyway.
    pub closing_threshold: f64,
}

/// How a chain was closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Closure {
    /// Arrived closed; passed through untouched.
    Intact,
    /// Closed by joining fragments.
    Joined,
    /// Left open after joining and closed across the gap.
    Forced {
        /// Endpoint distance in model units.
        gap: f64,
    },
}

/// A closed polyline produced by repair.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairedContour {
    /// The closed index sequence.
    pub polyline: Polyline,
    /// Number of input fragments joined into it.
    pub fragments: usize,
    /// How it was closed.
    pub closure: Closure,
}

/// A chain that could not be closed within tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedContour {
    /// The open index sequence.
    pub polyline: Polyline,
    /// Number of input fragments joined into it.
    pub fragments: usize,
    /// Endpoint distance in model units.
    pub gap: f64,
}

/// Result of a repair pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairOutcome {
    /// Closed contours, in chain order.
    pub contours: Vec<RepairedContour>,
    /// Chains left open and excluded.
    pub unresolved: Vec<UnresolvedContour>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joint {
    HeadToHead,
    TailToHead,
    HeadToTail,
    TailToTail,
}

/// Join `fragments` into closed contours.
///
/// Fragments that are already closed are passed through unchanged and are
/// never offered as join partners, so repairing a closed set is a no-op.
pub fn repair_fragments(
    fragments: Vec<Polyline>,
    points: &PointBuffer,
    options: &RepairOptions,
) -> RepairOutcome {
    let mut arena: Vec<Vec<PointIndex>> = fragments
        .into_iter()
        .map(Polyline::into_indices)
        .collect();
    let mut consumed = vec![false; arena.len()];
    let mut outcome = RepairOutcome::default();

    for head in 0..arena.len() {
        if consumed[head] {
            continue;
        }
        consumed[head] = true;
        let mut chain = std::mem::take(&mut arena[head]);

        if is_closed(&chain) {
            outcome.contours.push(RepairedContour {
                polyline: Polyline::from_indices(chain),
                fragments: 1,
                closure: Closure::Intact,
            });
            continue;
        }

        let mut joined = 1;
        let mut closed = false;
        while let Some((partner, joint)) = find_partner(&chain, &arena, &consumed) {
            consumed[partner] = true;
            splice(&mut chain, &arena[partner], joint);
            joined += 1;
            if is_closed(&chain) {
                closed = true;
                break;
            }
        }

        if closed {
            outcome.contours.push(RepairedContour {
                polyline: Polyline::from_indices(chain),
                fragments: joined,
                closure: Closure::Joined,
            });
            continue;
        }

        let mut polyline = Polyline::from_indices(chain);
        let gap = points
            .distance(polyline.first(), polyline.last())
            .unwrap_or(f64::INFINITY);

        if options.ignore_bad_polygons || gap < options.closing_threshold {
            polyline.close();
            outcome.contours.push(RepairedContour {
                polyline,
                fragments: joined,
                closure: Closure::Forced { gap },
            });
        } else {
            outcome.unresolved.push(UnresolvedContour {
                polyline,
                fragments: joined,
                gap,
            });
        }
    }

    outcome
}

/// First unconsumed open fragment sharing an endpoint with `chain`.
fn find_partner(
    chain: &[PointIndex],
    arena: &[Vec<PointIndex>],
    consumed: &[bool],
) -> Option<(usize, Joint)> {
    let head = chain[0];
    let tail = chain[chain.len() - 1];

    arena
        .iter()
        .enumerate()
        .filter(|(j, candidate)| !consumed[*j] && !is_closed(candidate))
        .find_map(|(j, candidate)| {
            let first = candidate[0];
            let last = candidate[candidate.len() - 1];
            let joint = if head == first {
                Joint::HeadToHead
            } else if tail == first {
                Joint::TailToHead
            } else if head == last {
                Joint::HeadToTail
            } else if tail == last {
                Joint::TailToTail
            } else {
                return None;
            };
            Some((j, joint))
        })
}

/// Attach `other` to `chain`, dropping the shared endpoint and keeping one
/// direction of travel.
fn splice(chain: &mut Vec<PointIndex>, other: &[PointIndex], joint: Joint) {
    let n = other.len();
    match joint {
        Joint::HeadToHead => {
            let mut merged: Vec<PointIndex> = other[1..].iter().rev().copied().collect();
            merged.extend_from_slice(chain);
            *chain = merged;
        }
        Joint::TailToHead => chain.extend_from_slice(&other[1..]),
        Joint::HeadToTail => {
            let mut merged = other[..n - 1].to_vec();
            merged.extend_from_slice(chain);
            *chain = merged;
        }
        Joint::TailToTail => chain.extend(other[..n - 1].iter().rev()),
    }
}

fn is_closed(indices: &[PointIndex]) -> bool {
    indices.len() >= 2 && indices[0] == indices[indices.len() - 1]
}
