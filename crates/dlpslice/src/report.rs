//! Contour defects collected while slicing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::MalformedReason;
use crate::slice::RegionId;

/// A non-fatal problem found in one layer.
///
/// None of these stop the run. They are logged as they occur and gathered
/// into a [`SliceReport`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContourDefect {
    /// A raw run could not form a polyline and was dropped.
    #[error("malformed contour at Z = {z:.4} (layer {layer}, region {region}, run {run}): {reason}")]
    MalformedContour {
        /// Layer index.
        layer: usize,
        /// Layer height above the model base (mm).
        z: f64,
        /// Region the run belonged to.
        region: RegionId,
        /// Run number within the section stream.
        run: usize,
        /// Why the run was rejected.
        reason: MalformedReason,
    },

    /// An open contour whose gap exceeded the closing threshold; excluded.
    #[error("bad polygon at Z = {z:.4} (layer {layer}, region {region}): gap {gap:.4} mm across {fragments} fragment(s), dropped")]
    UnresolvedGap {
        /// Layer index.
        layer: usize,
        /// Layer height above the model base (mm).
        z: f64,
        /// Region the contour belonged to.
        region: RegionId,
        /// Endpoint distance in model units.
        gap: f64,
        /// Fragments joined before giving up.
        fragments: usize,
    },

    /// An open contour closed across its gap; kept.
    #[error("bad polygon at Z = {z:.4} (layer {layer}, region {region}): gap {gap:.4} mm across {fragments} fragment(s), closed")]
    ForcedClosure {
        /// Layer index.
        layer: usize,
        /// Layer height above the model base (mm).
        z: f64,
        /// Region the contour belonged to.
        region: RegionId,
        /// Endpoint distance in model units.
        gap: f64,
        /// Fragments joined before closing.
        fragments: usize,
    },

    /// A layer without any polygon; rendered as background.
    #[error("empty layer at Z = {z:.4} (layer {layer})")]
    EmptyLayer {
        /// Layer index.
        layer: usize,
        /// Layer height above the model base (mm).
        z: f64,
    },
}

/// Defect category, for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefectKind {
    /// See [`ContourDefect::MalformedContour`].
    MalformedContour,
    /// See [`ContourDefect::UnresolvedGap`].
    UnresolvedGap,
    /// See [`ContourDefect::ForcedClosure`].
    ForcedClosure,
    /// See [`ContourDefect::EmptyLayer`].
    EmptyLayer,
}

impl ContourDefect {
    /// Category of this defect.
    pub fn kind(&self) -> DefectKind {
        match self {
            Self::MalformedContour { .. } => DefectKind::MalformedContour,
            Self::UnresolvedGap { .. } => DefectKind::UnresolvedGap,
            Self::ForcedClosure { .. } => DefectKind::ForcedClosure,
            Self::EmptyLayer { .. } => DefectKind::EmptyLayer,
        }
    }

    /// Level the defect is logged at.
    ///
    /// Every bad polygon is a warning, kept or not. Empty layers are debug
    /// detail.
    pub fn level(&self) -> log::Level {
        match self.kind() {
            DefectKind::MalformedContour
            | DefectKind::UnresolvedGap
            | DefectKind::ForcedClosure => log::Level::Warn,
            DefectKind::EmptyLayer => log::Level::Debug,
        }
    }

    /// Emit the defect through the `log` facade.
    pub fn log(&self) {
        log::log!(self.level(), "{self}");
    }
}

/// Defect counts per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectSummary {
    /// Malformed runs dropped.
    pub malformed: usize,
    /// Open contours dropped.
    pub unresolved: usize,
    /// Open contours force-closed.
    pub forced: usize,
    /// Layers with no polygons.
    pub empty_layers: usize,
}

/// All defects of one slicing pass, in layer order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SliceReport {
    /// Defects as they were found.
    pub defects: Vec<ContourDefect>,
}

impl SliceReport {
    /// Whether geometry was lost or altered anywhere. Empty layers alone
    /// do not count.
    pub fn is_clean(&self) -> bool {
        self.defects
            .iter()
            .all(|d| d.kind() == DefectKind::EmptyLayer)
    }

    /// Number of defects of `kind`.
    pub fn count(&self, kind: DefectKind) -> usize {
        self.defects.iter().filter(|d| d.kind() == kind).count()
    }

    /// Counts per category.
    pub fn summary(&self) -> DefectSummary {
        DefectSummary {
            malformed: self.count(DefectKind::MalformedContour),
            unresolved: self.count(DefectKind::UnresolvedGap),
            forced: self.count(DefectKind::ForcedClosure),
            empty_layers: self.count(DefectKind::EmptyLayer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every log message.
    struct Capture(Mutex<Vec<(log::Level, String)>>);

    impl log::Log for Capture {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            if let Ok(mut records) = self.0.lock() {
                records.push((record.level(), record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture(Mutex::new(Vec::new()));

    #[test]
    fn test_defect_display_mentions_z_and_gap() {
        let defect = ContourDefect::UnresolvedGap {
            layer: 4,
            z: 0.5,
            region: 1,
            gap: 2.25,
            fragments: 3,
        };
        let text = defect.to_string();
        assert!(text.contains("Z = 0.5000"));
        assert!(text.contains("gap 2.2500 mm"));
        assert!(text.contains("dropped"));
    }

    #[test]
    fn test_summary_counts() {
        let report = SliceReport {
            defects: vec![
                ContourDefect::EmptyLayer { layer: 0, z: 0.1 },
                ContourDefect::ForcedClosure {
                    layer: 1,
                    z: 0.2,
                    region: 0,
                    gap: 0.1,
                    fragments: 2,
                },
                ContourDefect::MalformedContour {
                    layer: 1,
                    z: 0.2,
                    region: 0,
                    run: 3,
                    reason: MalformedReason::TooShort { len: 1 },
                },
            ],
        };
        let summary = report.summary();
        assert_eq!(summary.empty_layers, 1);
        assert_eq!(summary.forced, 1);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.unresolved, 0);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_forced_closure_is_logged_at_warn() {
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Trace);

        let forced = ContourDefect::ForcedClosure {
            layer: 2,
            z: 0.3,
            region: 0,
            gap: 0.25,
            fragments: 2,
        };
        assert_eq!(forced.level(), log::Level::Warn);
        forced.log();

        let expected = forced.to_string();
        assert!(expected.contains("Z = 0.3000"));
        assert!(expected.contains("gap 0.2500 mm"));
        let records = CAPTURE.0.lock().unwrap();
        let (level, _) = records
            .iter()
            .find(|(_, m)| *m == expected)
            .expect("forced closure was not logged");
        // `--verbose` shows Info and above.
        assert!(*level <= log::Level::Info);
    }

    #[test]
    fn test_log_levels() {
        let empty = ContourDefect::EmptyLayer { layer: 0, z: 0.1 };
        assert_eq!(empty.level(), log::Level::Debug);
        let gap = ContourDefect::UnresolvedGap {
            layer: 0,
            z: 0.1,
            region: 0,
            gap: 1.0,
            fragments: 1,
        };
        assert_eq!(gap.level(), log::Level::Warn);
    }

    #[test]
    fn test_empty_layers_alone_are_clean() {
        let report = SliceReport {
            defects: vec![ContourDefect::EmptyLayer { layer: 3, z: 0.4 }],
        };
        assert!(report.is_clean());
    }
}
