//! The slicing pipeline behind the binary.

use anyhow::{Context, Result};
use dlpslice::{render_frames, slice, DefectSummary, SectionOracle};
use dlpslice_mesh::{load_stl, prepare};
use dlpslice_pack::{DisplayProfile, SliceArchive};

use crate::config::RunConfig;

/// What one run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Layers written.
    pub layers: usize,
    /// Connected regions in the model.
    pub regions: usize,
    /// Padded image size (pixels).
    pub image_size: [u32; 2],
    /// Contour defect counts.
    pub defects: DefectSummary,
}

/// Load, slice, render and archive as configured; print a summary.
pub fn run(config: &RunConfig) -> Result<()> {
    let summary = slice_to_archive(config)?;
    println!(
        "Sliced {} layer(s), {} region(s), {}x{} px -> {}",
        summary.layers,
        summary.regions,
        summary.image_size[0],
        summary.image_size[1],
        config.output.display()
    );
    let d = summary.defects;
    if d.malformed + d.unresolved + d.forced > 0 {
        println!(
            "Contour defects: {} malformed, {} dropped, {} force-closed (use --verbose for details)",
            d.malformed, d.unresolved, d.forced
        );
    }
    if d.empty_layers > 0 {
        println!("Empty layers: {}", d.empty_layers);
    }
    Ok(())
}

/// The pipeline without console output.
pub fn slice_to_archive(config: &RunConfig) -> Result<RunSummary> {
    let mesh = load_stl(&config.input)
        .with_context(|| format!("failed to load {}", config.input.display()))?;
    let oracle = prepare(&mesh, &config.orientation).context("failed to prepare mesh")?;
    let geometry = oracle.geometry();

    if let Some(profile) = &config.profile {
        let size = geometry.bounds.size();
        if !profile.fits_model(size.x, size.y, size.z) {
            log::warn!(
                "model ({:.1} x {:.1} x {:.1} mm) exceeds the {} build volume",
                size.x,
                size.y,
                size.z,
                profile.name
            );
        }
    }

    let settings = &config.settings;
    let stack = slice(&oracle, settings)?;

    let mut archive = SliceArchive::create(&config.output, settings, config.format)
        .with_context(|| format!("failed to create {}", config.output.display()))?;
    let layers = render_frames(&stack, &mut archive)
        .with_context(|| format!("failed to write {}", config.output.display()))?;
    let defects = stack.report.summary();
    let manifest = archive.manifest(Some(defects));
    archive.finish(Some(defects))?;

    if let Some(profile) = &config.profile {
        if !profile.fits_image(manifest.width, manifest.height) {
            log::warn!(
                "{}x{} px images exceed the {}x{} px panel of the {}",
                manifest.width,
                manifest.height,
                profile.resolution[0],
                profile.resolution[1],
                profile.name
            );
        }
    }

    Ok(RunSummary {
        layers,
        regions: geometry.region_count,
        image_size: [manifest.width, manifest.height],
        defects,
    })
}

/// Print the built-in display profiles.
pub fn list_profiles() {
    for profile in DisplayProfile::all_profiles() {
        let [ax, ay] = profile.area_mm();
        println!(
            "{:<14} {:<24} {}x{} px  {:.3} px/mm  {:.1} x {:.1} x {:.0} mm",
            profile.key,
            profile.name,
            profile.resolution[0],
            profile.resolution[1],
            profile.pixels_per_mm[0],
            ax,
            ay,
            profile.build_height
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlpslice::SliceSettings;
    use dlpslice_math::Point3;
    use dlpslice_mesh::{NormalizeOptions, TriangleMesh};
    use dlpslice_pack::OutputFormat;
    use std::io::Write;

    /// Binary STL of `mesh`, one facet per triangle.
    fn stl_bytes(mesh: &TriangleMesh) -> Vec<u8> {
        let mut out = vec![0u8; 80];
        out.extend_from_slice(&(mesh.num_triangles() as u32).to_le_bytes());
        for i in 0..mesh.num_triangles() {
            out.extend_from_slice(&[0u8; 12]);
            for p in mesh.triangle(i) {
                for c in [p.x, p.y, p.z] {
                    out.extend_from_slice(&(c as f32).to_le_bytes());
                }
            }
            out.extend_from_slice(&[0u8; 2]);
        }
        out
    }

    #[test]
    fn test_slice_to_archive() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("block.stl");
        let mesh = TriangleMesh::cuboid(Point3::new(1.0, 1.0, 0.0), Point3::new(3.0, 2.0, 1.0));
        std::fs::File::create(&input)
            .unwrap()
            .write_all(&stl_bytes(&mesh))
            .unwrap();

        let config = RunConfig {
            input: input.clone(),
            output: dir.path().join("block.zip"),
            settings: SliceSettings {
                layer_height: 0.5,
                pixels_per_mm: [10.0, 10.0],
                ..Default::default()
            },
            orientation: NormalizeOptions::default(),
            format: OutputFormat::Png,
            profile: Some(DisplayProfile::generic()),
        };
        let summary = slice_to_archive(&config).unwrap();
        assert_eq!(summary.layers, 2);
        assert_eq!(summary.regions, 1);
        // 2 x 1 mm at 10 px/mm with 10 px padding each side.
        assert_eq!(summary.image_size, [40, 30]);
        assert_eq!(summary.defects, DefectSummary::default());
        assert!(config.output.exists());
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            input: dir.path().join("nothing.stl"),
            output: dir.path().join("nothing.zip"),
            settings: SliceSettings::default(),
            orientation: NormalizeOptions::default(),
            format: OutputFormat::Png,
            profile: None,
        };
        let err = slice_to_archive(&config).unwrap_err();
        assert!(err.to_string().contains("failed to load"));
        assert!(!config.output.exists());
    }
}
