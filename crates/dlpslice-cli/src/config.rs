//! Run configuration: defaults, then an optional TOML file, then flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dlpslice::SliceSettings;
use dlpslice_mesh::NormalizeOptions;
use dlpslice_pack::{DisplayProfile, OutputFormat};
use serde::Deserialize;

use crate::Cli;

/// Contents of a `--config` file.
///
/// ```toml
/// profile = "mars"
/// format = "png"
///
/// [slice]
/// layer_height = 0.05
/// closing_threshold = 0.3
///
/// [orientation]
/// y_up = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Display profile key.
    pub profile: Option<String>,
    /// Image format of the layer entries.
    pub format: Option<OutputFormat>,
    /// Slicing parameters.
    pub slice: SliceSettings,
    /// Model orientation.
    pub orientation: NormalizeOptions,
}

impl FileConfig {
    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }
}

/// Everything one run needs, after layering.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Model file.
    pub input: PathBuf,
    /// Archive to write.
    pub output: PathBuf,
    /// Slicing parameters.
    pub settings: SliceSettings,
    /// Model orientation.
    pub orientation: NormalizeOptions,
    /// Image format of the layer entries.
    pub format: OutputFormat,
    /// Display the output is meant for, if named.
    pub profile: Option<DisplayProfile>,
}

impl RunConfig {
    /// Layer `cli` over `file` over the built-in defaults.
    pub fn resolve(cli: &Cli, input: &Path, file: FileConfig) -> Result<Self> {
        let mut settings = file.slice;
        let mut orientation = file.orientation;

        let profile = match cli.profile.as_deref().or(file.profile.as_deref()) {
            Some(key) => {
                let profile = DisplayProfile::by_key(key)?;
                settings.pixels_per_mm = profile.pixels_per_mm;
                Some(profile)
            }
            None => None,
        };

        if let Some(h) = cli.layer_height {
            settings.layer_height = h;
        }
        if let Some(t) = cli.threshold {
            settings.closing_threshold = t;
        }
        if let Some(p) = cli.padding {
            settings.padding_mm = p;
        }
        if let Some([x, y]) = cli.dpmm.as_deref().and_then(|d| <[f64; 2]>::try_from(d).ok()) {
            settings.pixels_per_mm = [x, y];
        }
        settings.ignore_bad_polygons |= cli.ignore_bad;
        orientation.mirror_x |= cli.xmirror;
        orientation.y_up |= cli.yup;

        let format = if cli.gif {
            OutputFormat::Gif
        } else {
            file.format.unwrap_or_default()
        };

        settings.validate()?;

        Ok(Self {
            input: input.to_path_buf(),
            output: cli
                .output
                .clone()
                .unwrap_or_else(|| input.with_extension("zip")),
            settings,
            orientation,
            format,
            profile,
        })
    }
}
