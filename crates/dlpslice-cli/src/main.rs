//! dlpslice CLI - slicer for DLP/masked-SLA resin printers
//!
//! Slices an STL model into one anti-aliased mask per layer and packs the
//! masks into a zip archive.

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

mod config;
mod run;

use config::{FileConfig, RunConfig};

#[derive(Parser, Debug)]
#[command(name = "dlpslice")]
#[command(version, about = "Simple slicer for DLP/masked-SLA 3D printers", long_about = None)]
pub struct Cli {
    /// STL model to slice
    #[arg(value_name = "INPUT", required_unless_present = "list_profiles")]
    input: Option<PathBuf>,

    /// Output archive (default: INPUT with a .zip extension)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Configuration file (TOML); flags override its values
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Layer height (mm) [default: 0.1]
    #[arg(short = 'l', long)]
    layer_height: Option<f64>,

    /// Keep every open contour, closing it across its gap
    #[arg(short = 'i', long)]
    ignore_bad: bool,

    /// Image padding (mm) [default: 1]
    #[arg(short, long)]
    padding: Option<u32>,

    /// Open contours with a gap below this are closed anyway (mm) [default: 0.5]
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Pixels per mm along X and Y [default: 21.16402 21.16402]
    #[arg(short, long, num_args = 2, value_names = ["DPMM_X", "DPMM_Y"])]
    dpmm: Option<Vec<f64>>,

    /// Display profile to take the resolution from
    #[arg(long, value_name = "NAME")]
    profile: Option<String>,

    /// Mirror the X axis
    #[arg(long)]
    xmirror: bool,

    /// The model is Y-up
    #[arg(long)]
    yup: bool,

    /// Write GIF instead of PNG layers
    #[arg(long)]
    gif: bool,

    /// Worker threads (0 = one per core)
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,

    /// List built-in display profiles and exit
    #[arg(long)]
    list_profiles: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug {
        LevelFilter::Debug
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Error
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    if cli.list_profiles {
        run::list_profiles();
        return Ok(());
    }

    let Some(input) = cli.input.as_deref() else {
        anyhow::bail!("no input file given");
    };

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("failed to initialize thread pool")?;
    }

    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let config = RunConfig::resolve(&cli, input, file)?;
    run::run(&config)
}
