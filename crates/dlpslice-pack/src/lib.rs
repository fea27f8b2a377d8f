#![warn(missing_docs)]

//! Output packaging for the dlpslice slicer.
//!
//! This crate provides:
//! - Mask padding and PNG/GIF encoding
//! - Zip slice archives with a JSON manifest
//! - Display profiles for common resin printers
//!
//! # Example
//!
//! ```ignore
//! use dlpslice::{render_frames, slice, SliceSettings};
//! use dlpslice_pack::{OutputFormat, SliceArchive};
//!
//! let stack = slice(&oracle, &settings)?;
//! let mut archive = SliceArchive::create("part.zip", &settings, OutputFormat::Png)?;
//! render_frames(&stack, &mut archive)?;
//! archive.finish(Some(stack.report.summary()))?;
//! ```

pub mod archive;
pub mod encode;
pub mod error;
pub mod profile;

pub use archive::{layer_entry_name, Manifest, SliceArchive, MANIFEST_NAME};
pub use encode::{encode, pad_mask, OutputFormat};
pub use error::{PackError, Result};
pub use profile::DisplayProfile;
