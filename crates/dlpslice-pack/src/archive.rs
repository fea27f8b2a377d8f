//! Slice archive: one image per layer plus a JSON manifest, in a zip.
//!
//! Layout:
//!
//! ```text
//! slices/layer-0.png
//! slices/layer-1.png
//! ...
//! manifest.json
//! ```

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use dlpslice::{DefectSummary, Frame, FrameSink, SliceSettings};
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::encode::{encode, pad_mask, OutputFormat};
use crate::error::{PackError, Result};

/// Name of the manifest entry.
pub const MANIFEST_NAME: &str = "manifest.json";

/// Archive entry name of layer `index`.
pub fn layer_entry_name(index: usize, format: OutputFormat) -> String {
    format!("slices/layer-{index}.{}", format.extension())
}

/// Print parameters recorded in `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Producing program and version.
    pub generator: String,
    /// Number of layer images.
    pub layer_count: usize,
    /// Layer thickness (mm).
    pub layer_height: f64,
    /// Pixel density along X and Y (pixels per mm).
    pub pixels_per_mm: [f64; 2],
    /// Resolution along X and Y (dots per inch).
    pub dpi: [f64; 2],
    /// Padded image width (pixels).
    pub width: u32,
    /// Padded image height (pixels).
    pub height: u32,
    /// Border around the model area (pixels).
    pub padding: u32,
    /// Image format of the layer entries.
    pub format: OutputFormat,
    /// Contour defect counts, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defects: Option<DefectSummary>,
}

/// [`FrameSink`] writing a zip slice archive.
pub struct SliceArchive<W: Write + Seek> {
    zip: ZipWriter<W>,
    format: OutputFormat,
    layer_height: f64,
    pixels_per_mm: [f64; 2],
    dpi: [f64; 2],
    size: Option<[u32; 2]>,
    padding: u32,
    layers: usize,
}

impl SliceArchive<BufWriter<File>> {
    /// Create an archive file at `path`.
    pub fn create<P: AsRef<Path>>(
        path: P,
        settings: &SliceSettings,
        format: OutputFormat,
    ) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), settings, format))
    }
}

impl<W: Write + Seek> SliceArchive<W> {
    /// Start an archive on `writer`.
    pub fn new(writer: W, settings: &SliceSettings, format: OutputFormat) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            format,
            layer_height: settings.layer_height,
            pixels_per_mm: settings.pixels_per_mm,
            dpi: settings.dpi(),
            size: None,
            padding: settings.padding_px(),
            layers: 0,
        }
    }

    /// Write one padded, encoded layer image.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let padded = pad_mask(&frame.mask, frame.padding);
        let size = [padded.width(), padded.height()];
        match self.size {
            None => {
                self.size = Some(size);
                self.padding = frame.padding;
                self.dpi = frame.dpi;
            }
            Some(expected) if expected != size => {
                return Err(PackError::SizeMismatch {
                    layer: frame.index,
                    expected,
                    got: size,
                });
            }
            Some(_) => {}
        }

        let bytes = encode(&padded, self.format)?;
        // Images are already compressed.
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        self.zip
            .start_file(layer_entry_name(frame.index, self.format), options)?;
        self.zip.write_all(&bytes)?;
        self.layers += 1;
        log::debug!(
            "stored layer {} ({} bytes)",
            frame.index,
            bytes.len()
        );
        Ok(())
    }

    /// The manifest describing what has been written.
    pub fn manifest(&self, defects: Option<DefectSummary>) -> Manifest {
        let [width, height] = self.size.unwrap_or([0, 0]);
        Manifest {
            generator: concat!("dlpslice ", env!("CARGO_PKG_VERSION")).to_string(),
            layer_count: self.layers,
            layer_height: self.layer_height,
            pixels_per_mm: self.pixels_per_mm,
            dpi: self.dpi,
            width,
            height,
            padding: self.padding,
            format: self.format,
            defects,
        }
    }

    /// Write `manifest.json` and close the archive.
    pub fn finish(mut self, defects: Option<DefectSummary>) -> Result<W> {
        let manifest = self.manifest(defects);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(6));
        self.zip.start_file(MANIFEST_NAME, options)?;
        self.zip
            .write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;
        let mut writer = self.zip.finish()?;
        writer.flush()?;
        log::info!("archive closed with {} layer(s)", manifest.layer_count);
        Ok(writer)
    }
}

impl<W: Write + Seek> FrameSink for SliceArchive<W> {
    type Error = PackError;

    fn accept(&mut self, frame: Frame) -> Result<()> {
        self.write_frame(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlpslice::raster::{Mask, FOREGROUND};
    use std::io::{Cursor, Read};

    fn frame(index: usize, width: u32) -> Frame {
        let mut pixels = vec![0; (width * 2) as usize];
        pixels[0] = FOREGROUND;
        Frame {
            index,
            z: 0.1 * (index + 1) as f64,
            mask: Mask::from_raw(width, 2, pixels).unwrap(),
            padding: 1,
            dpi: [254.0, 254.0],
        }
    }

    fn settings() -> SliceSettings {
        SliceSettings {
            pixels_per_mm: [10.0, 10.0],
            ..Default::default()
        }
    }

    #[test]
    fn test_entries_and_manifest() {
        let mut archive = SliceArchive::new(Cursor::new(Vec::new()), &settings(), OutputFormat::Png);
        archive.accept(frame(0, 3)).unwrap();
        archive.accept(frame(1, 3)).unwrap();
        let bytes = archive.finish(None).unwrap().into_inner();
        assert_eq!(&bytes[0..2], b"PK");

        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 3);
        assert!(zip.by_name("slices/layer-0.png").is_ok());
        assert!(zip.by_name("slices/layer-1.png").is_ok());

        let mut text = String::new();
        zip.by_name(MANIFEST_NAME)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        let manifest: Manifest = serde_json::from_str(&text).unwrap();
        assert_eq!(manifest.layer_count, 2);
        assert_eq!((manifest.width, manifest.height), (5, 4));
        assert_eq!(manifest.padding, 1);
        assert_eq!(manifest.format, OutputFormat::Png);
        assert_eq!(manifest.dpi, [254.0, 254.0]);
        assert!(manifest.defects.is_none());
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let mut archive = SliceArchive::new(Cursor::new(Vec::new()), &settings(), OutputFormat::Gif);
        archive.accept(frame(0, 3)).unwrap();
        assert!(matches!(
            archive.accept(frame(1, 4)),
            Err(PackError::SizeMismatch { layer: 1, .. })
        ));
    }

    #[test]
    fn test_entry_names() {
        assert_eq!(layer_entry_name(12, OutputFormat::Gif), "slices/layer-12.gif");
    }
}
