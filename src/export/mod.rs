//! Page export and document assembly
//!
//! Writes per-page raster artifacts stamped with the geometry they were
//! cropped under, prunes artifacts stamped with superseded geometry, spawns
//! the external recognizer for pages missing a text layout, and assembles
//! the final searchable document.

mod artifact;
mod document;
mod ocr;

pub use artifact::{layout_path, parse_artifact_id, raster_path, LAYOUT_EXT, RASTER_EXT};
pub use document::{AssemblyReport, DocumentAssembler, OUTPUT_NAME};
pub use ocr::{parse_hocr, BBox, JobStatus, OcrJob, OcrLine, OcrWord};

use crate::config::Config;
use crate::geometry::BookGeometry;
use crate::raster::{ImageRaster, RasterSurface};
use crate::render::Spread;
use crate::suppress::SuppressionRegistry;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================
// Error Types
// ============================================================

/// Export pipeline error types
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Raster write failed: {0}")]
    RasterError(#[from] crate::raster::RasterError),

    #[error("Artifact decode failed: {0}")]
    DecodeError(#[from] image::ImageError),

    #[error("Malformed recognition layout: {0}")]
    LayoutError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

// ============================================================
// ExportPipeline
// ============================================================

/// Orchestrates raster export, recognizer jobs, and document assembly for
/// one scan directory.
#[derive(Debug)]
pub struct ExportPipeline {
    dir: PathBuf,
    scan_dpi: u32,
    jpeg_quality: u8,
    recognizer: Option<PathBuf>,
}

impl ExportPipeline {
    /// Create a pipeline for a scan directory. The recognizer binary is
    /// resolved on PATH once here; absence disables recognition for the
    /// whole session without being an error.
    pub fn new(dir: impl Into<PathBuf>, config: &Config) -> Self {
        let recognizer = match which::which(&config.recognizer) {
            Ok(path) => {
                info!(recognizer = %path.display(), "text recognizer found");
                Some(path)
            }
            Err(_) => {
                warn!(
                    recognizer = %config.recognizer,
                    "text recognizer not found, documents will have no text layer"
                );
                None
            }
        };
        Self {
            dir: dir.into(),
            scan_dpi: config.scan_dpi,
            jpeg_quality: config.jpeg_quality,
            recognizer,
        }
    }

    pub fn recognizer_available(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Path the assembled document is written to.
    pub fn output_path(&self) -> PathBuf {
        self.dir.join(OUTPUT_NAME)
    }

    /// Export one page's artifacts under the current geometry.
    ///
    /// A no-op before geometry is defined. Prunes artifacts for this id
    /// stamped with superseded geometry, writes the raster if absent, and
    /// spawns a recognizer job if the layout file is missing and the
    /// recognizer is available. The crop must already be in reading
    /// orientation.
    pub fn export_page(
        &self,
        id: u32,
        crop: &ImageRaster,
        geometry: Option<&BookGeometry>,
    ) -> Result<Option<OcrJob>> {
        let Some(geometry) = geometry else {
            return Ok(None);
        };
        let stem = artifact::stem(id, geometry);
        artifact::prune_stale(&self.dir, id, &stem)?;

        let raster = raster_path(&self.dir, &stem);
        if !raster.exists() {
            crop.save_jpeg(&raster, self.jpeg_quality)?;
            debug!(id, path = %raster.display(), "wrote page raster");
        }

        let layout = layout_path(&self.dir, &stem);
        if layout.exists() {
            return Ok(None);
        }
        let Some(recognizer) = &self.recognizer else {
            return Ok(None);
        };
        Ok(OcrJob::spawn(recognizer, &raster, &self.dir.join(&stem), id))
    }

    /// Export both pages of a rendered spread. The stored left crop is
    /// mirrored into reading orientation before writing.
    pub fn export_pair(
        &self,
        spread: &Spread<ImageRaster>,
        geometry: Option<&BookGeometry>,
    ) -> Result<(Option<OcrJob>, Option<OcrJob>)> {
        let left_crop = spread.crop_left.mirror_h();
        let left = self.export_page(spread.pair.left, &left_crop, geometry)?;
        let right = self.export_page(spread.pair.right, &spread.crop_right, geometry)?;
        Ok((left, right))
    }

    /// Assemble the searchable document from the exported artifacts.
    ///
    /// A no-op before geometry is defined. `progress` is called after each
    /// emitted page with (done, total kept pages).
    pub fn assemble_document(
        &self,
        geometry: Option<&BookGeometry>,
        suppressions: &SuppressionRegistry,
        title: &str,
        progress: impl FnMut(usize, usize),
    ) -> Result<Option<AssemblyReport>> {
        let Some(geometry) = geometry else {
            warn!("no book geometry defined, nothing to assemble");
            return Ok(None);
        };
        let assembler = DocumentAssembler::new(&self.dir, self.scan_dpi);
        let report = assembler.assemble(geometry, suppressions, title, progress)?;
        Ok(Some(report))
    }
}

/// List raster artifact stems present in a directory, in reading order.
pub fn artifact_stems(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut stems = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == RASTER_EXT) {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if parse_artifact_id(stem).is_some() {
                    stems.push(stem.to_string());
                }
            }
        }
    }
    // The hardware captures the book back to front, so descending order on
    // the zero-padded id prefix is the reading order.
    stems.sort_by(|a, b| b.cmp(a));
    Ok(stems)
}
