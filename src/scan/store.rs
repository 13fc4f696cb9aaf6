//! Scan directory access
//!
//! Scans are named `<id:06>.pnm` with ids starting at 1; odd ids are left
//! pages. The store never mutates scan files and exposes pixel data through
//! a shared memory map.

use super::{parse_header, FormatError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Scan file extension produced by the digitization hardware
pub const SCAN_EXT: &str = "pnm";

/// One memory-mapped scan image
pub struct ScanImage {
    /// Sequence id, starting at 1
    pub id: u32,
    pub width: u32,
    pub height: u32,
    map: Mmap,
    pixel_offset: usize,
}

impl ScanImage {
    /// Raw RGB pixel payload, `width * height * 3` bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        let len = self.width as usize * self.height as usize * 3;
        &self.map[self.pixel_offset..self.pixel_offset + len]
    }
}

impl std::fmt::Debug for ScanImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanImage")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Read-only view over a directory of raw scans
#[derive(Debug, Clone)]
pub struct ScanStore {
    dir: PathBuf,
}

impl ScanStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a scan with this sequence id would live at.
    pub fn path_for(&self, id: u32) -> PathBuf {
        self.dir.join(format!("{id:06}.{SCAN_EXT}"))
    }

    pub fn exists(&self, id: u32) -> bool {
        self.path_for(id).exists()
    }

    /// Map and parse the scan with the given sequence id.
    pub fn load(&self, id: u32) -> Result<ScanImage> {
        let path = self.path_for(id);
        let file = File::open(&path)?;
        // Scans are append-only hardware output; remapping on every load
        // keeps the view consistent with files that appear mid-session.
        let map = unsafe { Mmap::map(&file)? };
        let header = parse_header(&map, &path)?;
        let expected = header.header_len + header.payload_len();
        if map.len() < expected {
            return Err(FormatError::TruncatedPayload {
                expected,
                actual: map.len(),
            });
        }
        debug!(id, width = header.width, height = header.height, "mapped scan");
        Ok(ScanImage {
            id,
            width: header.width,
            height: header.height,
            map,
            pixel_offset: header.header_len,
        })
    }

    /// Clip a candidate page-pair start to one that actually exists.
    ///
    /// Ids below 1 snap to 1; ids beyond the stream walk back one pair at a
    /// time until a present scan is found.
    pub fn clip_pair_start(&self, candidate: i64) -> u32 {
        let mut id = candidate.max(1) as u32;
        while id > 1 && !self.exists(id) {
            id = id.saturating_sub(2).max(1);
        }
        id
    }

    /// Start of the highest existing page-pair, scanning ids descending and
    /// aligning to left-page (odd) parity. `None` when the directory holds
    /// no scans at all.
    pub fn last_pair_start(&self) -> Option<u32> {
        let mut highest: Option<u32> = None;
        for entry in std::fs::read_dir(&self.dir).ok()? {
            let path = entry.ok()?.path();
            if path.extension().is_some_and(|ext| ext == SCAN_EXT) {
                if let Some(id) = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .and_then(|s| s.parse::<u32>().ok())
                {
                    highest = Some(highest.map_or(id, |h| h.max(id)));
                }
            }
        }
        // Even ids are right pages; their pair starts one earlier.
        highest.map(|id| id - 1 + id % 2)
    }
}
