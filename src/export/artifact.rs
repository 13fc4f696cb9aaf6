//! Artifact naming and staleness pruning
//!
//! Derived files are named `<id:06>-<top>-<bottom>-<side>.<ext>`. The
//! geometry stamp in the name is the staleness key: an artifact stamped
//! with anything other than the current geometry must be deleted before a
//! replacement is written.

use crate::geometry::BookGeometry;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Exported page raster extension
pub const RASTER_EXT: &str = "jpg";

/// Recognition layout file extension
pub const LAYOUT_EXT: &str = "html";

/// Filename stem for one page's artifacts under the given geometry.
pub fn stem(id: u32, geometry: &BookGeometry) -> String {
    format!("{id:06}-{}", geometry.stamp())
}

/// Scan id encoded in an artifact stem, if the stem carries one.
pub fn parse_artifact_id(stem: &str) -> Option<u32> {
    let id = stem.get(..6)?;
    if stem.as_bytes().get(6) != Some(&b'-') {
        return None;
    }
    id.parse().ok()
}

pub fn raster_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.{RASTER_EXT}"))
}

pub fn layout_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.{LAYOUT_EXT}"))
}

/// Delete this id's artifacts whose stem does not match `current_stem`.
pub fn prune_stale(dir: &Path, id: u32, current_stem: &str) -> std::io::Result<()> {
    let prefix = format!("{id:06}-");
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let stale = path
            .extension()
            .is_some_and(|e| e == RASTER_EXT || e == LAYOUT_EXT)
            && path.file_stem().and_then(|s| s.to_str()).is_some_and(|s| {
                s.starts_with(&prefix) && s != current_stem
            });
        if stale {
            debug!(path = %path.display(), "pruning stale artifact");
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}
