//! Suppressed page-pair registry
//!
//! Pairs the operator marked invalid, keyed by the left page's sequence id.
//! Every toggle rewrites the persisted record in full; the record is a
//! comment header followed by one sorted comma-separated id line.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Persisted suppression record file name, kept in the scan directory
pub const SUPPRESSION_RECORD: &str = "suppressions";

/// Comment header written at the top of the suppression record
const RECORD_HEADER: &str = "#Suppressed image pairs indicated by left image number";

/// Suppression persistence error types
#[derive(Debug, Error)]
pub enum SuppressError {
    #[error("Malformed suppression record: {0}")]
    MalformedRecord(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SuppressError>;

/// Persistent set of excluded page-pair identifiers
#[derive(Debug)]
pub struct SuppressionRegistry {
    path: PathBuf,
    set: BTreeSet<u32>,
}

impl SuppressionRegistry {
    /// Load the registry for a scan directory. A missing record is the
    /// normal initial condition; malformed content is an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(SUPPRESSION_RECORD);
        let mut set = BTreeSet::new();
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                for line in text.lines() {
                    if line.starts_with('#') || line.trim().is_empty() {
                        continue;
                    }
                    for field in line.split(',') {
                        let id = field.trim().parse::<u32>().map_err(|_| {
                            SuppressError::MalformedRecord(line.to_string())
                        })?;
                        set.insert(id);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(Self { path, set })
    }

    pub fn contains(&self, id: u32) -> bool {
        self.set.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Add the id if absent, remove it if present, then rewrite the record.
    /// Returns whether the id is suppressed after the toggle.
    pub fn toggle(&mut self, id: u32) -> Result<bool> {
        let suppressed = if self.set.remove(&id) {
            false
        } else {
            self.set.insert(id);
            true
        };
        self.persist()?;
        info!(id, suppressed, "suppression toggled");
        Ok(suppressed)
    }

    fn persist(&self) -> Result<()> {
        let mut body = String::from(RECORD_HEADER);
        body.push('\n');
        if !self.set.is_empty() {
            let csv: Vec<String> = self.set.iter().map(u32::to_string).collect();
            body.push_str(&csv.join(","));
            body.push('\n');
        }
        std::fs::write(&self.path, body)?;
        Ok(())
    }
}
