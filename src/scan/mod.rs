//! Raw scan input module
//!
//! Parses the scanner's raw PPM (P6) output and exposes read-only,
//! zero-copy pixel views over memory-mapped scan files.
//!
//! # Scan file format
//!
//! - magic line `P6`
//! - optional single comment line starting with `#`
//! - dimensions line `W H`
//! - max-value line `255` (8-bit channels only)
//! - `W * H * 3` raw RGB bytes, row-major, no padding

mod header;
mod store;

pub use header::{parse_header, PpmHeader};
pub use store::{ScanImage, ScanStore, SCAN_EXT};

use std::path::PathBuf;
use thiserror::Error;

/// Raw scan format error types
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Not a raw-color scan file: {0}")]
    NotRawColor(PathBuf),

    #[error("Unsupported bit depth (only 8 bits per channel): {0}")]
    UnsupportedDepth(PathBuf),

    #[error("Malformed scan header: {0}")]
    MalformedHeader(String),

    #[error("Truncated pixel payload: expected {expected} bytes, found {actual}")]
    TruncatedPayload { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FormatError>;
