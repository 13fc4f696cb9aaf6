//! PPM header parsing
//!
//! Recovers the declared dimensions and the exact byte length of the header
//! so the pixel payload can be addressed by offset without copying.

use super::{FormatError, Result};
use std::path::Path;

/// Magic marker for raw-color (binary RGB) PPM data
const RAW_COLOR_MAGIC: &str = "P6";

/// Only 8-bit channels are supported
const MAX_CHANNEL_VALUE: &str = "255";

/// Parsed PPM header: declared dimensions plus consumed byte length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpmHeader {
    pub width: u32,
    pub height: u32,
    /// Total bytes consumed by the header lines; the pixel payload starts here
    pub header_len: usize,
}

impl PpmHeader {
    /// Byte length of the pixel payload this header declares
    pub fn payload_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Parse a PPM header from the start of `bytes`.
///
/// Accepts the scanner's exact output shape: magic line, optional single
/// `#` comment line, dimensions line, max-value line. `path` is only used
/// for error messages.
pub fn parse_header(bytes: &[u8], path: &Path) -> Result<PpmHeader> {
    let mut pos = 0usize;

    let magic = read_line(bytes, &mut pos)
        .ok_or_else(|| FormatError::MalformedHeader("missing magic line".into()))?;
    if magic != RAW_COLOR_MAGIC {
        return Err(FormatError::NotRawColor(path.to_path_buf()));
    }

    let mut dimensions = read_line(bytes, &mut pos)
        .ok_or_else(|| FormatError::MalformedHeader("missing dimensions line".into()))?;
    if dimensions.starts_with('#') {
        dimensions = read_line(bytes, &mut pos)
            .ok_or_else(|| FormatError::MalformedHeader("missing dimensions line".into()))?;
    }

    let max_value = read_line(bytes, &mut pos)
        .ok_or_else(|| FormatError::MalformedHeader("missing max-value line".into()))?;
    if max_value != MAX_CHANNEL_VALUE {
        return Err(FormatError::UnsupportedDepth(path.to_path_buf()));
    }

    let mut parts = dimensions.split_whitespace();
    let width = parse_dim(parts.next(), &dimensions)?;
    let height = parse_dim(parts.next(), &dimensions)?;

    Ok(PpmHeader {
        width,
        height,
        header_len: pos,
    })
}

/// Read one `\n`-terminated line, advancing `pos` past the newline.
fn read_line<'a>(bytes: &'a [u8], pos: &mut usize) -> Option<&'a str> {
    let rest = bytes.get(*pos..)?;
    let end = rest.iter().position(|&b| b == b'\n')?;
    let line = std::str::from_utf8(&rest[..end]).ok()?;
    *pos += end + 1;
    Some(line)
}

fn parse_dim(token: Option<&str>, line: &str) -> Result<u32> {
    token
        .and_then(|t| t.parse::<u32>().ok())
        .ok_or_else(|| FormatError::MalformedHeader(format!("bad dimensions line: {line:?}")))
}
