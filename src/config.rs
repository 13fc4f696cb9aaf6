//! Runtime configuration
//!
//! Hardware constants for the scan rig plus viewer tunables. The defaults
//! match the production scanner; a `scanview.toml` in the working directory
//! or the user config directory overrides them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

// ============================================================
// Constants
// ============================================================

/// Hardware sensor position of the left camera, in scan pixels
const DEFAULT_LEFT_OFFSET: u32 = 593;

/// Hardware sensor position of the right camera, in scan pixels
const DEFAULT_RIGHT_OFFSET: u32 = 150;

/// Hardware scan resolution
const DEFAULT_SCAN_DPI: u32 = 300;

/// Fallback crop height before book geometry is defined, in scan pixels
const DEFAULT_SADDLE_HEIGHT: u32 = 3600;

/// Minimum drag extent accepted as a crop gesture, in display pixels
const DEFAULT_MIN_DRAG: i32 = 30;

/// Mosaic grid shape
const DEFAULT_MOSAIC_COLUMNS: u32 = 10;
const DEFAULT_MOSAIC_ROWS: u32 = 20;

/// Autoplay timer interval
const DEFAULT_TICK_INTERVAL_MS: u64 = 50;

/// JPEG quality for exported page rasters
const DEFAULT_JPEG_QUALITY: u8 = 90;

/// External recognizer binary
const DEFAULT_RECOGNIZER: &str = "tesseract";

/// Config file name searched in the working directory
const LOCAL_CONFIG: &str = "scanview.toml";

// ============================================================
// Error Types
// ============================================================

/// Configuration loading error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not readable: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config file malformed: {0}")]
    ParseError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

// ============================================================
// Config
// ============================================================

/// Scanner hardware profile and viewer tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Vertical sensor offset of the left page camera (scan pixels)
    pub left_offset: u32,
    /// Vertical sensor offset of the right page camera (scan pixels)
    pub right_offset: u32,
    /// Scanner resolution in dots per inch
    pub scan_dpi: u32,
    /// Crop height used before book geometry exists (scan pixels)
    pub saddle_height: u32,
    /// Minimum accepted crop-drag extent (display pixels)
    pub min_drag: i32,
    /// Mosaic browser grid columns
    pub mosaic_columns: u32,
    /// Mosaic browser grid rows
    pub mosaic_rows: u32,
    /// Autoplay timer interval in milliseconds
    pub tick_interval_ms: u64,
    /// JPEG quality for exported page rasters (1-100)
    pub jpeg_quality: u8,
    /// Name of the external OCR binary looked up on PATH
    pub recognizer: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            left_offset: DEFAULT_LEFT_OFFSET,
            right_offset: DEFAULT_RIGHT_OFFSET,
            scan_dpi: DEFAULT_SCAN_DPI,
            saddle_height: DEFAULT_SADDLE_HEIGHT,
            min_drag: DEFAULT_MIN_DRAG,
            mosaic_columns: DEFAULT_MOSAIC_COLUMNS,
            mosaic_rows: DEFAULT_MOSAIC_ROWS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            recognizer: DEFAULT_RECOGNIZER.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Checks `./scanview.toml` first, then the user config directory.
    /// Absence of both is the normal case and yields the defaults.
    pub fn load() -> Result<Self> {
        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            return Self::load_from_path(local);
        }
        if let Some(user) = Self::user_config_path() {
            if user.exists() {
                return Self::load_from_path(&user);
            }
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from an explicit path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&text)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Path of the per-user config file, if a config directory exists.
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("scanview").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_hardware_profile() {
        let config = Config::default();
        assert_eq!(config.left_offset, 593);
        assert_eq!(config.right_offset, 150);
        assert_eq!(config.scan_dpi, 300);
        assert_eq!(config.saddle_height, 3600);
        assert_eq!(config.min_drag, 30);
        assert_eq!(config.recognizer, "tesseract");
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanview.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "scan_dpi = 600\nsaddle_height = 4200").unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.scan_dpi, 600);
        assert_eq!(config.saddle_height, 4200);
        assert_eq!(config.left_offset, 593);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanview.toml");
        std::fs::write(&path, "scan_dpi = \"not a number\"").unwrap();

        let result = Config::load_from_path(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let result = Config::load_from_path(Path::new("/nonexistent/scanview.toml"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }
}
