//! scanview - Review and export tool for book-digitization scan streams
//!
//! An operator reviews the raw two-page scans coming off the digitization
//! rig, defines the book's crop geometry once with a drag, marks bad page
//! pairs, and assembles a searchable PDF that merges the cropped pages with
//! an invisible OCR text layer.
//!
//! The crate is organized around the coordinate pipeline:
//! - [`scan`]: raw scan parsing and the scan directory store
//! - [`geometry`]: the persisted crop rectangle and every space conversion
//! - [`raster`]: the raster-buffer seam between core and display
//! - [`render`]: spread, zoom, and mosaic image construction
//! - [`suppress`]: the persisted bad-pair registry
//! - [`export`]: artifacts, recognizer jobs, and document assembly
//! - [`controller`]: the event-driven interaction state machine
//! - [`biblio`]: barcode-to-title lookup for the splash banner
//! - [`config`]: hardware profile and tunables

pub mod biblio;
pub mod config;
pub mod controller;
pub mod export;
pub mod geometry;
pub mod raster;
pub mod render;
pub mod scan;
pub mod suppress;

pub use biblio::{bibliography_banner, BibliographyLookup, LookupError, OfflineLookup};
pub use config::{Config, ConfigError};
pub use controller::{
    ControllerError, DisplayPort, Flow, InputEvent, InteractionController, Key, Mode,
    NavigationState, PointerButton, Status,
};
pub use export::{
    AssemblyReport, ExportError, ExportPipeline, JobStatus, OcrJob, OUTPUT_NAME,
};
pub use geometry::{BookGeometry, GeometryEngine, GeometryError, PageSide, Point};
pub use raster::{ImageRaster, RasterError, RasterSurface};
pub use render::{MosaicLayout, MosaicTile, PagePair, PageRenderer, Spread};
pub use scan::{FormatError, PpmHeader, ScanImage, ScanStore, SCAN_EXT};
pub use suppress::{SuppressError, SuppressionRegistry};

/// Exit codes for the command-line binary
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INPUT_NOT_FOUND: i32 = 2;
}
