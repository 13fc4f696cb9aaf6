//! Book geometry and coordinate transforms
//!
//! The viewer juggles four coordinate spaces: full scan pixels, crop pixels
//! (scan pixels relative to the crop origin), display pixels, and document
//! points. This module owns the persisted crop rectangle and every
//! conversion between those spaces.
//!
//! All distance scalings are integer proportional scalings
//! `value * target / source`, truncating toward zero at every call site so
//! the transforms compose exactly.

use crate::config::Config;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Persisted geometry record file name, kept in the scan directory
pub const GEOMETRY_RECORD: &str = "book_dimensions";

/// Comment header written at the top of the geometry record
const RECORD_HEADER: &str = "#top,bottom,side";

// ============================================================
// Error Types
// ============================================================

/// Geometry persistence error types
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Malformed geometry record: {0}")]
    MalformedRecord(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GeometryError>;

// ============================================================
// Core Data Structures
// ============================================================

/// Which facing page of a spread a coordinate belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSide {
    Left,
    Right,
}

impl PageSide {
    pub fn of_scan(id: u32) -> Self {
        if id % 2 == 1 {
            PageSide::Left
        } else {
            PageSide::Right
        }
    }
}

/// A point in whichever coordinate space the context implies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// The book crop rectangle shared by both facing pages, in scan pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookGeometry {
    pub top: u32,
    pub bottom: u32,
    pub side: u32,
}

impl BookGeometry {
    /// Crop dimensions: (book width, book height)
    pub fn crop_size(&self) -> (u32, u32) {
        (self.side, self.bottom - self.top)
    }

    /// Stamp encoded into derived artifact names for staleness detection
    pub fn stamp(&self) -> String {
        format!("{}-{}-{}", self.top, self.bottom, self.side)
    }
}

/// Integer proportional scaling used by every coordinate conversion.
///
/// Intermediate math is 64-bit so display-by-scan-pixel products cannot
/// overflow.
fn rescale(value: i32, target: u32, source: u32) -> i32 {
    (value as i64 * target as i64 / source as i64) as i32
}

// ============================================================
// GeometryEngine
// ============================================================

/// Owns the optional [`BookGeometry`] plus the hardware constants every
/// transform depends on, and keeps the persisted record in sync.
#[derive(Debug)]
pub struct GeometryEngine {
    record_path: PathBuf,
    geometry: Option<BookGeometry>,
    left_offset: u32,
    right_offset: u32,
    scan_dpi: u32,
    saddle_height: u32,
    min_drag: i32,
}

impl GeometryEngine {
    /// Create an engine for the given scan directory, loading any geometry
    /// persisted by an earlier run. A missing record is the normal initial
    /// condition; a malformed one is an error.
    pub fn load(dir: &Path, config: &Config) -> Result<Self> {
        let mut engine = Self {
            record_path: dir.join(GEOMETRY_RECORD),
            geometry: None,
            left_offset: config.left_offset,
            right_offset: config.right_offset,
            scan_dpi: config.scan_dpi,
            saddle_height: config.saddle_height,
            min_drag: config.min_drag,
        };
        engine.geometry = engine.read_record()?;
        if let Some(g) = &engine.geometry {
            debug!(top = g.top, bottom = g.bottom, side = g.side, "loaded book geometry");
        }
        Ok(engine)
    }

    pub fn geometry(&self) -> Option<&BookGeometry> {
        self.geometry.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn scan_dpi(&self) -> u32 {
        self.scan_dpi
    }

    pub fn saddle_height(&self) -> u32 {
        self.saddle_height
    }

    /// Separation between a page image and the display center, in display
    /// pixels.
    pub fn display_margin(display_width: u32) -> i32 {
        (display_width / 100) as i32
    }

    fn sensor_offset(&self, side: PageSide) -> u32 {
        match side {
            PageSide::Left => self.left_offset,
            PageSide::Right => self.right_offset,
        }
    }

    /// Vertical crop origin for one facing page, in full-scan coordinates:
    /// the geometry `top` (when set) plus the side's sensor offset.
    pub fn crop_origin(&self, side: PageSide) -> u32 {
        self.geometry.map_or(0, |g| g.top) + self.sensor_offset(side)
    }

    /// Crop height in effect: the book height once geometry is set, the
    /// saddle height before that.
    pub fn crop_height(&self) -> u32 {
        self.geometry.map_or(self.saddle_height, |g| g.bottom - g.top)
    }

    /// Convert a display-space point into crop-resolution coordinates plus
    /// the side it landed on.
    ///
    /// The two page images sit either side of display center, separated by
    /// `margin`; the left image is displayed mirrored, so its x is reflected
    /// back into crop space.
    pub fn display_to_crop(
        &self,
        point: Point,
        display_width: u32,
        scale_size: (u32, u32),
        crop_size: (u32, u32),
        margin: i32,
    ) -> (Point, PageSide) {
        let w2 = (display_width / 2) as i32;
        let is_left = point.x < w2;
        let x0 = if is_left {
            w2 - margin - scale_size.0 as i32
        } else {
            w2 + margin
        };
        let mut x = rescale(point.x - x0, crop_size.0, scale_size.0);
        let y = rescale(point.y, crop_size.1, scale_size.1);
        if is_left {
            x = crop_size.0 as i32 - x;
        }
        (Point::new(x, y), if is_left { PageSide::Left } else { PageSide::Right })
    }

    /// Crop-space to full-scan-space: add the geometry `top` (when set) and
    /// the side's sensor offset.
    pub fn crop_to_full(&self, point: Point, side: PageSide) -> Point {
        Point::new(point.x, point.y + self.crop_origin(side) as i32)
    }

    /// Convert a drag gesture into a committed geometry triple.
    ///
    /// Both x coordinates are reflected about display center so drags on
    /// either page measure distance from the spine. The gesture is rejected
    /// when the vertical extent or the horizontal extent falls below the
    /// minimum drag size; prior geometry is left untouched in that case.
    pub fn commit_geometry(
        &mut self,
        drag_start: Point,
        drag_end: Point,
        display_width: u32,
        scale_size: (u32, u32),
        crop_size: (u32, u32),
        margin: i32,
    ) -> Result<Option<BookGeometry>> {
        let w2 = (display_width / 2) as i32;
        let down_x = (w2 - drag_start.x).abs() + w2;
        let up_x = (w2 - drag_end.x).abs() + w2;

        let vertical_extent = (drag_start.y - drag_end.y).abs();
        let horizontal_extent = down_x.max(up_x) - w2;
        if vertical_extent.min(horizontal_extent) < self.min_drag {
            debug!(vertical_extent, horizontal_extent, "drag below minimum, geometry unchanged");
            return Ok(None);
        }

        let side = (down_x.max(up_x) - w2 - margin).min(scale_size.0 as i32).max(0);
        let top = drag_start.y.min(drag_end.y);
        let bottom = drag_start.y.max(drag_end.y);

        let geometry = BookGeometry {
            top: rescale(top, crop_size.1, scale_size.1).max(0) as u32,
            bottom: rescale(bottom, crop_size.1, scale_size.1).max(0) as u32,
            side: rescale(side, crop_size.0, scale_size.0).max(0) as u32,
        };
        info!(
            top = geometry.top,
            bottom = geometry.bottom,
            side = geometry.side,
            "book geometry committed"
        );
        self.geometry = Some(geometry);
        self.write_record(&geometry)?;
        Ok(Some(geometry))
    }

    /// Drop the geometry and delete its persisted record.
    pub fn clear_geometry(&mut self) -> Result<()> {
        if self.geometry.take().is_some() {
            match std::fs::remove_file(&self.record_path) {
                Ok(()) => info!("book geometry cleared"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    // ============================================================
    // Persistence
    // ============================================================

    fn read_record(&self) -> Result<Option<BookGeometry>> {
        let text = match std::fs::read_to_string(&self.record_path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        for line in text.lines() {
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            let fields: Vec<u32> = line
                .split(',')
                .map(|f| f.trim().parse::<u32>())
                .collect::<std::result::Result<_, _>>()
                .map_err(|_| GeometryError::MalformedRecord(line.to_string()))?;
            if fields.len() != 3 || fields[1] < fields[0] {
                return Err(GeometryError::MalformedRecord(line.to_string()));
            }
            return Ok(Some(BookGeometry {
                top: fields[0],
                bottom: fields[1],
                side: fields[2],
            }));
        }
        Err(GeometryError::MalformedRecord("no data line".to_string()))
    }

    fn write_record(&self, geometry: &BookGeometry) -> Result<()> {
        let body = format!(
            "{RECORD_HEADER}\n{},{},{}\n",
            geometry.top, geometry.bottom, geometry.side
        );
        std::fs::write(&self.record_path, body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(dir: &Path) -> GeometryEngine {
        GeometryEngine::load(dir, &Config::default()).unwrap()
    }

    const DISPLAY_W: u32 = 1600;
    const SCALE: (u32, u32) = (750, 1000);
    const CROP: (u32, u32) = (3000, 4000);
    const MARGIN: i32 = 16;

    #[test]
    fn test_crop_origin_uses_sensor_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let e = engine(dir.path());
        assert_eq!(e.crop_origin(PageSide::Left), 593);
        assert_eq!(e.crop_origin(PageSide::Right), 150);
    }

    #[test]
    fn test_crop_origin_adds_geometry_top() {
        let dir = tempfile::tempdir().unwrap();
        let mut e = engine(dir.path());
        e.commit_geometry(
            Point::new(120, 50),
            Point::new(780, 650),
            DISPLAY_W,
            SCALE,
            CROP,
            MARGIN,
        )
        .unwrap()
        .expect("drag commits");
        assert_eq!(e.crop_origin(PageSide::Left), 200 + 593);
        assert_eq!(e.crop_origin(PageSide::Right), 200 + 150);
    }

    #[test]
    fn test_drag_scenario_yields_deterministic_triple() {
        let dir = tempfile::tempdir().unwrap();
        let mut e = engine(dir.path());
        let g = e
            .commit_geometry(
                Point::new(120, 50),
                Point::new(780, 650),
                DISPLAY_W,
                SCALE,
                CROP,
                MARGIN,
            )
            .unwrap()
            .expect("drag commits");
        // Reflected xs: 1480 and 820; side = 1480 - 800 - 16 = 664 display px
        // = 664 * 3000 / 750 = 2656 crop px; top/bottom scale by 4000/1000.
        assert_eq!(g, BookGeometry { top: 200, bottom: 2600, side: 2656 });
    }

    #[test]
    fn test_small_drags_rejected_either_axis() {
        let dir = tempfile::tempdir().unwrap();
        let mut e = engine(dir.path());
        // Vertical extent below threshold.
        let g = e
            .commit_geometry(
                Point::new(100, 50),
                Point::new(700, 60),
                DISPLAY_W,
                SCALE,
                CROP,
                MARGIN,
            )
            .unwrap();
        assert!(g.is_none());
        // Horizontal extent below threshold: both points near center.
        let g = e
            .commit_geometry(
                Point::new(790, 50),
                Point::new(810, 650),
                DISPLAY_W,
                SCALE,
                CROP,
                MARGIN,
            )
            .unwrap();
        assert!(g.is_none());
        assert!(!e.is_set());
        assert!(!dir.path().join(GEOMETRY_RECORD).exists());
    }

    #[test]
    fn test_rejected_drag_preserves_prior_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let mut e = engine(dir.path());
        let committed = e
            .commit_geometry(
                Point::new(120, 50),
                Point::new(780, 650),
                DISPLAY_W,
                SCALE,
                CROP,
                MARGIN,
            )
            .unwrap()
            .unwrap();
        e.commit_geometry(
            Point::new(799, 10),
            Point::new(801, 15),
            DISPLAY_W,
            SCALE,
            CROP,
            MARGIN,
        )
        .unwrap();
        assert_eq!(e.geometry(), Some(&committed));
    }

    #[test]
    fn test_display_to_crop_right_side() {
        let dir = tempfile::tempdir().unwrap();
        let e = engine(dir.path());
        // Right image origin is at w2 + margin = 816.
        let (p, side) = e.display_to_crop(Point::new(916, 100), DISPLAY_W, SCALE, CROP, MARGIN);
        assert_eq!(side, PageSide::Right);
        assert_eq!(p, Point::new(100 * 3000 / 750, 100 * 4000 / 1000));
    }

    #[test]
    fn test_display_to_crop_left_side_is_mirrored() {
        let dir = tempfile::tempdir().unwrap();
        let e = engine(dir.path());
        // Left image origin is at w2 - margin - scale_w = 34.
        let (p, side) = e.display_to_crop(Point::new(134, 0), DISPLAY_W, SCALE, CROP, MARGIN);
        assert_eq!(side, PageSide::Left);
        assert_eq!(p.x, 3000 - 100 * 3000 / 750);
    }

    #[test]
    fn test_roundtrip_display_crop_full_within_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let mut e = engine(dir.path());
        for set_geometry in [false, true] {
            if set_geometry {
                e.commit_geometry(
                    Point::new(120, 50),
                    Point::new(780, 650),
                    DISPLAY_W,
                    SCALE,
                    CROP,
                    MARGIN,
                )
                .unwrap();
            }
            for click in [Point::new(900, 240), Point::new(300, 777)] {
                let (crop_pt, side) =
                    e.display_to_crop(click, DISPLAY_W, SCALE, CROP, MARGIN);
                let full = e.crop_to_full(crop_pt, side);
                // Invert: full -> crop -> display.
                let crop_back = Point::new(full.x, full.y - e.crop_origin(side) as i32);
                assert_eq!(crop_back, crop_pt);
                let w2 = (DISPLAY_W / 2) as i32;
                let x0 = match side {
                    PageSide::Left => w2 - MARGIN - SCALE.0 as i32,
                    PageSide::Right => w2 + MARGIN,
                };
                let x_unmirrored = match side {
                    PageSide::Left => CROP.0 as i32 - crop_back.x,
                    PageSide::Right => crop_back.x,
                };
                let display_x = x0 + rescale(x_unmirrored, SCALE.0, CROP.0);
                let display_y = rescale(crop_back.y, SCALE.1, CROP.1);
                // Truncation tolerance: one display pixel per scaled axis.
                let x_step = (CROP.0 / SCALE.0) as i32;
                let y_step = (CROP.1 / SCALE.1) as i32;
                assert!((display_x - click.x).abs() <= x_step.max(1));
                assert!((display_y - click.y).abs() <= y_step.max(1));
            }
        }
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut e = engine(dir.path());
            e.commit_geometry(
                Point::new(120, 50),
                Point::new(780, 650),
                DISPLAY_W,
                SCALE,
                CROP,
                MARGIN,
            )
            .unwrap();
        }
        let record = std::fs::read_to_string(dir.path().join(GEOMETRY_RECORD)).unwrap();
        assert_eq!(record, "#top,bottom,side\n200,2600,2656\n");

        let e = engine(dir.path());
        assert_eq!(e.geometry(), Some(&BookGeometry { top: 200, bottom: 2600, side: 2656 }));
    }

    #[test]
    fn test_clear_deletes_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut e = engine(dir.path());
        e.commit_geometry(
            Point::new(120, 50),
            Point::new(780, 650),
            DISPLAY_W,
            SCALE,
            CROP,
            MARGIN,
        )
        .unwrap();
        e.clear_geometry().unwrap();
        assert!(!e.is_set());
        assert!(!dir.path().join(GEOMETRY_RECORD).exists());
        // Clearing twice is fine.
        e.clear_geometry().unwrap();
    }

    #[test]
    fn test_malformed_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(GEOMETRY_RECORD), "#top,bottom,side\nnot,a,triple\n")
            .unwrap();
        assert!(matches!(
            GeometryEngine::load(dir.path(), &Config::default()),
            Err(GeometryError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_missing_record_is_valid_initial_state() {
        let dir = tempfile::tempdir().unwrap();
        let e = engine(dir.path());
        assert!(!e.is_set());
        assert_eq!(e.crop_height(), 3600);
    }
}
