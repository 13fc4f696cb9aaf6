//! Page rendering
//!
//! Builds display-scaled and crop-resolution images for page pairs, zoom
//! overlays, and the mosaic thumbnail grid. Depends only on the
//! [`RasterSurface`] seam, never on a display toolkit.

use crate::config::Config;
use crate::geometry::{GeometryEngine, PageSide, Point};
use crate::raster::RasterSurface;
use crate::scan::{Result, ScanStore};
use tracing::debug;

/// Two consecutive scans forming one left/right spread; `left` is odd
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePair {
    pub left: u32,
    pub right: u32,
}

impl PagePair {
    /// Pair starting at the given left-page id.
    pub fn starting_at(left: u32) -> Self {
        Self { left, right: left + 1 }
    }
}

/// Rendered spread: display-scaled images plus the crop-resolution images
/// they were derived from.
///
/// The scaled left image is mirrored for natural facing-page display; the
/// crop images keep the stored orientation.
pub struct Spread<R> {
    pub pair: PagePair,
    pub scaled_left: R,
    pub scaled_right: R,
    pub crop_left: R,
    pub crop_right: R,
}

impl<R: RasterSurface> Spread<R> {
    pub fn scale_size(&self) -> (u32, u32) {
        (self.scaled_left.width(), self.scaled_left.height())
    }

    pub fn crop_size(&self) -> (u32, u32) {
        (self.crop_left.width(), self.crop_left.height())
    }
}

/// One mosaic grid thumbnail
pub struct MosaicTile<R> {
    /// Scan id the tile was cut from
    pub scan_id: u32,
    /// Left-page id of the pair this tile navigates to
    pub pair_start: u32,
    /// Grid cell, column-major position (column, row)
    pub cell: (u32, u32),
    pub raster: R,
}

/// Mosaic grid layout parameters for one display size and current pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MosaicLayout {
    pub columns: u32,
    pub rows: u32,
    /// Tile size (width, height) in display pixels
    pub tile: (u32, u32),
    /// Number of scan ids covered by the visible window
    pub window: u32,
    /// First scan id of the visible window
    pub start: u32,
}

impl MosaicLayout {
    /// Compute the grid for a display size, positioning the window so the
    /// current pair sits at its end (vertically centered browsing feel).
    pub fn compute(config: &Config, display_size: (u32, u32), current_pair: u32) -> Self {
        let columns = config.mosaic_columns;
        let rows = config.mosaic_rows;
        let h = (display_size.1 / rows).max(1);
        let window = 2 * rows * columns;
        let start = (current_pair as i64 - window as i64 + 2).max(1) as u32;
        Self {
            columns,
            rows,
            tile: (2 * h, h),
            window,
            start,
        }
    }

    /// Pair start a click on the grid selects, if it lands on a cell.
    pub fn hit(&self, click: Point) -> Option<u32> {
        if click.x < 0 || click.y < 0 || click.x as u32 >= self.columns * self.tile.0 {
            return None;
        }
        let col = click.x as u32 / self.tile.0;
        let row = click.y as u32 / self.tile.1;
        Some(self.start + 2 * (self.columns * row + col))
    }
}

/// Builds spread, zoom, and mosaic images from scans plus geometry
pub struct PageRenderer<'a> {
    store: &'a ScanStore,
    geometry: &'a GeometryEngine,
    config: &'a Config,
}

impl<'a> PageRenderer<'a> {
    pub fn new(store: &'a ScanStore, geometry: &'a GeometryEngine, config: &'a Config) -> Self {
        Self { store, geometry, config }
    }

    /// Render one page pair: crop each scan to the book region (or the
    /// saddle-height working region before geometry exists), scale
    /// proportionally so the crop height fills `display_height`, and mirror
    /// the left scaled image.
    pub fn spread<R: RasterSurface>(&self, pair: PagePair, display_height: u32) -> Result<Spread<R>> {
        let (scaled_left, crop_left) = self.one_page::<R>(pair.left, PageSide::Left, display_height)?;
        let (scaled_right, crop_right) =
            self.one_page::<R>(pair.right, PageSide::Right, display_height)?;
        debug!(left = pair.left, right = pair.right, "rendered spread");
        Ok(Spread {
            pair,
            scaled_left,
            scaled_right,
            crop_left,
            crop_right,
        })
    }

    fn one_page<R: RasterSurface>(
        &self,
        id: u32,
        side: PageSide,
        display_height: u32,
    ) -> Result<(R, R)> {
        let scan = self.store.load(id)?;
        let full = R::from_pixels(scan.width, scan.height, scan.pixels());
        let origin_y = self.geometry.crop_origin(side);
        let (crop_w, crop_h) = match self.geometry.geometry() {
            Some(g) => g.crop_size(),
            None => (scan.width, self.geometry.saddle_height()),
        };
        let crop = full.crop(0, origin_y as i64, crop_w, crop_h);
        let scale_w =
            (crop.width() as u64 * display_height as u64 / crop.height().max(1) as u64) as u32;
        let mut scaled = crop.scale_to(scale_w.max(1), display_height);
        if side == PageSide::Left {
            scaled = scaled.mirror_h();
        }
        Ok((scaled, crop))
    }

    /// Extract the square zoom region under a display click.
    ///
    /// The square has half-width `half_width` and is clamped to the crop;
    /// left-side regions are re-mirrored so zoomed pixels read correctly.
    pub fn zoom_region<R: RasterSurface>(
        &self,
        click: Point,
        spread: &Spread<R>,
        half_width: u32,
        display_width: u32,
    ) -> (R, PageSide) {
        let margin = GeometryEngine::display_margin(display_width);
        let (coord, side) = self.geometry.display_to_crop(
            click,
            display_width,
            spread.scale_size(),
            spread.crop_size(),
            margin,
        );
        let crop = match side {
            PageSide::Left => &spread.crop_left,
            PageSide::Right => &spread.crop_right,
        };
        let region = crop.crop(
            coord.x as i64 - half_width as i64,
            coord.y as i64 - half_width as i64,
            2 * half_width,
            2 * half_width,
        );
        let region = match side {
            PageSide::Left => region.mirror_h(),
            PageSide::Right => region,
        };
        (region, side)
    }

    /// Build the mosaic thumbnail grid around a reference click.
    ///
    /// Each tile shows the same full-scan coordinate across consecutive
    /// pages of the clicked side, so page numbers line up in a grid. Stops
    /// at the first missing scan.
    pub fn mosaic<R: RasterSurface>(
        &self,
        reference_click: Point,
        spread: &Spread<R>,
        display_size: (u32, u32),
        current_pair: u32,
    ) -> Result<(MosaicLayout, Vec<MosaicTile<R>>)> {
        let margin = GeometryEngine::display_margin(display_size.0);
        let (crop_coord, side) = self.geometry.display_to_crop(
            reference_click,
            display_size.0,
            spread.scale_size(),
            spread.crop_size(),
            margin,
        );
        let full = self.geometry.crop_to_full(crop_coord, side);
        let layout = MosaicLayout::compute(self.config, display_size, current_pair);

        let mut start = layout.start;
        if side == PageSide::Right {
            start += 1;
        }

        let mut tiles = Vec::new();
        for id in (start..start + layout.window).step_by(2) {
            if !self.store.exists(id) {
                break;
            }
            let scan = self.store.load(id)?;
            let page = R::from_pixels(scan.width, scan.height, scan.pixels());
            let (tw, th) = layout.tile;
            let region = page.crop(
                full.x as i64 - 3 * tw as i64 / 2,
                full.y as i64 - 3 * th as i64 / 2,
                3 * tw,
                3 * th,
            );
            let mut tile = region.scale_to(tw, th);
            if side == PageSide::Left {
                tile = tile.mirror_h();
            }
            let index = (id - start) / 2;
            tiles.push(MosaicTile {
                scan_id: id,
                pair_start: if side == PageSide::Left { id } else { id - 1 },
                cell: (index % layout.columns, index / layout.columns),
                raster: tile,
            });
        }
        Ok((layout, tiles))
    }
}
