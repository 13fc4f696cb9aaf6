//! Searchable document assembly
//!
//! Merges the exported page rasters with their recognition layouts into one
//! PDF: each kept page is the raster placed full-bleed, overlaid with
//! invisible text runs positioned and width-matched to the recognized
//! words. Built on `printpdf`'s data-oriented API: pages are op lists
//! serialized in one `save` call.

use super::{artifact_stems, layout_path, parse_artifact_id, parse_hocr, raster_path, Result};
use crate::geometry::BookGeometry;
use crate::suppress::SuppressionRegistry;
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, RawImage,
    RawImageData, RawImageFormat, TextItem, TextRenderingMode, XObjectTransform,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Assembled document file name, written into the scan directory
pub const OUTPUT_NAME: &str = "book.pdf";

/// Nominal size of invisible text runs; the horizontal scaling does the
/// actual width matching, so the value only affects glyph height
const TEXT_SIZE_PT: f32 = 8.0;

/// Fraction of a line's bounding-box height assumed to sit below the
/// baseline (descender heuristic)
const DESCENDER_FRACTION: f32 = 0.3;

/// Counters reported after an assembly run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Document pages emitted
    pub pages: usize,
    /// Invisible text runs written
    pub words: usize,
    /// Artifacts skipped because their pair is suppressed
    pub skipped: usize,
}

/// Builds the output document from a directory of exported artifacts
#[derive(Debug)]
pub struct DocumentAssembler {
    dir: PathBuf,
    scan_dpi: u32,
}

impl DocumentAssembler {
    pub fn new(dir: impl Into<PathBuf>, scan_dpi: u32) -> Self {
        Self { dir: dir.into(), scan_dpi }
    }

    /// Assemble `book.pdf` from every non-suppressed raster artifact.
    ///
    /// A page whose id or whose pair partner's id (id minus one) is
    /// suppressed is skipped. Pages with missing or unparsable layout data
    /// are emitted without a text layer. `progress` is called after each
    /// emitted page with (done, total kept).
    pub fn assemble(
        &self,
        geometry: &BookGeometry,
        suppressions: &SuppressionRegistry,
        title: &str,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<AssemblyReport> {
        let (page_w, page_h) = self.page_size(geometry);
        let page_h_pt = page_h.into_pt().0;

        let mut report = AssemblyReport::default();
        let stems: Vec<String> = artifact_stems(&self.dir)?
            .into_iter()
            .filter(|stem| {
                let id = parse_artifact_id(stem).unwrap_or(0);
                let kept = !suppressions.contains(id)
                    && !(id > 0 && suppressions.contains(id - 1));
                if !kept {
                    report.skipped += 1;
                }
                kept
            })
            .collect();

        let mut doc = PdfDocument::new(title);
        let mut pages = Vec::with_capacity(stems.len());
        for stem in &stems {
            let mut ops = self.raster_ops(&mut doc, stem)?;
            report.words += self.text_ops(stem, page_h_pt, &mut ops);
            pages.push(PdfPage::new(page_w, page_h, ops));
            report.pages += 1;
            progress(report.pages, stems.len());
        }
        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        std::fs::write(self.dir.join(OUTPUT_NAME), &bytes)?;
        info!(
            pages = report.pages,
            words = report.words,
            skipped = report.skipped,
            "document assembled"
        );
        Ok(report)
    }

    /// Document page size: the geometry crop at the scan resolution.
    fn page_size(&self, geometry: &BookGeometry) -> (Mm, Mm) {
        let (crop_w, crop_h) = geometry.crop_size();
        let px_to_mm = 25.4 / self.scan_dpi as f32;
        (Mm(crop_w as f32 * px_to_mm), Mm(crop_h as f32 * px_to_mm))
    }

    fn px_to_pt(&self, px: i32) -> f32 {
        px as f32 * 72.0 / self.scan_dpi as f32
    }

    /// Ops placing the page raster full-bleed at the page origin.
    fn raster_ops(&self, doc: &mut PdfDocument, stem: &str) -> Result<Vec<Op>> {
        let path = raster_path(&self.dir, stem);
        let image = image::open(&path)?.to_rgb8();
        let raw = RawImage {
            width: image.width() as usize,
            height: image.height() as usize,
            pixels: RawImageData::U8(image.into_raw()),
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let id = doc.add_image(&raw);
        Ok(vec![Op::UseXobject {
            id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(0.0)),
                scale_x: None,
                scale_y: None,
                dpi: Some(self.scan_dpi as f32),
                rotate: None,
            },
        }])
    }

    /// Append invisible text runs for the page's layout file, if it parses.
    /// Returns the number of runs written.
    fn text_ops(&self, stem: &str, page_h_pt: f32, ops: &mut Vec<Op>) -> usize {
        let path = layout_path(&self.dir, stem);
        let lines = match std::fs::read_to_string(&path).map(|t| parse_hocr(&t)) {
            Ok(Ok(lines)) => lines,
            Ok(Err(e)) => {
                debug!(stem, error = %e, "unparsable layout, page emitted without text");
                return 0;
            }
            Err(_) => return 0,
        };

        let mut words = 0;
        for line in &lines {
            let descender = DESCENDER_FRACTION * line.bbox.height() as f32;
            let baseline_pt = page_h_pt - self.px_to_pt(line.bbox.y1) + descender * 72.0
                / self.scan_dpi as f32;
            for word in &line.words {
                let left_pt = self.px_to_pt(word.bbox.x0);
                let right_pt = self.px_to_pt(word.bbox.x1);
                let natural_pt = natural_width_pt(&word.text, TEXT_SIZE_PT);
                if natural_pt <= 0.0 || right_pt <= left_pt {
                    continue;
                }
                ops.push(Op::StartTextSection);
                ops.push(Op::SetTextCursor {
                    pos: Point { x: Pt(left_pt), y: Pt(baseline_pt) },
                });
                ops.push(Op::SetFontSizeBuiltinFont {
                    size: Pt(TEXT_SIZE_PT),
                    font: BuiltinFont::Helvetica,
                });
                ops.push(Op::SetTextRenderingMode { mode: TextRenderingMode::Invisible });
                ops.push(Op::SetHorizontalScaling {
                    percent: 100.0 * (right_pt - left_pt) / natural_pt,
                });
                ops.push(Op::WriteTextBuiltinFont {
                    items: vec![TextItem::Text(word.text.clone())],
                    font: BuiltinFont::Helvetica,
                });
                ops.push(Op::EndTextSection);
                words += 1;
            }
        }
        words
    }
}

// ============================================================
// Helvetica metrics
// ============================================================

/// Width a text run would render at with no horizontal scaling, in points.
fn natural_width_pt(text: &str, size_pt: f32) -> f32 {
    let millis: f32 = text.chars().map(glyph_width_millis).sum();
    millis * size_pt / 1000.0
}

/// Helvetica advance width in thousandths of an em. Non-ASCII glyphs use
/// an average width; the horizontal scaling absorbs the inaccuracy.
fn glyph_width_millis(c: char) -> f32 {
    const WIDTHS: [u16; 95] = [
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
        278, 278, 584, 584, 584, 556, 1015, // :..@
        667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778,
        722, 667, 611, 722, 667, 944, 667, 667, 611, // A..Z
        278, 278, 278, 469, 556, 333, // [..`
        556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556,
        333, 500, 278, 556, 500, 722, 500, 500, 500, // a..z
        334, 260, 334, 584, // {..~
    ];
    let i = c as usize;
    if (32..=126).contains(&i) {
        WIDTHS[i - 32] as f32
    } else {
        556.0
    }
}
