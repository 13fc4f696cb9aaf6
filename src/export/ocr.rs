//! External text recognition
//!
//! One [`OcrJob`] wraps one recognizer process for one page. Jobs are never
//! awaited; the controller polls them on timer ticks. The recognizer's hOCR
//! output is parsed into positioned lines and words for the document text
//! layer.

use super::{ExportError, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::{debug, warn};

// ============================================================
// OcrJob
// ============================================================

/// Non-blocking completion state of a recognizer process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Done,
}

/// Handle to one running recognizer process
#[derive(Debug)]
pub struct OcrJob {
    id: u32,
    stem: PathBuf,
    child: Child,
}

impl OcrJob {
    /// Spawn the recognizer against one page raster. Spawn failure disables
    /// recognition for this page only and is not an error.
    pub fn spawn(recognizer: &Path, raster: &Path, stem: &Path, id: u32) -> Option<Self> {
        let result = Command::new(recognizer)
            .arg(raster)
            .arg(stem)
            .arg("hocr")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match result {
            Ok(child) => {
                debug!(id, stem = %stem.display(), "recognizer started");
                Some(Self { id, stem: stem.to_path_buf(), child })
            }
            Err(e) => {
                warn!(id, error = %e, "recognizer failed to start");
                None
            }
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Check whether the process has exited, without blocking.
    ///
    /// A failed status check is reported as still pending and retried on
    /// the next tick. On completion, recognizers that emit `.hocr` get
    /// their output renamed to the layout extension.
    pub fn poll(&mut self) -> JobStatus {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() {
                    warn!(id = self.id, %status, "recognizer exited with failure");
                }
                self.adopt_output();
                JobStatus::Done
            }
            Ok(None) => JobStatus::Pending,
            Err(e) => {
                warn!(id = self.id, error = %e, "recognizer status check failed");
                JobStatus::Pending
            }
        }
    }

    fn adopt_output(&self) {
        let hocr = self.stem.with_extension("hocr");
        let layout = self.stem.with_extension(super::LAYOUT_EXT);
        if hocr.exists() && !layout.exists() {
            if let Err(e) = std::fs::rename(&hocr, &layout) {
                warn!(id = self.id, error = %e, "could not adopt recognizer output");
            }
        }
    }
}

// ============================================================
// hOCR layout parsing
// ============================================================

/// Axis-aligned box in scan pixels, as reported by the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl BBox {
    pub fn width(&self) -> i32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i32 {
        self.y1 - self.y0
    }
}

/// One recognized word with its position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrWord {
    pub text: String,
    pub bbox: BBox,
}

/// One recognized text line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrLine {
    pub bbox: BBox,
    pub words: Vec<OcrWord>,
}

/// What one open `<span>` contributes, so its end tag closes exactly what
/// the start tag opened
enum SpanKind {
    Line,
    Word,
    Skipped,
}

/// Parse an hOCR document into positioned text lines.
///
/// Lines are `<span>` elements classed `ocr_line` (or the header/caption
/// variants); words are nested spans classed `ocrx_word` or `ocr_word`.
/// Elements without a parsable `bbox` in their `title` are skipped; a
/// document that is not well-formed XML is an error the caller downgrades
/// to "no text layer".
pub fn parse_hocr(text: &str) -> Result<Vec<OcrLine>> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut lines: Vec<OcrLine> = Vec::new();
    let mut current_line: Option<OcrLine> = None;
    let mut current_word: Option<OcrWord> = None;
    let mut spans: Vec<SpanKind> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"span" => {
                let mut class = None;
                let mut title = None;
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| ExportError::LayoutError(e.to_string()))?;
                    let value = attr
                        .unescape_value()
                        .map_err(|e| ExportError::LayoutError(e.to_string()))?
                        .into_owned();
                    match attr.key.as_ref() {
                        b"class" => class = Some(value),
                        b"title" => title = Some(value),
                        _ => {}
                    }
                }
                let bbox = title.as_deref().and_then(parse_bbox);
                let kind = match (class.as_deref(), bbox) {
                    (
                        Some("ocr_line" | "ocr_header" | "ocr_caption" | "ocr_textfloat"),
                        Some(bbox),
                    ) => {
                        if let Some(line) = current_line.take() {
                            lines.push(line);
                        }
                        current_line = Some(OcrLine { bbox, words: Vec::new() });
                        SpanKind::Line
                    }
                    (Some("ocrx_word" | "ocr_word"), Some(bbox)) => {
                        current_word = Some(OcrWord { text: String::new(), bbox });
                        SpanKind::Word
                    }
                    _ => SpanKind::Skipped,
                };
                spans.push(kind);
            }
            Ok(Event::Text(t)) => {
                if let Some(word) = current_word.as_mut() {
                    let piece = t
                        .unescape()
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned().into());
                    word.text.push_str(&piece);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"span" => match spans.pop() {
                Some(SpanKind::Word) => {
                    if let Some(mut word) = current_word.take() {
                        word.text = word.text.trim().to_string();
                        if !word.text.is_empty() {
                            if let Some(line) = current_line.as_mut() {
                                line.words.push(word);
                            }
                        }
                    }
                }
                Some(SpanKind::Line) => {
                    if let Some(line) = current_line.take() {
                        lines.push(line);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ExportError::LayoutError(e.to_string())),
        }
    }
    if let Some(line) = current_line.take() {
        lines.push(line);
    }
    Ok(lines)
}

/// Extract the `bbox x0 y0 x1 y1` field from an hOCR `title` attribute.
fn parse_bbox(title: &str) -> Option<BBox> {
    for part in title.split(';') {
        if let Some(rest) = part.trim().strip_prefix("bbox ") {
            let vals: Vec<i32> = rest
                .split_whitespace()
                .map_while(|v| v.parse().ok())
                .collect();
            if vals.len() == 4 {
                return Some(BBox { x0: vals[0], y0: vals[1], x1: vals[2], y1: vals[3] });
            }
        }
    }
    None
}
