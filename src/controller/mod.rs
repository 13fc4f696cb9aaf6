//! Interaction state machine
//!
//! Single-threaded event-driven controller: every piece of UI state is
//! mutated here, one event at a time. The display frontend sits behind the
//! [`DisplayPort`] trait and recognizer processes behind [`OcrJob`]; the
//! controller polls jobs on timer ticks and never blocks.
//!
//! Nothing in here terminates the process; failures of a single operation
//! are logged and the operation skipped, so a half-written scan or a
//! read-only directory degrades the session instead of ending it.

mod events;

pub use events::{Flow, InputEvent, Key, Mode, NavigationState, PointerButton};

use crate::biblio::{bibliography_banner, OfflineLookup};
use crate::config::Config;
use crate::export::{AssemblyReport, ExportPipeline, JobStatus, OcrJob};
use crate::geometry::{GeometryEngine, GeometryError, Point};
use crate::raster::{ImageRaster, RasterSurface};
use crate::render::{MosaicLayout, MosaicTile, PagePair, PageRenderer, Spread};
use crate::scan::ScanStore;
use crate::suppress::{SuppressError, SuppressionRegistry};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// The zoom overlay square spans this fraction of the display width
const ZOOM_WIDTH_DIVISOR: u32 = 3;

/// Page-up/down step outside the mosaic, in scan ids
const PAGE_STEP: i64 = 10;

const HELP_TEXT: &str = "\
arrows       step one page pair (pauses autoplay)
pgup/pgdn    step five pairs; scroll the mosaic window
home/end     first / last page pair
drag         define the book crop (primary button)
hold         zoom (secondary) / mosaic browser (tertiary)
del          toggle suppression of the current pair
u            undo the book crop
space, p     pause / resume autoplay
f            toggle fullscreen
e            assemble the searchable document
s            save a screenshot
h, ?         this help
q, esc       quit";

// ============================================================
// Error Types
// ============================================================

/// Session startup error types
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Suppress(#[from] SuppressError),
}

// ============================================================
// DisplayPort
// ============================================================

/// Status line content for the frontend's overlay text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub left: u32,
    pub right: u32,
    pub paused: bool,
    /// Recognizer jobs outstanding for the shown pair
    pub recognizing: bool,
    pub suppressed: bool,
    pub geometry_set: bool,
}

/// Display-side collaborator boundary.
///
/// Everything visual goes through here; the controller never touches a
/// window, surface, or audio device itself.
pub trait DisplayPort {
    fn size(&self) -> (u32, u32);
    fn set_fullscreen(&mut self, fullscreen: bool);
    fn present_spread(&mut self, spread: &Spread<ImageRaster>);
    fn present_drag_preview(&mut self, from: Point, to: Point);
    fn present_zoom(&mut self, region: &ImageRaster, at: Point);
    fn present_mosaic(&mut self, layout: &MosaicLayout, tiles: &[MosaicTile<ImageRaster>]);
    fn present_status(&mut self, status: &Status);
    fn show_help(&mut self, text: &str);
    fn save_screenshot(&mut self) -> std::io::Result<()>;
    /// Page-turn audio cue; silent by default.
    fn play_page_cue(&mut self) {}
}

// ============================================================
// InteractionController
// ============================================================

/// Drives one review session over a scan directory
pub struct InteractionController {
    config: Config,
    store: ScanStore,
    geometry: GeometryEngine,
    suppressions: SuppressionRegistry,
    export: ExportPipeline,
    nav: NavigationState,
    spread: Option<Spread<ImageRaster>>,
    jobs: Vec<OcrJob>,
    /// Jobs for pairs navigated away from, kept until reaped
    stale_jobs: Vec<OcrJob>,
    title: String,
    banner: String,
}

impl InteractionController {
    /// Open a session over a scan directory. The directory basename is the
    /// book's barcode and becomes the document title.
    pub fn new(dir: &Path, config: Config) -> Result<Self, ControllerError> {
        let geometry = GeometryEngine::load(dir, &config)?;
        let suppressions = SuppressionRegistry::load(dir)?;
        let export = ExportPipeline::new(dir, &config);
        let barcode = dir
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("book")
            .to_string();
        let banner = bibliography_banner(&OfflineLookup, &barcode);
        info!(dir = %dir.display(), title = %barcode, "session opened");
        Ok(Self {
            store: ScanStore::new(dir),
            config,
            geometry,
            suppressions,
            export,
            nav: NavigationState::new(),
            spread: None,
            jobs: Vec::new(),
            stale_jobs: Vec::new(),
            title: barcode,
            banner,
        })
    }

    pub fn pair_start(&self) -> u32 {
        self.nav.pair_start
    }

    pub fn geometry_set(&self) -> bool {
        self.geometry.is_set()
    }

    /// Recognizer jobs still running, for the shown pair or for pairs
    /// navigated away from.
    pub fn jobs_outstanding(&self) -> bool {
        !self.jobs.is_empty() || !self.stale_jobs.is_empty()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Startup splash: bibliography banner plus the key reference.
    pub fn splash(&self) -> String {
        format!("{}\n\n{}", self.banner, HELP_TEXT)
    }

    /// Assemble the searchable document from everything exported so far.
    pub fn assemble(
        &self,
        progress: impl FnMut(usize, usize),
    ) -> crate::export::Result<Option<AssemblyReport>> {
        self.export.assemble_document(
            self.geometry.geometry(),
            &self.suppressions,
            &self.title,
            progress,
        )
    }

    /// Feed one event through the state machine.
    pub fn handle_event(&mut self, event: InputEvent, display: &mut impl DisplayPort) -> Flow {
        match event {
            InputEvent::Tick => self.tick(display),
            InputEvent::Resize => self.show_pair(display),
            InputEvent::Key(key) => return self.handle_key(key, display),
            InputEvent::PointerDown { button, at } => self.pointer_down(button, at, display),
            InputEvent::PointerMove { at } => self.pointer_move(at, display),
            InputEvent::PointerUp { button, at } => self.pointer_up(button, at, display),
            InputEvent::Quit => return Flow::Exit,
        }
        Flow::Continue
    }

    // ============================================================
    // Keyboard
    // ============================================================

    fn handle_key(&mut self, key: Key, display: &mut impl DisplayPort) -> Flow {
        match key {
            Key::Left | Key::Up => {
                self.nav.paused = true;
                self.step(-2, display);
            }
            Key::Right | Key::Down => {
                self.nav.paused = true;
                self.step(2, display);
            }
            Key::PageUp => self.page_step(-1, display),
            Key::PageDown => self.page_step(1, display),
            Key::Home => {
                self.nav.paused = true;
                self.goto(1, display);
            }
            Key::End => {
                self.nav.paused = true;
                if let Some(last) = self.store.last_pair_start() {
                    self.goto(last as i64, display);
                }
            }
            Key::Delete | Key::Backspace => {
                match self.suppressions.toggle(self.nav.pair_start) {
                    Ok(_) => self.present_status(display),
                    Err(e) => warn!(error = %e, "could not persist suppression"),
                }
            }
            Key::Space => {
                self.nav.paused = !self.nav.paused;
                self.present_status(display);
            }
            Key::Escape => return Flow::Exit,
            Key::Char(c) => return self.handle_char(c, display),
        }
        Flow::Continue
    }

    fn handle_char(&mut self, c: char, display: &mut impl DisplayPort) -> Flow {
        match c {
            'u' => match self.geometry.clear_geometry() {
                Ok(()) => self.show_pair(display),
                Err(e) => warn!(error = %e, "could not clear book geometry"),
            },
            'p' => {
                self.nav.paused = !self.nav.paused;
                self.present_status(display);
            }
            'f' => {
                self.nav.fullscreen = !self.nav.fullscreen;
                display.set_fullscreen(self.nav.fullscreen);
                self.show_pair(display);
            }
            'h' | '?' => display.show_help(&self.splash()),
            'e' => {
                if let Err(e) = self.assemble(|_, _| {}) {
                    warn!(error = %e, "document assembly failed");
                }
            }
            's' => {
                if let Err(e) = display.save_screenshot() {
                    warn!(error = %e, "screenshot failed");
                }
            }
            'q' => return Flow::Exit,
            _ => {}
        }
        Flow::Continue
    }

    // ============================================================
    // Pointer gestures
    // ============================================================

    fn pointer_down(&mut self, button: PointerButton, at: Point, display: &mut impl DisplayPort) {
        if self.nav.mode != Mode::Idle {
            return;
        }
        match button {
            PointerButton::Primary => {
                // The crop is defined once; later primary clicks are inert
                // until the operator clears it.
                if !self.geometry.is_set() {
                    self.nav.mode = Mode::DefiningGeometry { anchor: at, latest: at };
                    display.present_drag_preview(at, at);
                }
            }
            PointerButton::Secondary => {
                self.nav.mode = Mode::Zoomed;
                self.show_zoom(at, display);
            }
            PointerButton::Tertiary => {
                self.nav.mode = Mode::MosaicBrowsing { reference: at, window_shift: 0 };
                self.show_mosaic(at, 0, display);
            }
        }
    }

    fn pointer_move(&mut self, at: Point, display: &mut impl DisplayPort) {
        match self.nav.mode {
            Mode::DefiningGeometry { anchor, .. } => {
                self.nav.mode = Mode::DefiningGeometry { anchor, latest: at };
                display.present_drag_preview(anchor, at);
            }
            Mode::Zoomed => self.show_zoom(at, display),
            _ => {}
        }
    }

    fn pointer_up(&mut self, button: PointerButton, at: Point, display: &mut impl DisplayPort) {
        match (button, self.nav.mode) {
            (PointerButton::Primary, Mode::DefiningGeometry { anchor, .. }) => {
                self.nav.mode = Mode::Idle;
                self.finish_drag(anchor, at, display);
            }
            (PointerButton::Secondary, Mode::Zoomed) => {
                self.nav.mode = Mode::Idle;
                if let Some(spread) = &self.spread {
                    display.present_spread(spread);
                }
            }
            (PointerButton::Tertiary, Mode::MosaicBrowsing { window_shift, .. }) => {
                self.nav.mode = Mode::Idle;
                self.mosaic_select(at, window_shift, display);
            }
            _ => {}
        }
    }

    fn finish_drag(&mut self, anchor: Point, release: Point, display: &mut impl DisplayPort) {
        let (scale_size, crop_size) = match &self.spread {
            Some(s) => (s.scale_size(), s.crop_size()),
            None => return,
        };
        let (display_w, _) = display.size();
        let margin = GeometryEngine::display_margin(display_w);
        match self.geometry.commit_geometry(
            anchor,
            release,
            display_w,
            scale_size,
            crop_size,
            margin,
        ) {
            Ok(Some(_)) => self.show_pair(display),
            Ok(None) => {
                if let Some(spread) = &self.spread {
                    display.present_spread(spread);
                }
            }
            Err(e) => warn!(error = %e, "could not persist book geometry"),
        }
    }

    fn mosaic_select(&mut self, at: Point, window_shift: i64, display: &mut impl DisplayPort) {
        let layout =
            MosaicLayout::compute(&self.config, display.size(), self.mosaic_current(window_shift));
        match layout.hit(at) {
            Some(pair) if self.store.exists(pair) => {
                self.nav.pair_start = pair;
                self.show_pair(display);
            }
            _ => {
                if let Some(spread) = &self.spread {
                    display.present_spread(spread);
                }
            }
        }
    }

    // ============================================================
    // Timer and navigation
    // ============================================================

    fn tick(&mut self, display: &mut impl DisplayPort) {
        self.jobs.retain_mut(|job| job.poll() == JobStatus::Pending);
        self.stale_jobs.retain_mut(|job| job.poll() == JobStatus::Pending);
        if self.spread.is_none() {
            self.show_pair(display);
            return;
        }
        // Autoplay holds while a gesture is active, while paused, and while
        // the shown pair's recognizer jobs are still running.
        if self.nav.busy() || self.nav.paused || !self.jobs.is_empty() {
            return;
        }
        let next = self.store.clip_pair_start(self.nav.pair_start as i64 + 2);
        if next != self.nav.pair_start {
            self.nav.pair_start = next;
            self.show_pair(display);
        }
    }

    fn step(&mut self, delta: i64, display: &mut impl DisplayPort) {
        self.goto(self.nav.pair_start as i64 + delta, display);
    }

    fn page_step(&mut self, direction: i64, display: &mut impl DisplayPort) {
        if let Mode::MosaicBrowsing { reference, window_shift } = self.nav.mode {
            let shift = window_shift + direction;
            self.nav.mode = Mode::MosaicBrowsing { reference, window_shift: shift };
            self.show_mosaic(reference, shift, display);
        } else {
            self.nav.paused = true;
            self.step(direction * PAGE_STEP, display);
        }
    }

    fn goto(&mut self, target: i64, display: &mut impl DisplayPort) {
        let clipped = self.store.clip_pair_start(target);
        if clipped != self.nav.pair_start || self.spread.is_none() {
            self.nav.pair_start = clipped;
            self.show_pair(display);
        }
    }

    // ============================================================
    // Rendering
    // ============================================================

    /// Render, present, and export the current pair. A scan that cannot be
    /// read yet (observed mid-write) is retried on the next tick.
    fn show_pair(&mut self, display: &mut impl DisplayPort) {
        let (_, display_h) = display.size();
        let renderer = PageRenderer::new(&self.store, &self.geometry, &self.config);
        let pair = PagePair::starting_at(self.nav.pair_start);
        match renderer.spread::<ImageRaster>(pair, display_h) {
            Ok(spread) => {
                display.present_spread(&spread);
                display.play_page_cue();
                // Jobs for the pair navigated away from keep running; the
                // tick loop reaps them once their process exits.
                self.stale_jobs.append(&mut self.jobs);
                let left_crop = spread.crop_left.mirror_h();
                for (id, crop) in [(pair.left, &left_crop), (pair.right, &spread.crop_right)] {
                    // A page whose recognizer from an earlier visit is still
                    // running is left alone until that job is reaped.
                    if self.stale_jobs.iter().any(|job| job.id() == id) {
                        continue;
                    }
                    match self.export.export_page(id, crop, self.geometry.geometry()) {
                        Ok(job) => self.jobs.extend(job),
                        Err(e) => warn!(id, error = %e, "page export failed"),
                    }
                }
                self.spread = Some(spread);
                self.present_status(display);
            }
            Err(e) => {
                warn!(pair = pair.left, error = %e, "pair not readable, retrying next tick")
            }
        }
    }

    fn show_zoom(&self, at: Point, display: &mut impl DisplayPort) {
        let Some(spread) = &self.spread else { return };
        let renderer = PageRenderer::new(&self.store, &self.geometry, &self.config);
        let (display_w, _) = display.size();
        let half_width = display_w / ZOOM_WIDTH_DIVISOR / 2;
        let (region, _) = renderer.zoom_region(at, spread, half_width, display_w);
        display.present_zoom(&region, at);
    }

    fn show_mosaic(&self, reference: Point, window_shift: i64, display: &mut impl DisplayPort) {
        let Some(spread) = &self.spread else { return };
        let renderer = PageRenderer::new(&self.store, &self.geometry, &self.config);
        let current = self.mosaic_current(window_shift);
        match renderer.mosaic(reference, spread, display.size(), current) {
            Ok((layout, tiles)) => display.present_mosaic(&layout, &tiles),
            Err(e) => warn!(error = %e, "mosaic render failed"),
        }
    }

    fn mosaic_current(&self, window_shift: i64) -> u32 {
        let window = 2 * self.config.mosaic_rows * self.config.mosaic_columns;
        (self.nav.pair_start as i64 + window_shift * window as i64).max(1) as u32
    }

    fn present_status(&self, display: &mut impl DisplayPort) {
        display.present_status(&Status {
            left: self.nav.pair_start,
            right: self.nav.pair_start + 1,
            paused: self.nav.paused,
            recognizing: !self.jobs.is_empty(),
            suppressed: self.suppressions.contains(self.nav.pair_start),
            geometry_set: self.geometry.is_set(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // ============================================================
    // Test Display
    // ============================================================

    #[derive(Default)]
    struct RecordingDisplay {
        size: (u32, u32),
        fullscreen: bool,
        spreads: usize,
        drag_previews: usize,
        zooms: usize,
        zoom_sizes: Vec<(u32, u32)>,
        mosaics: usize,
        statuses: Vec<Status>,
        help: usize,
        screenshots: usize,
        cues: usize,
    }

    impl RecordingDisplay {
        fn new() -> Self {
            Self { size: (1600, 1000), ..Default::default() }
        }
    }

    impl DisplayPort for RecordingDisplay {
        fn size(&self) -> (u32, u32) {
            self.size
        }
        fn set_fullscreen(&mut self, fullscreen: bool) {
            self.fullscreen = fullscreen;
        }
        fn present_spread(&mut self, _spread: &Spread<ImageRaster>) {
            self.spreads += 1;
        }
        fn present_drag_preview(&mut self, _from: Point, _to: Point) {
            self.drag_previews += 1;
        }
        fn present_zoom(&mut self, region: &ImageRaster, _at: Point) {
            self.zooms += 1;
            self.zoom_sizes.push((region.width(), region.height()));
        }
        fn present_mosaic(
            &mut self,
            _layout: &MosaicLayout,
            _tiles: &[MosaicTile<ImageRaster>],
        ) {
            self.mosaics += 1;
        }
        fn present_status(&mut self, status: &Status) {
            self.statuses.push(status.clone());
        }
        fn show_help(&mut self, _text: &str) {
            self.help += 1;
        }
        fn save_screenshot(&mut self) -> std::io::Result<()> {
            self.screenshots += 1;
            Ok(())
        }
        fn play_page_cue(&mut self) {
            self.cues += 1;
        }
    }

    // ============================================================
    // Fixtures
    // ============================================================

    fn write_scan(dir: &Path, id: u32) {
        let (width, height) = (60u32, 4000u32);
        let mut f = std::fs::File::create(dir.join(format!("{id:06}.pnm"))).unwrap();
        write!(f, "P6\n{width} {height}\n255\n").unwrap();
        f.write_all(&vec![200u8; (width * height * 3) as usize]).unwrap();
    }

    fn session(count: u32) -> (tempfile::TempDir, InteractionController, RecordingDisplay) {
        let dir = tempfile::tempdir().unwrap();
        for id in 1..=count {
            write_scan(dir.path(), id);
        }
        let config = Config {
            recognizer: "scanview-test-no-such-recognizer".to_string(),
            ..Config::default()
        };
        let controller = InteractionController::new(dir.path(), config).unwrap();
        (dir, controller, RecordingDisplay::new())
    }

    /// Session whose recognizer is a script that outlives the test, so
    /// spawned jobs stay pending.
    fn slow_session(count: u32) -> (tempfile::TempDir, InteractionController, RecordingDisplay) {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        for id in 1..=count {
            write_scan(dir.path(), id);
        }
        let recognizer = dir.path().join("slow-recognizer");
        std::fs::write(&recognizer, "#!/bin/sh\nsleep 5\n").unwrap();
        std::fs::set_permissions(&recognizer, std::fs::Permissions::from_mode(0o755)).unwrap();
        let config = Config {
            recognizer: recognizer.to_str().unwrap().to_string(),
            ..Config::default()
        };
        let controller = InteractionController::new(dir.path(), config).unwrap();
        (dir, controller, RecordingDisplay::new())
    }

    fn drag(
        controller: &mut InteractionController,
        display: &mut RecordingDisplay,
        from: Point,
        to: Point,
    ) {
        controller.handle_event(
            InputEvent::PointerDown { button: PointerButton::Primary, at: from },
            display,
        );
        controller.handle_event(InputEvent::PointerMove { at: to }, display);
        controller.handle_event(
            InputEvent::PointerUp { button: PointerButton::Primary, at: to },
            display,
        );
    }

    // ============================================================
    // Tests
    // ============================================================

    #[test]
    fn test_first_tick_presents_first_pair() {
        let (_dir, mut c, mut d) = session(6);
        c.handle_event(InputEvent::Tick, &mut d);
        assert_eq!(c.pair_start(), 1);
        assert_eq!(d.spreads, 1);
        assert_eq!(d.cues, 1);
    }

    #[test]
    fn test_autoplay_advances_one_pair_per_tick() {
        let (_dir, mut c, mut d) = session(6);
        c.handle_event(InputEvent::Tick, &mut d);
        c.handle_event(InputEvent::Tick, &mut d);
        assert_eq!(c.pair_start(), 3);
        c.handle_event(InputEvent::Tick, &mut d);
        assert_eq!(c.pair_start(), 5);
        // Last pair: clipping holds it in place.
        c.handle_event(InputEvent::Tick, &mut d);
        assert_eq!(c.pair_start(), 5);
    }

    #[test]
    fn test_arrow_keys_step_and_pause() {
        let (_dir, mut c, mut d) = session(8);
        c.handle_event(InputEvent::Tick, &mut d);
        let flow = c.handle_event(InputEvent::Key(Key::Right), &mut d);
        assert_eq!(flow, Flow::Continue);
        assert_eq!(c.pair_start(), 3);

        c.handle_event(InputEvent::Tick, &mut d);
        assert_eq!(c.pair_start(), 3);

        c.handle_event(InputEvent::Key(Key::Left), &mut d);
        assert_eq!(c.pair_start(), 1);
    }

    #[test]
    fn test_home_and_end_jump() {
        let (_dir, mut c, mut d) = session(9);
        c.handle_event(InputEvent::Tick, &mut d);
        c.handle_event(InputEvent::Key(Key::End), &mut d);
        assert_eq!(c.pair_start(), 9);
        c.handle_event(InputEvent::Key(Key::Home), &mut d);
        assert_eq!(c.pair_start(), 1);
    }

    #[test]
    fn test_jump_keys_pause_autoplay() {
        let (_dir, mut c, mut d) = session(8);
        c.handle_event(InputEvent::Tick, &mut d);
        c.handle_event(InputEvent::Key(Key::Home), &mut d);
        c.handle_event(InputEvent::Tick, &mut d);
        assert_eq!(c.pair_start(), 1);

        c.handle_event(InputEvent::Key(Key::End), &mut d);
        assert_eq!(c.pair_start(), 7);
        c.handle_event(InputEvent::Key(Key::PageUp), &mut d);
        assert_eq!(c.pair_start(), 1);
        c.handle_event(InputEvent::Tick, &mut d);
        assert_eq!(c.pair_start(), 1);
    }

    #[test]
    fn test_space_toggles_pause() {
        let (_dir, mut c, mut d) = session(6);
        c.handle_event(InputEvent::Tick, &mut d);
        c.handle_event(InputEvent::Key(Key::Space), &mut d);
        c.handle_event(InputEvent::Tick, &mut d);
        assert_eq!(c.pair_start(), 1);
        assert!(d.statuses.last().unwrap().paused);

        c.handle_event(InputEvent::Key(Key::Char('p')), &mut d);
        c.handle_event(InputEvent::Tick, &mut d);
        assert_eq!(c.pair_start(), 3);
    }

    #[test]
    fn test_drag_commits_geometry_and_exports() {
        let (dir, mut c, mut d) = session(4);
        c.handle_event(InputEvent::Tick, &mut d);
        assert!(!c.geometry_set());

        drag(&mut c, &mut d, Point::new(120, 50), Point::new(780, 650));
        assert!(c.geometry_set());
        assert!(d.drag_previews >= 2);

        // The re-rendered pair was exported under the new stamp.
        let jpgs = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref().unwrap().path().extension().is_some_and(|x| x == "jpg")
            })
            .count();
        assert_eq!(jpgs, 2);
    }

    #[test]
    fn test_small_drag_leaves_geometry_unset() {
        let (_dir, mut c, mut d) = session(4);
        c.handle_event(InputEvent::Tick, &mut d);
        drag(&mut c, &mut d, Point::new(795, 50), Point::new(805, 60));
        assert!(!c.geometry_set());
    }

    #[test]
    fn test_uncrop_clears_geometry() {
        let (dir, mut c, mut d) = session(4);
        c.handle_event(InputEvent::Tick, &mut d);
        drag(&mut c, &mut d, Point::new(120, 50), Point::new(780, 650));
        assert!(c.geometry_set());

        c.handle_event(InputEvent::Key(Key::Char('u')), &mut d);
        assert!(!c.geometry_set());
        assert!(!dir.path().join("book_dimensions").exists());
    }

    #[test]
    fn test_primary_click_inert_once_geometry_set() {
        let (_dir, mut c, mut d) = session(4);
        c.handle_event(InputEvent::Tick, &mut d);
        drag(&mut c, &mut d, Point::new(120, 50), Point::new(780, 650));
        let before = d.drag_previews;

        c.handle_event(
            InputEvent::PointerDown { button: PointerButton::Primary, at: Point::new(100, 100) },
            &mut d,
        );
        assert_eq!(c.nav.mode, Mode::Idle);
        assert_eq!(d.drag_previews, before);
    }

    #[test]
    fn test_gesture_suppresses_autoplay() {
        let (_dir, mut c, mut d) = session(6);
        c.handle_event(InputEvent::Tick, &mut d);
        c.handle_event(
            InputEvent::PointerDown { button: PointerButton::Secondary, at: Point::new(900, 100) },
            &mut d,
        );
        assert_eq!(d.zooms, 1);
        c.handle_event(InputEvent::Tick, &mut d);
        assert_eq!(c.pair_start(), 1);

        c.handle_event(
            InputEvent::PointerUp { button: PointerButton::Secondary, at: Point::new(900, 100) },
            &mut d,
        );
        c.handle_event(InputEvent::Tick, &mut d);
        assert_eq!(c.pair_start(), 3);
    }

    #[test]
    fn test_zoom_square_tracks_display_width() {
        let (_dir, mut c, mut d) = session(2);
        c.handle_event(InputEvent::Tick, &mut d);
        c.handle_event(
            InputEvent::PointerDown { button: PointerButton::Secondary, at: Point::new(820, 500) },
            &mut d,
        );
        let (w, h) = *d.zoom_sizes.last().unwrap();
        // A third of the 1600px display, clamped to the 60px-wide crop.
        assert_eq!(h, 2 * (1600 / ZOOM_WIDTH_DIVISOR / 2));
        assert_eq!(w, 60);
    }

    #[test]
    fn test_navigation_keeps_polling_running_recognizers() {
        let (_dir, mut c, mut d) = slow_session(4);
        c.handle_event(InputEvent::Tick, &mut d);
        drag(&mut c, &mut d, Point::new(120, 50), Point::new(780, 650));
        assert_eq!(c.jobs.len(), 2);

        // Stepping away moves the running jobs to the reap list instead of
        // dropping their child handles.
        c.handle_event(InputEvent::Key(Key::Right), &mut d);
        assert_eq!(c.jobs.len(), 2);
        assert_eq!(c.stale_jobs.len(), 2);
        assert!(c.jobs_outstanding());

        // Returning does not start duplicate recognizers for pages whose
        // earlier jobs are still running.
        c.handle_event(InputEvent::Key(Key::Left), &mut d);
        assert!(c.jobs.is_empty());
        assert_eq!(c.stale_jobs.len(), 4);
    }

    #[test]
    fn test_mosaic_release_navigates_to_tile_pair() {
        let (_dir, mut c, mut d) = session(8);
        c.handle_event(InputEvent::Tick, &mut d);
        c.handle_event(
            InputEvent::PointerDown { button: PointerButton::Tertiary, at: Point::new(100, 100) },
            &mut d,
        );
        assert_eq!(d.mosaics, 1);
        // Tile (1, 0) is the second pair in the window.
        c.handle_event(
            InputEvent::PointerUp { button: PointerButton::Tertiary, at: Point::new(110, 10) },
            &mut d,
        );
        assert_eq!(c.pair_start(), 3);
    }

    #[test]
    fn test_mosaic_release_on_missing_pair_stays_put() {
        let (_dir, mut c, mut d) = session(4);
        c.handle_event(InputEvent::Tick, &mut d);
        c.handle_event(
            InputEvent::PointerDown { button: PointerButton::Tertiary, at: Point::new(100, 100) },
            &mut d,
        );
        // Column 9 maps to pair 19, which does not exist.
        c.handle_event(
            InputEvent::PointerUp { button: PointerButton::Tertiary, at: Point::new(910, 10) },
            &mut d,
        );
        assert_eq!(c.pair_start(), 1);
    }

    #[test]
    fn test_mosaic_page_keys_scroll_window() {
        let (_dir, mut c, mut d) = session(6);
        c.handle_event(InputEvent::Tick, &mut d);
        c.handle_event(
            InputEvent::PointerDown { button: PointerButton::Tertiary, at: Point::new(100, 100) },
            &mut d,
        );
        c.handle_event(InputEvent::Key(Key::PageDown), &mut d);
        assert_eq!(d.mosaics, 2);
        assert!(matches!(
            c.nav.mode,
            Mode::MosaicBrowsing { window_shift: 1, .. }
        ));
        assert_eq!(c.pair_start(), 1);
    }

    #[test]
    fn test_delete_toggles_suppression() {
        let (dir, mut c, mut d) = session(4);
        c.handle_event(InputEvent::Tick, &mut d);
        c.handle_event(InputEvent::Key(Key::Delete), &mut d);
        assert!(d.statuses.last().unwrap().suppressed);
        assert!(dir.path().join("suppressions").exists());

        c.handle_event(InputEvent::Key(Key::Backspace), &mut d);
        assert!(!d.statuses.last().unwrap().suppressed);
    }

    #[test]
    fn test_quit_keys_exit() {
        let (_dir, mut c, mut d) = session(2);
        assert_eq!(c.handle_event(InputEvent::Key(Key::Char('q')), &mut d), Flow::Exit);
        assert_eq!(c.handle_event(InputEvent::Key(Key::Escape), &mut d), Flow::Exit);
        assert_eq!(c.handle_event(InputEvent::Quit, &mut d), Flow::Exit);
    }

    #[test]
    fn test_fullscreen_toggle_rerenders() {
        let (_dir, mut c, mut d) = session(2);
        c.handle_event(InputEvent::Tick, &mut d);
        c.handle_event(InputEvent::Key(Key::Char('f')), &mut d);
        assert!(d.fullscreen);
        assert_eq!(d.spreads, 2);
    }

    #[test]
    fn test_help_and_screenshot_keys() {
        let (_dir, mut c, mut d) = session(2);
        c.handle_event(InputEvent::Key(Key::Char('h')), &mut d);
        c.handle_event(InputEvent::Key(Key::Char('?')), &mut d);
        c.handle_event(InputEvent::Key(Key::Char('s')), &mut d);
        assert_eq!(d.help, 2);
        assert_eq!(d.screenshots, 1);
    }

    #[test]
    fn test_splash_names_the_barcode() {
        let (dir, c, _d) = session(2);
        let barcode = dir.path().file_name().unwrap().to_str().unwrap();
        assert!(c.splash().contains(barcode));
        assert!(c.splash().contains("assemble"));
    }

    #[test]
    fn test_assemble_key_without_geometry_is_noop() {
        let (dir, mut c, mut d) = session(2);
        c.handle_event(InputEvent::Tick, &mut d);
        let flow = c.handle_event(InputEvent::Key(Key::Char('e')), &mut d);
        assert_eq!(flow, Flow::Continue);
        assert!(!dir.path().join("book.pdf").exists());
    }

    #[test]
    fn test_assemble_key_writes_document() {
        let (dir, mut c, mut d) = session(4);
        c.handle_event(InputEvent::Tick, &mut d);
        drag(&mut c, &mut d, Point::new(120, 50), Point::new(780, 650));
        // Export the second pair too.
        c.handle_event(InputEvent::Key(Key::Right), &mut d);

        c.handle_event(InputEvent::Key(Key::Char('e')), &mut d);
        let pdf = std::fs::read(dir.path().join("book.pdf")).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn test_no_jobs_without_recognizer() {
        let (_dir, mut c, mut d) = session(2);
        c.handle_event(InputEvent::Tick, &mut d);
        assert!(!c.jobs_outstanding());
    }
}
