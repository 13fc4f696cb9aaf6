//! Input event vocabulary
//!
//! Frontend-neutral events the controller consumes. A display frontend
//! translates its native events into these; tests feed them directly.

use crate::geometry::Point;

/// Pointer buttons by role rather than physical index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// Crop-defining drag
    Primary,
    /// Zoom overlay hold
    Secondary,
    /// Mosaic browser hold
    Tertiary,
}

/// Keys the controller reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    Delete,
    Backspace,
    Space,
    Escape,
    Char(char),
}

/// One event delivered to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    PointerDown { button: PointerButton, at: Point },
    PointerMove { at: Point },
    PointerUp { button: PointerButton, at: Point },
    Key(Key),
    /// Periodic autoplay timer
    Tick,
    /// Display surface size changed
    Resize,
    /// Window close requested by the environment
    Quit,
}

/// Whether the event loop should keep running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Modal interaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    /// Primary-button drag in progress; only reachable with no geometry set
    DefiningGeometry { anchor: Point, latest: Point },
    /// Secondary-button zoom overlay held open
    Zoomed,
    /// Tertiary-button mosaic held open; `window_shift` counts whole
    /// windows of page-pairs scrolled with page-up/down
    MosaicBrowsing { reference: Point, window_shift: i64 },
}

/// Navigation state orthogonal to the modal state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationState {
    /// Left page id of the pair on screen
    pub pair_start: u32,
    pub paused: bool,
    pub fullscreen: bool,
    pub mode: Mode,
}

impl NavigationState {
    pub fn new() -> Self {
        Self {
            pair_start: 1,
            paused: false,
            fullscreen: false,
            mode: Mode::Idle,
        }
    }

    /// A pointer gesture in progress suppresses autoplay entirely.
    pub fn busy(&self) -> bool {
        self.mode != Mode::Idle
    }
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new()
    }
}
