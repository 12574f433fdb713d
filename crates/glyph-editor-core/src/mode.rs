//! Mode controller: switching between source and live rendering.
//!
//! Switching modes relayouts the whole surface, which moves the scroll
//! position. The controller remembers the top line before the switch and
//! re-asserts it for a bounded number of host ticks afterwards, then
//! gives up rather than fight the user's own scrolling forever.

use tracing::debug;

use crate::platform::Viewport;
use crate::types::Mode;

/// Ticks we keep re-asserting the pre-switch scroll position.
const RESTORE_TICKS: u8 = 3;

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
struct ScrollRestore {
    line: usize,
    remaining: u8,
}

/// Owns the rendering mode and the scroll restoration that follows a
/// switch.
#[derive(Clone, Debug, Default)]
pub struct ModeController {
    mode: Mode,
    restore: Option<ScrollRestore>,
}

impl ModeController {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            restore: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switch modes. Returns whether anything changed; a same-mode call
    /// is a no-op and does not disturb scrolling.
    pub fn set_mode(&mut self, viewport: &mut dyn Viewport, mode: Mode) -> bool {
        if mode == self.mode {
            return false;
        }

        let line = viewport.top_line();
        debug!(?mode, top_line = line, "switching rendering mode");

        self.mode = mode;
        viewport.set_live_rendering(mode == Mode::Live);

        self.restore = Some(ScrollRestore {
            line,
            remaining: RESTORE_TICKS,
        });
        if viewport.scroll_to_line(line) {
            self.restore = None;
        }
        true
    }

    /// Host tick after a mode switch. Re-asserts the remembered scroll
    /// position until it sticks or the tick budget runs out. Returns
    /// whether restoration is still pending.
    pub fn tick(&mut self, viewport: &mut dyn Viewport) -> bool {
        let Some(mut restore) = self.restore else {
            return false;
        };

        if viewport.scroll_to_line(restore.line) || restore.remaining <= 1 {
            self.restore = None;
            return false;
        }

        restore.remaining -= 1;
        self.restore = Some(restore);
        true
    }
}
