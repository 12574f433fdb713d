//! Host platform abstractions.
//!
//! The editing core never talks to a rendering surface directly. Hosts
//! implement `Viewport` for scrolling, focus, geometry, and rendering
//! regime, and `PointerCapture` for pointer grab semantics. A `Headless`
//! implementation backs tests and capture-less embeddings.

use thiserror::Error;

/// Errors surfaced across the host boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditorError {
    #[error("editor instance already destroyed")]
    Destroyed,
    #[error("char offset {offset} out of bounds (document length {len})")]
    OffsetOutOfBounds { offset: usize, len: usize },
}

/// A point in host viewport coordinates.
#[derive(Clone, Debug, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Scrolling, focus, geometry and rendering regime of the host surface.
pub trait Viewport {
    /// Zero-based line currently at the top of the viewport.
    fn top_line(&self) -> usize;

    /// Scroll so `line` is at the top. Returns whether the viewport
    /// actually landed there (layout may still be settling).
    fn scroll_to_line(&mut self, line: usize) -> bool;

    /// Viewport coordinates of the glyph at `char_offset`, or None when
    /// the offset is not currently laid out.
    fn coords_at(&self, char_offset: usize) -> Option<Point>;

    fn has_focus(&self) -> bool;

    fn focus(&mut self);

    /// Toggle live marker rendering on the surface.
    fn set_live_rendering(&mut self, live: bool);
}

/// Pointer grab semantics of the host surface.
pub trait PointerCapture {
    /// Whether the host supports pointer capture at all.
    fn supports_capture(&self) -> bool;

    /// Capture the pointer. Returns whether the grab took effect.
    fn set_capture(&mut self, pointer_id: i32) -> bool;

    /// Release a previously taken grab. Releasing an uncaptured pointer
    /// is a no-op.
    fn release_capture(&mut self, pointer_id: i32);
}

/// Platform stub for tests and embeddings with no real surface.
#[derive(Debug, Default)]
pub struct Headless {
    pub top_line: usize,
    pub focused: bool,
    pub live_rendering: bool,
    pub captured: Option<i32>,
}

impl Viewport for Headless {
    fn top_line(&self) -> usize {
        self.top_line
    }

    fn scroll_to_line(&mut self, line: usize) -> bool {
        self.top_line = line;
        true
    }

    fn coords_at(&self, char_offset: usize) -> Option<Point> {
        // One glyph per x unit, single line. Enough for geometry-free tests.
        Some(Point {
            x: char_offset as f64,
            y: 0.0,
        })
    }

    fn has_focus(&self) -> bool {
        self.focused
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn set_live_rendering(&mut self, live: bool) {
        self.live_rendering = live;
    }
}

impl PointerCapture for Headless {
    fn supports_capture(&self) -> bool {
        true
    }

    fn set_capture(&mut self, pointer_id: i32) -> bool {
        self.captured = Some(pointer_id);
        true
    }

    fn release_capture(&mut self, pointer_id: i32) {
        if self.captured == Some(pointer_id) {
            self.captured = None;
        }
    }
}
