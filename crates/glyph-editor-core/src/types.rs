//! Core editing types: selection, mode, text edits, and input results.
//!
//! All offsets in these types are character offsets (Unicode scalar
//! values), never bytes. Conversion to and from byte offsets happens at
//! the buffer boundary.

use std::ops::Range;

use smol_str::SmolStr;

/// Text selection with anchor and head positions.
///
/// The anchor is where the selection started, the head is where the caret
/// is now. They may be in any order - use `start()` and `end()` for
/// ordered bounds.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Where selection started
    pub anchor: usize,
    /// Where the caret is now
    pub head: usize,
}

impl Selection {
    /// Create a new selection.
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Create a collapsed selection (caret position).
    pub fn caret(offset: usize) -> Self {
        Self {
            anchor: offset,
            head: offset,
        }
    }

    /// Get the start (lower bound) of the selection.
    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Get the end (upper bound) of the selection.
    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Check if the selection is empty (caret only).
    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Get the selection length.
    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    /// Check if an offset is within the selection (end exclusive).
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start() && offset < self.end()
    }

    /// Convert to an ordered `Range<usize>`.
    pub fn to_range(&self) -> Range<usize> {
        self.start()..self.end()
    }

    /// Check if the selection is backwards (head before anchor).
    pub fn is_backwards(&self) -> bool {
        self.head < self.anchor
    }

    /// Remap both endpoints through an edit, preserving direction.
    pub fn map_through(&self, edit: &TextEdit) -> Self {
        Self {
            anchor: edit.map_offset(self.anchor),
            head: edit.map_offset(self.head),
        }
    }
}

/// Rendering regime for one editor instance.
///
/// `Source` shows raw markdown punctuation unmodified; `Live` hides and
/// reveals structural markers based on caret position. Changed only
/// through the mode controller.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Source,
    Live,
}

/// A single replace operation: delete `range`, insert `insert` there.
///
/// `range` is a half-open char range in the text the edit was computed
/// against. A pure insertion has an empty range; a pure deletion has an
/// empty `insert`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub insert: SmolStr,
}

impl TextEdit {
    /// Create a replace edit.
    pub fn replace(range: Range<usize>, insert: impl Into<SmolStr>) -> Self {
        Self {
            range,
            insert: insert.into(),
        }
    }

    /// Create a pure insertion at `offset`.
    pub fn insert_at(offset: usize, insert: impl Into<SmolStr>) -> Self {
        Self {
            range: offset..offset,
            insert: insert.into(),
        }
    }

    /// Create a pure deletion of `range`.
    pub fn delete(range: Range<usize>) -> Self {
        Self {
            range,
            insert: SmolStr::default(),
        }
    }

    /// Number of chars inserted.
    pub fn inserted_len(&self) -> usize {
        self.insert.chars().count()
    }

    /// Check whether applying this edit would change anything.
    pub fn is_noop(&self) -> bool {
        self.range.is_empty() && self.insert.is_empty()
    }

    /// Map a char offset from before this edit to after it.
    ///
    /// Offsets inside the replaced range collapse to the end of the
    /// inserted text, which keeps a caret adjacent to externally replaced
    /// content instead of stranding it past the document end.
    pub fn map_offset(&self, offset: usize) -> usize {
        if offset <= self.range.start {
            offset
        } else if offset >= self.range.end {
            offset - self.range.len() + self.inserted_len()
        } else {
            self.range.start + self.inserted_len()
        }
    }
}

/// Heading entry for document outlines, ordered by position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadingInfo {
    /// Heading level, 1-6.
    pub level: u8,
    /// Heading text with markers stripped.
    pub text: SmolStr,
    /// Zero-based line number.
    pub line: usize,
    /// Char offset of the heading start.
    pub offset: usize,
}

/// Result of offering an input event to the editing core.
///
/// `NotHandled` means the core declined and the host's default pipeline
/// should proceed.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum InputResult {
    Handled,
    NotHandled,
}

impl InputResult {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled)
    }
}
