//! Undo/redo management for buffer edits.
//!
//! `UndoableBuffer<T>` wraps a `TextBuffer` and records every tracked
//! mutation on a bounded stack. Corrections the controller generates
//! itself (external text replacement, ordered-list renumbering) go through
//! `replace_untracked` so they never appear in history.

use std::ops::Range;

use smol_str::{SmolStr, ToSmolStr};

use crate::text::TextBuffer;

/// A recorded edit operation, invertible for undo.
#[derive(Debug, Clone)]
struct EditOperation {
    /// Char position where the edit occurred
    pos: usize,
    /// Text that was removed (empty for pure insertions)
    deleted: SmolStr,
    /// Text that was inserted (empty for pure deletions)
    inserted: SmolStr,
}

/// A `TextBuffer` wrapper that tracks edits and provides undo/redo.
pub struct UndoableBuffer<T> {
    buffer: T,
    undo_stack: Vec<EditOperation>,
    redo_stack: Vec<EditOperation>,
    max_steps: usize,
}

impl<T: Clone> Clone for UndoableBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
            undo_stack: self.undo_stack.clone(),
            redo_stack: self.redo_stack.clone(),
            max_steps: self.max_steps,
        }
    }
}

impl<T: TextBuffer + Default> Default for UndoableBuffer<T> {
    fn default() -> Self {
        Self::new(T::default(), 100)
    }
}

impl<T: TextBuffer> UndoableBuffer<T> {
    /// Create a new undoable buffer wrapping the given buffer.
    pub fn new(buffer: T, max_steps: usize) -> Self {
        Self {
            buffer,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps,
        }
    }

    /// Get a reference to the inner buffer.
    pub fn inner(&self) -> &T {
        &self.buffer
    }

    /// Replace a range without recording it in history.
    ///
    /// Positions of already-recorded operations are remapped through the
    /// edit so undo and redo stay valid against the new document. An
    /// operation whose own span overlaps the edit cannot be remapped
    /// faithfully; history is cleared instead of replaying stale text.
    pub fn replace_untracked(&mut self, char_range: Range<usize>, text: &str) {
        let inserted_chars = text.chars().count();
        if self.history_overlaps(&char_range) {
            self.clear_history();
        } else {
            for op in self
                .undo_stack
                .iter_mut()
                .chain(self.redo_stack.iter_mut())
            {
                if op.pos >= char_range.end {
                    op.pos = op.pos - char_range.len() + inserted_chars;
                }
            }
        }
        self.buffer.replace(char_range, text);
    }

    /// Whether any recorded operation's span intersects `range` in the
    /// current document.
    fn history_overlaps(&self, range: &Range<usize>) -> bool {
        self.undo_stack
            .iter()
            .chain(self.redo_stack.iter())
            .any(|op| {
                let len = op
                    .inserted
                    .chars()
                    .count()
                    .max(op.deleted.chars().count())
                    .max(1);
                op.pos < range.end && range.start < op.pos + len
            })
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Perform undo. Returns true if a recorded edit was reverted.
    pub fn undo(&mut self) -> bool {
        let Some(op) = self.undo_stack.pop() else {
            return false;
        };

        // Apply inverse: delete what was inserted, restore what was deleted.
        let inserted_chars = op.inserted.chars().count();
        if inserted_chars > 0 {
            self.buffer.delete(op.pos..op.pos + inserted_chars);
        }
        if !op.deleted.is_empty() {
            self.buffer.insert(op.pos, &op.deleted);
        }

        self.redo_stack.push(op);
        true
    }

    /// Perform redo. Returns true if an undone edit was re-applied.
    pub fn redo(&mut self) -> bool {
        let Some(op) = self.redo_stack.pop() else {
            return false;
        };

        let deleted_chars = op.deleted.chars().count();
        if deleted_chars > 0 {
            self.buffer.delete(op.pos..op.pos + deleted_chars);
        }
        if !op.inserted.is_empty() {
            self.buffer.insert(op.pos, &op.inserted);
        }

        self.undo_stack.push(op);
        true
    }

    /// Clear all history.
    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn record_op(&mut self, pos: usize, deleted: &str, inserted: &str) {
        // New edits invalidate the redo stack.
        self.redo_stack.clear();

        self.undo_stack.push(EditOperation {
            pos,
            deleted: deleted.to_smolstr(),
            inserted: inserted.to_smolstr(),
        });

        while self.undo_stack.len() > self.max_steps {
            self.undo_stack.remove(0);
        }
    }
}

impl<T: TextBuffer> TextBuffer for UndoableBuffer<T> {
    fn len_bytes(&self) -> usize {
        self.buffer.len_bytes()
    }

    fn len_chars(&self) -> usize {
        self.buffer.len_chars()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        self.record_op(char_offset, "", text);
        self.buffer.insert(char_offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        let deleted = self
            .buffer
            .slice(char_range.clone())
            .unwrap_or_default();
        self.record_op(char_range.start, &deleted, "");
        self.buffer.delete(char_range);
    }

    // Record replacements as one invertible operation so a user-level
    // replace undoes in a single step.
    fn replace(&mut self, char_range: Range<usize>, text: &str) {
        let deleted = self
            .buffer
            .slice(char_range.clone())
            .unwrap_or_default();
        self.record_op(char_range.start, &deleted, text);
        self.buffer.replace(char_range, text);
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        self.buffer.slice(char_range)
    }

    fn char_at(&self, char_offset: usize) -> Option<char> {
        self.buffer.char_at(char_offset)
    }

    fn to_string(&self) -> String {
        self.buffer.to_string()
    }

    fn char_to_byte(&self, char_offset: usize) -> usize {
        self.buffer.char_to_byte(char_offset)
    }

    fn byte_to_char(&self, byte_offset: usize) -> usize {
        self.buffer.byte_to_char(byte_offset)
    }

    fn line_of(&self, char_offset: usize) -> usize {
        self.buffer.line_of(char_offset)
    }

    fn line_start(&self, line: usize) -> usize {
        self.buffer.line_start(line)
    }

    fn line_count(&self) -> usize {
        self.buffer.line_count()
    }
}
