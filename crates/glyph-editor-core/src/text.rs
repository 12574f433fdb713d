//! Text buffer abstraction for document storage.
//!
//! The `TextBuffer` trait is the storage seam: editing operations, slicing
//! and line math in char offsets, with byte conversion for the parser
//! boundary. `RopeBuffer` is the ropey-backed implementation used for
//! local editing.

use std::ops::Range;

use smol_str::{SmolStr, ToSmolStr};

/// A text buffer that supports efficient editing and offset conversion.
///
/// All offsets are in Unicode scalar values (chars), not bytes.
pub trait TextBuffer {
    /// Total length in bytes (UTF-8).
    fn len_bytes(&self) -> usize;

    /// Total length in chars.
    fn len_chars(&self) -> usize;

    /// Check if empty.
    fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Insert text at char offset.
    fn insert(&mut self, char_offset: usize, text: &str);

    /// Delete char range.
    fn delete(&mut self, char_range: Range<usize>);

    /// Replace char range with text.
    fn replace(&mut self, char_range: Range<usize>, text: &str) {
        self.delete(char_range.clone());
        self.insert(char_range.start, text);
    }

    /// Get a slice as SmolStr. Returns None if the range is out of bounds.
    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr>;

    /// Get character at offset. Returns None if out of bounds.
    fn char_at(&self, char_offset: usize) -> Option<char>;

    /// Convert entire buffer to String.
    fn to_string(&self) -> String;

    /// Convert char offset to byte offset.
    fn char_to_byte(&self, char_offset: usize) -> usize;

    /// Convert byte offset to char offset.
    fn byte_to_char(&self, byte_offset: usize) -> usize;

    /// Zero-based line number containing the char offset.
    fn line_of(&self, char_offset: usize) -> usize;

    /// Char offset of the start of a zero-based line.
    fn line_start(&self, line: usize) -> usize;

    /// Number of lines in the buffer (at least 1).
    fn line_count(&self) -> usize;

    /// Char offset of the start of the line containing `char_offset`.
    fn line_start_at(&self, char_offset: usize) -> usize {
        self.line_start(self.line_of(char_offset))
    }

    /// Char offset of the end of the line containing `char_offset`
    /// (position of the line break, or end of buffer).
    fn line_end_at(&self, char_offset: usize) -> usize {
        let line = self.line_of(char_offset);
        if line + 1 >= self.line_count() {
            return self.len_chars();
        }
        // Line start of the next line minus the break, which is two
        // chars wide on CRLF documents.
        let brk = self.line_start(line + 1) - 1;
        if brk > 0 && self.char_at(brk - 1) == Some('\r') {
            brk - 1
        } else {
            brk
        }
    }
}

/// Ropey-backed text buffer.
///
/// Provides O(log n) editing operations and offset conversions.
#[derive(Clone, Default)]
pub struct RopeBuffer {
    rope: ropey::Rope,
}

impl RopeBuffer {
    /// Create a new empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from string content.
    pub fn from_str(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }

    /// Get a reference to the underlying rope.
    pub fn rope(&self) -> &ropey::Rope {
        &self.rope
    }
}

impl TextBuffer for RopeBuffer {
    fn len_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn insert(&mut self, char_offset: usize, text: &str) {
        self.rope.insert(char_offset, text);
    }

    fn delete(&mut self, char_range: Range<usize>) {
        self.rope.remove(char_range);
    }

    fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if char_range.end > self.len_chars() || char_range.start > char_range.end {
            return None;
        }
        Some(self.rope.slice(char_range).to_smolstr())
    }

    fn char_at(&self, char_offset: usize) -> Option<char> {
        if char_offset >= self.len_chars() {
            return None;
        }
        Some(self.rope.char(char_offset))
    }

    fn to_string(&self) -> String {
        self.rope.to_string()
    }

    fn char_to_byte(&self, char_offset: usize) -> usize {
        self.rope.char_to_byte(char_offset)
    }

    fn byte_to_char(&self, byte_offset: usize) -> usize {
        self.rope.byte_to_char(byte_offset)
    }

    fn line_of(&self, char_offset: usize) -> usize {
        self.rope.char_to_line(char_offset.min(self.rope.len_chars()))
    }

    fn line_start(&self, line: usize) -> usize {
        let line = line.min(self.rope.len_lines().saturating_sub(1));
        self.rope.line_to_char(line)
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }
}

impl From<&str> for RopeBuffer {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for RopeBuffer {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_operations() {
        let mut buf = RopeBuffer::from_str("hello world");
        assert_eq!(buf.len_chars(), 11);

        buf.insert(5, " beautiful");
        assert_eq!(buf.to_string(), "hello beautiful world");

        buf.delete(5..15);
        assert_eq!(buf.to_string(), "hello world");

        buf.replace(6..11, "rust");
        assert_eq!(buf.to_string(), "hello rust");
    }

    #[test]
    fn slice_and_char_at() {
        let buf = RopeBuffer::from_str("hello world");
        assert_eq!(buf.slice(0..5).as_deref(), Some("hello"));
        assert_eq!(buf.slice(0..100), None);
        assert_eq!(buf.char_at(0), Some('h'));
        assert_eq!(buf.char_at(11), None);
    }

    #[test]
    fn offset_conversion() {
        // Emoji is 4 bytes, 1 char.
        let buf = RopeBuffer::from_str("hi 🌍!");
        assert_eq!(buf.len_chars(), 5);
        assert_eq!(buf.char_to_byte(3), 3);
        assert_eq!(buf.char_to_byte(4), 7);
        assert_eq!(buf.byte_to_char(7), 4);
    }

    #[test]
    fn line_math() {
        let buf = RopeBuffer::from_str("one\ntwo\nthree");
        assert_eq!(buf.line_count(), 3);
        assert_eq!(buf.line_of(0), 0);
        assert_eq!(buf.line_of(4), 1);
        assert_eq!(buf.line_start(1), 4);
        assert_eq!(buf.line_start_at(6), 4);
        assert_eq!(buf.line_end_at(5), 7);
        assert_eq!(buf.line_end_at(9), 13);
    }

    #[test]
    fn line_end_on_last_line_without_newline() {
        let buf = RopeBuffer::from_str("abc");
        assert_eq!(buf.line_end_at(1), 3);
    }

    #[test]
    fn line_end_excludes_carriage_return() {
        let buf = RopeBuffer::from_str("one\r\ntwo\r\nthree");
        assert_eq!(buf.line_end_at(1), 3);
        assert_eq!(buf.line_end_at(5), 8);
        assert_eq!(buf.slice(buf.line_start_at(5)..buf.line_end_at(5)).as_deref(), Some("two"));
        assert_eq!(buf.line_end_at(12), 15);
    }
}
