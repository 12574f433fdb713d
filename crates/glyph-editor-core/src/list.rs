//! List editing engine: continuation markers, renumbering, indent/outdent.
//!
//! Everything here is a pure computation over a buffer snapshot (and, for
//! renumbering, the structural tree). The editing controller turns the
//! returned edits into transactions; this module never mutates.

use smol_str::{SmolStr, ToSmolStr, format_smolstr};

use crate::structure::SyntaxTree;
use crate::text::TextBuffer;
use crate::types::{Selection, TextEdit};

/// One indent/outdent step.
pub const INDENT_UNIT: &str = "  ";

/// Kind of list marker found at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// `- `, `* ` or `+ ` with the literal bullet char.
    Bullet(char),
    /// `1. ` or `1) ` with the literal number and delimiter.
    Ordered { number: u64, delim: char },
    /// `- [ ] ` / `- [x] ` with the bullet char and checked state.
    Task { bullet: char, checked: bool },
}

/// A recognized list marker on a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMarker {
    /// Literal leading whitespace of the line.
    pub indent: SmolStr,
    pub kind: MarkerKind,
}

impl LineMarker {
    /// Indentation width in chars.
    pub fn indent_chars(&self) -> usize {
        self.indent.chars().count()
    }

    /// Marker length in chars, including the trailing space, excluding
    /// indentation.
    pub fn marker_chars(&self) -> usize {
        match self.kind {
            MarkerKind::Bullet(_) => 2,
            MarkerKind::Ordered { number, .. } => count_digits(number) + 2,
            MarkerKind::Task { .. } => 6,
        }
    }

    /// Marker text that continues this item on the next line. Task items
    /// always continue unchecked; ordered items increment, preserving the
    /// delimiter.
    pub fn continuation(&self) -> SmolStr {
        match self.kind {
            MarkerKind::Bullet(c) => format_smolstr!("{c} "),
            MarkerKind::Ordered { number, delim } => {
                format_smolstr!("{}{delim} ", number + 1)
            }
            MarkerKind::Task { bullet, .. } => format_smolstr!("{bullet} [ ] "),
        }
    }
}

fn count_digits(mut n: u64) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// Parse the list marker of a single line, if any.
pub fn parse_marker(line: &str) -> Option<LineMarker> {
    let indent: String = line
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect();
    let rest = &line[indent.len()..];
    let mut chars = rest.chars();

    match chars.next()? {
        bullet @ ('-' | '*' | '+') => {
            if !rest[1..].starts_with(' ') {
                return None;
            }
            let after = &rest[2..];
            for (pat, checked) in [("[ ] ", false), ("[x] ", true), ("[X] ", true)] {
                if after.starts_with(pat) {
                    return Some(LineMarker {
                        indent: indent.to_smolstr(),
                        kind: MarkerKind::Task { bullet, checked },
                    });
                }
            }
            Some(LineMarker {
                indent: indent.to_smolstr(),
                kind: MarkerKind::Bullet(bullet),
            })
        }
        c if c.is_ascii_digit() => {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            let tail = &rest[digits.len()..];
            let delim = tail.chars().next().filter(|c| *c == '.' || *c == ')')?;
            if !tail[1..].starts_with(' ') {
                return None;
            }
            let number = digits.parse().ok()?;
            Some(LineMarker {
                indent: indent.to_smolstr(),
                kind: MarkerKind::Ordered { number, delim },
            })
        }
        _ => None,
    }
}

/// Compute the text to insert for list continuation on Enter.
///
/// Fires only when the caret is an empty selection at end-of-line and the
/// following line is a deeper-indented list item; in every other case the
/// default Enter behavior already covers continuation. Returns the full
/// insertion (`\n` + indent + marker), or None to decline.
pub fn continuation_on_enter<B: TextBuffer>(buf: &B, selection: Selection) -> Option<SmolStr> {
    if !selection.is_empty() {
        return None;
    }
    let caret = selection.head;
    if caret != buf.line_end_at(caret) {
        return None;
    }

    let line_start = buf.line_start_at(caret);
    let line = buf.slice(line_start..caret)?;
    let marker = parse_marker(&line)?;

    // Guard: only when the next line is a more deeply indented list item.
    let line_idx = buf.line_of(caret);
    if line_idx + 1 >= buf.line_count() {
        return None;
    }
    let next_start = buf.line_start(line_idx + 1);
    let next_end = buf.line_end_at(next_start);
    let next_line = buf.slice(next_start..next_end)?;
    let next_marker = parse_marker(&next_line)?;
    if next_marker.indent_chars() <= marker.indent_chars() {
        return None;
    }

    Some(format_smolstr!(
        "\n{}{}",
        marker.indent,
        marker.continuation()
    ))
}

/// Compute renumbering corrections for every ordered list in the tree.
///
/// Direct items of each list are expected to carry literal markers
/// `1, 2, 3, …`; each mismatch yields an edit covering just the digits.
/// Idempotent: a correctly numbered document produces no edits.
pub fn renumber<B: TextBuffer>(tree: &SyntaxTree, buf: &B) -> Vec<TextEdit> {
    let mut edits = Vec::new();

    for list_idx in tree.ordered_lists() {
        let mut expected: u64 = 1;
        for item in tree.direct_items(list_idx) {
            let digit_start = item.range.start;
            let mut digit_end = digit_start;
            while matches!(buf.char_at(digit_end), Some(c) if c.is_ascii_digit()) {
                digit_end += 1;
            }
            if digit_end == digit_start {
                // Marker text does not look like an ordered item; decline.
                expected += 1;
                continue;
            }

            let literal = buf.slice(digit_start..digit_end);
            let expected_text = expected.to_smolstr();
            if literal.as_deref() != Some(expected_text.as_str()) {
                edits.push(TextEdit::replace(digit_start..digit_end, expected_text));
            }
            expected += 1;
        }
    }

    edits
}

/// Whether `offset` sits inside the list marker region of its line
/// (indentation through the space after the marker, inclusive).
fn in_marker_region<B: TextBuffer>(buf: &B, offset: usize) -> Option<LineMarker> {
    let line_start = buf.line_start_at(offset);
    let line_end = buf.line_end_at(offset);
    let line = buf.slice(line_start..line_end)?;
    let marker = parse_marker(&line)?;
    let prefix = marker.indent_chars() + marker.marker_chars();
    (offset <= line_start + prefix).then_some(marker)
}

/// Edit that indents the list item under the selection by one unit.
pub fn indent_edit<B: TextBuffer>(buf: &B, selection: Selection) -> Option<TextEdit> {
    in_marker_region(buf, selection.head)?;
    let line_start = buf.line_start_at(selection.head);
    Some(TextEdit::insert_at(line_start, INDENT_UNIT))
}

/// Edit that outdents the list item under the selection by one unit.
/// Declines when fewer than two leading spaces are present, so the host's
/// default Shift-Tab applies.
pub fn outdent_edit<B: TextBuffer>(buf: &B, selection: Selection) -> Option<TextEdit> {
    let marker = in_marker_region(buf, selection.head)?;
    if !marker.indent.starts_with(INDENT_UNIT) {
        return None;
    }
    let line_start = buf.line_start_at(selection.head);
    Some(TextEdit::delete(line_start..line_start + INDENT_UNIT.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::ParseBudget;
    use crate::text::RopeBuffer;

    fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
        let mut out = text.to_string();
        let mut sorted: Vec<_> = edits.to_vec();
        sorted.sort_by_key(|e| e.range.start);
        for edit in sorted.iter().rev() {
            out = crate::diff::apply(&out, edit);
        }
        out
    }

    #[test]
    fn parse_markers() {
        assert_eq!(
            parse_marker("- item").unwrap().kind,
            MarkerKind::Bullet('-')
        );
        assert_eq!(
            parse_marker("  * item").unwrap().kind,
            MarkerKind::Bullet('*')
        );
        assert_eq!(
            parse_marker("3. item").unwrap().kind,
            MarkerKind::Ordered {
                number: 3,
                delim: '.'
            }
        );
        assert_eq!(
            parse_marker("12) item").unwrap().kind,
            MarkerKind::Ordered {
                number: 12,
                delim: ')'
            }
        );
        assert_eq!(
            parse_marker("- [ ] todo").unwrap().kind,
            MarkerKind::Task {
                bullet: '-',
                checked: false
            }
        );
        assert_eq!(
            parse_marker("- [x] done").unwrap().kind,
            MarkerKind::Task {
                bullet: '-',
                checked: true
            }
        );
        assert!(parse_marker("plain text").is_none());
        assert!(parse_marker("-no space").is_none());
        assert!(parse_marker("1.no space").is_none());
    }

    #[test]
    fn task_continues_unchecked() {
        let buf = RopeBuffer::from_str("- [x] buy milk\n  - [ ] sub\n");
        let caret = Selection::caret(14); // end of first line
        let cont = continuation_on_enter(&buf, caret).unwrap();
        assert_eq!(cont.as_str(), "\n- [ ] ");
    }

    #[test]
    fn ordered_continuation_increments() {
        let buf = RopeBuffer::from_str("3. item\n   - sub\n");
        let cont = continuation_on_enter(&buf, Selection::caret(7)).unwrap();
        assert_eq!(cont.as_str(), "\n4. ");
    }

    #[test]
    fn paren_delimiter_preserved() {
        let buf = RopeBuffer::from_str("2) item\n   - sub\n");
        let cont = continuation_on_enter(&buf, Selection::caret(7)).unwrap();
        assert_eq!(cont.as_str(), "\n3) ");
    }

    #[test]
    fn continuation_on_crlf_lines() {
        // End-of-line sits before the `\r`, and the line slices passed to
        // the marker parser carry no break chars.
        let buf = RopeBuffer::from_str("3. item\r\n   - sub\r\n");
        let cont = continuation_on_enter(&buf, Selection::caret(7)).unwrap();
        assert_eq!(cont.as_str(), "\n4. ");
    }

    #[test]
    fn declines_when_next_line_not_deeper() {
        // Same-depth next item: default Enter already continues the list.
        let buf = RopeBuffer::from_str("- one\n- two\n");
        assert!(continuation_on_enter(&buf, Selection::caret(5)).is_none());
    }

    #[test]
    fn declines_mid_line_or_with_selection() {
        let buf = RopeBuffer::from_str("- one\n  - two\n");
        assert!(continuation_on_enter(&buf, Selection::caret(3)).is_none());
        assert!(continuation_on_enter(&buf, Selection::new(2, 5)).is_none());
    }

    #[test]
    fn declines_on_unmarked_line() {
        let buf = RopeBuffer::from_str("plain\n  - two\n");
        assert!(continuation_on_enter(&buf, Selection::caret(5)).is_none());
    }

    #[test]
    fn indent_preserved_in_continuation() {
        let buf = RopeBuffer::from_str("  - one\n      - two\n");
        let cont = continuation_on_enter(&buf, Selection::caret(7)).unwrap();
        assert_eq!(cont.as_str(), "\n  - ");
    }

    #[test]
    fn renumber_corrects_in_one_batch() {
        let text = "1. a\n5. b\n5. c\n8. d\n";
        let buf = RopeBuffer::from_str(text);
        let tree = SyntaxTree::parse(text, ParseBudget::default());

        let edits = renumber(&tree, &buf);
        assert_eq!(edits.len(), 3);
        assert_eq!(apply_edits(text, &edits), "1. a\n2. b\n3. c\n4. d\n");
    }

    #[test]
    fn renumber_is_idempotent() {
        let text = "1. a\n2. b\n3. c\n";
        let buf = RopeBuffer::from_str(text);
        let tree = SyntaxTree::parse(text, ParseBudget::default());
        assert!(renumber(&tree, &buf).is_empty());
    }

    #[test]
    fn renumber_handles_multiple_lists_independently() {
        let text = "1. a\n3. b\n\npara\n\n7. x\n7. y\n";
        let buf = RopeBuffer::from_str(text);
        let tree = SyntaxTree::parse(text, ParseBudget::default());
        let edits = renumber(&tree, &buf);
        assert_eq!(
            apply_edits(text, &edits),
            "1. a\n2. b\n\npara\n\n1. x\n2. y\n"
        );
    }

    #[test]
    fn renumber_skips_nested_items_of_other_depth() {
        let text = "1. a\n   1. inner\n   3. inner\n2. b\n";
        let buf = RopeBuffer::from_str(text);
        let tree = SyntaxTree::parse(text, ParseBudget::default());
        let edits = renumber(&tree, &buf);
        // Only the nested "3." needs correcting.
        assert_eq!(apply_edits(text, &edits), "1. a\n   1. inner\n   2. inner\n2. b\n");
    }

    #[test]
    fn indent_adds_two_spaces() {
        let buf = RopeBuffer::from_str("- one\n- two\n");
        let edit = indent_edit(&buf, Selection::caret(1)).unwrap();
        assert_eq!(edit, TextEdit::insert_at(0, "  "));
    }

    #[test]
    fn indent_declines_outside_marker_region() {
        let buf = RopeBuffer::from_str("- one two three\n");
        assert!(indent_edit(&buf, Selection::caret(10)).is_none());
    }

    #[test]
    fn outdent_requires_two_spaces() {
        let shallow = RopeBuffer::from_str(" - one\n");
        assert!(outdent_edit(&shallow, Selection::caret(2)).is_none());

        let deep = RopeBuffer::from_str("  - one\n");
        let edit = outdent_edit(&deep, Selection::caret(3)).unwrap();
        assert_eq!(edit, TextEdit::delete(0..2));
    }
}
