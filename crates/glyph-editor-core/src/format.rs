//! Inline formatting engine.
//!
//! Single entry point `apply_format` computing edit batches for symmetric
//! inline markers (toggle on re-apply), block-prefix markers (heading,
//! list, task, quote), horizontal rules, links, and the table/code-block
//! skeleton builders. Returns None to decline; the caller falls through
//! to default behavior.

use smol_str::SmolStr;

use crate::list::{self, MarkerKind};
use crate::text::TextBuffer;
use crate::types::{Selection, TextEdit};

/// A formatting command, as issued by the host's toolbar or keymap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormatAction {
    Bold,
    Italic,
    Strike,
    Code,
    /// Heading level 1-6.
    Heading(u8),
    BulletList,
    NumberedList,
    TaskList,
    Quote,
    HorizontalRule,
    Link,
    Table { rows: usize, cols: usize },
    CodeBlock { lang: SmolStr },
}

/// Result of a formatting command: edits against the snapshot the command
/// was computed from, plus the selection to restore afterwards (already in
/// post-edit offsets).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatOutcome {
    pub edits: Vec<TextEdit>,
    pub selection: Selection,
}

/// Compute the edits for a formatting command. Returns None when the
/// command does not apply (e.g. task-to-task conversion, quote on an
/// already quoted line).
pub fn apply_format<B: TextBuffer>(
    buf: &B,
    selection: Selection,
    action: &FormatAction,
) -> Option<FormatOutcome> {
    match action {
        FormatAction::Bold => toggle_inline(buf, selection, "**"),
        FormatAction::Italic => toggle_inline(buf, selection, "*"),
        FormatAction::Strike => toggle_inline(buf, selection, "~~"),
        FormatAction::Code => toggle_inline(buf, selection, "`"),
        FormatAction::Heading(level) => {
            let level = (*level).clamp(1, 6) as usize;
            let marker = "#".repeat(level) + " ";
            replace_block_prefix(buf, selection, &marker, BlockTarget::Heading)
        }
        FormatAction::BulletList => {
            replace_block_prefix(buf, selection, "- ", BlockTarget::Bullet)
        }
        FormatAction::NumberedList => {
            replace_block_prefix(buf, selection, "1. ", BlockTarget::Ordered)
        }
        FormatAction::TaskList => {
            replace_block_prefix(buf, selection, "- [ ] ", BlockTarget::Task)
        }
        FormatAction::Quote => quote(buf, selection),
        FormatAction::HorizontalRule => insert_block(buf, selection, "\n---", 4),
        FormatAction::Link => link(buf, selection),
        FormatAction::Table { rows, cols } => {
            let skeleton = table_skeleton(*rows, *cols);
            // Caret into the first cell.
            insert_block(buf, selection, &skeleton, 3)
        }
        FormatAction::CodeBlock { lang } => {
            let block = format!("\n```{lang}\n\n```");
            // Caret onto the empty line inside the fence.
            insert_block(buf, selection, &block, 5 + lang.chars().count())
        }
    }
}

// === Symmetric inline markers ===

fn toggle_inline<B: TextBuffer>(
    buf: &B,
    selection: Selection,
    marker: &str,
) -> Option<FormatOutcome> {
    let m = marker.chars().count();

    if selection.is_empty() {
        // Empty pair with the caret between the markers.
        let caret = selection.head;
        let mut pair = String::with_capacity(marker.len() * 2);
        pair.push_str(marker);
        pair.push_str(marker);
        return Some(FormatOutcome {
            edits: vec![TextEdit::insert_at(caret, pair)],
            selection: Selection::caret(caret + m),
        });
    }

    let start = selection.start();
    let end = selection.end();

    let wrapped = start >= m
        && buf.slice(start - m..start).as_deref() == Some(marker)
        && buf.slice(end..end + m).as_deref() == Some(marker);

    if wrapped {
        // Remove both marker instances, keep the inner text selected.
        Some(FormatOutcome {
            edits: vec![
                TextEdit::delete(start - m..start),
                TextEdit::delete(end..end + m),
            ],
            selection: Selection::new(start - m, end - m),
        })
    } else {
        // Wrap and re-select the inner text.
        Some(FormatOutcome {
            edits: vec![
                TextEdit::insert_at(start, marker),
                TextEdit::insert_at(end, marker),
            ],
            selection: Selection::new(start + m, end + m),
        })
    }
}

// === Block-prefix markers ===

#[derive(PartialEq)]
enum BlockTarget {
    Heading,
    Bullet,
    Ordered,
    Task,
}

/// The existing marker on a line: char length after the indent.
fn existing_prefix(line: &str, indent_chars: usize) -> (usize, Option<MarkerKind>) {
    if let Some(marker) = list::parse_marker(line) {
        return (marker.marker_chars(), Some(marker.kind));
    }
    let rest: String = line.chars().skip(indent_chars).collect();
    let hashes = rest.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&hashes) && rest.chars().nth(hashes) == Some(' ') {
        return (hashes + 1, None);
    }
    (0, None)
}

fn replace_block_prefix<B: TextBuffer>(
    buf: &B,
    selection: Selection,
    new_marker: &str,
    target: BlockTarget,
) -> Option<FormatOutcome> {
    let caret = selection.head;
    let line_start = buf.line_start_at(caret);
    let line_end = buf.line_end_at(caret);
    let line = buf.slice(line_start..line_end)?;

    let indent_chars = line.chars().take_while(|c| *c == ' ' || *c == '\t').count();
    let (existing_len, existing_kind) = existing_prefix(&line, indent_chars);

    // Converting a task item into a task item again is a no-op.
    if target == BlockTarget::Task && matches!(existing_kind, Some(MarkerKind::Task { .. })) {
        return None;
    }

    // Likewise when the line already carries exactly the requested marker;
    // dispatching would record an empty undo step and notify the host.
    let existing: String = line.chars().skip(indent_chars).take(existing_len).collect();
    if existing == new_marker {
        return None;
    }

    let marker_start = line_start + indent_chars;
    let edit = TextEdit::replace(marker_start..marker_start + existing_len, new_marker);
    let selection = selection.map_through(&edit);
    Some(FormatOutcome {
        edits: vec![edit],
        selection,
    })
}

fn quote<B: TextBuffer>(buf: &B, selection: Selection) -> Option<FormatOutcome> {
    let caret = selection.head;
    let line_start = buf.line_start_at(caret);
    let line_end = buf.line_end_at(caret);
    let line = buf.slice(line_start..line_end)?;

    let indent_chars = line.chars().take_while(|c| *c == ' ' || *c == '\t').count();
    if line.chars().nth(indent_chars) == Some('>') {
        return None;
    }

    let edit = TextEdit::insert_at(line_start + indent_chars, "> ");
    let selection = selection.map_through(&edit);
    Some(FormatOutcome {
        edits: vec![edit],
        selection,
    })
}

/// Insert a block of text after the current line, caret placed
/// `caret_into` chars into the insertion.
fn insert_block<B: TextBuffer>(
    buf: &B,
    selection: Selection,
    block: &str,
    caret_into: usize,
) -> Option<FormatOutcome> {
    let line_end = buf.line_end_at(selection.head);
    Some(FormatOutcome {
        edits: vec![TextEdit::insert_at(line_end, block)],
        selection: Selection::caret(line_end + caret_into.min(block.chars().count())),
    })
}

fn link<B: TextBuffer>(_buf: &B, selection: Selection) -> Option<FormatOutcome> {
    if selection.is_empty() {
        // `[]()` with the caret inside the brackets.
        let caret = selection.head;
        return Some(FormatOutcome {
            edits: vec![TextEdit::insert_at(caret, "[]()")],
            selection: Selection::caret(caret + 1),
        });
    }

    // `[selected]()` with the caret inside the parentheses.
    let start = selection.start();
    let end = selection.end();
    Some(FormatOutcome {
        edits: vec![
            TextEdit::insert_at(start, "["),
            TextEdit::insert_at(end, "]("),
            TextEdit::insert_at(end, ")"),
        ],
        selection: Selection::caret(end + 3),
    })
}

fn table_skeleton(rows: usize, cols: usize) -> String {
    let rows = rows.max(1);
    let cols = cols.max(1);

    let mut out = String::new();
    let cells = |out: &mut String, fill: &str| {
        out.push('\n');
        for _ in 0..cols {
            out.push('|');
            out.push_str(fill);
        }
        out.push('|');
    };

    cells(&mut out, "  ");
    cells(&mut out, " --- ");
    for _ in 1..rows {
        cells(&mut out, "  ");
    }
    out
}
