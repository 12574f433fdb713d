//! Minimal diff between two full-text snapshots.
//!
//! Used to synchronize externally supplied document text without
//! destroying local selection or history more than necessary. This is a
//! single-range diff: longest common prefix, then longest common suffix
//! over the remaining region, one enclosing replace for whatever is left.
//! Multiple disjoint external edits collapse into one replacement, which
//! is acceptable because the resulting transaction is never undoable.

use crate::types::TextEdit;

/// Compute the minimal single-range edit transforming `previous` into
/// `next`. Returns `None` when the texts are identical.
///
/// Offsets in the returned edit are char offsets into `previous`.
pub fn diff(previous: &str, next: &str) -> Option<TextEdit> {
    let prev_len = previous.chars().count();
    let next_len = next.chars().count();

    // Longest common prefix, in chars.
    let mut prefix = 0usize;
    {
        let mut a = previous.chars();
        let mut b = next.chars();
        loop {
            match (a.next(), b.next()) {
                (Some(ca), Some(cb)) if ca == cb => prefix += 1,
                _ => break,
            }
        }
    }

    if prefix == prev_len && prefix == next_len {
        return None;
    }

    // Longest common suffix over the unmatched remainder. Never cross
    // back into the prefix.
    let max_suffix = (prev_len - prefix).min(next_len - prefix);
    let mut suffix = 0usize;
    {
        let mut a = previous.chars().rev();
        let mut b = next.chars().rev();
        while suffix < max_suffix {
            match (a.next(), b.next()) {
                (Some(ca), Some(cb)) if ca == cb => suffix += 1,
                _ => break,
            }
        }
    }

    let insert: String = next
        .chars()
        .skip(prefix)
        .take(next_len - suffix - prefix)
        .collect();

    Some(TextEdit::replace(prefix..prev_len - suffix, insert))
}

/// Apply an edit produced by [`diff`] to a string. Test and host helper;
/// the editor applies edits through its buffer instead.
pub fn apply(text: &str, edit: &TextEdit) -> String {
    let mut out = String::with_capacity(text.len() + edit.insert.len());
    out.extend(text.chars().take(edit.range.start));
    out.push_str(&edit.insert);
    out.extend(text.chars().skip(edit.range.end));
    out
}
