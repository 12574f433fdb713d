//! Pointer interaction layer.
//!
//! Pure decision functions over a buffer snapshot and its structural
//! tree: inline-code caret clamping, horizontal-rule caret snapping,
//! modifier-click link activation, selection overlay gating, and table
//! soft breaks. The editing controller owns the gesture state machine and
//! calls in here; nothing in this module mutates.

use std::ops::Range;

use smol_str::SmolStr;

use crate::platform::Point;
use crate::structure::{Bias, NodeKind, SyntaxTree};
use crate::text::TextBuffer;
use crate::types::Selection;
use crate::types::TextEdit;

/// Keyboard modifier state attached to a pointer event.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Exactly one of Ctrl/Meta held, with no Alt or Shift. The chord
    /// that turns a click into link activation.
    pub fn is_primary_only(&self) -> bool {
        (self.ctrl ^ self.meta) && !self.alt && !self.shift
    }
}

/// What the host hit-tested under the pointer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PointerTarget {
    /// Plain document text.
    Text,
    /// A rendered task-list checkbox.
    Checkbox,
    /// A table manipulation widget (add/remove row or column).
    TableWidget,
    /// An image zoom control.
    ZoomControl,
    /// A rendered link with its resolved destination.
    Link { href: SmolStr },
}

impl PointerTarget {
    /// Widget targets own their pointer: the text gesture machinery must
    /// not capture or move the caret for them.
    pub fn is_widget(&self) -> bool {
        matches!(self, Self::Checkbox | Self::TableWidget | Self::ZoomControl)
    }
}

/// One pointer-down event, hit-tested by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PointerInput {
    pub pointer_id: i32,
    /// Char offset the host resolved from the pointer position.
    pub offset: usize,
    pub target: PointerTarget,
    pub modifiers: Modifiers,
}

/// State of the in-flight pointer gesture, from pointer-down to
/// pointer-up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingGesture {
    pub pointer_id: i32,
    /// Whether we hold a pointer grab that must be released on finish.
    pub captured: bool,
    /// Inline-code span the gesture began in; drag positions stay clamped
    /// to it for the whole gesture.
    pub code_span: Option<Range<usize>>,
    /// Gesture began on a widget; caret movement is suppressed.
    pub on_widget: bool,
}

/// Length of the backtick run at the start and end of an inline-code
/// span. Zero-length runs mean the span does not carry literal fences.
fn backtick_runs<B: TextBuffer>(buf: &B, span: &Range<usize>) -> (usize, usize) {
    let mut open = 0;
    while span.start + open < span.end && matches!(buf.char_at(span.start + open), Some('`')) {
        open += 1;
    }
    let mut close = 0;
    while span.end > close
        && span.end - close > span.start
        && matches!(buf.char_at(span.end - close - 1), Some('`'))
    {
        close += 1;
    }
    (open, close)
}

/// Clamp a requested caret position into the interior of an inline-code
/// span, keeping the caret off the backtick fences. Returns None when the
/// span has no measurable fences or no interior.
pub fn clamp_to_inline_code<B: TextBuffer>(
    buf: &B,
    span: &Range<usize>,
    requested: usize,
) -> Option<usize> {
    let (open, close) = backtick_runs(buf, span);
    if open == 0 || close == 0 {
        return None;
    }
    let min = span.start + open;
    let max = span.end - close;
    if min > max {
        return None;
    }
    Some(requested.clamp(min, max))
}

/// Inline-code span at `offset` suitable for gesture clamping, if any.
pub fn code_span_at(tree: &SyntaxTree, offset: usize) -> Option<Range<usize>> {
    tree.inline_code_at(offset).map(|n| n.range.clone())
}

/// Caret position for a pointer landing on a horizontal rule: the end of
/// the rule's range, so typing continues after the rule instead of inside
/// its marker text. Live mode only; source mode keeps raw positions.
pub fn rule_snap(tree: &SyntaxTree, offset: usize) -> Option<usize> {
    let node = tree.node_at(offset, Bias::Right)?;
    match node.kind {
        NodeKind::HorizontalRule => Some(node.range.end),
        _ => None,
    }
}

// === Selection overlay gating ===

/// Geometry report for the host's floating selection overlay.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SelectionOverlay {
    pub visible: bool,
    /// Ordered selection bounds, char offsets. Zero when hidden.
    pub from: usize,
    pub to: usize,
    /// Viewport coordinates of the endpoints, when laid out.
    pub start: Option<Point>,
    pub end: Option<Point>,
}

impl SelectionOverlay {
    pub fn hidden() -> Self {
        Self::default()
    }
}

fn overlay_denylisted(tree: &SyntaxTree, offset: usize) -> bool {
    if tree.has_enclosing(offset, |k| {
        matches!(
            k,
            NodeKind::FencedCode { .. }
                | NodeKind::IndentedCode
                | NodeKind::InlineCode
                | NodeKind::Autolink { .. }
                | NodeKind::HtmlBlock
                | NodeKind::InlineHtml
        )
    }) {
        return true;
    }

    // Inside a table but outside every cell: the delimiter row and pipe
    // scaffolding, where formatting would corrupt the table.
    let in_table = tree.has_enclosing(offset, |k| matches!(k, NodeKind::Table));
    let in_cell = tree.has_enclosing(offset, |k| matches!(k, NodeKind::TableCell));
    in_table && !in_cell
}

/// Whether the floating formatting overlay may be shown for `selection`.
///
/// Requires a non-empty, single-line selection with at least one
/// non-whitespace char, with neither endpoint inside a code span, code
/// block, autolink, raw HTML, or table scaffolding.
pub fn overlay_allowed<B: TextBuffer>(
    tree: &SyntaxTree,
    buf: &B,
    selection: Selection,
) -> bool {
    if selection.is_empty() {
        return false;
    }
    if buf.line_of(selection.start()) != buf.line_of(selection.end()) {
        return false;
    }
    let Some(text) = buf.slice(selection.to_range()) else {
        return false;
    };
    if text.chars().all(char::is_whitespace) {
        return false;
    }
    !overlay_denylisted(tree, selection.start()) && !overlay_denylisted(tree, selection.end())
}

// === Table soft breaks ===

const SOFT_BREAK: &str = "<br>";
/// Longest break-tag spelling we recognize when deleting backwards.
const SOFT_BREAK_SCAN: usize = 8;

/// Edit placing a soft line break over the selection, when the selection
/// sits inside one table cell. Outside tables the host's default
/// Shift-Enter applies.
pub fn soft_break_edit(tree: &SyntaxTree, selection: Selection) -> Option<TextEdit> {
    let in_cell =
        |offset: usize| tree.has_enclosing(offset, |k| matches!(k, NodeKind::TableCell));
    if !in_cell(selection.start()) || !in_cell(selection.end()) {
        return None;
    }
    Some(TextEdit::replace(selection.to_range(), SOFT_BREAK))
}

/// Edit deleting a break tag immediately before the caret, recognizing
/// `<br>`, `<br/>` and `<br />` in any case. Bounded backwards scan.
pub fn backspace_over_soft_break<B: TextBuffer>(
    buf: &B,
    caret: usize,
) -> Option<TextEdit> {
    let scan_start = caret.saturating_sub(SOFT_BREAK_SCAN);
    let window = buf.slice(scan_start..caret)?;
    let lower: String = window.chars().map(|c| c.to_ascii_lowercase()).collect();

    for tag in ["<br>", "<br/>", "<br />"] {
        if lower.ends_with(tag) {
            let len = tag.chars().count();
            return Some(TextEdit::delete(caret - len..caret));
        }
    }
    None
}
