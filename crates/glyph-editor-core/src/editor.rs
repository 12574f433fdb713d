//! The editing controller: one instance per editor surface.
//!
//! Owns the buffer, history, structural tree, selection, mode, and the
//! in-flight pointer gesture, and dispatches input events into the pure
//! engines (`diff`, `list`, `format`, `interaction`). Every user
//! transaction runs through `commit`: apply edits, reparse, run the
//! ordered-list renumber pass, then notify the host exactly once.
//!
//! External text synchronization (`set_text`) and renumber corrections
//! bypass both undo history and host notification; the host already
//! knows about the former, and the latter is presented as part of the
//! user's own transaction.

use smol_str::SmolStr;
use tracing::debug;

use crate::diff;
use crate::format::{self, FormatAction};
use crate::interaction::{
    self, PendingGesture, PointerInput, PointerTarget, SelectionOverlay,
};
use crate::list;
use crate::mode::ModeController;
use crate::platform::{EditorError, PointerCapture, Viewport};
use crate::structure::{NodeKind, ParseBudget, SyntaxTree};
use crate::text::{RopeBuffer, TextBuffer};
use crate::types::{HeadingInfo, InputResult, Mode, Selection, TextEdit};
use crate::undo::UndoableBuffer;

/// Construction-time editor settings.
#[derive(Clone, Debug)]
pub struct EditorConfig {
    pub initial_text: String,
    pub mode: Mode,
    pub max_undo_steps: usize,
    pub parse_budget: ParseBudget,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            initial_text: String::new(),
            mode: Mode::Source,
            max_undo_steps: 100,
            parse_budget: ParseBudget::default(),
        }
    }
}

type TextCallback = Box<dyn FnMut(&str)>;
type OverlayCallback = Box<dyn FnMut(&SelectionOverlay)>;

/// Live markdown editing controller.
pub struct Editor<P: Viewport + PointerCapture> {
    buffer: UndoableBuffer<RopeBuffer>,
    tree: SyntaxTree,
    selection: Selection,
    mode: ModeController,
    platform: P,
    budget: ParseBudget,
    /// Document version, bumped once per transaction.
    version: u64,
    gesture: Option<PendingGesture>,
    /// Reentrancy guard around the renumber pass.
    renumbering: bool,
    /// Set while applying host-supplied text, so the change is never
    /// echoed back through `on_apply_changes`.
    applying_external: bool,
    destroyed: bool,
    on_apply_changes: Option<TextCallback>,
    on_open_link: Option<TextCallback>,
    on_selection_change: Option<OverlayCallback>,
}

impl<P: Viewport + PointerCapture> Editor<P> {
    pub fn new(config: EditorConfig, mut platform: P) -> Self {
        let tree = SyntaxTree::parse(&config.initial_text, config.parse_budget);
        let buffer = UndoableBuffer::new(
            RopeBuffer::from_str(&config.initial_text),
            config.max_undo_steps,
        );
        platform.set_live_rendering(config.mode == Mode::Live);

        Self {
            buffer,
            tree,
            selection: Selection::caret(0),
            mode: ModeController::new(config.mode),
            platform,
            budget: config.parse_budget,
            version: 0,
            gesture: None,
            renumbering: false,
            applying_external: false,
            destroyed: false,
            on_apply_changes: None,
            on_open_link: None,
            on_selection_change: None,
        }
    }

    // === Host wiring ===

    /// Called once per committed user transaction with the full new text.
    pub fn on_apply_changes(&mut self, f: impl FnMut(&str) + 'static) {
        self.on_apply_changes = Some(Box::new(f));
    }

    /// Called when a modifier-click activates a link, with its target.
    pub fn on_open_link(&mut self, f: impl FnMut(&str) + 'static) {
        self.on_open_link = Some(Box::new(f));
    }

    /// Called with selection overlay geometry on every selection change.
    pub fn on_selection_change(&mut self, f: impl FnMut(&SelectionOverlay) + 'static) {
        self.on_selection_change = Some(Box::new(f));
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Host animation tick. Drives pending scroll restoration after a
    /// mode switch; returns whether another tick is wanted.
    pub fn tick(&mut self) -> bool {
        self.mode.tick(&mut self.platform)
    }

    /// Tear down the instance: release any pointer grab and refuse all
    /// further mutation. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        if let Some(gesture) = self.gesture.take() {
            if gesture.captured {
                self.platform.release_capture(gesture.pointer_id);
            }
        }
        self.on_apply_changes = None;
        self.on_open_link = None;
        self.on_selection_change = None;
        self.destroyed = true;
    }

    fn guard(&self) -> Result<(), EditorError> {
        if self.destroyed {
            Err(EditorError::Destroyed)
        } else {
            Ok(())
        }
    }

    // === Document access ===

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = self.clamp_selection(selection);
        self.selection_changed();
    }

    pub fn select_all(&mut self) {
        self.selection = Selection::new(0, self.buffer.len_chars());
        self.selection_changed();
    }

    pub fn mode(&self) -> Mode {
        self.mode.mode()
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), EditorError> {
        self.guard()?;
        if self.mode.set_mode(&mut self.platform, mode) {
            // The new regime renders from a fresh tree.
            self.reparse();
        }
        Ok(())
    }

    pub fn has_focus(&self) -> bool {
        self.platform.has_focus()
    }

    pub fn focus(&mut self) {
        self.platform.focus();
    }

    pub fn scroll_to_line(&mut self, line: usize) -> Result<(), EditorError> {
        self.guard()?;
        self.platform.scroll_to_line(line);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.buffer.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.buffer.can_redo()
    }

    /// Document outline, in order.
    pub fn headings(&self) -> Vec<HeadingInfo> {
        self.tree
            .headings()
            .map(|node| {
                let level = match node.kind {
                    NodeKind::Heading(level) => level,
                    _ => unreachable!(),
                };
                let raw = self
                    .buffer
                    .slice(node.range.clone())
                    .unwrap_or_default();
                let text: SmolStr = raw
                    .trim_start_matches('#')
                    .trim_start()
                    .trim_end()
                    .into();
                HeadingInfo {
                    level,
                    text,
                    line: self.buffer.line_of(node.range.start),
                    offset: node.range.start,
                }
            })
            .collect()
    }

    /// Recompute the selection overlay report, notify the host, and
    /// return it.
    pub fn refresh_selection_overlay(&mut self) -> SelectionOverlay {
        let overlay = self.compute_overlay();
        if let Some(cb) = &mut self.on_selection_change {
            cb(&overlay);
        }
        overlay
    }

    fn compute_overlay(&self) -> SelectionOverlay {
        if self.destroyed
            || !interaction::overlay_allowed(&self.tree, &self.buffer, self.selection)
        {
            return SelectionOverlay::hidden();
        }
        // Without geometry for both endpoints the host has nothing to
        // position the overlay against.
        let (Some(start), Some(end)) = (
            self.platform.coords_at(self.selection.start()),
            self.platform.coords_at(self.selection.end()),
        ) else {
            return SelectionOverlay::hidden();
        };
        SelectionOverlay {
            visible: true,
            from: self.selection.start(),
            to: self.selection.end(),
            start: Some(start),
            end: Some(end),
        }
    }

    fn selection_changed(&mut self) {
        if self.on_selection_change.is_some() {
            self.refresh_selection_overlay();
        }
    }

    // === External synchronization ===

    /// Replace the document with host-supplied text. The selection is
    /// remapped through the minimal diff, and the change is never echoed
    /// back to the host. History survives where the diff leaves recorded
    /// edits intact; entries it invalidates are dropped.
    pub fn set_text(&mut self, text: &str) -> Result<(), EditorError> {
        self.guard()?;
        if self.applying_external {
            return Ok(());
        }
        self.applying_external = true;

        let current = self.buffer.to_string();
        if let Some(edit) = diff::diff(&current, text) {
            debug!(range = ?edit.range, inserted = edit.inserted_len(), "applying external text");
            self.buffer.replace_untracked(edit.range.clone(), &edit.insert);
            self.selection = self.clamp_selection(self.selection.map_through(&edit));
            self.version += 1;
            self.reparse();
            self.renumber_pass();
            self.selection_changed();
        }

        self.applying_external = false;
        Ok(())
    }

    // === Input handlers ===

    /// Enter: list continuation when the caret is at the end of a list
    /// item whose next line is a deeper item. Everything else falls
    /// through to the host's default newline handling.
    pub fn handle_enter(&mut self) -> InputResult {
        if self.destroyed {
            return InputResult::NotHandled;
        }
        let Some(insert) = list::continuation_on_enter(&self.buffer, self.selection) else {
            return InputResult::NotHandled;
        };
        let caret = self.selection.head + insert.chars().count();
        self.commit(
            vec![TextEdit::insert_at(self.selection.head, insert)],
            Selection::caret(caret),
        );
        InputResult::Handled
    }

    /// Shift-Enter: soft break inside table cells.
    pub fn handle_shift_enter(&mut self) -> InputResult {
        if self.destroyed {
            return InputResult::NotHandled;
        }
        let Some(edit) = interaction::soft_break_edit(&self.tree, self.selection) else {
            return InputResult::NotHandled;
        };
        let caret = edit.range.start + edit.inserted_len();
        self.commit(vec![edit], Selection::caret(caret));
        InputResult::Handled
    }

    /// Backspace: deletes a whole `<br>` tag before the caret inside
    /// table cells, so soft breaks never decay into stray angle brackets.
    pub fn handle_backspace(&mut self) -> InputResult {
        if self.destroyed || !self.selection.is_empty() {
            return InputResult::NotHandled;
        }
        let caret = self.selection.head;
        if !self
            .tree
            .has_enclosing(caret, |k| matches!(k, NodeKind::TableCell))
        {
            return InputResult::NotHandled;
        }
        let Some(edit) = interaction::backspace_over_soft_break(&self.buffer, caret) else {
            return InputResult::NotHandled;
        };
        let caret = edit.range.start;
        self.commit(vec![edit], Selection::caret(caret));
        InputResult::Handled
    }

    /// Tab: indent the list item under the caret by one unit.
    pub fn handle_tab(&mut self) -> InputResult {
        if self.destroyed {
            return InputResult::NotHandled;
        }
        let Some(edit) = list::indent_edit(&self.buffer, self.selection) else {
            return InputResult::NotHandled;
        };
        let selection = self.selection.map_through(&edit);
        self.commit(vec![edit], selection);
        InputResult::Handled
    }

    /// Shift-Tab: outdent the list item under the caret by one unit.
    pub fn handle_shift_tab(&mut self) -> InputResult {
        if self.destroyed {
            return InputResult::NotHandled;
        }
        let Some(edit) = list::outdent_edit(&self.buffer, self.selection) else {
            return InputResult::NotHandled;
        };
        let selection = self.selection.map_through(&edit);
        self.commit(vec![edit], selection);
        InputResult::Handled
    }

    /// Insert text over the current selection.
    pub fn insert_text(&mut self, text: &str) -> Result<(), EditorError> {
        self.guard()?;
        let range = self.selection.to_range();
        let edit = TextEdit::replace(range.clone(), text);
        let caret = range.start + edit.inserted_len();
        self.commit(vec![edit], Selection::caret(caret));
        Ok(())
    }

    /// Apply a formatting command at the current selection.
    pub fn insert_format(&mut self, action: &FormatAction) -> InputResult {
        if self.destroyed {
            return InputResult::NotHandled;
        }
        let Some(outcome) = format::apply_format(&self.buffer, self.selection, action) else {
            return InputResult::NotHandled;
        };
        self.commit(outcome.edits, outcome.selection);
        InputResult::Handled
    }

    pub fn undo(&mut self) -> bool {
        if self.destroyed || !self.buffer.undo() {
            return false;
        }
        self.after_history_step();
        true
    }

    pub fn redo(&mut self) -> bool {
        if self.destroyed || !self.buffer.redo() {
            return false;
        }
        self.after_history_step();
        true
    }

    fn after_history_step(&mut self) {
        self.version += 1;
        self.selection = self.clamp_selection(self.selection);
        self.reparse();
        self.renumber_pass();
        self.notify();
        self.selection_changed();
    }

    // === Pointer gestures ===

    pub fn pointer_down(&mut self, input: PointerInput) -> InputResult {
        if self.destroyed {
            return InputResult::NotHandled;
        }
        // A fresh press supersedes whatever gesture was in flight.
        if let Some(old) = self.gesture.take() {
            if old.captured {
                self.platform.release_capture(old.pointer_id);
            }
        }

        match &input.target {
            PointerTarget::Link { href }
                if self.mode() == Mode::Live && input.modifiers.is_primary_only() =>
            {
                debug!(href = href.as_str(), "opening link");
                let href = href.clone();
                if let Some(cb) = &mut self.on_open_link {
                    cb(&href);
                }
                return InputResult::Handled;
            }
            PointerTarget::Checkbox => {
                return self.toggle_checkbox(input.offset);
            }
            target if target.is_widget() => {
                // Widget owns the pointer; suppress caret movement until
                // the gesture finishes, and never capture.
                self.gesture = Some(PendingGesture {
                    pointer_id: input.pointer_id,
                    captured: false,
                    code_span: None,
                    on_widget: true,
                });
                return InputResult::Handled;
            }
            _ => {}
        }

        let caret = input.offset.min(self.buffer.len_chars());

        // Remember whether the press began inside an inline-code span;
        // the caret clamp resolves on pointer-up. Live mode only.
        let code_span = if self.mode() == Mode::Live {
            interaction::code_span_at(&self.tree, caret)
        } else {
            None
        };

        let captured =
            self.platform.supports_capture() && self.platform.set_capture(input.pointer_id);

        self.gesture = Some(PendingGesture {
            pointer_id: input.pointer_id,
            captured,
            code_span,
            on_widget: false,
        });
        self.selection = Selection::caret(caret);
        self.selection_changed();
        InputResult::Handled
    }

    /// Drag: extend the selection head.
    pub fn pointer_move(&mut self, pointer_id: i32, offset: usize) -> InputResult {
        let Some(gesture) = &self.gesture else {
            return InputResult::NotHandled;
        };
        if gesture.pointer_id != pointer_id || gesture.on_widget {
            return InputResult::NotHandled;
        }

        self.selection.head = offset.min(self.buffer.len_chars());
        self.selection_changed();
        InputResult::Handled
    }

    pub fn pointer_up(&mut self, pointer_id: i32) -> InputResult {
        let Some(gesture) = &self.gesture else {
            return InputResult::NotHandled;
        };
        if gesture.pointer_id != pointer_id {
            return InputResult::NotHandled;
        }
        let gesture = self.gesture.take().unwrap();
        if gesture.captured {
            self.platform.release_capture(gesture.pointer_id);
        }
        if !gesture.on_widget {
            self.finish_text_gesture(&gesture);
        }
        InputResult::Handled
    }

    /// Pointer cancellation or capture loss: drop the in-flight gesture
    /// and its grab without the caret corrections a completed gesture
    /// gets.
    pub fn pointer_cancel(&mut self, pointer_id: i32) -> InputResult {
        let Some(gesture) = &self.gesture else {
            return InputResult::NotHandled;
        };
        if gesture.pointer_id != pointer_id {
            return InputResult::NotHandled;
        }
        let gesture = self.gesture.take().unwrap();
        if gesture.captured {
            self.platform.release_capture(gesture.pointer_id);
        }
        InputResult::Handled
    }

    /// Caret corrections that resolve when a text gesture ends: keep the
    /// caret off inline-code fences when the press began and ended in the
    /// same span, and snap onto the far side of a horizontal rule in live
    /// mode. Both apply only to empty selections, and neither dispatches
    /// anything when the caret is already where it should be.
    fn finish_text_gesture(&mut self, gesture: &PendingGesture) {
        if !self.selection.is_empty() {
            return;
        }
        let caret = self.selection.head;

        if let Some(span) = &gesture.code_span {
            if caret >= span.start && caret <= span.end {
                if let Some(clamped) =
                    interaction::clamp_to_inline_code(&self.buffer, span, caret)
                {
                    if clamped != caret {
                        self.selection = Selection::caret(clamped);
                        self.selection_changed();
                    }
                    return;
                }
            }
        }

        if self.mode() == Mode::Live {
            if let Some(snapped) = interaction::rule_snap(&self.tree, caret) {
                let snapped = snapped.min(self.buffer.len_chars());
                if snapped != caret {
                    self.selection = Selection::caret(snapped);
                    self.selection_changed();
                }
            }
        }
    }

    /// Flip the task checkbox whose marker encloses `offset`.
    fn toggle_checkbox(&mut self, offset: usize) -> InputResult {
        let node = self
            .tree
            .nodes()
            .filter(|n| matches!(n.kind, NodeKind::TaskItem { .. }))
            .find(|n| offset >= n.range.start && offset < n.range.end)
            .cloned();
        let Some(node) = node else {
            return InputResult::NotHandled;
        };
        let NodeKind::TaskItem { checked } = node.kind else {
            return InputResult::NotHandled;
        };

        // State char sits inside the `[ ]` brackets: bullet, space, `[`.
        let line_start = self.buffer.line_start_at(node.range.start);
        let line_end = self.buffer.line_end_at(node.range.start);
        let Some(line) = self.buffer.slice(line_start..line_end) else {
            return InputResult::NotHandled;
        };
        let Some(marker) = list::parse_marker(&line) else {
            return InputResult::NotHandled;
        };
        let state_pos = line_start + marker.indent_chars() + 3;

        let replacement = if checked { " " } else { "x" };
        let selection = self.selection;
        self.commit(
            vec![TextEdit::replace(state_pos..state_pos + 1, replacement)],
            selection,
        );
        InputResult::Handled
    }

    // === Transactions ===

    /// Apply a user transaction: edits against the current snapshot, in
    /// any order, plus the selection to restore (post-edit coordinates).
    fn commit(&mut self, mut edits: Vec<TextEdit>, selection_after: Selection) {
        edits.retain(|e| !e.is_noop());
        if edits.is_empty() {
            self.selection = self.clamp_selection(selection_after);
            return;
        }

        edits.sort_by_key(|e| e.range.start);
        for edit in edits.iter().rev() {
            self.buffer.replace(edit.range.clone(), &edit.insert);
        }

        self.version += 1;
        self.selection = self.clamp_selection(selection_after);
        self.reparse();
        self.renumber_pass();
        self.notify();
        self.selection_changed();
    }

    fn reparse(&mut self) {
        self.tree = SyntaxTree::parse(&self.buffer.to_string(), self.budget);
    }

    /// Correct ordered-list numbering after a transaction. Corrections
    /// are not undoable and are folded into the enclosing notification.
    fn renumber_pass(&mut self) {
        if self.renumbering {
            return;
        }
        self.renumbering = true;

        let edits = list::renumber(&self.tree, &self.buffer);
        if !edits.is_empty() {
            debug!(count = edits.len(), "renumbering ordered lists");
            let mut sorted = edits;
            sorted.sort_by_key(|e| e.range.start);
            for edit in sorted.iter().rev() {
                self.buffer.replace_untracked(edit.range.clone(), &edit.insert);
            }
            self.selection = self.clamp_selection(map_through_batch(self.selection, &sorted));
            self.reparse();
        }

        self.renumbering = false;
    }

    fn notify(&mut self) {
        if self.applying_external {
            return;
        }
        if let Some(cb) = &mut self.on_apply_changes {
            let text = self.buffer.to_string();
            cb(&text);
        }
    }

    fn clamp_selection(&self, selection: Selection) -> Selection {
        let len = self.buffer.len_chars();
        Selection {
            anchor: selection.anchor.min(len),
            head: selection.head.min(len),
        }
    }
}

impl<P: Viewport + PointerCapture> Drop for Editor<P> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Remap a selection through a batch of disjoint edits sorted by start,
/// all expressed against the same pre-batch snapshot.
fn map_through_batch(selection: Selection, edits: &[TextEdit]) -> Selection {
    let map = |offset: usize| {
        let mut delta: isize = 0;
        for edit in edits {
            if edit.range.end <= offset {
                delta += edit.inserted_len() as isize - edit.range.len() as isize;
            } else if edit.range.start < offset {
                // Offset inside a replaced range: land after the insert.
                delta += (edit.range.start + edit.inserted_len()) as isize - offset as isize;
            }
        }
        offset.saturating_add_signed(delta)
    };
    Selection {
        anchor: map(selection.anchor),
        head: map(selection.head),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::interaction::Modifiers;
    use crate::platform::{Headless, Point};

    /// Surface that has not produced layout yet: no glyph geometry.
    #[derive(Default)]
    struct Unmeasured(Headless);

    impl Viewport for Unmeasured {
        fn top_line(&self) -> usize {
            self.0.top_line()
        }

        fn scroll_to_line(&mut self, line: usize) -> bool {
            self.0.scroll_to_line(line)
        }

        fn coords_at(&self, _char_offset: usize) -> Option<Point> {
            None
        }

        fn has_focus(&self) -> bool {
            self.0.has_focus()
        }

        fn focus(&mut self) {
            self.0.focus()
        }

        fn set_live_rendering(&mut self, live: bool) {
            self.0.set_live_rendering(live)
        }
    }

    impl PointerCapture for Unmeasured {
        fn supports_capture(&self) -> bool {
            self.0.supports_capture()
        }

        fn set_capture(&mut self, pointer_id: i32) -> bool {
            self.0.set_capture(pointer_id)
        }

        fn release_capture(&mut self, pointer_id: i32) {
            self.0.release_capture(pointer_id)
        }
    }

    fn make_editor(text: &str) -> Editor<Headless> {
        Editor::new(
            EditorConfig {
                initial_text: text.to_string(),
                ..Default::default()
            },
            Headless::default(),
        )
    }

    fn press(offset: usize) -> PointerInput {
        PointerInput {
            pointer_id: 1,
            offset,
            target: PointerTarget::Text,
            modifiers: Modifiers::default(),
        }
    }

    #[test]
    fn insert_text_notifies_once() {
        let mut editor = make_editor("hello");
        let seen: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = seen.clone();
        editor.on_apply_changes(move |text| sink.borrow_mut().push(text.to_string()));

        editor.set_selection(Selection::caret(5));
        editor.insert_text(" world").unwrap();

        assert_eq!(editor.text(), "hello world");
        assert_eq!(editor.selection(), Selection::caret(11));
        assert_eq!(seen.borrow().as_slice(), ["hello world"]);
    }

    #[test]
    fn enter_continues_nested_list() {
        let mut editor = make_editor("1. item\n   - sub\n");
        editor.set_selection(Selection::caret(7));

        assert!(editor.handle_enter().is_handled());
        assert_eq!(editor.text(), "1. item\n2. \n   - sub\n");
        assert_eq!(editor.selection(), Selection::caret(11));
    }

    #[test]
    fn enter_declines_without_deeper_next_line() {
        let mut editor = make_editor("- one\n- two\n");
        editor.set_selection(Selection::caret(5));
        assert!(!editor.handle_enter().is_handled());
        assert_eq!(editor.text(), "- one\n- two\n");
    }

    #[test]
    fn typing_into_list_renumbers_in_same_transaction() {
        let mut editor = make_editor("1. a\n2. b\n2. c\n");
        let seen: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = seen.clone();
        editor.on_apply_changes(move |text| sink.borrow_mut().push(text.to_string()));

        // Any user edit triggers the correction pass.
        editor.set_selection(Selection::caret(4));
        editor.insert_text("!").unwrap();

        assert_eq!(editor.text(), "1. a!\n2. b\n3. c\n");
        // One notification carrying the already-corrected text.
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0], "1. a!\n2. b\n3. c\n");
    }

    #[test]
    fn renumber_corrections_are_not_undoable() {
        let mut editor = make_editor("1. a\n2. b\n2. c\n");
        editor.set_selection(Selection::caret(4));
        editor.insert_text("!").unwrap();
        assert_eq!(editor.text(), "1. a!\n2. b\n3. c\n");

        // Undo reverts the typed char but never the correction.
        assert!(editor.undo());
        assert_eq!(editor.text(), "1. a\n2. b\n3. c\n");
        assert!(!editor.undo());
    }

    #[test]
    fn undo_survives_width_changing_renumber() {
        // Corrections here shorten the document ("10." becomes "1.");
        // the recorded insertion must follow the shift.
        let mut editor = make_editor("10. a\n10. b\n");
        editor.set_selection(Selection::caret(5));
        editor.insert_text("!").unwrap();
        assert_eq!(editor.text(), "1. a!\n2. b\n");

        assert!(editor.undo());
        assert_eq!(editor.text(), "1. a\n2. b\n");
        assert!(editor.redo());
        assert_eq!(editor.text(), "1. a!\n2. b\n");
    }

    #[test]
    fn set_text_skips_history_and_echo() {
        let mut editor = make_editor("alpha beta");
        let seen: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = seen.clone();
        editor.on_apply_changes(move |text| sink.borrow_mut().push(text.to_string()));

        editor.set_selection(Selection::caret(10));
        editor.set_text("alpha gamma beta").unwrap();

        assert_eq!(editor.text(), "alpha gamma beta");
        // Selection rode through the diffed insertion.
        assert_eq!(editor.selection(), Selection::caret(16));
        assert!(!editor.can_undo());
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn set_text_renumbers_lists() {
        let mut editor = make_editor("1. a\n2. b\n");
        editor.set_text("1. a\n9. b\n").unwrap();
        assert_eq!(editor.text(), "1. a\n2. b\n");
    }

    #[test]
    fn undo_after_shrinking_set_text_stays_in_bounds() {
        let mut editor = make_editor("hello world");
        editor.set_selection(Selection::caret(11));
        editor.insert_text("!").unwrap();
        assert!(editor.can_undo());

        editor.set_text("hi").unwrap();
        assert_eq!(editor.text(), "hi");
        // The recorded edit fell inside the replaced region, so it is
        // dropped rather than replayed against the shorter document.
        assert!(!editor.undo());
        assert_eq!(editor.text(), "hi");
    }

    #[test]
    fn undo_redo_roundtrip() {
        let mut editor = make_editor("abc");
        editor.set_selection(Selection::caret(3));
        editor.insert_text("def").unwrap();

        assert!(editor.undo());
        assert_eq!(editor.text(), "abc");
        assert!(editor.redo());
        assert_eq!(editor.text(), "abcdef");
    }

    #[test]
    fn format_bold_and_undo() {
        let mut editor = make_editor("say hi now");
        editor.set_selection(Selection::new(4, 6));

        assert!(editor.insert_format(&FormatAction::Bold).is_handled());
        assert_eq!(editor.text(), "say **hi** now");
        assert_eq!(editor.selection(), Selection::new(6, 8));
    }

    #[test]
    fn tab_indents_list_item() {
        let mut editor = make_editor("- one\n- two\n");
        editor.set_selection(Selection::caret(7));
        assert!(editor.handle_tab().is_handled());
        assert_eq!(editor.text(), "- one\n  - two\n");

        assert!(editor.handle_shift_tab().is_handled());
        assert_eq!(editor.text(), "- one\n- two\n");
    }

    #[test]
    fn shift_enter_soft_break_in_table() {
        let text = "| abc |\n| --- |\n| def |\n";
        let mut editor = make_editor(text);
        let caret = text.find("def").unwrap() + 3;
        editor.set_selection(Selection::caret(caret));

        assert!(editor.handle_shift_enter().is_handled());
        assert!(editor.text().contains("def<br>"));

        // Backspace removes the whole tag.
        assert!(editor.handle_backspace().is_handled());
        assert_eq!(editor.text(), text);
    }

    #[test]
    fn backspace_declines_outside_tables() {
        let mut editor = make_editor("plain<br>");
        editor.set_selection(Selection::caret(9));
        assert!(!editor.handle_backspace().is_handled());
    }

    #[test]
    fn pointer_gesture_captures_and_releases() {
        let mut editor = make_editor("some text here");
        assert!(editor.pointer_down(press(5)).is_handled());
        assert_eq!(editor.platform().captured, Some(1));
        assert_eq!(editor.selection(), Selection::caret(5));

        assert!(editor.pointer_move(1, 9).is_handled());
        assert_eq!(editor.selection(), Selection::new(5, 9));

        assert!(editor.pointer_up(1).is_handled());
        assert_eq!(editor.platform().captured, None);
        assert!(!editor.pointer_up(1).is_handled());
    }

    #[test]
    fn click_in_inline_code_clamps_on_release() {
        //                        0123456789
        let mut editor = make_editor("ab `code` cd");
        editor.set_mode(Mode::Live).unwrap();

        // Press on the opening fence: caret lands there, the clamp
        // resolves when the gesture ends.
        assert!(editor.pointer_down(press(3)).is_handled());
        assert_eq!(editor.selection(), Selection::caret(3));
        assert!(editor.pointer_up(1).is_handled());
        assert_eq!(editor.selection(), Selection::caret(4));

        // Same on the closing fence.
        editor.pointer_down(press(9));
        editor.pointer_up(1);
        assert_eq!(editor.selection(), Selection::caret(8));

        // A drag ending with a non-empty selection is left alone.
        editor.pointer_down(press(5));
        editor.pointer_move(1, 9);
        editor.pointer_up(1);
        assert_eq!(editor.selection(), Selection::new(5, 9));
    }

    #[test]
    fn pointer_cancel_drops_gesture_and_capture() {
        let mut editor = make_editor("ab `code` cd");
        editor.set_mode(Mode::Live).unwrap();

        editor.pointer_down(press(3));
        assert_eq!(editor.platform().captured, Some(1));

        assert!(!editor.pointer_cancel(2).is_handled());
        assert!(editor.pointer_cancel(1).is_handled());
        assert_eq!(editor.platform().captured, None);
        // The caret stays where the press put it; no fence clamp runs.
        assert_eq!(editor.selection(), Selection::caret(3));

        // The gesture is gone, so a later release for the same id does
        // not resurrect it.
        assert!(!editor.pointer_up(1).is_handled());
        assert_eq!(editor.selection(), Selection::caret(3));
    }

    #[test]
    fn inline_code_clamp_inactive_in_source_mode() {
        let mut editor = make_editor("ab `code` cd");
        editor.pointer_down(press(3));
        editor.pointer_up(1);
        assert_eq!(editor.selection(), Selection::caret(3));
    }

    #[test]
    fn release_on_rule_snaps_caret_in_live_mode() {
        let text = "before\n\n---\n\nafter\n";
        let mut editor = make_editor(text);
        editor.set_mode(Mode::Live).unwrap();

        let on_rule = text.find("---").unwrap() + 1;
        editor.pointer_down(press(on_rule));
        editor.pointer_up(1);
        assert!(editor.selection().head > on_rule + 1);
        assert!(editor.selection().is_empty());
    }

    #[test]
    fn modifier_click_opens_link_in_live_mode() {
        let mut editor = make_editor("[docs](https://docs.test)\n");
        let opened: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = opened.clone();
        editor.on_open_link(move |href| sink.borrow_mut().push(href.to_string()));
        editor.set_mode(Mode::Live).unwrap();

        let link = |modifiers| PointerInput {
            pointer_id: 1,
            offset: 2,
            target: PointerTarget::Link {
                href: "https://docs.test".into(),
            },
            modifiers,
        };

        // Plain click: caret placement, no activation.
        editor.pointer_down(link(Modifiers::default()));
        editor.pointer_up(1);
        assert!(opened.borrow().is_empty());

        editor.pointer_down(link(Modifiers {
            ctrl: true,
            ..Default::default()
        }));
        assert_eq!(opened.borrow().as_slice(), ["https://docs.test"]);

        // Extra modifiers never activate.
        editor.pointer_down(link(Modifiers {
            ctrl: true,
            shift: true,
            ..Default::default()
        }));
        editor.pointer_up(1);
        assert_eq!(opened.borrow().len(), 1);
    }

    #[test]
    fn modifier_click_inactive_in_source_mode() {
        let mut editor = make_editor("[docs](https://docs.test)\n");
        let opened: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = opened.clone();
        editor.on_open_link(move |href| sink.borrow_mut().push(href.to_string()));

        editor.pointer_down(PointerInput {
            pointer_id: 1,
            offset: 2,
            target: PointerTarget::Link {
                href: "https://docs.test".into(),
            },
            modifiers: Modifiers {
                ctrl: true,
                ..Default::default()
            },
        });
        assert!(opened.borrow().is_empty());
    }

    #[test]
    fn checkbox_click_toggles_state() {
        let mut editor = make_editor("- [ ] milk\n- [x] eggs\n");
        let toggle = |offset| PointerInput {
            pointer_id: 1,
            offset,
            target: PointerTarget::Checkbox,
            modifiers: Modifiers::default(),
        };

        assert!(editor.pointer_down(toggle(2)).is_handled());
        assert_eq!(editor.text(), "- [x] milk\n- [x] eggs\n");

        assert!(editor.pointer_down(toggle(14)).is_handled());
        assert_eq!(editor.text(), "- [x] milk\n- [ ] eggs\n");
    }

    #[test]
    fn widget_gesture_suppresses_caret_moves() {
        let mut editor = make_editor("| a |\n| --- |\n| b |\n");
        editor.set_selection(Selection::caret(2));

        editor.pointer_down(PointerInput {
            pointer_id: 1,
            offset: 10,
            target: PointerTarget::TableWidget,
            modifiers: Modifiers::default(),
        });
        assert!(!editor.pointer_move(1, 15).is_handled());
        assert_eq!(editor.selection(), Selection::caret(2));
        assert_eq!(editor.platform().captured, None);
        editor.pointer_up(1);
    }

    #[test]
    fn headings_outline() {
        let mut editor = make_editor("# One\n\ntext\n\n## Two\n");
        let outline = editor.headings();
        assert_eq!(outline.len(), 2);
        assert_eq!(outline[0].level, 1);
        assert_eq!(outline[0].text.as_str(), "One");
        assert_eq!(outline[0].line, 0);
        assert_eq!(outline[1].level, 2);
        assert_eq!(outline[1].text.as_str(), "Two");
        assert_eq!(outline[1].line, 4);

        editor.scroll_to_line(outline[1].line).unwrap();
        assert_eq!(editor.platform().top_line, 4);
    }

    #[test]
    fn overlay_refresh_gated_by_selection() {
        let mut editor = make_editor("plain words here\n");
        assert!(!editor.refresh_selection_overlay().visible);

        editor.set_selection(Selection::new(6, 11));
        let overlay = editor.refresh_selection_overlay();
        assert!(overlay.visible);
        assert_eq!((overlay.from, overlay.to), (6, 11));
        assert!(overlay.start.is_some() && overlay.end.is_some());

        let mut editor = make_editor("use `code` here\n");
        editor.set_selection(Selection::new(5, 9));
        assert!(!editor.refresh_selection_overlay().visible);
    }

    #[test]
    fn overlay_hidden_without_endpoint_geometry() {
        let mut editor = Editor::new(
            EditorConfig {
                initial_text: "plain words here\n".to_string(),
                ..Default::default()
            },
            Unmeasured::default(),
        );
        editor.set_selection(Selection::new(6, 11));

        let overlay = editor.refresh_selection_overlay();
        assert!(!overlay.visible);
        assert!(overlay.start.is_none() && overlay.end.is_none());
    }

    #[test]
    fn selection_change_callback_reports_overlay() {
        let mut editor = make_editor("plain words here\n");
        let reports: Rc<RefCell<Vec<bool>>> = Rc::default();
        let sink = reports.clone();
        editor.on_selection_change(move |overlay| sink.borrow_mut().push(overlay.visible));

        editor.set_selection(Selection::new(6, 11));
        editor.set_selection(Selection::caret(3));

        assert_eq!(reports.borrow().as_slice(), [true, false]);
    }

    #[test]
    fn select_all_and_clamping() {
        let mut editor = make_editor("abcde");
        editor.select_all();
        assert_eq!(editor.selection(), Selection::new(0, 5));

        editor.set_selection(Selection::caret(99));
        assert_eq!(editor.selection(), Selection::caret(5));
    }

    #[test]
    fn mode_switch_through_editor() {
        let mut editor = make_editor("text");
        assert_eq!(editor.mode(), Mode::Source);
        editor.set_mode(Mode::Live).unwrap();
        assert_eq!(editor.mode(), Mode::Live);
        assert!(editor.platform().live_rendering);
        assert!(!editor.tick());
    }

    #[test]
    fn destroy_releases_capture_and_blocks_mutation() {
        let mut editor = make_editor("text");
        editor.pointer_down(press(1));
        assert_eq!(editor.platform().captured, Some(1));

        editor.destroy();
        assert_eq!(editor.platform().captured, None);
        assert_eq!(editor.insert_text("x"), Err(EditorError::Destroyed));
        assert_eq!(editor.set_mode(Mode::Live), Err(EditorError::Destroyed));
        assert!(!editor.pointer_down(press(0)).is_handled());
        // Idempotent.
        editor.destroy();
    }

    #[test]
    fn version_bumps_per_transaction() {
        let mut editor = make_editor("a");
        assert_eq!(editor.version(), 0);
        editor.insert_text("b").unwrap();
        assert_eq!(editor.version(), 1);
        editor.set_text("zzz").unwrap();
        assert_eq!(editor.version(), 2);
        // No-op sync does not bump.
        editor.set_text("zzz").unwrap();
        assert_eq!(editor.version(), 2);
    }
}
