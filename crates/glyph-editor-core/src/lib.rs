//! Platform-independent core of a live markdown editor.
//!
//! The crate is organized around one [`Editor`] instance per surface.
//! The editor owns a rope-backed buffer with undo history, a derived
//! structural view of the document ([`SyntaxTree`]), the selection, the
//! rendering mode, and the in-flight pointer gesture. Hosts feed it
//! input events and text synchronization, implement the [`Viewport`] and
//! [`PointerCapture`] traits for their surface, and receive committed
//! text through callbacks.
//!
//! The heavy lifting lives in pure modules the controller dispatches
//! into: [`diff`] for external synchronization, [`list`] for list
//! continuation and renumbering, [`format`] for formatting commands, and
//! [`interaction`] for pointer-level decisions.

pub mod diff;
pub mod editor;
pub mod format;
pub mod interaction;
pub mod list;
pub mod mode;
pub mod platform;
pub mod structure;
pub mod text;
pub mod types;
pub mod undo;

pub use editor::{Editor, EditorConfig};
pub use format::{FormatAction, FormatOutcome};
pub use interaction::{Modifiers, PointerInput, PointerTarget, SelectionOverlay};
pub use platform::{EditorError, Headless, Point, PointerCapture, Viewport};
pub use structure::{Bias, NodeKind, ParseBudget, StructuralNode, SyntaxTree};
pub use text::{RopeBuffer, TextBuffer};
pub use types::{HeadingInfo, InputResult, Mode, Selection, TextEdit};
pub use undo::UndoableBuffer;
