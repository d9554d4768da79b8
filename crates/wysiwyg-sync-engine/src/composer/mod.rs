//! # Composer capability
//!
//! The composer is the formatting engine that owns the document (text plus
//! inline and block formatting). The synchronization core only talks to it
//! through [`ComposerHandle`], so the engine can be swapped, mocked, or torn
//! down and re-provisioned after an internal failure.
//!
//! - **`update`**: [`ComposerUpdate`] and its three facets
//! - **`guard`**: [`PanicGuard`], turning panics inside an engine into
//!   panic-class [`ComposerError`]s
//! - **`model`**: [`RichTextComposer`], the in-memory formatting engine
//!
//! All offsets are UTF-16 code units in composer space.

use std::collections::HashMap;

pub mod guard;
pub mod model;
pub mod update;

pub use guard::PanicGuard;
pub use model::RichTextComposer;
pub use update::{ComposerUpdate, MenuAction, MenuState, PatternKey, SuggestionPattern, TextUpdate};

/// Failures reported by a [`ComposerHandle`].
///
/// Only [`ComposerError::Internal`] is panic-class: the engine is no longer
/// trustworthy and must be replaced. Everything else leaves the engine usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposerError {
    #[error("Internal composer failure: {reason}")]
    Internal { reason: String },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Failed to parse {format} content: {reason}")]
    Parse {
        format: ContentFormat,
        reason: String,
    },
}

impl ComposerError {
    /// Whether this failure requires the composer to be discarded.
    pub fn is_panic(&self) -> bool {
        matches!(self, ComposerError::Internal { .. })
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        ComposerError::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// Serialization a document is loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    Html,
    Markdown,
}

impl std::fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentFormat::Html => f.write_str("HTML"),
            ContentFormat::Markdown => f.write_str("Markdown"),
        }
    }
}

/// Inline formats that can be toggled on a selection or at the caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InlineFormat {
    Bold,
    Italic,
    Underline,
    StrikeThrough,
    InlineCode,
}

impl InlineFormat {
    pub const ALL: [InlineFormat; 5] = [
        InlineFormat::Bold,
        InlineFormat::Italic,
        InlineFormat::Underline,
        InlineFormat::StrikeThrough,
        InlineFormat::InlineCode,
    ];

    pub fn action(self) -> ComposerAction {
        match self {
            InlineFormat::Bold => ComposerAction::Bold,
            InlineFormat::Italic => ComposerAction::Italic,
            InlineFormat::Underline => ComposerAction::Underline,
            InlineFormat::StrikeThrough => ComposerAction::StrikeThrough,
            InlineFormat::InlineCode => ComposerAction::InlineCode,
        }
    }
}

/// Toolbar-facing actions whose state the composer reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComposerAction {
    Bold,
    Italic,
    StrikeThrough,
    Underline,
    InlineCode,
    Link,
    Undo,
    Redo,
    OrderedList,
    UnorderedList,
    Indent,
    Unindent,
    CodeBlock,
    Quote,
}

impl ComposerAction {
    pub const ALL: [ComposerAction; 14] = [
        ComposerAction::Bold,
        ComposerAction::Italic,
        ComposerAction::StrikeThrough,
        ComposerAction::Underline,
        ComposerAction::InlineCode,
        ComposerAction::Link,
        ComposerAction::Undo,
        ComposerAction::Redo,
        ComposerAction::OrderedList,
        ComposerAction::UnorderedList,
        ComposerAction::Indent,
        ComposerAction::Unindent,
        ComposerAction::CodeBlock,
        ComposerAction::Quote,
    ];
}

/// Tri-state of a [`ComposerAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionState {
    Enabled,
    Disabled,
    /// The action is currently applied; triggering it again removes it.
    Reversed,
}

/// What a link button would do at the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Caret with no link: the link needs its own text.
    CreateWithText,
    /// Non-empty selection without a link.
    Create,
    /// Selection inside an existing link.
    Edit { url: String },
    Disabled,
}

pub type ComposerResult = Result<ComposerUpdate, ComposerError>;

/// The formatting engine as seen by the synchronization core.
///
/// Every mutating operation returns a [`ComposerUpdate`] or fails. Reads
/// never fail, apart from [`ComposerHandle::snapshot_text`].
pub trait ComposerHandle: Send {
    fn select(&mut self, start: usize, end: usize) -> ComposerResult;

    /// Replace the current selection with `text`.
    fn replace_text(&mut self, text: String) -> ComposerResult;
    fn replace_text_in(&mut self, text: String, start: usize, end: usize) -> ComposerResult;

    fn enter(&mut self) -> ComposerResult;
    fn backspace(&mut self) -> ComposerResult;
    fn delete(&mut self) -> ComposerResult;
    fn delete_in(&mut self, start: usize, end: usize) -> ComposerResult;

    fn bold(&mut self) -> ComposerResult;
    fn italic(&mut self) -> ComposerResult;
    fn underline(&mut self) -> ComposerResult;
    fn strike_through(&mut self) -> ComposerResult;
    fn inline_code(&mut self) -> ComposerResult;

    fn ordered_list(&mut self) -> ComposerResult;
    fn unordered_list(&mut self) -> ComposerResult;
    fn quote(&mut self) -> ComposerResult;
    fn code_block(&mut self) -> ComposerResult;
    fn indent(&mut self) -> ComposerResult;
    fn unindent(&mut self) -> ComposerResult;

    fn set_link(&mut self, url: String, attributes: Vec<(String, String)>) -> ComposerResult;
    fn set_link_with_text(
        &mut self,
        url: String,
        text: String,
        attributes: Vec<(String, String)>,
    ) -> ComposerResult;
    fn remove_links(&mut self) -> ComposerResult;

    fn replace_text_suggestion(
        &mut self,
        suggestion: SuggestionPattern,
        new_text: String,
    ) -> ComposerResult;
    fn set_link_suggestion(
        &mut self,
        url: String,
        text: String,
        suggestion: SuggestionPattern,
        attributes: Vec<(String, String)>,
    ) -> ComposerResult;

    fn set_content_from_html(&mut self, html: String) -> ComposerResult;
    fn set_content_from_markdown(&mut self, markdown: String) -> ComposerResult;

    fn undo(&mut self) -> ComposerResult;
    fn redo(&mut self) -> ComposerResult;

    /// Force a panic-class failure. Only used to exercise recovery.
    fn debug_panic(&mut self) -> ComposerResult;

    fn get_content_as_html(&self) -> String;
    fn get_content_as_message_html(&self) -> String;
    fn get_content_as_markdown(&self) -> String;
    fn get_content_as_plain_text(&self) -> String;
    fn action_states(&self) -> HashMap<ComposerAction, ActionState>;
    fn get_link_action(&self) -> LinkAction;

    /// Plain text to keep for recovery. Fails when the engine could not
    /// produce it, so a broken read never replaces a good snapshot.
    fn snapshot_text(&self) -> Result<String, ComposerError> {
        Ok(self.get_content_as_plain_text())
    }

    /// Plain text with the selection marked, for logs and tests:
    /// `|` is a caret, `{` and `}|` bracket a selection.
    fn to_example_format(&self) -> String;
}

/// Factory producing a fresh, empty composer.
pub type ComposerProvider = Box<dyn FnMut() -> Box<dyn ComposerHandle> + Send>;

/// The provider used when nothing else is configured: a [`RichTextComposer`]
/// behind a [`PanicGuard`].
pub fn default_provider() -> ComposerProvider {
    Box::new(|| Box::new(PanicGuard::new(RichTextComposer::new())))
}
