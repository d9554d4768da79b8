//! UniFFI bindings for wysiwyg-sync mobile editors
//!
//! Exposes the synchronization core to the Kotlin and Swift editor views.
//! The view reports selection changes and user commands to an
//! [`EditorHandle`]; the handle answers with HTML to render and pushes
//! toolbar, suggestion and error notifications through listener interfaces.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use wysiwyg_sync_engine::composer::model::{html, markdown};
use wysiwyg_sync_engine::{
    ActionState, ActionStatesCallback, ComposerAction, ComposerError, EditorInputAction,
    EditorSettings, EditorViewModel, ErrorObserver, InlineFormat, MenuAction,
    MenuActionCallback, PatternKey, Placeholder, RawHtml, ReplaceTextResult, SuggestionPattern,
    ViewLinkAction, ViewText,
};

uniffi::setup_scaffolding!();

// ============ Errors ============

/// Errors that can cross the FFI boundary
/// Note: Field is named `reason` not `message` to avoid conflict with Throwable.message in Kotlin
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum FfiError {
    #[error("Parse error: {reason}")]
    ParseError { reason: String },
}

// ============ Listeners ============

/// Receives toolbar states whenever the composer reports a change.
#[uniffi::export(with_foreign)]
pub trait ActionStatesListener: Send + Sync {
    fn on_action_states(&self, states: Vec<ActionStateDto>);
}

/// Receives suggestion menu changes. `None` dismisses the menu.
#[uniffi::export(with_foreign)]
pub trait MenuActionListener: Send + Sync {
    fn on_menu_action(&self, suggestion: Option<SuggestionPatternDto>);
}

/// Receives composer failures. `is_internal` is set for failures that
/// replaced the composer.
#[uniffi::export(with_foreign)]
pub trait ErrorListener: Send + Sync {
    fn on_composer_error(&self, reason: String, is_internal: bool);
}

// ============ Editor Handle ============

/// A handle to the synchronization core of one editor view.
///
/// Listeners are called while the handle is locked and must not call back
/// into the same handle synchronously.
#[derive(uniffi::Object)]
pub struct EditorHandle {
    inner: Mutex<EditorViewModel<RawHtml>>,
}

#[uniffi::export]
impl EditorHandle {
    /// Create an editor with an empty document.
    #[uniffi::constructor]
    pub fn new(settings: EditorSettingsDto) -> Self {
        let view_model =
            EditorViewModel::with_default_composer(RawHtml).with_settings(settings.into_engine());
        Self {
            inner: Mutex::new(view_model),
        }
    }

    /// Create an editor seeded with HTML content.
    #[uniffi::constructor]
    pub fn from_html(html: String, settings: EditorSettingsDto) -> Result<Self, FfiError> {
        html::parse(&html).map_err(|e| FfiError::ParseError {
            reason: e.to_string(),
        })?;
        let handle = Self::new(settings);
        handle.process_input(EditorInputActionDto::ReplaceAllHtml { html });
        Ok(handle)
    }

    /// Create an editor seeded with Markdown content.
    #[uniffi::constructor]
    pub fn from_markdown(markdown: String, settings: EditorSettingsDto) -> Self {
        let handle = Self::new(settings);
        handle.process_input(EditorInputActionDto::ReplaceAllMarkdown { markdown });
        handle
    }

    /// Forward a selection change of the view, in view UTF-16 offsets.
    pub fn update_selection(
        &self,
        view: ViewTextDto,
        start: u32,
        end: u32,
    ) -> Option<ReplaceTextResultDto> {
        // Recover from poisoned mutex (another thread panicked while holding lock)
        let mut vm = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        vm.update_selection(&view.into_engine(), start as usize, end as usize)
            .map(ReplaceTextResultDto::from_engine)
    }

    /// Run a user command. Returns the content to render when the document
    /// was replaced.
    pub fn process_input(&self, action: EditorInputActionDto) -> Option<ReplaceTextResultDto> {
        let mut vm = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        vm.process_input(action.into_engine())
            .map(ReplaceTextResultDto::from_engine)
    }

    pub fn get_content_as_html(&self) -> String {
        let vm = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        vm.get_content_as_html()
    }

    pub fn get_content_as_message_html(&self) -> String {
        let vm = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        vm.get_content_as_message_html()
    }

    pub fn get_markdown(&self) -> String {
        let vm = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        vm.get_markdown()
    }

    pub fn get_content_as_plain_text(&self) -> String {
        let vm = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        vm.get_content_as_plain_text()
    }

    /// Current toolbar states, in a stable order.
    pub fn action_states(&self) -> Vec<ActionStateDto> {
        let vm = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        ActionStateDto::from_engine(&vm.action_states())
    }

    pub fn get_link_action(&self) -> Option<LinkActionDto> {
        let vm = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        vm.get_link_action().map(LinkActionDto::from_engine)
    }

    /// The pending suggestion, if a menu is open.
    pub fn suggestion(&self) -> Option<SuggestionPatternDto> {
        let vm = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        vm.suggestion().map(SuggestionPatternDto::from_engine)
    }

    /// Register the toolbar listener. It is called right away with the
    /// current states.
    pub fn set_action_states_listener(&self, listener: Option<Arc<dyn ActionStatesListener>>) {
        let mut vm = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        vm.set_action_states_callback(listener.map(|listener| -> ActionStatesCallback {
            Box::new(move |states: &HashMap<ComposerAction, ActionState>| {
                listener.on_action_states(ActionStateDto::from_engine(states))
            })
        }));
    }

    pub fn set_menu_action_listener(&self, listener: Option<Arc<dyn MenuActionListener>>) {
        let mut vm = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        vm.set_menu_action_callback(listener.map(|listener| -> MenuActionCallback {
            Box::new(move |action: &MenuAction| {
                let suggestion = match action {
                    MenuAction::Suggestion(pattern) => {
                        Some(SuggestionPatternDto::from_engine(pattern))
                    }
                    MenuAction::None | MenuAction::Keep => None,
                };
                listener.on_menu_action(suggestion)
            })
        }));
    }

    pub fn set_error_listener(&self, listener: Option<Arc<dyn ErrorListener>>) {
        let mut vm = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        vm.set_error_observer(listener.map(|listener| -> Box<dyn ErrorObserver> {
            Box::new(move |error: &ComposerError| {
                listener.on_composer_error(error.to_string(), error.is_panic())
            })
        }));
    }

    /// Crash the composer once and recover from it, whatever the fail-fast
    /// setting.
    pub fn test_composer_crash_recovery(&self) {
        let mut vm = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        log::info!("Forcing a composer crash to exercise recovery");
        vm.test_composer_crash_recovery();
    }
}

// ============ DTOs ============

/// Failure policy for a new editor.
#[derive(Debug, Clone, Copy, uniffi::Record)]
pub struct EditorSettingsDto {
    /// Crash on an internal composer failure instead of recovering
    pub fail_fast: bool,
    /// Also report rejected commands to the error listener
    pub report_ordinary_failures: bool,
}

impl EditorSettingsDto {
    fn into_engine(self) -> EditorSettings {
        EditorSettings {
            fail_fast: self.fail_fast,
            report_ordinary_failures: self.report_ordinary_failures,
        }
    }
}

/// A view span whose width differs from its composer width.
#[derive(Debug, Clone, uniffi::Record)]
pub struct PlaceholderDto {
    pub start: u32,
    pub end: u32,
    /// 1 for a mention pill, 0 for a view-only decoration
    pub composer_len: u32,
}

/// The text currently shown by the view.
#[derive(Debug, Clone, uniffi::Record)]
pub struct ViewTextDto {
    pub text: String,
    /// Sorted, non-overlapping
    pub placeholders: Vec<PlaceholderDto>,
}

impl ViewTextDto {
    fn into_engine(self) -> ViewText {
        let placeholders = self
            .placeholders
            .into_iter()
            .map(|p| Placeholder::new(p.start as usize..p.end as usize, p.composer_len as usize))
            .collect();
        ViewText::with_placeholders(self.text, placeholders)
    }
}

/// New content for the view.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ReplaceTextResultDto {
    pub html: String,
    pub selection_start: u32,
    pub selection_end: u32,
}

impl ReplaceTextResultDto {
    fn from_engine(result: ReplaceTextResult<String>) -> Self {
        Self {
            html: result.text,
            selection_start: result.selection.start as u32,
            selection_end: result.selection.end as u32,
        }
    }
}

/// State of one toolbar action.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ActionStateDto {
    /// Action name: "bold", "italic", "strike_through", "underline",
    /// "inline_code", "link", "undo", "redo", "ordered_list",
    /// "unordered_list", "indent", "unindent", "code_block" or "quote"
    pub action: String,
    /// "enabled", "disabled" or "reversed"
    pub state: String,
}

impl ActionStateDto {
    fn from_engine(states: &HashMap<ComposerAction, ActionState>) -> Vec<Self> {
        let mut states: Vec<_> = states.iter().collect();
        states.sort_by_key(|(action, _)| **action);
        states
            .into_iter()
            .map(|(action, state)| Self {
                action: action_name(*action).to_string(),
                state: match state {
                    ActionState::Enabled => "enabled",
                    ActionState::Disabled => "disabled",
                    ActionState::Reversed => "reversed",
                }
                .to_string(),
            })
            .collect()
    }
}

fn action_name(action: ComposerAction) -> &'static str {
    match action {
        ComposerAction::Bold => "bold",
        ComposerAction::Italic => "italic",
        ComposerAction::StrikeThrough => "strike_through",
        ComposerAction::Underline => "underline",
        ComposerAction::InlineCode => "inline_code",
        ComposerAction::Link => "link",
        ComposerAction::Undo => "undo",
        ComposerAction::Redo => "redo",
        ComposerAction::OrderedList => "ordered_list",
        ComposerAction::UnorderedList => "unordered_list",
        ComposerAction::Indent => "indent",
        ComposerAction::Unindent => "unindent",
        ComposerAction::CodeBlock => "code_block",
        ComposerAction::Quote => "quote",
    }
}

/// An open autocomplete trigger.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct SuggestionPatternDto {
    /// Trigger: "at", "hash" or "slash"
    pub key: String,
    /// Text typed after the trigger character
    pub text: String,
    pub start: u32,
    pub end: u32,
}

impl SuggestionPatternDto {
    fn from_engine(pattern: &SuggestionPattern) -> Self {
        let key = match pattern.key {
            PatternKey::At => "at",
            PatternKey::Hash => "hash",
            PatternKey::Slash => "slash",
        };
        Self {
            key: key.to_string(),
            text: pattern.text.clone(),
            start: pattern.start as u32,
            end: pattern.end as u32,
        }
    }
}

/// What the link button offers.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct LinkActionDto {
    /// "set_link" or "insert_link"
    pub kind: String,
    /// URL of the link under the selection, when editing one
    pub current_url: Option<String>,
}

impl LinkActionDto {
    fn from_engine(action: ViewLinkAction) -> Self {
        match action {
            ViewLinkAction::SetLink { current_url } => Self {
                kind: "set_link".to_string(),
                current_url,
            },
            ViewLinkAction::InsertLink => Self {
                kind: "insert_link".to_string(),
                current_url: None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, uniffi::Enum)]
pub enum InlineFormatDto {
    Bold,
    Italic,
    Underline,
    StrikeThrough,
    InlineCode,
}

impl From<InlineFormatDto> for InlineFormat {
    fn from(format: InlineFormatDto) -> Self {
        match format {
            InlineFormatDto::Bold => InlineFormat::Bold,
            InlineFormatDto::Italic => InlineFormat::Italic,
            InlineFormatDto::Underline => InlineFormat::Underline,
            InlineFormatDto::StrikeThrough => InlineFormat::StrikeThrough,
            InlineFormatDto::InlineCode => InlineFormat::InlineCode,
        }
    }
}

/// A user command. Offsets are composer UTF-16 offsets.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum EditorInputActionDto {
    ReplaceText { value: String },
    ReplaceTextIn { value: String, start: u32, end: u32 },
    ReplaceTextSuggestion { value: String },
    InsertParagraph,
    BackPress,
    ApplyInlineFormat { format: InlineFormatDto },
    Delete,
    DeleteIn { start: u32, end: u32 },
    SetLink { url: String },
    SetLinkWithText { url: String, text: String },
    SetLinkSuggestion { url: String, text: String },
    RemoveLink,
    ReplaceAllHtml { html: String },
    ReplaceAllMarkdown { markdown: String },
    Undo,
    Redo,
    ToggleList { ordered: bool },
    CodeBlock,
    Quote,
    Indent,
    Unindent,
}

impl EditorInputActionDto {
    fn into_engine(self) -> EditorInputAction {
        match self {
            Self::ReplaceText { value } => EditorInputAction::ReplaceText { value },
            Self::ReplaceTextIn { value, start, end } => EditorInputAction::ReplaceTextIn {
                value,
                start: start as usize,
                end: end as usize,
            },
            Self::ReplaceTextSuggestion { value } => {
                EditorInputAction::ReplaceTextSuggestion { value }
            }
            Self::InsertParagraph => EditorInputAction::InsertParagraph,
            Self::BackPress => EditorInputAction::BackPress,
            Self::ApplyInlineFormat { format } => {
                EditorInputAction::ApplyInlineFormat(format.into())
            }
            Self::Delete => EditorInputAction::Delete,
            Self::DeleteIn { start, end } => EditorInputAction::DeleteIn {
                start: start as usize,
                end: end as usize,
            },
            Self::SetLink { url } => EditorInputAction::SetLink { url },
            Self::SetLinkWithText { url, text } => EditorInputAction::SetLinkWithText { url, text },
            Self::SetLinkSuggestion { url, text } => {
                EditorInputAction::SetLinkSuggestion { url, text }
            }
            Self::RemoveLink => EditorInputAction::RemoveLink,
            Self::ReplaceAllHtml { html } => EditorInputAction::ReplaceAllHtml { html },
            Self::ReplaceAllMarkdown { markdown } => {
                EditorInputAction::ReplaceAllMarkdown { markdown }
            }
            Self::Undo => EditorInputAction::Undo,
            Self::Redo => EditorInputAction::Redo,
            Self::ToggleList { ordered } => EditorInputAction::ToggleList { ordered },
            Self::CodeBlock => EditorInputAction::CodeBlock,
            Self::Quote => EditorInputAction::Quote,
            Self::Indent => EditorInputAction::Indent,
            Self::Unindent => EditorInputAction::Unindent,
        }
    }
}

// ============ Standalone Functions ============

/// Convert Markdown to the display HTML the editor would render for it.
#[uniffi::export]
pub fn markdown_to_html(markdown: String) -> String {
    let handle = EditorHandle::from_markdown(markdown, EditorSettingsDto::lenient());
    handle.get_content_as_html()
}

/// Convert editor HTML to Markdown.
#[uniffi::export]
pub fn html_to_markdown(html: String) -> Result<String, FfiError> {
    let doc = html::parse(&html).map_err(|e| FfiError::ParseError {
        reason: e.to_string(),
    })?;
    Ok(markdown::to_markdown(&doc))
}

impl EditorSettingsDto {
    fn lenient() -> Self {
        Self {
            fail_fast: false,
            report_ordinary_failures: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn settings() -> EditorSettingsDto {
        EditorSettingsDto::lenient()
    }

    fn type_text(handle: &EditorHandle, value: &str) -> Option<ReplaceTextResultDto> {
        handle.process_input(EditorInputActionDto::ReplaceText {
            value: value.to_string(),
        })
    }

    #[derive(Default)]
    struct Recorder {
        states: Mutex<Vec<Vec<ActionStateDto>>>,
        menus: Mutex<Vec<Option<SuggestionPatternDto>>>,
        errors: Mutex<Vec<(String, bool)>>,
    }

    impl ActionStatesListener for Recorder {
        fn on_action_states(&self, states: Vec<ActionStateDto>) {
            self.states.lock().unwrap().push(states);
        }
    }

    impl MenuActionListener for Recorder {
        fn on_menu_action(&self, suggestion: Option<SuggestionPatternDto>) {
            self.menus.lock().unwrap().push(suggestion);
        }
    }

    impl ErrorListener for Recorder {
        fn on_composer_error(&self, reason: String, is_internal: bool) {
            self.errors.lock().unwrap().push((reason, is_internal));
        }
    }

    #[test]
    fn test_typing_returns_html_and_caret() {
        let handle = EditorHandle::new(settings());

        let result = type_text(&handle, "hello").unwrap();

        assert_eq!(
            result,
            ReplaceTextResultDto {
                html: "hello".to_string(),
                selection_start: 5,
                selection_end: 5,
            }
        );
        assert_eq!(handle.get_content_as_plain_text(), "hello");
    }

    #[test]
    fn test_from_html() {
        let handle =
            EditorHandle::from_html("<strong>bold</strong> text".to_string(), settings()).unwrap();
        assert_eq!(handle.get_content_as_html(), "<strong>bold</strong> text");
        assert_eq!(handle.get_markdown(), "**bold** text");
    }

    #[test]
    fn test_from_html_rejects_malformed_html() {
        let result = EditorHandle::from_html("<strong".to_string(), settings());
        assert!(matches!(result, Err(FfiError::ParseError { .. })));
    }

    #[test]
    fn test_from_markdown() {
        let handle = EditorHandle::from_markdown("*hi*".to_string(), settings());
        assert_eq!(handle.get_content_as_html(), "<em>hi</em>");
    }

    #[test]
    fn test_reversed_selection_is_swapped() {
        let handle = EditorHandle::new(settings());
        type_text(&handle, "hello world");
        let view = ViewTextDto {
            text: "hello world".to_string(),
            placeholders: vec![],
        };

        let result = handle.update_selection(view, 11, 6);

        assert_eq!(result, None);
        assert_eq!(
            handle.get_link_action(),
            Some(LinkActionDto {
                kind: "set_link".to_string(),
                current_url: None,
            })
        );
    }

    #[test]
    fn test_unmappable_selection_is_ignored() {
        let handle = EditorHandle::new(settings());
        type_text(&handle, "abc");
        let view = ViewTextDto {
            text: "abc".to_string(),
            placeholders: vec![PlaceholderDto {
                start: 2,
                end: 9,
                composer_len: 1,
            }],
        };

        assert_eq!(handle.update_selection(view, 0, 1), None);
        assert_eq!(
            handle.get_link_action(),
            Some(LinkActionDto {
                kind: "insert_link".to_string(),
                current_url: None,
            })
        );
    }

    #[test]
    fn test_action_states_are_sorted_and_named() {
        let handle = EditorHandle::new(settings());
        let states = handle.action_states();

        assert_eq!(states.len(), ComposerAction::ALL.len());
        assert_eq!(states[0].action, "bold");
        assert_eq!(states[0].state, "enabled");
        let undo = states.iter().find(|s| s.action == "undo").unwrap();
        assert_eq!(undo.state, "disabled");
    }

    #[test]
    fn test_action_states_listener_gets_current_states() {
        let handle = EditorHandle::new(settings());
        let recorder = Arc::new(Recorder::default());

        handle.set_action_states_listener(Some(recorder.clone()));

        let states = recorder.states.lock().unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0], handle.action_states());
    }

    #[test]
    fn test_mention_round_trip() {
        let handle = EditorHandle::new(settings());
        let recorder = Arc::new(Recorder::default());
        handle.set_menu_action_listener(Some(recorder.clone()));

        type_text(&handle, "@ali");
        assert_eq!(
            handle.suggestion(),
            Some(SuggestionPatternDto {
                key: "at".to_string(),
                text: "ali".to_string(),
                start: 0,
                end: 4,
            })
        );

        handle.process_input(EditorInputActionDto::SetLinkSuggestion {
            url: "https://matrix.to/#/@alice:matrix.org".to_string(),
            text: "Alice".to_string(),
        });

        assert_eq!(
            handle.get_content_as_message_html(),
            "<a href=\"https://matrix.to/#/@alice:matrix.org\">Alice</a> "
        );
        let menus = recorder.menus.lock().unwrap();
        assert_eq!(menus.first().unwrap().as_ref().unwrap().text, "ali");
        assert_eq!(menus.last().unwrap(), &None);
    }

    #[test]
    fn test_suggestion_command_without_suggestion_does_nothing() {
        let handle = EditorHandle::new(settings());
        type_text(&handle, "plain");

        let result = handle.process_input(EditorInputActionDto::ReplaceTextSuggestion {
            value: "x".to_string(),
        });

        assert_eq!(result, None);
        assert_eq!(handle.get_content_as_plain_text(), "plain");
    }

    #[test]
    fn test_crash_recovery_restores_text_and_reports() {
        let handle = EditorHandle::new(EditorSettingsDto {
            fail_fast: true,
            report_ordinary_failures: true,
        });
        let recorder = Arc::new(Recorder::default());
        handle.set_error_listener(Some(recorder.clone()));
        type_text(&handle, "keep me");

        handle.test_composer_crash_recovery();

        assert_eq!(handle.get_content_as_plain_text(), "keep me");
        let errors = recorder.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].1);
    }

    #[test]
    fn test_ordinary_failures_are_reported_when_enabled() {
        let handle = EditorHandle::new(EditorSettingsDto {
            fail_fast: false,
            report_ordinary_failures: true,
        });
        let recorder = Arc::new(Recorder::default());
        handle.set_error_listener(Some(recorder.clone()));

        handle.process_input(EditorInputActionDto::DeleteIn { start: 3, end: 9 });

        let errors = recorder.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(!errors[0].1);
    }

    #[test]
    fn test_inline_format_and_lists() {
        let handle = EditorHandle::new(settings());
        handle.process_input(EditorInputActionDto::ApplyInlineFormat {
            format: InlineFormatDto::Bold,
        });
        type_text(&handle, "b");
        handle.process_input(EditorInputActionDto::ToggleList { ordered: false });

        assert_eq!(
            handle.get_content_as_html(),
            "<ul><li><strong>b</strong></li></ul>"
        );
        let bold = handle
            .action_states()
            .into_iter()
            .find(|s| s.action == "unordered_list")
            .unwrap();
        assert_eq!(bold.state, "reversed");
    }

    #[test]
    fn test_markdown_to_html() {
        assert_eq!(
            markdown_to_html("- one\n- two".to_string()),
            "<ul><li>one</li><li>two</li></ul>"
        );
    }

    #[test]
    fn test_html_to_markdown() {
        assert_eq!(
            html_to_markdown("<ol><li>a</li><li>b</li></ol>".to_string()).unwrap(),
            "1. a\n2. b"
        );
        assert!(html_to_markdown("<!-- open".to_string()).is_err());
    }
}
