//! # Synchronization core
//!
//! [`EditorViewModel`] sits between the editor view and the composer. For
//! every selection change or command it maps view offsets, calls the
//! composer inside a failure boundary, then interprets the three facets of
//! the returned [`ComposerUpdate`]:
//!
//! - menu state goes verbatim to the action-states listener
//! - menu action of a command updates the [`SuggestionContext`] and,
//!   unless it is [`MenuAction::Keep`], the menu-action listener; selection
//!   changes leave both alone
//! - [`TextUpdate::ReplaceAll`] is rendered through the [`HtmlConverter`],
//!   refreshes the recovery snapshot and is handed back to the caller
//!
//! Failures never reach the caller. They go to the [`ErrorObserver`]; a
//! panic-class failure then either aborts (fail-fast) or replaces the
//! composer through the [`RecoveryManager`].

use std::collections::HashMap;
use std::ops::Range;

use crate::composer::{
    ActionState, ComposerAction, ComposerError, ComposerHandle, ComposerProvider, ComposerResult,
    ComposerUpdate, InlineFormat, MenuAction, MenuState, SuggestionPattern, TextUpdate,
    default_provider,
};
use crate::input::{EditorInputAction, ViewLinkAction};
use crate::mapping::{ViewText, map_selection};
use crate::recovery::{RecoveryManager, RecoveryOutcome};
use crate::suggestion::SuggestionContext;

/// Renders composer HTML into whatever the view displays.
pub trait HtmlConverter {
    type Output;

    fn from_html_to_spans(&self, html: &str) -> Self::Output;
}

impl<F, T> HtmlConverter for F
where
    F: Fn(&str) -> T,
{
    type Output = T;

    fn from_html_to_spans(&self, html: &str) -> T {
        self(html)
    }
}

/// Converter that hands the HTML through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawHtml;

impl HtmlConverter for RawHtml {
    type Output = String;

    fn from_html_to_spans(&self, html: &str) -> String {
        html.to_string()
    }
}

/// Receives every composer failure before any recovery happens.
pub trait ErrorObserver: Send {
    fn on_composer_error(&mut self, error: &ComposerError);
}

impl<F> ErrorObserver for F
where
    F: FnMut(&ComposerError) + Send,
{
    fn on_composer_error(&mut self, error: &ComposerError) {
        self(error)
    }
}

pub type ActionStatesCallback = Box<dyn FnMut(&HashMap<ComposerAction, ActionState>) + Send>;
pub type MenuActionCallback = Box<dyn FnMut(&MenuAction) + Send>;

/// Failure policy of the synchronization core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorSettings {
    /// Panic on a panic-class composer failure instead of recovering.
    pub fail_fast: bool,
    /// Pass ordinary failures to the error observer too.
    pub report_ordinary_failures: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            fail_fast: cfg!(debug_assertions),
            report_ordinary_failures: true,
        }
    }
}

/// New content for the view after a whole-document replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceTextResult<T> {
    pub text: T,
    /// Selection to apply after rendering, in composer UTF-16 offsets.
    pub selection: Range<usize>,
}

/// Everything that changes while the editor runs.
struct SyncState {
    composer: Box<dyn ComposerHandle>,
    suggestion: SuggestionContext,
    recovery: RecoveryManager,
    settings: EditorSettings,
}

pub struct EditorViewModel<H> {
    state: SyncState,
    provider: ComposerProvider,
    converter: H,
    error_observer: Option<Box<dyn ErrorObserver>>,
    action_states_callback: Option<ActionStatesCallback>,
    menu_action_callback: Option<MenuActionCallback>,
}

impl<H: HtmlConverter> EditorViewModel<H> {
    /// Create the view model, provisioning its first composer from `provider`.
    pub fn new(mut provider: ComposerProvider, converter: H) -> Self {
        let composer = provider();
        Self {
            state: SyncState {
                composer,
                suggestion: SuggestionContext::new(),
                recovery: RecoveryManager::new(),
                settings: EditorSettings::default(),
            },
            provider,
            converter,
            error_observer: None,
            action_states_callback: None,
            menu_action_callback: None,
        }
    }

    /// A view model backed by the bundled composer.
    pub fn with_default_composer(converter: H) -> Self {
        Self::new(default_provider(), converter)
    }

    pub fn with_settings(mut self, settings: EditorSettings) -> Self {
        self.state.settings = settings;
        self
    }

    pub fn settings(&self) -> EditorSettings {
        self.state.settings
    }

    pub fn set_settings(&mut self, settings: EditorSettings) {
        self.state.settings = settings;
    }

    pub fn set_error_observer(&mut self, observer: Option<Box<dyn ErrorObserver>>) {
        self.error_observer = observer;
    }

    /// Register the toolbar listener. It immediately receives the current
    /// action states.
    pub fn set_action_states_callback(&mut self, callback: Option<ActionStatesCallback>) {
        self.action_states_callback = callback;
        if let Some(callback) = &mut self.action_states_callback {
            callback(&self.state.composer.action_states());
        }
    }

    pub fn set_menu_action_callback(&mut self, callback: Option<MenuActionCallback>) {
        self.menu_action_callback = callback;
    }

    /// Forward a selection change reported by the view.
    ///
    /// Only the toolbar state of the resulting update is forwarded; the
    /// suggestion and the menu-action listener are left alone. Returns a
    /// render result only if the composer unexpectedly replaced the document.
    pub fn update_selection(
        &mut self,
        view: &ViewText,
        start: usize,
        end: usize,
    ) -> Option<ReplaceTextResult<H::Output>> {
        let Some((start, end)) = map_selection(view, start, end) else {
            log::debug!(
                "Ignoring selection {start}..{end}: it does not map onto {} view units",
                view.len_utf16()
            );
            return None;
        };
        let result = self.state.composer.select(start, end);
        let ComposerUpdate {
            text_update,
            menu_state,
            ..
        } = self.absorb(result)?;
        self.log_composer();
        self.forward_menu_state(&menu_state);
        self.render(text_update)
    }

    /// Run a command. Returns new content for the view when the document was
    /// replaced.
    pub fn process_input(
        &mut self,
        action: EditorInputAction,
    ) -> Option<ReplaceTextResult<H::Output>> {
        log::trace!("Processing {action:?}");
        let result = dispatch(self.state.composer.as_mut(), &self.state.suggestion, action);
        let ComposerUpdate {
            text_update,
            menu_state,
            menu_action,
        } = self.absorb(result?)?;
        self.log_composer();
        self.forward_menu_state(&menu_state);
        self.interpret_menu_action(menu_action);
        self.render(text_update)
    }

    pub fn get_content_as_html(&self) -> String {
        self.state.composer.get_content_as_html()
    }

    pub fn get_content_as_message_html(&self) -> String {
        self.state.composer.get_content_as_message_html()
    }

    pub fn get_markdown(&self) -> String {
        self.state.composer.get_content_as_markdown()
    }

    pub fn get_content_as_plain_text(&self) -> String {
        self.state.composer.get_content_as_plain_text()
    }

    /// Message HTML rendered for display.
    pub fn get_current_formatted_text(&self) -> H::Output {
        self.converter
            .from_html_to_spans(&self.get_content_as_message_html())
    }

    pub fn action_states(&self) -> HashMap<ComposerAction, ActionState> {
        self.state.composer.action_states()
    }

    pub fn get_link_action(&self) -> Option<ViewLinkAction> {
        ViewLinkAction::from_composer(self.state.composer.get_link_action())
    }

    pub fn suggestion(&self) -> Option<&SuggestionPattern> {
        self.state.suggestion.pattern()
    }

    pub fn recovery_snapshot(&self) -> &str {
        self.state.recovery.snapshot()
    }

    /// Force one internal composer failure with fail-fast switched off and
    /// let recovery run. The fail-fast setting is restored afterwards.
    pub fn test_composer_crash_recovery(&mut self) {
        let fail_fast = self.state.settings.fail_fast;
        self.state.settings.fail_fast = false;
        if let Err(err) = self.state.composer.debug_panic() {
            self.on_composer_failure(err);
        }
        self.state.settings.fail_fast = fail_fast;
    }

    fn absorb(&mut self, result: ComposerResult) -> Option<ComposerUpdate> {
        match result {
            Ok(update) => Some(update),
            Err(err) => {
                self.on_composer_failure(err);
                None
            }
        }
    }

    fn on_composer_failure(&mut self, error: ComposerError) {
        report(&mut self.error_observer, &self.state.settings, &error);
        if !error.is_panic() {
            return;
        }
        if self.state.settings.fail_fast {
            panic!("Composer failed with fail-fast enabled: {error}");
        }

        let SyncState {
            composer,
            recovery,
            settings,
            ..
        } = &mut self.state;
        let observer = &mut self.error_observer;
        let outcome = recovery.recover(composer, &mut self.provider, |nested| {
            report(observer, settings, nested)
        });
        match outcome {
            RecoveryOutcome::Restored => {
                log::warn!("Replaced the failed composer and restored its content")
            }
            RecoveryOutcome::Reset => {
                log::warn!("Replaced the failed composer; its content could not be restored")
            }
        }
    }

    fn forward_menu_state(&mut self, menu_state: &MenuState) {
        if let MenuState::Update(states) = menu_state
            && let Some(callback) = &mut self.action_states_callback
        {
            callback(states);
        }
    }

    fn interpret_menu_action(&mut self, menu_action: MenuAction) {
        if self.state.suggestion.apply(&menu_action)
            && let Some(callback) = &mut self.menu_action_callback
        {
            callback(&menu_action);
        }
    }

    fn render(&mut self, text_update: TextUpdate) -> Option<ReplaceTextResult<H::Output>> {
        match text_update {
            TextUpdate::ReplaceAll {
                replacement_html,
                start,
                end,
            } => {
                match self.state.composer.snapshot_text() {
                    Ok(text) => self.state.recovery.refresh(text),
                    Err(err) => {
                        // the previous snapshot is the last text known to be good
                        self.on_composer_failure(err);
                        return None;
                    }
                }
                Some(ReplaceTextResult {
                    text: self.converter.from_html_to_spans(&replacement_html),
                    selection: start..end,
                })
            }
            TextUpdate::Select { .. } | TextUpdate::Keep => None,
        }
    }

    fn log_composer(&self) {
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Composer: {}", self.state.composer.to_example_format());
        }
    }
}

fn report(
    observer: &mut Option<Box<dyn ErrorObserver>>,
    settings: &EditorSettings,
    error: &ComposerError,
) {
    if error.is_panic() {
        log::error!("Composer failure: {error}");
    } else {
        log::debug!("Composer rejected command: {error}");
    }
    if (error.is_panic() || settings.report_ordinary_failures)
        && let Some(observer) = observer
    {
        observer.on_composer_error(error);
    }
}

/// Call the composer operation for `action`. `None` means the command needed
/// a pending suggestion and there is none.
fn dispatch(
    composer: &mut dyn ComposerHandle,
    suggestion: &SuggestionContext,
    action: EditorInputAction,
) -> Option<ComposerResult> {
    let result = match action {
        EditorInputAction::ReplaceText { value } => composer.replace_text(value),
        EditorInputAction::ReplaceTextIn { value, start, end } => {
            composer.replace_text_in(value, start, end)
        }
        EditorInputAction::ReplaceTextSuggestion { value } => {
            composer.replace_text_suggestion(pending(suggestion)?, value)
        }
        EditorInputAction::InsertParagraph => composer.enter(),
        EditorInputAction::BackPress => composer.backspace(),
        EditorInputAction::ApplyInlineFormat(format) => match format {
            InlineFormat::Bold => composer.bold(),
            InlineFormat::Italic => composer.italic(),
            InlineFormat::Underline => composer.underline(),
            InlineFormat::StrikeThrough => composer.strike_through(),
            InlineFormat::InlineCode => composer.inline_code(),
        },
        EditorInputAction::Delete => composer.delete(),
        EditorInputAction::DeleteIn { start, end } => composer.delete_in(start, end),
        EditorInputAction::SetLink { url } => composer.set_link(url, Vec::new()),
        EditorInputAction::SetLinkWithText { url, text } => {
            composer.set_link_with_text(url, text, Vec::new())
        }
        EditorInputAction::SetLinkSuggestion { url, text } => {
            composer.set_link_suggestion(url, text, pending(suggestion)?, Vec::new())
        }
        EditorInputAction::RemoveLink => composer.remove_links(),
        EditorInputAction::ReplaceAllHtml { html } => composer.set_content_from_html(html),
        EditorInputAction::ReplaceAllMarkdown { markdown } => {
            composer.set_content_from_markdown(markdown)
        }
        EditorInputAction::Undo => composer.undo(),
        EditorInputAction::Redo => composer.redo(),
        EditorInputAction::ToggleList { ordered: true } => composer.ordered_list(),
        EditorInputAction::ToggleList { ordered: false } => composer.unordered_list(),
        EditorInputAction::CodeBlock => composer.code_block(),
        EditorInputAction::Quote => composer.quote(),
        EditorInputAction::Indent => composer.indent(),
        EditorInputAction::Unindent => composer.unindent(),
    };
    Some(result)
}

fn pending(suggestion: &SuggestionContext) -> Option<SuggestionPattern> {
    let pattern = suggestion.pattern().cloned();
    if pattern.is_none() {
        log::debug!("No pending suggestion, ignoring suggestion command");
    }
    pattern
}
