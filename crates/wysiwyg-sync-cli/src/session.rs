use anyhow::Result;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use wysiwyg_sync_engine::{
    ActionState, ComposerAction, ComposerError, EditorSettings, EditorViewModel, MenuAction,
    RawHtml, ReplaceTextResult, ViewLinkAction, ViewText,
};

use crate::script::{Command, Output};

/// Notifications collected from the listeners while a command runs.
type Events = Arc<Mutex<Vec<String>>>;

/// An editor driven by script commands.
pub struct Session {
    editor: EditorViewModel<RawHtml>,
    events: Events,
}

impl Session {
    pub fn new(settings: EditorSettings) -> Self {
        let events: Events = Arc::default();
        let mut editor = EditorViewModel::with_default_composer(RawHtml).with_settings(settings);

        let sink = events.clone();
        editor.set_error_observer(Some(Box::new(move |error: &ComposerError| {
            let kind = if error.is_panic() {
                "internal error"
            } else {
                "error"
            };
            push(&sink, format!("{kind}: {error}"));
        })));
        let sink = events.clone();
        editor.set_menu_action_callback(Some(Box::new(move |action: &MenuAction| {
            let line = match action {
                MenuAction::Suggestion(pattern) => format!(
                    "menu: {}{} [{}..{}]",
                    pattern.key.as_char(),
                    pattern.text,
                    pattern.start,
                    pattern.end
                ),
                MenuAction::None | MenuAction::Keep => "menu: none".to_string(),
            };
            push(&sink, line);
        })));
        let sink = events.clone();
        editor.set_action_states_callback(Some(Box::new(
            move |states: &HashMap<ComposerAction, ActionState>| {
                push(&sink, format!("states: {}", format_states(states)));
            },
        )));

        let session = Self { editor, events };
        // registering the toolbar listener already reported the initial states
        session.take_events();
        session
    }

    /// Run one command, writing what it produced to `out`.
    pub fn run<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        log::debug!("Running {command:?}");
        let result = match command {
            Command::Select {
                start,
                end,
                placeholders,
            } => {
                let view =
                    ViewText::with_placeholders(self.editor.get_content_as_plain_text(), placeholders);
                self.editor.update_selection(&view, start, end)
            }
            Command::Input(action) => self.editor.process_input(action),
            Command::Panic => {
                self.editor.test_composer_crash_recovery();
                None
            }
            Command::Print(output) => {
                writeln!(out, "{}", self.print(output))?;
                None
            }
        };

        for event in self.take_events() {
            writeln!(out, "{event}")?;
        }
        if let Some(ReplaceTextResult { text, selection }) = result {
            writeln!(out, "render: {text} [{}..{}]", selection.start, selection.end)?;
        }
        Ok(())
    }

    fn print(&self, output: Output) -> String {
        match output {
            Output::Html => self.editor.get_content_as_html(),
            Output::Message => self.editor.get_content_as_message_html(),
            Output::Markdown => self.editor.get_markdown(),
            Output::Text => self.editor.get_content_as_plain_text(),
            Output::States => format_states(&self.editor.action_states()),
            Output::Link => match self.editor.get_link_action() {
                Some(ViewLinkAction::SetLink {
                    current_url: Some(url),
                }) => format!("edit link {url}"),
                Some(ViewLinkAction::SetLink { current_url: None }) => "set link".to_string(),
                Some(ViewLinkAction::InsertLink) => "insert link".to_string(),
                None => "no link".to_string(),
            },
        }
    }

    fn take_events(&self) -> Vec<String> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *events)
    }
}

fn push(events: &Events, line: String) {
    events
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .push(line);
}

/// Actions that are not plainly enabled, e.g. `bold=reversed undo=disabled`.
fn format_states(states: &HashMap<ComposerAction, ActionState>) -> String {
    let mut states: Vec<_> = states
        .iter()
        .filter(|(_, state)| **state != ActionState::Enabled)
        .collect();
    states.sort_by_key(|(action, _)| **action);
    states
        .into_iter()
        .map(|(action, state)| {
            let state = match state {
                ActionState::Enabled => "enabled",
                ActionState::Disabled => "disabled",
                ActionState::Reversed => "reversed",
            };
            format!("{action:?}={state}").to_lowercase()
        })
        .collect::<Vec<_>>()
        .join(" ")
}
