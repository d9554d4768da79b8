//! A scriptable composer that records every call made to it.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use wysiwyg_sync_engine::{
    ActionState, ComposerAction, ComposerError, ComposerHandle, ComposerProvider, ComposerResult,
    ComposerUpdate, LinkAction, MenuAction, MenuState, PatternKey, SuggestionPattern, TextUpdate,
};

/// One observed composer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Select(usize, usize),
    ReplaceText(String),
    ReplaceTextSuggestion(SuggestionPattern, String),
    SetLinkSuggestion(String, String, SuggestionPattern),
    DebugPanic,
    Other(&'static str),
}

#[derive(Default)]
pub struct Recorder {
    pub calls: Vec<Call>,
    /// Replies handed out in order; an empty script answers `keep`.
    pub script: VecDeque<ComposerResult>,
    /// Number of composers the provider has built.
    pub provisioned: usize,
    /// What `get_content_as_plain_text` returns.
    pub plain_text: String,
    /// Returned once by the next `snapshot_text` call.
    pub snapshot_failure: Option<ComposerError>,
}

/// Shared view of the recorder behind every mock built by one provider.
#[derive(Clone, Default)]
pub struct Mock(Arc<Mutex<Recorder>>);

impl Mock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorder(&self) -> MutexGuard<'_, Recorder> {
        self.0.lock().unwrap()
    }

    /// Queue the replies of the next composer calls.
    pub fn reply(&self, result: ComposerResult) {
        self.recorder().script.push_back(result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.recorder().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.recorder().calls.clear();
    }

    pub fn provisioned(&self) -> usize {
        self.recorder().provisioned
    }

    pub fn set_plain_text(&self, text: &str) {
        self.recorder().plain_text = text.to_string();
    }

    pub fn fail_next_snapshot(&self, error: ComposerError) {
        self.recorder().snapshot_failure = Some(error);
    }

    /// A provider whose composers all report to this mock. Every fresh
    /// composer starts with an empty document.
    pub fn provider(&self) -> ComposerProvider {
        let mock = self.clone();
        Box::new(move || -> Box<dyn ComposerHandle> {
            {
                let mut recorder = mock.recorder();
                recorder.provisioned += 1;
                recorder.plain_text.clear();
            }
            Box::new(MockComposer { mock: mock.clone() })
        })
    }
}

pub struct MockComposer {
    mock: Mock,
}

impl MockComposer {
    fn call(&mut self, call: Call) -> ComposerResult {
        let mut recorder = self.mock.recorder();
        recorder.calls.push(call);
        recorder
            .script
            .pop_front()
            .unwrap_or_else(|| Ok(ComposerUpdate::keep()))
    }
}

impl ComposerHandle for MockComposer {
    fn select(&mut self, start: usize, end: usize) -> ComposerResult {
        self.call(Call::Select(start, end))
    }

    fn replace_text(&mut self, text: String) -> ComposerResult {
        let result = self.call(Call::ReplaceText(text.clone()));
        if result.is_ok() {
            self.mock.recorder().plain_text.push_str(&text);
        }
        result
    }

    fn replace_text_in(&mut self, _text: String, _start: usize, _end: usize) -> ComposerResult {
        self.call(Call::Other("replace_text_in"))
    }

    fn enter(&mut self) -> ComposerResult {
        self.call(Call::Other("enter"))
    }

    fn backspace(&mut self) -> ComposerResult {
        self.call(Call::Other("backspace"))
    }

    fn delete(&mut self) -> ComposerResult {
        self.call(Call::Other("delete"))
    }

    fn delete_in(&mut self, _start: usize, _end: usize) -> ComposerResult {
        self.call(Call::Other("delete_in"))
    }

    fn bold(&mut self) -> ComposerResult {
        self.call(Call::Other("bold"))
    }

    fn italic(&mut self) -> ComposerResult {
        self.call(Call::Other("italic"))
    }

    fn underline(&mut self) -> ComposerResult {
        self.call(Call::Other("underline"))
    }

    fn strike_through(&mut self) -> ComposerResult {
        self.call(Call::Other("strike_through"))
    }

    fn inline_code(&mut self) -> ComposerResult {
        self.call(Call::Other("inline_code"))
    }

    fn ordered_list(&mut self) -> ComposerResult {
        self.call(Call::Other("ordered_list"))
    }

    fn unordered_list(&mut self) -> ComposerResult {
        self.call(Call::Other("unordered_list"))
    }

    fn quote(&mut self) -> ComposerResult {
        self.call(Call::Other("quote"))
    }

    fn code_block(&mut self) -> ComposerResult {
        self.call(Call::Other("code_block"))
    }

    fn indent(&mut self) -> ComposerResult {
        self.call(Call::Other("indent"))
    }

    fn unindent(&mut self) -> ComposerResult {
        self.call(Call::Other("unindent"))
    }

    fn set_link(&mut self, _url: String, _attributes: Vec<(String, String)>) -> ComposerResult {
        self.call(Call::Other("set_link"))
    }

    fn set_link_with_text(
        &mut self,
        _url: String,
        _text: String,
        _attributes: Vec<(String, String)>,
    ) -> ComposerResult {
        self.call(Call::Other("set_link_with_text"))
    }

    fn remove_links(&mut self) -> ComposerResult {
        self.call(Call::Other("remove_links"))
    }

    fn replace_text_suggestion(
        &mut self,
        suggestion: SuggestionPattern,
        new_text: String,
    ) -> ComposerResult {
        self.call(Call::ReplaceTextSuggestion(suggestion, new_text))
    }

    fn set_link_suggestion(
        &mut self,
        url: String,
        text: String,
        suggestion: SuggestionPattern,
        _attributes: Vec<(String, String)>,
    ) -> ComposerResult {
        self.call(Call::SetLinkSuggestion(url, text, suggestion))
    }

    fn set_content_from_html(&mut self, _html: String) -> ComposerResult {
        self.call(Call::Other("set_content_from_html"))
    }

    fn set_content_from_markdown(&mut self, _markdown: String) -> ComposerResult {
        self.call(Call::Other("set_content_from_markdown"))
    }

    fn undo(&mut self) -> ComposerResult {
        self.call(Call::Other("undo"))
    }

    fn redo(&mut self) -> ComposerResult {
        self.call(Call::Other("redo"))
    }

    fn debug_panic(&mut self) -> ComposerResult {
        self.call(Call::DebugPanic)
    }

    fn get_content_as_html(&self) -> String {
        self.mock.recorder().plain_text.clone()
    }

    fn get_content_as_message_html(&self) -> String {
        self.get_content_as_html()
    }

    fn get_content_as_markdown(&self) -> String {
        self.get_content_as_html()
    }

    fn get_content_as_plain_text(&self) -> String {
        self.mock.recorder().plain_text.clone()
    }

    fn action_states(&self) -> HashMap<ComposerAction, ActionState> {
        HashMap::new()
    }

    fn get_link_action(&self) -> LinkAction {
        LinkAction::CreateWithText
    }

    fn snapshot_text(&self) -> Result<String, ComposerError> {
        let mut recorder = self.mock.recorder();
        match recorder.snapshot_failure.take() {
            Some(error) => Err(error),
            None => Ok(recorder.plain_text.clone()),
        }
    }

    fn to_example_format(&self) -> String {
        format!("{}|", self.mock.recorder().plain_text)
    }
}

pub fn internal(reason: &str) -> ComposerResult {
    Err(ComposerError::Internal {
        reason: reason.to_string(),
    })
}

pub fn invalid(reason: &str) -> ComposerResult {
    Err(ComposerError::InvalidArgument {
        reason: reason.to_string(),
    })
}

pub fn pattern(text: &str) -> SuggestionPattern {
    SuggestionPattern {
        key: PatternKey::At,
        text: text.to_string(),
        start: 0,
        end: text.len() + 1,
    }
}

pub fn suggestion(text: &str) -> ComposerResult {
    Ok(ComposerUpdate::keep().with_menu_action(MenuAction::Suggestion(pattern(text))))
}

pub fn dismiss() -> ComposerResult {
    Ok(ComposerUpdate::keep().with_menu_action(MenuAction::None))
}

pub fn replace_all(html: &str, caret: usize) -> ComposerResult {
    Ok(ComposerUpdate {
        text_update: TextUpdate::ReplaceAll {
            replacement_html: html.to_string(),
            start: caret,
            end: caret,
        },
        menu_state: MenuState::Keep,
        menu_action: MenuAction::Keep,
    })
}

pub fn states(states: &[(ComposerAction, ActionState)]) -> ComposerResult {
    Ok(ComposerUpdate::keep().with_menu_state(MenuState::Update(states.iter().copied().collect())))
}
