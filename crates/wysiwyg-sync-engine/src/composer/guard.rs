use std::any::Any;
use std::cell::Cell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use crate::composer::{
    ActionState, ComposerAction, ComposerError, ComposerHandle, ComposerResult, LinkAction,
    SuggestionPattern,
};

/// Wraps a composer and converts panics raised inside it into
/// [`ComposerError::Internal`].
///
/// Once a panic has been caught the inner engine may hold half-applied state,
/// so every later mutation is refused with another panic-class error until
/// the guard is dropped and replaced. A panic while reading poisons the guard
/// too; the read itself falls back to an empty value.
pub struct PanicGuard<C> {
    inner: C,
    poisoned: Cell<bool>,
}

impl<C: ComposerHandle> PanicGuard<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            poisoned: Cell::new(false),
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.get()
    }

    fn poisoned_error(op: &str) -> ComposerError {
        ComposerError::Internal {
            reason: format!("{op}: composer was poisoned by an earlier panic"),
        }
    }

    fn run<F>(&mut self, op: &'static str, f: F) -> ComposerResult
    where
        F: FnOnce(&mut C) -> ComposerResult,
    {
        if self.poisoned.get() {
            return Err(Self::poisoned_error(op));
        }
        let inner = &mut self.inner;
        match panic::catch_unwind(AssertUnwindSafe(|| f(inner))) {
            Ok(result) => result,
            Err(payload) => {
                self.poisoned.set(true);
                let reason = format!("{op}: {}", panic_message(payload.as_ref()));
                log::error!("Composer panicked in {reason}");
                Err(ComposerError::Internal { reason })
            }
        }
    }

    fn try_read<T, F>(&self, op: &'static str, f: F) -> Result<T, ComposerError>
    where
        F: FnOnce(&C) -> T,
    {
        let inner = &self.inner;
        panic::catch_unwind(AssertUnwindSafe(|| f(inner))).map_err(|payload| {
            self.poisoned.set(true);
            let reason = format!("reading {op}: {}", panic_message(payload.as_ref()));
            log::error!("Composer panicked while {reason}");
            ComposerError::Internal { reason }
        })
    }

    fn read<T, F>(&self, op: &'static str, f: F) -> T
    where
        T: Default,
        F: FnOnce(&C) -> T,
    {
        self.try_read(op, f).unwrap_or_default()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl<C: ComposerHandle> ComposerHandle for PanicGuard<C> {
    fn select(&mut self, start: usize, end: usize) -> ComposerResult {
        self.run("select", |c| c.select(start, end))
    }

    fn replace_text(&mut self, text: String) -> ComposerResult {
        self.run("replace_text", |c| c.replace_text(text))
    }

    fn replace_text_in(&mut self, text: String, start: usize, end: usize) -> ComposerResult {
        self.run("replace_text_in", |c| c.replace_text_in(text, start, end))
    }

    fn enter(&mut self) -> ComposerResult {
        self.run("enter", |c| c.enter())
    }

    fn backspace(&mut self) -> ComposerResult {
        self.run("backspace", |c| c.backspace())
    }

    fn delete(&mut self) -> ComposerResult {
        self.run("delete", |c| c.delete())
    }

    fn delete_in(&mut self, start: usize, end: usize) -> ComposerResult {
        self.run("delete_in", |c| c.delete_in(start, end))
    }

    fn bold(&mut self) -> ComposerResult {
        self.run("bold", |c| c.bold())
    }

    fn italic(&mut self) -> ComposerResult {
        self.run("italic", |c| c.italic())
    }

    fn underline(&mut self) -> ComposerResult {
        self.run("underline", |c| c.underline())
    }

    fn strike_through(&mut self) -> ComposerResult {
        self.run("strike_through", |c| c.strike_through())
    }

    fn inline_code(&mut self) -> ComposerResult {
        self.run("inline_code", |c| c.inline_code())
    }

    fn ordered_list(&mut self) -> ComposerResult {
        self.run("ordered_list", |c| c.ordered_list())
    }

    fn unordered_list(&mut self) -> ComposerResult {
        self.run("unordered_list", |c| c.unordered_list())
    }

    fn quote(&mut self) -> ComposerResult {
        self.run("quote", |c| c.quote())
    }

    fn code_block(&mut self) -> ComposerResult {
        self.run("code_block", |c| c.code_block())
    }

    fn indent(&mut self) -> ComposerResult {
        self.run("indent", |c| c.indent())
    }

    fn unindent(&mut self) -> ComposerResult {
        self.run("unindent", |c| c.unindent())
    }

    fn set_link(&mut self, url: String, attributes: Vec<(String, String)>) -> ComposerResult {
        self.run("set_link", |c| c.set_link(url, attributes))
    }

    fn set_link_with_text(
        &mut self,
        url: String,
        text: String,
        attributes: Vec<(String, String)>,
    ) -> ComposerResult {
        self.run("set_link_with_text", |c| {
            c.set_link_with_text(url, text, attributes)
        })
    }

    fn remove_links(&mut self) -> ComposerResult {
        self.run("remove_links", |c| c.remove_links())
    }

    fn replace_text_suggestion(
        &mut self,
        suggestion: SuggestionPattern,
        new_text: String,
    ) -> ComposerResult {
        self.run("replace_text_suggestion", |c| {
            c.replace_text_suggestion(suggestion, new_text)
        })
    }

    fn set_link_suggestion(
        &mut self,
        url: String,
        text: String,
        suggestion: SuggestionPattern,
        attributes: Vec<(String, String)>,
    ) -> ComposerResult {
        self.run("set_link_suggestion", |c| {
            c.set_link_suggestion(url, text, suggestion, attributes)
        })
    }

    fn set_content_from_html(&mut self, html: String) -> ComposerResult {
        self.run("set_content_from_html", |c| c.set_content_from_html(html))
    }

    fn set_content_from_markdown(&mut self, markdown: String) -> ComposerResult {
        self.run("set_content_from_markdown", |c| {
            c.set_content_from_markdown(markdown)
        })
    }

    fn undo(&mut self) -> ComposerResult {
        self.run("undo", |c| c.undo())
    }

    fn redo(&mut self) -> ComposerResult {
        self.run("redo", |c| c.redo())
    }

    fn debug_panic(&mut self) -> ComposerResult {
        self.run("debug_panic", |c| c.debug_panic())
    }

    fn get_content_as_html(&self) -> String {
        self.read("html", |c| c.get_content_as_html())
    }

    fn get_content_as_message_html(&self) -> String {
        self.read("message html", |c| c.get_content_as_message_html())
    }

    fn get_content_as_markdown(&self) -> String {
        self.read("markdown", |c| c.get_content_as_markdown())
    }

    fn get_content_as_plain_text(&self) -> String {
        self.read("plain text", |c| c.get_content_as_plain_text())
    }

    fn action_states(&self) -> HashMap<ComposerAction, ActionState> {
        self.read("action states", |c| c.action_states())
    }

    fn get_link_action(&self) -> LinkAction {
        self.try_read("link action", |c| c.get_link_action())
            .unwrap_or(LinkAction::Disabled)
    }

    fn snapshot_text(&self) -> Result<String, ComposerError> {
        if self.poisoned.get() {
            return Err(Self::poisoned_error("snapshot_text"));
        }
        self.try_read("plain text", |c| c.snapshot_text())?
    }

    fn to_example_format(&self) -> String {
        self.read("example format", |c| c.to_example_format())
    }
}
