//! The result of a single composer operation.
//!
//! A [`ComposerUpdate`] carries three facets that are interpreted
//! independently by the synchronization core: what happened to the text,
//! whether toolbar states changed, and whether an autocomplete menu should be
//! shown or dismissed.

use std::collections::HashMap;

use crate::composer::{ActionState, ComposerAction};

/// Trigger character that opened a pending suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKey {
    /// `@` - user mentions
    At,
    /// `#` - room mentions
    Hash,
    /// `/` - slash commands, only recognised at the start of a paragraph
    Slash,
}

impl PatternKey {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '@' => Some(Self::At),
            '#' => Some(Self::Hash),
            '/' => Some(Self::Slash),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::At => '@',
            Self::Hash => '#',
            Self::Slash => '/',
        }
    }
}

/// An in-progress autocomplete trigger.
///
/// `start..end` covers the trigger character and the typed text in composer
/// UTF-16 offsets. The pattern is echoed back to the composer to complete it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SuggestionPattern {
    pub key: PatternKey,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Toolbar state facet.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuState {
    Keep,
    Update(HashMap<ComposerAction, ActionState>),
}

/// Autocomplete menu facet.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuAction {
    /// Leave the current menu and suggestion untouched.
    Keep,
    /// No suggestion applies; dismiss any open menu.
    None,
    Suggestion(SuggestionPattern),
}

/// Text facet.
#[derive(Debug, Clone, PartialEq)]
pub enum TextUpdate {
    Keep,
    /// The whole document must be re-rendered from `replacement_html`, then
    /// `start..end` selected.
    ReplaceAll {
        replacement_html: String,
        start: usize,
        end: usize,
    },
    /// Only the selection moved.
    Select { start: usize, end: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposerUpdate {
    pub text_update: TextUpdate,
    pub menu_state: MenuState,
    pub menu_action: MenuAction,
}

impl ComposerUpdate {
    /// An update that changes nothing.
    pub fn keep() -> Self {
        Self {
            text_update: TextUpdate::Keep,
            menu_state: MenuState::Keep,
            menu_action: MenuAction::Keep,
        }
    }

    pub fn update_menu_state(menu_state: MenuState, menu_action: MenuAction) -> Self {
        Self {
            text_update: TextUpdate::Keep,
            menu_state,
            menu_action,
        }
    }

    pub fn select(
        start: usize,
        end: usize,
        menu_state: MenuState,
        menu_action: MenuAction,
    ) -> Self {
        Self {
            text_update: TextUpdate::Select { start, end },
            menu_state,
            menu_action,
        }
    }

    pub fn replace_all(
        replacement_html: String,
        start: usize,
        end: usize,
        menu_state: MenuState,
        menu_action: MenuAction,
    ) -> Self {
        Self {
            text_update: TextUpdate::ReplaceAll {
                replacement_html,
                start,
                end,
            },
            menu_state,
            menu_action,
        }
    }

    pub fn with_menu_action(mut self, menu_action: MenuAction) -> Self {
        self.menu_action = menu_action;
        self
    }

    pub fn with_menu_state(mut self, menu_state: MenuState) -> Self {
        self.menu_state = menu_state;
        self
    }
}
