use crate::composer::{MenuAction, SuggestionPattern};

/// The pending suggestion offered by the latest menu action, if any.
///
/// Only a menu-action facet changes it: [`MenuAction::Suggestion`] replaces
/// the pattern, [`MenuAction::None`] supersedes it and [`MenuAction::Keep`]
/// leaves it alone. Commands that complete a suggestion read it without
/// clearing it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionContext {
    pattern: Option<SuggestionPattern>,
}

impl SuggestionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pattern(&self) -> Option<&SuggestionPattern> {
        self.pattern.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.pattern.is_some()
    }

    /// Apply a menu-action facet. Returns whether the menu-action listener
    /// has to be told about it.
    pub fn apply(&mut self, action: &MenuAction) -> bool {
        match action {
            MenuAction::Keep => false,
            MenuAction::None => {
                self.pattern = None;
                true
            }
            MenuAction::Suggestion(pattern) => {
                self.pattern = Some(pattern.clone());
                true
            }
        }
    }
}
