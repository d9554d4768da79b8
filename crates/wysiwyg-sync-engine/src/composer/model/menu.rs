use std::collections::HashMap;

use super::RichTextComposer;
use super::document::{BlockKind, Cell};
use crate::composer::{
    ActionState, ComposerAction, InlineFormat, LinkAction, MenuAction, MenuState, PatternKey,
    SuggestionPattern,
};

impl RichTextComposer {
    pub(super) fn compute_action_states(&self) -> HashMap<ComposerAction, ActionState> {
        ComposerAction::ALL
            .into_iter()
            .map(|action| (action, self.action_state(action)))
            .collect()
    }

    /// Action states, or [`MenuState::Keep`] when nothing changed since the
    /// last report.
    pub(super) fn compute_menu_state(&mut self) -> MenuState {
        let states = self.compute_action_states();
        if self.reported_states.as_ref() == Some(&states) {
            return MenuState::Keep;
        }
        self.reported_states = Some(states.clone());
        MenuState::Update(states)
    }

    pub(super) fn action_state(&self, action: ComposerAction) -> ActionState {
        match action {
            ComposerAction::Bold => self.format_state(InlineFormat::Bold),
            ComposerAction::Italic => self.format_state(InlineFormat::Italic),
            ComposerAction::StrikeThrough => self.format_state(InlineFormat::StrikeThrough),
            ComposerAction::Underline => self.format_state(InlineFormat::Underline),
            ComposerAction::InlineCode => self.format_state(InlineFormat::InlineCode),
            ComposerAction::Link => self.link_state(),
            ComposerAction::Undo => available(!self.undo_stack.is_empty()),
            ComposerAction::Redo => available(!self.redo_stack.is_empty()),
            ComposerAction::OrderedList => {
                self.block_state(|k| matches!(k, BlockKind::ListItem { ordered: true, .. }))
            }
            ComposerAction::UnorderedList => {
                self.block_state(|k| matches!(k, BlockKind::ListItem { ordered: false, .. }))
            }
            ComposerAction::CodeBlock => self.block_state(|k| k == BlockKind::CodeBlock),
            ComposerAction::Quote => self.block_state(|k| k == BlockKind::Quote),
            ComposerAction::Indent => available(self.can_indent()),
            ComposerAction::Unindent => available(self.can_unindent()),
        }
    }

    pub(super) fn format_state(&self, format: InlineFormat) -> ActionState {
        if self.in_code_block() {
            return ActionState::Disabled;
        }
        let (start, end) = self.selection();
        let active = if start == end {
            self.style_at_caret(start).has(format)
        } else {
            self.range_has_format(self.doc.index_range(start, end), format)
        };
        reversed_if(active)
    }

    fn link_state(&self) -> ActionState {
        match self.compute_link_action() {
            LinkAction::Disabled => ActionState::Disabled,
            LinkAction::Edit { .. } => ActionState::Reversed,
            LinkAction::Create | LinkAction::CreateWithText => ActionState::Enabled,
        }
    }

    fn block_state(&self, matches: impl Fn(BlockKind) -> bool) -> ActionState {
        reversed_if(
            self.selected_paragraphs()
                .all(|p| matches(self.doc.block(p))),
        )
    }

    fn in_code_block(&self) -> bool {
        self.selected_paragraphs()
            .any(|p| self.doc.block(p) == BlockKind::CodeBlock)
    }

    /// Every selected paragraph is a list item and the first one has a
    /// previous item at least as deep to nest under.
    fn can_indent(&self) -> bool {
        let paragraphs = self.selected_paragraphs();
        let all_items = paragraphs.clone().all(|p| self.doc.block(p).is_list());
        let first = paragraphs.start;
        if !all_items || first == 0 {
            return false;
        }
        match (self.doc.block(first - 1), self.doc.block(first)) {
            (
                BlockKind::ListItem {
                    depth: previous, ..
                },
                BlockKind::ListItem { depth, .. },
            ) => previous >= depth,
            _ => false,
        }
    }

    fn can_unindent(&self) -> bool {
        self.selected_paragraphs()
            .all(|p| matches!(self.doc.block(p), BlockKind::ListItem { depth, .. } if depth > 0))
    }

    pub(super) fn compute_link_action(&self) -> LinkAction {
        if self.in_code_block() {
            return LinkAction::Disabled;
        }
        let (start, end) = self.selection();
        if start == end {
            return match self.link_run_at(start) {
                Some(range) => self.doc.cells()[range]
                    .iter()
                    .find_map(|c| c.style().and_then(|s| s.link.as_ref()))
                    .map(|link| LinkAction::Edit {
                        url: link.url.clone(),
                    })
                    .unwrap_or(LinkAction::CreateWithText),
                None => LinkAction::CreateWithText,
            };
        }
        let range = self.doc.index_range(start, end);
        let existing = self.doc.cells()[range]
            .iter()
            .find_map(|c| c.style().and_then(|s| s.link.as_ref()));
        match existing {
            Some(link) => LinkAction::Edit {
                url: link.url.clone(),
            },
            None => LinkAction::Create,
        }
    }

    /// A suggestion is offered when the caret ends a word starting with a
    /// trigger character. `/` only counts at the start of a paragraph.
    pub(super) fn compute_menu_action(&self) -> MenuAction {
        let (start, end) = self.selection();
        if start != end {
            return MenuAction::None;
        }
        let cells = self.doc.cells();
        let index = self.doc.index_at(start);
        let paragraph = self.doc.paragraph_of(index);
        if self.doc.block(paragraph) == BlockKind::CodeBlock {
            return MenuAction::None;
        }
        let paragraph_start = self.doc.paragraph_range(paragraph).start;

        let mut first = index;
        while first > paragraph_start {
            match &cells[first - 1] {
                Cell::Char(c, style) if !c.is_whitespace() && !style.inline_code => first -= 1,
                _ => break,
            }
        }
        if first == index {
            return MenuAction::None;
        }
        let Cell::Char(trigger, _) = &cells[first] else {
            return MenuAction::None;
        };
        let Some(key) = PatternKey::from_char(*trigger) else {
            return MenuAction::None;
        };
        if key == PatternKey::Slash && first != paragraph_start {
            return MenuAction::None;
        }

        let text = cells[first + 1..index]
            .iter()
            .filter_map(|c| match c {
                Cell::Char(c, _) => Some(*c),
                _ => None,
            })
            .collect();
        MenuAction::Suggestion(SuggestionPattern {
            key,
            text,
            start: self.doc.offset_of(first),
            end: start,
        })
    }
}

fn available(enabled: bool) -> ActionState {
    if enabled {
        ActionState::Enabled
    } else {
        ActionState::Disabled
    }
}

fn reversed_if(active: bool) -> ActionState {
    if active {
        ActionState::Reversed
    } else {
        ActionState::Enabled
    }
}
