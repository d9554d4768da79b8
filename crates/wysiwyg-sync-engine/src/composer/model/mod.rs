//! # In-memory formatting engine
//!
//! [`RichTextComposer`] is the concrete [`ComposerHandle`] shipped with the
//! engine. It keeps a flat [`Document`] of styled cells, a selection in
//! UTF-16 code units, snapshot-based undo/redo history and the last action
//! states it reported, so that unchanged toolbar state is sent as
//! [`MenuState::Keep`](crate::composer::MenuState::Keep).
//!
//! - **`document`**: cell storage and paragraph bookkeeping
//! - **`html`**: display/message HTML export and HTML import
//! - **`markdown`**: Markdown export and import (via `pulldown-cmark`)
//! - **`menu`**: action states, link action and suggestion detection

use std::collections::HashMap;

use crate::composer::{
    ActionState, ComposerAction, ComposerError, ComposerHandle, ComposerResult, ComposerUpdate,
    InlineFormat, LinkAction, MenuAction, SuggestionPattern,
};

pub mod document;
pub mod html;
pub mod markdown;
mod menu;

use document::{BlockKind, Cell, Document, Link, Mention, Style, cells_from_text};

/// Upper bound on remembered undo steps.
const MAX_HISTORY: usize = 200;

#[derive(Debug, Clone)]
struct HistoryEntry {
    doc: Document,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RichTextComposer {
    doc: Document,
    start: usize,
    end: usize,
    /// Formats toggled at a collapsed caret, applied to the next typed text.
    toggled: Vec<InlineFormat>,
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    reported_states: Option<HashMap<ComposerAction, ActionState>>,
}

impl RichTextComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a composer from HTML, with the caret at the end.
    pub fn from_html(html: &str) -> Result<Self, ComposerError> {
        let mut composer = Self::new();
        composer.doc = html::parse(html)?;
        composer.start = composer.doc.len();
        composer.end = composer.start;
        Ok(composer)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Current selection, ordered and clamped to the document.
    pub fn selection(&self) -> (usize, usize) {
        let len = self.doc.len();
        let (start, end) = if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        };
        (start.min(len), end.min(len))
    }

    /// Move an offset that splits a surrogate pair to the end of that
    /// character.
    fn snap(&self, offset: usize) -> usize {
        self.doc.offset_of(self.doc.index_at(offset))
    }

    fn check_range(&self, start: usize, end: usize) -> Result<(usize, usize), ComposerError> {
        let (start, end) = if start <= end {
            (start, end)
        } else {
            (end, start)
        };
        let len = self.doc.len();
        if end > len {
            return Err(ComposerError::invalid(format!(
                "range {start}..{end} is outside the document (length {len})"
            )));
        }
        Ok((self.snap(start), self.snap(end)))
    }

    fn check_suggestion(
        &self,
        suggestion: &SuggestionPattern,
    ) -> Result<(usize, usize), ComposerError> {
        if suggestion.start > suggestion.end || suggestion.end > self.doc.len() {
            return Err(ComposerError::invalid(format!(
                "suggestion {}..{} does not match the document",
                suggestion.start, suggestion.end
            )));
        }
        Ok((self.snap(suggestion.start), self.snap(suggestion.end)))
    }

    fn push_state_to_history(&mut self) {
        self.undo_stack.push(HistoryEntry {
            doc: self.doc.clone(),
            start: self.start,
            end: self.end,
        });
        if self.undo_stack.len() > MAX_HISTORY {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    fn restore(&mut self, entry: HistoryEntry) -> HistoryEntry {
        let current = HistoryEntry {
            doc: std::mem::replace(&mut self.doc, entry.doc),
            start: self.start,
            end: self.end,
        };
        self.start = entry.start;
        self.end = entry.end;
        self.toggled.clear();
        current
    }

    /// Style typed text at `offset` picks up: the character before it in the
    /// same paragraph, otherwise the one after. Links only continue when the
    /// caret sits strictly inside them.
    fn style_at_caret(&self, offset: usize) -> Style {
        let cells = self.doc.cells();
        let index = self.doc.index_at(offset);
        let before = index.checked_sub(1).and_then(|i| cells[i].style());
        let after = cells.get(index).and_then(Cell::style);

        let mut style = match (before, after) {
            (Some(style), _) | (None, Some(style)) => style.clone(),
            (None, None) => Style::default(),
        };
        let inside_link = matches!(
            (before, after),
            (Some(b), Some(a)) if b.link.is_some() && b.link == a.link
        );
        if !inside_link {
            style.link = None;
        }
        for format in &self.toggled {
            style.set(*format, !style.has(*format));
        }
        if self.doc.block(self.doc.paragraph_of(index)) == BlockKind::CodeBlock {
            style = Style::default();
        }
        style
    }

    fn do_replace_text_in(&mut self, text: &str, start: usize, end: usize) {
        let style = self.style_at_caret(start);
        let cells = cells_from_text(text, &style);
        let inserted: usize = cells.iter().map(Cell::width).sum();
        let range = self.doc.index_range(start, end);
        self.doc.splice(range, cells);
        self.start = start + inserted;
        self.end = self.start;
        self.toggled.clear();
    }

    fn do_replace_text(&mut self, text: &str) {
        let (start, end) = self.selection();
        self.do_replace_text_in(text, start, end);
    }

    fn create_update_replace_all(&mut self) -> ComposerUpdate {
        let menu_state = self.compute_menu_state();
        let menu_action = self.compute_menu_action();
        let (start, end) = self.selection();
        ComposerUpdate::replace_all(
            html::to_html(&self.doc, html::Flavor::Display),
            start,
            end,
            menu_state,
            menu_action,
        )
    }

    fn create_update_select(&mut self) -> ComposerUpdate {
        let menu_state = self.compute_menu_state();
        let menu_action = self.compute_menu_action();
        let (start, end) = self.selection();
        ComposerUpdate::select(start, end, menu_state, menu_action)
    }

    fn selected_paragraphs(&self) -> std::ops::Range<usize> {
        let (start, end) = self.selection();
        self.doc.paragraphs_in(self.doc.index_range(start, end))
    }

    fn toggle_format(&mut self, format: InlineFormat) -> ComposerResult {
        if self.format_state(format) == ActionState::Disabled {
            return Ok(ComposerUpdate::keep());
        }
        let (start, end) = self.selection();
        if start == end {
            match self.toggled.iter().position(|f| *f == format) {
                Some(i) => {
                    self.toggled.remove(i);
                }
                None => self.toggled.push(format),
            }
            let menu_state = self.compute_menu_state();
            return Ok(ComposerUpdate::update_menu_state(
                menu_state,
                MenuAction::Keep,
            ));
        }

        let range = self.doc.index_range(start, end);
        let all_set = self.range_has_format(range.clone(), format);
        self.push_state_to_history();
        for cell in self.doc.cells_mut(range) {
            if let Cell::Char(_, style) = cell {
                style.set(format, !all_set);
            }
        }
        Ok(self.create_update_replace_all())
    }

    fn range_has_format(&self, range: std::ops::Range<usize>, format: InlineFormat) -> bool {
        let mut styles = self.doc.cells()[range].iter().filter_map(Cell::style).peekable();
        styles.peek().is_some() && styles.all(|s| s.has(format))
    }

    fn toggle_block(&mut self, target: BlockKind) -> ComposerResult {
        let paragraphs = self.selected_paragraphs();
        let same_kind = |kind: BlockKind| match (kind, target) {
            (BlockKind::ListItem { ordered: a, .. }, BlockKind::ListItem { ordered: b, .. }) => {
                a == b
            }
            (kind, target) => kind == target,
        };
        let all_set = paragraphs.clone().all(|p| same_kind(self.doc.block(p)));

        self.push_state_to_history();
        for p in paragraphs {
            let new_kind = match (all_set, self.doc.block(p), target) {
                (true, _, _) => BlockKind::Paragraph,
                (
                    false,
                    BlockKind::ListItem { depth, .. },
                    BlockKind::ListItem { ordered, .. },
                ) => BlockKind::ListItem { ordered, depth },
                (false, _, target) => target,
            };
            self.doc.set_block(p, new_kind);
        }
        Ok(self.create_update_replace_all())
    }

    fn change_depth(&mut self, action: ComposerAction, delta: isize) -> ComposerResult {
        if self.action_state(action) == ActionState::Disabled {
            return Ok(ComposerUpdate::keep());
        }
        self.push_state_to_history();
        for p in self.selected_paragraphs() {
            if let BlockKind::ListItem { ordered, depth } = self.doc.block(p) {
                let depth = depth.saturating_add_signed(delta);
                self.doc.set_block(p, BlockKind::ListItem { ordered, depth });
            }
        }
        Ok(self.create_update_replace_all())
    }

    /// Cell range of the link touching `offset`, preferring the one before it.
    fn link_run_at(&self, offset: usize) -> Option<std::ops::Range<usize>> {
        let cells = self.doc.cells();
        let index = self.doc.index_at(offset);
        let link_of = |i: usize| cells.get(i).and_then(Cell::style).and_then(|s| s.link.as_ref());

        let anchor = index
            .checked_sub(1)
            .filter(|i| link_of(*i).is_some())
            .or_else(|| link_of(index).map(|_| index))?;
        let link = link_of(anchor)?;

        let mut first = anchor;
        while first > 0 && link_of(first - 1) == Some(link) {
            first -= 1;
        }
        let mut last = anchor + 1;
        while link_of(last) == Some(link) {
            last += 1;
        }
        Some(first..last)
    }

    fn set_link_on(&mut self, range: std::ops::Range<usize>, link: Option<Link>) {
        for cell in self.doc.cells_mut(range) {
            if let Cell::Char(_, style) = cell {
                style.link = link.clone();
            }
        }
    }
}

impl ComposerHandle for RichTextComposer {
    fn select(&mut self, start: usize, end: usize) -> ComposerResult {
        let len = self.doc.len();
        let (start, end) = if start <= end {
            (start, end)
        } else {
            (end, start)
        };
        let (start, end) = (self.snap(start.min(len)), self.snap(end.min(len)));
        if (start, end) != (self.start, self.end) {
            self.toggled.clear();
        }
        self.start = start;
        self.end = end;
        Ok(self.create_update_select())
    }

    fn replace_text(&mut self, text: String) -> ComposerResult {
        self.push_state_to_history();
        self.do_replace_text(&text);
        Ok(self.create_update_replace_all())
    }

    fn replace_text_in(&mut self, text: String, start: usize, end: usize) -> ComposerResult {
        let (start, end) = self.check_range(start, end)?;
        self.push_state_to_history();
        self.do_replace_text_in(&text, start, end);
        Ok(self.create_update_replace_all())
    }

    fn enter(&mut self) -> ComposerResult {
        let (start, end) = self.selection();
        let paragraph = self.doc.paragraph_of(self.doc.index_at(start));
        let kind = self.doc.block(paragraph);
        let leaves_block = start == end
            && matches!(kind, BlockKind::ListItem { .. } | BlockKind::Quote)
            && self.doc.paragraph_range(paragraph).is_empty();

        self.push_state_to_history();
        if leaves_block {
            self.doc.set_block(paragraph, BlockKind::Paragraph);
        } else {
            self.do_replace_text_in("\n", start, end);
        }
        Ok(self.create_update_replace_all())
    }

    fn backspace(&mut self) -> ComposerResult {
        let (start, end) = self.selection();
        if start != end {
            self.push_state_to_history();
            self.do_replace_text_in("", start, end);
            return Ok(self.create_update_replace_all());
        }

        let index = self.doc.index_at(start);
        let paragraph = self.doc.paragraph_of(index);
        let at_paragraph_start = self.doc.paragraph_range(paragraph).start == index;
        if at_paragraph_start && self.doc.block(paragraph) != BlockKind::Paragraph {
            // Backspace at the start of a formatted block removes the block
            // formatting before it joins paragraphs.
            self.push_state_to_history();
            self.doc.set_block(paragraph, BlockKind::Paragraph);
            return Ok(self.create_update_replace_all());
        }
        if index == 0 {
            return Ok(ComposerUpdate::keep());
        }

        let previous = self.doc.offset_of(index - 1);
        self.push_state_to_history();
        self.do_replace_text_in("", previous, start);
        Ok(self.create_update_replace_all())
    }

    fn delete(&mut self) -> ComposerResult {
        let (start, end) = self.selection();
        if start != end {
            self.push_state_to_history();
            self.do_replace_text_in("", start, end);
            return Ok(self.create_update_replace_all());
        }

        let index = self.doc.index_at(start);
        if index >= self.doc.cells().len() {
            return Ok(ComposerUpdate::keep());
        }
        let next = self.doc.offset_of(index + 1);
        self.push_state_to_history();
        self.do_replace_text_in("", start, next);
        Ok(self.create_update_replace_all())
    }

    fn delete_in(&mut self, start: usize, end: usize) -> ComposerResult {
        let (start, end) = self.check_range(start, end)?;
        if start == end {
            return Ok(ComposerUpdate::keep());
        }
        self.push_state_to_history();
        self.do_replace_text_in("", start, end);
        Ok(self.create_update_replace_all())
    }

    fn bold(&mut self) -> ComposerResult {
        self.toggle_format(InlineFormat::Bold)
    }

    fn italic(&mut self) -> ComposerResult {
        self.toggle_format(InlineFormat::Italic)
    }

    fn underline(&mut self) -> ComposerResult {
        self.toggle_format(InlineFormat::Underline)
    }

    fn strike_through(&mut self) -> ComposerResult {
        self.toggle_format(InlineFormat::StrikeThrough)
    }

    fn inline_code(&mut self) -> ComposerResult {
        self.toggle_format(InlineFormat::InlineCode)
    }

    fn ordered_list(&mut self) -> ComposerResult {
        self.toggle_block(BlockKind::ListItem {
            ordered: true,
            depth: 0,
        })
    }

    fn unordered_list(&mut self) -> ComposerResult {
        self.toggle_block(BlockKind::ListItem {
            ordered: false,
            depth: 0,
        })
    }

    fn quote(&mut self) -> ComposerResult {
        self.toggle_block(BlockKind::Quote)
    }

    fn code_block(&mut self) -> ComposerResult {
        self.toggle_block(BlockKind::CodeBlock)
    }

    fn indent(&mut self) -> ComposerResult {
        self.change_depth(ComposerAction::Indent, 1)
    }

    fn unindent(&mut self) -> ComposerResult {
        self.change_depth(ComposerAction::Unindent, -1)
    }

    fn set_link(&mut self, url: String, attributes: Vec<(String, String)>) -> ComposerResult {
        let (start, end) = self.selection();
        let range = if start != end {
            self.doc.index_range(start, end)
        } else {
            match self.link_run_at(start) {
                Some(range) => range,
                None => return Ok(ComposerUpdate::keep()),
            }
        };
        if self.doc.cells()[range.clone()].iter().all(|c| c.style().is_none()) {
            return Ok(ComposerUpdate::keep());
        }
        self.push_state_to_history();
        self.set_link_on(range, Some(Link { url, attributes }));
        Ok(self.create_update_replace_all())
    }

    fn set_link_with_text(
        &mut self,
        url: String,
        text: String,
        attributes: Vec<(String, String)>,
    ) -> ComposerResult {
        if text.is_empty() {
            return Err(ComposerError::invalid("link text must not be empty"));
        }
        let (start, end) = self.selection();
        let mut style = self.style_at_caret(start);
        style.link = Some(Link { url, attributes });
        let cells = cells_from_text(&text, &style);
        let inserted: usize = cells.iter().map(Cell::width).sum();

        self.push_state_to_history();
        let range = self.doc.index_range(start, end);
        self.doc.splice(range, cells);
        self.start = start + inserted;
        self.end = self.start;
        self.toggled.clear();
        Ok(self.create_update_replace_all())
    }

    fn remove_links(&mut self) -> ComposerResult {
        let (start, end) = self.selection();
        let range = if start != end {
            self.doc.index_range(start, end)
        } else {
            match self.link_run_at(start) {
                Some(range) => range,
                None => return Ok(ComposerUpdate::keep()),
            }
        };
        let has_link = self.doc.cells()[range.clone()]
            .iter()
            .filter_map(Cell::style)
            .any(|s| s.link.is_some());
        if !has_link {
            return Ok(ComposerUpdate::keep());
        }
        self.push_state_to_history();
        self.set_link_on(range, None);
        Ok(self.create_update_replace_all())
    }

    fn replace_text_suggestion(
        &mut self,
        suggestion: SuggestionPattern,
        new_text: String,
    ) -> ComposerResult {
        let (start, end) = self.check_suggestion(&suggestion)?;
        self.push_state_to_history();
        self.do_replace_text_in(&new_text, start, end);
        self.do_replace_text(" ");
        Ok(self.create_update_replace_all())
    }

    fn set_link_suggestion(
        &mut self,
        url: String,
        text: String,
        suggestion: SuggestionPattern,
        attributes: Vec<(String, String)>,
    ) -> ComposerResult {
        let (start, end) = self.check_suggestion(&suggestion)?;
        self.push_state_to_history();
        self.do_replace_text_in("", start, end);

        let index = self.doc.index_at(start);
        self.doc.splice(
            index..index,
            vec![Cell::Mention(Mention {
                url,
                text,
                attributes,
            })],
        );
        self.start = start + 1;
        self.end = self.start;

        let followed_by_space = matches!(
            self.doc.cells().get(index + 1),
            Some(Cell::Char(c, _)) if c.is_whitespace()
        );
        if !followed_by_space {
            self.do_replace_text(" ");
        }
        Ok(self.create_update_replace_all())
    }

    fn set_content_from_html(&mut self, html: String) -> ComposerResult {
        let doc = html::parse(&html)?;
        self.push_state_to_history();
        self.doc = doc;
        self.start = self.doc.len();
        self.end = self.start;
        self.toggled.clear();
        Ok(self.create_update_replace_all())
    }

    fn set_content_from_markdown(&mut self, markdown: String) -> ComposerResult {
        self.push_state_to_history();
        self.doc = markdown::parse(&markdown);
        self.start = self.doc.len();
        self.end = self.start;
        self.toggled.clear();
        Ok(self.create_update_replace_all())
    }

    fn undo(&mut self) -> ComposerResult {
        let Some(entry) = self.undo_stack.pop() else {
            return Ok(ComposerUpdate::keep());
        };
        let current = self.restore(entry);
        self.redo_stack.push(current);
        Ok(self.create_update_replace_all())
    }

    fn redo(&mut self) -> ComposerResult {
        let Some(entry) = self.redo_stack.pop() else {
            return Ok(ComposerUpdate::keep());
        };
        let current = self.restore(entry);
        self.undo_stack.push(current);
        Ok(self.create_update_replace_all())
    }

    fn debug_panic(&mut self) -> ComposerResult {
        panic!("debug_panic() called: forcing an internal composer failure")
    }

    fn get_content_as_html(&self) -> String {
        html::to_html(&self.doc, html::Flavor::Display)
    }

    fn get_content_as_message_html(&self) -> String {
        html::to_html(&self.doc, html::Flavor::Message)
    }

    fn get_content_as_markdown(&self) -> String {
        markdown::to_markdown(&self.doc)
    }

    fn get_content_as_plain_text(&self) -> String {
        self.doc.plain_text()
    }

    fn action_states(&self) -> HashMap<ComposerAction, ActionState> {
        self.compute_action_states()
    }

    fn get_link_action(&self) -> LinkAction {
        self.compute_link_action()
    }

    fn to_example_format(&self) -> String {
        let (start, end) = self.selection();
        let mut out = String::new();
        let mut offset = 0;
        let mark = |out: &mut String, offset: usize| {
            if start == end && offset == start {
                out.push('|');
            } else if start != end && offset == start {
                out.push('{');
            } else if start != end && offset == end {
                out.push_str("}|");
            }
        };
        for cell in self.doc.cells() {
            mark(&mut out, offset);
            match cell {
                Cell::Char(c, _) => out.push(*c),
                Cell::Mention(mention) => out.push_str(&mention.text),
                Cell::Break => out.push('\n'),
            }
            offset += cell.width();
        }
        mark(&mut out, offset);
        out
    }
}
