//! Flat document storage for [`RichTextComposer`](super::RichTextComposer).
//!
//! The document is a flat list of [`Cell`]s. Paragraphs are separated by
//! [`Cell::Break`] and each paragraph has exactly one [`BlockKind`], so
//! `blocks.len() == breaks + 1` always holds.
//!
//! Offsets exposed to the outside are UTF-16 code units: a character counts
//! its UTF-16 width, a mention and a paragraph break count one each.

use std::ops::Range;

use crate::composer::InlineFormat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike_through: bool,
    pub inline_code: bool,
    pub link: Option<Link>,
}

impl Style {
    pub fn has(&self, format: InlineFormat) -> bool {
        match format {
            InlineFormat::Bold => self.bold,
            InlineFormat::Italic => self.italic,
            InlineFormat::Underline => self.underline,
            InlineFormat::StrikeThrough => self.strike_through,
            InlineFormat::InlineCode => self.inline_code,
        }
    }

    pub fn set(&mut self, format: InlineFormat, on: bool) {
        let flag = match format {
            InlineFormat::Bold => &mut self.bold,
            InlineFormat::Italic => &mut self.italic,
            InlineFormat::Underline => &mut self.underline,
            InlineFormat::StrikeThrough => &mut self.strike_through,
            InlineFormat::InlineCode => &mut self.inline_code,
        };
        *flag = on;
    }

    pub fn formats(&self) -> impl Iterator<Item = InlineFormat> + '_ {
        InlineFormat::ALL.into_iter().filter(|f| self.has(*f))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub url: String,
    pub text: String,
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Char(char, Style),
    Mention(Mention),
    Break,
}

impl Cell {
    pub fn width(&self) -> usize {
        match self {
            Cell::Char(c, _) => c.len_utf16(),
            Cell::Mention(_) | Cell::Break => 1,
        }
    }

    pub fn style(&self) -> Option<&Style> {
        match self {
            Cell::Char(_, style) => Some(style),
            _ => None,
        }
    }

    pub fn is_whitespace(&self) -> bool {
        match self {
            Cell::Char(c, _) => c.is_whitespace(),
            Cell::Break => true,
            Cell::Mention(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    ListItem { ordered: bool, depth: usize },
    Quote,
    CodeBlock,
}

impl BlockKind {
    pub fn is_list(self) -> bool {
        matches!(self, BlockKind::ListItem { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    cells: Vec<Cell>,
    blocks: Vec<BlockKind>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            cells: Vec::new(),
            blocks: vec![BlockKind::Paragraph],
        }
    }
}

impl Document {
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn blocks(&self) -> &[BlockKind] {
        &self.blocks
    }

    /// Length in UTF-16 code units.
    pub fn len(&self) -> usize {
        self.cells.iter().map(Cell::width).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.blocks.len() == 1
    }

    /// Index of the first cell starting at or after `offset`.
    ///
    /// An offset falling between the two halves of a surrogate pair rounds up
    /// past that character.
    pub fn index_at(&self, offset: usize) -> usize {
        let mut pos = 0;
        for (i, cell) in self.cells.iter().enumerate() {
            if pos >= offset {
                return i;
            }
            pos += cell.width();
        }
        self.cells.len()
    }

    pub fn offset_of(&self, index: usize) -> usize {
        self.cells[..index.min(self.cells.len())]
            .iter()
            .map(Cell::width)
            .sum()
    }

    /// Cell index range covering composer offsets `start..end`.
    pub fn index_range(&self, start: usize, end: usize) -> Range<usize> {
        self.index_at(start)..self.index_at(end)
    }

    /// Paragraph containing the cell at `index`. A break belongs to the
    /// paragraph it terminates.
    pub fn paragraph_of(&self, index: usize) -> usize {
        self.cells[..index.min(self.cells.len())]
            .iter()
            .filter(|c| matches!(c, Cell::Break))
            .count()
    }

    /// Cell range of paragraph `p`, excluding its terminating break.
    pub fn paragraph_range(&self, p: usize) -> Range<usize> {
        let mut start = 0;
        let mut seen = 0;
        for (i, cell) in self.cells.iter().enumerate() {
            if matches!(cell, Cell::Break) {
                if seen == p {
                    return start..i;
                }
                seen += 1;
                start = i + 1;
            }
        }
        start..self.cells.len()
    }

    /// Paragraphs touched by the cell range `range`.
    pub fn paragraphs_in(&self, range: Range<usize>) -> Range<usize> {
        let first = self.paragraph_of(range.start);
        let last = self.paragraph_of(range.end);
        first..last + 1
    }

    pub fn block(&self, p: usize) -> BlockKind {
        self.blocks[p.min(self.blocks.len() - 1)]
    }

    pub fn set_block(&mut self, p: usize, kind: BlockKind) {
        if let Some(block) = self.blocks.get_mut(p) {
            *block = kind;
        }
    }

    pub fn cells_mut(&mut self, range: Range<usize>) -> &mut [Cell] {
        &mut self.cells[range]
    }

    /// Replace the cells in `range` with `cells`, keeping one block kind per
    /// paragraph. Paragraphs merged by removed breaks take the kind of the
    /// first one; paragraphs created by inserted breaks copy it.
    pub fn splice(&mut self, range: Range<usize>, cells: Vec<Cell>) {
        let paragraph = self.paragraph_of(range.start);
        let removed = self.cells[range.clone()]
            .iter()
            .filter(|c| matches!(c, Cell::Break))
            .count();
        let inserted = cells.iter().filter(|c| matches!(c, Cell::Break)).count();

        self.cells.splice(range, cells);
        self.blocks.drain(paragraph + 1..paragraph + 1 + removed);
        let kind = self.blocks[paragraph];
        for _ in 0..inserted {
            self.blocks.insert(paragraph + 1, kind);
        }
    }

    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        for cell in &self.cells {
            match cell {
                Cell::Char(c, _) => text.push(*c),
                Cell::Mention(mention) => text.push_str(&mention.text),
                Cell::Break => text.push('\n'),
            }
        }
        text
    }

    /// Plain text of paragraph `p` together with the UTF-16 offset it starts at.
    pub fn paragraph_text(&self, p: usize) -> (usize, &[Cell]) {
        let range = self.paragraph_range(p);
        (self.offset_of(range.start), &self.cells[range])
    }

    pub fn paragraph_count(&self) -> usize {
        self.blocks.len()
    }
}

/// Turn `text` into cells carrying `style`, with `\n` as paragraph breaks.
pub fn cells_from_text(text: &str, style: &Style) -> Vec<Cell> {
    text.chars()
        .filter(|c| *c != '\r')
        .map(|c| match c {
            '\n' => Cell::Break,
            c => Cell::Char(c, style.clone()),
        })
        .collect()
}

/// Incrementally assembles a [`Document`] while importing HTML or Markdown.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    doc: Document,
    started: bool,
    paragraph_open: bool,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new paragraph of `kind`.
    pub fn begin_paragraph(&mut self, kind: BlockKind) {
        if self.started {
            self.doc.cells.push(Cell::Break);
            self.doc.blocks.push(kind);
        } else {
            self.doc.blocks[0] = kind;
            self.started = true;
        }
        self.paragraph_open = true;
    }

    pub fn end_paragraph(&mut self) {
        self.paragraph_open = false;
    }

    pub fn is_paragraph_open(&self) -> bool {
        self.paragraph_open
    }

    /// Whether the open paragraph has no content yet.
    pub fn paragraph_is_empty(&self) -> bool {
        matches!(self.doc.cells.last(), None | Some(Cell::Break))
    }

    /// Append text, opening a paragraph of `kind` first if none is open.
    pub fn push_text(&mut self, text: &str, style: &Style, kind: BlockKind) {
        if !self.paragraph_open {
            self.begin_paragraph(kind);
        }
        self.doc
            .cells
            .extend(text.chars().map(|c| Cell::Char(c, style.clone())));
    }

    pub fn push_mention(&mut self, mention: Mention, kind: BlockKind) {
        if !self.paragraph_open {
            self.begin_paragraph(kind);
        }
        self.doc.cells.push(Cell::Mention(mention));
    }

    pub fn finish(self) -> Document {
        self.doc
    }
}
