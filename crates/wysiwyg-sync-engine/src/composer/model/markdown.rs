//! Markdown export and import for [`Document`].
//!
//! Underline has no Markdown syntax and is written as inline `<u>` HTML,
//! which import reads back. Mentions export as plain links.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use super::document::{BlockKind, Cell, Document, DocumentBuilder, Link, Style};

const ESCAPED: &[char] = &['\\', '*', '_', '`', '[', ']', '~'];

pub fn to_markdown(doc: &Document) -> String {
    let blocks = doc.blocks();
    let mut out = String::new();
    // Ordered list counters, one per depth.
    let mut numbers: Vec<usize> = Vec::new();

    for (p, kind) in blocks.iter().copied().enumerate() {
        let previous = p.checked_sub(1).map(|i| blocks[i]);
        match (previous, kind) {
            (None, _) => {}
            (Some(BlockKind::CodeBlock), BlockKind::CodeBlock) => out.push('\n'),
            (Some(BlockKind::CodeBlock), _) => out.push_str("\n```\n\n"),
            (Some(a), b) if a.is_list() && b.is_list() => out.push('\n'),
            (Some(BlockKind::Quote), BlockKind::Quote) => out.push('\n'),
            _ => out.push_str("\n\n"),
        }

        let cells = doc.paragraph_text(p).1;
        match kind {
            BlockKind::Paragraph => {
                numbers.clear();
                write_inline(&mut out, cells);
            }
            BlockKind::Quote => {
                numbers.clear();
                out.push_str("> ");
                write_inline(&mut out, cells);
            }
            BlockKind::CodeBlock => {
                numbers.clear();
                if previous != Some(BlockKind::CodeBlock) {
                    out.push_str("```\n");
                }
                for cell in cells {
                    match cell {
                        Cell::Char(c, _) => out.push(*c),
                        Cell::Mention(mention) => out.push_str(&mention.text),
                        Cell::Break => {}
                    }
                }
            }
            BlockKind::ListItem { ordered, depth } => {
                numbers.truncate(depth + 1);
                numbers.resize(depth + 1, 0);
                if !matches!(previous, Some(BlockKind::ListItem { ordered: o, depth: d }) if d >= depth && (d > depth || o == ordered))
                {
                    numbers[depth] = 0;
                }
                numbers[depth] += 1;

                out.push_str(&" ".repeat(depth * 4));
                if ordered {
                    out.push_str(&format!("{}. ", numbers[depth]));
                } else {
                    out.push_str("- ");
                }
                write_inline(&mut out, cells);
            }
        }
    }
    if blocks.last() == Some(&BlockKind::CodeBlock) {
        out.push_str("\n```");
    }
    out
}

fn write_inline(out: &mut String, cells: &[Cell]) {
    let mut i = 0;
    while i < cells.len() {
        match &cells[i] {
            Cell::Char(_, style) => {
                let mut text = String::new();
                while let Some(Cell::Char(c, s)) = cells.get(i) {
                    if s != style {
                        break;
                    }
                    if !style.inline_code && ESCAPED.contains(c) {
                        text.push('\\');
                    }
                    text.push(*c);
                    i += 1;
                }
                write_styled(out, &text, style);
            }
            Cell::Mention(mention) => {
                out.push_str(&format!("[{}]({})", mention.text, mention.url));
                i += 1;
            }
            Cell::Break => i += 1,
        }
    }
}

fn write_styled(out: &mut String, text: &str, style: &Style) {
    let mut inner = if style.inline_code {
        format!("`{text}`")
    } else {
        text.to_string()
    };
    if style.underline {
        inner = format!("<u>{inner}</u>");
    }
    if style.strike_through {
        inner = format!("~~{inner}~~");
    }
    if style.italic {
        inner = format!("*{inner}*");
    }
    if style.bold {
        inner = format!("**{inner}**");
    }
    if let Some(link) = &style.link {
        inner = format!("[{inner}]({})", link.url);
    }
    out.push_str(&inner);
}

pub fn parse(markdown: &str) -> Document {
    let mut reader = MarkdownReader::default();
    for event in Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH) {
        reader.event(event);
    }
    reader.builder.finish()
}

#[derive(Debug, Default)]
struct MarkdownReader {
    builder: DocumentBuilder,
    bold: usize,
    italic: usize,
    underline: usize,
    strike_through: usize,
    links: Vec<Link>,
    lists: Vec<bool>,
    quote_depth: usize,
    code: Option<String>,
}

impl MarkdownReader {
    fn kind(&self) -> BlockKind {
        if let Some(ordered) = self.lists.last() {
            BlockKind::ListItem {
                ordered: *ordered,
                depth: self.lists.len() - 1,
            }
        } else if self.quote_depth > 0 {
            BlockKind::Quote
        } else {
            BlockKind::Paragraph
        }
    }

    fn style(&self) -> Style {
        Style {
            bold: self.bold > 0,
            italic: self.italic > 0,
            underline: self.underline > 0,
            strike_through: self.strike_through > 0,
            inline_code: false,
            link: self.links.last().cloned(),
        }
    }

    fn push_text(&mut self, text: &str, style: Style) {
        let kind = self.kind();
        self.builder.push_text(text, &style, kind);
    }

    fn event(&mut self, event: Event<'_>) {
        if let Some(code) = &mut self.code {
            match event {
                Event::Text(text) => code.push_str(&text),
                Event::End(TagEnd::CodeBlock) => self.finish_code_block(),
                _ => {}
            }
            return;
        }

        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.push_text(&text, self.style()),
            Event::Code(text) => {
                let mut style = self.style();
                style.inline_code = true;
                self.push_text(&text, style);
            }
            Event::SoftBreak => self.push_text(" ", self.style()),
            Event::HardBreak => {
                let kind = self.kind();
                self.builder.begin_paragraph(kind);
            }
            Event::InlineHtml(html) => match html.trim().to_ascii_lowercase().as_str() {
                "<u>" => self.underline += 1,
                "</u>" => self.underline = self.underline.saturating_sub(1),
                _ => {}
            },
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph | Tag::Heading { .. } => {
                // A loose list item wraps its text in a paragraph.
                if !(self.builder.is_paragraph_open() && self.builder.paragraph_is_empty()) {
                    let kind = self.kind();
                    self.builder.begin_paragraph(kind);
                }
            }
            Tag::List(start) => {
                self.lists.push(start.is_some());
                self.builder.end_paragraph();
            }
            Tag::Item => {
                let kind = self.kind();
                self.builder.begin_paragraph(kind);
            }
            Tag::BlockQuote(_) => {
                self.quote_depth += 1;
                self.builder.end_paragraph();
            }
            Tag::CodeBlock(_) => self.code = Some(String::new()),
            Tag::Strong => self.bold += 1,
            Tag::Emphasis => self.italic += 1,
            Tag::Strikethrough => self.strike_through += 1,
            Tag::Link { dest_url, .. } => self.links.push(Link {
                url: dest_url.to_string(),
                attributes: Vec::new(),
            }),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item => self.builder.end_paragraph(),
            TagEnd::List(_) => {
                self.lists.pop();
                self.builder.end_paragraph();
            }
            TagEnd::BlockQuote(_) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.builder.end_paragraph();
            }
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::Strikethrough => self.strike_through = self.strike_through.saturating_sub(1),
            TagEnd::Link => {
                self.links.pop();
            }
            _ => {}
        }
    }

    fn finish_code_block(&mut self) {
        let Some(code) = self.code.take() else {
            return;
        };
        let code = code.strip_suffix('\n').unwrap_or(&code);
        for line in code.split('\n') {
            self.builder.begin_paragraph(BlockKind::CodeBlock);
            self.builder
                .push_text(line, &Style::default(), BlockKind::CodeBlock);
        }
        self.builder.end_paragraph();
    }
}
