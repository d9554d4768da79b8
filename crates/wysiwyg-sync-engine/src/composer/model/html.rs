//! HTML export and import for [`Document`].
//!
//! Export produces two flavors: display HTML keeps mention pills
//! non-editable for the editor view, message HTML is what gets sent.
//! Import understands the tags export emits (plus their common aliases such
//! as `<b>` and `<i>`); unknown tags are skipped, their text kept.

use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};

use super::document::{BlockKind, Cell, Document, DocumentBuilder, Link, Mention, Style};
use crate::composer::{ComposerError, ContentFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// HTML for the editor view.
    Display,
    /// HTML for sending as a message.
    Message,
}

pub fn to_html(doc: &Document, flavor: Flavor) -> String {
    let mut out = String::new();
    let blocks = doc.blocks();

    // A lone plain paragraph is emitted without a wrapper.
    if blocks == [BlockKind::Paragraph] {
        write_inline(&mut out, doc.paragraph_text(0).1, flavor);
        return out;
    }

    // Open list levels, innermost last; each level has an open <li>.
    let mut lists: Vec<bool> = Vec::new();
    let mut p = 0;
    while p < blocks.len() {
        match blocks[p] {
            BlockKind::ListItem { ordered, depth } => {
                while lists.len() > depth + 1 {
                    close_list(&mut out, &mut lists);
                }
                if lists.len() == depth + 1 && lists[depth] != ordered {
                    close_list(&mut out, &mut lists);
                }
                if lists.len() == depth + 1 {
                    out.push_str("</li><li>");
                }
                while lists.len() < depth + 1 {
                    out.push_str(if ordered { "<ol><li>" } else { "<ul><li>" });
                    lists.push(ordered);
                }
                write_inline(&mut out, doc.paragraph_text(p).1, flavor);
                p += 1;
            }
            BlockKind::Paragraph => {
                close_all_lists(&mut out, &mut lists);
                out.push_str("<p>");
                write_inline(&mut out, doc.paragraph_text(p).1, flavor);
                out.push_str("</p>");
                p += 1;
            }
            BlockKind::Quote => {
                close_all_lists(&mut out, &mut lists);
                out.push_str("<blockquote>");
                while p < blocks.len() && blocks[p] == BlockKind::Quote {
                    out.push_str("<p>");
                    write_inline(&mut out, doc.paragraph_text(p).1, flavor);
                    out.push_str("</p>");
                    p += 1;
                }
                out.push_str("</blockquote>");
            }
            BlockKind::CodeBlock => {
                close_all_lists(&mut out, &mut lists);
                out.push_str("<pre><code>");
                let mut first = true;
                while p < blocks.len() && blocks[p] == BlockKind::CodeBlock {
                    if !first {
                        out.push('\n');
                    }
                    first = false;
                    out.push_str(&encode_text(&code_text(doc.paragraph_text(p).1)));
                    p += 1;
                }
                out.push_str("</code></pre>");
            }
        }
    }
    close_all_lists(&mut out, &mut lists);
    out
}

fn close_list(out: &mut String, lists: &mut Vec<bool>) {
    if let Some(ordered) = lists.pop() {
        out.push_str(if ordered { "</li></ol>" } else { "</li></ul>" });
    }
}

fn close_all_lists(out: &mut String, lists: &mut Vec<bool>) {
    while !lists.is_empty() {
        close_list(out, lists);
    }
}

fn code_text(cells: &[Cell]) -> String {
    cells
        .iter()
        .map(|cell| match cell {
            Cell::Char(c, _) => c.to_string(),
            Cell::Mention(mention) => mention.text.clone(),
            Cell::Break => String::new(),
        })
        .collect()
}

fn write_inline(out: &mut String, cells: &[Cell], flavor: Flavor) {
    let mut i = 0;
    while i < cells.len() {
        match &cells[i] {
            Cell::Char(_, style) => {
                let mut text = String::new();
                while let Some(Cell::Char(c, s)) = cells.get(i) {
                    if s != style {
                        break;
                    }
                    text.push(*c);
                    i += 1;
                }
                open_style(out, style);
                out.push_str(&encode_text(&text));
                close_style(out, style);
            }
            Cell::Mention(mention) => {
                write_mention(out, mention, flavor);
                i += 1;
            }
            Cell::Break => i += 1,
        }
    }
}

fn write_attributes(out: &mut String, attributes: &[(String, String)]) {
    for (key, value) in attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&encode_double_quoted_attribute(value));
        out.push('"');
    }
}

fn write_mention(out: &mut String, mention: &Mention, flavor: Flavor) {
    out.push_str("<a href=\"");
    out.push_str(&encode_double_quoted_attribute(&mention.url));
    out.push('"');
    if flavor == Flavor::Display {
        let attributes: Vec<_> = mention
            .attributes
            .iter()
            .filter(|(key, _)| key != "contenteditable")
            .cloned()
            .collect();
        write_attributes(out, &attributes);
        out.push_str(" contenteditable=\"false\"");
    }
    out.push('>');
    out.push_str(&encode_text(&mention.text));
    out.push_str("</a>");
}

fn open_style(out: &mut String, style: &Style) {
    if let Some(link) = &style.link {
        out.push_str("<a href=\"");
        out.push_str(&encode_double_quoted_attribute(&link.url));
        out.push('"');
        write_attributes(out, &link.attributes);
        out.push('>');
    }
    if style.bold {
        out.push_str("<strong>");
    }
    if style.italic {
        out.push_str("<em>");
    }
    if style.underline {
        out.push_str("<u>");
    }
    if style.strike_through {
        out.push_str("<del>");
    }
    if style.inline_code {
        out.push_str("<code>");
    }
}

fn close_style(out: &mut String, style: &Style) {
    if style.inline_code {
        out.push_str("</code>");
    }
    if style.strike_through {
        out.push_str("</del>");
    }
    if style.underline {
        out.push_str("</u>");
    }
    if style.italic {
        out.push_str("</em>");
    }
    if style.bold {
        out.push_str("</strong>");
    }
    if style.link.is_some() {
        out.push_str("</a>");
    }
}

pub fn parse(html: &str) -> Result<Document, ComposerError> {
    let mut reader = HtmlReader::default();
    let mut rest = html;
    while !rest.is_empty() {
        if let Some(comment) = rest.strip_prefix("<!--") {
            let end = comment
                .find("-->")
                .ok_or_else(|| parse_error("unterminated comment"))?;
            rest = &comment[end + 3..];
        } else if let Some(tag) = rest.strip_prefix('<') {
            let end = tag
                .find('>')
                .ok_or_else(|| parse_error("unterminated tag"))?;
            reader.tag(&tag[..end]);
            rest = &tag[end + 1..];
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            reader.text(&rest[..end]);
            rest = &rest[end..];
        }
    }
    Ok(reader.builder.finish())
}

fn parse_error(reason: &str) -> ComposerError {
    ComposerError::Parse {
        format: ContentFormat::Html,
        reason: reason.to_string(),
    }
}

#[derive(Debug, Default)]
struct HtmlReader {
    builder: DocumentBuilder,
    bold: usize,
    italic: usize,
    underline: usize,
    strike_through: usize,
    inline_code: usize,
    links: Vec<Link>,
    mention: Option<Mention>,
    lists: Vec<bool>,
    quote_depth: usize,
    in_pre: bool,
}

impl HtmlReader {
    fn kind(&self) -> BlockKind {
        if self.in_pre {
            BlockKind::CodeBlock
        } else if let Some(ordered) = self.lists.last() {
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
            inline_code: self.inline_code > 0,
            link: self.links.last().cloned(),
        }
    }

    fn tag(&mut self, raw: &str) {
        let raw = raw.trim();
        let (closing, raw) = match raw.strip_prefix('/') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, raw.trim_end_matches('/')),
        };
        let name_end = raw.find(char::is_whitespace).unwrap_or(raw.len());
        let name = raw[..name_end].to_ascii_lowercase();
        let attributes = parse_attributes(&raw[name_end..]);

        let counter = match name.as_str() {
            "strong" | "b" => Some(&mut self.bold),
            "em" | "i" => Some(&mut self.italic),
            "u" => Some(&mut self.underline),
            "del" | "s" | "strike" => Some(&mut self.strike_through),
            "code" if !self.in_pre => Some(&mut self.inline_code),
            _ => None,
        };
        if let Some(counter) = counter {
            *counter = if closing {
                counter.saturating_sub(1)
            } else {
                *counter + 1
            };
            return;
        }

        match (name.as_str(), closing) {
            ("a", false) => self.open_anchor(attributes),
            ("a", true) => {
                if let Some(mention) = self.mention.take() {
                    let kind = self.kind();
                    self.builder.push_mention(mention, kind);
                } else {
                    self.links.pop();
                }
            }
            ("p", false) | ("li", false) | ("br", _) => {
                let kind = self.kind();
                self.builder.begin_paragraph(kind);
            }
            ("p", true) | ("li", true) => self.builder.end_paragraph(),
            ("ul", false) | ("ol", false) => {
                self.lists.push(name == "ol");
                self.builder.end_paragraph();
            }
            ("ul", true) | ("ol", true) => {
                self.lists.pop();
                self.builder.end_paragraph();
            }
            ("blockquote", false) => {
                self.quote_depth += 1;
                self.builder.end_paragraph();
            }
            ("blockquote", true) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.builder.end_paragraph();
            }
            ("pre", false) => {
                self.in_pre = true;
                self.builder.begin_paragraph(BlockKind::CodeBlock);
            }
            ("pre", true) => {
                self.in_pre = false;
                self.builder.end_paragraph();
            }
            _ => {}
        }
    }

    fn open_anchor(&mut self, attributes: Vec<(String, String)>) {
        let url = attributes
            .iter()
            .find(|(key, _)| key == "href")
            .map(|(_, value)| value.clone())
            .unwrap_or_default();
        let is_mention = attributes.iter().any(|(key, value)| {
            key == "data-mention-type" || (key == "contenteditable" && value == "false")
        });
        let attributes = attributes
            .into_iter()
            .filter(|(key, _)| key != "href" && key != "contenteditable")
            .collect();
        if is_mention {
            self.mention = Some(Mention {
                url,
                text: String::new(),
                attributes,
            });
        } else {
            self.links.push(Link { url, attributes });
        }
    }

    fn text(&mut self, raw: &str) {
        let decoded = decode_html_entities(raw);
        if self.in_pre {
            for (i, line) in decoded.split('\n').enumerate() {
                if i > 0 {
                    self.builder.begin_paragraph(BlockKind::CodeBlock);
                }
                self.builder
                    .push_text(line, &Style::default(), BlockKind::CodeBlock);
            }
            return;
        }

        let text = decoded.replace('\n', " ");
        if let Some(mention) = &mut self.mention {
            mention.text.push_str(&text);
            return;
        }
        if !self.builder.is_paragraph_open() && text.trim().is_empty() {
            return;
        }
        let (style, kind) = (self.style(), self.kind());
        self.builder.push_text(&text, &style, kind);
    }
}

fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    let mut rest = raw.trim();
    while !rest.is_empty() {
        let name_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        rest = rest[name_end..].trim_start();

        let mut value = "";
        if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            match after_eq.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let body = &after_eq[1..];
                    let end = body.find(quote).unwrap_or(body.len());
                    value = &body[..end];
                    rest = body.get(end + 1..).unwrap_or("");
                }
                _ => {
                    let end = after_eq
                        .find(char::is_whitespace)
                        .unwrap_or(after_eq.len());
                    value = &after_eq[..end];
                    rest = &after_eq[end..];
                }
            }
        }
        if !name.is_empty() {
            attributes.push((name, decode_html_entities(value).into_owned()));
        }
        rest = rest.trim_start();
    }
    attributes
}
