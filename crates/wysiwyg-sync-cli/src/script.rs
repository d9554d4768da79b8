use anyhow::{Context, Result, anyhow, bail};
use std::ops::Range;
use wysiwyg_sync_engine::{EditorInputAction, InlineFormat, Placeholder};

/// What `print` shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Html,
    Message,
    Markdown,
    Text,
    States,
    Link,
}

/// One line of a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Selection in view offsets, over a view holding the given placeholders.
    Select {
        start: usize,
        end: usize,
        placeholders: Vec<Placeholder>,
    },
    Input(EditorInputAction),
    /// Crash the composer and let it recover.
    Panic,
    Print(Output),
}

/// Parse one script line. Blank lines and `#` comments give `None`.
///
/// Text typed with `type` is taken verbatim after the single separating
/// space, so `type  ` types a space.
pub fn parse_line(line: &str) -> Result<Option<Command>> {
    let line = line.trim_start().trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, raw) = line.split_once(' ').unwrap_or((line, ""));
    let rest = raw.trim();

    let input = |action: EditorInputAction| -> Result<Option<Command>> {
        Ok(Some(Command::Input(action)))
    };
    match word {
        "type" => input(EditorInputAction::ReplaceText {
            value: required(raw, "text")?.to_string(),
        }),
        "replace" => {
            let (start, rest) = number(rest, "start")?;
            let (end, text) = number(rest, "end")?;
            input(EditorInputAction::ReplaceTextIn {
                value: text.to_string(),
                start,
                end,
            })
        }
        "select" => parse_select(rest).map(Some),
        "bold" => input(EditorInputAction::ApplyInlineFormat(InlineFormat::Bold)),
        "italic" => input(EditorInputAction::ApplyInlineFormat(InlineFormat::Italic)),
        "underline" => input(EditorInputAction::ApplyInlineFormat(InlineFormat::Underline)),
        "strike" => input(EditorInputAction::ApplyInlineFormat(
            InlineFormat::StrikeThrough,
        )),
        "code" => input(EditorInputAction::ApplyInlineFormat(InlineFormat::InlineCode)),
        "enter" => input(EditorInputAction::InsertParagraph),
        "backspace" => input(EditorInputAction::BackPress),
        "delete" if rest.is_empty() => input(EditorInputAction::Delete),
        "delete" => {
            let (start, rest) = number(rest, "start")?;
            let (end, _) = number(rest, "end")?;
            input(EditorInputAction::DeleteIn { start, end })
        }
        "list" => match rest {
            "ordered" => input(EditorInputAction::ToggleList { ordered: true }),
            "unordered" => input(EditorInputAction::ToggleList { ordered: false }),
            other => bail!("Expected `ordered` or `unordered`, got {other:?}"),
        },
        "quote" => input(EditorInputAction::Quote),
        "codeblock" => input(EditorInputAction::CodeBlock),
        "indent" => input(EditorInputAction::Indent),
        "unindent" => input(EditorInputAction::Unindent),
        "link" => input(EditorInputAction::SetLink {
            url: required(rest, "url")?.to_string(),
        }),
        "linktext" => {
            let (url, text) = word_and_rest(rest, "url")?;
            input(EditorInputAction::SetLinkWithText {
                url: url.to_string(),
                text: required(text, "text")?.to_string(),
            })
        }
        "unlink" => input(EditorInputAction::RemoveLink),
        "suggest" => input(EditorInputAction::ReplaceTextSuggestion {
            value: required(raw, "text")?.to_string(),
        }),
        "mention" => {
            let (url, text) = word_and_rest(rest, "url")?;
            input(EditorInputAction::SetLinkSuggestion {
                url: url.to_string(),
                text: required(text, "text")?.to_string(),
            })
        }
        "html" => input(EditorInputAction::ReplaceAllHtml {
            html: unescape(rest),
        }),
        "markdown" => input(EditorInputAction::ReplaceAllMarkdown {
            markdown: unescape(rest),
        }),
        "undo" => input(EditorInputAction::Undo),
        "redo" => input(EditorInputAction::Redo),
        "panic" => Ok(Some(Command::Panic)),
        "print" => {
            let output = match rest {
                "html" => Output::Html,
                "message" => Output::Message,
                "markdown" => Output::Markdown,
                "text" => Output::Text,
                "states" => Output::States,
                "link" => Output::Link,
                other => bail!("Unknown print target {other:?}"),
            };
            Ok(Some(Command::Print(output)))
        }
        other => bail!("Unknown command {other:?}"),
    }
}

/// `select <start> <end> [pill <a>..<b> | decoration <a>..<b>]...`
fn parse_select(rest: &str) -> Result<Command> {
    let (start, rest) = number(rest, "start")?;
    let (end, mut rest) = number(rest, "end")?;
    let mut placeholders = Vec::new();
    while !rest.is_empty() {
        let (kind, after_kind) = word_and_rest(rest, "placeholder kind")?;
        let (range, after_range) = word_and_rest(after_kind, "placeholder range")?;
        let range = parse_range(range)?;
        placeholders.push(match kind {
            "pill" => Placeholder::pill(range),
            "decoration" => Placeholder::decoration(range),
            other => bail!("Unknown placeholder kind {other:?}"),
        });
        rest = after_range;
    }
    Ok(Command::Select {
        start,
        end,
        placeholders,
    })
}

fn parse_range(range: &str) -> Result<Range<usize>> {
    let (start, end) = range
        .split_once("..")
        .ok_or_else(|| anyhow!("Expected a range like 3..8, got {range:?}"))?;
    Ok(start.parse()?..end.parse()?)
}

fn required<'a>(rest: &'a str, what: &str) -> Result<&'a str> {
    if rest.is_empty() {
        bail!("Missing {what}");
    }
    Ok(rest)
}

fn word_and_rest<'a>(rest: &'a str, what: &str) -> Result<(&'a str, &'a str)> {
    let rest = required(rest, what)?;
    Ok(match rest.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (rest, ""),
    })
}

fn number<'a>(rest: &'a str, what: &str) -> Result<(usize, &'a str)> {
    let (word, rest) = word_and_rest(rest, what)?;
    let value = word
        .parse()
        .with_context(|| format!("Invalid {what} {word:?}"))?;
    Ok((value, rest))
}

/// Content given inline on one line spells newlines as `\n`.
fn unescape(content: &str) -> String {
    content.replace("\\n", "\n")
}
