use crate::composer::{InlineFormat, LinkAction};

/// A user-intent command issued by the editor view.
///
/// Offsets carried by commands are composer offsets; the view maps them with
/// [`map_selection`](crate::mapping::map_selection) first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorInputAction {
    ReplaceText { value: String },
    ReplaceTextIn { value: String, start: usize, end: usize },
    /// Complete the pending suggestion with plain text.
    ReplaceTextSuggestion { value: String },
    InsertParagraph,
    BackPress,
    ApplyInlineFormat(InlineFormat),
    Delete,
    DeleteIn { start: usize, end: usize },
    SetLink { url: String },
    SetLinkWithText { url: String, text: String },
    /// Complete the pending suggestion as a mention link.
    SetLinkSuggestion { url: String, text: String },
    RemoveLink,
    ReplaceAllHtml { html: String },
    ReplaceAllMarkdown { markdown: String },
    Undo,
    Redo,
    ToggleList { ordered: bool },
    CodeBlock,
    Quote,
    Indent,
    Unindent,
}

/// What the view's link button should offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewLinkAction {
    /// Set or edit a link on the selection.
    SetLink { current_url: Option<String> },
    /// Insert a new link together with its text.
    InsertLink,
}

impl ViewLinkAction {
    /// `None` when links are unavailable at the selection.
    pub fn from_composer(action: LinkAction) -> Option<Self> {
        match action {
            LinkAction::Edit { url } => Some(ViewLinkAction::SetLink {
                current_url: Some(url),
            }),
            LinkAction::Create => Some(ViewLinkAction::SetLink { current_url: None }),
            LinkAction::CreateWithText => Some(ViewLinkAction::InsertLink),
            LinkAction::Disabled => None,
        }
    }
}
