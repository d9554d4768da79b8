pub mod composer;
pub mod input;
pub mod mapping;
pub mod recovery;
pub mod suggestion;
pub mod view_model;

// Re-export key types for easier usage
pub use composer::{
    ActionState, ComposerAction, ComposerError, ComposerHandle, ComposerProvider, ComposerResult,
    ComposerUpdate, ContentFormat, InlineFormat, LinkAction, MenuAction, MenuState, PanicGuard,
    PatternKey, RichTextComposer, SuggestionPattern, TextUpdate, default_provider,
};
pub use input::{EditorInputAction, ViewLinkAction};
pub use mapping::{Placeholder, ViewText, map_selection};
pub use recovery::{RecoveryManager, RecoveryOutcome, RecoveryStep};
pub use suggestion::SuggestionContext;
pub use view_model::{
    ActionStatesCallback, EditorSettings, EditorViewModel, ErrorObserver, HtmlConverter,
    MenuActionCallback, RawHtml, ReplaceTextResult,
};
