//! Behaviour of the synchronization core against a scripted composer.

mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use common::{Call, Mock, dismiss, internal, invalid, pattern, replace_all, states, suggestion};
use pretty_assertions::assert_eq;
use rstest::rstest;
use wysiwyg_sync_engine::{
    ActionState, ComposerAction, ComposerError, ComposerUpdate, EditorInputAction,
    EditorSettings, EditorViewModel, InlineFormat, MenuAction, MenuState, Placeholder, RawHtml,
    ReplaceTextResult, ViewText,
};

type Shared<T> = Arc<Mutex<Vec<T>>>;

struct Harness {
    mock: Mock,
    vm: EditorViewModel<RawHtml>,
    menu_events: Shared<MenuAction>,
    state_events: Shared<HashMap<ComposerAction, ActionState>>,
    errors: Shared<ComposerError>,
}

impl Harness {
    fn new(settings: EditorSettings) -> Self {
        let mock = Mock::new();
        let mut vm = EditorViewModel::new(mock.provider(), RawHtml).with_settings(settings);
        let menu_events: Shared<MenuAction> = Arc::default();
        let state_events: Shared<HashMap<ComposerAction, ActionState>> = Arc::default();
        let errors: Shared<ComposerError> = Arc::default();

        let sink = menu_events.clone();
        vm.set_menu_action_callback(Some(Box::new(move |action: &MenuAction| {
            sink.lock().unwrap().push(action.clone())
        })));
        let sink = state_events.clone();
        vm.set_action_states_callback(Some(Box::new(
            move |states: &HashMap<ComposerAction, ActionState>| {
                sink.lock().unwrap().push(states.clone())
            },
        )));
        let sink = errors.clone();
        vm.set_error_observer(Some(Box::new(move |error: &ComposerError| {
            sink.lock().unwrap().push(error.clone())
        })));
        state_events.lock().unwrap().clear();

        Self {
            mock,
            vm,
            menu_events,
            state_events,
            errors,
        }
    }

    fn recovering() -> Self {
        Self::new(EditorSettings {
            fail_fast: false,
            report_ordinary_failures: true,
        })
    }

    fn type_text(&mut self, value: &str) -> Option<ReplaceTextResult<String>> {
        self.vm.process_input(EditorInputAction::ReplaceText {
            value: value.to_string(),
        })
    }

    /// Type `text` and have the composer replace the document with it, which
    /// refreshes the recovery snapshot.
    fn seed(&mut self, text: &str) {
        self.mock.reply(replace_all(text, text.len()));
        self.type_text(text);
        self.mock.clear_calls();
        self.menu_events.lock().unwrap().clear();
    }

    fn listeners_fired(&self) -> usize {
        self.menu_events.lock().unwrap().len() + self.state_events.lock().unwrap().len()
    }

    fn errors(&self) -> Vec<ComposerError> {
        self.errors.lock().unwrap().clone()
    }
}

#[rstest]
#[case::past_the_end(ViewText::new("abc"), 0, 4)]
#[case::both_past_the_end(ViewText::new("abc"), 9, 7)]
#[case::placeholder_outside_text(ViewText::new("abc").with_placeholder(Placeholder::pill(2..6)), 0, 1)]
#[case::overlapping_placeholders(
    ViewText::with_placeholders(
        "abcdefgh",
        vec![Placeholder::pill(1..4), Placeholder::pill(3..6)],
    ),
    0,
    1
)]
fn unmapped_selection_calls_nothing(
    #[case] view: ViewText,
    #[case] start: usize,
    #[case] end: usize,
) {
    let mut h = Harness::recovering();

    assert_eq!(h.vm.update_selection(&view, start, end), None);

    assert!(h.mock.calls().is_empty());
    assert_eq!(h.listeners_fired(), 0);
    assert!(h.errors().is_empty());
}

#[rstest]
#[case::plain(ViewText::new("hello world"), 7, 2, (2, 7))]
#[case::forward(ViewText::new("hello world"), 2, 7, (2, 7))]
#[case::pill_partially_selected(
    ViewText::new("hi @bob there").with_placeholder(Placeholder::pill(3..7)),
    9,
    5,
    (3, 6)
)]
#[case::decoration_before_text(
    ViewText::new("• item").with_placeholder(Placeholder::decoration(0..2)),
    6,
    2,
    (0, 4)
)]
fn reversed_view_ranges_reach_composer_ordered(
    #[case] view: ViewText,
    #[case] start: usize,
    #[case] end: usize,
    #[case] expected: (usize, usize),
) {
    let mut h = Harness::recovering();

    h.vm.update_selection(&view, start, end);

    assert_eq!(h.mock.calls(), vec![Call::Select(expected.0, expected.1)]);
}

#[test]
fn selection_forwards_menu_state() {
    let mut h = Harness::recovering();
    h.mock
        .reply(states(&[(ComposerAction::Bold, ActionState::Reversed)]));

    h.vm.update_selection(&ViewText::new("ab"), 0, 2);

    let events = h.state_events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![HashMap::from([(ComposerAction::Bold, ActionState::Reversed)])]
    );
}

#[test]
fn selection_ignores_menu_action() {
    let mut h = Harness::recovering();
    h.mock.reply(suggestion("bo"));
    h.type_text("@bo");
    h.mock.reply(dismiss());
    h.mock.reply(suggestion("b"));

    h.vm.update_selection(&ViewText::new("@bo"), 0, 0);
    h.vm.update_selection(&ViewText::new("@bo"), 2, 2);

    assert_eq!(h.vm.suggestion(), Some(&pattern("bo")));
    assert_eq!(
        h.menu_events.lock().unwrap().clone(),
        vec![MenuAction::Suggestion(pattern("bo"))]
    );
}

#[test]
fn selection_honours_unexpected_replace_all() {
    let mut h = Harness::recovering();
    h.mock.set_plain_text("ab");
    h.mock.reply(replace_all("ab", 1));

    let result = h.vm.update_selection(&ViewText::new("ab"), 1, 1);

    assert_eq!(
        result,
        Some(ReplaceTextResult {
            text: "ab".to_string(),
            selection: 1..1,
        })
    );
    assert_eq!(h.vm.recovery_snapshot(), "ab");
}

#[test]
fn suggestion_completions_use_stored_pattern() {
    let mut h = Harness::recovering();
    h.mock.reply(suggestion("ali"));
    h.type_text("@ali");

    h.vm.process_input(EditorInputAction::SetLinkSuggestion {
        url: "https://matrix.to/#/@alice:matrix.org".to_string(),
        text: "Alice".to_string(),
    });
    h.vm.process_input(EditorInputAction::ReplaceTextSuggestion {
        value: "alice".to_string(),
    });

    assert_eq!(
        h.mock.calls()[1..].to_vec(),
        vec![
            Call::SetLinkSuggestion(
                "https://matrix.to/#/@alice:matrix.org".to_string(),
                "Alice".to_string(),
                pattern("ali"),
            ),
            Call::ReplaceTextSuggestion(pattern("ali"), "alice".to_string()),
        ]
    );
    // completing does not clear the context by itself
    assert_eq!(h.vm.suggestion(), Some(&pattern("ali")));
}

#[test]
fn dismissed_suggestion_blocks_completions() {
    let mut h = Harness::recovering();
    h.mock.reply(suggestion("ali"));
    h.type_text("@ali");
    h.mock.reply(dismiss());
    h.type_text(" ");
    h.mock.clear_calls();

    let result = h.vm.process_input(EditorInputAction::ReplaceTextSuggestion {
        value: "alice".to_string(),
    });
    h.vm.process_input(EditorInputAction::SetLinkSuggestion {
        url: "https://x".to_string(),
        text: "x".to_string(),
    });

    assert_eq!(result, None);
    assert!(h.mock.calls().is_empty());
    assert!(h.errors().is_empty());
}

#[test]
fn newer_suggestion_replaces_older_one() {
    let mut h = Harness::recovering();
    h.mock.reply(suggestion("a"));
    h.type_text("@a");
    h.mock.reply(suggestion("al"));
    h.type_text("l");

    assert_eq!(h.vm.suggestion(), Some(&pattern("al")));
    assert_eq!(h.menu_events.lock().unwrap().len(), 2);
}

#[rstest]
#[case(EditorInputAction::ReplaceText { value: "x".to_string() })]
#[case(EditorInputAction::InsertParagraph)]
#[case(EditorInputAction::ApplyInlineFormat(InlineFormat::Italic))]
#[case(EditorInputAction::ToggleList { ordered: true })]
#[case(EditorInputAction::Undo)]
fn keep_update_notifies_nobody(#[case] action: EditorInputAction) {
    let mut h = Harness::recovering();
    h.mock.reply(suggestion("ali"));
    h.type_text("@ali");
    h.menu_events.lock().unwrap().clear();
    h.mock.reply(Ok(ComposerUpdate::keep()));

    assert_eq!(h.vm.process_input(action), None);

    assert_eq!(h.listeners_fired(), 0);
    assert_eq!(h.vm.suggestion(), Some(&pattern("ali")));
}

#[test]
fn select_and_keep_never_render() {
    let mut h = Harness::recovering();
    h.mock.reply(Ok(ComposerUpdate::select(
        1,
        2,
        MenuState::Keep,
        MenuAction::Keep,
    )));
    h.mock.reply(Ok(ComposerUpdate::keep()));

    assert_eq!(h.type_text("a"), None);
    assert_eq!(h.type_text("b"), None);
    assert_eq!(h.vm.update_selection(&ViewText::new("ab"), 0, 1), None);
    assert_eq!(h.vm.recovery_snapshot(), "");
}

#[test]
fn replace_all_renders_and_refreshes_snapshot() {
    let mut h = Harness::recovering();
    h.mock.reply(replace_all("<b>hi</b>", 2));

    let result = h.type_text("hi");

    assert_eq!(
        result,
        Some(ReplaceTextResult {
            text: "<b>hi</b>".to_string(),
            selection: 2..2,
        })
    );
    assert_eq!(h.vm.recovery_snapshot(), "hi");
}

#[test]
fn custom_converter_renders_replacements() {
    let mock = Mock::new();
    let mut vm = EditorViewModel::new(mock.provider(), |html: &str| html.len());
    mock.reply(replace_all("<em>abc</em>", 3));

    let result = vm.process_input(EditorInputAction::ReplaceText {
        value: "abc".to_string(),
    });

    assert_eq!(result.map(|r| r.text), Some(12));
}

#[test]
fn recovery_restores_snapshot_text() {
    let mut h = Harness::recovering();
    h.seed("hello");
    h.mock.reply(internal("boom"));

    let result = h
        .vm
        .process_input(EditorInputAction::ApplyInlineFormat(InlineFormat::Bold));

    assert_eq!(result, None);
    assert_eq!(h.mock.provisioned(), 2);
    assert_eq!(
        h.mock.calls(),
        vec![
            Call::Other("bold"),
            Call::ReplaceText("hello".to_string())
        ]
    );
    assert_eq!(h.vm.get_content_as_plain_text(), "hello");
    assert_eq!(h.errors().len(), 1);
}

#[test]
fn unreadable_snapshot_keeps_the_last_good_one() {
    let mut h = Harness::recovering();
    h.seed("hello");
    h.mock.fail_next_snapshot(ComposerError::Internal {
        reason: "plain text unreadable".to_string(),
    });
    h.mock.reply(replace_all("hello!", 6));

    let result = h.type_text("!");

    assert_eq!(result, None);
    assert_eq!(h.vm.recovery_snapshot(), "hello");
    assert_eq!(h.mock.provisioned(), 2);
    assert_eq!(
        h.mock.calls(),
        vec![
            Call::ReplaceText("!".to_string()),
            Call::ReplaceText("hello".to_string())
        ]
    );
    assert_eq!(h.vm.get_content_as_plain_text(), "hello");
    let errors = h.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_panic());
}

#[test]
fn failed_reload_leaves_empty_document() {
    let mut h = Harness::recovering();
    h.seed("hello");
    h.mock.reply(internal("boom"));
    h.mock.reply(internal("reload failed too"));

    h.vm.process_input(EditorInputAction::Quote);

    assert_eq!(h.mock.provisioned(), 3);
    assert_eq!(h.vm.get_content_as_plain_text(), "");
    assert_eq!(h.vm.recovery_snapshot(), "");
    let errors = h.errors();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(ComposerError::is_panic));
}

#[test]
fn ordinary_reload_failure_keeps_fresh_composer() {
    let mut h = Harness::recovering();
    h.seed("hello");
    h.mock.reply(internal("boom"));
    h.mock.reply(invalid("snapshot rejected"));

    h.vm.process_input(EditorInputAction::Indent);

    assert_eq!(h.mock.provisioned(), 2);
    assert_eq!(h.vm.get_content_as_plain_text(), "");
    assert_eq!(h.errors().len(), 2);
}

#[test]
fn recovery_keeps_pending_suggestion() {
    let mut h = Harness::recovering();
    h.mock.reply(suggestion("ali"));
    h.type_text("@ali");
    h.mock.reply(internal("boom"));

    h.vm.process_input(EditorInputAction::Delete);

    assert_eq!(h.vm.suggestion(), Some(&pattern("ali")));
}

#[test]
fn ordinary_failures_are_no_ops() {
    let mut h = Harness::recovering();
    h.seed("abc");
    h.mock.reply(invalid("out of range"));

    let result = h
        .vm
        .process_input(EditorInputAction::DeleteIn { start: 2, end: 99 });

    assert_eq!(result, None);
    assert_eq!(h.mock.provisioned(), 1);
    assert_eq!(h.vm.get_content_as_plain_text(), "abc");
    assert_eq!(
        h.errors(),
        vec![ComposerError::InvalidArgument {
            reason: "out of range".to_string()
        }]
    );
}

#[test]
fn ordinary_failures_can_be_kept_quiet() {
    let mut h = Harness::new(EditorSettings {
        fail_fast: true,
        report_ordinary_failures: false,
    });
    h.mock.reply(invalid("out of range"));

    h.vm.process_input(EditorInputAction::Delete);

    assert!(h.errors().is_empty());
}

#[test]
fn failures_never_reach_the_caller_without_fail_fast() {
    let mut h = Harness::recovering();
    h.seed("text");
    for _ in 0..5 {
        h.mock.reply(internal("boom"));
        assert_eq!(h.vm.process_input(EditorInputAction::Redo), None);
    }

    assert_eq!(h.mock.provisioned(), 6);
    assert_eq!(h.vm.get_content_as_plain_text(), "text");
}

#[test]
#[should_panic(expected = "fail-fast enabled")]
fn fail_fast_makes_panic_class_failures_fatal() {
    let mut h = Harness::new(EditorSettings {
        fail_fast: true,
        report_ordinary_failures: true,
    });
    h.mock.reply(internal("boom"));

    h.vm.process_input(EditorInputAction::Undo);
}

#[test]
fn fail_fast_reports_before_aborting() {
    let mock = Mock::new();
    let errors: Shared<ComposerError> = Arc::default();
    let sink = errors.clone();
    let mut vm = EditorViewModel::new(mock.provider(), RawHtml).with_settings(EditorSettings {
        fail_fast: true,
        report_ordinary_failures: true,
    });
    vm.set_error_observer(Some(Box::new(move |error: &ComposerError| {
        sink.lock().unwrap().push(error.clone())
    })));
    mock.reply(internal("boom"));

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        vm.process_input(EditorInputAction::Undo)
    }));

    assert!(outcome.is_err());
    assert_eq!(errors.lock().unwrap().len(), 1);
    assert_eq!(mock.provisioned(), 1);
}

#[test]
fn crash_recovery_self_test_ignores_fail_fast() {
    let mut h = Harness::new(EditorSettings {
        fail_fast: true,
        report_ordinary_failures: true,
    });
    h.seed("kept");
    h.mock.reply(internal("forced"));

    h.vm.test_composer_crash_recovery();

    assert_eq!(h.mock.calls()[0], Call::DebugPanic);
    assert_eq!(h.vm.get_content_as_plain_text(), "kept");
    assert!(h.vm.settings().fail_fast);
}
