//! # Offset mapping between the editor view and the composer
//!
//! The view addresses its content in UTF-16 code units, including spans that
//! have no textual counterpart in the composer: mention pills rendered as
//! several characters but stored as a single unit, or view-only decorations
//! such as list prefixes that the composer does not store at all. Those spans
//! are described as [`Placeholder`]s on a [`ViewText`].
//!
//! [`map_selection`] is a pure function of the view content; it is re-run for
//! every selection change and never cached across edits.

use std::ops::Range;

/// A span of the view that occupies `range` (view UTF-16 units) but only
/// `composer_len` units in the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub range: Range<usize>,
    pub composer_len: usize,
}

impl Placeholder {
    pub fn new(range: Range<usize>, composer_len: usize) -> Self {
        Self {
            range,
            composer_len,
        }
    }

    /// A pill or mention: any view width, one composer unit.
    pub fn pill(range: Range<usize>) -> Self {
        Self::new(range, 1)
    }

    /// A view-only decoration the composer does not store.
    pub fn decoration(range: Range<usize>) -> Self {
        Self::new(range, 0)
    }
}

/// The current content of the editor view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewText {
    text: String,
    len_utf16: usize,
    placeholders: Vec<Placeholder>,
}

impl ViewText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let len_utf16 = text.encode_utf16().count();
        Self {
            text,
            len_utf16,
            placeholders: Vec::new(),
        }
    }

    pub fn with_placeholders(text: impl Into<String>, placeholders: Vec<Placeholder>) -> Self {
        Self {
            placeholders,
            ..Self::new(text)
        }
    }

    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholders.push(placeholder);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Length in UTF-16 code units.
    pub fn len_utf16(&self) -> usize {
        self.len_utf16
    }

    /// Placeholders must be sorted, non-overlapping and inside the text.
    fn placeholders_are_consistent(&self) -> bool {
        let mut previous_end = 0;
        for placeholder in &self.placeholders {
            let Range { start, end } = placeholder.range;
            if start < previous_end || start > end || end > self.len_utf16 {
                return false;
            }
            previous_end = end;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Snap {
    Start,
    End,
}

/// Map a view selection to composer offsets.
///
/// A reversed range is swapped first, so the result is always ordered.
/// Returns `None` when an offset lies past the end of the view text or the
/// placeholders do not fit the text.
///
/// Offsets strictly inside a placeholder snap outward: the start of the range
/// to the placeholder's composer start, the end to its composer end. A
/// collapsed caret inside a placeholder lands after it.
pub fn map_selection(view: &ViewText, start: usize, end: usize) -> Option<(usize, usize)> {
    let (start, end) = if end < start { (end, start) } else { (start, end) };
    if end > view.len_utf16() || !view.placeholders_are_consistent() {
        return None;
    }
    if start == end {
        let caret = map_offset(view, start, Snap::End);
        return Some((caret, caret));
    }
    Some((
        map_offset(view, start, Snap::Start),
        map_offset(view, end, Snap::End),
    ))
}

fn map_offset(view: &ViewText, offset: usize, snap: Snap) -> usize {
    // View units skipped so far and composer units standing in for them.
    let mut removed = 0;
    let mut added = 0;
    for placeholder in view.placeholders() {
        let Range { start, end } = placeholder.range;
        if offset <= start {
            break;
        }
        if offset >= end {
            removed += end - start;
            added += placeholder.composer_len;
            continue;
        }
        let composer_start = start - removed + added;
        return match snap {
            Snap::Start => composer_start,
            Snap::End => composer_start + placeholder.composer_len,
        };
    }
    offset - removed + added
}
