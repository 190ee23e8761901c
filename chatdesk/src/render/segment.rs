//! Splitting a message into prose and fenced-code segments.

use std::sync::LazyLock;

use regex::Regex;

use super::{format_inline, highlight_code};

/// Language used when a fence has no tag.
pub const DEFAULT_LANGUAGE: &str = "text";

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```([\w+#.-]+)?[ \t]*\n(.*?)```").unwrap());

/// How a code segment is presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeView {
    /// Read-only, syntax highlighted markup.
    Highlighted(String),
    /// Plain editable text field.
    Editable,
}

/// A fenced code region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSegment {
    pub language: String,
    pub code: String,
    pub view: CodeView,
}

impl CodeSegment {
    /// Text placed on the clipboard by the copy affordance.
    pub fn copy_text(&self) -> &str {
        &self.code
    }

    pub const fn is_editable(&self) -> bool {
        matches!(self.view, CodeView::Editable)
    }

    /// Replace the code of an editable segment and notify `on_edit`.
    ///
    /// Returns `false` without calling `on_edit` for read-only segments.
    pub fn apply_edit<F>(&mut self, new_text: impl Into<String>, on_edit: F) -> bool
    where
        F: FnOnce(&str),
    {
        if !self.is_editable() {
            return false;
        }
        self.code = new_text.into();
        on_edit(&self.code);
        true
    }
}

/// One renderable piece of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Formatted prose markup.
    Text(String),
    /// Fenced code.
    Code(CodeSegment),
}

impl Segment {
    pub const fn as_code(&self) -> Option<&CodeSegment> {
        match self {
            Self::Code(c) => Some(c),
            Self::Text(_) => None,
        }
    }
}

/// Split `raw` into ordered segments.
///
/// Code segments are editable text fields when `editable` is set, and
/// highlighted markup otherwise. Blank prose spans are dropped.
pub fn segment_message(raw: &str, editable: bool) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in FENCE.captures_iter(raw) {
        let Some(whole) = caps.get(0) else { continue };
        push_text(&mut segments, &raw[last..whole.start()]);

        let language = caps
            .get(1)
            .map_or(DEFAULT_LANGUAGE, |m| m.as_str())
            .to_string();
        let body = caps.get(2).map_or("", |m| m.as_str());
        let code = body.strip_suffix('\n').unwrap_or(body).to_string();
        let view = if editable {
            CodeView::Editable
        } else {
            CodeView::Highlighted(highlight_code(&code, &language))
        };

        segments.push(Segment::Code(CodeSegment {
            language,
            code,
            view,
        }));
        last = whole.end();
    }

    push_text(&mut segments, &raw[last..]);
    segments
}

fn push_text(segments: &mut Vec<Segment>, span: &str) {
    let span = span.trim_matches(|c| c == '\n' || c == '\r');
    if span.trim().is_empty() {
        return;
    }
    segments.push(Segment::Text(format_inline(span)));
}
