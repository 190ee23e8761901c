//! Turning raw message text into safe markup.

mod highlight;
mod inline;
mod segment;

pub use highlight::highlight_code;
pub use inline::{escape_html, format_inline, Align};
pub use segment::{segment_message, CodeSegment, CodeView, Segment, DEFAULT_LANGUAGE};

/// Render a whole message body to markup, one block per segment.
pub fn render_message(raw: &str) -> String {
    segment_message(raw, false)
        .into_iter()
        .map(|segment| match segment {
            Segment::Text(markup) => markup,
            Segment::Code(code) => match code.view {
                CodeView::Highlighted(html) => format!(r#"<div class="code-block">{html}</div>"#),
                CodeView::Editable => format!(
                    r#"<div class="code-block"><textarea class="code-editor">{}</textarea></div>"#,
                    escape_html(&code.code)
                ),
            },
        })
        .collect::<Vec<_>>()
        .join("\n")
}
