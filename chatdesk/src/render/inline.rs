//! Markdown-ish text to HTML for the prose parts of a message.
//!
//! The input is escaped before any rule runs, so every tag in the output was
//! produced here. Rules that do not match leave the (escaped) text as is.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Opens and closes a protected inline-code placeholder.
const HOLD_OPEN: char = '\u{E000}';
const HOLD_CLOSE: char = '\u{E001}';

/// Opens and closes a link-target placeholder within one line.
const HREF_OPEN: char = '\u{E002}';
const HREF_CLOSE: char = '\u{E003}';

static CODE_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`\n]+)`").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(\S(?:.*?\S)?)\*\*").unwrap());
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\s](?:[^*]*[^*\s])?)\*").unwrap());
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]\n]+)\]\(([^)\s]+)\)").unwrap());
static HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,3}) (.*)$").unwrap());
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-*] (.*)$").unwrap());
static NUMBERED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\. (.*)$").unwrap());
static QUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^&gt; ?(.*)$").unwrap());
static ALIGN_CELL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^:?-+:?$").unwrap());
static HOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{E000}(\\d+)\u{E001}").unwrap());
static HREF_HOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{E002}(\\d+)\u{E003}").unwrap());

/// Column alignment parsed from a table's marker row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    fn parse(cell: &str) -> Option<Self> {
        let cell = cell.trim();
        match (cell.starts_with(':'), cell.ends_with(':')) {
            (true, true) if cell.len() > 1 => Some(Self::Center),
            (true, _) => Some(Self::Left),
            (false, true) => Some(Self::Right),
            (false, false) => None,
        }
    }

    const fn as_css(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

/// Escape the three characters that could open markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Format one prose span of a message into sanitized markup.
///
/// Always returns a single `<div class="markdown-content">` container.
pub fn format_inline(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| match c {
            HOLD_OPEN | HOLD_CLOSE | HREF_OPEN | HREF_CLOSE => '\u{FFFD}',
            c => c,
        })
        .collect();
    let escaped = escape_html(&cleaned);

    let mut held = Vec::new();
    let protected = CODE_SPAN.replace_all(&escaped, |caps: &Captures<'_>| {
        held.push(format!(r#"<code class="inline-code">{}</code>"#, &caps[1]));
        format!("{HOLD_OPEN}{}{HOLD_CLOSE}", held.len() - 1)
    });

    let blocks = parse_blocks(&protected);
    let body = render_blocks(&blocks);

    let restored = HOLD.replace_all(&body, |caps: &Captures<'_>| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|i| held.get(i).cloned())
            .unwrap_or_default()
    });

    format!(r#"<div class="markdown-content">{restored}</div>"#)
}

/// Apply the span-level rules (bold, italic, links) to one line.
///
/// Link targets are held out while emphasis runs so `*` in a URL stays
/// literal.
fn format_spans(line: &str) -> String {
    let mut hrefs = Vec::new();
    let linked = LINK.replace_all(line, |caps: &Captures<'_>| {
        let href = &caps[2];
        if !is_safe_href(href) {
            return caps[0].to_string();
        }
        hrefs.push(href.replace('"', "&quot;"));
        format!(
            r#"<a href="{HREF_OPEN}{}{HREF_CLOSE}" class="markdown-link">{}</a>"#,
            hrefs.len() - 1,
            &caps[1]
        )
    });
    let bolded = BOLD.replace_all(&linked, "<strong>$1</strong>");
    let italic = ITALIC.replace_all(&bolded, "<em>$1</em>");
    HREF_HOLD
        .replace_all(&italic, |caps: &Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| hrefs.get(i).cloned())
                .unwrap_or_default()
        })
        .into_owned()
}

fn is_safe_href(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    ["http://", "https://", "mailto:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
        || !lower.contains(':')
}

#[derive(Debug, PartialEq)]
enum Block {
    Text(String),
    Header(usize, String),
    Bullet(String),
    Numbered(String),
    Quote(String),
    Table(Table),
}

#[derive(Debug, PartialEq)]
struct Table {
    headers: Vec<String>,
    aligns: Vec<Option<Align>>,
    rows: Vec<Vec<String>>,
}

fn parse_blocks(text: &str) -> Vec<Block> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if let Some((table, used)) = parse_table(&lines[i..]) {
            blocks.push(Block::Table(table));
            i += used;
            continue;
        }

        let line = lines[i];
        let block = if let Some(caps) = HEADER.captures(line) {
            Block::Header(caps[1].len(), caps[2].to_string())
        } else if let Some(caps) = BULLET.captures(line) {
            Block::Bullet(caps[1].to_string())
        } else if let Some(caps) = NUMBERED.captures(line) {
            Block::Numbered(caps[1].to_string())
        } else if let Some(caps) = QUOTE.captures(line) {
            Block::Quote(caps[1].to_string())
        } else {
            Block::Text(line.to_string())
        };
        blocks.push(block);
        i += 1;
    }

    blocks
}

fn is_piped_row(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 2 && t.starts_with('|') && t.ends_with('|')
}

fn split_cells(line: &str) -> Vec<String> {
    let t = line.trim();
    let t = t.strip_prefix('|').unwrap_or(t);
    let t = t.strip_suffix('|').unwrap_or(t);
    t.split('|').map(|c| c.trim().to_string()).collect()
}

/// Try to read a table starting at the first line.
///
/// A table is either a run of `|`-framed rows, or a run of rows containing
/// `|` whose second row is an alignment marker row. Returns the table and
/// the number of lines consumed.
fn parse_table(lines: &[&str]) -> Option<(Table, usize)> {
    let first = *lines.first()?;
    if !first.contains('|') {
        return None;
    }

    let marker_second = lines
        .get(1)
        .is_some_and(|l| l.contains('|') && split_cells(l).iter().all(|c| ALIGN_CELL.is_match(c)));

    let used = if marker_second {
        lines.iter().take_while(|l| l.contains('|')).count()
    } else if is_piped_row(first) {
        lines.iter().take_while(|l| is_piped_row(l)).count()
    } else {
        return None;
    };

    let mut rows = lines[..used].iter().map(|l| split_cells(l));
    let headers = rows.next()?;
    let aligns = if marker_second {
        rows.next()
            .map(|cells| cells.iter().map(|c| Align::parse(c)).collect())
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    Some((
        Table {
            headers,
            aligns,
            rows: rows.collect(),
        },
        used,
    ))
}

fn cell(tag: &str, content: &str, align: Option<Align>) -> String {
    match align {
        Some(a) => format!(
            r#"<{tag} style="text-align: {}">{}</{tag}>"#,
            a.as_css(),
            format_spans(content)
        ),
        None => format!("<{tag}>{}</{tag}>", format_spans(content)),
    }
}

fn render_table(table: &Table) -> String {
    let align_at = |i: usize| table.aligns.get(i).copied().flatten();
    let mut out = String::from(r#"<table class="markdown-table"><thead><tr>"#);
    for (i, h) in table.headers.iter().enumerate() {
        out.push_str(&cell("th", h, align_at(i)));
    }
    out.push_str("</tr></thead><tbody>");
    for row in &table.rows {
        out.push_str("<tr>");
        for (i, c) in row.iter().enumerate() {
            out.push_str(&cell("td", c, align_at(i)));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Group {
    Bullet,
    Numbered,
    Quote,
}

impl Group {
    const fn of(block: &Block) -> Option<Self> {
        match block {
            Block::Bullet(_) => Some(Self::Bullet),
            Block::Numbered(_) => Some(Self::Numbered),
            Block::Quote(_) => Some(Self::Quote),
            _ => None,
        }
    }

    const fn open(self) -> &'static str {
        match self {
            Self::Bullet => r#"<ul class="markdown-ul">"#,
            Self::Numbered => r#"<ol class="markdown-ol">"#,
            Self::Quote => r#"<div class="markdown-blockquote-group">"#,
        }
    }

    const fn close(self) -> &'static str {
        match self {
            Self::Bullet => "</ul>",
            Self::Numbered => "</ol>",
            Self::Quote => "</div>",
        }
    }
}

/// Render blocks, merging adjacent items of the same kind into one container.
fn render_blocks(blocks: &[Block]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut open: Option<(Group, String)> = None;

    for block in blocks {
        let group = Group::of(block);
        if let Some((g, buf)) = open.take() {
            if group == Some(g) {
                open = Some((g, buf));
            } else {
                parts.push(format!("{}{buf}{}", g.open(), g.close()));
            }
        }

        match block {
            Block::Bullet(t) => {
                let item = format!(r#"<li class="markdown-list">{}</li>"#, format_spans(t));
                push_item(&mut open, Group::Bullet, &item);
            }
            Block::Numbered(t) => {
                let item = format!(r#"<li class="markdown-ordered-list">{}</li>"#, format_spans(t));
                push_item(&mut open, Group::Numbered, &item);
            }
            Block::Quote(t) => {
                let item = format!(
                    r#"<blockquote class="markdown-blockquote">{}</blockquote>"#,
                    format_spans(t)
                );
                push_item(&mut open, Group::Quote, &item);
            }
            Block::Header(level, t) => {
                let class = if *level == 1 { "markdown-header" } else { "markdown-subheader" };
                parts.push(format!(r#"<h{level} class="{class}">{}</h{level}>"#, format_spans(t)));
            }
            Block::Table(table) => parts.push(render_table(table)),
            Block::Text(t) => parts.push(format_spans(t)),
        }
    }

    if let Some((g, buf)) = open {
        parts.push(format!("{}{buf}{}", g.open(), g.close()));
    }

    parts.join("\n")
}

fn push_item(open: &mut Option<(Group, String)>, group: Group, item: &str) {
    match open {
        Some((_, buf)) => buf.push_str(item),
        None => *open = Some((group, item.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inner(html: &str) -> &str {
        html.strip_prefix(r#"<div class="markdown-content">"#)
            .and_then(|s| s.strip_suffix("</div>"))
            .unwrap()
    }

    #[test]
    fn escapes_script_tags() {
        let out = format_inline("<script>alert('x') & more</script>");
        assert!(out.contains("&lt;script&gt;"));
        assert!(out.contains("&amp; more"));
        assert!(!out.contains("<script>"));
    }

    #[test]
    fn formatting_is_deterministic() {
        let text = "# Title\n- a\n- b\n**bold** and *it* `x<y`\n| h |\n|---|\n| 1 |";
        assert_eq!(format_inline(text), format_inline(text));
    }

    #[test]
    fn wraps_in_single_container() {
        let out = format_inline("plain");
        assert_eq!(out, r#"<div class="markdown-content">plain</div>"#);
    }

    #[test]
    fn code_spans_are_not_formatted_further() {
        let out = format_inline("see `**not bold**` here");
        assert!(out.contains(r#"<code class="inline-code">**not bold**</code>"#));
        assert!(!out.contains("<strong>"));
    }

    #[test]
    fn bold_and_italic() {
        let out = format_inline("**strong** then *soft*");
        assert_eq!(inner(&out), "<strong>strong</strong> then <em>soft</em>");
    }

    #[test]
    fn headers_by_level() {
        let out = format_inline("# One\n## Two\n### Three\n#### Four");
        assert!(out.contains(r#"<h1 class="markdown-header">One</h1>"#));
        assert!(out.contains(r#"<h2 class="markdown-subheader">Two</h2>"#));
        assert!(out.contains(r#"<h3 class="markdown-subheader">Three</h3>"#));
        assert!(out.contains("#### Four"));
    }

    #[test]
    fn adjacent_list_items_share_a_container() {
        let out = format_inline("- a\n* b\ntext\n- c");
        assert_eq!(
            inner(&out),
            concat!(
                r#"<ul class="markdown-ul"><li class="markdown-list">a</li><li class="markdown-list">b</li></ul>"#,
                "\ntext\n",
                r#"<ul class="markdown-ul"><li class="markdown-list">c</li></ul>"#,
            )
        );
    }

    #[test]
    fn ordered_and_unordered_runs_stay_separate() {
        let out = format_inline("1. one\n2. two\n- dash");
        assert!(out.contains(
            r#"<ol class="markdown-ol"><li class="markdown-ordered-list">one</li><li class="markdown-ordered-list">two</li></ol>"#
        ));
        assert!(out.contains(r#"<ul class="markdown-ul"><li class="markdown-list">dash</li></ul>"#));
    }

    #[test]
    fn quote_lines_group() {
        let out = format_inline("> a\n> b");
        assert_eq!(
            inner(&out),
            concat!(
                r#"<div class="markdown-blockquote-group">"#,
                r#"<blockquote class="markdown-blockquote">a</blockquote>"#,
                r#"<blockquote class="markdown-blockquote">b</blockquote>"#,
                "</div>"
            )
        );
    }

    #[test]
    fn links_with_safe_schemes_only() {
        let out = format_inline("[docs](https://example.com) [bad](javascript:alert(1))");
        assert!(out.contains(r#"<a href="https://example.com" class="markdown-link">docs</a>"#));
        assert!(out.contains("[bad](javascript:alert(1))"));
    }

    #[test]
    fn emphasis_does_not_reach_into_link_targets() {
        let out = format_inline("[*x*](https://a.com/*b*)");
        assert!(out.contains(r#"<a href="https://a.com/*b*" class="markdown-link"><em>x</em></a>"#));
    }

    #[test]
    fn link_href_quotes_are_escaped() {
        let out = format_inline(r#"[x](/a"b)"#);
        assert!(out.contains(r#"href="/a&quot;b""#));
    }

    #[test]
    fn table_with_alignment_row() {
        let out = format_inline("a|b\n:---|---:\n1|2");
        assert_eq!(
            inner(&out),
            concat!(
                r#"<table class="markdown-table"><thead><tr>"#,
                r#"<th style="text-align: left">a</th><th style="text-align: right">b</th>"#,
                "</tr></thead><tbody><tr>",
                r#"<td style="text-align: left">1</td><td style="text-align: right">2</td>"#,
                "</tr></tbody></table>"
            )
        );
    }

    #[test]
    fn table_center_and_short_rows() {
        let out = format_inline("| x | y | z |\n|:-:|---|\n| 1 |");
        assert!(out.contains(r#"<th style="text-align: center">x</th><th>y</th><th>z</th>"#));
        assert!(out.contains(r#"<tr><td style="text-align: center">1</td></tr>"#));
    }

    #[test]
    fn piped_rows_without_marker_row() {
        let out = format_inline("| h1 | h2 |\n| v1 | v2 |");
        assert!(out.contains("<thead><tr><th>h1</th><th>h2</th></tr></thead>"));
        assert!(out.contains("<tbody><tr><td>v1</td><td>v2</td></tr></tbody>"));
    }

    #[test]
    fn prose_with_a_pipe_is_not_a_table() {
        let out = format_inline("this | that");
        assert_eq!(inner(&out), "this | that");
    }

    #[test]
    fn unmatched_syntax_passes_through() {
        let out = format_inline("**open and `tick and [link](");
        assert_eq!(inner(&out), "**open and `tick and [link](");
    }

    #[test]
    fn placeholder_characters_in_input_are_neutralised() {
        let out = format_inline("\u{E000}0\u{E001} `x`");
        assert!(out.contains('\u{FFFD}'));
        assert_eq!(out.matches("inline-code").count(), 1);
    }
}
