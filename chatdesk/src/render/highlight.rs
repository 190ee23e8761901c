//! Syntax highlighting for read-only code blocks.

use std::sync::OnceLock;

use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::escape_html;

const THEME: &str = "base16-ocean.dark";

struct Assets {
    syntax_set: SyntaxSet,
    theme: Theme,
}

/// Syntect assets, loaded on first use.
fn assets() -> Option<&'static Assets> {
    static ASSETS: OnceLock<Option<Assets>> = OnceLock::new();
    ASSETS
        .get_or_init(|| {
            let syntax_set = SyntaxSet::load_defaults_newlines();
            let mut themes = ThemeSet::load_defaults().themes;
            let theme = themes
                .remove(THEME)
                .or_else(|| themes.into_values().next())?;
            Some(Assets { syntax_set, theme })
        })
        .as_ref()
}

/// Render `code` as highlighted HTML for the given language tag.
///
/// Unknown languages and highlighting failures fall back to an escaped
/// `<pre>` block.
pub fn highlight_code(code: &str, language: &str) -> String {
    let highlighted = assets().and_then(|a| {
        let syntax = a
            .syntax_set
            .find_syntax_by_token(language)
            .or_else(|| a.syntax_set.find_syntax_by_extension(language))?;
        match highlighted_html_for_string(code, &a.syntax_set, syntax, &a.theme) {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::debug!(language, error = %e, "highlighting failed");
                None
            }
        }
    });

    highlighted.unwrap_or_else(|| plain_block(code))
}

fn plain_block(code: &str) -> String {
    format!(r#"<pre class="code-plain"><code>{}</code></pre>"#, escape_html(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_is_escaped_plain() {
        let html = highlight_code("a < b", "no-such-language-xyz");
        assert_eq!(html, r#"<pre class="code-plain"><code>a &lt; b</code></pre>"#);
    }

    #[test]
    fn known_language_never_leaks_raw_tags() {
        let html = highlight_code("let x = \"<b>\";\n", "rs");
        assert!(html.starts_with("<pre"));
        assert!(!html.contains("<b>"));
    }
}
