//! Inline markup for rich text runs

use crate::blocks::{RichText, TextContent};
use crate::convert::TagRegistry;
use crate::rules::TagSource;

/// ` class="highlight-<color>"` for non-default colors, empty otherwise
pub fn color_class(color: &str) -> String {
    if color.is_empty() || color == "default" {
        String::new()
    } else {
        format!(" class=\"highlight-{}\"", html_escape::encode_double_quoted_attribute(color))
    }
}

fn render_run(run: &RichText) -> String {
    let a = &run.annotations;
    let mut out = html_escape::encode_text(&run.plain_text).to_string();
    if a.code {
        out = format!("<code>{}</code>", out);
    }
    if a.bold {
        out = format!("<strong>{}</strong>", out);
    }
    if a.italic {
        out = format!("<em>{}</em>", out);
    }
    if a.underline {
        out = format!("<u>{}</u>", out);
    }
    if a.strikethrough {
        out = format!("<del>{}</del>", out);
    }
    if a.color != "default" && !a.color.is_empty() {
        out = format!("<span{}>{}</span>", color_class(&a.color), out);
    }
    if let Some(href) = &run.href {
        out = format!(
            "<a href=\"{}\">{}</a>",
            html_escape::encode_double_quoted_attribute(href),
            out
        );
    }
    out
}

/// Render runs to inline markup, registering struck-through text as tags.
///
/// When strikethrough is the tag source those runs are tags only and are
/// left out of the markup.
pub fn render_runs(runs: &[RichText], tag_source: TagSource, tags: &mut TagRegistry) -> String {
    let mut out = String::new();
    for run in runs {
        if run.annotations.strikethrough {
            tags.add_strikethrough(&run.plain_text);
            if tag_source == TagSource::Strikethrough {
                continue;
            }
        }
        out.push_str(&render_run(run));
    }
    out
}

pub fn render_text(text: &TextContent, tag_source: TagSource, tags: &mut TagRegistry) -> String {
    render_runs(&text.rich_text, tag_source, tags)
}
