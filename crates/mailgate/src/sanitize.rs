//! HTML to plain text conversion for email bodies.
//!
//! Markup is first reduced by ammonia to a small set of block tags, with
//! script and style content dropped. The cleaned fragment is then parsed and
//! its text nodes are written out with entities decoded and a line break
//! wherever a block starts or ends.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html};

/// Tags that start a new line in the text output.
const BLOCK_TAGS: [&str; 18] = [
    "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre",
    "table", "tr", "hr", "section", "article",
];

static BLOCKS_ONLY: LazyLock<ammonia::Builder<'static>> = LazyLock::new(|| {
    let mut builder = ammonia::Builder::empty();
    builder
        .tags(BLOCK_TAGS.iter().copied().chain(["br"]).collect())
        .clean_content_tags(HashSet::from(["script", "style"]));
    builder
});

/// Convert `html` to plain text.
///
/// Entities are decoded (`&amp;` becomes `&`), runs of whitespace collapse
/// to one space, block elements and `<br>` become line breaks, and
/// surrounding whitespace is trimmed.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let cleaned = BLOCKS_ONLY.clean(html).to_string();
    let fragment = Html::parse_fragment(&cleaned);

    let mut out = String::new();
    write_text(fragment.root_element(), &mut out);

    out.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn write_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            push_text(out, text);
        } else if let Some(child) = ElementRef::wrap(child) {
            match child.value().name() {
                "br" => {
                    trim_trailing_spaces(out);
                    out.push('\n');
                }
                name if BLOCK_TAGS.contains(&name) => {
                    line_break(out);
                    write_text(child, out);
                    line_break(out);
                }
                _ => write_text(child, out),
            }
        }
    }
}

fn push_text(out: &mut String, text: &str) {
    for c in text.chars() {
        if c.is_whitespace() {
            if !out.is_empty() && !out.ends_with([' ', '\n']) {
                out.push(' ');
            }
        } else {
            out.push(c);
        }
    }
}

fn line_break(out: &mut String) {
    trim_trailing_spaces(out);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn trim_trailing_spaces(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
}
