//! HTML → plain text reduction shared by both retrieval strategies.
//!
//! Every tag and attribute is discarded, so links, image sources and any
//! embedded `javascript:`/`data:` references disappear with them. Only the
//! visible text nodes survive.

use scraper::{Html, Node};

/// Elements whose text content is never visible page text.
const SKIPPED: &[&str] = &[
    "script", "style", "noscript", "template", "textarea", "option", "svg", "iframe", "object",
];

/// Elements that start a new line in the output.
const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "td", "th", "title", "tr", "ul",
];

/// Marks a line that came from a `<pre>` block and keeps its spacing.
const PRE_MARK: char = '\u{E000}';

/// Reduce an HTML document to plain text.
pub fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut raw = String::with_capacity(html.len() / 2);

    for node in doc.root_element().descendants() {
        match node.value() {
            Node::Element(el) if BLOCK.contains(&el.name()) => {
                if !raw.ends_with('\n') {
                    raw.push('\n');
                }
            }
            Node::Text(text) => {
                let mut hidden = false;
                let mut preformatted = false;
                for el in node.ancestors().filter_map(|a| a.value().as_element()) {
                    hidden |= SKIPPED.contains(&el.name());
                    preformatted |= el.name() == "pre";
                }
                if hidden {
                    continue;
                }
                if preformatted {
                    push_preformatted(&mut raw, text);
                } else if !text.trim().is_empty() {
                    raw.push_str(text);
                } else if text.contains('\n') {
                    // Source formatting between tags.
                    if !raw.ends_with('\n') {
                        raw.push('\n');
                    }
                } else if !text.is_empty() {
                    raw.push(' ');
                }
            }
            _ => {}
        }
    }

    normalize_whitespace(&raw)
}

/// Append `<pre>` text, marking the start of every line it begins.
fn push_preformatted(raw: &mut String, text: &str) {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            raw.push('\n');
        }
        if raw.is_empty() || raw.ends_with('\n') {
            raw.push(PRE_MARK);
        }
        raw.push_str(line);
    }
}

/// Collapse intra-line whitespace, drop runs of blank lines down to one,
/// and trim the result. Preformatted lines keep their indentation.
fn normalize_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = true;

    for line in text.lines() {
        if let Some(pre) = line.strip_prefix(PRE_MARK) {
            let pre = pre.trim_end();
            previous_blank = pre.is_empty();
            lines.push(pre.to_string());
            continue;
        }
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            if !previous_blank {
                lines.push(String::new());
            }
            previous_blank = true;
        } else {
            lines.push(collapsed);
            previous_blank = false;
        }
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}
