//! Serialization of screen lines to HTML and plain text
//!
//! The HTML renderer walks one logical line at a time (a run of screen
//! lines up to and including the next hard line break) and coalesces
//! adjacent cells into as few tags as possible. ANSI color boundaries and
//! OSC 8 link boundaries interleave freely in the input, so the walker
//! keeps a small LIFO stack of open tags and re-nests by close-and-reopen,
//! which guarantees well-formed output.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{SecondsFormat, TimeZone, Utc};

use crate::bk::BK_NAMESPACE;
use crate::line::ScreenLine;
use crate::node::Node;
use crate::url::sanitize_url;

/// Escapes a cell character into the output buffer. Cell text gets the
/// widest escape table, including the slash.
pub(crate) fn push_escaped(buf: &mut String, c: char) {
    match c {
        '&' => buf.push_str("&amp;"),
        '\'' => buf.push_str("&#39;"),
        '<' => buf.push_str("&lt;"),
        '>' => buf.push_str("&gt;"),
        '"' => buf.push_str("&quot;"),
        '/' => buf.push_str("&#47;"),
        c => buf.push(c),
    }
}

/// HTML-escapes an attribute or element value. Slashes stay literal here;
/// escaping them would mangle every URL.
pub(crate) fn html_escape(s: &str) -> String {
    let mut buf = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '\'' => buf.push_str("&#39;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' => buf.push_str("&quot;"),
            c => buf.push(c),
        }
    }
    buf
}

/// Tags the line walker may have open, innermost last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Anchor,
    Span,
}

impl Tag {
    fn close(self) -> &'static str {
        match self {
            Tag::Anchor => "</a>",
            Tag::Span => "</span>",
        }
    }
}

/// Renders the screen lines making up one logical line as HTML, with a
/// trailing newline. Empty lines render as `&nbsp;` so they survive HTML
/// whitespace collapsing.
pub(crate) fn logical_line_html(parts: &[ScreenLine], timestamps: bool) -> String {
    let mut buf = String::new();

    if timestamps {
        if let Some(stamp) = merged_timestamp(parts) {
            let _ = write!(buf, r#"<time datetime="{stamp}">{stamp}</time>"#);
        }
    }

    let mut stack: Vec<Tag> = Vec::new();
    // The zero-value cell stands in for "before the first cell".
    let mut prev = Node::EMPTY;
    let mut prev_url = "";

    for part in parts {
        for (col, node) in part.nodes.iter().enumerate() {
            let url = if node.style.hyperlink() {
                part.link_at(col)
            } else {
                ""
            };
            let anchor_changes = node.style.hyperlink() != prev.style.hyperlink()
                || (node.style.hyperlink() && prev.style.hyperlink() && url != prev_url);
            let span_changes = !node.style.same_appearance(prev.style);

            // Close from the first changed tag upward, innermost first.
            let changed = |tag: &Tag| match tag {
                Tag::Anchor => anchor_changes,
                Tag::Span => span_changes,
            };
            if let Some(pos) = stack.iter().position(changed) {
                for tag in stack.split_off(pos).into_iter().rev() {
                    buf.push_str(tag.close());
                }
            }

            if node.style.hyperlink() && !stack.contains(&Tag::Anchor) {
                let _ = write!(buf, r#"<a href="{}">"#, html_escape(sanitize_url(url)));
                stack.push(Tag::Anchor);
            }
            if !node.style.is_plain() && !stack.contains(&Tag::Span) {
                let _ = write!(
                    buf,
                    r#"<span class="{}">"#,
                    node.style.css_classes().join(" ")
                );
                stack.push(Tag::Span);
            }

            if let Some(idx) = node.element_index() {
                if let Some(elem) = part.elements.get(idx) {
                    buf.push_str(&elem.as_html());
                }
            } else {
                push_escaped(&mut buf, node.rune());
            }

            prev = *node;
            prev_url = url;
        }
    }

    for tag in stack.drain(..).rev() {
        buf.push_str(tag.close());
    }

    let trimmed = buf.trim_end_matches([' ', '\t']).len();
    buf.truncate(trimmed);
    if buf.is_empty() {
        buf.push_str("&nbsp;");
    }
    buf.push('\n');
    buf
}

/// Merges `bk` metadata across the parts of a logical line (last write
/// wins per key) and formats the `t` timestamp. Malformed timestamps are
/// silently skipped.
fn merged_timestamp(parts: &[ScreenLine]) -> Option<String> {
    let mut merged: HashMap<&str, &str> = HashMap::new();
    for part in parts {
        if let Some(bk) = part.metadata.get(BK_NAMESPACE) {
            for (key, value) in bk {
                merged.insert(key, value);
            }
        }
    }
    let millis = merged.get("t")?.parse::<i64>().ok()?;
    let time = Utc.timestamp_millis_opt(millis).single()?;
    Some(time.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Renders screen lines as plain text: element cells are skipped, trailing
/// whitespace is trimmed at hard line breaks, soft-wrapped lines are
/// joined, and the final trailing newline is dropped.
pub(crate) fn plain_text(lines: &[ScreenLine]) -> String {
    let mut buf = String::new();
    let mut line_start = 0;
    for line in lines {
        for node in &line.nodes {
            if !node.style.element() {
                buf.push(node.rune());
            }
        }
        if line.newline {
            trim_segment_end(&mut buf, line_start);
            buf.push('\n');
            line_start = buf.len();
        }
    }
    trim_segment_end(&mut buf, line_start);
    if buf.ends_with('\n') {
        buf.pop();
    }
    buf
}

fn trim_segment_end(buf: &mut String, start: usize) {
    let trimmed = buf[start..].trim_end_matches([' ', '\t']).len();
    buf.truncate(start + trimmed);
}
