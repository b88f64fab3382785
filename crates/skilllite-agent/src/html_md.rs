//! HTML → Markdown Reducer: a depth-first DOM walk with a small per-tag
//! handler table.
//!
//! No teacher module covers HTML parsing, so this is new code built on
//! `html5ever`/`markup5ever_rcdom`, imported fresh per the "enrich from the
//! rest of the pack" rule rather than hand-rolled with a regex tag scanner.

use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "iframe", "noscript",
];

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out
}

fn element_attr(handle: &Handle, attr_name: &str) -> Option<String> {
    if let NodeData::Element { attrs, .. } = &handle.data {
        attrs
            .borrow()
            .iter()
            .find(|a| a.name.local.as_ref() == attr_name)
            .map(|a| a.value.to_string())
    } else {
        None
    }
}

fn text_content(handle: &Handle) -> String {
    let mut out = String::new();
    collect_text(handle, &mut out);
    collapse_whitespace(out.trim())
}

fn collect_text(handle: &Handle, out: &mut String) {
    match &handle.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { name, .. } => {
            let tag = name.local.as_ref();
            if SKIPPED_TAGS.contains(&tag) {
                return;
            }
            for child in handle.children.borrow().iter() {
                collect_text(child, out);
            }
        }
        _ => {
            for child in handle.children.borrow().iter() {
                collect_text(child, out);
            }
        }
    }
}

fn walk(handle: &Handle, in_pre: bool, out: &mut String) {
    match &handle.data {
        NodeData::Text { contents } => {
            let raw = contents.borrow();
            if in_pre {
                out.push_str(&raw);
            } else {
                out.push_str(&collapse_whitespace(&raw));
            }
        }
        NodeData::Element { name, .. } => {
            let tag = name.local.as_ref();
            if SKIPPED_TAGS.contains(&tag) {
                return;
            }
            match tag {
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    let level = tag.as_bytes()[1] - b'0';
                    out.push('\n');
                    out.push_str(&"#".repeat(level as usize));
                    out.push(' ');
                    walk_children(handle, in_pre, out);
                    out.push('\n');
                }
                "p" | "div" | "section" | "article" => {
                    out.push_str("\n\n");
                    walk_children(handle, in_pre, out);
                }
                "br" => out.push('\n'),
                "li" => {
                    out.push_str("\n- ");
                    walk_children(handle, in_pre, out);
                }
                "pre" => {
                    out.push_str("\n```\n");
                    walk_children(handle, true, out);
                    out.push_str("\n```\n");
                }
                "code" => {
                    if in_pre {
                        walk_children(handle, in_pre, out);
                    } else {
                        out.push('`');
                        walk_children(handle, in_pre, out);
                        out.push('`');
                    }
                }
                "a" => {
                    let href = element_attr(handle, "href").unwrap_or_default();
                    let text = text_content(handle);
                    out.push_str(&format!("[{text}]({href})"));
                }
                "strong" | "b" => {
                    out.push_str("**");
                    walk_children(handle, in_pre, out);
                    out.push_str("**");
                }
                "em" | "i" => {
                    out.push('*');
                    walk_children(handle, in_pre, out);
                    out.push('*');
                }
                _ => walk_children(handle, in_pre, out),
            }
        }
        _ => walk_children(handle, in_pre, out),
    }
}

fn walk_children(handle: &Handle, in_pre: bool, out: &mut String) {
    for child in handle.children.borrow().iter() {
        walk(child, in_pre, out);
    }
}

fn normalize_blank_lines(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut blank_run = 0;
    for line in s.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run <= 2 {
                out.push('\n');
            }
        } else {
            blank_run = 0;
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }
    out.trim().to_string()
}

/// Reduce an HTML document to a best-effort Markdown rendering.
pub fn reduce(html: &str) -> String {
    let dom: RcDom = parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .unwrap_or_default();
    let mut out = String::new();
    walk(&dom.document, false, &mut out);
    normalize_blank_lines(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_and_paragraphs_render() {
        let md = reduce("<h1>Title</h1><p>Hello <b>world</b></p>");
        assert!(md.contains("# Title"));
        assert!(md.contains("Hello **world**"));
    }

    #[test]
    fn links_capture_text_and_href_without_recursing_into_markup() {
        let md = reduce(r#"<a href="https://example.com">click <b>me</b></a>"#);
        assert!(md.contains("[click me](https://example.com)"));
    }

    #[test]
    fn pre_blocks_preserve_whitespace_and_suppress_code_backticks() {
        let md = reduce("<pre><code>fn main() {\n    println!();\n}</code></pre>");
        assert!(md.contains("```"));
        assert!(md.contains("    println!();"));
        assert!(!md.contains("`fn"));
    }

    #[test]
    fn script_and_style_are_skipped_entirely() {
        let md = reduce("<p>keep</p><script>evil()</script><style>.x{}</style>");
        assert!(md.contains("keep"));
        assert!(!md.contains("evil"));
        assert!(!md.contains(".x{}"));
    }

    #[test]
    fn list_items_render_with_dash_prefix() {
        let md = reduce("<ul><li>one</li><li>two</li></ul>");
        assert!(md.contains("- one"));
        assert!(md.contains("- two"));
    }
}
