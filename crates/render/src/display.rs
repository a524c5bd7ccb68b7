//! Display primitives produced by the renderer.

use std::collections::BTreeMap;

/// A rendered node, ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Display {
    /// A top-level line of text.
    Paragraph { class: String, text: String },
    /// Text inside an element.
    Text(String),
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        children: Vec<Display>,
    },
    Image {
        src: String,
        attributes: BTreeMap<String, String>,
        /// False when the cache failed and `src` is the original URL.
        loaded: bool,
    },
}

const VOID_TAGS: &[&str] = &["area", "br", "col", "embed", "hr", "img", "input", "source", "wbr"];

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

fn safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':')
}

fn push_attributes(out: &mut String, attributes: &BTreeMap<String, String>) {
    for (name, value) in attributes {
        // Event handlers and malformed names never reach the output.
        if !safe_name(name) || name.to_ascii_lowercase().starts_with("on") {
            continue;
        }
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_into(out, value);
        out.push('"');
    }
}

impl Display {
    /// Serialize to HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            Display::Paragraph { class, text } => {
                out.push_str("<p class=\"");
                escape_into(out, class);
                out.push_str("\">");
                escape_into(out, text);
                out.push_str("</p>");
            }
            Display::Text(text) => escape_into(out, text),
            Display::Element {
                tag,
                attributes,
                children,
            } => {
                let tag = if safe_name(tag) {
                    tag.to_ascii_lowercase()
                } else {
                    "span".to_string()
                };
                if matches!(tag.as_str(), "script" | "style" | "iframe") {
                    return;
                }

                out.push('<');
                out.push_str(&tag);
                push_attributes(out, attributes);
                out.push('>');
                if VOID_TAGS.contains(&tag.as_str()) {
                    return;
                }
                for child in children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');
            }
            Display::Image {
                src, attributes, ..
            } => {
                out.push_str("<img src=\"");
                escape_into(out, src);
                out.push('"');
                push_attributes(out, attributes);
                out.push('>');
            }
        }
    }
}

/// Serialize a sequence of primitives, one per line.
pub fn to_html(nodes: &[Display]) -> String {
    nodes
        .iter()
        .map(Display::to_html)
        .collect::<Vec<_>>()
        .join("\n")
}
