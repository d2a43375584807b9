//! Markup renderings of an analyzed subtree.

use crate::analyze::truncate_chars;
use crate::document::{Document, NodeId};
use crate::settings::Settings;

/// Attributes kept by the simplified markup besides `id` and `class`.
/// Entries ending in `-` are prefixes.
const IMPORTANT_ATTRIBUTES: &[&str] = &[
    "src", "href", "alt", "title", "data-", "aria-", "role", "type", "name", "value",
];

fn is_important(name: &str) -> bool {
    IMPORTANT_ATTRIBUTES.iter().any(|keep| {
        if keep.ends_with('-') {
            name.starts_with(keep)
        } else {
            name == *keep
        }
    })
}

fn open_tag(doc: &Document, id: NodeId) -> String {
    let el = doc.element(id);
    let mut tag = format!("<{}", el.tag());
    if let Some(element_id) = el.id().filter(|i| !i.is_empty()) {
        tag.push_str(&format!(" id=\"{}\"", element_id));
    }
    if let Some(class) = el.attr("class").filter(|c| !c.is_empty()) {
        tag.push_str(&format!(" class=\"{}\"", class));
    }
    tag
}

/// Indented echo of opening and closing tags with `id` and `class`, one
/// per line. Levels deeper than `max_display_depth` are left out and each
/// node lists at most `max_export_children` children.
pub fn structure_echo(doc: &Document, root: NodeId, settings: &Settings) -> String {
    let mut out = String::new();
    echo(doc, root, 0, settings, &mut out);
    out
}

fn echo(doc: &Document, id: NodeId, depth: usize, settings: &Settings, out: &mut String) {
    if depth > settings.max_display_depth {
        return;
    }
    let indent = "  ".repeat(depth);
    let tag = doc.element(id).tag();
    out.push_str(&format!("{}{}>\n", indent, open_tag(doc, id)));

    let children = doc.children(id);
    for &child in children.iter().take(settings.max_export_children) {
        echo(doc, child, depth + 1, settings, out);
    }
    if children.len() > settings.max_export_children {
        out.push_str(&format!(
            "{}  <!-- {} more children omitted -->\n",
            indent,
            children.len() - settings.max_export_children
        ));
    }
    out.push_str(&format!("{}</{}>\n", indent, tag));
}

/// Simplified markup: `id`, `class` and descriptive attributes only, leaf
/// text cut to `max_text_length`, at most `max_children_display` children
/// per node, and `<tag>...</tag>` below `max_display_depth`.
pub fn simplified_markup(doc: &Document, root: NodeId, settings: &Settings) -> String {
    simplify(doc, root, 0, settings)
}

fn simplify(doc: &Document, id: NodeId, depth: usize, settings: &Settings) -> String {
    let el = doc.element(id);
    let indent = " ".repeat(depth * 2);
    if depth > settings.max_display_depth {
        return format!("{}<{}>...</{}>", indent, el.tag(), el.tag());
    }

    let mut html = format!("{}{}", indent, open_tag(doc, id));
    for (name, value) in el.attrs() {
        if name != "id" && name != "class" && is_important(name) {
            html.push_str(&format!(" {}=\"{}\"", name, value));
        }
    }
    html.push('>');

    let children = doc.children(id);
    if children.is_empty() {
        let text = doc.text_content(id);
        html.push_str(&truncate_chars(text.trim(), settings.max_text_length));
    } else {
        html.push('\n');
        for &child in children.iter().take(settings.max_children_display) {
            html.push_str(&simplify(doc, child, depth + 1, settings));
            html.push('\n');
        }
        if children.len() > settings.max_children_display {
            html.push_str(&format!(
                "{}<!-- {} more children -->\n",
                " ".repeat((depth + 1) * 2),
                children.len() - settings.max_children_display
            ));
        }
        html.push_str(&indent);
    }
    html.push_str(&format!("</{}>", el.tag()));
    html
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
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
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body><nav id="top" class="bar dark" data-x="1" style="color: red" onclick="go()">
<a href="/home" title="Home">Home</a><a href="/about">About us and everything else</a><a href="/c">C</a>
</nav></body></html>"#;

    #[test]
    fn test_structure_echo() {
        let doc = Document::parse(PAGE);
        let nav = doc.query("#top").unwrap();
        let settings = Settings {
            max_export_children: 2,
            ..Settings::default()
        };
        let echo = structure_echo(&doc, nav, &settings);
        assert_eq!(
            echo,
            "<nav id=\"top\" class=\"bar dark\">\n  <a>\n  </a>\n  <a>\n  </a>\n  <!-- 1 more children omitted -->\n</nav>\n"
        );
    }

    #[test]
    fn test_structure_echo_depth_limit() {
        let doc = Document::parse(PAGE);
        let settings = Settings {
            max_display_depth: 0,
            ..Settings::default()
        };
        let echo = structure_echo(&doc, doc.query("#top").unwrap(), &settings);
        assert_eq!(echo, "<nav id=\"top\" class=\"bar dark\">\n</nav>\n");
    }

    #[test]
    fn test_simplified_markup() {
        let doc = Document::parse(PAGE);
        let settings = Settings {
            max_children_display: 2,
            max_text_length: 10,
            ..Settings::default()
        };
        let html = simplified_markup(&doc, doc.query("#top").unwrap(), &settings);
        let lines: Vec<&str> = html.lines().collect();
        assert_eq!(lines[0], "<nav id=\"top\" class=\"bar dark\" data-x=\"1\">");
        assert_eq!(lines[1], "  <a href=\"/home\" title=\"Home\">Home</a>");
        assert_eq!(lines[2], "  <a href=\"/about\">About u...</a>");
        assert_eq!(lines[3], "  <!-- 1 more children -->");
        assert_eq!(lines[4], "</nav>");
    }

    #[test]
    fn test_simplified_markup_below_depth() {
        let doc = Document::parse(PAGE);
        let settings = Settings {
            max_display_depth: 0,
            ..Settings::default()
        };
        let html = simplified_markup(&doc, doc.query("#top").unwrap(), &settings);
        assert!(html.contains("\n  <a>...</a>\n"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
