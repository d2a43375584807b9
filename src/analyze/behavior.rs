//! Behavioral association scanner.
//!
//! Static text correlation only: identity tokens derived from an element are
//! searched for in inline script blocks and inline event-handler attributes.
//! External scripts are never read. Every occurrence is reported.

use lazy_static::lazy_static;
use regex::Regex;

use crate::document::{Document, Element, NodeId, ResourceSnapshot};
use crate::settings::Settings;

use super::frameworks::detect_frameworks;
use super::types::{ApiUsage, BehaviorData, CodeReference, Listener, ReferenceKind};

/// Characters kept on each side of an API-usage match.
pub const API_CONTEXT_SIZE: usize = 150;

/// Tags too common to be a useful search token.
const COMMON_TAGS: &[&str] = &["div", "span", "p", "a", "img", "ul", "li", "table", "tr", "td"];

lazy_static! {
    static ref API_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"fetch\s*\(").unwrap(),
        Regex::new(r"XMLHttpRequest").unwrap(),
        Regex::new(r"axios\.").unwrap(),
        Regex::new(r"\$\.ajax").unwrap(),
        Regex::new(r"\$\.get").unwrap(),
        Regex::new(r"\$\.post").unwrap(),
        Regex::new(r"addEventListener\s*\(").unwrap(),
        Regex::new(r"removeEventListener\s*\(").unwrap(),
    ];
    static ref JQUERY_CALL: Regex = Regex::new(r"(?:\bjQuery|\$)\s*\(").unwrap();
}

/// A block of script text the scanner searches.
#[derive(Debug, Clone)]
pub struct ScriptSource {
    pub label: String,
    pub content: String,
    pub kind: ReferenceKind,
}

/// Script text of a run, gathered once from the resource snapshot.
#[derive(Debug, Clone, Default)]
pub struct ScriptIndex {
    sources: Vec<ScriptSource>,
    jquery_present: bool,
    api_usage: Vec<ApiUsage>,
}

impl ScriptIndex {
    pub fn build(snapshot: &ResourceSnapshot) -> Self {
        let mut sources: Vec<ScriptSource> = snapshot
            .inline_scripts
            .iter()
            .map(|script| ScriptSource {
                label: script.label.clone(),
                content: script.content.clone(),
                kind: ReferenceKind::InlineScript,
            })
            .collect();
        sources.extend(snapshot.handlers.iter().map(|handler| ScriptSource {
            label: handler.label.clone(),
            content: handler.code.clone(),
            kind: ReferenceKind::EventHandler,
        }));

        let jquery_present = snapshot
            .external_scripts
            .iter()
            .any(|script| script.src.to_lowercase().contains("jquery"))
            || snapshot
                .inline_scripts
                .iter()
                .any(|script| JQUERY_CALL.is_match(&script.content));

        let mut api_usage = Vec::new();
        for script in &snapshot.inline_scripts {
            for pattern in API_PATTERNS.iter() {
                for found in pattern.find_iter(&script.content) {
                    api_usage.push(ApiUsage {
                        source: script.label.clone(),
                        api: found.as_str().to_string(),
                        context: context_window(
                            &script.content,
                            found.start(),
                            found.end(),
                            API_CONTEXT_SIZE,
                        ),
                    });
                }
            }
        }

        Self {
            sources,
            jquery_present,
            api_usage,
        }
    }

    pub fn sources(&self) -> &[ScriptSource] {
        &self.sources
    }

    pub fn jquery_present(&self) -> bool {
        self.jquery_present
    }

    pub fn api_usage(&self) -> &[ApiUsage] {
        &self.api_usage
    }
}

/// Search tokens for an element, deduplicated in first-seen order.
pub fn search_tokens(el: &Element) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();

    if let Some(id) = el.id() {
        tokens.push(id.to_string());
        tokens.push(format!("#{}", id));
        tokens.push(format!("\"{}\"", id));
        tokens.push(format!("'{}'", id));
        tokens.push(format!("getElementById('{}')", id));
        tokens.push(format!("getElementById(\"{}\")", id));
    }

    for class in el.classes() {
        tokens.push(class.to_string());
        tokens.push(format!(".{}", class));
        tokens.push(format!("\"{}\"", class));
        tokens.push(format!("'{}'", class));
        tokens.push(format!("getElementsByClassName('{}')", class));
        tokens.push(format!("getElementsByClassName(\"{}\")", class));
        tokens.push(format!("querySelectorAll('.{}')", class));
        tokens.push(format!("querySelector('.{}')", class));
    }

    for (name, value) in el.attrs().filter(|(name, _)| name.starts_with("data-")) {
        tokens.push(name.to_string());
        tokens.push(format!("[{}]", name));
        tokens.push(format!("{}=\"{}\"", name, value));
        tokens.push(format!("{}='{}'", name, value));
        tokens.push(format!("getAttribute('{}')", name));
        tokens.push(format!("dataset.{}", name.replacen("data-", "", 1)));
    }

    for (name, _) in el.attrs().filter(|(name, _)| name.starts_with("aria-")) {
        tokens.push(name.to_string());
        tokens.push(format!("[{}]", name));
        tokens.push(format!("getAttribute('{}')", name));
    }

    let tag = el.tag();
    if !COMMON_TAGS.contains(&tag) {
        tokens.push(tag.to_string());
        tokens.push(format!("<{}", tag));
        tokens.push(format!("getElementsByTagName('{}')", tag));
    }

    if let Some(name) = el.attr("name").filter(|n| !n.is_empty()) {
        tokens.push(name.to_string());
        tokens.push(format!("name=\"{}\"", name));
        tokens.push(format!("[name=\"{}\"]", name));
    }

    let mut unique: Vec<String> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if !token.trim().is_empty() && !unique.contains(&token) {
            unique.push(token);
        }
    }
    unique
}

/// Text around `content[start..end]`, `size` characters on each side, with
/// `...` marking each side that was cut.
pub fn context_window(content: &str, start: usize, end: usize, size: usize) -> String {
    let before = &content[..start];
    let from = if size == 0 {
        start
    } else {
        before
            .char_indices()
            .rev()
            .nth(size - 1)
            .map(|(i, _)| i)
            .unwrap_or(0)
    };
    let after = &content[end..];
    let to = end
        + after
            .char_indices()
            .nth(size)
            .map(|(i, _)| i)
            .unwrap_or(after.len());

    let mut context = String::with_capacity(to - from + 6);
    if from > 0 {
        context.push_str("...");
    }
    context.push_str(&content[from..to]);
    if to < content.len() {
        context.push_str("...");
    }
    context
}

/// Byte offsets of every occurrence of `token`, overlapping ones included.
fn occurrences(content: &str, token: &str) -> Vec<usize> {
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(offset) = content[from..].find(token) {
        let start = from + offset;
        found.push(start);
        from = start
            + content[start..]
                .chars()
                .next()
                .map(char::len_utf8)
                .unwrap_or(1);
        if from >= content.len() {
            break;
        }
    }
    found
}

/// Scan one element against the run's script index.
pub fn scan_element(
    doc: &Document,
    id: NodeId,
    scripts: &ScriptIndex,
    settings: &Settings,
) -> BehaviorData {
    let el = doc.element(id);
    let mut data = BehaviorData {
        listeners: el
            .attrs()
            .filter_map(|(name, value)| {
                name.strip_prefix("on").map(|event| Listener {
                    event: event.to_string(),
                    handler: value.to_string(),
                    kind: "inline".to_string(),
                    source: "HTML attribute".to_string(),
                })
            })
            .collect(),
        ..Default::default()
    };

    let tokens = search_tokens(el);
    if tokens.is_empty() {
        return data;
    }

    for source in scripts.sources() {
        for token in &tokens {
            for start in occurrences(&source.content, token) {
                data.references.push(CodeReference {
                    source: source.label.clone(),
                    token: token.clone(),
                    context: context_window(
                        &source.content,
                        start,
                        start + token.len(),
                        settings.js_context_size,
                    ),
                    kind: source.kind,
                });
            }
        }
    }

    if settings.enable_extended_search {
        if scripts.jquery_present() {
            for token in &tokens {
                let idioms = [
                    format!("$(\"{}\")", token),
                    format!("$('{}')", token),
                    format!("jQuery(\"{}\")", token),
                    format!("jQuery('{}')", token),
                ];
                for idiom in idioms {
                    data.references.push(CodeReference {
                        source: "jQuery Detection".to_string(),
                        token: token.clone(),
                        context: format!("{} // jQuery selector detected", idiom),
                        kind: ReferenceKind::FrameworkUsage,
                    });
                }
            }
        }
        for token in tokens.iter().filter(|t| t.starts_with('#')) {
            data.references.push(CodeReference {
                source: "Event Listener Pattern".to_string(),
                token: token.clone(),
                context: format!(
                    "document.getElementById('{}').addEventListener('event', handler)",
                    &token[1..]
                ),
                kind: ReferenceKind::EventPattern,
            });
        }
    }

    data.frameworks = detect_frameworks(el);
    data.api_usage = scripts.api_usage().to_vec();
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryLoader;

    const PAGE: &str = r#"<html><head>
<script src="/vendor/jquery.min.js"></script>
</head><body>
<button id="save" class="btn primary" data-action="store" aria-label="Save" name="save-btn" onclick="save()">Save</button>
<div></div>
<script>
const btn = document.getElementById('save');
btn.addEventListener('click', () => fetch('/api/save'));
</script>
</body></html>"#;

    fn setup() -> (Document, ScriptIndex) {
        let doc = Document::parse(PAGE);
        let snapshot = ResourceSnapshot::capture(&doc, &MemoryLoader::new());
        let scripts = ScriptIndex::build(&snapshot);
        (doc, scripts)
    }

    #[test]
    fn test_search_tokens_order() {
        let (doc, _) = setup();
        let button = doc.query("#save").unwrap();
        let tokens = search_tokens(doc.element(button));
        assert_eq!(
            &tokens[..6],
            &[
                "save",
                "#save",
                "\"save\"",
                "'save'",
                "getElementById('save')",
                "getElementById(\"save\")"
            ]
        );
        assert!(tokens.contains(&"querySelector('.primary')".to_string()));
        assert!(tokens.contains(&"dataset.action".to_string()));
        assert!(tokens.contains(&"data-action='store'".to_string()));
        assert!(tokens.contains(&"getAttribute('aria-label')".to_string()));
        assert!(tokens.contains(&"<button".to_string()));
        assert!(tokens.contains(&"[name=\"save-btn\"]".to_string()));
        let unique: std::collections::HashSet<&String> = tokens.iter().collect();
        assert_eq!(unique.len(), tokens.len());
    }

    #[test]
    fn test_common_tag_without_identity_has_no_tokens() {
        let (doc, scripts) = setup();
        let div = doc.query("body > div").unwrap();
        assert!(search_tokens(doc.element(div)).is_empty());
        let data = scan_element(&doc, div, &scripts, &Settings::default());
        assert!(data.references.is_empty());
        assert!(data.api_usage.is_empty());
    }

    #[test]
    fn test_scan_references_every_occurrence() {
        let (doc, scripts) = setup();
        let button = doc.query("#save").unwrap();
        let mut settings = Settings::default();
        settings.enable_extended_search = false;
        let data = scan_element(&doc, button, &scripts, &settings);

        assert_eq!(data.listeners.len(), 1);
        assert_eq!(data.listeners[0].event, "click");
        assert_eq!(data.listeners[0].handler, "save()");

        let save_hits: Vec<&CodeReference> = data
            .references
            .iter()
            .filter(|r| r.token == "save" && r.kind == ReferenceKind::InlineScript)
            .collect();
        assert_eq!(save_hits.len(), 2);
        assert!(data
            .references
            .iter()
            .any(|r| r.kind == ReferenceKind::EventHandler && r.token == "save"));

        let apis: Vec<&str> = data.api_usage.iter().map(|a| a.api.as_str()).collect();
        assert_eq!(apis, vec!["fetch(", "addEventListener("]);
    }

    #[test]
    fn test_extended_search() {
        let (doc, scripts) = setup();
        assert!(scripts.jquery_present());
        let button = doc.query("#save").unwrap();
        let data = scan_element(&doc, button, &scripts, &Settings::default());
        let tokens = search_tokens(doc.element(button));

        let jquery = data
            .references
            .iter()
            .filter(|r| r.kind == ReferenceKind::FrameworkUsage)
            .count();
        assert_eq!(jquery, tokens.len() * 4);
        let patterns: Vec<&CodeReference> = data
            .references
            .iter()
            .filter(|r| r.kind == ReferenceKind::EventPattern)
            .collect();
        assert_eq!(patterns.len(), 1);
        assert_eq!(
            patterns[0].context,
            "document.getElementById('save').addEventListener('event', handler)"
        );
    }

    #[test]
    fn test_context_window() {
        let text = "0123456789abcdefghij";
        assert_eq!(context_window(text, 10, 11, 3), "...789abcd...");
        assert_eq!(context_window(text, 1, 2, 3), "01234...");
        assert_eq!(context_window(text, 18, 19, 5), "...defghij");
        assert_eq!(context_window("ééxéé", 4, 5, 1), "...éxé...");
    }

    #[test]
    fn test_occurrences_overlap() {
        assert_eq!(occurrences("aaaa", "aa"), vec![0, 1, 2]);
        assert!(occurrences("abc", "x").is_empty());
    }
}
