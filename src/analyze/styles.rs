//! Style rule matching.
//!
//! Every reachable rule is flattened into a [`RuleIndex`] once per run, with
//! its selector parsed and its specificity scored. Rules nested in
//! conditional groups carry the condition in their source label. Selectors
//! that fail to parse are skipped one rule at a time.

use tracing::debug;

use crate::css::{
    parse_declarations, specificity, CssRule, Declaration, SelectorList, StyleRule,
};
use crate::document::{Document, NodeId, ResourceSnapshot};

use super::types::{NestedInlineStyle, NestedStyles, RuleMatch, SourceMatches};

/// Source label of an element's own `style` attribute.
pub const INLINE_STYLE_SOURCE: &str = "inline style";

/// A style rule ready for matching.
#[derive(Debug, Clone)]
pub struct IndexedRule {
    /// Source label, annotated with enclosing group conditions.
    pub source: String,
    pub selector_text: String,
    selector: SelectorList,
    pub css_text: String,
    pub specificity: u32,
    pub declarations: Vec<Declaration>,
    /// Nested in a conditional group; reported but not applied.
    pub conditional: bool,
}

#[derive(Debug, Clone)]
struct IndexedSource {
    label: String,
    blocked: bool,
    rules: Vec<IndexedRule>,
}

/// All style rules of a run, in source order.
#[derive(Debug, Clone, Default)]
pub struct RuleIndex {
    sources: Vec<IndexedSource>,
    skipped: usize,
}

impl RuleIndex {
    pub fn build(snapshot: &ResourceSnapshot) -> Self {
        let mut index = RuleIndex::default();
        for source in &snapshot.styles {
            let mut indexed = IndexedSource {
                label: source.label.clone(),
                blocked: source.is_blocked(),
                rules: Vec::new(),
            };
            if let Some(sheet) = source.stylesheet() {
                for rule in &sheet.rules {
                    index.flatten(rule, &source.label, false, &mut indexed.rules);
                }
            }
            index.sources.push(indexed);
        }
        index
    }

    fn flatten(
        &mut self,
        rule: &CssRule,
        label: &str,
        conditional: bool,
        out: &mut Vec<IndexedRule>,
    ) {
        match rule {
            CssRule::Style(style) => match index_rule(style, label, conditional) {
                Some(indexed) => out.push(indexed),
                None => self.skipped += 1,
            },
            CssRule::Group(group) => {
                let nested_label = format!("{} ({}: {})", label, group.kind.label(), group.condition);
                for nested in &group.rules {
                    self.flatten(nested, &nested_label, true, out);
                }
            }
            CssRule::Other(_) => {}
        }
    }

    /// Number of rules dropped because their selector could not be parsed.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn rule_count(&self) -> usize {
        self.sources.iter().map(|s| s.rules.len()).sum()
    }

    /// Rules matching an element, with their global source-order position.
    pub fn matching<'a>(
        &'a self,
        doc: &'a Document,
        id: NodeId,
    ) -> impl Iterator<Item = (usize, &'a IndexedRule)> + 'a {
        self.sources
            .iter()
            .flat_map(|source| source.rules.iter())
            .enumerate()
            .filter(move |(_, rule)| rule.selector.matches(doc, id))
    }

    /// Matches for an element grouped by source label, in source order.
    /// Blocked sources are always listed, with no rules.
    pub fn match_rules(&self, doc: &Document, id: NodeId) -> Vec<SourceMatches> {
        let mut groups: Vec<SourceMatches> = Vec::new();
        for source in &self.sources {
            if source.blocked {
                group_for(&mut groups, &source.label).blocked = true;
                continue;
            }
            for rule in source.rules.iter().filter(|r| r.selector.matches(doc, id)) {
                group_for(&mut groups, &rule.source).rules.push(RuleMatch {
                    source: rule.source.clone(),
                    selector: rule.selector_text.clone(),
                    css_text: rule.css_text.clone(),
                    specificity: rule.specificity,
                });
            }
        }

        if let Some(inline) = inline_style_match(doc, id) {
            group_for(&mut groups, INLINE_STYLE_SOURCE).rules.push(inline);
        }
        groups
    }
}

fn group_for<'a>(groups: &'a mut Vec<SourceMatches>, label: &str) -> &'a mut SourceMatches {
    let position = match groups.iter().position(|g| g.source == label) {
        Some(position) => position,
        None => {
            groups.push(SourceMatches {
                source: label.to_string(),
                blocked: false,
                rules: Vec::new(),
            });
            groups.len() - 1
        }
    };
    &mut groups[position]
}

fn index_rule(rule: &StyleRule, label: &str, conditional: bool) -> Option<IndexedRule> {
    match SelectorList::parse(&rule.selector) {
        Ok(selector) => Some(IndexedRule {
            source: label.to_string(),
            selector_text: rule.selector.clone(),
            selector,
            css_text: rule.css_text(),
            specificity: specificity(&rule.selector),
            declarations: rule.declarations.clone(),
            conditional,
        }),
        Err(error) => {
            debug!(selector = %rule.selector, %error, source = label, "skipping rule");
            None
        }
    }
}

/// The element's `style` attribute as a rule match.
pub fn inline_style_match(doc: &Document, id: NodeId) -> Option<RuleMatch> {
    let style = doc.element(id).attr("style")?;
    let declarations = parse_declarations(style);
    if declarations.is_empty() {
        return None;
    }
    let selector = doc.generate_selector(id);
    let body: Vec<String> = declarations.iter().map(Declaration::css_text).collect();
    Some(RuleMatch {
        source: INLINE_STYLE_SOURCE.to_string(),
        css_text: format!("{} {{ {} }}", selector, body.join(" ")),
        specificity: specificity(&selector),
        selector,
    })
}

/// `tag#id.class1.class2`: the key used for ancestors and nested elements.
pub fn element_signature(doc: &Document, id: NodeId) -> String {
    let el = doc.element(id);
    let mut key = el.tag().to_string();
    if let Some(element_id) = el.id() {
        key.push('#');
        key.push_str(element_id);
    }
    for class in el.classes() {
        key.push('.');
        key.push_str(class);
    }
    key
}

/// Style blocks and styled elements inside the element's declarative
/// shadow root.
pub fn nested_styles(doc: &Document, id: NodeId) -> Option<NestedStyles> {
    let shadow = doc.shadow_root(id)?;
    let mut nested = NestedStyles::default();
    for inner in doc.template_contents(shadow) {
        let el = doc.element(inner);
        if el.tag() == "style" {
            nested.style_blocks.push(doc.text_content(inner));
        }
        if let Some(style) = el.attr("style") {
            nested.styled_elements.push(NestedInlineStyle {
                selector: element_signature(doc, inner),
                style: style.to_string(),
            });
        }
    }
    Some(nested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryLoader;

    const PAGE: &str = r#"<html><head>
<link rel="stylesheet" href="https://cdn.example.net/theme.css">
<style>
  p { color: black; }
  .note { color: blue; }
  #main .note { font-weight: bold; }
  p:bogus(1) { color: red; }
  @media (max-width: 600px) { .note { font-size: 12px; } }
  @supports (display: grid) { @media print { p { display: none; } } }
</style>
</head><body><div id="main"><p class="note" style="margin: 0; color: green">hi</p></div>
<section id="host"><template shadowrootmode="open"><style>:host { display: block; }</style><b style="color: red">x</b></template></section>
</body></html>"#;

    fn setup() -> (Document, RuleIndex) {
        let doc = Document::parse(PAGE);
        let snapshot = ResourceSnapshot::capture(&doc, &MemoryLoader::new());
        let index = RuleIndex::build(&snapshot);
        (doc, index)
    }

    #[test]
    fn test_index_skips_bad_selectors() {
        let (_, index) = setup();
        assert_eq!(index.rule_count(), 5);
        assert_eq!(index.skipped(), 1);
    }

    #[test]
    fn test_match_groups() {
        let (doc, index) = setup();
        let note = doc.query("p.note").unwrap();
        let groups = index.match_rules(&doc, note);

        let labels: Vec<&str> = groups.iter().map(|g| g.source.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "https://cdn.example.net/theme.css",
                "inline",
                "inline (Media: (max-width: 600px))",
                "inline (Supports: (display: grid)) (Media: print)",
                "inline style",
            ]
        );
        assert!(groups[0].blocked);
        assert_eq!(groups[0].rule_count(), 0);

        let specificities: Vec<u32> = groups[1].rules.iter().map(|r| r.specificity).collect();
        assert_eq!(specificities, vec![1, 10, 110]);
        assert_eq!(groups[4].rules[0].css_text, "p.note { margin: 0; color: green; }");
        assert_eq!(groups[4].rules[0].specificity, 11);
    }

    #[test]
    fn test_blocked_source_listed_without_matches() {
        let (doc, index) = setup();
        let div = doc.query("#main").unwrap();
        let groups = index.match_rules(&doc, div);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].blocked);
    }

    #[test]
    fn test_nested_styles() {
        let (doc, _) = setup();
        let host = doc.query("#host").unwrap();
        let nested = nested_styles(&doc, host).unwrap();
        assert_eq!(nested.style_blocks, vec![":host { display: block; }"]);
        assert_eq!(nested.styled_elements[0].selector, "b");
        assert_eq!(nested.styled_elements[0].style, "color: red");

        assert!(nested_styles(&doc, doc.query("#main").unwrap()).is_none());
    }

    #[test]
    fn test_element_signature() {
        let doc = Document::parse(r#"<html><body><div id="a" class="x y"></div></body></html>"#);
        assert_eq!(element_signature(&doc, doc.query("#a").unwrap()), "div#a.x.y");
    }
}
