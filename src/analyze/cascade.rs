//! Static cascade resolution.
//!
//! Resolves the effective declared value of each property for an element
//! from the unconditional rules that match it and its `style` attribute.
//! Results are memoized per run, so resolving an ancestor chain costs one
//! resolution per element.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::css::{parse_declarations, Declaration};
use crate::document::{Document, NodeId};

use super::inherit::{is_inheritable, INHERITABLE_PROPERTIES};
use super::styles::RuleIndex;

/// Keyword that resets a property to "no value".
pub const INITIAL: &str = "initial";

/// Effective values of one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedStyle {
    pub properties: BTreeMap<String, String>,
    /// Custom properties (`--name`), inherited ones included.
    pub custom: BTreeMap<String, String>,
}

/// Precedence of one candidate declaration; larger wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Precedence {
    important: bool,
    from_attribute: bool,
    specificity: u32,
    order: usize,
}

/// Per-run memo of resolved styles.
#[derive(Debug, Default)]
pub struct Cascade {
    memo: HashMap<NodeId, Rc<ResolvedStyle>>,
}

impl Cascade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, doc: &Document, index: &RuleIndex, id: NodeId) -> Rc<ResolvedStyle> {
        if let Some(style) = self.memo.get(&id) {
            return Rc::clone(style);
        }

        // Resolve the unresolved part of the ancestor chain top-down.
        let mut chain = vec![id];
        chain.extend(
            doc.ancestors(id)
                .take_while(|ancestor| !self.memo.contains_key(ancestor)),
        );
        let mut resolved = None;
        for node in chain.into_iter().rev() {
            let parent = doc.parent(node).and_then(|p| self.memo.get(&p).cloned());
            let style = Rc::new(compute(doc, index, node, parent.as_deref()));
            self.memo.insert(node, Rc::clone(&style));
            resolved = Some(style);
        }
        resolved.unwrap_or_default()
    }
}

fn compute(
    doc: &Document,
    index: &RuleIndex,
    id: NodeId,
    parent: Option<&ResolvedStyle>,
) -> ResolvedStyle {
    let attribute_declarations = doc
        .element(id)
        .attr("style")
        .map(parse_declarations)
        .unwrap_or_default();
    let mut candidates: Vec<(Precedence, &Declaration)> = Vec::new();
    for (order, rule) in index.matching(doc, id) {
        if rule.conditional {
            continue;
        }
        for declaration in &rule.declarations {
            candidates.push((
                Precedence {
                    important: declaration.important,
                    from_attribute: false,
                    specificity: rule.specificity,
                    order,
                },
                declaration,
            ));
        }
    }

    for (order, declaration) in attribute_declarations.iter().enumerate() {
        candidates.push((
            Precedence {
                important: declaration.important,
                from_attribute: true,
                specificity: 0,
                order,
            },
            declaration,
        ));
    }

    candidates.sort_by_key(|(precedence, _)| *precedence);
    let mut declared: BTreeMap<&str, &str> = BTreeMap::new();
    for (_, declaration) in &candidates {
        declared.insert(&declaration.property, &declaration.value);
    }

    let parent_value = |property: &str| -> Option<String> {
        parent.and_then(|p| {
            p.properties
                .get(property)
                .or_else(|| p.custom.get(property))
                .cloned()
        })
    };

    let mut style = ResolvedStyle {
        custom: parent.map(|p| p.custom.clone()).unwrap_or_default(),
        ..Default::default()
    };

    for (property, value) in &declared {
        let keyword = value.to_ascii_lowercase();
        let custom = property.starts_with("--");
        let resolved = match keyword.as_str() {
            INITIAL => None,
            "inherit" => parent_value(property),
            "unset" | "revert" | "revert-layer" if custom || is_inheritable(property) => {
                parent_value(property)
            }
            "unset" | "revert" | "revert-layer" => None,
            _ => Some(value.to_string()),
        };
        let target = if custom {
            &mut style.custom
        } else {
            &mut style.properties
        };
        match resolved {
            Some(value) => {
                target.insert(property.to_string(), value);
            }
            None => {
                target.remove(*property);
            }
        }
    }

    if let Some(parent) = parent {
        for property in INHERITABLE_PROPERTIES.iter() {
            if declared.contains_key(property) {
                continue;
            }
            if let Some(value) = parent.properties.get(*property) {
                style
                    .properties
                    .insert(property.to_string(), value.clone());
            }
        }
    }

    style
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{MemoryLoader, ResourceSnapshot};

    fn resolve(html: &str, query: &str) -> ResolvedStyle {
        let doc = Document::parse(html);
        let snapshot = ResourceSnapshot::capture(&doc, &MemoryLoader::new());
        let index = RuleIndex::build(&snapshot);
        let mut cascade = Cascade::new();
        let id = doc.query(query).unwrap();
        let style = cascade.resolve(&doc, &index, id);
        (*style).clone()
    }

    #[test]
    fn test_specificity_then_order() {
        let style = resolve(
            r#"<html><head><style>
#t { color: red; }
p.x { color: blue; margin: 1px; }
p { margin: 2px; }
.x { padding: 1px; }
.x { padding: 2px; }
</style></head><body><p id="t" class="x"></p></body></html>"#,
            "#t",
        );
        assert_eq!(style.properties["color"], "red");
        assert_eq!(style.properties["margin"], "1px");
        assert_eq!(style.properties["padding"], "2px");
    }

    #[test]
    fn test_important_and_attribute_precedence() {
        let style = resolve(
            r#"<html><head><style>
#t { color: red; }
p { color: blue !important; width: 5px !important; }
</style></head><body><p id="t" style="color: green; width: 9px; height: 1px"></p></body></html>"#,
            "#t",
        );
        assert_eq!(style.properties["color"], "blue");
        assert_eq!(style.properties["width"], "5px");
        assert_eq!(style.properties["height"], "1px");
    }

    #[test]
    fn test_conditional_rules_are_not_applied() {
        let style = resolve(
            r#"<html><head><style>
p { color: blue; }
@media (min-width: 1px) { p { color: red; } }
</style></head><body><p id="t"></p></body></html>"#,
            "#t",
        );
        assert_eq!(style.properties["color"], "blue");
    }

    #[test]
    fn test_inheritance_and_keywords() {
        let html = r#"<html><head><style>
body { color: navy; margin: 0; --gap: 4px; }
.a { margin: inherit; cursor: pointer; }
.b { cursor: unset; color: initial; --gap: 8px; }
</style></head><body><div class="a"><p class="b" id="t"></p></div></body></html>"#;

        let a = resolve(html, ".a");
        assert_eq!(a.properties["color"], "navy");
        assert_eq!(a.properties["margin"], "0");
        assert_eq!(a.custom["--gap"], "4px");

        let b = resolve(html, "#t");
        assert!(!b.properties.contains_key("color"));
        assert_eq!(b.properties["cursor"], "pointer");
        assert!(!b.properties.contains_key("margin"));
        assert_eq!(b.custom["--gap"], "8px");
    }
}
