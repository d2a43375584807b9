//! Inherited property propagation.
//!
//! Walks from an element's parent up to the document root and records, for
//! each ancestor, the allowlisted inheritable properties it resolves to.

use std::collections::HashSet;

use phf::phf_ordered_set;

use crate::document::{Document, NodeId};

use super::cascade::{Cascade, INITIAL};
use super::styles::{element_signature, RuleIndex};
use super::types::InheritedEntry;

/// Properties that pass from ancestor to descendant, in report order.
pub static INHERITABLE_PROPERTIES: phf::OrderedSet<&'static str> = phf_ordered_set! {
    "color",
    "font",
    "font-family",
    "font-size",
    "font-weight",
    "font-variant",
    "font-style",
    "line-height",
    "letter-spacing",
    "text-align",
    "text-indent",
    "text-transform",
    "white-space",
    "word-spacing",
    "word-break",
    "word-wrap",
    "visibility",
    "border-collapse",
    "border-spacing",
    "caption-side",
    "empty-cells",
    "list-style",
    "list-style-image",
    "list-style-position",
    "list-style-type",
    "orphans",
    "widows",
    "cursor",
    "direction",
    "tab-size",
    "quotes",
    "text-decoration-color",
    "text-shadow",
};

pub fn is_inheritable(property: &str) -> bool {
    INHERITABLE_PROPERTIES.contains(property)
}

/// Inherited entries for `id`, nearest ancestor first.
///
/// Ancestors with the same signature share a key, so their entries end up
/// under one group.
pub fn collect_inherited(
    doc: &Document,
    index: &RuleIndex,
    cascade: &mut Cascade,
    id: NodeId,
) -> Vec<InheritedEntry> {
    let mut entries = Vec::new();
    let mut visited = HashSet::new();
    let mut current = doc.parent(id);

    while let Some(ancestor) = current {
        if !visited.insert(ancestor) {
            break;
        }
        let resolved = cascade.resolve(doc, index, ancestor);
        let key = element_signature(doc, ancestor);
        for property in INHERITABLE_PROPERTIES.iter() {
            match resolved.properties.get(*property) {
                Some(value) if !value.is_empty() && value != INITIAL => {
                    entries.push(InheritedEntry {
                        ancestor: key.clone(),
                        property: property.to_string(),
                        value: value.clone(),
                    });
                }
                _ => {}
            }
        }
        current = doc.parent(ancestor);
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{MemoryLoader, ResourceSnapshot};

    fn inherited(html: &str, query: &str) -> Vec<InheritedEntry> {
        let doc = Document::parse(html);
        let snapshot = ResourceSnapshot::capture(&doc, &MemoryLoader::new());
        let index = RuleIndex::build(&snapshot);
        let mut cascade = Cascade::new();
        let id = doc.query(query).unwrap();
        collect_inherited(&doc, &index, &mut cascade, id)
    }

    #[test]
    fn test_allowlist_only() {
        let entries = inherited(
            r#"<html><head><style>
.panel { color: navy; margin: 4px; cursor: pointer; }
body { font-size: 14px; }
</style></head><body><div class="panel"><span id="t">x</span></div></body></html>"#,
            "#t",
        );
        let found: Vec<(&str, &str, &str)> = entries
            .iter()
            .map(|e| (e.ancestor.as_str(), e.property.as_str(), e.value.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                ("div.panel", "color", "navy"),
                ("div.panel", "font-size", "14px"),
                ("div.panel", "cursor", "pointer"),
                ("body", "font-size", "14px"),
            ]
        );
    }

    #[test]
    fn test_initial_is_never_recorded() {
        let entries = inherited(
            r#"<html><body style="color: red"><div style="color: initial"><p id="t"></p></div></body></html>"#,
            "#t",
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ancestor, "body");
    }

    #[test]
    fn test_root_has_no_inherited_entries() {
        let entries = inherited("<html style=\"color: red\"><body></body></html>", "html");
        assert!(entries.is_empty());
    }

    #[test]
    fn test_same_signature_ancestors_share_key() {
        let entries = inherited(
            r#"<html><body><div class="box" style="color: red"><div class="box" style="cursor: move"><i id="t"></i></div></div></body></html>"#,
            "#t",
        );
        let keys: HashSet<&str> = entries.iter().map(|e| e.ancestor.as_str()).collect();
        assert_eq!(keys.len(), 1);
        assert_eq!(entries.len(), 3);
    }
}
