//! Subtree collection and structural capture.

use crate::document::{Document, NodeId};

use super::request::Depth;
use super::types::{Attribute, StructureInfo};

/// Collect `root` and its descendants down to `depth`, in pre-order: each
/// child's whole subtree comes before the next sibling.
pub fn collect_subtree(doc: &Document, root: NodeId, depth: Depth) -> Vec<NodeId> {
    let mut nodes = Vec::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((id, level)) = stack.pop() {
        nodes.push(id);
        if depth.allows_children(level) {
            for child in doc.children(id).into_iter().rev() {
                stack.push((child, level + 1));
            }
        }
    }
    nodes
}

/// Capture tag-independent structure of one element.
pub fn capture_structure(doc: &Document, id: NodeId, max_text_length: usize) -> StructureInfo {
    let el = doc.element(id);
    StructureInfo {
        attributes: el
            .attrs()
            .filter(|(name, _)| *name != "id" && *name != "class")
            .map(|(name, value)| Attribute {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect(),
        child_count: doc.child_count(id),
        text: truncate_chars(doc.text_content(id).trim(), max_text_length),
    }
}

/// Cut `text` to at most `max` characters, ending in `...` when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
