//! Display tree model.
//!
//! A pure description of the analyzed subtree for presentation layers. It
//! holds labels and node handles only; rendering and selection handling are
//! left to the consumer.

use serde::{Deserialize, Serialize};

use crate::analyze::Depth;
use crate::document::{Document, NodeId};

/// Characters of text shown after a node label.
pub const PREVIEW_LENGTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub node: NodeId,
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub preview: Option<String>,
    pub children: Vec<TreeNode>,
    /// Analyzed children left out by the display ceiling.
    pub omitted: usize,
}

impl TreeNode {
    /// `tag#id.class1.class2 "preview"`.
    pub fn label(&self) -> String {
        let mut label = self.tag.clone();
        if let Some(id) = &self.id {
            label.push('#');
            label.push_str(id);
        }
        if !self.classes.is_empty() {
            label.push('.');
            label.push_str(&self.classes.join("."));
        }
        if let Some(preview) = &self.preview {
            label.push_str(&format!(" \"{}\"", preview));
        }
        label
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayTree {
    pub root: TreeNode,
}

impl DisplayTree {
    /// Build the tree of analyzed nodes below `root`.
    pub fn build<F>(
        doc: &Document,
        root: NodeId,
        depth: Depth,
        max_children: usize,
        is_analyzed: F,
    ) -> Self
    where
        F: Fn(NodeId) -> bool,
    {
        Self {
            root: build_node(doc, root, 0, depth, max_children, &is_analyzed),
        }
    }

    /// Indented text lines, two spaces per level.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        push_lines(&self.root, 0, &mut lines);
        lines
    }
}

fn build_node(
    doc: &Document,
    id: NodeId,
    level: usize,
    depth: Depth,
    max_children: usize,
    is_analyzed: &dyn Fn(NodeId) -> bool,
) -> TreeNode {
    let el = doc.element(id);
    let text = doc.text_content(id);
    let text = text.trim();
    let preview = if text.is_empty() {
        None
    } else if text.chars().count() > PREVIEW_LENGTH {
        Some(format!("{}...", text.chars().take(PREVIEW_LENGTH).collect::<String>()))
    } else {
        Some(text.to_string())
    };

    let mut node = TreeNode {
        node: id,
        tag: el.tag().to_string(),
        id: el.id().map(str::to_string),
        classes: el.classes().into_iter().map(str::to_string).collect(),
        preview,
        children: Vec::new(),
        omitted: 0,
    };

    if depth.allows_children(level) {
        let analyzed: Vec<NodeId> = doc
            .children(id)
            .into_iter()
            .filter(|&child| is_analyzed(child))
            .collect();
        node.omitted = analyzed.len().saturating_sub(max_children);
        node.children = analyzed
            .into_iter()
            .take(max_children)
            .map(|child| build_node(doc, child, level + 1, depth, max_children, is_analyzed))
            .collect();
    }
    node
}

fn push_lines(node: &TreeNode, level: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(level);
    lines.push(format!("{}{}", indent, node.label()));
    for child in &node.children {
        push_lines(child, level + 1, lines);
    }
    if node.omitted > 0 {
        lines.push(format!("{}  ... {} more children", indent, node.omitted));
    }
}
