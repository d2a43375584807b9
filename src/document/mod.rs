//! Parsed document snapshot.
//!
//! The document keeps the parsed `scraper` tree for selector matching and an
//! arena of elements built from it once. A [`NodeId`] is the handle every
//! analysis stage works with: it is `Copy`, compares by identity, and is only
//! ever minted by the document that owns the element. Nothing in the crate
//! mutates a document after it is built.

mod sources;

pub use sources::{
    BlockReason, EventHandlerAttr, ExternalScript, FsLoader, InlineScript, MemoryLoader,
    ResourceSnapshot, SourceLoader, SourceState, StyleOrigin, StyleSource,
};

use std::fmt;
use std::path::{Path, PathBuf};

use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node};
use serde::{Deserialize, Serialize};

use crate::css::SelectorList;
use crate::error::InspectError;

/// Opaque handle to one element of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the element in document (pre-)order.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// A piece of element content, in source order.
#[derive(Debug, Clone)]
pub enum Content {
    Element(NodeId),
    Text(String),
}

/// One element of the document.
#[derive(Debug, Clone)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    parent: Option<NodeId>,
    content: Vec<Content>,
    handle: ego_tree::NodeId,
}

impl Element {
    /// Lowercase tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The id attribute, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.attr("id").filter(|id| !id.is_empty())
    }

    /// Class names in attribute order, duplicates removed.
    pub fn classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = Vec::new();
        if let Some(value) = self.attr("class") {
            for class in value.split_ascii_whitespace() {
                if !classes.contains(&class) {
                    classes.push(class);
                }
            }
        }
        classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|value| value.split_ascii_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(n, _)| n == name)
    }

    /// All attributes as `(name, value)` pairs.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    fn is_template(&self) -> bool {
        self.tag == "template"
    }

    fn is_shadow_root(&self) -> bool {
        self.is_template() && (self.has_attr("shadowrootmode") || self.has_attr("shadowroot"))
    }
}

/// A parsed HTML document.
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
    nodes: Vec<Element>,
    base_dir: Option<PathBuf>,
}

impl Document {
    /// Parse HTML text into a document.
    pub fn parse(html: &str) -> Self {
        let html = Html::parse_document(html);
        let mut nodes = Vec::new();
        push_element(&mut nodes, html.root_element(), None);
        Document {
            html,
            nodes,
            base_dir: None,
        }
    }

    /// Read and parse an HTML file. Relative resource paths resolve against
    /// the file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, InspectError> {
        let path = path.as_ref();
        let html = std::fs::read_to_string(path).map_err(|source| InspectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().map(Path::to_path_buf);
        Ok(Self::parse(&html).with_base_dir(base_dir))
    }

    pub fn with_base_dir(mut self, base_dir: Option<PathBuf>) -> Self {
        self.base_dir = base_dir;
        self
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// The document element (`<html>`).
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn element(&self, id: NodeId) -> &Element {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Element children. Template contents are not children, matching the
    /// rendered tree.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let el = &self.nodes[id.0];
        if el.is_template() {
            return Vec::new();
        }
        element_ids(&el.content)
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    /// Ancestors from the parent upward.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// The parsed tree node behind `id`, for selector matching.
    pub(crate) fn element_ref(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.html
            .tree
            .get(self.nodes[id.0].handle)
            .and_then(ElementRef::wrap)
    }

    /// Concatenated descendant text, like `textContent`. Nested template
    /// contents are skipped.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for item in &self.nodes[id.0].content {
            match item {
                Content::Text(text) => out.push_str(text),
                Content::Element(child) if !self.nodes[child.0].is_template() => {
                    self.collect_text(*child, out)
                }
                Content::Element(_) => {}
            }
        }
    }

    /// Pre-order walk of `id` and its rendered descendants.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            let children = self.children(next);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Every rendered element in document order.
    pub fn iter(&self) -> Vec<NodeId> {
        self.descendants(self.root())
    }

    /// The declarative shadow root template hosted by `id`, if any.
    pub fn shadow_root(&self, id: NodeId) -> Option<NodeId> {
        element_ids(&self.nodes[id.0].content)
            .into_iter()
            .find(|&child| self.nodes[child.0].is_shadow_root())
    }

    /// Pre-order walk of the contents of a `<template>` element.
    pub fn template_contents(&self, template: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = element_ids(&self.nodes[template.0].content);
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut nested = element_ids(&self.nodes[next.0].content);
            nested.reverse();
            stack.extend(nested);
        }
        out
    }

    /// Short selector for display: `#id`, else `tag.class1.class2`.
    pub fn generate_selector(&self, id: NodeId) -> String {
        let el = &self.nodes[id.0];
        if let Some(element_id) = el.id() {
            return format!("#{}", element_id);
        }
        let mut selector = el.tag.clone();
        for class in el.classes() {
            selector.push('.');
            selector.push_str(class);
        }
        selector
    }

    /// First element in document order matching a selector.
    pub fn query(&self, selector: &str) -> Result<NodeId, InspectError> {
        let list = SelectorList::parse(selector).map_err(|source| InspectError::InvalidQuery {
            query: selector.to_string(),
            source,
        })?;
        self.iter()
            .into_iter()
            .find(|&id| list.matches(self, id))
            .ok_or_else(|| InspectError::RootNotFound(selector.to_string()))
    }
}

fn push_element(nodes: &mut Vec<Element>, el: ElementRef<'_>, parent: Option<NodeId>) -> NodeId {
    let id = NodeId(nodes.len());
    let value = el.value();
    nodes.push(Element {
        tag: value.name().to_ascii_lowercase(),
        attrs: value
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        parent,
        content: Vec::new(),
        handle: el.id(),
    });

    let mut content = Vec::new();
    push_content(nodes, *el, id, &mut content);
    nodes[id.0].content = content;
    id
}

/// Children of `node` in source order. A `<template>` holds its contents in
/// a document fragment, which is flattened into the template's content.
fn push_content(
    nodes: &mut Vec<Element>,
    node: NodeRef<'_, Node>,
    id: NodeId,
    content: &mut Vec<Content>,
) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => {
                let text: &str = text;
                content.push(Content::Text(text.to_string()));
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    content.push(Content::Element(push_element(nodes, child_el, Some(id))));
                }
            }
            Node::Fragment => push_content(nodes, child, id, content),
            _ => {}
        }
    }
}

fn element_ids(content: &[Content]) -> Vec<NodeId> {
    content
        .iter()
        .filter_map(|c| match c {
            Content::Element(id) => Some(*id),
            Content::Text(_) => None,
        })
        .collect()
}
