//! Core types for analysis records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::document::NodeId;

/// Findings for one analyzed element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub node: NodeId,
    /// Display selector: `#id` or `tag.class1.class2`.
    pub selector: String,
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<StructureInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<BehaviorData>,
}

impl AnalysisRecord {
    /// Key used to rank referenced elements: the id, else `tag.firstClass`.
    pub fn identity_key(&self) -> String {
        match (&self.id, self.classes.first()) {
            (Some(id), _) => id.clone(),
            (None, Some(class)) => format!("{}.{}", self.tag, class),
            (None, None) => self.tag.clone(),
        }
    }

    pub fn applied_rule_count(&self) -> usize {
        self.style.as_ref().map(StyleData::rule_count).unwrap_or(0)
    }

    /// Listeners plus code references.
    pub fn reference_count(&self) -> usize {
        self.behavior
            .as_ref()
            .map(|b| b.listeners.len() + b.references.len())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Structural capture of an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureInfo {
    /// Attributes other than `id` and `class`, in source order.
    pub attributes: Vec<Attribute>,
    pub child_count: usize,
    /// Trimmed text content, cut to the configured snippet length.
    pub text: String,
}

/// One style rule that matched an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub source: String,
    pub selector: String,
    pub css_text: String,
    pub specificity: u32,
}

impl RuleMatch {
    /// Declaration lines of the rule body, one `prop: value;` per entry.
    pub fn declaration_lines(&self) -> Vec<String> {
        let body = match (self.css_text.find('{'), self.css_text.rfind('}')) {
            (Some(open), Some(close)) if open < close => &self.css_text[open + 1..close],
            _ => self.css_text.as_str(),
        };
        body.split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| format!("{};", p))
            .collect()
    }
}

/// Matches grouped under one source identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMatches {
    pub source: String,
    /// The source's rules could not be read.
    pub blocked: bool,
    pub rules: Vec<RuleMatch>,
}

impl SourceMatches {
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

/// A property an element receives from one ancestor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritedEntry {
    /// `tag#id.class1.class2` of the ancestor.
    pub ancestor: String,
    pub property: String,
    pub value: String,
}

/// Styles found inside a declarative shadow root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedStyles {
    pub style_blocks: Vec<String>,
    pub styled_elements: Vec<NestedInlineStyle>,
}

impl NestedStyles {
    pub fn is_empty(&self) -> bool {
        self.style_blocks.is_empty() && self.styled_elements.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedInlineStyle {
    pub selector: String,
    pub style: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleData {
    pub applied: Vec<SourceMatches>,
    pub inherited: Vec<InheritedEntry>,
    pub computed: BTreeMap<String, String>,
    pub custom_properties: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested: Option<NestedStyles>,
}

impl StyleData {
    /// Number of applied rules across all sources.
    pub fn rule_count(&self) -> usize {
        self.applied.iter().map(SourceMatches::rule_count).sum()
    }

    /// No matched rules and no inherited properties.
    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0 && self.inherited.is_empty()
    }

    /// All matches, highest specificity first. Ties keep source order.
    pub fn sorted_matches(&self) -> Vec<&RuleMatch> {
        let mut matches: Vec<&RuleMatch> =
            self.applied.iter().flat_map(|group| group.rules.iter()).collect();
        matches.sort_by(|a, b| b.specificity.cmp(&a.specificity));
        matches
    }

    /// Inherited entries grouped by ancestor key, nearest ancestor first.
    pub fn inherited_by_ancestor(&self) -> Vec<(&str, Vec<&InheritedEntry>)> {
        let mut groups: Vec<(&str, Vec<&InheritedEntry>)> = Vec::new();
        for entry in &self.inherited {
            match groups.iter_mut().find(|(key, _)| *key == entry.ancestor) {
                Some((_, entries)) => entries.push(entry),
                None => groups.push((entry.ancestor.as_str(), vec![entry])),
            }
        }
        groups
    }
}

/// An `on*` attribute of the element itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub event: String,
    pub handler: String,
    pub kind: String,
    pub source: String,
}

/// How a code reference was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    InlineScript,
    EventHandler,
    FrameworkUsage,
    EventPattern,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::InlineScript => "inline-script",
            ReferenceKind::EventHandler => "event-handler",
            ReferenceKind::FrameworkUsage => "framework-usage",
            ReferenceKind::EventPattern => "event-pattern",
        }
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One occurrence of a search token in script text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReference {
    pub source: String,
    pub token: String,
    pub context: String,
    pub kind: ReferenceKind,
}

/// A component framework whose markers the element carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkMarker {
    pub name: String,
    pub evidence: String,
    pub kind: String,
}

/// A network or listener idiom found in inline script text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUsage {
    pub source: String,
    pub api: String,
    pub context: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorData {
    pub listeners: Vec<Listener>,
    pub references: Vec<CodeReference>,
    pub frameworks: Vec<FrameworkMarker>,
    pub api_usage: Vec<ApiUsage>,
}

/// Answer to a per-node query.
#[derive(Debug, Clone, Copy)]
pub enum RecordLookup<'a> {
    Analyzed(&'a AnalysisRecord),
    NotAnalyzed,
}

impl<'a> RecordLookup<'a> {
    pub fn record(self) -> Option<&'a AnalysisRecord> {
        match self {
            RecordLookup::Analyzed(record) => Some(record),
            RecordLookup::NotAnalyzed => None,
        }
    }

    pub fn is_analyzed(&self) -> bool {
        matches!(self, RecordLookup::Analyzed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(source: &str, selector: &str, specificity: u32) -> RuleMatch {
        RuleMatch {
            source: source.to_string(),
            selector: selector.to_string(),
            css_text: format!("{} {{ color: red; margin: 0; }}", selector),
            specificity,
        }
    }

    #[test]
    fn test_sorted_matches_are_stable() {
        let style = StyleData {
            applied: vec![
                SourceMatches {
                    source: "a.css".to_string(),
                    blocked: false,
                    rules: vec![rule("a.css", "p", 1), rule("a.css", ".x", 10)],
                },
                SourceMatches {
                    source: "cdn".to_string(),
                    blocked: true,
                    rules: Vec::new(),
                },
                SourceMatches {
                    source: "inline".to_string(),
                    blocked: false,
                    rules: vec![rule("inline", ".y", 10), rule("inline", "#z", 100)],
                },
            ],
            ..Default::default()
        };
        let order: Vec<&str> = style
            .sorted_matches()
            .iter()
            .map(|m| m.selector.as_str())
            .collect();
        assert_eq!(order, vec!["#z", ".x", ".y", "p"]);
        assert_eq!(style.rule_count(), 4);
    }

    #[test]
    fn test_declaration_lines() {
        let m = rule("inline", ".card", 10);
        assert_eq!(m.declaration_lines(), vec!["color: red;", "margin: 0;"]);
    }

    #[test]
    fn test_identity_key() {
        let mut record = AnalysisRecord {
            node: crate::document::Document::parse("<p></p>").root(),
            selector: "li.item".to_string(),
            tag: "li".to_string(),
            id: None,
            classes: vec!["item".to_string(), "first".to_string()],
            structure: None,
            style: None,
            behavior: None,
        };
        assert_eq!(record.identity_key(), "li.item");
        record.id = Some("main".to_string());
        assert_eq!(record.identity_key(), "main");
    }

    #[test]
    fn test_inherited_groups_merge_same_key() {
        let entry = |ancestor: &str, property: &str| InheritedEntry {
            ancestor: ancestor.to_string(),
            property: property.to_string(),
            value: "x".to_string(),
        };
        let style = StyleData {
            inherited: vec![
                entry("div.box", "color"),
                entry("section", "cursor"),
                entry("div.box", "font-size"),
            ],
            ..Default::default()
        };
        let groups = style.inherited_by_ancestor();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "div.box");
        assert_eq!(groups[0].1.len(), 2);
    }
}
