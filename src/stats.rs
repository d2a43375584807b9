//! Run statistics.
//!
//! Counts applied rules and code references across every record of a run
//! and ranks selectors and referenced elements by frequency.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::analyze::AnalysisRecord;

/// Entries kept in each ranking.
pub const TOP_N: usize = 10;

/// A ranked key and its count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub key: String,
    pub count: usize,
}

/// Counts per key, remembering first-encounter order.
#[derive(Debug, Clone, Default)]
pub struct FrequencyTable {
    positions: HashMap<String, usize>,
    entries: Vec<RankedEntry>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, count: usize) {
        match self.positions.get(key) {
            Some(&position) => self.entries[position].count += count,
            None => {
                self.positions.insert(key.to_string(), self.entries.len());
                self.entries.push(RankedEntry {
                    key: key.to_string(),
                    count,
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `n` largest counts. Equal counts keep first-encounter order.
    pub fn top(&self, n: usize) -> Vec<RankedEntry> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(n);
        ranked
    }
}

/// Aggregate counts and rankings of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub elements: usize,
    pub rule_matches: usize,
    pub references: usize,
    pub top_selectors: Vec<RankedEntry>,
    pub top_referenced: Vec<RankedEntry>,
}

impl RunStatistics {
    /// Aggregate records in a single pass.
    pub fn calculate(records: &[AnalysisRecord]) -> Self {
        let mut selectors = FrequencyTable::new();
        let mut referenced = FrequencyTable::new();
        let mut stats = RunStatistics {
            elements: records.len(),
            ..Default::default()
        };

        for record in records {
            if let Some(style) = &record.style {
                for group in &style.applied {
                    stats.rule_matches += group.rules.len();
                    for rule in &group.rules {
                        selectors.add(&rule.selector, 1);
                    }
                }
            }
            if let Some(behavior) = &record.behavior {
                stats.references += behavior.listeners.len() + behavior.references.len();
                if !behavior.references.is_empty() {
                    referenced.add(&record.identity_key(), behavior.references.len());
                }
            }
        }

        stats.top_selectors = selectors.top(TOP_N);
        stats.top_referenced = referenced.top(TOP_N);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::{
        BehaviorData, CodeReference, Listener, ReferenceKind, RuleMatch, SourceMatches, StyleData,
    };
    use crate::document::Document;

    fn record(id: Option<&str>, selectors: &[&str], references: usize) -> AnalysisRecord {
        let doc = Document::parse("<p></p>");
        AnalysisRecord {
            node: doc.root(),
            selector: "div".to_string(),
            tag: "div".to_string(),
            id: id.map(str::to_string),
            classes: vec!["card".to_string()],
            structure: None,
            style: Some(StyleData {
                applied: vec![SourceMatches {
                    source: "inline".to_string(),
                    blocked: false,
                    rules: selectors
                        .iter()
                        .map(|s| RuleMatch {
                            source: "inline".to_string(),
                            selector: s.to_string(),
                            css_text: format!("{} {{ }}", s),
                            specificity: 0,
                        })
                        .collect(),
                }],
                ..Default::default()
            }),
            behavior: Some(BehaviorData {
                listeners: vec![Listener {
                    event: "click".to_string(),
                    handler: "go()".to_string(),
                    kind: "inline".to_string(),
                    source: "HTML attribute".to_string(),
                }],
                references: (0..references)
                    .map(|_| CodeReference {
                        source: "Inline Script #1".to_string(),
                        token: "card".to_string(),
                        context: String::new(),
                        kind: ReferenceKind::InlineScript,
                    })
                    .collect(),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_calculate_counts() {
        let records = vec![
            record(Some("a"), &[".x", "div"], 2),
            record(None, &[".x"], 0),
            record(Some("b"), &["div", ".y"], 3),
        ];
        let stats = RunStatistics::calculate(&records);
        assert_eq!(stats.elements, 3);
        assert_eq!(stats.rule_matches, 5);
        assert_eq!(stats.references, 3 + 5);

        let selectors: Vec<(&str, usize)> = stats
            .top_selectors
            .iter()
            .map(|e| (e.key.as_str(), e.count))
            .collect();
        assert_eq!(selectors, vec![(".x", 2), ("div", 2), (".y", 1)]);

        let referenced: Vec<&str> = stats.top_referenced.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(referenced, vec!["b", "a"]);
    }

    #[test]
    fn test_top_ties_keep_first_encounter() {
        let mut table = FrequencyTable::new();
        for key in ["k0", "k1", "k2", "k3", "k4", "k5", "k6", "k7", "k8", "k9", "k10", "k11"] {
            table.add(key, 1);
        }
        table.add("k11", 1);
        let top = table.top(TOP_N);
        assert_eq!(top.len(), TOP_N);
        assert_eq!(top[0].key, "k11");
        assert_eq!(top[1].key, "k0");
        assert_eq!(top[9].key, "k8");
    }

    #[test]
    fn test_empty_run() {
        let stats = RunStatistics::calculate(&[]);
        assert_eq!(stats, RunStatistics::default());
    }
}
