//! Per-run state.

use std::collections::HashMap;
use std::time::Duration;

use crate::document::NodeId;
use crate::settings::Settings;
use crate::stats::RunStatistics;
use crate::tree::DisplayTree;

use super::architecture::ArchitectureData;
use super::request::RunRequest;
use super::types::{AnalysisRecord, RecordLookup};

/// Everything one completed run produced.
///
/// A context is created when a run starts and replaced, never merged, by
/// the next run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub request: RunRequest,
    /// Settings as they were when the run started.
    pub settings: Settings,
    pub root: NodeId,
    records: Vec<AnalysisRecord>,
    index: HashMap<NodeId, usize>,
    pub selected: Option<NodeId>,
    pub architecture: Option<ArchitectureData>,
    pub tree: Option<DisplayTree>,
    pub summary: Option<RunStatistics>,
    pub elapsed: Duration,
}

impl RunContext {
    pub fn new(request: RunRequest, settings: Settings, root: NodeId) -> Self {
        Self {
            request,
            settings,
            root,
            records: Vec::new(),
            index: HashMap::new(),
            selected: None,
            architecture: None,
            tree: None,
            summary: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Store the record of a node. A node keeps its first record.
    pub fn insert(&mut self, record: AnalysisRecord) -> bool {
        if self.index.contains_key(&record.node) {
            return false;
        }
        self.index.insert(record.node, self.records.len());
        self.records.push(record);
        true
    }

    /// Records in collection order.
    pub fn records(&self) -> &[AnalysisRecord] {
        &self.records
    }

    pub fn lookup(&self, node: NodeId) -> RecordLookup<'_> {
        match self.index.get(&node) {
            Some(&position) => RecordLookup::Analyzed(&self.records[position]),
            None => RecordLookup::NotAnalyzed,
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.index.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record of the selected node, falling back to the root.
    pub fn selected_record(&self) -> Option<&AnalysisRecord> {
        self.lookup(self.selected.unwrap_or(self.root)).record()
    }

    pub fn is_complete(&self) -> bool {
        self.summary.is_some()
    }
}
