//! Cooperative batch scheduler.
//!
//! Drives the analysis stages over the collected nodes in fixed-size
//! batches. Between batches control returns to the runtime, progress is
//! reported, and the cancellation token and time budget are checked. The
//! scheduler runs on one thread; nothing in a run is shared across tasks.

use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::document::{Document, NodeId, ResourceSnapshot, SourceLoader};
use crate::error::InspectError;
use crate::settings::Settings;
use crate::stats::RunStatistics;
use crate::tree::DisplayTree;

use super::architecture::ArchitectureData;
use super::behavior::{scan_element, ScriptIndex};
use super::cascade::Cascade;
use super::collect::{capture_structure, collect_subtree};
use super::context::RunContext;
use super::inherit::collect_inherited;
use super::request::{AnalysisMode, RunRequest};
use super::styles::{nested_styles, RuleIndex};
use super::types::{AnalysisRecord, StyleData};

/// Nodes processed between two yields.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Reported after every batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.processed as f64 * 100.0 / self.total as f64
    }
}

/// Runs one analysis pass.
#[derive(Debug, Clone)]
pub struct Scheduler {
    batch_size: usize,
    cancel: CancellationToken,
    max_duration: Option<Duration>,
    progress: Option<UnboundedSender<Progress>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            cancel: CancellationToken::new(),
            max_duration: None,
            progress: None,
        }
    }

    /// Set the batch size. Zero is treated as one.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn max_duration(mut self, limit: Option<Duration>) -> Self {
        self.max_duration = limit;
        self
    }

    pub fn progress(mut self, sender: UnboundedSender<Progress>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Collect the requested subtree and analyze it.
    pub async fn run(
        &self,
        doc: &Document,
        loader: &dyn SourceLoader,
        request: &RunRequest,
        settings: &Settings,
    ) -> Result<RunContext, InspectError> {
        let started = Instant::now();
        let root = request.root.resolve(doc)?;
        let nodes = collect_subtree(doc, root, request.depth);
        let total = nodes.len();
        debug!(total, mode = %request.mode, depth = %request.depth, "starting analysis");

        let snapshot = ResourceSnapshot::capture(doc, loader);
        let mut analyzer = Analyzer::new(doc, &snapshot, settings, request.mode);
        let mut context = RunContext::new(request.clone(), settings.clone(), root);

        let mut processed = 0;
        for batch in nodes.chunks(self.batch_size) {
            self.checkpoint(started, processed, total)?;

            for &id in batch {
                if request.mode.is_architecture() && context.architecture.is_none() {
                    context.architecture = Some(ArchitectureData::extract(doc, &snapshot));
                }
                context.insert(analyzer.analyze(id));
            }
            processed += batch.len();

            if let Some(sender) = &self.progress {
                let _ = sender.send(Progress { processed, total });
            }
            tokio::task::yield_now().await;
        }

        let tree = DisplayTree::build(
            doc,
            root,
            request.depth,
            settings.max_children_display,
            |id| context.contains(id),
        );
        context.tree = Some(tree);
        context.selected = Some(root);
        context.summary = Some(RunStatistics::calculate(context.records()));
        context.elapsed = started.elapsed();

        info!(
            "Analysis complete! Analyzed {} elements in {:.2} seconds.",
            context.len(),
            context.elapsed.as_secs_f64()
        );
        Ok(context)
    }

    fn checkpoint(&self, started: Instant, processed: usize, total: usize) -> Result<(), InspectError> {
        if self.cancel.is_cancelled() {
            debug!(processed, total, "run cancelled");
            return Err(InspectError::Cancelled { processed, total });
        }
        if let Some(limit) = self.max_duration {
            if started.elapsed() >= limit {
                debug!(processed, total, ?limit, "run exceeded time budget");
                return Err(InspectError::DeadlineExceeded { processed, total });
            }
        }
        Ok(())
    }
}

/// Per-run analysis state: indexes built once from the snapshot.
struct Analyzer<'a> {
    doc: &'a Document,
    settings: &'a Settings,
    mode: AnalysisMode,
    rules: RuleIndex,
    scripts: ScriptIndex,
    cascade: Cascade,
}

impl<'a> Analyzer<'a> {
    fn new(
        doc: &'a Document,
        snapshot: &ResourceSnapshot,
        settings: &'a Settings,
        mode: AnalysisMode,
    ) -> Self {
        let rules = if mode.matches_styles() {
            RuleIndex::build(snapshot)
        } else {
            RuleIndex::default()
        };
        if rules.skipped() > 0 {
            debug!(skipped = rules.skipped(), "rules with unsupported selectors");
        }
        let scripts = if mode.scans_behavior() && settings.include_javascript {
            ScriptIndex::build(snapshot)
        } else {
            ScriptIndex::default()
        };
        Self {
            doc,
            settings,
            mode,
            rules,
            scripts,
            cascade: Cascade::new(),
        }
    }

    fn analyze(&mut self, id: NodeId) -> AnalysisRecord {
        let doc = self.doc;
        let el = doc.element(id);
        let mut record = AnalysisRecord {
            node: id,
            selector: doc.generate_selector(id),
            tag: el.tag().to_string(),
            id: el.id().map(str::to_string),
            classes: el.classes().into_iter().map(str::to_string).collect(),
            structure: None,
            style: None,
            behavior: None,
        };

        if self.mode.captures_structure() {
            record.structure = Some(capture_structure(doc, id, self.settings.max_text_length));
        }
        if self.mode.matches_styles() {
            record.style = Some(self.style(id));
        }
        if self.mode.scans_behavior() && self.settings.include_javascript {
            record.behavior = Some(scan_element(doc, id, &self.scripts, self.settings));
        }
        record
    }

    fn style(&mut self, id: NodeId) -> StyleData {
        let doc = self.doc;
        let resolved = self.cascade.resolve(doc, &self.rules, id);
        StyleData {
            applied: self.rules.match_rules(doc, id),
            inherited: if self.settings.include_inherited_styles {
                collect_inherited(doc, &self.rules, &mut self.cascade, id)
            } else {
                Vec::new()
            },
            computed: resolved.properties.clone(),
            custom_properties: if self.settings.include_css_variables {
                resolved.custom.clone()
            } else {
                Default::default()
            },
            nested: nested_styles(doc, id).filter(|nested| !nested.is_empty()),
        }
    }
}
