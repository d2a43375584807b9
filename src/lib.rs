//! domlens - subtree inspector for HTML documents.
//!
//! For every element below a chosen root, domlens records where it sits in
//! the tree, which style rules match it, what it inherits from its
//! ancestors, and where script text refers to it. The results of a run can
//! be browsed as a tree, summarized, and exported as Markdown, CSS and HTML.
//!
//! # Architecture
//!
//! - `document`: parsed HTML tree plus the style and script resources it links
//! - `css`: style sheet parsing, selector matching and specificity
//! - `analyze`: the per-node stages, the batch scheduler and the session
//! - `stats` / `tree`: run statistics and the display tree
//! - `export`: export documents (consolidated report, element, architecture)
//! - `report`: console output (pretty, JSON)
//! - `settings`: YAML settings file and overrides

pub mod analyze;
pub mod cli;
pub mod css;
pub mod document;
pub mod error;
pub mod export;
pub mod report;
pub mod settings;
pub mod stats;
pub mod tree;

pub use analyze::{
    AnalysisMode, AnalysisRecord, Depth, Inspector, Progress, RecordLookup, RootSpec,
    RunContext, RunRequest, Scheduler,
};
pub use document::{Document, FsLoader, MemoryLoader, NodeId, SourceLoader};
pub use error::InspectError;
pub use export::ExportDocument;
pub use settings::Settings;
pub use stats::RunStatistics;
pub use tree::DisplayTree;
