//! Error types for the inspection core.
//!
//! Only faults that stop a whole operation live here. Per-source, per-rule
//! and per-node problems are carried as values instead (blocked sources,
//! skipped selectors, `RecordLookup::NotAnalyzed`, truncation markers).

use std::path::PathBuf;

use thiserror::Error;

use crate::css::SelectorError;

/// Errors surfaced to the caller of a run, an export or a settings change.
#[derive(Error, Debug)]
pub enum InspectError {
    #[error("invalid root query {query:?}: {source}")]
    InvalidQuery {
        query: String,
        #[source]
        source: SelectorError,
    },
    #[error("no element matches root query {0:?}")]
    RootNotFound(String),
    #[error("run cancelled after {processed} of {total} elements")]
    Cancelled { processed: usize, total: usize },
    #[error("run exceeded its time budget after {processed} of {total} elements")]
    DeadlineExceeded { processed: usize, total: usize },
    #[error("no completed run to export")]
    NoCompletedRun,
    #[error("unknown setting: {0}")]
    UnknownSetting(String),
    #[error("invalid value {value:?} for setting {key}: {reason}")]
    InvalidSetting {
        key: String,
        value: String,
        reason: String,
    },
    #[error("invalid settings file {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InspectError {
    /// Whether the run stopped early at a batch boundary rather than failing.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            InspectError::Cancelled { .. } | InspectError::DeadlineExceeded { .. }
        )
    }
}
