//! Export documents.
//!
//! Exports are plain text built from a completed [`RunContext`]. Given the
//! same records and the same timestamp they are byte-identical. Every
//! document is capped at `max_export_size` bytes.

mod architecture;
mod element;
mod markup;
mod report;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::analyze::RunContext;
use crate::document::Document;
use crate::error::InspectError;

pub use architecture::architecture_documents;
pub use element::element_document;
pub use markup::{escape_html, simplified_markup, structure_echo};
pub use report::consolidated_report;

/// Appended to a document cut at its size ceiling.
pub const TRUNCATION_MARKER: &str =
    "\n... (output truncated - increase max_export_size in settings to see more)\n";

/// Property prefixes of each computed-style category, in display order.
/// Properties matching none fall into `Other`.
pub const STYLE_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "Layout",
        &[
            "display",
            "position",
            "top",
            "right",
            "bottom",
            "left",
            "width",
            "height",
            "min-width",
            "max-width",
            "min-height",
            "max-height",
        ],
    ),
    ("Box Model", &["margin", "padding", "border", "box-sizing"]),
    (
        "Typography",
        &["font", "color", "text", "line-height", "letter-spacing"],
    ),
    ("Background", &["background"]),
];

const OTHER_CATEGORY: &str = "Other";

/// One exported file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    /// Suggested file name, timestamp-qualified.
    pub filename: String,
    pub content: String,
}

impl ExportDocument {
    pub fn new(filename: String, content: String, max_size: usize) -> Self {
        Self {
            filename,
            content: cap(content, max_size),
        }
    }

    /// Write the document into `dir` under its suggested name.
    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf, InspectError> {
        let path = dir.as_ref().join(&self.filename);
        fs::write(&path, &self.content).map_err(|source| InspectError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Cut `content` to `max_size` bytes on a character boundary and append the
/// truncation marker. Content within the ceiling is returned unchanged.
pub fn cap(mut content: String, max_size: usize) -> String {
    if content.len() <= max_size {
        return content;
    }
    let mut cut = max_size;
    while !content.is_char_boundary(cut) {
        cut -= 1;
    }
    content.truncate(cut);
    content.push_str(TRUNCATION_MARKER);
    content
}

/// Documents for a completed run: four architecture files in architecture
/// mode, the consolidated report otherwise.
pub fn export_run(
    doc: &Document,
    context: &RunContext,
    timestamp: NaiveDateTime,
) -> Vec<ExportDocument> {
    if context.request.mode.is_architecture() {
        architecture_documents(doc, context, timestamp)
    } else {
        vec![consolidated_report(doc, context, timestamp)]
    }
}

/// Computed properties grouped by category. Empty categories are left out.
pub fn categorize(
    computed: &BTreeMap<String, String>,
) -> Vec<(&'static str, Vec<(&str, &str)>)> {
    let mut groups: Vec<(&'static str, Vec<(&str, &str)>)> = STYLE_CATEGORIES
        .iter()
        .map(|(name, _)| (*name, Vec::new()))
        .collect();
    groups.push((OTHER_CATEGORY, Vec::new()));

    for (property, value) in computed {
        let position = STYLE_CATEGORIES
            .iter()
            .position(|(_, prefixes)| prefixes.iter().any(|p| property.starts_with(p)))
            .unwrap_or(STYLE_CATEGORIES.len());
        groups[position].1.push((property.as_str(), value.as_str()));
    }

    groups.retain(|(_, properties)| !properties.is_empty());
    groups
}

fn generated_on(timestamp: NaiveDateTime) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}
