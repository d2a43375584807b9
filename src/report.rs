//! Console output for completed runs.
//!
//! Supports two output formats:
//! - Pretty: colored terminal summary with the display tree
//! - JSON: the full run for programmatic consumption

use colored::*;
use serde::Serialize;
use std::path::PathBuf;

use crate::analyze::{AnalysisRecord, ArchitectureData, RunContext};
use crate::document::Document;
use crate::stats::{RankedEntry, RunStatistics};

/// Completion line shown after every run.
pub fn completion_message(context: &RunContext) -> String {
    format!(
        "Analysis complete! Analyzed {} elements in {:.2} seconds.",
        context.len(),
        context.elapsed.as_secs_f64()
    )
}

// =============================================================================
// JSON Format
// =============================================================================

#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub version: String,
    pub file: String,
    pub root: String,
    pub mode: String,
    pub depth: String,
    pub elapsed_ms: u128,
    pub statistics: RunStatistics,
    pub blocked_sources: Vec<String>,
    pub records: &'a [AnalysisRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<&'a ArchitectureData>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<String>,
}

/// Write the run in JSON format.
pub fn write_json(
    file: &str,
    doc: &Document,
    context: &RunContext,
    exported: &[PathBuf],
) -> anyhow::Result<()> {
    let report = JsonReport {
        version: env!("CARGO_PKG_VERSION").to_string(),
        file: file.to_string(),
        root: context.request.root.label(doc),
        mode: context.request.mode.to_string(),
        depth: context.request.depth.to_string(),
        elapsed_ms: context.elapsed.as_millis(),
        statistics: context.summary.clone().unwrap_or_default(),
        blocked_sources: blocked_sources(context),
        records: context.records(),
        architecture: context.architecture.as_ref(),
        exports: exported
            .iter()
            .map(|p| p.to_string_lossy().to_string())
            .collect(),
    };

    let json = serde_json::to_string_pretty(&report)?;
    println!("{}", json);
    Ok(())
}

/// Distinct blocked style sources seen by any record, in encounter order.
pub fn blocked_sources(context: &RunContext) -> Vec<String> {
    let mut blocked: Vec<String> = Vec::new();
    for style in context.records().iter().filter_map(|r| r.style.as_ref()) {
        for group in style.applied.iter().filter(|g| g.blocked) {
            if !blocked.contains(&group.source) {
                blocked.push(group.source.clone());
            }
        }
    }
    blocked
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write the run in pretty (human-readable) format.
pub fn write_pretty(file: &str, doc: &Document, context: &RunContext, exported: &[PathBuf]) {
    let stats = context.summary.clone().unwrap_or_default();

    // Header
    println!();
    print!("  ");
    print!("{}", "domlens".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));
    println!();

    print!("  {}", "Document: ".dimmed());
    println!("{}", file);
    print!("  {}", "Root:     ".dimmed());
    println!("{}", context.request.root.label(doc));
    print!("  {}", "Mode:     ".dimmed());
    println!("{}", context.request.mode.title());
    print!("  {}", "Depth:    ".dimmed());
    println!("{}", context.request.depth);
    println!();

    write_counts(&stats);
    println!();

    if let Some(tree) = &context.tree {
        println!("  {}", "Tree:".bold());
        for line in tree.lines() {
            println!("    {}", line);
        }
        println!();
    }

    if let Some(architecture) = &context.architecture {
        write_architecture(architecture);
        println!();
    }

    if !stats.top_selectors.is_empty() {
        write_ranking("Top selectors", &stats.top_selectors);
        println!();
    }
    if !stats.top_referenced.is_empty() {
        write_ranking("Most referenced elements", &stats.top_referenced);
        println!();
    }

    let blocked = blocked_sources(context);
    if !blocked.is_empty() {
        println!("  {} ({}):", "Blocked sources".yellow(), blocked.len());
        for source in &blocked {
            println!("    {}", source.dimmed());
        }
        println!();
    }

    if !exported.is_empty() {
        println!("  {}", "Exported:".bold());
        for path in exported {
            println!("    {}", path.display().to_string().blue());
        }
        println!();
    }

    println!("  {} {}", "✓".green(), completion_message(context));
    println!();
}

fn write_counts(stats: &RunStatistics) {
    print!("  Elements: ");
    print!("{}", stats.elements.to_string().bold());
    print!("  CSS rules: ");
    print!("{}", stats.rule_matches.to_string().bold());
    print!("  JS references: ");
    println!("{}", stats.references.to_string().bold());
}

fn write_ranking(title: &str, entries: &[RankedEntry]) {
    println!("  {}:", title.bold());
    for entry in entries {
        println!("    {:>4}  {}", entry.count, entry.key);
    }
}

fn write_architecture(data: &ArchitectureData) {
    println!("  {}", "Architecture:".bold());
    println!(
        "    CSS: {} external, {} inline, {} rules",
        data.css.external.len(),
        data.css.inline.len(),
        data.css.total_rules()
    );
    println!(
        "    JS:  {} external, {} inline, {} characters of inline code",
        data.js.external.len(),
        data.js.inline.len(),
        data.js.total_inline_size()
    );
}
