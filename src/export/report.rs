//! Consolidated analysis report.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDateTime;

use crate::analyze::{AnalysisMode, AnalysisRecord, Depth, RuleMatch, RunContext};
use crate::document::Document;

use super::markup::structure_echo;
use super::{categorize, generated_on, ExportDocument};

/// `selector {` then one indented declaration per line, then `}`.
pub fn format_rule(rule: &RuleMatch) -> String {
    let mut text = format!("{} {{\n", rule.selector);
    for line in rule.declaration_lines() {
        text.push_str("  ");
        text.push_str(&line);
        text.push('\n');
    }
    text.push('}');
    text
}

/// Build `element-extract_<timestamp>.md` for a completed run.
pub fn consolidated_report(
    doc: &Document,
    context: &RunContext,
    timestamp: NaiveDateTime,
) -> ExportDocument {
    let settings = &context.settings;
    let stats = context.summary.clone().unwrap_or_default();
    let mut md = String::from("# Recursive Element Analysis Report\n\n");
    md.push_str(&format!("Generated on: {}\n\n", generated_on(timestamp)));

    md.push_str("## Analysis Information\n\n");
    md.push_str(&format!(
        "- Root Element: {}\n",
        context.request.root.label(doc)
    ));
    md.push_str(&format!("- Analysis Mode: {}\n", context.request.mode.title()));
    let depth = match context.request.depth {
        Depth::Unbounded => "All Children".to_string(),
        Depth::Limited(n) => n.to_string(),
    };
    md.push_str(&format!("- Recursion Depth: {}\n", depth));
    md.push_str(&format!("- Elements Analyzed: {}\n", stats.elements));
    md.push_str(&format!("- CSS Rules Found: {}\n", stats.rule_matches));
    md.push_str(&format!("- JavaScript References: {}\n\n", stats.references));

    // =========================================================================
    // 1. HTML Structure
    // =========================================================================
    md.push_str("## 1. HTML Structure\n\n");
    if doc.element(context.root).tag() == "style" {
        md.push_str(
            "Cannot export HTML for <style> elements. Please select a different element.\n\n",
        );
    } else {
        md.push_str("```html\n");
        md.push_str(&structure_echo(doc, context.root, settings));
        md.push_str("\n```\n\n");
    }

    // =========================================================================
    // 2. CSS Rules
    // =========================================================================
    md.push_str("## 2. CSS Rules\n\n");
    let mut rules: BTreeSet<String> = BTreeSet::new();
    let mut blocked: Vec<&str> = Vec::new();
    for style in context.records().iter().filter_map(|r| r.style.as_ref()) {
        for group in &style.applied {
            if group.blocked && !blocked.contains(&group.source.as_str()) {
                blocked.push(&group.source);
            }
            rules.extend(group.rules.iter().map(format_rule));
        }
    }
    if rules.is_empty() {
        md.push_str("No CSS rules found for analyzed elements.\n\n");
    } else {
        md.push_str("```css\n");
        md.push_str(&rules.into_iter().collect::<Vec<_>>().join("\n\n"));
        md.push_str("\n```\n\n");
    }
    for source in blocked {
        md.push_str(&format!("> Blocked source (not accessible): {}\n\n", source));
    }

    // =========================================================================
    // 3. JavaScript
    // =========================================================================
    if context.request.mode != AnalysisMode::StructureStyle && settings.include_javascript {
        md.push_str("## 3. JavaScript\n\n");
        write_javascript(&mut md, context.records());
    }

    // =========================================================================
    // 4. Computed Styles
    // =========================================================================
    md.push_str("## 4. Computed Styles\n\n");
    match context
        .selected_record()
        .and_then(|record| record.style.as_ref().map(|style| (record, style)))
        .filter(|(_, style)| !style.computed.is_empty())
    {
        Some((record, style)) => {
            md.push_str(&format!("### Computed Styles for {}\n\n", record.selector));
            for (category, properties) in categorize(&style.computed) {
                md.push_str(&format!("#### {}\n\n```css\n", category));
                for (property, value) in properties {
                    md.push_str(&format!("{}: {};\n", property, value));
                }
                md.push_str("```\n\n");
            }
            if !style.custom_properties.is_empty() {
                md.push_str("#### CSS Variables\n\n```css\n");
                for (name, value) in &style.custom_properties {
                    md.push_str(&format!("{}: {};\n", name, value));
                }
                md.push_str("```\n\n");
            }
        }
        None => md.push_str("No computed styles available.\n\n"),
    }

    ExportDocument::new(
        format!("element-extract_{}.md", timestamp.format("%Y-%m-%d_%H-%M")),
        md,
        settings.max_export_size,
    )
}

fn write_javascript(md: &mut String, records: &[AnalysisRecord]) {
    let behaviors: Vec<_> = records.iter().filter_map(|r| r.behavior.as_ref()).collect();

    let handlers = unique(
        behaviors
            .iter()
            .flat_map(|b| b.listeners.iter().map(|l| l.handler.as_str())),
    );
    if !handlers.is_empty() {
        md.push_str("### Event Listeners\n\n```javascript\n");
        for handler in handlers {
            md.push_str(handler);
            md.push_str("\n\n");
        }
        md.push_str("```\n\n");
    }

    let snippets = unique(
        behaviors
            .iter()
            .flat_map(|b| b.references.iter().map(|r| r.context.as_str())),
    );
    if !snippets.is_empty() {
        md.push_str("### JavaScript References\n\n```javascript\n");
        for snippet in snippets {
            md.push_str(snippet);
            md.push_str("\n\n");
        }
        md.push_str("```\n\n");
    }
}

/// Distinct items in first-seen order.
fn unique<'a>(items: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(*item)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rule() {
        let rule = RuleMatch {
            source: "inline".to_string(),
            selector: ".card".to_string(),
            css_text: ".card { color: red; margin: 0 auto; }".to_string(),
            specificity: 10,
        };
        assert_eq!(format_rule(&rule), ".card {\n  color: red;\n  margin: 0 auto;\n}");
    }

    #[test]
    fn test_unique_keeps_first_seen_order() {
        let items = ["b", "a", "b", "c", "a"];
        assert_eq!(unique(items.into_iter()), vec!["b", "a", "c"]);
    }
}
