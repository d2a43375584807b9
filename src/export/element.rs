//! Per-element CSS analysis.

use chrono::NaiveDateTime;

use crate::analyze::AnalysisRecord;
use crate::document::Document;
use crate::settings::Settings;

use super::markup::simplified_markup;
use super::{categorize, generated_on, ExportDocument};

/// Build `css-analysis_<timestamp>.md` for one analyzed element.
pub fn element_document(
    doc: &Document,
    record: &AnalysisRecord,
    settings: &Settings,
    timestamp: NaiveDateTime,
) -> ExportDocument {
    let mut md = format!("# CSS Analysis for {}\n\n", record.selector);
    md.push_str(&format!("Generated on: {}\n\n", generated_on(timestamp)));

    md.push_str("## HTML Element\n\n```html\n");
    md.push_str(&simplified_markup(doc, record.node, settings));
    md.push_str("\n```\n\n");

    let style = record.style.clone().unwrap_or_default();

    md.push_str("## Applied CSS Rules\n\n");
    if style.applied.is_empty() {
        md.push_str("No CSS rules directly applied to this element.\n\n");
    }
    for group in &style.applied {
        md.push_str(&format!("### Source: {}\n\n", group.source));
        if group.blocked {
            md.push_str("Blocked: rules of this source are not accessible (0 rules).\n\n");
            continue;
        }
        for rule in &group.rules {
            md.push_str(&format!(
                "Selector: `{}` (specificity {})\n\n```css\n",
                rule.selector, rule.specificity
            ));
            for line in rule.declaration_lines() {
                md.push_str(&line);
                md.push('\n');
            }
            md.push_str("```\n\n");
        }
    }

    md.push_str("## Inherited CSS Properties\n\n");
    let inherited = style.inherited_by_ancestor();
    if inherited.is_empty() {
        md.push_str("No inherited CSS properties affecting this element.\n\n");
    }
    for (ancestor, entries) in inherited {
        md.push_str(&format!("### Inherited from: {}\n\n```css\n", ancestor));
        for entry in entries {
            md.push_str(&format!("{}: {};\n", entry.property, entry.value));
        }
        md.push_str("```\n\n");
    }

    md.push_str("## Computed Styles\n\n");
    if style.computed.is_empty() {
        md.push_str("No computed styles available.\n\n");
    }
    for (category, properties) in categorize(&style.computed) {
        md.push_str(&format!("### {}\n\n```css\n", category));
        for (property, value) in properties {
            md.push_str(&format!("{}: {};\n", property, value));
        }
        md.push_str("```\n\n");
    }

    if let Some(nested) = &style.nested {
        md.push_str("## Shadow Root Styles\n\n");
        for block in &nested.style_blocks {
            md.push_str(&format!("```css\n{}\n```\n\n", block.trim()));
        }
        for styled in &nested.styled_elements {
            md.push_str(&format!("- `{}`: `{}`\n", styled.selector, styled.style));
        }
        if !nested.styled_elements.is_empty() {
            md.push('\n');
        }
    }

    ExportDocument::new(
        format!("css-analysis_{}.md", timestamp.format("%Y-%m-%d_%H-%M")),
        md,
        settings.max_export_size,
    )
}
