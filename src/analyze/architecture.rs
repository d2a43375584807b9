//! Whole-document resource extraction for architecture runs.

use serde::{Deserialize, Serialize};

use crate::document::{Document, ResourceSnapshot, StyleOrigin};

/// Rule text standing in for a sheet whose rules could not be read.
pub const BLOCKED_SHEET_TEXT: &str = "/* CORS blocked - external stylesheet not accessible */";

/// Label of the pseudo-sheet collecting every `style` attribute.
pub const STYLE_ATTRIBUTES_SOURCE: &str = "Inline style attributes";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSheet {
    pub href: String,
    pub rules: String,
    pub rule_count: usize,
    pub blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedSheet {
    pub source: String,
    pub rules: String,
    pub rule_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CssInventory {
    pub external: Vec<ExternalSheet>,
    pub inline: Vec<EmbeddedSheet>,
}

impl CssInventory {
    pub fn total_rules(&self) -> usize {
        self.external.iter().map(|s| s.rule_count).sum::<usize>()
            + self.inline.iter().map(|s| s.rule_count).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalScriptRef {
    pub src: String,
    pub is_async: bool,
    pub defer: bool,
    pub script_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineScriptBlock {
    pub source: String,
    pub content: String,
    pub script_type: String,
    /// Length in characters.
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptInventory {
    pub external: Vec<ExternalScriptRef>,
    pub inline: Vec<InlineScriptBlock>,
}

impl ScriptInventory {
    pub fn total_inline_size(&self) -> usize {
        self.inline.iter().map(|s| s.size).sum()
    }
}

/// Every reachable style rule and script reference of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureData {
    pub css: CssInventory,
    pub js: ScriptInventory,
}

impl ArchitectureData {
    pub fn extract(doc: &Document, snapshot: &ResourceSnapshot) -> Self {
        let mut css = CssInventory::default();
        for source in &snapshot.styles {
            match &source.origin {
                StyleOrigin::Linked { href } => css.external.push(match source.stylesheet() {
                    Some(sheet) => ExternalSheet {
                        href: href.clone(),
                        rules: sheet.css_text(),
                        rule_count: sheet.rule_count(),
                        blocked: false,
                    },
                    None => ExternalSheet {
                        href: href.clone(),
                        rules: BLOCKED_SHEET_TEXT.to_string(),
                        rule_count: 0,
                        blocked: true,
                    },
                }),
                StyleOrigin::Embedded { index } => {
                    if let Some(sheet) = source.stylesheet() {
                        css.inline.push(EmbeddedSheet {
                            source: format!("<style> block #{}", index + 1),
                            rules: sheet.css_text(),
                            rule_count: sheet.rule_count(),
                        });
                    }
                }
            }
        }

        let styled: Vec<String> = ResourceSnapshot::styled_elements(doc)
            .into_iter()
            .filter_map(|id| {
                doc.element(id)
                    .attr("style")
                    .map(|style| format!("{} {{ {} }}", doc.generate_selector(id), style))
            })
            .collect();
        if !styled.is_empty() {
            css.inline.push(EmbeddedSheet {
                source: STYLE_ATTRIBUTES_SOURCE.to_string(),
                rule_count: styled.len(),
                rules: styled.join("\n"),
            });
        }

        let js = ScriptInventory {
            external: snapshot
                .external_scripts
                .iter()
                .map(|script| ExternalScriptRef {
                    src: script.src.clone(),
                    is_async: script.is_async,
                    defer: script.defer,
                    script_type: script.script_type.clone(),
                })
                .collect(),
            inline: snapshot
                .inline_scripts
                .iter()
                .filter(|script| !script.content.trim().is_empty())
                .map(|script| InlineScriptBlock {
                    source: script.label.clone(),
                    content: script.content.clone(),
                    script_type: script.script_type.clone(),
                    size: script.content.chars().count(),
                })
                .collect(),
        };

        Self { css, js }
    }
}
