//! Component framework evidence rules.
//!
//! Each rule is a predicate over a [`MarkerSource`] plus the evidence it
//! reports. Rules are evaluated in order and each framework is reported at
//! most once per element.

use crate::document::Element;

use super::types::FrameworkMarker;

/// Marker surface of an element that evidence rules can inspect.
pub trait MarkerSource {
    fn attribute_names(&self) -> Vec<&str>;
    fn has_class_name(&self, class: &str) -> bool;
    fn class_names(&self) -> Vec<&str>;

    fn has_attribute(&self, name: &str) -> bool {
        self.attribute_names().contains(&name)
    }

    fn has_attribute_prefix(&self, prefix: &str) -> bool {
        self.attribute_names().iter().any(|name| name.starts_with(prefix))
    }

    fn has_class_prefix(&self, prefix: &str) -> bool {
        self.class_names().iter().any(|class| class.starts_with(prefix))
    }
}

impl MarkerSource for Element {
    fn attribute_names(&self) -> Vec<&str> {
        self.attrs().map(|(name, _)| name).collect()
    }

    fn has_class_name(&self, class: &str) -> bool {
        self.has_class(class)
    }

    fn class_names(&self) -> Vec<&str> {
        self.classes()
    }
}

/// One framework fingerprint.
pub struct EvidenceRule {
    pub framework: &'static str,
    pub evidence: &'static str,
    pub test: fn(&dyn MarkerSource) -> bool,
}

/// Scoped-style attributes (`data-v-1a2b3c`) or directives (`v-if`).
fn has_vue_directive(source: &dyn MarkerSource) -> bool {
    source
        .attribute_names()
        .iter()
        .any(|name| name.starts_with("v-") || name.starts_with("data-v-"))
}

pub static EVIDENCE_RULES: &[EvidenceRule] = &[
    EvidenceRule {
        framework: "React",
        evidence: "React root or instance attributes found",
        test: |s| s.has_attribute("data-reactroot") || s.has_attribute("data-reactid"),
    },
    EvidenceRule {
        framework: "Vue.js",
        evidence: "Vue scoped-style or directive attributes found",
        test: has_vue_directive,
    },
    EvidenceRule {
        framework: "Angular",
        evidence: "Angular attributes or classes found",
        test: |s| {
            s.has_attribute("ng-version")
                || s.has_attribute("ng-app")
                || s.has_attribute_prefix("_ngcontent-")
                || s.has_attribute_prefix("_nghost-")
                || s.has_class_name("ng-scope")
        },
    },
    EvidenceRule {
        framework: "Alpine.js",
        evidence: "Alpine.js directives found",
        test: |s| s.has_attribute_prefix("x-"),
    },
    EvidenceRule {
        framework: "Svelte",
        evidence: "Svelte scoped class found",
        test: |s| s.has_class_prefix("svelte-"),
    },
    EvidenceRule {
        framework: "htmx",
        evidence: "htmx attributes found",
        test: |s| s.has_attribute_prefix("hx-"),
    },
];

/// Evaluate every evidence rule against one element.
pub fn detect_frameworks(source: &dyn MarkerSource) -> Vec<FrameworkMarker> {
    EVIDENCE_RULES
        .iter()
        .filter(|rule| (rule.test)(source))
        .map(|rule| FrameworkMarker {
            name: rule.framework.to_string(),
            evidence: rule.evidence.to_string(),
            kind: "component-framework".to_string(),
        })
        .collect()
}
