//! Selector parsing and matching.
//!
//! Selectors are parsed by `scraper` and matched against the document's
//! parsed tree. Only tree-structural pseudo-classes are known: states of a
//! live page (`:hover`, `:checked`, `:link`) and pseudo-elements do not
//! parse, so rules using them are skipped rather than matched.

use scraper::Selector;
use thiserror::Error;

use crate::document::{Document, NodeId};

/// Why a selector could not be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("{0}")]
    Invalid(String),
}

/// A parsed, comma-separated selector list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    selector: Selector,
}

impl SelectorList {
    pub fn parse(text: &str) -> Result<Self, SelectorError> {
        if text.trim().is_empty() {
            return Err(SelectorError::Empty);
        }
        Selector::parse(text)
            .map(|selector| SelectorList { selector })
            .map_err(|e| SelectorError::Invalid(e.to_string()))
    }

    /// Whether any selector of the list matches the element.
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        doc.element_ref(id)
            .map(|el| self.selector.matches(&el))
            .unwrap_or(false)
    }
}
