//! Style sheet parsing, selector matching and specificity.
//!
//! - `stylesheet`: `cssparser` rule lists (style rules, conditional groups,
//!   other at-rules) and declaration blocks
//! - `selector`: `scraper` selectors matched against a `Document`
//! - `specificity`: specificity score computed from selector text alone

mod selector;
mod specificity;
mod stylesheet;

pub use selector::{SelectorError, SelectorList};
pub use specificity::{specificity, Specificity};
pub use stylesheet::{
    parse_declarations, AtRule, CssRule, Declaration, GroupKind, GroupRule, StyleRule, Stylesheet,
};
