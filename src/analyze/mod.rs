//! The analysis engine.
//!
//! A run collects a subtree, then routes each node through the stages the
//! mode enables: structural capture, style matching with inheritance, and
//! the behavioral scan. Results land in a [`RunContext`].

pub mod architecture;
pub mod behavior;
pub mod cascade;
pub mod collect;
pub mod context;
pub mod frameworks;
pub mod inherit;
pub mod request;
pub mod scheduler;
pub mod session;
pub mod styles;
pub mod types;

pub use architecture::ArchitectureData;
pub use behavior::{context_window, scan_element, search_tokens, ScriptIndex};
pub use cascade::{Cascade, ResolvedStyle};
pub use collect::{capture_structure, collect_subtree, truncate_chars};
pub use context::RunContext;
pub use frameworks::{detect_frameworks, EvidenceRule, MarkerSource, EVIDENCE_RULES};
pub use inherit::{collect_inherited, is_inheritable, INHERITABLE_PROPERTIES};
pub use request::{AnalysisMode, Depth, RootSpec, RunRequest};
pub use scheduler::{Progress, Scheduler, DEFAULT_BATCH_SIZE};
pub use session::Inspector;
pub use styles::{element_signature, RuleIndex, INLINE_STYLE_SOURCE};
pub use types::*;
