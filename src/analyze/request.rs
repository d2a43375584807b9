//! Run requests: which subtree to analyze and which stages to run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::document::{Document, NodeId};
use crate::error::InspectError;

/// How far below the root the collector descends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    /// Levels below the root; `Limited(0)` is the root alone.
    Limited(usize),
    #[default]
    Unbounded,
}

impl Depth {
    /// Whether a node `level` levels below the root may be expanded further.
    pub fn allows_children(&self, level: usize) -> bool {
        match self {
            Depth::Limited(max) => level < *max,
            Depth::Unbounded => true,
        }
    }

    pub fn as_limit(&self) -> usize {
        match self {
            Depth::Limited(max) => *max,
            Depth::Unbounded => usize::MAX,
        }
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Depth::Limited(0) => write!(f, "none"),
            Depth::Limited(n) => write!(f, "{}", n),
            Depth::Unbounded => write!(f, "all"),
        }
    }
}

impl FromStr for Depth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "0" => Ok(Depth::Limited(0)),
            "all" | "unbounded" => Ok(Depth::Unbounded),
            other => other
                .parse()
                .map(Depth::Limited)
                .map_err(|_| format!("unknown depth: {}", s)),
        }
    }
}

/// Which stages run for each collected node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMode {
    #[default]
    Full,
    Structure,
    Style,
    Behavior,
    StructureStyle,
    /// Whole-document resource extraction plus structural entries.
    Architecture,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Full => "full",
            AnalysisMode::Structure => "structure",
            AnalysisMode::Style => "style",
            AnalysisMode::Behavior => "behavior",
            AnalysisMode::StructureStyle => "structure-style",
            AnalysisMode::Architecture => "architecture",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AnalysisMode::Full => "Full Analysis",
            AnalysisMode::Structure => "Structure Only",
            AnalysisMode::Style => "Style Only",
            AnalysisMode::Behavior => "Behavior Only",
            AnalysisMode::StructureStyle => "Structure & Style",
            AnalysisMode::Architecture => "Architecture Analysis",
        }
    }

    pub fn captures_structure(&self) -> bool {
        matches!(
            self,
            AnalysisMode::Full
                | AnalysisMode::Structure
                | AnalysisMode::StructureStyle
                | AnalysisMode::Architecture
        )
    }

    pub fn matches_styles(&self) -> bool {
        matches!(
            self,
            AnalysisMode::Full | AnalysisMode::Style | AnalysisMode::StructureStyle
        )
    }

    pub fn scans_behavior(&self) -> bool {
        matches!(self, AnalysisMode::Full | AnalysisMode::Behavior)
    }

    pub fn is_architecture(&self) -> bool {
        matches!(self, AnalysisMode::Architecture)
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(AnalysisMode::Full),
            "structure" => Ok(AnalysisMode::Structure),
            "style" | "css" => Ok(AnalysisMode::Style),
            "behavior" | "js" => Ok(AnalysisMode::Behavior),
            "structure-style" | "structure-css" => Ok(AnalysisMode::StructureStyle),
            "architecture" => Ok(AnalysisMode::Architecture),
            _ => Err(format!("unknown analysis mode: {}", s)),
        }
    }
}

/// The root of a run: a node handle or a structural query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSpec {
    Node(NodeId),
    Query(String),
}

impl RootSpec {
    pub fn resolve(&self, doc: &Document) -> Result<NodeId, InspectError> {
        match self {
            RootSpec::Node(id) => Ok(*id),
            RootSpec::Query(query) => doc.query(query),
        }
    }

    /// Label used in reports: the query as typed, or the generated selector.
    pub fn label(&self, doc: &Document) -> String {
        match self {
            RootSpec::Node(id) => doc.generate_selector(*id),
            RootSpec::Query(query) => query.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub root: RootSpec,
    pub depth: Depth,
    pub mode: AnalysisMode,
}

impl RunRequest {
    pub fn new(root: RootSpec) -> Self {
        Self {
            root,
            depth: Depth::default(),
            mode: AnalysisMode::default(),
        }
    }

    pub fn query(query: &str) -> Self {
        Self::new(RootSpec::Query(query.to_string()))
    }

    pub fn depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    pub fn mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_parse() {
        assert_eq!("none".parse::<Depth>().unwrap(), Depth::Limited(0));
        assert_eq!("2".parse::<Depth>().unwrap(), Depth::Limited(2));
        assert_eq!("ALL".parse::<Depth>().unwrap(), Depth::Unbounded);
        assert!("deep".parse::<Depth>().is_err());
        assert_eq!(Depth::Limited(0).to_string(), "none");
    }

    #[test]
    fn test_mode_stages() {
        let mode: AnalysisMode = "structure-css".parse().unwrap();
        assert_eq!(mode, AnalysisMode::StructureStyle);
        assert!(mode.captures_structure() && mode.matches_styles() && !mode.scans_behavior());
        assert!(!AnalysisMode::Behavior.matches_styles());
        assert!(AnalysisMode::Architecture.captures_structure());
        assert!(!AnalysisMode::Architecture.scans_behavior());
    }
}
