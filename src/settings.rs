//! Analysis settings.
//!
//! Settings are read from `domlens.yaml` (or `.domlens.yaml`) and can be
//! changed one key at a time. Each option only affects the stage it names.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::InspectError;

/// File names tried by [`Settings::discover`], in order.
pub const SETTINGS_FILE_NAMES: &[&str] = &["domlens.yaml", ".domlens.yaml"];

/// Named analysis options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Deepest level echoed by simplified markup exports.
    pub max_display_depth: usize,
    /// Longest text snippet kept per element, in characters.
    pub max_text_length: usize,
    /// Children shown per node in the display tree and simplified markup.
    pub max_children_display: usize,
    /// Children echoed per node in the consolidated report.
    pub max_export_children: usize,
    /// Byte ceiling of every exported document.
    pub max_export_size: usize,
    /// Characters of script text kept on each side of a reference.
    pub js_context_size: usize,
    pub enable_extended_search: bool,
    pub include_css_variables: bool,
    pub include_inherited_styles: bool,
    pub include_javascript: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_display_depth: 10,
            max_text_length: 500,
            max_children_display: 50,
            max_export_children: 1000,
            max_export_size: 1_000_000,
            js_context_size: 300,
            enable_extended_search: true,
            include_css_variables: true,
            include_inherited_styles: true,
            include_javascript: true,
        }
    }
}

/// Keys accepted by [`Settings::set`].
pub const SETTING_KEYS: &[&str] = &[
    "max_display_depth",
    "max_text_length",
    "max_children_display",
    "max_export_children",
    "max_export_size",
    "js_context_size",
    "enable_extended_search",
    "include_css_variables",
    "include_inherited_styles",
    "include_javascript",
];

impl Settings {
    /// Parse settings from a YAML file. Missing keys keep their defaults.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, InspectError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| InspectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }
        serde_yaml::from_str(&content).map_err(|source| InspectError::SettingsParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find a settings file in `dir`.
    pub fn discover<P: AsRef<Path>>(dir: P) -> Option<PathBuf> {
        SETTINGS_FILE_NAMES
            .iter()
            .map(|name| dir.as_ref().join(name))
            .find(|path| path.is_file())
    }

    /// Change one setting by name. Accepts `snake_case` and `camelCase` keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), InspectError> {
        let normalized = normalize_key(key);
        let value = value.trim();
        match normalized.as_str() {
            "max_display_depth" => self.max_display_depth = parse_count(&normalized, value)?,
            "max_text_length" => self.max_text_length = parse_count(&normalized, value)?,
            "max_children_display" => self.max_children_display = parse_count(&normalized, value)?,
            "max_export_children" => self.max_export_children = parse_count(&normalized, value)?,
            "max_export_size" => self.max_export_size = parse_count(&normalized, value)?,
            "js_context_size" => self.js_context_size = parse_count(&normalized, value)?,
            "enable_extended_search" => {
                self.enable_extended_search = parse_flag(&normalized, value)?
            }
            "include_css_variables" => self.include_css_variables = parse_flag(&normalized, value)?,
            "include_inherited_styles" => {
                self.include_inherited_styles = parse_flag(&normalized, value)?
            }
            "include_javascript" => self.include_javascript = parse_flag(&normalized, value)?,
            _ => return Err(InspectError::UnknownSetting(key.to_string())),
        }
        info!(key = %normalized, value, "setting updated");
        Ok(())
    }

    /// Apply `key=value` overrides in order.
    pub fn apply_overrides<S: AsRef<str>>(&mut self, overrides: &[S]) -> Result<(), InspectError> {
        for entry in overrides {
            let entry = entry.as_ref();
            let (key, value) = entry.split_once('=').ok_or_else(|| InspectError::InvalidSetting {
                key: entry.to_string(),
                value: String::new(),
                reason: "expected key=value".to_string(),
            })?;
            self.set(key.trim(), value)?;
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_default()
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_yaml())
    }
}

/// Reject ceilings that would make every display or export empty.
pub fn validate(settings: &Settings) -> Result<(), InspectError> {
    let ceilings = [
        ("max_display_depth", settings.max_display_depth),
        ("max_text_length", settings.max_text_length),
        ("max_children_display", settings.max_children_display),
        ("max_export_children", settings.max_export_children),
        ("max_export_size", settings.max_export_size),
    ];
    for (key, value) in ceilings {
        if value == 0 {
            return Err(InspectError::InvalidSetting {
                key: key.to_string(),
                value: value.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
    }
    Ok(())
}

fn normalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.trim().chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else if c == '-' {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    // camelCase spells the CSS acronym in capitals: includeCSSVariables.
    out.replace("c_s_s", "css")
}

fn parse_count(key: &str, value: &str) -> Result<usize, InspectError> {
    value.parse().map_err(|_| InspectError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
        reason: "expected a non-negative integer".to_string(),
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, InspectError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(InspectError::InvalidSetting {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
