//! Detection rules loaded from the embedded rules.toml.

use crate::error::{RepairError, Result};
use serde::Deserialize;
use std::path::Path;

/// A stale-reference pattern inside a project file: an element carrying an
/// attribute whose value contains a token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OffendingPattern {
    pub element: String,
    pub attribute: String,
    pub contains: String,
}

impl OffendingPattern {
    /// Case-insensitive match on element name, attribute name and value.
    pub fn matches(&self, element: &str, attribute: &str, value: &str) -> bool {
        element.eq_ignore_ascii_case(&self.element)
            && attribute.eq_ignore_ascii_case(&self.attribute)
            && value
                .to_lowercase()
                .contains(&self.contains.to_lowercase())
    }
}

#[derive(Debug, Deserialize)]
struct MarkerConfig {
    tokens: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SolutionConfig {
    extensions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectConfig {
    suffixes: Vec<String>,
    #[serde(default)]
    offending: Vec<OffendingPattern>,
}

/// Structure to deserialize rules from TOML
#[derive(Debug, Deserialize)]
struct RulesConfig {
    markers: MarkerConfig,
    solutions: SolutionConfig,
    projects: ProjectConfig,
}

// Embed the TOML file directly in the binary at compile time
const RULES_TOML: &str = include_str!("../rules.toml");

/// The full rule set. All name tokens are stored lowercased.
#[derive(Debug, Clone)]
pub struct Rules {
    pub marker_tokens: Vec<String>,
    pub solution_extensions: Vec<String>,
    pub project_suffixes: Vec<String>,
    pub offending: Vec<OffendingPattern>,
}

impl Rules {
    /// Parse rules from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: RulesConfig =
            toml::from_str(text).map_err(|e| RepairError::Config(e.to_string()))?;

        let lower = |items: Vec<String>| -> Vec<String> {
            items.into_iter().map(|s| s.to_lowercase()).collect()
        };

        Ok(Rules {
            marker_tokens: lower(config.markers.tokens),
            solution_extensions: lower(config.solutions.extensions),
            project_suffixes: lower(config.projects.suffixes),
            offending: config.projects.offending,
        })
    }

    /// Load the rules compiled into the binary.
    pub fn load() -> Result<Self> {
        Self::from_toml(RULES_TOML)
    }

    /// File name contains a marker token, e.g. `NuGet.Config` or `nuget.exe`.
    pub fn is_marker_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.marker_tokens.iter().any(|t| name.contains(t.as_str()))
    }

    pub fn is_solution_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.solution_extensions
            .iter()
            .any(|ext| name.ends_with(ext.as_str()))
    }

    pub fn is_project_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.project_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
    }

    /// Convenience wrapper over [`Rules::is_marker_name`] for paths.
    pub fn is_marker_path(&self, path: &Path) -> bool {
        path.file_name()
            .map(|n| self.is_marker_name(&n.to_string_lossy()))
            .unwrap_or(false)
    }

    /// True if any offending pattern matches this element/attribute pair.
    pub fn is_offending(&self, element: &str, attribute: &str, value: &str) -> bool {
        self.offending
            .iter()
            .any(|p| p.matches(element, attribute, value))
    }
}
