//! Loading the label rule set.
//!
//! Rules live in a YAML file with a top-level `LabelRules` list:
//!
//! ```yaml
//! LabelRules:
//!   - Name: triage-bugs
//!     Description: New bugs land in triage
//!     Content: Issue
//!     State: open
//!     Label: bug
//!     Project: Triage
//!     Column: Incoming
//! ```
//!
//! The set is immutable once loaded; [`crate::RuleEngine::reload`] swaps in a
//! new one.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use board::LabelRule;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

/// File names probed in each search directory.
pub const RULES_FILE_NAMES: [&str; 2] = [".prj.yaml", ".prj.yml"];

/// Errors produced while loading a rule set.
#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error("Failed to read rules file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {origin}: {source}")]
    Parse {
        /// The file path, or `"rules document"` for inline YAML.
        origin: String,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

#[derive(Deserialize)]
struct RulesFile {
    #[serde(rename = "LabelRules", alias = "labelRules", alias = "label_rules", default)]
    label_rules: Vec<LabelRule>,
}

/// An ordered, immutable list of label rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<LabelRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<LabelRule>) -> Self {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.name.as_str()) {
                warn!(rule = %rule.name, "Duplicate rule name; outcomes will be ambiguous in logs");
            }
        }
        Self { rules }
    }

    /// A rule set with no rules.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a rules document.
    ///
    /// An empty document yields an empty set.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RuleSetError> {
        Self::parse(yaml, None)
    }

    /// Reads and parses a rules file.
    pub fn load(path: &Path) -> Result<Self, RuleSetError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| RuleSetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = Self::parse(&yaml, Some(path))?;
        info!(path = %path.display(), count = rules.len(), "Loaded rules config");
        Ok(rules)
    }

    /// Loads the first rules file found in `search_dirs`.
    ///
    /// A missing file is not an error: the automation runs with no rules and
    /// a warning is logged. A file that exists but does not parse is an error.
    pub fn discover(search_dirs: &[PathBuf]) -> Result<Self, RuleSetError> {
        let found = search_dirs
            .iter()
            .flat_map(|dir| RULES_FILE_NAMES.iter().map(move |name| dir.join(name)))
            .find(|candidate| candidate.is_file());

        match found {
            Some(path) => Self::load(&path),
            None => {
                warn!(dirs = ?search_dirs, "No rules file found; running without label rules");
                Ok(Self::empty())
            }
        }
    }

    /// The default search path: the working directory, then `$HOME/.prj`.
    pub fn default_search_dirs(home: Option<&Path>) -> Vec<PathBuf> {
        let mut dirs = vec![PathBuf::from(".")];
        if let Some(home) = home {
            dirs.push(home.join(".prj"));
        }
        dirs
    }

    fn parse(yaml: &str, path: Option<&Path>) -> Result<Self, RuleSetError> {
        if yaml.trim().is_empty() {
            return Ok(Self::empty());
        }
        let file: RulesFile = serde_yaml_ng::from_str(yaml).map_err(|source| RuleSetError::Parse {
            origin: path.map_or_else(
                || "rules document".to_string(),
                |p| format!("rules file {}", p.display()),
            ),
            source,
        })?;
        Ok(Self::new(file.label_rules))
    }

    /// Rules in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &LabelRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<LabelRule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = LabelRule>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use board::{ContentKind, ItemState};

    const RULES: &str = r#"
LabelRules:
  - Name: triage-bugs
    Description: New bugs land in triage
    Content: Issue
    State: open
    Label: bug
    Project: Triage
    Column: Incoming
  - name: ready-prs
    content: PullRequest
    state: open
    label: ready
    project: Delivery
    column: Review
"#;

    #[test]
    fn test_parses_rules_in_declaration_order() {
        let rules = RuleSet::from_yaml_str(RULES).unwrap();
        let names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["triage-bugs", "ready-prs"]);

        let second = rules.iter().nth(1).unwrap();
        assert_eq!(second.content, ContentKind::PullRequest);
        assert_eq!(second.state, ItemState::Open);
    }

    #[test]
    fn test_empty_document_is_empty_set() {
        assert!(RuleSet::from_yaml_str("  \n").unwrap().is_empty());
        assert!(RuleSet::from_yaml_str("LabelRules: []").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_content_kind_is_rejected() {
        let yaml = "LabelRules:\n  - Name: x\n    Content: Discussion\n    State: open\n    Label: a\n    Project: P\n    Column: C\n";
        let err = RuleSet::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, RuleSetError::Parse { .. }));
        assert!(err.to_string().starts_with("Failed to parse rules document"));
    }

    #[test]
    fn test_discover_prefers_first_directory() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join(".prj.yaml"), RULES).unwrap();

        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(RuleSet::discover(&dirs).unwrap().len(), 2);

        std::fs::write(first.path().join(".prj.yml"), "LabelRules: []").unwrap();
        assert!(RuleSet::discover(&dirs).unwrap().is_empty());
    }

    #[test]
    fn test_discover_without_file_yields_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let rules = RuleSet::discover(&[dir.path().to_path_buf()]).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_load_reports_path_of_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        std::fs::write(&path, "LabelRules: [ {").unwrap();

        let err = RuleSet::load(&path).unwrap_err();
        assert!(err.to_string().contains("rules.yaml"));
    }

    #[test]
    fn test_default_search_dirs_include_home() {
        let dirs = RuleSet::default_search_dirs(Some(Path::new("/home/ops")));
        assert_eq!(dirs, [PathBuf::from("."), PathBuf::from("/home/ops/.prj")]);
    }
}
