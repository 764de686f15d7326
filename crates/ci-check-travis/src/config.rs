//! Detector identity, patterns, and user-tunable settings.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use tower_lsp_server::ls_types::DiagnosticSeverity;

/// Code attached to every diagnostic this detector produces.
pub const TRAVIS_GO_CODE: &str = "check-search.travis-go";

/// Name of the diagnostics collection the detector writes into.
pub const COLLECTION_NAME: &str = "travis-go";

/// Value of the diagnostics `source` field.
pub const DIAGNOSTIC_SOURCE: &str = "ci-check";

pub const DIAGNOSTIC_MESSAGE: &str = "Outdated Go version used in Travis CI";

/// File-name pattern passed to the text search gateway.
pub const TRAVIS_FILE_PATTERN: &str = r"\.travis\.yml$";

pub const DOCS_URL: &str = "https://docs.travis-ci.com/user/languages/go/";

pub const FIX_TITLE: &str = "Use current Go version";

pub const DOCS_TITLE: &str = "View Travis CI docs";

/// Title of the bulk fix touching `files` repositories.
pub fn fix_all_title(files: usize) -> String {
    format!("Fix in all {files} repositories")
}

/// Command the host executes to open a URL.
pub const OPEN_URL_COMMAND: &str = "ci-check.open";

pub const STATUS_TITLE: &str = "Standardize Travis CI configuration";

/// Legacy Go declarations in a Travis CI config.
pub(crate) static LEGACY_GO_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(^go:)|(^language: go)").expect("Invalid regex"));

/// Start of the Go version list.
pub(crate) static GO_VERSIONS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^go:").expect("Invalid regex"));

/// Settings for the Travis CI Go check.
///
/// Every field has a default, so partial JSON objects deserialize fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TravisGoConfig {
    /// Go version entry the fix inserts, e.g. `1.13.x`.
    pub target_version: String,
    /// Regular expression selecting which repositories are searched.
    pub repo_include: String,
    /// Maximum number of configuration files considered per search.
    pub max_results: usize,
    pub severity: DiagnosticSeverity,
    /// How long a search result is reused, in seconds.
    pub search_cache_ttl_secs: u64,
}

impl Default for TravisGoConfig {
    fn default() -> Self {
        Self {
            target_version: "1.13.x".to_string(),
            repo_include: String::new(),
            max_results: 100,
            severity: DiagnosticSeverity::WARNING,
            search_cache_ttl_secs: 30,
        }
    }
}

impl TravisGoConfig {
    pub fn search_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.search_cache_ttl_secs)
    }

    /// Entry inserted below an existing `go:` line.
    pub(crate) fn version_entry(&self) -> String {
        format!("\n  - \"{}\"", self.target_version)
    }

    /// Block appended when the file has no `go:` section.
    pub(crate) fn version_block(&self) -> String {
        format!("\n\ngo:\n  - \"{}\"\n", self.target_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TravisGoConfig::default();
        assert_eq!(config.target_version, "1.13.x");
        assert_eq!(config.repo_include, "");
        assert_eq!(config.max_results, 100);
        assert_eq!(config.severity, DiagnosticSeverity::WARNING);
        assert_eq!(config.search_cache_ttl(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TravisGoConfig =
            serde_json::from_value(serde_json::json!({ "target_version": "1.21.x" })).unwrap();
        assert_eq!(config.target_version, "1.21.x");
        assert_eq!(config.max_results, 100);
    }

    #[test]
    fn test_severity_from_json_number() {
        let config: TravisGoConfig =
            serde_json::from_value(serde_json::json!({ "severity": 1 })).unwrap();
        assert_eq!(config.severity, DiagnosticSeverity::ERROR);
    }

    #[test]
    fn test_fix_texts() {
        let config = TravisGoConfig::default();
        assert_eq!(config.version_entry(), "\n  - \"1.13.x\"");
        assert_eq!(config.version_block(), "\n\ngo:\n  - \"1.13.x\"\n");
        assert_eq!(fix_all_title(3), "Fix in all 3 repositories");
    }

    #[test]
    fn test_patterns() {
        assert!(LEGACY_GO_PATTERN.is_match("go:"));
        assert!(LEGACY_GO_PATTERN.is_match("language: go"));
        assert!(!LEGACY_GO_PATTERN.is_match("  go:"));
        assert!(GO_VERSIONS_PATTERN.is_match("go:"));
        assert!(!GO_VERSIONS_PATTERN.is_match("language: go"));
    }
}
