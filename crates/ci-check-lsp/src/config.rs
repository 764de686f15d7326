//! Server configuration read from LSP initialization options.

use ci_check_travis::TravisGoConfig;
use serde::Deserialize;
use std::path::PathBuf;

/// Top-level configuration.
///
/// ```json
/// {
///   "repositories_root": "/home/me/src",
///   "travis_go": { "target_version": "1.13.x", "max_results": 100 }
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Directory whose sub-directories are searched as repositories.
    /// Falls back to the client's workspace folders.
    pub repositories_root: Option<PathBuf>,
    pub travis_go: TravisGoConfig,
}

impl CheckConfig {
    /// Parses initialization options, falling back to defaults on error.
    pub fn from_init_options(options: Option<serde_json::Value>) -> Self {
        let Some(options) = options else {
            return Self::default();
        };
        match serde_json::from_value(options) {
            Ok(config) => {
                tracing::debug!("loaded configuration: {:?}", config);
                config
            }
            Err(e) => {
                tracing::warn!("invalid initialization options, using defaults: {}", e);
                Self::default()
            }
        }
    }
}
