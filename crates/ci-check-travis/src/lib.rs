//! Travis CI Go version check.
//!
//! Flags `.travis.yml` files that declare a Go build without the current Go
//! version and offers fixes for them:
//!
//! - [`DiagnosticPipeline`] searches the workspace and produces snapshots
//! - [`start_diagnostics`] forwards snapshots into a diagnostics sink
//! - [`compute_fix_edit`] and [`compute_fix_all`] build the edits
//! - [`provide_code_actions`] assembles the quick fixes for a request
//! - [`summarize`] and [`StatusProvider`] project snapshots into a status
//!
//! [`TravisGoCheck`] wires all of them up for a host.

pub mod actions;
pub mod check;
pub mod config;
pub mod fix;
pub mod pipeline;
pub mod sink;
pub mod status;

#[cfg(test)]
mod test_utils;

pub use actions::{CodeActionRequest, provide_code_actions};
pub use check::TravisGoCheck;
pub use config::{
    COLLECTION_NAME, DIAGNOSTIC_SOURCE, DOCS_URL, OPEN_URL_COMMAND, STATUS_TITLE, TRAVIS_GO_CODE,
    TravisGoConfig,
};
pub use fix::{FixAll, compute_fix_all, compute_fix_edit, fix_edit};
pub use pipeline::{DiagnosticPipeline, diagnose};
pub use sink::{SinkHandle, start_diagnostics};
pub use status::{
    Notification, NotificationKind, Status, StatusProvider, StatusScope, StatusSubscription,
    summarize,
};
