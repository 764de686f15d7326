pub mod config;
pub mod document;
pub mod search;
pub mod server;
pub mod sink;
pub mod workspace;

// Re-export from ci-check-core
pub use ci_check_core::{CheckError, Result};

pub use config::CheckConfig;
pub use search::FsTextSearch;
pub use server::Backend;
pub use sink::{ClientNotifier, LspDiagnosticSink};
pub use workspace::LspWorkspace;
