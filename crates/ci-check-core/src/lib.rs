//! Core abstractions for ci-check.
//!
//! Host-agnostic building blocks shared by detectors and hosts: collaborator
//! traits for text search, workspace access and diagnostic storage, plus the
//! plumbing detectors are assembled from (memoized search, line matcher,
//! ordered edits, and a shared replay-one stream).

pub mod diagnostics;
pub mod document;
pub mod edit;
pub mod error;
pub mod matcher;
pub mod search;
pub mod shared;
pub mod workspace;

pub use diagnostics::{
    DiagnosticCollection, DiagnosticSink, DiagnosticSnapshot, DiagnosticStore, DiagnosticsReader,
    FileDiagnostics, diagnostic_code, has_code,
};
pub use document::{FileMatch, Root, TextDocument};
pub use edit::{WorkspaceEdit, apply_edits};
pub use error::{CheckError, Result};
pub use matcher::{find_first_match, find_match_ranges};
pub use search::{DEFAULT_SEARCH_TTL, MemoizedSearch, SearchQuery, TextSearch};
pub use shared::{Publisher, SharedError, SharedStream, Subscription};
pub use workspace::{RootScope, Workspace};
