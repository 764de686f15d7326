//! Workspace accessor: the live root set and on-demand document access.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tower_lsp_server::ls_types::Uri;

use crate::document::{Root, TextDocument};
use crate::error::Result;

/// Host view of the workspace.
///
/// The root set is owned by the host; detectors only observe it.
#[async_trait]
pub trait Workspace: Send + Sync {
    /// Live view of the repositories currently in scope.
    ///
    /// The receiver's current value is the present root set; every change is
    /// signalled through `changed()`.
    fn roots(&self) -> watch::Receiver<Vec<Root>>;

    /// Fetches the full, current text of a file.
    async fn open_document(&self, uri: &Uri) -> Result<TextDocument>;
}

#[async_trait]
impl<T: Workspace + ?Sized> Workspace for Arc<T> {
    fn roots(&self) -> watch::Receiver<Vec<Root>> {
        (**self).roots()
    }

    async fn open_document(&self, uri: &Uri) -> Result<TextDocument> {
        (**self).open_document(uri).await
    }
}

/// Owned, changeable root set for hosts implementing [`Workspace`].
#[derive(Debug)]
pub struct RootScope {
    tx: watch::Sender<Vec<Root>>,
}

impl RootScope {
    pub fn new(initial: Vec<Root>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Replaces the root set and notifies every observer, even if the new
    /// set equals the old one.
    pub fn set(&self, roots: Vec<Root>) {
        tracing::debug!(count = roots.len(), "workspace roots changed");
        self.tx.send_replace(roots);
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Root>> {
        self.tx.subscribe()
    }
}

impl Default for RootScope {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
