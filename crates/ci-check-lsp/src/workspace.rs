//! Workspace accessor backed by the client's open documents and the disk.

use async_trait::async_trait;
use ci_check_core::{CheckError, Result, Root, RootScope, TextDocument, Workspace};
use std::sync::Arc;
use tokio::sync::watch;
use tower_lsp_server::ls_types::Uri;

use crate::document::{OpenDocuments, load_document_from_disk};

pub struct LspWorkspace {
    documents: Arc<OpenDocuments>,
    scope: RootScope,
}

impl LspWorkspace {
    pub fn new(documents: Arc<OpenDocuments>) -> Self {
        Self {
            documents,
            scope: RootScope::default(),
        }
    }

    /// Replaces the active root set. An empty set means workspace-wide.
    pub fn set_scope(&self, roots: Vec<Root>) {
        tracing::info!(roots = roots.len(), "workspace scope changed");
        self.scope.set(roots);
    }
}

#[async_trait]
impl Workspace for LspWorkspace {
    fn roots(&self) -> watch::Receiver<Vec<Root>> {
        self.scope.subscribe()
    }

    async fn open_document(&self, uri: &Uri) -> Result<TextDocument> {
        if let Some(text) = self.documents.get(uri) {
            return Ok(TextDocument::new(uri.clone(), text));
        }
        let text = load_document_from_disk(uri)
            .await
            .map_err(|e| CheckError::fetch_failed(uri.as_str(), e.to_string()))?;
        Ok(TextDocument::new(uri.clone(), text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_open_document_prefers_overlay() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"on disk").unwrap();
        file.flush().unwrap();
        let uri = Uri::from_file_path(file.path()).unwrap();

        let documents = Arc::new(OpenDocuments::new());
        let workspace = LspWorkspace::new(Arc::clone(&documents));
        assert_eq!(workspace.open_document(&uri).await.unwrap().text, "on disk");

        documents.update(uri.clone(), "in editor".into());
        assert_eq!(workspace.open_document(&uri).await.unwrap().text, "in editor");

        documents.close(&uri);
        assert_eq!(workspace.open_document(&uri).await.unwrap().text, "on disk");
    }

    #[tokio::test]
    async fn test_missing_file_is_fetch_failure() {
        let workspace = LspWorkspace::new(Arc::new(OpenDocuments::new()));
        let uri = Uri::from_file_path("/nonexistent/.travis.yml").unwrap();
        let err = workspace.open_document(&uri).await.unwrap_err();
        assert!(matches!(err, CheckError::FetchFailed { .. }));
    }

    #[tokio::test]
    async fn test_scope_changes_notify() {
        let workspace = LspWorkspace::new(Arc::new(OpenDocuments::new()));
        let mut roots = workspace.roots();
        assert!(roots.borrow_and_update().is_empty());

        let root = Root::new(Uri::from_file_path("/repos/a").unwrap());
        workspace.set_scope(vec![root.clone()]);
        roots.changed().await.unwrap();
        assert_eq!(*roots.borrow(), vec![root]);
    }
}
