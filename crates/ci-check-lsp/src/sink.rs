//! Diagnostics sink publishing to the LSP client.

use async_trait::async_trait;
use ci_check_core::{CheckError, DiagnosticCollection, DiagnosticSink, DiagnosticSnapshot};
use tower_lsp_server::Client;
use tower_lsp_server::ls_types::{Diagnostic, MessageType, Uri};

/// Client-side effects of the sink.
#[async_trait]
pub trait ClientNotifier: Send + Sync {
    async fn publish(&self, uri: Uri, diagnostics: Vec<Diagnostic>);
    async fn show_error(&self, message: String);
}

#[async_trait]
impl ClientNotifier for Client {
    async fn publish(&self, uri: Uri, diagnostics: Vec<Diagnostic>) {
        self.publish_diagnostics(uri, diagnostics, None).await;
    }

    async fn show_error(&self, message: String) {
        self.show_message(MessageType::ERROR, message).await;
    }
}

/// Keeps a store collection and the client's diagnostics in sync.
///
/// Every file of a snapshot is published, and files dropped from the
/// collection get an empty publish so the client clears them.
pub struct LspDiagnosticSink<N> {
    notifier: N,
    collection: DiagnosticCollection,
}

impl<N: ClientNotifier> LspDiagnosticSink<N> {
    pub fn new(notifier: N, collection: DiagnosticCollection) -> Self {
        Self {
            notifier,
            collection,
        }
    }
}

#[async_trait]
impl<N: ClientNotifier> DiagnosticSink for LspDiagnosticSink<N> {
    async fn replace(&self, snapshot: &DiagnosticSnapshot) {
        let removed = self
            .collection
            .store()
            .replace_collection(self.collection.name(), snapshot);

        for file in snapshot.iter() {
            self.notifier
                .publish(file.uri.clone(), file.diagnostics.clone())
                .await;
        }
        for uri in removed {
            self.notifier.publish(uri, Vec::new()).await;
        }

        tracing::info!(
            collection = %self.collection.name(),
            files = snapshot.len(),
            diagnostics = snapshot.diagnostic_count(),
            "published diagnostics"
        );
    }

    async fn clear(&self) {
        let cleared = self
            .collection
            .store()
            .clear_collection(self.collection.name());
        tracing::debug!(files = cleared.len(), "clearing published diagnostics");
        for uri in cleared {
            self.notifier.publish(uri, Vec::new()).await;
        }
    }

    async fn report_failure(&self, error: &CheckError) {
        tracing::error!("{} check failed: {}", self.collection.name(), error);
        self.notifier
            .show_error(format!("ci-check: {} check failed: {}", self.collection.name(), error))
            .await;
    }
}
