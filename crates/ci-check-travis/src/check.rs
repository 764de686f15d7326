//! Registration bundle wiring the travis-go detector into a host.

use ci_check_core::{
    DiagnosticSink, DiagnosticSnapshot, DiagnosticsReader, MemoizedSearch, Result, SharedStream,
    TextSearch, Workspace,
};
use std::sync::Arc;
use tower_lsp_server::ls_types::CodeAction;

use crate::actions::{CodeActionRequest, provide_code_actions};
use crate::config::TravisGoConfig;
use crate::pipeline::DiagnosticPipeline;
use crate::sink::{SinkHandle, start_diagnostics};
use crate::status::{StatusProvider, StatusScope, StatusSubscription};

/// A registered travis-go detector.
///
/// Owns the diagnostics forwarder; the code action and status entry points
/// share its pipeline. Dropping the check stops forwarding,
/// [`TravisGoCheck::unregister`] also waits for the sink to be cleared.
pub struct TravisGoCheck<W> {
    config: TravisGoConfig,
    workspace: Arc<W>,
    reader: Arc<dyn DiagnosticsReader>,
    stream: SharedStream<DiagnosticSnapshot>,
    status: StatusProvider,
    diagnostics: SinkHandle,
}

impl<W: Workspace + 'static> TravisGoCheck<W> {
    /// Starts the pipeline and begins forwarding snapshots into `sink`.
    ///
    /// `reader` is the platform-wide view used by the fix-all action. It is
    /// usually the store `sink` writes into.
    pub fn register<S, K>(
        search: S,
        workspace: Arc<W>,
        reader: Arc<dyn DiagnosticsReader>,
        sink: K,
        config: TravisGoConfig,
    ) -> Self
    where
        S: TextSearch + 'static,
        K: DiagnosticSink + 'static,
    {
        let search = Arc::new(MemoizedSearch::with_ttl(search, config.search_cache_ttl()));
        let stream =
            DiagnosticPipeline::new(search, Arc::clone(&workspace), config.clone()).into_stream();
        let diagnostics = start_diagnostics(&stream, sink);

        tracing::info!(
            target_version = %config.target_version,
            max_results = config.max_results,
            "registered travis-go check"
        );

        Self {
            config,
            workspace,
            reader,
            status: StatusProvider::new(stream.clone()),
            stream,
            diagnostics,
        }
    }

    /// The shared snapshot stream. Subscribing does not re-run the search.
    pub fn snapshots(&self) -> &SharedStream<DiagnosticSnapshot> {
        &self.stream
    }

    pub async fn code_actions(&self, request: CodeActionRequest) -> Result<Vec<CodeAction>> {
        provide_code_actions(request, &*self.reader, &*self.workspace, &self.config).await
    }

    pub fn status(&self, scope: StatusScope) -> StatusSubscription {
        self.status.provide_status(scope)
    }

    /// Stops forwarding and clears the sink.
    pub async fn unregister(self) {
        self.diagnostics.shutdown().await;
        tracing::info!("unregistered travis-go check");
    }
}
