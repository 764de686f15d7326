//! Diagnostic pipeline for Travis CI configurations.
//!
//! Recomputes the full diagnostic snapshot on start-up and every time the
//! workspace root set changes:
//!
//! 1. A non-empty root set means the workspace is scoped (e.g. a comparison
//!    view). The check only runs workspace-wide, so an empty snapshot is
//!    published without searching.
//! 2. Otherwise one memoized search finds every `.travis.yml`.
//! 3. Each match is fetched and scanned; at most one diagnostic per file.
//! 4. The per-file results are joined. A single failed fetch fails the batch.
//!
//! A root change while a batch is in flight supersedes it: the batch future
//! is dropped mid-flight, so its result is never published.

use ci_check_core::{
    DiagnosticSnapshot, FileDiagnostics, MemoizedSearch, Publisher, Result, Root, SearchQuery,
    SharedStream, TextSearch, Workspace, find_first_match,
};
use futures::FutureExt;
use futures::future::try_join_all;
use std::sync::Arc;
use tokio::sync::watch;
use tower_lsp_server::ls_types::{Diagnostic, NumberOrString, Uri};

use crate::config::{
    DIAGNOSTIC_MESSAGE, DIAGNOSTIC_SOURCE, LEGACY_GO_PATTERN, TRAVIS_FILE_PATTERN,
    TRAVIS_GO_CODE, TravisGoConfig,
};

/// Scans `text` for a legacy Go declaration.
///
/// Only the first matching line is reported, even if the pattern recurs.
pub fn diagnose(text: &str, config: &TravisGoConfig) -> Vec<Diagnostic> {
    find_first_match(text, &LEGACY_GO_PATTERN)
        .map(|range| Diagnostic {
            range,
            severity: Some(config.severity),
            code: Some(NumberOrString::String(TRAVIS_GO_CODE.to_string())),
            source: Some(DIAGNOSTIC_SOURCE.to_string()),
            message: DIAGNOSTIC_MESSAGE.to_string(),
            ..Default::default()
        })
        .into_iter()
        .collect()
}

pub struct DiagnosticPipeline<S, W> {
    search: Arc<MemoizedSearch<S>>,
    workspace: Arc<W>,
    config: TravisGoConfig,
}

impl<S, W> DiagnosticPipeline<S, W>
where
    S: TextSearch + 'static,
    W: Workspace + 'static,
{
    pub fn new(search: Arc<MemoizedSearch<S>>, workspace: Arc<W>, config: TravisGoConfig) -> Self {
        Self {
            search,
            workspace,
            config,
        }
    }

    /// Search issued for every workspace-wide batch.
    pub fn query(&self) -> SearchQuery {
        SearchQuery::new(
            TRAVIS_FILE_PATTERN,
            self.config.repo_include.clone(),
            self.config.max_results,
        )
    }

    /// Turns the pipeline into a shared snapshot stream.
    ///
    /// Nothing runs until the first subscription. All subscribers share one
    /// computation and see the latest snapshot immediately.
    pub fn into_stream(self) -> SharedStream<DiagnosticSnapshot> {
        let pipeline = Arc::new(self);
        SharedStream::new(move |publisher| Arc::clone(&pipeline).run(publisher).boxed())
    }

    async fn run(self: Arc<Self>, publisher: Publisher<DiagnosticSnapshot>) {
        let mut roots_rx = self.workspace.roots();

        loop {
            let roots = roots_rx.borrow_and_update().clone();

            tokio::select! {
                biased;
                () = publisher.cancelled() => return,
                () = next_root_change(&mut roots_rx) => {
                    tracing::debug!("root set changed, superseding in-flight batch");
                    continue;
                }
                result = self.compute(&roots) => match result {
                    Ok(snapshot) => {
                        tracing::info!(
                            files = snapshot.len(),
                            diagnostics = snapshot.diagnostic_count(),
                            "travis-go snapshot ready"
                        );
                        publisher.publish(snapshot);
                    }
                    Err(e) => {
                        tracing::error!("travis-go batch failed: {}", e);
                        publisher.fail(e);
                        return;
                    }
                },
            }

            tokio::select! {
                () = publisher.cancelled() => return,
                () = next_root_change(&mut roots_rx) => {}
            }
        }
    }

    async fn compute(&self, roots: &[Root]) -> Result<DiagnosticSnapshot> {
        if !roots.is_empty() {
            tracing::debug!(
                roots = roots.len(),
                "workspace is scoped to specific roots, skipping search"
            );
            return Ok(DiagnosticSnapshot::empty());
        }

        let matches = self.search.search(&self.query()).await?;
        tracing::debug!(files = matches.len(), "diagnosing matched files");

        let files = matches.iter().map(|m| self.diagnose_file(&m.uri));
        let entries = try_join_all(files).await?;

        Ok(DiagnosticSnapshot::new(entries))
    }

    async fn diagnose_file(&self, uri: &Uri) -> Result<FileDiagnostics> {
        let doc = self.workspace.open_document(uri).await?;
        Ok(FileDiagnostics::new(
            uri.clone(),
            diagnose(&doc.text, &self.config),
        ))
    }
}

/// Resolves on the next root change. Never resolves once the host dropped
/// its side of the channel.
async fn next_root_change(rx: &mut watch::Receiver<Vec<Root>>) {
    if rx.changed().await.is_err() {
        std::future::pending::<()>().await;
    }
}
