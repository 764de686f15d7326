//! Diagnostic snapshots, the sink they are pushed into, and the
//! platform-wide store the sink is backed by.

use async_trait::async_trait;
use dashmap::DashMap;
use indexmap::IndexMap;
use std::sync::Arc;
use tower_lsp_server::ls_types::{Diagnostic, NumberOrString, Uri};

use crate::error::CheckError;

/// Diagnostics reported for a single file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDiagnostics {
    pub uri: Uri,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileDiagnostics {
    pub fn new(uri: Uri, diagnostics: Vec<Diagnostic>) -> Self {
        Self { uri, diagnostics }
    }
}

/// Complete file → diagnostics state of one pipeline run.
///
/// A snapshot always replaces its predecessor wholesale. Cloning is cheap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosticSnapshot {
    entries: Arc<Vec<FileDiagnostics>>,
}

impl DiagnosticSnapshot {
    pub fn new(entries: Vec<FileDiagnostics>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileDiagnostics> {
        self.entries.iter()
    }

    /// Number of files in the snapshot, including files without diagnostics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn diagnostic_count(&self) -> usize {
        self.entries.iter().map(|f| f.diagnostics.len()).sum()
    }

    pub fn get(&self, uri: &Uri) -> Option<&[Diagnostic]> {
        self.entries
            .iter()
            .find(|f| &f.uri == uri)
            .map(|f| f.diagnostics.as_slice())
    }
}

impl FromIterator<FileDiagnostics> for DiagnosticSnapshot {
    fn from_iter<I: IntoIterator<Item = FileDiagnostics>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Returns the diagnostic's string code, if it has one.
pub fn diagnostic_code(diag: &Diagnostic) -> Option<&str> {
    match &diag.code {
        Some(NumberOrString::String(code)) => Some(code.as_str()),
        _ => None,
    }
}

/// Whether `diag` was produced by the detector identified by `code`.
///
/// Identity is the code alone, never the message text.
pub fn has_code(diag: &Diagnostic, code: &str) -> bool {
    diagnostic_code(diag) == Some(code)
}

/// Mutable diagnostics store a pipeline pushes its snapshots into.
#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    /// Replaces the sink's entire contents with `snapshot`.
    async fn replace(&self, snapshot: &DiagnosticSnapshot);

    /// Removes every entry this sink contributed.
    async fn clear(&self);

    /// Called once when the upstream pipeline fails.
    async fn report_failure(&self, error: &CheckError) {
        tracing::error!("diagnostic pipeline failed: {}", error);
    }
}

#[async_trait]
impl<T: DiagnosticSink + ?Sized> DiagnosticSink for Arc<T> {
    async fn replace(&self, snapshot: &DiagnosticSnapshot) {
        (**self).replace(snapshot).await;
    }

    async fn clear(&self) {
        (**self).clear().await;
    }

    async fn report_failure(&self, error: &CheckError) {
        (**self).report_failure(error).await;
    }
}

/// Read access to every diagnostic known to the platform.
pub trait DiagnosticsReader: Send + Sync {
    /// All non-empty per-file diagnostic lists, merged across collections.
    fn all_diagnostics(&self) -> Vec<(Uri, Vec<Diagnostic>)>;

    /// Only the diagnostics carrying `code`, grouped per file.
    fn diagnostics_with_code(&self, code: &str) -> Vec<(Uri, Vec<Diagnostic>)> {
        self.all_diagnostics()
            .into_iter()
            .filter_map(|(uri, diags)| {
                let matching: Vec<_> = diags.into_iter().filter(|d| has_code(d, code)).collect();
                (!matching.is_empty()).then_some((uri, matching))
            })
            .collect()
    }
}

impl<T: DiagnosticsReader + ?Sized> DiagnosticsReader for Arc<T> {
    fn all_diagnostics(&self) -> Vec<(Uri, Vec<Diagnostic>)> {
        (**self).all_diagnostics()
    }

    fn diagnostics_with_code(&self, code: &str) -> Vec<(Uri, Vec<Diagnostic>)> {
        (**self).diagnostics_with_code(code)
    }
}

type CollectionEntries = IndexMap<Uri, Vec<Diagnostic>>;

/// Platform-wide diagnostics store made of named collections.
///
/// Keeps a per-code index next to the collections so that code lookups do
/// not scan every diagnostic in the store.
#[derive(Debug, Default)]
pub struct DiagnosticStore {
    collections: DashMap<String, CollectionEntries>,
    by_code: DashMap<String, IndexMap<(String, Uri), Vec<Diagnostic>>>,
}

impl DiagnosticStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a sink handle scoped to the collection `name`.
    pub fn collection(self: &Arc<Self>, name: impl Into<String>) -> DiagnosticCollection {
        DiagnosticCollection {
            name: name.into(),
            store: Arc::clone(self),
        }
    }

    /// Replaces the contents of collection `name`.
    ///
    /// Returns the files that had entries before but are absent from the new
    /// snapshot.
    pub fn replace_collection(&self, name: &str, snapshot: &DiagnosticSnapshot) -> Vec<Uri> {
        let entries: CollectionEntries = snapshot
            .iter()
            .map(|f| (f.uri.clone(), f.diagnostics.clone()))
            .collect();

        self.reindex(name, &entries);
        let previous = self
            .collections
            .insert(name.to_string(), entries.clone())
            .unwrap_or_default();

        previous
            .into_keys()
            .filter(|uri| !entries.contains_key(uri))
            .collect()
    }

    /// Sets the diagnostics of one file within collection `name`.
    pub fn set_file(&self, name: &str, uri: Uri, diagnostics: Vec<Diagnostic>) {
        let entries = {
            let mut collection = self.collections.entry(name.to_string()).or_default();
            collection.insert(uri, diagnostics);
            collection.clone()
        };
        self.reindex(name, &entries);
    }

    /// Removes collection `name`, returning the files it had entries for.
    pub fn clear_collection(&self, name: &str) -> Vec<Uri> {
        self.reindex(name, &CollectionEntries::new());
        self.collections
            .remove(name)
            .map(|(_, entries)| entries.into_keys().collect())
            .unwrap_or_default()
    }

    /// Diagnostics of one collection, in insertion order.
    pub fn collection_entries(&self, name: &str) -> Vec<(Uri, Vec<Diagnostic>)> {
        self.collections
            .get(name)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(uri, diags)| (uri.clone(), diags.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn reindex(&self, name: &str, entries: &CollectionEntries) {
        for mut index in self.by_code.iter_mut() {
            index.retain(|(collection, _), _| collection != name);
        }
        self.by_code.retain(|_, index| !index.is_empty());

        for (uri, diags) in entries {
            for diag in diags {
                let Some(code) = diagnostic_code(diag) else {
                    continue;
                };
                self.by_code
                    .entry(code.to_string())
                    .or_default()
                    .entry((name.to_string(), uri.clone()))
                    .or_default()
                    .push(diag.clone());
            }
        }
    }
}

/// Merges per-file lists that share a URI, keeping first-seen order.
fn merge_by_uri(
    items: impl IntoIterator<Item = (Uri, Vec<Diagnostic>)>,
) -> Vec<(Uri, Vec<Diagnostic>)> {
    let mut merged: IndexMap<Uri, Vec<Diagnostic>> = IndexMap::new();
    for (uri, diags) in items {
        if diags.is_empty() {
            continue;
        }
        merged.entry(uri).or_default().extend(diags);
    }
    merged.into_iter().collect()
}

impl DiagnosticsReader for DiagnosticStore {
    fn all_diagnostics(&self) -> Vec<(Uri, Vec<Diagnostic>)> {
        let items: Vec<_> = self
            .collections
            .iter()
            .flat_map(|entries| {
                entries
                    .iter()
                    .map(|(uri, diags)| (uri.clone(), diags.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        merge_by_uri(items)
    }

    fn diagnostics_with_code(&self, code: &str) -> Vec<(Uri, Vec<Diagnostic>)> {
        let Some(index) = self.by_code.get(code) else {
            return Vec::new();
        };
        let items: Vec<_> = index
            .iter()
            .map(|((_, uri), diags)| (uri.clone(), diags.clone()))
            .collect();
        drop(index);
        merge_by_uri(items)
    }
}

/// Sink handle writing into one named collection of a [`DiagnosticStore`].
#[derive(Debug, Clone)]
pub struct DiagnosticCollection {
    name: String,
    store: Arc<DiagnosticStore>,
}

impl DiagnosticCollection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &Arc<DiagnosticStore> {
        &self.store
    }
}

#[async_trait]
impl DiagnosticSink for DiagnosticCollection {
    async fn replace(&self, snapshot: &DiagnosticSnapshot) {
        let removed = self.store.replace_collection(&self.name, snapshot);
        tracing::debug!(
            collection = %self.name,
            files = snapshot.len(),
            removed = removed.len(),
            "replaced diagnostics collection"
        );
    }

    async fn clear(&self) {
        self.store.clear_collection(&self.name);
    }
}
