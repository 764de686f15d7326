//! Fakes for the text search gateway and the workspace accessor.

use async_trait::async_trait;
use ci_check_core::{
    CheckError, FileMatch, Result, Root, RootScope, SearchQuery, TextDocument, TextSearch,
    Workspace,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tower_lsp_server::ls_types::Uri;

pub fn uri(path: &str) -> Uri {
    Uri::from_file_path(path).unwrap()
}

pub fn travis_uri(repo: &str) -> Uri {
    uri(&format!("/repos/{repo}/.travis.yml"))
}

/// Search gateway returning a fixed list of matches.
pub struct FakeSearch {
    pub matches: Vec<FileMatch>,
    pub calls: AtomicUsize,
    pub fail: bool,
    /// When set, every call waits for one permit.
    pub gate: Option<Arc<Semaphore>>,
}

impl FakeSearch {
    pub fn new(repos: &[&str]) -> Self {
        Self {
            matches: repos
                .iter()
                .map(|repo| FileMatch {
                    uri: travis_uri(repo),
                    repository: (*repo).to_string(),
                })
                .collect(),
            calls: AtomicUsize::new(0),
            fail: false,
            gate: None,
        }
    }

    pub fn failing() -> Self {
        let mut search = Self::new(&[]);
        search.fail = true;
        search
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextSearch for FakeSearch {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<FileMatch>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| CheckError::search_failed(&query.file_pattern, "gate closed"))?
                .forget();
        }
        if self.fail {
            return Err(CheckError::search_failed(&query.file_pattern, "index unavailable"));
        }
        Ok(self.matches.iter().take(query.max_results).cloned().collect())
    }
}

/// Workspace backed by an in-memory file map.
pub struct FakeWorkspace {
    pub scope: RootScope,
    pub files: Mutex<HashMap<Uri, String>>,
    pub fetches: AtomicUsize,
    /// When set, every fetch waits for one permit.
    pub gate: Option<Arc<Semaphore>>,
}

impl FakeWorkspace {
    pub fn new() -> Self {
        Self {
            scope: RootScope::default(),
            files: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn with_file(self, uri: Uri, text: &str) -> Self {
        self.files.lock().unwrap().insert(uri, text.to_string());
        self
    }

    pub fn set_file(&self, uri: Uri, text: &str) {
        self.files.lock().unwrap().insert(uri, text.to_string());
    }

    pub fn set_roots(&self, paths: &[&str]) {
        self.scope
            .set(paths.iter().map(|p| Root::new(uri(p))).collect());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Workspace for FakeWorkspace {
    fn roots(&self) -> watch::Receiver<Vec<Root>> {
        self.scope.subscribe()
    }

    async fn open_document(&self, uri: &Uri) -> Result<TextDocument> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| CheckError::fetch_failed(uri.as_str(), "gate closed"))?
                .forget();
        }
        let text = self
            .files
            .lock()
            .unwrap()
            .get(uri)
            .cloned()
            .ok_or_else(|| CheckError::fetch_failed(uri.as_str(), "no such file"))?;
        Ok(TextDocument::new(uri.clone(), text))
    }
}

/// Polls `condition` until it holds, failing the test after one second.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}

pub const LEGACY_GO: &str = "language: go\ngo:\n  - \"1.12.x\"\n";
pub const NO_GO_BLOCK: &str = "language: go\nscript: make test\n";
pub const CURRENT_GO: &str = "language: go\ngo:\n  - \"1.13.x\"\n";
pub const NOT_GO: &str = "language: rust\nrust:\n  - stable\n";
