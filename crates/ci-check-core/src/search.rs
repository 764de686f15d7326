//! Text search gateway abstraction and call memoization.
//!
//! Searches across every indexed repository are expensive, so callers wrap
//! the gateway in [`MemoizedSearch`]. Identical queries issued concurrently
//! share one in-flight call, and a completed result is reused until its
//! time-to-live expires. Failures are never cached.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

use crate::document::FileMatch;
use crate::error::Result;

/// Default lifetime of a memoized search result.
pub const DEFAULT_SEARCH_TTL: Duration = Duration::from_secs(30);

/// Parameters of one search call. Also the memoization key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    /// Regular expression matched against file paths.
    pub file_pattern: String,
    /// Regular expression matched against repository names.
    pub repo_pattern: String,
    /// Upper bound on the number of returned matches.
    pub max_results: usize,
}

impl SearchQuery {
    pub fn new(
        file_pattern: impl Into<String>,
        repo_pattern: impl Into<String>,
        max_results: usize,
    ) -> Self {
        Self {
            file_pattern: file_pattern.into(),
            repo_pattern: repo_pattern.into(),
            max_results,
        }
    }
}

/// Text search gateway across every repository the platform indexes.
#[async_trait]
pub trait TextSearch: Send + Sync {
    /// Returns files whose path matches `query.file_pattern` inside
    /// repositories whose name matches `query.repo_pattern`, at most
    /// `query.max_results` of them.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<FileMatch>>;
}

#[async_trait]
impl<T: TextSearch + ?Sized> TextSearch for Arc<T> {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<FileMatch>> {
        (**self).search(query).await
    }
}

struct CacheEntry {
    cell: OnceCell<Arc<Vec<FileMatch>>>,
    created: Instant,
}

impl CacheEntry {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            cell: OnceCell::new(),
            created: Instant::now(),
        })
    }

    /// In-flight entries are always reusable; settled ones until their TTL.
    fn is_fresh(&self, ttl: Duration) -> bool {
        !self.cell.initialized() || self.created.elapsed() < ttl
    }
}

/// Memoizing wrapper around a [`TextSearch`] gateway.
pub struct MemoizedSearch<S> {
    inner: S,
    ttl: Duration,
    entries: DashMap<SearchQuery, Arc<CacheEntry>>,
}

impl<S: TextSearch> MemoizedSearch<S> {
    pub fn new(inner: S) -> Self {
        Self::with_ttl(inner, DEFAULT_SEARCH_TTL)
    }

    pub fn with_ttl(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Runs `query`, reusing an in-flight or recently completed result for
    /// the exact same query.
    pub async fn search(&self, query: &SearchQuery) -> Result<Arc<Vec<FileMatch>>> {
        let entry = {
            let mut slot = self
                .entries
                .entry(query.clone())
                .or_insert_with(CacheEntry::new);
            if !slot.is_fresh(self.ttl) {
                tracing::debug!(?query, "memoized search result expired");
                *slot = CacheEntry::new();
            }
            Arc::clone(slot.value())
        };

        let result = entry
            .cell
            .get_or_try_init(|| async {
                tracing::debug!(?query, "running text search");
                self.inner.search(query).await.map(Arc::new)
            })
            .await;

        match result {
            Ok(matches) => Ok(Arc::clone(matches)),
            Err(e) => {
                // Drop the failed entry so the next caller retries, unless a
                // newer entry already replaced it.
                self.entries
                    .remove_if(query, |_, current| Arc::ptr_eq(current, &entry));
                Err(e)
            }
        }
    }
}
