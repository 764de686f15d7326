//! Status summaries derived from diagnostic snapshots.

use ci_check_core::{
    DiagnosticSnapshot, FileDiagnostics, SharedError, SharedStream, Subscription, has_code,
};
use serde::{Deserialize, Serialize};
use tower_lsp_server::ls_types::{DiagnosticSeverity, Uri};

use crate::config::{STATUS_TITLE, TRAVIS_GO_CODE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
}

impl From<DiagnosticSeverity> for NotificationKind {
    fn from(severity: DiagnosticSeverity) -> Self {
        match severity {
            DiagnosticSeverity::ERROR => Self::Error,
            DiagnosticSeverity::WARNING => Self::Warning,
            _ => Self::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub title: String,
    pub notifications: Vec<Notification>,
}

/// Which part of the workspace a status request covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusScope {
    #[default]
    Global,
    /// Only files whose URI starts with this repository URI.
    Repository(Uri),
}

impl StatusScope {
    fn contains(&self, uri: &Uri) -> bool {
        match self {
            Self::Global => true,
            Self::Repository(root) => {
                let root = root.as_str().trim_end_matches('/');
                uri.as_str()
                    .strip_prefix(root)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            }
        }
    }
}

/// Projects `snapshot` into a status value.
///
/// Flagged files are counted per severity, most severe first. A clean
/// snapshot yields a single informational notification.
pub fn summarize(snapshot: &DiagnosticSnapshot, scope: &StatusScope) -> Status {
    let mut counts = [
        (NotificationKind::Error, 0usize),
        (NotificationKind::Warning, 0),
        (NotificationKind::Info, 0),
    ];

    for file in snapshot.iter().filter(|f| scope.contains(&f.uri)) {
        if let Some(kind) = file_kind(file) {
            for (k, count) in &mut counts {
                if *k == kind {
                    *count += 1;
                }
            }
        }
    }

    let mut notifications: Vec<Notification> = counts
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(kind, count)| Notification {
            title: format!(
                "Outdated Go version in {count} Travis CI configuration{}",
                if count == 1 { "" } else { "s" }
            ),
            kind,
        })
        .collect();

    if notifications.is_empty() {
        notifications.push(Notification {
            title: "No Travis CI configurations use an outdated Go version".to_string(),
            kind: NotificationKind::Info,
        });
    }

    Status {
        title: STATUS_TITLE.to_string(),
        notifications,
    }
}

/// Most severe kind among the file's travis-go diagnostics.
fn file_kind(file: &FileDiagnostics) -> Option<NotificationKind> {
    file.diagnostics
        .iter()
        .filter(|d| has_code(d, TRAVIS_GO_CODE))
        .map(|d| NotificationKind::from(d.severity.unwrap_or(DiagnosticSeverity::WARNING)))
        .min_by_key(|kind| match kind {
            NotificationKind::Error => 0,
            NotificationKind::Warning => 1,
            NotificationKind::Info => 2,
        })
}

/// Serves status values backed by the shared diagnostic stream.
#[derive(Clone)]
pub struct StatusProvider {
    stream: SharedStream<DiagnosticSnapshot>,
}

impl StatusProvider {
    pub fn new(stream: SharedStream<DiagnosticSnapshot>) -> Self {
        Self { stream }
    }

    /// Subscribes to status updates for `scope`.
    ///
    /// Re-projects on every snapshot; the subscription keeps the pipeline
    /// alive until dropped.
    pub fn provide_status(&self, scope: StatusScope) -> StatusSubscription {
        StatusSubscription {
            inner: self.stream.subscribe(),
            scope,
        }
    }
}

pub struct StatusSubscription {
    inner: Subscription<DiagnosticSnapshot>,
    scope: StatusScope,
}

impl StatusSubscription {
    pub async fn next(&mut self) -> Option<Result<Status, SharedError>> {
        let item = self.inner.next().await?;
        Some(item.map(|snapshot| summarize(&snapshot, &self.scope)))
    }

    /// Status for the latest snapshot, if one was published.
    pub fn latest(&self) -> Option<Status> {
        self.inner
            .latest()
            .map(|snapshot| summarize(&snapshot, &self.scope))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TravisGoConfig;
    use crate::pipeline::{DiagnosticPipeline, diagnose};
    use crate::test_utils::*;
    use ci_check_core::MemoizedSearch;
    use std::sync::Arc;

    fn file(repo: &str, text: &str, severity: DiagnosticSeverity) -> FileDiagnostics {
        let config = TravisGoConfig {
            severity,
            ..Default::default()
        };
        FileDiagnostics::new(travis_uri(repo), diagnose(text, &config))
    }

    #[test]
    fn test_clean_snapshot() {
        let status = summarize(&DiagnosticSnapshot::empty(), &StatusScope::Global);
        assert_eq!(status.title, STATUS_TITLE);
        assert_eq!(status.notifications.len(), 1);
        assert_eq!(status.notifications[0].kind, NotificationKind::Info);
    }

    #[test]
    fn test_counts_flagged_files() {
        let snapshot: DiagnosticSnapshot = [
            file("a", LEGACY_GO, DiagnosticSeverity::WARNING),
            file("b", LEGACY_GO, DiagnosticSeverity::WARNING),
            file("c", NOT_GO, DiagnosticSeverity::WARNING),
        ]
        .into_iter()
        .collect();

        let status = summarize(&snapshot, &StatusScope::Global);
        assert_eq!(
            status.notifications,
            vec![Notification {
                title: "Outdated Go version in 2 Travis CI configurations".into(),
                kind: NotificationKind::Warning,
            }]
        );
    }

    #[test]
    fn test_repository_scope() {
        let snapshot: DiagnosticSnapshot = [
            file("a", LEGACY_GO, DiagnosticSeverity::WARNING),
            file("ab", LEGACY_GO, DiagnosticSeverity::WARNING),
        ]
        .into_iter()
        .collect();

        let status = summarize(&snapshot, &StatusScope::Repository(uri("/repos/a")));
        assert_eq!(
            status.notifications[0].title,
            "Outdated Go version in 1 Travis CI configuration"
        );

        let status = summarize(&snapshot, &StatusScope::Repository(uri("/repos/zzz")));
        assert_eq!(status.notifications[0].kind, NotificationKind::Info);
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(
            NotificationKind::from(DiagnosticSeverity::ERROR),
            NotificationKind::Error
        );
        assert_eq!(
            NotificationKind::from(DiagnosticSeverity::HINT),
            NotificationKind::Info
        );
    }

    #[test]
    fn test_status_payload() {
        let snapshot: DiagnosticSnapshot = [
            file("a", LEGACY_GO, DiagnosticSeverity::ERROR),
            file("b", LEGACY_GO, DiagnosticSeverity::WARNING),
            file("c", NO_GO_BLOCK, DiagnosticSeverity::WARNING),
        ]
        .into_iter()
        .collect();

        let status = summarize(&snapshot, &StatusScope::Global);
        insta::assert_json_snapshot!("status_payload", status);
    }

    #[tokio::test]
    async fn test_provider_follows_snapshots() {
        let workspace = Arc::new(FakeWorkspace::new().with_file(travis_uri("a"), LEGACY_GO));
        let stream = DiagnosticPipeline::new(
            Arc::new(MemoizedSearch::new(FakeSearch::new(&["a"]))),
            Arc::clone(&workspace),
            TravisGoConfig::default(),
        )
        .into_stream();
        let provider = StatusProvider::new(stream);

        let mut statuses = provider.provide_status(StatusScope::Global);
        let first = statuses.next().await.unwrap().unwrap();
        assert_eq!(first.notifications[0].kind, NotificationKind::Warning);
        assert_eq!(statuses.latest(), Some(first));

        workspace.set_roots(&["/repos/a"]);
        let second = statuses.next().await.unwrap().unwrap();
        assert_eq!(second.notifications[0].kind, NotificationKind::Info);
    }

    #[tokio::test]
    async fn test_provider_surfaces_pipeline_failure() {
        let stream = DiagnosticPipeline::new(
            Arc::new(MemoizedSearch::new(FakeSearch::failing())),
            Arc::new(FakeWorkspace::new()),
            TravisGoConfig::default(),
        )
        .into_stream();

        let mut statuses = StatusProvider::new(stream).provide_status(StatusScope::Global);
        assert!(statuses.next().await.unwrap().is_err());
        assert!(statuses.next().await.is_none());
    }

    #[test]
    fn test_notification_serializes_type_field() {
        let json = serde_json::to_value(Notification {
            title: "x".into(),
            kind: NotificationKind::Error,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "title": "x", "type": "error" }));
    }
}
