//! Text search gateway over local repository checkouts.
//!
//! A search root is either a git checkout itself, in which case it is the
//! only repository, or a directory whose immediate sub-directories are the
//! repositories. The repository pattern is matched against the repository
//! directory name and the file pattern against the `/`-separated path
//! relative to the repository.

use async_trait::async_trait;
use ci_check_core::{CheckError, FileMatch, Result, SearchQuery, TextSearch};
use regex::Regex;
use std::path::{Path, PathBuf};
use tower_lsp_server::ls_types::Uri;
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct FsTextSearch {
    roots: Vec<PathBuf>,
}

impl FsTextSearch {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }
}

#[async_trait]
impl TextSearch for FsTextSearch {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<FileMatch>> {
        let roots = self.roots.clone();
        let owned = query.clone();
        let matches = tokio::task::spawn_blocking(move || search_roots(&roots, &owned))
            .await
            .map_err(|e| CheckError::search_failed(&query.file_pattern, e.to_string()))??;

        tracing::debug!(
            pattern = %query.file_pattern,
            matches = matches.len(),
            "filesystem search finished"
        );
        Ok(matches)
    }
}

fn search_roots(roots: &[PathBuf], query: &SearchQuery) -> Result<Vec<FileMatch>> {
    let file_pattern = Regex::new(&query.file_pattern)?;
    let repo_pattern = Regex::new(&query.repo_pattern)?;
    let mut matches = Vec::new();

    if query.max_results == 0 {
        return Ok(matches);
    }

    for (name, repo) in repositories(roots) {
        if !repo_pattern.is_match(&name) {
            continue;
        }

        let walker = WalkDir::new(&repo)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git");

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("skipping unreadable entry in {:?}: {}", repo, e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(relative) = relative_path(&repo, entry.path()) else {
                continue;
            };
            if !file_pattern.is_match(&relative) {
                continue;
            }
            let Some(uri) = Uri::from_file_path(entry.path()) else {
                continue;
            };

            matches.push(FileMatch {
                uri,
                repository: name.clone(),
            });
            if matches.len() >= query.max_results {
                return Ok(matches);
            }
        }
    }

    Ok(matches)
}

/// Repositories under `roots` as `(name, path)`, sorted per root.
fn repositories(roots: &[PathBuf]) -> Vec<(String, PathBuf)> {
    let mut repos = Vec::new();

    for root in roots {
        if root.join(".git").exists() {
            repos.push((dir_name(root), root.clone()));
            continue;
        }

        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("cannot list search root {:?}: {}", root, e);
                continue;
            }
        };
        let mut children: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir() && p.file_name().is_some_and(|n| n != ".git"))
            .collect();
        children.sort();
        repos.extend(children.into_iter().map(|p| (dir_name(&p), p)));
    }

    repos
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn relative_path(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Some(parts.join("/"))
}
