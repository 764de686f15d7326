//! Fix engine for outdated Go versions in `.travis.yml`.

use ci_check_core::{
    CheckError, DiagnosticsReader, Result, TextDocument, Workspace, WorkspaceEdit,
    diagnostic_code, find_first_match, has_code,
};
use tower_lsp_server::ls_types::Diagnostic;

use crate::config::{GO_VERSIONS_PATTERN, TRAVIS_GO_CODE, TravisGoConfig};

/// Accumulates the fix for `diag` in `doc` into `edit`.
///
/// The fix is derived from the document text alone:
///
/// - text already mentions the target version: nothing is added
/// - a `go:` line exists: the target entry goes right after the first one
/// - otherwise: a new `go:` block is appended at the end of the document
///
/// Re-running on the fixed text therefore yields no further edits.
///
/// # Errors
///
/// Returns [`CheckError::CodeMismatch`] if `diag` was not produced by this
/// detector.
pub fn compute_fix_edit(
    diag: &Diagnostic,
    doc: &TextDocument,
    config: &TravisGoConfig,
    edit: &mut WorkspaceEdit,
) -> Result<()> {
    if !has_code(diag, TRAVIS_GO_CODE) {
        return Err(CheckError::CodeMismatch {
            expected: TRAVIS_GO_CODE.to_string(),
            found: diagnostic_code(diag).map(String::from),
        });
    }

    if doc.text.contains(config.target_version.as_str()) {
        return Ok(());
    }

    match find_first_match(&doc.text, &GO_VERSIONS_PATTERN) {
        Some(range) => edit.insert(doc.uri.clone(), range.end, config.version_entry()),
        None => edit.insert(doc.uri.clone(), doc.end_position(), config.version_block()),
    }
    Ok(())
}

/// Fix for a single diagnostic as a fresh edit.
pub fn fix_edit(
    diag: &Diagnostic,
    doc: &TextDocument,
    config: &TravisGoConfig,
) -> Result<WorkspaceEdit> {
    let mut edit = WorkspaceEdit::new();
    compute_fix_edit(diag, doc, config, &mut edit)?;
    Ok(edit)
}

/// Aggregate fix over every flagged file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixAll {
    pub edit: WorkspaceEdit,
    /// Every diagnostic carrying the detector's code at call time.
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds one edit fixing every file the diagnostics store currently flags.
///
/// This is a point-in-time view: diagnostics published after the call are
/// not included. Every flagged file is fetched again. Each file contributes
/// at most one fix, computed from its first flagged diagnostic.
pub async fn compute_fix_all<R, W>(
    reader: &R,
    workspace: &W,
    config: &TravisGoConfig,
) -> Result<FixAll>
where
    R: DiagnosticsReader + ?Sized,
    W: Workspace + ?Sized,
{
    let flagged = reader.diagnostics_with_code(TRAVIS_GO_CODE);
    let mut edit = WorkspaceEdit::new();

    for (uri, diags) in &flagged {
        let Some(first) = diags.first() else {
            continue;
        };
        let doc = workspace.open_document(uri).await?;
        compute_fix_edit(first, &doc, config, &mut edit)?;
    }

    tracing::debug!(
        flagged = flagged.len(),
        files = edit.files_touched(),
        "computed travis-go fix-all"
    );

    Ok(FixAll {
        edit,
        diagnostics: flagged.into_iter().flat_map(|(_, diags)| diags).collect(),
    })
}
