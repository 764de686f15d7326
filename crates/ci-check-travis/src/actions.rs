//! Code actions offered on Travis CI Go diagnostics.

use ci_check_core::{DiagnosticsReader, Result, TextDocument, Workspace, has_code};
use serde_json::Value;
use tower_lsp_server::ls_types::{CodeAction, CodeActionKind, Command, Diagnostic, Position, Range};

use crate::config::{
    DOCS_TITLE, DOCS_URL, FIX_TITLE, OPEN_URL_COMMAND, TRAVIS_GO_CODE, TravisGoConfig,
    fix_all_title,
};
use crate::fix::{compute_fix_all, fix_edit};

/// A code action request as received from the host.
#[derive(Debug, Clone)]
pub struct CodeActionRequest {
    pub document: TextDocument,
    pub range: Range,
    /// Diagnostics the host attached to the request context.
    pub diagnostics: Vec<Diagnostic>,
    /// Actions contributed by other checks for the same request, appended
    /// after this detector's own actions.
    pub other_actions: Vec<CodeAction>,
}

impl CodeActionRequest {
    pub fn new(document: TextDocument, range: Range, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            document,
            range,
            diagnostics,
            other_actions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_other_actions(mut self, actions: Vec<CodeAction>) -> Self {
        self.other_actions = actions;
        self
    }

    /// First travis-go diagnostic overlapping the requested range.
    fn travis_diagnostic(&self) -> Option<&Diagnostic> {
        self.diagnostics
            .iter()
            .find(|d| has_code(d, TRAVIS_GO_CODE) && overlaps(d.range, self.range))
    }
}

fn key(pos: Position) -> (u32, u32) {
    (pos.line, pos.character)
}

fn overlaps(a: Range, b: Range) -> bool {
    key(a.start) <= key(b.end) && key(b.start) <= key(a.end)
}

/// Builds the actions for `request`.
///
/// Returns nothing unless a travis-go diagnostic sits at the requested
/// location. Otherwise, in order: the single-file fix, the fix-all action
/// when it spans more than one file, the docs link, and the other checks'
/// actions.
///
/// # Errors
///
/// Propagates failures to fetch flagged files for the fix-all action.
pub async fn provide_code_actions<R, W>(
    request: CodeActionRequest,
    reader: &R,
    workspace: &W,
    config: &TravisGoConfig,
) -> Result<Vec<CodeAction>>
where
    R: DiagnosticsReader + ?Sized,
    W: Workspace + ?Sized,
{
    let Some(diag) = request.travis_diagnostic().cloned() else {
        return Ok(Vec::new());
    };

    let fix = fix_edit(&diag, &request.document, config)?;
    let fix_all = compute_fix_all(reader, workspace, config).await?;
    let files = fix_all.edit.files_touched();

    let candidates = [
        Some(CodeAction {
            title: FIX_TITLE.to_string(),
            kind: Some(CodeActionKind::QUICKFIX),
            diagnostics: Some(vec![diag.clone()]),
            edit: Some(fix.into_lsp()),
            is_preferred: Some(true),
            ..Default::default()
        }),
        (files > 1).then(|| CodeAction {
            title: fix_all_title(files),
            kind: Some(CodeActionKind::QUICKFIX),
            diagnostics: Some(fix_all.diagnostics),
            edit: Some(fix_all.edit.into_lsp()),
            ..Default::default()
        }),
        Some(CodeAction {
            title: DOCS_TITLE.to_string(),
            command: Some(Command {
                title: DOCS_TITLE.to_string(),
                command: OPEN_URL_COMMAND.to_string(),
                arguments: Some(vec![Value::String(DOCS_URL.to_string())]),
            }),
            diagnostics: Some(vec![diag]),
            ..Default::default()
        }),
    ];

    let mut actions: Vec<CodeAction> = candidates.into_iter().flatten().collect();
    actions.extend(request.other_actions);
    Ok(actions)
}
