//! Ordered multi-file workspace edits.

use indexmap::IndexMap;
use std::collections::HashMap;
use tower_lsp_server::ls_types::{self, Position, Range, TextEdit, Uri};

/// A file-keyed collection of text insertions.
///
/// Files keep the order in which they were first touched and edits within a
/// file keep insertion order. The edit's user-facing size is the number of
/// distinct files it touches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceEdit {
    changes: IndexMap<Uri, Vec<TextEdit>>,
}

impl WorkspaceEdit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an insertion of `text` at `position` in `uri`.
    pub fn insert(&mut self, uri: Uri, position: Position, text: impl Into<String>) {
        self.changes.entry(uri).or_default().push(TextEdit {
            range: Range::new(position, position),
            new_text: text.into(),
        });
    }

    /// Number of distinct files touched.
    pub fn files_touched(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Per-file edit lists, in first-touched order.
    pub fn text_edits(&self) -> impl Iterator<Item = (&Uri, &[TextEdit])> {
        self.changes.iter().map(|(uri, edits)| (uri, edits.as_slice()))
    }

    pub fn edits_for(&self, uri: &Uri) -> &[TextEdit] {
        self.changes.get(uri).map_or(&[], Vec::as_slice)
    }

    /// Converts into the LSP wire representation.
    pub fn into_lsp(self) -> ls_types::WorkspaceEdit {
        let changes: HashMap<Uri, Vec<TextEdit>> = self.changes.into_iter().collect();
        ls_types::WorkspaceEdit {
            changes: Some(changes),
            ..Default::default()
        }
    }
}

/// Applies one file's edits to `text`.
///
/// Edit ranges refer to the original text. Edits starting at the same
/// position are applied in insertion order. Positions past the end of a line
/// or the document clamp to the nearest valid offset.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect();

    let offset_of = |pos: Position| -> usize {
        let Some(&start) = line_starts.get(pos.line as usize) else {
            return text.len();
        };
        let line_end = text[start..].find('\n').map_or(text.len(), |i| start + i);
        let mut units = 0u32;
        for (i, ch) in text[start..line_end].char_indices() {
            if units >= pos.character {
                return start + i;
            }
            units += ch.len_utf16() as u32;
        }
        line_end
    };

    let mut resolved: Vec<(usize, usize, usize, &str)> = edits
        .iter()
        .enumerate()
        .map(|(seq, edit)| {
            (
                offset_of(edit.range.start),
                offset_of(edit.range.end),
                seq,
                edit.new_text.as_str(),
            )
        })
        .collect();
    resolved.sort_by_key(|&(start, _, seq, _)| (start, seq));

    let mut out = String::with_capacity(text.len() + resolved.iter().map(|e| e.3.len()).sum::<usize>());
    let mut cursor = 0;
    for (start, end, _, new_text) in resolved {
        let start = start.max(cursor);
        out.push_str(&text[cursor..start]);
        out.push_str(new_text);
        cursor = end.max(start);
    }
    out.push_str(&text[cursor..]);
    out
}
