//! Workspace value types: roots, search matches, and text documents.

use tower_lsp_server::ls_types::{Position, Uri};

/// A repository currently in the active workspace scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Root {
    pub uri: Uri,
}

impl Root {
    pub fn new(uri: Uri) -> Self {
        Self { uri }
    }
}

/// A file returned by the text search gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMatch {
    pub uri: Uri,
    /// Name of the repository the file belongs to.
    pub repository: String,
}

/// Full text of a file, fetched on demand.
///
/// Documents are never cached by the core: every fix request re-fetches so
/// that edits are always computed against the latest content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    pub uri: Uri,
    pub text: String,
}

impl TextDocument {
    pub fn new(uri: Uri, text: impl Into<String>) -> Self {
        Self {
            uri,
            text: text.into(),
        }
    }

    /// Converts a byte offset into an LSP position.
    ///
    /// Offsets past the end of the text clamp to the end. Columns are counted
    /// in UTF-16 code units.
    pub fn position_at(&self, offset: usize) -> Position {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }

        let before = &self.text[..offset];
        let line = before.matches('\n').count();
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);

        Position::new(line as u32, utf16_len(&before[line_start..]))
    }

    /// Position just past the last character of the document.
    pub fn end_position(&self) -> Position {
        self.position_at(self.text.len())
    }
}

/// Length of `s` in UTF-16 code units.
pub fn utf16_len(s: &str) -> u32 {
    s.encode_utf16().count() as u32
}
