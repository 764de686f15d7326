//! Open-document overlay and disk fallback.

mod loader;

pub use loader::load_document_from_disk;

use dashmap::DashMap;
use tower_lsp_server::ls_types::Uri;

/// Text of documents currently open in the client.
///
/// Open documents take precedence over disk content. Nothing else is cached.
#[derive(Debug, Default)]
pub struct OpenDocuments {
    documents: DashMap<Uri, String>,
}

impl OpenDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the latest text of `uri`.
    pub fn update(&self, uri: Uri, text: String) {
        self.documents.insert(uri, text);
    }

    pub fn close(&self, uri: &Uri) {
        self.documents.remove(uri);
    }

    pub fn get(&self, uri: &Uri) -> Option<String> {
        self.documents.get(uri).map(|text| text.clone())
    }
}
