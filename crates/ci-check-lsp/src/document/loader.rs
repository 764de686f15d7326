//! Reads configuration files that are not open in the client.

use ci_check_core::{CheckError, Result};
use tower_lsp_server::ls_types::Uri;

/// CI configuration files larger than this are not read.
const MAX_FILE_SIZE: u64 = 1_000_000;

/// Loads document content from disk.
///
/// # Errors
///
/// - `CheckError::InvalidUri` - URI is not a file:// URI
/// - `CheckError::Io` - file missing, unreadable, not UTF-8 or too large
pub async fn load_document_from_disk(uri: &Uri) -> Result<String> {
    let Some(path) = uri.to_file_path() else {
        tracing::debug!("cannot load non-file URI: {:?}", uri);
        return Err(CheckError::InvalidUri(uri.as_str().to_string()));
    };

    let metadata = tokio::fs::metadata(&path).await?;
    if metadata.len() > MAX_FILE_SIZE {
        tracing::warn!(
            "skipping {:?}: {} bytes exceeds {} byte limit",
            path,
            metadata.len(),
            MAX_FILE_SIZE
        );
        return Err(CheckError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("file too large: {} bytes", metadata.len()),
        )));
    }

    let content = tokio::fs::read_to_string(&path).await?;
    tracing::trace!("loaded {:?} ({} bytes)", path, content.len());
    Ok(content)
}
