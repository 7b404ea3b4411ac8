//! Input loading: read a local document and decide which route it takes.
//!
//! ## Why sniff magic bytes?
//!
//! Upload handlers and shell globs hand us files with missing or misleading
//! extensions. A PDF always starts with `%PDF`; a DOCX is a ZIP container
//! (`PK\x03\x04`). Because every OOXML format (and plain `.zip`) shares that
//! signature, a ZIP only qualifies as DOCX when the extension agrees or the
//! container holds `word/document.xml`. Rejecting anything else up front
//! gives callers a clear [`ConvertError::UnsupportedFormat`] instead of a
//! backend crash.

use crate::error::ConvertError;
use crate::output::SourceFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// A document read fully into memory.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub path: PathBuf,
    /// Display name used in logs, callbacks and batch reports.
    pub name: String,
    pub format: SourceFormat,
    pub bytes: Vec<u8>,
}

fn zip_has_word_document(bytes: &[u8]) -> bool {
    zip::ZipArchive::new(Cursor::new(bytes))
        .map(|archive| archive.file_names().any(|n| n == "word/document.xml"))
        .unwrap_or(false)
}

/// Classify document bytes as PDF or DOCX.
///
/// `name` is only consulted for its extension.
pub fn detect_format(name: &str, bytes: &[u8]) -> Option<SourceFormat> {
    if bytes.starts_with(PDF_MAGIC) {
        return Some(SourceFormat::Pdf);
    }
    if bytes.starts_with(ZIP_MAGIC) {
        let ext_is_docx = Path::new(name)
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
        if ext_is_docx || zip_has_word_document(bytes) {
            return Some(SourceFormat::Docx);
        }
    }
    None
}

/// Display name for a path: its file name, or the whole path as a fallback.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read a local file and classify it.
pub async fn load_input(path: &Path) -> Result<LoadedInput, ConvertError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ConvertError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let name = display_name(path);
    let format = detect_format(&name, &bytes).ok_or_else(|| ConvertError::UnsupportedFormat {
        path: path.to_path_buf(),
        magic: bytes.iter().take(4).copied().collect(),
    })?;

    debug!("Loaded {} ({}, {} bytes)", path.display(), format.as_str(), bytes.len());
    Ok(LoadedInput {
        path: path.to_path_buf(),
        name,
        format,
        bytes,
    })
}
