//! Error types for the docmd library.
//!
//! Two distinct types reflect two distinct failure scopes:
//!
//! * [`ConvertError`]: **Fatal for one document**: the file cannot be read,
//!   is not a supported format, needs a password, or the OCR tool is missing.
//!   Returned as `Err(ConvertError)` from the `convert*` functions.
//!
//! * [`DocumentFailure`]: **Non-fatal for a batch**: a serialisable record
//!   of one file's failure. The batch driver keeps going and reports every
//!   file independently.
//!
//! Cleanup stages themselves are total functions over text and never fail;
//! every variant below originates in I/O, a backend, or configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docmd library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file is neither a PDF nor a DOCX.
    #[error("Unsupported format for '{path}': first bytes {magic:?}\nOnly .pdf and .docx files are accepted.")]
    UnsupportedFormat { path: PathBuf, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{name}' is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the working directory.\n\
  • Install pdfium system-wide so the loader can find it.\n"
    )]
    PdfiumBindingFailed(String),

    // ── DOCX errors ───────────────────────────────────────────────────────
    /// The DOCX container or its main document part could not be read.
    #[error("DOCX '{name}' is corrupt: {detail}")]
    CorruptDocx { name: String, detail: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The OCR tool (or one of its own dependencies) is not installed.
    #[error(
        "OCR tool '{command}' is not available: {detail}\n\n\
Scanned PDFs need OCRmyPDF and Tesseract with the configured language packs:\n\
  • Debian/Ubuntu: apt install ocrmypdf tesseract-ocr-pol tesseract-ocr-eng\n\
  • macOS:         brew install ocrmypdf tesseract-lang\n\
Or skip OCR with --no-ocr.\n"
    )]
    OcrDependencyMissing { command: String, detail: String },

    /// The OCR process ran but exited with an error.
    #[error("OCR failed (exit code {code:?}): {stderr}")]
    OcrFailed { code: Option<i32>, stderr: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// One file's failure inside a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFailure {
    /// Path or display name of the failed document.
    pub source: String,
    /// Rendered [`ConvertError`] message.
    pub error: String,
}

impl DocumentFailure {
    pub fn new(source: impl Into<String>, error: &ConvertError) -> Self {
        Self {
            source: source.into(),
            error: error.to_string(),
        }
    }
}

impl fmt::Display for DocumentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocr_missing_display_has_remediation() {
        let e = ConvertError::OcrDependencyMissing {
            command: "ocrmypdf".into(),
            detail: "No such file or directory".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("ocrmypdf"), "got: {msg}");
        assert!(msg.contains("--no-ocr"), "got: {msg}");
    }

    #[test]
    fn ocr_failed_display() {
        let e = ConvertError::OcrFailed {
            code: Some(2),
            stderr: "bad input".into(),
        };
        assert!(e.to_string().contains("Some(2)"));
        assert!(e.to_string().contains("bad input"));
    }

    #[test]
    fn document_failure_serialises() {
        let failure = DocumentFailure::new(
            "scan.pdf",
            &ConvertError::PasswordRequired {
                name: "scan.pdf".into(),
            },
        );
        let json = serde_json::to_string(&failure).unwrap();
        assert!(json.contains("\"source\":\"scan.pdf\""));
        assert!(json.contains("encrypted"));
    }
}
