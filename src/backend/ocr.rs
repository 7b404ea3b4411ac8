//! OCR via the `ocrmypdf` command-line tool.
//!
//! ## Why a child process?
//!
//! OCRmyPDF wraps Tesseract, deskews, and writes a PDF with an invisible
//! text layer over the original scan, which is exactly the input shape the
//! span pipeline expects. Running it out of process keeps its Python and
//! Tesseract dependencies out of this crate; the price is that a missing
//! installation only shows up at run time, hence the dedicated error with
//! remediation text.
//!
//! Exit codes (from the OCRmyPDF documentation):
//!
//! | Code | Meaning | Outcome |
//! |------|---------|---------|
//! | 0 | success | [`OcrOutcome::Applied`] |
//! | 3 | missing dependency (Tesseract, Ghostscript, language pack) | [`ConvertError::OcrDependencyMissing`] |
//! | 6 | page already has text | [`OcrOutcome::AlreadyHasText`] |
//! | other | failure | [`ConvertError::OcrFailed`] with stderr |
//!
//! No timeout is enforced; callers needing bounded latency wrap the whole
//! conversion.

use crate::backend::{OcrEngine, OcrOutcome};
use crate::config::OcrConfig;
use crate::error::ConvertError;
use std::process::Command;
use tracing::{debug, info};

const EXIT_MISSING_DEPENDENCY: i32 = 3;
const EXIT_ALREADY_DONE_OCR: i32 = 6;

/// What an `ocrmypdf` exit status means for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitClass {
    Success,
    AlreadyHasText,
    MissingDependency,
    Failed,
}

/// Classify an exit code (`None` = killed by a signal).
pub fn classify_exit(code: Option<i32>) -> ExitClass {
    match code {
        Some(0) => ExitClass::Success,
        Some(EXIT_ALREADY_DONE_OCR) => ExitClass::AlreadyHasText,
        Some(EXIT_MISSING_DEPENDENCY) => ExitClass::MissingDependency,
        _ => ExitClass::Failed,
    }
}

/// OCR engine backed by the `ocrmypdf` executable.
#[derive(Debug, Clone)]
pub struct OcrMyPdf {
    command: String,
    languages: String,
    extra_args: Vec<String>,
}

impl OcrMyPdf {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            languages: config.languages.clone(),
            extra_args: config.extra_args.clone(),
        }
    }
}

impl OcrEngine for OcrMyPdf {
    fn ocr(&self, pdf: &[u8]) -> Result<OcrOutcome, ConvertError> {
        let dir = tempfile::tempdir()
            .map_err(|e| ConvertError::Internal(format!("cannot create temp dir: {e}")))?;
        let input = dir.path().join("input.pdf");
        let output = dir.path().join("output.pdf");
        std::fs::write(&input, pdf)
            .map_err(|e| ConvertError::Internal(format!("cannot write OCR input: {e}")))?;

        info!("Running {} (languages: {})", self.command, self.languages);
        let result = Command::new(&self.command)
            .arg("-l")
            .arg(&self.languages)
            .args(&self.extra_args)
            .arg(&input)
            .arg(&output)
            .output();

        let out = match result {
            Ok(out) => out,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConvertError::OcrDependencyMissing {
                    command: self.command.clone(),
                    detail: e.to_string(),
                });
            }
            Err(e) => {
                return Err(ConvertError::OcrFailed {
                    code: None,
                    stderr: e.to_string(),
                })
            }
        };

        let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
        debug!(code = ?out.status.code(), "ocrmypdf finished");

        match classify_exit(out.status.code()) {
            ExitClass::Success => {
                let bytes = std::fs::read(&output)
                    .map_err(|e| ConvertError::Internal(format!("cannot read OCR output: {e}")))?;
                Ok(OcrOutcome::Applied(bytes))
            }
            ExitClass::AlreadyHasText => Ok(OcrOutcome::AlreadyHasText),
            ExitClass::MissingDependency => Err(ConvertError::OcrDependencyMissing {
                command: self.command.clone(),
                detail: stderr,
            }),
            ExitClass::Failed => Err(ConvertError::OcrFailed {
                code: out.status.code(),
                stderr,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(classify_exit(Some(0)), ExitClass::Success);
        assert_eq!(classify_exit(Some(6)), ExitClass::AlreadyHasText);
        assert_eq!(classify_exit(Some(3)), ExitClass::MissingDependency);
        assert_eq!(classify_exit(Some(2)), ExitClass::Failed);
        assert_eq!(classify_exit(None), ExitClass::Failed);
    }

    #[test]
    fn missing_binary_is_a_dependency_error() {
        let engine = OcrMyPdf::new(&OcrConfig {
            command: "docmd-no-such-ocr-binary".into(),
            ..OcrConfig::default()
        });
        let err = engine.ocr(b"%PDF-1.4").unwrap_err();
        assert!(
            matches!(err, ConvertError::OcrDependencyMissing { ref command, .. } if command == "docmd-no-such-ocr-binary"),
            "got: {err:?}"
        );
    }
}
