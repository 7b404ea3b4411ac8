//! Conversion entry points for a single document.
//!
//! Every entry point ends in [`convert_blocking`], which binds pdfium,
//! builds the OCR engine and runs the format's driver synchronously. The
//! async functions move that call onto tokio's blocking pool because pdfium
//! is not async-safe and OCR is a long-running child process.

use crate::backend::ocr::OcrMyPdf;
use crate::backend::pdfium::PdfiumBackend;
use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::output::{ConversionOutput, SourceFormat};
use crate::pipeline::docx::run_docx_pipeline;
use crate::pipeline::input::{detect_format, display_name, load_input};
use crate::pipeline::pdf::run_pdf_pipeline;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Convert a PDF or DOCX file to Markdown.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Any [`ConvertError`]; the status callback's `on_document_error` fires
/// before the error is returned.
pub async fn convert(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let path = path.as_ref();
    let input = match load_input(path).await {
        Ok(input) => input,
        Err(e) => {
            report_error(config, &display_name(path), &e);
            return Err(e);
        }
    };
    run_on_blocking_pool(input.bytes, input.name, input.format, config).await
}

/// Convert document bytes held in memory.
///
/// `name` is used for format detection (extension) and in logs, callbacks
/// and the output's `source` field.
pub async fn convert_bytes(
    bytes: Vec<u8>,
    name: impl Into<String>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let name = name.into();
    let Some(format) = detect_format(&name, &bytes) else {
        let e = ConvertError::UnsupportedFormat {
            path: PathBuf::from(&name),
            magic: bytes.iter().take(4).copied().collect(),
        };
        report_error(config, &name, &e);
        return Err(e);
    };
    run_on_blocking_pool(bytes, name, format, config).await
}

/// Convert a document and write the Markdown to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let output = convert(path, config).await?;
    write_markdown(output_path.as_ref(), &output.markdown).await?;
    Ok(output)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(path, config))
}

/// Write Markdown atomically, creating parent directories as needed.
pub async fn write_markdown(path: &Path, markdown: &str) -> Result<(), ConvertError> {
    let write_err = |source| ConvertError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Run one document through its driver on the current thread.
///
/// pdfium is bound per document, as each call may come from a different
/// blocking-pool thread.
pub fn convert_blocking(
    bytes: &[u8],
    name: &str,
    format: SourceFormat,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    match format {
        SourceFormat::Pdf => {
            let backend = PdfiumBackend::bind(name, config.password.clone())?;
            let ocr = OcrMyPdf::new(&config.ocr);
            run_pdf_pipeline(&backend, &ocr, bytes, name, config)
        }
        SourceFormat::Docx => run_docx_pipeline(bytes, name, config),
    }
}

async fn run_on_blocking_pool(
    bytes: Vec<u8>,
    name: String,
    format: SourceFormat,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let cfg = config.clone();
    let task_name = name.clone();
    let result = tokio::task::spawn_blocking(move || {
        convert_blocking(&bytes, &task_name, format, &cfg)
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("Conversion task panicked: {}", e)))
    .and_then(|r| r);

    if let Err(ref e) = result {
        report_error(config, &name, e);
    }
    result
}

fn report_error(config: &ConversionConfig, name: &str, error: &ConvertError) {
    warn!("{}: {}", name, error);
    if let Some(ref cb) = config.status_callback {
        cb.on_document_error(name, &error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsupported_bytes_are_rejected_before_any_backend() {
        let err = convert_bytes(b"just text".to_vec(), "notes.txt", &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn write_markdown_is_atomic_and_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.md");
        write_markdown(&path, "# Title\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Title\n");
        assert!(!path.with_extension("md.tmp").exists());
    }

    #[tokio::test]
    async fn missing_file_reports_through_callback() {
        use crate::progress::ConversionStatusCallback;
        use std::sync::{Arc, Mutex};

        #[derive(Default)]
        struct Errors(Mutex<Vec<String>>);
        impl ConversionStatusCallback for Errors {
            fn on_document_error(&self, name: &str, _error: &str) {
                self.0.lock().unwrap().push(name.to_string());
            }
        }

        let errors = Arc::new(Errors::default());
        let config = ConversionConfig::builder()
            .status_callback(errors.clone())
            .build()
            .unwrap();
        let err = convert("/no/such/dir/missing.pdf", &config).await.unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound { .. }));
        assert_eq!(*errors.0.lock().unwrap(), vec!["missing.pdf".to_string()]);
    }
}
