//! # docmd
//!
//! Convert PDF and DOCX documents to clean, faithful Markdown.
//!
//! ## Why this crate?
//!
//! Text extracted from PDFs is littered with artefacts: sentences broken at
//! every physical line, page numbers and running headers in the middle of
//! paragraphs, handwritten margin notes, and (for scans) lines of OCR noise.
//! This crate reconstructs the document from positioned text spans and runs
//! a fixed sequence of deterministic cleanup stages over the Markdown, so the
//! result reads like the source document rather than like its layout.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Probe    does the text layer cover enough pages? if not, OCR it
//!  ├─ 2. Profile  dominant font, OCR-document detection
//!  ├─ 3. Redact   handwritten margin annotations (span classifier)
//!  ├─ 4. Extract  spans → Markdown (headings, bold, lists, code)
//!  ├─ 5. Clean    OCR garbage, page furniture, heading bold
//!  └─ 6. Merge    re-join lines broken by the layout
//!
//! DOCX ── HTML ── Markdown ── table header repair
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docmd::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("contract.pdf", &config).await?;
//!     println!("{}", output.markdown);
//!     eprintln!(
//!         "removed {} furniture lines, redacted {} annotations",
//!         output.report.furniture_lines_removed, output.report.redacted_spans
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docmd` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docmd = { version = "0.3", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! | Need | For |
//! |------|-----|
//! | pdfium shared library (`PDFIUM_LIB_PATH`, working dir, or system) | every PDF |
//! | `ocrmypdf` + Tesseract language packs | scanned PDFs only (`--no-ocr` skips) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{convert_batch, BatchStream};
pub use config::{
    CleanupConfig, ConversionConfig, ConversionConfigBuilder, GarbageThresholds, OcrConfig,
    PageSelection,
};
pub use convert::{convert, convert_bytes, convert_sync, convert_to_file};
pub use error::{ConvertError, DocumentFailure};
pub use output::{BatchSummary, CleanupReport, ConversionOutput, SourceFormat};
pub use progress::{ConversionStatusCallback, NoopStatusCallback, StatusCallback};
