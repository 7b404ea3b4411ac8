//! Collaborator seams of the conversion pipeline.
//!
//! The cleanup stages in [`crate::pipeline`] are pure functions over spans
//! and Markdown. Everything that touches a binary document format or an
//! external process sits behind the traits below, so the document drivers
//! can be exercised against synthetic span lists without a PDF engine:
//!
//! | Trait | Concrete implementation |
//! |-------|-------------------------|
//! | [`SpanSource`] | [`pdfium::PdfiumBackend`] (text objects → spans) |
//! | [`Redactor`] | [`pdfium::PdfiumBackend`] (remove text objects, re-save) |
//! | [`MarkdownExtractor`] | [`pdfium::PdfiumBackend`] + [`layout::render_markdown`] |
//! | [`OcrEngine`] | [`ocr::OcrMyPdf`] (`ocrmypdf` child process) |
//!
//! The DOCX route needs no trait: [`docx`] turns the container into HTML
//! and then into Markdown in one synchronous call.

pub mod docx;
pub mod layout;
pub mod ocr;
pub mod pdfium;

use crate::error::ConvertError;
use crate::model::{Page, PageRedactions};

/// Options for one Markdown extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// 0-based pages to render; `None` renders every page.
    pub pages: Option<Vec<usize>>,
    /// Never infer code fences from monospace text. OCR text layers use a
    /// single placeholder font, so the inference would only misfire.
    pub suppress_code_fences: bool,
}

/// Result of an OCR request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrOutcome {
    /// A new PDF with an injected text layer.
    Applied(Vec<u8>),
    /// The tool found an existing text layer; use the original bytes.
    AlreadyHasText,
}

/// Yields pages of positioned, font-tagged text spans.
pub trait SpanSource {
    fn extract_pages(&self, pdf: &[u8]) -> Result<Vec<Page>, ConvertError>;
}

/// Removes content inside the given boxes and returns the new document bytes.
pub trait Redactor {
    fn apply_redactions(
        &self,
        pdf: &[u8],
        redactions: &[PageRedactions],
    ) -> Result<Vec<u8>, ConvertError>;
}

/// Produces Markdown with one physical line per Markdown line (separated by
/// two newlines) and paragraph breaks as three or more newlines.
pub trait MarkdownExtractor {
    fn extract_markdown(&self, pdf: &[u8], opts: &ExtractOptions) -> Result<String, ConvertError>;
}

/// Injects a text layer into a scanned PDF.
pub trait OcrEngine {
    fn ocr(&self, pdf: &[u8]) -> Result<OcrOutcome, ConvertError>;
}

/// Everything the PDF driver needs from a document engine.
pub trait PdfBackend: SpanSource + Redactor + MarkdownExtractor {}

impl<T: SpanSource + Redactor + MarkdownExtractor> PdfBackend for T {}
