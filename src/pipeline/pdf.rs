//! PDF route driver.
//!
//! ```text
//! bytes ─▶ spans ─▶ text-layer probe ─┬─▶ (OCR ─▶ spans again)
//!                                     ▼
//!          profile ─▶ recurring text ─▶ redaction targets ─▶ redact
//!                                     ▼
//!          Markdown extraction ─▶ cleanup stages ─▶ ConversionOutput
//! ```
//!
//! The driver is generic over the collaborators so it runs unchanged against
//! pdfium + ocrmypdf in production and against synthetic span lists in tests.
//! It is synchronous; [`crate::convert`] moves it onto a blocking thread.

use crate::backend::layout::merge_text_runs;
use crate::backend::{ExtractOptions, OcrEngine, OcrOutcome, PdfBackend, SpanSource};
use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::model::{Page, TextLayerStats};
use crate::output::{CleanupReport, ConversionOutput, SourceFormat};
use crate::pipeline::cleanup::clean_pdf_markdown;
use crate::pipeline::postprocess::ensure_final_newline;
use crate::pipeline::profile::profile_document;
use crate::pipeline::recurring::detect_recurring_text;
use crate::pipeline::spans::find_redaction_targets;
use std::borrow::Cow;
use std::time::Instant;
use tracing::{debug, info};

/// Spans for span analysis: backend fragments of one run joined back up.
fn extract_spans<S: SpanSource + ?Sized>(source: &S, pdf: &[u8]) -> Result<Vec<Page>, ConvertError> {
    Ok(source
        .extract_pages(pdf)?
        .into_iter()
        .map(|page| Page {
            spans: merge_text_runs(page.spans),
            ..page
        })
        .collect())
}

/// Convert one PDF held in memory.
pub fn run_pdf_pipeline<B, O>(
    backend: &B,
    ocr: &O,
    bytes: &[u8],
    name: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError>
where
    B: PdfBackend + ?Sized,
    O: OcrEngine + ?Sized,
{
    let start = Instant::now();
    let callback = config.status_callback.as_ref();
    if let Some(cb) = callback {
        cb.on_document_start(name);
    }
    info!("Converting PDF {}", name);

    // ── Text-layer probe and OCR ─────────────────────────────────────────
    let mut pdf: Cow<[u8]> = Cow::Borrowed(bytes);
    let mut pages = extract_spans(backend, &pdf)?;
    let layer = TextLayerStats::from_pages(&pages, config.ocr.min_text_chars_per_page);
    debug!(
        total = layer.total_pages,
        with_text = layer.pages_with_text,
        "text layer probe"
    );

    let mut ocr_applied = false;
    if config.ocr.enabled && layer.needs_ocr(config.ocr.min_text_page_ratio) {
        info!(
            "{}: {}/{} pages carry text, running OCR",
            name, layer.pages_with_text, layer.total_pages
        );
        if let Some(cb) = callback {
            cb.on_ocr_start(name);
        }
        match ocr.ocr(&pdf)? {
            OcrOutcome::Applied(new_pdf) => {
                pdf = Cow::Owned(new_pdf);
                pages = extract_spans(backend, &pdf)?;
                ocr_applied = true;
            }
            OcrOutcome::AlreadyHasText => {
                info!("{}: OCR tool reports an existing text layer", name);
            }
        }
        if let Some(cb) = callback {
            cb.on_ocr_complete(name, ocr_applied);
        }
    }

    // ── Span analysis ────────────────────────────────────────────────────
    let profile = profile_document(&pages, &config.cleanup);
    let recurring = detect_recurring_text(&pages, &config.cleanup);
    debug!(
        dominant_font = %profile.dominant_font,
        ocr_document = profile.is_ocr_document,
        recurring = recurring.len(),
        "document profile"
    );

    let mut redacted_spans = 0;
    if config.cleanup.redact_margin_annotations && !profile.is_ocr_document {
        let targets = find_redaction_targets(&pages, &profile, &config.cleanup);
        redacted_spans = targets.iter().map(|t| t.boxes.len()).sum();
        if redacted_spans > 0 {
            pdf = Cow::Owned(backend.apply_redactions(&pdf, &targets)?);
            info!(
                "{}: redacted {} margin annotations on {} pages",
                name,
                redacted_spans,
                targets.len()
            );
            if let Some(cb) = callback {
                cb.on_redaction(name, redacted_spans);
            }
        }
    }

    // ── Markdown ─────────────────────────────────────────────────────────
    let selected = if config.pages.is_all() {
        None
    } else {
        let indices = config.pages.to_indices(pages.len());
        if indices.is_empty() {
            return Err(ConvertError::InvalidConfig(format!(
                "page selection {:?} matches no page of '{}' ({} pages)",
                config.pages,
                name,
                pages.len()
            )));
        }
        Some(indices)
    };
    let opts = ExtractOptions {
        pages: selected,
        suppress_code_fences: profile.is_ocr_document,
    };
    let raw = backend.extract_markdown(&pdf, &opts)?;
    let (markdown, stats) =
        clean_pdf_markdown(&raw, &recurring, profile.is_ocr_document, &config.cleanup);
    let markdown = ensure_final_newline(&markdown);

    let report = CleanupReport {
        ocr_applied,
        is_ocr_document: profile.is_ocr_document,
        dominant_font: profile.dominant_font,
        pages: pages.len(),
        redacted_spans,
        recurring_texts: recurring.len(),
        garbage_lines_removed: stats.garbage_lines_removed,
        truncated_at_line: stats.truncated_at_line,
        furniture_lines_removed: stats.furniture_lines_removed,
    };
    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "{}: {} bytes of Markdown in {}ms",
        name,
        markdown.len(),
        duration_ms
    );
    if let Some(cb) = callback {
        cb.on_document_complete(name, markdown.len());
    }

    Ok(ConversionOutput {
        source: name.to_string(),
        format: SourceFormat::Pdf,
        markdown,
        report,
        duration_ms,
    })
}
