//! DOCX route driver.
//!
//! Word documents carry real structure, so none of the PDF heuristics run
//! and the text itself is left untouched. Two repairs remain: the HTML →
//! Markdown step underlines top-level headings instead of using `#`, and it
//! emits an empty header row for tables without header cells.

use crate::backend::docx::docx_to_markdown;
use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::output::{CleanupReport, ConversionOutput, SourceFormat};
use crate::pipeline::postprocess::{
    ensure_final_newline, repair_empty_table_headers, setext_headings_to_atx,
};
use std::time::Instant;
use tracing::{debug, info};

/// Convert one DOCX held in memory.
pub fn run_docx_pipeline(
    bytes: &[u8],
    name: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let start = Instant::now();
    let callback = config.status_callback.as_ref();
    if let Some(cb) = callback {
        cb.on_document_start(name);
    }
    info!("Converting DOCX {}", name);

    let raw = docx_to_markdown(bytes, name)?;
    debug!(bytes = raw.len(), "html2md output");

    let md = setext_headings_to_atx(&raw);
    let md = repair_empty_table_headers(&md);
    let markdown = ensure_final_newline(md.trim_start_matches('\n'));

    let duration_ms = start.elapsed().as_millis() as u64;
    if let Some(cb) = callback {
        cb.on_document_complete(name, markdown.len());
    }

    Ok(ConversionOutput {
        source: name.to_string(),
        format: SourceFormat::Docx,
        markdown,
        report: CleanupReport::default(),
        duration_ms,
    })
}
