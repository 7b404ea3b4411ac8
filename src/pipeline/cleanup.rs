//! Markdown-stage orchestration for the PDF route.
//!
//! ```text
//! extracted markdown
//!   │
//!   ├─ hygiene     CRLF → LF, invisible Unicode removed
//!   ├─ garbage     OCR documents only: drop noise, truncate degraded tail
//!   ├─ furniture   recurring headers/footers, page numbers
//!   ├─ headings    `# **Text**` → `# Text`
//!   └─ paragraphs  merge physically broken lines
//! ```
//!
//! The order matters: furniture and noise lines sit between the physical
//! lines of a paragraph, so they must be gone before lines are merged.

use crate::config::CleanupConfig;
use crate::pipeline::furniture::strip_page_furniture;
use crate::pipeline::garbage::filter_ocr_garbage;
use crate::pipeline::paragraphs::merge_broken_lines;
use crate::pipeline::postprocess::{normalise_line_endings, remove_invisible_chars, strip_heading_bold};
use crate::pipeline::recurring::RecurringText;
use tracing::debug;

/// What the Markdown stages removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownCleanupStats {
    pub garbage_lines_removed: usize,
    pub truncated_at_line: Option<usize>,
    pub furniture_lines_removed: usize,
}

/// Run every Markdown-stage filter of the PDF route in order.
pub fn clean_pdf_markdown(
    markdown: &str,
    recurring: &RecurringText,
    is_ocr_document: bool,
    cfg: &CleanupConfig,
) -> (String, MarkdownCleanupStats) {
    let mut stats = MarkdownCleanupStats::default();

    let md = normalise_line_endings(markdown);
    let mut md = remove_invisible_chars(&md);

    if is_ocr_document {
        let result = filter_ocr_garbage(&md, &cfg.garbage);
        debug!(
            dropped = result.dropped_lines,
            truncated_at = ?result.truncated_at,
            "garbage filter"
        );
        stats.garbage_lines_removed = result.dropped_lines;
        stats.truncated_at_line = result.truncated_at;
        md = result.markdown;
    }

    let (md, removed) = strip_page_furniture(&md, recurring, cfg.strip_page_numbers);
    debug!(removed, "furniture stripper");
    stats.furniture_lines_removed = removed;

    let md = strip_heading_bold(&md);
    let md = merge_broken_lines(&md);

    (md, stats)
}
