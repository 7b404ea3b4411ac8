//! Result types returned by the conversion entry points.

use crate::error::DocumentFailure;
use serde::{Deserialize, Serialize};

/// Container format of the input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Pdf,
    Docx,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Pdf => "pdf",
            SourceFormat::Docx => "docx",
        }
    }
}

/// What the cleanup stages did to one document.
///
/// Counters are informational; they never influence the Markdown itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// The PDF was sent through OCR and re-extracted.
    pub ocr_applied: bool,
    /// Every font in the text layer is a synthetic OCR font.
    pub is_ocr_document: bool,
    /// Font covering the most characters (empty for DOCX or text-less PDFs).
    pub dominant_font: String,
    /// Pages in the source document.
    pub pages: usize,
    /// Spans removed as margin annotations.
    pub redacted_spans: usize,
    /// Distinct header/footer texts seen on every page.
    pub recurring_texts: usize,
    /// Individually dropped OCR-noise lines.
    pub garbage_lines_removed: usize,
    /// 0-based line index where the OCR tail was truncated, if it was.
    pub truncated_at_line: Option<usize>,
    /// Lines dropped as recurring headers/footers or page numbers.
    pub furniture_lines_removed: usize,
}

/// The complete result of converting one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Display name of the input (path or caller-supplied name).
    pub source: String,
    pub format: SourceFormat,
    /// Final Markdown, ending with exactly one newline.
    pub markdown: String,
    pub report: CleanupReport,
    /// Wall-clock time spent on the document.
    pub duration_ms: u64,
}

/// Aggregate outcome of a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failures: Vec<DocumentFailure>,
    pub total_duration_ms: u64,
}

impl BatchSummary {
    pub fn record_success(&mut self, output: &ConversionOutput) {
        self.total += 1;
        self.succeeded += 1;
        self.total_duration_ms += output.duration_ms;
    }

    pub fn record_failure(&mut self, failure: DocumentFailure) {
        self.total += 1;
        self.failures.push(failure);
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;

    #[test]
    fn summary_counts() {
        let mut summary = BatchSummary::default();
        let ok = ConversionOutput {
            source: "a.pdf".into(),
            format: SourceFormat::Pdf,
            markdown: "# A\n".into(),
            report: CleanupReport::default(),
            duration_ms: 7,
        };
        summary.record_success(&ok);
        summary.record_failure(DocumentFailure::new(
            "b.pdf",
            &ConvertError::Internal("boom".into()),
        ));
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed(), 1);
        assert!(!summary.all_succeeded());
        assert_eq!(summary.total_duration_ms, 7);
    }

    #[test]
    fn format_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&SourceFormat::Docx).unwrap(), "\"docx\"");
    }
}
