//! Span classifier: finds handwritten margin annotations ("paraphs").
//!
//! ## Why redact before extraction?
//!
//! Signed contracts and scanned forms carry initials, ticks and short
//! handwritten notes in the page margins. A Markdown extractor happily reads
//! them as text and splices `JK` or `ok` into the middle of a sentence. The
//! cheapest place to drop them is the span structure, where position and
//! font are still known: flagged spans are removed from the PDF and the
//! extractor then runs on the cleaned bytes.
//!
//! The decision is an ordered list of guard clauses over one immutable
//! [`Span`] ([`should_redact`]). Dates and money amounts are never redacted,
//! even when handwritten in the margin, because losing them is worse than
//! leaving a stray tick mark.

use crate::config::CleanupConfig;
use crate::model::{BBox, DocumentProfile, Page, PageRedactions, Span};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,2}[./-]\d{1,2}[./-]\d{2,4}\b").unwrap());

static RE_CURRENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\d[\d\s.,]*\s*(zł|pln|eur|usd|€|\$|£))|((zł|pln|eur|usd|€|\$|£)\s*\d[\d\s.,]*)",
    )
    .unwrap()
});

static RE_DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+[.,]\d{2}\b").unwrap());

/// Dates, currency amounts and two-decimal numbers are always kept.
pub fn is_meaningful_content(text: &str) -> bool {
    RE_DATE.is_match(text) || RE_CURRENCY.is_match(text) || RE_DECIMAL.is_match(text)
}

/// The four margin bands of `page`: left, right, top, bottom.
fn margin_bands(page: &BBox, cfg: &CleanupConfig) -> [BBox; 4] {
    [
        BBox::new(page.x0, page.y0, page.x0 + cfg.margin_x, page.y1),
        BBox::new(page.x1 - cfg.margin_x, page.y0, page.x1, page.y1),
        BBox::new(page.x0, page.y0, page.x1, page.y0 + cfg.margin_y),
        BBox::new(page.x0, page.y1 - cfg.margin_y, page.x1, page.y1),
    ]
}

/// True when `bbox` intersects one of the four margin bands of `page`.
pub fn in_margin(bbox: &BBox, page: &BBox, cfg: &CleanupConfig) -> bool {
    margin_bands(page, cfg).iter().any(|band| band.intersects(bbox))
}

pub fn is_handwriting_font(font: &str, cfg: &CleanupConfig) -> bool {
    let font = font.to_lowercase();
    cfg.handwriting_font_keywords
        .iter()
        .any(|k| font.contains(&k.to_lowercase()))
}

/// Decide whether `span` is a margin annotation to remove.
///
/// Redact iff (handwriting font ∧ in margin) ∨ (in margin ∧ short ∧ foreign font).
pub fn should_redact(span: &Span, page: &BBox, dominant_font: &str, cfg: &CleanupConfig) -> bool {
    let text = span.text.trim();
    if text.is_empty() {
        return false;
    }
    if is_meaningful_content(text) {
        return false;
    }

    let in_margin = in_margin(&span.bbox, page, cfg);
    if !in_margin {
        return false;
    }

    if is_handwriting_font(&span.font, cfg) {
        return true;
    }

    let is_short = span.visible_len() <= cfg.max_annotation_chars;
    let is_foreign_font = span.font != dominant_font;
    is_short && is_foreign_font
}

/// Collect the boxes of every span to redact, grouped per page.
///
/// OCR documents are skipped: a single synthetic font defeats the
/// foreign-font signal. Pages without targets are omitted.
pub fn find_redaction_targets(
    pages: &[Page],
    profile: &DocumentProfile,
    cfg: &CleanupConfig,
) -> Vec<PageRedactions> {
    if profile.is_ocr_document {
        return Vec::new();
    }

    pages
        .iter()
        .enumerate()
        .filter_map(|(page_index, page)| {
            let rect = page.rect();
            let boxes: Vec<BBox> = page
                .spans
                .iter()
                .filter(|s| should_redact(s, &rect, &profile.dominant_font, cfg))
                .map(|s| s.bbox)
                .collect();
            (!boxes.is_empty()).then_some(PageRedactions { page_index, boxes })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const A4: BBox = BBox {
        x0: 0.0,
        y0: 0.0,
        x1: 595.0,
        y1: 842.0,
    };

    fn margin_span(text: &str, font: &str) -> Span {
        Span::new(text, BBox::new(560.0, 400.0, 590.0, 412.0), font)
    }

    fn body_span(text: &str, font: &str) -> Span {
        Span::new(text, BBox::new(100.0, 400.0, 300.0, 412.0), font)
    }

    #[test]
    fn dates_and_amounts_survive_in_margin_with_handwriting_font() {
        let cfg = CleanupConfig::default();
        for text in ["15.03.2023", "120,50 PLN", "€ 40", "3.14"] {
            let span = margin_span(text, "BrushScriptMT");
            assert!(!should_redact(&span, &A4, "Arial", &cfg), "{text}");
        }
    }

    #[test]
    fn handwriting_in_margin_is_redacted() {
        let cfg = CleanupConfig::default();
        let span = margin_span("approved by legal", "SignaturePro");
        assert!(should_redact(&span, &A4, "Arial", &cfg));
    }

    #[test]
    fn handwriting_in_body_is_kept() {
        let cfg = CleanupConfig::default();
        let span = body_span("JK", "SignaturePro");
        assert!(!should_redact(&span, &A4, "Arial", &cfg));
    }

    #[test]
    fn short_foreign_span_in_margin_is_redacted() {
        let cfg = CleanupConfig::default();
        assert!(should_redact(&margin_span("JK", "Calibri"), &A4, "Arial", &cfg));
        // Same font as the body text: a legitimate margin number, keep it.
        assert!(!should_redact(&margin_span("JK", "Arial"), &A4, "Arial", &cfg));
        // Long text in a foreign font is not an annotation.
        assert!(!should_redact(
            &margin_span("Confidential", "Calibri"),
            &A4,
            "Arial",
            &cfg
        ));
    }

    #[test]
    fn blank_span_is_never_a_candidate() {
        let cfg = CleanupConfig::default();
        assert!(!should_redact(&margin_span("   ", "Script"), &A4, "Arial", &cfg));
    }

    #[test]
    fn top_band_counts_as_margin() {
        let cfg = CleanupConfig::default();
        let span = Span::new("ok", BBox::new(200.0, 10.0, 220.0, 20.0), "Pen");
        assert!(should_redact(&span, &A4, "Arial", &cfg));
    }

    #[test]
    fn targets_grouped_per_page_and_skipped_for_ocr() {
        let cfg = CleanupConfig::default();
        let pages = vec![
            Page::new(595.0, 842.0, vec![body_span("Body text", "Arial")]),
            Page::new(
                595.0,
                842.0,
                vec![body_span("Body", "Arial"), margin_span("JK", "Calibri")],
            ),
        ];
        let profile = DocumentProfile {
            dominant_font: "Arial".into(),
            is_ocr_document: false,
        };
        let targets = find_redaction_targets(&pages, &profile, &cfg);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].page_index, 1);
        assert_eq!(targets[0].boxes.len(), 1);

        let ocr = DocumentProfile {
            is_ocr_document: true,
            ..profile
        };
        assert!(find_redaction_targets(&pages, &ocr, &cfg).is_empty());
    }

    #[test]
    fn margin_bands_cover_all_four_edges() {
        let cfg = CleanupConfig::default();
        let page = BBox::new(0.0, 0.0, 595.0, 842.0);
        assert!(!in_margin(&BBox::new(100.0, 300.0, 400.0, 312.0), &page, &cfg));
        assert!(in_margin(&BBox::new(20.0, 300.0, 60.0, 312.0), &page, &cfg));
        assert!(in_margin(&BBox::new(500.0, 300.0, 550.0, 312.0), &page, &cfg));
        assert!(in_margin(&BBox::new(200.0, 10.0, 300.0, 22.0), &page, &cfg));
        assert!(in_margin(&BBox::new(200.0, 810.0, 300.0, 822.0), &page, &cfg));
    }
}
