//! Font/document profiler.
//!
//! One pass over every span yields the dominant font (the one covering the
//! most non-whitespace characters) and whether the text layer is entirely
//! synthetic. OCR tools inject an invisible layer in a placeholder font
//! (`GlyphLessFont`, `HiddenHorzOCR`, …); when *every* font belongs to that
//! family the document is a scan, and the foreign-font signal used by the
//! span classifier is meaningless.

use crate::config::CleanupConfig;
use crate::model::{DocumentProfile, Page};

/// Strip a PDF font-subset tag such as `ABCDEF+` from the front of a font name.
pub fn base_font_name(font: &str) -> &str {
    match font.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => {
            rest
        }
        _ => font,
    }
}

pub fn is_ocr_font(font: &str, cfg: &CleanupConfig) -> bool {
    let name = base_font_name(font).to_lowercase();
    cfg.ocr_font_sentinels
        .iter()
        .any(|s| name.contains(&s.to_lowercase()))
}

/// Compute the [`DocumentProfile`] of a document.
///
/// Ties on character count go to the font seen first. A document without
/// any visible text gets an empty dominant font. Fonts of whitespace-only
/// spans count as observed for the OCR test but never dominate.
pub fn profile_document(pages: &[Page], cfg: &CleanupConfig) -> DocumentProfile {
    // (font, chars) in first-seen order
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for span in pages.iter().flat_map(|p| p.spans.iter()) {
        let chars = span.visible_len();
        match counts.iter_mut().find(|(f, _)| *f == span.font) {
            Some((_, n)) => *n += chars,
            None => counts.push((span.font.as_str(), chars)),
        }
    }

    let mut dominant: Option<(&str, usize)> = None;
    for &(font, n) in &counts {
        if n > 0 && dominant.is_none_or(|(_, best)| n > best) {
            dominant = Some((font, n));
        }
    }

    let is_ocr_document = !counts.is_empty() && counts.iter().all(|(f, _)| is_ocr_font(f, cfg));

    DocumentProfile {
        dominant_font: dominant.map(|(f, _)| f.to_string()).unwrap_or_default(),
        is_ocr_document,
    }
}
