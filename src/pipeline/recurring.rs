//! Recurring-text detector: running headers and footers.
//!
//! A string is recurring when it sits in the same zone (top or bottom
//! `furniture_zone_ratio` of the page height) on **every** page. The test is
//! a strict intersection rather than a majority vote: on a three-page letter
//! a phrase that happens to land in the footer twice is not furniture.

use crate::config::CleanupConfig;
use crate::model::Page;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Zone {
    Header,
    Footer,
}

/// Set of header/footer strings found on every page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurringText(HashSet<String>);

impl RecurringText {
    pub fn contains(&self, text: &str) -> bool {
        self.0.contains(text)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for RecurringText {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn zone_entries(page: &Page, ratio: f32) -> HashSet<(String, Zone)> {
    let header_limit = page.height * ratio;
    let footer_limit = page.height * (1.0 - ratio);

    page.spans
        .iter()
        .filter_map(|span| {
            let text = span.text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                return None;
            }
            let mid = span.bbox.mid_y();
            let zone = if mid <= header_limit {
                Zone::Header
            } else if mid >= footer_limit {
                Zone::Footer
            } else {
                return None;
            };
            Some((text, zone))
        })
        .collect()
}

/// Find the header/footer strings shared by all pages.
///
/// Documents with fewer than two pages yield an empty set.
pub fn detect_recurring_text(pages: &[Page], cfg: &CleanupConfig) -> RecurringText {
    if pages.len() < 2 {
        return RecurringText::default();
    }

    let mut iter = pages.iter().map(|p| zone_entries(p, cfg.furniture_zone_ratio));
    let Some(mut common) = iter.next() else {
        return RecurringText::default();
    };
    for entries in iter {
        common.retain(|e| entries.contains(e));
        if common.is_empty() {
            break;
        }
    }

    let found: RecurringText = common.into_iter().map(|(text, _)| text).collect();
    tracing::debug!(count = found.len(), "recurring header/footer texts");
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, Span};

    fn footer(text: &str) -> Span {
        Span::new(text, BBox::new(200.0, 800.0, 400.0, 812.0), "Arial")
    }

    fn header(text: &str) -> Span {
        Span::new(text, BBox::new(200.0, 20.0, 400.0, 32.0), "Arial")
    }

    fn body(text: &str) -> Span {
        Span::new(text, BBox::new(100.0, 400.0, 500.0, 412.0), "Arial")
    }

    fn page(spans: Vec<Span>) -> Page {
        Page::new(595.0, 842.0, spans)
    }

    #[test]
    fn footer_on_every_page_is_recurring() {
        let cfg = CleanupConfig::default();
        let pages = vec![
            page(vec![header("ACME Corp"), body("one"), footer("  Page Footer ")]),
            page(vec![header("ACME Corp"), body("two"), footer("Page Footer")]),
        ];
        let found = detect_recurring_text(&pages, &cfg);
        assert!(found.contains("Page Footer"));
        assert!(found.contains("ACME Corp"));
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn missing_from_one_page_means_not_recurring() {
        let cfg = CleanupConfig::default();
        let pages = vec![
            page(vec![footer("Draft")]),
            page(vec![footer("Draft")]),
            page(vec![body("Draft")]),
        ];
        assert!(detect_recurring_text(&pages, &cfg).is_empty());
    }

    #[test]
    fn zone_must_match() {
        let cfg = CleanupConfig::default();
        let pages = vec![page(vec![header("Draft")]), page(vec![footer("Draft")])];
        assert!(detect_recurring_text(&pages, &cfg).is_empty());
    }

    #[test]
    fn single_page_has_no_signal() {
        let cfg = CleanupConfig::default();
        assert!(detect_recurring_text(&[page(vec![footer("x")])], &cfg).is_empty());
        assert!(detect_recurring_text(&[], &cfg).is_empty());
    }

    #[test]
    fn body_text_ignored() {
        let cfg = CleanupConfig::default();
        let pages = vec![page(vec![body("same")]), page(vec![body("same")])];
        assert!(detect_recurring_text(&pages, &cfg).is_empty());
    }
}
