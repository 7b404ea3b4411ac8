//! Extraction-side data model: spans, pages and the per-document profile.
//!
//! Coordinates are page-relative points with the origin at the **top-left**
//! corner and `y` growing downward. Backends that work in PDF user space
//! (origin bottom-left) flip the axis before building a [`Span`], so every
//! classifier in [`crate::pipeline`] can reason about "top of page" without
//! knowing where the data came from.
//!
//! All of these values live for exactly one document's processing pass.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box `(x0, y0) – (x1, y1)` in page points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    /// Vertical midpoint.
    pub fn mid_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    pub fn mid_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    /// True when the two boxes share any area (touching edges do not count).
    pub fn intersects(&self, other: &BBox) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    /// Grow the box by `pad` points on every side.
    pub fn padded(&self, pad: f32) -> BBox {
        BBox::new(self.x0 - pad, self.y0 - pad, self.x1 + pad, self.y1 + pad)
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }
}

/// A contiguous run of text at one position with one font.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    pub bbox: BBox,
    pub font: String,
}

impl Span {
    pub fn new(text: impl Into<String>, bbox: BBox, font: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bbox,
            font: font.into(),
        }
    }

    /// Number of non-whitespace characters.
    pub fn visible_len(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }
}

/// One page of extracted spans plus its dimensions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    pub width: f32,
    pub height: f32,
    pub spans: Vec<Span>,
}

impl Page {
    pub fn new(width: f32, height: f32, spans: Vec<Span>) -> Self {
        Self {
            width,
            height,
            spans,
        }
    }

    /// The full page rectangle.
    pub fn rect(&self) -> BBox {
        BBox::new(0.0, 0.0, self.width, self.height)
    }

    /// Non-whitespace characters on the page.
    pub fn visible_chars(&self) -> usize {
        self.spans.iter().map(Span::visible_len).sum()
    }
}

/// Document-wide font statistics, derived once from all spans.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentProfile {
    /// Font covering the most non-whitespace characters; empty when the
    /// document carries no text at all.
    pub dominant_font: String,
    /// Every observed font is a synthetic OCR text-layer font.
    pub is_ocr_document: bool,
}

/// Boxes to black out on one page (0-indexed).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageRedactions {
    pub page_index: usize,
    pub boxes: Vec<BBox>,
}

/// How much of the document carries an extractable text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextLayerStats {
    pub total_pages: usize,
    pub pages_with_text: usize,
}

impl TextLayerStats {
    /// Count pages with more than `min_chars` visible characters.
    pub fn from_pages(pages: &[Page], min_chars: usize) -> Self {
        Self {
            total_pages: pages.len(),
            pages_with_text: pages.iter().filter(|p| p.visible_chars() > min_chars).count(),
        }
    }

    /// True when fewer than `min_ratio` of the pages carry text.
    ///
    /// An empty document never needs OCR: there is nothing to recognise.
    pub fn needs_ocr(&self, min_ratio: f32) -> bool {
        if self.total_pages == 0 {
            return false;
        }
        (self.pages_with_text as f32) < min_ratio * self.total_pages as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_intersection_excludes_touching_edges() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&BBox::new(5.0, 5.0, 15.0, 15.0)));
        assert!(!a.intersects(&BBox::new(10.0, 0.0, 20.0, 10.0)));
    }

    #[test]
    fn text_layer_stats_threshold() {
        let text = Span::new("x".repeat(60), BBox::default(), "Arial");
        let pages: Vec<Page> = (0..20)
            .map(|i| {
                let spans = if i == 0 { vec![text.clone()] } else { vec![] };
                Page::new(595.0, 842.0, spans)
            })
            .collect();
        let stats = TextLayerStats::from_pages(&pages, 50);
        assert_eq!(stats.pages_with_text, 1);
        // 1/20 = 5% < 10%
        assert!(stats.needs_ocr(0.10));
        assert!(!TextLayerStats::default().needs_ocr(0.10));
    }
}
