//! pdfium-render implementation of the PDF collaborators.
//!
//! ## Text objects as spans
//!
//! Each page text object carries one font and one bounding box. Producers
//! may split a single run into several objects (one per word, say); the PDF
//! driver joins those back with [`layout::merge_text_runs`] before any span
//! analysis. Redaction removes every object whose centre falls inside a
//! target box, so a merged span takes all of its fragments with it.
//!
//! ## Coordinates
//!
//! PDF user space has its origin at the bottom-left corner. Every box is
//! flipped to the top-left origin of [`crate::model`] on the way out; the
//! redaction pass flips object bounds the same way before comparing.
//!
//! ## Threading
//!
//! pdfium is not async-safe. Backends are created and used inside
//! `tokio::task::spawn_blocking` (see [`crate::convert`]).

use crate::backend::{layout, ExtractOptions, MarkdownExtractor, Redactor, SpanSource};
use crate::error::ConvertError;
use crate::model::{BBox, Page, PageRedactions, Span};
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

/// Target boxes grow by this many points before the centre test.
const REDACTION_PAD: f32 = 2.0;

/// Bind to a pdfium library.
///
/// Order: `PDFIUM_LIB_PATH`, then a library next to the working directory,
/// then the system library.
pub fn bind_pdfium() -> Result<Pdfium, ConvertError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path).map_err(|e| {
            ConvertError::PdfiumBindingFailed(format!("PDFIUM_LIB_PATH='{path}': {e:?}"))
        })?,
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| ConvertError::PdfiumBindingFailed(format!("{e:?}")))?,
    };
    Ok(Pdfium::new(bindings))
}

/// Flip a PDF-space rectangle (bottom-left origin) to page-top coordinates.
fn to_top_left(left: f32, bottom: f32, right: f32, top: f32, page_height: f32) -> BBox {
    BBox::new(left, page_height - top, right, page_height - bottom)
}

/// Map a pdfium load failure onto the matching [`ConvertError`].
fn classify_load_error(name: &str, detail: String, password_given: bool) -> ConvertError {
    if detail.contains("Password") || detail.contains("password") {
        if password_given {
            ConvertError::WrongPassword {
                name: name.to_string(),
            }
        } else {
            ConvertError::PasswordRequired {
                name: name.to_string(),
            }
        }
    } else {
        ConvertError::CorruptPdf {
            name: name.to_string(),
            detail,
        }
    }
}

fn object_bbox(object: &PdfPageObject, page_height: f32) -> Option<BBox> {
    let b = object.bounds().ok()?;
    Some(to_top_left(
        b.left().value,
        b.bottom().value,
        b.right().value,
        b.top().value,
        page_height,
    ))
}

/// PDF backend for one document.
pub struct PdfiumBackend {
    pdfium: Pdfium,
    name: String,
    password: Option<String>,
}

impl PdfiumBackend {
    /// Bind pdfium for the document `name`.
    pub fn bind(name: impl Into<String>, password: Option<String>) -> Result<Self, ConvertError> {
        Ok(Self {
            pdfium: bind_pdfium()?,
            name: name.into(),
            password,
        })
    }

    fn load<'a>(&'a self, pdf: &'a [u8]) -> Result<PdfDocument<'a>, ConvertError> {
        self.pdfium
            .load_pdf_from_byte_slice(pdf, self.password.as_deref())
            .map_err(|e| classify_load_error(&self.name, format!("{e:?}"), self.password.is_some()))
    }

    fn page_spans(page: &PdfPage, page_index: usize) -> Page {
        let width = page.width().value;
        let height = page.height().value;
        let mut spans = Vec::new();

        for object in page.objects().iter() {
            let Some(text_object) = object.as_text_object() else {
                continue;
            };
            let text = text_object.text();
            if text.trim().is_empty() {
                continue;
            }
            match object_bbox(&object, height) {
                Some(bbox) => spans.push(Span::new(text, bbox, text_object.font().name())),
                None => warn!(page = page_index + 1, "text object without bounds skipped"),
            }
        }
        Page::new(width, height, spans)
    }
}

impl SpanSource for PdfiumBackend {
    fn extract_pages(&self, pdf: &[u8]) -> Result<Vec<Page>, ConvertError> {
        let document = self.load(pdf)?;
        let pages: Vec<Page> = document
            .pages()
            .iter()
            .enumerate()
            .map(|(i, page)| Self::page_spans(&page, i))
            .collect();
        info!(
            "{}: {} pages, {} spans",
            self.name,
            pages.len(),
            pages.iter().map(|p| p.spans.len()).sum::<usize>()
        );
        Ok(pages)
    }
}

impl Redactor for PdfiumBackend {
    fn apply_redactions(
        &self,
        pdf: &[u8],
        redactions: &[PageRedactions],
    ) -> Result<Vec<u8>, ConvertError> {
        if redactions.iter().all(|r| r.boxes.is_empty()) {
            return Ok(pdf.to_vec());
        }

        let document = self.load(pdf)?;
        let pages = document.pages();

        for redaction in redactions {
            let mut page = pages.get(redaction.page_index as u16).map_err(|e| {
                ConvertError::CorruptPdf {
                    name: self.name.clone(),
                    detail: format!("page {}: {e:?}", redaction.page_index + 1),
                }
            })?;
            let height = page.height().value;
            let targets: Vec<BBox> = redaction
                .boxes
                .iter()
                .map(|b| b.padded(REDACTION_PAD))
                .collect();

            let doomed: Vec<usize> = page
                .objects()
                .iter()
                .enumerate()
                .filter_map(|(idx, object)| {
                    if object.object_type() != PdfPageObjectType::Text {
                        return None;
                    }
                    let bbox = object_bbox(&object, height)?;
                    targets
                        .iter()
                        .any(|t| t.contains_point(bbox.mid_x(), bbox.mid_y()))
                        .then_some(idx)
                })
                .collect();

            // Highest index first so earlier indices stay valid.
            for &idx in doomed.iter().rev() {
                page.objects_mut()
                    .remove_object_at_index(idx)
                    .map_err(|e| ConvertError::Internal(format!("redaction failed: {e:?}")))?;
            }
            debug!(
                page = redaction.page_index + 1,
                removed = doomed.len(),
                "redacted text objects"
            );
        }

        document
            .save_to_bytes()
            .map_err(|e| ConvertError::Internal(format!("saving redacted PDF failed: {e:?}")))
    }
}

impl MarkdownExtractor for PdfiumBackend {
    fn extract_markdown(&self, pdf: &[u8], opts: &ExtractOptions) -> Result<String, ConvertError> {
        let pages = self.extract_pages(pdf)?;
        Ok(layout::render_markdown(&pages, opts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flips_to_top_left_origin() {
        // A footer 20pt above the bottom edge of an A4 page.
        let b = to_top_left(100.0, 20.0, 200.0, 32.0, 842.0);
        assert_eq!(b, BBox::new(100.0, 810.0, 200.0, 822.0));
        assert!(b.mid_y() > 842.0 * 0.9);
    }

    #[test]
    fn load_errors_are_classified() {
        let e = classify_load_error("a.pdf", "PdfiumLibraryInternalError(PasswordError)".into(), false);
        assert!(matches!(e, ConvertError::PasswordRequired { .. }));
        let e = classify_load_error("a.pdf", "PdfiumLibraryInternalError(PasswordError)".into(), true);
        assert!(matches!(e, ConvertError::WrongPassword { .. }));
        let e = classify_load_error("a.pdf", "PdfiumLibraryInternalError(FormatError)".into(), false);
        assert!(matches!(e, ConvertError::CorruptPdf { .. }));
    }
}
