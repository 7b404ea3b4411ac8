//! Cleanup stages and the per-format drivers that chain them.
//!
//! Each submodule implements exactly one transformation step. Stages are
//! pure functions over spans or Markdown text; only the drivers ([`pdf`],
//! [`docx`]) talk to the collaborators in [`crate::backend`].
//!
//! ## Data Flow (PDF)
//!
//! ```text
//! spans ──▶ profile ──▶ recurring ──▶ spans (redaction targets)
//!                                          │
//! Markdown ◀── paragraphs ◀── postprocess ◀── furniture ◀── garbage ◀─┘
//! ```
//!
//! 1. [`profile`]   : dominant font and OCR-document flag
//! 2. [`recurring`] : text repeated in the header/footer zone of every page
//! 3. [`spans`]     : margin annotations to redact before extraction
//! 4. [`garbage`]   : OCR noise lines, with trailing-garbage truncation
//! 5. [`furniture`] : page numbers and recurring header/footer lines
//! 6. [`postprocess`]: line endings, invisible chars, heading bold, tables
//! 7. [`paragraphs`]: re-join lines the extractor broke apart
//!
//! [`cleanup`] runs stages 4–7 in order; [`input`] loads and classifies
//! files before either driver sees them.

pub mod cleanup;
pub mod docx;
pub mod furniture;
pub mod garbage;
pub mod input;
pub mod paragraphs;
pub mod pdf;
pub mod postprocess;
pub mod profile;
pub mod recurring;
pub mod spans;
