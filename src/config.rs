//! Configuration types for document-to-Markdown conversion.
//!
//! Two layers:
//!
//! * [`CleanupConfig`] (with [`GarbageThresholds`]) holds every tunable of
//!   the cleanup stages: margin bands, font keyword lists, zone ratios and
//!   noise thresholds. It is a plain value with serde support, so a JSON
//!   file can override any subset of fields (`#[serde(default)]`) and tests
//!   can tweak one threshold without touching process-wide state.
//! * [`ConversionConfig`] wraps the cleanup settings together with OCR,
//!   page selection, password and the status callback. Built via
//!   [`ConversionConfigBuilder`], which validates on `build()`.

use crate::error::ConvertError;
use crate::progress::StatusCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ── Cleanup thresholds ───────────────────────────────────────────────────

/// Tunables for the span- and Markdown-level cleanup stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Width of the left/right margin bands in page points. Default: 50 (≈ 0.7").
    pub margin_x: f32,

    /// Height of the top/bottom margin bands in page points. Default: 36 (0.5").
    pub margin_y: f32,

    /// Case-insensitive substrings marking a handwriting font.
    pub handwriting_font_keywords: Vec<String>,

    /// Spans with at most this many visible characters count as "short". Default: 4.
    pub max_annotation_chars: usize,

    /// Case-insensitive substrings identifying synthetic OCR text-layer fonts.
    pub ocr_font_sentinels: Vec<String>,

    /// Fraction of page height forming the header and footer zones. Default: 0.10.
    pub furniture_zone_ratio: f32,

    /// Remove margin annotations (paraphs) before Markdown extraction. Default: true.
    pub redact_margin_annotations: bool,

    /// Strip page-number lines from the Markdown. Default: true.
    pub strip_page_numbers: bool,

    /// OCR noise thresholds.
    pub garbage: GarbageThresholds,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            margin_x: 50.0,
            margin_y: 36.0,
            handwriting_font_keywords: [
                "script",
                "hand",
                "signature",
                "cursive",
                "brush",
                "marker",
                "pen",
                "ink",
                "writing",
                "freestyle",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_annotation_chars: 4,
            ocr_font_sentinels: ["glyphless", "invisible", "cidfont", "hiddenhorzocr"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            furniture_zone_ratio: 0.10,
            redact_margin_annotations: true,
            strip_page_numbers: true,
            garbage: GarbageThresholds::default(),
        }
    }
}

impl CleanupConfig {
    /// Load overrides from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConvertError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ConvertError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            ConvertError::InvalidConfig(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the classifiers meaningless.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.margin_x < 0.0 || self.margin_y < 0.0 {
            return Err(ConvertError::InvalidConfig(
                "margin bands must be non-negative".into(),
            ));
        }
        if !(0.0..0.5).contains(&self.furniture_zone_ratio) {
            return Err(ConvertError::InvalidConfig(format!(
                "furniture_zone_ratio must be in [0, 0.5), got {}",
                self.furniture_zone_ratio
            )));
        }
        self.garbage.validate()
    }
}

/// Thresholds of the OCR garbage filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GarbageThresholds {
    /// Lines longer than `letter_ratio_min_len` with fewer letters than this are noise. Default: 0.40.
    pub min_letter_ratio: f32,
    pub letter_ratio_min_len: usize,
    /// Content this short (after stripping emphasis) is noise. Default: 2.
    pub max_noise_len: usize,
    /// Lines with at least this many `|` are misread table borders. Default: 3.
    pub max_pipes: usize,
    /// Share of single-letter words marking scattered form-field artifacts. Default: 0.30.
    pub single_letter_word_ratio: f32,
    pub single_letter_min_words: usize,
    /// Words longer than this are concatenated garbage. Default: 20.
    pub long_word_len: usize,
    /// The long-word rule only applies to lines with at most this many words. Default: 3.
    pub long_word_max_words: usize,
    /// Lines where more than this share of words are garbage words are noise. Default: 0.40.
    pub garbage_word_ratio: f32,
    /// Words with at least `vowel_min_letters` letters and a vowel ratio below this are garbage. Default: 0.15.
    pub min_vowel_ratio: f32,
    pub vowel_min_letters: usize,
    /// Lower→upper case transitions inside a word marking glued words. Default: 2.
    pub max_case_transitions: usize,
    /// Vowels used by the vowel-ratio rule (Latin plus Polish/Western accents).
    pub vowels: String,
    /// Number of non-blank lines in the truncation window. Default: 8.
    pub window_size: usize,
    /// Truncate once more than this share of the window is garbage. Default: 0.60.
    pub truncate_ratio: f32,
}

impl Default for GarbageThresholds {
    fn default() -> Self {
        Self {
            min_letter_ratio: 0.40,
            letter_ratio_min_len: 5,
            max_noise_len: 2,
            max_pipes: 3,
            single_letter_word_ratio: 0.30,
            single_letter_min_words: 3,
            long_word_len: 20,
            long_word_max_words: 3,
            garbage_word_ratio: 0.40,
            min_vowel_ratio: 0.15,
            vowel_min_letters: 3,
            max_case_transitions: 2,
            vowels: "aeiouyąęóàáâäãåèéêëìíîïòôöõùúûüýAEIOUYĄĘÓÀÁÂÄÃÅÈÉÊËÌÍÎÏÒÔÖÕÙÚÛÜÝ".into(),
            window_size: 8,
            truncate_ratio: 0.60,
        }
    }
}

impl GarbageThresholds {
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.window_size == 0 {
            return Err(ConvertError::InvalidConfig(
                "garbage.window_size must be ≥ 1".into(),
            ));
        }
        for (name, v) in [
            ("min_letter_ratio", self.min_letter_ratio),
            ("single_letter_word_ratio", self.single_letter_word_ratio),
            ("garbage_word_ratio", self.garbage_word_ratio),
            ("min_vowel_ratio", self.min_vowel_ratio),
            ("truncate_ratio", self.truncate_ratio),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ConvertError::InvalidConfig(format!(
                    "garbage.{name} must be in [0, 1], got {v}"
                )));
            }
        }
        Ok(())
    }
}

// ── OCR ──────────────────────────────────────────────────────────────────

/// Settings for the out-of-process OCR step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Run OCR on PDFs without a usable text layer. Default: true.
    pub enabled: bool,

    /// OCR executable. Default: `ocrmypdf`.
    pub command: String,

    /// Tesseract language list, `+`-separated. Default: `pol+eng`.
    pub languages: String,

    /// Extra arguments passed before the input/output paths.
    pub extra_args: Vec<String>,

    /// A page "has text" with more than this many visible characters. Default: 50.
    pub min_text_chars_per_page: usize,

    /// OCR when fewer than this share of pages have text. Default: 0.10.
    pub min_text_page_ratio: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "ocrmypdf".into(),
            languages: "pol+eng".into(),
            extra_args: Vec::new(),
            min_text_chars_per_page: 50,
            min_text_page_ratio: 0.10,
        }
    }
}

// ── Conversion ───────────────────────────────────────────────────────────

/// Configuration for one conversion run (shared by every file of a batch).
///
/// # Example
/// ```rust
/// use docmd::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .ocr_languages("eng")
///     .redact_margin_annotations(false)
///     .build()
///     .unwrap();
/// assert!(!config.cleanup.redact_margin_annotations);
/// ```
#[derive(Clone, Default)]
pub struct ConversionConfig {
    /// Cleanup-stage thresholds.
    pub cleanup: CleanupConfig,

    /// OCR step settings.
    pub ocr: OcrConfig,

    /// Pages handed to the Markdown extractor. Span analysis always covers
    /// the whole document. Default: all pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Coarse milestone notifications (OCR started/finished, …).
    pub status_callback: Option<StatusCallback>,
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("cleanup", &self.cleanup)
            .field("ocr", &self.ocr)
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "status_callback",
                &self.status_callback.as_ref().map(|_| "<dyn ConversionStatusCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn cleanup(mut self, cleanup: CleanupConfig) -> Self {
        self.config.cleanup = cleanup;
        self
    }

    pub fn ocr(mut self, ocr: OcrConfig) -> Self {
        self.config.ocr = ocr;
        self
    }

    pub fn ocr_enabled(mut self, v: bool) -> Self {
        self.config.ocr.enabled = v;
        self
    }

    pub fn ocr_command(mut self, command: impl Into<String>) -> Self {
        self.config.ocr.command = command.into();
        self
    }

    pub fn ocr_languages(mut self, languages: impl Into<String>) -> Self {
        self.config.ocr.languages = languages.into();
        self
    }

    pub fn redact_margin_annotations(mut self, v: bool) -> Self {
        self.config.cleanup.redact_margin_annotations = v;
        self
    }

    pub fn strip_page_numbers(mut self, v: bool) -> Self {
        self.config.cleanup.strip_page_numbers = v;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn status_callback(mut self, cb: StatusCallback) -> Self {
        self.config.status_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        c.cleanup.validate()?;
        if c.ocr.enabled && c.ocr.command.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "OCR command must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&c.ocr.min_text_page_ratio) {
            return Err(ConvertError::InvalidConfig(format!(
                "min_text_page_ratio must be in [0, 1], got {}",
                c.ocr.min_text_page_ratio
            )));
        }
        if let PageSelection::Range(start, end) = c.pages {
            if start == 0 || start > end {
                return Err(ConvertError::InvalidConfig(format!(
                    "invalid page range {start}-{end}"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to extract as Markdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    pub fn is_all(&self) -> bool {
        matches!(self, PageSelection::All)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = CleanupConfig::default();
        assert_eq!(c.margin_x, 50.0);
        assert_eq!(c.margin_y, 36.0);
        assert_eq!(c.handwriting_font_keywords.len(), 10);
        assert_eq!(c.garbage.window_size, 8);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c: CleanupConfig =
            serde_json::from_str(r#"{"margin_x": 72.0, "garbage": {"window_size": 4}}"#).unwrap();
        assert_eq!(c.margin_x, 72.0);
        assert_eq!(c.margin_y, 36.0);
        assert_eq!(c.garbage.window_size, 4);
        assert_eq!(c.garbage.truncate_ratio, 0.60);
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cleanup.json");
        let mut config = CleanupConfig::default();
        config.strip_page_numbers = false;
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(CleanupConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn builder_rejects_bad_thresholds() {
        let mut cleanup = CleanupConfig::default();
        cleanup.garbage.window_size = 0;
        let err = ConversionConfig::builder().cleanup(cleanup).build().unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));

        let err = ConversionConfig::builder()
            .pages(PageSelection::Range(5, 2))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("5-2"));
    }

    #[test]
    fn page_selection_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(2).to_indices(3), vec![1]);
        assert!(PageSelection::Single(9).to_indices(3).is_empty());
        assert_eq!(PageSelection::Range(2, 10).to_indices(4), vec![1, 2, 3]);
        assert_eq!(PageSelection::Set(vec![3, 1, 3]).to_indices(5), vec![0, 2]);
    }
}
