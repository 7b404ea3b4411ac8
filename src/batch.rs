//! Batch conversion: many files, one result per file.
//!
//! ## Why a stream?
//!
//! A batch of scanned contracts can take many minutes. Yielding each result
//! as soon as its document finishes lets callers save files, update a
//! progress bar or log failures incrementally instead of waiting for the
//! whole batch.
//!
//! Documents are processed one after another, in input order. A failure is
//! just another item in the stream; it never stops the batch.

use crate::config::ConversionConfig;
use crate::convert::convert;
use crate::error::ConvertError;
use crate::output::ConversionOutput;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::info;

/// One batch item: the input path and its conversion result.
pub type BatchItem = (PathBuf, Result<ConversionOutput, ConvertError>);

/// A boxed stream of batch items, in input order.
pub type BatchStream = Pin<Box<dyn Stream<Item = BatchItem> + Send>>;

/// Convert `paths` sequentially, yielding each result as it completes.
///
/// # Example
/// ```rust,no_run
/// use docmd::{convert_batch, ConversionConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() {
/// let paths = vec!["a.pdf".into(), "b.docx".into()];
/// let mut results = convert_batch(paths, &ConversionConfig::default());
/// while let Some((path, result)) = results.next().await {
///     match result {
///         Ok(out) => println!("{}: {} bytes", path.display(), out.markdown.len()),
///         Err(e) => eprintln!("{}: {e}", path.display()),
///     }
/// }
/// # }
/// ```
pub fn convert_batch(paths: Vec<PathBuf>, config: &ConversionConfig) -> BatchStream {
    info!("Starting batch of {} documents", paths.len());
    let config = config.clone();
    let s = stream::iter(paths).then(move |path| {
        let cfg = config.clone();
        async move {
            let result = convert(&path, &cfg).await;
            (path, result)
        }
    });
    Box::pin(s)
}

/// Auto-save location for a converted document: `<output_dir>/<stem>.md`.
pub fn output_path_for(output_dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    output_dir.join(format!("{stem}.md"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::BatchSummary;
    use crate::error::DocumentFailure;

    #[test]
    fn output_path_uses_file_stem() {
        assert_eq!(
            output_path_for(Path::new("outputs"), Path::new("/in/Umowa najmu.pdf")),
            PathBuf::from("outputs/Umowa najmu.md")
        );
        assert_eq!(
            output_path_for(Path::new("out"), Path::new("report.docx")),
            PathBuf::from("out/report.md")
        );
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "not a document").unwrap();
        let paths = vec![dir.path().join("missing.pdf"), txt.clone()];

        let results: Vec<BatchItem> = convert_batch(paths.clone(), &ConversionConfig::default())
            .collect()
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, paths[0]);
        assert!(matches!(results[0].1, Err(ConvertError::FileNotFound { .. })));
        assert_eq!(results[1].0, txt);
        assert!(matches!(results[1].1, Err(ConvertError::UnsupportedFormat { .. })));

        let mut summary = BatchSummary::default();
        for (path, result) in &results {
            match result {
                Ok(out) => summary.record_success(out),
                Err(e) => summary.record_failure(DocumentFailure::new(path.display().to_string(), e)),
            }
        }
        assert_eq!(summary.failed(), 2);
        assert!(!summary.all_succeeded());
    }
}
