//! CLI binary for docmd.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, converts every input in order and auto-saves each
//! result as `<output-dir>/<stem>.md`.

use anyhow::{Context, Result};
use clap::Parser;
use docmd::batch::output_path_for;
use docmd::convert::write_markdown;
use docmd::{
    convert_batch, BatchSummary, CleanupConfig, ConversionConfig, ConversionOutput,
    ConversionStatusCallback, DocumentFailure, PageSelection, StatusCallback,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI status callback using indicatif ──────────────────────────────────────

/// Terminal status callback: one bar step per document, with the current
/// milestone (OCR, redaction) as the bar message.
struct CliStatusCallback {
    bar: ProgressBar,
}

impl CliStatusCallback {
    fn new(total: usize) -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionStatusCallback for CliStatusCallback {
    fn on_document_start(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_ocr_start(&self, name: &str) {
        self.bar.set_message(format!("{name}: OCR…"));
    }

    fn on_ocr_complete(&self, name: &str, applied: bool) {
        if !applied {
            self.bar.println(format!(
                "  {} {name}: OCR skipped, text layer already present",
                cyan("ℹ")
            ));
        }
    }

    fn on_redaction(&self, name: &str, spans_removed: usize) {
        self.bar.set_message(format!(
            "{name}: redacted {spans_removed} margin annotations"
        ));
    }

    fn on_document_complete(&self, name: &str, markdown_len: usize) {
        self.bar.println(format!(
            "  {} {:<40}  {}",
            green("✓"),
            name,
            dim(&format!("{markdown_len:>7} bytes")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, name: &str, error: &str) {
        // First line only; remediation text is printed in the final summary.
        let first = error.lines().next().unwrap_or(error);
        self.bar
            .println(format!("  {} {:<40}  {}", red("✗"), name, red(first)));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert into ./outputs/contract.md
  docmd contract.pdf

  # Several documents, custom output directory
  docmd scans/*.pdf notes.docx --output-dir md/

  # Print Markdown instead of saving
  docmd --stdout report.docx

  # Skip OCR for scanned PDFs
  docmd --no-ocr scan.pdf

  # Tune cleanup thresholds
  docmd --config thresholds.json contract.pdf

  # JSON output (per-document reports + batch summary)
  docmd --json a.pdf b.pdf > result.json

ENVIRONMENT VARIABLES:
  DOCMD_OUTPUT_DIR     Default for --output-dir
  DOCMD_OCR_LANGUAGES  Tesseract languages (default: pol+eng)
  DOCMD_OCR_COMMAND    OCR executable (default: ocrmypdf)
  DOCMD_CONFIG         Cleanup thresholds JSON file
  PDFIUM_LIB_PATH      Path to libpdfium (else ./ then the system library)
  RUST_LOG             Log filter (overrides --verbose / --quiet)

SETUP:
  pdfium:   download a build from bblanchon/pdfium-binaries and put
            libpdfium next to the binary or set PDFIUM_LIB_PATH.
  OCR:      apt install ocrmypdf tesseract-ocr-pol   (Debian/Ubuntu)
            brew install ocrmypdf tesseract-lang     (macOS)
"#;

/// Convert PDF and DOCX documents to clean Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "docmd",
    version,
    about = "Convert PDF and DOCX documents to clean Markdown",
    long_about = "Convert PDF and DOCX documents to clean, faithful Markdown. PDFs are \
reconstructed from positioned text: broken lines are re-joined, page numbers and running \
headers removed, handwritten margin notes redacted and OCR noise filtered. Scanned PDFs \
are sent through ocrmypdf first.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF or DOCX files to convert.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for `<stem>.md` results.
    #[arg(short, long, env = "DOCMD_OUTPUT_DIR", default_value = "outputs")]
    output_dir: PathBuf,

    /// Print Markdown to stdout instead of saving files.
    #[arg(long, env = "DOCMD_STDOUT")]
    stdout: bool,

    /// Page selection for the Markdown output: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "DOCMD_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOCMD_PASSWORD")]
    password: Option<String>,

    /// Never run OCR, even for PDFs without a text layer.
    #[arg(long, env = "DOCMD_NO_OCR")]
    no_ocr: bool,

    /// Tesseract language codes passed to the OCR tool.
    #[arg(long, env = "DOCMD_OCR_LANGUAGES")]
    ocr_languages: Option<String>,

    /// OCR executable.
    #[arg(long, env = "DOCMD_OCR_COMMAND")]
    ocr_command: Option<String>,

    /// Keep margin annotations (handwriting, dates, amounts near the edge).
    #[arg(long, env = "DOCMD_KEEP_ANNOTATIONS")]
    keep_annotations: bool,

    /// Keep page-number lines.
    #[arg(long, env = "DOCMD_KEEP_PAGE_NUMBERS")]
    keep_page_numbers: bool,

    /// JSON file with cleanup thresholds (any subset of the fields).
    #[arg(long, env = "DOCMD_CONFIG")]
    config: Option<PathBuf>,

    /// Output structured JSON (reports + summary) instead of Markdown.
    #[arg(long, env = "DOCMD_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOCMD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCMD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCMD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.stdout;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(|| CliStatusCallback::new(cli.inputs.len()));
    let status: Option<StatusCallback> = progress
        .as_ref()
        .map(|cb| Arc::clone(cb) as Arc<dyn ConversionStatusCallback>);
    let config = build_config(&cli, status)?;

    // ── Run batch ────────────────────────────────────────────────────────
    let start = Instant::now();
    let mut summary = BatchSummary::default();
    let mut outputs: Vec<ConversionOutput> = Vec::new();
    let mut results = convert_batch(cli.inputs.clone(), &config);

    while let Some((path, result)) = results.next().await {
        let output = match result {
            Ok(output) => output,
            Err(e) => {
                summary.record_failure(DocumentFailure::new(path.display().to_string(), &e));
                continue;
            }
        };

        if cli.stdout {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(output.markdown.as_bytes())
                .context("Failed to write to stdout")?;
        } else {
            let target = output_path_for(&cli.output_dir, &path);
            if let Err(e) = write_markdown(&target, &output.markdown).await {
                summary.record_failure(DocumentFailure::new(path.display().to_string(), &e));
                continue;
            }
        }

        summary.record_success(&output);
        if cli.json {
            outputs.push(output);
        }
    }
    summary.total_duration_ms = start.elapsed().as_millis() as u64;

    if let Some(cb) = progress {
        cb.bar.finish_and_clear();
    }

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::json!({ "documents": outputs, "summary": summary });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        print_summary(&summary, &cli);
    }

    if !summary.all_succeeded() {
        anyhow::bail!(
            "{} of {} documents failed",
            summary.failed(),
            summary.total
        );
    }
    Ok(())
}

fn print_summary(summary: &BatchSummary, cli: &Cli) {
    for failure in &summary.failures {
        eprintln!("{} {}", red("✘"), bold(&failure.source));
        for line in failure.error.lines() {
            eprintln!("    {line}");
        }
    }
    let tick = if summary.all_succeeded() {
        green("✔")
    } else {
        cyan("⚠")
    };
    let destination = if cli.stdout {
        String::from("stdout")
    } else {
        cli.output_dir.display().to_string()
    };
    eprintln!(
        "{} {}/{} documents converted  {}ms  →  {}",
        tick,
        bold(&summary.succeeded.to_string()),
        summary.total,
        summary.total_duration_ms,
        bold(&destination),
    );
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, status: Option<StatusCallback>) -> Result<ConversionConfig> {
    let cleanup = match cli.config {
        Some(ref path) => CleanupConfig::from_json_file(path)
            .with_context(|| format!("Failed to load cleanup config from {:?}", path))?,
        None => CleanupConfig::default(),
    };

    let mut builder = ConversionConfig::builder()
        .cleanup(cleanup)
        .ocr_enabled(!cli.no_ocr)
        .pages(parse_pages(&cli.pages)?);

    if cli.keep_annotations {
        builder = builder.redact_margin_annotations(false);
    }
    if cli.keep_page_numbers {
        builder = builder.strip_page_numbers(false);
    }
    if let Some(ref languages) = cli.ocr_languages {
        builder = builder.ocr_languages(languages);
    }
    if let Some(ref command) = cli.ocr_command {
        builder = builder.ocr_command(command);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = status {
        builder = builder.status_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;
        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;
        if pages.contains(&0) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1");
        }
        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }
    Ok(PageSelection::Single(page))
}
