//! Post-processing: small deterministic Markdown repairs.
//!
//! ## Why a separate module?
//!
//! These rules fix *formatting* artefacts of upstream converters without
//! touching content, and each is a pure `&str → String` pass that can be
//! tested on its own:
//!
//! - word-processor HTML converters emit headerless tables as an empty first
//!   row, which renders as a blank header bar
//! - PDF extractors wrap bold headings in `**`, which is noise inside `#`
//! - HTML → Markdown renderers underline top-level headings (setext style)
//!   while every other stage expects `#` headings
//! - CRLF line endings and invisible Unicode (zero-width spaces, BOM, soft
//!   hyphens) confuse the line-based stages that follow
//!
//! ## Rule Order
//!
//! Normalise line endings and strip invisible characters *before* any
//! line-based stage; the final-newline pass runs last.

use once_cell::sync::Lazy;
use regex::Regex;

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

pub fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

pub fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Strip bold wrapping whole headings ───────────────────────────────

static RE_BOLD_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(#{1,6})[ \t]+\*\*([^*\n]+?)\*\*[ \t]*$").unwrap());

/// `## **Text**` → `## Text`. Partial emphasis inside a heading is kept.
pub fn strip_heading_bold(input: &str) -> String {
    RE_BOLD_HEADING.replace_all(input, "$1 $2").to_string()
}

// ── Rule 4: Repair empty table headers ───────────────────────────────────────

fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') && trimmed.ends_with('|') && trimmed.len() >= 2
}

fn cells(line: &str) -> Vec<&str> {
    let trimmed = line.trim();
    let inner = trimmed
        .strip_prefix('|')
        .and_then(|s| s.strip_suffix('|'))
        .unwrap_or(trimmed);
    inner.split('|').map(str::trim).collect()
}

fn is_separator_row(line: &str) -> bool {
    if !is_table_row(line) || !line.contains('-') {
        return false;
    }
    cells(line).iter().all(|c| {
        let c = c.trim_start_matches(':').trim_end_matches(':');
        !c.is_empty() && c.chars().all(|ch| ch == '-')
    })
}

fn is_empty_header_row(line: &str) -> bool {
    is_table_row(line) && cells(line).iter().all(|c| c.is_empty())
}

/// Promote the first data row of a table whose header row is empty.
///
/// ```text
/// | | |          | A | B |
/// |---|---|  →   |---|---|
/// | A | B |
/// ```
pub fn repair_empty_table_headers(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut result: Vec<&str> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if i + 2 < lines.len()
            && is_empty_header_row(line)
            && is_separator_row(lines[i + 1])
            && is_table_row(lines[i + 2])
            && !is_separator_row(lines[i + 2])
        {
            result.push(lines[i + 2]);
            result.push(lines[i + 1]);
            i += 3;
            continue;
        }
        result.push(line);
        i += 1;
    }

    let mut out = result.join("\n");
    if input.ends_with('\n') {
        out.push('\n');
    }
    out
}

// ── Rule 5: Setext headings to ATX ───────────────────────────────────────────

static RE_SETEXT_UNDERLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ {0,3}(=+|-{2,})[ \t]*$").unwrap());

fn can_be_setext_text(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && !line.starts_with("    ")
        && !trimmed.starts_with(['#', '|', '-', '*', '+', '>'])
        && !trimmed.starts_with("```")
}

/// `Title\n=====` → `# Title`, `Title\n-----` → `## Title`.
///
/// Fenced code is left alone; a dash line after a blank line stays a
/// thematic break.
pub fn setext_headings_to_atx(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut in_fence = false;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        } else if !in_fence && can_be_setext_text(line) {
            let underline = lines.get(i + 1).and_then(|next| RE_SETEXT_UNDERLINE.captures(next));
            if let Some(caps) = underline {
                let level = if caps[1].starts_with('=') { "#" } else { "##" };
                out.push(format!("{level} {}", line.trim()));
                i += 2;
                continue;
            }
        }
        out.push(line.to_string());
        i += 1;
    }

    let mut result = out.join("\n");
    if input.ends_with('\n') {
        result.push('\n');
    }
    result
}

// ── Rule 6: Ensure file ends with single newline ─────────────────────────────

pub fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_strip_heading_bold() {
        assert_eq!(strip_heading_bold("# **Title**"), "# Title");
        assert_eq!(
            strip_heading_bold("text\n### **Sub section**  \nmore"),
            "text\n### Sub section\nmore"
        );
    }

    #[test]
    fn test_heading_partial_bold_kept() {
        let input = "## The **important** part";
        assert_eq!(strip_heading_bold(input), input);
        assert_eq!(strip_heading_bold("**Bold paragraph**"), "**Bold paragraph**");
    }

    #[test]
    fn test_repair_empty_header() {
        assert_eq!(
            repair_empty_table_headers("| | |\n|---|---|\n| A | B |"),
            "| A | B |\n|---|---|"
        );
    }

    #[test]
    fn test_repair_keeps_remaining_rows() {
        let input = "Intro\n|  |  |\n| :--- | ---: |\n| A | B |\n| 1 | 2 |\n";
        assert_eq!(
            repair_empty_table_headers(input),
            "Intro\n| A | B |\n| :--- | ---: |\n| 1 | 2 |\n"
        );
    }

    #[test]
    fn test_table_with_header_unchanged() {
        let input = "| H1 | H2 |\n|---|---|\n| a | b |";
        assert_eq!(repair_empty_table_headers(input), input);
    }

    #[test]
    fn test_setext_headings_to_atx() {
        assert_eq!(
            setext_headings_to_atx("Report\n======\n\nScope\n-----\ntext\n"),
            "# Report\n\n## Scope\ntext\n"
        );
    }

    #[test]
    fn test_setext_leaves_breaks_tables_and_code() {
        let input = "para\n\n---\n\n| A |\n|---|\n```\ncode\n===\n```";
        assert_eq!(setext_headings_to_atx(input), input);
    }

    #[test]
    fn test_ensure_final_newline() {
        assert_eq!(ensure_final_newline("hello"), "hello\n");
        assert_eq!(ensure_final_newline("hello\n\n\n"), "hello\n");
        assert_eq!(ensure_final_newline(""), "\n");
    }
}
