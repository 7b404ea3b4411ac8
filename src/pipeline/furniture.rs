//! Header/footer and page-number stripping on the Markdown stream.
//!
//! Recurring texts come from [`crate::pipeline::recurring`]; page numbers
//! are recognised by three anchored patterns so that a heading such as
//! `Rozdział 3` (a label plus a digit, but not a page label) survives.

use crate::pipeline::recurring::RecurringText;
use once_cell::sync::Lazy;
use regex::Regex;

static PAGE_NUMBER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // `1`, `- 3 -`, `—2—`
        r"(?i)^[-–—]?\s*\d+\s*[-–—]?$",
        // `Page 4`, `Strona 12`, `str. 3 z 10`, `p. 2 of 9`
        r"(?i)^(page|strona|str\.|p\.)\s*\d+(\s*(/|of|z)\s*\d+)?$",
        // `4 / 10`
        r"^\d+\s*/\s*\d+$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

pub fn is_page_number_line(line: &str) -> bool {
    let s = line.trim_matches(|c: char| c == '*' || c.is_whitespace());
    !s.is_empty() && PAGE_NUMBER_PATTERNS.iter().any(|re| re.is_match(s))
}

pub fn is_recurring_line(line: &str, recurring: &RecurringText) -> bool {
    if recurring.is_empty() {
        return false;
    }
    let s = line.trim_matches(|c: char| c == '*' || c == '#' || c.is_whitespace());
    !s.is_empty() && recurring.contains(s)
}

/// Remove recurring header/footer lines and (optionally) page-number lines.
///
/// Returns the cleaned Markdown and the number of removed lines. A removed
/// line takes one directly following blank line with it.
pub fn strip_page_furniture(
    markdown: &str,
    recurring: &RecurringText,
    strip_page_numbers: bool,
) -> (String, usize) {
    let mut kept: Vec<&str> = Vec::new();
    let mut removed = 0;
    let mut skip_blank = false;

    for line in markdown.lines() {
        if is_recurring_line(line, recurring) || (strip_page_numbers && is_page_number_line(line))
        {
            removed += 1;
            skip_blank = true;
            continue;
        }
        if skip_blank && line.trim().is_empty() {
            skip_blank = false;
            continue;
        }
        skip_blank = false;
        kept.push(line);
    }

    while kept.last().is_some_and(|l| l.trim().is_empty()) {
        kept.pop();
    }
    let mut out = kept.join("\n");
    if markdown.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
    (out, removed)
}
