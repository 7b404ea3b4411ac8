//! OCR garbage filter: drop recognition noise, truncate degraded tails.
//!
//! ## Why truncate instead of filtering line by line?
//!
//! Low-quality scans often end in an appendix (stamps, a photocopied form,
//! a faded attachment) that OCR turns into pages of near-random characters.
//! Line-level filtering removes most of it but leaves plausible-looking
//! fragments scattered through the tail. Once noise dominates a sliding
//! window of recent lines the rest of the document is treated as unusable
//! and cut; isolated noise before that point is dropped individually.
//!
//! Only OCR-sourced documents go through this stage. Structural lines
//! (headings, tables, list items, code fences, rules) are always trusted.

use crate::config::GarbageThresholds;
use crate::pipeline::paragraphs::is_structural_line;
use std::collections::VecDeque;

/// Output of [`filter_ocr_garbage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GarbageFilterResult {
    pub markdown: String,
    /// Garbage lines removed individually before any truncation point.
    pub dropped_lines: usize,
    /// 0-based input line where the document was cut, if it was.
    pub truncated_at: Option<usize>,
}

fn lower_to_upper_transitions(word: &str) -> usize {
    word.chars()
        .zip(word.chars().skip(1))
        .filter(|(a, b)| a.is_lowercase() && b.is_uppercase())
        .count()
}

/// A word is garbage when it has almost no vowels, is absurdly long, or is
/// several words glued together (`fooBarBaz`).
pub fn is_garbage_word(word: &str, t: &GarbageThresholds) -> bool {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    let n = letters.len();

    if n >= t.vowel_min_letters {
        let vowels = letters.iter().filter(|c| t.vowels.contains(**c)).count();
        if (vowels as f32) / (n as f32) < t.min_vowel_ratio {
            return true;
        }
    }
    if n > t.long_word_len {
        return true;
    }
    lower_to_upper_transitions(word) >= t.max_case_transitions
}

fn strip_emphasis(line: &str) -> String {
    line.replace("**", "")
        .replace("__", "")
        .trim_matches(|c: char| c == '*' || c == '_' || c.is_whitespace())
        .to_string()
}

/// Classify one Markdown line as OCR noise. Blank and structural lines never are.
pub fn is_garbage_line(line: &str, t: &GarbageThresholds) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() || is_structural_line(trimmed) {
        return false;
    }

    let content = strip_emphasis(trimmed);
    let len = content.chars().count();
    if len <= t.max_noise_len {
        return true;
    }

    let letters = content.chars().filter(|c| c.is_alphabetic()).count();
    if len > t.letter_ratio_min_len && (letters as f32) / (len as f32) < t.min_letter_ratio {
        return true;
    }

    if content.matches('|').count() >= t.max_pipes {
        return true;
    }

    let words: Vec<&str> = content.split_whitespace().collect();
    let n = words.len();

    if n >= t.single_letter_min_words {
        let single = words
            .iter()
            .filter(|w| {
                let mut chars = w.chars();
                matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic())
            })
            .count();
        if (single as f32) / (n as f32) >= t.single_letter_word_ratio {
            return true;
        }
    }

    if n <= t.long_word_max_words && words.iter().any(|w| w.chars().count() > t.long_word_len) {
        return true;
    }

    match n {
        0 => false,
        1 => is_garbage_word(words[0], t),
        _ => {
            let garbage = words.iter().filter(|w| is_garbage_word(w, t)).count();
            (garbage as f32) / (n as f32) > t.garbage_word_ratio
        }
    }
}

/// Drop isolated noise lines and cut the document where noise takes over.
///
/// A dropped line takes one directly following blank line with it so the
/// paragraph spacing of the surrounding text is unchanged.
pub fn filter_ocr_garbage(markdown: &str, t: &GarbageThresholds) -> GarbageFilterResult {
    let lines: Vec<&str> = markdown.lines().collect();
    let flags: Vec<bool> = lines.iter().map(|l| is_garbage_line(l, t)).collect();

    // Sliding window over (line index, is_garbage) of non-blank lines.
    let mut window: VecDeque<(usize, bool)> = VecDeque::with_capacity(t.window_size + 1);
    let mut truncated_at = None;

    for (idx, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        window.push_back((idx, flags[idx]));
        if window.len() > t.window_size {
            window.pop_front();
        }
        if window.len() < t.window_size {
            continue;
        }
        let garbage = window.iter().filter(|(_, g)| *g).count();
        if (garbage as f32) / (window.len() as f32) > t.truncate_ratio {
            truncated_at = window.iter().find(|(_, g)| *g).map(|(i, _)| *i);
            break;
        }
    }

    let end = truncated_at.unwrap_or(lines.len());
    let mut kept: Vec<&str> = Vec::with_capacity(end);
    let mut dropped_lines = 0;
    let mut skip_blank = false;

    for (line, &garbage) in lines[..end].iter().zip(&flags[..end]) {
        if garbage {
            dropped_lines += 1;
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

    if let Some(at) = truncated_at {
        tracing::debug!(line = at, dropped = dropped_lines, "OCR noise dominates, truncating");
    }

    let mut markdown = kept.join("\n");
    if !markdown.is_empty() {
        markdown.push('\n');
    }
    GarbageFilterResult {
        markdown,
        dropped_lines,
        truncated_at,
    }
}
