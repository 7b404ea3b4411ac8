//! Span layout → Markdown in the extractor line convention.
//!
//! Output follows the convention the cleanup stages expect: one physical
//! line per Markdown line separated by **two** newlines, and a real
//! paragraph break (a vertical gap noticeably larger than the line spacing)
//! as **three**. Pages are separated by a paragraph break.
//!
//! Structure is inferred from geometry and font names only:
//!
//! - headings: line height relative to the body height (most common line
//!   height weighted by characters), ≥ 1.6 → `#`, ≥ 1.3 → `##`, ≥ 1.15 → `###`
//! - bold: every span's font name says bold/black/heavy → `**text**`
//! - code: runs of monospace lines are fenced, unless suppressed
//! - bullets: `•`, `●`, `▪`, … are normalised to `- `

use crate::backend::ExtractOptions;
use crate::model::{BBox, Page, Span};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[•●▪◦‣·■□\u{F0B7}]\s*").unwrap());

const PARAGRAPH_GAP_RATIO: f32 = 0.7;
const MAX_HEADING_CHARS: usize = 200;
/// Horizontal gap, in span heights, still bridged by [`merge_text_runs`].
const RUN_GAP_RATIO: f32 = 1.0;
const RUN_OVERLAP_RATIO: f32 = 0.5;

#[derive(Debug)]
struct Line {
    text: String,
    bbox: BBox,
    bold: bool,
    mono: bool,
}

fn font_is_bold(font: &str) -> bool {
    let f = font.to_lowercase();
    f.contains("bold") || f.contains("black") || f.contains("heavy")
}

fn font_is_mono(font: &str) -> bool {
    let f = font.to_lowercase();
    ["mono", "courier", "consolas", "menlo", "code"]
        .iter()
        .any(|k| f.contains(k))
}

fn same_line(line: &BBox, span: &BBox) -> bool {
    let overlap = line.y1.min(span.y1) - line.y0.max(span.y0);
    let min_h = line.height().min(span.height());
    (min_h > 0.0 && overlap > 0.5 * min_h) || (span.mid_y() >= line.y0 && span.mid_y() <= line.y1)
}

/// A space goes between two neighbouring pieces of text unless one already
/// carries it or they touch.
fn needs_space(left: &str, right: &str, gap: f32, height: f32) -> bool {
    !left.ends_with(char::is_whitespace)
        && !right.starts_with(char::is_whitespace)
        && gap > 0.15 * height.max(1.0)
}

fn build_line(mut spans: Vec<&Span>) -> Line {
    spans.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));

    let mut text = String::new();
    let mut bbox = spans[0].bbox;
    let mut prev: Option<&Span> = None;
    for span in &spans {
        if let Some(p) = prev {
            if needs_space(&text, &span.text, span.bbox.x0 - p.bbox.x1, span.bbox.height()) {
                text.push(' ');
            }
            bbox = bbox.union(&span.bbox);
        }
        text.push_str(&span.text);
        prev = Some(span);
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    Line {
        text: collapsed,
        bbox,
        bold: spans.iter().all(|s| font_is_bold(&s.font)),
        mono: spans.iter().all(|s| font_is_mono(&s.font)),
    }
}

fn continues_run(last: &Span, next: &Span) -> bool {
    let h = last.bbox.height().max(next.bbox.height()).max(1.0);
    let gap = next.bbox.x0 - last.bbox.x1;
    last.font == next.font
        && same_line(&last.bbox, &next.bbox)
        && gap >= -RUN_OVERLAP_RATIO * h
        && gap <= RUN_GAP_RATIO * h
}

/// Merge text fragments into spans.
///
/// Producers often write one text object per word or kerning run. Each
/// span that follows the previous one in content order, in the same font,
/// on the same line and within about a word gap, is appended to it. The
/// merged text has its whitespace collapsed.
pub fn merge_text_runs(spans: Vec<Span>) -> Vec<Span> {
    let mut out: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if let Some(last) = out.last_mut().filter(|l| continues_run(l, &span)) {
            let gap = span.bbox.x0 - last.bbox.x1;
            let mut text = std::mem::take(&mut last.text);
            if needs_space(&text, &span.text, gap, span.bbox.height()) {
                text.push(' ');
            }
            text.push_str(&span.text);
            last.text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            last.bbox = last.bbox.union(&span.bbox);
            continue;
        }
        out.push(span);
    }
    out
}

fn group_lines(page: &Page) -> Vec<Line> {
    let mut spans: Vec<&Span> = page.spans.iter().filter(|s| !s.text.trim().is_empty()).collect();
    spans.sort_by(|a, b| {
        a.bbox
            .y0
            .total_cmp(&b.bbox.y0)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let mut groups: Vec<(BBox, Vec<&Span>)> = Vec::new();
    for span in spans {
        match groups.last_mut() {
            Some((bbox, members)) if same_line(bbox, &span.bbox) => {
                *bbox = bbox.union(&span.bbox);
                members.push(span);
            }
            _ => groups.push((span.bbox, vec![span])),
        }
    }
    groups.into_iter().map(|(_, members)| build_line(members)).collect()
}

/// Most common line height, weighted by characters, in half-point buckets.
fn body_height<'a>(lines: impl IntoIterator<Item = &'a Line>) -> f32 {
    let mut buckets: Vec<(i32, usize)> = Vec::new();
    for line in lines {
        let key = (line.bbox.height() * 2.0).round() as i32;
        let chars = line.text.chars().count();
        match buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, n)) => *n += chars,
            None => buckets.push((key, chars)),
        }
    }
    let mut best: Option<(i32, usize)> = None;
    for &(k, n) in &buckets {
        if best.is_none_or(|(_, b)| n > b) {
            best = Some((k, n));
        }
    }
    best.map(|(k, _)| k as f32 / 2.0).unwrap_or(0.0)
}

fn heading_level(line: &Line, body: f32) -> Option<usize> {
    if body <= 0.0 || line.text.chars().count() > MAX_HEADING_CHARS {
        return None;
    }
    let ratio = line.bbox.height() / body;
    if ratio >= 1.6 {
        Some(1)
    } else if ratio >= 1.3 {
        Some(2)
    } else if ratio >= 1.15 {
        Some(3)
    } else {
        None
    }
}

fn format_line(line: &Line, body: f32) -> (String, bool) {
    let text = RE_BULLET.replace(&line.text, "- ").into_owned();
    if let Some(level) = heading_level(line, body) {
        let inner = if line.bold { format!("**{text}**") } else { text };
        return (format!("{} {inner}", "#".repeat(level)), true);
    }
    if line.bold && !text.starts_with("- ") {
        return (format!("**{text}**"), false);
    }
    (text, false)
}

fn render_page(lines: &[Line], body: f32, suppress_code_fences: bool) -> String {
    let mut out = String::new();
    let mut prev: Option<&Line> = None;
    let mut prev_heading = false;
    let mut in_code = false;

    for line in lines {
        let code = line.mono && !suppress_code_fences;

        if let Some(p) = prev {
            if in_code && code {
                out.push('\n');
                out.push_str(&line.text);
                prev = Some(line);
                continue;
            }
            if in_code {
                out.push_str("\n```");
                in_code = false;
            }
            let gap = line.bbox.y0 - p.bbox.y1;
            if prev_heading || gap > PARAGRAPH_GAP_RATIO * body {
                out.push_str("\n\n\n");
            } else {
                out.push_str("\n\n");
            }
        }

        if code {
            out.push_str("```\n");
            out.push_str(&line.text);
            in_code = true;
            prev_heading = false;
        } else {
            let (text, is_heading) = format_line(line, body);
            if is_heading && !out.is_empty() && !out.ends_with("\n\n\n") {
                out.push('\n');
            }
            out.push_str(&text);
            prev_heading = is_heading;
        }
        prev = Some(line);
    }
    if in_code {
        out.push_str("\n```");
    }
    out
}

/// Render the selected pages as Markdown.
pub fn render_markdown(pages: &[Page], opts: &ExtractOptions) -> String {
    let selected: Vec<&Page> = match &opts.pages {
        Some(indices) => indices.iter().filter_map(|&i| pages.get(i)).collect(),
        None => pages.iter().collect(),
    };

    let page_lines: Vec<Vec<Line>> = selected.iter().map(|p| group_lines(p)).collect();
    let body = body_height(page_lines.iter().flatten());

    page_lines
        .iter()
        .map(|lines| render_page(lines, body, opts.suppress_code_fences))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x0: f32, y0: f32, h: f32, font: &str) -> Span {
        let w = text.chars().count() as f32 * h * 0.5;
        Span::new(text, BBox::new(x0, y0, x0 + w, y0 + h), font)
    }

    fn render(pages: Vec<Page>) -> String {
        render_markdown(&pages, &ExtractOptions::default())
    }

    #[test]
    fn lines_and_paragraph_gaps() {
        let page = Page::new(
            595.0,
            842.0,
            vec![
                span("first line of text", 72.0, 100.0, 12.0, "Times"),
                span("second line", 72.0, 114.0, 12.0, "Times"),
                // 20pt gap: new paragraph
                span("next paragraph", 72.0, 146.0, 12.0, "Times"),
            ],
        );
        assert_eq!(
            render(vec![page]),
            "first line of text\n\nsecond line\n\n\nnext paragraph"
        );
    }

    #[test]
    fn spans_on_one_line_are_joined_left_to_right() {
        let page = Page::new(
            595.0,
            842.0,
            vec![
                span("world", 140.0, 100.0, 12.0, "Times"),
                span("Hello", 72.0, 100.5, 12.0, "Times"),
            ],
        );
        assert_eq!(render(vec![page]), "Hello world");
    }

    #[test]
    fn large_bold_line_becomes_heading() {
        let page = Page::new(
            595.0,
            842.0,
            vec![
                span("Annual Report", 72.0, 60.0, 24.0, "Arial-BoldMT"),
                span("body text one", 72.0, 100.0, 12.0, "Times"),
                span("body text two", 72.0, 114.0, 12.0, "Times"),
            ],
        );
        assert_eq!(
            render(vec![page]),
            "# **Annual Report**\n\n\nbody text one\n\nbody text two"
        );
    }

    #[test]
    fn monospace_lines_are_fenced_unless_suppressed() {
        let page = Page::new(
            595.0,
            842.0,
            vec![
                span("Example:", 72.0, 100.0, 12.0, "Times"),
                span("let x = 1;", 72.0, 114.0, 12.0, "CourierNew"),
                span("let y = 2;", 72.0, 128.0, 12.0, "CourierNew"),
                span("done", 72.0, 142.0, 12.0, "Times"),
            ],
        );
        let pages = vec![page];
        assert_eq!(
            render_markdown(&pages, &ExtractOptions::default()),
            "Example:\n\n```\nlet x = 1;\nlet y = 2;\n```\n\ndone"
        );
        let suppressed = ExtractOptions {
            suppress_code_fences: true,
            ..Default::default()
        };
        assert!(!render_markdown(&pages, &suppressed).contains("```"));
    }

    #[test]
    fn bullets_are_normalised() {
        let page = Page::new(595.0, 842.0, vec![span("• item", 72.0, 100.0, 12.0, "Times")]);
        assert_eq!(render(vec![page]), "- item");
    }

    #[test]
    fn page_selection_and_separator() {
        let pages = vec![
            Page::new(595.0, 842.0, vec![span("one", 72.0, 100.0, 12.0, "Times")]),
            Page::new(595.0, 842.0, vec![span("two", 72.0, 100.0, 12.0, "Times")]),
            Page::new(595.0, 842.0, vec![span("three", 72.0, 100.0, 12.0, "Times")]),
        ];
        assert_eq!(render(pages.clone()), "one\n\n\ntwo\n\n\nthree");
        let opts = ExtractOptions {
            pages: Some(vec![2, 0]),
            ..Default::default()
        };
        assert_eq!(render_markdown(&pages, &opts), "three\n\n\none");
    }

    #[test]
    fn word_fragments_merge_into_one_span() {
        let spans = vec![
            Span::new("ACME", BBox::new(72.0, 800.0, 100.0, 810.0), "Arial"),
            Span::new("Corp", BBox::new(104.0, 800.0, 130.0, 810.0), "Arial"),
            Span::new("Ltd", BBox::new(300.0, 800.0, 320.0, 810.0), "Arial"),
            Span::new("JK", BBox::new(134.0, 800.0, 150.0, 810.0), "BrushScriptMT"),
        ];
        let merged = merge_text_runs(spans);
        let texts: Vec<&str> = merged.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["ACME Corp", "Ltd", "JK"]);
        assert_eq!(merged[0].bbox, BBox::new(72.0, 800.0, 130.0, 810.0));
    }

    #[test]
    fn fragments_on_different_lines_stay_apart() {
        let spans = vec![
            Span::new("first", BBox::new(72.0, 100.0, 100.0, 112.0), "Times"),
            Span::new("second", BBox::new(72.0, 114.0, 110.0, 126.0), "Times"),
        ];
        assert_eq!(merge_text_runs(spans).len(), 2);
    }
}
