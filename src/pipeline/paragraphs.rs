//! Paragraph reconstruction: merge physically broken lines back into prose.
//!
//! ## The extractor's line convention
//!
//! The PDF extractor emits every physical line of the page as its own
//! Markdown line separated by **two** newlines, and marks a real paragraph
//! break with **three or more**. Rendered as-is, every line of a justified
//! paragraph becomes its own paragraph. This module undoes that:
//!
//! 1. Split on `\n{3,}` into blocks (one block = one real paragraph run).
//! 2. Drop blank lines inside a block.
//! 3. Blocks that start inside a code fence are emitted verbatim.
//! 4. Otherwise scan the lines: headings, tables, rules and images stand
//!    alone; a list item starts an accumulator that swallows the following
//!    prose lines; other prose lines are space-joined into one paragraph.
//! 5. A block whose first line continues the previous block's trailing list
//!    item is glued onto it instead of starting a new paragraph. The item
//!    stays open, so a wrapped item split over several blocks is rebuilt
//!    whole.
//! 6. Blocks are joined with a blank line; the result ends with one newline.
//!
//! Merging never crosses a structural line, so the worst outcome is an
//! under-merged paragraph, never a corrupted heading, table or code block.
//!
//! The continuation check in step 5 leans on Latin-script capitalisation
//! (a lowercase first letter means "same sentence"). Scripts without case
//! fall back to the "does not look like a new item" test alone.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_PARA_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

static RE_LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+\.|[-*+])\s").unwrap());

/// Markers that open a new item even though they are not Markdown list syntax
/// (`a)`, `1)`, `•`, `–`).
static RE_ITEM_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+[.)]|[a-zA-Z][.)]|[•◦▪‣–])\s").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Structural,
    TableRow,
    ListItem,
    Prose,
    Code,
}

#[derive(Debug)]
struct Element {
    kind: Kind,
    text: String,
}

fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// True for lines that must never be merged with their neighbours.
pub fn is_structural_line(line: &str) -> bool {
    let s = line.trim();
    s.starts_with('#')
        || s.starts_with('|')
        || s.starts_with("```")
        || s.starts_with("---")
        || s.starts_with("***")
        || s.starts_with("___")
        || s.starts_with("![")
        || RE_LIST_ITEM.is_match(s)
}

fn continues_list_item(first_line: &str) -> bool {
    let s = first_line.trim();
    if is_structural_line(s) {
        return false;
    }
    let starts_lower = s.chars().next().is_some_and(char::is_lowercase);
    starts_lower || !RE_ITEM_LIKE.is_match(s)
}

fn flush(acc: &mut Option<Element>, out: &mut Vec<Element>) {
    if let Some(e) = acc.take() {
        out.push(e);
    }
}

fn merge_block(lines: &[&str], in_fence: &mut bool) -> Vec<Element> {
    let mut out = Vec::new();
    let mut acc: Option<Element> = None;
    let mut fence: Option<Vec<&str>> = None;

    for &line in lines {
        if let Some(code) = fence.as_mut() {
            code.push(line.trim_end());
            if is_fence(line) {
                out.push(Element {
                    kind: Kind::Code,
                    text: code.join("\n"),
                });
                fence = None;
            }
            continue;
        }
        if is_fence(line) {
            flush(&mut acc, &mut out);
            fence = Some(vec![line.trim_end()]);
            continue;
        }

        let trimmed = line.trim();
        if RE_LIST_ITEM.is_match(trimmed) {
            flush(&mut acc, &mut out);
            acc = Some(Element {
                kind: Kind::ListItem,
                text: line.trim_end().to_string(),
            });
        } else if is_structural_line(trimmed) {
            flush(&mut acc, &mut out);
            let kind = if trimmed.starts_with('|') {
                Kind::TableRow
            } else {
                Kind::Structural
            };
            out.push(Element {
                kind,
                text: line.trim_end().to_string(),
            });
        } else {
            match acc.as_mut() {
                Some(e) => {
                    e.text.push(' ');
                    e.text.push_str(trimmed);
                }
                None => {
                    acc = Some(Element {
                        kind: Kind::Prose,
                        text: trimmed.to_string(),
                    })
                }
            }
        }
    }
    flush(&mut acc, &mut out);

    // Fence still open at the end of the block: keep what we have and let
    // the caller treat following blocks as code until it closes.
    if let Some(code) = fence {
        out.push(Element {
            kind: Kind::Code,
            text: code.join("\n"),
        });
        *in_fence = true;
    }
    out
}

/// Append `elements` to `buf`, one blank line apart, except adjacent table
/// rows which stay on consecutive lines so the table remains valid.
fn push_elements<'a>(
    buf: &mut String,
    mut prev: Option<Kind>,
    elements: impl Iterator<Item = &'a Element>,
) {
    for e in elements {
        match prev {
            None => {}
            Some(Kind::TableRow) if e.kind == Kind::TableRow => buf.push('\n'),
            Some(_) => buf.push_str("\n\n"),
        }
        buf.push_str(&e.text);
        prev = Some(e.kind);
    }
}

/// Merge physically broken lines into paragraphs and list items.
pub fn merge_broken_lines(markdown: &str) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut prev_ends_in_list = false;
    let mut in_fence = false;

    for raw in RE_PARA_BREAK.split(markdown) {
        let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
        let Some(first) = lines.first() else {
            continue;
        };

        if in_fence || is_fence(first) {
            for line in &lines {
                if is_fence(line) {
                    in_fence = !in_fence;
                }
            }
            let verbatim: Vec<&str> = lines.iter().map(|l| l.trim_end()).collect();
            blocks.push(verbatim.join("\n"));
            prev_ends_in_list = false;
            continue;
        }

        let continues = prev_ends_in_list && continues_list_item(first);
        let elements = merge_block(&lines, &mut in_fence);
        let ends_in_list = elements.last().is_some_and(|e| e.kind == Kind::ListItem);

        match blocks.last_mut() {
            Some(prev) if continues => {
                let mut iter = elements.iter();
                if let Some(head) = iter.next() {
                    prev.push(' ');
                    prev.push_str(&head.text);
                }
                push_elements(prev, Some(Kind::ListItem), iter);
                // A lone head was absorbed, so the item is still last.
                prev_ends_in_list = elements.len() == 1 || ends_in_list;
            }
            _ => {
                let mut buf = String::new();
                push_elements(&mut buf, None, elements.iter());
                blocks.push(buf);
                prev_ends_in_list = ends_in_list;
            }
        }
    }

    let joined = blocks.join("\n\n");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{trimmed}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_physical_lines_of_one_paragraph() {
        let input = "The quick brown\n\nfox jumps over\n\nthe lazy dog.\n\n\nSecond paragraph.";
        assert_eq!(
            merge_broken_lines(input),
            "The quick brown fox jumps over the lazy dog.\n\nSecond paragraph.\n"
        );
    }

    #[test]
    fn heading_stands_alone() {
        let input = "# Title\n\nFirst half of a sentence\n\nand its second half.";
        assert_eq!(
            merge_broken_lines(input),
            "# Title\n\nFirst half of a sentence and its second half.\n"
        );
    }

    #[test]
    fn list_item_absorbs_wrapped_lines() {
        let input = "- first item that\n\nwraps onto a second line\n\n- second item\n\n1. numbered";
        assert_eq!(
            merge_broken_lines(input),
            "- first item that wraps onto a second line\n\n- second item\n\n1. numbered\n"
        );
    }

    #[test]
    fn list_item_continues_across_blocks() {
        let input = "- item whose text\n\n\ncontinues after a spurious break\n\n\n## Next section";
        assert_eq!(
            merge_broken_lines(input),
            "- item whose text continues after a spurious break\n\n## Next section\n"
        );
    }

    #[test]
    fn list_item_continues_over_several_blocks() {
        let input = "- item whose text\n\n\ncontinues here\n\n\nand still continues";
        assert_eq!(
            merge_broken_lines(input),
            "- item whose text continues here and still continues\n"
        );

        let input = "- first\n\n\ncont one\n\n\ncont two\n\n\n- second";
        assert_eq!(
            merge_broken_lines(input),
            "- first cont one cont two\n\n- second\n"
        );
    }

    #[test]
    fn new_item_marker_is_not_a_continuation() {
        let input = "- item one\n\n\na) another point";
        // lowercase start wins: still a continuation
        assert_eq!(merge_broken_lines(input), "- item one a) another point\n");

        let input = "- item one\n\n\nB) another point";
        assert_eq!(merge_broken_lines(input), "- item one\n\nB) another point\n");

        let input = "- item one\n\n\n# Heading";
        assert_eq!(merge_broken_lines(input), "- item one\n\n# Heading\n");
    }

    #[test]
    fn uppercase_plain_text_still_continues_list() {
        let input = "- Warsaw office\n\n\nBuilding C, floor 2";
        assert_eq!(merge_broken_lines(input), "- Warsaw office Building C, floor 2\n");
    }

    #[test]
    fn table_rows_stay_intact() {
        let input = "Intro\n\n| a | b |\n\n|---|---|\n\n| 1 | 2 |\n\nOutro";
        assert_eq!(
            merge_broken_lines(input),
            "Intro\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\nOutro\n"
        );
    }

    #[test]
    fn code_block_emitted_verbatim() {
        let input = "```\nlet  x = 1;\n\nlet y = 2;\n```\n\n\nAfter code";
        assert_eq!(
            merge_broken_lines(input),
            "```\nlet  x = 1;\nlet y = 2;\n```\n\nAfter code\n"
        );
    }

    #[test]
    fn mid_block_fence_is_not_reflowed() {
        let input = "Intro line\n\n```\nfn a()  {}\n\nfn b() {}\n```\n\ntext after";
        assert_eq!(
            merge_broken_lines(input),
            "Intro line\n\n```\nfn a()  {}\nfn b() {}\n```\n\ntext after\n"
        );
    }

    #[test]
    fn open_fence_carries_into_next_block() {
        let input = "```\nfn a() {\n\n\n    body();\n}\n```\n\n\nprose one\n\nprose two";
        let out = merge_broken_lines(input);
        assert!(out.contains("fn a() {\n"), "got: {out}");
        assert!(out.contains("    body();\n}\n```"), "got: {out}");
        assert!(out.ends_with("prose one prose two\n"), "got: {out}");
    }

    #[test]
    fn structural_lines_are_byte_identical() {
        let input = "## Section 2\n\nsome prose\n\n---\n\n![fig](a.png)\n\n| x |";
        let out = merge_broken_lines(input);
        for line in ["## Section 2", "---", "![fig](a.png)", "| x |"] {
            assert!(out.lines().any(|l| l == line), "missing {line:?} in {out}");
        }
    }

    #[test]
    fn reconstruction_is_a_fixed_point_for_structure() {
        let input = "### Heading\n\n- item\n\n- other item\n\n\n| a | b |\n\n| 1 | 2 |";
        let once = merge_broken_lines(input);
        let twice = merge_broken_lines(&once);
        assert_eq!(once, twice);
        assert!(once.lines().any(|l| l == "### Heading"));
        assert!(once.lines().any(|l| l == "- item"));
    }

    #[test]
    fn empty_input_yields_single_newline() {
        assert_eq!(merge_broken_lines(""), "\n");
        assert_eq!(merge_broken_lines("\n\n\n\n"), "\n");
    }
}
