//! DOCX → HTML → Markdown.
//!
//! A DOCX file is a ZIP container; the body lives in `word/document.xml`,
//! paragraph style names in `word/styles.xml` and list definitions in
//! `word/numbering.xml`. The body is streamed with `quick-xml` into a small
//! semantic HTML fragment which `html2md` then renders as Markdown:
//!
//! | WordprocessingML | HTML |
//! |------------------|------|
//! | paragraph styled `Title` / `heading N` | `<h1>` / `<hN>` |
//! | paragraph with `numPr` (or a `List Bullet` / `List Number` style) | `<ul>`/`<ol>` + `<li>` |
//! | run with `<w:b/>` / `<w:i/>` | `<strong>` / `<em>` |
//! | `w:tbl` / `w:tr` / `w:tc` | `<table>` / `<tr>` / `<td>` |
//! | drawings, embedded objects, text boxes | dropped |
//!
//! Tables never get `<th>` cells, so the Markdown renderer may emit an
//! empty header row; [`crate::pipeline::postprocess::repair_empty_table_headers`]
//! fixes that downstream.

use crate::error::ConvertError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use tracing::debug;
use zip::ZipArchive;

const DOCUMENT_XML: &str = "word/document.xml";
const STYLES_XML: &str = "word/styles.xml";
const NUMBERING_XML: &str = "word/numbering.xml";

/// Subtrees that never reach the output: images, OLE objects, text boxes.
const SKIPPED: &[&[u8]] = &[b"drawing", b"pict", b"object", b"AlternateContent"];

fn corrupt(name: &str, detail: impl std::fmt::Display) -> ConvertError {
    ConvertError::CorruptDocx {
        name: name.to_string(),
        detail: detail.to_string(),
    }
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|b| *b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

fn attr_value<B: std::io::BufRead>(
    reader: &XmlReader<B>,
    element: &BytesStart,
    key: &[u8],
) -> Option<String> {
    for attr in element.attributes().with_checks(false) {
        let attr = attr.ok()?;
        if local_name(attr.key.as_ref()) == key {
            if let Ok(value) = attr.decode_and_unescape_value(reader) {
                return Some(value.into_owned());
            }
        }
    }
    None
}

fn read_zip_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    entry: &str,
) -> Result<Option<String>, zip::result::ZipError> {
    let mut file = match archive.by_name(entry) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
}

/// `styleId` → display name (`Nagwek1` → `heading 1` in a Polish Word).
fn parse_style_names(xml: &str) -> HashMap<String, String> {
    let mut reader = XmlReader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut names = HashMap::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                match local_name(e.name().as_ref()) {
                    b"style" => current = attr_value(&reader, e, b"styleId"),
                    b"name" => {
                        if let (Some(id), Some(name)) = (&current, attr_value(&reader, e, b"val")) {
                            names.insert(id.clone(), name);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) if local_name(e.name().as_ref()) == b"style" => current = None,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    names
}

/// `numId` → whether level 0 of its list definition is numbered (not bullets).
fn parse_numbering(xml: &str) -> HashMap<String, bool> {
    let mut reader = XmlReader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    let mut level0_formats: HashMap<String, String> = HashMap::new();
    let mut num_to_abstract: Vec<(String, String)> = Vec::new();
    let mut current_abstract: Option<String> = None;
    let mut current_num: Option<String> = None;
    let mut current_level: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                match local_name(e.name().as_ref()) {
                    b"abstractNum" => current_abstract = attr_value(&reader, e, b"abstractNumId"),
                    b"lvl" => current_level = attr_value(&reader, e, b"ilvl"),
                    b"numFmt" => {
                        if let (Some(abs), Some("0")) = (&current_abstract, current_level.as_deref()) {
                            if let Some(fmt) = attr_value(&reader, e, b"val") {
                                level0_formats.entry(abs.clone()).or_insert(fmt);
                            }
                        }
                    }
                    b"num" => current_num = attr_value(&reader, e, b"numId"),
                    b"abstractNumId" => {
                        if let (Some(num), Some(abs)) = (&current_num, attr_value(&reader, e, b"val")) {
                            num_to_abstract.push((num.clone(), abs));
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"abstractNum" => current_abstract = None,
                b"lvl" => current_level = None,
                b"num" => current_num = None,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    num_to_abstract
        .into_iter()
        .map(|(num, abs)| {
            let ordered = level0_formats
                .get(&abs)
                .is_some_and(|fmt| fmt != "bullet" && fmt != "none");
            (num, ordered)
        })
        .collect()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' => out.push_str("<br />"),
            _ => out.push(c),
        }
    }
    out
}

/// `<w:b/>` is on; `<w:b w:val="0"/>` (or `false`/`off`) is off.
fn toggle_on(val: Option<&str>) -> bool {
    !matches!(val, Some("0") | Some("false") | Some("off") | Some("none"))
}

fn heading_level(style: &str) -> Option<usize> {
    if style == "title" {
        return Some(1);
    }
    let level: usize = style.strip_prefix("heading")?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

#[derive(Debug, Default)]
struct Run {
    bold: bool,
    italic: bool,
    text: String,
}

fn render_run(run: &Run) -> String {
    let text = run.text.as_str();
    let core = text.trim();
    if core.is_empty() || !(run.bold || run.italic) {
        return escape_html(text);
    }
    // Keep edge whitespace outside the tags so `**` hugs the words.
    let start = text.len() - text.trim_start().len();
    let end = start + core.len();
    let mut inner = escape_html(core);
    if run.italic {
        inner = format!("<em>{inner}</em>");
    }
    if run.bold {
        inner = format!("<strong>{inner}</strong>");
    }
    format!(
        "{}{inner}{}",
        escape_html(&text[..start]),
        escape_html(&text[end..])
    )
}

/// Word splits text into many runs; adjacent runs with equal formatting are
/// merged before rendering.
fn render_runs(runs: Vec<Run>) -> String {
    let mut merged: Vec<Run> = Vec::new();
    for run in runs {
        if run.text.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some(last) if last.bold == run.bold && last.italic == run.italic => {
                last.text.push_str(&run.text)
            }
            _ => merged.push(run),
        }
    }
    merged.iter().map(render_run).collect()
}

#[derive(Debug, Default)]
struct Paragraph {
    style: Option<String>,
    num_id: Option<String>,
    runs: Vec<Run>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

enum Block {
    Heading(usize),
    ListItem(ListKind),
    Paragraph,
}

struct HtmlBuilder<'a> {
    styles: &'a HashMap<String, String>,
    numbering: &'a HashMap<String, bool>,
    out: String,
    open_list: Option<ListKind>,
    paragraph: Option<Paragraph>,
    run: Option<Run>,
    in_text: bool,
    skip_depth: usize,
    table_depth: usize,
    rows: Vec<Vec<String>>,
    row: Option<Vec<String>>,
    cell: Option<String>,
}

impl<'a> HtmlBuilder<'a> {
    fn new(styles: &'a HashMap<String, String>, numbering: &'a HashMap<String, bool>) -> Self {
        Self {
            styles,
            numbering,
            out: String::new(),
            open_list: None,
            paragraph: None,
            run: None,
            in_text: false,
            skip_depth: 0,
            table_depth: 0,
            rows: Vec::new(),
            row: None,
            cell: None,
        }
    }

    fn start(&mut self, local: &[u8], val: Option<String>, empty: bool) {
        if SKIPPED.contains(&local) {
            if !empty {
                self.skip_depth += 1;
            }
            return;
        }
        if self.skip_depth > 0 {
            return;
        }
        match local {
            b"p" if !empty => self.paragraph = Some(Paragraph::default()),
            b"pStyle" => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.style = val;
                }
            }
            b"numId" => {
                if let Some(p) = self.paragraph.as_mut() {
                    p.num_id = val;
                }
            }
            b"r" if !empty => self.run = Some(Run::default()),
            b"b" => {
                if let Some(run) = self.run.as_mut() {
                    run.bold = toggle_on(val.as_deref());
                }
            }
            b"i" => {
                if let Some(run) = self.run.as_mut() {
                    run.italic = toggle_on(val.as_deref());
                }
            }
            b"t" if !empty => self.in_text = true,
            b"tab" => self.push_run_text(" "),
            b"br" | b"cr" => self.push_run_text("\n"),
            b"tbl" if !empty => {
                if self.table_depth == 0 {
                    self.rows.clear();
                }
                self.table_depth += 1;
            }
            b"tr" if !empty && self.table_depth == 1 => self.row = Some(Vec::new()),
            b"tc" if !empty && self.table_depth == 1 => self.cell = Some(String::new()),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.skip_depth > 0 || !self.in_text {
            return;
        }
        self.push_run_text(text);
    }

    fn end(&mut self, local: &[u8]) {
        if SKIPPED.contains(&local) {
            self.skip_depth = self.skip_depth.saturating_sub(1);
            return;
        }
        if self.skip_depth > 0 {
            return;
        }
        match local {
            b"t" => self.in_text = false,
            b"r" => {
                if let (Some(run), Some(p)) = (self.run.take(), self.paragraph.as_mut()) {
                    p.runs.push(run);
                }
            }
            b"p" => self.finish_paragraph(),
            b"tc" if self.table_depth == 1 => {
                if let (Some(cell), Some(row)) = (self.cell.take(), self.row.as_mut()) {
                    row.push(cell);
                }
            }
            b"tr" if self.table_depth == 1 => {
                if let Some(row) = self.row.take() {
                    self.rows.push(row);
                }
            }
            b"tbl" => {
                if self.table_depth == 1 {
                    self.finish_table();
                }
                self.table_depth = self.table_depth.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn push_run_text(&mut self, text: &str) {
        if let Some(run) = self.run.as_mut() {
            run.text.push_str(text);
        }
    }

    fn classify(&self, p: &Paragraph) -> Block {
        let style = p.style.as_ref().map(|id| {
            self.styles
                .get(id)
                .unwrap_or(id)
                .to_lowercase()
                .replace(' ', "")
        });
        if let Some(level) = style.as_deref().and_then(heading_level) {
            return Block::Heading(level);
        }
        if let Some(num_id) = p.num_id.as_deref().filter(|id| *id != "0") {
            let ordered = self.numbering.get(num_id).copied().unwrap_or(false);
            return Block::ListItem(if ordered {
                ListKind::Ordered
            } else {
                ListKind::Unordered
            });
        }
        match style.as_deref() {
            Some(s) if s.starts_with("listbullet") => Block::ListItem(ListKind::Unordered),
            Some(s) if s.starts_with("listnumber") => Block::ListItem(ListKind::Ordered),
            _ => Block::Paragraph,
        }
    }

    fn close_list(&mut self) {
        if let Some(kind) = self.open_list.take() {
            self.out.push_str(&format!("</{}>\n", kind.tag()));
        }
    }

    fn finish_paragraph(&mut self) {
        let Some(mut p) = self.paragraph.take() else {
            return;
        };
        let runs = std::mem::take(&mut p.runs);
        let html = render_runs(runs);
        let html = html.trim();

        if self.table_depth > 0 {
            if let Some(cell) = self.cell.as_mut() {
                if !html.is_empty() {
                    if !cell.is_empty() {
                        cell.push(' ');
                    }
                    cell.push_str(html);
                }
            }
            return;
        }
        if html.is_empty() {
            return;
        }

        match self.classify(&p) {
            Block::Heading(level) => {
                self.close_list();
                self.out.push_str(&format!("<h{level}>{html}</h{level}>\n"));
            }
            Block::ListItem(kind) => {
                if self.open_list != Some(kind) {
                    self.close_list();
                    self.out.push_str(&format!("<{}>\n", kind.tag()));
                    self.open_list = Some(kind);
                }
                self.out.push_str(&format!("<li>{html}</li>\n"));
            }
            Block::Paragraph => {
                self.close_list();
                self.out.push_str(&format!("<p>{html}</p>\n"));
            }
        }
    }

    fn finish_table(&mut self) {
        let rows = std::mem::take(&mut self.rows);
        if rows.iter().flatten().all(|cell| cell.trim().is_empty()) {
            return;
        }
        self.close_list();
        self.out.push_str("<table>\n");
        for row in rows {
            self.out.push_str("<tr>");
            for cell in row {
                self.out.push_str(&format!("<td>{cell}</td>"));
            }
            self.out.push_str("</tr>\n");
        }
        self.out.push_str("</table>\n");
    }

    fn finish(mut self) -> String {
        self.finish_paragraph();
        self.close_list();
        self.out
    }
}

fn render_document(
    xml: &str,
    styles: &HashMap<String, String>,
    numbering: &HashMap<String, bool>,
) -> Result<String, quick_xml::Error> {
    let mut reader = XmlReader::from_str(xml);
    reader.trim_text(false);
    let mut buf = Vec::new();
    let mut builder = HtmlBuilder::new(styles, numbering);

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let val = attr_value(&reader, e, b"val");
                builder.start(local_name(e.name().as_ref()), val, false);
            }
            Event::Empty(ref e) => {
                let val = attr_value(&reader, e, b"val");
                builder.start(local_name(e.name().as_ref()), val, true);
            }
            Event::Text(e) => builder.text(&e.unescape()?),
            Event::End(ref e) => builder.end(local_name(e.name().as_ref())),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(builder.finish())
}

/// Convert DOCX bytes to an HTML fragment.
pub fn docx_to_html(bytes: &[u8], name: &str) -> Result<String, ConvertError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| corrupt(name, e))?;
    let document = read_zip_entry(&mut archive, DOCUMENT_XML)
        .map_err(|e| corrupt(name, e))?
        .ok_or_else(|| corrupt(name, format!("missing {DOCUMENT_XML}")))?;

    // Both parts are optional; a document without them renders unstyled.
    let styles = read_zip_entry(&mut archive, STYLES_XML)
        .ok()
        .flatten()
        .map(|xml| parse_style_names(&xml))
        .unwrap_or_default();
    let numbering = read_zip_entry(&mut archive, NUMBERING_XML)
        .ok()
        .flatten()
        .map(|xml| parse_numbering(&xml))
        .unwrap_or_default();

    let html = render_document(&document, &styles, &numbering).map_err(|e| corrupt(name, e))?;
    debug!(
        "{}: {} styles, {} lists, {} bytes of HTML",
        name,
        styles.len(),
        numbering.len(),
        html.len()
    );
    Ok(html)
}

/// Render an HTML fragment as Markdown.
pub fn html_to_markdown(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    html2md::parse_html(html)
}

/// DOCX bytes straight to (uncleaned) Markdown.
pub fn docx_to_markdown(bytes: &[u8], name: &str) -> Result<String, ConvertError> {
    docx_to_html(bytes, name).map(|html| html_to_markdown(&html))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        )
    }

    fn para(style: Option<&str>, text: &str) -> String {
        let ppr = style
            .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{s}"/></w:pPr>"#))
            .unwrap_or_default();
        format!(r#"<w:p>{ppr}<w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
    }

    fn render(body: &str) -> String {
        render_document(&document(body), &HashMap::new(), &HashMap::new()).unwrap()
    }

    #[test]
    fn headings_and_paragraphs() {
        let html = render(&format!(
            "{}{}{}",
            para(Some("Title"), "Annual Report"),
            para(Some("Heading2"), "Scope"),
            para(None, "Body text.")
        ));
        assert_eq!(html, "<h1>Annual Report</h1>\n<h2>Scope</h2>\n<p>Body text.</p>\n");
    }

    #[test]
    fn localized_style_ids_resolve_through_style_names() {
        let styles = parse_style_names(
            r#"<w:styles xmlns:w="x"><w:style w:type="paragraph" w:styleId="Nagwek1"><w:name w:val="heading 1"/></w:style></w:styles>"#,
        );
        assert_eq!(styles.get("Nagwek1").map(String::as_str), Some("heading 1"));
        let html = render_document(
            &document(&para(Some("Nagwek1"), "Wstęp")),
            &styles,
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(html, "<h1>Wstęp</h1>\n");
    }

    #[test]
    fn adjacent_bold_runs_are_merged() {
        let html = render(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Hello </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>world</w:t></w:r><w:r><w:rPr><w:b w:val="0"/><w:i/></w:rPr><w:t xml:space="preserve"> again</w:t></w:r></w:p>"#,
        );
        assert_eq!(html, "<p><strong>Hello world</strong> <em>again</em></p>\n");
    }

    #[test]
    fn numbered_paragraphs_become_lists() {
        let numbering = parse_numbering(
            r#"<w:numbering xmlns:w="x">
                <w:abstractNum w:abstractNumId="0"><w:lvl w:ilvl="0"><w:numFmt w:val="bullet"/></w:lvl></w:abstractNum>
                <w:abstractNum w:abstractNumId="1"><w:lvl w:ilvl="0"><w:numFmt w:val="decimal"/></w:lvl></w:abstractNum>
                <w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
                <w:num w:numId="2"><w:abstractNumId w:val="1"/></w:num>
            </w:numbering>"#,
        );
        assert_eq!(numbering.get("1"), Some(&false));
        assert_eq!(numbering.get("2"), Some(&true));

        let item = |num: &str, text: &str| {
            format!(
                r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="{num}"/></w:numPr></w:pPr><w:r><w:t>{text}</w:t></w:r></w:p>"#
            )
        };
        let body = format!(
            "{}{}{}{}",
            item("1", "apples"),
            item("1", "pears"),
            item("2", "first"),
            para(None, "after")
        );
        let html = render_document(&document(&body), &HashMap::new(), &numbering).unwrap();
        assert_eq!(
            html,
            "<ul>\n<li>apples</li>\n<li>pears</li>\n</ul>\n<ol>\n<li>first</li>\n</ol>\n<p>after</p>\n"
        );
    }

    #[test]
    fn tables_use_plain_cells() {
        let cell = |t: &str| format!("<w:tc>{}</w:tc>", para(None, t));
        let body = format!(
            "<w:tbl><w:tr>{}{}</w:tr><w:tr>{}{}</w:tr></w:tbl>",
            cell("Name"),
            cell("Value"),
            cell("a"),
            cell("1")
        );
        assert_eq!(
            render(&body),
            "<table>\n<tr><td>Name</td><td>Value</td></tr>\n<tr><td>a</td><td>1</td></tr>\n</table>\n"
        );
    }

    #[test]
    fn drawings_are_dropped_and_text_is_escaped() {
        let html = render(
            r#"<w:p><w:r><w:t>a &lt; b &amp; c</w:t></w:r><w:r><w:drawing><wp:inline><w:txbxContent><w:p><w:r><w:t>hidden</w:t></w:r></w:p></w:txbxContent></wp:inline></w:drawing></w:r></w:p>"#,
        );
        assert_eq!(html, "<p>a &lt; b &amp; c</p>\n");
    }

    #[test]
    fn not_a_zip_is_corrupt_docx() {
        let err = docx_to_html(b"definitely not a zip", "x.docx").unwrap_err();
        assert!(matches!(err, ConvertError::CorruptDocx { ref name, .. } if name == "x.docx"));
    }

    #[test]
    fn zip_without_document_is_corrupt_docx() {
        use std::io::Write;
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("hello.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"hi").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let err = docx_to_html(&bytes, "x.docx").unwrap_err();
        assert!(err.to_string().contains("word/document.xml"), "got: {err}");
    }

    #[test]
    fn empty_html_renders_empty_markdown() {
        assert_eq!(html_to_markdown("  \n"), "");
    }
}
