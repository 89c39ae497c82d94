//! Text booklet (.pdf)
//!
//! Uses the predefined CJK font STSong-Light with the UniGB-UCS2-H CMap, so
//! no font file is embedded. Text is written as UCS-2 hex strings; characters
//! outside the BMP become `?`.

use serde_json::Value;
use std::fs;
use std::path::Path;

use super::{parse_markdown, MdBlock, RenderError, Renderer};
use crate::document::{content_md, lecture_items, meta_date, meta_title, meta_watermark, str_field};
use crate::exports::ExportKind;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;
const BODY_SIZE: f32 = 11.0;
const HEADING_SIZE: f32 = 16.0;
const TITLE_SIZE: f32 = 22.0;
const TOC_SIZE: f32 = 14.0;
const LEADING: f32 = 1.45;

pub struct PdfRenderer;

impl Renderer for PdfRenderer {
    fn kind(&self) -> ExportKind { ExportKind::Pdf }

    fn file_name(&self, _doc: &Value) -> String {
        "course_notes.pdf".to_string()
    }

    fn render(&self, doc: &Value, out: &Path) -> Result<(), RenderError> {
        fs::write(out, build_pdf(doc))?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Line {
    text: String,
    size: f32,
    /// Start a new page before this line.
    page_break: bool,
}

impl Line {
    fn new(text: impl Into<String>, size: f32) -> Self {
        Line { text: text.into(), size, page_break: false }
    }

    fn blank() -> Self {
        Line::new(String::new(), BODY_SIZE)
    }
}

fn char_width(c: char) -> f32 {
    if c.is_ascii() { 0.5 } else { 1.0 }
}

/// Half-width for ASCII, full-width for everything else, in ems.
fn text_width(s: &str) -> f32 {
    s.chars().map(char_width).sum()
}

/// Character wrapping; CJK text has no spaces to break on.
fn wrap(text: &str, size: f32) -> Vec<String> {
    let max_em = (PAGE_WIDTH - 2.0 * MARGIN) / size;
    if text.trim().is_empty() {
        return vec![String::new()];
    }
    let mut lines = Vec::new();
    let mut buf = String::new();
    let mut width = 0.0;
    for ch in text.chars() {
        let w = char_width(ch);
        if width + w > max_em && !buf.is_empty() {
            lines.push(std::mem::take(&mut buf));
            width = 0.0;
        }
        buf.push(ch);
        width += w;
    }
    if !buf.is_empty() {
        lines.push(buf);
    }
    lines
}

fn push_wrapped(lines: &mut Vec<Line>, text: &str, size: f32) {
    for piece in wrap(text, size) {
        lines.push(Line::new(piece, size));
    }
}

/// Cover with a numbered contents list, then one page run per section.
fn layout(doc: &Value) -> Vec<Line> {
    let items = lecture_items(doc);
    let mut lines = vec![
        Line::new(meta_title(doc), TITLE_SIZE),
        Line::new(format!("Date: {}", meta_date(doc)), BODY_SIZE),
        Line::new(format!("Watermark: {}", meta_watermark(doc)), BODY_SIZE),
        Line::blank(),
        Line::new("目录", TOC_SIZE),
    ];
    for (i, item) in items.iter().enumerate() {
        push_wrapped(&mut lines, &format!("{}. {}", i + 1, str_field(item, "title")), BODY_SIZE);
    }

    for item in items {
        let mut section = Vec::new();
        push_wrapped(&mut section, str_field(item, "title"), HEADING_SIZE);
        for block in parse_markdown(content_md(item)) {
            match block {
                MdBlock::Code(code) => {
                    for l in code {
                        push_wrapped(&mut section, &format!("    {}", l), BODY_SIZE);
                    }
                }
                MdBlock::Bullet(b) => push_wrapped(&mut section, &format!("• {}", b), BODY_SIZE),
                MdBlock::Blank => section.push(Line::blank()),
                MdBlock::Paragraph(p) => push_wrapped(&mut section, &p, BODY_SIZE),
            }
        }
        if let Some(first) = section.first_mut() {
            first.page_break = true;
        }
        lines.extend(section);
    }
    lines
}

fn paginate(lines: Vec<Line>) -> Vec<Vec<Line>> {
    let usable = PAGE_HEIGHT - 2.0 * MARGIN;
    let mut pages = vec![Vec::new()];
    let mut used = 0.0;
    for line in lines {
        let h = line.size * LEADING;
        let overflow = used + h > usable;
        if (overflow || line.page_break) && pages.last().is_some_and(|p| !p.is_empty()) {
            pages.push(Vec::new());
            used = 0.0;
        }
        used += h;
        if let Some(page) = pages.last_mut() {
            page.push(line);
        }
    }
    pages
}

fn ucs2_hex(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 4);
    for ch in s.chars() {
        let code = u32::from(ch);
        let unit = if code > 0xFFFF { u32::from('?') } else { code };
        out.push_str(&format!("{:04X}", unit));
    }
    out
}

fn content_stream(page: &[Line], watermark: &str, page_no: usize) -> String {
    let mut ops = String::from("BT\n");
    let mut y = PAGE_HEIGHT - MARGIN;
    for line in page {
        y -= line.size * LEADING;
        if line.text.is_empty() {
            continue;
        }
        ops.push_str(&format!(
            "/F1 {:.1} Tf 1 0 0 1 {:.1} {:.1} Tm <{}> Tj\n",
            line.size,
            MARGIN,
            y,
            ucs2_hex(&line.text)
        ));
    }
    let footer = format!("{} · {}", watermark, page_no);
    let footer_x = (PAGE_WIDTH - text_width(&footer) * 9.0) / 2.0;
    ops.push_str(&format!(
        "0.6 g /F1 9.0 Tf 1 0 0 1 {:.1} {:.1} Tm <{}> Tj\nET\n",
        footer_x,
        MARGIN / 2.0,
        ucs2_hex(&footer)
    ));
    ops
}

/// Serialize numbered objects with a cross-reference table.
fn assemble(objects: &[String]) -> Vec<u8> {
    let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}

pub(crate) fn build_pdf(doc: &Value) -> Vec<u8> {
    let watermark = meta_watermark(doc);
    let pages = paginate(layout(doc));

    // 1 catalog, 2 pages, 3-5 font; then a (page, content) pair per page.
    let first_page_obj = 6;
    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", first_page_obj + 2 * i))
        .collect();

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()),
        "<< /Type /Font /Subtype /Type0 /BaseFont /STSong-Light /Encoding /UniGB-UCS2-H /DescendantFonts [4 0 R] >>".to_string(),
        "<< /Type /Font /Subtype /CIDFontType0 /BaseFont /STSong-Light /CIDSystemInfo << /Registry (Adobe) /Ordering (GB1) /Supplement 2 >> /FontDescriptor 5 0 R /DW 1000 /W [1 95 500] >>".to_string(),
        "<< /Type /FontDescriptor /FontName /STSong-Light /Flags 6 /FontBBox [-25 -254 1000 880] /ItalicAngle 0 /Ascent 880 /Descent -120 /CapHeight 880 /StemV 93 >>".to_string(),
    ];

    for (i, page) in pages.iter().enumerate() {
        let content_obj = first_page_obj + 2 * i + 1;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            PAGE_WIDTH, PAGE_HEIGHT, content_obj
        ));
        let stream = content_stream(page, &watermark, i + 1);
        objects.push(format!("<< /Length {} >>\nstream\n{}\nendstream", stream.len(), stream));
    }

    assemble(&objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wrap_respects_width() {
        let long = "字".repeat(200);
        let lines = wrap(&long, BODY_SIZE);
        assert!(lines.len() > 1);
        let max_em = (PAGE_WIDTH - 2.0 * MARGIN) / BODY_SIZE;
        assert!(lines.iter().all(|l| text_width(l) <= max_em));
        assert_eq!(lines.concat(), long);
    }

    #[test]
    fn ucs2_encoding() {
        assert_eq!(ucs2_hex("A课"), "00418BFE");
        assert_eq!(ucs2_hex("😀"), "003F");
    }

    #[test]
    fn wrap_keeps_mixed_width_lines_within_bounds() {
        let text = "ab字".repeat(120);
        let max_em = (PAGE_WIDTH - 2.0 * MARGIN) / BODY_SIZE;
        let lines = wrap(&text, BODY_SIZE);
        assert!(lines.iter().all(|l| text_width(l) <= max_em));
        assert!(lines[..lines.len() - 1].iter().all(|l| text_width(l) + 1.0 > max_em));
        assert_eq!(lines.concat(), text);
    }

    #[test]
    fn cover_lists_watermark_and_contents() {
        let doc = json!({
            "meta": {"title": "光学", "watermark": "lab-7"},
            "sections": [{"title": "反射", "content_md": "a"}, {"title": "折射", "content_md": "b"}]
        });
        let lines = layout(&doc);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert!(texts.contains(&"Watermark: lab-7"));
        assert!(texts.contains(&"目录"));
        assert!(texts.contains(&"1. 反射"));
        assert!(texts.contains(&"2. 折射"));

        let text = String::from_utf8_lossy(&build_pdf(&doc)).into_owned();
        assert!(text.contains(&ucs2_hex("目录")));
        assert!(text.contains(&ucs2_hex("Watermark: lab-7")));
    }

    #[test]
    fn each_section_starts_a_page() {
        let doc = json!({"sections": [{"title": "一", "content_md": "x"}, {"title": "二", "content_md": "y"}]});
        let pages = paginate(layout(&doc));
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1][0].text, "一");
        assert_eq!(pages[2][0].text, "二");
    }

    #[test]
    fn long_documents_paginate() {
        let body = (0..200).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let doc = json!({"sections": [{"title": "Long", "content_md": body}]});
        let pdf = build_pdf(&doc);
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.trim_end().ends_with("%%EOF"));
        assert!(paginate(layout(&doc)).len() > 1);
    }
}
