//! Lecture and quiz documents (.docx)

use docx_rs::{AlignmentType, BreakType, Docx, Header, Paragraph, Run, RunFonts};
use serde_json::Value;
use std::fs::File;
use std::path::Path;

use super::{parse_markdown, titled_name, MdBlock, RenderError, Renderer};
use crate::document::{
    content_md, display_value, lecture_items, meta_date, meta_title, meta_watermark, str_field,
    true_false_label, QuizCategory,
};
use crate::exports::ExportKind;

const OPTION_LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn text(s: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(s))
}

/// Sizes are in half-points.
fn heading(s: &str, size: usize) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(s).bold().size(size))
}

fn page_break() -> Paragraph {
    Paragraph::new().add_run(Run::new().add_break(BreakType::Page))
}

fn base_document(doc: &Value, subtitle: &str) -> Docx {
    let watermark = meta_watermark(doc);
    let header = Header::new().add_paragraph(
        Paragraph::new()
            .align(AlignmentType::Center)
            .add_run(Run::new().add_text(&watermark).bold().size(56).color("C8C8C8")),
    );
    Docx::new()
        .header(header)
        .add_paragraph(heading(&format!("{} {}", meta_title(doc), subtitle), 48))
        .add_paragraph(text(&format!("Date: {}", meta_date(doc))))
        .add_paragraph(text(&format!("Watermark: {}", watermark)))
}

fn add_markdown(mut docx: Docx, md: &str) -> Docx {
    for block in parse_markdown(md) {
        docx = match block {
            MdBlock::Code(lines) => lines.iter().fold(docx, |d, line| {
                d.add_paragraph(Paragraph::new().add_run(
                    Run::new()
                        .add_text(line)
                        .fonts(RunFonts::new().ascii("Consolas"))
                        .size(20),
                ))
            }),
            MdBlock::Bullet(item) => docx.add_paragraph(text(&format!("• {}", item))),
            MdBlock::Blank => docx.add_paragraph(Paragraph::new()),
            MdBlock::Paragraph(line) => docx.add_paragraph(text(&line)),
        };
    }
    docx
}

fn save(docx: Docx, out: &Path) -> Result<(), RenderError> {
    let file = File::create(out)?;
    docx.build()
        .pack(file)
        .map_err(|e| RenderError::Docx(e.to_string()))
}

pub struct LectureDocxRenderer;

impl Renderer for LectureDocxRenderer {
    fn kind(&self) -> ExportKind { ExportKind::LectureDocx }

    fn file_name(&self, doc: &Value) -> String {
        titled_name(doc, "讲稿", "docx")
    }

    fn render(&self, doc: &Value, out: &Path) -> Result<(), RenderError> {
        let items = lecture_items(doc);
        let mut docx = base_document(doc, "讲稿").add_paragraph(heading("目录", 32));
        for (i, item) in items.iter().enumerate() {
            docx = docx.add_paragraph(text(&format!("{}. {}", i + 1, str_field(item, "title"))));
        }
        for item in items {
            docx = docx
                .add_paragraph(page_break())
                .add_paragraph(heading(str_field(item, "title"), 32));
            docx = add_markdown(docx, content_md(item));
        }
        save(docx, out)
    }
}

pub struct QuizDocxRenderer;

fn option_label(j: usize) -> String {
    OPTION_LETTERS
        .get(j)
        .map(|b| (*b as char).to_string())
        .unwrap_or_else(|| (j + 1).to_string())
}

fn add_quiz_section(mut docx: Docx, category: QuizCategory, questions: &[Value]) -> Docx {
    docx = docx.add_paragraph(heading(category.heading(), 32));
    for (i, q) in questions.iter().enumerate() {
        docx = docx.add_paragraph(text(&format!("{}. {}", i + 1, str_field(q, "stem").trim())));

        if category == QuizCategory::SingleChoice {
            if let Some(options) = q.get("options").and_then(Value::as_array) {
                for (j, opt) in options.iter().enumerate() {
                    docx = docx.add_paragraph(text(&format!(
                        "{}. {}",
                        option_label(j),
                        display_value(opt).trim()
                    )));
                }
            }
        }

        let answer = match (category, q.get("answer")) {
            (_, None) => String::new(),
            (QuizCategory::TrueFalse, Some(a)) => true_false_label(a),
            (_, Some(a)) => display_value(a).trim().to_string(),
        };
        let explanation = q.get("explanation").map(display_value).unwrap_or_default();
        docx = docx
            .add_paragraph(text(&format!("答案：{}", answer)))
            .add_paragraph(text(&format!("解析：{}", explanation.trim())));
    }
    docx
}

impl Renderer for QuizDocxRenderer {
    fn kind(&self) -> ExportKind { ExportKind::QuizDocx }

    fn file_name(&self, doc: &Value) -> String {
        titled_name(doc, "习题集", "docx")
    }

    fn render(&self, doc: &Value, out: &Path) -> Result<(), RenderError> {
        let mut docx = base_document(doc, "习题集");
        for category in QuizCategory::ALL {
            docx = add_quiz_section(docx, category, category.questions(doc));
        }
        save(docx, out)
    }
}
