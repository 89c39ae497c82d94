//! Renderers - artifacts built from a normalized document
//!
//! A renderer reads the document only through `crate::document` accessors
//! and writes exactly one file.

mod docx;
mod html;
mod pdf;

use serde_json::Value;
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::document::{meta_title, sanitize_filename_component};
use crate::exports::ExportKind;

pub use docx::{LectureDocxRenderer, QuizDocxRenderer};
pub use html::{escape_html, markdown_to_html, HtmlRenderer};
pub use pdf::PdfRenderer;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("DOCX packaging failed: {0}")]
    Docx(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub trait Renderer {
    fn kind(&self) -> ExportKind;

    /// Preferred output file name before collision handling.
    fn file_name(&self, doc: &Value) -> String;

    fn render(&self, doc: &Value, out: &Path) -> Result<(), RenderError>;
}

/// Renderers in output order. The archive has no renderer.
pub fn renderers() -> Vec<Box<dyn Renderer>> {
    vec![
        Box::new(HtmlRenderer),
        Box::new(LectureDocxRenderer),
        Box::new(QuizDocxRenderer),
        Box::new(PdfRenderer),
    ]
}

/// `<title>_<label>.docx` with the title made filename-safe.
pub(crate) fn titled_name(doc: &Value, label: &str, ext: &str) -> String {
    format!("{}_{}.{}", sanitize_filename_component(&meta_title(doc)), label, ext)
}

/// Line-level markdown used by every renderer: fenced code, `- ` bullets,
/// blank lines and plain paragraphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MdBlock {
    Code(Vec<String>),
    Bullet(String),
    Blank,
    Paragraph(String),
}

pub fn parse_markdown(md: &str) -> Vec<MdBlock> {
    let text = md.replace("\r\n", "\n");
    let mut blocks = Vec::new();
    let mut code: Option<Vec<String>> = None;

    for line in text.split('\n') {
        let stripped = line.trim();
        if stripped.starts_with("```") {
            match code.take() {
                Some(buf) => blocks.push(MdBlock::Code(buf)),
                None => code = Some(Vec::new()),
            }
            continue;
        }
        if let Some(buf) = code.as_mut() {
            buf.push(line.to_string());
            continue;
        }
        if let Some(item) = stripped.strip_prefix("- ") {
            blocks.push(MdBlock::Bullet(item.to_string()));
        } else if stripped.is_empty() {
            blocks.push(MdBlock::Blank);
        } else {
            blocks.push(MdBlock::Paragraph(line.to_string()));
        }
    }
    // An unterminated fence still renders its body.
    if let Some(buf) = code {
        blocks.push(MdBlock::Code(buf));
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_markdown_blocks() {
        let blocks = parse_markdown("Intro\r\n- one\n- two\n\n```\nlet x = 1;\n```\nEnd");
        assert_eq!(
            blocks,
            vec![
                MdBlock::Paragraph("Intro".into()),
                MdBlock::Bullet("one".into()),
                MdBlock::Bullet("two".into()),
                MdBlock::Blank,
                MdBlock::Code(vec!["let x = 1;".into()]),
                MdBlock::Paragraph("End".into()),
            ]
        );
    }

    #[test]
    fn unterminated_fence_is_kept() {
        assert_eq!(parse_markdown("```\na"), vec![MdBlock::Code(vec!["a".into()])]);
    }

    #[test]
    fn renderer_file_names() {
        let doc = json!({"meta": {"title": "代数/基础"}});
        let names: Vec<String> = renderers().iter().map(|r| r.file_name(&doc)).collect();
        assert_eq!(
            names,
            vec![
                "course_interactive.html",
                "代数_基础_讲稿.docx",
                "代数_基础_习题集.docx",
                "course_notes.pdf",
            ]
        );
    }
}
