//! Export Resolution - which artifacts a run produces
//!
//! Document flags are layered over fixed defaults; an explicit allow-list
//! from the command line replaces them entirely.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::document::truthy;

pub const DEFAULT_ZIP_NAME: &str = "bundle.zip";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("--only: unknown export(s): {}", .0.join(", "))]
    UnknownExports(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Html,
    LectureDocx,
    QuizDocx,
    Pdf,
    Zip,
}

impl ExportKind {
    pub const ALL: [ExportKind; 5] = [
        ExportKind::Html,
        ExportKind::LectureDocx,
        ExportKind::QuizDocx,
        ExportKind::Pdf,
        ExportKind::Zip,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExportKind::Html => "html",
            ExportKind::LectureDocx => "lecture_docx",
            ExportKind::QuizDocx => "quiz_docx",
            ExportKind::Pdf => "pdf",
            ExportKind::Zip => "zip",
        }
    }

    fn default_enabled(&self) -> bool {
        !matches!(self, ExportKind::Pdf)
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Effective export flags for one run. Never partially populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSet {
    pub html: bool,
    pub lecture_docx: bool,
    pub quiz_docx: bool,
    pub pdf: bool,
    pub zip: bool,
    pub zip_name: String,
}

impl Default for ExportSet {
    fn default() -> Self {
        Self {
            html: true,
            lecture_docx: true,
            quiz_docx: true,
            pdf: false,
            zip: true,
            zip_name: DEFAULT_ZIP_NAME.to_string(),
        }
    }
}

impl ExportSet {
    pub fn is_enabled(&self, kind: ExportKind) -> bool {
        match kind {
            ExportKind::Html => self.html,
            ExportKind::LectureDocx => self.lecture_docx,
            ExportKind::QuizDocx => self.quiz_docx,
            ExportKind::Pdf => self.pdf,
            ExportKind::Zip => self.zip,
        }
    }

    pub fn set(&mut self, kind: ExportKind, enabled: bool) {
        match kind {
            ExportKind::Html => self.html = enabled,
            ExportKind::LectureDocx => self.lecture_docx = enabled,
            ExportKind::QuizDocx => self.quiz_docx = enabled,
            ExportKind::Pdf => self.pdf = enabled,
            ExportKind::Zip => self.zip = enabled,
        }
    }
}

/// Resolve document export flags plus an optional allow-list.
///
/// `raw` is the document's `exports` value; anything that is not an object
/// counts as empty. Unknown allow-list names are rejected before any flag
/// is touched.
pub fn resolve_exports(raw: Option<&Value>, only: Option<&[String]>) -> Result<ExportSet, ConfigurationError> {
    let flags = raw.and_then(Value::as_object);
    let lookup = |key: &str| flags.and_then(|m| m.get(key));

    let mut set = ExportSet::default();
    for kind in ExportKind::ALL {
        let value = match kind {
            ExportKind::LectureDocx => lookup("lecture_docx").or_else(|| lookup("docx")),
            _ => lookup(kind.name()),
        };
        set.set(kind, value.map_or(kind.default_enabled(), truthy));
    }
    if let Some(name) = lookup("zip_name").and_then(Value::as_str) {
        set.zip_name = name.to_string();
    }

    if let Some(only) = only {
        let mut allowed = Vec::with_capacity(only.len());
        let mut unknown = Vec::new();
        for name in only {
            match name.parse::<ExportKind>() {
                Ok(kind) => allowed.push(kind),
                Err(bad) => unknown.push(bad),
            }
        }
        if !unknown.is_empty() {
            return Err(ConfigurationError::UnknownExports(unknown));
        }
        for kind in ExportKind::ALL {
            set.set(kind, false);
        }
        for kind in allowed {
            set.set(kind, true);
        }
    }

    Ok(set)
}

/// Parse a comma-separated `--only` value; `None` when nothing remains.
pub fn parse_only_list(value: Option<&str>) -> Option<Vec<String>> {
    let items: Vec<String> = value?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn only(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_when_absent() {
        let set = resolve_exports(None, None).unwrap();
        assert_eq!(set, ExportSet::default());
        assert!(!set.pdf);
        assert_eq!(set.zip_name, "bundle.zip");
    }

    #[test]
    fn document_flags_override_defaults() {
        let raw = json!({"html": false, "pdf": true, "zip_name": "course.zip"});
        let set = resolve_exports(Some(&raw), None).unwrap();
        assert!(!set.html);
        assert!(set.pdf);
        assert_eq!(set.zip_name, "course.zip");
    }

    #[test]
    fn legacy_docx_flag_is_honoured() {
        let raw = json!({"docx": false});
        assert!(!resolve_exports(Some(&raw), None).unwrap().lecture_docx);
        let raw = json!({"docx": false, "lecture_docx": true});
        assert!(resolve_exports(Some(&raw), None).unwrap().lecture_docx);
    }

    #[test]
    fn non_string_zip_name_falls_back() {
        let raw = json!({"zip_name": 3});
        assert_eq!(resolve_exports(Some(&raw), None).unwrap().zip_name, "bundle.zip");
    }

    #[test]
    fn only_list_replaces_flags() {
        let raw = json!({"html": true, "quiz_docx": true});
        let set = resolve_exports(Some(&raw), Some(only(&["pdf", "zip"]).as_slice())).unwrap();
        assert_eq!(
            (set.html, set.lecture_docx, set.quiz_docx, set.pdf, set.zip),
            (false, false, false, true, true)
        );
    }

    #[test]
    fn unknown_only_entry_is_rejected() {
        let err = resolve_exports(None, Some(only(&["html", "docx"]).as_slice())).unwrap_err();
        assert_eq!(err, ConfigurationError::UnknownExports(vec!["docx".into()]));
        assert_eq!(err.to_string(), "--only: unknown export(s): docx");
    }

    #[test]
    fn parse_only_list_trims() {
        assert_eq!(parse_only_list(Some(" pdf, ,zip ")), Some(only(&["pdf", "zip"])));
        assert_eq!(parse_only_list(Some(" , ")), None);
        assert_eq!(parse_only_list(None), None);
    }
}
