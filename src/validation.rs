//! Validation System - Schema Pass / Semantic Pass Separation
//!
//! The schema pass is driven by the bundled JSON Schema for the document's
//! version family. Semantic rules cover counts the schema does not express.
//! Both passes report the same `ValidationError`, and each stops at the
//! first violation in a deterministic order.

use jsonschema::error::ValidationErrorKind;
use jsonschema::paths::PathChunk;
use jsonschema::{Draft, JSONSchema};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::document::{display_value, truthy, QuizCategory};

const SCHEMA_V1_1: &str = include_str!("../schema/visual_spec_v1_1.schema.json");

pub const SUPPORTED_SPEC_VERSION_PREFIXES: &[&str] = &["1.1", "v1.1"];
pub const MIN_SECTIONS: usize = 4;
pub const QUIZ_CATEGORY_SIZE: usize = 10;

/// First offending field, rendered as `<path>: <message>`.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[error("{path}: {message}")]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }

    pub fn missing(path: impl Into<String>) -> Self {
        Self::new(path, "missing required field")
    }
}

/// The bundled schema could not be loaded.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Bundled schema is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Bundled schema failed to compile: {0}")]
    Compile(String),
}

/// Schema families with a bundled schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFamily {
    V1_1,
}

impl SpecFamily {
    pub fn detect(spec_version: &str) -> Option<Self> {
        SUPPORTED_SPEC_VERSION_PREFIXES
            .iter()
            .any(|p| spec_version.starts_with(p))
            .then_some(SpecFamily::V1_1)
    }
}

/// `spec_version` as text; empty when absent or falsy (`0`, `""`, `[]`...).
pub fn spec_version_of(doc: &Value) -> String {
    match doc.get("spec_version") {
        Some(v) if truthy(v) => display_value(v),
        _ => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Validated,
    /// No schema for this version; the caller should warn.
    Skipped { spec_version: String },
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum PathSegment {
    Key(String),
    Index(usize),
}

/// `["quiz_bank", "single_choice", 0, "answer"]` -> `quiz_bank.single_choice[0].answer`
fn render_path(segments: &[PathSegment]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for seg in segments {
        match seg {
            PathSegment::Index(i) => match parts.last_mut() {
                Some(last) => last.push_str(&format!("[{}]", i)),
                None => parts.push(format!("[{}]", i)),
            },
            PathSegment::Key(k) => parts.push(k.clone()),
        }
    }
    if parts.is_empty() {
        "<root>".to_string()
    } else {
        parts.join(".")
    }
}

/// Semantic rule - inspects a schema-valid document
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn check(&self, doc: &Value) -> Result<(), ValidationError>;
}

// --- Concrete Rules ---

pub struct MinSectionsRule {
    pub min: usize,
}

impl ValidationRule for MinSectionsRule {
    fn name(&self) -> &'static str { "min_sections" }

    fn check(&self, doc: &Value) -> Result<(), ValidationError> {
        match doc.get("sections") {
            Some(Value::Array(items)) if items.len() < self.min => Err(ValidationError::new(
                "sections",
                format!("expected >= {} items, got {}", self.min, items.len()),
            )),
            _ => Ok(()),
        }
    }
}

pub struct QuizCountRule {
    pub category: QuizCategory,
    pub expected: usize,
}

impl ValidationRule for QuizCountRule {
    fn name(&self) -> &'static str { "quiz_count" }

    fn check(&self, doc: &Value) -> Result<(), ValidationError> {
        let Some(bank) = doc.get("quiz_bank").and_then(Value::as_object) else {
            return Ok(());
        };
        let path = format!("quiz_bank.{}", self.category.key());
        match bank.get(self.category.key()) {
            Some(Value::Array(items)) if items.len() == self.expected => Ok(()),
            Some(Value::Array(items)) => Err(ValidationError::new(
                path,
                format!("expected {} items, got {}", self.expected, items.len()),
            )),
            _ => Err(ValidationError::missing(path)),
        }
    }
}

/// Validator orchestrates the schema pass and the semantic rules
pub struct Validator {
    schema: JSONSchema,
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    /// Validator for the v1.1 family using the bundled schema.
    pub fn new() -> Result<Self, SchemaError> {
        let schema: Value = serde_json::from_str(SCHEMA_V1_1)?;
        Self::with_schema(&schema)
    }

    pub fn with_schema(schema: &Value) -> Result<Self, SchemaError> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft202012)
            .compile(schema)
            .map_err(|e| SchemaError::Compile(e.to_string()))?;

        let mut rules: Vec<Box<dyn ValidationRule>> = vec![Box::new(MinSectionsRule { min: MIN_SECTIONS })];
        for category in QuizCategory::ALL {
            rules.push(Box::new(QuizCountRule { category, expected: QUIZ_CATEGORY_SIZE }));
        }

        Ok(Self { schema: compiled, rules })
    }

    /// Validate a normalized document.
    ///
    /// Documents outside a known version family pass unvalidated.
    pub fn validate(&self, doc: &Value) -> Result<ValidationOutcome, ValidationError> {
        let spec_version = spec_version_of(doc);
        match SpecFamily::detect(&spec_version) {
            Some(SpecFamily::V1_1) => {
                self.check_schema(doc)?;
                self.check_semantics(doc)?;
                tracing::debug!(%spec_version, "document validated");
                Ok(ValidationOutcome::Validated)
            }
            None => {
                tracing::warn!(%spec_version, "no schema for spec_version, skipping validation");
                Ok(ValidationOutcome::Skipped { spec_version })
            }
        }
    }

    /// Structural pass: the first schema error ordered by instance path.
    pub fn check_schema(&self, doc: &Value) -> Result<(), ValidationError> {
        let errors = match self.schema.validate(doc) {
            Ok(()) => return Ok(()),
            Err(errors) => errors,
        };

        let mut found: Vec<(Vec<PathSegment>, ValidationError)> = errors
            .map(|err| {
                let segments: Vec<PathSegment> = err
                    .instance_path
                    .iter()
                    .filter_map(|chunk| match chunk {
                        PathChunk::Property(p) => Some(PathSegment::Key(p.to_string())),
                        PathChunk::Index(i) => Some(PathSegment::Index(*i)),
                        PathChunk::Keyword(_) => None,
                    })
                    .collect();
                let rendered = format_schema_error(&segments, &err.kind, err.to_string());
                (segments, rendered)
            })
            .collect();

        // Stable sort keeps the validator's own order for equal paths.
        found.sort_by(|a, b| a.0.cmp(&b.0));
        match found.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }

    /// Semantic pass: rules in registration order, first failure wins.
    pub fn check_semantics(&self, doc: &Value) -> Result<(), ValidationError> {
        for rule in &self.rules {
            rule.check(doc).map_err(|err| {
                tracing::debug!(rule = rule.name(), %err, "semantic rule failed");
                err
            })?;
        }
        Ok(())
    }
}

fn format_schema_error(
    segments: &[PathSegment],
    kind: &ValidationErrorKind,
    message: String,
) -> ValidationError {
    if let ValidationErrorKind::Required { property } = kind {
        let field = match property {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let mut full = segments.to_vec();
        full.push(PathSegment::Key(field));
        return ValidationError::missing(render_path(&full));
    }
    ValidationError::new(render_path(segments), message)
}
