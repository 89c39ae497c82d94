//! Build Pipeline - Single Entry Point
//!
//! One linear pass: hash -> normalize -> validate -> render -> manifest ->
//! archive. Nothing is written until validation and export resolution have
//! both succeeded; a later failure stops the run without rolling back
//! artifacts already written.

use serde_json::Value;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::BuildConfig;
use crate::exports::{resolve_exports, ConfigurationError, ExportKind, ExportSet};
use crate::hashing::canonical_hash;
use crate::normalize::{normalize, StructureError};
use crate::packaging::{claim_archive_name, claim_output_name, pack, write_manifest, FileRemover, ManifestInfo, PackagingError, StdRemover};
use crate::render::{renderers, RenderError, Renderer};
use crate::validation::{spec_version_of, SchemaError, ValidationError, ValidationOutcome, Validator};
use crate::BUILDER_VERSION;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Input is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("VisualSpec validation failed: {0}")]
    Structure(#[from] StructureError),

    #[error("VisualSpec validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("Failed to generate {kind}: {source}")]
    Render { kind: ExportKind, source: RenderError },

    #[error("{0}")]
    Packaging(#[from] PackagingError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Warn,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => f.write_str("[SUCCESS]"),
            Status::Warn => f.write_str("[WARN]"),
        }
    }
}

/// Receives one line per completed stage.
pub trait StatusReporter {
    fn report(&mut self, status: Status, message: &str);
}

/// Collects `"[TAG] message"` lines.
impl StatusReporter for Vec<String> {
    fn report(&mut self, status: Status, message: &str) {
        self.push(format!("{} {}", status, message));
    }
}

/// A normalized, validated document ready for rendering.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    /// Hash of the document as submitted, before normalization.
    pub spec_hash: String,
    pub spec_version: String,
    pub document: Value,
    pub outcome: ValidationOutcome,
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub outdir: PathBuf,
    pub exports: ExportSet,
    /// File names written by renderers, in render order.
    pub outputs: Vec<String>,
    pub manifest: PathBuf,
    pub zip: Option<PathBuf>,
}

fn label(kind: ExportKind) -> &'static str {
    match kind {
        ExportKind::Html => "HTML",
        ExportKind::LectureDocx => "Lecture DOCX",
        ExportKind::QuizDocx => "Quiz DOCX",
        ExportKind::Pdf => "PDF",
        ExportKind::Zip => "ZIP",
    }
}

/// The build pipeline - owns validation, rendering and packaging
pub struct BuildPipeline {
    validator: Validator,
    renderers: Vec<Box<dyn Renderer>>,
    remover: Box<dyn FileRemover>,
}

impl BuildPipeline {
    pub fn new() -> Result<Self, PipelineError> {
        Ok(Self {
            validator: Validator::new()?,
            renderers: renderers(),
            remover: Box::new(StdRemover),
        })
    }

    /// Replace how existing outputs are cleared before writing.
    pub fn with_remover(mut self, remover: impl FileRemover + 'static) -> Self {
        self.remover = Box::new(remover);
        self
    }

    pub fn load(path: &Path) -> Result<Value, PipelineError> {
        let text = fs::read_to_string(path).map_err(|source| PipelineError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Hash, normalize and validate a raw document.
    pub fn prepare(&self, raw: Value) -> Result<PreparedDocument, PipelineError> {
        let spec_hash = canonical_hash(&raw)?;
        tracing::debug!(%spec_hash, "spec hash computed");

        let document = normalize(raw)?;
        let spec_version = spec_version_of(&document);
        let outcome = self.validator.validate(&document)?;

        Ok(PreparedDocument { spec_hash, spec_version, document, outcome })
    }

    /// Render enabled artifacts, then write the manifest and archive.
    pub fn build(
        &self,
        prepared: &PreparedDocument,
        outdir: &Path,
        only: Option<&[String]>,
        reporter: &mut dyn StatusReporter,
    ) -> Result<BuildReport, PipelineError> {
        let doc = &prepared.document;
        let exports = resolve_exports(doc.get("exports"), only)?;
        fs::create_dir_all(outdir)?;

        let mut outputs = Vec::new();
        for renderer in &self.renderers {
            let kind = renderer.kind();
            if !exports.is_enabled(kind) {
                continue;
            }
            let name = claim_output_name(self.remover.as_ref(), outdir, &renderer.file_name(doc));
            let path = outdir.join(&name);
            renderer
                .render(doc, &path)
                .map_err(|source| PipelineError::Render { kind, source })?;
            tracing::info!(%kind, path = %path.display(), "artifact written");
            reporter.report(Status::Success, &format!("{} generated: {}", label(kind), path.display()));
            outputs.push(name);
        }

        let zip_name = exports
            .zip
            .then(|| claim_archive_name(self.remover.as_ref(), outdir, &exports.zip_name));

        let info = ManifestInfo {
            spec_version: prepared.spec_version.clone(),
            builder_version: BUILDER_VERSION.to_string(),
            spec_hash: prepared.spec_hash.clone(),
            generated_at: None,
            zip_name: zip_name.clone(),
        };
        let manifest = write_manifest(outdir, Some(outputs.as_slice()), &info)?;
        reporter.report(Status::Success, &format!("Manifest generated: {}", manifest.display()));

        let zip = match zip_name {
            Some(name) => {
                let packed = pack(outdir, &name, Some(outputs.as_slice()), Some(manifest.as_path()))?;
                reporter.report(Status::Success, &format!("ZIP generated: {}", packed.zip.display()));
                Some(packed.zip)
            }
            None => None,
        };

        Ok(BuildReport {
            outdir: outdir.to_path_buf(),
            exports,
            outputs,
            manifest,
            zip,
        })
    }

    /// Full run for a resolved configuration. Returns `None` in
    /// validate-only mode.
    pub fn run(&self, config: &BuildConfig, reporter: &mut dyn StatusReporter) -> Result<Option<BuildReport>, PipelineError> {
        let raw = Self::load(&config.input)?;
        let prepared = self.prepare(raw)?;

        if let ValidationOutcome::Skipped { .. } = prepared.outcome {
            reporter.report(Status::Warn, "spec_version is not v1.1; schema validation skipped.");
        }
        if config.validate_only {
            reporter.report(Status::Success, "VisualSpec validation passed.");
            return Ok(None);
        }

        self.build(&prepared, &config.outdir, config.only.as_deref(), reporter)
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_tags() {
        let mut lines: Vec<String> = Vec::new();
        lines.report(Status::Success, "done");
        lines.report(Status::Warn, "careful");
        assert_eq!(lines, vec!["[SUCCESS] done", "[WARN] careful"]);
    }

    #[test]
    fn hash_is_taken_before_normalization() {
        let pipeline = BuildPipeline::new().unwrap();
        let raw = json!({"spec_version": "0.9", "meta": {"generated_at": "2024-01-01"}});
        let expected = canonical_hash(&raw).unwrap();
        let prepared = pipeline.prepare(raw).unwrap();
        assert_eq!(prepared.spec_hash, expected);
        assert_eq!(prepared.document["meta"]["date"], "2024-01-01");
        assert_ne!(canonical_hash(&prepared.document).unwrap(), expected);
    }

    #[test]
    fn non_object_root_is_rejected() {
        let pipeline = BuildPipeline::new().unwrap();
        let err = pipeline.prepare(json!("text")).unwrap_err();
        assert!(matches!(err, PipelineError::Structure(_)));
    }

    #[test]
    fn unknown_only_entry_writes_nothing() {
        let pipeline = BuildPipeline::new().unwrap();
        let prepared = pipeline.prepare(json!({"spec_version": "0.9"})).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let outdir = dir.path().join("out");
        let mut lines: Vec<String> = Vec::new();
        let only = vec!["docx".to_string()];
        let err = pipeline.build(&prepared, &outdir, Some(only.as_slice()), &mut lines).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
        assert!(err.to_string().contains("docx"));
        assert!(!outdir.exists());
        assert!(lines.is_empty());
    }
}
