//! Coursepack Core - Course Artifact Builder
//!
//! # Pipeline Guarantees
//! 1. The spec hash fingerprints the document exactly as submitted
//! 2. Normalization is idempotent and never fails on malformed fields
//! 3. Nothing is written before validation and export resolution pass
//! 4. Manifests and archives are reproducible from the same outputs
//! 5. A locked output is never clobbered; it is renamed instead

pub mod hashing;
pub mod document;
pub mod normalize;
pub mod validation;
pub mod exports;
pub mod packaging;
pub mod render;
pub mod config;
pub mod pipeline;

pub use hashing::{canonical_hash, canonical_json, sha256_file, sha256_hex};
pub use normalize::{normalize, StructureError};
pub use validation::{ValidationError, ValidationOutcome, Validator};
pub use exports::{resolve_exports, ConfigurationError, ExportKind, ExportSet};
pub use packaging::{pack, write_manifest, Manifest, ManifestEntry, ManifestInfo, PackagingError};
pub use render::{RenderError, Renderer};
pub use config::BuildConfig;
pub use pipeline::{BuildPipeline, BuildReport, PipelineError, PreparedDocument, Status, StatusReporter};

pub const BUILDER_VERSION: &str = env!("CARGO_PKG_VERSION");
