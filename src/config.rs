//! Build configuration resolved from the command line

use std::path::{Path, PathBuf};

use crate::exports::parse_only_list;

pub const DEFAULT_OUTDIR: &str = "output";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub input: PathBuf,
    /// Absolute output directory.
    pub outdir: PathBuf,
    /// Explicit allow-list of export names, unvalidated.
    pub only: Option<Vec<String>>,
    pub validate_only: bool,
}

impl BuildConfig {
    pub fn new(input: impl Into<PathBuf>, outdir: &Path, only: Option<&str>, validate_only: bool) -> Self {
        let input = input.into();
        let outdir = resolve_outdir(&input, outdir);
        Self {
            input,
            outdir,
            only: parse_only_list(only),
            validate_only,
        }
    }
}

/// A relative `outdir` is taken from the input document's folder, not the
/// working directory.
pub fn resolve_outdir(input: &Path, outdir: &Path) -> PathBuf {
    if outdir.is_absolute() {
        return outdir.to_path_buf();
    }
    let input_abs = std::path::absolute(input).unwrap_or_else(|_| input.to_path_buf());
    let base = input_abs.parent().map(Path::to_path_buf).unwrap_or_default();
    base.join(outdir)
}
