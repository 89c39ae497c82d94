//! Packaging - manifest and archive for one output directory
//!
//! Every file listed carries its size and SHA-256 so a bundle can be
//! verified independently of the builder. Archive entries use a fixed
//! timestamp so identical inputs give identical archive bytes.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::hashing::sha256_file;

pub const MANIFEST_NAME: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub size: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub spec_version: String,
    pub builder_version: String,
    pub spec_hash: String,
    pub generated_at: String,
    pub outdir: String,
    pub zip: Option<String>,
    pub files: Vec<ManifestEntry>,
}

/// Run-level fields recorded in the manifest.
#[derive(Debug, Clone, Default)]
pub struct ManifestInfo {
    pub spec_version: String,
    pub builder_version: String,
    pub spec_hash: String,
    /// Defaults to local time, seconds precision.
    pub generated_at: Option<String>,
    /// Final archive name, or `None` when no archive is built.
    pub zip_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackResult {
    pub manifest: PathBuf,
    pub zip: PathBuf,
}

/// Removal seam for the collision policy.
pub trait FileRemover {
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Removes files from the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdRemover;

impl FileRemover for StdRemover {
    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// True when `path` is gone afterwards (removed or never existed).
pub fn safe_remove(remover: &dyn FileRemover, path: &Path) -> bool {
    if !path.exists() {
        return true;
    }
    match remover.remove(path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not remove existing output");
            false
        }
    }
}

pub fn timestamp_suffix() -> String {
    Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// `course_notes.pdf` + stamp -> `course_notes_<stamp>.pdf`
pub fn with_suffix(name: &str, stamp: &str) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}_{}{}", &name[..dot], stamp, &name[dot..]),
        _ => format!("{}_{}", name, stamp),
    }
}

/// `bundle` + stamp -> `bundle_<stamp>.zip`; a renamed archive always ends
/// in `.zip` whatever the configured name.
pub fn archive_with_suffix(name: &str, stamp: &str) -> String {
    let root = match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    };
    format!("{}_{}.zip", root, stamp)
}

fn claim_with(remover: &dyn FileRemover, outdir: &Path, name: &str, rename: fn(&str, &str) -> String) -> String {
    if safe_remove(remover, &outdir.join(name)) {
        return name.to_string();
    }
    let renamed = rename(name, &timestamp_suffix());
    tracing::info!(original = name, renamed = %renamed, "output locked, writing under new name");
    renamed
}

/// Clear `outdir/name` for writing, or pick a timestamp-suffixed name when
/// the existing file cannot be removed. Returns the name to use.
pub fn claim_output_name(remover: &dyn FileRemover, outdir: &Path, name: &str) -> String {
    claim_with(remover, outdir, name, with_suffix)
}

/// Like [`claim_output_name`], but a renamed archive keeps a `.zip` extension.
pub fn claim_archive_name(remover: &dyn FileRemover, outdir: &Path, name: &str) -> String {
    claim_with(remover, outdir, name, archive_with_suffix)
}

/// Files covered by the manifest and archive, sorted by name.
///
/// With an explicit list, names that are not regular files in `outdir` are
/// dropped. Without one, every regular file except the manifest and the
/// planned archive is taken.
pub fn determine_files(outdir: &Path, zip_name: &str, files: Option<&[String]>) -> io::Result<Vec<String>> {
    let manifest_lower = MANIFEST_NAME.to_lowercase();
    let mut selected: Vec<String> = match files {
        Some(list) => list
            .iter()
            .filter(|name| name.to_lowercase() != manifest_lower)
            .filter(|name| outdir.join(name.as_str()).is_file())
            .cloned()
            .collect(),
        None => {
            let zip_lower = zip_name.to_lowercase();
            let mut names = Vec::new();
            for entry in fs::read_dir(outdir)? {
                let entry = entry?;
                if !entry.path().is_file() {
                    continue;
                }
                let Ok(name) = entry.file_name().into_string() else {
                    continue;
                };
                let lower = name.to_lowercase();
                if lower != zip_lower && lower != manifest_lower {
                    names.push(name);
                }
            }
            names
        }
    };
    selected.sort();
    selected.dedup();
    Ok(selected)
}

/// Build the manifest for `outdir` without writing it.
pub fn build_manifest(outdir: &Path, files: Option<&[String]>, info: &ManifestInfo) -> Result<Manifest, PackagingError> {
    let zip_for_listing = info.zip_name.as_deref().unwrap_or(crate::exports::DEFAULT_ZIP_NAME);
    let names = determine_files(outdir, zip_for_listing, files)?;

    let mut entries = Vec::with_capacity(names.len());
    for name in names {
        let path = outdir.join(&name);
        let size = fs::metadata(&path)?.len();
        let sha256 = sha256_file(&path)?;
        entries.push(ManifestEntry { name, size, sha256 });
    }

    Ok(Manifest {
        spec_version: info.spec_version.clone(),
        builder_version: info.builder_version.clone(),
        spec_hash: info.spec_hash.clone(),
        generated_at: info
            .generated_at
            .clone()
            .unwrap_or_else(|| Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()),
        outdir: std::path::absolute(outdir)?.display().to_string(),
        zip: info.zip_name.clone(),
        files: entries,
    })
}

/// Write `outdir/manifest.json` and return its path.
pub fn write_manifest(outdir: &Path, files: Option<&[String]>, info: &ManifestInfo) -> Result<PathBuf, PackagingError> {
    fs::create_dir_all(outdir)?;
    let manifest = build_manifest(outdir, files, info)?;
    let path = outdir.join(MANIFEST_NAME);
    fs::write(&path, serde_json::to_string_pretty(&manifest)?)?;
    tracing::info!(path = %path.display(), files = manifest.files.len(), "manifest written");
    Ok(path)
}

/// Create `outdir/zip_name` holding `manifest.json` first, then each file
/// under its bare name.
pub fn pack(
    outdir: &Path,
    zip_name: &str,
    files: Option<&[String]>,
    manifest_path: Option<&Path>,
) -> Result<PackResult, PackagingError> {
    fs::create_dir_all(outdir)?;
    let names = determine_files(outdir, zip_name, files)?;
    let manifest = manifest_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| outdir.join(MANIFEST_NAME));

    let zip_path = outdir.join(zip_name);
    let mut writer = ZipWriter::new(File::create(&zip_path)?);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    if manifest.is_file() {
        writer.start_file(MANIFEST_NAME, options)?;
        io::copy(&mut File::open(&manifest)?, &mut writer)?;
    }
    for name in &names {
        writer.start_file(name.as_str(), options)?;
        io::copy(&mut File::open(outdir.join(name))?, &mut writer)?;
    }
    writer.finish()?;

    tracing::info!(path = %zip_path.display(), entries = names.len() + 1, "archive written");
    Ok(PackResult { manifest, zip: zip_path })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LockedRemover;

    impl FileRemover for LockedRemover {
        fn remove(&self, _path: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
        }
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix("course_notes.pdf", "20240101-120000"), "course_notes_20240101-120000.pdf");
        assert_eq!(with_suffix("bundle", "X"), "bundle_X");
        assert_eq!(with_suffix(".hidden", "X"), ".hidden_X");
    }

    #[test]
    fn test_claim_keeps_name_when_removable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.html"), "old").unwrap();
        let name = claim_output_name(&StdRemover, dir.path(), "a.html");
        assert_eq!(name, "a.html");
        assert!(!dir.path().join("a.html").exists());
    }

    #[test]
    fn test_claim_renames_when_locked() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.html"), "old").unwrap();
        let name = claim_output_name(&LockedRemover, dir.path(), "a.html");
        assert!(name.starts_with("a_"));
        assert!(name.ends_with(".html"));
        assert_eq!(name.len(), "a_YYYYMMDD-HHMMSS.html".len());
    }

    #[test]
    fn test_archive_suffix_keeps_zip_extension() {
        assert_eq!(archive_with_suffix("bundle.zip", "X"), "bundle_X.zip");
        assert_eq!(archive_with_suffix("bundle", "X"), "bundle_X.zip");
        assert_eq!(archive_with_suffix("course.tar", "X"), "course_X.zip");
    }

    #[test]
    fn test_claim_locked_archive_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bundle"), "old").unwrap();
        let name = claim_archive_name(&LockedRemover, dir.path(), "bundle");
        assert!(name.starts_with("bundle_"));
        assert!(name.ends_with(".zip"));
        assert_eq!(name.len(), "bundle_YYYYMMDD-HHMMSS.zip".len());
    }

    #[test]
    fn test_claim_missing_file_is_free() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(claim_output_name(&LockedRemover, dir.path(), "new.pdf"), "new.pdf");
    }

    #[test]
    fn test_determine_files_scans_and_excludes() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt", "Manifest.json", "bundle.zip"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::create_dir(dir.path().join("sub")).unwrap();
        let names = determine_files(dir.path(), "BUNDLE.zip", None).unwrap();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_determine_files_explicit_list() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "x").unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();
        let list: Vec<String> = ["b.txt", "missing.txt", "a.txt", "b.txt", "manifest.json"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let names = determine_files(dir.path(), "bundle.zip", Some(list.as_slice())).unwrap();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_manifest_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let info = ManifestInfo { spec_version: "1.1".into(), ..Default::default() };
        let manifest = build_manifest(dir.path(), None, &info).unwrap();
        assert!(manifest.files.is_empty());
        assert_eq!(manifest.zip, None);
        assert_eq!(manifest.generated_at.len(), "2024-01-01T00:00:00".len());
        assert!(Path::new(&manifest.outdir).is_absolute());
    }
}
