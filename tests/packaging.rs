//! Manifest and archive contract tests.

use coursepack_core::packaging::{pack, write_manifest, Manifest, ManifestInfo};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn info(zip_name: Option<&str>) -> ManifestInfo {
    ManifestInfo {
        spec_version: "1.1".to_string(),
        builder_version: "1.1.0".to_string(),
        spec_hash: "f".repeat(64),
        generated_at: Some("2024-01-01T00:00:00".to_string()),
        zip_name: zip_name.map(String::from),
    }
}

fn entry_names(zip_path: &Path) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(File::open(zip_path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

#[test]
fn manifest_and_archive_cover_listed_files() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path();
    fs::write(out.join("a.txt"), b"hello").unwrap();
    fs::write(out.join("b.txt"), b"").unwrap();
    fs::write(out.join("stray.log"), b"not listed").unwrap();
    let files = vec!["b.txt".to_string(), "a.txt".to_string()];

    let manifest_path = write_manifest(out, Some(files.as_slice()), &info(Some("bundle.zip"))).unwrap();
    let manifest: Manifest = serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();

    assert_eq!(manifest.files.len(), 2);
    assert_eq!(manifest.files[0].name, "a.txt");
    assert_eq!(manifest.files[0].size, 5);
    assert_eq!(manifest.files[0].sha256, digest(b"hello"));
    assert_eq!(manifest.files[1].name, "b.txt");
    assert_eq!(manifest.files[1].size, 0);
    assert_eq!(manifest.files[1].sha256, digest(b""));
    assert_eq!(manifest.zip.as_deref(), Some("bundle.zip"));

    let result = pack(out, "bundle.zip", Some(files.as_slice()), Some(manifest_path.as_path())).unwrap();
    assert_eq!(result.zip, out.join("bundle.zip"));
    assert_eq!(entry_names(&result.zip), vec!["manifest.json", "a.txt", "b.txt"]);
}

#[test]
fn archive_entries_are_deflated_and_match_sources() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path();
    fs::write(out.join("notes.txt"), "重复 ".repeat(500)).unwrap();
    let manifest_path = write_manifest(out, None, &info(Some("bundle.zip"))).unwrap();
    let result = pack(out, "bundle.zip", None, Some(manifest_path.as_path())).unwrap();

    let mut archive = zip::ZipArchive::new(File::open(&result.zip).unwrap()).unwrap();
    let mut entry = archive.by_name("notes.txt").unwrap();
    assert_eq!(entry.compression(), zip::CompressionMethod::Deflated);
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    assert_eq!(content, "重复 ".repeat(500));
}

#[test]
fn scanning_excludes_manifest_and_archive() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path();
    fs::write(out.join("z.txt"), b"z").unwrap();
    fs::write(out.join("m.txt"), b"m").unwrap();
    fs::write(out.join("bundle.zip"), b"old archive").unwrap();

    let manifest_path = write_manifest(out, None, &info(Some("bundle.zip"))).unwrap();
    let manifest: Manifest = serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();
    let names: Vec<&str> = manifest.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["m.txt", "z.txt"]);

    let result = pack(out, "bundle.zip", None, None).unwrap();
    assert_eq!(entry_names(&result.zip), vec!["manifest.json", "m.txt", "z.txt"]);
}

#[test]
fn manifest_is_pretty_and_keeps_unicode() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path();
    fs::write(out.join("讲稿.docx"), b"x").unwrap();
    let manifest_path = write_manifest(out, None, &info(None)).unwrap();
    let text = fs::read_to_string(&manifest_path).unwrap();

    assert!(text.contains("\"name\": \"讲稿.docx\""));
    assert!(text.contains("\n  \"spec_version\": \"1.1\""));
    assert!(text.contains("\"zip\": null"));
}

#[test]
fn identical_inputs_give_identical_archives() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path();
    fs::write(out.join("a.txt"), b"hello").unwrap();
    let manifest_path = write_manifest(out, None, &info(Some("one.zip"))).unwrap();

    let files = vec!["a.txt".to_string()];
    let first = pack(out, "one.zip", Some(files.as_slice()), Some(manifest_path.as_path())).unwrap();
    let second = pack(out, "two.zip", Some(files.as_slice()), Some(manifest_path.as_path())).unwrap();
    assert_eq!(fs::read(first.zip).unwrap(), fs::read(second.zip).unwrap());
}
