//! Hashing System - SHA-256 for Documents and Artifacts
//!
//! The spec hash fingerprints exactly what the caller submitted, so it is
//! always taken before normalization touches the document.

use sha2::{Digest, Sha256};
use serde::Serialize;
use serde_json::{to_string, Value};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const FILE_CHUNK_SIZE: usize = 1024 * 1024;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// SHA-256 of a file's full byte stream, read in 1 MiB chunks.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; FILE_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Convert to canonical JSON (sorted keys, no whitespace, non-ASCII kept literal)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

/// Fingerprint of a course document: sha256(canonical_json(doc)).
pub fn canonical_hash<T: Serialize>(doc: &T) -> Result<String, serde_json::Error> {
    let canonical = canonical_json(doc)?;
    Ok(sha256_hex(canonical.as_bytes()))
}
