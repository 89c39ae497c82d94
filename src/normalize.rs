//! Normalization - legacy field names onto the current schema shape
//!
//! All aliasing lives in one ordered table applied by a single
//! fill-if-absent routine. A rule never overwrites a canonical field that is
//! already present, which makes the whole pass idempotent.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructureError {
    #[error("<root>: expected an object")]
    RootNotObject,
}

/// Where in the document an alias applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasScope {
    /// A top-level object, e.g. `meta`.
    Object(&'static str),
    /// Every object element of a top-level array, e.g. `sections[*]`.
    EachItem(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAlias {
    pub scope: AliasScope,
    pub legacy: &'static str,
    pub canonical: &'static str,
}

const fn alias(scope: AliasScope, legacy: &'static str, canonical: &'static str) -> FieldAlias {
    FieldAlias { scope, legacy, canonical }
}

/// Applied in order.
pub const FIELD_ALIASES: &[FieldAlias] = &[
    alias(AliasScope::Object("meta"), "generated_at", "date"),
    alias(AliasScope::Object("exports"), "docx", "lecture_docx"),
    alias(AliasScope::EachItem("sections"), "content", "content_md"),
    alias(AliasScope::EachItem("lecture_notes"), "content", "content_md"),
];

/// Normalize a course document into its canonical shape.
///
/// Mis-shaped containers (a `meta` that is a string, a `sections` that is
/// not an array, non-object items) are skipped silently.
pub fn normalize(mut doc: Value) -> Result<Value, StructureError> {
    let root = doc.as_object_mut().ok_or(StructureError::RootNotObject)?;
    for alias in FIELD_ALIASES {
        apply_alias(root, alias);
    }
    Ok(doc)
}

fn apply_alias(root: &mut Map<String, Value>, alias: &FieldAlias) {
    match alias.scope {
        AliasScope::Object(key) => {
            if let Some(obj) = root.get_mut(key).and_then(Value::as_object_mut) {
                fill_if_absent(obj, alias.legacy, alias.canonical);
            }
        }
        AliasScope::EachItem(key) => {
            if let Some(items) = root.get_mut(key).and_then(Value::as_array_mut) {
                for obj in items.iter_mut().filter_map(Value::as_object_mut) {
                    fill_if_absent(obj, alias.legacy, alias.canonical);
                }
            }
        }
    }
}

fn fill_if_absent(obj: &mut Map<String, Value>, legacy: &str, canonical: &str) {
    if obj.contains_key(canonical) {
        return;
    }
    if let Some(value) = obj.get(legacy).cloned() {
        tracing::debug!(legacy, canonical, "normalized legacy field");
        obj.insert(canonical.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generated_at_fills_date() {
        let doc = normalize(json!({"meta": {"generated_at": "2024-01-01"}})).unwrap();
        assert_eq!(doc["meta"]["date"], "2024-01-01");
        assert_eq!(doc["meta"]["generated_at"], "2024-01-01");
    }

    #[test]
    fn existing_date_is_kept() {
        let doc = normalize(json!({"meta": {"date": "d", "generated_at": "g"}})).unwrap();
        assert_eq!(doc["meta"]["date"], "d");
    }

    #[test]
    fn docx_flag_fills_lecture_docx() {
        let doc = normalize(json!({"exports": {"docx": false}})).unwrap();
        assert_eq!(doc["exports"]["lecture_docx"], false);
        let doc = normalize(json!({"exports": {"docx": false, "lecture_docx": true}})).unwrap();
        assert_eq!(doc["exports"]["lecture_docx"], true);
    }

    #[test]
    fn content_fills_content_md_for_sections_and_notes() {
        let doc = normalize(json!({
            "sections": [{"id": "s1", "content": "a"}, {"id": "s2", "content_md": "b", "content": "x"}, 7],
            "lecture_notes": [{"content": "n"}]
        }))
        .unwrap();
        assert_eq!(doc["sections"][0]["content_md"], "a");
        assert_eq!(doc["sections"][1]["content_md"], "b");
        assert_eq!(doc["sections"][2], 7);
        assert_eq!(doc["lecture_notes"][0]["content_md"], "n");
    }

    #[test]
    fn malformed_shapes_are_left_alone() {
        let input = json!({"meta": "not an object", "exports": [1], "sections": {"a": 1}});
        let doc = normalize(input.clone()).unwrap();
        assert_eq!(doc, input);
    }

    #[test]
    fn missing_containers_are_not_invented() {
        let doc = normalize(json!({"spec_version": "1.1"})).unwrap();
        assert_eq!(doc, json!({"spec_version": "1.1"}));
    }

    #[test]
    fn root_must_be_object() {
        assert_eq!(normalize(json!([1, 2])), Err(StructureError::RootNotObject));
        assert_eq!(
            StructureError::RootNotObject.to_string(),
            "<root>: expected an object"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let input = json!({
            "meta": {"generated_at": "2024-01-01"},
            "exports": {"docx": true},
            "sections": [{"content": "a"}]
        });
        let once = normalize(input).unwrap();
        let twice = normalize(once.clone()).unwrap();
        assert_eq!(once, twice);
    }
}
