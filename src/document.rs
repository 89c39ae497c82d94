//! Document Accessors - the surface renderers read from
//!
//! Course documents stay as loosely-typed JSON. Every accessor treats a
//! missing or mis-shaped container as empty and never fails.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const DEFAULT_TITLE: &str = "课程";
pub const DEFAULT_WATERMARK: &str = "holo-tutor-agent";

/// Characters that are not allowed in a Windows filename component.
const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Object at `key`, or `None` if absent or not an object.
pub fn object_at<'a>(doc: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    doc.get(key).and_then(Value::as_object)
}

/// Array at `key`, or an empty slice if absent or not an array.
pub fn array_at<'a>(doc: &'a Value, key: &str) -> &'a [Value] {
    doc.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn non_blank(v: Option<&Value>) -> Option<&str> {
    v.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

fn meta_str<'a>(doc: &'a Value, keys: &[&str]) -> Option<&'a str> {
    let meta = object_at(doc, "meta")?;
    keys.iter().find_map(|k| non_blank(meta.get(*k)))
}

pub fn meta_title(doc: &Value) -> String {
    meta_str(doc, &["title"])
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string())
}

/// `meta.date`, then `meta.generated_at`, then today's local date.
pub fn meta_date(doc: &Value) -> String {
    meta_str(doc, &["date", "generated_at"])
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string())
}

pub fn meta_watermark(doc: &Value) -> String {
    meta_str(doc, &["watermark"])
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| DEFAULT_WATERMARK.to_string())
}

/// Markdown body of a section-like item: `content_md`, falling back to `content`.
///
/// Unlike the meta accessors the text is returned untrimmed.
pub fn content_md(item: &Value) -> &str {
    non_blank(item.get("content_md"))
        .or_else(|| non_blank(item.get("content")))
        .unwrap_or("")
}

/// String field of an item, empty when absent.
pub fn str_field<'a>(item: &'a Value, key: &str) -> &'a str {
    item.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Lecture content prefers `lecture_notes` and falls back to `sections`.
pub fn lecture_items(doc: &Value) -> &[Value] {
    let notes = array_at(doc, "lecture_notes");
    if notes.is_empty() {
        array_at(doc, "sections")
    } else {
        notes
    }
}

/// Make a string safe to use as a single filename component.
pub fn sanitize_filename_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|ch| if INVALID_FILENAME_CHARS.contains(&ch) { '_' } else { ch })
        .collect();
    let out = replaced.trim().trim_end_matches('.');
    if out.is_empty() {
        "output".to_string()
    } else {
        out.to_string()
    }
}

/// The fixed quiz bank categories, in validation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizCategory {
    SingleChoice,
    FillBlank,
    TrueFalse,
}

impl QuizCategory {
    pub const ALL: [QuizCategory; 3] = [
        QuizCategory::SingleChoice,
        QuizCategory::FillBlank,
        QuizCategory::TrueFalse,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            QuizCategory::SingleChoice => "single_choice",
            QuizCategory::FillBlank => "fill_blank",
            QuizCategory::TrueFalse => "true_false",
        }
    }

    pub fn heading(&self) -> &'static str {
        match self {
            QuizCategory::SingleChoice => "一、单选题（10题）",
            QuizCategory::FillBlank => "二、填空题（10题）",
            QuizCategory::TrueFalse => "三、判断题（10题）",
        }
    }

    /// Questions of this category, empty if the bank or category is missing.
    pub fn questions<'a>(&self, doc: &'a Value) -> &'a [Value] {
        doc.get("quiz_bank")
            .map(|qb| array_at(qb, self.key()))
            .unwrap_or(&[])
    }
}

/// Visual types with a dedicated renderer; anything else degrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualKind {
    Mermaid,
    Plot,
    Cards,
    Unknown,
}

impl VisualKind {
    pub fn of(visual: &Value) -> Self {
        match str_field(visual, "type").trim().to_lowercase().as_str() {
            "flow" | "structure" | "cycle" | "mermaid" => VisualKind::Mermaid,
            "plot" => VisualKind::Plot,
            "cards" => VisualKind::Cards,
            _ => VisualKind::Unknown,
        }
    }
}

/// Render a true/false answer as 正确/错误 where it is recognisable.
pub fn true_false_label(answer: &Value) -> String {
    match answer {
        Value::Bool(true) => "正确".to_string(),
        Value::Bool(false) => "错误".to_string(),
        other => {
            let s = display_value(other);
            match s.trim() {
                "true" | "True" | "T" | "正确" => "正确".to_string(),
                "false" | "False" | "F" | "错误" => "错误".to_string(),
                t => t.to_string(),
            }
        }
    }
}

/// Plain-text rendering of a scalar; strings are not quoted.
pub fn display_value(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Truthiness of a loosely-typed flag: null, false, zero and empty values
/// are false.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Coefficient name, min, max, default.
const PLOT_PARAMS: [(&str, f64, f64, f64); 3] = [
    ("a", -5.0, 5.0, 1.0),
    ("b", -10.0, 10.0, 0.0),
    ("c", -10.0, 10.0, 0.0),
];
const PLOT_STEP: f64 = 0.01;
const PLOT_BOUND: f64 = 10.0;
const PLOT_SAMPLES: i64 = 800;

fn as_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|f| f.is_finite())
}

fn as_integer(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn number_or(obj: Option<&Map<String, Value>>, key: &str, default: f64) -> f64 {
    obj.and_then(|o| o.get(key)).and_then(as_number).unwrap_or(default)
}

fn flag_or(obj: Option<&Map<String, Value>>, key: &str, default: bool) -> bool {
    obj.and_then(|o| o.get(key)).map_or(default, truthy)
}

/// Resolved configuration of the `y = ax² + bx + c` plot.
///
/// `None` unless `interactive.params` names all of `a`, `b` and `c`.
/// Numeric fields are coerced from numbers, booleans or numeric strings;
/// anything else takes the default.
pub fn interactive_config(doc: &Value) -> Option<Value> {
    let interactive = object_at(doc, "interactive");
    let params = interactive.and_then(|i| i.get("params")).and_then(Value::as_object)?;
    if !PLOT_PARAMS.iter().all(|(name, ..)| params.contains_key(*name)) {
        return None;
    }
    let section = |key: &str| interactive.and_then(|i| i.get(key)).and_then(Value::as_object);

    let mut resolved = Map::new();
    for (name, min, max, default) in PLOT_PARAMS {
        let spec = params.get(name).and_then(Value::as_object);
        resolved.insert(
            name.to_string(),
            json!({
                "min": number_or(spec, "min", min),
                "max": number_or(spec, "max", max),
                "step": number_or(spec, "step", PLOT_STEP),
                "default": number_or(spec, "default", default),
            }),
        );
    }

    let domain = section("domain");
    let range = section("range");
    let plot = section("plot_config");
    let features = section("features");
    Some(json!({
        "type": interactive.and_then(|i| i.get("type")).cloned().unwrap_or_else(|| json!("")),
        "domain": {
            "x_min": number_or(domain, "x_min", -PLOT_BOUND),
            "x_max": number_or(domain, "x_max", PLOT_BOUND),
        },
        "range": {
            "y_min": number_or(range, "y_min", -PLOT_BOUND),
            "y_max": number_or(range, "y_max", PLOT_BOUND),
        },
        "params": resolved,
        "plot_config": {
            "samples": plot.and_then(|p| p.get("samples")).and_then(as_integer).unwrap_or(PLOT_SAMPLES),
            "grid": flag_or(plot, "grid", true),
        },
        "features": {
            "show_vertex": flag_or(features, "show_vertex", true),
            "show_axis": flag_or(features, "show_axis", true),
            "show_intercepts": flag_or(features, "show_intercepts", false),
        },
    }))
}
