//! Raw-value parsing for individual settings fields.
//!
//! Every parser is total: a rejected raw value yields the field default with
//! `used_default` set, so callers can schedule a corrective write-back.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Parsed<T> {
    pub value: T,
    pub used_default: bool,
}

impl<T> Parsed<T> {
    fn ok(value: T) -> Self {
        Self { value, used_default: false }
    }

    fn default(value: T) -> Self {
        Self { value, used_default: true }
    }
}

/// Scalar-to-string coercion. Arrays, objects and null never coerce.
fn coerce_string(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn present(raw: Option<&Value>) -> Option<&Value> {
    match raw {
        Some(Value::Null) | None => None,
        Some(v) => Some(v),
    }
}

pub(crate) fn parse_string(raw: Option<&Value>, default: &str) -> Parsed<String> {
    match present(raw).and_then(coerce_string) {
        Some(s) => Parsed::ok(s.trim().to_string()),
        None => Parsed::default(default.to_string()),
    }
}

/// Trimmed and lowercased; empty falls to the default.
pub(crate) fn parse_sort(raw: Option<&Value>, default: &str) -> Parsed<String> {
    let parsed = parse_string(raw, default);
    if parsed.value.is_empty() {
        return Parsed::default(default.to_string());
    }
    Parsed { value: parsed.value.to_lowercase(), used_default: parsed.used_default }
}

/// Comma-separated list: segments trimmed, empties dropped. An empty result
/// after filtering is a parse failure and falls to the default.
pub(crate) fn parse_string_list(raw: Option<&Value>, default: &[String]) -> Parsed<Vec<String>> {
    let Some(s) = present(raw).and_then(coerce_string) else {
        return Parsed::default(default.to_vec());
    };
    let items: Vec<String> = s
        .split(',')
        .map(str::trim)
        .filter(|seg| !seg.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() {
        return Parsed::default(default.to_vec());
    }
    Parsed::ok(items)
}

/// Numeric coercion from numbers or numeric strings. NaN and negatives are
/// parse failures; fractional values floor into the integer type.
pub(crate) fn parse_non_negative(raw: Option<&Value>, default: u32) -> Parsed<u32> {
    let Some(raw) = present(raw) else {
        return Parsed::default(default);
    };
    let n = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() && n >= 0.0 => Parsed::ok(n.min(u32::MAX as f64) as u32),
        _ => Parsed::default(default),
    }
}

/// `"on"`/`"off"` (case-insensitive) parse exactly; anything else present
/// coerces by truthiness and is never a parse failure.
pub(crate) fn parse_bool(raw: Option<&Value>, default: bool) -> Parsed<bool> {
    let Some(raw) = present(raw) else {
        return Parsed::default(default);
    };
    if let Value::String(s) = raw {
        match s.trim().to_lowercase().as_str() {
            "on" => return Parsed::ok(true),
            "off" => return Parsed::ok(false),
            _ => {}
        }
    }
    Parsed::ok(truthy(raw))
}

fn truthy(raw: &Value) -> bool {
    match raw {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Normalize a hashtag: trim, strip every leading `#`, re-prefix one `#`.
/// An empty result after stripping is the valid "no hashtag" value, not a
/// parse failure. A missing raw value falls to the default.
pub(crate) fn parse_hashtag(raw: Option<&Value>, default: Option<&str>) -> Parsed<Option<String>> {
    let Some(s) = present(raw).and_then(coerce_string) else {
        return Parsed::default(default.map(str::to_string));
    };
    Parsed::ok(normalize_hashtag(&s))
}

pub(crate) fn normalize_hashtag(raw: &str) -> Option<String> {
    let stripped = raw.trim().trim_start_matches('#');
    if stripped.is_empty() {
        None
    } else {
        Some(format!("#{stripped}"))
    }
}

/// Render a typed value back into its raw persisted form.
pub(crate) fn render_string_list(items: &[String]) -> Value {
    Value::String(items.join(","))
}

pub(crate) fn render_hashtag(tag: Option<&str>) -> Value {
    Value::String(tag.unwrap_or_default().to_string())
}
