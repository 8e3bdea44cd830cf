//! Tolerant, read-only access to the raw JSON payload.
//!
//! Upstream producers routinely omit or mistype fields. Every accessor here
//! substitutes a default instead of failing, and logs the substitution at
//! debug level so it can be traced with `RUST_LOG=debug`.

use log::debug;
use serde_json::Value;

static NULL: Value = Value::Null;

/// Text used when a field is missing.
pub const MISSING_TEXT: &str = "N/A";

/// A borrowed view into one JSON value (object, array or scalar).
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    value: &'a Value,
}

impl<'a> Fields<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self { value }
    }

    /// Child object field; a missing key yields a view over `null`.
    pub fn get(&self, key: &str) -> Fields<'a> {
        Fields { value: self.value.get(key).unwrap_or(&NULL) }
    }

    pub fn is_present(&self, key: &str) -> bool {
        !matches!(self.value.get(key), None | Some(Value::Null))
    }

    /// Text of a field, `"N/A"` when missing.
    pub fn text(&self, key: &str) -> String {
        self.text_or(key, MISSING_TEXT)
    }

    pub fn text_or(&self, key: &str, default: &str) -> String {
        match self.value.get(key).and_then(scalar_text) {
            Some(text) => text,
            None => default.to_string(),
        }
    }

    /// This value itself rendered as text, if it is a scalar.
    pub fn as_text(&self) -> Option<String> {
        scalar_text(self.value)
    }

    /// Numeric field, `0` when missing or malformed.
    pub fn number(&self, key: &str) -> f64 {
        match self.opt_number(key) {
            Some(n) => n,
            None => {
                debug!("field '{}' is missing or not numeric, using 0", key);
                0.0
            }
        }
    }

    /// Numeric field that may legitimately be absent. Numeric strings are accepted.
    pub fn opt_number(&self, key: &str) -> Option<f64> {
        match self.value.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        match self.value.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.to_ascii_lowercase().as_str(), "true" | "yes" | "1"),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            _ => false,
        }
    }

    /// Array field as views, empty when missing or not an array.
    pub fn list(&self, key: &str) -> Vec<Fields<'a>> {
        match self.value.get(key) {
            Some(Value::Array(items)) => items.iter().map(Fields::new).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(_) => {
                debug!("field '{}' is not a list, treating as empty", key);
                Vec::new()
            }
        }
    }

    /// Array of scalars as strings; non-scalar items are skipped.
    pub fn strings(&self, key: &str) -> Vec<String> {
        self.list(key).iter().filter_map(|item| item.as_text()).collect()
    }

    /// Key/value pairs of an object field, in document order.
    pub fn entries(&self, key: &str) -> Vec<(&'a str, Fields<'a>)> {
        match self.value.get(key) {
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.as_str(), Fields::new(v))).collect(),
            _ => Vec::new(),
        }
    }

    /// Values of this array as booleans.
    pub fn as_flags(&self) -> Vec<bool> {
        match self.value {
            Value::Array(items) => items.iter().map(|v| matches!(v, Value::Bool(true))).collect(),
            _ => Vec::new(),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => n.as_f64().map(format_number),
        Value::Bool(b) => Some(if *b { "Yes" } else { "No" }.to_string()),
        _ => None,
    }
}

/// Whole numbers without a decimal point, others with at most two decimals.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        let s = format!("{:.2}", n);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// JSON number, integral when the value is whole.
pub fn number_value(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 1e15 { serde_json::Value::from(n as i64) } else { serde_json::Value::from(n) }
}

/// `12345.0` -> `"$12,345"`.
pub fn format_currency(n: f64) -> String {
    let grouped = group_thousands(n.abs());
    if n < 0.0 { format!("-${}", grouped) } else { format!("${}", grouped) }
}

/// Rounded magnitude with thousands separators, `3980.4` -> `"3,980"`.
pub fn group_thousands(n: f64) -> String {
    let digits = (n.abs().round() as u64).to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_for_missing_fields() {
        let value = json!({"name": "Acme", "score": "85", "bad": {"x": 1}});
        let fields = Fields::new(&value);
        assert_eq!(fields.text("name"), "Acme");
        assert_eq!(fields.text("missing"), "N/A");
        assert_eq!(fields.number("score"), 85.0);
        assert_eq!(fields.number("bad"), 0.0);
        assert_eq!(fields.number("missing"), 0.0);
        assert!(fields.list("missing").is_empty());
        assert!(fields.list("bad").is_empty());
        assert_eq!(fields.get("bad").number("x"), 1.0);
        assert_eq!(fields.get("nothing").text("deeper"), "N/A");
    }

    #[test]
    fn test_scalars_render_as_text() {
        let value = json!({"n": 3, "f": 0.25, "b": true, "items": ["a", 2, {"skip": true}]});
        let fields = Fields::new(&value);
        assert_eq!(fields.text("n"), "3");
        assert_eq!(fields.text("f"), "0.25");
        assert_eq!(fields.text("b"), "Yes");
        assert_eq!(fields.strings("items"), vec!["a".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(92.0), "92");
        assert_eq!(format_number(7.5), "7.5");
        assert_eq!(format_number(1.0 / 3.0), "0.33");
        assert_eq!(format_currency(48995.0), "$48,995");
        assert_eq!(format_currency(-1200.0), "-$1,200");
        assert_eq!(format_currency(999.0), "$999");
        assert_eq!(group_thousands(3980.4), "3,980");
    }
}
