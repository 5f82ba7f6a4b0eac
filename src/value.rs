//! Classification of raw source values.
//!
//! Scrapers hand us untyped JSON. Everything that decides "did this source
//! actually say something" goes through [`is_empty`], so the merger and the
//! filter agree on what absence looks like.

use serde_json::Value;

/// Literal scrapers emit when a field was rendered but had no content.
pub const NULL_SENTINEL: &str = "null";

/// Closed set of shapes a raw value can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Text,
    Flag,
    Number,
    Mapping,
    Sequence,
}

impl ValueKind {
    /// Classify a raw JSON value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::String(_) => ValueKind::Text,
            Value::Bool(_) => ValueKind::Flag,
            Value::Number(_) => ValueKind::Number,
            Value::Object(_) => ValueKind::Mapping,
            Value::Array(_) => ValueKind::Sequence,
        }
    }
}

/// True when the value carries no information.
///
/// Blank or whitespace-only strings, `null`, empty objects, empty arrays and
/// the literal string `"null"` are empty. `0`, `false` and `"0"` are data.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed.is_empty() || trimmed == NULL_SENTINEL
        }
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Like [`is_empty`] but for a field that may be missing entirely.
pub fn is_missing_or_empty(value: Option<&Value>) -> bool {
    value.map_or(true, is_empty)
}

/// Truthiness used for flag fields such as `is_listed`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => {
            let lowered = s.trim().to_lowercase();
            !matches!(lowered.as_str(), "" | "false" | "0" | "no" | "n" | NULL_SENTINEL)
        }
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_shapes() {
        assert!(is_empty(&json!("")));
        assert!(is_empty(&json!("   \t")));
        assert!(is_empty(&Value::Null));
        assert!(is_empty(&json!({})));
        assert!(is_empty(&json!([])));
        assert!(is_empty(&json!("null")));
        assert!(is_empty(&json!(" null ")));
    }

    #[test]
    fn test_zero_and_false_are_data() {
        assert!(!is_empty(&json!(0)));
        assert!(!is_empty(&json!(false)));
        assert!(!is_empty(&json!("0")));
        assert!(!is_empty(&json!({"2023": {}})));
        assert!(!is_empty(&json!([""])));
    }

    #[test]
    fn test_missing() {
        assert!(is_missing_or_empty(None));
        assert!(is_missing_or_empty(Some(&json!(""))));
        assert!(!is_missing_or_empty(Some(&json!("x"))));
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("상장")));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("False")));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
    }

    #[test]
    fn test_kind() {
        assert_eq!(ValueKind::of(&json!("a")), ValueKind::Text);
        assert_eq!(ValueKind::of(&json!({})), ValueKind::Mapping);
        assert_eq!(ValueKind::of(&json!([1])), ValueKind::Sequence);
        assert_eq!(ValueKind::of(&json!(2.5)), ValueKind::Number);
    }
}
