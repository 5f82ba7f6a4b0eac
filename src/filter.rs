//! Coercion of a merged record into canonical stored types.
//!
//! Pure: reads the merged record and builds a new [`CanonicalRecord`]. Bad
//! data never fails the record; a field that cannot be coerced becomes null.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::currency::parse_amount_value;
use crate::models::{CanonicalRecord, CanonicalValue, SourceRecord};
use crate::schema::{FieldDescriptor, StoredType, FIELDS};
use crate::value::{is_empty, is_truthy, ValueKind};

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})\s*[-./년]\s*(\d{1,2})\s*[-./월]\s*(\d{1,2})\s*일?$").unwrap()
});

/// Knobs for coercion.
#[derive(Debug, Clone)]
pub struct FilterOptions {
    /// Delimiter for list fields that arrive as one delimited string.
    pub list_delimiter: String,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            list_delimiter: ",".to_string(),
        }
    }
}

/// Coerce a merged record with default options.
pub fn coerce(merged: &SourceRecord) -> CanonicalRecord {
    coerce_with(merged, &FilterOptions::default())
}

/// Coerce every schema field of `merged` to its stored type.
pub fn coerce_with(merged: &SourceRecord, options: &FilterOptions) -> CanonicalRecord {
    let fields = FIELDS
        .iter()
        .map(|field| (field.name, coerce_field(field, merged.get(field.name), options)))
        .collect();
    CanonicalRecord::from_fields(fields)
}

fn coerce_field(
    field: &FieldDescriptor,
    raw: Option<&Value>,
    options: &FilterOptions,
) -> CanonicalValue {
    let Some(raw) = raw.filter(|v| !is_empty(v)) else {
        return match field.stored {
            StoredType::Boolean => CanonicalValue::Bool(false),
            _ => CanonicalValue::Null,
        };
    };

    let coerced = match field.stored {
        StoredType::Boolean => Some(CanonicalValue::Bool(is_truthy(raw))),
        StoredType::Integer => to_integer(raw),
        StoredType::Headcount => to_headcount(raw),
        StoredType::Decimal => parse_amount_value(raw).map(CanonicalValue::Decimal),
        StoredType::TextList { split } => to_text_list(raw, split.then_some(options)),
        StoredType::FinancialTable => to_financial_table(raw),
        StoredType::Json => to_json(raw),
        StoredType::Date => to_date(raw),
        StoredType::Text => to_text(raw),
    };

    coerced.unwrap_or_else(|| {
        debug!(
            "Dropping {} value of kind {:?}: {}",
            field.name,
            ValueKind::of(raw),
            raw
        );
        CanonicalValue::Null
    })
}

fn to_integer(raw: &Value) -> Option<CanonicalValue> {
    let n = match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    Some(CanonicalValue::Integer(n))
}

/// First run of digits in the raw text ("510명" -> 510). A thousands
/// separator ends the run, so "1,204명" reads as 1.
fn to_headcount(raw: &Value) -> Option<CanonicalValue> {
    match raw {
        Value::Number(n) => n.as_i64().map(CanonicalValue::Integer),
        Value::String(s) => DIGIT_RUN
            .find(s)
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .map(CanonicalValue::Integer),
        _ => None,
    }
}

/// String or list of strings to a JSON array. With options, a string is
/// split on the configured delimiter; without, it becomes a single element.
fn to_text_list(raw: &Value, split: Option<&FilterOptions>) -> Option<CanonicalValue> {
    let items: Vec<String> = match raw {
        Value::String(s) => match split {
            Some(options) => s
                .split(options.list_delimiter.as_str())
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            None => vec![s.trim().to_string()],
        },
        Value::Array(values) => values
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        _ => return None,
    };

    if items.is_empty() {
        return None;
    }
    encode(&items)
}

/// Re-run every leaf amount through the currency parser, keeping the
/// surrounding structure. Unparsable amounts become null.
fn to_financial_table(raw: &Value) -> Option<CanonicalValue> {
    let table = raw.as_object()?;
    if table.is_empty() {
        return None;
    }
    encode(&normalize_amounts(raw))
}

fn normalize_amounts(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, nested)| (key.clone(), normalize_amounts(nested)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(normalize_amounts).collect()),
        leaf => parse_amount_value(leaf)
            .map(|d| Value::String(d.to_string()))
            .unwrap_or_else(|| {
                debug!("Unreadable financial amount {}", leaf);
                Value::Null
            }),
    }
}

/// JSON-encode a structured value. Strings that already hold JSON (some
/// scrapers pre-encode charts) are embedded as parsed structure.
fn to_json(raw: &Value) -> Option<CanonicalValue> {
    let structured = match raw {
        Value::String(s) => match serde_json::from_str::<Value>(s.trim()) {
            Ok(parsed @ (Value::Object(_) | Value::Array(_))) => parsed,
            _ => Value::String(s.trim().to_string()),
        },
        other => other.clone(),
    };
    if is_empty(&structured) {
        return None;
    }
    encode(&structured)
}

fn to_date(raw: &Value) -> Option<CanonicalValue> {
    let caps = DATE.captures(raw.as_str()?.trim())?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(CanonicalValue::Date)
}

fn to_text(raw: &Value) -> Option<CanonicalValue> {
    let text = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };
    (!text.is_empty()).then_some(CanonicalValue::Text(text))
}

fn encode<T: serde::Serialize>(value: &T) -> Option<CanonicalValue> {
    serde_json::to_string(value).ok().map(CanonicalValue::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::str::FromStr;

    fn record(value: Value) -> SourceRecord {
        SourceRecord::from_value(&value).unwrap()
    }

    #[test]
    fn test_empty_record_is_all_null() {
        let canonical = coerce(&SourceRecord::new());
        assert_eq!(canonical.len(), FIELDS.len());
        for (name, value) in canonical.iter() {
            if name == "is_listed" {
                assert_eq!(value, &CanonicalValue::Bool(false));
            } else {
                assert!(value.is_null(), "{name} should be null");
            }
        }
    }

    #[test]
    fn test_default_template_is_all_null() {
        let canonical = coerce(&SourceRecord::defaults());
        assert_eq!(canonical.populated(), 1);
    }

    #[test]
    fn test_integers() {
        let canonical = coerce(&record(json!({
            "established_year": "2013",
            "latest_fiscal_year": 2023,
            "patent_count": "many",
            "trademark_count": "0"
        })));
        assert_eq!(canonical.get("established_year").unwrap().as_i64(), Some(2013));
        assert_eq!(canonical.get("latest_fiscal_year").unwrap().as_i64(), Some(2023));
        assert!(canonical.get("patent_count").unwrap().is_null());
        assert_eq!(canonical.get("trademark_count").unwrap().as_i64(), Some(0));
    }

    #[test]
    fn test_headcount() {
        let canonical = coerce(&record(json!({"employee_count": "510명"})));
        assert_eq!(canonical.get("employee_count").unwrap().as_i64(), Some(510));

        let canonical = coerce(&record(json!({"employee_count": "약 1204명 (2024)"})));
        assert_eq!(canonical.get("employee_count").unwrap().as_i64(), Some(1204));

        let canonical = coerce(&record(json!({"employee_count": "1,204명"})));
        assert_eq!(canonical.get("employee_count").unwrap().as_i64(), Some(1));

        let canonical = coerce(&record(json!({"employee_count": "비공개"})));
        assert!(canonical.get("employee_count").unwrap().is_null());
    }

    #[test]
    fn test_listing_flag() {
        let listed = coerce(&record(json!({"is_listed": true})));
        assert_eq!(listed.get("is_listed").unwrap().as_bool(), Some(true));
        let unlisted = coerce(&record(json!({"is_listed": ""})));
        assert_eq!(unlisted.get("is_listed").unwrap().as_bool(), Some(false));
    }

    #[test]
    fn test_decimals() {
        let canonical = coerce(&record(json!({
            "latest_revenue": "1조 4천억 원",
            "latest_net_income": "- 262억 4,876만원",
            "market_cap": "N/A"
        })));
        assert_eq!(
            canonical.get("latest_revenue").unwrap().as_decimal(),
            Some(Decimal::from_str("1400000000000").unwrap())
        );
        assert_eq!(
            canonical.get("latest_net_income").unwrap().as_decimal(),
            Some(Decimal::from_str("-26248760000").unwrap())
        );
        assert!(canonical.get("market_cap").unwrap().is_null());
    }

    #[test]
    fn test_text_lists() {
        let canonical = coerce(&record(json!({
            "industry": " Fintech ",
            "products_services": "토스, 토스뱅크 ,, 토스증권"
        })));
        assert_eq!(canonical.get("industry").unwrap().as_str(), Some(r#"["Fintech"]"#));
        assert_eq!(
            canonical.get("products_services").unwrap().as_str(),
            Some(r#"["토스","토스뱅크","토스증권"]"#)
        );

        let canonical = coerce(&record(json!({"industry": ["금융", 3, " ", "IT"]})));
        assert_eq!(canonical.get("industry").unwrap().as_str(), Some(r#"["금융","IT"]"#));

        let canonical = coerce(&record(json!({"products_services": [" ", null]})));
        assert!(canonical.get("products_services").unwrap().is_null());
    }

    #[test]
    fn test_custom_delimiter() {
        let options = FilterOptions {
            list_delimiter: "/".to_string(),
        };
        let canonical = coerce_with(&record(json!({"products_services": "A/B, C"})), &options);
        assert_eq!(
            canonical.get("products_services").unwrap().as_str(),
            Some(r#"["A","B, C"]"#)
        );
    }

    #[test]
    fn test_financial_table() {
        let canonical = coerce(&record(json!({
            "financial_history": {
                "2023": {"매출액": "1조 4천억", "영업이익": "-", "자본금": "50억"},
                "2022": "broken"
            }
        })));
        assert_eq!(
            canonical.get("financial_history").unwrap().as_str(),
            Some(
                r#"{"2023":{"매출액":"1400000000000","영업이익":null,"자본금":"5000000000"},"2022":null}"#
            )
        );
    }

    #[test]
    fn test_financial_table_nested_metrics() {
        let canonical = coerce(&record(json!({
            "financial_history": {
                "2023": {"매출액": {"연결": "5억", "별도": "3억"}, "자본금": "1억"},
                "2022": "7억"
            }
        })));
        assert_eq!(
            canonical.get("financial_history").unwrap().as_str(),
            Some(
                r#"{"2023":{"매출액":{"연결":"500000000","별도":"300000000"},"자본금":"100000000"},"2022":"700000000"}"#
            )
        );
    }

    #[test]
    fn test_financial_table_keeps_empty_years() {
        let canonical = coerce(&record(json!({"financial_history": {"2023": {}}})));
        assert_eq!(
            canonical.get("financial_history").unwrap().as_str(),
            Some(r#"{"2023":{}}"#)
        );
        let canonical = coerce(&record(json!({"financial_history": {}})));
        assert!(canonical.get("financial_history").unwrap().is_null());
    }

    #[test]
    fn test_json_fields() {
        let canonical = coerce(&record(json!({
            "employee_history": "{\"2023\": \"500\", \"2024\": \"510\"}",
            "investors": ["A벤처스", "B파트너스"],
            "tech_stack": "Rust",
            "recent_news": {}
        })));
        assert_eq!(
            canonical.get("employee_history").unwrap().as_str(),
            Some(r#"{"2023":"500","2024":"510"}"#)
        );
        assert_eq!(
            canonical.get("investors").unwrap().as_str(),
            Some(r#"["A벤처스","B파트너스"]"#)
        );
        assert_eq!(canonical.get("tech_stack").unwrap().as_str(), Some(r#""Rust""#));
        assert!(canonical.get("recent_news").unwrap().is_null());
    }

    #[test]
    fn test_dates() {
        for text in ["2024-03-05", "2024.3.5", "2024/03/05", "2024년 3월 5일"] {
            let canonical = coerce(&record(json!({"latest_funding_date": text})));
            assert_eq!(
                canonical.get("latest_funding_date").unwrap(),
                &CanonicalValue::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()),
                "{text}"
            );
        }
        let canonical = coerce(&record(json!({"latest_funding_date": "2024-13-40"})));
        assert!(canonical.get("latest_funding_date").unwrap().is_null());
    }

    #[test]
    fn test_plain_text() {
        let canonical = coerce(&record(json!({
            "name": "  비바리퍼블리카 ",
            "address": "   ",
            "competitors": ["카카오페이", "네이버페이"]
        })));
        assert_eq!(canonical.get("name").unwrap().as_str(), Some("비바리퍼블리카"));
        assert!(canonical.get("address").unwrap().is_null());
        assert_eq!(
            canonical.get("competitors").unwrap().as_str(),
            Some("카카오페이, 네이버페이")
        );
    }

    #[test]
    fn test_input_is_not_mutated() {
        let merged = record(json!({"name": " A ", "latest_revenue": "5억"}));
        let before = merged.clone();
        let _ = coerce(&merged);
        assert_eq!(merged, before);
    }
}
