//! Field-by-field merge of source records under a fixed precedence.
//!
//! Sources are ordered by precedence, the first being the primary. Merging
//! walks the canonical schema (never the sources' own key order) and
//! dispatches on each field's [`MergeKind`].

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::SourceRecord;
use crate::schema::{FieldDescriptor, MergeKind, FIELDS};
use crate::value::{is_empty, is_missing_or_empty, is_truthy};

/// Where a merged field's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "origin", content = "source")]
pub enum Origin {
    /// Taken from the source at this precedence index.
    Source(usize),
    /// Built from more than one source (OR'd flags, combined tables).
    Combined,
    /// No source supplied it; the schema default was used.
    Default,
}

/// Merged record plus per-field provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub record: SourceRecord,
    /// One entry per schema field, in schema order.
    pub provenance: Vec<(&'static str, Origin)>,
    /// Precedence indices of sources that were treated as empty.
    pub unusable_sources: Vec<usize>,
}

impl MergeOutcome {
    pub fn origin(&self, name: &str) -> Option<Origin> {
        self.provenance
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, origin)| *origin)
    }
}

/// Merge two sources; `primary` wins whenever it has a value.
pub fn merge(primary: &Value, secondary: &Value) -> SourceRecord {
    merge_all(&[primary, secondary])
}

/// Merge any number of sources, highest precedence first.
pub fn merge_all(sources: &[&Value]) -> SourceRecord {
    merge_with_provenance(sources).record
}

/// Merge sources and report which source supplied each field.
pub fn merge_with_provenance(sources: &[&Value]) -> MergeOutcome {
    let mut usable = Vec::with_capacity(sources.len());
    let mut unusable_sources = Vec::new();

    for (idx, raw) in sources.iter().enumerate() {
        match SourceRecord::from_value(raw) {
            Some(record) => usable.push((idx, record)),
            None => {
                debug!("Source {} is not a usable record, treating as empty", idx);
                unusable_sources.push(idx);
            }
        }
    }

    let mut record = SourceRecord::new();
    let mut provenance = Vec::with_capacity(FIELDS.len());

    for field in FIELDS {
        let candidates: Vec<(usize, &Value)> = usable
            .iter()
            .filter_map(|(idx, source)| source.get(field.name).map(|v| (*idx, v)))
            .collect();

        let (value, origin) = match field.merge {
            MergeKind::Scalar => merge_scalar(field, &candidates),
            MergeKind::Flag => merge_flag(&candidates),
            MergeKind::YearMetricTable => merge_year_table(field, &candidates),
        };

        record.insert(field.name, value);
        provenance.push((field.name, origin));
    }

    MergeOutcome {
        record,
        provenance,
        unusable_sources,
    }
}

fn merge_scalar(field: &FieldDescriptor, candidates: &[(usize, &Value)]) -> (Value, Origin) {
    candidates
        .iter()
        .find(|(_, value)| !is_empty(value))
        .map(|(idx, value)| ((*value).clone(), Origin::Source(*idx)))
        .unwrap_or_else(|| (field.default_value(), Origin::Default))
}

fn merge_flag(candidates: &[(usize, &Value)]) -> (Value, Origin) {
    let truthy: Vec<usize> = candidates
        .iter()
        .filter(|(_, value)| is_truthy(value))
        .map(|(idx, _)| *idx)
        .collect();

    let origin = match truthy.as_slice() {
        [] => Origin::Default,
        [only] => Origin::Source(*only),
        _ => Origin::Combined,
    };
    (Value::Bool(!truthy.is_empty()), origin)
}

/// Deep merge of year -> metric tables.
///
/// The first table is copied whole, empty years included. Later tables only
/// add years that are missing and metrics that are missing or empty; a
/// non-empty metric is never replaced.
fn merge_year_table(field: &FieldDescriptor, candidates: &[(usize, &Value)]) -> (Value, Origin) {
    let mut merged: Option<Map<String, Value>> = None;
    let mut contributors: Vec<usize> = Vec::new();

    for (idx, value) in candidates {
        let Some(table) = value.as_object() else {
            continue;
        };

        if merged.is_none() {
            if !table.is_empty() {
                contributors.push(*idx);
            }
            merged = Some(table.clone());
            continue;
        }
        let Some(base) = merged.as_mut() else {
            continue;
        };

        let mut contributed = false;
        for (year, metrics) in table {
            match base.get_mut(year) {
                None => {
                    if !is_empty(metrics) {
                        base.insert(year.clone(), metrics.clone());
                        contributed = true;
                    }
                }
                Some(existing) => {
                    contributed |= fill_year(existing, metrics);
                }
            }
        }

        if contributed {
            contributors.push(*idx);
        }
    }

    let merged = match merged {
        Some(table) if !table.is_empty() => table,
        _ => return (field.default_value(), Origin::Default),
    };

    let origin = match contributors.as_slice() {
        [only] => Origin::Source(*only),
        _ => Origin::Combined,
    };
    (Value::Object(merged), origin)
}

/// Fill gaps in one year's metrics. Returns whether anything was added.
fn fill_year(existing: &mut Value, incoming: &Value) -> bool {
    if is_empty(existing) {
        if is_empty(incoming) {
            return false;
        }
        *existing = incoming.clone();
        return true;
    }

    let (Some(current), Some(additions)) = (existing.as_object_mut(), incoming.as_object())
    else {
        return false;
    };

    let mut added = false;
    for (metric, amount) in additions {
        if is_missing_or_empty(current.get(metric)) && !is_empty(amount) {
            current.insert(metric.clone(), amount.clone());
            added = true;
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_primary_wins_secondary_fills() {
        let primary = json!({"employee_count": "", "industry": "Fintech"});
        let secondary = json!({"employee_count": "120명", "industry": "Other"});
        let merged = merge(&primary, &secondary);
        assert_eq!(merged.get("employee_count"), Some(&json!("120명")));
        assert_eq!(merged.get("industry"), Some(&json!("Fintech")));
    }

    #[test]
    fn test_zero_and_false_are_kept() {
        let primary = json!({"patent_count": "0", "trademark_count": 0});
        let secondary = json!({"patent_count": "12", "trademark_count": 3});
        let merged = merge(&primary, &secondary);
        assert_eq!(merged.get("patent_count"), Some(&json!("0")));
        assert_eq!(merged.get("trademark_count"), Some(&json!(0)));
    }

    #[test]
    fn test_null_literal_is_filled() {
        let merged = merge(&json!({"homepage": "null"}), &json!({"homepage": "https://a.kr"}));
        assert_eq!(merged.get("homepage"), Some(&json!("https://a.kr")));
    }

    #[test]
    fn test_listing_flag_is_or() {
        for (a, b, expected) in [
            (false, false, false),
            (false, true, true),
            (true, false, true),
            (true, true, true),
        ] {
            let merged = merge(&json!({"is_listed": a}), &json!({"is_listed": b}));
            assert_eq!(merged.get("is_listed"), Some(&json!(expected)), "{a} || {b}");
        }
    }

    #[test]
    fn test_financial_history_keeps_primary_metrics() {
        let primary = json!({"financial_history": {"2023": {"revenue": "100만원"}}});
        let secondary = json!({"financial_history": {
            "2023": {"revenue": "999만원", "profit": "5만원"}
        }});
        let merged = merge(&primary, &secondary);
        assert_eq!(
            merged.get("financial_history"),
            Some(&json!({"2023": {"revenue": "100만원", "profit": "5만원"}}))
        );
    }

    #[test]
    fn test_financial_history_adds_missing_years_and_empty_metrics() {
        let primary = json!({"financial_history": {
            "2022": {"매출액": "", "영업이익": "3억"}
        }});
        let secondary = json!({"financial_history": {
            "2022": {"매출액": "50억", "영업이익": "9억"},
            "2021": {"매출액": "40억"}
        }});
        let merged = merge(&primary, &secondary);
        assert_eq!(
            merged.get("financial_history"),
            Some(&json!({
                "2022": {"매출액": "50억", "영업이익": "3억"},
                "2021": {"매출액": "40억"}
            }))
        );
    }

    #[test]
    fn test_financial_history_keeps_empty_primary_years() {
        let primary = json!({"financial_history": {"2023": {}, "2022": {"매출액": "5억"}}});
        let merged = merge(&primary, &json!({}));
        let mut expected = SourceRecord::defaults();
        expected.insert("financial_history", json!({"2023": {}, "2022": {"매출액": "5억"}}));
        assert_eq!(merged, expected);

        let outcome =
            merge_with_provenance(&[&json!({"financial_history": {"2023": {}}}), &json!({})]);
        assert_eq!(
            outcome.record.get("financial_history"),
            Some(&json!({"2023": {}}))
        );
        assert_eq!(outcome.origin("financial_history"), Some(Origin::Source(0)));
    }

    #[test]
    fn test_financial_history_empty_primary_year_is_filled() {
        let merged = merge(
            &json!({"financial_history": {"2023": {}}}),
            &json!({"financial_history": {"2023": {"자본금": "1억"}}}),
        );
        assert_eq!(
            merged.get("financial_history"),
            Some(&json!({"2023": {"자본금": "1억"}}))
        );
    }

    #[test]
    fn test_financial_history_non_mapping_is_ignored() {
        let merged = merge(
            &json!({"financial_history": ""}),
            &json!({"financial_history": {"2020": {"자본금": "1억"}}}),
        );
        assert_eq!(
            merged.get("financial_history"),
            Some(&json!({"2020": {"자본금": "1억"}}))
        );
    }

    #[test]
    fn test_unusable_sources_yield_defaults() {
        let merged = merge(&json!("not a record"), &json!({"error": "blocked"}));
        assert_eq!(merged, SourceRecord::defaults());
    }

    #[test]
    fn test_one_unusable_source() {
        let outcome = merge_with_provenance(&[&json!(null), &json!({"name": "카카오"})]);
        assert_eq!(outcome.unusable_sources, vec![0]);
        assert_eq!(outcome.record.get("name"), Some(&json!("카카오")));
        assert_eq!(outcome.origin("name"), Some(Origin::Source(1)));
    }

    #[test]
    fn test_merge_with_empty_secondary_applies_defaults() {
        let primary = json!({
            "name": "네이버",
            "homepage": null,
            "is_listed": "true",
            "financial_history": {"2023": {"매출액": "9조"}}
        });
        let merged = merge(&primary, &json!({}));
        let mut expected = SourceRecord::defaults();
        expected.insert("name", json!("네이버"));
        expected.insert("is_listed", json!(true));
        expected.insert("financial_history", json!({"2023": {"매출액": "9조"}}));
        assert_eq!(merged, expected);
    }

    #[test]
    fn test_output_follows_schema_order() {
        let primary = json!({"recent_trends": "성장", "name": "A"});
        let merged = merge(&primary, &json!({"address": "서울"}));
        let keys: Vec<&str> = merged.iter().map(|(k, _)| k.as_str()).collect();
        let schema: Vec<&str> = FIELDS.iter().map(|f| f.name).collect();
        assert_eq!(keys, schema);
    }

    #[test]
    fn test_provenance() {
        let outcome = merge_with_provenance(&[
            &json!({"name": "A", "is_listed": true, "financial_history": {"2023": {"a": "1"}}}),
            &json!({"address": "B", "is_listed": true, "financial_history": {"2022": {"a": "2"}}}),
        ]);
        assert_eq!(outcome.origin("name"), Some(Origin::Source(0)));
        assert_eq!(outcome.origin("address"), Some(Origin::Source(1)));
        assert_eq!(outcome.origin("is_listed"), Some(Origin::Combined));
        assert_eq!(outcome.origin("financial_history"), Some(Origin::Combined));
        assert_eq!(outcome.origin("homepage"), Some(Origin::Default));
    }

    #[test]
    fn test_three_sources() {
        let merged = merge_all(&[
            &json!({"name": ""}),
            &json!({"name": "", "address": "부산"}),
            &json!({"name": "C", "address": "서울"}),
        ]);
        assert_eq!(merged.get("name"), Some(&json!("C")));
        assert_eq!(merged.get("address"), Some(&json!("부산")));
    }
}
