//! Latest financial snapshot derived from the financial history table.
//!
//! Sources often fill `financial_history` but leave the `latest_*` fields
//! blank, or the other way round after a merge. This fills the gaps from the
//! newest fiscal year without touching values a source already supplied.

use serde_json::{Map, Value};

use crate::models::SourceRecord;
use crate::schema::{
    FINANCIAL_HISTORY, LATEST_FISCAL_YEAR, LATEST_NET_INCOME, LATEST_OPERATING_INCOME,
    LATEST_REVENUE,
};
use crate::value::{is_empty, is_missing_or_empty};

const REVENUE_METRICS: &[&str] = &["매출액", "매출", "revenue"];
const OPERATING_INCOME_METRICS: &[&str] = &["영업이익", "operating_income", "operating income"];
const NET_INCOME_METRICS: &[&str] = &["당기순이익", "순이익", "net_income", "net income", "profit"];

/// Newest 4-digit year key in a financial history table.
pub fn latest_year(table: &Map<String, Value>) -> Option<&str> {
    table
        .keys()
        .filter(|year| year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()))
        .max()
        .map(String::as_str)
}

/// Fill empty `latest_*` fields from the financial history table.
///
/// An existing `latest_fiscal_year` that names a year in the table is
/// respected; otherwise the newest year is used. Returns a new record.
pub fn backfill_latest(record: &SourceRecord) -> SourceRecord {
    let mut filled = record.clone();

    let Some(table) = record.get(FINANCIAL_HISTORY).and_then(Value::as_object) else {
        return filled;
    };

    let declared_year = record
        .get(LATEST_FISCAL_YEAR)
        .filter(|v| !is_empty(v))
        .map(year_key);
    let year = match declared_year {
        Some(year) if table.contains_key(&year) => year,
        Some(_) => return filled,
        None => match latest_year(table) {
            Some(year) => year.to_string(),
            None => return filled,
        },
    };

    if is_missing_or_empty(record.get(LATEST_FISCAL_YEAR)) {
        filled.insert(LATEST_FISCAL_YEAR, Value::String(year.clone()));
    }

    let Some(metrics) = table.get(&year).and_then(Value::as_object) else {
        return filled;
    };

    for (field, aliases) in [
        (LATEST_REVENUE, REVENUE_METRICS),
        (LATEST_OPERATING_INCOME, OPERATING_INCOME_METRICS),
        (LATEST_NET_INCOME, NET_INCOME_METRICS),
    ] {
        if !is_missing_or_empty(record.get(field)) {
            continue;
        }
        if let Some(amount) = find_metric(metrics, aliases) {
            filled.insert(field, amount.clone());
        }
    }

    filled
}

fn find_metric<'a>(metrics: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        metrics
            .iter()
            .find(|(name, value)| name.trim().eq_ignore_ascii_case(alias) && !is_empty(value))
            .map(|(_, value)| value)
    })
}

fn year_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}
