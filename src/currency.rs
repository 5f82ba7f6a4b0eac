//! Korean monetary text to exact decimals.
//!
//! Handles the large units 조 (10^12), 억 (10^8) and 만 (10^4), plus the
//! small multipliers 천/백/십 inside a segment, so "1조 4천억 원" and
//! "- 262억 4,876만원" both come out exact.
//!
//! Parsing is best-effort: a unit segment that cannot be read contributes
//! zero and is reported in [`AmountParse::failed_segments`], while the rest of
//! the amount is still summed.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Large units, consumed in this order.
const LARGE_UNITS: [Unit; 3] = [Unit::Jo, Unit::Eok, Unit::Man];

/// Characters stripped before parsing.
const STRIPPED: [char; 2] = [',', '원'];

/// Leading markers that flip the sign.
const NEGATIVE_MARKERS: [char; 3] = ['-', '−', '△'];

/// A unit segment of a monetary expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// 조, 10^12.
    Jo,
    /// 억, 10^8.
    Eok,
    /// 만, 10^4.
    Man,
    /// Whatever is left after the last unit, taken at face value.
    Remainder,
}

impl Unit {
    fn marker(self) -> Option<&'static str> {
        match self {
            Unit::Jo => Some("조"),
            Unit::Eok => Some("억"),
            Unit::Man => Some("만"),
            Unit::Remainder => None,
        }
    }

    /// Multiplier applied to the segment's value.
    pub fn multiplier(self) -> Decimal {
        match self {
            Unit::Jo => Decimal::from(1_000_000_000_000_i64),
            Unit::Eok => Decimal::from(100_000_000_i64),
            Unit::Man => Decimal::from(10_000_i64),
            Unit::Remainder => Decimal::ONE,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.marker() {
            Some(marker) => f.write_str(marker),
            None => f.write_str("remainder"),
        }
    }
}

/// A segment whose numeric part could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentFailure {
    pub unit: Unit,
    /// Segment text as seen by the parser (separators already stripped).
    pub text: String,
}

/// Detailed result of parsing a monetary expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountParse {
    /// Signed total of every readable segment.
    pub value: Decimal,
    /// Segments that were zeroed because they could not be read.
    pub failed_segments: Vec<SegmentFailure>,
}

impl AmountParse {
    /// True when every segment parsed.
    pub fn is_clean(&self) -> bool {
        self.failed_segments.is_empty()
    }
}

/// Parse a Korean monetary expression into an exact decimal.
///
/// Returns `None` for blank input or input with no numeric content at all.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    parse_amount_detailed(text).map(|parsed| parsed.value)
}

/// Parse a raw source value. Only strings are amounts; anything else is `None`.
pub fn parse_amount_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

/// Parse a monetary expression, reporting which segments were zeroed.
pub fn parse_amount_detailed(text: &str) -> Option<AmountParse> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !STRIPPED.contains(c))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let (negative, mut rest) = match cleaned.chars().next() {
        Some(c) if NEGATIVE_MARKERS.contains(&c) => (true, &cleaned[c.len_utf8()..]),
        _ => (false, cleaned.as_str()),
    };

    let mut total = Decimal::ZERO;
    let mut any_numeric = false;
    let mut failed_segments = Vec::new();

    for unit in LARGE_UNITS {
        let Some(marker) = unit.marker() else {
            continue;
        };
        let Some(idx) = rest.find(marker) else {
            continue;
        };
        let segment = &rest[..idx];
        rest = &rest[idx + marker.len()..];

        match scaled(segment, unit).and_then(|value| total.checked_add(value)) {
            Some(sum) => {
                total = sum;
                any_numeric = true;
            }
            None => {
                debug!("Zeroing unreadable {} segment {:?} in {:?}", unit, segment, text);
                failed_segments.push(SegmentFailure {
                    unit,
                    text: segment.to_string(),
                });
            }
        }
    }

    match segment_value(rest).map(|value| value.map(|v| total.checked_add(v))) {
        Ok(Some(Some(sum))) => {
            total = sum;
            any_numeric = true;
        }
        Ok(None) => {}
        Ok(Some(None)) | Err(()) => {
            debug!("Zeroing unreadable remainder {:?} in {:?}", rest, text);
            failed_segments.push(SegmentFailure {
                unit: Unit::Remainder,
                text: rest.to_string(),
            });
        }
    }

    if !any_numeric {
        return None;
    }

    let value = if total.is_zero() {
        Decimal::ZERO
    } else if negative {
        -total.normalize()
    } else {
        total.normalize()
    };

    Some(AmountParse {
        value,
        failed_segments,
    })
}

/// Value of a unit segment times its multiplier, `None` when unreadable.
fn scaled(segment: &str, unit: Unit) -> Option<Decimal> {
    segment_value(segment)
        .ok()
        .flatten()
        .and_then(|value| value.checked_mul(unit.multiplier()))
}

/// Read the number in one segment, honoring 천/백/십.
///
/// `Ok(None)` means the segment held no numeric content. Characters other
/// than digits, `.` and the small multipliers are ignored.
fn segment_value(segment: &str) -> Result<Option<Decimal>, ()> {
    let mut total = Decimal::ZERO;
    let mut digits = String::new();
    let mut seen = false;

    for c in segment.chars() {
        let multiplier = match c {
            '천' => 1_000_i64,
            '백' => 100,
            '십' => 10,
            c if c.is_ascii_digit() || c == '.' => {
                digits.push(c);
                continue;
            }
            _ => continue,
        };
        let coefficient = if digits.is_empty() {
            Decimal::ONE
        } else {
            parse_digits(&digits)?
        };
        total = coefficient
            .checked_mul(Decimal::from(multiplier))
            .and_then(|v| total.checked_add(v))
            .ok_or(())?;
        digits.clear();
        seen = true;
    }

    if !digits.is_empty() {
        total = total.checked_add(parse_digits(&digits)?).ok_or(())?;
        seen = true;
    }

    Ok(seen.then_some(total))
}

fn parse_digits(digits: &str) -> Result<Decimal, ()> {
    Decimal::from_str(digits).map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_jo_with_thousand_eok() {
        assert_eq!(parse_amount("1조 4천억 원"), Some(dec("1400000000000")));
    }

    #[test]
    fn test_negative_with_separators() {
        assert_eq!(parse_amount("- 262억 4,876만원"), Some(dec("-26248760000")));
        assert_eq!(parse_amount("△ 5억"), Some(dec("-500000000")));
    }

    #[test]
    fn test_mixed_units() {
        assert_eq!(parse_amount("1,123억 8천만원"), Some(dec("112380000000")));
        assert_eq!(parse_amount("3조 5억 200만 1234원"), Some(dec("3000502001234")));
        assert_eq!(parse_amount("천만원"), Some(dec("10000000")));
    }

    #[test]
    fn test_fractional_units() {
        assert_eq!(parse_amount("1.5억"), Some(dec("150000000")));
    }

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse_amount("123456"), Some(dec("123456")));
        assert_eq!(parse_amount("1,234,567원"), Some(dec("1234567")));
        assert_eq!(parse_amount("510명"), Some(dec("510")));
    }

    #[test]
    fn test_blank_and_non_numeric() {
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("   "), None);
        assert_eq!(parse_amount("비공개"), None);
        assert_eq!(parse_amount("-"), None);
    }

    #[test]
    fn test_non_string_values() {
        assert_eq!(parse_amount_value(&json!(1234)), None);
        assert_eq!(parse_amount_value(&Value::Null), None);
        assert_eq!(parse_amount_value(&json!("5만원")), Some(dec("50000")));
    }

    #[test]
    fn test_unreadable_segment_contributes_zero() {
        let parsed = parse_amount_detailed("1.2.3조 5억").unwrap();
        assert_eq!(parsed.value, dec("500000000"));
        assert!(!parsed.is_clean());
        assert_eq!(parsed.failed_segments.len(), 1);
        assert_eq!(parsed.failed_segments[0].unit, Unit::Jo);
        assert_eq!(parsed.failed_segments[0].text, "1.2.3");
    }

    #[test]
    fn test_empty_unit_segment_is_reported() {
        let parsed = parse_amount_detailed("억 5000만").unwrap();
        assert_eq!(parsed.value, dec("50000000"));
        assert_eq!(parsed.failed_segments[0].unit, Unit::Eok);
    }

    #[test]
    fn test_clean_parse() {
        let parsed = parse_amount_detailed("7억").unwrap();
        assert!(parsed.is_clean());
        assert_eq!(parsed.value.to_string(), "700000000");
    }

    #[test]
    fn test_large_amounts_are_exact() {
        assert_eq!(
            parse_amount("987조 6543억 2109만 8765원"),
            Some(dec("987654321098765"))
        );
    }
}
