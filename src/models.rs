//! Record types flowing through the integration pipeline.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::schema::FIELDS;

/// Key a scraper sets when it failed to produce a record.
pub const ERROR_MARKER: &str = "error";

/// Raw field values from one source, or the result of merging several.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SourceRecord {
    fields: Map<String, Value>,
}

impl SourceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every canonical field set to its schema default, in schema order.
    pub fn defaults() -> Self {
        let fields = FIELDS
            .iter()
            .map(|f| (f.name.to_string(), f.default_value()))
            .collect();
        Self { fields }
    }

    /// Interpret a raw value as a source record.
    ///
    /// Returns `None` when the value is not an object or carries a non-empty
    /// error marker; callers treat that as an empty source.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        if map
            .get(ERROR_MARKER)
            .is_some_and(|marker| !crate::value::is_empty(marker))
        {
            return None;
        }
        Some(Self {
            fields: map.clone(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<Map<String, Value>> for SourceRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// A field value after coercion to its stored type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CanonicalValue {
    Null,
    Integer(i64),
    /// Serialized as a string so precision survives text boundaries.
    Decimal(Decimal),
    Bool(bool),
    Date(NaiveDate),
    Text(String),
    /// JSON-encoded structure.
    Json(String),
}

impl CanonicalValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CanonicalValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CanonicalValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            CanonicalValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CanonicalValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text or JSON-encoded contents.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CanonicalValue::Text(s) | CanonicalValue::Json(s) => Some(s),
            _ => None,
        }
    }
}

/// Fully coerced record. Holds every schema field, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    fields: Vec<(&'static str, CanonicalValue)>,
}

impl CanonicalRecord {
    pub(crate) fn from_fields(fields: Vec<(&'static str, CanonicalValue)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&CanonicalValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &CanonicalValue)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields that resolved to something other than null.
    pub fn populated(&self) -> usize {
        self.fields.iter().filter(|(_, v)| !v.is_null()).count()
    }
}

impl Serialize for CanonicalRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
