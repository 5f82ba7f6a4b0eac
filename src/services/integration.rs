//! Integration service: named source records in, canonical record out.
//!
//! Orders sources by configured precedence, merges them, optionally
//! backfills the latest financial snapshot, and coerces the result. Data
//! problems are collected as warnings instead of failing the run.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Settings;
use crate::currency::{parse_amount_detailed, SegmentFailure};
use crate::error::{CorpInfoError, Result};
use crate::filter::coerce_with;
use crate::merge::{merge_with_provenance, Origin};
use crate::models::{CanonicalRecord, SourceRecord};
use crate::schema::{StoredType, FIELDS, NAME};
use crate::snapshot::backfill_latest;

/// One source's raw record, tagged with the source's name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSource {
    pub name: String,
    pub record: Value,
}

impl NamedSource {
    pub fn new(name: impl Into<String>, record: Value) -> Self {
        Self {
            name: name.into(),
            record,
        }
    }

    /// Read a source record from a JSON file.
    pub fn from_file(name: impl Into<String>, path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| CorpInfoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let record = serde_json::from_str(&text).map_err(|source| CorpInfoError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(name, record))
    }

    /// Read a source record named after the file's stem.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_file(name, path)
    }

    /// Parse a `NAME=FILE` argument and read the file.
    pub fn from_arg(arg: &str) -> Result<Self> {
        match arg.split_once('=') {
            Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
                Self::from_file(name.trim(), Path::new(path.trim()))
            }
            _ => Err(CorpInfoError::InvalidSourceArg(arg.to_string())),
        }
    }
}

/// Data-quality issue noticed while integrating.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum IntegrationWarning {
    /// Source was not a record or carried an error marker.
    UnusableSource { source: String },
    /// Amount segments that were read as zero.
    ZeroedSegments {
        field: String,
        segments: Vec<SegmentFailure>,
    },
}

impl fmt::Display for IntegrationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrationWarning::UnusableSource { source } => {
                write!(f, "source '{}' was unusable and treated as empty", source)
            }
            IntegrationWarning::ZeroedSegments { field, segments } => {
                let parts: Vec<String> = segments
                    .iter()
                    .map(|s| format!("{}:{:?}", s.unit, s.text))
                    .collect();
                write!(f, "{}: zeroed segments [{}]", field, parts.join(", "))
            }
        }
    }
}

/// Everything produced for one company.
#[derive(Debug, Clone)]
pub struct IntegrationResult {
    /// Source names in the precedence order used.
    pub sources: Vec<String>,
    pub merged: SourceRecord,
    pub canonical: CanonicalRecord,
    pub provenance: Vec<(&'static str, Origin)>,
    pub warnings: Vec<IntegrationWarning>,
}

impl IntegrationResult {
    /// Name of the source a field came from, if exactly one supplied it.
    pub fn source_for(&self, field: &str) -> Option<&str> {
        let origin = self
            .provenance
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, origin)| *origin)?;
        match origin {
            Origin::Source(idx) => self.sources.get(idx).map(String::as_str),
            Origin::Combined | Origin::Default => None,
        }
    }

    /// Company name, for logging and output file names.
    pub fn company_name(&self) -> Option<&str> {
        self.canonical.get(NAME).and_then(|v| v.as_str())
    }

    /// `<company>.json` inside `dir`, with whitespace and path separators
    /// replaced. Falls back to the first source name.
    pub fn output_path(&self, dir: &Path) -> PathBuf {
        let stem: String = self
            .company_name()
            .or_else(|| self.sources.first().map(String::as_str))
            .unwrap_or("company")
            .chars()
            .map(|c| if c.is_whitespace() || c == '/' || c == '\\' { '_' } else { c })
            .collect();
        dir.join(format!("{}.json", stem))
    }
}

/// Runs the merge and coercion pipeline under configured settings.
#[derive(Debug, Clone, Default)]
pub struct IntegrationService {
    settings: Settings,
}

impl IntegrationService {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Sort sources by configured precedence. Unknown sources keep their
    /// relative order after the known ones.
    pub fn order_sources(&self, mut sources: Vec<NamedSource>) -> Vec<NamedSource> {
        sources.sort_by_key(|s| self.settings.precedence_of(&s.name));
        sources
    }

    /// Positional sources keep their given order ahead of named sources,
    /// which are ordered by configured precedence.
    pub fn assemble_sources(
        &self,
        positional: Vec<NamedSource>,
        named: Vec<NamedSource>,
    ) -> Vec<NamedSource> {
        let mut sources = positional;
        sources.extend(self.order_sources(named));
        sources
    }

    /// Integrate sources given in precedence order.
    pub fn integrate(&self, sources: &[NamedSource]) -> IntegrationResult {
        let raw: Vec<&Value> = sources.iter().map(|s| &s.record).collect();
        let outcome = merge_with_provenance(&raw);

        let mut warnings: Vec<IntegrationWarning> = outcome
            .unusable_sources
            .iter()
            .map(|&idx| {
                let source = sources[idx].name.clone();
                debug!("Source '{}' unusable, treating as empty", source);
                IntegrationWarning::UnusableSource { source }
            })
            .collect();

        let merged = if self.settings.backfill_latest {
            backfill_latest(&outcome.record)
        } else {
            outcome.record
        };

        warnings.extend(zeroed_segments(&merged));
        let canonical = coerce_with(&merged, &self.settings.filter_options());

        let result = IntegrationResult {
            sources: sources.iter().map(|s| s.name.clone()).collect(),
            merged,
            canonical,
            provenance: outcome.provenance,
            warnings,
        };

        info!(
            "Integrated {}: {}/{} fields populated from {} sources ({} warnings)",
            result.company_name().unwrap_or("<unnamed>"),
            result.canonical.populated(),
            result.canonical.len(),
            sources.len(),
            result.warnings.len()
        );
        result
    }

    /// Order by precedence, then integrate.
    pub fn integrate_named(&self, sources: Vec<NamedSource>) -> IntegrationResult {
        let ordered = self.order_sources(sources);
        self.integrate(&ordered)
    }
}

/// Report amount segments the currency parser had to zero.
fn zeroed_segments(merged: &SourceRecord) -> Vec<IntegrationWarning> {
    let mut warnings = Vec::new();

    for field in FIELDS {
        let Some(value) = merged.get(field.name) else {
            continue;
        };
        match field.stored {
            StoredType::Decimal => {
                if let Some(warning) = check_amount(field.name.to_string(), value) {
                    warnings.push(warning);
                }
            }
            StoredType::FinancialTable => {
                let Some(table) = value.as_object() else {
                    continue;
                };
                for (year, metrics) in table {
                    let Some(metrics) = metrics.as_object() else {
                        continue;
                    };
                    for (metric, amount) in metrics {
                        let path = format!("{}.{}.{}", field.name, year, metric);
                        if let Some(warning) = check_amount(path, amount) {
                            warnings.push(warning);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    warnings
}

fn check_amount(field: String, value: &Value) -> Option<IntegrationWarning> {
    let parsed = parse_amount_detailed(value.as_str()?)?;
    if parsed.is_clean() {
        return None;
    }
    debug!("{} had {} zeroed segments", field, parsed.failed_segments.len());
    Some(IntegrationWarning::ZeroedSegments {
        field,
        segments: parsed.failed_segments,
    })
}
