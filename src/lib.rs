//! Company profile integration.
//!
//! Merges per-source company records scraped from schema-mismatched sites
//! into one canonical record, normalizing Korean monetary text into exact
//! decimals along the way.

pub mod config;
pub mod currency;
pub mod error;
pub mod filter;
pub mod merge;
pub mod models;
pub mod schema;
pub mod services;
pub mod snapshot;
pub mod value;

pub use currency::{parse_amount, parse_amount_detailed, AmountParse, SegmentFailure, Unit};
pub use error::{CorpInfoError, Result};
pub use filter::{coerce, coerce_with, FilterOptions};
pub use merge::{merge, merge_all, merge_with_provenance, MergeOutcome, Origin};
pub use models::{CanonicalRecord, CanonicalValue, SourceRecord};
pub use schema::{FieldDescriptor, MergeKind, StoredType, FIELDS};
pub use services::{IntegrationResult, IntegrationService, IntegrationWarning, NamedSource};
pub use value::{is_empty, is_truthy, ValueKind};
