//! Service layer for corpinfo business logic.
//!
//! Wraps the merge and coercion engine with configured precedence,
//! snapshot backfill and warning collection, for use by the CLI or any
//! calling pipeline.

pub mod integration;

pub use integration::{IntegrationResult, IntegrationService, IntegrationWarning, NamedSource};
