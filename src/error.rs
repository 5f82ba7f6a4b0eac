//! Errors raised at the crate's outer surfaces.
//!
//! The merge and coercion engine itself never fails on bad data; these cover
//! reading inputs and configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorpInfoError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid source argument '{0}', expected NAME=FILE")]
    InvalidSourceArg(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CorpInfoError>;
