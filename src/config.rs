//! Configuration management for corpinfo using the prefer crate.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CorpInfoError, Result};
use crate::filter::FilterOptions;

/// Source names in precedence order when none are configured.
pub const DEFAULT_SOURCE_ORDER: [&str; 2] = ["jobkorea", "saramin"];

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Source names, highest precedence first.
    pub source_order: Vec<String>,
    /// Derive latest_* fields from the financial history after merging.
    pub backfill_latest: bool,
    /// Delimiter for list fields supplied as one string.
    pub products_delimiter: String,
    /// Pretty-print JSON output.
    pub pretty: bool,
    /// Default tracing filter when RUST_LOG is unset.
    pub log_level: String,
    /// Directory canonical records are written to (None = stdout).
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_order: DEFAULT_SOURCE_ORDER.iter().map(|s| s.to_string()).collect(),
            backfill_latest: true,
            products_delimiter: ",".to_string(),
            pretty: true,
            log_level: "info".to_string(),
            output_dir: None,
        }
    }
}

impl Settings {
    /// Create settings writing records into `output_dir`.
    pub fn with_output_dir(output_dir: PathBuf) -> Self {
        Self {
            output_dir: Some(output_dir),
            ..Default::default()
        }
    }

    /// Coercion options derived from these settings.
    pub fn filter_options(&self) -> FilterOptions {
        FilterOptions {
            list_delimiter: self.products_delimiter.clone(),
        }
    }

    /// Precedence rank of a named source; unknown names sort last.
    pub fn precedence_of(&self, source: &str) -> usize {
        self.source_order
            .iter()
            .position(|name| name.eq_ignore_ascii_case(source))
            .unwrap_or(self.source_order.len())
    }

    /// Ensure the output directory exists, if one is configured.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        if let Some(ref dir) = self.output_dir {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Source names in precedence order.
    #[serde(default)]
    pub source_order: Option<Vec<String>>,
    /// Whether to backfill latest_* fields from financial history.
    #[serde(default)]
    pub backfill_latest: Option<bool>,
    /// Delimiter for products_services.
    #[serde(default)]
    pub products_delimiter: Option<String>,
    /// Pretty-print output.
    #[serde(default)]
    pub pretty: Option<bool>,
    /// Default log filter.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Output directory (supports ~).
    #[serde(default)]
    pub output_dir: Option<String>,
}

impl Config {
    /// Load configuration using prefer crate.
    /// Automatically discovers corpinfo config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("corpinfo").await {
            Ok(pref_config) => {
                let source_order: Option<Vec<String>> = pref_config.get("source_order").ok();
                let backfill_latest: Option<bool> = pref_config.get("backfill_latest").ok();
                let products_delimiter: Option<String> = pref_config.get("products_delimiter").ok();
                let pretty: Option<bool> = pref_config.get("pretty").ok();
                let log_level: Option<String> = pref_config.get("log_level").ok();
                let output_dir: Option<String> = pref_config.get("output_dir").ok();

                Config {
                    source_order,
                    backfill_latest,
                    products_delimiter,
                    pretty,
                    log_level,
                    output_dir,
                }
            }
            Err(_) => {
                // No config file found, use defaults
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| CorpInfoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CorpInfoError::Config(e.to_string()))
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref order) = self.source_order {
            if !order.is_empty() {
                settings.source_order = order.clone();
            }
        }
        if let Some(backfill) = self.backfill_latest {
            settings.backfill_latest = backfill;
        }
        if let Some(ref delimiter) = self.products_delimiter {
            if !delimiter.is_empty() {
                settings.products_delimiter = delimiter.clone();
            }
        }
        if let Some(pretty) = self.pretty {
            settings.pretty = pretty;
        }
        if let Some(ref level) = self.log_level {
            settings.log_level = level.clone();
        }
        if let Some(ref dir) = self.output_dir {
            let path = shellexpand::tilde(dir);
            settings.output_dir = Some(PathBuf::from(path.as_ref()));
        }
    }
}

/// Load settings from configuration (async version).
pub async fn load_settings() -> Settings {
    let config = Config::load().await;
    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings);
    settings
}
