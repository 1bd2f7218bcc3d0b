//! Runtime configuration, loaded from `<data_dir>/config.json`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use serde::Deserialize;

use crate::error::{ExtractorError, ExtractorResult};

pub const DEFAULT_DATE_SINCE: &str = "2009-01-01";
pub const DEFAULT_DATE_TO: &str = "now";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub src_charset: String,
    pub delimiter: String,
    pub base_url: String,
    pub shop_name: String,

    #[serde(default)]
    pub orders_url: Option<String>,
    #[serde(default)]
    pub products_url: Option<String>,
    #[serde(default)]
    pub customers_url: Option<String>,
    #[serde(default)]
    pub stock_url: Option<String>,

    #[serde(default)]
    pub additional_data: Vec<AdditionalFeed>,

    #[serde(default)]
    pub loading_options: LoadingOptions,
}

/// An extra named feed beyond the four built-in exports.
#[derive(Debug, Clone, Deserialize)]
pub struct AdditionalFeed {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub primary_key: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoadingOptions {
    pub date_since: String,
    pub date_to: String,
    pub backfill_mode: bool,
    pub chunk_size_days: u32,
    pub incremental_output: bool,
}

impl Default for LoadingOptions {
    fn default() -> Self {
        Self {
            date_since: DEFAULT_DATE_SINCE.to_string(),
            date_to: DEFAULT_DATE_TO.to_string(),
            backfill_mode: false,
            chunk_size_days: 7,
            incremental_output: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Empty-string dates fall back to their defaults, matching how the
    /// platform passes cleared form fields through.
    pub fn date_since(&self) -> &str {
        let s = self.loading_options.date_since.trim();
        if s.is_empty() {
            DEFAULT_DATE_SINCE
        } else {
            s
        }
    }

    pub fn date_to(&self) -> &str {
        let s = self.loading_options.date_to.trim();
        if s.is_empty() {
            DEFAULT_DATE_TO
        } else {
            s
        }
    }

    /// Resolved source encoding; validation guarantees the label is known.
    pub fn encoding(&self) -> &'static Encoding {
        Encoding::for_label(self.src_charset.as_bytes()).unwrap_or(encoding_rs::UTF_8)
    }

    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes()[0]
    }

    fn validate(&self) -> ExtractorResult<()> {
        if Encoding::for_label(self.src_charset.as_bytes()).is_none() {
            return Err(ExtractorError::Config(format!(
                "unknown src_charset `{}`",
                self.src_charset
            )));
        }
        if self.delimiter.as_bytes().len() != 1 {
            return Err(ExtractorError::Config(format!(
                "delimiter must be a single byte, got `{}`",
                self.delimiter
            )));
        }
        if self.base_url.trim().is_empty() || self.shop_name.trim().is_empty() {
            return Err(ExtractorError::Config(
                "base_url and shop_name must be set".to_string(),
            ));
        }
        if self.loading_options.backfill_mode && self.loading_options.chunk_size_days == 0 {
            return Err(ExtractorError::Config(
                "backfill_mode requires chunk_size_days >= 1".to_string(),
            ));
        }
        for feed in &self.additional_data {
            if feed.name.trim().is_empty() || feed.url.trim().is_empty() {
                return Err(ExtractorError::Config(
                    "additional_data entries need both name and url".to_string(),
                ));
            }
        }
        Ok(())
    }
}
