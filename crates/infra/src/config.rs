//! Configuration loading and representation.

use std::env;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use paintstock_observability::LogFormat;

pub const QUANTITY_SCALE_VAR: &str = "PAINTSTOCK_QUANTITY_SCALE";
pub const LOG_FORMAT_VAR: &str = "PAINTSTOCK_LOG_FORMAT";
pub const LOG_FILTER_VAR: &str = "RUST_LOG";

/// Largest scale `rust_decimal` can represent.
const MAX_SCALE: u32 = 28;

/// Runtime settings for the stock services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Maximum number of fractional digits accepted on requested quantities.
    pub quantity_scale: u32,
    pub log_format: LogFormat,
    pub log_filter: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            quantity_scale: 4,
            log_format: LogFormat::Json,
            log_filter: "info".to_string(),
        }
    }
}

impl InventoryConfig {
    /// Read settings from the process environment, falling back to defaults
    /// for unset variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(QUANTITY_SCALE_VAR) {
            let scale: u32 = raw
                .trim()
                .parse()
                .with_context(|| format!("{QUANTITY_SCALE_VAR} must be an integer, got '{raw}'"))?;
            if scale > MAX_SCALE {
                bail!("{QUANTITY_SCALE_VAR} must be at most {MAX_SCALE}, got {scale}");
            }
            config.quantity_scale = scale;
        }

        if let Some(raw) = lookup(LOG_FORMAT_VAR) {
            config.log_format = raw
                .parse()
                .with_context(|| format!("invalid {LOG_FORMAT_VAR}"))?;
        }

        if let Some(filter) = lookup(LOG_FILTER_VAR).filter(|f| !f.trim().is_empty()) {
            config.log_filter = filter;
        }

        Ok(config)
    }

    /// Install the tracing subscriber described by this configuration.
    pub fn init_observability(&self) {
        paintstock_observability::init_with(&self.log_filter, self.log_format);
    }
}
