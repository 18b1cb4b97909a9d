//! Ledger configuration, read from the environment (and `.env` when present).

use std::str::FromStr;

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Upper bound on entries returned by `history`.
    pub history_limit: usize,
    /// Per-SKU adjustments in flight during a bulk update.
    pub bulk_concurrency: usize,
    /// Reason recorded when a manual adjustment gives none.
    pub manual_reason: String,
    /// Reason recorded when a bulk update gives no template.
    pub bulk_reason: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            bulk_concurrency: 8,
            manual_reason: "Manual adjustment".to_string(),
            bulk_reason: "Bulk inventory adjustment".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key}={value} is not a valid setting")]
    Invalid { key: &'static str, value: String },
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let bulk_concurrency: usize = parse(&lookup, "INVENTORY_BULK_CONCURRENCY")?.unwrap_or(defaults.bulk_concurrency);
        Ok(Self {
            history_limit: parse(&lookup, "INVENTORY_HISTORY_LIMIT")?.unwrap_or(defaults.history_limit),
            bulk_concurrency: bulk_concurrency.max(1),
            manual_reason: lookup("INVENTORY_MANUAL_REASON").filter(|s| !s.trim().is_empty()).unwrap_or(defaults.manual_reason),
            bulk_reason: lookup("INVENTORY_BULK_REASON").filter(|s| !s.trim().is_empty()).unwrap_or(defaults.bulk_reason),
        })
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
