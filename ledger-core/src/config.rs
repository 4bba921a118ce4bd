//! Configuration management
//!
//! Reads `settings.json` from the ledger directory:
//! ```json
//! {
//!   "server": { "bind": "127.0.0.1:8080" },
//!   "ledger": { "allowSeed": false, "lockTimeoutMs": 5000, "maxRetries": 5, "initialRetryDelayMs": 50 }
//! }
//! ```
//! Every field is optional. `LEDGER_BIND` and `LEDGER_ALLOW_SEED` override
//! the file.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::duckdb::StoreOptions;
use crate::domain::result::Error;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    server: ServerSettings,
    #[serde(default)]
    ledger: LedgerSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerSettings {
    bind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerSettings {
    allow_seed: Option<bool>,
    lock_timeout_ms: Option<u64>,
    max_retries: Option<u32>,
    initial_retry_delay_ms: Option<u64>,
}

/// Resolved ledger configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Listen address for `ledger serve`
    pub bind: String,
    /// Whether the demo-account seeding endpoint and command are enabled
    pub allow_seed: bool,
    pub lock_timeout: Duration,
    pub max_retries: u32,
    pub initial_retry_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let store = StoreOptions::default();
        Self {
            bind: DEFAULT_BIND.to_string(),
            allow_seed: false,
            lock_timeout: store.lock_timeout,
            max_retries: store.max_retries,
            initial_retry_delay: store.initial_retry_delay,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "true" | "1" | "yes" | "TRUE" | "YES" => Some(true),
        "false" | "0" | "no" | "FALSE" | "NO" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load config from the ledger directory, applying environment overrides
    pub fn load(ledger_dir: &Path) -> Result<Self> {
        let settings_path = ledger_dir.join("settings.json");

        let raw = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("reading {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        Ok(Self::resolve(raw, |key| std::env::var(key).ok())?)
    }

    /// Merge file settings with overrides looked up through `env`
    fn resolve(
        raw: SettingsFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> std::result::Result<Self, Error> {
        let defaults = Self::default();

        let bind = env("LEDGER_BIND")
            .filter(|b| !b.trim().is_empty())
            .or(raw.server.bind)
            .unwrap_or(defaults.bind);

        let allow_seed = match env("LEDGER_ALLOW_SEED").as_deref().and_then(parse_flag) {
            Some(flag) => flag,
            None => raw.ledger.allow_seed.unwrap_or(defaults.allow_seed),
        };

        let config = Self {
            bind,
            allow_seed,
            lock_timeout: raw
                .ledger
                .lock_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.lock_timeout),
            max_retries: raw.ledger.max_retries.unwrap_or(defaults.max_retries),
            initial_retry_delay: raw
                .ledger
                .initial_retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_retry_delay),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would disable locking or retries
    pub fn validate(&self) -> std::result::Result<(), Error> {
        if self.lock_timeout.is_zero() {
            return Err(Error::Config("ledger.lockTimeoutMs must be greater than 0".into()));
        }
        if self.max_retries == 0 {
            return Err(Error::Config("ledger.maxRetries must be greater than 0".into()));
        }
        if self.initial_retry_delay.is_zero() {
            return Err(Error::Config(
                "ledger.initialRetryDelayMs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Store tuning derived from this config
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            lock_timeout: self.lock_timeout,
            max_retries: self.max_retries,
            initial_retry_delay: self.initial_retry_delay,
        }
    }
}
