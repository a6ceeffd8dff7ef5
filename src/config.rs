use crate::engine::split::{StatutoryRate, SERC_STATUTORY_RATE_BPS};
use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Configuration for the settlement-waterfall CLI and embedders.
///
/// Loaded once per run and then treated as read-only; nothing in the engine
/// reads process-wide state, so callers pass the parts they need explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    /// Tier registry JSON file (optional; CLI flag may supply it instead)
    pub registry_path: Option<PathBuf>,

    /// Statutory carve-out in basis points (default: 500 = 5%)
    pub statutory_rate_bps: u16,

    /// Recipient id credited with the statutory share
    pub statutory_recipient: String,

    /// Output format: "human" (default) or "json"
    pub output_format: String,

    /// Log level filter: "info", "debug", "warn", "error" (default: "info")
    pub log_level: String,
}

impl Config {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Config {
            registry_path: None,
            statutory_rate_bps: SERC_STATUTORY_RATE_BPS,
            statutory_recipient: "SERC".to_string(),
            output_format: "human".to_string(),
            log_level: "info".to_string(),
        }
    }

    pub fn with_registry_path(registry_path: PathBuf) -> Self {
        Config {
            registry_path: Some(registry_path),
            ..Config::new()
        }
    }

    pub fn get_registry_path(&self) -> Option<&PathBuf> {
        self.registry_path.as_ref()
    }

    pub fn set_registry_path(&mut self, path: PathBuf) {
        self.registry_path = Some(path);
    }

    pub fn get_output_format(&self) -> &str {
        &self.output_format
    }

    /// Set output format ("human" or "json")
    pub fn set_output_format(&mut self, format: String) {
        self.output_format = format;
    }

    pub fn get_log_level(&self) -> &str {
        &self.log_level
    }

    pub fn set_log_level(&mut self, level: String) {
        self.log_level = level;
    }

    /// Validated statutory rate.
    pub fn statutory_rate(&self) -> Result<StatutoryRate> {
        StatutoryRate::from_bps(i64::from(self.statutory_rate_bps))
    }

    /// Set the statutory rate; rejects values outside 0..=10_000 bps.
    pub fn set_statutory_rate_bps(&mut self, bps: i64) -> Result<()> {
        let rate = StatutoryRate::from_bps(bps)?;
        self.statutory_rate_bps = rate.bps();
        Ok(())
    }

    /// Load config from environment variables
    ///
    /// Environment variables:
    /// - `WATERFALL_REGISTRY_PATH`: tier registry JSON file
    /// - `WATERFALL_STATUTORY_RATE_BPS`: statutory rate in basis points
    /// - `WATERFALL_STATUTORY_RECIPIENT`: statutory recipient id
    /// - `WATERFALL_OUTPUT_FORMAT`: "human" or "json"
    /// - `WATERFALL_LOG_LEVEL`: log level
    pub fn from_env() -> Result<Self> {
        let mut config = Config::new();

        if let Ok(path) = env::var("WATERFALL_REGISTRY_PATH") {
            config.registry_path = Some(PathBuf::from(path));
        }

        if let Ok(bps) = env::var("WATERFALL_STATUTORY_RATE_BPS") {
            let parsed = bps.trim().parse::<i64>().map_err(|e| {
                Error::Config(format!(
                    "WATERFALL_STATUTORY_RATE_BPS is not an integer ({}): {}",
                    bps, e
                ))
            })?;
            config.set_statutory_rate_bps(parsed)?;
        }

        if let Ok(recipient) = env::var("WATERFALL_STATUTORY_RECIPIENT") {
            config.statutory_recipient = recipient;
        }

        if let Ok(format) = env::var("WATERFALL_OUTPUT_FORMAT") {
            config.output_format = format;
        }

        if let Ok(level) = env::var("WATERFALL_LOG_LEVEL") {
            config.log_level = level;
        }

        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}
