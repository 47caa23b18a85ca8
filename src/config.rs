//! Configuration loading.
//!
//! `medusa.toml` is optional; every section falls back to defaults.
//!
//! ```toml
//! [logging]
//! level = "debug"
//! dir = "/var/log/medusa"
//!
//! [audit]
//! path = "/var/log/medusa/audit.jsonl"
//!
//! [authority]
//! default_answer = "deny"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::Answer;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Diagnostic logging.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Audit record destination.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Decision authority behaviour.
    #[serde(default)]
    pub authority: AuthorityConfig,
}

/// Diagnostic logging configuration.
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rotated JSON logs; console only when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

/// Audit configuration.
#[derive(Debug, Default, Deserialize)]
pub struct AuditConfig {
    /// JSON-lines audit file; records go to the log when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Decision authority configuration.
#[derive(Debug, Deserialize)]
pub struct AuthorityConfig {
    /// Answer given by the built-in endpoint when a scenario names none.
    #[serde(default = "default_answer")]
    pub default_answer: Answer,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            default_answer: default_answer(),
        }
    }
}

// Default value functions for serde

fn default_log_level() -> String {
    "info".to_owned()
}
fn default_answer() -> Answer {
    Answer::Deny
}

/// Load the configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    Ok(config)
}
