//! Ledger settings loaded from config.toml
//!
//! The only deployment-wide ledger setting is the split policy. A missing file
//! means defaults; a file that does not parse is a startup error.

use crate::core::split::SplitPolicy;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Ledger behaviour
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// The `[ledger]` table
#[derive(Debug, Default, Deserialize)]
pub struct LedgerConfig {
    /// How purchase totals are divided among participants
    #[serde(default)]
    pub split_policy: SplitPolicy,
}

/// Parses configuration from TOML text.
///
/// # Errors
/// Returns [`Error::Config`] if the TOML is invalid or names an unknown policy.
pub fn parse_config(contents: &str) -> Result<Config> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from a TOML file, returning defaults if the file is absent.
///
/// # Errors
/// Returns [`Error::Config`] if the file exists but cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!("No config file at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;
    parse_config(&contents)
}

/// Loads configuration from `CONFIG_PATH`, or ./config.toml when unset.
pub fn load_default_config() -> Result<Config> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_split_policy() -> Result<()> {
        let config = parse_config(
            r#"
            [ledger]
            split_policy = "nearest_unit"
        "#,
        )?;
        assert_eq!(config.ledger.split_policy, SplitPolicy::NearestUnit);
        Ok(())
    }

    #[test]
    fn test_empty_config_uses_defaults() -> Result<()> {
        let config = parse_config("")?;
        assert_eq!(config.ledger.split_policy, SplitPolicy::CeilingCent);
        Ok(())
    }

    #[test]
    fn test_unknown_policy_is_config_error() {
        let result = parse_config(
            r#"
            [ledger]
            split_policy = "banker"
        "#,
        );
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_uses_defaults() -> Result<()> {
        let config = load_config("definitely/not/here/config.toml")?;
        assert_eq!(config.ledger.split_policy, SplitPolicy::CeilingCent);
        Ok(())
    }
}
