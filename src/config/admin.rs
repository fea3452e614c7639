//! Admin identity configuration.
//!
//! The bot has exactly one admin, identified by the Discord user ID in
//! `ADMIN_DISCORD_ID`. Admin commands are authorized by comparing the caller's ID
//! against it; the admin is also the recipient of out-of-band notifications.

use crate::errors::{Error, Result};

/// Reads and validates `ADMIN_DISCORD_ID` from the environment.
///
/// # Errors
/// Returns [`Error::EnvVar`] if the variable is missing and [`Error::Config`] if it
/// is not a Discord snowflake.
pub fn get_admin_id() -> Result<u64> {
    let raw = std::env::var("ADMIN_DISCORD_ID")?;
    parse_admin_id(&raw)
}

/// Parses a Discord user ID.
pub fn parse_admin_id(raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| Error::Config {
            message: format!("ADMIN_DISCORD_ID must be a Discord user ID, got '{raw}'"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_id() -> Result<()> {
        assert_eq!(parse_admin_id(" 123456789012345678 ")?, 123_456_789_012_345_678);
        Ok(())
    }

    #[test]
    fn test_parse_admin_id_rejects_garbage() {
        assert!(matches!(parse_admin_id("alice"), Err(Error::Config { .. })));
        assert!(matches!(parse_admin_id("0"), Err(Error::Config { .. })));
    }
}
