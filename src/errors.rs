//! Unified error types for `SettleBuddy`.
//!
//! Infrastructure failures (database, configuration, Discord) and business-rule
//! outcomes share one enum. The command layer turns every business variant into a
//! polite reply and only propagates the infrastructure ones.

use crate::core::money::Money;
use std::fmt;
use thiserror::Error;

/// The bound an amount failed to respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountBound {
    /// The amount must be strictly greater than zero
    Positive,
    /// The amount may not exceed the given remaining balance
    AtMost(Money),
}

impl fmt::Display for AmountBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "must be greater than zero"),
            Self::AtMost(limit) => write!(f, "must be at most {limit}"),
        }
    }
}

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Any failure reported by the database layer
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A required environment variable is missing or malformed
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Building a reply string failed
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    /// Serenity/Poise failure while talking to Discord
    #[error("Serenity/Poise framework error: {0}")]
    #[allow(clippy::enum_variant_names)]
    FrameworkError(Box<poise::serenity_prelude::Error>),

    /// The caller does not resolve to a known friend
    #[error("Caller is not a registered friend")]
    NoAuthorization,

    /// A monetary amount is outside its valid range
    #[error("Invalid amount {amount}: {bound}")]
    InvalidAmount {
        /// The rejected amount
        amount: Money,
        /// The rule it broke
        bound: AmountBound,
    },

    /// A payment was attempted while nothing is owed
    #[error("No outstanding debt")]
    NoOutstandingDebt,

    /// The out-of-band admin notification could not be delivered
    #[error("Failed to notify admin: {message}")]
    NotificationFailure {
        /// Delivery failure detail
        message: String,
    },

    /// A uniqueness or state conflict (409-equivalent)
    #[error("Conflict: {message}")]
    Conflict {
        /// Human-readable conflict description
        message: String,
    },

    /// A referenced record does not exist
    #[error("{entity} '{key}' not found")]
    NotFound {
        /// Kind of record ("Friend", "Purchase", ...)
        entity: &'static str,
        /// The identifier that was looked up
        key: String,
    },

    /// Admin input failed validation
    #[error("Validation failed: {message}")]
    Validation {
        /// Which rule failed
        message: String,
    },
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::FrameworkError(Box::new(value))
    }
}

impl Error {
    /// Maps unique-constraint violations to [`Error::Conflict`], leaving other
    /// database errors untouched.
    #[must_use]
    pub fn conflict_on_unique(err: sea_orm::DbErr, message: impl Into<String>) -> Self {
        if matches!(
            err.sql_err(),
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
        ) {
            Self::Conflict {
                message: message.into(),
            }
        } else {
            Self::Database(err)
        }
    }

    /// True for business-rule outcomes that should become a user-facing message
    /// instead of a hard failure.
    #[must_use]
    pub const fn is_business_rule(&self) -> bool {
        matches!(
            self,
            Self::NoAuthorization
                | Self::InvalidAmount { .. }
                | Self::NoOutstandingDebt
                | Self::Conflict { .. }
                | Self::NotFound { .. }
                | Self::Validation { .. }
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_bound_display() {
        assert_eq!(AmountBound::Positive.to_string(), "must be greater than zero");
        assert_eq!(
            AmountBound::AtMost(Money::from_cents(1250)).to_string(),
            "must be at most $12.50"
        );
    }

    #[test]
    fn test_business_rule_classification() {
        assert!(Error::NoAuthorization.is_business_rule());
        assert!(Error::NoOutstandingDebt.is_business_rule());
        assert!(
            !Error::NotificationFailure {
                message: "down".to_string()
            }
            .is_business_rule()
        );
        assert!(!Error::Database(sea_orm::DbErr::Custom("boom".to_string())).is_business_rule());
    }

    #[test]
    fn test_non_unique_db_error_stays_database() {
        let err = Error::conflict_on_unique(sea_orm::DbErr::Custom("boom".to_string()), "dup");
        assert!(matches!(err, Error::Database(_)));
    }
}
