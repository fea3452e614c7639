/// Database connection and table creation
pub mod database;

/// Ledger settings loaded from config.toml
pub mod settings;

/// Admin identity configuration from environment variables
pub mod admin;
