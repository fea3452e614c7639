//! Database configuration module for `SettleBuddy`.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust models
//! without hand-written SQL.

use crate::entities::{Debt, Friend, Group, GroupMember, LineItem, Payment, Purchase, PurchaseParticipant};
use crate::errors::{Error, Result};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/settle_buddy.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling back
/// to a local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Creates the directory holding a file-backed `SQLite` database, if any.
fn ensure_sqlite_dir(url: &str) -> Result<()> {
    let Some(rest) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or_default();
    match std::path::Path::new(path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|e| Error::Config {
                message: format!("Failed to create database directory {}: {e}", dir.display()),
            })
        }
        _ => Ok(()),
    }
}

/// Opens the single process-wide connection handle and makes sure every table exists.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let url = get_database_url();
    tracing::debug!("Connecting to database at {url}");
    ensure_sqlite_dir(&url)?;
    let db = Database::connect(&url).await?;
    create_tables(&db).await?;
    Ok(db)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all ledger tables if they do not exist yet.
///
/// Parents are created before the tables that reference them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Friend).await?;
    create_table(db, &schema, Group).await?;
    create_table(db, &schema, GroupMember).await?;
    create_table(db, &schema, Purchase).await?;
    create_table(db, &schema, LineItem).await?;
    create_table(db, &schema, PurchaseParticipant).await?;
    create_table(db, &schema, Debt).await?;
    create_table(db, &schema, Payment).await?;

    Ok(())
}
