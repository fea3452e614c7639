//! Shared test utilities for `SettleBuddy`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        friend,
        money::Money,
        notify::AdminNotifier,
        purchase::{self, LineItemInput, NewPurchase},
        settlement::{FriendLocks, KIND_PAYMENT},
        split::SplitPolicy,
    },
    entities,
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::future::{Future, ready};
use std::sync::{Mutex, PoisonError};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test friend with no Discord link.
pub async fn create_test_friend(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::friend::Model> {
    friend::create_friend(db, name, None).await
}

/// Creates a test friend linked to a Discord user ID.
pub async fn create_linked_friend(
    db: &DatabaseConnection,
    name: &str,
    discord_id: &str,
) -> Result<entities::friend::Model> {
    friend::create_friend(db, name, Some(discord_id.to_string())).await
}

/// Sets up a test environment with one friend.
/// Returns (db, friend) for common test scenarios.
pub async fn setup_with_friend() -> Result<(DatabaseConnection, entities::friend::Model)> {
    let db = setup_test_db().await?;
    let friend = create_test_friend(&db, "Alice").await?;
    Ok((db, friend))
}

/// Creates a purchase dated today with a single line item.
///
/// # Defaults
/// * policy: `CeilingCent`
/// * one line item named after the purchase, quantity 1, priced at `total_cents`
pub async fn create_test_purchase(
    db: &DatabaseConnection,
    title: &str,
    total_cents: i64,
    friend_ids: &[i64],
) -> Result<entities::purchase::Model> {
    let today = chrono::Local::now().date_naive();
    create_purchase_on(db, SplitPolicy::CeilingCent, title, today, total_cents, friend_ids).await
}

/// Creates a purchase on a `YYYY-MM-DD` date under a specific policy.
pub async fn create_dated_purchase(
    db: &DatabaseConnection,
    policy: SplitPolicy,
    title: &str,
    date: &str,
    total_cents: i64,
    friend_ids: &[i64],
) -> Result<entities::purchase::Model> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| Error::Validation {
        message: format!("bad test date '{date}': {e}"),
    })?;
    create_purchase_on(db, policy, title, date, total_cents, friend_ids).await
}

async fn create_purchase_on(
    db: &DatabaseConnection,
    policy: SplitPolicy,
    title: &str,
    date: NaiveDate,
    total_cents: i64,
    friend_ids: &[i64],
) -> Result<entities::purchase::Model> {
    let input = NewPurchase {
        title: title.to_string(),
        note: None,
        date,
        line_items: vec![LineItemInput {
            name: title.to_string(),
            quantity: 1.0,
            unit_price: Money::from_cents(total_cents),
        }],
        friend_ids: friend_ids.to_vec(),
    };
    purchase::create_purchase(db, &FriendLocks::new(), policy, input).await
}

/// Inserts a payment row directly, bypassing the overpayment and settlement rules.
pub async fn insert_raw_payment(
    db: &DatabaseConnection,
    friend_id: i64,
    cents: i64,
) -> Result<entities::payment::Model> {
    let model = entities::payment::ActiveModel {
        friend_id: Set(friend_id),
        amount_cents: Set(cents),
        note: Set(None),
        paid_at: Set(chrono::Local::now().date_naive()),
        kind: Set(KIND_PAYMENT.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Notifier that keeps every message it is given.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Messages delivered so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AdminNotifier for RecordingNotifier {
    fn notify_admin(&self, message: &str) -> impl Future<Output = Result<()>> + Send {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
        ready(Ok(()))
    }
}

/// Notifier whose deliveries always fail.
#[derive(Debug, Default)]
pub struct FailingNotifier;

impl AdminNotifier for FailingNotifier {
    fn notify_admin(&self, _message: &str) -> impl Future<Output = Result<()>> + Send {
        ready(Err(Error::NotificationFailure {
            message: "admin unreachable".to_string(),
        }))
    }
}
