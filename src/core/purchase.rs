//! Purchase business logic - creating, editing, deleting and listing shared purchases.
//!
//! A purchase is split once, when it is created or edited, and the resulting share
//! is stored on one debt row per participating friend. Editing replaces the line
//! items and participants and re-splits the debts without re-charging shares a
//! friend already settled. Every operation locks the affected
//! friends, runs in one transaction, and re-checks settlement for each of them
//! before committing.

use crate::{
    core::{
        money::Money,
        settlement::{FriendLocks, try_settle},
        split::{SplitPolicy, line_subtotal, per_person_share},
    },
    entities::{
        Debt, Friend, LineItem, Purchase, PurchaseParticipant, debt, friend, line_item, purchase,
        purchase_participant,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, QueryOrder, QuerySelect, Set, TransactionTrait,
    prelude::*,
};
use std::collections::BTreeSet;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};

/// One line item as entered by the admin.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemInput {
    /// Item name
    pub name: String,
    /// Quantity, must be positive
    pub quantity: f64,
    /// Price per unit, must not be negative
    pub unit_price: Money,
}

/// Everything needed to create or replace a purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPurchase {
    /// Title, trimmed, must not be empty
    pub title: String,
    /// Optional note; blank notes are stored as `None`
    pub note: Option<String>,
    /// Date of the purchase
    pub date: NaiveDate,
    /// At least one line item
    pub line_items: Vec<LineItemInput>,
    /// Participating friends (the admin is implicit), at least one
    pub friend_ids: Vec<i64>,
}

/// A purchase with everything it owns.
#[derive(Debug, Clone)]
pub struct PurchaseDetail {
    /// The purchase row
    pub purchase: purchase::Model,
    /// Its line items in entry order
    pub line_items: Vec<line_item::Model>,
    /// Participating friends, by name
    pub participants: Vec<friend::Model>,
    /// Its debts, with the owing friend if they still exist
    pub debts: Vec<(debt::Model, Option<friend::Model>)>,
}

fn validation(message: impl Into<String>) -> Error {
    Error::Validation {
        message: message.into(),
    }
}

struct ValidPurchase {
    title: String,
    note: Option<String>,
    total: Money,
    subtotals: Vec<Money>,
    friend_ids: Vec<i64>,
}

fn validate(input: &NewPurchase) -> Result<ValidPurchase> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(validation("Title is required"));
    }
    if input.line_items.is_empty() {
        return Err(validation("At least one line item is required"));
    }

    let mut total = Money::ZERO;
    let mut subtotals = Vec::with_capacity(input.line_items.len());
    for item in &input.line_items {
        if item.name.trim().is_empty() {
            return Err(validation("Line item name is required"));
        }
        if !item.quantity.is_finite() || item.quantity <= 0.0 {
            return Err(validation(format!(
                "Quantity for '{}' must be positive",
                item.name.trim()
            )));
        }
        if item.unit_price < Money::ZERO {
            return Err(validation(format!(
                "Unit price for '{}' cannot be negative",
                item.name.trim()
            )));
        }
        let subtotal = line_subtotal(item.quantity, item.unit_price)
            .ok_or_else(|| validation(format!("'{}' costs too much", item.name.trim())))?;
        total = total.checked_add(subtotal).ok_or_else(|| {
            validation(format!("Purchase total cannot exceed {}", Money::LIMIT))
        })?;
        subtotals.push(subtotal);
    }

    let friend_ids: Vec<i64> = input
        .friend_ids
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if friend_ids.is_empty() {
        return Err(validation("At least one friend must participate"));
    }

    Ok(ValidPurchase {
        title: title.to_string(),
        note: input
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string),
        total,
        subtotals,
        friend_ids,
    })
}

async fn ensure_friends_exist<C>(db: &C, friend_ids: &[i64]) -> Result<()>
where
    C: ConnectionTrait,
{
    let found: Vec<i64> = Friend::find()
        .select_only()
        .column(friend::Column::Id)
        .filter(friend::Column::Id.is_in(friend_ids.iter().copied()))
        .into_tuple()
        .all(db)
        .await?;

    match friend_ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(Error::NotFound {
            entity: "Friend",
            key: missing.to_string(),
        }),
        None => Ok(()),
    }
}

/// Writes line items and participants for a purchase.
async fn insert_items_and_participants<C>(
    db: &C,
    purchase_id: i64,
    input: &NewPurchase,
    valid: &ValidPurchase,
) -> Result<()>
where
    C: ConnectionTrait,
{
    for (item, subtotal) in input.line_items.iter().zip(&valid.subtotals) {
        line_item::ActiveModel {
            purchase_id: Set(purchase_id),
            name: Set(item.name.trim().to_string()),
            quantity: Set(item.quantity),
            unit_price_cents: Set(item.unit_price.cents()),
            subtotal_cents: Set(subtotal.cents()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    for &friend_id in &valid.friend_ids {
        PurchaseParticipant::insert(purchase_participant::ActiveModel {
            purchase_id: Set(purchase_id),
            friend_id: Set(friend_id),
        })
        .exec(db)
        .await?;
    }
    Ok(())
}

async fn insert_debt<C>(
    db: &C,
    purchase_id: i64,
    friend_id: i64,
    amount: Money,
    created_at: DateTimeUtc,
) -> Result<()>
where
    C: ConnectionTrait,
{
    debt::ActiveModel {
        purchase_id: Set(purchase_id),
        friend_id: Set(Some(friend_id)),
        amount_cents: Set(amount.cents()),
        created_at: Set(created_at),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

async fn delete_items_and_participants<C>(db: &C, purchase_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    LineItem::delete_many()
        .filter(line_item::Column::PurchaseId.eq(purchase_id))
        .exec(db)
        .await?;
    PurchaseParticipant::delete_many()
        .filter(purchase_participant::Column::PurchaseId.eq(purchase_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Brings one friend's debts on an edited purchase in line with the new share.
///
/// Debts at or before the friend's checkpoint were already paid off and stay as
/// they are. The rest of the share is charged on the friend's earliest debt still
/// in the active window, keeping its creation time, or on a new debt when the
/// whole old share is behind the checkpoint. A share that shrank below what was
/// already settled is not refunded.
async fn rebalance_debts<C>(
    db: &C,
    purchase_id: i64,
    friend: &friend::Model,
    share: Money,
    now: DateTimeUtc,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let existing = Debt::find()
        .filter(debt::Column::PurchaseId.eq(purchase_id))
        .filter(debt::Column::FriendId.eq(friend.id))
        .order_by_asc(debt::Column::CreatedAt)
        .order_by_asc(debt::Column::Id)
        .all(db)
        .await?;

    let (settled, active): (Vec<_>, Vec<_>) = existing
        .into_iter()
        .partition(|d| friend.settled_at.is_some_and(|at| d.created_at <= at));
    let already_settled: Money = settled
        .iter()
        .map(|d| Money::from_cents(d.amount_cents))
        .sum();
    let outstanding = share.saturating_sub_to_zero(already_settled);
    if share < already_settled {
        info!(
            purchase = purchase_id,
            friend = friend.id,
            %share,
            %already_settled,
            "Share reduced below the settled amount; difference is not refunded"
        );
    }

    let mut active = active.into_iter();
    match active.next() {
        Some(first) if outstanding.is_positive() => {
            let mut keep: debt::ActiveModel = first.into();
            keep.amount_cents = Set(outstanding.cents());
            keep.update(db).await?;
        }
        Some(first) => {
            first.delete(db).await?;
        }
        None if outstanding.is_positive() => {
            insert_debt(db, purchase_id, friend.id, outstanding, now).await?;
        }
        None => {}
    }
    for extra in active {
        extra.delete(db).await?;
    }
    Ok(())
}

/// IDs of the friends currently participating in a purchase.
pub async fn participant_ids<C>(db: &C, purchase_id: i64) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    Ok(PurchaseParticipant::find()
        .filter(purchase_participant::Column::PurchaseId.eq(purchase_id))
        .all(db)
        .await?
        .into_iter()
        .map(|p| p.friend_id)
        .collect())
}

async fn settle_all<C>(db: &C, friend_ids: &[i64]) -> Result<()>
where
    C: ConnectionTrait,
{
    for &friend_id in friend_ids {
        // The friend may have been deleted concurrently; nothing to settle then.
        match try_settle(db, friend_id).await {
            Ok(_) | Err(Error::NoAuthorization) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

async fn find_purchase<C>(db: &C, purchase_id: i64) -> Result<purchase::Model>
where
    C: ConnectionTrait,
{
    Purchase::find_by_id(purchase_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "Purchase",
            key: purchase_id.to_string(),
        })
}

/// Locks the current participants of a purchase plus `extra`, then opens a
/// transaction.
///
/// The participant set is read again inside the transaction; if a concurrent edit
/// added someone in between, everything is released and taken again.
async fn lock_participants(
    db: &DatabaseConnection,
    locks: &FriendLocks,
    purchase_id: i64,
    extra: &[i64],
) -> Result<(Vec<OwnedMutexGuard<()>>, DatabaseTransaction, Vec<i64>)> {
    let mut previous = participant_ids(db, purchase_id).await?;
    loop {
        let affected: BTreeSet<i64> = previous.iter().chain(extra).copied().collect();
        let guards = locks.lock_many(affected.iter().copied()).await;
        let txn = db.begin().await?;

        let current = participant_ids(&txn, purchase_id).await?;
        if current.iter().all(|id| affected.contains(id)) {
            return Ok((guards, txn, current));
        }
        debug!(purchase = purchase_id, "Participants changed while locking, retrying");
        txn.rollback().await?;
        drop(guards);
        previous = current;
    }
}

/// Creates a purchase and one debt per participating friend.
///
/// # Errors
/// * [`Error::Validation`] for an empty title, no line items, a non-positive
///   quantity, a negative price, or no participants
/// * [`Error::NotFound`] if a participant does not exist
pub async fn create_purchase(
    db: &DatabaseConnection,
    locks: &FriendLocks,
    policy: SplitPolicy,
    input: NewPurchase,
) -> Result<purchase::Model> {
    let valid = validate(&input)?;

    let _guards = locks.lock_many(valid.friend_ids.iter().copied()).await;
    let txn = db.begin().await?;
    ensure_friends_exist(&txn, &valid.friend_ids).await?;

    let now = Utc::now();
    let created = purchase::ActiveModel {
        title: Set(valid.title.clone()),
        note: Set(valid.note.clone()),
        date: Set(input.date),
        total_cents: Set(valid.total.cents()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    insert_items_and_participants(&txn, created.id, &input, &valid).await?;
    let share = per_person_share(policy, valid.total, valid.friend_ids.len());
    for &friend_id in &valid.friend_ids {
        insert_debt(&txn, created.id, friend_id, share, now).await?;
    }
    settle_all(&txn, &valid.friend_ids).await?;
    txn.commit().await?;

    info!(purchase = created.id, total = %valid.total, friends = valid.friend_ids.len(), "Created purchase");
    Ok(created)
}

/// Replaces a purchase's fields, line items and participants, and re-splits it.
///
/// Friends who stay on the purchase keep their debt's place in the ledger: the
/// part of their share already behind their checkpoint is left alone and only the
/// remainder is charged (see `rebalance_debts`). Friends who join get a new debt,
/// friends who leave lose theirs.
///
/// # Errors
/// Same as [`create_purchase`], plus [`Error::NotFound`] for a missing purchase.
pub async fn update_purchase(
    db: &DatabaseConnection,
    locks: &FriendLocks,
    policy: SplitPolicy,
    purchase_id: i64,
    input: NewPurchase,
) -> Result<purchase::Model> {
    let valid = validate(&input)?;

    let (_guards, txn, previous) =
        lock_participants(db, locks, purchase_id, &valid.friend_ids).await?;
    let existing = find_purchase(&txn, purchase_id).await?;
    ensure_friends_exist(&txn, &valid.friend_ids).await?;

    let now = Utc::now();
    let mut active: purchase::ActiveModel = existing.into();
    active.title = Set(valid.title.clone());
    active.note = Set(valid.note.clone());
    active.date = Set(input.date);
    active.total_cents = Set(valid.total.cents());
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    delete_items_and_participants(&txn, purchase_id).await?;
    insert_items_and_participants(&txn, purchase_id, &input, &valid).await?;

    let removed: Vec<i64> = previous
        .iter()
        .copied()
        .filter(|id| !valid.friend_ids.contains(id))
        .collect();
    Debt::delete_many()
        .filter(debt::Column::PurchaseId.eq(purchase_id))
        .filter(debt::Column::FriendId.is_in(removed.iter().copied()))
        .exec(&txn)
        .await?;

    let share = per_person_share(policy, valid.total, valid.friend_ids.len());
    let friends = Friend::find()
        .filter(friend::Column::Id.is_in(valid.friend_ids.iter().copied()))
        .all(&txn)
        .await?;
    for friend in &friends {
        rebalance_debts(&txn, purchase_id, friend, share, now).await?;
    }

    let affected: Vec<i64> = previous
        .iter()
        .chain(valid.friend_ids.iter())
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    settle_all(&txn, &affected).await?;
    txn.commit().await?;

    info!(purchase = purchase_id, total = %valid.total, "Updated purchase");
    Ok(updated)
}

/// Deletes a purchase with its line items, participants and debts.
pub async fn delete_purchase(
    db: &DatabaseConnection,
    locks: &FriendLocks,
    purchase_id: i64,
) -> Result<()> {
    let (_guards, txn, previous) = lock_participants(db, locks, purchase_id, &[]).await?;
    let existing = find_purchase(&txn, purchase_id).await?;

    delete_items_and_participants(&txn, purchase_id).await?;
    Debt::delete_many()
        .filter(debt::Column::PurchaseId.eq(purchase_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;
    settle_all(&txn, &previous).await?;
    txn.commit().await?;

    info!(purchase = purchase_id, "Deleted purchase");
    Ok(())
}

/// Loads a purchase with its line items, participants and debts.
pub async fn get_purchase_detail(
    db: &DatabaseConnection,
    purchase_id: i64,
) -> Result<Option<PurchaseDetail>> {
    let Some(purchase) = Purchase::find_by_id(purchase_id).one(db).await? else {
        return Ok(None);
    };

    let line_items = LineItem::find()
        .filter(line_item::Column::PurchaseId.eq(purchase_id))
        .order_by_asc(line_item::Column::Id)
        .all(db)
        .await?;

    let ids = participant_ids(db, purchase_id).await?;
    let participants = Friend::find()
        .filter(friend::Column::Id.is_in(ids))
        .order_by_asc(friend::Column::Name)
        .all(db)
        .await?;

    let debts = Debt::find()
        .filter(debt::Column::PurchaseId.eq(purchase_id))
        .order_by_asc(debt::Column::Id)
        .find_also_related(Friend)
        .all(db)
        .await?;

    Ok(Some(PurchaseDetail {
        purchase,
        line_items,
        participants,
        debts,
    }))
}

/// Lists purchases, newest date first, then newest created first.
pub async fn list_purchases(db: &DatabaseConnection, limit: u64) -> Result<Vec<purchase::Model>> {
    Purchase::find()
        .order_by_desc(purchase::Column::Date)
        .order_by_desc(purchase::Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

fn parse_price(raw: &str, item: &str) -> Result<Money> {
    let cleaned = raw.trim().trim_start_matches('$').trim();
    cleaned
        .parse::<f64>()
        .ok()
        .and_then(Money::from_major)
        .ok_or_else(|| validation(format!("Invalid price '{}' for '{item}'", raw.trim())))
}

/// Parses line items from the compact text syntax used by the bot.
///
/// Items are separated by `;` or newlines. Each item is `[<qty>x ]<name> @ <price>`,
/// for example `2x Soda @ 5.00; Chips @ $3`.
///
/// # Errors
/// Returns [`Error::Validation`] naming the first malformed item.
pub fn parse_line_items(text: &str) -> Result<Vec<LineItemInput>> {
    let mut items = Vec::new();

    for raw in text.split([';', '\n']).map(str::trim).filter(|s| !s.is_empty()) {
        let Some((left, price)) = raw.rsplit_once('@') else {
            return Err(validation(format!(
                "Line item '{raw}' needs a price, e.g. '2x Soda @ 5.00'"
            )));
        };
        let left = left.trim();

        let (quantity, name) = match left.split_once(char::is_whitespace) {
            Some((head, rest)) if head.ends_with(['x', 'X']) => {
                match head[..head.len() - 1].parse::<f64>() {
                    Ok(qty) => (qty, rest.trim()),
                    Err(_) => (1.0, left),
                }
            }
            _ => (1.0, left),
        };

        if name.is_empty() {
            return Err(validation(format!("Line item '{raw}' needs a name")));
        }

        items.push(LineItemInput {
            name: name.to_string(),
            quantity,
            unit_price: parse_price(price, name)?,
        });
    }

    if items.is_empty() {
        return Err(validation("At least one line item is required"));
    }
    Ok(items)
}
