//! FIFO reconciliation of a friend's active ledger window.
//!
//! Only debts and payments created strictly after the friend's settlement
//! checkpoint take part. All payments in the window are pooled into a single
//! credit, which is applied to debts oldest purchase first. Debts the pool covers
//! completely drop out; the first debt it cannot cover is partially paid and every
//! later debt is unpaid.

use crate::{
    core::money::Money,
    entities::{Debt, Friend, Payment, debt, friend, payment, purchase},
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ConnectionTrait, QueryOrder, prelude::*};

/// A debt inside the active window, joined with its purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerDebt {
    /// Debt row ID
    pub debt_id: i64,
    /// Purchase the debt is a share of
    pub purchase_id: i64,
    /// Date of the purchase (primary ordering key)
    pub purchase_date: NaiveDate,
    /// Purchase title
    pub title: String,
    /// Share amount
    pub amount: Money,
    /// When the debt row was written (tie-breaker)
    pub created_at: DateTime<Utc>,
}

/// A debt the credit pool did not fully cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpaidDebt {
    /// Debt row ID
    pub debt_id: i64,
    /// Purchase the debt is a share of
    pub purchase_id: i64,
    /// Date of the purchase
    pub purchase_date: NaiveDate,
    /// Purchase title
    pub title: String,
    /// Original share amount
    pub amount: Money,
    /// Portion still owed
    pub remaining: Money,
    /// True when part of the debt was covered
    pub partial: bool,
}

/// Result of reconciling a friend's active window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Not fully paid debts, oldest first
    pub items: Vec<UnpaidDebt>,
    /// Sum of `remaining` over `items`
    pub total_remaining: Money,
    /// Credit left over after every debt was covered. Never shown to friends;
    /// it stays in the window until the next checkpoint.
    pub unapplied_credit: Money,
}

impl Reconciliation {
    /// True when nothing is owed in the active window.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.total_remaining.is_zero()
    }
}

/// Applies a pooled credit to debts, oldest purchase first.
///
/// Debts are ordered by purchase date, then by creation time, then by ID.
#[must_use]
pub fn apply_fifo(mut debts: Vec<LedgerDebt>, credit: Money) -> Reconciliation {
    debts.sort_by(|a, b| {
        a.purchase_date
            .cmp(&b.purchase_date)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.debt_id.cmp(&b.debt_id))
    });

    let mut pool = credit;
    let mut items = Vec::new();
    let mut total_remaining = Money::ZERO;

    for debt in debts {
        if pool >= debt.amount {
            pool -= debt.amount;
            continue;
        }

        let remaining = debt.amount - pool;
        let partial = pool.is_positive();
        pool = Money::ZERO;
        total_remaining += remaining;
        items.push(UnpaidDebt {
            debt_id: debt.debt_id,
            purchase_id: debt.purchase_id,
            purchase_date: debt.purchase_date,
            title: debt.title,
            amount: debt.amount,
            remaining,
            partial,
        });
    }

    Reconciliation {
        items,
        total_remaining,
        unapplied_credit: pool,
    }
}

/// The debts and pooled payments of a friend's active window.
#[derive(Debug, Clone, Default)]
pub struct ActiveWindow {
    /// Debts created after the checkpoint
    pub debts: Vec<LedgerDebt>,
    /// Sum of payments created after the checkpoint
    pub credit: Money,
}

/// Loads the debts and payments created strictly after the friend's checkpoint.
pub async fn load_active_window<C>(db: &C, friend: &friend::Model) -> Result<ActiveWindow>
where
    C: ConnectionTrait,
{
    let mut debt_query = Debt::find().filter(debt::Column::FriendId.eq(friend.id));
    let mut payment_query = Payment::find().filter(payment::Column::FriendId.eq(friend.id));
    if let Some(settled_at) = friend.settled_at {
        debt_query = debt_query.filter(debt::Column::CreatedAt.gt(settled_at));
        payment_query = payment_query.filter(payment::Column::CreatedAt.gt(settled_at));
    }

    let rows: Vec<(debt::Model, Option<purchase::Model>)> = debt_query
        .order_by_asc(debt::Column::Id)
        .find_also_related(purchase::Entity)
        .all(db)
        .await?;

    let mut debts = Vec::with_capacity(rows.len());
    for (debt, purchase) in rows {
        let purchase = purchase.ok_or_else(|| Error::NotFound {
            entity: "Purchase",
            key: debt.purchase_id.to_string(),
        })?;
        debts.push(LedgerDebt {
            debt_id: debt.id,
            purchase_id: purchase.id,
            purchase_date: purchase.date,
            title: purchase.title,
            amount: Money::from_cents(debt.amount_cents),
            created_at: debt.created_at,
        });
    }

    let credit = payment_query
        .all(db)
        .await?
        .iter()
        .map(|p| Money::from_cents(p.amount_cents))
        .sum();

    Ok(ActiveWindow { debts, credit })
}

/// Reconciles an already loaded friend.
pub async fn reconcile_friend<C>(db: &C, friend: &friend::Model) -> Result<Reconciliation>
where
    C: ConnectionTrait,
{
    let window = load_active_window(db, friend).await?;
    Ok(apply_fifo(window.debts, window.credit))
}

/// Reconciles a friend by ID.
///
/// # Errors
/// Returns [`Error::NotFound`] if no friend has this ID.
pub async fn reconcile<C>(db: &C, friend_id: i64) -> Result<Reconciliation>
where
    C: ConnectionTrait,
{
    let friend = Friend::find_by_id(friend_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "Friend",
            key: friend_id.to_string(),
        })?;
    reconcile_friend(db, &friend).await
}
