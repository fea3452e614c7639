//! Settlement controller - balance-changing operations and the settlement checkpoint.
//!
//! Every operation here runs its read-modify-write sequence (reconcile, insert
//! payment, re-check, maybe advance `settled_at`) inside one database transaction
//! while holding the friend's lock, so two concurrent payments can never both pass
//! the overpayment check against the same remaining balance.

use crate::{
    core::{
        money::Money,
        reconcile::{Reconciliation, reconcile_friend},
    },
    entities::{Friend, friend, payment},
    errors::{AmountBound, Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ConnectionTrait, Set, TransactionTrait, prelude::*};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{info, instrument, warn};

/// Payment `kind` for money the friend paid the admin.
pub const KIND_PAYMENT: &str = "payment";
/// Payment `kind` for credit coming from the admin owing the friend.
pub const KIND_OFFSET: &str = "offset";

/// Note stored on payments recorded through the bot.
pub const NOTE_PAID_VIA_DISCORD: &str = "Paid via Discord";
/// Note stored on offsets recorded through the bot.
pub const NOTE_OFFSET: &str = "Offset: admin owes friend";

/// Per-friend mutual exclusion for balance mutations.
///
/// Operations on different friends proceed independently.
#[derive(Debug, Default)]
pub struct FriendLocks {
    locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl FriendLocks {
    /// Creates an empty lock registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, friend_id: i64) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(friend_id).or_default())
    }

    /// Waits for exclusive access to one friend's balance.
    pub async fn lock(&self, friend_id: i64) -> OwnedMutexGuard<()> {
        self.handle(friend_id).lock_owned().await
    }

    /// Waits for exclusive access to several friends' balances.
    ///
    /// Locks are taken in ascending ID order so overlapping callers cannot deadlock.
    pub async fn lock_many<I>(&self, friend_ids: I) -> Vec<OwnedMutexGuard<()>>
    where
        I: IntoIterator<Item = i64>,
    {
        let mut ids: Vec<i64> = friend_ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.lock(id).await);
        }
        guards
    }
}

/// Optional details for a recorded payment.
#[derive(Debug, Clone)]
pub struct PaymentDetails {
    /// Free-text note
    pub note: Option<String>,
    /// Calendar date of the payment, today when `None`
    pub paid_at: Option<NaiveDate>,
    /// `KIND_PAYMENT` or `KIND_OFFSET`
    pub kind: &'static str,
}

impl PaymentDetails {
    /// Details for a payment a friend reported through the bot.
    #[must_use]
    pub fn via_discord() -> Self {
        Self {
            note: Some(NOTE_PAID_VIA_DISCORD.to_string()),
            paid_at: None,
            kind: KIND_PAYMENT,
        }
    }

    fn offset() -> Self {
        Self {
            note: Some(NOTE_OFFSET.to_string()),
            paid_at: None,
            kind: KIND_OFFSET,
        }
    }
}

/// Outcome of a successful [`record_payment`].
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    /// The friend who paid
    pub friend: friend::Model,
    /// The stored payment row
    pub payment: payment::Model,
    /// Whether the payment brought the balance to zero and advanced the checkpoint
    pub settled: bool,
    /// The friend's ledger after the payment
    pub ledger: Reconciliation,
}

/// Outcome of a successful [`record_admin_owes`].
#[derive(Debug, Clone)]
pub enum OweOutcome {
    /// The friend owed nothing; the whole amount is an external adjustment and
    /// nothing was stored.
    NoDebt {
        /// The friend being owed
        friend: friend::Model,
        /// Amount the admin owes
        owed: Money,
    },
    /// The amount covered the whole balance; an offset for exactly the balance was
    /// stored and the friend is settled.
    Settled {
        /// The friend being owed
        friend: friend::Model,
        /// The offset row for the former balance
        payment: payment::Model,
        /// Portion the ledger does not track and the admin must be told about
        excess: Money,
    },
    /// The amount covered part of the balance.
    Partial {
        /// The friend being owed
        friend: friend::Model,
        /// The offset row
        payment: payment::Model,
        /// The friend's ledger after the offset
        ledger: Reconciliation,
    },
}

fn require_positive(amount: Money) -> Result<()> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(Error::InvalidAmount {
            amount,
            bound: AmountBound::Positive,
        })
    }
}

async fn find_caller<C>(db: &C, friend_id: i64) -> Result<friend::Model>
where
    C: ConnectionTrait,
{
    Friend::find_by_id(friend_id)
        .one(db)
        .await?
        .ok_or(Error::NoAuthorization)
}

async fn insert_payment<C>(
    db: &C,
    friend_id: i64,
    amount: Money,
    details: PaymentDetails,
) -> Result<payment::Model>
where
    C: ConnectionTrait,
{
    let note = details
        .note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let paid_at = details
        .paid_at
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let model = payment::ActiveModel {
        friend_id: Set(friend_id),
        amount_cents: Set(amount.cents()),
        note: Set(note),
        paid_at: Set(paid_at),
        kind: Set(details.kind.to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Advances the friend's checkpoint to now if their active balance is exactly zero.
///
/// Must run inside the caller's transaction after every balance-changing write.
/// Returns whether the checkpoint moved.
pub async fn try_settle<C>(db: &C, friend_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let friend = find_caller(db, friend_id).await?;
    let ledger = reconcile_friend(db, &friend).await?;
    if !ledger.is_settled() {
        return Ok(false);
    }

    if ledger.unapplied_credit.is_positive() {
        warn!(
            friend = %friend.name,
            credit = %ledger.unapplied_credit,
            "Settling with unapplied credit; it will not carry over"
        );
    }

    let name = friend.name.clone();
    let mut active: friend::ActiveModel = friend.into();
    active.settled_at = Set(Some(Utc::now()));
    active.update(db).await?;

    info!(friend = %name, "Friend settled, checkpoint advanced");
    Ok(true)
}

/// Records that a friend paid the admin.
///
/// # Errors
/// * [`Error::InvalidAmount`] if `amount` is not positive or exceeds the remaining
///   balance (payments can never overpay)
/// * [`Error::NoOutstandingDebt`] if nothing is owed
/// * [`Error::NoAuthorization`] if `friend_id` is unknown
///
/// Nothing is written when an error is returned.
#[instrument(skip(db, locks, details))]
pub async fn record_payment(
    db: &DatabaseConnection,
    locks: &FriendLocks,
    friend_id: i64,
    amount: Money,
    details: PaymentDetails,
) -> Result<PaymentReceipt> {
    require_positive(amount)?;

    let _guard = locks.lock(friend_id).await;
    let txn = db.begin().await?;

    let friend = find_caller(&txn, friend_id).await?;
    let before = reconcile_friend(&txn, &friend).await?;
    if before.is_settled() {
        return Err(Error::NoOutstandingDebt);
    }
    if amount > before.total_remaining {
        return Err(Error::InvalidAmount {
            amount,
            bound: AmountBound::AtMost(before.total_remaining),
        });
    }

    let payment = insert_payment(&txn, friend_id, amount, details).await?;
    let settled = try_settle(&txn, friend_id).await?;
    let friend = find_caller(&txn, friend_id).await?;
    let ledger = reconcile_friend(&txn, &friend).await?;

    txn.commit().await?;

    info!(friend = %friend.name, %amount, settled, "Recorded payment");
    Ok(PaymentReceipt {
        friend,
        payment,
        settled,
        ledger,
    })
}

/// Records that the admin owes a friend `owe_amount`, offsetting it against the
/// friend's outstanding debt.
///
/// # Errors
/// * [`Error::InvalidAmount`] if `owe_amount` is not positive
/// * [`Error::NoAuthorization`] if `friend_id` is unknown
#[instrument(skip(db, locks))]
pub async fn record_admin_owes(
    db: &DatabaseConnection,
    locks: &FriendLocks,
    friend_id: i64,
    owe_amount: Money,
) -> Result<OweOutcome> {
    require_positive(owe_amount)?;

    let _guard = locks.lock(friend_id).await;
    let txn = db.begin().await?;

    let friend = find_caller(&txn, friend_id).await?;
    let remaining = reconcile_friend(&txn, &friend).await?.total_remaining;

    if remaining.is_zero() {
        txn.commit().await?;
        info!(friend = %friend.name, owed = %owe_amount, "Admin owes friend with no debt");
        return Ok(OweOutcome::NoDebt {
            friend,
            owed: owe_amount,
        });
    }

    if owe_amount >= remaining {
        let payment = insert_payment(&txn, friend_id, remaining, PaymentDetails::offset()).await?;
        if !try_settle(&txn, friend_id).await? {
            return Err(Error::Conflict {
                message: format!("ledger for '{}' changed during settlement", friend.name),
            });
        }
        let friend = find_caller(&txn, friend_id).await?;
        txn.commit().await?;

        let excess = owe_amount - remaining;
        info!(friend = %friend.name, offset = %remaining, %excess, "Offset settled friend");
        return Ok(OweOutcome::Settled {
            friend,
            payment,
            excess,
        });
    }

    let payment = insert_payment(&txn, friend_id, owe_amount, PaymentDetails::offset()).await?;
    try_settle(&txn, friend_id).await?;
    let ledger = reconcile_friend(&txn, &friend).await?;
    txn.commit().await?;

    info!(friend = %friend.name, offset = %owe_amount, "Partial offset recorded");
    Ok(OweOutcome::Partial {
        friend,
        payment,
        ledger,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use crate::core::reconcile::reconcile;
    use crate::core::split::SplitPolicy;
    use crate::entities::Payment;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase, PaginatorTrait};

    async fn payment_count(db: &DatabaseConnection, friend_id: i64) -> Result<u64> {
        Ok(Payment::find()
            .filter(payment::Column::FriendId.eq(friend_id))
            .count(db)
            .await?)
    }

    async fn settled_at(
        db: &DatabaseConnection,
        friend_id: i64,
    ) -> Result<Option<chrono::DateTime<Utc>>> {
        Ok(Friend::find_by_id(friend_id).one(db).await?.unwrap().settled_at)
    }

    #[tokio::test]
    async fn test_record_payment_rejects_non_positive_without_db() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let locks = FriendLocks::new();

        for cents in [0, -500] {
            let result = record_payment(
                &db,
                &locks,
                1,
                Money::from_cents(cents),
                PaymentDetails::via_discord(),
            )
            .await;
            assert!(matches!(
                result,
                Err(Error::InvalidAmount {
                    bound: AmountBound::Positive,
                    ..
                })
            ));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_record_payment_unknown_friend() -> Result<()> {
        let db = setup_test_db().await?;
        let locks = FriendLocks::new();

        let result = record_payment(
            &db,
            &locks,
            99,
            Money::from_cents(100),
            PaymentDetails::via_discord(),
        )
        .await;
        assert!(matches!(result, Err(Error::NoAuthorization)));
        Ok(())
    }

    #[tokio::test]
    async fn test_record_payment_partial() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        let locks = FriendLocks::new();
        create_test_purchase(&db, "Dinner", 4000, &[alice.id]).await?;

        let receipt = record_payment(
            &db,
            &locks,
            alice.id,
            Money::from_cents(500),
            PaymentDetails::via_discord(),
        )
        .await?;

        assert!(!receipt.settled);
        assert_eq!(receipt.payment.amount_cents, 500);
        assert_eq!(receipt.payment.kind, KIND_PAYMENT);
        assert_eq!(receipt.payment.note.as_deref(), Some(NOTE_PAID_VIA_DISCORD));
        assert_eq!(receipt.ledger.total_remaining, Money::from_cents(1500));
        assert!(receipt.ledger.items[0].partial);
        assert_eq!(settled_at(&db, alice.id).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_record_payment_rejects_overpay_without_writing() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        let locks = FriendLocks::new();
        create_test_purchase(&db, "Dinner", 4000, &[alice.id]).await?;

        let result = record_payment(
            &db,
            &locks,
            alice.id,
            Money::from_cents(2001),
            PaymentDetails::via_discord(),
        )
        .await;

        assert!(matches!(
            result,
            Err(Error::InvalidAmount {
                bound: AmountBound::AtMost(limit),
                ..
            }) if limit == Money::from_cents(2000)
        ));
        assert_eq!(payment_count(&db, alice.id).await?, 0);
        assert_eq!(settled_at(&db, alice.id).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_record_payment_no_outstanding_debt() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        let locks = FriendLocks::new();

        let result = record_payment(
            &db,
            &locks,
            alice.id,
            Money::from_cents(100),
            PaymentDetails::via_discord(),
        )
        .await;

        assert!(matches!(result, Err(Error::NoOutstandingDebt)));
        assert_eq!(payment_count(&db, alice.id).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_full_payment_settles_and_isolates_history() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        let locks = FriendLocks::new();
        create_test_purchase(&db, "Dinner", 4000, &[alice.id]).await?;

        let receipt = record_payment(
            &db,
            &locks,
            alice.id,
            Money::from_cents(2000),
            PaymentDetails::via_discord(),
        )
        .await?;
        assert!(receipt.settled);
        assert!(receipt.ledger.items.is_empty());
        assert!(settled_at(&db, alice.id).await?.is_some());

        // A later purchase must not bring the settled dinner back.
        create_test_purchase(&db, "Movies", 3000, &[alice.id]).await?;
        let ledger = reconcile(&db, alice.id).await?;
        assert_eq!(ledger.items.len(), 1);
        assert_eq!(ledger.items[0].title, "Movies");
        assert_eq!(ledger.total_remaining, Money::from_cents(1500));
        Ok(())
    }

    #[tokio::test]
    async fn test_try_settle_only_when_zero() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        create_test_purchase(&db, "Dinner", 4000, &[alice.id]).await?;

        assert!(!try_settle(&db, alice.id).await?);
        assert_eq!(settled_at(&db, alice.id).await?, None);

        insert_raw_payment(&db, alice.id, 2000).await?;
        assert!(try_settle(&db, alice.id).await?);
        assert!(settled_at(&db, alice.id).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_try_settle_friend_with_nothing_owed() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        assert!(try_settle(&db, alice.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_owe_with_no_debt_stores_nothing() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        let locks = FriendLocks::new();

        let outcome = record_admin_owes(&db, &locks, alice.id, Money::from_cents(700)).await?;

        assert!(matches!(
            outcome,
            OweOutcome::NoDebt { owed, .. } if owed == Money::from_cents(700)
        ));
        assert_eq!(payment_count(&db, alice.id).await?, 0);
        assert_eq!(settled_at(&db, alice.id).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_owe_exact_balance_settles_without_excess() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        let locks = FriendLocks::new();
        create_test_purchase(&db, "Dinner", 4000, &[alice.id]).await?;

        let outcome = record_admin_owes(&db, &locks, alice.id, Money::from_cents(2000)).await?;

        let OweOutcome::Settled {
            payment, excess, ..
        } = outcome
        else {
            panic!("expected settled outcome");
        };
        assert_eq!(excess, Money::ZERO);
        assert_eq!(payment.amount_cents, 2000);
        assert_eq!(payment.kind, KIND_OFFSET);
        assert!(settled_at(&db, alice.id).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_owe_more_than_balance_reports_excess() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        let locks = FriendLocks::new();
        create_test_purchase(&db, "Dinner", 4000, &[alice.id]).await?;

        let outcome = record_admin_owes(&db, &locks, alice.id, Money::from_cents(2550)).await?;

        let OweOutcome::Settled {
            payment, excess, ..
        } = outcome
        else {
            panic!("expected settled outcome");
        };
        assert_eq!(payment.amount_cents, 2000);
        assert_eq!(excess, Money::from_cents(550));
        assert_eq!(payment_count(&db, alice.id).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_owe_less_than_balance_is_partial() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        let locks = FriendLocks::new();
        create_test_purchase(&db, "Dinner", 4000, &[alice.id]).await?;

        let outcome = record_admin_owes(&db, &locks, alice.id, Money::from_cents(800)).await?;

        let OweOutcome::Partial { ledger, payment, .. } = outcome else {
            panic!("expected partial outcome");
        };
        assert_eq!(payment.amount_cents, 800);
        assert_eq!(ledger.total_remaining, Money::from_cents(1200));
        assert_eq!(settled_at(&db, alice.id).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_owe_unknown_friend() -> Result<()> {
        let db = setup_test_db().await?;
        let locks = FriendLocks::new();
        let result = record_admin_owes(&db, &locks, 5, Money::from_cents(100)).await;
        assert!(matches!(result, Err(Error::NoAuthorization)));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_payments_cannot_overpay() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        let locks = FriendLocks::new();
        create_dated_purchase(&db, SplitPolicy::CeilingCent, "Dinner", "2026-03-01", 2000, &[alice.id])
            .await?;

        let pay = || {
            record_payment(
                &db,
                &locks,
                alice.id,
                Money::from_cents(800),
                PaymentDetails::via_discord(),
            )
        };
        let (first, second) = tokio::join!(pay(), pay());

        // Balance is 10.00: exactly one of the two 8.00 payments may land.
        assert_eq!(u8::from(first.is_ok()) + u8::from(second.is_ok()), 1);
        assert_eq!(payment_count(&db, alice.id).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_lock_many_dedups_and_orders() {
        let locks = FriendLocks::new();
        let guards = locks.lock_many([3, 1, 3, 2]).await;
        assert_eq!(guards.len(), 3);
    }
}
