//! Payment administration - recording on a friend's behalf, listing and deleting.
//!
//! Friend-initiated payments go through [`crate::core::command`]; the admin uses
//! the same settlement path here so overpayment and no-debt rules apply equally.

use crate::{
    core::{
        money::Money,
        settlement::{
            FriendLocks, KIND_PAYMENT, PaymentDetails, PaymentReceipt, record_payment, try_settle,
        },
    },
    entities::{Payment, payment},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, TransactionTrait, prelude::*};
use tracing::info;

/// Records a payment the admin received outside Discord.
pub async fn record_admin_payment(
    db: &DatabaseConnection,
    locks: &FriendLocks,
    friend_id: i64,
    amount: Money,
    note: Option<String>,
    paid_at: Option<NaiveDate>,
) -> Result<PaymentReceipt> {
    let details = PaymentDetails {
        note,
        paid_at,
        kind: KIND_PAYMENT,
    };
    match record_payment(db, locks, friend_id, amount, details).await {
        // The admin names friends by ID, so an unknown one is a lookup failure.
        Err(Error::NoAuthorization) => Err(Error::NotFound {
            entity: "Friend",
            key: friend_id.to_string(),
        }),
        other => other,
    }
}

/// Deletes a payment and re-checks the owner's settlement.
///
/// Deleting a payment from before the owner's checkpoint does not reopen the
/// settled window.
pub async fn delete_payment(
    db: &DatabaseConnection,
    locks: &FriendLocks,
    payment_id: i64,
) -> Result<payment::Model> {
    let not_found = || Error::NotFound {
        entity: "Payment",
        key: payment_id.to_string(),
    };

    let owner = Payment::find_by_id(payment_id)
        .one(db)
        .await?
        .ok_or_else(not_found)?
        .friend_id;

    let _guard = locks.lock(owner).await;
    let txn = db.begin().await?;
    let existing = Payment::find_by_id(payment_id)
        .one(&txn)
        .await?
        .ok_or_else(not_found)?;

    existing.clone().delete(&txn).await?;
    try_settle(&txn, owner).await?;
    txn.commit().await?;

    info!(payment = payment_id, friend = owner, amount = %Money::from_cents(existing.amount_cents), "Deleted payment");
    Ok(existing)
}

/// Lists a friend's payments, newest first.
pub async fn list_payments_for_friend(
    db: &DatabaseConnection,
    friend_id: i64,
) -> Result<Vec<payment::Model>> {
    Ok(Payment::find()
        .filter(payment::Column::FriendId.eq(friend_id))
        .order_by_desc(payment::Column::PaidAt)
        .order_by_desc(payment::Column::CreatedAt)
        .all(db)
        .await?)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::reconcile::reconcile;
    use crate::errors::AmountBound;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_admin_payment_keeps_note_and_date() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        let locks = FriendLocks::new();
        create_test_purchase(&db, "Groceries", 6000, &[alice.id]).await?;
        let date = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();

        let receipt = record_admin_payment(
            &db,
            &locks,
            alice.id,
            Money::from_cents(1000),
            Some("cash".to_string()),
            Some(date),
        )
        .await?;

        assert_eq!(receipt.payment.note.as_deref(), Some("cash"));
        assert_eq!(receipt.payment.paid_at, date);
        assert_eq!(receipt.payment.kind, KIND_PAYMENT);
        assert_eq!(receipt.ledger.total_remaining, Money::from_cents(2000));
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_payment_enforces_overpay_rule() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        let locks = FriendLocks::new();
        create_test_purchase(&db, "Groceries", 2000, &[alice.id]).await?;

        let result =
            record_admin_payment(&db, &locks, alice.id, Money::from_cents(1001), None, None).await;
        assert!(matches!(
            result,
            Err(Error::InvalidAmount {
                bound: AmountBound::AtMost(limit),
                ..
            }) if limit == Money::from_cents(1000)
        ));

        let result = record_admin_payment(&db, &locks, 404, Money::from_cents(1), None, None).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_payment_restores_balance() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        let locks = FriendLocks::new();
        create_test_purchase(&db, "Groceries", 6000, &[alice.id]).await?;
        let receipt =
            record_admin_payment(&db, &locks, alice.id, Money::from_cents(1000), None, None)
                .await?;

        let deleted = delete_payment(&db, &locks, receipt.payment.id).await?;

        assert_eq!(deleted.id, receipt.payment.id);
        assert_eq!(
            reconcile(&db, alice.id).await?.total_remaining,
            Money::from_cents(3000)
        );
        assert!(list_payments_for_friend(&db, alice.id).await?.is_empty());
        assert!(matches!(
            delete_payment(&db, &locks, receipt.payment.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_payments_newest_first() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        let locks = FriendLocks::new();
        create_test_purchase(&db, "Groceries", 6000, &[alice.id]).await?;
        let early = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let late = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        record_admin_payment(&db, &locks, alice.id, Money::from_cents(100), None, Some(early))
            .await?;
        record_admin_payment(&db, &locks, alice.id, Money::from_cents(200), None, Some(late))
            .await?;

        let payments = list_payments_for_friend(&db, alice.id).await?;
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].paid_at, late);
        assert_eq!(payments[1].paid_at, early);
        Ok(())
    }
}
