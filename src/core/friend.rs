//! Friend business logic - registration, Discord linking, deletion and statements.

use crate::{
    core::{
        money::Money,
        reconcile::{Reconciliation, reconcile_friend},
        settlement::FriendLocks,
    },
    entities::{
        Debt, Friend, GroupMember, Payment, PurchaseParticipant, debt, friend, group_member,
        payment, purchase, purchase_participant,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{ConnectionTrait, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::info;

/// A friend's full history plus their current active-window reconciliation.
#[derive(Debug, Clone)]
pub struct FriendStatement {
    /// The friend
    pub friend: friend::Model,
    /// Every debt ever recorded for the friend, with its purchase, newest first
    pub debts: Vec<(debt::Model, Option<purchase::Model>)>,
    /// Every payment ever recorded for the friend, newest first
    pub payments: Vec<payment::Model>,
    /// Sum of all debts, settled or not
    pub lifetime_debt: Money,
    /// Sum of all payments, settled or not
    pub lifetime_paid: Money,
    /// Reconciliation of the active window
    pub ledger: Reconciliation,
}

fn normalize_discord_id(discord_id: Option<String>) -> Result<Option<String>> {
    let Some(id) = discord_id.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    if !id.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Validation {
            message: format!("Discord ID '{id}' must be numeric"),
        });
    }
    Ok(Some(id))
}

/// Registers a new friend.
///
/// # Errors
/// * [`Error::Validation`] for a blank name or a non-numeric Discord ID
/// * [`Error::Conflict`] if the name or Discord ID is already taken
pub async fn create_friend(
    db: &DatabaseConnection,
    name: &str,
    discord_id: Option<String>,
) -> Result<friend::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Friend name is required".to_string(),
        });
    }
    let discord_id = normalize_discord_id(discord_id)?;

    let model = friend::ActiveModel {
        name: Set(name.to_string()),
        discord_id: Set(discord_id),
        settled_at: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    let created = model.insert(db).await.map_err(|e| {
        Error::conflict_on_unique(e, format!("A friend named '{name}' or with that Discord ID already exists"))
    })?;

    info!(friend = created.id, name = %created.name, "Registered friend");
    Ok(created)
}

/// Lists all friends by name.
pub async fn list_friends(db: &DatabaseConnection) -> Result<Vec<friend::Model>> {
    Ok(Friend::find()
        .order_by_asc(friend::Column::Name)
        .all(db)
        .await?)
}

/// Looks up a friend by ID.
pub async fn get_friend_by_id(db: &DatabaseConnection, id: i64) -> Result<Option<friend::Model>> {
    Ok(Friend::find_by_id(id).one(db).await?)
}

/// Looks up a friend by exact name.
pub async fn get_friend_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<friend::Model>> {
    Ok(Friend::find()
        .filter(friend::Column::Name.eq(name.trim()))
        .one(db)
        .await?)
}

/// Resolves a Discord user to a friend. This is the only authorization check
/// friend commands go through.
pub async fn get_friend_by_discord_id<C>(db: &C, discord_id: &str) -> Result<Option<friend::Model>>
where
    C: ConnectionTrait,
{
    Ok(Friend::find()
        .filter(friend::Column::DiscordId.eq(discord_id))
        .one(db)
        .await?)
}

/// Links a friend to a Discord user, or unlinks them with `None`.
///
/// # Errors
/// * [`Error::NotFound`] if the friend does not exist
/// * [`Error::Conflict`] if another friend already has that Discord ID
pub async fn set_discord_id(
    db: &DatabaseConnection,
    friend_id: i64,
    discord_id: Option<String>,
) -> Result<friend::Model> {
    let discord_id = normalize_discord_id(discord_id)?;
    let friend = Friend::find_by_id(friend_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "Friend",
            key: friend_id.to_string(),
        })?;

    let mut active: friend::ActiveModel = friend.into();
    active.discord_id = Set(discord_id.clone());
    let updated = active.update(db).await.map_err(|e| {
        Error::conflict_on_unique(e, "That Discord ID is already linked to another friend")
    })?;

    info!(friend = friend_id, linked = discord_id.is_some(), "Updated Discord link");
    Ok(updated)
}

/// Deletes a friend whose active balance is zero.
///
/// Payments, group memberships and purchase participation go with them; their
/// debts stay on the purchases with the friend reference cleared.
///
/// # Errors
/// * [`Error::NotFound`] if the friend does not exist
/// * [`Error::Conflict`] if the friend still owes money
pub async fn delete_friend(
    db: &DatabaseConnection,
    locks: &FriendLocks,
    friend_id: i64,
) -> Result<()> {
    let _guard = locks.lock(friend_id).await;
    let txn = db.begin().await?;

    let friend = Friend::find_by_id(friend_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "Friend",
            key: friend_id.to_string(),
        })?;

    let ledger = reconcile_friend(&txn, &friend).await?;
    if !ledger.is_settled() {
        return Err(Error::Conflict {
            message: format!(
                "{} still owes {}; settle before deleting",
                friend.name, ledger.total_remaining
            ),
        });
    }

    Payment::delete_many()
        .filter(payment::Column::FriendId.eq(friend_id))
        .exec(&txn)
        .await?;
    GroupMember::delete_many()
        .filter(group_member::Column::FriendId.eq(friend_id))
        .exec(&txn)
        .await?;
    PurchaseParticipant::delete_many()
        .filter(purchase_participant::Column::FriendId.eq(friend_id))
        .exec(&txn)
        .await?;
    Debt::update_many()
        .col_expr(debt::Column::FriendId, Expr::value(Option::<i64>::None))
        .filter(debt::Column::FriendId.eq(friend_id))
        .exec(&txn)
        .await?;
    friend.delete(&txn).await?;

    txn.commit().await?;
    info!(friend = friend_id, "Deleted friend");
    Ok(())
}

/// Builds a friend's lifetime statement.
///
/// # Errors
/// Returns [`Error::NotFound`] if the friend does not exist.
pub async fn friend_statement(db: &DatabaseConnection, friend_id: i64) -> Result<FriendStatement> {
    let friend = Friend::find_by_id(friend_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "Friend",
            key: friend_id.to_string(),
        })?;

    let debts = Debt::find()
        .filter(debt::Column::FriendId.eq(friend_id))
        .order_by_desc(debt::Column::CreatedAt)
        .order_by_desc(debt::Column::Id)
        .find_also_related(purchase::Entity)
        .all(db)
        .await?;
    let payments = Payment::find()
        .filter(payment::Column::FriendId.eq(friend_id))
        .order_by_desc(payment::Column::CreatedAt)
        .order_by_desc(payment::Column::Id)
        .all(db)
        .await?;

    let lifetime_debt = debts.iter().map(|(d, _)| Money::from_cents(d.amount_cents)).sum();
    let lifetime_paid = payments.iter().map(|p| Money::from_cents(p.amount_cents)).sum();
    let ledger = reconcile_friend(db, &friend).await?;

    Ok(FriendStatement {
        friend,
        debts,
        payments,
        lifetime_debt,
        lifetime_paid,
        ledger,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::settlement::{PaymentDetails, record_payment};
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase, PaginatorTrait};

    #[tokio::test]
    async fn test_create_friend_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_friend(&db, "   ", None).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_friend(&db, "Alice", Some("not-a-snowflake".to_string())).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_and_lookup_friend() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_friend(&db, "  Alice ", Some(" 123456 ".to_string())).await?;

        assert_eq!(created.name, "Alice");
        assert_eq!(created.discord_id.as_deref(), Some("123456"));
        assert!(created.settled_at.is_none());

        let by_name = get_friend_by_name(&db, "Alice").await?.unwrap();
        assert_eq!(by_name.id, created.id);
        let by_discord = get_friend_by_discord_id(&db, "123456").await?.unwrap();
        assert_eq!(by_discord.id, created.id);
        assert!(get_friend_by_discord_id(&db, "999").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() -> Result<()> {
        let db = setup_test_db().await?;
        create_friend(&db, "Alice", None).await?;

        let result = create_friend(&db, "Alice", None).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_discord_id_conflicts_on_link() -> Result<()> {
        let db = setup_test_db().await?;
        create_friend(&db, "Alice", Some("111".to_string())).await?;
        let bob = create_friend(&db, "Bob", None).await?;

        let result = set_discord_id(&db, bob.id, Some("111".to_string())).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        let linked = set_discord_id(&db, bob.id, Some("222".to_string())).await?;
        assert_eq!(linked.discord_id.as_deref(), Some("222"));
        let unlinked = set_discord_id(&db, bob.id, None).await?;
        assert!(unlinked.discord_id.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_friends_sorted() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_friend(&db, "Zed").await?;
        create_test_friend(&db, "Amy").await?;

        let names: Vec<String> = list_friends(&db).await?.into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["Amy", "Zed"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_friend_with_balance_conflicts() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        let locks = FriendLocks::new();
        create_test_purchase(&db, "Pizza", 2000, &[alice.id]).await?;

        let result = delete_friend(&db, &locks, alice.id).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        assert!(get_friend_by_id(&db, alice.id).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_settled_friend_keeps_purchase_debts() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        let locks = FriendLocks::new();
        create_test_purchase(&db, "Pizza", 2000, &[alice.id]).await?;
        record_payment(&db, &locks, alice.id, Money::from_cents(1000), PaymentDetails::via_discord())
            .await?;

        delete_friend(&db, &locks, alice.id).await?;

        assert!(get_friend_by_id(&db, alice.id).await?.is_none());
        assert_eq!(Payment::find().count(&db).await?, 0);
        assert_eq!(PurchaseParticipant::find().count(&db).await?, 0);
        let debts = Debt::find().all(&db).await?;
        assert_eq!(debts.len(), 1);
        assert!(debts[0].friend_id.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_unknown_friend() -> Result<()> {
        let db = setup_test_db().await?;
        let result = delete_friend(&db, &FriendLocks::new(), 5).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_statement_includes_settled_history() -> Result<()> {
        let (db, alice) = setup_with_friend().await?;
        let locks = FriendLocks::new();
        create_test_purchase(&db, "Pizza", 2000, &[alice.id]).await?;
        record_payment(&db, &locks, alice.id, Money::from_cents(1000), PaymentDetails::via_discord())
            .await?;
        create_test_purchase(&db, "Tacos", 1000, &[alice.id]).await?;

        let statement = friend_statement(&db, alice.id).await?;

        assert_eq!(statement.debts.len(), 2);
        assert_eq!(statement.debts[0].1.as_ref().unwrap().title, "Tacos");
        assert_eq!(statement.payments.len(), 1);
        assert_eq!(statement.lifetime_debt, Money::from_cents(1500));
        assert_eq!(statement.lifetime_paid, Money::from_cents(1000));
        assert_eq!(statement.ledger.total_remaining, Money::from_cents(500));
        assert_eq!(statement.ledger.items.len(), 1);
        assert_eq!(statement.ledger.items[0].title, "Tacos");
        Ok(())
    }
}
