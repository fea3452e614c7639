//! Friend groups - named participant presets for entering purchases.

use crate::{
    entities::{Friend, Group, GroupMember, friend, group, group_member},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{ConnectionTrait, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use std::collections::BTreeSet;
use tracing::info;

/// A group with its members.
#[derive(Debug, Clone)]
pub struct GroupWithMembers {
    /// The group
    pub group: group::Model,
    /// Members sorted by name
    pub members: Vec<friend::Model>,
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation {
            message: "Group name is required".to_string(),
        });
    }
    Ok(name.to_string())
}

async fn replace_members<C>(db: &C, group_id: i64, friend_ids: &[i64]) -> Result<()>
where
    C: ConnectionTrait,
{
    GroupMember::delete_many()
        .filter(group_member::Column::GroupId.eq(group_id))
        .exec(db)
        .await?;

    for friend_id in friend_ids.iter().copied().collect::<BTreeSet<_>>() {
        if Friend::find_by_id(friend_id).one(db).await?.is_none() {
            return Err(Error::NotFound {
                entity: "Friend",
                key: friend_id.to_string(),
            });
        }
        GroupMember::insert(group_member::ActiveModel {
            group_id: Set(group_id),
            friend_id: Set(friend_id),
        })
        .exec(db)
        .await?;
    }
    Ok(())
}

/// Creates a group with the given members.
///
/// # Errors
/// * [`Error::Validation`] for a blank name
/// * [`Error::Conflict`] if the name is taken
/// * [`Error::NotFound`] if a member does not exist
pub async fn create_group(
    db: &DatabaseConnection,
    name: &str,
    friend_ids: &[i64],
) -> Result<group::Model> {
    let name = validate_name(name)?;
    let txn = db.begin().await?;

    let created = group::ActiveModel {
        name: Set(name.clone()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| Error::conflict_on_unique(e, format!("A group named '{name}' already exists")))?;

    replace_members(&txn, created.id, friend_ids).await?;
    txn.commit().await?;

    info!(group = created.id, name = %created.name, "Created group");
    Ok(created)
}

/// Renames a group and/or replaces its member list. `None` leaves that part as is.
pub async fn update_group(
    db: &DatabaseConnection,
    group_id: i64,
    name: Option<&str>,
    friend_ids: Option<&[i64]>,
) -> Result<group::Model> {
    let name = name.map(validate_name).transpose()?;
    let txn = db.begin().await?;

    let existing = Group::find_by_id(group_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "Group",
            key: group_id.to_string(),
        })?;

    let updated = match name {
        Some(name) => {
            let mut active: group::ActiveModel = existing.into();
            active.name = Set(name.clone());
            active.update(&txn).await.map_err(|e| {
                Error::conflict_on_unique(e, format!("A group named '{name}' already exists"))
            })?
        }
        None => existing,
    };

    if let Some(friend_ids) = friend_ids {
        replace_members(&txn, group_id, friend_ids).await?;
    }
    txn.commit().await?;
    Ok(updated)
}

/// Deletes a group. Its members are untouched.
pub async fn delete_group(db: &DatabaseConnection, group_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    GroupMember::delete_many()
        .filter(group_member::Column::GroupId.eq(group_id))
        .exec(&txn)
        .await?;
    let result = Group::delete_by_id(group_id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "Group",
            key: group_id.to_string(),
        });
    }
    txn.commit().await?;
    Ok(())
}

/// Looks up a group by exact name.
pub async fn get_group_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<group::Model>> {
    Ok(Group::find()
        .filter(group::Column::Name.eq(name.trim()))
        .one(db)
        .await?)
}

/// IDs of a group's members.
pub async fn group_member_ids(db: &DatabaseConnection, group_id: i64) -> Result<Vec<i64>> {
    Ok(GroupMember::find()
        .select_only()
        .column(group_member::Column::FriendId)
        .filter(group_member::Column::GroupId.eq(group_id))
        .order_by_asc(group_member::Column::FriendId)
        .into_tuple()
        .all(db)
        .await?)
}

/// Lists every group with its members, by group name.
pub async fn list_groups(db: &DatabaseConnection) -> Result<Vec<GroupWithMembers>> {
    let groups = Group::find()
        .order_by_asc(group::Column::Name)
        .all(db)
        .await?;

    let mut result = Vec::with_capacity(groups.len());
    for group in groups {
        let ids = group_member_ids(db, group.id).await?;
        let members = Friend::find()
            .filter(friend::Column::Id.is_in(ids))
            .order_by_asc(friend::Column::Name)
            .all(db)
            .await?;
        result.push(GroupWithMembers { group, members });
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_group_with_members() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_friend(&db, "Alice").await?;
        let bob = create_test_friend(&db, "Bob").await?;

        let group = create_group(&db, " Roommates ", &[bob.id, alice.id, bob.id]).await?;
        assert_eq!(group.name, "Roommates");
        assert_eq!(group_member_ids(&db, group.id).await?, vec![alice.id, bob.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_group_name_conflict_and_validation() -> Result<()> {
        let db = setup_test_db().await?;
        create_group(&db, "Roommates", &[]).await?;

        assert!(matches!(
            create_group(&db, "Roommates", &[]).await,
            Err(Error::Conflict { .. })
        ));
        assert!(matches!(
            create_group(&db, "  ", &[]).await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_group_unknown_member_rolls_back() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_group(&db, "Ghosts", &[42]).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert!(get_group_by_name(&db, "Ghosts").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_list_groups() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_friend(&db, "Alice").await?;
        let bob = create_test_friend(&db, "Bob").await?;
        let group = create_group(&db, "Lunch", &[alice.id]).await?;

        update_group(&db, group.id, Some("Lunch crew"), Some(&[bob.id][..])).await?;

        let groups = list_groups(&db).await?;
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group.name, "Lunch crew");
        assert_eq!(groups[0].members.len(), 1);
        assert_eq!(groups[0].members[0].name, "Bob");

        let renamed = update_group(&db, group.id, Some("Brunch"), None).await?;
        assert_eq!(renamed.name, "Brunch");
        assert_eq!(group_member_ids(&db, group.id).await?, vec![bob.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_group_keeps_friends() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_friend(&db, "Alice").await?;
        let group = create_group(&db, "Lunch", &[alice.id]).await?;

        delete_group(&db, group.id).await?;

        assert!(list_groups(&db).await?.is_empty());
        assert!(Friend::find_by_id(alice.id).one(&db).await?.is_some());
        assert!(matches!(
            delete_group(&db, group.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
