//! Group membership join table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Group member database model, keyed by `(group_id, friend_id)`
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_members")]
pub struct Model {
    /// Group this membership belongs to
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: i64,
    /// Member friend
    #[sea_orm(primary_key, auto_increment = false)]
    pub friend_id: i64,
}

/// Defines relationships between `GroupMember` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each membership belongs to one group
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id",
        on_delete = "Cascade"
    )]
    Group,
    /// Each membership points at one friend
    #[sea_orm(
        belongs_to = "super::friend::Entity",
        from = "Column::FriendId",
        to = "super::friend::Column::Id",
        on_delete = "Cascade"
    )]
    Friend,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::friend::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Friend.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
