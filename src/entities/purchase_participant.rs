//! Purchase participant join table. The admin is never stored here.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchase participant database model, keyed by `(purchase_id, friend_id)`
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_participants")]
pub struct Model {
    /// Purchase being shared
    #[sea_orm(primary_key, auto_increment = false)]
    pub purchase_id: i64,
    /// Participating friend
    #[sea_orm(primary_key, auto_increment = false)]
    pub friend_id: i64,
}

/// Defines relationships between `PurchaseParticipant` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each participation belongs to one purchase
    #[sea_orm(
        belongs_to = "super::purchase::Entity",
        from = "Column::PurchaseId",
        to = "super::purchase::Column::Id",
        on_delete = "Cascade"
    )]
    Purchase,
    /// Each participation points at one friend
    #[sea_orm(
        belongs_to = "super::friend::Entity",
        from = "Column::FriendId",
        to = "super::friend::Column::Id",
        on_delete = "Cascade"
    )]
    Friend,
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl Related<super::friend::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Friend.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
