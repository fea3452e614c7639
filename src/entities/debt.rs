//! Debt entity - A friend's fixed share of one purchase.
//!
//! Editing a purchase adjusts a friend's debt in place when it is still in their
//! active window and never touches debts behind the settlement checkpoint.
//! `friend_id` is cleared when the friend is deleted so the purchase keeps its
//! history.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Debt database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "debts")]
pub struct Model {
    /// Unique identifier for the debt
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Purchase this debt is a share of
    pub purchase_id: i64,
    /// Friend who owes the share, `None` once that friend was deleted
    pub friend_id: Option<i64>,
    /// Share amount in cents
    pub amount_cents: i64,
    /// When the debt row was written, compared against the settlement checkpoint
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Debt and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each debt belongs to one purchase
    #[sea_orm(
        belongs_to = "super::purchase::Entity",
        from = "Column::PurchaseId",
        to = "super::purchase::Column::Id",
        on_delete = "Cascade"
    )]
    Purchase,
    /// Each debt references (does not belong to) one friend
    #[sea_orm(
        belongs_to = "super::friend::Entity",
        from = "Column::FriendId",
        to = "super::friend::Column::Id",
        on_delete = "SetNull"
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
