//! Payment entity - A credit applied to a friend's balance.
//!
//! Payments are append-only; the admin may delete one but never edit it.
//! `kind` is `"payment"` when the friend paid the admin and `"offset"` when the
//! credit comes from the admin owing the friend.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Friend whose balance is credited
    pub friend_id: i64,
    /// Credited amount in cents, always positive
    pub amount_cents: i64,
    /// Optional note (e.g., "Paid via Discord")
    pub note: Option<String>,
    /// Calendar date the money changed hands
    pub paid_at: Date,
    /// Type of credit: `"payment"` or `"offset"`
    pub kind: String,
    /// When the payment row was written, compared against the settlement checkpoint
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one friend
    #[sea_orm(
        belongs_to = "super::friend::Entity",
        from = "Column::FriendId",
        to = "super::friend::Column::Id",
        on_delete = "Cascade"
    )]
    Friend,
}

impl Related<super::friend::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Friend.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
