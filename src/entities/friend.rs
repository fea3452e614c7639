//! Friend entity - A ledger participant who owes and pays the admin.
//!
//! `settled_at` is the settlement checkpoint: debts and payments created at or
//! before it are excluded from reconciliation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Friend database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "friends")]
pub struct Model {
    /// Unique identifier for the friend
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unique display name
    #[sea_orm(unique)]
    pub name: String,
    /// Discord user ID used to authorize bot commands, unique when present
    #[sea_orm(unique)]
    pub discord_id: Option<String>,
    /// Settlement checkpoint, `None` means "beginning of time"
    pub settled_at: Option<DateTimeUtc>,
    /// When the friend was added
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Friend and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One friend has many debts
    #[sea_orm(has_many = "super::debt::Entity")]
    Debts,
    /// One friend has many payments
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
    /// One friend can belong to many groups
    #[sea_orm(has_many = "super::group_member::Entity")]
    GroupMembers,
    /// One friend can participate in many purchases
    #[sea_orm(has_many = "super::purchase_participant::Entity")]
    PurchaseParticipants,
}

impl Related<super::debt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Debts.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::group_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupMembers.def()
    }
}

impl Related<super::purchase_participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseParticipants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
