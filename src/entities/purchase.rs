//! Purchase entity - A single shared expense.
//!
//! A purchase owns its line items, participants and debts. `total_cents` always
//! equals the sum of its line item subtotals.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchase database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    /// Unique identifier for the purchase
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Short title (e.g., "Groceries")
    pub title: String,
    /// Optional free-text note
    pub note: Option<String>,
    /// Date of the purchase, the primary FIFO ordering key for its debts
    pub date: Date,
    /// Purchase total in cents
    pub total_cents: i64,
    /// When the purchase was created
    pub created_at: DateTimeUtc,
    /// When the purchase was last edited
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Purchase and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One purchase has many line items
    #[sea_orm(has_many = "super::line_item::Entity")]
    LineItems,
    /// One purchase has many participants
    #[sea_orm(has_many = "super::purchase_participant::Entity")]
    Participants,
    /// One purchase has one debt per participating friend
    #[sea_orm(has_many = "super::debt::Entity")]
    Debts,
}

impl Related<super::line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LineItems.def()
    }
}

impl Related<super::purchase_participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl Related<super::debt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Debts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
