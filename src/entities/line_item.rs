//! Line item entity - One row of a purchase.
//!
//! `subtotal_cents` is stored redundantly for display and always equals
//! `quantity × unit_price_cents` rounded to the cent.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Line item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "line_items")]
pub struct Model {
    /// Unique identifier for the line item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Purchase this item belongs to
    pub purchase_id: i64,
    /// Item name
    pub name: String,
    /// Quantity bought, may be fractional (e.g., 1.5 kg)
    pub quantity: f64,
    /// Price per unit in cents
    pub unit_price_cents: i64,
    /// `quantity × unit_price_cents`, rounded to the cent
    pub subtotal_cents: i64,
}

/// Defines relationships between `LineItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line item belongs to one purchase
    #[sea_orm(
        belongs_to = "super::purchase::Entity",
        from = "Column::PurchaseId",
        to = "super::purchase::Column::Id",
        on_delete = "Cascade"
    )]
    Purchase,
}

impl Related<super::purchase::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
