//! Entity module - Contains all SeaORM entity definitions for the ledger database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod debt;
pub mod friend;
pub mod group;
pub mod group_member;
pub mod line_item;
pub mod payment;
pub mod purchase;
pub mod purchase_participant;

// Re-export specific types to avoid conflicts
pub use debt::{Column as DebtColumn, Entity as Debt, Model as DebtModel};
pub use friend::{Column as FriendColumn, Entity as Friend, Model as FriendModel};
pub use group::{Column as GroupColumn, Entity as Group, Model as GroupModel};
pub use group_member::{
    Column as GroupMemberColumn, Entity as GroupMember, Model as GroupMemberModel,
};
pub use line_item::{Column as LineItemColumn, Entity as LineItem, Model as LineItemModel};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel};
pub use purchase::{Column as PurchaseColumn, Entity as Purchase, Model as PurchaseModel};
pub use purchase_participant::{
    Column as PurchaseParticipantColumn, Entity as PurchaseParticipant,
    Model as PurchaseParticipantModel,
};
