//! Core business logic.
//!
//! Everything here is independent of Discord: functions take a database handle
//! and return structured data or crate errors. The bot layer only formats.

/// Friend-facing `ask`/`pay`/`owe` commands
pub mod command;
/// Friend registration, linking, deletion and statements
pub mod friend;
/// Participant presets
pub mod group;
/// Integer-cent money type
pub mod money;
/// Best-effort admin notifications
pub mod notify;
/// Admin payment management
pub mod payment;
/// Purchases, line items and debts
pub mod purchase;
/// FIFO reconciliation of the active window
pub mod reconcile;
/// Dashboard
pub mod report;
/// Settlement controller and per-friend locking
pub mod settlement;
/// Split policy and share computation
pub mod split;
