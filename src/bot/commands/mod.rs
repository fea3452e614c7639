//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Friend management commands
pub mod friend;

/// General utility commands and the dashboard
pub mod general;

/// Group management commands
pub mod group;

/// Friend-facing ledger commands
pub mod ledger;

/// Payment management commands
pub mod payment;

/// Purchase management commands
pub mod purchase;

use crate::{bot::BotData, errors::Error};

/// Every command the bot registers.
#[must_use]
pub fn all() -> Vec<poise::Command<BotData, Error>> {
    vec![
        ledger::ask(),
        ledger::pay(),
        ledger::owe(),
        friend::friend(),
        purchase::purchase(),
        payment::payment(),
        group::group_manage(),
        general::dashboard(),
        general::ping(),
        general::help(),
    ]
}
