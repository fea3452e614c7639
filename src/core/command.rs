//! Friend-facing commands: `ask`, `pay` and `owe`.
//!
//! Each command resolves the caller's Discord ID to a friend, runs the matching
//! settlement operation and renders a short reply. Business-rule failures become
//! polite replies; only infrastructure errors are returned as `Err`.

use crate::{
    core::{
        friend::get_friend_by_discord_id,
        money::Money,
        notify::{AdminNotifier, notify_best_effort},
        reconcile::{Reconciliation, reconcile_friend},
        settlement::{FriendLocks, OweOutcome, PaymentDetails, record_admin_owes, record_payment},
    },
    errors::{AmountBound, Error, Result},
};
use sea_orm::DatabaseConnection;
use std::fmt::Write;
use tracing::{info, instrument};

/// A friend command, resolved once at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Show the caller's outstanding debts
    Ask,
    /// The caller paid the admin this many currency units
    Pay(f64),
    /// The admin owes the caller this many currency units
    Owe(f64),
}

impl Command {
    /// Command name as typed in Discord.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ask => "ask",
            Self::Pay(_) => "pay",
            Self::Owe(_) => "owe",
        }
    }
}

/// Runs a friend command and returns the reply text.
///
/// # Errors
/// Only database and formatting failures are returned; every business-rule
/// violation is turned into a reply.
#[instrument(skip(db, locks, notifier))]
pub async fn execute<N>(
    db: &DatabaseConnection,
    locks: &FriendLocks,
    notifier: &N,
    caller_discord_id: &str,
    command: Command,
) -> Result<String>
where
    N: AdminNotifier,
{
    let result = match command {
        Command::Ask => ask(db, caller_discord_id).await,
        Command::Pay(amount) => pay(db, locks, notifier, caller_discord_id, amount).await,
        Command::Owe(amount) => owe(db, locks, notifier, caller_discord_id, amount).await,
    };

    match result {
        Ok(reply) => Ok(reply),
        Err(e) => rejection_message(&e).map_or(Err(e), |reply| {
            info!(command = command.name(), reason = %reply, "Command rejected");
            Ok(reply)
        }),
    }
}

/// The polite reply for a business-rule error, or `None` for infrastructure errors.
#[must_use]
pub fn rejection_message(err: &Error) -> Option<String> {
    if !err.is_business_rule() {
        return None;
    }
    let reply = match err {
        Error::NoAuthorization => "❌ You're not authorized to use this bot.".to_string(),
        Error::InvalidAmount {
            bound: AmountBound::AtMost(limit),
            ..
        } => format!("❌ You can pay at most {limit}, your remaining balance."),
        Error::InvalidAmount {
            bound: AmountBound::Positive,
            ..
        } => "❌ Invalid amount: must be greater than zero".to_string(),
        Error::NoOutstandingDebt => "✅ You have no outstanding debt. Nothing to pay!".to_string(),
        _ => format!("❌ {err}"),
    };
    Some(reply)
}

/// Renders the unpaid debts and total, or the settled message.
pub fn format_ledger(ledger: &Reconciliation) -> Result<String> {
    if ledger.is_settled() {
        return Ok("✅ You're all settled up!".to_string());
    }

    let mut out = String::from("**Outstanding debts:**\n");
    for item in &ledger.items {
        write!(out, "• {} {}: {}", item.purchase_date, item.title, item.remaining)?;
        if item.partial {
            write!(out, " (of {}, partially paid)", item.amount)?;
        }
        out.push('\n');
    }
    write!(out, "\nTotal remaining: **{}**", ledger.total_remaining)?;
    Ok(out)
}

fn parse_amount(amount: f64) -> Result<Money> {
    Money::from_major(amount).ok_or(Error::InvalidAmount {
        amount: Money::ZERO,
        bound: AmountBound::Positive,
    })
}

async fn ask(db: &DatabaseConnection, caller: &str) -> Result<String> {
    let friend = get_friend_by_discord_id(db, caller)
        .await?
        .ok_or(Error::NoAuthorization)?;
    let ledger = reconcile_friend(db, &friend).await?;
    format_ledger(&ledger)
}

async fn pay<N>(
    db: &DatabaseConnection,
    locks: &FriendLocks,
    notifier: &N,
    caller: &str,
    amount: f64,
) -> Result<String>
where
    N: AdminNotifier,
{
    let amount = parse_amount(amount)?;
    let friend = get_friend_by_discord_id(db, caller)
        .await?
        .ok_or(Error::NoAuthorization)?;

    let receipt =
        record_payment(db, locks, friend.id, amount, PaymentDetails::via_discord()).await?;

    notify_best_effort(
        notifier,
        &format!(
            "💸 {} paid you {} via Discord. Remaining: {}",
            receipt.friend.name, amount, receipt.ledger.total_remaining
        ),
    )
    .await;

    Ok(format!(
        "✅ Recorded your payment of {amount}.\n\n{}",
        format_ledger(&receipt.ledger)?
    ))
}

async fn owe<N>(
    db: &DatabaseConnection,
    locks: &FriendLocks,
    notifier: &N,
    caller: &str,
    amount: f64,
) -> Result<String>
where
    N: AdminNotifier,
{
    let amount = parse_amount(amount)?;
    let friend = get_friend_by_discord_id(db, caller)
        .await?
        .ok_or(Error::NoAuthorization)?;

    match record_admin_owes(db, locks, friend.id, amount).await? {
        OweOutcome::NoDebt { friend, owed } => {
            notify_best_effort(
                notifier,
                &format!("🔁 You owe {} {owed}. They have no outstanding debt.", friend.name),
            )
            .await;
            Ok(format!(
                "📝 Noted: the admin owes you {owed}. You had no outstanding debt, so the admin has been notified."
            ))
        }
        OweOutcome::Settled {
            friend,
            payment,
            excess,
        } => {
            let offset = Money::from_cents(payment.amount_cents);
            let mut reply = format!("✅ Offset {offset} against your balance. You're all settled up!");
            if excess.is_positive() {
                notify_best_effort(
                    notifier,
                    &format!(
                        "🔁 You owe {} {excess} beyond their settled balance of {offset}.",
                        friend.name
                    ),
                )
                .await;
                write!(reply, "\nThe remaining {excess} has been passed on to the admin.")?;
            }
            Ok(reply)
        }
        OweOutcome::Partial {
            payment, ledger, ..
        } => Ok(format!(
            "✅ Offset {} against your balance.\n\n{}",
            Money::from_cents(payment.amount_cents),
            format_ledger(&ledger)?
        )),
    }
}
