//! Payment management commands (admin only).

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete, is_admin, lookup_friend, reply_outcome},
        core::{command::format_ledger, money::Money, payment},
        errors::{AmountBound, Error, Result},
    };
    use chrono::NaiveDate;
    use std::fmt::Write;

    /// Parent command for managing payments.
    #[poise::command(
        slash_command,
        check = "is_admin",
        subcommands("payment_record", "payment_delete", "payment_list")
    )]
    pub async fn payment(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Payment management command. Available subcommands:\n\
            `/payment record` - Record a payment you received\n\
            `/payment delete` - Delete a payment\n\
            `/payment list` - List a friend's payments";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Records a payment a friend made to you outside Discord.
    #[poise::command(slash_command, rename = "record", check = "is_admin")]
    pub async fn payment_record(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Friend who paid"]
        #[autocomplete = "autocomplete::autocomplete_friend_name"]
        friend: String,
        #[description = "Amount paid (e.g., 20.00)"] amount: f64,
        #[description = "Optional note (e.g., 'cash')"] note: Option<String>,
        #[description = "Date paid, YYYY-MM-DD (defaults to today)"] date: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let outcome = async {
            let amount = Money::from_major(amount).ok_or(Error::InvalidAmount {
                amount: Money::ZERO,
                bound: AmountBound::Positive,
            })?;
            let paid_at = date
                .as_deref()
                .map(|raw| {
                    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                        Error::Validation {
                            message: format!("Date '{raw}' must look like 2026-01-31"),
                        }
                    })
                })
                .transpose()?;
            let found = lookup_friend(&data.database, &friend).await?;

            let receipt = payment::record_admin_payment(
                &data.database,
                &data.locks,
                found.id,
                amount,
                note,
                paid_at,
            )
            .await?;
            Ok::<_, Error>(format!(
                "💵 Recorded payment #{} of {amount} from **{}**.\n\n{}",
                receipt.payment.id,
                receipt.friend.name,
                format_ledger(&receipt.ledger)?
            ))
        }
        .await;
        reply_outcome(ctx, outcome).await
    }

    /// Deletes a payment by number.
    #[poise::command(slash_command, rename = "delete", check = "is_admin")]
    pub async fn payment_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Payment number"] id: i64,
    ) -> Result<()> {
        let data = ctx.data();
        let outcome = payment::delete_payment(&data.database, &data.locks, id)
            .await
            .map(|deleted| {
                format!(
                    "🗑️ Deleted payment #{} of {}.",
                    deleted.id,
                    Money::from_cents(deleted.amount_cents)
                )
            });
        reply_outcome(ctx, outcome).await
    }

    /// Lists a friend's payments, newest first.
    #[poise::command(slash_command, rename = "list", check = "is_admin")]
    pub async fn payment_list(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Friend"]
        #[autocomplete = "autocomplete::autocomplete_friend_name"]
        friend: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let outcome = async {
            let found = lookup_friend(db, &friend).await?;
            let payments = payment::list_payments_for_friend(db, found.id).await?;
            if payments.is_empty() {
                return Ok(format!("💵 No payments from **{}**.", found.name));
            }

            let mut out = format!("**Payments from {}:**\n", found.name);
            for p in &payments {
                write!(
                    out,
                    "• #{} {} {} ({})",
                    p.id,
                    p.paid_at,
                    Money::from_cents(p.amount_cents),
                    p.kind
                )?;
                if let Some(note) = &p.note {
                    write!(out, " - {note}")?;
                }
                out.push('\n');
            }
            Ok::<_, Error>(out)
        }
        .await;
        reply_outcome(ctx, outcome).await
    }
}

pub use inner::*;
