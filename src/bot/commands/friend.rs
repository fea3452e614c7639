//! Friend management commands (admin only).
//!
//! Registers friends, links them to Discord accounts, shows statements and
//! deletes settled friends.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete, is_admin, lookup_friend, reply_outcome},
        core::{command::format_ledger, friend, money::Money},
        errors::{Error, Result},
    };
    use poise::serenity_prelude as serenity;
    use std::fmt::Write;

    /// Parent command for managing friends.
    #[poise::command(
        slash_command,
        check = "is_admin",
        subcommands(
            "friend_add",
            "friend_list",
            "friend_info",
            "friend_link",
            "friend_unlink",
            "friend_delete"
        )
    )]
    pub async fn friend(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Friend management command. Available subcommands:\n\
            `/friend add` - Register a friend\n\
            `/friend list` - List all friends\n\
            `/friend info` - Show a friend's statement\n\
            `/friend link` - Link a friend to a Discord user\n\
            `/friend unlink` - Remove a friend's Discord link\n\
            `/friend delete` - Delete a settled friend";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Registers a new friend, optionally linked to their Discord account.
    #[poise::command(slash_command, rename = "add", check = "is_admin")]
    pub async fn friend_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Unique display name"] name: String,
        #[description = "Their Discord account"] user: Option<serenity::User>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let outcome = friend::create_friend(db, &name, user.map(|u| u.id.to_string()))
            .await
            .map(|f| match f.discord_id {
                Some(id) => format!("✅ Added **{}**, linked to <@{id}>.", f.name),
                None => format!("✅ Added **{}** (not linked to Discord yet).", f.name),
            });
        reply_outcome(ctx, outcome).await
    }

    /// Lists all friends.
    #[poise::command(slash_command, rename = "list", check = "is_admin")]
    pub async fn friend_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let friends = friend::list_friends(&ctx.data().database).await?;
        if friends.is_empty() {
            ctx.say("👥 No friends yet. Add one with `/friend add`.").await?;
            return Ok(());
        }

        let mut out = String::from("**Friends:**\n");
        for f in &friends {
            match &f.discord_id {
                Some(id) => writeln!(out, "• {} (<@{id}>)", f.name)?,
                None => writeln!(out, "• {} (unlinked)", f.name)?,
            }
        }
        reply_outcome(ctx, Ok(out)).await
    }

    /// Shows a friend's full history and current balance.
    #[poise::command(slash_command, rename = "info", check = "is_admin")]
    pub async fn friend_info(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Friend"]
        #[autocomplete = "autocomplete::autocomplete_friend_name"]
        name: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let outcome = async {
            let found = lookup_friend(db, &name).await?;
            let statement = friend::friend_statement(db, found.id).await?;

            let mut out = format!("**{}**\n", statement.friend.name);
            if let Some(settled_at) = statement.friend.settled_at {
                writeln!(out, "Last settled: {}", settled_at.format("%Y-%m-%d %H:%M UTC"))?;
            }
            writeln!(
                out,
                "Lifetime owed: {} · Lifetime paid: {}\n",
                statement.lifetime_debt, statement.lifetime_paid
            )?;
            writeln!(out, "{}\n", format_ledger(&statement.ledger)?)?;

            writeln!(out, "**Debts:**")?;
            for (debt, purchase) in &statement.debts {
                let amount = Money::from_cents(debt.amount_cents);
                match purchase {
                    Some(p) => writeln!(out, "• {} {} (#{}): {amount}", p.date, p.title, p.id)?,
                    None => writeln!(out, "• purchase #{}: {amount}", debt.purchase_id)?,
                }
            }
            writeln!(out, "**Payments:**")?;
            for payment in &statement.payments {
                write!(
                    out,
                    "• #{} {} {} ({})",
                    payment.id,
                    payment.paid_at,
                    Money::from_cents(payment.amount_cents),
                    payment.kind
                )?;
                if let Some(note) = &payment.note {
                    write!(out, " - {note}")?;
                }
                out.push('\n');
            }
            Ok::<_, Error>(out)
        }
        .await;
        reply_outcome(ctx, outcome).await
    }

    /// Links a friend to a Discord account so they can use the ledger commands.
    #[poise::command(slash_command, rename = "link", check = "is_admin")]
    pub async fn friend_link(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Friend"]
        #[autocomplete = "autocomplete::autocomplete_friend_name"]
        name: String,
        #[description = "Their Discord account"] user: serenity::User,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let outcome = async {
            let found = lookup_friend(db, &name).await?;
            let updated = friend::set_discord_id(db, found.id, Some(user.id.to_string())).await?;
            Ok::<_, Error>(format!("🔗 Linked **{}** to <@{}>.", updated.name, user.id))
        }
        .await;
        reply_outcome(ctx, outcome).await
    }

    /// Removes a friend's Discord link.
    #[poise::command(slash_command, rename = "unlink", check = "is_admin")]
    pub async fn friend_unlink(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Friend"]
        #[autocomplete = "autocomplete::autocomplete_friend_name"]
        name: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let outcome = async {
            let found = lookup_friend(db, &name).await?;
            let updated = friend::set_discord_id(db, found.id, None).await?;
            Ok::<_, Error>(format!("✂️ **{}** is no longer linked to Discord.", updated.name))
        }
        .await;
        reply_outcome(ctx, outcome).await
    }

    /// Deletes a friend who owes nothing. Their debts stay on past purchases.
    #[poise::command(slash_command, rename = "delete", check = "is_admin")]
    pub async fn friend_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Friend"]
        #[autocomplete = "autocomplete::autocomplete_friend_name"]
        name: String,
    ) -> Result<()> {
        let data = ctx.data();
        let outcome = async {
            let found = lookup_friend(&data.database, &name).await?;
            friend::delete_friend(&data.database, &data.locks, found.id).await?;
            Ok::<_, Error>(format!("🗑️ Deleted **{}**.", found.name))
        }
        .await;
        reply_outcome(ctx, outcome).await
    }
}

pub use inner::*;
