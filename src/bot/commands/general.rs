//! General Discord commands - ping, help and the admin dashboard.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, is_admin, reply_outcome},
        core::report,
        errors::{Error, Result},
    };
    use std::fmt::Write;

    /// Responds with "Pong!" to test bot connectivity.
    ///
    /// This is a simple health check command that doesn't require any database operations.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**SettleBuddy Help**\n\
        Here is a summary of all available commands for SettleBuddy.\n\n\
        **Your Balance**\n\
        • `/ask` - Shows what you owe, oldest purchase first.\n\
        • `/pay <amount>` - Tells the bot you paid the admin.\n\
        • `/owe <amount>` - Tells the bot the admin owes you; it is offset against your balance.\n\n\
        **Admin Commands**\n\
        • `/dashboard` - Everyone's outstanding balance.\n\
        • `/friend <subcommand>` - Manage friends (add, list, info, link, unlink, delete).\n\
        • `/purchase <subcommand>` - Manage purchases (add, edit, delete, list, info).\n\
        • `/payment <subcommand>` - Manage payments (record, delete, list).\n\
        • `/group <subcommand>` - Manage friend groups (create, update, delete, list).\n\n\
        **Utility Commands**\n\
        • `/ping` - Checks if the bot is responsive.\n\
        • `/help` - Shows this help message.";

        ctx.send(
            poise::CreateReply::default()
                .content(help_text)
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }

    /// Shows every friend's outstanding balance, largest first.
    #[poise::command(slash_command, check = "is_admin")]
    pub async fn dashboard(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let dashboard = report::generate_dashboard(&ctx.data().database).await?;

        if dashboard.balances.is_empty() {
            ctx.say("📊 No friends yet. Add one with `/friend add`.").await?;
            return Ok(());
        }

        let mut out = String::from("📊 **Outstanding balances**\n");
        let mut settled = Vec::new();
        for balance in &dashboard.balances {
            if balance.remaining.is_positive() {
                writeln!(
                    out,
                    "• **{}**: {} ({} open item(s))",
                    balance.friend.name, balance.remaining, balance.open_items
                )?;
            } else {
                settled.push(balance.friend.name.as_str());
            }
        }
        if !settled.is_empty() {
            writeln!(out, "✅ Settled: {}", settled.join(", "))?;
        }
        write!(out, "\nTotal outstanding: **{}**", dashboard.total_outstanding)?;

        reply_outcome(ctx, Ok(out)).await
    }
}

// Re-export all commands
pub use inner::*;
