//! Friend ledger commands - ask, pay and owe.
//!
//! Any registered friend can run these; the caller is identified by their
//! Discord ID. Replies are ephemeral so balances stay private.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, fit_message},
        core::command::{Command, execute},
        errors::{Error, Result},
    };

    async fn run(ctx: poise::Context<'_, BotData, Error>, command: Command) -> Result<()> {
        let data = ctx.data();
        let caller = ctx.author().id.to_string();
        let reply = execute(&data.database, &data.locks, &data.notifier, &caller, command).await?;

        ctx.send(
            poise::CreateReply::default()
                .content(fit_message(reply))
                .ephemeral(true),
        )
        .await?;
        Ok(())
    }

    /// Shows what you currently owe, oldest purchase first.
    #[poise::command(slash_command)]
    pub async fn ask(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        run(ctx, Command::Ask).await
    }

    /// Tells the bot you paid the admin.
    #[poise::command(slash_command)]
    pub async fn pay(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount you paid (e.g., 12.50)"] amount: f64,
    ) -> Result<()> {
        run(ctx, Command::Pay(amount)).await
    }

    /// Tells the bot the admin owes you money; it is offset against your balance.
    #[poise::command(slash_command)]
    pub async fn owe(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Amount the admin owes you (e.g., 8.00)"] amount: f64,
    ) -> Result<()> {
        run(ctx, Command::Owe(amount)).await
    }
}

pub use inner::*;
