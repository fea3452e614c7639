//! Bot layer - Discord-specific interface and command handlers
//!
//! This module provides the Discord interface for the SettleBuddy application,
//! including all slash commands, autocomplete handlers, the admin notifier and bot
//! context management.

/// Discord command implementations (ledger, friend, purchase, payment, group, general)
pub mod commands;
/// Discord interaction handlers (autocomplete, etc.)
pub mod handlers;
/// Admin notifications over Discord DMs
pub mod notifier;

use crate::{
    core::{command::rejection_message, settlement::FriendLocks, split::SplitPolicy},
    entities::friend,
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use tracing::{error, info, instrument};

pub use notifier::DiscordNotifier;

/// Discord rejects messages longer than this.
const MAX_MESSAGE_LEN: usize = 2000;

/// Shared data available to all bot commands.
/// This structure holds the database connection and the other global state
/// that commands need to access.
pub struct BotData {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Per-friend locks serializing balance changes
    pub locks: FriendLocks,
    /// The single admin allowed to run management commands
    pub admin_id: serenity::UserId,
    /// Split policy for this deployment
    pub split_policy: SplitPolicy,
    /// Delivers out-of-band messages to the admin
    pub notifier: DiscordNotifier,
}

impl BotData {
    /// Creates a new `BotData` instance.
    /// This is called during bot setup, once the HTTP client for notifications exists.
    #[must_use]
    pub fn new(
        database: DatabaseConnection,
        admin_id: serenity::UserId,
        split_policy: SplitPolicy,
        notifier: DiscordNotifier,
    ) -> Self {
        Self {
            database,
            locks: FriendLocks::new(),
            admin_id,
            split_policy,
            notifier,
        }
    }
}

/// Command check that only lets the configured admin through.
pub async fn is_admin(ctx: poise::Context<'_, BotData, Error>) -> Result<bool> {
    Ok(ctx.author().id == ctx.data().admin_id)
}

/// Truncates a reply to Discord's message limit on a character boundary.
#[must_use]
pub fn fit_message(mut text: String) -> String {
    if text.len() <= MAX_MESSAGE_LEN {
        return text;
    }
    let suffix = "\n…";
    let mut cut = MAX_MESSAGE_LEN - suffix.len();
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push_str(suffix);
    text
}

/// Sends the outcome of an admin operation.
///
/// Business-rule errors are shown to the admin; anything else goes to the
/// framework error handler.
pub async fn reply_outcome(
    ctx: poise::Context<'_, BotData, Error>,
    outcome: Result<String>,
) -> Result<()> {
    let text = match outcome {
        Ok(text) => text,
        Err(e) => match rejection_message(&e) {
            Some(text) => text,
            None => return Err(e),
        },
    };
    ctx.say(fit_message(text)).await?;
    Ok(())
}

/// Resolves a friend by exact name for admin commands.
pub async fn lookup_friend(db: &DatabaseConnection, name: &str) -> Result<friend::Model> {
    crate::core::friend::get_friend_by_name(db, name)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "Friend",
            key: name.trim().to_string(),
        })
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {error}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {error}", ctx.command().qualified_name);
            let reply = poise::CreateReply::default()
                .content("❌ An error occurred. Please try again later.")
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!("Failed to send error message: {e}");
            }
        }
        poise::FrameworkError::CommandCheckFailed { ctx, .. } => {
            info!(user = %ctx.author().id, command = %ctx.command().qualified_name, "Rejected non-admin");
            let reply = poise::CreateReply::default()
                .content("❌ This command is for the admin only.")
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {e}");
            }
        }
    }
}

/// Builds the framework and runs the Discord client until it stops.
#[instrument(skip(token, database))]
pub async fn run_bot(
    token: String,
    database: DatabaseConnection,
    admin_id: u64,
    split_policy: SplitPolicy,
    dev_guild_id: Option<u64>,
) -> Result<()> {
    let admin_id = serenity::UserId::new(admin_id);

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                if let Some(guild_id) = dev_guild_id {
                    let guild_id = serenity::GuildId::new(guild_id);
                    poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id)
                        .await?;
                    info!("Registered commands in guild {guild_id}");
                } else {
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                    info!("Registered commands globally");
                }
                let notifier = DiscordNotifier::new(std::sync::Arc::clone(&ctx.http), admin_id);
                Ok(BotData::new(database, admin_id, split_policy, notifier))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(&token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| error!("Error creating client: {e}"))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_message_leaves_short_text() {
        assert_eq!(fit_message("hello".to_string()), "hello");
    }

    #[test]
    fn test_fit_message_truncates_on_char_boundary() {
        let long = "é".repeat(1500);
        let fitted = fit_message(long);
        assert!(fitted.len() <= MAX_MESSAGE_LEN);
        assert!(fitted.ends_with('…'));
    }
}
