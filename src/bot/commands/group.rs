//! Group management commands (admin only).
//!
//! Groups are shortcuts for picking purchase participants and never affect
//! balances.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete, is_admin, lookup_friend, reply_outcome},
        core::group,
        errors::{Error, Result},
    };
    use sea_orm::DatabaseConnection;
    use std::fmt::Write;

    async fn friend_ids(db: &DatabaseConnection, names: &str) -> Result<Vec<i64>> {
        let mut ids = Vec::new();
        for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            ids.push(lookup_friend(db, name).await?.id);
        }
        Ok(ids)
    }

    async fn lookup_group(db: &DatabaseConnection, name: &str) -> Result<i64> {
        group::get_group_by_name(db, name)
            .await?
            .map(|g| g.id)
            .ok_or_else(|| Error::NotFound {
                entity: "Group",
                key: name.trim().to_string(),
            })
    }

    /// Parent command for managing friend groups.
    #[poise::command(
        slash_command,
        rename = "group",
        check = "is_admin",
        subcommands("group_create", "group_update", "group_delete", "group_list")
    )]
    pub async fn group_manage(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Group management command. Available subcommands:\n\
            `/group create` - Create a group\n\
            `/group update` - Rename a group or replace its members\n\
            `/group delete` - Delete a group\n\
            `/group list` - List groups and members";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Creates a group of friends.
    #[poise::command(slash_command, rename = "create", check = "is_admin")]
    pub async fn group_create(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Unique group name"] name: String,
        #[description = "Members, comma-separated"]
        #[autocomplete = "autocomplete::autocomplete_friend_list"]
        friends: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let outcome = async {
            let ids = friend_ids(db, &friends).await?;
            let created = group::create_group(db, &name, &ids).await?;
            Ok::<_, Error>(format!(
                "👥 Created group **{}** with {} member(s).",
                created.name,
                ids.len()
            ))
        }
        .await;
        reply_outcome(ctx, outcome).await
    }

    /// Renames a group and/or replaces its members.
    #[poise::command(slash_command, rename = "update", check = "is_admin")]
    pub async fn group_update(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Group"]
        #[autocomplete = "autocomplete::autocomplete_group_name"]
        name: String,
        #[description = "New name"] new_name: Option<String>,
        #[description = "New members, comma-separated"]
        #[autocomplete = "autocomplete::autocomplete_friend_list"]
        friends: Option<String>,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let outcome = async {
            let group_id = lookup_group(db, &name).await?;
            let ids = match friends.as_deref() {
                Some(names) => Some(friend_ids(db, names).await?),
                None => None,
            };
            let updated =
                group::update_group(db, group_id, new_name.as_deref(), ids.as_deref()).await?;
            Ok::<_, Error>(format!("👥 Updated group **{}**.", updated.name))
        }
        .await;
        reply_outcome(ctx, outcome).await
    }

    /// Deletes a group. Its members are not affected.
    #[poise::command(slash_command, rename = "delete", check = "is_admin")]
    pub async fn group_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Group"]
        #[autocomplete = "autocomplete::autocomplete_group_name"]
        name: String,
    ) -> Result<()> {
        let db = &ctx.data().database;
        let outcome = async {
            let group_id = lookup_group(db, &name).await?;
            group::delete_group(db, group_id).await?;
            Ok::<_, Error>(format!("🗑️ Deleted group **{}**.", name.trim()))
        }
        .await;
        reply_outcome(ctx, outcome).await
    }

    /// Lists groups and their members.
    #[poise::command(slash_command, rename = "list", check = "is_admin")]
    pub async fn group_list(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let groups = group::list_groups(&ctx.data().database).await?;
        if groups.is_empty() {
            ctx.say("👥 No groups yet. Create one with `/group create`.")
                .await?;
            return Ok(());
        }

        let mut out = String::from("**Groups:**\n");
        for g in &groups {
            let members: Vec<&str> = g.members.iter().map(|m| m.name.as_str()).collect();
            writeln!(out, "• **{}**: {}", g.group.name, members.join(", "))?;
        }
        reply_outcome(ctx, Ok(out)).await
    }
}

pub use inner::*;
