//! Purchase management commands (admin only).
//!
//! Line items are typed as `2x Soda @ 5.00; Chips @ 3`. Participants are a
//! comma-separated list of friend names, a group, or both.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::{BotData, handlers::autocomplete, is_admin, lookup_friend, reply_outcome},
        core::{
            group,
            money::Money,
            purchase::{self, NewPurchase, parse_line_items},
        },
        errors::{Error, Result},
    };
    use chrono::NaiveDate;
    use sea_orm::DatabaseConnection;
    use std::collections::BTreeSet;
    use std::fmt::Write;

    const DEFAULT_LIST_LIMIT: u64 = 10;

    /// Text arguments shared by `add` and `edit`.
    struct PurchaseArgs {
        title: String,
        items: String,
        friends: Option<String>,
        group: Option<String>,
        date: Option<String>,
        note: Option<String>,
    }

    fn parse_date(date: Option<&str>) -> Result<NaiveDate> {
        match date.map(str::trim).filter(|d| !d.is_empty()) {
            None => Ok(chrono::Local::now().date_naive()),
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| Error::Validation {
                message: format!("Date '{raw}' must look like 2026-01-31"),
            }),
        }
    }

    async fn resolve_participants(
        db: &DatabaseConnection,
        friends: Option<&str>,
        group_name: Option<&str>,
    ) -> Result<Vec<i64>> {
        let mut ids = BTreeSet::new();

        for name in friends
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
        {
            ids.insert(lookup_friend(db, name).await?.id);
        }

        if let Some(group_name) = group_name.map(str::trim).filter(|g| !g.is_empty()) {
            let found = group::get_group_by_name(db, group_name)
                .await?
                .ok_or_else(|| Error::NotFound {
                    entity: "Group",
                    key: group_name.to_string(),
                })?;
            ids.extend(group::group_member_ids(db, found.id).await?);
        }

        Ok(ids.into_iter().collect())
    }

    async fn build_input(db: &DatabaseConnection, args: PurchaseArgs) -> Result<NewPurchase> {
        Ok(NewPurchase {
            line_items: parse_line_items(&args.items)?,
            friend_ids: resolve_participants(db, args.friends.as_deref(), args.group.as_deref())
                .await?,
            date: parse_date(args.date.as_deref())?,
            title: args.title,
            note: args.note,
        })
    }

    /// Parent command for managing purchases.
    #[poise::command(
        slash_command,
        check = "is_admin",
        subcommands(
            "purchase_add",
            "purchase_edit",
            "purchase_delete",
            "purchase_list",
            "purchase_info"
        )
    )]
    pub async fn purchase(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "Purchase management command. Available subcommands:\n\
            `/purchase add` - Record a shared purchase\n\
            `/purchase edit` - Replace a purchase's details\n\
            `/purchase delete` - Delete a purchase\n\
            `/purchase list` - Show recent purchases\n\
            `/purchase info` - Show a purchase's items and shares";

        ctx.say(help_text).await?;
        Ok(())
    }

    /// Records a purchase split between you and the chosen friends.
    #[poise::command(slash_command, rename = "add", check = "is_admin")]
    pub async fn purchase_add(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "What was bought (e.g., 'Friday pizza')"] title: String,
        #[description = "Items: '2x Soda @ 5.00; Chips @ 3'"] items: String,
        #[description = "Friends, comma-separated"]
        #[autocomplete = "autocomplete::autocomplete_friend_list"]
        friends: Option<String>,
        #[description = "A group whose members participate"]
        #[autocomplete = "autocomplete::autocomplete_group_name"]
        group: Option<String>,
        #[description = "Purchase date, YYYY-MM-DD (defaults to today)"] date: Option<String>,
        #[description = "Optional note"] note: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let args = PurchaseArgs {
            title,
            items,
            friends,
            group,
            date,
            note,
        };
        let outcome = async {
            let input = build_input(&data.database, args).await?;
            let count = input.friend_ids.len();
            let created =
                purchase::create_purchase(&data.database, &data.locks, data.split_policy, input)
                    .await?;
            let detail = purchase::get_purchase_detail(&data.database, created.id).await?;
            let share = detail
                .and_then(|d| d.debts.first().map(|(debt, _)| debt.amount_cents))
                .map_or(Money::ZERO, Money::from_cents);
            Ok::<_, Error>(format!(
                "🧾 Recorded purchase #{} **{}** for {}. {count} friend(s) owe {share} each.",
                created.id,
                created.title,
                Money::from_cents(created.total_cents)
            ))
        }
        .await;
        reply_outcome(ctx, outcome).await
    }

    /// Replaces a purchase's details, items and participants.
    #[poise::command(slash_command, rename = "edit", check = "is_admin")]
    pub async fn purchase_edit(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Purchase number"] id: i64,
        #[description = "What was bought"] title: String,
        #[description = "Items: '2x Soda @ 5.00; Chips @ 3'"] items: String,
        #[description = "Friends, comma-separated"]
        #[autocomplete = "autocomplete::autocomplete_friend_list"]
        friends: Option<String>,
        #[description = "A group whose members participate"]
        #[autocomplete = "autocomplete::autocomplete_group_name"]
        group: Option<String>,
        #[description = "Purchase date, YYYY-MM-DD (defaults to today)"] date: Option<String>,
        #[description = "Optional note"] note: Option<String>,
    ) -> Result<()> {
        let data = ctx.data();
        let args = PurchaseArgs {
            title,
            items,
            friends,
            group,
            date,
            note,
        };
        let outcome = async {
            let input = build_input(&data.database, args).await?;
            let updated = purchase::update_purchase(
                &data.database,
                &data.locks,
                data.split_policy,
                id,
                input,
            )
            .await?;
            Ok::<_, Error>(format!(
                "✏️ Updated purchase #{} **{}**, now {}. Shares were recomputed.",
                updated.id,
                updated.title,
                Money::from_cents(updated.total_cents)
            ))
        }
        .await;
        reply_outcome(ctx, outcome).await
    }

    /// Deletes a purchase and the debts it created.
    #[poise::command(slash_command, rename = "delete", check = "is_admin")]
    pub async fn purchase_delete(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Purchase number"] id: i64,
    ) -> Result<()> {
        let data = ctx.data();
        let outcome = purchase::delete_purchase(&data.database, &data.locks, id)
            .await
            .map(|()| format!("🗑️ Deleted purchase #{id}."));
        reply_outcome(ctx, outcome).await
    }

    /// Lists recent purchases.
    #[poise::command(slash_command, rename = "list", check = "is_admin")]
    pub async fn purchase_list(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "How many to show (default 10)"] limit: Option<u64>,
    ) -> Result<()> {
        let purchases = purchase::list_purchases(
            &ctx.data().database,
            limit.unwrap_or(DEFAULT_LIST_LIMIT),
        )
        .await?;
        if purchases.is_empty() {
            ctx.say("🧾 No purchases yet.").await?;
            return Ok(());
        }

        let mut out = String::from("**Recent purchases:**\n");
        for p in &purchases {
            writeln!(
                out,
                "• #{} {} **{}**: {}",
                p.id,
                p.date,
                p.title,
                Money::from_cents(p.total_cents)
            )?;
        }
        reply_outcome(ctx, Ok(out)).await
    }

    /// Shows a purchase's line items, participants and shares.
    #[poise::command(slash_command, rename = "info", check = "is_admin")]
    pub async fn purchase_info(
        ctx: poise::Context<'_, BotData, Error>,
        #[description = "Purchase number"] id: i64,
    ) -> Result<()> {
        let outcome = async {
            let detail = purchase::get_purchase_detail(&ctx.data().database, id)
                .await?
                .ok_or_else(|| Error::NotFound {
                    entity: "Purchase",
                    key: id.to_string(),
                })?;
            let p = &detail.purchase;

            let mut out = format!("🧾 **#{} {}** ({})\n", p.id, p.title, p.date);
            if let Some(note) = &p.note {
                writeln!(out, "_{note}_")?;
            }
            writeln!(out, "\n**Items:**")?;
            for item in &detail.line_items {
                writeln!(
                    out,
                    "• {}x {} @ {} = {}",
                    item.quantity,
                    item.name,
                    Money::from_cents(item.unit_price_cents),
                    Money::from_cents(item.subtotal_cents)
                )?;
            }
            writeln!(out, "Total: **{}**\n", Money::from_cents(p.total_cents))?;
            writeln!(out, "**Shares:**")?;
            for (debt, friend) in &detail.debts {
                let name = friend.as_ref().map_or("(deleted friend)", |f| f.name.as_str());
                writeln!(out, "• {name}: {}", Money::from_cents(debt.amount_cents))?;
            }
            Ok::<_, Error>(out)
        }
        .await;
        reply_outcome(ctx, outcome).await
    }
}

pub use inner::*;
