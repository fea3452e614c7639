//! Autocomplete handlers for Discord slash command parameters.
//!
//! This module suggests friend and group names as the admin types, including
//! inside comma-separated friend lists.

use crate::{
    bot::BotData,
    core::{friend, group},
    errors::Error,
};

/// Discord shows at most this many suggestions.
const MAX_SUGGESTIONS: usize = 25;

fn matching(names: impl Iterator<Item = String>, partial: &str) -> Vec<String> {
    let partial_lower = partial.trim().to_lowercase();
    let mut matches: Vec<String> = names
        .filter(|name| name.to_lowercase().contains(&partial_lower))
        .take(MAX_SUGGESTIONS)
        .collect();
    matches.sort();
    matches
}

/// Suggests friend names matching the partial input.
pub async fn autocomplete_friend_name(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(friends) = friend::list_friends(&ctx.data().database).await else {
        return Vec::new();
    };
    matching(friends.into_iter().map(|f| f.name), partial)
}

/// Completes the last entry of a comma-separated friend list, keeping the
/// entries already typed.
pub async fn autocomplete_friend_list(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(friends) = friend::list_friends(&ctx.data().database).await else {
        return Vec::new();
    };
    complete_list(friends.into_iter().map(|f| f.name), partial)
}

/// Suggests group names matching the partial input.
pub async fn autocomplete_group_name(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(groups) = group::list_groups(&ctx.data().database).await else {
        return Vec::new();
    };
    matching(groups.into_iter().map(|g| g.group.name), partial)
}

fn complete_list(names: impl Iterator<Item = String>, partial: &str) -> Vec<String> {
    let (done, last) = partial.rsplit_once(',').unwrap_or(("", partial));
    let already: Vec<&str> = done.split(',').map(str::trim).collect();

    let candidates = names.filter(|name| !already.contains(&name.as_str()));
    matching(candidates, last)
        .into_iter()
        .map(|name| {
            if done.trim().is_empty() {
                name
            } else {
                format!("{}, {name}", done.trim())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> impl Iterator<Item = String> {
        ["Alice", "Bob", "Alfred"].into_iter().map(str::to_string)
    }

    #[test]
    fn test_matching_is_case_insensitive_and_sorted() {
        assert_eq!(matching(names(), "al"), vec!["Alfred", "Alice"]);
        assert_eq!(matching(names(), ""), vec!["Alfred", "Alice", "Bob"]);
    }

    #[test]
    fn test_complete_list_keeps_prefix_and_skips_chosen() {
        assert_eq!(complete_list(names(), "Bob, al"), vec!["Bob, Alfred", "Bob, Alice"]);
        assert_eq!(complete_list(names(), "Alice, "), vec!["Alice, Alfred", "Alice, Bob"]);
        assert_eq!(complete_list(names(), "b"), vec!["Bob"]);
    }
}
