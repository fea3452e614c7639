//! Admin notifications delivered as Discord direct messages.

use crate::{
    core::notify::AdminNotifier,
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use std::future::Future;
use std::sync::Arc;

/// Sends notifications to the admin's DMs.
#[derive(Clone)]
pub struct DiscordNotifier {
    http: Arc<serenity::Http>,
    admin_id: serenity::UserId,
}

impl DiscordNotifier {
    /// Creates a notifier that messages `admin_id` through `http`.
    #[must_use]
    pub const fn new(http: Arc<serenity::Http>, admin_id: serenity::UserId) -> Self {
        Self { http, admin_id }
    }
}

impl AdminNotifier for DiscordNotifier {
    fn notify_admin(&self, message: &str) -> impl Future<Output = Result<()>> + Send {
        let builder = serenity::CreateMessage::new().content(message);
        async move {
            self.admin_id
                .direct_message(self.http.as_ref(), builder)
                .await
                .map(|_| ())
                .map_err(|e| Error::NotificationFailure {
                    message: e.to_string(),
                })
        }
    }
}
