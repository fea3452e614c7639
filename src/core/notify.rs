//! Out-of-band admin notifications.
//!
//! Delivery is best-effort: a failed or slow notification is logged and never
//! undoes the ledger change that triggered it.

use crate::errors::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on a single notification attempt.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Something that can deliver a free-text message to the admin.
pub trait AdminNotifier: Send + Sync {
    /// Delivers `message`; failures should be reported as
    /// [`Error::NotificationFailure`].
    fn notify_admin(&self, message: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Sends a notification, logging instead of failing. Returns whether it was delivered.
pub async fn notify_best_effort<N>(notifier: &N, message: &str) -> bool
where
    N: AdminNotifier,
{
    match tokio::time::timeout(NOTIFY_TIMEOUT, notifier.notify_admin(message)).await {
        Ok(Ok(())) => {
            debug!("Admin notified");
            true
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Admin notification failed");
            false
        }
        Err(_) => {
            let e = Error::NotificationFailure {
                message: format!("timed out after {}s", NOTIFY_TIMEOUT.as_secs()),
            };
            warn!(error = %e, "Admin notification failed");
            false
        }
    }
}
