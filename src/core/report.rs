//! Dashboard reporting.
//!
//! This module builds the admin's overview of who owes what. Like the rest of
//! `core`, it returns structured data and leaves formatting to the bot layer.

use crate::{
    core::{money::Money, reconcile::reconcile_friend},
    entities::{Friend, friend},
    errors::Result,
};
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};

/// One row of the dashboard.
#[derive(Debug, Clone)]
pub struct FriendBalance {
    /// The friend
    pub friend: friend::Model,
    /// Outstanding balance in the active window
    pub remaining: Money,
    /// Number of debts not yet fully covered
    pub open_items: usize,
}

/// Outstanding balances across all friends.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    /// Every friend, largest balance first, then by name
    pub balances: Vec<FriendBalance>,
    /// Sum of all balances
    pub total_outstanding: Money,
}

impl Dashboard {
    /// Friends that currently owe something.
    pub fn owing(&self) -> impl Iterator<Item = &FriendBalance> {
        self.balances.iter().filter(|b| b.remaining.is_positive())
    }
}

/// Reconciles every friend and collects the results.
pub async fn generate_dashboard(db: &DatabaseConnection) -> Result<Dashboard> {
    let friends = Friend::find()
        .order_by_asc(friend::Column::Name)
        .all(db)
        .await?;

    let mut balances = Vec::with_capacity(friends.len());
    for friend in friends {
        let ledger = reconcile_friend(db, &friend).await?;
        balances.push(FriendBalance {
            friend,
            remaining: ledger.total_remaining,
            open_items: ledger.items.len(),
        });
    }

    // stable sort keeps name order among equal balances
    balances.sort_by(|a, b| b.remaining.cmp(&a.remaining));
    let total_outstanding = balances.iter().map(|b| b.remaining).sum();

    Ok(Dashboard {
        balances,
        total_outstanding,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_empty_dashboard() -> Result<()> {
        let db = setup_test_db().await?;
        let dashboard = generate_dashboard(&db).await?;
        assert!(dashboard.balances.is_empty());
        assert_eq!(dashboard.total_outstanding, Money::ZERO);
        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard_sorted_by_balance() -> Result<()> {
        let db = setup_test_db().await?;
        let amy = create_test_friend(&db, "Amy").await?;
        let bob = create_test_friend(&db, "Bob").await?;
        create_test_friend(&db, "Cat").await?;

        create_test_purchase(&db, "Lunch", 1000, &[amy.id]).await?;
        create_test_purchase(&db, "Concert", 9000, &[bob.id]).await?;
        insert_raw_payment(&db, bob.id, 1000).await?;

        let dashboard = generate_dashboard(&db).await?;

        let names: Vec<&str> = dashboard
            .balances
            .iter()
            .map(|b| b.friend.name.as_str())
            .collect();
        assert_eq!(names, vec!["Bob", "Amy", "Cat"]);
        assert_eq!(dashboard.balances[0].remaining, Money::from_cents(3500));
        assert_eq!(dashboard.balances[1].remaining, Money::from_cents(500));
        assert_eq!(dashboard.total_outstanding, Money::from_cents(4000));
        assert_eq!(dashboard.owing().count(), 2);
        Ok(())
    }
}
