//! Integration-account repository.

use crate::db::models::IntegrationAccount;
use crate::db::{now_rfc3339, DatabasePool};

pub struct IntegrationAccountRepository;

impl IntegrationAccountRepository {
    pub async fn create(
        pool: &DatabasePool,
        user_id: &str,
        toolkit: &str,
        connected_account_id: &str,
    ) -> Result<IntegrationAccount, sqlx::Error> {
        let now = now_rfc3339();
        sqlx::query_as::<_, IntegrationAccount>(
            "INSERT INTO integration_accounts
                (user_id, toolkit, connected_account_id, status, created_at, updated_at)
             VALUES (?, ?, ?, 'active', ?, ?)
             RETURNING *",
        )
        .bind(user_id)
        .bind(toolkit)
        .bind(connected_account_id)
        .bind(&now)
        .bind(&now)
        .fetch_one(pool)
        .await
    }

    /// Most recent active connected account for a `(user, toolkit)`.
    pub async fn latest_active(
        pool: &DatabasePool,
        user_id: &str,
        toolkit: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query_as::<_, IntegrationAccount>(
            "SELECT * FROM integration_accounts
             WHERE user_id = ? AND toolkit = ? AND status = 'active'
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(user_id)
        .bind(toolkit)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|r| r.connected_account_id))
    }

    pub async fn list_for_user(
        pool: &DatabasePool,
        user_id: &str,
        toolkit: Option<&str>,
    ) -> Result<Vec<IntegrationAccount>, sqlx::Error> {
        sqlx::query_as::<_, IntegrationAccount>(
            "SELECT * FROM integration_accounts
             WHERE user_id = ? AND (? IS NULL OR toolkit = ?)
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .bind(toolkit)
        .bind(toolkit)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn latest_active_picks_newest() {
        let db = Database::test_in_memory().await.unwrap();
        IntegrationAccountRepository::create(db.pool(), "alice", "GMAIL", "acct-old")
            .await
            .unwrap();
        IntegrationAccountRepository::create(db.pool(), "alice", "GMAIL", "acct-new")
            .await
            .unwrap();
        IntegrationAccountRepository::create(db.pool(), "alice", "SLACK", "acct-slack")
            .await
            .unwrap();

        let latest = IntegrationAccountRepository::latest_active(db.pool(), "alice", "GMAIL")
            .await
            .unwrap();
        assert_eq!(latest.as_deref(), Some("acct-new"));

        let none = IntegrationAccountRepository::latest_active(db.pool(), "bob", "GMAIL")
            .await
            .unwrap();
        assert!(none.is_none());

        let filtered =
            IntegrationAccountRepository::list_for_user(db.pool(), "alice", Some("SLACK"))
                .await
                .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].connected_account_id, "acct-slack");
    }
}
