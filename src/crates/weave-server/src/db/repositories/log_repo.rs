//! Append-only log repository.
//!
//! Every append is its own statement on the pool, so a streaming
//! reader in another session observes entries as soon as the block
//! writes them.

use serde_json::Value;

use crate::db::models::LogEntry;
use crate::db::{now_rfc3339, DatabasePool};

pub struct LogRepository;

impl LogRepository {
    pub async fn append(
        pool: &DatabasePool,
        run_id: i64,
        user_id: Option<&str>,
        node_id: Option<&str>,
        level: &str,
        message: &str,
        data: Option<&Value>,
    ) -> Result<i64, sqlx::Error> {
        let data_text = data.map(|v| v.to_string());
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO logs (run_id, user_id, node_id, ts, level, message, data)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(run_id)
        .bind(user_id)
        .bind(node_id)
        .bind(now_rfc3339())
        .bind(level)
        .bind(message)
        .bind(data_text)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Entries for a run after the cursor, in id order.
    pub async fn list_after(
        pool: &DatabasePool,
        run_id: i64,
        after_id: i64,
    ) -> Result<Vec<LogEntry>, sqlx::Error> {
        sqlx::query_as::<_, LogEntry>(
            "SELECT * FROM logs WHERE run_id = ? AND id > ? ORDER BY id ASC",
        )
        .bind(run_id)
        .bind(after_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{RunRepository, WorkflowRepository};
    use crate::db::Database;
    use serde_json::json;

    #[tokio::test]
    async fn ids_are_monotonic_and_cursor_pages() {
        let db = Database::test_in_memory().await.unwrap();
        let wf = WorkflowRepository::create(
            db.pool(),
            None,
            "WF",
            None,
            None,
            r#"{"nodes":[],"edges":[]}"#,
        )
        .await
        .unwrap();
        let run = RunRepository::create(db.pool(), wf.id, None, "manual", "{}")
            .await
            .unwrap();

        let first = LogRepository::append(db.pool(), run.id, None, Some("n1"), "info", "one", None)
            .await
            .unwrap();
        let second = LogRepository::append(
            db.pool(),
            run.id,
            None,
            None,
            "error",
            "two",
            Some(&json!({"k": 1})),
        )
        .await
        .unwrap();
        assert!(second > first);

        let all = LogRepository::list_after(db.pool(), run.id, 0).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].message, "one");
        assert_eq!(all[1].data_value().unwrap()["k"], 1);

        let tail = LogRepository::list_after(db.pool(), run.id, first)
            .await
            .unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].message, "two");
    }
}
