//! Node-run repository.

use crate::db::models::NodeRun;
use crate::db::{now_rfc3339, DatabasePool};

pub struct NodeRunRepository;

impl NodeRunRepository {
    /// Insert the row in `running` state as the node starts; committed
    /// before the block is awaited so observers can identify the
    /// current node.
    pub async fn insert_running(
        pool: &DatabasePool,
        run_id: i64,
        node_id: &str,
        node_type: &str,
    ) -> Result<NodeRun, sqlx::Error> {
        sqlx::query_as::<_, NodeRun>(
            "INSERT INTO node_runs (run_id, node_id, node_type, status, started_at)
             VALUES (?, ?, ?, 'running', ?)
             RETURNING *",
        )
        .bind(run_id)
        .bind(node_id)
        .bind(node_type)
        .bind(now_rfc3339())
        .fetch_one(pool)
        .await
    }

    pub async fn mark_succeeded(
        pool: &DatabasePool,
        run_id: i64,
        node_id: &str,
        input: &str,
        output: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE node_runs
             SET status = 'succeeded', finished_at = ?, input = ?, output = ?
             WHERE run_id = ? AND node_id = ?",
        )
        .bind(now_rfc3339())
        .bind(input)
        .bind(output)
        .bind(run_id)
        .bind(node_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(
        pool: &DatabasePool,
        run_id: i64,
        node_id: &str,
        input: &str,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE node_runs
             SET status = 'failed', finished_at = ?, input = ?, error = ?
             WHERE run_id = ? AND node_id = ?",
        )
        .bind(now_rfc3339())
        .bind(input)
        .bind(error)
        .bind(run_id)
        .bind(node_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list_for_run(
        pool: &DatabasePool,
        run_id: i64,
    ) -> Result<Vec<NodeRun>, sqlx::Error> {
        sqlx::query_as::<_, NodeRun>(
            "SELECT * FROM node_runs WHERE run_id = ? ORDER BY id ASC",
        )
        .bind(run_id)
        .fetch_all(pool)
        .await
    }

    /// The currently executing node: a `running` row if any, else the
    /// most recently started row that hasn't finished.
    pub async fn current_node_id(
        pool: &DatabasePool,
        run_id: i64,
    ) -> Result<Option<String>, sqlx::Error> {
        let running = sqlx::query_as::<_, NodeRun>(
            "SELECT * FROM node_runs
             WHERE run_id = ? AND status = 'running'
             ORDER BY started_at DESC LIMIT 1",
        )
        .bind(run_id)
        .fetch_optional(pool)
        .await?;
        if let Some(row) = running {
            return Ok(Some(row.node_id));
        }

        let latest = sqlx::query_as::<_, NodeRun>(
            "SELECT * FROM node_runs WHERE run_id = ? ORDER BY started_at DESC LIMIT 1",
        )
        .bind(run_id)
        .fetch_optional(pool)
        .await?;
        Ok(latest.filter(|row| row.finished_at.is_none()).map(|row| row.node_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{RunRepository, WorkflowRepository};
    use crate::db::Database;

    async fn run_id(db: &Database) -> i64 {
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
        RunRepository::create(db.pool(), wf.id, None, "manual", "{}")
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn node_lifecycle_and_current_detection() {
        let db = Database::test_in_memory().await.unwrap();
        let run = run_id(&db).await;

        NodeRunRepository::insert_running(db.pool(), run, "a", "start")
            .await
            .unwrap();
        assert_eq!(
            NodeRunRepository::current_node_id(db.pool(), run)
                .await
                .unwrap()
                .as_deref(),
            Some("a")
        );

        NodeRunRepository::mark_succeeded(db.pool(), run, "a", "{}", r#"{"x":1}"#)
            .await
            .unwrap();
        assert_eq!(
            NodeRunRepository::current_node_id(db.pool(), run)
                .await
                .unwrap(),
            None
        );

        NodeRunRepository::insert_running(db.pool(), run, "b", "show")
            .await
            .unwrap();
        NodeRunRepository::mark_failed(db.pool(), run, "b", "{}", r#"{"message":"boom"}"#)
            .await
            .unwrap();

        let rows = NodeRunRepository::list_for_run(db.pool(), run).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, "succeeded");
        assert_eq!(rows[0].output_value().unwrap()["x"], 1);
        assert_eq!(rows[1].status, "failed");
        assert_eq!(rows[1].error_value().unwrap()["message"], "boom");
    }
}
