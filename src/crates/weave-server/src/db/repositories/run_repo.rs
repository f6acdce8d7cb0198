//! Run repository.

use crate::db::models::Run;
use crate::db::{now_rfc3339, DatabasePool};

pub struct RunRepository;

impl RunRepository {
    pub async fn create(
        pool: &DatabasePool,
        workflow_id: i64,
        user_id: Option<&str>,
        trigger_type: &str,
        trigger_payload: &str,
    ) -> Result<Run, sqlx::Error> {
        sqlx::query_as::<_, Run>(
            "INSERT INTO runs (workflow_id, user_id, status, trigger_type, trigger_payload)
             VALUES (?, ?, 'pending', ?, ?)
             RETURNING *",
        )
        .bind(workflow_id)
        .bind(user_id)
        .bind(trigger_type)
        .bind(trigger_payload)
        .fetch_one(pool)
        .await
    }

    pub async fn get_by_id(pool: &DatabasePool, id: i64) -> Result<Option<Run>, sqlx::Error> {
        sqlx::query_as::<_, Run>("SELECT * FROM runs WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_visible(
        pool: &DatabasePool,
        id: i64,
        user_id: Option<&str>,
    ) -> Result<Option<Run>, sqlx::Error> {
        sqlx::query_as::<_, Run>(
            "SELECT * FROM runs WHERE id = ? AND (user_id IS NULL OR user_id = ?)",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_visible(
        pool: &DatabasePool,
        user_id: Option<&str>,
        workflow_id: Option<i64>,
        status: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Run>, sqlx::Error> {
        sqlx::query_as::<_, Run>(
            "SELECT * FROM runs
             WHERE (user_id IS NULL OR user_id = ?)
               AND (? IS NULL OR workflow_id = ?)
               AND (? IS NULL OR status = ?)
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(user_id)
        .bind(workflow_id)
        .bind(workflow_id)
        .bind(status)
        .bind(status)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// pending → running, stamping `started_at`.
    pub async fn mark_running(pool: &DatabasePool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE runs SET status = 'running', started_at = ? WHERE id = ?")
            .bind(now_rfc3339())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Transition to a terminal status with the (possibly partial)
    /// outputs map.
    pub async fn mark_finished(
        pool: &DatabasePool,
        id: i64,
        status: &str,
        outputs: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE runs SET status = ?, finished_at = ?, outputs = ? WHERE id = ?")
            .bind(status)
            .bind(now_rfc3339())
            .bind(outputs)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::WorkflowRepository;
    use crate::db::Database;

    const GRAPH: &str = r#"{"nodes":[],"edges":[]}"#;

    async fn workflow_id(db: &Database) -> i64 {
        WorkflowRepository::create(db.pool(), None, "WF", None, None, GRAPH)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn lifecycle_pending_running_succeeded() {
        let db = Database::test_in_memory().await.unwrap();
        let wf = workflow_id(&db).await;

        let run = RunRepository::create(db.pool(), wf, None, "manual", "{}")
            .await
            .unwrap();
        assert_eq!(run.status, "pending");
        assert!(run.started_at.is_none());

        RunRepository::mark_running(db.pool(), run.id).await.unwrap();
        let run = RunRepository::get_by_id(db.pool(), run.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(run.status, "running");
        assert!(run.started_at.is_some());

        RunRepository::mark_finished(db.pool(), run.id, "succeeded", Some(r#"{"s":{}}"#))
            .await
            .unwrap();
        let run = RunRepository::get_by_id(db.pool(), run.id)
            .await
            .unwrap()
            .unwrap();
        assert!(run.is_terminal());
        assert!(run.outputs_value().is_some());
        assert!(run.finished_at.is_some());
    }

    #[tokio::test]
    async fn invalid_status_is_rejected_by_schema() {
        let db = Database::test_in_memory().await.unwrap();
        let wf = workflow_id(&db).await;
        let run = RunRepository::create(db.pool(), wf, None, "manual", "{}")
            .await
            .unwrap();
        let bad = RunRepository::mark_finished(db.pool(), run.id, "exploded", None).await;
        assert!(bad.is_err());
    }

    #[tokio::test]
    async fn list_filters_by_workflow_and_status() {
        let db = Database::test_in_memory().await.unwrap();
        let wf_a = workflow_id(&db).await;
        let wf_b = workflow_id(&db).await;

        let run_a = RunRepository::create(db.pool(), wf_a, None, "manual", "{}")
            .await
            .unwrap();
        RunRepository::create(db.pool(), wf_b, None, "webhook", "{}")
            .await
            .unwrap();
        RunRepository::mark_finished(db.pool(), run_a.id, "failed", None)
            .await
            .unwrap();

        let failed = RunRepository::list_visible(db.pool(), None, Some(wf_a), Some("failed"), 100)
            .await
            .unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, run_a.id);

        let all = RunRepository::list_visible(db.pool(), None, None, None, 100)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        // Newest first.
        assert!(all[0].id > all[1].id);
    }
}
