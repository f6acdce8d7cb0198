//! Workflow repository.

use crate::db::models::Workflow;
use crate::db::{now_rfc3339, DatabasePool};

pub struct WorkflowRepository;

impl WorkflowRepository {
    pub async fn create(
        pool: &DatabasePool,
        user_id: Option<&str>,
        name: &str,
        description: Option<&str>,
        webhook_slug: Option<&str>,
        graph: &str,
    ) -> Result<Workflow, sqlx::Error> {
        sqlx::query_as::<_, Workflow>(
            "INSERT INTO workflows (user_id, name, description, webhook_slug, graph, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(user_id)
        .bind(name)
        .bind(description)
        .bind(webhook_slug)
        .bind(graph)
        .bind(now_rfc3339())
        .fetch_one(pool)
        .await
    }

    pub async fn get_by_id(
        pool: &DatabasePool,
        id: i64,
    ) -> Result<Option<Workflow>, sqlx::Error> {
        sqlx::query_as::<_, Workflow>("SELECT * FROM workflows WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Get a workflow the caller may see: shared (NULL owner) or owned.
    pub async fn get_visible(
        pool: &DatabasePool,
        id: i64,
        user_id: Option<&str>,
    ) -> Result<Option<Workflow>, sqlx::Error> {
        sqlx::query_as::<_, Workflow>(
            "SELECT * FROM workflows WHERE id = ? AND (user_id IS NULL OR user_id = ?)",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_slug(
        pool: &DatabasePool,
        slug: &str,
    ) -> Result<Option<Workflow>, sqlx::Error> {
        sqlx::query_as::<_, Workflow>("SELECT * FROM workflows WHERE webhook_slug = ?")
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_visible(
        pool: &DatabasePool,
        user_id: Option<&str>,
    ) -> Result<Vec<Workflow>, sqlx::Error> {
        sqlx::query_as::<_, Workflow>(
            "SELECT * FROM workflows WHERE (user_id IS NULL OR user_id = ?) ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn update_name(pool: &DatabasePool, id: i64, name: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE workflows SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_description(
        pool: &DatabasePool,
        id: i64,
        description: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE workflows SET description = ? WHERE id = ?")
            .bind(description)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_webhook_slug(
        pool: &DatabasePool,
        id: i64,
        webhook_slug: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE workflows SET webhook_slug = ? WHERE id = ?")
            .bind(webhook_slug)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn update_graph(
        pool: &DatabasePool,
        id: i64,
        graph: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE workflows SET graph = ? WHERE id = ?")
            .bind(graph)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete(pool: &DatabasePool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
