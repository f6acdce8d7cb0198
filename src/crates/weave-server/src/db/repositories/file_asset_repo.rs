//! File-asset repository.

use weave_core::files::FileRecord;

use crate::db::models::FileAsset;
use crate::db::{now_rfc3339, DatabasePool};

pub struct FileAssetRepository;

impl FileAssetRepository {
    pub async fn create(pool: &DatabasePool, record: &FileRecord) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO file_assets
                (run_id, node_id, storage, bucket, path, content_type, size,
                 signed_url, signed_url_expires_at, public_url, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(record.run_id)
        .bind(&record.node_id)
        .bind(&record.storage)
        .bind(&record.bucket)
        .bind(&record.path)
        .bind(&record.content_type)
        .bind(record.size.map(|s| s as i64))
        .bind(&record.signed_url)
        .bind(&record.signed_url_expires_at)
        .bind(&record.public_url)
        .bind(now_rfc3339())
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    pub async fn list_for_run(
        pool: &DatabasePool,
        run_id: i64,
    ) -> Result<Vec<FileAsset>, sqlx::Error> {
        sqlx::query_as::<_, FileAsset>(
            "SELECT * FROM file_assets WHERE run_id = ? ORDER BY id ASC",
        )
        .bind(run_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{RunRepository, WorkflowRepository};
    use crate::db::Database;

    #[tokio::test]
    async fn records_persist_with_run() {
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

        let id = FileAssetRepository::create(
            db.pool(),
            &FileRecord {
                run_id: run.id,
                node_id: "f1".to_string(),
                storage: "supabase".to_string(),
                bucket: "media".to_string(),
                path: "generated/a.txt".to_string(),
                content_type: Some("text/plain".to_string()),
                size: Some(5),
                signed_url: Some("https://example/signed".to_string()),
                signed_url_expires_at: None,
                public_url: None,
            },
        )
        .await
        .unwrap();
        assert!(id > 0);

        let assets = FileAssetRepository::list_for_run(db.pool(), run.id)
            .await
            .unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].path, "generated/a.txt");
        assert_eq!(assets[0].size, Some(5));
    }
}
