//! Supabase Storage client implementing the engine's object-store
//! contract over the Storage REST API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use weave_core::context::ObjectStore;

pub struct SupabaseStorage {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(base_url: String, service_key: String, bucket: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            bucket,
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL", alias = "signedUrl", alias = "signed_url")]
    signed_url: String,
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn upload_bytes(
        &self,
        path: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<String, String> {
        let response = self
            .http
            .post(self.object_url(path))
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| format!("storage upload failed: {e}"))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("storage upload returned {status}: {body}"));
        }
        Ok(format!("supabase://{}/{}", self.bucket, path))
    }

    async fn create_signed_url(&self, path: &str, expires_secs: u64) -> Result<String, String> {
        let url = format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url, self.bucket, path
        );
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .json(&json!({ "expiresIn": expires_secs }))
            .send()
            .await
            .map_err(|e| format!("storage sign failed: {e}"))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("storage sign returned {status}: {body}"));
        }
        let parsed: SignResponse = response
            .json()
            .await
            .map_err(|e| format!("storage sign response invalid: {e}"))?;
        // The API returns a path relative to /storage/v1.
        Ok(format!(
            "{}/storage/v1{}",
            self.base_url,
            parsed.signed_url.trim_start_matches("/storage/v1")
        ))
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_composed_from_bucket_and_path() {
        let store = SupabaseStorage::new(
            "https://proj.supabase.co/".to_string(),
            "key".to_string(),
            "media".to_string(),
        );
        assert_eq!(
            store.object_url("generated/a.png"),
            "https://proj.supabase.co/storage/v1/object/media/generated/a.png"
        );
        assert_eq!(
            store.public_url("generated/a.png"),
            "https://proj.supabase.co/storage/v1/object/public/media/generated/a.png"
        );
        assert_eq!(store.bucket(), "media");
    }
}
