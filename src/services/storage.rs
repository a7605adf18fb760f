use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::{StatusCode, header::CONTENT_TYPE};
use sea_orm::prelude::Uuid;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Largest file accepted for upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Where uploads may land.
pub const FOLDERS: [&str; 2] = ["receipts", "banners"];

pub const ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "application/pdf"];

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("File storage is not configured")]
    NotConfigured,

    #[error("Upload failed: storage answered {0}")]
    Rejected(StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    /// Public URL saved on the batch or event.
    pub url: String,
    /// Bucket-relative key, kept so the object can be replaced later.
    pub path: String,
}

/// Bucket-style object storage reached over HTTP (`PUT <base>/object/<bucket>/<key>`).
#[derive(Debug, Clone)]
pub struct Storage {
    client: reqwest::Client,
    target: Option<Target>,
}

#[derive(Debug, Clone)]
struct Target {
    base_url: String,
    bucket: String,
    api_key: String,
}

impl Storage {
    pub fn new(base_url: Option<String>, bucket: String, api_key: Option<String>) -> Self {
        let target = match (base_url, api_key) {
            (Some(base_url), Some(api_key)) => Some(Target {
                base_url: base_url.trim_end_matches('/').to_string(),
                bucket,
                api_key,
            }),
            _ => {
                warn!("STORAGE_URL or STORAGE_KEY missing, uploads are disabled");
                None
            }
        };
        Self {
            client: reqwest::Client::new(),
            target,
        }
    }

    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        folder: &str,
        file_name: &str,
        mime_type: &str,
    ) -> Result<StoredObject, StorageError> {
        let target = self.target.as_ref().ok_or(StorageError::NotConfigured)?;
        let key = object_key(folder, file_name, &bytes, Uuid::new_v4());
        let size = bytes.len();

        let response = self
            .client
            .put(format!("{}/object/{}/{key}", target.base_url, target.bucket))
            .bearer_auth(&target.api_key)
            .header(CONTENT_TYPE, mime_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, %key, "upload rejected");
            return Err(StorageError::Rejected(status));
        }

        debug!(%key, size, "object stored");
        Ok(StoredObject {
            url: format!(
                "{}/object/public/{}/{key}",
                target.base_url, target.bucket
            ),
            path: key,
        })
    }
}

/// `<folder>/<first 16 hex of sha256>-<uuid>-<encoded file name>`.
pub fn object_key(folder: &str, file_name: &str, bytes: &[u8], id: Uuid) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = format!("{:x}", hasher.finalize());

    let base_name = file_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or("upload");
    let encoded = utf8_percent_encode(base_name.trim(), NON_ALPHANUMERIC).to_string();

    format!("{folder}/{}-{}-{encoded}", &digest[..16], id.simple())
}
