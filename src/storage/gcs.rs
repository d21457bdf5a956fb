//! Cloud Storage backend
//!
//! Objects are written with the JSON API media upload
//! (`POST /upload/storage/v1/b/<bucket>/o?uploadType=media`). Access
//! tokens come from the instance metadata server, which is how the
//! service authenticates when it runs on Cloud Run or GCE.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{
    clean_relative_path, StorageError, TextStorage, DEFAULT_BINARY_CONTENT_TYPE,
    TEXT_CONTENT_TYPE,
};

pub const GCS_BASE_URL: &str = "https://storage.googleapis.com";

pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh cached tokens this long before they expire
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Writes one object into the bucket
#[async_trait]
pub trait ObjectUploader: Send + Sync {
    async fn upload(
        &self,
        object_name: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError>;
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// OAuth access tokens for the default service account
pub struct MetadataTokenSource {
    client: reqwest::Client,
    url: String,
    cached: Mutex<Option<CachedToken>>,
}

impl MetadataTokenSource {
    pub fn new() -> Result<Self, StorageError> {
        Self::with_url(METADATA_TOKEN_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| StorageError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            cached: Mutex::new(None),
        })
    }

    pub async fn access_token(&self) -> Result<String, StorageError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .client
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| StorageError::Upload(format!("metadata token request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(StorageError::Upload(format!(
                "metadata server returned {}",
                response.status()
            )));
        }

        let token: MetadataToken = response
            .json()
            .await
            .map_err(|e| StorageError::Upload(format!("malformed metadata token: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }
}

/// [`ObjectUploader`] backed by the Cloud Storage JSON API
pub struct GcsUploader {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    tokens: Arc<MetadataTokenSource>,
}

impl GcsUploader {
    pub fn new(bucket: &str, tokens: Arc<MetadataTokenSource>) -> Result<Self, StorageError> {
        Self::with_base_url(GCS_BASE_URL, bucket, tokens)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        bucket: &str,
        tokens: Arc<MetadataTokenSource>,
    ) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| StorageError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.trim().to_string(),
            tokens,
        })
    }
}

#[async_trait]
impl ObjectUploader for GcsUploader {
    async fn upload(
        &self,
        object_name: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let token = self.tokens.access_token().await?;
        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            urlencoding::encode(object_name)
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(bucket = %self.bucket, object = object_name, "Uploaded object");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let message = format!("{} {}", status, body.trim());
        if status == StatusCode::FORBIDDEN {
            return Err(StorageError::PermissionDenied(message));
        }
        Err(StorageError::Upload(message))
    }
}

/// [`TextStorage`] writing into a bucket under an optional prefix
pub struct GcsStorage {
    uploader: Arc<dyn ObjectUploader>,
    prefix: String,
}

impl GcsStorage {
    pub fn new(uploader: Arc<dyn ObjectUploader>, prefix: &str) -> Self {
        Self {
            uploader,
            prefix: prefix.trim().trim_matches('/').to_string(),
        }
    }

    /// Object name for a relative document path
    pub fn object_name(&self, path: &str) -> Result<String, StorageError> {
        let path = clean_relative_path(path)?;
        let prefix = clean_relative_path(&self.prefix).unwrap_or_default();
        if prefix.is_empty() {
            Ok(path)
        } else {
            Ok(format!("{}/{}", prefix, path))
        }
    }

    async fn save(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        let object_name = self.object_name(path)?;
        self.uploader
            .upload(&object_name, data, content_type)
            .await
            .map_err(|err| match err {
                StorageError::Upload(message) if mentions_permission(&message) => {
                    warn!(object = %object_name, "Upload refused for lack of permission");
                    StorageError::PermissionDenied(message)
                }
                other => other,
            })
    }
}

fn mentions_permission(message: &str) -> bool {
    message.to_lowercase().contains("permission")
}

#[async_trait]
impl TextStorage for GcsStorage {
    async fn save_text(&self, path: &str, text: &str) -> Result<(), StorageError> {
        self.save(path, Bytes::copy_from_slice(text.as_bytes()), TEXT_CONTENT_TYPE)
            .await
    }

    async fn save_binary(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let content_type = match content_type.trim() {
            "" => DEFAULT_BINARY_CONTENT_TYPE,
            value => value,
        };
        self.save(path, data, content_type).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use wiremock::matchers::{body_bytes, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Clone, PartialEq)]
    struct Upload {
        object_name: String,
        data: Vec<u8>,
        content_type: String,
    }

    #[derive(Default)]
    struct RecordingUploader {
        uploads: StdMutex<Vec<Upload>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl ObjectUploader for RecordingUploader {
        async fn upload(
            &self,
            object_name: &str,
            data: Bytes,
            content_type: &str,
        ) -> Result<(), StorageError> {
            if let Some(message) = &self.fail_with {
                return Err(StorageError::Upload(message.clone()));
            }
            self.uploads.lock().unwrap().push(Upload {
                object_name: object_name.to_string(),
                data: data.to_vec(),
                content_type: content_type.to_string(),
            });
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_save_text_uses_prefix_and_json_type() {
        let uploader = Arc::new(RecordingUploader::default());
        let storage = GcsStorage::new(uploader.clone(), " /resources/ ");

        storage.save_text("tag/tag.json", "[]").await.unwrap();

        let uploads = uploader.uploads.lock().unwrap();
        assert_eq!(
            uploads[0],
            Upload {
                object_name: "resources/tag/tag.json".into(),
                data: b"[]".to_vec(),
                content_type: TEXT_CONTENT_TYPE.into(),
            }
        );
    }

    #[tokio::test]
    async fn test_save_binary_defaults_content_type() {
        let uploader = Arc::new(RecordingUploader::default());
        let storage = GcsStorage::new(uploader.clone(), "");

        storage
            .save_binary("achievementData/img/a/b/icon.png", Bytes::from_static(b"png"), " ")
            .await
            .unwrap();
        storage
            .save_binary("achievementData/img/a/b/icon.jpg", Bytes::from_static(b"jpg"), "image/jpeg")
            .await
            .unwrap();

        let uploads = uploader.uploads.lock().unwrap();
        assert_eq!(uploads[0].object_name, "achievementData/img/a/b/icon.png");
        assert_eq!(uploads[0].content_type, DEFAULT_BINARY_CONTENT_TYPE);
        assert_eq!(uploads[1].content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_permission_message_maps_to_permission_denied() {
        let uploader = Arc::new(RecordingUploader {
            uploads: StdMutex::new(Vec::new()),
            fail_with: Some("caller does not have storage.objects.create Permission".into()),
        });
        let storage = GcsStorage::new(uploader, "");

        let err = storage.save_text("tag/tag.json", "[]").await.unwrap_err();
        assert!(err.is_permission_denied());
    }

    #[tokio::test]
    async fn test_generic_failure_is_not_permission_denied() {
        let uploader = Arc::new(RecordingUploader {
            uploads: StdMutex::new(Vec::new()),
            fail_with: Some("503 backend unavailable".into()),
        });
        let storage = GcsStorage::new(uploader, "");

        let err = storage.save_text("tag/tag.json", "[]").await.unwrap_err();
        assert!(matches!(err, StorageError::Upload(_)));
    }

    #[test]
    fn test_object_name_rejects_escape() {
        let storage = GcsStorage::new(Arc::new(RecordingUploader::default()), "p");
        assert!(storage.object_name("../x.json").is_err());
        assert_eq!(storage.object_name("/a//b.json").unwrap(), "p/a/b.json");
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/token"))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.test",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_gcs_uploader_posts_media_upload() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/upload/storage/v1/b/forfan-resource/o"))
            .and(query_param("uploadType", "media"))
            .and(query_param("name", "prefix/tag/tag.json"))
            .and(header("authorization", "Bearer ya29.test"))
            .and(header("content-type", TEXT_CONTENT_TYPE))
            .and(body_bytes(b"[1,2]".to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(2)
            .mount(&server)
            .await;

        let tokens =
            Arc::new(MetadataTokenSource::with_url(format!("{}/token", server.uri())).unwrap());
        let uploader =
            GcsUploader::with_base_url(server.uri(), "forfan-resource", tokens).unwrap();
        let storage = GcsStorage::new(Arc::new(uploader), "prefix");

        storage.save_text("tag/tag.json", "[1,2]").await.unwrap();
        // second write reuses the cached token
        storage.save_text("tag/tag.json", "[1,2]").await.unwrap();
    }

    #[tokio::test]
    async fn test_gcs_uploader_forbidden_is_permission_denied() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/upload/storage/v1/b/forfan-resource/o"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let tokens =
            Arc::new(MetadataTokenSource::with_url(format!("{}/token", server.uri())).unwrap());
        let uploader =
            GcsUploader::with_base_url(server.uri(), "forfan-resource", tokens).unwrap();
        let storage = GcsStorage::new(Arc::new(uploader), "");

        let err = storage
            .save_binary("achievementData/img/a/b/i.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
    }
}
