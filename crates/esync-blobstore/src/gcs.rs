use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BlobStoreError;
use crate::store::BlobStore;

// ── Base URL (overridden in tests to point at a wiremock server) ─────────────

#[derive(Clone)]
struct BaseUrls {
    storage: String,
}

impl Default for BaseUrls {
    fn default() -> Self {
        Self {
            storage: "https://storage.googleapis.com".into(),
        }
    }
}

// ── Token provider ────────────────────────────────────────────────────────────

/// Abstraction over GCP token acquisition — enables test injection.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<String, BlobStoreError>;
}

/// Production token provider backed by Application Default Credentials.
pub struct AdcTokenProvider {
    inner: Arc<dyn gcp_auth::TokenProvider>,
}

#[async_trait]
impl TokenProvider for AdcTokenProvider {
    async fn token(&self) -> Result<String, BlobStoreError> {
        let token = self
            .inner
            .token(&["https://www.googleapis.com/auth/devstorage.read_write"])
            .await
            .map_err(|e| BlobStoreError::Auth(e.to_string()))?;
        Ok(token.as_str().to_string())
    }
}

/// Test token provider — returns a fixed string without any network call.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String, BlobStoreError> {
        Ok(self.0.clone())
    }
}

// ── GcsBlobStore ──────────────────────────────────────────────────────────────

/// [`BlobStore`] backed by the GCS JSON API, scoped to one bucket.
pub struct GcsBlobStore {
    bucket: String,
    client: reqwest::Client,
    token: Box<dyn TokenProvider>,
    base: BaseUrls,
}

impl GcsBlobStore {
    pub async fn from_adc(bucket: impl Into<String>) -> Result<Self, BlobStoreError> {
        let inner = gcp_auth::provider()
            .await
            .map_err(|e| BlobStoreError::Auth(format!("failed to initialize GCP ADC: {e}")))?;
        Ok(Self {
            bucket: bucket.into(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("reqwest client"),
            token: Box::new(AdcTokenProvider { inner }),
            base: BaseUrls::default(),
        })
    }

    #[doc(hidden)]
    pub fn with_static_token_for_tests(
        bucket: impl Into<String>,
        token: impl Into<String>,
        storage_base_url: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            client: reqwest::Client::new(),
            token: Box::new(StaticToken(token.into())),
            base: BaseUrls {
                storage: storage_base_url.into(),
            },
        }
    }

    fn object_url(&self, key: &str, alt_media: bool) -> String {
        let encoded = urlencode(key);
        let alt = if alt_media { "&alt=media" } else { "" };
        format!(
            "{}/storage/v1/b/{}/o/{}?uploadType=media{}",
            self.base.storage, self.bucket, encoded, alt
        )
    }

    fn get_url(&self, key: &str) -> String {
        let encoded = urlencode(key);
        format!(
            "{}/storage/v1/b/{}/o/{}?alt=media",
            self.base.storage, self.bucket, encoded
        )
    }

    fn list_url(&self, prefix: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o?prefix={}",
            self.base.storage,
            self.bucket,
            urlencode(prefix)
        )
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[derive(serde::Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<ListItem>,
}

#[derive(serde::Deserialize)]
struct ListItem {
    name: String,
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BlobStoreError> {
        let token = self.token.token().await?;
        let resp = self
            .client
            .get(self.get_url(key))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| BlobStoreError::Backend {
                key: key.to_string(),
                source,
            })?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BlobStoreError::BackendStatus {
                key: key.to_string(),
                status,
                body,
            });
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|source| BlobStoreError::Backend {
                key: key.to_string(),
                source,
            })?;
        Ok(Some(bytes.to_vec()))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), BlobStoreError> {
        let token = self.token.token().await?;
        let resp = self
            .client
            .post(self.object_url(key, false))
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .body(bytes)
            .send()
            .await
            .map_err(|source| BlobStoreError::Backend {
                key: key.to_string(),
                source,
            })?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BlobStoreError::BackendStatus {
                key: key.to_string(),
                status,
                body,
            });
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), BlobStoreError> {
        let token = self.token.token().await?;
        let encoded = urlencode(key);
        let url = format!("{}/storage/v1/b/{}/o/{}", self.base.storage, self.bucket, encoded);
        let resp = self
            .client
            .delete(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| BlobStoreError::Backend {
                key: key.to_string(),
                source,
            })?;
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BlobStoreError::BackendStatus {
                key: key.to_string(),
                status,
                body,
            });
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobStoreError> {
        Ok(self.get(key).await?.is_some())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError> {
        let token = self.token.token().await?;
        let resp = self
            .client
            .get(self.list_url(prefix))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| BlobStoreError::Backend {
                key: prefix.to_string(),
                source,
            })?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BlobStoreError::BackendStatus {
                key: prefix.to_string(),
                status,
                body,
            });
        }
        let parsed: ListResponse = resp
            .json()
            .await
            .map_err(|source| BlobStoreError::Backend {
                key: prefix.to_string(),
                source,
            })?;
        Ok(parsed.items.into_iter().map(|i| i.name).collect())
    }
}
