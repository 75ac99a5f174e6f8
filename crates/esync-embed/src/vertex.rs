use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use tracing::warn;

use crate::error::EmbedError;
use crate::fusion::fuse;
use crate::provider::{EmbeddingProvider, ModelHint};

/// Multimodal-native provider: one call returns both an image and a text
/// embedding in a shared space.
pub struct VertexAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl VertexAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("reqwest client"),
            api_key: api_key.into(),
            base_url: "https://us-central1-aiplatform.googleapis.com".into(),
        }
    }

    #[doc(hidden)]
    pub fn with_base_url_for_tests(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    fn predict_url(&self) -> String {
        format!("{}/v1/multimodalembedding:predict", self.base_url)
    }

    async fn predict(&self, instance: Value) -> Result<Value, EmbedError> {
        let url = self.predict_url();
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "instances": [instance] }))
            .send()
            .await
            .map_err(|source| {
                warn!(url = %url, error = %source, "vertex ai request failed");
                EmbedError::Request { url: url.clone(), source }
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            warn!(url = %url, status, "vertex ai returned a non-success status");
            return Err(EmbedError::ProviderStatus { url, status, body });
        }
        resp.json().await.map_err(|source| {
            warn!(url = %url, error = %source, "failed to parse vertex ai response body");
            EmbedError::Request { url, source }
        })
    }

    fn extract_embedding(body: &Value, field: &str) -> Result<Vec<f32>, EmbedError> {
        body.get("predictions")
            .and_then(Value::as_array)
            .and_then(|p| p.first())
            .and_then(|p| p.get(field))
            .and_then(|e| e.get("embedding"))
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_f64).map(|v| v as f32).collect())
            .ok_or_else(|| {
                warn!(field, "vertex ai response missing expected embedding field");
                EmbedError::MalformedResponse(format!("missing {field}.embedding"))
            })
    }
}

#[async_trait]
impl EmbeddingProvider for VertexAiProvider {
    async fn embed_text(&self, text: &str, model_hint: ModelHint) -> Result<Vec<f32>, EmbedError> {
        let instance = match model_hint {
            ModelHint::TextV3 | ModelHint::MultimodalV4 => serde_json::json!({ "text": text }),
        };
        let body = self.predict(instance).await?;
        Self::extract_embedding(&body, "textEmbedding")
    }

    async fn embed_image(&self, image_bytes: &[u8], text: &str) -> Result<Vec<f32>, EmbedError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let instance = serde_json::json!({
            "text": text,
            "image": { "bytesBase64Encoded": encoded },
        });
        let body = self.predict(instance).await?;
        let image_embedding = Self::extract_embedding(&body, "imageEmbedding")?;
        let text_embedding = Self::extract_embedding(&body, "textEmbedding")?;
        Ok(fuse(&text_embedding, &image_embedding))
    }
}
