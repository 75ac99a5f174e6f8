use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use tracing::warn;

use crate::error::EmbedError;
use crate::fusion::fuse;
use crate::provider::{EmbeddingProvider, ModelHint};

/// Dual-call provider: text and image are embedded with separate requests,
/// then fused client-side.
pub struct CohereProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl CohereProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("reqwest client"),
            api_key: api_key.into(),
            base_url: "https://api.cohere.com".into(),
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

    fn embed_url(&self) -> String {
        format!("{}/v2/embed", self.base_url)
    }

    fn model_name(model_hint: ModelHint) -> &'static str {
        match model_hint {
            ModelHint::TextV3 => "embed-v3.0",
            ModelHint::MultimodalV4 => "embed-v4.0",
        }
    }

    async fn embed(&self, body: Value) -> Result<Vec<f32>, EmbedError> {
        let url = self.embed_url();
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| {
                warn!(url = %url, error = %source, "cohere request failed");
                EmbedError::Request { url: url.clone(), source }
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let response_body = resp.text().await.unwrap_or_default();
            warn!(url = %url, status, "cohere returned a non-success status");
            return Err(EmbedError::ProviderStatus {
                url,
                status,
                body: response_body,
            });
        }

        let parsed: Value = resp.json().await.map_err(|source| {
            warn!(url = %url, error = %source, "failed to parse cohere response body");
            EmbedError::Request { url, source }
        })?;
        parsed
            .get("embeddings")
            .and_then(|e| e.get("float"))
            .and_then(Value::as_array)
            .and_then(|rows| rows.first())
            .and_then(Value::as_array)
            .map(|row| row.iter().filter_map(Value::as_f64).map(|v| v as f32).collect())
            .ok_or_else(|| {
                warn!("cohere response missing embeddings.float[0]");
                EmbedError::MalformedResponse("missing embeddings.float[0]".into())
            })
    }
}

#[async_trait]
impl EmbeddingProvider for CohereProvider {
    async fn embed_text(&self, text: &str, model_hint: ModelHint) -> Result<Vec<f32>, EmbedError> {
        let body = serde_json::json!({
            "model": Self::model_name(model_hint),
            "texts": [text],
            "input_type": "search_document",
            "embedding_types": ["float"],
        });
        self.embed(body).await
    }

    async fn embed_image(&self, image_bytes: &[u8], text: &str) -> Result<Vec<f32>, EmbedError> {
        let text_embedding = self.embed_text(text, ModelHint::MultimodalV4).await?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let body = serde_json::json!({
            "model": Self::model_name(ModelHint::MultimodalV4),
            "images": [format!("data:image/jpeg;base64,{encoded}")],
            "input_type": "image",
            "embedding_types": ["float"],
        });
        let image_embedding = self.embed(body).await?;

        Ok(fuse(&text_embedding, &image_embedding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embed_response(vector: Vec<f32>) -> Value {
        serde_json::json!({ "embeddings": { "float": [vector] } })
    }

    #[tokio::test]
    async fn embed_image_makes_two_calls_and_fuses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/embed"))
            .respond_with(move |req: &wiremock::Request| {
                let body: Value = serde_json::from_slice(&req.body).unwrap();
                if body.get("input_type").and_then(Value::as_str) == Some("image") {
                    ResponseTemplate::new(200).set_body_json(embed_response(vec![0.0, 1.0]))
                } else {
                    ResponseTemplate::new(200).set_body_json(embed_response(vec![0.0, 1.0]))
                }
            })
            .mount(&server)
            .await;

        let provider = CohereProvider::with_base_url_for_tests("key", server.uri());
        let result = provider.embed_image(b"bytes", "a.jpg").await.unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn embed_text_returns_first_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(embed_response(vec![0.2, 0.3])))
            .mount(&server)
            .await;

        let provider = CohereProvider::with_base_url_for_tests("key", server.uri());
        let result = provider.embed_text("hello", ModelHint::TextV3).await.unwrap();
        assert_eq!(result, vec![0.2, 0.3]);
    }
}
