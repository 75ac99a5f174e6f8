use async_trait::async_trait;
use serde_json::Value;

use crate::error::EmbedError;

/// Translates a search query to English before embedding, so non-English
/// queries still land in the (English-trained) embedding space correctly.
/// Failures are recovered by the caller, which falls back to the original
/// text — translation is a quality improvement, not a hard dependency.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate_to_english(&self, text: &str) -> Result<String, EmbedError>;
}

/// HTTP-backed translator calling an external translation API.
pub struct HttpTranslator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl HttpTranslator {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("reqwest client"),
            api_key: api_key.into(),
            base_url: "https://translation.googleapis.com".into(),
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
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate_to_english(&self, text: &str) -> Result<String, EmbedError> {
        let url = format!("{}/language/translate/v2", self.base_url);
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&serde_json::json!({ "q": text, "target": "en" }))
            .send()
            .await
            .map_err(|source| EmbedError::Request { url: url.clone(), source })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(EmbedError::ProviderStatus { url, status, body });
        }

        let parsed: Value = resp.json().await.map_err(|source| EmbedError::Request { url, source })?;
        parsed
            .get("data")
            .and_then(|d| d.get("translations"))
            .and_then(Value::as_array)
            .and_then(|t| t.first())
            .and_then(|t| t.get("translatedText"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| EmbedError::MalformedResponse("missing translations[0].translatedText".into()))
    }
}

/// No-op translator for tests and offline operation — returns the input
/// unchanged.
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate_to_english(&self, text: &str) -> Result<String, EmbedError> {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn passthrough_returns_input_unchanged() {
        let translator = PassthroughTranslator;
        let result = translator.translate_to_english("こんにちは").await.unwrap();
        assert_eq!(result, "こんにちは");
    }

    #[tokio::test]
    async fn http_translator_parses_translated_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/language/translate/v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "translations": [{ "translatedText": "hello" }] }
            })))
            .mount(&server)
            .await;

        let translator = HttpTranslator::with_base_url_for_tests("key", server.uri());
        let result = translator.translate_to_english("こんにちは").await.unwrap();
        assert_eq!(result, "hello");
    }
}
