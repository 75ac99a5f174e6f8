use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EmbedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelHint {
    TextV3,
    MultimodalV4,
}

/// Polymorphic embedding backend, selected once at startup by configuration.
/// Implementations differ in how many round trips they need to fuse an
/// image+text embedding, but present the same fused-vector contract to
/// callers — the Sync Engine and Search Index never know which variant is
/// behind the trait object.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Text-only embedding, used for search queries.
    async fn embed_text(&self, text: &str, model_hint: ModelHint) -> Result<Vec<f32>, EmbedError>;

    /// Fused image+text embedding for one corpus item. The caption/filename
    /// text is the item's own filename, not a search query.
    async fn embed_image(&self, image_bytes: &[u8], text: &str) -> Result<Vec<f32>, EmbedError>;
}
