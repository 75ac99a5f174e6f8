use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    VertexAi,
    Cohere,
}

impl FromStr for EmbeddingProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vertex_ai" => Ok(EmbeddingProviderKind::VertexAi),
            "cohere" => Ok(EmbeddingProviderKind::Cohere),
            other => Err(ConfigError::InvalidValue {
                var: "EMBEDDING_PROVIDER".into(),
                message: format!("unknown provider {other:?}, expected vertex_ai or cohere"),
            }),
        }
    }
}
