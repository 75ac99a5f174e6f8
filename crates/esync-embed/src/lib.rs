pub mod cohere;
pub mod error;
pub mod fusion;
pub mod provider;
pub mod translator;
pub mod vertex;

pub use cohere::CohereProvider;
pub use error::EmbedError;
pub use fusion::fuse;
pub use provider::{EmbeddingProvider, ModelHint};
pub use translator::{HttpTranslator, PassthroughTranslator, Translator};
pub use vertex::VertexAiProvider;
