//! Embedding providers
//!
//! A provider turns entity text into fixed-dimension vectors. Providers are
//! shared behind `Arc` and called concurrently from indexing and search.
//!
//! | provider | where it runs       | needs                        |
//! |----------|---------------------|------------------------------|
//! | `hash`   | in process          | nothing                      |
//! | `openai` | OpenAI-compatible API | `api_key`, optional `api_base`/`region` |
//! | `ollama` | Ollama server       | optional `api_base`          |

mod hash;
mod remote;

use async_trait::async_trait;
use std::sync::Arc;

pub use hash::HashEmbedder;
pub use remote::{OllamaEmbedder, OpenAiEmbedder};

use crate::config::EmbeddingConfig;
use crate::error::{SearchError, SearchResult};

/// Trait for embedding providers
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// One vector per input text, each of length [`dimension`](Self::dimension)
    async fn encode(&self, texts: &[String]) -> SearchResult<Vec<Vec<f32>>>;

    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;

    async fn encode_one(&self, text: &str) -> SearchResult<Vec<f32>> {
        self.encode(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::Embedding("provider returned no embedding".to_string()))
    }
}

/// Build the provider named by the configuration
pub fn create_provider(config: &EmbeddingConfig) -> SearchResult<Arc<dyn EmbeddingProvider>> {
    if config.dimension == 0 {
        return Err(SearchError::Configuration(
            "embedding dimension must be greater than zero".to_string(),
        ));
    }

    let provider: Arc<dyn EmbeddingProvider> = match config.provider.to_lowercase().as_str() {
        "hash" | "local" => Arc::new(HashEmbedder::new(config.dimension)),
        "openai" | "litellm" => Arc::new(OpenAiEmbedder::new(config)?),
        "ollama" => Arc::new(OllamaEmbedder::new(config)?),
        other => {
            return Err(SearchError::Configuration(format!(
                "unknown embedding provider: {}",
                other
            )))
        }
    };

    tracing::info!(
        "Using embedding provider {} (model {}, dimension {})",
        config.provider,
        provider.model_name(),
        provider.dimension()
    );
    Ok(provider)
}

/// Reject responses with the wrong number of vectors or the wrong dimension
pub(crate) fn check_shape(vectors: &[Vec<f32>], expected_count: usize, dimension: usize) -> SearchResult<()> {
    if vectors.len() != expected_count {
        return Err(SearchError::Embedding(format!(
            "expected {} embeddings, got {}",
            expected_count,
            vectors.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(SearchError::Embedding(format!(
            "expected dimension {}, got {}",
            dimension,
            bad.len()
        )));
    }
    Ok(())
}
