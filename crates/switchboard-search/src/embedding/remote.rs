//! Remote embedding APIs: OpenAI-compatible and Ollama

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{check_shape, EmbeddingProvider};
use crate::config::EmbeddingConfig;
use crate::error::{SearchError, SearchResult};

/// Maximum characters sent per text. Registry entries are short; this only
/// guards against pathological descriptions blowing the model context.
const MAX_EMBED_CHARS: usize = 3_000;

const OPENAI_BATCH_SIZE: usize = 64;
const OLLAMA_BATCH_SIZE: usize = 32;

/// Keep at most `MAX_EMBED_CHARS` characters of `text`
fn truncate_for_embedding(text: &str) -> &str {
    match text.char_indices().nth(MAX_EMBED_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn build_client(config: &EmbeddingConfig) -> SearchResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs.max(1)))
        .build()
        .map_err(|e| SearchError::Configuration(format!("failed to build HTTP client: {}", e)))
}

async fn error_body(resp: reqwest::Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    format!("{}: {}", status, body)
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiEmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    /// Forwarded by LiteLLM-style proxies to Bedrock-hosted models
    #[serde(skip_serializing_if = "Option::is_none")]
    aws_region_name: Option<&'a str>,
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// OpenAI `/v1/embeddings` and compatible proxies
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    dimension: usize,
    region: Option<String>,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> SearchResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                SearchError::Configuration("openai embedding provider requires api_key".to_string())
            })?;
        let base = config
            .api_base
            .as_deref()
            .unwrap_or("https://api.openai.com")
            .trim_end_matches('/');
        let url = if base.ends_with("/v1") {
            format!("{}/embeddings", base)
        } else {
            format!("{}/v1/embeddings", base)
        };

        Ok(Self {
            client: build_client(config)?,
            url,
            api_key,
            model: config.model.clone(),
            dimension: config.dimension,
            region: config.region.clone(),
        })
    }

    async fn encode_chunk(&self, chunk: &[String]) -> SearchResult<Vec<Vec<f32>>> {
        let req = OpenAiEmbedRequest {
            model: &self.model,
            input: chunk.iter().map(|t| truncate_for_embedding(t)).collect(),
            dimensions: self.model.starts_with("text-embedding-3").then_some(self.dimension),
            aws_region_name: self.region.as_deref(),
        };

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| SearchError::Embedding(format!("failed to call embeddings API: {}", e)))?;

        if !resp.status().is_success() {
            return Err(SearchError::Embedding(format!(
                "embeddings API returned {}",
                error_body(resp).await
            )));
        }

        let mut body: OpenAiEmbedResponse = resp
            .json()
            .await
            .map_err(|e| SearchError::Embedding(format!("malformed embeddings response: {}", e)))?;

        // Responses carry an index; order by it when present
        body.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn encode(&self, texts: &[String]) -> SearchResult<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(OPENAI_BATCH_SIZE) {
            all_embeddings.extend(self.encode_chunk(chunk).await?);
        }
        check_shape(&all_embeddings, texts.len(), self.dimension)?;
        Ok(all_embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    truncate: bool,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Ollama `/api/embed`
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dimension: usize,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> SearchResult<Self> {
        let base = config
            .api_base
            .as_deref()
            .unwrap_or("http://localhost:11434")
            .trim_end_matches('/');

        Ok(Self {
            client: build_client(config)?,
            url: format!("{}/api/embed", base),
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn encode(&self, texts: &[String]) -> SearchResult<Vec<Vec<f32>>> {
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(OLLAMA_BATCH_SIZE) {
            let req = OllamaEmbedRequest {
                model: &self.model,
                input: chunk.iter().map(|t| truncate_for_embedding(t)).collect(),
                truncate: true,
            };

            let resp = self
                .client
                .post(&self.url)
                .json(&req)
                .send()
                .await
                .map_err(|e| SearchError::Embedding(format!("failed to call Ollama embed API: {}", e)))?;

            if !resp.status().is_success() {
                return Err(SearchError::Embedding(format!(
                    "Ollama embed API returned {}",
                    error_body(resp).await
                )));
            }

            let body: OllamaEmbedResponse = resp
                .json()
                .await
                .map_err(|e| SearchError::Embedding(format!("malformed Ollama response: {}", e)))?;
            all_embeddings.extend(body.embeddings);
        }

        check_shape(&all_embeddings, texts.len(), self.dimension)?;
        Ok(all_embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
