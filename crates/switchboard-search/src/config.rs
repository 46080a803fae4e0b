//! Search subsystem configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::document::IndexFamily;
use crate::error::{SearchError, SearchResult};

/// Concrete search backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Single-process vector index
    Embedded,
    /// OpenSearch-compatible cluster with hybrid ranking
    Clustered,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded => f.write_str("embedded"),
            Self::Clustered => f.write_str("clustered"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "embedded" | "faiss" | "local" => Ok(Self::Embedded),
            "clustered" | "opensearch" | "cluster" => Ok(Self::Clustered),
            other => Err(SearchError::Configuration(format!(
                "unknown search backend {:?} (expected embedded or clustered)",
                other
            ))),
        }
    }
}

/// What indexing and search do when the embedding provider fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingFailurePolicy {
    /// Keep going without a vector where the backend has a keyword channel
    #[default]
    KeywordOnly,
    /// Abort the single index write or search
    Abort,
}

/// Embedding provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `hash`, `openai` or `ollama`
    pub provider: String,
    pub model: String,
    pub dimension: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hash".to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            api_key: None,
            api_base: None,
            region: None,
            timeout_secs: 30,
        }
    }
}

/// Cluster endpoint and hybrid ranking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub timeout_secs: u64,
    /// Accept self-signed certificates (development clusters only)
    pub accept_invalid_certs: bool,
    /// Name of the server-side hybrid search pipeline
    pub pipeline: String,
    pub keyword_weight: f32,
    pub vector_weight: f32,
    /// Make writes visible to search before returning
    pub refresh: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            timeout_secs: 10,
            accept_invalid_certs: false,
            pipeline: "switchboard-hybrid".to_string(),
            keyword_weight: 0.4,
            vector_weight: 0.6,
            refresh: true,
        }
    }
}

/// Configuration for the search subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Explicit backend; when absent, clustered iff a cluster URL is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,

    /// Tenant or environment discriminator appended to every index name
    pub namespace: String,

    pub index_prefix: String,

    /// Where the embedded backend persists its index; in-memory when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    pub embedding_failure: EmbeddingFailurePolicy,

    pub embedding: EmbeddingConfig,

    pub cluster: ClusterConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: None,
            namespace: "default".to_string(),
            index_prefix: "switchboard".to_string(),
            data_dir: None,
            embedding_failure: EmbeddingFailurePolicy::default(),
            embedding: EmbeddingConfig::default(),
            cluster: ClusterConfig::default(),
        }
    }
}

impl SearchConfig {
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.unwrap_or(if self.cluster.url.is_some() {
            BackendKind::Clustered
        } else {
            BackendKind::Embedded
        })
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_cluster_url(mut self, url: impl Into<String>) -> Self {
        self.cluster.url = Some(url.into());
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Physical index name: `<prefix>-<family>-<namespace>`
    pub fn index_name(&self, family: IndexFamily) -> String {
        format!("{}-{}-{}", self.index_prefix, family.as_str(), self.namespace)
    }

    pub fn validate(&self) -> SearchResult<()> {
        validate_index_component("namespace", &self.namespace)?;
        validate_index_component("index_prefix", &self.index_prefix)?;
        if self.embedding.dimension == 0 {
            return Err(SearchError::Configuration(
                "embedding.dimension must be greater than zero".to_string(),
            ));
        }
        if self.backend_kind() == BackendKind::Clustered && self.cluster.url.is_none() {
            return Err(SearchError::Configuration(
                "clustered backend selected but cluster.url is not set".to_string(),
            ));
        }
        let weights = self.cluster.keyword_weight + self.cluster.vector_weight;
        if self.cluster.keyword_weight < 0.0
            || self.cluster.vector_weight < 0.0
            || (weights - 1.0).abs() > 1e-3
        {
            return Err(SearchError::Configuration(format!(
                "cluster keyword_weight and vector_weight must be non-negative and sum to 1 (got {})",
                weights
            )));
        }
        Ok(())
    }
}

/// Index names must be lowercase and free of separators the cluster rejects
fn validate_index_component(field: &str, value: &str) -> SearchResult<()> {
    let valid = !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        && !value.starts_with(['-', '_']);
    if valid {
        Ok(())
    } else {
        Err(SearchError::Configuration(format!(
            "{} {:?} must be lowercase alphanumeric with '-' or '_'",
            field, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_defaults_follow_cluster_url() {
        let config = SearchConfig::default();
        assert_eq!(config.backend_kind(), BackendKind::Embedded);

        let config = SearchConfig::default().with_cluster_url("http://localhost:9200");
        assert_eq!(config.backend_kind(), BackendKind::Clustered);

        let config = SearchConfig::default()
            .with_cluster_url("http://localhost:9200")
            .with_backend(BackendKind::Embedded);
        assert_eq!(config.backend_kind(), BackendKind::Embedded);
    }

    #[test]
    fn test_index_names_are_namespaced() {
        let config = SearchConfig::default().with_namespace("tenant-a");
        assert_eq!(config.index_name(IndexFamily::Servers), "switchboard-servers-tenant-a");
        assert_eq!(
            config.index_name(IndexFamily::FederationConfig),
            "switchboard-federation-config-tenant-a"
        );
    }

    #[test]
    fn test_validate() {
        assert!(SearchConfig::default().validate().is_ok());
        assert!(SearchConfig::default().with_namespace("Tenant").validate().is_err());
        assert!(SearchConfig::default().with_namespace("").validate().is_err());
        assert!(SearchConfig::default()
            .with_backend(BackendKind::Clustered)
            .validate()
            .is_err());

        let mut config = SearchConfig::default();
        config.cluster.keyword_weight = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SearchConfig = serde_json::from_str(
            r#"{"backend": "clustered", "namespace": "prod",
                "cluster": {"url": "https://search:9200"},
                "embedding_failure": "abort"}"#,
        )
        .unwrap();
        assert_eq!(config.backend_kind(), BackendKind::Clustered);
        assert_eq!(config.embedding_failure, EmbeddingFailurePolicy::Abort);
        assert_eq!(config.cluster.pipeline, "switchboard-hybrid");
        assert_eq!(config.embedding.dimension, 384);
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("opensearch".parse::<BackendKind>().unwrap(), BackendKind::Clustered);
        assert_eq!("Embedded".parse::<BackendKind>().unwrap(), BackendKind::Embedded);
        assert!("sqlite".parse::<BackendKind>().is_err());
    }
}
