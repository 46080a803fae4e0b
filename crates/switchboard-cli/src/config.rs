//! CLI configuration file

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use switchboard_search::{BackendKind, EmbeddingFailurePolicy, SearchConfig};

/// Get default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("switchboard")
}

/// Default location of `config.toml`
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("switchboard")
        .join("config.toml")
}

/// Settings persisted between runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    pub search: SearchConfig,
}

impl Config {
    /// Load from `path`, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Keys accepted by `get` and `set`
    pub fn keys() -> &'static [&'static str] {
        &[
            "data_dir",
            "search.backend",
            "search.namespace",
            "search.index_prefix",
            "search.embedding_failure",
            "search.embedding.provider",
            "search.embedding.model",
            "search.embedding.dimension",
            "search.embedding.api_base",
            "search.cluster.url",
            "search.cluster.username",
            "search.cluster.pipeline",
        ]
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let search = &self.search;
        let value = match key {
            "data_dir" => self.data_dir.as_ref().map(|p| p.display().to_string()),
            "search.backend" => search.backend.map(|b| b.to_string()),
            "search.namespace" => Some(search.namespace.clone()),
            "search.index_prefix" => Some(search.index_prefix.clone()),
            "search.embedding_failure" => Some(policy_name(search.embedding_failure).to_string()),
            "search.embedding.provider" => Some(search.embedding.provider.clone()),
            "search.embedding.model" => Some(search.embedding.model.clone()),
            "search.embedding.dimension" => Some(search.embedding.dimension.to_string()),
            "search.embedding.api_base" => search.embedding.api_base.clone(),
            "search.cluster.url" => search.cluster.url.clone(),
            "search.cluster.username" => search.cluster.username.clone(),
            "search.cluster.pipeline" => Some(search.cluster.pipeline.clone()),
            other => bail!("unknown config key {:?}", other),
        };
        Ok(value)
    }

    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let search = &mut self.search;
        match key {
            "data_dir" => self.data_dir = Some(PathBuf::from(value)),
            "search.backend" => search.backend = Some(value.parse::<BackendKind>()?),
            "search.namespace" => search.namespace = value.to_string(),
            "search.index_prefix" => search.index_prefix = value.to_string(),
            "search.embedding_failure" => {
                search.embedding_failure = match value {
                    "keyword_only" => EmbeddingFailurePolicy::KeywordOnly,
                    "abort" => EmbeddingFailurePolicy::Abort,
                    other => bail!("unknown embedding failure policy {:?} (expected keyword_only or abort)", other),
                }
            }
            "search.embedding.provider" => search.embedding.provider = value.to_string(),
            "search.embedding.model" => search.embedding.model = value.to_string(),
            "search.embedding.dimension" => {
                search.embedding.dimension = value
                    .parse()
                    .with_context(|| format!("invalid dimension {:?}", value))?
            }
            "search.embedding.api_base" => search.embedding.api_base = Some(value.to_string()),
            "search.cluster.url" => search.cluster.url = Some(value.to_string()),
            "search.cluster.username" => search.cluster.username = Some(value.to_string()),
            "search.cluster.pipeline" => search.cluster.pipeline = value.to_string(),
            other => bail!("unknown config key {:?}", other),
        }
        self.search.validate()?;
        Ok(())
    }
}

fn policy_name(policy: EmbeddingFailurePolicy) -> &'static str {
    match policy {
        EmbeddingFailurePolicy::KeywordOnly => "keyword_only",
        EmbeddingFailurePolicy::Abort => "abort",
    }
}
