//! Search requests and result buckets

use serde::{Deserialize, Serialize};

use crate::entity::EntityType;

/// Results per bucket when the caller does not say
pub const DEFAULT_MAX_RESULTS: usize = 10;

/// Upper bound on results per bucket
pub const MAX_RESULTS_LIMIT: usize = 100;

/// Tokens shorter than this are ignored
pub const MIN_TOKEN_LEN: usize = 2;

/// Split text into lowercase alphanumeric tokens of at least two chars
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(|t| t.to_lowercase())
        .collect()
}

/// A free-text search over the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,

    /// Restrict to these types; empty means all types
    #[serde(default)]
    pub entity_types: Vec<EntityType>,

    /// Maximum results per bucket
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Exclude disabled entities
    #[serde(default)]
    pub enabled_only: bool,
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            entity_types: Vec::new(),
            max_results: DEFAULT_MAX_RESULTS,
            enabled_only: false,
        }
    }

    pub fn with_entity_type(mut self, entity_type: EntityType) -> Self {
        if !self.entity_types.contains(&entity_type) {
            self.entity_types.push(entity_type);
        }
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.clamp(1, MAX_RESULTS_LIMIT);
        self
    }

    pub fn enabled_only(mut self, enabled_only: bool) -> Self {
        self.enabled_only = enabled_only;
        self
    }

    /// Per-bucket limit, clamped even when the field was set directly
    pub fn limit(&self) -> usize {
        self.max_results.clamp(1, MAX_RESULTS_LIMIT)
    }

    /// Number of candidates to fetch before bucketing
    pub fn over_fetch(&self) -> usize {
        self.limit() * 2
    }

    /// Types this request covers, in stable order
    pub fn requested_types(&self) -> Vec<EntityType> {
        EntityType::ALL
            .into_iter()
            .filter(|t| self.wants(*t))
            .collect()
    }

    pub fn wants(&self, entity_type: EntityType) -> bool {
        self.entity_types.is_empty() || self.entity_types.contains(&entity_type)
    }

    pub fn is_blank(&self) -> bool {
        self.query.trim().is_empty()
    }

    pub fn tokens(&self) -> Vec<String> {
        tokenize(&self.query)
    }
}

/// A tool surfaced through its parent server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolHit {
    pub tool_name: String,
    pub server_path: String,
    pub server_name: String,
    pub description: String,
    pub relevance_score: f32,
}

/// One ranked entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityHit {
    pub entity_type: EntityType,
    pub path: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub is_enabled: bool,
    pub relevance_score: f32,

    /// Tools of this server that match the query terms
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matching_tools: Vec<ToolHit>,
}

/// Search results grouped by entity type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub servers: Vec<EntityHit>,
    pub agents: Vec<EntityHit>,
    pub skills: Vec<EntityHit>,
    pub tools: Vec<ToolHit>,
}

impl SearchResults {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
            && self.agents.is_empty()
            && self.skills.is_empty()
            && self.tools.is_empty()
    }

    pub fn bucket(&self, entity_type: EntityType) -> &[EntityHit] {
        match entity_type {
            EntityType::Server => &self.servers,
            EntityType::Agent => &self.agents,
            EntityType::Skill => &self.skills,
        }
    }

    pub fn bucket_mut(&mut self, entity_type: EntityType) -> &mut Vec<EntityHit> {
        match entity_type {
            EntityType::Server => &mut self.servers,
            EntityType::Agent => &mut self.agents,
            EntityType::Skill => &mut self.skills,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Get-Forecast for a City!"),
            vec!["get", "forecast", "for", "city"]
        );
        assert!(tokenize("a b c").is_empty());
    }

    #[test]
    fn test_search_request_builder() {
        let request = SearchRequest::new("weather")
            .with_entity_type(EntityType::Agent)
            .with_entity_type(EntityType::Agent)
            .with_max_results(500)
            .enabled_only(true);

        assert_eq!(request.entity_types, vec![EntityType::Agent]);
        assert_eq!(request.max_results, MAX_RESULTS_LIMIT);
        assert_eq!(request.over_fetch(), 2 * MAX_RESULTS_LIMIT);
        assert!(request.enabled_only);
        assert_eq!(request.requested_types(), vec![EntityType::Agent]);
    }

    #[test]
    fn test_all_types_when_unfiltered() {
        let request = SearchRequest::new("weather");
        assert_eq!(request.requested_types(), EntityType::ALL.to_vec());
        assert!(SearchRequest::new("   ").tokens().is_empty());
        assert!(SearchRequest::new("   ").is_blank());
    }

    #[test]
    fn test_limit_clamps_direct_field() {
        let mut request = SearchRequest::new("x");
        request.max_results = 0;
        assert_eq!(request.limit(), 1);
    }
}
