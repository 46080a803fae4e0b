//! Index documents and index families

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use switchboard_core::{document_id, normalize_path, Entity, EntityType, NestedSummary};

use crate::error::{SearchError, SearchResult};

/// Logical index families. Physical names add prefix and namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFamily {
    Servers,
    Agents,
    Skills,
    Scopes,
    SecurityScans,
    FederationConfig,
}

impl IndexFamily {
    pub const ALL: [IndexFamily; 6] = [
        IndexFamily::Servers,
        IndexFamily::Agents,
        IndexFamily::Skills,
        IndexFamily::Scopes,
        IndexFamily::SecurityScans,
        IndexFamily::FederationConfig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Servers => "servers",
            Self::Agents => "agents",
            Self::Skills => "skills",
            Self::Scopes => "scopes",
            Self::SecurityScans => "security-scans",
            Self::FederationConfig => "federation-config",
        }
    }

    pub fn for_entity(entity_type: EntityType) -> Self {
        match entity_type {
            EntityType::Server => Self::Servers,
            EntityType::Agent => Self::Agents,
            EntityType::Skill => Self::Skills,
        }
    }
}

/// One indexed entity, as stored by either backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub entity_type: EntityType,
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_enabled: bool,
    pub text_for_embedding: String,

    /// Absent when the document was written keyword-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    #[serde(default)]
    pub nested_summaries: Vec<NestedSummary>,

    /// Snapshot of the entity as indexed
    #[serde(default)]
    pub metadata: Value,

    pub indexed_at: DateTime<Utc>,
}

impl IndexDocument {
    /// Build a document without an embedding. The path is normalized.
    pub fn from_entity(entity: &Entity, is_enabled: bool) -> SearchResult<Self> {
        let path = normalize_path(&entity.path)?;
        let mut snapshot = serde_json::to_value(entity)?;
        if let Some(obj) = snapshot.as_object_mut() {
            obj.insert("is_enabled".to_string(), Value::Bool(is_enabled));
        }
        Ok(Self {
            entity_type: entity.entity_type(),
            path,
            name: entity.name.clone(),
            description: entity.description.clone(),
            tags: entity.tags.clone(),
            is_enabled,
            text_for_embedding: entity.text_for_embedding(),
            embedding: None,
            nested_summaries: entity.nested_summaries(),
            metadata: snapshot,
            indexed_at: Utc::now(),
        })
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn id(&self) -> String {
        document_id(&self.path)
    }

    /// Reject embeddings whose length differs from the deployment dimension
    pub fn check_dimension(&self, expected: usize) -> SearchResult<()> {
        match &self.embedding {
            Some(embedding) if embedding.len() != expected => Err(SearchError::Indexing(format!(
                "embedding for {} has dimension {} but the index expects {}",
                self.path,
                embedding.len(),
                expected
            ))),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_from_entity() {
        let entity = Entity::server("/weather", "Weather Service")
            .with_tag("weather")
            .with_tool("get_forecast", "Forecast");

        let doc = IndexDocument::from_entity(&entity, false).unwrap();
        assert_eq!(doc.entity_type, EntityType::Server);
        assert!(!doc.is_enabled);
        assert_eq!(doc.metadata["is_enabled"], Value::Bool(false));
        assert_eq!(doc.nested_summaries.len(), 1);
        assert_eq!(doc.id(), "weather");
        assert!(doc.embedding.is_none());
    }

    #[test]
    fn test_trailing_slash_shares_identity() {
        let a = IndexDocument::from_entity(&Entity::server("/weather/", "W"), true).unwrap();
        let b = IndexDocument::from_entity(&Entity::server("weather", "W"), true).unwrap();
        assert_eq!(a.path, "/weather");
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_wire_field_names() {
        let entity = Entity::agent("/travel", "Travel");
        let doc = IndexDocument::from_entity(&entity, true)
            .unwrap()
            .with_embedding(vec![0.5, 0.5]);
        let json = serde_json::to_value(&doc).unwrap();
        for field in [
            "entity_type",
            "path",
            "name",
            "description",
            "tags",
            "is_enabled",
            "text_for_embedding",
            "embedding",
            "nested_summaries",
            "metadata",
            "indexed_at",
        ] {
            assert!(json.get(field).is_some(), "missing field {}", field);
        }
        assert_eq!(json["entity_type"], "agent");
    }

    #[test]
    fn test_check_dimension() {
        let doc = IndexDocument::from_entity(&Entity::skill("/s", "S"), true)
            .unwrap()
            .with_embedding(vec![1.0; 3]);
        assert!(doc.check_dimension(3).is_ok());
        assert!(matches!(doc.check_dimension(4), Err(SearchError::Indexing(_))));
    }
}
