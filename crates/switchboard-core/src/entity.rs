//! Registry entity types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Kind of callable entity held by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Server,
    Agent,
    Skill,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [EntityType::Server, EntityType::Agent, EntityType::Skill];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Agent => "agent",
            Self::Skill => "skill",
        }
    }

    /// Plural form, used for result buckets and index families
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Server => "servers",
            Self::Agent => "agents",
            Self::Skill => "skills",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "server" | "servers" => Ok(Self::Server),
            "agent" | "agents" => Ok(Self::Agent),
            "skill" | "skills" => Ok(Self::Skill),
            other => Err(Error::UnknownEntityType(other.to_string())),
        }
    }
}

/// A tool exposed by a server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl Tool {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: None,
        }
    }
}

/// A skill advertised by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSkill {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl AgentSkill {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tags: Vec::new(),
        }
    }
}

/// Name and description of an item nested inside an entity
/// (tools of a server, skills of an agent, allowed tools of a skill).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedSummary {
    pub name: String,

    #[serde(default)]
    pub description: String,
}

/// Type-specific part of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity_type", rename_all = "lowercase")]
pub enum EntityKind {
    Server {
        #[serde(default)]
        tools: Vec<Tool>,
    },
    Agent {
        #[serde(default)]
        skills: Vec<AgentSkill>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    Skill {
        #[serde(default)]
        allowed_tools: Vec<String>,
    },
}

impl EntityKind {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Server { .. } => EntityType::Server,
            Self::Agent { .. } => EntityType::Agent,
            Self::Skill { .. } => EntityType::Skill,
        }
    }

    fn empty(entity_type: EntityType) -> Self {
        match entity_type {
            EntityType::Server => Self::Server { tools: Vec::new() },
            EntityType::Agent => Self::Agent {
                skills: Vec::new(),
                url: None,
            },
            EntityType::Skill => Self::Skill {
                allowed_tools: Vec::new(),
            },
        }
    }
}

/// A registered server, agent or skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Primary key, unique per entity type
    pub path: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "default_true")]
    pub is_enabled: bool,

    #[serde(flatten)]
    pub kind: EntityKind,

    /// Arbitrary metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Entity {
    /// Create an enabled entity of the given type with no nested items
    pub fn new(entity_type: EntityType, path: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            path: path.into(),
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            is_enabled: true,
            kind: EntityKind::empty(entity_type),
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn server(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(EntityType::Server, path, name)
    }

    pub fn agent(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(EntityType::Agent, path, name)
    }

    pub fn skill(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(EntityType::Skill, path, name)
    }

    pub fn entity_type(&self) -> EntityType {
        self.kind.entity_type()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.is_enabled = enabled;
        self
    }

    /// Add a tool. Ignored unless this is a server.
    pub fn with_tool(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        if let EntityKind::Server { tools } = &mut self.kind {
            tools.push(Tool::new(name, description));
        }
        self
    }

    /// Add a skill. Ignored unless this is an agent.
    pub fn with_skill(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        if let EntityKind::Agent { skills, .. } = &mut self.kind {
            skills.push(AgentSkill::new(name, description));
        }
        self
    }

    pub fn tools(&self) -> &[Tool] {
        match &self.kind {
            EntityKind::Server { tools } => tools,
            _ => &[],
        }
    }

    /// Nested items flattened to name/description pairs
    pub fn nested_summaries(&self) -> Vec<NestedSummary> {
        match &self.kind {
            EntityKind::Server { tools } => tools
                .iter()
                .map(|t| NestedSummary {
                    name: t.name.clone(),
                    description: t.description.clone(),
                })
                .collect(),
            EntityKind::Agent { skills, .. } => skills
                .iter()
                .map(|s| NestedSummary {
                    name: s.name.clone(),
                    description: s.description.clone(),
                })
                .collect(),
            EntityKind::Skill { allowed_tools } => allowed_tools
                .iter()
                .map(|t| NestedSummary {
                    name: t.clone(),
                    description: String::new(),
                })
                .collect(),
        }
    }

    /// Text used both for keyword indexing and as embedding input.
    ///
    /// Name, description, tags, then one line per nested item.
    pub fn text_for_embedding(&self) -> String {
        let mut parts = vec![self.name.clone(), self.description.clone()];
        if !self.tags.is_empty() {
            parts.push(self.tags.join(" "));
        }
        for nested in self.nested_summaries() {
            if nested.description.is_empty() {
                parts.push(nested.name);
            } else {
                parts.push(format!("{}: {}", nested.name, nested.description));
            }
        }
        parts.retain(|p| !p.trim().is_empty());
        parts.join("\n")
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_creation() {
        let entity = Entity::server("/weather", "Weather Service");

        assert_eq!(entity.entity_type(), EntityType::Server);
        assert_eq!(entity.path, "/weather");
        assert!(entity.is_enabled);
        assert!(entity.tools().is_empty());
    }

    #[test]
    fn test_text_for_embedding_includes_nested_items() {
        let entity = Entity::server("/weather", "Weather Service")
            .with_description("Forecasts and alerts")
            .with_tag("weather")
            .with_tag("api")
            .with_tool("get_forecast", "Daily forecast for a city");

        let text = entity.text_for_embedding();
        assert!(text.starts_with("Weather Service\nForecasts and alerts"));
        assert!(text.contains("weather api"));
        assert!(text.contains("get_forecast: Daily forecast for a city"));
    }

    #[test]
    fn test_with_tool_ignored_on_agent() {
        let agent = Entity::agent("/travel", "Travel Agent")
            .with_tool("book", "ignored")
            .with_skill("book_flight", "Books flights");

        assert!(agent.tools().is_empty());
        assert_eq!(agent.nested_summaries().len(), 1);
        assert_eq!(agent.nested_summaries()[0].name, "book_flight");
    }

    #[test]
    fn test_serde_tagged_by_entity_type() {
        let entity = Entity::agent("/travel", "Travel Agent").with_skill("book_flight", "");
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["entity_type"], "agent");
        assert_eq!(json["skills"][0]["name"], "book_flight");

        let back: Entity = serde_json::from_value(json).unwrap();
        assert_eq!(back.entity_type(), EntityType::Agent);
    }

    #[test]
    fn test_entity_type_parsing() {
        assert_eq!("servers".parse::<EntityType>().unwrap(), EntityType::Server);
        assert_eq!("Agent".parse::<EntityType>().unwrap(), EntityType::Agent);
        assert!("widget".parse::<EntityType>().is_err());
    }
}
