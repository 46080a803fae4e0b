//! Scope groups: access rules, identity-provider mappings and UI permissions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Which methods and tools of one server a group may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerAccessRule {
    /// Server path or name; `*` matches every server
    pub server: String,

    #[serde(default)]
    pub methods: Vec<String>,

    #[serde(default)]
    pub tools: Vec<String>,
}

impl ServerAccessRule {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            methods: Vec::new(),
            tools: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.methods.push(method.into());
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools.push(tool.into());
        self
    }
}

/// One logical scope group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeGroup {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub server_access: Vec<ServerAccessRule>,

    /// Identity-provider groups mapped onto this scope
    #[serde(default)]
    pub group_mappings: Vec<String>,

    /// UI permission name -> servers or agents it applies to
    #[serde(default)]
    pub ui_permissions: BTreeMap<String, Vec<String>>,
}

impl ScopeGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_access(mut self, rule: ServerAccessRule) -> Self {
        self.server_access.push(rule);
        self
    }

    pub fn with_mapping(mut self, idp_group: impl Into<String>) -> Self {
        self.group_mappings.push(idp_group.into());
        self
    }

    pub fn with_ui_permission(
        mut self,
        permission: impl Into<String>,
        targets: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.ui_permissions
            .insert(permission.into(), targets.into_iter().map(Into::into).collect());
        self
    }

    /// Group names become document ids; restrict them accordingly
    pub fn validate(&self) -> Result<()> {
        let valid = !self.name.is_empty()
            && self.name.len() <= 128
            && self
                .name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.' || c == ':');
        if valid {
            Ok(())
        } else {
            Err(Error::Validation(format!("invalid group name: {:?}", self.name)))
        }
    }
}
