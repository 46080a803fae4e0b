//! Scope groups as three documents
//!
//! A group is stored as one document per facet in the scopes index:
//!
//! - `<name>--server-access`: which servers, methods and tools it grants
//! - `<name>--group-mapping`: identity-provider groups mapped onto it
//! - `<name>--ui-permissions`: UI permission targets
//!
//! Every mutation rewrites all three. Readers assemble whatever exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use switchboard_core::{ScopeGroup, ServerAccessRule};

use crate::error::SearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupFacet {
    ServerAccess,
    GroupMapping,
    UiPermissions,
}

impl GroupFacet {
    pub const ALL: [GroupFacet; 3] = [
        GroupFacet::ServerAccess,
        GroupFacet::GroupMapping,
        GroupFacet::UiPermissions,
    ];

    /// Value of the `doc_type` field
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServerAccess => "server_access",
            Self::GroupMapping => "group_mapping",
            Self::UiPermissions => "ui_permissions",
        }
    }

    pub fn document_id(&self, group_name: &str) -> String {
        let suffix = match self {
            Self::ServerAccess => "server-access",
            Self::GroupMapping => "group-mapping",
            Self::UiPermissions => "ui-permissions",
        };
        format!("{}--{}", group_name, suffix)
    }
}

/// One facet document. Only the facet's own payload field is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDocument {
    pub doc_type: GroupFacet,
    pub group_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_access: Option<Vec<ServerAccessRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_mappings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_permissions: Option<BTreeMap<String, Vec<String>>>,
    pub updated_at: DateTime<Utc>,
}

/// Split a group into `(document id, body)` pairs, one per facet
pub fn split_group(group: &ScopeGroup) -> SearchResult<Vec<(String, Value)>> {
    let updated_at = Utc::now();
    GroupFacet::ALL
        .iter()
        .map(|facet| {
            let mut doc = GroupDocument {
                doc_type: *facet,
                group_name: group.name.clone(),
                description: group.description.clone(),
                server_access: None,
                group_mappings: None,
                ui_permissions: None,
                updated_at,
            };
            match facet {
                GroupFacet::ServerAccess => doc.server_access = Some(group.server_access.clone()),
                GroupFacet::GroupMapping => doc.group_mappings = Some(group.group_mappings.clone()),
                GroupFacet::UiPermissions => doc.ui_permissions = Some(group.ui_permissions.clone()),
            }
            Ok((facet.document_id(&group.name), serde_json::to_value(&doc)?))
        })
        .collect()
}

/// Assemble a group from whichever facet documents were found.
///
/// Missing facets default to empty; `None` when all three are missing.
pub fn assemble_group(name: &str, documents: &[Option<Value>]) -> SearchResult<Option<ScopeGroup>> {
    let mut group = ScopeGroup::new(name);
    let mut found = false;

    for value in documents.iter().flatten() {
        let doc: GroupDocument = serde_json::from_value(value.clone())?;
        found = true;
        if group.description.is_empty() {
            group.description = doc.description;
        }
        if let Some(rules) = doc.server_access {
            group.server_access = rules;
        }
        if let Some(mappings) = doc.group_mappings {
            group.group_mappings = mappings;
        }
        if let Some(permissions) = doc.ui_permissions {
            group.ui_permissions = permissions;
        }
    }

    Ok(found.then_some(group))
}

/// Group name of a `group_mapping` document, used to enumerate groups
pub fn mapping_group_name(value: &Value) -> Option<&str> {
    if value.get("doc_type")?.as_str()? != GroupFacet::GroupMapping.as_str() {
        return None;
    }
    value.get("group_name")?.as_str()
}
