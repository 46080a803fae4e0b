//! Output formatting utilities

use serde::Serialize;
use switchboard_core::{Entity, EntityHit, ScopeGroup};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Table,
        }
    }
}

/// Pretty JSON for `--format json`
pub fn to_json<T: Serialize>(data: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// One line per entity
pub fn entity_row(entity: &Entity) -> String {
    let state = if entity.is_enabled { "enabled" } else { "disabled" };
    let mut row = format!(
        "{:<6} {:<30} {:<30} {}",
        entity.entity_type().as_str(),
        entity.path,
        truncate(&entity.name, 30),
        state
    );
    if !entity.tags.is_empty() {
        row.push_str(&format!("  [{}]", entity.tags.join(", ")));
    }
    row
}

pub fn entity_detail(entity: &Entity) -> String {
    let mut lines = vec![
        format!("{} {}", entity.entity_type(), entity.path),
        format!("  Name: {}", entity.name),
        format!("  Enabled: {}", entity.is_enabled),
    ];
    if !entity.description.is_empty() {
        lines.push(format!("  Description: {}", entity.description));
    }
    if !entity.tags.is_empty() {
        lines.push(format!("  Tags: {}", entity.tags.join(", ")));
    }
    let nested = entity.nested_summaries();
    if !nested.is_empty() {
        lines.push("  Provides:".to_string());
        for item in nested {
            if item.description.is_empty() {
                lines.push(format!("    - {}", item.name));
            } else {
                lines.push(format!("    - {}: {}", item.name, item.description));
            }
        }
    }
    lines.push(format!("  Updated: {}", entity.updated_at.to_rfc3339()));
    lines.join("\n")
}

pub fn hit_row(hit: &EntityHit) -> String {
    let mut row = format!(
        "  {:.3}  {:<30} {}",
        hit.relevance_score,
        hit.path,
        truncate(&hit.name, 40)
    );
    if !hit.is_enabled {
        row.push_str(" (disabled)");
    }
    row
}

pub fn group_detail(group: &ScopeGroup) -> String {
    let mut lines = vec![format!("Group {}", group.name)];
    if !group.description.is_empty() {
        lines.push(format!("  Description: {}", group.description));
    }
    if !group.group_mappings.is_empty() {
        lines.push(format!("  Mapped from: {}", group.group_mappings.join(", ")));
    }
    for rule in &group.server_access {
        lines.push(format!(
            "  Access {}: methods [{}] tools [{}]",
            rule.server,
            rule.methods.join(", "),
            rule.tools.join(", ")
        ));
    }
    for (permission, targets) in &group.ui_permissions {
        lines.push(format!("  UI {}: {}", permission, targets.join(", ")));
    }
    lines.join("\n")
}
