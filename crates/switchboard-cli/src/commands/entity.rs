//! Entity commands

use clap::{Args, Subcommand};
use serde_json::{Map, Value};

use crate::output::{entity_detail, entity_row, to_json, OutputFormat};
use crate::{AppContext, Cli};
use switchboard_core::{AgentSkill, Entity, EntityKind, EntityType, Tool};
use switchboard_search::EntityPatch;

#[derive(Args)]
pub struct EntityArgs {
    #[command(subcommand)]
    pub command: EntityCommands,
}

#[derive(Subcommand)]
pub enum EntityCommands {
    /// Register a server, agent or skill
    Add {
        /// Entity type: server, agent or skill
        entity_type: EntityType,
        /// Registry path, e.g. /weather
        path: String,
        /// Display name
        name: String,
        /// Description
        #[arg(long)]
        description: Option<String>,
        /// Tags (can be specified multiple times)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Server tool as name or name:description (repeatable)
        #[arg(long = "tool")]
        tools: Vec<String>,
        /// Agent skill as name or name:description (repeatable)
        #[arg(long = "skill")]
        skills: Vec<String>,
        /// Tool a skill may call (repeatable)
        #[arg(long = "allowed-tool")]
        allowed_tools: Vec<String>,
        /// Agent endpoint URL
        #[arg(long)]
        url: Option<String>,
        /// Register without exposing it to enabled-only search
        #[arg(long)]
        disabled: bool,
    },
    /// Update fields of an entity
    Update {
        entity_type: EntityType,
        path: String,
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// Replace tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Replace server tools, name or name:description (repeatable)
        #[arg(long = "tool")]
        tools: Vec<String>,
        /// Replace agent skills, name or name:description (repeatable)
        #[arg(long = "skill")]
        skills: Vec<String>,
        /// Replace tools a skill may call (repeatable)
        #[arg(long = "allowed-tool")]
        allowed_tools: Vec<String>,
        /// Metadata as key=value; an empty value removes the key (repeatable)
        #[arg(short, long = "meta")]
        metadata: Vec<String>,
    },
    /// Delete an entity and its index document
    Delete {
        entity_type: EntityType,
        path: String,
    },
    /// Enable an entity
    Enable {
        entity_type: EntityType,
        path: String,
    },
    /// Disable an entity
    Disable {
        entity_type: EntityType,
        path: String,
    },
    /// Show one entity
    Get {
        entity_type: EntityType,
        path: String,
    },
    /// List entities
    List {
        /// Only this type
        #[arg(short = 't', long = "type")]
        entity_type: Option<EntityType>,
    },
}

/// `name` or `name:description`
fn split_pair(raw: &str) -> (String, String) {
    match raw.split_once(':') {
        Some((name, description)) => (name.trim().to_string(), description.trim().to_string()),
        None => (raw.trim().to_string(), String::new()),
    }
}

fn parse_tools(raw: &[String]) -> Vec<Tool> {
    raw.iter()
        .map(|t| {
            let (name, description) = split_pair(t);
            Tool::new(name, description)
        })
        .collect()
}

fn parse_skills(raw: &[String]) -> Vec<AgentSkill> {
    raw.iter()
        .map(|s| {
            let (name, description) = split_pair(s);
            AgentSkill::new(name, description)
        })
        .collect()
}

fn parse_metadata(raw: &[String]) -> anyhow::Result<Map<String, Value>> {
    let mut metadata = Map::new();
    for pair in raw {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("metadata must be key=value, got {:?}", pair))?;
        let value = if value.is_empty() {
            Value::Null
        } else {
            Value::String(value.to_string())
        };
        metadata.insert(key.trim().to_string(), value);
    }
    Ok(metadata)
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

fn print_entity(entity: &Entity, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(entity)?),
        OutputFormat::Table => println!("{}", entity_detail(entity)),
    }
    Ok(())
}

pub async fn run(args: &EntityArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    tracing::debug!("Running entity command");
    let format = cli.output_format();

    match &args.command {
        EntityCommands::Add {
            entity_type,
            path,
            name,
            description,
            tags,
            tools,
            skills,
            allowed_tools,
            url,
            disabled,
        } => {
            let mut entity = Entity::new(*entity_type, path.as_str(), name.as_str()).with_enabled(!disabled);
            if let Some(description) = description {
                entity = entity.with_description(description.as_str());
            }
            for tag in tags {
                entity = entity.with_tag(tag.as_str());
            }

            match &mut entity.kind {
                EntityKind::Server { tools: nested } if skills.is_empty() && allowed_tools.is_empty() && url.is_none() => {
                    *nested = parse_tools(tools);
                }
                EntityKind::Agent { skills: nested, url: endpoint } if tools.is_empty() && allowed_tools.is_empty() => {
                    *nested = parse_skills(skills);
                    *endpoint = url.clone();
                }
                EntityKind::Skill { allowed_tools: nested } if tools.is_empty() && skills.is_empty() && url.is_none() => {
                    *nested = allowed_tools.clone();
                }
                _ => anyhow::bail!(
                    "--tool applies to servers, --skill and --url to agents, --allowed-tool to skills"
                ),
            }

            let entity = ctx.service.create(entity).await?;
            match format {
                OutputFormat::Json => println!("{}", to_json(&entity)?),
                OutputFormat::Table => println!("Registered {} {}", entity.entity_type(), entity.path),
            }
        }
        EntityCommands::Update {
            entity_type,
            path,
            name,
            description,
            tags,
            tools,
            skills,
            allowed_tools,
            metadata,
        } => {
            let patch = EntityPatch {
                name: name.clone(),
                description: description.clone(),
                tags: non_empty(tags.clone()),
                tools: non_empty(parse_tools(tools)),
                skills: non_empty(parse_skills(skills)),
                allowed_tools: non_empty(allowed_tools.clone()),
                metadata: non_empty(metadata.clone())
                    .map(|m| parse_metadata(&m))
                    .transpose()?,
            };
            if patch.is_empty() {
                println!("No changes specified");
                return Ok(());
            }

            let entity = ctx.service.update(*entity_type, path, patch).await?;
            match format {
                OutputFormat::Json => println!("{}", to_json(&entity)?),
                OutputFormat::Table => println!("Updated {} {}", entity.entity_type(), entity.path),
            }
        }
        EntityCommands::Delete { entity_type, path } => {
            if ctx.service.delete(*entity_type, path).await? {
                println!("Deleted {} {}", entity_type, path);
            } else {
                println!("{} '{}' not found", entity_type, path);
            }
        }
        EntityCommands::Enable { entity_type, path } | EntityCommands::Disable { entity_type, path } => {
            let enabled = matches!(args.command, EntityCommands::Enable { .. });
            let entity = ctx.service.set_enabled(*entity_type, path, enabled).await?;
            match format {
                OutputFormat::Json => println!("{}", to_json(&entity)?),
                OutputFormat::Table => println!(
                    "{} {} {}",
                    if enabled { "Enabled" } else { "Disabled" },
                    entity.entity_type(),
                    entity.path
                ),
            }
        }
        EntityCommands::Get { entity_type, path } => match ctx.service.get(*entity_type, path).await? {
            Some(entity) => print_entity(&entity, format)?,
            None => anyhow::bail!("{} '{}' not found", entity_type, path),
        },
        EntityCommands::List { entity_type } => {
            let entities = ctx.service.list(*entity_type).await?;
            tracing::info!("Found {} entities", entities.len());

            match format {
                OutputFormat::Json => println!("{}", to_json(&entities)?),
                OutputFormat::Table if entities.is_empty() => {
                    println!("No entities found. Register one with 'switchboard entity add'");
                }
                OutputFormat::Table => {
                    println!("Entities ({} found):", entities.len());
                    for entity in &entities {
                        println!("{}", entity_row(entity));
                    }
                }
            }
        }
    }

    Ok(())
}
