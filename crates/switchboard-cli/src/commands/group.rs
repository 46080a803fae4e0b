//! Scope group commands

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};

use crate::output::{group_detail, to_json, OutputFormat};
use crate::{AppContext, Cli};
use switchboard_core::ScopeGroup;
use switchboard_search::GroupRepository;

#[derive(Args)]
pub struct GroupArgs {
    #[command(subcommand)]
    pub command: GroupCommands,
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// Import groups from a JSON file holding an array of groups
    Import {
        file: PathBuf,
    },
    /// Show one group
    Get {
        name: String,
    },
    /// List groups
    List,
    /// Delete a group
    Delete {
        name: String,
    },
}

pub async fn run(args: &GroupArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    tracing::debug!("Running group command");
    let format = cli.output_format();
    let repo = ctx.registry.repository().await?;

    match &args.command {
        GroupCommands::Import { file } => {
            let raw = std::fs::read_to_string(file)
                .with_context(|| format!("reading {}", file.display()))?;
            let groups: Vec<ScopeGroup> =
                serde_json::from_str(&raw).with_context(|| format!("parsing {}", file.display()))?;

            let report = repo.import_groups(&groups).await?;
            match format {
                OutputFormat::Json => println!("{}", to_json(&report)?),
                OutputFormat::Table => {
                    println!("Imported {} groups, {} failed", report.imported, report.failed);
                    for (name, error) in &report.errors {
                        println!("  {}: {}", name, error);
                    }
                }
            }
        }
        GroupCommands::Get { name } => match repo.get_group(name).await? {
            Some(group) => match format {
                OutputFormat::Json => println!("{}", to_json(&group)?),
                OutputFormat::Table => println!("{}", group_detail(&group)),
            },
            None => anyhow::bail!("Group '{}' not found", name),
        },
        GroupCommands::List => {
            let groups = repo.list_groups().await?;
            match format {
                OutputFormat::Json => println!("{}", to_json(&groups)?),
                OutputFormat::Table if groups.is_empty() => println!("No groups found"),
                OutputFormat::Table => {
                    println!("Groups ({} found):", groups.len());
                    for group in &groups {
                        if group.group_mappings.is_empty() {
                            println!("  {}", group.name);
                        } else {
                            println!("  {} <- {}", group.name, group.group_mappings.join(", "));
                        }
                    }
                }
            }
        }
        GroupCommands::Delete { name } => {
            if repo.delete_group(name).await? {
                println!("Deleted group {}", name);
            } else {
                println!("Group '{}' not found", name);
            }
        }
    }

    Ok(())
}
