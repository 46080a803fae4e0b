//! Search index commands

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::output::{to_json, OutputFormat};
use crate::{AppContext, Cli};
use switchboard_search::{BackendKind, EventCounts, IndexFamily, SearchRepository};
use switchboard_storage::EntityStore;

#[derive(Args)]
pub struct IndexArgs {
    #[command(subcommand)]
    pub command: IndexCommands,
}

#[derive(Subcommand)]
pub enum IndexCommands {
    /// Create indices and the search pipeline
    Init,
    /// Drop the index and rebuild it from the primary store
    Rebuild,
    /// Show backend, document and entity counts
    Status,
    /// Print the physical index names for the current namespace
    Names,
}

#[derive(Serialize)]
struct IndexStatus {
    backend: BackendKind,
    namespace: String,
    documents: usize,
    entities: usize,
    events: EventCounts,
}

pub async fn run(args: &IndexArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    tracing::debug!("Running index command");
    let format = cli.output_format();
    let config = ctx.registry.config()?;

    match &args.command {
        IndexCommands::Init => {
            let repo = ctx.registry.repository().await?;
            repo.initialize().await?;
            println!("Initialized {} search index in namespace {}", repo.kind(), config.namespace);
        }
        IndexCommands::Rebuild => {
            let report = ctx.registry.rebuild_index().await?;
            match format {
                OutputFormat::Json => println!("{}", to_json(&report)?),
                OutputFormat::Table => {
                    println!("Rebuilt index: {} indexed, {} failed", report.indexed, report.failed)
                }
            }
            if report.failed > 0 {
                anyhow::bail!("{} entities could not be indexed", report.failed);
            }
        }
        IndexCommands::Status => {
            let repo = ctx.registry.repository().await?;
            let status = IndexStatus {
                backend: repo.kind(),
                namespace: config.namespace.clone(),
                documents: repo.document_count().await?,
                entities: ctx.registry.store().count().await?,
                events: ctx.registry.events().counts(),
            };
            match format {
                OutputFormat::Json => println!("{}", to_json(&status)?),
                OutputFormat::Table => {
                    println!("Backend:   {}", status.backend);
                    println!("Namespace: {}", status.namespace);
                    println!("Documents: {}", status.documents);
                    println!("Entities:  {}", status.entities);
                    if status.documents != status.entities {
                        println!("Index is out of step with the registry; run 'switchboard index rebuild'");
                    }
                }
            }
        }
        IndexCommands::Names => {
            for family in IndexFamily::ALL {
                println!("{}", config.index_name(family));
            }
        }
    }

    Ok(())
}
