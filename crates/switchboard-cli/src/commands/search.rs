//! Search commands

use clap::Args;

use crate::output::{hit_row, to_json, OutputFormat};
use crate::{AppContext, Cli};
use switchboard_core::{EntityType, SearchRequest};
use switchboard_search::SearchRepository;

#[derive(Args)]
pub struct SearchArgs {
    /// Natural language query
    pub query: String,

    /// Restrict to entity types (repeatable; default all)
    #[arg(short = 't', long = "type")]
    pub entity_types: Vec<EntityType>,

    /// Maximum results per type
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Hide disabled entities
    #[arg(short, long)]
    pub enabled_only: bool,
}

pub async fn run(args: &SearchArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    tracing::debug!("Running search: {}", args.query);

    let mut request = SearchRequest::new(args.query.as_str())
        .with_max_results(args.limit)
        .enabled_only(args.enabled_only);
    for entity_type in &args.entity_types {
        request = request.with_entity_type(*entity_type);
    }

    let repo = ctx.registry.repository().await?;
    let results = repo.search(&request).await;

    if cli.output_format() == OutputFormat::Json {
        println!("{}", to_json(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results for '{}'", args.query);
        return Ok(());
    }

    for entity_type in request.requested_types() {
        let hits = results.bucket(entity_type);
        if hits.is_empty() {
            continue;
        }
        println!("{} ({}):", capitalize(entity_type.plural()), hits.len());
        for hit in hits {
            println!("{}", hit_row(hit));
        }
    }

    if !results.tools.is_empty() {
        println!("Tools ({}):", results.tools.len());
        for tool in &results.tools {
            println!(
                "  {:.3}  {} on {}",
                tool.relevance_score, tool.tool_name, tool.server_path
            );
        }
    }

    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
