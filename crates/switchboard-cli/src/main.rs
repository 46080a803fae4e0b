//! Switchboard CLI - Command line interface for the registry and its search index

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{completions, config as config_cmd, entity, group, index, search};
use config::Config;
use output::OutputFormat;
use switchboard_search::{BackendKind, RegistryService, RepositoryRegistry, SearchConfig};
use switchboard_storage::EntityStore;

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(author, version, about = "Registry of servers, agents and skills with semantic search")]
pub struct Cli {
    /// Data directory
    #[arg(short, long, global = true, env = "SWITCHBOARD_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Config file (default: <config dir>/switchboard/config.toml)
    #[arg(long, global = true, env = "SWITCHBOARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Search backend: embedded or clustered
    #[arg(long, global = true, env = "SWITCHBOARD_SEARCH_BACKEND")]
    pub backend: Option<String>,

    /// Index namespace
    #[arg(long, global = true, env = "SWITCHBOARD_NAMESPACE")]
    pub namespace: Option<String>,

    /// Cluster URL for the clustered backend
    #[arg(long, global = true, env = "SWITCHBOARD_CLUSTER_URL")]
    pub cluster_url: Option<String>,

    /// Output format: table, json
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(config::config_file_path)
    }

    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from(self.format.as_str())
    }

    /// Data directory: flag or env, then config file, then the platform default
    pub fn data_dir(&self, settings: &Config) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(PathBuf::from)
            .or_else(|| settings.data_dir.clone())
            .unwrap_or_else(config::default_data_dir)
    }

    /// Search settings from the config file with command line overrides applied
    pub fn search_config(&self, settings: &Config, data_dir: &std::path::Path) -> anyhow::Result<SearchConfig> {
        let mut search = settings.search.clone();
        if let Some(backend) = &self.backend {
            search.backend = Some(backend.parse::<BackendKind>()?);
        }
        if let Some(namespace) = &self.namespace {
            search.namespace = namespace.clone();
        }
        if let Some(url) = &self.cluster_url {
            search.cluster.url = Some(url.clone());
        }
        if search.data_dir.is_none() {
            search.data_dir = Some(data_dir.to_path_buf());
        }
        search.validate()?;
        Ok(search)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage servers, agents and skills
    Entity(entity::EntityArgs),
    /// Search the registry
    Search(search::SearchArgs),
    /// Manage the search index
    Index(index::IndexArgs),
    /// Manage scope groups
    Group(group::GroupArgs),
    /// Manage configuration
    Config(config_cmd::ConfigArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Application context with the primary store and the search registry
pub struct AppContext {
    pub registry: Arc<RepositoryRegistry>,
    pub service: RegistryService,
}

impl AppContext {
    pub async fn new(cli: &Cli) -> anyhow::Result<Self> {
        let settings = Config::load(&cli.config_path())?;
        let data_dir = cli.data_dir(&settings);
        std::fs::create_dir_all(&data_dir)?;

        let search = cli.search_config(&settings, &data_dir)?;
        tracing::debug!(
            "Search backend {} in namespace {}",
            search.backend_kind(),
            search.namespace
        );

        let store = open_store(&data_dir)?;
        store.initialize().await?;

        let registry = Arc::new(RepositoryRegistry::new(search, store));
        let service = RegistryService::from_registry(Arc::clone(&registry));
        Ok(Self { registry, service })
    }
}

#[cfg(feature = "redb")]
fn open_store(data_dir: &std::path::Path) -> anyhow::Result<Arc<dyn EntityStore>> {
    let db_path = data_dir.join("registry.redb");
    tracing::debug!("Using database at: {:?}", db_path);
    Ok(Arc::new(switchboard_storage::RedbStore::open(&db_path)?))
}

#[cfg(not(feature = "redb"))]
fn open_store(_data_dir: &std::path::Path) -> anyhow::Result<Arc<dyn EntityStore>> {
    tracing::warn!("Built without redb; entities are kept in memory for this run only");
    Ok(Arc::new(switchboard_storage::MemoryStore::new()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting switchboard CLI");

    match &cli.command {
        Commands::Config(args) => config_cmd::run(args, &cli)?,
        Commands::Completions(args) => completions::run(args),
        Commands::Entity(args) => entity::run(args, &cli, &AppContext::new(&cli).await?).await?,
        Commands::Search(args) => search::run(args, &cli, &AppContext::new(&cli).await?).await?,
        Commands::Index(args) => index::run(args, &cli, &AppContext::new(&cli).await?).await?,
        Commands::Group(args) => group::run(args, &cli, &AppContext::new(&cli).await?).await?,
    }

    Ok(())
}
