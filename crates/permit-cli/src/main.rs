use clap::Parser;
use permit_config::PermitConfig;
use permit_core::enums::PipelineStage;
use permit_db::PermitDb;

mod cli;
mod commands;
mod write_lock;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("permitgraph error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let mut config = PermitConfig::load_with_dotenv()?;
    if let Some(db_path) = &cli.db {
        config.database.path.clone_from(db_path);
    }

    // The lock precedes opening the database so a second writer never
    // gets as far as the initial sync.
    let write_lock = if cli.command.requires_write_lock() {
        Some(write_lock::acquire_for_db(&config.database.path).await?)
    } else {
        None
    };

    let db = if config.database.is_synced() {
        PermitDb::open_synced(
            &config.database.path,
            &config.database.url,
            &config.database.auth_token,
        )
        .await?
    } else {
        PermitDb::open_local(&config.database.path).await?
    };

    let result = dispatch(&cli, &db, &config).await;
    drop(write_lock);
    result
}

async fn dispatch(cli: &cli::Cli, db: &PermitDb, config: &PermitConfig) -> anyhow::Result<()> {
    match &cli.command {
        cli::Commands::Resolve => commands::run_stage(db, config, PipelineStage::Resolve).await,
        cli::Commands::Graph => commands::run_stage(db, config, PipelineStage::Graph).await,
        cli::Commands::Anomalies => {
            commands::run_stage(db, config, PipelineStage::Anomalies).await
        }
        cli::Commands::Signals => commands::run_stage(db, config, PipelineStage::Signals).await,
        cli::Commands::Health => commands::run_stage(db, config, PipelineStage::Health).await,
        cli::Commands::Run => commands::run_pipeline(db, config).await,
        cli::Commands::Query(query) => commands::query(db, config, query, cli.json).await,
    }
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("PERMITGRAPH_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
