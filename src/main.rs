//! Results Aggregator - per-job assessment results over HTTP
//!
//! Joins candidate records from a MongoDB document store with test
//! results from a Supabase table store and serves per-job summaries.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Startup or runtime error (bad arguments, missing configuration,
//!       store failure during `dump`)

mod aggregation;
mod cli;
mod config;
mod models;
mod server;
mod store;

use aggregation::ResultsAggregator;
use anyhow::{Context, Result};
use cli::{Args, Command};
use config::Config;
use models::RecruiterFilter;
use std::path::Path;
use std::sync::Arc;
use store::{MongoStore, SupabaseStore};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Environment first so clap's env fallbacks see .env values
    if let Err(e) = dotenv::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: failed to load .env: {}", e);
        }
    }

    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Some(Command::InitConfig { ref output }) = args.command {
        return handle_init_config(output);
    }

    init_logging(&args);

    info!("Results Aggregator v{}", env!("CARGO_PKG_VERSION"));
    debug!("Command: {:?}", args.command());

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: write a default configuration file.
fn handle_init_config(path: &Path) -> Result<()> {
    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            path.display()
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Created {} with default settings.", path.display());
    println!("Store credentials can stay in the environment (MONGO_URL, SUPABASE_URL, SUPABASE_SERVICE_ROLE_KEY).");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let aggregator = build_aggregator(&config).await?;

    match args.command() {
        Command::Serve => {
            let addr = config.bind_addr()?;
            let state = server::AppState {
                aggregator: Arc::new(aggregator),
            };
            let app = server::router(state, config.server.cors);
            server::serve(app, addr).await
        }
        Command::Dump {
            recruiter_id,
            recruiter_email,
            compact,
        } => {
            let filter =
                RecruiterFilter::from_parts(recruiter_id.as_deref(), recruiter_email.as_deref());
            let summaries = aggregator
                .aggregate(filter.as_ref())
                .await
                .context("Aggregation failed")?;

            let output = if compact {
                serde_json::to_string(&summaries)?
            } else {
                serde_json::to_string_pretty(&summaries)?
            };
            println!("{}", output);
            Ok(())
        }
        Command::InitConfig { .. } => Ok(()),
    }
}

/// Construct the store clients once; they live for the whole process.
async fn build_aggregator(config: &Config) -> Result<ResultsAggregator> {
    let mongo = MongoStore::connect(&config.mongo)
        .await
        .context("Failed to set up document store client")?;
    let supabase =
        SupabaseStore::new(&config.supabase).context("Failed to set up table store client")?;

    Ok(ResultsAggregator::new(Arc::new(mongo), Arc::new(supabase)))
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
