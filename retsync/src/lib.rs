pub mod config;
pub mod error;
pub mod pipeline;

use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use dhemitter::{
    create_property_definition, GmsRestEmitter, MetadataGraph, PropertyDefinition, RetryPolicy,
};
use snowfetcher::{SnowflakeConfig, SnowflakeRestClient, SourceFilter};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{SyncConfig, SyncOptions};
use crate::pipeline::{run_sync, SyncReport};

/// Every table's retention value reached the target.
pub const EXIT_SUCCESS: i32 = 0;
/// The run completed but at least one upsert failed.
pub const EXIT_PARTIAL_FAILURE: i32 = 1;
/// Startup failed (configuration, warehouse session, or target endpoint)
/// before any facts were processed.
pub const EXIT_FATAL: i32 = 2;

/// Runs the command line interface and returns the process exit code.
pub async fn run_cli() -> i32 {
    let cli = Cli::parse();
    match cli.command {
        Command::Sync(args) => {
            init_tracing(args.verbose);
            run_sync_command(args).await
        }
        Command::Bootstrap(args) => {
            init_tracing(args.verbose);
            run_bootstrap_command(args).await
        }
    }
}

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extracts table retention periods from the warehouse and syncs them to
    /// the metadata graph as a structured property
    Sync(SyncArgs),
    /// Registers the retention structured-property definition (run once,
    /// before the first sync)
    Bootstrap(BootstrapArgs),
}

#[derive(Args)]
struct SyncArgs {
    /// Snowflake account identifier
    #[arg(long, env = "SNOWFLAKE_ACCOUNT")]
    snowflake_account: String,
    /// Snowflake username
    #[arg(long, env = "SNOWFLAKE_USER")]
    snowflake_user: String,
    /// Snowflake password
    #[arg(long, env = "SNOWFLAKE_PASSWORD", hide_env_values = true)]
    snowflake_password: String,
    /// Snowflake role (optional)
    #[arg(long, env = "SNOWFLAKE_ROLE")]
    snowflake_role: Option<String>,
    /// Snowflake warehouse (optional)
    #[arg(long, env = "SNOWFLAKE_WAREHOUSE")]
    snowflake_warehouse: Option<String>,
    /// Metadata-graph GMS endpoint, e.g. https://your-instance.acryl.io/gms
    #[arg(long, env = "DATAHUB_GMS_URL")]
    datahub_url: String,
    /// Metadata-graph API token
    #[arg(long, env = "DATAHUB_TOKEN", hide_env_values = true)]
    datahub_token: String,
    /// Environment fabric baked into dataset URNs
    #[arg(long, env = "DATAHUB_ENV", default_value = "PROD")]
    datahub_env: String,
    /// Comma-separated allow-list of database names
    #[arg(long, env = "DATABASE_FILTER")]
    database_filter: Option<String>,
    /// Comma-separated allow-list of schema names
    #[arg(long, env = "SCHEMA_FILTER")]
    schema_filter: Option<String>,
    /// Extract and report without writing to the metadata graph
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Cap on concurrent upsert calls to the metadata graph
    #[arg(long, default_value_t = 8)]
    max_in_flight: usize,
    /// Attempts per upsert for transient failures
    #[arg(long, default_value_t = 3)]
    retry_attempts: u32,
    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[derive(Args)]
struct BootstrapArgs {
    /// Metadata-graph GMS endpoint
    #[arg(long, env = "DATAHUB_GMS_URL")]
    datahub_url: String,
    /// Metadata-graph API token
    #[arg(long, env = "DATAHUB_TOKEN", hide_env_values = true)]
    datahub_token: String,
    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .try_init();
}

fn build_config(args: &SyncArgs) -> SyncConfig {
    SyncConfig {
        snowflake: SnowflakeConfig {
            account: args.snowflake_account.clone(),
            user: args.snowflake_user.clone(),
            password: args.snowflake_password.clone(),
            role: args.snowflake_role.clone(),
            warehouse: args.snowflake_warehouse.clone(),
        },
        gms_url: args.datahub_url.clone(),
        gms_token: args.datahub_token.clone(),
        filter: SourceFilter::new(args.database_filter.as_deref(), args.schema_filter.as_deref()),
        options: SyncOptions {
            environment: args.datahub_env.clone(),
            dry_run: args.dry_run,
            max_in_flight: args.max_in_flight,
            retry: RetryPolicy {
                max_attempts: args.retry_attempts,
                ..RetryPolicy::default()
            },
        },
    }
}

async fn run_sync_command(args: SyncArgs) -> i32 {
    let config = build_config(&args);
    if let Err(err) = config.validate() {
        error!("{err}");
        return EXIT_FATAL;
    }

    match execute_sync(&config).await {
        Ok(report) => {
            if report.all_succeeded() {
                EXIT_SUCCESS
            } else {
                EXIT_PARTIAL_FAILURE
            }
        }
        Err(err) => {
            error!("fatal: {err:#}");
            EXIT_FATAL
        }
    }
}

async fn execute_sync(config: &SyncConfig) -> anyhow::Result<SyncReport> {
    let catalog = SnowflakeRestClient::connect(&config.snowflake)
        .await
        .context("failed to open warehouse session")?;

    // The session is logged out on every path, including failures after
    // connect succeeded.
    let result = sync_with_catalog(config, &catalog).await;
    catalog.close().await;
    result
}

async fn sync_with_catalog(
    config: &SyncConfig,
    catalog: &SnowflakeRestClient,
) -> anyhow::Result<SyncReport> {
    let emitter = GmsRestEmitter::new(&config.gms_url, &config.gms_token)
        .context("failed to build metadata-graph client")?;
    if !config.options.dry_run {
        emitter
            .check_connectivity()
            .await
            .context("metadata-graph endpoint unreachable")?;
    }
    let graph: Arc<dyn MetadataGraph> = Arc::new(emitter);

    let report = run_sync(
        catalog,
        graph,
        &config.filter,
        &config.options,
        shutdown_signal(),
    )
    .await?;
    Ok(report)
}

async fn run_bootstrap_command(args: BootstrapArgs) -> i32 {
    match execute_bootstrap(&args).await {
        Ok(()) => {
            info!("bootstrap complete; the sync can now attach retention values");
            EXIT_SUCCESS
        }
        Err(err) => {
            error!("fatal: {err:#}");
            EXIT_FATAL
        }
    }
}

async fn execute_bootstrap(args: &BootstrapArgs) -> anyhow::Result<()> {
    let emitter = GmsRestEmitter::new(&args.datahub_url, &args.datahub_token)
        .context("failed to build metadata-graph client")?;
    emitter
        .check_connectivity()
        .await
        .context("metadata-graph endpoint unreachable")?;

    create_property_definition(&emitter, &PropertyDefinition::retention_days())
        .await
        .context("failed to register property definition")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("shutdown signal received");
}
