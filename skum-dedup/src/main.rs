//! skum-dedup - duplicate business key reconciliation
//!
//! Opens the configured database, reconciles the payload column across rows
//! sharing a business key, prints before/after counts and one line per group,
//! and closes the connection on every exit path.

use anyhow::{Context, Result};
use clap::Parser;
use skum_common::config::{load_config, resolve_database_path, ConfigSource};
use skum_dedup::{
    apply_plan, plan_groups, FailurePolicy, PipelineError, PipelineReport, ReconcileOptions,
    SqliteStore, TableSpec,
};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for skum-dedup
#[derive(Parser, Debug)]
#[command(name = "skum-dedup")]
#[command(about = "Reconcile payload values across rows sharing a business key")]
#[command(version)]
struct Args {
    /// SQLite database file (overrides SKUM_DATABASE and the config file)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "SKUM_CONFIG")]
    config: Option<PathBuf>,

    /// Table holding the duplicate rows
    #[arg(long)]
    table: Option<String>,

    /// Business key column
    #[arg(long)]
    key_column: Option<String>,

    /// Column overwritten with the canonical value
    #[arg(long)]
    payload_column: Option<String>,

    /// Report planned writes without changing the database
    #[arg(long)]
    dry_run: bool,

    /// Keep reconciling later groups after a failed write
    #[arg(long)]
    keep_going: bool,

    /// Log level when RUST_LOG is not set (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing so its log level can apply
    let config = load_config(args.config.as_deref());

    let level = args
        .log_level
        .clone()
        .or_else(|| config.as_ref().ok().map(|(c, _)| c.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "Starting skum-dedup v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let (mut config, config_source) = config.context("Failed to load configuration")?;
    match &config_source {
        ConfigSource::Explicit(path) => info!("Loaded config from {}", path.display()),
        ConfigSource::Discovered(path) => debug!("Loaded config from {}", path.display()),
        ConfigSource::Defaults => warn!("No config file found, using compiled defaults"),
    }
    if let Some(table) = args.table {
        config.table.name = table;
    }
    if let Some(column) = args.key_column {
        config.table.key_column = column;
    }
    if let Some(column) = args.payload_column {
        config.table.payload_column = column;
    }

    let db_path = resolve_database_path(args.database.as_deref(), &config);
    info!("Database path: {}", db_path.display());

    let spec = TableSpec::try_from(&config.table).context("Invalid table configuration")?;
    let mut store = SqliteStore::connect(&db_path, spec)
        .await
        .context("Failed to open database")?;

    let options = ReconcileOptions {
        failure_policy: if args.keep_going {
            FailurePolicy::Continue
        } else {
            FailurePolicy::Abort
        },
        dry_run: args.dry_run,
    };
    if options.dry_run {
        info!("Dry run: no rows will be changed");
    }

    match store.count_rows().await {
        Ok(total) => info!("{} rows in {}", total, config.table.name),
        Err(e) => warn!("Could not count rows in {}: {}", config.table.name, e),
    }

    let result = dedup(&mut store, &options).await;

    if let Err(e) = store.close().await {
        warn!("Database connection did not close cleanly: {}", e);
    }

    match result {
        Ok(report) => {
            for group in &report.groups {
                println!("{}", group.literal_keys.join(", "));
            }
            println!("Completed");
            Ok(())
        }
        Err(e) => {
            if let PipelineError::Reconcile { source, .. } = &e {
                let completed = source.completed();
                error!(
                    "Stopped after {} groups written ({} rows affected); earlier writes are kept",
                    completed.groups_written,
                    completed.rows_affected()
                );
            }
            Err(e).context("Reconciliation failed")
        }
    }
}

/// Plan, print the counts, then write
///
/// The counts go out before the first write so they survive a failed run.
async fn dedup(
    store: &mut SqliteStore,
    options: &ReconcileOptions,
) -> Result<PipelineReport, PipelineError> {
    let plan = plan_groups(store).await?;
    println!("before count : {}", plan.before_count);
    println!("after count : {}", plan.after_count);
    apply_plan(store, plan, options).await
}
