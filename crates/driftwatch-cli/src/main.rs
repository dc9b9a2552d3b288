mod collect;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use driftwatch_db::PoolConfig;

#[derive(Debug, Parser)]
#[command(name = "driftwatch")]
#[command(about = "Marketplace listing collection and drift tracking")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run collection jobs from the jobs file
    Collect(collect::CollectArgs),
    /// Recompute diffs for an existing run
    Diff {
        #[arg(long)]
        run_id: Uuid,
    },
    /// Export a run with its snapshots and diffs as a JSON document
    Export {
        #[arg(long)]
        run_id: Uuid,
        /// Output path; prints to stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List recent runs
    Runs {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show a run's best-scored products
    Opportunities {
        #[arg(long)]
        run_id: Uuid,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = driftwatch_core::load_app_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let cli = Cli::parse();

    // The collect command connects on its own, after its dry-run exit; a
    // preview must not require a reachable database.
    match cli.command {
        Commands::Collect(args) => collect::run_collect(&config, &args).await,
        Commands::Diff { run_id } => {
            let pool = init_pool(&config).await?;
            report::run_diff(&pool, run_id).await
        }
        Commands::Export { run_id, out } => {
            let pool = init_pool(&config).await?;
            report::run_export(&pool, run_id, out.as_deref()).await
        }
        Commands::Runs { limit } => {
            let pool = init_pool(&config).await?;
            report::run_list(&pool, limit).await
        }
        Commands::Opportunities { run_id, limit } => {
            let pool = init_pool(&config).await?;
            report::run_opportunities(&pool, run_id, limit).await
        }
    }
}

/// Connects the Postgres pool and brings the schema up to date.
pub(crate) async fn init_pool(config: &driftwatch_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool =
        driftwatch_db::connect_pool(&config.database_url, PoolConfig::from_app_config(config))
            .await?;
    let applied = driftwatch_db::run_migrations(&pool).await?;
    if applied > 0 {
        tracing::info!(applied, "applied pending migrations");
    }
    Ok(pool)
}

/// Marks a run as failed, logging instead of propagating if even that write
/// fails. Used on error paths where the original error matters more.
pub(crate) async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: Uuid, reason: String) {
    let summary = serde_json::json!({ "failures": [reason] });
    if let Err(e) = driftwatch_db::fail_run(pool, run_id, &summary).await {
        tracing::error!(%run_id, error = %e, "failed to mark run as failed");
    }
}
