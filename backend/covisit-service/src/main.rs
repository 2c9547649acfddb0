//! Co-visitation service - batch entry point
//!
//! # Modes
//! - `build-tables`: accumulate and persist the three Top-K tables
//! - `submit`: generate candidate lists for every test session
//! - `all` (default): `build-tables` followed by `submit`

use anyhow::{Context, Result};
use covisit_service::{
    CandidateGenerator, Config, JsonTableStore, JsonlChunkSource, SubmissionJob, TableBuildConfig,
    TableBuildJob,
};
use std::env;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Service run mode
#[derive(Debug, Clone, Copy, PartialEq)]
enum RunMode {
    BuildTables,
    Submit,
    All,
}

impl RunMode {
    fn from_args() -> Self {
        let args: Vec<String> = env::args().collect();

        // Check for --mode argument
        for i in 0..args.len() {
            if args[i] == "--mode" && i + 1 < args.len() {
                return match args[i + 1].as_str() {
                    "build-tables" => RunMode::BuildTables,
                    "submit" => RunMode::Submit,
                    "all" => RunMode::All,
                    _ => {
                        warn!("Unknown mode '{}', using default 'all'", args[i + 1]);
                        RunMode::All
                    }
                };
            }
        }

        RunMode::All
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "covisit_service=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mode = RunMode::from_args();
    info!("Starting covisit-service in {:?} mode", mode);

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    info!(
        train = %config.train_chunks_dir.display(),
        test = %config.test_chunks_dir.display(),
        tables = %config.tables_dir.display(),
        top_k = config.top_k,
        "Configuration loaded"
    );

    let store = Arc::new(JsonTableStore::new(config.tables_dir.clone(), config.top_k));

    if matches!(mode, RunMode::BuildTables | RunMode::All) {
        run_build_tables(&config, store.clone()).await?;
    }
    if matches!(mode, RunMode::Submit | RunMode::All) {
        run_submit(&config, store).await?;
    }

    Ok(())
}

async fn run_build_tables(config: &Config, store: Arc<JsonTableStore>) -> Result<()> {
    let chunks = Arc::new(JsonlChunkSource::new(config.train_chunks_dir.clone()));
    let job = TableBuildJob::new(TableBuildConfig::from_config(config), chunks, store);

    let report = job.run().await;
    for stats in &report.built {
        info!(
            kind = %stats.kind,
            skipped = stats.skipped_existing,
            sessions = stats.accumulation.sessions_seen,
            rows = stats.compaction.rows,
            duration_ms = stats.duration_ms,
            "Table ready"
        );
    }

    if !report.is_success() {
        for (kind, reason) in &report.failed {
            error!(kind = %kind, reason = %reason, "Table was not built");
        }
        anyhow::bail!("{} of 3 tables failed to build", report.failed.len());
    }
    Ok(())
}

async fn run_submit(config: &Config, store: Arc<JsonTableStore>) -> Result<()> {
    let generator = CandidateGenerator::from_store(store.as_ref(), config.candidate_limit)
        .await
        .context("Failed to load co-visitation tables")?;

    let chunks = Arc::new(JsonlChunkSource::new(config.test_chunks_dir.clone()));
    let job = SubmissionJob::new(Arc::new(generator), chunks).with_concurrency(config.build_workers);

    let stats = job
        .write_to_path(&config.submission_path)
        .await
        .context("Submission job failed")?;

    if stats.chunks_malformed > 0 {
        warn!(
            malformed = stats.chunks_malformed,
            "Some test chunks were skipped"
        );
    }
    info!(
        sessions = stats.sessions,
        duration_ms = stats.duration_ms,
        "Submission completed"
    );
    Ok(())
}
