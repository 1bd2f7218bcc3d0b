use std::path::PathBuf;

use anyhow::Result;
use shopfeed::{
    config::Config,
    error::ExtractorError,
    schema::SchemaState,
    sync::{dates, TableSync},
};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) run, mapping user errors to a distinct exit code ─────────
    match run().await {
        Ok(()) => {}
        Err(err) => {
            error!("{err:#}");
            let user_actionable = err
                .downcast_ref::<ExtractorError>()
                .map(ExtractorError::is_user_error)
                .unwrap_or(false);
            std::process::exit(if user_actionable { 1 } else { 2 });
        }
    }
}

async fn run() -> Result<()> {
    // data dir layout: config.json, in/state.json, out/state.json, out/tables/
    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"));

    let config = Config::load(&data_dir.join("config.json"))?;
    let prior = SchemaState::load(&data_dir.join("in").join("state.json"))?;
    info!(tables = prior.len(), "loaded prior schema state");

    let chunks = dates::plan_chunks(
        config.date_since(),
        config.date_to(),
        config.loading_options.backfill_mode,
        config.loading_options.chunk_size_days,
    )?;
    info!(chunks = chunks.len(), "planned date range");

    let out_tables = data_dir.join("out").join("tables");
    let mut sync = TableSync::new(&config, prior, out_tables);
    for chunk in &chunks {
        sync.run_chunk(chunk).await?;
    }

    let snapshot = sync.finalize()?;
    snapshot.save(&data_dir.join("out").join("state.json"))?;
    info!(tables = snapshot.len(), "run complete");
    Ok(())
}
