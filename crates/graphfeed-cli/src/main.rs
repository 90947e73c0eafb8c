mod config;
mod settings_file;

use clap::Parser;
use config::Config;
use graphfeed_core::{AutoRunOutcome, Graphfeed, MemoryGraph, MemoryPalette, NodeKey};
use graphfeed_reddit::RedditSource;
use settings_file::JsonFileSettings;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::parse();
    info!("Starting graphfeed v{}", env!("CARGO_PKG_VERSION"));
    info!("Settings: {:?}", config.settings_file);

    let backend = Arc::new(JsonFileSettings::open(config.settings_file.clone())?);

    // Seed an in-memory outline with today's day node so resolution has a
    // search node to land on.
    let graph = Arc::new(MemoryGraph::new());
    let today = chrono::Local::now();
    let day_key = NodeKey::new(today.format("%m-%d-%Y").to_string());
    graph.add_root(day_key.as_str(), today.format("%B %-d, %Y").to_string());
    graph.set_today_key(day_key);

    let feed = Graphfeed::new(
        graph.clone(),
        backend,
        Arc::new(MemoryPalette::new()),
        Arc::new(RedditSource::new()),
    );

    // load() reconciles settings and fires the gated automatic run.
    let outcome = feed.load().await?;

    if let Some(source) = &config.source {
        let ok = feed.run_single_source(source).await;
        info!(source, ok, "single-source run finished");
    } else if !config.auto && !matches!(outcome, AutoRunOutcome::Ran { .. }) {
        // The load-time automatic run may already have inserted everything.
        let ok = feed.run_all_sources().await;
        info!(ok, "all-sources run finished");
    }

    println!("{}", graph.outline());

    feed.unload().await;
    Ok(())
}
