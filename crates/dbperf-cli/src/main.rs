#![doc = include_str!("../README.md")]

mod bench;

use bench::config::{BenchConfig, CliArgs};
use bench::runner;
use bench::telemetry::init_telemetry;
use clap::Parser;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = BenchConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let outcome = runner::run(&config)?;
    tracing::debug!("outcome: {outcome:?}");
    Ok(())
}

fn log_startup_info(config: &BenchConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting {:?} benchmark with full config: {:#?}", config.benchmark, config);
    } else {
        tracing::info!(
            "Starting {:?} benchmark on {:?} backend: instance {}/{}, {} workers, {} levels",
            config.benchmark,
            config.backend,
            config.run.instance_id,
            config.run.instance_count,
            config.run.workers,
            config.hierarchy.level_count
        );
    }
}
