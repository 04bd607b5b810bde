//! camsync: bulk recording downloader.
//!
//! Pulls camera recordings out of a blob container into a local tree shaped
//! by a device-to-location mapping sheet, filtered by an inclusive date
//! range. Re-runs are idempotent: a file already present with the remote's
//! size is never fetched again. One worker per device, no shared state
//! between workers beyond the read-only mapping table.

#![warn(clippy::all)]

mod cli;
mod config;
mod mapping;
mod probe;
mod report;
mod shutdown;
mod store;
mod sync;
mod types;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use probe::FfprobeProbe;
use report::InventoryReporter;
use store::{AzureBlobStore, ObjectStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = config::Config::from_cli(cli)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .init();
    tracing::info!(
        concurrency = config.concurrency,
        start = %config.date_range.start,
        end = %config.date_range.end,
        "Starting camsync"
    );

    // Mapping and device list load fully before any worker starts; a
    // missing or malformed sheet aborts the whole run here.
    let mapping = Arc::new(mapping::MappingTable::load(&config.mapping_path)?);
    if mapping.is_empty() {
        anyhow::bail!("Mapping table {} has no rows", config.mapping_path.display());
    }
    tracing::info!(devices = mapping.len(), "Loaded mapping table");

    let stream_ids = match &config.devices_path {
        Some(path) => mapping::load_device_list(path)?,
        None => mapping.stream_ids(),
    };
    if stream_ids.is_empty() {
        anyhow::bail!("No devices to sync");
    }

    let store: Arc<dyn ObjectStore> = Arc::new(AzureBlobStore::new(
        config.endpoint.clone(),
        config.container.clone(),
        config.sas_token.clone(),
    ));

    let reporter = config.report.then(|| {
        Arc::new(InventoryReporter::new(Arc::new(FfprobeProbe::new(
            config.ffprobe_path.clone(),
        ))))
    });

    let sync_config = sync::SyncConfig {
        directory: config.directory.clone(),
        remote_prefix: config.remote_prefix.clone(),
        date_range: config.date_range,
        concurrency: config.concurrency as usize,
        dry_run: config.dry_run,
        no_progress_bar: config.no_progress_bar,
    };

    let shutdown_token = shutdown::install_signal_handler();

    let summary = sync::sync_fleet(
        store,
        mapping,
        &stream_ids,
        &sync_config,
        reporter,
        shutdown_token,
    )
    .await;

    let totals = summary.totals();
    tracing::info!("── Summary ──");
    tracing::info!(
        "  {} devices completed, {} failed",
        summary.outcomes.len(),
        summary.failures.len()
    );
    tracing::info!(
        "  {} downloaded, {} already present, {} outside range, {} object errors",
        totals.downloaded,
        totals.skipped_existing,
        totals.skipped_out_of_range,
        totals.object_errors
    );

    if !summary.failures.is_empty() {
        for (stream_id, error) in &summary.failures {
            tracing::error!("Device {} failed: {:#}", stream_id, error);
        }
        anyhow::bail!(
            "{} of {} devices failed",
            summary.failures.len(),
            stream_ids.len()
        );
    }

    Ok(())
}
