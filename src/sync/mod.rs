//! Sync engine: one independent worker per device over a bounded pool.
//!
//! Devices are fully isolated units of work: each owns a disjoint subtree of
//! the destination filesystem, so workers share nothing but the read-only
//! mapping table. A worker that fails outright (unknown device, listing
//! error) is collected into the fleet summary without cancelling or
//! affecting its siblings.

pub mod decision;
pub mod paths;
pub mod timestamp;

use std::collections::HashSet;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use futures_util::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use crate::mapping::MappingTable;
use crate::report::InventoryReporter;
use crate::store::ObjectStore;
use crate::types::DateRange;
use decision::{DownloadReason, SyncDecision};

/// Subset of application config consumed by the sync engine.
/// Decoupled from CLI parsing so the engine can be tested independently.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub directory: PathBuf,
    pub remote_prefix: String,
    pub date_range: DateRange,
    pub concurrency: usize,
    pub dry_run: bool,
    pub no_progress_bar: bool,
}

/// Per-device tallies for the run summary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeviceOutcome {
    pub downloaded: u64,
    pub skipped_existing: u64,
    pub skipped_out_of_range: u64,
    pub object_errors: u64,
}

/// Joined results of a whole fleet run. Worker failures are collected, not
/// propagated; one device cannot abort another's sync.
#[derive(Debug)]
pub struct FleetSummary {
    pub outcomes: Vec<(String, DeviceOutcome)>,
    pub failures: Vec<(String, anyhow::Error)>,
}

impl FleetSummary {
    pub fn totals(&self) -> DeviceOutcome {
        let mut totals = DeviceOutcome::default();
        for (_, outcome) in &self.outcomes {
            totals.downloaded += outcome.downloaded;
            totals.skipped_existing += outcome.skipped_existing;
            totals.skipped_out_of_range += outcome.skipped_out_of_range;
            totals.object_errors += outcome.object_errors;
        }
        totals
    }
}

/// Sync one device end-to-end: resolve its mapping row, list its remote
/// namespace, then walk the listing deciding per object. Single-object
/// failures (malformed name, transfer error) are logged and counted; the
/// worker always reaches completion unless listing itself fails.
pub async fn sync_device(
    store: &dyn ObjectStore,
    mapping: &MappingTable,
    stream_id: &str,
    config: &SyncConfig,
    reporter: Option<&InventoryReporter>,
    shutdown: &CancellationToken,
) -> Result<DeviceOutcome> {
    tracing::info!(device = stream_id, "Processing device");

    let row = mapping.resolve(stream_id)?;
    let device_dir = paths::device_dir(&config.directory, row);
    if !config.dry_run {
        tokio::fs::create_dir_all(&device_dir).await?;
    }

    let prefix = format!("{}/{}/", config.remote_prefix, stream_id);
    let objects = store.list(&prefix).await?;
    tracing::debug!(
        device = stream_id,
        count = objects.len(),
        "Listed remote objects"
    );

    let mut outcome = DeviceOutcome::default();
    // Date folders are created lazily, once per distinct date encountered.
    let mut dates_seen: HashSet<NaiveDate> = HashSet::new();

    for object in &objects {
        if shutdown.is_cancelled() {
            tracing::info!(device = stream_id, "Shutdown requested, stopping device sync");
            break;
        }

        let base_name = paths::object_base_name(&object.name);
        let ts = match timestamp::parse_object_timestamp(base_name) {
            Ok(ts) => ts,
            Err(e) => {
                tracing::error!(device = stream_id, "Skipping object: {}", e);
                outcome.object_errors += 1;
                continue;
            }
        };

        let local_path = paths::local_object_path(&config.directory, row, ts.date(), base_name);
        let local_size = match tokio::fs::metadata(&local_path).await {
            Ok(meta) => Some(meta.len()),
            Err(_) => None,
        };

        match decision::decide(&config.date_range, ts, local_size, object.size) {
            SyncDecision::SkipOutOfRange => {
                tracing::trace!(device = stream_id, object = %object.name, "Outside date range");
                outcome.skipped_out_of_range += 1;
            }
            SyncDecision::SkipExisting => {
                tracing::debug!("Skipped (already exists): {}", local_path.display());
                outcome.skipped_existing += 1;
            }
            SyncDecision::Download(reason) => {
                if config.dry_run {
                    tracing::info!("[DRY RUN] Would download {}", local_path.display());
                    outcome.downloaded += 1;
                    continue;
                }
                if reason == DownloadReason::SizeMismatch {
                    tracing::warn!(
                        "Stale local copy (size differs from remote), re-downloading: {}",
                        local_path.display()
                    );
                }
                if dates_seen.insert(ts.date()) {
                    tokio::fs::create_dir_all(paths::date_dir(&device_dir, ts.date())).await?;
                }
                match store.fetch(&object.name, &local_path).await {
                    Ok(bytes) => {
                        tracing::info!(bytes, "Downloaded {}", local_path.display());
                        outcome.downloaded += 1;
                    }
                    Err(e) => {
                        tracing::error!("Error downloading {}: {}", object.name, e);
                        outcome.object_errors += 1;
                    }
                }
            }
        }
    }

    if let Some(reporter) = reporter {
        if !config.dry_run && !shutdown.is_cancelled() {
            // Inventory is informational; its failure does not fail a
            // device whose downloads succeeded.
            if let Err(e) = reporter.report_device(&device_dir, row).await {
                tracing::warn!(device = stream_id, "Inventory report failed: {:#}", e);
            }
        }
    }

    tracing::info!(
        device = stream_id,
        downloaded = outcome.downloaded,
        skipped_existing = outcome.skipped_existing,
        errors = outcome.object_errors,
        "Completed device"
    );
    Ok(outcome)
}

/// Run the whole fleet: one worker per stream id, at most
/// `config.concurrency` in flight, joined without short-circuiting.
pub async fn sync_fleet(
    store: Arc<dyn ObjectStore>,
    mapping: Arc<MappingTable>,
    stream_ids: &[String],
    config: &SyncConfig,
    reporter: Option<Arc<InventoryReporter>>,
    shutdown: CancellationToken,
) -> FleetSummary {
    let pb = create_progress_bar(config.no_progress_bar, stream_ids.len() as u64);

    let mut results = stream::iter(stream_ids)
        .map(|stream_id| {
            let store = store.clone();
            let mapping = mapping.clone();
            let reporter = reporter.clone();
            let shutdown = shutdown.clone();
            async move {
                let result = sync_device(
                    store.as_ref(),
                    &mapping,
                    stream_id,
                    config,
                    reporter.as_deref(),
                    &shutdown,
                )
                .await;
                (stream_id.clone(), result)
            }
        })
        .buffer_unordered(config.concurrency.max(1));

    let mut outcomes = Vec::new();
    let mut failures = Vec::new();

    while let Some((stream_id, result)) = results.next().await {
        pb.set_message(stream_id.clone());
        match result {
            Ok(outcome) => outcomes.push((stream_id, outcome)),
            Err(e) => {
                pb.suspend(|| tracing::error!("Device {} failed: {:#}", stream_id, e));
                failures.push((stream_id, e));
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    FleetSummary { outcomes, failures }
}

/// Create a progress bar with a consistent template.
///
/// Returns `ProgressBar::hidden()` when the user passed `--no-progress-bar`
/// or stdout is not a TTY (piped output, cron jobs).
fn create_progress_bar(no_progress_bar: bool, total: u64) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} devices ({eta}) {msg}",
        )
        .expect("valid template")
        .progress_chars("=> "),
    );
    pb
}
