//! Inventory reporter.
//!
//! After a device's sync completes, walks its date subfolders and writes one
//! CSV per date: a row per recording (size in MB, duration as HH:MM) plus a
//! trailing totals row. Reports are derived entirely from the local tree and
//! overwritten on every run; they are informational, not state.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::mapping::DeviceMapping;
use crate::probe::{format_hhmm, DurationProbe};
use crate::sync::paths::clean_component;

const MB: f64 = 1024.0 * 1024.0;

pub struct InventoryReporter {
    probe: Arc<dyn DurationProbe>,
}

impl InventoryReporter {
    pub fn new(probe: Arc<dyn DurationProbe>) -> Self {
        Self { probe }
    }

    /// Write one inventory CSV per date subfolder of `device_dir`. Returns
    /// the number of reports written.
    pub async fn report_device(
        &self,
        device_dir: &Path,
        mapping: &DeviceMapping,
    ) -> Result<usize> {
        let mut dates = Vec::new();
        let mut entries = tokio::fs::read_dir(device_dir)
            .await
            .with_context(|| format!("Cannot read device folder {}", device_dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                dates.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        dates.sort();

        for date in &dates {
            self.report_date(&device_dir.join(date), mapping, date)
                .await?;
        }
        Ok(dates.len())
    }

    async fn report_date(
        &self,
        date_dir: &Path,
        mapping: &DeviceMapping,
        date: &str,
    ) -> Result<()> {
        let mut files: Vec<(String, u64)> = Vec::new();
        let mut entries = tokio::fs::read_dir(date_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.to_ascii_lowercase().ends_with(".flv") {
                continue;
            }
            if entry.file_type().await?.is_file() {
                let size = entry.metadata().await?.len();
                files.push((name, size));
            }
        }
        files.sort();

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["Serial No", "File Name", "Size (MB)", "Duration (HH:MM)"])?;

        let mut total_size_mb = 0.0_f64;
        // Totals sum the truncated per-row HH:MM values, so the totals row
        // always agrees with the rows above it.
        let mut total_truncated_secs = 0_u64;

        for (ordinal, (name, size)) in files.iter().enumerate() {
            let path = date_dir.join(name);
            let duration = match self.probe.duration(&path).await {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!("Error probing video file {}: {}", path.display(), e);
                    Duration::ZERO
                }
            };

            let size_mb = *size as f64 / MB;
            total_size_mb += size_mb;
            total_truncated_secs += duration.as_secs() - duration.as_secs() % 60;

            writer.write_record([
                (ordinal + 1).to_string().as_str(),
                name.as_str(),
                format!("{:.2}", size_mb).as_str(),
                format_hhmm(duration).as_str(),
            ])?;
        }

        writer.write_record([
            "Total",
            "",
            format!("{:.2} MB", total_size_mb).as_str(),
            format_hhmm(Duration::from_secs(total_truncated_secs)).as_str(),
        ])?;

        let csv_name = clean_component(&format!(
            "{}_{}_{}_{}_{}_info.csv",
            mapping.region, mapping.subregion, mapping.site, mapping.stream_id, date
        ));
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Cannot finish inventory CSV: {}", e))?;
        tokio::fs::write(date_dir.join(csv_name), bytes).await?;

        Ok(())
    }
}
