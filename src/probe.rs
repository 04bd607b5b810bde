//! Video duration probing.
//!
//! Durations come from an external metadata extractor; the reporter treats
//! any probe failure as a zero duration, so a corrupt recording never blocks
//! an inventory run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("ffprobe failed for {path}: {detail}")]
    Ffprobe { path: String, detail: String },

    #[error("Cannot run ffprobe: {0}")]
    Spawn(#[from] std::io::Error),
}

#[async_trait]
pub trait DurationProbe: Send + Sync {
    async fn duration(&self, path: &Path) -> Result<Duration, ProbeError>;
}

/// Probes container duration by shelling out to ffprobe.
pub struct FfprobeProbe {
    binary: PathBuf,
}

impl FfprobeProbe {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

#[async_trait]
impl DurationProbe for FfprobeProbe {
    async fn duration(&self, path: &Path) -> Result<Duration, ProbeError> {
        let output = tokio::process::Command::new(&self.binary)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ProbeError::Ffprobe {
                path: path.display().to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_duration_secs(&stdout).ok_or_else(|| ProbeError::Ffprobe {
            path: path.display().to_string(),
            detail: format!("unparseable duration '{}'", stdout.trim()),
        })
    }
}

fn parse_duration_secs(s: &str) -> Option<Duration> {
    let secs: f64 = s.trim().parse().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}

/// Format a duration as `HH:MM`, truncating seconds.
pub fn format_hhmm(d: Duration) -> String {
    let total = d.as_secs();
    format!("{:02}:{:02}", total / 3600, (total % 3600) / 60)
}
