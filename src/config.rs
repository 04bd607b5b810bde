use std::path::PathBuf;

use chrono::NaiveDate;

use crate::types::{DateRange, LogLevel};

/// Application configuration, validated up front so that every failure in
/// here aborts the run before any worker starts.
pub struct Config {
    pub directory: PathBuf,
    pub mapping_path: PathBuf,
    pub devices_path: Option<PathBuf>,
    pub endpoint: String,
    pub container: String,
    pub sas_token: Option<String>,
    pub remote_prefix: String,
    pub ffprobe_path: PathBuf,

    pub date_range: DateRange,

    pub concurrency: u16,

    pub log_level: LogLevel,

    pub report: bool,
    pub dry_run: bool,
    pub no_progress_bar: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("directory", &self.directory)
            .field("mapping_path", &self.mapping_path)
            .field("endpoint", &self.endpoint)
            .field("container", &self.container)
            .field("sas_token", &self.sas_token.as_ref().map(|_| "<redacted>"))
            .field("remote_prefix", &self.remote_prefix)
            .field("date_range", &self.date_range)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        let start = parse_date(&cli.start_date)?;
        let end = parse_date(&cli.end_date)?;
        if start > end {
            anyhow::bail!(
                "Start date {} is after end date {}",
                cli.start_date,
                cli.end_date
            );
        }

        if cli.concurrency == 0 {
            anyhow::bail!("--concurrency must be at least 1");
        }

        Ok(Self {
            directory: expand_tilde(&cli.directory),
            mapping_path: expand_tilde(&cli.mapping),
            devices_path: cli.devices.as_deref().map(expand_tilde),
            endpoint: cli.endpoint.trim_end_matches('/').to_string(),
            container: cli.container,
            sas_token: cli
                .sas_token
                .map(|t| t.trim_start_matches('?').to_string()),
            remote_prefix: cli.remote_prefix,
            ffprobe_path: PathBuf::from(cli.ffprobe_path),
            date_range: DateRange { start, end },
            concurrency: cli.concurrency,
            log_level: cli.log_level,
            report: cli.report,
            dry_run: cli.dry_run,
            no_progress_bar: cli.no_progress_bar,
        })
    }
}

/// Parse an operator-supplied `YYYY-MM-DD` date. Malformed input is fatal to
/// the whole run.
pub(crate) fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Cannot parse '{}' as a date. Expected YYYY-MM-DD", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn make_cli(extra: &[&str]) -> crate::cli::Cli {
        let mut args = vec![
            "camsync",
            "--directory",
            "/mnt/archive",
            "--mapping",
            "mapping.csv",
            "--start-date",
            "2024-05-01",
            "--end-date",
            "2024-05-31",
            "--endpoint",
            "https://acct.blob.core.windows.net",
            "--container",
            "recordings",
        ];
        args.extend_from_slice(extra);
        crate::cli::Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_date_valid() {
        assert_eq!(
            parse_date("2024-05-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date("not-a-date").is_err());
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("01-05-2024").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_expand_tilde_with_home() {
        let result = expand_tilde("~/recordings");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(result, home.join("recordings"));
        }
    }

    #[test]
    fn test_expand_tilde_no_prefix() {
        assert_eq!(
            expand_tilde("/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }

    #[test]
    fn test_from_cli_builds_range() {
        let cfg = Config::from_cli(make_cli(&[])).unwrap();
        assert_eq!(
            cfg.date_range.start,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
        assert_eq!(
            cfg.date_range.end,
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()
        );
    }

    #[test]
    fn test_from_cli_rejects_inverted_range() {
        let cli = make_cli(&[]);
        let cli = crate::cli::Cli {
            start_date: "2024-06-01".into(),
            end_date: "2024-05-01".into(),
            ..cli
        };
        assert!(Config::from_cli(cli).is_err());
    }

    #[test]
    fn test_from_cli_rejects_zero_concurrency() {
        let cli = make_cli(&["--concurrency", "0"]);
        assert!(Config::from_cli(cli).is_err());
    }

    #[test]
    fn test_from_cli_normalizes_endpoint_and_sas() {
        let cli = make_cli(&["--sas-token", "?sv=2022&sig=abc"]);
        let cli = crate::cli::Cli {
            endpoint: "https://acct.blob.core.windows.net/".into(),
            ..cli
        };
        let cfg = Config::from_cli(cli).unwrap();
        assert_eq!(cfg.endpoint, "https://acct.blob.core.windows.net");
        assert_eq!(cfg.sas_token.as_deref(), Some("sv=2022&sig=abc"));
    }
}
