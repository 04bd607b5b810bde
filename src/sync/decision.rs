//! Sync decision engine.
//!
//! Pure policy over (date range, capture timestamp, local state, remote
//! size). Callers gather the local file size themselves; keeping the engine
//! free of I/O makes the idempotence guarantee trivial, since re-running
//! with identical inputs reproduces the same decision with no side effects.

use chrono::NaiveDateTime;

use crate::types::DateRange;

/// Why a download is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadReason {
    /// No local file at the destination path.
    Missing,
    /// Local file present but its size differs from the remote's: a stale
    /// or truncated copy from an interrupted run.
    SizeMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    Download(DownloadReason),
    SkipExisting,
    SkipOutOfRange,
}

/// Decide what to do with one remote object, in order: date filter first,
/// then local presence, then size comparison.
pub fn decide(
    range: &DateRange,
    timestamp: NaiveDateTime,
    local_size: Option<u64>,
    remote_size: u64,
) -> SyncDecision {
    if !range.contains(timestamp.date()) {
        return SyncDecision::SkipOutOfRange;
    }
    match local_size {
        None => SyncDecision::Download(DownloadReason::Missing),
        Some(size) if size != remote_size => SyncDecision::Download(DownloadReason::SizeMismatch),
        Some(_) => SyncDecision::SkipExisting,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range() -> DateRange {
        DateRange {
            start: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
        }
    }

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_in_range_and_absent_downloads() {
        assert_eq!(
            decide(&range(), ts(2024, 5, 1), None, 100),
            SyncDecision::Download(DownloadReason::Missing)
        );
    }

    #[test]
    fn test_size_mismatch_redownloads() {
        assert_eq!(
            decide(&range(), ts(2024, 5, 15), Some(50), 100),
            SyncDecision::Download(DownloadReason::SizeMismatch)
        );
    }

    #[test]
    fn test_matching_size_skips() {
        assert_eq!(
            decide(&range(), ts(2024, 5, 15), Some(100), 100),
            SyncDecision::SkipExisting
        );
    }

    #[test]
    fn test_out_of_range_skips_regardless_of_local_state() {
        assert_eq!(
            decide(&range(), ts(2024, 6, 1), None, 100),
            SyncDecision::SkipOutOfRange
        );
        assert_eq!(
            decide(&range(), ts(2024, 6, 1), Some(50), 100),
            SyncDecision::SkipOutOfRange
        );
        assert_eq!(
            decide(&range(), ts(2024, 4, 30), Some(100), 100),
            SyncDecision::SkipOutOfRange
        );
    }

    #[test]
    fn test_range_boundaries_are_inclusive() {
        assert_eq!(
            decide(&range(), ts(2024, 5, 31), None, 100),
            SyncDecision::Download(DownloadReason::Missing)
        );
    }

    #[test]
    fn test_decision_is_idempotent() {
        let first = decide(&range(), ts(2024, 5, 10), Some(100), 100);
        let second = decide(&range(), ts(2024, 5, 10), Some(100), 100);
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_byte_remote_matches_zero_byte_local() {
        assert_eq!(
            decide(&range(), ts(2024, 5, 10), Some(0), 0),
            SyncDecision::SkipExisting
        );
    }
}
