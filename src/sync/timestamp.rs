use chrono::NaiveDateTime;
use thiserror::Error;

/// Recording names carry their capture time: `2024-05-01-10-00-00.flv`.
const NAME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

#[derive(Debug, Error)]
#[error("Object name '{0}' does not carry a YYYY-MM-DD-HH-MM-SS timestamp")]
pub struct TimestampError(pub String);

/// Extract the capture timestamp from an object's base name. The extension
/// (if any) is stripped first. Malformed names are a per-object error; the
/// caller logs and skips.
pub fn parse_object_timestamp(base_name: &str) -> Result<NaiveDateTime, TimestampError> {
    let stem = match base_name.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => base_name,
    };
    NaiveDateTime::parse_from_str(stem, NAME_FORMAT)
        .map_err(|_| TimestampError(base_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn test_parses_flv_name() {
        let ts = parse_object_timestamp("2024-05-01-10-30-45.flv").unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (10, 30, 45));
    }

    #[test]
    fn test_parses_name_without_extension() {
        let ts = parse_object_timestamp("2024-05-01-00-00-00").unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn test_rejects_malformed_names() {
        assert!(parse_object_timestamp("not-a-date.flv").is_err());
        assert!(parse_object_timestamp("2024-05-01.flv").is_err());
        assert!(parse_object_timestamp("2024-13-01-10-00-00.flv").is_err());
        assert!(parse_object_timestamp("").is_err());
    }

    #[test]
    fn test_error_names_the_object() {
        let err = parse_object_timestamp("not-a-date.flv").unwrap_err();
        assert!(err.to_string().contains("not-a-date.flv"));
    }
}
