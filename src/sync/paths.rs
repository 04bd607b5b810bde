use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::mapping::DeviceMapping;

/// The base name of a hierarchical object name (text after the last `/`).
pub fn object_base_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// A device's folder: `root/<region>/<subregion>/<site>/<stream_id>`.
///
/// Mapping cells come from an operator spreadsheet, so each component is
/// sanitized of filesystem-invalid characters before joining.
pub fn device_dir(root: &Path, mapping: &DeviceMapping) -> PathBuf {
    root.join(clean_component(&mapping.region))
        .join(clean_component(&mapping.subregion))
        .join(clean_component(&mapping.site))
        .join(clean_component(&mapping.stream_id))
}

/// Per-date subfolder within a device's folder, `YYYY-MM-DD`.
pub fn date_dir(device_dir: &Path, date: NaiveDate) -> PathBuf {
    device_dir.join(date.format("%Y-%m-%d").to_string())
}

/// The deterministic destination for one object: a pure function of
/// (mapping row, object date, object base name). Identical inputs always
/// produce the identical path, which is what lets existence + size stand in
/// for a content hash between runs.
pub fn local_object_path(
    root: &Path,
    mapping: &DeviceMapping,
    date: NaiveDate,
    base_name: &str,
) -> PathBuf {
    date_dir(&device_dir(root, mapping), date).join(clean_component(base_name))
}

/// Remove characters that are invalid on common filesystems:
/// `/`, `\`, `:`, `*`, `?`, `"`, `<`, `>`, `|`.
pub fn clean_component(component: &str) -> String {
    component
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect()
}
