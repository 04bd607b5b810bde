//! Device-to-location mapping table.
//!
//! Loaded once from an operator-supplied CSV before any worker starts and
//! shared read-only across the fleet. A device's row determines where its
//! recordings land on disk: `district/acname/location/streamname`.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Cannot read mapping file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed mapping row in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("Device '{0}' not found in mapping table")]
    NotFound(String),
}

/// One row of the mapping table. Field names follow the operator
/// spreadsheet's column headers.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceMapping {
    #[serde(rename = "streamname")]
    pub stream_id: String,
    #[serde(rename = "district")]
    pub region: String,
    #[serde(rename = "acname")]
    pub subregion: String,
    #[serde(rename = "location")]
    pub site: String,
}

/// Immutable lookup table over mapping rows, in file order.
#[derive(Debug)]
pub struct MappingTable {
    rows: Vec<DeviceMapping>,
}

impl MappingTable {
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let display = path.display().to_string();
        let file = std::fs::File::open(path).map_err(|source| MappingError::Io {
            path: display.clone(),
            source,
        })?;
        let mut reader = csv::Reader::from_reader(file);

        let mut rows = Vec::new();
        for record in reader.deserialize() {
            let row: DeviceMapping = record.map_err(|source| MappingError::Csv {
                path: display.clone(),
                source,
            })?;
            rows.push(row);
        }
        Ok(Self { rows })
    }

    /// Look up a device's mapping row. Duplicate stream ids resolve to the
    /// first row in file order.
    pub fn resolve(&self, stream_id: &str) -> Result<&DeviceMapping, MappingError> {
        self.rows
            .iter()
            .find(|row| row.stream_id == stream_id)
            .ok_or_else(|| MappingError::NotFound(stream_id.to_string()))
    }

    /// Stream ids in file order; the default device set when no device-list
    /// file is supplied.
    pub fn stream_ids(&self) -> Vec<String> {
        self.rows.iter().map(|row| row.stream_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read the `streamname` column of a device-list CSV, in file order.
pub fn load_device_list(path: &Path) -> Result<Vec<String>, MappingError> {
    #[derive(Deserialize)]
    struct Row {
        streamname: String,
    }

    let display = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| MappingError::Io {
        path: display.clone(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);

    let mut ids = Vec::new();
    for record in reader.deserialize() {
        let row: Row = record.map_err(|source| MappingError::Csv {
            path: display.clone(),
            source,
        })?;
        ids.push(row.streamname);
    }
    Ok(ids)
}
