use thiserror::Error;

/// Typed store errors. Transfer failures are caught per object by the
/// device worker and never abort a device's run.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error {status} for {name}")]
    HttpStatus { status: u16, name: String },

    #[error("HTTP error for {name}: {source}")]
    Http {
        source: reqwest::Error,
        name: String,
    },

    #[error("Disk error: {0}")]
    Disk(#[from] std::io::Error),

    #[error("Malformed listing response: {0}")]
    InvalidListing(String),

    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),
}
