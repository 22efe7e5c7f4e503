use thiserror::Error;

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("HTTP error {status}: {url}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Failed to parse document: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::error::StorageError),
}

impl EtlError {
    /// Network and HTTP failures, as opposed to problems with the data itself.
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::HttpStatus { .. })
    }
}
