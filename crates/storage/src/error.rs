use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Row '{key}' has {actual} value(s), table expects {expected}")]
    ColumnCountMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, StorageError>;
