use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid {kind} record: {message}")]
    InvalidRecord { kind: &'static str, message: String },

    #[error("Invalid bucket value: {0}")]
    BucketParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    pub(crate) fn invalid_record(kind: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidRecord {
            kind,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
