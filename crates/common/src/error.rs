use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Price provider error: {0}")]
    Provider(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Transport-level failures that are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Http(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
