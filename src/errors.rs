use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to parse remote response: {0}")]
    ParseError(String),

    #[error("Remote messaging API error: {0}")]
    ApiError(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),

    #[error("Failed to read or write local state: {0}")]
    PersistenceError(String),

    #[error("{0}")]
    GeneralError(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(error: reqwest::Error) -> Self {
        SyncError::HttpError(error.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(error: serde_json::Error) -> Self {
        SyncError::ParseError(error.to_string())
    }
}

impl From<anyhow::Error> for SyncError {
    fn from(error: anyhow::Error) -> Self {
        SyncError::GeneralError(error.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(error: std::io::Error) -> Self {
        SyncError::PersistenceError(error.to_string())
    }
}
