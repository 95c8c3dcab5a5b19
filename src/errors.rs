use std::io;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("{0}")]
    Config(String),
    #[error("business source failed for {location}: {message}")]
    Source { location: String, message: String },
    #[error("search cancelled")]
    Cancelled,
}

impl AppError {
    pub fn source_failure(location: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Source {
            location: location.into(),
            message: message.into(),
        }
    }
}
