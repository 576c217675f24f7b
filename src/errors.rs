use crate::models::DateKey;
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<crate::models::InvalidDateKey> for AppError {
    fn from(err: crate::models::InvalidDateKey) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl From<crate::calendar::InvalidMonth> for AppError {
    fn from(err: crate::calendar::InvalidMonth) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

/// Failure talking to the persistence medium.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("database connection poisoned")]
    Poisoned,
}

/// Neither kind is fatal. The store logs them and keeps its in-memory map.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to load checked days: {0}")]
    Load(#[source] BackendError),
    #[error("failed to write {date}: {source}")]
    Write {
        date: DateKey,
        #[source]
        source: BackendError,
    },
}
