use crate::database::DatabaseTable;
use crate::errors::BackendError;
use crate::storage::LocalSlot;
use crate::store::Backend;
use chrono::NaiveDate;
use std::{env, path::Path, path::PathBuf, sync::Arc};
use thiserror::Error;
use tokio::fs;

pub const DEFAULT_PORT: u16 = 8080;

/// First tracked day.
pub fn default_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 14).expect("2025-05-14 is a valid date")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Local,
    Database,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown APP_BACKEND `{0}`, expected `local` or `database`")]
    UnknownBackend(String),
    #[error("invalid APP_TRACKING_EPOCH `{0}`, expected YYYY-MM-DD")]
    InvalidEpoch(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend: BackendKind,
    pub data_path: PathBuf,
    pub db_path: PathBuf,
    pub epoch: NaiveDate,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let backend = match lookup("APP_BACKEND").as_deref().map(str::trim) {
            None | Some("") | Some("local") => BackendKind::Local,
            Some("database") => BackendKind::Database,
            Some(other) => return Err(ConfigError::UnknownBackend(other.to_string())),
        };

        let epoch = match lookup("APP_TRACKING_EPOCH") {
            Some(value) => NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                .map_err(|_| ConfigError::InvalidEpoch(value))?,
            None => default_epoch(),
        };

        Ok(Self {
            port,
            backend,
            data_path: lookup("APP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/checked.json")),
            db_path: lookup("APP_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/smoking_dates.sqlite3")),
            epoch,
        })
    }

    /// Opens the configured backend, creating its parent directory.
    pub async fn open_backend(&self) -> Result<Backend, BackendError> {
        match self.backend {
            BackendKind::Local => {
                create_parent(&self.data_path).await?;
                Ok(Backend::Local(LocalSlot::new(&self.data_path)))
            }
            BackendKind::Database => {
                create_parent(&self.db_path).await?;
                let table = DatabaseTable::open(&self.db_path)?;
                Ok(Backend::Database(Arc::new(table)))
            }
        }
    }
}

async fn create_parent(path: &Path) -> Result<(), BackendError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}
