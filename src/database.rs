//! `smoking_dates` table backed by SQLite, with a change feed.

use crate::errors::BackendError;
use crate::feed::{ChangeFeed, Subscription, WriterId};
use crate::models::{ChangeEvent, CheckedMap, DateKey};
use rusqlite::{params, Connection};
use std::{
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::{debug, warn};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS smoking_dates (
    date TEXT PRIMARY KEY NOT NULL,
    checked INTEGER NOT NULL
);";

const UPSERT: &str = "INSERT INTO smoking_dates (date, checked) VALUES (?1, ?2)
    ON CONFLICT(date) DO UPDATE SET checked = excluded.checked";

pub struct DatabaseTable {
    conn: Arc<Mutex<Connection>>,
    feed: ChangeFeed,
}

impl DatabaseTable {
    pub fn open(path: &Path) -> Result<Self, BackendError> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, BackendError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, BackendError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            feed: ChangeFeed::new(),
        })
    }

    /// `SELECT date, checked` over the whole table. Rows whose date or
    /// value does not parse are skipped one at a time.
    pub async fn select_all(&self) -> Result<CheckedMap, BackendError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || -> Result<CheckedMap, BackendError> {
            let conn = conn.lock().map_err(|_| BackendError::Poisoned)?;
            let mut stmt = conn.prepare("SELECT date, checked FROM smoking_dates")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0), row.get::<_, bool>(1)))
            })?;

            let mut checked = CheckedMap::new();
            for row in rows {
                let (date, value) = row?;
                let date = match date {
                    Ok(date) => date,
                    Err(err) => {
                        warn!("skipping row with unreadable date: {err}");
                        continue;
                    }
                };
                let value = match value {
                    Ok(value) => value,
                    Err(err) => {
                        warn!(date = %date, "skipping row with unreadable value: {err}");
                        continue;
                    }
                };
                match DateKey::parse(&date) {
                    Ok(key) => {
                        checked.insert(key, value);
                    }
                    Err(err) => warn!("skipping row: {err}"),
                }
            }
            Ok(checked)
        })
        .await?
    }

    /// Upserts one row keyed on `date`, then notifies subscribers.
    pub async fn upsert(
        &self,
        writer: WriterId,
        date: &DateKey,
        checked: bool,
    ) -> Result<(), BackendError> {
        let conn = Arc::clone(&self.conn);
        let key = date.as_str().to_string();
        tokio::task::spawn_blocking(move || -> Result<(), BackendError> {
            let conn = conn.lock().map_err(|_| BackendError::Poisoned)?;
            conn.execute(UPSERT, params![key, checked])?;
            Ok(())
        })
        .await??;

        let delivered = self.feed.publish(
            writer,
            ChangeEvent {
                date: date.clone(),
                checked,
            },
        );
        debug!(date = %date, checked, delivered, "row upserted");
        Ok(())
    }

    pub fn subscribe(&self) -> Subscription {
        self.feed.subscribe()
    }

    pub fn close_feed(&self) {
        self.feed.close();
    }
}
