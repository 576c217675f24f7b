//! The checked-day store: in-memory map, optimistic toggles, and
//! write-through to whichever backend this deployment uses.
//!
//! Toggles flip the in-memory value immediately. Writes are queued to a
//! single writer task so they reach the backend in toggle order; a failed
//! write is logged and the in-memory value stays. With the database
//! backend, a feed task merges change notifications from other writers
//! into the map (last applied wins). The store's own writes come back on
//! the feed too; those are skipped, since the map already holds a value at
//! least as new.

use crate::database::DatabaseTable;
use crate::errors::{BackendError, StoreError};
use crate::feed::{Subscription, WriterId};
use crate::models::{ChangeEvent, CheckedMap, DateKey};
use crate::storage::LocalSlot;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::{
    sync::{mpsc, oneshot, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

/// Persistence medium. A deployment picks exactly one.
pub enum Backend {
    /// One JSON slot rewritten on every change. No change feed.
    Local(LocalSlot),
    /// `smoking_dates` table with per-row upserts and a change feed. The
    /// table may be shared with other writers.
    Database(Arc<DatabaseTable>),
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Local(_) => "local",
            Backend::Database(_) => "database",
        }
    }

    async fn select_all(&self) -> Result<CheckedMap, BackendError> {
        match self {
            Backend::Local(slot) => slot.read().await,
            Backend::Database(table) => table.select_all().await,
        }
    }

    fn subscribe(&self) -> Option<Subscription> {
        match self {
            Backend::Local(_) => None,
            Backend::Database(table) => Some(table.subscribe()),
        }
    }

    fn close_feed(&self) {
        if let Backend::Database(table) = self {
            table.close_feed();
        }
    }
}

enum WriteOp {
    Persist { date: DateKey, checked: bool },
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct CheckedDayStore {
    inner: Arc<Inner>,
}

struct Inner {
    checked: Arc<Mutex<CheckedMap>>,
    backend: Arc<Backend>,
    writer: WriterId,
    writes: mpsc::UnboundedSender<WriteOp>,
    feed_task: StdMutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.feed_task.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }
}

impl CheckedDayStore {
    /// Empty store with its writer task running. Must be called inside a
    /// Tokio runtime.
    pub fn new(backend: Backend) -> Self {
        let checked = Arc::new(Mutex::new(CheckedMap::new()));
        let backend = Arc::new(backend);
        let writer = WriterId::next();
        let (writes, queue) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(
            Arc::clone(&backend),
            writer,
            Arc::clone(&checked),
            queue,
        ));

        Self {
            inner: Arc::new(Inner {
                checked,
                backend,
                writer,
                writes,
                feed_task: StdMutex::new(None),
            }),
        }
    }

    /// Loads every persisted entry, then starts following the change feed.
    pub async fn open(backend: Backend) -> Self {
        let store = Self::new(backend);
        store.load().await;
        store.start_feed();
        store
    }

    pub fn backend_name(&self) -> &'static str {
        self.inner.backend.name()
    }

    /// Replaces the in-memory map with the persisted one. On failure the
    /// map is left as it was. Returns the number of entries held.
    pub async fn load(&self) -> usize {
        let loaded = self
            .inner
            .backend
            .select_all()
            .await
            .map_err(StoreError::Load);

        let mut checked = self.inner.checked.lock().await;
        match loaded {
            Ok(map) => {
                *checked = map;
                info!(
                    entries = checked.len(),
                    backend = self.backend_name(),
                    "checked days loaded"
                );
            }
            Err(err) => warn!("{err}; continuing with current map"),
        }
        checked.len()
    }

    /// Flips `date` (missing counts as unchecked) and returns the new
    /// value. The write happens in the background.
    pub async fn toggle(&self, date: DateKey) -> bool {
        let value = {
            let mut checked = self.inner.checked.lock().await;
            let entry = checked.entry(date.clone()).or_insert(false);
            *entry = !*entry;
            *entry
        };

        self.persist(date, value);
        value
    }

    fn persist(&self, date: DateKey, checked: bool) {
        if self
            .inner
            .writes
            .send(WriteOp::Persist { date, checked })
            .is_err()
        {
            warn!("writer task is gone; change kept in memory only");
        }
    }

    /// Merges a change notification, overwriting any local value. Returns
    /// the value it replaced.
    pub async fn apply_remote(&self, event: ChangeEvent) -> Option<bool> {
        self.inner
            .checked
            .lock()
            .await
            .insert(event.date, event.checked)
    }

    pub async fn is_checked(&self, date: &DateKey) -> bool {
        self.inner
            .checked
            .lock()
            .await
            .get(date)
            .copied()
            .unwrap_or(false)
    }

    pub async fn snapshot(&self) -> CheckedMap {
        self.inner.checked.lock().await.clone()
    }

    pub async fn clean_days(&self) -> usize {
        crate::summary::clean_days(&*self.inner.checked.lock().await)
    }

    pub fn has_feed(&self) -> bool {
        matches!(*self.inner.backend, Backend::Database(_))
    }

    /// New handle on the change feed; `None` for the local backend.
    pub fn subscribe(&self) -> Option<Subscription> {
        self.inner.backend.subscribe()
    }

    fn start_feed(&self) {
        let Some(mut subscription) = self.subscribe() else {
            return;
        };

        let checked = Arc::clone(&self.inner.checked);
        let own = self.inner.writer;
        let task = tokio::spawn(async move {
            while let Some(change) = subscription.next().await {
                if change.origin == own {
                    continue;
                }
                let event = change.event;
                debug!(date = %event.date, checked = event.checked, "change received");
                checked.lock().await.insert(event.date, event.checked);
            }
        });

        if let Ok(mut slot) = self.inner.feed_task.lock() {
            if let Some(previous) = slot.replace(task) {
                previous.abort();
            }
        }
    }

    /// Resolves once every write queued before the call has finished.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.inner.writes.send(WriteOp::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Ends all feed subscriptions, stops following the feed, and waits
    /// for queued writes.
    pub async fn shutdown(&self) {
        self.inner.backend.close_feed();
        let task = self.inner.feed_task.lock().ok().and_then(|mut slot| slot.take());
        if let Some(task) = task {
            task.abort();
        }
        self.flush().await;
        info!("checked-day store shut down");
    }
}

async fn run_writer(
    backend: Arc<Backend>,
    writer: WriterId,
    checked: Arc<Mutex<CheckedMap>>,
    mut queue: mpsc::UnboundedReceiver<WriteOp>,
) {
    while let Some(op) = queue.recv().await {
        match op {
            WriteOp::Persist { date, checked: value } => {
                if let Err(err) = write_through(&backend, writer, &checked, &date, value).await {
                    warn!("{err}; keeping in-memory value");
                }
            }
            WriteOp::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

async fn write_through(
    backend: &Backend,
    writer: WriterId,
    checked: &Mutex<CheckedMap>,
    date: &DateKey,
    value: bool,
) -> Result<(), StoreError> {
    let result = match backend {
        Backend::Database(table) => table.upsert(writer, date, value).await,
        Backend::Local(slot) => {
            let _guard = slot.lock_writes().await;
            let snapshot = checked.lock().await.clone();
            slot.write(&snapshot).await
        }
    };

    result.map_err(|source| StoreError::Write {
        date: date.clone(),
        source,
    })
}
