use crate::errors::BackendError;
use crate::models::CheckedMap;
use std::path::{Path, PathBuf};
use tokio::{
    fs,
    sync::{Mutex, MutexGuard},
};

/// A single JSON file holding the whole checked map. Read once at startup
/// and rewritten wholesale after every change.
pub struct LocalSlot {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty map, not an error.
    pub async fn read(&self) -> Result<CheckedMap, BackendError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(CheckedMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Callers hold this while snapshotting and writing so the newest
    /// snapshot is always the last one on disk.
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Writes a sibling temp file and renames it over the slot, so the slot
    /// holds either the old map or the new one.
    pub async fn write(&self, checked: &CheckedMap) -> Result<(), BackendError> {
        let payload = serde_json::to_vec_pretty(checked)?;
        let staging = self.staging_path();
        fs::write(&staging, payload).await?;
        fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
