use std::{
    collections::HashMap,
    fs,
    future::Future,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use log::{debug, error, info, trace};
use tempfile::NamedTempFile;

use crate::{CountdownError, Result};

/// Device-local string storage addressed by key.
///
/// Every value is replaced as a whole; there is no partial update.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` if the key was never written.
    fn get_item(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Overwrites the value under `key` in a single write.
    fn set_item(&self, key: &str, value: String) -> impl Future<Output = Result<()>> + Send;

    /// Removes `key`; removing a missing key succeeds.
    fn remove_item(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Stores each key as a JSON file inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `root`; the directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Helper method to get the file path for a key
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_stem: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        self.root.join(format!("{}.json", file_stem))
    }
}

impl KeyValueStore for FileStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        run_blocking(move || read_file(&path)).await
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key);
        run_blocking(move || write_file_atomic(&path, &value)).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        run_blocking(move || match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!("Failed to remove {}: {}", path.display(), e);
                Err(CountdownError::Io(e))
            }
        })
        .await
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| CountdownError::Io(io::Error::other(e)))?
}

fn read_file(path: &Path) -> Result<Option<String>> {
    trace!("Reading {}", path.display());
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No stored value at {}", path.display());
            Ok(None)
        }
        Err(e) => {
            error!("Failed to open {}: {}", path.display(), e);
            Err(CountdownError::Io(e))
        }
    }
}

/// Writes through a temporary file in the target directory and renames it
/// into place, so readers see either the old or the new content.
fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    if !dir.exists() {
        debug!("Creating data directory: {}", dir.display());
        fs::create_dir_all(dir).map_err(|e| {
            error!("Failed to create directory {}: {}", dir.display(), e);
            CountdownError::Io(e)
        })?;
    }

    let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| {
        error!("Failed to create temporary file: {}", e);
        CountdownError::Io(e)
    })?;

    trace!("Writing to temporary file");
    temp_file.write_all(content.as_bytes()).map_err(|e| {
        error!("Failed to write to temporary file: {}", e);
        CountdownError::Io(e)
    })?;

    temp_file.flush().map_err(|e| {
        error!("Failed to flush temporary file: {}", e);
        CountdownError::Io(e)
    })?;

    temp_file.persist(path).map_err(|e| {
        error!("Failed to persist file {}: {}", path.display(), e.error);
        CountdownError::Io(e.error)
    })?;

    info!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Keeps values in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_items<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> Result<T> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| CountdownError::LockAcquisitionFailed {
                message: "Failed to acquire lock on memory store".to_string(),
            })?;
        Ok(f(&mut items))
    }
}

impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.with_items(|items| items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        self.with_items(|items| {
            items.insert(key.to_string(), value);
        })
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.with_items(|items| {
            items.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_maps_to_safe_file_name() {
        let store = FileStore::new("/data");
        assert_eq!(store.path_for("@events"), PathBuf::from("/data/_events.json"));
        assert_eq!(store.path_for("a/b c"), PathBuf::from("/data/a_b_c.json"));
    }

    #[tokio::test]
    async fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        assert_eq!(store.get_item("@events").await.unwrap(), None);

        store.set_item("@events", "[1]".to_string()).await.unwrap();
        store.set_item("@events", "[1,2]".to_string()).await.unwrap();
        assert_eq!(
            store.get_item("@events").await.unwrap().as_deref(),
            Some("[1,2]")
        );

        store.remove_item("@events").await.unwrap();
        store.remove_item("@events").await.unwrap();
        assert_eq!(store.get_item("@events").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.set_item("@events", "[]".to_string()).await.unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("_events.json")]);
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryStore::new();
        store.set_item("k", "v".to_string()).await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap().as_deref(), Some("v"));
        store.remove_item("k").await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap(), None);
    }
}
