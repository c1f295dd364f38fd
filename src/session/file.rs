//! Session store persisted as a JSON object on disk.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use crate::session::SessionStore;

/// A session store that writes through to a JSON file on every change.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    inner: Arc<DashMap<String, String>>,
    path: PathBuf,
}

impl FileSessionStore {
    /// Load from file if it exists, otherwise start empty.
    pub fn load_from_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let store = Self {
            inner: Arc::new(DashMap::new()),
            path,
        };

        if store.path.exists() {
            let reader = BufReader::new(File::open(&store.path)?);
            let map: HashMap<String, String> = serde_json::from_reader(reader)?;
            for (k, v) in map {
                store.inner.insert(k, v);
            }
            tracing::debug!(path = ?store.path, entries = store.inner.len(), "Loaded session file");
        }
        Ok(store)
    }

    /// Write the current contents to disk.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        let map: HashMap<_, _> = self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();

        let mut writer = BufWriter::new(open_private(&self.path)?);
        serde_json::to_writer(&mut writer, &map)?;
        writer.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save, or put `key` back to `previous` when the write fails.
    fn persist_or_restore(&self, key: &str, previous: Option<String>) -> std::io::Result<()> {
        self.save_to_file().inspect_err(|e| {
            tracing::warn!(path = ?self.path, error = %e, "Failed to save session file");
            match previous {
                Some(value) => {
                    self.inner.insert(key.to_string(), value);
                }
                None => {
                    self.inner.remove(key);
                }
            }
        })
    }
}

/// Open for writing, owner read/write only on unix.
fn open_private(path: &Path) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        let previous = self.inner.insert(key.to_string(), value.to_string());
        self.persist_or_restore(key, previous)
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        let previous = self.inner.remove(key).map(|(_, v)| v);
        self.persist_or_restore(key, previous)
    }
}
