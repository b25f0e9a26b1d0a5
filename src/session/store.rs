//! Key-value storage backends for the session
//!
//! The session store never touches a concrete medium directly; it goes
//! through [`KeyValueStore`] so it can be exercised against
//! [`MemoryStore`] in tests and persisted with [`KeyringStore`] (or an
//! opt-in [`FileStore`]) at runtime.

use crate::error::{AssistantError, Result};
use anyhow::Context;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Persistent string key-value storage
///
/// Implementations use interior mutability so a single store can be shared
/// behind an `Arc` by every component that reads the session.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store, used by tests and for throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AssistantError::Storage("Failed to acquire read lock".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AssistantError::Storage("Failed to acquire write lock".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AssistantError::Storage("Failed to acquire write lock".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// Service name the session entries are filed under in the OS keyring
pub const KEYRING_SERVICE: &str = "dsa-assistant";

/// OS credential store
///
/// Each key is its own keyring entry under [`KEYRING_SERVICE`]. This is the
/// default runtime store.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE)
    }
}

impl KeyringStore {
    /// Store entries under `service`
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        Ok(keyring::Entry::new(&self.service, key).map_err(AssistantError::Keyring)?)
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(AssistantError::Keyring(e).into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(AssistantError::Keyring)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AssistantError::Keyring(e).into()),
        }
    }
}

/// JSON-file backed store
///
/// The whole map is re-read on every `get` and rewritten on every mutation,
/// so two processes sharing the file always observe the latest session.
/// Writes go to an owner-only temp file that is renamed over the old one,
/// so the file is never left half-written. A file that does not parse is
/// treated as empty and replaced on the next write.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`
    ///
    /// The parent directory is created when missing; the file itself is only
    /// written on the first mutation.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::Storage`] if the parent directory cannot be
    /// created
    pub fn new<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create session directory")
                    .map_err(|e| AssistantError::Storage(e.to_string()))?;
            }
        }
        Ok(Self {
            path,
            lock: RwLock::new(()),
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents; `None` when the file exists but does not parse
    fn read_map(&self) -> Result<Option<BTreeMap<String, String>>> {
        if !self.path.exists() {
            return Ok(Some(BTreeMap::new()));
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))
            .map_err(|e| AssistantError::Storage(e.to_string()))?;
        if contents.trim().is_empty() {
            return Ok(Some(BTreeMap::new()));
        }
        match serde_json::from_str(&contents) {
            Ok(map) => Ok(Some(map)),
            Err(e) => {
                tracing::warn!(
                    "Ignoring corrupt session file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(map)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))
            .map_err(|e| AssistantError::Storage(e.to_string()))?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.as_file().sync_all())
            .with_context(|| format!("Failed to write {}", self.path.display()))
            .map_err(|e| AssistantError::Storage(e.to_string()))?;
        file.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace {}", self.path.display()))
            .map_err(|e| AssistantError::Storage(e.to_string()))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self
            .lock
            .read()
            .map_err(|_| AssistantError::Storage("Failed to acquire read lock".to_string()))?;
        Ok(self.read_map()?.and_then(|mut map| map.remove(key)))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self
            .lock
            .write()
            .map_err(|_| AssistantError::Storage("Failed to acquire write lock".to_string()))?;
        let mut map = self.read_map()?.unwrap_or_default();
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self
            .lock
            .write()
            .map_err(|_| AssistantError::Storage("Failed to acquire write lock".to_string()))?;
        match self.read_map()? {
            Some(mut map) => {
                if map.remove(key).is_some() {
                    self.write_map(&map)?;
                }
            }
            None => self.write_map(&BTreeMap::new())?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v2".to_string()));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.remove("k").unwrap();
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileStore::new(&path).unwrap();
        store.set("auth_token", "t1").unwrap();
        assert!(path.exists());

        let reopened = FileStore::new(&path).unwrap();
        assert_eq!(reopened.get("auth_token").unwrap(), Some("t1".to_string()));
    }

    #[test]
    fn test_file_store_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("session.json")).unwrap();
        assert_eq!(store.get("user_id").unwrap(), None);
        store.remove("user_id").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_corrupt_file_reads_empty_and_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"auth_token": "t1", "user_"#).unwrap();

        let store = FileStore::new(&path).unwrap();
        assert_eq!(store.get("auth_token").unwrap(), None);

        store.remove("auth_token").unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let map: BTreeMap<String, String> = serde_json::from_str(&contents).unwrap();
        assert!(map.is_empty());

        store.set("auth_token", "t2").unwrap();
        assert_eq!(store.get("auth_token").unwrap(), Some("t2".to_string()));
    }

    #[test]
    fn test_file_store_write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("session.json")).unwrap();
        store.set("auth_token", "t1").unwrap();
        store.set("user_id", "u1").unwrap();
        store.remove("auth_token").unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("session.json")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let store = FileStore::new(&path).unwrap();
        store.set("auth_token", "secret-token").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_keyring_store_uses_service_name() {
        assert_eq!(KeyringStore::default().service, KEYRING_SERVICE);
        assert_eq!(KeyringStore::new("other").service, "other");
    }
}
