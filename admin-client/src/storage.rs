use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use common_auth::{AuthError, AuthResult};
use tracing::debug;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

/// Durable key/value storage backing the session, in the spirit of browser
/// local storage: synchronous, string values, fixed keys.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> AuthResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AuthResult<()>;
    fn remove(&self, key: &str) -> AuthResult<()>;
    /// Drop every key, including state that can no longer be read.
    fn clear(&self) -> AuthResult<()>;
}

/// Process-local storage. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        let guard = self.inner.read().expect("rwlock poisoned");
        guard.contains_key(key)
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> AuthResult<Option<String>> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AuthResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AuthResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        guard.remove(key);
        Ok(())
    }

    fn clear(&self) -> AuthResult<()> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        guard.clear();
        Ok(())
    }
}

/// All keys in a single JSON object file, rewritten atomically on each change.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> AuthResult<BTreeMap<String, String>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
                AuthError::Storage(format!("{} is not a session file: {err}", self.path.display()))
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(storage_error(&self.path, err)),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> AuthResult<()> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| storage_error(parent, err))?;
        }

        let bytes = serde_json::to_vec_pretty(entries)?;
        let staging = self.staging_path();
        fs::write(&staging, bytes).map_err(|err| storage_error(&staging, err))?;
        fs::rename(&staging, &self.path).map_err(|err| storage_error(&self.path, err))?;
        debug!(path = %self.path.display(), keys = entries.len(), "session file written");
        Ok(())
    }

    /// Per-process temp name so concurrent clients never share one.
    fn staging_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("session.json");
        let staging = format!(
            ".{name}.tmp-{}-{}",
            std::process::id(),
            Utc::now().timestamp_micros()
        );
        self.path.with_file_name(staging)
    }

    fn modify(&self, apply: impl FnOnce(&mut BTreeMap<String, String>) -> bool) -> AuthResult<()> {
        let _guard = self.lock.lock().expect("mutex poisoned");
        let mut entries = self.read_all()?;
        if apply(&mut entries) {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: &str) -> AuthResult<Option<String>> {
        let _guard = self.lock.lock().expect("mutex poisoned");
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> AuthResult<()> {
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> AuthResult<()> {
        self.modify(|entries| entries.remove(key).is_some())
    }

    fn clear(&self) -> AuthResult<()> {
        let _guard = self.lock.lock().expect("mutex poisoned");
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "session file removed");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage_error(&self.path, err)),
        }
    }
}

fn storage_error(path: &Path, err: std::io::Error) -> AuthError {
    AuthError::Storage(format!("{}: {err}", path.display()))
}
