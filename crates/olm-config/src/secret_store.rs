// ── Secret store backends ──
//
// String key/value storage for settings that carry credentials. The OS
// keyring provides encryption at rest; the file backend is for headless
// hosts and tests and stores plaintext; the memory backend is for tests.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::ConfigError;

/// Opaque string storage. Implementations must be safe to share.
pub trait SecretStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError>;
    fn put(&self, key: &str, value: &str) -> Result<(), ConfigError>;
    fn remove(&self, key: &str) -> Result<(), ConfigError>;

    /// Every key currently stored.
    fn keys(&self) -> Result<Vec<String>, ConfigError>;

    /// Remove every stored key.
    fn clear(&self) -> Result<(), ConfigError> {
        for key in self.keys()? {
            self.remove(&key)?;
        }
        Ok(())
    }

    /// Short backend name for logs and diagnostics.
    fn name(&self) -> &'static str;
}

// ── OS keyring ───────────────────────────────────────────────────────

/// Key under which the keyring backend records which keys it holds.
/// The keyring itself cannot enumerate entries.
const INDEX_KEY: &str = "__keys";

/// Secrets in the platform keychain, one entry per key.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, ConfigError> {
        keyring::Entry::new(&self.service, key).map_err(keyring_error)
    }

    fn read(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(keyring_error(e)),
        }
    }

    fn index(&self) -> Result<Vec<String>, ConfigError> {
        Ok(match self.read(INDEX_KEY)? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => Vec::new(),
        })
    }

    fn write_index(&self, keys: &[String]) -> Result<(), ConfigError> {
        let raw = serde_json::to_string(keys)?;
        self.entry(INDEX_KEY)?
            .set_password(&raw)
            .map_err(keyring_error)
    }
}

fn keyring_error(e: keyring::Error) -> ConfigError {
    ConfigError::Backend {
        backend: "keyring",
        message: e.to_string(),
    }
}

impl SecretStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        self.read(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.entry(key)?
            .set_password(value)
            .map_err(keyring_error)?;
        let mut keys = self.index()?;
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_owned());
            self.write_index(&keys)?;
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ConfigError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {}
            Err(e) => return Err(keyring_error(e)),
        }
        let mut keys = self.index()?;
        let before = keys.len();
        keys.retain(|k| k != key);
        if keys.len() != before {
            self.write_index(&keys)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, ConfigError> {
        self.index()
    }

    fn clear(&self) -> Result<(), ConfigError> {
        for key in self.index()? {
            self.remove(&key)?;
        }
        match self.entry(INDEX_KEY)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(keyring_error(e)),
        }
    }

    fn name(&self) -> &'static str {
        "keyring"
    }
}

// ── Plaintext file ───────────────────────────────────────────────────

/// A JSON object on disk. Not encrypted: prefer the keyring.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write to a sibling file then rename over the original.
    fn store(&self, map: &BTreeMap<String, String>) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        {
            let mut file = open_private(&tmp)?;
            file.write_all(serde_json::to_string_pretty(map)?.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), keys = map.len(), "settings file written");
        Ok(())
    }

    fn modify<F>(&self, f: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.load()?;
        if f(&mut map) {
            self.store(&map)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::File::create(path)
}

impl SecretStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn put(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.modify(|map| {
            map.insert(key.to_owned(), value.to_owned());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<(), ConfigError> {
        self.modify(|map| map.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, ConfigError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.into_keys().collect())
    }

    fn clear(&self) -> Result<(), ConfigError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

// ── In memory ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SecretStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.entries().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.entries().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ConfigError> {
        self.entries().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, ConfigError> {
        Ok(self.entries().keys().cloned().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
