// ── Settings store ──
//
// The persisted `Settings` record on top of a `SecretStore`. Reads never
// fail: a missing or unreadable record yields defaults. Writes update the
// in-memory copy first; a failed persist is reported but not rolled back.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use olm_core::{DEFAULT_MTU, MAX_MTU, MIN_MTU, Settings, ValidationError};
use tracing::{debug, warn};

use crate::ConfigError;
use crate::secret_store::SecretStore;

/// Key the settings record is stored under.
pub const SETTINGS_KEY: &str = "settings";

pub struct SettingsStore {
    backend: Arc<dyn SecretStore>,
    current: Mutex<Settings>,
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore")
            .field("backend", &self.backend.name())
            .finish_non_exhaustive()
    }
}

impl SettingsStore {
    /// Open the store and load the current record.
    pub fn open(backend: Arc<dyn SecretStore>) -> Self {
        let settings = read_settings(backend.as_ref());
        Self {
            backend,
            current: Mutex::new(settings),
        }
    }

    fn current(&self) -> MutexGuard<'_, Settings> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// The in-memory settings.
    pub fn settings(&self) -> Settings {
        self.current().clone()
    }

    /// Re-read the record from the backend, falling back to defaults.
    pub fn get_settings(&self) -> Settings {
        let settings = read_settings(self.backend.as_ref());
        self.current().clone_from(&settings);
        settings
    }

    /// Replace the whole record.
    pub fn save_settings(&self, settings: &Settings) -> Result<(), ConfigError> {
        self.current().clone_from(settings);
        self.persist(settings)
    }

    /// Apply an edit. If `edit` fails nothing changes; if persisting fails
    /// the in-memory edit stands and the error is returned.
    pub fn update<F, T>(&self, edit: F) -> Result<T, ConfigError>
    where
        F: FnOnce(&mut Settings) -> Result<T, ValidationError>,
    {
        let updated = {
            let mut current = self.current();
            let mut draft = current.clone();
            let out = edit(&mut draft)?;
            current.clone_from(&draft);
            (draft, out)
        };
        let (settings, out) = updated;
        self.persist(&settings)?;
        Ok(out)
    }

    /// Remove every stored key and reset to defaults.
    pub fn clear(&self) -> Result<(), ConfigError> {
        *self.current() = Settings::default();
        self.backend.clear()?;
        debug!(backend = self.backend.name(), "settings cleared");
        Ok(())
    }

    pub fn get_string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        self.backend.get(key)
    }

    pub fn put_string(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.backend.put(key, value)
    }

    fn persist(&self, settings: &Settings) -> Result<(), ConfigError> {
        let raw = serde_json::to_string(settings)?;
        self.backend
            .put(SETTINGS_KEY, &raw)
            .inspect_err(|e| {
                warn!(backend = self.backend.name(), error = %e, "failed to persist settings");
            })
    }
}

fn read_settings(backend: &dyn SecretStore) -> Settings {
    let raw = match backend.get(SETTINGS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Settings::default(),
        Err(e) => {
            warn!(backend = backend.name(), error = %e, "failed to read settings, using defaults");
            return Settings::default();
        }
    };
    let mut settings: Settings = serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(error = %e, "stored settings unreadable, using defaults");
        Settings::default()
    });
    if !(MIN_MTU..=MAX_MTU).contains(&settings.mtu) {
        warn!(mtu = settings.mtu, "stored mtu out of range, using default");
        settings.mtu = DEFAULT_MTU;
    }
    settings
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::secret_store::MemoryStore;

    /// Delegates to memory but can be told to refuse writes.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        refuse_writes: AtomicBool,
    }

    impl SecretStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
            self.inner.get(key)
        }
        fn put(&self, key: &str, value: &str) -> Result<(), ConfigError> {
            if self.refuse_writes.load(Ordering::SeqCst) {
                return Err(ConfigError::Backend {
                    backend: "flaky",
                    message: "locked".into(),
                });
            }
            self.inner.put(key, value)
        }
        fn remove(&self, key: &str) -> Result<(), ConfigError> {
            self.inner.remove(key)
        }
        fn keys(&self) -> Result<Vec<String>, ConfigError> {
            self.inner.keys()
        }
        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    #[test]
    fn missing_record_yields_defaults() {
        let store = SettingsStore::open(Arc::new(MemoryStore::new()));
        assert_eq!(store.get_settings(), Settings::default());
    }

    #[test]
    fn unreadable_record_yields_defaults() {
        let backend = Arc::new(MemoryStore::new());
        backend.put(SETTINGS_KEY, "][").unwrap();
        let store = SettingsStore::open(backend);
        assert_eq!(store.get_settings(), Settings::default());
    }

    #[test]
    fn out_of_range_stored_mtu_falls_back_to_default() {
        let backend = Arc::new(MemoryStore::new());
        backend
            .put(SETTINGS_KEY, r#"{"mtu":9000,"endpoint":"https://e"}"#)
            .unwrap();
        let store = SettingsStore::open(backend);
        assert_eq!(store.settings().mtu, DEFAULT_MTU);
        assert_eq!(store.get_settings().endpoint, "https://e");
    }

    #[test]
    fn save_then_reopen() {
        let backend: Arc<dyn SecretStore> = Arc::new(MemoryStore::new());
        let store = SettingsStore::open(Arc::clone(&backend));
        let mut settings = Settings::default();
        settings.endpoint = "https://e".into();
        settings.secret = "s".into();
        store.save_settings(&settings).unwrap();

        let reopened = SettingsStore::open(backend);
        assert_eq!(reopened.settings(), settings);
    }

    #[test]
    fn rejected_edit_keeps_previous_value() {
        let store = SettingsStore::open(Arc::new(MemoryStore::new()));
        store.update(|s| s.set_mtu(1300)).unwrap();
        let err = store.update(|s| s.set_mtu(9000)).unwrap_err();
        assert!(matches!(err, ConfigError::Settings(_)));
        assert_eq!(store.settings().mtu, 1300);
        assert_eq!(store.get_settings().mtu, 1300);
    }

    #[test]
    fn failed_persist_keeps_in_memory_edit() {
        let backend = Arc::new(FlakyStore::default());
        let store = SettingsStore::open(backend.clone());
        backend.refuse_writes.store(true, Ordering::SeqCst);

        let err = store
            .update(|s| {
                s.org_id = "org_2".into();
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::Backend { .. }));
        assert_eq!(store.settings().org_id, "org_2");
        assert_eq!(store.get_settings().org_id, "");
    }

    #[test]
    fn clear_resets_everything() {
        let store = SettingsStore::open(Arc::new(MemoryStore::new()));
        store.put_string("extra", "x").unwrap();
        store
            .update(|s| {
                s.id = "olm_1".into();
                Ok(())
            })
            .unwrap();
        store.clear().unwrap();
        assert_eq!(store.settings(), Settings::default());
        assert_eq!(store.get_string("extra").unwrap(), None);
        assert_eq!(store.get_string(SETTINGS_KEY).unwrap(), None);
    }
}
