//! Small key/value persistence for session flags.
//!
//! - Native: a JSON object in a file (`STATE_FILE`)
//! - Web: `window.localStorage`
//! - Tests: in memory

use crate::provider::MaybeSendSync;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Set when the user explicitly disconnects; suppresses auto-reconnect.
pub const DISCONNECT_FLAG_KEY: &str = "wallet_disconnect_requested";

pub trait KeyValueStore: MaybeSendSync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.items.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut items) = self.items.lock() {
            items.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut items) = self.items.lock() {
            items.remove(key);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use super::KeyValueStore;
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// JSON-object file, read and rewritten on every change.
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

        fn load(&self) -> BTreeMap<String, String> {
            match std::fs::read_to_string(&self.path) {
                Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                    log::warn!("⚠️ Ignoring unreadable state file {}: {e}", self.path.display());
                    BTreeMap::new()
                }),
                Err(_) => BTreeMap::new(),
            }
        }

        fn save(&self, items: &BTreeMap<String, String>) {
            let result = serde_json::to_string_pretty(items)
                .map_err(std::io::Error::other)
                .and_then(|raw| {
                    if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&self.path, raw)
                });
            if let Err(e) = result {
                log::error!("❌ Failed to write state file {}: {e}", self.path.display());
            }
        }

        fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) {
            let _guard = self.lock.lock();
            let mut items = self.load();
            f(&mut items);
            self.save(&items);
        }
    }

    impl KeyValueStore for FileStore {
        fn get(&self, key: &str) -> Option<String> {
            let _guard = self.lock.lock();
            self.load().get(key).cloned()
        }

        fn set(&self, key: &str, value: &str) {
            self.update(|items| {
                items.insert(key.to_string(), value.to_string());
            });
        }

        fn remove(&self, key: &str) {
            self.update(|items| {
                items.remove(key);
            });
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::LocalStorage;

#[cfg(target_arch = "wasm32")]
mod web {
    use super::KeyValueStore;
    use web_sys::window;

    /// `window.localStorage`; every call is best-effort.
    #[derive(Default)]
    pub struct LocalStorage;

    fn storage() -> Option<web_sys::Storage> {
        window()?.local_storage().ok()?
    }

    impl KeyValueStore for LocalStorage {
        fn get(&self, key: &str) -> Option<String> {
            storage()?.get_item(key).ok()?
        }

        fn set(&self, key: &str, value: &str) {
            if let Some(ls) = storage() {
                let _ = ls.set_item(key, value);
            }
        }

        fn remove(&self, key: &str) {
            if let Some(ls) = storage() {
                let _ = ls.remove_item(key);
            }
        }
    }
}
