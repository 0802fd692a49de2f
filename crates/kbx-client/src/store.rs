//! Persisted session storage.
//!
//! Stores the `token`/`user`/`theme` keys in `<kbx home>/session.json` with
//! restricted permissions (0600). Reads are served from an in-memory mirror;
//! every mutation rewrites the file, last write wins. Tokens are never
//! logged in full.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::api::types::User;
use crate::config::paths;

/// Key holding the raw bearer token.
pub const KEY_TOKEN: &str = "token";
/// Key holding the JSON-serialized user profile.
pub const KEY_USER: &str = "user";
/// Key holding the theme preference ("dark"/"light").
pub const KEY_THEME: &str = "theme";

/// Key-value store surviving restarts.
///
/// Malformed on-disk data is treated as absent rather than failing the
/// caller; a fresh file replaces it on the next write.
pub struct SessionStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl SessionStore {
    /// Opens the store at `path`. A missing, unreadable, or corrupt file
    /// yields an empty store.
    pub fn open(path: PathBuf) -> Self {
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(err) => {
                    tracing::warn!(
                        "Discarding corrupt session file {}: {err}",
                        path.display()
                    );
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Opens the store at the default location under the kbx home.
    pub fn open_default() -> Self {
        Self::open(paths::session_path())
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Stores `value` under `key` and persists.
    pub fn set(&self, key: &str, value: impl Into<String>) {
        let mut entries = self.lock();
        entries.insert(key.to_string(), value.into());
        self.persist(&entries);
    }

    /// Removes `key` and persists. Removing an absent key is a no-op.
    pub fn remove(&self, key: &str) {
        let mut entries = self.lock();
        if entries.remove(key).is_some() {
            self.persist(&entries);
        }
    }

    /// Removes both credential keys in one write. Clearing an already-empty
    /// store is a no-op.
    pub fn clear_session(&self) {
        let mut entries = self.lock();
        let had_token = entries.remove(KEY_TOKEN).is_some();
        let had_user = entries.remove(KEY_USER).is_some();
        if had_token || had_user {
            self.persist(&entries);
        }
    }

    /// Returns the persisted bearer token, if any.
    pub fn token(&self) -> Option<String> {
        self.get(KEY_TOKEN)
    }

    /// Persists the bearer token.
    pub fn set_token(&self, token: &str) {
        self.set(KEY_TOKEN, token);
    }

    /// Returns the persisted user profile. A corrupt record is treated as
    /// absent.
    pub fn user(&self) -> Option<User> {
        let raw = self.get(KEY_USER)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(err) => {
                tracing::warn!("Discarding corrupt persisted user record: {err}");
                None
            }
        }
    }

    /// Persists the user profile as serialized JSON.
    pub fn set_user(&self, user: &User) {
        match serde_json::to_string(user) {
            Ok(raw) => self.set(KEY_USER, raw),
            Err(err) => tracing::warn!("Failed to serialize user record: {err}"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().expect("session store mutex poisoned")
    }

    /// Rewrites the backing file with restricted permissions (0600). Write
    /// failures are tolerated: the in-memory state stays authoritative for
    /// this process.
    fn persist(&self, entries: &HashMap<String, String>) {
        if let Err(err) = self.write_file(entries) {
            tracing::warn!(
                "Failed to persist session file {}: {err}",
                self.path.display()
            );
        }
    }

    fn write_file(&self, entries: &HashMap<String, String>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(entries)
            .map_err(std::io::Error::other)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)?;
            file.write_all(contents.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents)?;
        }

        Ok(())
    }
}
