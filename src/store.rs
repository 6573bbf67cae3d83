use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::error::Error;

/// Key holding the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Key holding the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
/// Key holding the display name cached from the account-link callback.
pub const DISPLAY_NAME_KEY: &str = "steamNickname";

/// Durable, synchronous key-value persistence for session tokens.
///
/// Values are plain strings. There is no TTL: expiry is judged by the caller
/// from the decoded claims. Implementations must be internally synchronized.
pub trait TokenStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);

    fn remove(&self, key: &str);
}

/// Process-local store. Survives nothing beyond the process; used for tests and
/// hosts that provide their own persistence.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing entries.
    #[must_use]
    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries.write().insert(key.to_owned(), value.to_owned());
        self
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }
}

/// JSON-file store: the on-disk counterpart of browser local storage.
///
/// The file is the source of truth. Every read re-loads it, so writes made
/// through another handle (another window, another process) are seen. Writes
/// re-load, change one key and replace the file atomically, leaving other keys
/// as they are on disk.
///
/// A failed write is logged and dropped. If the file itself becomes unreadable,
/// the last document loaded is served instead.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileTokenStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// A missing file is an empty store. An unreadable JSON document is
    /// discarded with a warning rather than failing startup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let entries = read_entries(&path)?;

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Per-user default location (`<data dir>/playlog/session.json`).
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("playlog").join("session.json"))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn refresh(&self, entries: &mut HashMap<String, String>) {
        match read_entries(&self.path) {
            Ok(on_disk) => *entries = on_disk,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Token store read failed; using last known entries");
            }
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) {
        match write_entries(&self.path, entries) {
            Ok(()) => tracing::debug!(path = %self.path.display(), keys = entries.len(), "Token store written"),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Token store write failed");
            }
        }
    }
}

fn read_entries(path: &Path) -> Result<HashMap<String, String>, Error> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Discarding unreadable token store");
            HashMap::new()
        })),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(e.into()),
    }
}

// Temp names are unique per process and per write so concurrent writers never
// share one.
fn temp_path(path: &Path) -> PathBuf {
    static WRITES: AtomicU64 = AtomicU64::new(0);
    let seq = WRITES.fetch_add(1, Ordering::Relaxed);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "session.json".into());
    path.with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()))
}

fn write_entries(path: &Path, entries: &HashMap<String, String>) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(entries)
        .map_err(|e| Error::Config(format!("token store serialization: {e}")))?;

    let temp = temp_path(path);
    std::fs::write(&temp, json)?;
    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(e.into());
    }
    Ok(())
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock();
        self.refresh(&mut entries);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock();
        self.refresh(&mut entries);
        entries.insert(key.to_owned(), value.to_owned());
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.lock();
        self.refresh(&mut entries);
        if entries.remove(key).is_some() {
            self.persist(&entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_get_set_remove() {
        let store = MemoryTokenStore::new();
        assert!(store.get(ACCESS_TOKEN_KEY).is_none());

        store.set(ACCESS_TOKEN_KEY, "a1");
        assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("a1"));

        store.set(ACCESS_TOKEN_KEY, "a2");
        assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("a2"));

        store.remove(ACCESS_TOKEN_KEY);
        assert!(store.get(ACCESS_TOKEN_KEY).is_none());
        store.remove(ACCESS_TOKEN_KEY);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileTokenStore::open(&path).unwrap();
        store.set(ACCESS_TOKEN_KEY, "tok");
        store.set(DISPLAY_NAME_KEY, "Gordon");
        drop(store);

        let reopened = FileTokenStore::open(&path).unwrap();
        assert_eq!(reopened.get(ACCESS_TOKEN_KEY).as_deref(), Some("tok"));
        assert_eq!(reopened.get(DISPLAY_NAME_KEY).as_deref(), Some("Gordon"));
    }

    #[test]
    fn file_store_remove_is_durable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileTokenStore::open(&path).unwrap();
        store.set(ACCESS_TOKEN_KEY, "tok");
        store.set(REFRESH_TOKEN_KEY, "ref");
        store.remove(ACCESS_TOKEN_KEY);

        let reopened = FileTokenStore::open(&path).unwrap();
        assert!(reopened.get(ACCESS_TOKEN_KEY).is_none());
        assert_eq!(reopened.get(REFRESH_TOKEN_KEY).as_deref(), Some("ref"));
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = FileTokenStore::open(&path).unwrap();
        assert!(store.get(ACCESS_TOKEN_KEY).is_none());
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn file_store_handles_see_each_others_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let first = FileTokenStore::open(&path).unwrap();
        let second = FileTokenStore::open(&path).unwrap();

        second.set(ACCESS_TOKEN_KEY, "tok-b");
        assert_eq!(first.get(ACCESS_TOKEN_KEY).as_deref(), Some("tok-b"));

        // A write through the other handle only touches its own key.
        first.set(DISPLAY_NAME_KEY, "Gordon");
        let reopened = FileTokenStore::open(&path).unwrap();
        assert_eq!(reopened.get(ACCESS_TOKEN_KEY).as_deref(), Some("tok-b"));
        assert_eq!(reopened.get(DISPLAY_NAME_KEY).as_deref(), Some("Gordon"));

        second.remove(ACCESS_TOKEN_KEY);
        assert!(first.get(ACCESS_TOKEN_KEY).is_none());
        assert_eq!(second.get(DISPLAY_NAME_KEY).as_deref(), Some("Gordon"));
    }

    #[test]
    fn file_store_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileTokenStore::open(&path).unwrap();
        store.set(ACCESS_TOKEN_KEY, "tok");
        store.set(REFRESH_TOKEN_KEY, "ref");

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("session.json")]);
    }

    #[test]
    fn session_reload_sees_other_handle_sign_in() {
        use crate::claims::{Claims, encode_unsigned};
        use crate::session::SessionState;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let tab_a = SessionState::new(FileTokenStore::open(&path).unwrap());
        let tab_b = SessionState::new(FileTokenStore::open(&path).unwrap());

        let token = encode_unsigned(&Claims::new("player-1")).unwrap();
        tab_b.set_direct_token(&token);

        assert!(tab_a.reload().is_logged_in);
        tab_a.store().set(DISPLAY_NAME_KEY, "x");
        assert_eq!(tab_b.store().get(ACCESS_TOKEN_KEY).as_deref(), Some(token.as_str()));
    }
}
