//! Persisted session storage.
//!
//! The session survives restarts as three string entries: `accessToken`,
//! `refreshToken` and `user` (JSON). `SessionStorage` is the typed view the
//! session manager uses; the bytes live in one of the `KeyValueStore`
//! backends below.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

use crate::models::User;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";

/// Session file name in the storage directory
const SESSION_FILE: &str = "session.json";

/// Keychain service name
const SERVICE_NAME: &str = "learnhub";

/// String key-value storage that survives restarts.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile store, for tests and `--ephemeral` runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// JSON object on disk, one file per storage directory.
pub struct FileStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            lock: Mutex::new(()),
        }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    fn read_all(&self) -> Result<HashMap<String, String>> {
        let path = self.path();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        serde_json::from_str(&contents).context("Failed to parse session file")
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<()> {
        let path = self.path();
        if entries.is_empty() {
            if path.exists() {
                std::fs::remove_file(&path).context("Failed to remove session file")?;
            }
            return Ok(());
        }
        std::fs::create_dir_all(&self.dir).context("Failed to create storage directory")?;
        let contents = serde_json::to_string_pretty(entries)?;
        write_private(&path, contents.as_bytes()).context("Failed to write session file")?;
        Ok(())
    }
}

/// Write `contents` to `path`, readable by the owner only on unix. The
/// session file holds bearer tokens.
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::fs::{OpenOptions, Permissions};
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation
    file.set_permissions(Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// Entries kept in the OS keychain, one credential per key.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve value from keychain"),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store value in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

/// What a previous run left behind
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub user: User,
}

/// Typed access to the persisted session entries.
pub struct SessionStorage {
    store: Box<dyn KeyValueStore>,
}

impl SessionStorage {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// Load the persisted session. Returns `None` unless both an access
    /// token and a user record are present. A user record that no longer
    /// parses counts as absent.
    pub fn load(&self) -> Result<Option<StoredSession>> {
        let access_token = match self.store.get(ACCESS_TOKEN_KEY)? {
            Some(token) if !token.is_empty() => token,
            _ => return Ok(None),
        };
        let user = match self.store.get(USER_KEY)? {
            Some(raw) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => user,
                Err(e) => {
                    debug!(error = %e, "Discarding unreadable persisted user");
                    return Ok(None);
                }
            },
            None => return Ok(None),
        };
        let refresh_token = self.store.get(REFRESH_TOKEN_KEY)?;
        Ok(Some(StoredSession {
            access_token,
            refresh_token,
            user,
        }))
    }

    /// Write access token, refresh token (when provided) and user together
    pub fn persist(&self, access_token: &str, refresh_token: Option<&str>, user: &User) -> Result<()> {
        let user_json = serde_json::to_string(user).context("Failed to serialize user")?;
        self.store.set(ACCESS_TOKEN_KEY, access_token)?;
        if let Some(refresh) = refresh_token {
            self.store.set(REFRESH_TOKEN_KEY, refresh)?;
        }
        self.store.set(USER_KEY, &user_json)?;
        Ok(())
    }

    /// Rewrite only the access token (refresh cycle)
    pub fn set_access_token(&self, access_token: &str) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, access_token)
    }

    pub fn access_token(&self) -> Result<Option<String>> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .get(REFRESH_TOKEN_KEY)?
            .filter(|t| !t.is_empty()))
    }

    /// Remove all three entries. Every removal is attempted; the first
    /// failure is reported.
    pub fn clear(&self) -> Result<()> {
        let results = [
            self.store.remove(ACCESS_TOKEN_KEY),
            self.store.remove(REFRESH_TOKEN_KEY),
            self.store.remove(USER_KEY),
        ];
        results.into_iter().collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.store.get(ACCESS_TOKEN_KEY)?.is_none()
            && self.store.get(REFRESH_TOKEN_KEY)?.is_none()
            && self.store.get(USER_KEY)?.is_none())
    }
}
