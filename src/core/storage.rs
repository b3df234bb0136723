// src/core/storage.rs
//! Durable client-side key/value storage and the session persistence format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::types::User;

/// Namespaced blob holding `{state: {user, token}, version}`.
pub const SESSION_KEY: &str = "auth-storage";
/// Legacy flat keys kept in sync with the blob.
pub const LEGACY_TOKEN_KEY: &str = "token";
pub const LEGACY_USER_KEY: &str = "user";

const SESSION_FORMAT_VERSION: u32 = 0;

/// Synchronous string store, shaped like browser local storage.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// All keys in one JSON object file, rewritten through a temp file + rename.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read storage file: {}", path.display()))?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&content).with_context(|| {
                    format!("Failed to parse storage file: {}", path.display())
                })?
            }
        } else {
            HashMap::new()
        };

        debug!("Opened storage file {} ({} keys)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// `<dir>/<namespace>.json`
    pub fn in_dir(dir: &Path, namespace: &str) -> Result<Self> {
        Self::open(dir.join(format!("{}.json", namespace)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(entries).context("Failed to encode storage")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .with_context(|| format!("Failed to write file: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace file: {}", self.path.display()))?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

// ===== Session persistence =====

/// The persisted half of the session: transient flags never land here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub user: Option<User>,
    pub token: Option<String>,
}

impl PersistedSession {
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.token.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionBlob {
    state: PersistedSession,
    #[serde(default)]
    version: u32,
}

/// Reads and writes the session in both representations: the namespaced
/// blob and the legacy flat `token` / `user` keys.
#[derive(Clone, Copy)]
pub struct SessionPersistence<'a> {
    storage: &'a dyn Storage,
}

impl<'a> SessionPersistence<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    pub fn load_blob(&self) -> PersistedSession {
        let Some(raw) = self.storage.get(SESSION_KEY) else {
            return PersistedSession::default();
        };
        match serde_json::from_str::<SessionBlob>(&raw) {
            Ok(blob) => blob.state,
            Err(e) => {
                warn!("Discarding unreadable session blob: {}", e);
                PersistedSession::default()
            }
        }
    }

    pub fn load_legacy(&self) -> PersistedSession {
        let token = self
            .storage
            .get(LEGACY_TOKEN_KEY)
            .filter(|token| !token.is_empty());
        let user = self
            .storage
            .get(LEGACY_USER_KEY)
            .and_then(|raw| match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("Discarding unreadable legacy user entry: {}", e);
                    None
                }
            });
        PersistedSession { user, token }
    }

    /// Blob token first, legacy key second.
    pub fn token(&self) -> Option<String> {
        self.load_blob()
            .token
            .or_else(|| self.load_legacy().token)
            .filter(|token| !token.is_empty())
    }

    pub fn save(&self, session: &PersistedSession) -> Result<()> {
        let blob = SessionBlob {
            state: session.clone(),
            version: SESSION_FORMAT_VERSION,
        };
        let encoded = serde_json::to_string(&blob).context("Failed to encode session")?;
        self.storage.set(SESSION_KEY, &encoded)?;
        self.save_legacy(session)
    }

    pub fn save_legacy(&self, session: &PersistedSession) -> Result<()> {
        match &session.token {
            Some(token) => self.storage.set(LEGACY_TOKEN_KEY, token)?,
            None => self.storage.remove(LEGACY_TOKEN_KEY)?,
        }
        match &session.user {
            Some(user) => {
                let encoded = serde_json::to_string(user).context("Failed to encode user")?;
                self.storage.set(LEGACY_USER_KEY, &encoded)?
            }
            None => self.storage.remove(LEGACY_USER_KEY)?,
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.storage.remove(SESSION_KEY)?;
        self.storage.remove(LEGACY_TOKEN_KEY)?;
        self.storage.remove(LEGACY_USER_KEY)?;
        Ok(())
    }
}
