//! Storage Collaborators
//!
//! Where account snapshots live between sessions. The store only needs
//! load/save by key; these are the two backends the app ships with.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, SimError};
use crate::model::{AccountState, UserId};

/// Key-value persistence for account snapshots
#[async_trait]
pub trait AccountStorage: Send + Sync {
    /// `Ok(None)` when nothing was ever saved under `key`
    async fn load(&self, key: &str) -> Result<Option<AccountState>>;

    async fn save(&self, key: &str, state: &AccountState) -> Result<()>;
}

/// Storage key for an identity: `account-<id>` restricted to `[A-Za-z0-9_-]`
///
/// `_` is the escape character: it is doubled, and every other byte outside
/// the safe set becomes `_` plus two hex digits, so distinct identities never
/// share a key.
pub fn storage_key(identity: &UserId) -> String {
    let mut key = String::from("account-");
    for byte in identity.as_str().bytes() {
        match byte {
            b'_' => key.push_str("__"),
            b if b.is_ascii_alphanumeric() || b == b'-' => key.push(char::from(b)),
            b => {
                let _ = write!(key, "_{b:02x}");
            }
        }
    }
    key
}

/// In-process key-value store holding serialized JSON. Failures can be
/// injected for tests.
#[derive(Default)]
pub struct MemoryAccountStorage {
    entries: RwLock<HashMap<String, String>>,
    unavailable: AtomicBool,
    failing_saves: AtomicU32,
    saves: AtomicUsize,
    save_delay_ms: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemoryAccountStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every load and save fail until switched back
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the next `count` saves
    pub fn fail_next_saves(&self, count: u32) {
        self.failing_saves.store(count, Ordering::SeqCst);
    }

    /// Make every save take `delay` before it lands
    pub fn set_save_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.save_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Most saves that were ever running at the same time
    pub fn peak_concurrent_saves(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Stored JSON for `key`
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.read().ok()?.get(key).cloned()
    }

    /// Store raw text under `key`, bypassing serialization
    pub fn put_raw(&self, key: &str, value: impl Into<String>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), value.into());
        }
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SimError::StorageUnavailable("storage offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStorage for MemoryAccountStorage {
    async fn load(&self, key: &str) -> Result<Option<AccountState>> {
        self.check_available()?;
        let raw = self
            .entries
            .read()
            .map_err(|_| SimError::StorageUnavailable("storage lock poisoned".into()))?
            .get(key)
            .cloned();

        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| SimError::StorageUnavailable(format!("corrupt entry {key}: {e}")))
        })
        .transpose()
    }

    async fn save(&self, key: &str, state: &AccountState) -> Result<()> {
        self.check_available()?;
        let injected = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(SimError::StorageUnavailable("injected save failure".into()));
        }

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let delay = self.save_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let json = serde_json::to_string(state)?;
        self.entries
            .write()
            .map_err(|_| SimError::StorageUnavailable("storage lock poisoned".into()))?
            .insert(key.to_string(), json);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// One pretty-printed JSON file per account under a data directory
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl AccountStorage for JsonFileStorage {
    async fn load(&self, key: &str) -> Result<Option<AccountState>> {
        let path = self.path_for(key);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SimError::StorageUnavailable(format!("{}: {e}", path.display())));
            }
        };

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| SimError::StorageUnavailable(format!("corrupt {}: {e}", path.display())))
    }

    async fn save(&self, key: &str, state: &AccountState) -> Result<()> {
        let unavailable = |e: std::io::Error| SimError::StorageUnavailable(e.to_string());

        tokio::fs::create_dir_all(&self.dir).await.map_err(unavailable)?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(state)?;

        // Readers never see a half-written file
        tokio::fs::write(&tmp, json).await.map_err(unavailable)?;
        tokio::fs::rename(&tmp, &path).await.map_err(unavailable)?;
        Ok(())
    }
}
