//! TOML-file backed history sink.
//!
//! One entry per (user, track): recording a track again only bumps its
//! timestamp and moves it to the front of `recent`.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::HistoryWriteError;

use super::HistorySink;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub track_id: String,
    /// Seconds since the Unix epoch.
    pub last_played_at: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    // Per user, oldest first.
    #[serde(default)]
    users: BTreeMap<String, Vec<HistoryEntry>>,
}

#[derive(Clone)]
pub struct FileHistoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    data: Mutex<HistoryFile>,
    // Bumped after every change to `data`.
    revision: AtomicU64,
}

impl FileHistoryStore {
    /// Open the store at `path`, reading existing history if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HistoryWriteError> {
        let path = path.into();
        let data = if path.exists() {
            toml::from_str(&fs::read_to_string(&path)?)?
        } else {
            HistoryFile::default()
        };

        Ok(Self {
            inner: Arc::new(Inner {
                path,
                data: Mutex::new(data),
                revision: AtomicU64::new(0),
            }),
        })
    }

    /// Changes whenever an entry is written or cleared, including writes
    /// finished in the background after a track started.
    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::Acquire)
    }

    /// Record `track_id` for `user_id` with the current wall-clock time.
    pub fn record_now(&self, user_id: &str, track_id: &str) -> Result<(), HistoryWriteError> {
        self.inner.upsert(user_id, track_id, unix_now())
    }

    /// The user's history, most recently played first.
    pub fn recent(&self, user_id: &str) -> Vec<HistoryEntry> {
        let data = self.inner.lock();
        data.users
            .get(user_id)
            .map(|entries| entries.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Forget everything `user_id` listened to.
    pub fn clear(&self, user_id: &str) -> Result<(), HistoryWriteError> {
        let mut data = self.inner.lock();
        if data.users.remove(user_id).is_some() {
            self.inner.bump();
            self.inner.persist(&data)?;
        }
        Ok(())
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HistoryFile> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn upsert(&self, user_id: &str, track_id: &str, at: u64) -> Result<(), HistoryWriteError> {
        let mut data = self.lock();
        let entries = data.users.entry(user_id.to_string()).or_default();
        entries.retain(|e| e.track_id != track_id);
        entries.push(HistoryEntry {
            track_id: track_id.to_string(),
            last_played_at: at,
        });
        self.bump();
        self.persist(&data)
    }

    fn bump(&self) {
        self.revision.fetch_add(1, Ordering::AcqRel);
    }

    fn persist(&self, data: &HistoryFile) -> Result<(), HistoryWriteError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, toml::to_string_pretty(data)?)?;
        Ok(())
    }
}

impl HistorySink for FileHistoryStore {
    fn record(
        &self,
        user_id: &str,
        track_id: &str,
    ) -> BoxFuture<'static, Result<(), HistoryWriteError>> {
        let inner = self.inner.clone();
        let user_id = user_id.to_string();
        let track_id = track_id.to_string();
        async move {
            tokio::task::spawn_blocking(move || inner.upsert(&user_id, &track_id, unix_now()))
                .await
                .map_err(|e| HistoryWriteError::Rejected(e.to_string()))?
        }
        .boxed()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
