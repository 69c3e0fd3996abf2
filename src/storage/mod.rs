//! # Storage Module - Player Configuration Persistence
//!
//! Persists the small amount of per-player state the chat plugin owns: the
//! spy-mode flag and the custom nickname. Channel rosters are deliberately not
//! stored; they reset on every restart.
//!
//! ## Layout
//!
//! ```text
//! data/
//! └── players/
//!     └── <uuid>.json   ← one record per player
//! ```
//!
//! Reads are served from an in-memory cache so the chat path never touches the
//! disk. Setters update the cache and mark the record dirty; [`PlayerStore::flush`]
//! writes dirty records with an exclusive lock and an atomic rename.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sinkchat::storage::PlayerStore;
//! use sinkchat::chat::PlayerId;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sinkchat::chat::ChatError> {
//!     let store = PlayerStore::open("./data").await?;
//!     let id = PlayerId::new();
//!     store.set_spy_enabled(id, "alice", true);
//!     store.flush().await?;
//!     Ok(())
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;
use uuid::Uuid;

use crate::chat::{ChatError, PlayerId};
use crate::validation::{secure_json_parse, validate_file_size};

/// Upper bound for a single player file.
const MAX_RECORD_BYTES: u64 = 16_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Login name last seen for this id, for humans reading the file.
    pub last_name: String,
    #[serde(default)]
    pub spy_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PlayerRecord {
    fn new(name: &str) -> Self {
        Self {
            last_name: name.to_string(),
            spy_enabled: false,
            nickname: None,
            updated_at: Utc::now(),
        }
    }
}

pub struct PlayerStore {
    players_dir: Option<PathBuf>,
    records: RwLock<HashMap<PlayerId, PlayerRecord>>,
    dirty: Mutex<HashSet<PlayerId>>,
}

impl PlayerStore {
    /// Store without a backing directory; `flush` is a no-op.
    pub fn in_memory() -> Self {
        Self {
            players_dir: None,
            records: RwLock::new(HashMap::new()),
            dirty: Mutex::new(HashSet::new()),
        }
    }

    /// Open (creating if needed) `<data_dir>/players` and load every record.
    pub async fn open(data_dir: &str) -> Result<Self, ChatError> {
        let players_dir = Path::new(data_dir).join("players");
        fs::create_dir_all(&players_dir).await?;

        let mut records = HashMap::new();
        let mut entries = fs::read_dir(&players_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok())
                .map(PlayerId)
            else {
                warn!("skipping player file with non-uuid name: {}", path.display());
                continue;
            };
            match Self::read_record(&path).await {
                Ok(record) => {
                    records.insert(id, record);
                }
                Err(e) => warn!("skipping unreadable player file {}: {}", path.display(), e),
            }
        }
        info!("loaded {} player records from {}", records.len(), players_dir.display());

        Ok(Self {
            players_dir: Some(players_dir),
            records: RwLock::new(records),
            dirty: Mutex::new(HashSet::new()),
        })
    }

    async fn read_record(path: &Path) -> Result<PlayerRecord, ChatError> {
        let metadata = fs::metadata(path).await?;
        validate_file_size(metadata.len(), MAX_RECORD_BYTES)
            .map_err(|e| ChatError::Storage(e.to_string()))?;
        let content = fs::read_to_string(path).await?;
        secure_json_parse(&content, MAX_RECORD_BYTES as usize)
            .map_err(|e| ChatError::Storage(e.to_string()))
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<PlayerId, PlayerRecord>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<PlayerId, PlayerRecord>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }

    fn mark_dirty(&self, id: PlayerId) {
        self.dirty
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id);
    }

    pub fn record(&self, id: PlayerId) -> Option<PlayerRecord> {
        self.read().get(&id).cloned()
    }

    pub fn spy_enabled(&self, id: PlayerId) -> bool {
        self.read().get(&id).map(|r| r.spy_enabled).unwrap_or(false)
    }

    /// Returns false when the flag already had that value.
    pub fn set_spy_enabled(&self, id: PlayerId, name: &str, enabled: bool) -> bool {
        let mut records = self.write();
        let record = records.entry(id).or_insert_with(|| PlayerRecord::new(name));
        if record.spy_enabled == enabled {
            return false;
        }
        record.spy_enabled = enabled;
        record.last_name = name.to_string();
        record.updated_at = Utc::now();
        drop(records);
        self.mark_dirty(id);
        true
    }

    pub fn nickname(&self, id: PlayerId) -> Option<String> {
        self.read().get(&id).and_then(|r| r.nickname.clone())
    }

    /// `None` clears the nickname.
    pub fn set_nickname(&self, id: PlayerId, name: &str, nickname: Option<String>) {
        let mut records = self.write();
        let record = records.entry(id).or_insert_with(|| PlayerRecord::new(name));
        record.nickname = nickname;
        record.last_name = name.to_string();
        record.updated_at = Utc::now();
        drop(records);
        self.mark_dirty(id);
    }

    /// Write every dirty record. Returns the number written.
    ///
    /// A failed write does not stop the others; every failed record stays
    /// dirty for the next flush and the first error is returned.
    pub async fn flush(&self) -> Result<usize, ChatError> {
        let Some(dir) = &self.players_dir else {
            self.dirty.lock().unwrap_or_else(|e| e.into_inner()).clear();
            return Ok(0);
        };
        let pending: Vec<PlayerId> = {
            let mut dirty = self.dirty.lock().unwrap_or_else(|e| e.into_inner());
            dirty.drain().collect()
        };

        let mut written = 0;
        let mut first_error = None;
        for id in pending {
            let Some(record) = self.record(id) else { continue };
            let path = dir.join(format!("{}.json", id));
            let result = match serde_json::to_string_pretty(&record) {
                Ok(json) => Self::write_file_locked(&path, &json).await,
                Err(e) => Err(e.into()),
            };
            match result {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!("failed to write player record {}: {}", path.display(), e);
                    self.mark_dirty(id);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if written > 0 {
            debug!("flushed {} player records", written);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }

    /// Replace `path` with `content` under an exclusive fs2 lock on the
    /// target. The content lands in a sibling temp file first and is renamed
    /// over the target, so readers never see a partial record.
    async fn write_file_locked(path: &Path, content: &str) -> Result<(), ChatError> {
        use std::fs::{File, OpenOptions};

        // fs2 locks are synchronous; the files are tiny.
        let target = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        target.lock_exclusive()?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let stem = path.file_name().and_then(|s| s.to_str()).unwrap_or("player.json");
        let (tmp_path, tmp) = Self::create_temp(dir, stem)?;
        Self::replace_with_temp(tmp_path, tmp, content, path)?;

        if let Ok(dir_file) = File::open(dir) {
            let _ = dir_file.sync_all();
        }
        drop(target);
        Ok(())
    }

    /// Fill the temp file and rename it over `target`. The temp file is
    /// removed again when any step fails.
    fn replace_with_temp(
        tmp_path: PathBuf,
        mut tmp: std::fs::File,
        content: &str,
        target: &Path,
    ) -> Result<(), ChatError> {
        use std::io::Write;

        let staged = tmp
            .write_all(content.as_bytes())
            .and_then(|_| tmp.sync_all())
            .and_then(|_| std::fs::rename(&tmp_path, target));
        if let Err(e) = staged {
            drop(tmp);
            if let Err(cleanup) = std::fs::remove_file(&tmp_path) {
                debug!("could not remove {}: {}", tmp_path.display(), cleanup);
            }
            return Err(ChatError::Io(e));
        }
        Ok(())
    }

    /// First free `.<stem>.tmp-<pid>-<n>` next to the target.
    fn create_temp(dir: &Path, stem: &str) -> Result<(PathBuf, std::fs::File), ChatError> {
        for n in 0..u32::MAX {
            let candidate = dir.join(format!(".{}.tmp-{}-{}", stem, std::process::id(), n));
            match std::fs::OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(ChatError::Io(e)),
            }
        }
        Err(ChatError::Storage(format!("no free temp name in {}", dir.display())))
    }
}
